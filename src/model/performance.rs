//! 性能基准与测试夹具
//!
//! 生成规模可控的配置文档，并对加载、搜索、提取与序列化计时

use std::time::Instant;

use crate::model::extract::extract;
use crate::model::path::ObjectPath;
use crate::model::search::find_all;
use crate::model::tagged::{Document, TaggedObject};
use crate::utils::loader::{load_from_reader, load_from_slice, LoadStrategy};
use crate::utils::writer::to_pretty_string;

/// 夹具使用的类型标签（循环取用）
pub const FIXTURE_TAGS: [&str; 4] = ["fvAp", "fvBD", "fvCtx", "vzBrCP"];

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 夹具节点名称：`<标签>-<层>-<序号>`，全文档唯一
pub fn fixture_name(level: usize, index: usize) -> String {
    format!("{}-{}-{}", FIXTURE_TAGS[index % FIXTURE_TAGS.len()], level, index)
}

fn fixture_node(level: usize, index: usize) -> TaggedObject {
    let tag = FIXTURE_TAGS[index % FIXTURE_TAGS.len()];
    let name = fixture_name(level, index);
    TaggedObject::new(tag)
        .with_attr("dn", format!("uni/tn-perf/{}", name))
        .with_attr("name", name)
        .with_attr("descr", "性能测试")
}

/// 生成梳状文档：每层 `width` 个兄弟节点，只有首个节点继续向下，共 `depth` 层
///
/// 节点总数为 `1 + depth * width`
pub fn generate_large_document(depth: usize, width: usize) -> Document {
    let mut below: Vec<TaggedObject> = Vec::new();
    for level in (1..=depth).rev() {
        let mut siblings: Vec<TaggedObject> = (0..width).map(|i| fixture_node(level, i)).collect();
        if let Some(first) = siblings.first_mut() {
            first.children = below;
        }
        below = siblings;
    }
    let mut root = TaggedObject::new("fvTenant")
        .with_attr("name", "perf")
        .with_attr("dn", "uni/tn-perf");
    root.children = below;
    Document::new(vec![root])
}

/// 生成单链文档，用于深度测试
pub fn generate_deep_document(depth: usize) -> Document {
    let mut node = TaggedObject::new("fvSubnet").with_attr("name", "bottom");
    for level in (0..depth).rev() {
        node = TaggedObject::new("fvAp")
            .with_attr("name", format!("level-{}", level))
            .with_child(node);
    }
    Document::new(vec![TaggedObject::new("fvTenant").with_attr("name", "deep").with_child(node)])
}

/// 测试加载性能
pub fn benchmark_load(bytes: &[u8], strategy: LoadStrategy) -> PerformanceResult {
    let start = Instant::now();
    let result = match strategy {
        LoadStrategy::Dom => load_from_slice(bytes),
        LoadStrategy::Streaming => load_from_reader(bytes),
    };
    let duration = start.elapsed();
    let operation = format!("加载({:?})", strategy);

    match result {
        Ok(doc) => PerformanceResult::new(
            &operation,
            duration.as_millis(),
            true,
            &format!("解析了 {} 字节, {} 个节点", bytes.len(), doc.node_count()),
        ),
        Err(e) => PerformanceResult::new(&operation, duration.as_millis(), false, &format!("解析失败: {}", e)),
    }
}

/// 测试搜索性能
pub fn benchmark_search(document: &Document, type_tag: &str, names: &[String]) -> PerformanceResult {
    let start = Instant::now();
    let hits = find_all(document, type_tag, names);
    let duration = start.elapsed();
    PerformanceResult::new(
        "搜索",
        duration.as_millis(),
        hits.len() == names.len(),
        &format!("在 {} 个节点中找到 {} 个匹配", document.node_count(), hits.len()),
    )
}

/// 测试提取性能
pub fn benchmark_extract(document: &Document, paths: Vec<ObjectPath>) -> PerformanceResult {
    let requested = paths.len();
    let start = Instant::now();
    let out = extract(document, paths);
    let duration = start.elapsed();
    let extracted = out.root().map_or(0, |r| r.children.len());
    PerformanceResult::new(
        "提取",
        duration.as_millis(),
        extracted == requested,
        &format!("提取了 {}/{} 个子树", extracted, requested),
    )
}

/// 测试序列化性能
pub fn benchmark_serialize(document: &Document) -> PerformanceResult {
    let start = Instant::now();
    let text = to_pretty_string(document);
    let duration = start.elapsed();
    PerformanceResult::new(
        "序列化",
        duration.as_millis(),
        !text.is_empty(),
        &format!("输出 {} 字节", text.len()),
    )
}

/// 运行完整的性能测试套件
pub fn run_performance_suite(depth: usize, width: usize) -> Vec<PerformanceResult> {
    tracing::info!("开始性能测试: 深度 {}, 宽度 {}", depth, width);
    let document = generate_large_document(depth, width);
    let text = to_pretty_string(&document);

    let mut results = vec![
        benchmark_serialize(&document),
        benchmark_load(text.as_bytes(), LoadStrategy::Dom),
        benchmark_load(text.as_bytes(), LoadStrategy::Streaming),
    ];

    let names: Vec<String> = (1..=depth).map(|level| fixture_name(level, 0)).collect();
    results.push(benchmark_search(&document, FIXTURE_TAGS[0], &names));

    let paths: Vec<ObjectPath> = (0..width).map(ObjectPath::root_child).collect();
    results.push(benchmark_extract(&document, paths));

    for r in &results {
        tracing::info!("{}: {} ms, 成功: {}, {}", r.operation, r.duration_ms, r.success, r.details);
    }
    results
}
