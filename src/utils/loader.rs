//! 文档加载：按文件大小在整体解析与增量解析之间选择策略
//!
//! 两种策略产出结构相同的 Document。重复的键以最后一次出现为准（serde_json::Map
//! 的覆盖语义）；增量解析对被覆盖的值同样做结构校验。整体解析受 serde_json
//! 嵌套上限约束，超限或语法错误时改用增量解析重试，以得到精确的错误位置或完成深层文档。

use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::error::TreeError;
use crate::model::tagged::{Document, TaggedObject};
use crate::utils::fs::{FileAccess, LocalFs};
use crate::utils::stream::read_document;

/// 超过该字节数时默认使用增量解析
pub const DEFAULT_STREAMING_THRESHOLD: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// 先解析为 serde_json::Value 再转换
    Dom,
    /// 事件流直接构建节点
    Streaming,
}

/// 加载配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub streaming_threshold: u64,
    /// 强制使用某种策略；None 时按阈值选择
    pub strategy: Option<LoadStrategy>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            streaming_threshold: DEFAULT_STREAMING_THRESHOLD,
            strategy: None,
        }
    }
}

impl LoadOptions {
    pub fn choose(&self, size: u64) -> LoadStrategy {
        match self.strategy {
            Some(strategy) => strategy,
            None if size > self.streaming_threshold => LoadStrategy::Streaming,
            None => LoadStrategy::Dom,
        }
    }
}

/// 用默认配置从本地文件加载
pub fn load(path: impl AsRef<Path>) -> Result<Document, TreeError> {
    load_with(&LocalFs, path.as_ref(), &LoadOptions::default())
}

/// 通过给定的文件访问实现加载
pub fn load_with<F: FileAccess + ?Sized>(fs: &F, path: &Path, options: &LoadOptions) -> Result<Document, TreeError> {
    if !fs.exists(path) {
        return Err(TreeError::NotFound(path.to_path_buf()));
    }
    let started = Instant::now();
    let size = fs.size(path)?;
    let strategy = options.choose(size);
    tracing::info!("加载文件: {} ({} 字节, 策略 {:?})", path.display(), size, strategy);

    let document = match strategy {
        LoadStrategy::Dom => load_from_slice(&fs.read_bytes(path)?)?,
        LoadStrategy::Streaming => load_from_reader(fs.open_reader(path)?)?,
    };

    tracing::info!(
        "加载完成: {} 个根条目, {} 个节点, 耗时 {:?}",
        document.root_items.len(),
        document.node_count(),
        started.elapsed()
    );
    Ok(document)
}

/// 整体解析内存中的文档
pub fn load_from_slice(bytes: &[u8]) -> Result<Document, TreeError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => document_from_value(value),
        Err(e) if e.is_syntax() || e.is_eof() => {
            tracing::debug!("整体解析失败 ({}), 改用增量解析", e);
            read_document(bytes)
        }
        Err(e) => Err(TreeError::Parse(e)),
    }
}

/// 增量解析任意读取器
pub fn load_from_reader<R: BufRead>(reader: R) -> Result<Document, TreeError> {
    read_document(reader)
}

/// 把已解析的 JSON 值转换为文档
pub fn document_from_value(value: Value) -> Result<Document, TreeError> {
    let Value::Object(mut envelope) = value else {
        return Err(TreeError::Malformed("文档根必须是 JSON 对象".into()));
    };

    let items = match envelope.remove("imdata") {
        None => return Err(TreeError::MissingKey("imdata")),
        Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(TreeError::Malformed("imdata 必须是数组".into())),
    };
    let total_count = match envelope.remove("totalCount") {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(_) => return Err(TreeError::Malformed("totalCount 必须是字符串或数字".into())),
    };
    for key in envelope.keys() {
        tracing::debug!("忽略文档中的未知键: {}", key);
    }

    let root_items = items
        .into_iter()
        .map(object_from_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Document {
        total_count: total_count.unwrap_or_else(|| root_items.len().to_string()),
        root_items,
    })
}

/// 逐层转换，未处理的子条目保存在栈帧中
fn object_from_value(value: Value) -> Result<TaggedObject, TreeError> {
    let mut stack = vec![split_record(value)?];
    while let Some((_, pending)) = stack.last_mut() {
        if let Some(child) = pending.next() {
            let frame = split_record(child)?;
            stack.push(frame);
            continue;
        }
        if let Some((done, _)) = stack.pop() {
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(done),
                None => return Ok(done),
            }
        }
    }
    Err(TreeError::Malformed("对象树为空".into()))
}

/// 拆开单键包装：返回不含子节点的对象与待转换的子条目
fn split_record(value: Value) -> Result<(TaggedObject, std::vec::IntoIter<Value>), TreeError> {
    let Value::Object(wrapper) = value else {
        return Err(TreeError::Malformed("对象条目必须是 JSON 对象".into()));
    };
    if wrapper.len() != 1 {
        let msg = if wrapper.is_empty() {
            "对象缺少类型标签".to_string()
        } else {
            let tags: Vec<&str> = wrapper.keys().map(String::as_str).collect();
            format!("对象含有多个类型标签: {}", tags.join(", "))
        };
        return Err(TreeError::Malformed(msg));
    }
    let Some((type_tag, body)) = wrapper.into_iter().next() else {
        return Err(TreeError::Malformed("对象缺少类型标签".into()));
    };
    let Value::Object(mut body) = body else {
        return Err(TreeError::Malformed(format!("类型标签 {} 的值必须是对象", type_tag)));
    };

    let mut node = TaggedObject::new(type_tag);
    match body.remove("attributes") {
        None | Some(Value::Null) => {}
        Some(Value::Object(attributes)) => {
            if let Some((key, _)) = attributes.iter().find(|(_, v)| v.is_object() || v.is_array()) {
                return Err(TreeError::Malformed(format!("属性 {} 的值必须是标量", key)));
            }
            node.attributes = attributes;
        }
        Some(_) => return Err(TreeError::Malformed("attributes 必须是对象".into())),
    }
    let children = match body.remove("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(children)) => children,
        Some(_) => return Err(TreeError::Malformed("children 必须是数组".into())),
    };
    for key in body.keys() {
        tracing::debug!("忽略对象 {} 中的未知键: {}", node.type_tag, key);
    }
    Ok((node, children.into_iter()))
}
