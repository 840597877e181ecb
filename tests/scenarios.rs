//! 端到端场景：加载、寻址、搜索、状态、提取、回写

use std::error::Error;
use std::fs;

use apic_tree::model::performance::{generate_deep_document, generate_large_document};
use apic_tree::model::status::{STATUS_CREATED, STATUS_DELETED};
use apic_tree::utils::loader::{load_from_reader, load_with};
use apic_tree::utils::fs::LocalFs;
use apic_tree::utils::writer::to_pretty_string;
use apic_tree::{
    extract, find_all, find_one, find_one_path, get_hierarchy, load, resolve, save, set_status, Document, LoadOptions,
    LoadStrategy, ObjectPath, TaggedObject, TreeError,
};
use tempfile::tempdir;

/// 根 T(name=Acme)，子节点 A(x) 与 B(y)，B 下有 C(z)
fn scenario() -> Document {
    Document::new(vec![TaggedObject::new("T")
        .with_attr("name", "Acme")
        .with_child(TaggedObject::new("A").with_attr("name", "x"))
        .with_child(
            TaggedObject::new("B")
                .with_attr("name", "y")
                .with_child(TaggedObject::new("C").with_attr("name", "z")),
        )])
}

fn path(indices: &[usize]) -> ObjectPath {
    ObjectPath::try_from(indices).unwrap()
}

#[test]
fn scenario_find_mark_extract() {
    let mut doc = scenario();
    let path_to_a = path(&[0, 0]);
    let path_to_b = path(&[0, 1]);

    let c = find_one(&doc, "C", "z").expect("应找到 C");
    assert!(std::ptr::eq(c, &doc.root_items[0].children[1].children[0]));

    assert!(set_status(&mut doc, path_to_b.clone(), Some(STATUS_DELETED)));
    let b = resolve(&doc, path_to_b.indices()).unwrap().unwrap();
    assert_eq!(b.status(), Some("deleted"));

    let out = extract(&doc, vec![path_to_a.clone(), path_to_b.clone()]);
    assert_eq!(out.total_count, "1");
    assert_eq!(out.root_items.len(), 1);
    let root = &out.root_items[0];
    assert_eq!(root.type_tag, "T");
    assert_eq!(root.attributes, doc.root_items[0].attributes);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].type_tag, "A");
    assert_eq!(root.children[1].type_tag, "B");
    assert_eq!(root.children[1].status(), Some("deleted"));
}

#[test]
fn scenario_find_all_nonexistent_is_empty() {
    let doc = scenario();
    assert!(find_all(&doc, "A", &["nonexistent"]).is_empty());
}

#[test]
fn scenario_partial_batch_failure_keeps_effects() {
    let mut doc = scenario();
    let valid = path(&[0, 1, 0]);
    let invalid = path(&[0, 4, 2]);
    assert!(!set_status(&mut doc, vec![valid.clone(), invalid], Some(STATUS_CREATED)));
    let node = resolve(&doc, valid.indices()).unwrap().unwrap();
    assert_eq!(node.status(), Some("created"));
}

#[test]
fn property_find_all_recurring_pairs_at_any_depth() {
    let doc = Document::new(vec![TaggedObject::new("fvTenant")
        .with_child(
            TaggedObject::new("fvAp")
                .with_attr("name", "web")
                .with_child(TaggedObject::new("fvBD").with_attr("name", "shared")),
        )
        .with_child(TaggedObject::new("fvBD").with_attr("name", "shared"))
        .with_child(TaggedObject::new("fvBD").with_attr("name", "other"))
        .with_child(TaggedObject::new("fvCtx").with_attr("name", "shared"))]);

    let hits = find_all(&doc, "fvBD", &["shared", "other"]);
    assert_eq!(hits.len(), 3, "重复出现的 (类型, 名称) 应全部返回");
    assert!(hits.iter().all(|n| n.type_tag == "fvBD"));

    let first = find_one_path(&doc, "fvBD", "shared").unwrap();
    assert_eq!(first.indices(), &[0, 0, 0], "find_one 按文档先序返回首个匹配");
}

#[test]
fn property_resolve_out_of_range_never_errors() {
    let doc = scenario();
    for probe in [vec![1], vec![0, 2], vec![0, 1, 1], vec![0, 0, 0, 0], vec![9, 9, 9]] {
        assert!(resolve(&doc, &probe).unwrap().is_none(), "{:?}", probe);
    }
    assert!(matches!(resolve(&doc, &[]), Err(TreeError::InvalidPath(_))));
}

#[test]
fn property_save_load_save_round_trip() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let mut doc = generate_large_document(4, 6);
    assert!(set_status(&mut doc, vec![1usize, 3], Some(STATUS_DELETED)));

    let first = dir.path().join("first.json");
    assert!(save(&doc, &first));
    let loaded = load(&first)?;
    assert_eq!(loaded, doc);

    let second = dir.path().join("second.json");
    assert!(save(&loaded, &second));
    assert_eq!(load(&second)?, doc);
    assert_eq!(fs::read_to_string(&first)?, fs::read_to_string(&second)?);
    Ok(())
}

#[test]
fn extracted_fragment_is_a_standalone_document() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let doc = scenario();
    let fragment = extract(&doc, vec![path(&[0, 1])]);
    let out = dir.path().join("fragment.json");
    assert!(save(&fragment, &out));

    let reloaded = load(&out)?;
    assert_eq!(reloaded, fragment);
    assert_eq!(find_one(&reloaded, "C", "z").and_then(TaggedObject::name), Some("z"));
    Ok(())
}

#[test]
fn load_distinguishes_missing_from_malformed() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = load(dir.path().join("missing.json")).unwrap_err();
    assert!(missing.is_not_found() && !missing.is_malformed());

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "not json at all")?;
    let malformed = load(&bad).unwrap_err();
    assert!(malformed.is_malformed() && !malformed.is_not_found());
    Ok(())
}

#[test]
fn streaming_load_of_very_deep_file() -> Result<(), Box<dyn Error>> {
    let depth = 20_000;
    let mut text = String::from(r#"{"totalCount": "1", "imdata": ["#);
    for i in 0..depth {
        text.push_str(&format!(r#"{{"fvAp": {{"attributes": {{"name": "n{}"}}, "children": ["#, i));
    }
    text.push_str(r#"{"fvSubnet": {"attributes": {"name": "bottom"}}}"#);
    for _ in 0..depth {
        text.push_str("]}}");
    }
    text.push_str("]}");

    let dir = tempdir()?;
    let file = dir.path().join("deep.json");
    fs::write(&file, &text)?;

    let options = LoadOptions {
        strategy: Some(LoadStrategy::Streaming),
        ..LoadOptions::default()
    };
    let doc = load_with(&LocalFs, &file, &options)?;
    assert_eq!(doc.root_items[0].depth(), depth + 1);

    let bottom = find_one_path(&doc, "fvSubnet", "bottom").expect("最深节点应可搜索");
    assert_eq!(bottom.len(), depth + 1);
    let mut doc = doc;
    assert!(set_status(&mut doc, bottom.clone(), Some(STATUS_CREATED)));
    assert_eq!(resolve(&doc, bottom.indices())?.and_then(TaggedObject::status), Some("created"));

    // 默认配置下小文件先尝试整体解析，超出嵌套上限后改用增量解析
    assert_eq!(load(&file)?, doc_without_status(doc, &bottom));
    Ok(())
}

fn doc_without_status(mut doc: Document, at: &ObjectPath) -> Document {
    set_status(&mut doc, at.clone(), None);
    doc
}

#[test]
fn hierarchy_matches_document_structure() {
    let doc = generate_deep_document(50);
    let tree = get_hierarchy(&doc, Some(3));
    assert_eq!(tree.len(), 1);
    let mut node = &tree[0];
    let mut levels = 0;
    while let Some(child) = node.children.first() {
        node = child;
        levels += 1;
    }
    assert_eq!(levels, 3);
}

#[test]
fn reader_and_writer_agree_on_empty_document() {
    let text = to_pretty_string(&Document::empty());
    let doc = load_from_reader(text.as_bytes()).unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc.total_count, "0");
}
