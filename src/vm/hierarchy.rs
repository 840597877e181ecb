//! 层级摘要：只读的展示投影（类型、名称、状态、路径），用于导航与列表展示
//!
//! 摘要不是第二份数据源，所有修改都针对真实文档进行。

use std::fmt;

use serde::Serialize;

use crate::model::path::PATH_SEPARATOR;
use crate::model::tagged::{Document, TaggedObject};

pub struct HierarchyNode {
    /// 在父级中的下标
    pub index: usize,
    /// 可直接用于寻址的下标路径
    pub path: Vec<usize>,
    pub type_tag: String,
    /// name 属性；缺失时根为 `Object <标签>`，子节点为 `<标签> <下标>`
    pub name: String,
    pub status: Option<String>,
    /// JSONPath 形式的定位串，如 `$.imdata[0].fvTenant.children[3]`
    pub json_path: String,
    pub children: Vec<HierarchyNode>,
}

/// 只展开本层，子节点以数量表示
impl fmt::Debug for HierarchyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyNode")
            .field("path", &self.path)
            .field("type_tag", &self.type_tag)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Drop for HierarchyNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// 扁平化后的一行（先序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyRow {
    pub depth: usize,
    pub path: String,
    pub type_tag: String,
    pub name: String,
    pub status: Option<String>,
    pub child_count: usize,
    pub json_path: String,
}

/// 构建层级摘要
///
/// 根条目总是包含；根的直接子节点位于第 1 层，`max_depth` 为 Some(n) 时只展开到第 n 层。
pub fn get_hierarchy(document: &Document, max_depth: Option<usize>) -> Vec<HierarchyNode> {
    document
        .root_items
        .iter()
        .enumerate()
        .map(|(index, item)| build_from_root(index, item, max_depth))
        .collect()
}

fn build_from_root(index: usize, item: &TaggedObject, max_depth: Option<usize>) -> HierarchyNode {
    let within = |depth: usize| max_depth.map_or(true, |max| depth <= max);
    let root = HierarchyNode {
        index,
        path: vec![index],
        type_tag: item.type_tag.clone(),
        name: item
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Object {}", item.type_tag)),
        status: item.status().map(str::to_string),
        json_path: format!("$.imdata[{}]", index),
        children: Vec::new(),
    };
    if !within(1) {
        return root;
    }

    // 栈帧：(待处理的源子节点, 正在构建的摘要, 子节点所在层)
    let mut stack = Vec::new();
    let mut current = (item.children.iter().enumerate(), root, 1usize);
    loop {
        if let Some((i, child)) = current.0.next() {
            let summary = summarize_child(&current.1, i, child);
            let depth = current.2;
            if !child.children.is_empty() && within(depth + 1) {
                let next = (child.children.iter().enumerate(), summary, depth + 1);
                stack.push(std::mem::replace(&mut current, next));
            } else {
                current.1.children.push(summary);
            }
            continue;
        }
        match stack.pop() {
            Some(mut parent) => {
                parent.1.children.push(current.1);
                current = parent;
            }
            None => return current.1,
        }
    }
}

fn summarize_child(parent: &HierarchyNode, index: usize, child: &TaggedObject) -> HierarchyNode {
    let mut path = Vec::with_capacity(parent.path.len() + 1);
    path.extend_from_slice(&parent.path);
    path.push(index);
    HierarchyNode {
        index,
        path,
        type_tag: child.type_tag.clone(),
        name: child
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", child.type_tag, index)),
        status: child.status().map(str::to_string),
        json_path: format!("{}{}.children[{}]", parent.json_path, field_segment(&parent.type_tag), index),
        children: Vec::new(),
    }
}

/// 字段含特殊字符时使用 bracket-notation
fn field_segment(key: &str) -> String {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!(".{}", key)
    } else {
        format!("['{}']", key.replace('\'', "\\'"))
    }
}

/// 先序展开为行
pub fn flatten(nodes: &[HierarchyNode]) -> Vec<HierarchyRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<&HierarchyNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        rows.push(HierarchyRow {
            depth: node.path.len() - 1,
            path: join_path(&node.path),
            type_tag: node.type_tag.clone(),
            name: node.name.clone(),
            status: node.status.clone(),
            child_count: node.children.len(),
            json_path: node.json_path.clone(),
        });
        stack.extend(node.children.iter().rev());
    }
    rows
}

fn join_path(path: &[usize]) -> String {
    path.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// 列表展示用的单行文本（按层缩进）
pub fn format_row(row: &HierarchyRow) -> String {
    let indent = "  ".repeat(row.depth);
    match &row.status {
        Some(status) => format!("{}[{}] {}: {} (status: {})", indent, row.path, row.type_tag, row.name, status),
        None => format!("{}[{}] {}: {}", indent, row.path, row.type_tag, row.name),
    }
}
