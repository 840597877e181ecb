//! 搜索引擎：按 (类型标签, 名称) 深度优先查找
//!
//! 遍历使用显式栈。访问顺序固定为文档顺序的先序遍历（子节点逆序入栈），
//! 因此名称重复时 `find_one` 返回文档中最靠前的那一个。
//! 名称匹配区分大小写、精确相等；缺少 attributes 或 name 视为不匹配。

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::model::path::ObjectPath;
use crate::model::tagged::{Document, TaggedObject};

/// 先序遍历整个文档，回调收到当前节点的下标路径；返回 Break 时提前结束
pub fn walk<'a, F>(document: &'a Document, mut visit: F)
where
    F: FnMut(&[usize], &'a TaggedObject) -> ControlFlow<()>,
{
    let mut stack: Vec<(usize, usize, &'a TaggedObject)> = document
        .root_items
        .iter()
        .enumerate()
        .rev()
        .map(|(i, node)| (0, i, node))
        .collect();
    let mut path: Vec<usize> = Vec::new();

    while let Some((depth, index, node)) = stack.pop() {
        path.truncate(depth);
        path.push(index);
        if visit(&path, node).is_break() {
            return;
        }
        stack.extend(
            node.children
                .iter()
                .enumerate()
                .rev()
                .map(|(i, child)| (depth + 1, i, child)),
        );
    }
}

fn is_match(node: &TaggedObject, type_tag: &str, names: &HashSet<&str>) -> bool {
    node.type_tag == type_tag && node.name().is_some_and(|n| names.contains(n))
}

fn name_set<S: AsRef<str>>(names: &[S]) -> HashSet<&str> {
    names.iter().map(AsRef::as_ref).collect()
}

/// 第一个匹配的节点（活树引用）
pub fn find_one<'a>(document: &'a Document, type_tag: &str, name: &str) -> Option<&'a TaggedObject> {
    find_one_with_path(document, type_tag, name).map(|(_, node)| node)
}

/// 第一个匹配节点的路径，供后续按路径修改
pub fn find_one_path(document: &Document, type_tag: &str, name: &str) -> Option<ObjectPath> {
    find_one_with_path(document, type_tag, name).map(|(path, _)| path)
}

fn find_one_with_path<'a>(document: &'a Document, type_tag: &str, name: &str) -> Option<(ObjectPath, &'a TaggedObject)> {
    let names = HashSet::from([name]);
    let mut found = None;
    walk(document, |path, node| {
        if is_match(node, type_tag, &names) {
            found = ObjectPath::new(path.to_vec()).ok().map(|p| (p, node));
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });
    found
}

/// 全部匹配节点；命中后继续深入其子节点与兄弟节点，同一 (标签, 名称) 在不同深度重复出现时全部返回
pub fn find_all<'a, S: AsRef<str>>(document: &'a Document, type_tag: &str, names: &[S]) -> Vec<&'a TaggedObject> {
    find_all_with_paths(document, type_tag, names)
        .into_iter()
        .map(|(_, node)| node)
        .collect()
}

/// `find_all` 的路径版本，顺序一致
pub fn find_all_paths<S: AsRef<str>>(document: &Document, type_tag: &str, names: &[S]) -> Vec<ObjectPath> {
    find_all_with_paths(document, type_tag, names)
        .into_iter()
        .map(|(path, _)| path)
        .collect()
}

fn find_all_with_paths<'a, S: AsRef<str>>(
    document: &'a Document,
    type_tag: &str,
    names: &[S],
) -> Vec<(ObjectPath, &'a TaggedObject)> {
    let names = name_set(names);
    let mut out = Vec::new();
    if names.is_empty() {
        return out;
    }
    walk(document, |path, node| {
        if is_match(node, type_tag, &names) {
            if let Ok(p) = ObjectPath::new(path.to_vec()) {
                out.push((p, node));
            }
        }
        ControlFlow::Continue(())
    });
    out
}

/// 某一类型标签的全部节点（不限名称），顺序同 `find_all`
pub fn find_by_tag<'a>(document: &'a Document, type_tag: &str) -> Vec<&'a TaggedObject> {
    find_by_tag_with_paths(document, type_tag)
        .into_iter()
        .map(|(_, node)| node)
        .collect()
}

pub fn find_by_tag_paths(document: &Document, type_tag: &str) -> Vec<ObjectPath> {
    find_by_tag_with_paths(document, type_tag)
        .into_iter()
        .map(|(path, _)| path)
        .collect()
}

fn find_by_tag_with_paths<'a>(document: &'a Document, type_tag: &str) -> Vec<(ObjectPath, &'a TaggedObject)> {
    let mut out = Vec::new();
    walk(document, |path, node| {
        if node.type_tag == type_tag {
            if let Ok(p) = ObjectPath::new(path.to_vec()) {
                out.push((p, node));
            }
        }
        ControlFlow::Continue(())
    });
    out
}
