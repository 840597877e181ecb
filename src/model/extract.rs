//! 子树提取与重新封装：把选中节点放到一个合成根下，得到可独立加载的同格式文档
//!
//! 合成根复用原根对象的类型标签与属性，children 按请求顺序排列。
//! 没有任何目标命中时仍返回带合成根的文档，只是 children 为空，而不是错误；
//! 用 `fragment_count` 判断结果是否为空。

use crate::model::path::{resolve_path, ObjectPath};
use crate::model::status::Target;
use crate::model::tagged::{Document, TaggedObject};

/// 无法确定原根对象时使用的类型标签
pub const DEFAULT_ROOT_TAG: &str = "fvTenant";

/// 以 `root` 的类型标签与属性（缺失时为默认标签与空属性）包装片段
pub fn repackage(root: Option<&TaggedObject>, fragments: Vec<TaggedObject>) -> Document {
    let mut wrapper = match root {
        Some(r) => r.shallow_clone(),
        None => {
            tracing::debug!("原根对象不可用，使用默认根标签 {}", DEFAULT_ROOT_TAG);
            TaggedObject::new(DEFAULT_ROOT_TAG)
        }
    };
    wrapper.children = fragments;
    Document::new(vec![wrapper])
}

/// 提取目标节点的副本并重新封装
///
/// 合成根取第一个命中目标所在的根条目（下标目标对应首个根条目）。
/// 未命中的目标被跳过并记录警告。
pub fn extract(document: &Document, targets: impl Into<Target>) -> Document {
    let paths = targets.into().paths();
    let mut root_index = None;
    let mut fragments = Vec::with_capacity(paths.len());

    for path in &paths {
        match resolve_path(document, path) {
            Some(node) => {
                root_index.get_or_insert(path.root_index());
                fragments.push(node.clone());
            }
            None => tracing::warn!("提取跳过不存在的路径: {}", path),
        }
    }

    // 全部未命中时，合成根取第一个目标指向的根条目，再退回首个根条目
    let root = root_index
        .or_else(|| paths.first().map(ObjectPath::root_index))
        .and_then(|i| document.root_items.get(i))
        .or_else(|| document.root());
    if fragments.is_empty() {
        tracing::info!("没有可提取的节点，返回空的合成根");
    } else {
        tracing::debug!("提取了 {}/{} 个节点", fragments.len(), paths.len());
    }
    repackage(root, fragments)
}

/// 把已定位的节点引用（例如搜索结果）封装到首个根对象之下
pub fn extract_nodes(document: &Document, nodes: &[&TaggedObject]) -> Document {
    let fragments = nodes.iter().map(|n| (*n).clone()).collect();
    repackage(document.root(), fragments)
}

/// 提取结果中合成根下的片段数量；为 0 表示没有任何目标命中
pub fn fragment_count(document: &Document) -> usize {
    document.root_items.iter().map(|root| root.children.len()).sum()
}
