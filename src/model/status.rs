//! 状态修改：设置、覆盖或移除保留属性 `status`，作为软删除/创建标记
//!
//! 核心接受任意字符串，受限词表由前端自行校验。
//! 批量目标逐个独立执行，任一失败不影响其余目标，也不回滚已生效的修改。

use std::fmt;
use std::str::FromStr;

use crate::model::path::{resolve_path_mut, ObjectPath};
use crate::model::tagged::{Attributes, Document, TaggedObject};

pub const STATUS_KEY: &str = "status";
pub const STATUS_CREATED: &str = "created";
pub const STATUS_MODIFIED_CREATED: &str = "modified, created";
pub const STATUS_DELETED: &str = "deleted";

/// 推荐的状态词表（前端校验用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIntent {
    Create,
    ModifyCreate,
    Delete,
}

impl StatusIntent {
    pub const ALL: [StatusIntent; 3] = [StatusIntent::Create, StatusIntent::ModifyCreate, StatusIntent::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusIntent::Create => STATUS_CREATED,
            StatusIntent::ModifyCreate => STATUS_MODIFIED_CREATED,
            StatusIntent::Delete => STATUS_DELETED,
        }
    }
}

impl fmt::Display for StatusIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusIntent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| format!("未知状态值: '{}'", s))
    }
}

/// 修改目标：单路径、路径列表、首个根条目的子节点下标或下标列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(ObjectPath),
    Paths(Vec<ObjectPath>),
    Index(usize),
    Indices(Vec<usize>),
}

impl Target {
    /// 展开为路径列表；下标 `i` 对应路径 `[0, i]`
    pub fn paths(&self) -> Vec<ObjectPath> {
        match self {
            Target::Path(p) => vec![p.clone()],
            Target::Paths(ps) => ps.clone(),
            Target::Index(i) => vec![ObjectPath::root_child(*i)],
            Target::Indices(is) => is.iter().map(|i| ObjectPath::root_child(*i)).collect(),
        }
    }
}

impl From<ObjectPath> for Target {
    fn from(path: ObjectPath) -> Self {
        Target::Path(path)
    }
}

impl From<Vec<ObjectPath>> for Target {
    fn from(paths: Vec<ObjectPath>) -> Self {
        Target::Paths(paths)
    }
}

impl From<usize> for Target {
    fn from(index: usize) -> Self {
        Target::Index(index)
    }
}

impl From<Vec<usize>> for Target {
    fn from(indices: Vec<usize>) -> Self {
        Target::Indices(indices)
    }
}

/// 对单个节点设置（Some）或移除（None）状态，其余属性不变
pub fn apply_status(node: &mut TaggedObject, value: Option<&str>) {
    match value {
        Some(v) => {
            node.attributes.insert(STATUS_KEY.to_string(), v.into());
        }
        None => {
            remove_status(&mut node.attributes);
        }
    }
}

fn remove_status(attributes: &mut Attributes) {
    // shift_remove 保持其余键的顺序
    attributes.shift_remove(STATUS_KEY);
}

/// 对每个目标独立设置状态；全部成功才返回 true，部分生效不回滚
pub fn set_status(document: &mut Document, target: impl Into<Target>, value: Option<&str>) -> bool {
    let target = target.into();
    let mut failed = Vec::new();
    let paths = target.paths();
    for path in &paths {
        match resolve_path_mut(document, path) {
            Some(node) => apply_status(node, value),
            None => {
                tracing::warn!("状态设置失败，路径不存在: {}", path);
                failed.push(path.to_string());
            }
        }
    }
    if !failed.is_empty() {
        tracing::warn!("批量状态设置部分失败: {}/{} 个目标失败 [{}]", failed.len(), paths.len(), failed.join(", "));
        return false;
    }
    tracing::debug!("状态已设置为 {:?}，共 {} 个目标", value, paths.len());
    true
}
