//! 路径寻址：整数下标序列，首个下标进入 imdata，其余逐层进入 children
//!
//! 越界不是错误而是 `None`，因为交互端经常试探性地寻址；空路径属于调用方错误。
//! 兄弟节点的插入或删除会使下标失效，这是已接受的限制。

use std::fmt;
use std::str::FromStr;

use crate::model::error::TreeError;
use crate::model::tagged::{Document, TaggedObject};

/// 文本形式的分隔符，如 `0/5/2`
pub const PATH_SEPARATOR: char = '/';

/// 非空的下标路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(Vec<usize>);

impl ObjectPath {
    pub fn new(indices: Vec<usize>) -> Result<Self, TreeError> {
        if indices.is_empty() {
            return Err(TreeError::InvalidPath("路径不能为空".into()));
        }
        Ok(Self(indices))
    }

    /// 首个根条目的第 `index` 个子节点，即 `[0, index]`
    pub fn root_child(index: usize) -> Self {
        Self(vec![0, index])
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// 路径长度（即所在层级，根条目为 1）
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// 首个下标：所在的根条目
    pub fn root_index(&self) -> usize {
        self.0[0]
    }

    /// 追加一个子下标得到子路径
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// 父路径；根条目没有父路径
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            write!(f, "{}", idx)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TreeError::InvalidPath("路径不能为空".into()));
        }
        let indices = trimmed
            .split(PATH_SEPARATOR)
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| TreeError::InvalidPath(format!("路径元素不是非负整数: '{}' (于 '{}')", part, s)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(indices)
    }
}

impl TryFrom<Vec<usize>> for ObjectPath {
    type Error = TreeError;

    fn try_from(indices: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(indices)
    }
}

impl TryFrom<&[usize]> for ObjectPath {
    type Error = TreeError;

    fn try_from(indices: &[usize]) -> Result<Self, Self::Error> {
        Self::new(indices.to_vec())
    }
}

/// 按下标逐层下降；空路径返回 InvalidPath，任一下标越界返回 Ok(None)
pub fn resolve<'a>(document: &'a Document, path: &[usize]) -> Result<Option<&'a TaggedObject>, TreeError> {
    let Some((first, rest)) = path.split_first() else {
        return Err(TreeError::InvalidPath("路径不能为空".into()));
    };
    let Some(root) = document.root_items.get(*first) else {
        return Ok(None);
    };
    Ok(rest.iter().try_fold(root, |node, idx| node.children.get(*idx)))
}

/// `resolve` 的可变版本
pub fn resolve_mut<'a>(document: &'a mut Document, path: &[usize]) -> Result<Option<&'a mut TaggedObject>, TreeError> {
    let Some((first, rest)) = path.split_first() else {
        return Err(TreeError::InvalidPath("路径不能为空".into()));
    };
    let Some(root) = document.root_items.get_mut(*first) else {
        return Ok(None);
    };
    Ok(rest.iter().try_fold(root, |node, idx| node.children.get_mut(*idx)))
}

/// 已校验路径的寻址，不会失败
pub fn resolve_path<'a>(document: &'a Document, path: &ObjectPath) -> Option<&'a TaggedObject> {
    resolve(document, path.indices()).ok().flatten()
}

pub fn resolve_path_mut<'a>(document: &'a mut Document, path: &ObjectPath) -> Option<&'a mut TaggedObject> {
    resolve_mut(document, path.indices()).ok().flatten()
}
