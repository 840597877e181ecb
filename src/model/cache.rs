//! 查找缓存：按 (根条目下标, 子节点下标) 记忆子节点副本
//!
//! 缓存只属于一个 Session 中的当前文档；加载新文档或任何修改之后必须清空。

use std::collections::HashMap;

use crate::model::tagged::TaggedObject;

#[derive(Debug, Default)]
pub struct LookupCache {
    entries: HashMap<(usize, usize), Option<TaggedObject>>,
    hits: u64,
    misses: u64,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 命中则直接返回，否则调用 `compute` 并记录结果（未找到也会被记录）
    pub fn get_or_compute<F>(&mut self, key: (usize, usize), compute: F) -> Option<&TaggedObject>
    where
        F: FnOnce() -> Option<TaggedObject>,
    {
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries.insert(key, compute());
        }
        self.entries.get(&key).and_then(Option::as_ref)
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("查找缓存失效，清除 {} 个条目", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
