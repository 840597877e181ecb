//! Session：一次会话持有的文档、来源路径与查找缓存
//!
//! 所有修改都经由 Session 进行，以便在加载新文档或修改之后清空缓存。

use std::path::{Path, PathBuf};

use crate::model::cache::LookupCache;
use crate::model::error::TreeError;
use crate::model::extract::{extract, extract_nodes, repackage};
use crate::model::path::resolve;
use crate::model::search::{find_all, find_all_paths, find_by_tag, find_by_tag_paths, find_one};
use crate::model::status::{set_status, Target};
use crate::model::tagged::{Document, TaggedObject};
use crate::utils::fs::{FileAccess, LocalFs};
use crate::utils::loader::{load_with, LoadOptions};
use crate::utils::writer::save_with;

#[derive(Debug, Default)]
pub struct Session<F: FileAccess = LocalFs> {
    fs: F,
    options: LoadOptions,
    source_path: Option<PathBuf>,
    document: Option<Document>,
    cache: LookupCache,
}

impl Session<LocalFs> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: FileAccess> Session<F> {
    /// 使用自定义文件访问实现
    pub fn with_fs(fs: F) -> Self {
        Self {
            fs,
            options: LoadOptions::default(),
            source_path: None,
            document: None,
            cache: LookupCache::new(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// 加载文件并替换当前文档；失败时保留原有文档
    pub fn load_file(&mut self, path: &Path) -> Result<(), TreeError> {
        let document = load_with(&self.fs, path, &self.options)?;
        self.cache.clear();
        self.source_path = Some(path.to_path_buf());
        self.document = Some(document);
        Ok(())
    }

    /// 直接采用内存中的文档（无来源路径）
    pub fn load_document(&mut self, document: Document) {
        self.cache.clear();
        self.source_path = None;
        self.document = Some(document);
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> Result<&Document, TreeError> {
        self.document.as_ref().ok_or_else(not_loaded)
    }

    /// 取出文档并结束会话
    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn resolve(&self, path: &[usize]) -> Result<Option<&TaggedObject>, TreeError> {
        resolve(self.document()?, path)
    }

    pub fn find_one(&self, type_tag: &str, name: &str) -> Result<Option<&TaggedObject>, TreeError> {
        Ok(find_one(self.document()?, type_tag, name))
    }

    pub fn find_all<S: AsRef<str>>(&self, type_tag: &str, names: &[S]) -> Result<Vec<&TaggedObject>, TreeError> {
        Ok(find_all(self.document()?, type_tag, names))
    }

    /// 按类型与名称搜索，并把命中节点封装为独立文档
    pub fn find_and_extract<S: AsRef<str>>(&self, type_tag: &str, names: &[S]) -> Result<Document, TreeError> {
        let document = self.document()?;
        let hits = find_all(document, type_tag, names);
        tracing::info!("找到 {} 个类型为 {} 的对象", hits.len(), type_tag);
        Ok(extract_nodes(document, &hits))
    }

    /// 对搜索命中的节点设置状态，返回命中数量
    pub fn mark_matches<S: AsRef<str>>(&mut self, type_tag: &str, names: &[S], value: Option<&str>) -> Result<usize, TreeError> {
        let paths = find_all_paths(self.document()?, type_tag, names);
        if paths.is_empty() {
            return Ok(0);
        }
        let count = paths.len();
        self.set_status(paths, value)?;
        Ok(count)
    }

    /// 某一类型的全部对象（不限名称）
    pub fn find_by_tag(&self, type_tag: &str) -> Result<Vec<&TaggedObject>, TreeError> {
        Ok(find_by_tag(self.document()?, type_tag))
    }

    /// 按类型搜索，并把全部命中节点封装为独立文档
    pub fn extract_by_tag(&self, type_tag: &str) -> Result<Document, TreeError> {
        let document = self.document()?;
        let hits = find_by_tag(document, type_tag);
        tracing::info!("找到 {} 个类型为 {} 的对象", hits.len(), type_tag);
        Ok(extract_nodes(document, &hits))
    }

    /// 对某一类型的全部对象设置状态，返回命中数量
    pub fn mark_by_tag(&mut self, type_tag: &str, value: Option<&str>) -> Result<usize, TreeError> {
        let paths = find_by_tag_paths(self.document()?, type_tag);
        if paths.is_empty() {
            return Ok(0);
        }
        let count = paths.len();
        self.set_status(paths, value)?;
        Ok(count)
    }

    /// 修改状态并使缓存失效（部分失败时已生效的修改同样使缓存失效）
    pub fn set_status(&mut self, target: impl Into<Target>, value: Option<&str>) -> Result<bool, TreeError> {
        let document = self.document.as_mut().ok_or_else(not_loaded)?;
        let ok = set_status(document, target, value);
        self.cache.clear();
        Ok(ok)
    }

    /// 第 `parent` 个根条目的第 `child` 个子节点，经缓存读取
    pub fn child(&mut self, parent: usize, child: usize) -> Result<Option<&TaggedObject>, TreeError> {
        let document = self.document.as_ref().ok_or_else(not_loaded)?;
        Ok(self.cache.get_or_compute((parent, child), || lookup_child(document, parent, child)))
    }

    pub fn extract(&self, targets: impl Into<Target>) -> Result<Document, TreeError> {
        Ok(extract(self.document()?, targets))
    }

    /// 提取第 `parent` 个根条目下的若干子节点，按请求顺序封装
    pub fn extract_children(&mut self, parent: usize, children: &[usize]) -> Result<Document, TreeError> {
        let document = self.document.as_ref().ok_or_else(not_loaded)?;
        let mut fragments = Vec::with_capacity(children.len());
        for &index in children {
            match self.cache.get_or_compute((parent, index), || lookup_child(document, parent, index)) {
                Some(node) => fragments.push(node.clone()),
                None => tracing::warn!("提取跳过不存在的子节点: {}/{}", parent, index),
            }
        }
        if fragments.is_empty() {
            tracing::info!("没有可提取的子节点，返回空的合成根");
        }
        Ok(repackage(document.root_items.get(parent), fragments))
    }

    /// 保存当前文档；写入失败返回 Ok(false)
    pub fn save(&self, destination: &Path) -> Result<bool, TreeError> {
        Ok(save_with(&self.fs, self.document()?, destination))
    }

    /// 写回加载时的源文件
    pub fn save_to_source(&self) -> Result<bool, TreeError> {
        let source = self
            .source_path
            .as_deref()
            .ok_or_else(|| TreeError::State("源文件路径未设置".into()))?;
        self.save(source)
    }
}

fn lookup_child(document: &Document, parent: usize, child: usize) -> Option<TaggedObject> {
    document
        .root_items
        .get(parent)
        .and_then(|root| root.children.get(child))
        .cloned()
}

fn not_loaded() -> TreeError {
    TreeError::State("文档尚未加载".into())
}
