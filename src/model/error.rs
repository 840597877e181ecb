//! 错误分类：加载失败向上传播，单节点查找/修改失败以返回值表达

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("文件不存在: {}", .0.display())]
    NotFound(PathBuf),
    #[error("文档缺少键: {0}")]
    MissingKey(&'static str),
    #[error("文档结构无效: {0}")]
    Malformed(String),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("无效路径: {0}")]
    InvalidPath(String),
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("状态错误: {0}")]
    State(String),
}

impl TreeError {
    /// 来源或必需键不存在（用户应重新选择文件）
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_) | TreeError::MissingKey(_))
    }

    /// 内容不是合法文档（用户应修正文件内容）
    pub fn is_malformed(&self) -> bool {
        matches!(self, TreeError::Malformed(_) | TreeError::Parse(_))
    }
}
