//! 文件访问、解析与序列化

pub mod fs;
pub mod loader;
pub mod stream;
pub mod writer;
