//! IO helper: file access collaborator used by the loader and the writer

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// 核心依赖的文件访问接口
pub trait FileAccess {
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// 写入文件，必要时创建中间目录；失败时记录原因并返回 false
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> bool;

    fn exists(&self, path: &Path) -> bool;

    /// 文件大小，用于选择加载策略
    fn size(&self, path: &Path) -> io::Result<u64> {
        self.read_bytes(path).map(|b| b.len() as u64)
    }

    /// 增量读取用的读取器；默认实现先整体读入
    fn open_reader(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        Ok(Box::new(io::Cursor::new(self.read_bytes(path)?)))
    }
}

/// 基于本地文件系统的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileAccess for LocalFs {
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> bool {
        match write_creating_dirs(path, bytes) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("文件写入失败: {}: {}", path.display(), e);
                false
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn open_reader(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn write_creating_dirs(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, bytes)
}
