//! APIC 配置树工具库
//!
//! 提供配置文档加载（整体/增量解析）、下标路径寻址、按类型与名称搜索、
//! 状态标记、子树提取与回写功能

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::error::TreeError;
pub use model::extract::{extract, fragment_count, repackage, DEFAULT_ROOT_TAG};
pub use model::path::{resolve, resolve_mut, ObjectPath};
pub use model::search::{find_all, find_all_paths, find_by_tag, find_one, find_one_path};
pub use model::session::Session;
pub use model::status::{set_status, StatusIntent, Target};
pub use model::tagged::{Attributes, Document, TaggedObject};
pub use utils::loader::{load, LoadOptions, LoadStrategy};
pub use utils::writer::save;
pub use vm::hierarchy::{get_hierarchy, HierarchyNode};
