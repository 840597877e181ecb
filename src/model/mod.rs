//! 数据模型与核心算法

pub mod cache;
pub mod error;
pub mod extract;
pub mod path;
pub mod performance;
pub mod search;
pub mod session;
pub mod status;
pub mod tagged;
