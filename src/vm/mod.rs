//! 展示层：层级投影与前端常量

pub mod bridge;
pub mod hierarchy;
