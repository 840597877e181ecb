//! 前端桥接常量：命令行输出的提示文本与退出码
//!
//! 退出码区分三种结果：有数据的成功、空结果的成功、失败

use crate::model::error::TreeError;

// === 退出码 ===
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// 运行成功但没有找到任何数据
pub const EXIT_EMPTY: i32 = 3;

// === 常量定义（消除魔法值） ===
pub const STATUS_LOADED: &str = "文件加载完成";
pub const STATUS_NOT_FOUND: &str = "未找到匹配的对象";
pub const STATUS_SAVED: &str = "已保存到";
pub const STATUS_MARKED: &str = "状态已更新";
pub const STATUS_PARTIAL_FAILURE: &str = "部分目标不存在，已生效的修改保留";
pub const STATUS_SAVE_FAILED: &str = "保存失败";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";

/// 加载失败时给用户的处理建议
pub fn load_error_hint(err: &TreeError) -> &'static str {
    if err.is_not_found() {
        "请检查文件路径或重新选择文件"
    } else if err.is_malformed() {
        "文件内容不是有效的配置文档，请修正文件内容"
    } else {
        "请检查文件权限后重试"
    }
}
