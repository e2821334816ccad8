//! # 工具模块
//!
//! 这个模块包含各种工具函数和实用程序：
//!
//! - 文本规范化（所有判定逻辑共用的唯一规范化函数）
//! - 词元包含判断
//!
//! # 模块组织
//!
//! - `text` - 文本规范化与比较

pub mod text;

// Re-export commonly used items for convenience
pub use text::{contains_all, normalize_text, texts_match};
