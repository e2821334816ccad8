//! # DOM Localizer
//!
//! 词典驱动的页面本地化引擎：在一棵不断被宿主脚本改写的 HTML 文档上，
//! 把英文界面文本替换成目标语言，并在宿主重新渲染后自动恢复译文。
//!
//! ## 模块组织
//!
//! - `dom` - 带变更通知的最小 DOM 和 CSS 选择器子集
//! - `dictionary` - `key = value` 词典
//! - `reconciler` - 含徽标、链接标记的译文与活节点的合并
//! - `engine` - 翻译单元、守卫、重扫调度
//! - `rules` - 声明式规则集
//! - `config` - 配置文件与默认值
//! - `env` - 环境变量
//! - `utils` - 文本规范化等工具函数

pub mod config;
pub mod dictionary;
pub mod dom;
pub mod engine;
pub mod env;
pub mod error;
pub mod reconciler;
pub mod rules;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{ConfigManager, LocalizerConfig, Markers};
pub use dictionary::Dictionary;
pub use dom::{Document, Handle, SelectorList};
pub use engine::{HostHooks, Localizer, LocalizerBuilder, NoopHooks, PassStats, TextState};
pub use error::{LocalizerError, LocalizerResult};
pub use reconciler::{ContentReconciler, Fragment, PlaceholderMap};
pub use rules::{Rule, RuleSet, RuleSpec};
pub use utils::normalize_text;
