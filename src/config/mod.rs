//! 本地化配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, LocalizerConfig, Markers};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "ru";

    /// 重扫去抖间隔
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

    /// 单次投递链的最大轮数
    pub const DEFAULT_MAX_DELIVERY_ROUNDS: usize = crate::dom::DEFAULT_MAX_DELIVERY_ROUNDS;

    /// 键盘徽标元素的标签名
    pub const DEFAULT_BADGE_TAG: &str = "kbd";

    /// 日志前缀
    pub const DEFAULT_LOG_PREFIX: &str = "[GitMap]";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "localizer.toml",
        "localizer.json",
        ".localizer.toml",
        "~/.config/dom-localizer/localizer.toml",
        "/etc/dom-localizer/localizer.toml",
    ];
}
