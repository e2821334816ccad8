//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。所有变量以 `LOCALIZER_` 为前缀
//! （`NO_COLOR` 除外，它遵循通用约定）。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => match Self::DEFAULT {
                Some(default) => Ok(default),
                None => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Required environment variable not set".to_string(),
                }),
            },
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LOCALIZER_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何非空值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 本地化引擎相关环境变量
pub mod localizer {
    use super::*;

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "LOCALIZER_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Target language (ISO 639-1 code), also used to derive the data-<lang>-* marker attributes";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("ru".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang.len() != 2 || !lang.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 2 ASCII letters (ISO 639-1)".to_string(),
                });
            }
            Ok(lang)
        }
    }

    /// 重扫去抖间隔
    pub struct DebounceMs;
    impl EnvVar<Duration> for DebounceMs {
        const NAME: &'static str = "LOCALIZER_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(100));
        const DESCRIPTION: &'static str = "Debounce interval in milliseconds before a rescan pass";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_bounded_u64(value, Self::NAME, 1, 60_000)?;
            Ok(Duration::from_millis(millis))
        }
    }

    /// 单次投递链的最大轮数
    pub struct MaxDeliveryRounds;
    impl EnvVar<usize> for MaxDeliveryRounds {
        const NAME: &'static str = "LOCALIZER_MAX_DELIVERY_ROUNDS";
        const DEFAULT: Option<usize> = Some(32);
        const DESCRIPTION: &'static str =
            "Maximum observer delivery rounds per mutation before records are dropped";

        fn parse(value: &str) -> EnvResult<usize> {
            Ok(parse_bounded_u64(value, Self::NAME, 1, 10_000)? as usize)
        }
    }
}

/// 词典与规则来源
pub mod sources {
    use super::*;

    /// 词典路径或 URL
    pub struct Dictionary;
    impl EnvVar<String> for Dictionary {
        const NAME: &'static str = "LOCALIZER_DICTIONARY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Dictionary file path or http(s) URL";

        fn parse(value: &str) -> EnvResult<String> {
            non_empty(value, Self::NAME)
        }
    }

    /// 规则文件路径
    pub struct Rules;
    impl EnvVar<String> for Rules {
        const NAME: &'static str = "LOCALIZER_RULES";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Rule file path (.toml or .json)";

        fn parse(value: &str) -> EnvResult<String> {
            non_empty(value, Self::NAME)
        }
    }
}

/// 重写徽标文本开关
pub mod reconciler {
    use super::*;

    pub struct RewriteBadgeText;
    impl EnvVar<bool> for RewriteBadgeText {
        const NAME: &'static str = "LOCALIZER_REWRITE_BADGE_TEXT";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str =
            "Rewrite reused keyboard badges to the identifier written in the translation";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_bounded_u64(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<u64> {
    let num: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value must not be empty".to_string(),
        });
    }
    Ok(shellexpand::tilde(value).into_owned())
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: String,
    pub no_color: bool,
    pub target_lang: String,
    pub debounce: Duration,
    pub max_delivery_rounds: usize,
    pub rewrite_badge_text: bool,
    pub dictionary: Option<String>,
    pub rules: Option<String>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get()?,
            no_color: core::NoColor::get()?,
            target_lang: localizer::TargetLang::get()?,
            debounce: localizer::DebounceMs::get()?,
            max_delivery_rounds: localizer::MaxDeliveryRounds::get()?,
            rewrite_badge_text: reconciler::RewriteBadgeText::get()?,
            dictionary: sources::Dictionary::get().ok(),
            rules: sources::Rules::get().ok(),
        })
    }

    /// 打印配置摘要
    pub fn print_summary(&self) {
        println!("Environment Configuration Summary:");
        println!("  Log Level: {}", self.log_level);
        println!("  Target Language: {}", self.target_lang);
        println!("  Debounce: {} ms", self.debounce.as_millis());
        println!(
            "  Dictionary: {}",
            self.dictionary.as_deref().unwrap_or("[not set]")
        );
        println!("  Rules: {}", self.rules.as_deref().unwrap_or("[not set]"));
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"info\")\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));

    docs.push_str("\n## Localizer Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"ru\")\n",
        localizer::TargetLang::NAME,
        localizer::TargetLang::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        localizer::DebounceMs::NAME,
        localizer::DebounceMs::DESCRIPTION,
        localizer::DebounceMs::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        localizer::MaxDeliveryRounds::NAME,
        localizer::MaxDeliveryRounds::DESCRIPTION,
        localizer::MaxDeliveryRounds::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        reconciler::RewriteBadgeText::NAME,
        reconciler::RewriteBadgeText::DESCRIPTION,
        reconciler::RewriteBadgeText::DEFAULT
    ));

    docs.push_str("\n## Sources\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        sources::Dictionary::NAME,
        sources::Dictionary::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        sources::Rules::NAME,
        sources::Rules::DESCRIPTION
    ));

    docs
}
