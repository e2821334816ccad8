//! 本地化引擎统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。缺失翻译、结构不匹配等情况
//! 不会产生错误（引擎静默跳过），这里的错误只出现在加载阶段和宿主回调中。

use std::fmt;

use thiserror::Error;

/// 本地化错误类型
#[derive(Error, Debug, Clone)]
pub enum LocalizerError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 选择器语法错误
    #[error("选择器无效: {0}")]
    SelectorError(String),

    /// 规则定义错误
    #[error("规则无效: {0}")]
    RuleError(String),

    /// 词典加载错误
    #[error("词典错误: {0}")]
    DictionaryError(String),

    /// 宿主页面回调错误
    #[error("宿主回调失败: {0}")]
    HostError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),
}

impl LocalizerError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LocalizerError::ConfigError(_) => ErrorSeverity::Critical,
            LocalizerError::IoError(_) => ErrorSeverity::Error,
            LocalizerError::ParseError(_) => ErrorSeverity::Error,
            LocalizerError::SelectorError(_) => ErrorSeverity::Error,
            LocalizerError::RuleError(_) => ErrorSeverity::Error,
            LocalizerError::DictionaryError(_) => ErrorSeverity::Critical,
            LocalizerError::HostError(_) => ErrorSeverity::Warning,
            LocalizerError::SerializationError(_) => ErrorSeverity::Error,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocalizerError::ConfigError(_) => ErrorCategory::Configuration,
            LocalizerError::IoError(_) => ErrorCategory::Io,
            LocalizerError::ParseError(_) => ErrorCategory::Parsing,
            LocalizerError::SelectorError(_) => ErrorCategory::Rules,
            LocalizerError::RuleError(_) => ErrorCategory::Rules,
            LocalizerError::DictionaryError(_) => ErrorCategory::Bootstrap,
            LocalizerError::HostError(_) => ErrorCategory::Host,
            LocalizerError::SerializationError(_) => ErrorCategory::Serialization,
        }
    }

    /// 启动阶段的错误会让引擎放弃初始化，文档保持原语言
    pub fn is_bootstrap_failure(&self) -> bool {
        !matches!(self, LocalizerError::HostError(_))
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = match &self {
            LocalizerError::ConfigError(msg)
            | LocalizerError::IoError(msg)
            | LocalizerError::ParseError(msg)
            | LocalizerError::SelectorError(msg)
            | LocalizerError::RuleError(msg)
            | LocalizerError::DictionaryError(msg)
            | LocalizerError::HostError(msg)
            | LocalizerError::SerializationError(msg) => format!("{} (上下文: {})", msg, context),
        };

        match &mut self {
            LocalizerError::ConfigError(ref mut msg)
            | LocalizerError::IoError(ref mut msg)
            | LocalizerError::ParseError(ref mut msg)
            | LocalizerError::SelectorError(ref mut msg)
            | LocalizerError::RuleError(ref mut msg)
            | LocalizerError::DictionaryError(ref mut msg)
            | LocalizerError::HostError(ref mut msg)
            | LocalizerError::SerializationError(ref mut msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Parsing,
    Rules,
    Bootstrap,
    Host,
    Serialization,
}

impl From<std::io::Error> for LocalizerError {
    fn from(error: std::io::Error) -> Self {
        LocalizerError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for LocalizerError {
    fn from(error: serde_json::Error) -> Self {
        LocalizerError::SerializationError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for LocalizerError {
    fn from(error: toml::de::Error) -> Self {
        LocalizerError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<regex::Error> for LocalizerError {
    fn from(error: regex::Error) -> Self {
        LocalizerError::RuleError(format!("正则表达式错误: {}", error))
    }
}

/// 错误结果类型别名
pub type LocalizerResult<T> = Result<T, LocalizerError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: LocalizerError) -> LocalizerResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("本地化信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("本地化警告: {}", error),
            ErrorSeverity::Error => tracing::error!("本地化错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("本地化严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> LocalizerError {
        LocalizerError::ConfigError(msg.to_string())
    }

    /// 创建规则错误
    pub fn rule_error<T: fmt::Display>(msg: T) -> LocalizerError {
        LocalizerError::RuleError(msg.to_string())
    }

    /// 创建宿主回调错误
    pub fn host_error<T: fmt::Display>(msg: T) -> LocalizerError {
        LocalizerError::HostError(msg.to_string())
    }
}
