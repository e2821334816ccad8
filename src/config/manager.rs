//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::{LocalizerError, LocalizerResult};

/// 本地化引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// 目标语言，同时决定标记属性名（`data-<lang>-localized` 等）
    pub target_lang: String,
    pub debounce_ms: u64,
    pub max_delivery_rounds: usize,
    pub rewrite_badge_text: bool,
    pub badge_tag: String,
    pub log_prefix: String,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            max_delivery_rounds: constants::DEFAULT_MAX_DELIVERY_ROUNDS,
            rewrite_badge_text: true,
            badge_tag: constants::DEFAULT_BADGE_TAG.to_string(),
            log_prefix: constants::DEFAULT_LOG_PREFIX.to_string(),
        }
    }
}

impl LocalizerConfig {
    /// 创建带指定语言的默认配置
    pub fn with_lang(target_lang: &str) -> Self {
        Self {
            target_lang: target_lang.to_lowercase(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> LocalizerResult<()> {
        if self.target_lang.is_empty()
            || !self
                .target_lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(LocalizerError::ConfigError(format!(
                "目标语言无效: '{}'",
                self.target_lang
            )));
        }

        if self.debounce_ms == 0 {
            return Err(LocalizerError::ConfigError("去抖间隔不能为0".to_string()));
        }

        if self.max_delivery_rounds == 0 {
            return Err(LocalizerError::ConfigError("最大投递轮数不能为0".to_string()));
        }

        if self.badge_tag.trim().is_empty() {
            return Err(LocalizerError::ConfigError("徽标标签名不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖（使用类型安全环境变量系统）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{localizer, reconciler, EnvVar};

        if std::env::var(localizer::TargetLang::NAME).is_ok() {
            match localizer::TargetLang::get() {
                Ok(lang) => {
                    tracing::info!("环境变量覆盖目标语言: {}", lang);
                    self.target_lang = lang;
                }
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if std::env::var(localizer::DebounceMs::NAME).is_ok() {
            match localizer::DebounceMs::get() {
                Ok(debounce) => self.debounce_ms = debounce.as_millis() as u64,
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if std::env::var(localizer::MaxDeliveryRounds::NAME).is_ok() {
            match localizer::MaxDeliveryRounds::get() {
                Ok(rounds) => self.max_delivery_rounds = rounds,
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if std::env::var(reconciler::RewriteBadgeText::NAME).is_ok() {
            match reconciler::RewriteBadgeText::get() {
                Ok(rewrite) => self.rewrite_badge_text = rewrite,
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }
    }

    /// 转换为Duration类型
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 由目标语言派生出的标记属性名
    pub fn markers(&self) -> Markers {
        Markers::for_lang(&self.target_lang)
    }
}

/// 标记属性名
///
/// 不同关注点使用不同的属性，互不干扰。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// 通用：`data-<lang>-localized`
    pub localized: String,
    /// 搜索占位符：`data-<lang>-search-localized`
    pub search: String,
    /// 时间元素：`data-<lang>-translated`
    pub time: String,
}

impl Markers {
    pub fn for_lang(lang: &str) -> Self {
        Self {
            localized: format!("data-{}-localized", lang),
            search: format!("data-{}-search-localized", lang),
            time: format!("data-{}-translated", lang),
        }
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: LocalizerConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器：配置文件 → 环境变量覆盖 → 验证
    pub fn new() -> LocalizerResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file<P: AsRef<Path>>(path: P) -> LocalizerResult<Self> {
        Self::load_dotenv();

        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> LocalizerConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> LocalizerResult<LocalizerConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(Path::new(expanded_path.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(LocalizerConfig::default())
    }

    /// 从指定文件加载配置（按扩展名选择 TOML 或 JSON）
    fn load_from_file(path: &Path) -> LocalizerResult<LocalizerConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LocalizerError::ConfigError(format!("读取配置文件失败: {}", e))
                .with_context(path.display())
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| LocalizerError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| LocalizerError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> LocalizerResult<()> {
        let config = LocalizerConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| LocalizerError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LocalizerError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
