//! # 规则集
//!
//! 规则描述"页面上哪里有什么原文、对应词典里哪个 key"，本身不含逻辑，
//! 由引擎提供的原语执行。规则按声明顺序执行，找不到匹配元素时静默跳过。
//!
//! 规则文件支持 TOML 与 JSON：
//!
//! ```toml
//! [[rules]]
//! kind = "text"
//! selector = ".AppHeader-context-item-label"
//! original = "Dashboard"
//! key = "dashboard"
//! ```
//!
//! # 模块组织
//!
//! - `text` - 文本、文本表、属性规则
//! - `pattern` - 正则捕获规则
//! - `rich` - 徽标提示、链接、搜索占位符规则
//! - `time` - 相对时间元素规则

pub mod pattern;
pub mod rich;
pub mod text;
pub mod time;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::SelectorList;
use crate::engine::Localizer;
use crate::error::helpers::rule_error;
use crate::error::{LocalizerError, LocalizerResult};

pub use pattern::PatternRule;
pub use rich::{KbdHintRule, LinkRule, SearchPlaceholderRule};
pub use text::{AttributeRule, TextMapRule, TextRule};
pub use time::{translate_absolute_time, RelativeTimeRule};

/// 规则接口
///
/// 实现必须是尽力而为的：找不到元素、缺少译文都只是跳过，不能 panic。
pub trait Rule {
    fn name(&self) -> &str;
    fn apply(&self, ctx: &Localizer);
}

/// 有序规则集
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.name()))
            .finish()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条规则
    pub fn push<R: Rule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// 追加一条规则（链式）
    pub fn with<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.push(rule);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 编译声明式规则
    pub fn from_specs(specs: Vec<RuleSpec>) -> LocalizerResult<Self> {
        let rules = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let label = spec.label(index);
                spec.compile(&label).map_err(|e| e.with_context(label))
            })
            .collect::<LocalizerResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn from_toml_str(source: &str) -> LocalizerResult<Self> {
        let file: RuleFile = toml::from_str(source)?;
        Self::from_specs(file.rules)
    }

    pub fn from_json_str(source: &str) -> LocalizerResult<Self> {
        let file: RuleFile = serde_json::from_str(source)?;
        Self::from_specs(file.rules)
    }

    /// 从文件加载，按扩展名选择 TOML 或 JSON
    pub fn load<P: AsRef<Path>>(path: P) -> LocalizerResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            LocalizerError::IoError(format!("无法读取规则文件: {}", e)).with_context(path.display())
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let rules = if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_toml_str(&source)
        };
        rules.map_err(|e| e.with_context(path.display()))
    }
}

/// 规则文件
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// 正则规则中的一条模式
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternSpec {
    pub regex: String,
    pub key: String,
}

fn default_template() -> String {
    pattern::DEFAULT_TEMPLATE.to_string()
}

fn default_badge_selector() -> String {
    "kbd.hx_kbd".to_string()
}

fn default_time_selector() -> String {
    "relative-time".to_string()
}

/// 声明式规则
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleSpec {
    /// 文本完全匹配
    Text {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        original: String,
        key: String,
    },
    /// 同一选择器下多个原文 → key
    TextMap {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        entries: BTreeMap<String, String>,
    },
    /// 属性值匹配
    Attribute {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        attribute: String,
        original: String,
        key: String,
    },
    /// 正则捕获，例如 "Good morning, NAME!"
    Pattern {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        patterns: Vec<PatternSpec>,
        #[serde(default = "default_template")]
        template: String,
    },
    /// 带键盘徽标的提示
    KbdHint {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        tokens: Vec<String>,
        identifier: String,
        key: String,
        #[serde(default = "default_badge_selector")]
        badge: String,
        #[serde(default)]
        leading: Option<String>,
    },
    /// 包含一个链接的段落
    Link {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        original: String,
        key: String,
    },
    /// 搜索框占位符
    SearchPlaceholder {
        #[serde(default)]
        name: Option<String>,
        selector: String,
        tokens: Vec<String>,
        key: String,
    },
    /// `<relative-time>` 元素
    RelativeTime {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_time_selector")]
        selector: String,
    },
}

impl RuleSpec {
    fn explicit_name(&self) -> Option<&str> {
        match self {
            RuleSpec::Text { name, .. }
            | RuleSpec::TextMap { name, .. }
            | RuleSpec::Attribute { name, .. }
            | RuleSpec::Pattern { name, .. }
            | RuleSpec::KbdHint { name, .. }
            | RuleSpec::Link { name, .. }
            | RuleSpec::SearchPlaceholder { name, .. }
            | RuleSpec::RelativeTime { name, .. } => name.as_deref(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RuleSpec::Text { .. } => "text",
            RuleSpec::TextMap { .. } => "text-map",
            RuleSpec::Attribute { .. } => "attribute",
            RuleSpec::Pattern { .. } => "pattern",
            RuleSpec::KbdHint { .. } => "kbd-hint",
            RuleSpec::Link { .. } => "link",
            RuleSpec::SearchPlaceholder { .. } => "search-placeholder",
            RuleSpec::RelativeTime { .. } => "relative-time",
        }
    }

    /// 规则名：显式名称，或 `<kind>#<序号>`
    fn label(&self, index: usize) -> String {
        match self.explicit_name() {
            Some(name) => name.to_string(),
            None => format!("{}#{}", self.kind(), index + 1),
        }
    }

    fn compile(self, label: &str) -> LocalizerResult<Box<dyn Rule>> {
        let name = label.to_string();

        let rule: Box<dyn Rule> = match self {
            RuleSpec::Text {
                selector,
                original,
                key,
                ..
            } => Box::new(TextRule::new(name, SelectorList::parse(&selector)?, original, key)),
            RuleSpec::TextMap {
                selector, entries, ..
            } => Box::new(TextMapRule::new(
                name,
                SelectorList::parse(&selector)?,
                entries.into_iter().collect(),
            )),
            RuleSpec::Attribute {
                selector,
                attribute,
                original,
                key,
                ..
            } => Box::new(AttributeRule::new(
                name,
                SelectorList::parse(&selector)?,
                attribute,
                original,
                key,
            )),
            RuleSpec::Pattern {
                selector,
                patterns,
                template,
                ..
            } => {
                let patterns = patterns
                    .into_iter()
                    .map(|p| -> LocalizerResult<(Regex, String)> {
                        Ok((Regex::new(&p.regex)?, p.key))
                    })
                    .collect::<LocalizerResult<Vec<_>>>()?;
                Box::new(PatternRule::new(
                    name,
                    SelectorList::parse(&selector)?,
                    patterns,
                    template,
                ))
            }
            RuleSpec::KbdHint {
                selector,
                tokens,
                identifier,
                key,
                badge,
                leading,
                ..
            } => {
                if tokens.is_empty() {
                    return Err(rule_error("tokens 不能为空"));
                }
                let leading = leading.as_deref().map(SelectorList::parse).transpose()?;
                Box::new(KbdHintRule::new(
                    name,
                    SelectorList::parse(&selector)?,
                    tokens,
                    identifier,
                    key,
                    SelectorList::parse(&badge)?,
                    leading,
                ))
            }
            RuleSpec::Link {
                selector,
                original,
                key,
                ..
            } => Box::new(LinkRule::new(name, SelectorList::parse(&selector)?, original, key)),
            RuleSpec::SearchPlaceholder {
                selector,
                tokens,
                key,
                ..
            } => {
                if tokens.is_empty() {
                    return Err(rule_error("tokens 不能为空"));
                }
                Box::new(SearchPlaceholderRule::new(
                    name,
                    SelectorList::parse(&selector)?,
                    tokens,
                    key,
                ))
            }
            RuleSpec::RelativeTime { selector, .. } => {
                Box::new(RelativeTimeRule::new(name, SelectorList::parse(&selector)?))
            }
        };

        Ok(rule)
    }
}
