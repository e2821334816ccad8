//! 纯文本与属性规则

use markup5ever_rcdom::Handle;

use super::Rule;
use crate::dom::{text_content, SelectorList};
use crate::engine::Localizer;
use crate::utils::normalize_text;

/// 选择器命中的元素文本等于原文时替换成译文
#[derive(Debug)]
pub struct TextRule {
    name: String,
    selector: SelectorList,
    original: String,
    key: String,
}

impl TextRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        original: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            original: original.into(),
            key: key.into(),
        }
    }
}

impl Rule for TextRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            ctx.localize_by_text(&element, &self.original, &self.key);
        }
    }
}

/// 同一选择器下的多条"原文 → key"映射
///
/// 例如命令面板的分组标题（Pages、Repositories、Users 共用一个选择器）。
#[derive(Debug)]
pub struct TextMapRule {
    name: String,
    selector: SelectorList,
    entries: Vec<(String, String)>,
}

impl TextMapRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        entries: Vec<(String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            entries,
        }
    }

    /// 找出当前文本对应的条目：原文或译文相同都算
    fn entry_for(&self, ctx: &Localizer, element: &Handle) -> Option<&(String, String)> {
        let current = normalize_text(&text_content(element));
        if current.is_empty() {
            return None;
        }

        self.entries.iter().find(|(original, key)| {
            normalize_text(original) == current
                || ctx
                    .get_translation(key)
                    .is_some_and(|translation| normalize_text(translation) == current)
        })
    }
}

impl Rule for TextMapRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            if let Some((original, key)) = self.entry_for(ctx, &element) {
                ctx.localize_by_text(&element, original, key);
            }
        }
    }
}

/// 属性值等于原文时替换成译文
#[derive(Debug)]
pub struct AttributeRule {
    name: String,
    selector: SelectorList,
    attribute: String,
    original: String,
    key: String,
}

impl AttributeRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        attribute: impl Into<String>,
        original: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            attribute: attribute.into(),
            original: original.into(),
            key: key.into(),
        }
    }
}

impl Rule for AttributeRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            ctx.localize_attribute(&element, &self.attribute, &self.original, &self.key);
        }
    }
}
