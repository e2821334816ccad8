//! 正则捕获规则
//!
//! 用于原文里夹着可变片段的文本，比如 "Good morning, octocat!"。
//! 模板中 `{translation}` 替换成译文，`{1}`、`{2}` … 替换成对应捕获组。

use markup5ever_rcdom::Handle;
use regex::{Captures, Regex};
use tracing::debug;

use super::Rule;
use crate::dom::{text_content, SelectorList};
use crate::engine::{unit, Localizer};
use crate::utils::normalize_text;

/// 默认模板
pub const DEFAULT_TEMPLATE: &str = "{translation}, {1}!";

#[derive(Debug)]
pub struct PatternRule {
    name: String,
    selector: SelectorList,
    patterns: Vec<(Regex, String)>,
    template: String,
}

impl PatternRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        patterns: Vec<(Regex, String)>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            patterns,
            template: template.into(),
        }
    }

    /// 当前文本是否已经以某条译文开头
    fn already_translated(&self, ctx: &Localizer, text: &str) -> bool {
        self.patterns
            .iter()
            .filter_map(|(_, key)| ctx.get_translation(key))
            .any(|translation| !translation.is_empty() && text.starts_with(translation))
    }

    fn localize(&self, ctx: &Localizer, element: &Handle) {
        let text = normalize_text(&text_content(element));
        if text.is_empty() {
            return;
        }

        if self.already_translated(ctx, &text) {
            ctx.protect_element(element, &text);
            return;
        }

        for (regex, key) in &self.patterns {
            let Some(captures) = regex.captures(&text) else {
                continue;
            };
            let Some(translation) = ctx.get_translation(key) else {
                continue;
            };

            let rendered = render_template(&self.template, translation, &captures);
            ctx.document().set_text_content(element, &rendered);
            unit::mark(ctx, element, &ctx.markers().localized);
            ctx.protect_element(element, &rendered);
            ctx.record(|stats| stats.elements_changed += 1);
            debug!("{} 已翻译: \"{}\" → \"{}\"", ctx.config().log_prefix, text, rendered);
            return;
        }
    }
}

impl Rule for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            self.localize(ctx, &element);
        }
    }
}

/// 展开模板
pub fn render_template(template: &str, translation: &str, captures: &Captures<'_>) -> String {
    let mut rendered = template.replace("{translation}", translation);

    // 倒序替换，避免 {1} 吃掉 {10} 的前缀
    for index in (1..captures.len()).rev() {
        let value = captures.get(index).map_or("", |m| m.as_str()).trim();
        rendered = rendered.replace(&format!("{{{}}}", index), value);
    }

    rendered
}
