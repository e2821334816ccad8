//! 翻译单元
//!
//! 对单个元素执行"匹配 → 替换 → 守卫"的原子操作。元素当前文本只有三种状态：
//! 原文（pristine）、已翻译（translated）、其他（foreign）。引擎只会发起
//! pristine → translated 的转换，其他内容一律不碰。

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::Localizer;
use crate::dom::{get_node_attr, text_content};
use crate::utils::normalize_text;

/// 元素文本相对于某条规则的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextState {
    Pristine,
    Translated,
    Foreign,
}

/// 判断文本状态，三者都先规范化再比较；译文优先于原文
pub fn classify(current: &str, original: &str, translation: &str) -> TextState {
    let current = normalize_text(current);

    if current == normalize_text(translation) {
        TextState::Translated
    } else if current == normalize_text(original) {
        TextState::Pristine
    } else {
        TextState::Foreign
    }
}

/// 元素是否带有标记属性
pub fn is_marked(element: &Handle, marker: &str) -> bool {
    get_node_attr(element, marker).as_deref() == Some("true")
}

pub(crate) fn mark(localizer: &Localizer, element: &Handle, marker: &str) {
    localizer.document().set_attribute(element, marker, "true");
}

/// 用给定译文执行匹配替换（词典查找已由调用方完成）
pub(crate) fn localize_text_value(
    localizer: &Localizer,
    element: &Handle,
    original: &str,
    translation: &str,
) -> bool {
    let current = text_content(element);
    if current.trim().is_empty() {
        return false;
    }

    match classify(&current, original, translation) {
        TextState::Translated => {
            localizer.protect_element(element, translation);
            false
        }
        TextState::Pristine => {
            localizer.document().set_text_content(element, translation);
            mark(localizer, element, &localizer.markers().localized);
            localizer.protect_element(element, translation);
            localizer.record(|stats| stats.elements_changed += 1);
            debug!(
                "{} 已翻译: \"{}\" → \"{}\"",
                localizer.config().log_prefix,
                normalize_text(original),
                translation
            );
            true
        }
        TextState::Foreign => false,
    }
}

impl Localizer {
    /// 文本匹配替换
    ///
    /// | 当前文本 | 词典有 key | 动作 | 返回 |
    /// |---|---|---|---|
    /// | 等于译文 | 是 | 仅（重新）注册守卫 | `false` |
    /// | 等于原文 | 是 | 替换文本、打标记、注册守卫 | `true` |
    /// | 等于原文 | 否 | 无 | `false` |
    /// | 其他 | - | 无 | `false` |
    pub fn localize_by_text(&self, element: &Handle, original: &str, key: &str) -> bool {
        match self.get_translation(key) {
            Some(translation) => localize_text_value(self, element, original, translation),
            None => false,
        }
    }

    /// 属性匹配替换（placeholder、aria-label、title 等）
    ///
    /// 与文本替换遵循同样的三态规则，但属性变化不在守卫的观察范围内，
    /// 所以既不打标记也不注册守卫，下一轮重扫自然会修复。
    pub fn localize_attribute(
        &self,
        element: &Handle,
        attribute: &str,
        original: &str,
        key: &str,
    ) -> bool {
        let Some(translation) = self.get_translation(key) else {
            return false;
        };
        let Some(current) = get_node_attr(element, attribute) else {
            return false;
        };

        match classify(&current, original, translation) {
            TextState::Pristine => {
                self.document().set_attribute(element, attribute, translation);
                self.record(|stats| stats.elements_changed += 1);
                debug!(
                    "{} 已翻译属性 {}: \"{}\" → \"{}\"",
                    self.config().log_prefix,
                    attribute,
                    current,
                    translation
                );
                true
            }
            TextState::Translated | TextState::Foreign => false,
        }
    }
}
