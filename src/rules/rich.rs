//! 富内容规则：键盘徽标提示、链接段落、搜索占位符
//!
//! 这些元素里夹着宿主页面的活节点（`<kbd>`、`<a>`），翻译时必须复用原节点，
//! 不能整体改写 textContent。

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::Rule;
use crate::dom::{text_content, SelectorList};
use crate::engine::{unit, Localizer};
use crate::reconciler::{plain_text, PlaceholderMap};
use crate::utils::{contains_all, normalize_text};

/// 带键盘徽标的提示，例如命令面板底部的 "Tip: Type # to search pull requests"
///
/// 元素文本包含全部 `tokens` 且徽标文本等于 `identifier` 时才会翻译。
/// 配置了 `leading` 时，匹配到的前导元素（通常是加粗的 "Tip:"）原样保留在最前面。
#[derive(Debug)]
pub struct KbdHintRule {
    name: String,
    selector: SelectorList,
    tokens: Vec<String>,
    identifier: String,
    key: String,
    badge: SelectorList,
    leading: Option<SelectorList>,
}

impl KbdHintRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        tokens: Vec<String>,
        identifier: impl Into<String>,
        key: impl Into<String>,
        badge: SelectorList,
        leading: Option<SelectorList>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            tokens,
            identifier: identifier.into(),
            key: key.into(),
            badge,
            leading,
        }
    }

    fn localize(&self, ctx: &Localizer, element: &Handle) {
        let Some(translation) = ctx.get_translation(&self.key) else {
            return;
        };

        let leading = self.leading.as_ref();
        if ctx.rich_content_holds_with(element, translation, &self.tokens, leading) {
            ctx.protect_rich_element(
                element,
                translation,
                &self.tokens,
                &ctx.markers().localized,
                leading,
            );
            return;
        }

        let text = normalize_text(&text_content(element));
        if !contains_all(&text, &self.tokens) {
            return;
        }

        let Some(badge) = self.badge.select_first(element) else {
            return;
        };
        if normalize_text(&text_content(&badge)) != self.identifier {
            return;
        }

        let mut placeholders = PlaceholderMap::new();
        placeholders.insert(self.identifier.clone(), badge);

        match leading.and_then(|selector| selector.select_first(element)) {
            Some(node) => {
                self.localize_with_leading(ctx, element, &node, translation, placeholders)
            }
            None => {
                ctx.replace_content_with_kbd_translation(
                    element,
                    &self.key,
                    placeholders,
                    &self.tokens,
                );
            }
        }
    }

    /// 保留前导元素，后面接一个空格和译文
    fn localize_with_leading(
        &self,
        ctx: &Localizer,
        element: &Handle,
        leading: &Handle,
        translation: &str,
        mut placeholders: PlaceholderMap,
    ) {
        let document = ctx.document();
        document.batch(|| {
            let fragment = ctx.create_fragment_from_kbd_translation(translation, &mut placeholders);
            let mut nodes = vec![leading.clone(), document.create_text(" ")];
            nodes.extend(fragment.into_nodes());
            document.replace_children(element, nodes);
        });

        let marker = &ctx.markers().localized;
        unit::mark(ctx, element, marker);
        ctx.protect_rich_element(element, translation, &self.tokens, marker, self.leading.as_ref());
        ctx.record(|stats| stats.elements_changed += 1);
        debug!("{} 已重建提示内容: {}", ctx.config().log_prefix, self.key);
    }
}

impl Rule for KbdHintRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            self.localize(ctx, &element);
        }
    }
}

/// 只含一个链接的段落，例如 Cookie 提示
#[derive(Debug)]
pub struct LinkRule {
    name: String,
    selector: SelectorList,
    original: String,
    key: String,
}

impl LinkRule {
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

impl Rule for LinkRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            ctx.replace_content_with_link_translation(&element, &self.original, &self.key);
        }
    }
}

/// 搜索框里的 "Type / to search" 占位提示
///
/// 宿主页面会频繁重绘这个元素，所以它有专门的标记属性和富内容守卫。
#[derive(Debug)]
pub struct SearchPlaceholderRule {
    name: String,
    selector: SelectorList,
    tokens: Vec<String>,
    key: String,
}

impl SearchPlaceholderRule {
    pub fn new(
        name: impl Into<String>,
        selector: SelectorList,
        tokens: Vec<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            tokens,
            key: key.into(),
        }
    }

    fn localize(&self, ctx: &Localizer, element: &Handle, translation: &str) {
        let current = normalize_text(&text_content(element));
        let has_original = contains_all(&current, &self.tokens);
        let marker = &ctx.markers().search;

        if unit::is_marked(element, marker) {
            if (current.is_empty() || has_original)
                && !ctx.rich_content_holds(element, translation, &self.tokens)
            {
                ctx.render_rich(element, translation);
            }
            ctx.protect_search_element(element, translation, &self.tokens);
            return;
        }

        if !has_original {
            return;
        }

        ctx.render_rich(element, translation);
        unit::mark(ctx, element, marker);
        ctx.protect_search_element(element, translation, &self.tokens);
        ctx.record(|stats| stats.elements_changed += 1);
        debug!("{} 已翻译搜索占位符", ctx.config().log_prefix);
    }
}

impl Rule for SearchPlaceholderRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        let Some(translation) = ctx.get_translation(&self.key) else {
            return;
        };
        if plain_text(translation).is_empty() {
            return;
        }

        for element in ctx.document().query_selector_all(&self.selector) {
            self.localize(ctx, &element, translation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_descendant_by_name, Document, NodeKey};
    use crate::rules::RuleSet;
    use std::rc::Rc;

    fn selector(source: &str) -> SelectorList {
        SelectorList::parse(source).expect("selector")
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn setup(body: &str, dictionary: &str, rules: RuleSet) -> (Rc<Localizer>, Handle) {
        let document = Rc::new(Document::parse_str(body).expect("HTML should parse"));
        let element = document
            .query_selector(&selector("#target"))
            .expect("target element");
        (Localizer::new(dictionary, document, rules), element)
    }

    fn hint_rule(leading: Option<&str>) -> KbdHintRule {
        KbdHintRule::new(
            "pull-request-hint",
            selector("#target"),
            tokens(&["Type", "to search pull requests"]),
            "#",
            "type-hash-to-search-pull-requests",
            selector("kbd.hx_kbd"),
            leading.map(selector),
        )
    }

    const HINT_DICTIONARY: &str =
        "type-hash-to-search-pull-requests = Введите [kbd]#[/kbd] для поиска запросов";

    #[test]
    fn test_kbd_hint_reuses_badge() {
        let (localizer, element) = setup(
            "<div id=\"target\">Type <kbd class=\"hx_kbd\">#</kbd> to search pull requests</div>",
            HINT_DICTIONARY,
            RuleSet::new().with(hint_rule(None)),
        );
        let badge = find_descendant_by_name(&element, "kbd").expect("badge");

        localizer.run();
        localizer.run();

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Введите # для поиска запросов"
        );
        let after = find_descendant_by_name(&element, "kbd").expect("badge survives");
        assert_eq!(NodeKey::of(&after), NodeKey::of(&badge));
        assert_eq!(localizer.stats().elements_changed, 1);
        assert!(localizer.guards().is_guarded(&element));
    }

    #[test]
    fn test_kbd_hint_keeps_leading_element() {
        let (localizer, element) = setup(
            "<div id=\"target\"><span class=\"text-bold\">Tip:</span> \
             Type <kbd class=\"hx_kbd\">#</kbd> to search pull requests</div>",
            HINT_DICTIONARY,
            RuleSet::new().with(hint_rule(Some("span.text-bold"))),
        );

        localizer.run();

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Tip: Введите # для поиска запросов"
        );
        assert!(unit::is_marked(&element, "data-ru-localized"));
    }

    #[test]
    fn test_kbd_hint_with_leading_survives_host_rerender() {
        let (localizer, element) = setup(
            "<div id=\"target\"><span class=\"text-bold\">Tip:</span> \
             Type <kbd class=\"hx_kbd\">#</kbd> to search pull requests</div>",
            HINT_DICTIONARY,
            RuleSet::new().with(hint_rule(Some("span.text-bold"))),
        );

        localizer.run();
        assert!(localizer.guards().is_guarded(&element));

        // 宿主用新节点重绘了整段英文提示
        let document = localizer.document();
        let leading = document.create_element("span", &[("class", "text-bold")]);
        document.append_child(&leading, &document.create_text("Tip:"));
        let badge = document.create_element("kbd", &[("class", "hx_kbd")]);
        document.append_child(&badge, &document.create_text("#"));
        document.replace_children(
            &element,
            vec![
                leading,
                document.create_text(" Type "),
                badge,
                document.create_text(" to search pull requests"),
            ],
        );

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Tip: Введите # для поиска запросов"
        );
        assert!(localizer.stats().guard_repairs >= 1);

        localizer.run();
        assert_eq!(
            normalize_text(&text_content(&element)),
            "Tip: Введите # для поиска запросов"
        );
        assert_eq!(localizer.stats().elements_changed, 1);
    }

    #[test]
    fn test_kbd_hint_retranslates_marked_element_without_guard() {
        let (localizer, element) = setup(
            "<div id=\"target\" data-ru-localized=\"true\">\
             Type <kbd class=\"hx_kbd\">#</kbd> to search pull requests</div>",
            HINT_DICTIONARY,
            RuleSet::new().with(hint_rule(None)),
        );

        localizer.run();

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Введите # для поиска запросов"
        );
        assert_eq!(localizer.stats().elements_changed, 1);
    }

    #[test]
    fn test_kbd_hint_requires_matching_badge() {
        let (localizer, element) = setup(
            "<div id=\"target\">Type <kbd class=\"hx_kbd\">@</kbd> to search pull requests</div>",
            HINT_DICTIONARY,
            RuleSet::new().with(hint_rule(None)),
        );

        localizer.run();

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Type @ to search pull requests"
        );
    }

    #[test]
    fn test_link_rule_keeps_anchor() {
        let (localizer, element) = setup(
            "<p id=\"target\">We use optional cookies. \
             <a href=\"/settings\">Manage cookies</a> any time.</p>",
            "cookies = Мы используем cookie. [link]Настроить[/link] можно всегда.",
            RuleSet::new().with(LinkRule::new(
                "cookies",
                selector("#target"),
                "We use optional cookies. Manage cookies any time.",
                "cookies",
            )),
        );
        let anchor = find_descendant_by_name(&element, "a").expect("anchor");

        localizer.run();

        assert_eq!(
            normalize_text(&text_content(&element)),
            "Мы используем cookie. Настроить можно всегда."
        );
        let after = find_descendant_by_name(&element, "a").expect("anchor survives");
        assert_eq!(NodeKey::of(&after), NodeKey::of(&anchor));
        assert_eq!(text_content(&after), "Настроить");

        // 宿主把原文写回来，守卫恢复译文
        localizer
            .document()
            .set_text_content(&after, "Manage cookies");
        assert_eq!(
            normalize_text(&text_content(&element)),
            "Мы используем cookie. Настроить можно всегда."
        );
    }

    #[test]
    fn test_search_placeholder_lifecycle() {
        let (localizer, element) = setup(
            "<span id=\"target\">Type <kbd class=\"hx_kbd\">/</kbd> to search</span>",
            "type-slash-to-search = Введите [kbd]/[/kbd] для поиска",
            RuleSet::new().with(SearchPlaceholderRule::new(
                "search",
                selector("#target"),
                tokens(&["Type", "to search"]),
                "type-slash-to-search",
            )),
        );

        localizer.run();
        assert_eq!(normalize_text(&text_content(&element)), "Введите / для поиска");
        assert!(unit::is_marked(&element, "data-ru-search-localized"));

        localizer.document().set_text_content(&element, "");
        assert_eq!(normalize_text(&text_content(&element)), "Введите / для поиска");
        assert!(find_descendant_by_name(&element, "kbd").is_some());

        localizer.run();
        assert_eq!(localizer.stats().elements_changed, 1);
    }
}
