//! 译文守卫
//!
//! 每个已翻译元素最多一个子树观察者。宿主页面改写元素内容后，守卫按
//! "当前状态是否满足期望"来判断（电平触发），不满足就重新写入译文。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::{unit, Localizer};
use crate::dom::node::find_descendant_by_name;
use crate::dom::{text_content, Document, NodeKey, ObserveOptions, ObserverId, SelectorList};
use crate::reconciler::{self, PlaceholderMap};
use crate::utils::{contains_all, normalize_text};

/// 守卫期望的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardKind {
    /// 纯文本：规范化文本等于译文
    Text { translation: String },
    /// 富内容：不含原文词元、文本等于译文渲染结果、需要时含有徽标
    ///
    /// `leading` 匹配到的前导元素保留在译文前面（例如加粗的 "Tip:"）。
    Rich {
        translation: String,
        original_tokens: Vec<String>,
        marker: String,
        leading: Option<SelectorList>,
    },
    /// 链接：文本等于译文渲染结果，链接元素保留
    Link { translation: String },
}

struct GuardRecord {
    element: Handle,
    observer: ObserverId,
    kind: GuardKind,
}

/// 守卫表，以节点身份为键
///
/// 记录持有元素的强引用，所以元素存活期间键不会被复用。
#[derive(Default)]
pub struct GuardRegistry {
    records: RefCell<HashMap<NodeKey, GuardRecord>>,
}

impl GuardRegistry {
    pub fn is_guarded(&self, element: &Handle) -> bool {
        self.records.borrow().contains_key(&NodeKey::of(element))
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// 元素的守卫类型
    pub fn kind_of(&self, element: &Handle) -> Option<GuardKind> {
        self.records
            .borrow()
            .get(&NodeKey::of(element))
            .map(|record| record.kind.clone())
    }

    fn lookup(&self, key: NodeKey) -> Option<(Handle, GuardKind)> {
        self.records
            .borrow()
            .get(&key)
            .map(|record| (record.element.clone(), record.kind.clone()))
    }

    fn insert(&self, element: &Handle, observer: ObserverId, kind: GuardKind) {
        self.records.borrow_mut().insert(
            NodeKey::of(element),
            GuardRecord {
                element: element.clone(),
                observer,
                kind,
            },
        );
    }

    /// 释放已脱离文档的守卫，返回释放数量
    pub(crate) fn sweep(&self, document: &Document) -> usize {
        let detached: Vec<(NodeKey, ObserverId)> = self
            .records
            .borrow()
            .iter()
            .filter(|(_, record)| !document.is_connected(&record.element))
            .map(|(key, record)| (*key, record.observer))
            .collect();

        let mut records = self.records.borrow_mut();
        for (key, observer) in &detached {
            records.remove(key);
            document.disconnect(*observer);
        }

        detached.len()
    }

    /// 释放全部守卫
    pub(crate) fn release_all(&self, document: &Document) {
        for (_, record) in self.records.borrow_mut().drain() {
            document.disconnect(record.observer);
        }
    }
}

impl Localizer {
    /// 为已翻译元素注册纯文本守卫（幂等）
    pub fn protect_element(&self, element: &Handle, translation: &str) {
        self.install_guard(
            element,
            GuardKind::Text {
                translation: translation.to_string(),
            },
        );
    }

    /// 为搜索占位符注册富内容守卫（幂等）
    ///
    /// 守卫在以下任一情况下重新渲染：文本仍含原文词元、文本与译文不一致、
    /// 译文需要徽标而元素里没有徽标。
    pub fn protect_search_element(
        &self,
        element: &Handle,
        translation: &str,
        original_tokens: &[String],
    ) {
        let marker = self.markers().search.clone();
        self.protect_rich_element(element, translation, original_tokens, &marker, None);
    }

    pub(crate) fn protect_rich_element(
        &self,
        element: &Handle,
        translation: &str,
        original_tokens: &[String],
        marker: &str,
        leading: Option<&SelectorList>,
    ) {
        let original_tokens =
            residual_tokens(&reconciler::plain_text(translation), original_tokens);

        self.install_guard(
            element,
            GuardKind::Rich {
                translation: translation.to_string(),
                original_tokens,
                marker: marker.to_string(),
                leading: leading.cloned(),
            },
        );
    }

    pub(crate) fn protect_link_element(&self, element: &Handle, translation: &str) {
        self.install_guard(
            element,
            GuardKind::Link {
                translation: translation.to_string(),
            },
        );
    }

    fn install_guard(&self, element: &Handle, kind: GuardKind) {
        if self.guards().is_guarded(element) {
            return;
        }

        let key = NodeKey::of(element);
        let localizer = self.weak();
        let observer = self.document().observe(
            element,
            ObserveOptions::text_subtree(),
            Rc::new(move |_document, _records| {
                if let Some(localizer) = localizer.upgrade() {
                    localizer.enforce_guard(key);
                }
            }),
        );

        self.guards().insert(element, observer, kind);
    }

    /// 检查守卫期望，不满足时重写
    fn enforce_guard(&self, key: NodeKey) {
        let Some((element, kind)) = self.guards().lookup(key) else {
            return;
        };

        let repaired = match &kind {
            GuardKind::Text { translation } => {
                if normalize_text(&text_content(&element)) == normalize_text(translation) {
                    false
                } else {
                    self.document().set_text_content(&element, translation);
                    true
                }
            }
            GuardKind::Rich {
                translation,
                original_tokens,
                marker,
                leading,
            } => {
                let leading = leading.as_ref();
                if self.rich_content_holds_with(&element, translation, original_tokens, leading) {
                    false
                } else {
                    self.render_rich_with(&element, translation, leading);
                    if !unit::is_marked(&element, marker) {
                        unit::mark(self, &element, marker);
                    }
                    true
                }
            }
            GuardKind::Link { translation } => {
                if normalize_text(&text_content(&element)) == reconciler::plain_text(translation) {
                    false
                } else {
                    self.render_link(&element, translation);
                    true
                }
            }
        };

        if repaired {
            self.record(|stats| stats.guard_repairs += 1);
            debug!("{} 守卫已恢复被改写的译文", self.config().log_prefix);
        }
    }

    /// 富内容是否处于期望状态
    pub(crate) fn rich_content_holds(
        &self,
        element: &Handle,
        translation: &str,
        original_tokens: &[String],
    ) -> bool {
        self.rich_content_holds_with(element, translation, original_tokens, None)
    }

    pub(crate) fn rich_content_holds_with(
        &self,
        element: &Handle,
        translation: &str,
        original_tokens: &[String],
        leading: Option<&SelectorList>,
    ) -> bool {
        let plain = reconciler::plain_text(translation);
        let expected = match leading.and_then(|selector| selector.select_first(element)) {
            Some(node) => normalize_text(&format!("{} {}", text_content(&node), plain)),
            None => plain.clone(),
        };

        let current = normalize_text(&text_content(element));
        let residual = residual_tokens(&plain, original_tokens);
        let has_original = contains_all(&current, &residual);
        let badge_ok = !reconciler::has_badge(translation)
            || find_descendant_by_name(element, &self.config().badge_tag).is_some();

        !has_original && current == expected && badge_ok
    }

    /// 重新渲染富内容
    pub(crate) fn render_rich(&self, element: &Handle, translation: &str) {
        self.render_rich_with(element, translation, None);
    }

    /// 重新渲染富内容，`leading` 匹配到的前导元素保留在最前面
    ///
    /// 复用元素里现存的徽标；缺少的徽标会新建，保证渲染结果一定满足守卫条件。
    pub(crate) fn render_rich_with(
        &self,
        element: &Handle,
        translation: &str,
        leading: Option<&SelectorList>,
    ) {
        let leading = leading.and_then(|selector| selector.select_first(element));
        let badge_tag = self.config().badge_tag.clone();
        let mut existing = PlaceholderMap::from_descendants(element, &badge_tag);
        let mut placeholders = PlaceholderMap::new();

        for segment in reconciler::parse_segments(translation) {
            if let reconciler::Segment::Badge(identifier) = segment {
                let badge = existing.take(identifier, &badge_tag).unwrap_or_else(|| {
                    self.document()
                        .create_element(&badge_tag, &[("class", "hx_kbd")])
                });
                placeholders.insert(identifier, badge);
            }
        }

        self.document().batch(|| {
            let fragment = self.reconciler().reconcile(translation, &mut placeholders);
            let mut nodes = Vec::with_capacity(fragment.len() + 2);
            if let Some(leading) = leading {
                nodes.push(leading);
                nodes.push(self.document().create_text(" "));
            }
            nodes.extend(fragment.into_nodes());
            self.document().replace_children(element, nodes);
        });
    }

    /// 重新渲染链接内容，没有链接时退回纯文本
    pub(crate) fn render_link(&self, element: &Handle, translation: &str) {
        let anchor = find_descendant_by_name(element, "a");

        self.document().batch(|| {
            let fragment =
                anchor.and_then(|anchor| self.reconciler().reconcile_link(translation, &anchor));
            match fragment {
                Some(fragment) => self
                    .document()
                    .replace_children(element, fragment.into_nodes()),
                None => self
                    .document()
                    .set_text_content(element, &reconciler::plain_text(translation)),
            }
        });
    }
}

/// 去掉译文本身也包含的词元，这些词元不能用来判断"原文是否回来了"
fn residual_tokens(expected: &str, original_tokens: &[String]) -> Vec<String> {
    original_tokens
        .iter()
        .filter(|token| !token.is_empty() && !expected.contains(token.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::SelectorList;
    use crate::rules::RuleSet;

    fn setup(body: &str, dictionary: &str) -> (Rc<Localizer>, Handle) {
        let document = Rc::new(
            Document::parse_str(&format!("<html><body>{}</body></html>", body))
                .expect("HTML should parse"),
        );
        let selectors = SelectorList::parse("#target").expect("selector");
        let element = document.query_selector(&selectors).expect("target element");
        (Localizer::new(dictionary, document, RuleSet::new()), element)
    }

    #[test]
    fn test_text_guard_reverts_host_overwrite() {
        let (localizer, element) =
            setup("<span id=\"target\">Dashboard</span>", "dashboard = Главная");
        assert!(localizer.localize_by_text(&element, "Dashboard", "dashboard"));

        localizer.document().set_text_content(&element, "Dashboard");

        assert_eq!(text_content(&element), "Главная");
        assert_eq!(localizer.stats().guard_repairs, 1);
    }

    #[test]
    fn test_guard_reacts_to_text_node_edits() {
        let (localizer, element) =
            setup("<span id=\"target\">Dashboard</span>", "dashboard = Главная");
        assert!(localizer.localize_by_text(&element, "Dashboard", "dashboard"));

        let text_node = element.children.borrow()[0].clone();
        localizer.document().set_data(&text_node, "Home");

        assert_eq!(text_content(&element), "Главная");
    }

    #[test]
    fn test_registration_is_idempotent() {
        let (localizer, element) = setup("<span id=\"target\">x</span>", "");
        localizer.protect_element(&element, "x");
        localizer.protect_element(&element, "y");
        localizer.protect_element(&element, "x");

        assert_eq!(localizer.guards().len(), 1);
        assert_eq!(localizer.document().observer_count(), 1);
        assert_eq!(
            localizer.guards().kind_of(&element),
            Some(GuardKind::Text {
                translation: "x".to_string()
            })
        );
    }

    #[test]
    fn test_search_guard_rerenders_badge() {
        let (localizer, element) = setup(
            "<span id=\"target\">Type <kbd class=\"hx_kbd\">/</kbd> to search</span>",
            "",
        );
        let translation = "Введите [kbd]/[/kbd] для поиска";
        let tokens = vec!["Type".to_string(), "to search".to_string()];

        localizer.render_rich(&element, translation);
        localizer.protect_search_element(&element, translation, &tokens);
        assert_eq!(normalize_text(&text_content(&element)), "Введите / для поиска");

        // 宿主把内容换成了不带徽标的原文
        localizer.document().set_text_content(&element, "Type / to search");

        assert_eq!(normalize_text(&text_content(&element)), "Введите / для поиска");
        assert!(find_descendant_by_name(&element, "kbd").is_some());
        assert!(unit::is_marked(&element, "data-ru-search-localized"));
    }

    #[test]
    fn test_detached_guards_are_swept() {
        let (localizer, element) =
            setup("<span id=\"target\">Dashboard</span>", "dashboard = Главная");
        assert!(localizer.localize_by_text(&element, "Dashboard", "dashboard"));

        localizer.document().remove(&element);
        localizer.run();

        assert_eq!(localizer.guards().len(), 0);
        assert_eq!(localizer.document().observer_count(), 0);
    }
}
