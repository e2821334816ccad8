//! 本地化引擎
//!
//! [`Localizer`] 是引擎的唯一入口：持有词典、规则集、守卫表和重扫调度器。
//! 它总是以 `Rc` 形式存在，守卫和调度器通过 `Weak` 回指引擎，
//! 文档被丢弃或引擎被丢弃时不会形成引用环。
//!
//! # 使用方式
//!
//! ```no_run
//! use std::rc::Rc;
//! use dom_localizer::{Document, Localizer, RuleSet};
//!
//! let document = Rc::new(Document::parse_str("<html><body></body></html>").unwrap());
//! let localizer = Localizer::new("dashboard = Главная", document, RuleSet::new());
//! localizer.run();
//! ```

pub mod guard;
pub mod scheduler;
pub mod unit;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::Handle;
use tracing::{debug, info};

use crate::config::{LocalizerConfig, Markers};
use crate::dictionary::Dictionary;
use crate::dom::Document;
use crate::error::LocalizerResult;
use crate::reconciler::{ContentReconciler, Fragment, PlaceholderMap};
use crate::rules::RuleSet;
use crate::utils::{contains_all, normalize_text};

pub use guard::{GuardKind, GuardRegistry};
pub use scheduler::RescanScheduler;
pub use unit::TextState;

/// 宿主页面提供的回调
///
/// 对应自定义元素自带的刷新方法（例如 `<relative-time>` 的 `update()`）。
/// 回调失败只记录警告，不会中断本轮处理。
pub trait HostHooks {
    fn update(&self, document: &Document, element: &Handle) -> LocalizerResult<()>;
}

/// 不做任何事情的宿主回调
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl HostHooks for NoopHooks {
    fn update(&self, _document: &Document, _element: &Handle) -> LocalizerResult<()> {
        Ok(())
    }
}

/// 运行统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// 完整执行规则集的次数
    pub passes: usize,
    /// 规则调用次数
    pub rules_applied: usize,
    /// 由引擎发起的 pristine → translated 转换次数
    pub elements_changed: usize,
    /// 守卫修复宿主改写的次数
    pub guard_repairs: usize,
    /// 当前注册的守卫数量
    pub guards_active: usize,
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "passes={} rules={} changed={} repairs={} guards={}",
            self.passes,
            self.rules_applied,
            self.elements_changed,
            self.guard_repairs,
            self.guards_active
        )
    }
}

/// 本地化引擎
pub struct Localizer {
    this: Weak<Localizer>,
    document: Rc<Document>,
    dictionary: Dictionary,
    rules: RuleSet,
    config: LocalizerConfig,
    markers: Markers,
    guards: GuardRegistry,
    scheduler: RescanScheduler,
    hooks: Rc<dyn HostHooks>,
    stats: RefCell<PassStats>,
}

/// [`Localizer`] 构建器
pub struct LocalizerBuilder {
    payload: String,
    document: Rc<Document>,
    rules: RuleSet,
    config: LocalizerConfig,
    hooks: Rc<dyn HostHooks>,
}

impl LocalizerBuilder {
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(mut self, config: LocalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host_hooks(mut self, hooks: Rc<dyn HostHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// 验证配置并创建引擎
    pub fn build(self) -> LocalizerResult<Rc<Localizer>> {
        self.config.validate()?;
        Ok(Localizer::assemble(self))
    }
}

impl Localizer {
    /// 用默认配置创建引擎
    pub fn new(payload: &str, document: Rc<Document>, rules: RuleSet) -> Rc<Self> {
        Self::assemble(Self::builder(payload, document).rules(rules))
    }

    pub fn builder(payload: &str, document: Rc<Document>) -> LocalizerBuilder {
        LocalizerBuilder {
            payload: payload.to_string(),
            document,
            rules: RuleSet::new(),
            config: LocalizerConfig::default(),
            hooks: Rc::new(NoopHooks),
        }
    }

    fn assemble(builder: LocalizerBuilder) -> Rc<Self> {
        let LocalizerBuilder {
            payload,
            document,
            rules,
            config,
            hooks,
        } = builder;

        let dictionary = Dictionary::parse(&payload);
        document.set_max_delivery_rounds(config.max_delivery_rounds);

        let localizer = Rc::new_cyclic(|this| Localizer {
            this: this.clone(),
            document,
            dictionary,
            rules,
            markers: config.markers(),
            scheduler: RescanScheduler::new(config.debounce()),
            config,
            guards: GuardRegistry::default(),
            hooks,
            stats: RefCell::new(PassStats::default()),
        });

        info!(
            "{} 本地化引擎已初始化: {} 条译文, {} 条规则",
            localizer.config.log_prefix,
            localizer.dictionary.len(),
            localizer.rules.len()
        );

        localizer
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn hooks(&self) -> &dyn HostHooks {
        self.hooks.as_ref()
    }

    pub fn guards(&self) -> &GuardRegistry {
        &self.guards
    }

    /// 运行统计快照
    pub fn stats(&self) -> PassStats {
        let mut stats = *self.stats.borrow();
        stats.guards_active = self.guards.len();
        stats
    }

    pub(crate) fn record<F: FnOnce(&mut PassStats)>(&self, update: F) {
        update(&mut self.stats.borrow_mut());
    }

    pub(crate) fn weak(&self) -> Weak<Localizer> {
        self.this.clone()
    }

    pub fn get_translation(&self, key: &str) -> Option<&str> {
        self.dictionary.get(key)
    }

    pub(crate) fn reconciler(&self) -> ContentReconciler<'_> {
        ContentReconciler::new(&self.document)
            .rewrite_badge_text(self.config.rewrite_badge_text)
            .badge_tag(self.config.badge_tag.as_str())
    }

    // ========================================================================
    // 富内容
    // ========================================================================

    /// 用译文和占位映射构建游离片段
    pub fn create_fragment_from_kbd_translation(
        &self,
        translation: &str,
        placeholders: &mut PlaceholderMap,
    ) -> Fragment {
        self.reconciler().reconcile(translation, placeholders)
    }

    /// 用含徽标的译文一次性替换元素内容，并注册富内容守卫
    ///
    /// `original_tokens` 是原文中的关键词：元素文本包含全部词元才视为原文。
    /// 已是译文的元素只补注册守卫，其他内容不动；两种情况都返回 `false`。
    pub fn replace_content_with_kbd_translation(
        &self,
        element: &Handle,
        key: &str,
        mut placeholders: PlaceholderMap,
        original_tokens: &[String],
    ) -> bool {
        let Some(translation) = self.get_translation(key) else {
            return false;
        };

        if self.rich_content_holds(element, translation, original_tokens) {
            self.protect_rich_element(
                element,
                translation,
                original_tokens,
                &self.markers.localized,
                None,
            );
            return false;
        }

        let current = normalize_text(&crate::dom::text_content(element));
        if !contains_all(&current, original_tokens) {
            return false;
        }

        self.document.batch(|| {
            let fragment = self.reconciler().reconcile(translation, &mut placeholders);
            self.document
                .replace_children(element, fragment.into_nodes());
        });

        unit::mark(self, element, &self.markers.localized);
        self.protect_rich_element(
            element,
            translation,
            original_tokens,
            &self.markers.localized,
            None,
        );
        self.record(|stats| stats.elements_changed += 1);
        debug!("{} 已重建徽标内容: {}", self.config.log_prefix, key);
        true
    }

    /// 用含一对链接标记的译文重建内容，保留原有的链接元素
    ///
    /// 元素中没有链接或译文不是恰好一对链接标记时，退回纯文本替换。
    pub fn replace_content_with_link_translation(
        &self,
        element: &Handle,
        original: &str,
        key: &str,
    ) -> bool {
        let Some(translation) = self.get_translation(key) else {
            return false;
        };

        let anchor = crate::dom::node::find_descendant_by_name(element, "a");
        let reconcilable = anchor.is_some() && crate::reconciler::split_link(translation).is_some();
        if !reconcilable {
            let plain = crate::reconciler::plain_text(translation);
            return unit::localize_text_value(self, element, original, &plain);
        }

        let expected = crate::reconciler::plain_text(translation);
        match unit::classify(&crate::dom::text_content(element), original, &expected) {
            TextState::Translated => {
                self.protect_link_element(element, translation);
                false
            }
            TextState::Foreign => false,
            TextState::Pristine => {
                let Some(anchor) = anchor else {
                    return false;
                };

                let applied = self.document.batch(|| {
                    match self.reconciler().reconcile_link(translation, &anchor) {
                        Some(fragment) => {
                            self.document
                                .replace_children(element, fragment.into_nodes());
                            true
                        }
                        None => false,
                    }
                });

                if applied {
                    unit::mark(self, element, &self.markers.localized);
                    self.protect_link_element(element, translation);
                    self.record(|stats| stats.elements_changed += 1);
                    debug!("{} 已重建链接内容: {}", self.config.log_prefix, key);
                }
                applied
            }
        }
    }

    // ========================================================================
    // 执行
    // ========================================================================

    /// 按声明顺序执行一次完整的规则集
    pub fn run(&self) {
        let released = self.guards.sweep(&self.document);
        if released > 0 {
            debug!("{} 释放了 {} 个已脱离文档的守卫", self.config.log_prefix, released);
        }

        let changed_before = self.stats.borrow().elements_changed;

        for rule in self.rules.iter() {
            rule.apply(self);
            self.record(|stats| stats.rules_applied += 1);
        }

        self.record(|stats| stats.passes += 1);
        let stats = self.stats();
        info!(
            "{} 第 {} 轮本地化完成: 新增 {} 处译文, 守卫 {} 个",
            self.config.log_prefix,
            stats.passes,
            stats.elements_changed - changed_before,
            stats.guards_active
        );
    }

    /// 开始监听文档插入，插入后去抖重跑规则集（需要在 `LocalSet` 中调用）
    pub fn observe_changes(&self) {
        self.scheduler.start(self);
    }

    /// 停止监听并取消尚未执行的重扫
    pub fn stop_observing(&self) {
        self.scheduler.stop(&self.document);
    }

    /// 是否正在监听文档插入
    pub fn is_observing(&self) -> bool {
        self.scheduler.is_active()
    }
}

impl Drop for Localizer {
    fn drop(&mut self) {
        self.scheduler.stop(&self.document);
        self.guards.release_all(&self.document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_descendant_by_name, text_content, SelectorList};

    const DICTIONARY: &str = "type-at-to-search = Введите [kbd]@[/kbd] для поиска";

    fn setup(body: &str) -> (Rc<Localizer>, Handle) {
        let document = Rc::new(
            Document::parse_str(&format!("<html><body>{}</body></html>", body))
                .expect("HTML should parse"),
        );
        let selectors = SelectorList::parse("#target").expect("selector");
        let element = document.query_selector(&selectors).expect("target element");
        (Localizer::new(DICTIONARY, document, RuleSet::new()), element)
    }

    fn badge_map(element: &Handle) -> PlaceholderMap {
        let mut placeholders = PlaceholderMap::new();
        if let Some(badge) = find_descendant_by_name(element, "kbd") {
            placeholders.insert("@", badge);
        }
        placeholders
    }

    fn tokens() -> Vec<String> {
        vec!["Type".to_string(), "to search".to_string()]
    }

    #[test]
    fn test_kbd_replacement_is_idempotent() {
        let (localizer, element) =
            setup("<div id=\"target\">Type <kbd class=\"hx_kbd\">@</kbd> to search</div>");

        assert!(localizer.replace_content_with_kbd_translation(
            &element,
            "type-at-to-search",
            badge_map(&element),
            &tokens(),
        ));
        let rendered = localizer.document().inner_html(&element).expect("inner html");

        assert!(!localizer.replace_content_with_kbd_translation(
            &element,
            "type-at-to-search",
            badge_map(&element),
            &tokens(),
        ));
        assert_eq!(
            localizer.document().inner_html(&element).expect("inner html"),
            rendered
        );
        assert_eq!(localizer.stats().elements_changed, 1);
        assert!(localizer.guards().is_guarded(&element));
    }

    #[test]
    fn test_kbd_replacement_leaves_foreign_content() {
        let (localizer, element) =
            setup("<div id=\"target\">octocat wrote <kbd>@</kbd> here</div>");

        assert!(!localizer.replace_content_with_kbd_translation(
            &element,
            "type-at-to-search",
            badge_map(&element),
            &tokens(),
        ));
        assert_eq!(normalize_text(&text_content(&element)), "octocat wrote @ here");
        assert_eq!(localizer.stats().elements_changed, 0);
        assert!(!localizer.guards().is_guarded(&element));
    }
}
