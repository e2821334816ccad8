// 集成测试公共模块
//
// 提供 HTML 夹具、测试词典、测试规则和本地化环境的构建工具

use std::rc::Rc;

use dom_localizer::dom::{get_node_attr, text_content};
use dom_localizer::{normalize_text, Document, Handle, Localizer, RuleSet, SelectorList};

/// 测试词典
pub const TEST_DICTIONARY: &str = r#"
# 页头
dashboard = Главная
search-or-jump-to = Поиск или переход…
type-slash-to-search = Введите [kbd]/[/kbd] для поиска

# 主页
good-morning = Доброе утро
type-hash-to-search-pull-requests = Введите [kbd]#[/kbd] для поиска запросов на слияние

# 页脚
cookies = Мы используем дополнительные cookie для улучшения работы сайта. [link]Настроить cookie[/link]

month-oct = окт.
"#;

/// 测试规则（TOML）
pub const TEST_RULES: &str = r##"
[[rules]]
kind = "text"
name = "dashboard"
selector = ".AppHeader-context-item-label"
original = "Dashboard"
key = "dashboard"

[[rules]]
kind = "attribute"
name = "search-input"
selector = "#search"
attribute = "placeholder"
original = "Search or jump to…"
key = "search-or-jump-to"

[[rules]]
kind = "search-placeholder"
name = "search-placeholder"
selector = "#qb-input-query"
tokens = ["Type", "to search"]
key = "type-slash-to-search"

[[rules]]
kind = "pattern"
name = "greeting"
selector = "h2.greeting"
patterns = [
    { regex = "^Good morning,\\s*(.+)!$", key = "good-morning" },
]

[[rules]]
kind = "kbd-hint"
name = "palette-tip"
selector = ".palette-tip"
tokens = ["Type", "to search pull requests"]
identifier = "#"
key = "type-hash-to-search-pull-requests"
leading = "span.text-bold"

[[rules]]
kind = "link"
name = "cookies"
selector = "p.cookie-banner"
original = "We use optional cookies to improve your experience. Manage cookies"
key = "cookies"

[[rules]]
kind = "relative-time"
"##;

/// HTML测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 解析 HTML 为可观察文档
    pub fn create_document(html: &str) -> Rc<Document> {
        Rc::new(Document::parse_str(html).expect("测试HTML应当可以解析"))
    }

    /// 带页头、主页和页脚的英文页面
    pub fn create_dashboard_page() -> String {
        r#"<!DOCTYPE html>
<html>
<head><title>GitHub</title></head>
<body>
    <header class="AppHeader">
        <span class="AppHeader-context-item-label">Dashboard</span>
        <span class="AppHeader-context-item-label">octocat</span>
        <input id="search" placeholder="Search or jump to…">
        <span id="qb-input-query">Type <kbd class="hx_kbd">/</kbd> to search</span>
    </header>
    <main>
        <h2 class="greeting">Good morning, octocat!</h2>
        <div class="palette-tip"><span class="text-bold">Tip:</span> Type <kbd class="hx_kbd">#</kbd> to search pull requests</div>
        <relative-time datetime="2025-10-05T12:45:00Z" prefix="on" title="Oct 5, 2025, 3:45 PM GMT+3">on Oct 5</relative-time>
        <p class="repo-name">octocat/Hello-World</p>
    </main>
    <footer>
        <p class="cookie-banner">We use optional cookies to improve your experience. <a href="/settings/cookies">Manage cookies</a></p>
    </footer>
</body>
</html>"#
            .to_string()
    }

    pub fn select(document: &Document, selector: &str) -> Handle {
        let selectors = SelectorList::parse(selector).expect("测试选择器应当有效");
        document
            .query_selector(&selectors)
            .unwrap_or_else(|| panic!("找不到元素: {}", selector))
    }

    pub fn select_all(document: &Document, selector: &str) -> Vec<Handle> {
        let selectors = SelectorList::parse(selector).expect("测试选择器应当有效");
        document.query_selector_all(&selectors)
    }

    /// 元素规范化后的文本
    pub fn text(document: &Document, selector: &str) -> String {
        normalize_text(&text_content(&Self::select(document, selector)))
    }

    pub fn attr(document: &Document, selector: &str, name: &str) -> Option<String> {
        get_node_attr(&Self::select(document, selector), name)
    }

    pub fn serialize(document: &Document) -> String {
        String::from_utf8(document.serialize(None).expect("文档应当可以序列化"))
            .expect("输出应为 UTF-8")
    }
}

/// 测试环境
pub struct TestEnvironment {
    pub document: Rc<Document>,
    pub localizer: Rc<Localizer>,
}

impl TestEnvironment {
    pub fn new(html: &str, dictionary: &str, rules: &str) -> Self {
        let document = HtmlTestHelper::create_document(html);
        let rules = RuleSet::from_toml_str(rules).expect("测试规则应当可以加载");
        let localizer = Localizer::new(dictionary, document.clone(), rules);

        Self {
            document,
            localizer,
        }
    }

    /// 使用默认页面、词典和规则
    pub fn default() -> Self {
        Self::new(
            &HtmlTestHelper::create_dashboard_page(),
            TEST_DICTIONARY,
            TEST_RULES,
        )
    }

    pub fn text(&self, selector: &str) -> String {
        HtmlTestHelper::text(&self.document, selector)
    }
}
