//! CSS 选择器子集
//!
//! 支持类型选择器、`*`、`#id`、`.class`、属性选择器（`[a]`、`[a=v]`、
//! `[a*=v]`、`[a^=v]`、`[a$=v]`）、后代与子代组合符以及逗号分组。
//! 词法分析使用 cssparser，匹配从右向左进行。

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use super::node::{descendants, get_node_attr, get_node_name, get_parent_node, is_element};
use crate::error::{LocalizerError, LocalizerResult};

/// 属性匹配方式
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

impl AttrSelector {
    fn matches(&self, node: &Handle) -> bool {
        let Some(value) = get_node_attr(node, &self.name) else {
            return false;
        };

        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(expected) => value == *expected,
            AttrOp::Contains(needle) => !needle.is_empty() && value.contains(needle.as_str()),
            AttrOp::StartsWith(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            AttrOp::EndsWith(suffix) => !suffix.is_empty() && value.ends_with(suffix.as_str()),
        }
    }
}

/// 复合选择器，例如 `button.btn[aria-label]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(name) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if get_node_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class_attr = get_node_attr(node, "class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }

        self.attrs.iter().all(|attr| attr.matches(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// 复杂选择器：复合选择器与组合符组成的链
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// `parts[i].0` 是 `parts[i]` 与其左侧复合选择器之间的组合符
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, node: &Handle) -> bool {
        match self.parts.split_last() {
            Some(((combinator, compound), rest)) => {
                compound.matches(node) && Self::matches_left(rest, *combinator, node)
            }
            None => false,
        }
    }

    fn matches_left(
        rest: &[(Combinator, Compound)],
        combinator: Combinator,
        node: &Handle,
    ) -> bool {
        let Some(((next_combinator, compound), remaining)) = rest.split_last() else {
            return true;
        };

        match combinator {
            Combinator::Child => match get_parent_node(node) {
                Some(parent) => {
                    compound.matches(&parent)
                        && Self::matches_left(remaining, *next_combinator, &parent)
                }
                None => false,
            },
            Combinator::Descendant => {
                let mut ancestor = get_parent_node(node);
                while let Some(candidate) = ancestor {
                    if compound.matches(&candidate)
                        && Self::matches_left(remaining, *next_combinator, &candidate)
                    {
                        return true;
                    }
                    ancestor = get_parent_node(&candidate);
                }
                false
            }
        }
    }
}

/// 解析后的选择器列表（逗号分组）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    /// 解析选择器文本
    ///
    /// 词法分析交给 cssparser，所以 CSS 转义（例如 `.md\:flex`）按标准处理。
    pub fn parse(source: &str) -> LocalizerResult<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);

        let selectors = parser
            .parse_comma_separated(|parser| parse_complex(parser))
            .map_err(|e| selector_error(source, &describe_error(&e)))?;

        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// 原始选择器文本
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 元素是否匹配任意一个分组
    pub fn matches(&self, node: &Handle) -> bool {
        is_element(node) && self.selectors.iter().any(|s| s.matches(node))
    }

    /// 按文档顺序选出 `scope` 的全部匹配后代
    pub fn select_all(&self, scope: &Handle) -> Vec<Handle> {
        descendants(scope)
            .into_iter()
            .filter(|node| self.matches(node))
            .collect()
    }

    /// 选出 `scope` 的第一个匹配后代
    pub fn select_first(&self, scope: &Handle) -> Option<Handle> {
        descendants(scope).into_iter().find(|node| self.matches(node))
    }
}

type SelectorParseError<'i> = ParseError<'i, String>;

fn selector_error(source: &str, reason: &str) -> LocalizerError {
    LocalizerError::SelectorError(format!("{} ({})", reason, source))
}

fn describe_error(error: &SelectorParseError<'_>) -> String {
    let reason = match &error.kind {
        ParseErrorKind::Custom(reason) => reason.clone(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("意外的记号 {:?}", token)
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "选择器意外结束".to_string(),
        ParseErrorKind::Basic(other) => format!("{:?}", other),
    };
    format!("{}, 第 {} 列", reason, error.location.column)
}

/// 解析一个逗号分组：复合选择器与组合符交替出现
fn parse_complex<'i>(parser: &mut Parser<'i, '_>) -> Result<Complex, SelectorParseError<'i>> {
    parser.skip_whitespace();

    let mut parts = Vec::new();
    let mut combinator = Combinator::Descendant;

    loop {
        let compound = parse_compound(parser)?;
        parts.push((combinator, compound));

        let mut had_space = false;
        loop {
            let state = parser.state();
            if matches!(parser.next_including_whitespace(), Ok(Token::WhiteSpace(_))) {
                had_space = true;
            } else {
                parser.reset(&state);
                break;
            }
        }

        if parser.is_exhausted() {
            break;
        }

        let state = parser.state();
        if matches!(parser.next_including_whitespace(), Ok(Token::Delim('>'))) {
            parser.skip_whitespace();
            combinator = Combinator::Child;
        } else if had_space {
            parser.reset(&state);
            combinator = Combinator::Descendant;
        } else {
            parser.reset(&state);
            let token = parser.next_including_whitespace()?.clone();
            return Err(parser.new_unexpected_token_error(token));
        }
    }

    Ok(Complex { parts })
}

fn parse_compound<'i>(parser: &mut Parser<'i, '_>) -> Result<Compound, SelectorParseError<'i>> {
    let mut compound = Compound::default();
    let mut universal = false;
    let mut first = true;

    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::Ident(name) if first => compound.tag = Some(name.to_string()),
            Token::Delim('*') if first => universal = true,
            Token::IDHash(id) => compound.id = Some(id.to_string()),
            Token::Delim('.') => {
                let class = parser.next_including_whitespace()?.clone();
                match class {
                    Token::Ident(class) => compound.classes.push(class.to_string()),
                    other => return Err(parser.new_unexpected_token_error(other)),
                }
            }
            Token::SquareBracketBlock => {
                let attr = parser.parse_nested_block(|parser| parse_attr(parser))?;
                // cssparser 会隐式闭合到输入末尾的方括号
                if !parser.slice_from(state.position()).ends_with(']') {
                    return Err(parser.new_custom_error("属性选择器未闭合".to_string()));
                }
                compound.attrs.push(attr);
            }
            _ => {
                parser.reset(&state);
                break;
            }
        }
        first = false;
    }

    if compound.is_empty() && !universal {
        return Err(parser.new_custom_error("缺少复合选择器".to_string()));
    }

    Ok(compound)
}

fn parse_attr<'i>(parser: &mut Parser<'i, '_>) -> Result<AttrSelector, SelectorParseError<'i>> {
    let name = parser.expect_ident()?.to_string();
    if parser.is_exhausted() {
        return Ok(AttrSelector {
            name,
            op: AttrOp::Exists,
        });
    }

    let operator = parser.next()?.clone();
    let value = parser.next()?.clone();
    let value = match value {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        other => return Err(parser.new_unexpected_token_error(other)),
    };
    parser.expect_exhausted()?;

    let op = match operator {
        Token::Delim('=') => AttrOp::Equals(value),
        Token::SubstringMatch => AttrOp::Contains(value),
        Token::PrefixMatch => AttrOp::StartsWith(value),
        Token::SuffixMatch => AttrOp::EndsWith(value),
        other => return Err(parser.new_unexpected_token_error(other)),
    };

    Ok(AttrSelector { name, op })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::get_node_attr;
    use crate::dom::Document;

    fn ids(doc: &Document, selector: &str) -> Vec<String> {
        let selectors = SelectorList::parse(selector).expect("selector should parse");
        doc.query_selector_all(&selectors)
            .iter()
            .filter_map(|node| get_node_attr(node, "id"))
            .collect()
    }

    fn fixture() -> Document {
        Document::parse_str(
            r#"<html><body>
                <header id="h" class="AppHeader">
                    <button id="b1" class="btn search-input" aria-label="Search">
                        <span id="s1" class="placeholder">Type</span>
                        <kbd id="k1" class="hx_kbd">/</kbd>
                    </button>
                </header>
                <span id="e1" class="md:flex">y</span>
                <div id="d1" data-target="qbsearch-input.inputButtonText">
                    <p id="p1"><span id="s2">x</span></p>
                </div>
            </body></html>"#,
        )
        .expect("HTML should parse")
    }

    #[test]
    fn test_simple_selectors() {
        let doc = fixture();
        assert_eq!(ids(&doc, "kbd"), vec!["k1"]);
        assert_eq!(ids(&doc, "#p1"), vec!["p1"]);
        assert_eq!(ids(&doc, ".btn.search-input"), vec!["b1"]);
        assert_eq!(ids(&doc, "KBD.hx_kbd"), vec!["k1"]);
    }

    #[test]
    fn test_attribute_operators() {
        let doc = fixture();
        assert_eq!(ids(&doc, "[aria-label]"), vec!["b1"]);
        assert_eq!(ids(&doc, "[aria-label=\"Search\"]"), vec!["b1"]);
        assert_eq!(ids(&doc, "[data-target*='inputButton']"), vec!["d1"]);
        assert_eq!(ids(&doc, "[data-target^=qbsearch]"), vec!["d1"]);
        assert_eq!(ids(&doc, "[data-target$=\"ButtonText\"]"), vec!["d1"]);
        assert!(ids(&doc, "[aria-label=search]").is_empty());
    }

    #[test]
    fn test_combinators_and_groups() {
        let doc = fixture();
        assert_eq!(ids(&doc, "header span"), vec!["s1"]);
        assert_eq!(ids(&doc, "button > kbd"), vec!["k1"]);
        assert!(ids(&doc, "header > kbd").is_empty());
        assert_eq!(ids(&doc, "div > p > span, kbd"), vec!["k1", "s2"]);
        assert_eq!(ids(&doc, "div *"), vec!["p1", "s2"]);
    }

    #[test]
    fn test_css_escapes() {
        let doc = fixture();
        assert_eq!(ids(&doc, r".md\:flex"), vec!["e1"]);
        assert_eq!(ids(&doc, r"#\65 1"), vec!["e1"]);
        assert_eq!(ids(&doc, "span[class=\"md:flex\"]"), vec!["e1"]);
    }

    #[test]
    fn test_invalid_selectors_are_errors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("a,,b").is_err());
        assert!(SelectorList::parse("[data-x").is_err());
        assert!(SelectorList::parse("div >").is_err());
        assert!(SelectorList::parse("a ~ b").is_err());
        assert!(SelectorList::parse("div.").is_err());
        assert!(SelectorList::parse("#1a").is_err());

        let error = SelectorList::parse("div > > p").expect_err("double combinator");
        assert!(matches!(error, LocalizerError::SelectorError(_)));
        assert!(error.to_string().contains("div > > p"));
    }
}
