//! 富内容重建
//!
//! 译文中可以嵌入两种标记：
//!
//! - `[kbd]IDENT[/kbd]`：键盘快捷键徽标，例如 `Введите [kbd]/[/kbd] для поиска`
//! - `[link]TEXT[/link]`：链接文本，例如 `Мы используем [link]cookie[/link]`
//!
//! 重建时不会克隆已有的徽标和链接元素，而是把页面上活着的节点原样
//! 挪到新位置，这样宿主脚本挂在这些节点上的事件和状态都不会丢失。

use markup5ever_rcdom::Handle;
use tracing::debug;

use crate::dom::{descendants, get_node_name, text_content, Document};
use crate::utils::normalize_text;

const BADGE_OPEN: &str = "[kbd]";
const BADGE_CLOSE: &str = "[/kbd]";
const LINK_OPEN: &str = "[link]";
const LINK_CLOSE: &str = "[/link]";

/// 译文片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Badge(&'a str),
    Link(&'a str),
}

impl<'a> Segment<'a> {
    /// 片段的可见文本
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Text(text) | Segment::Badge(text) | Segment::Link(text) => text,
        }
    }
}

/// 从左到右切分译文。未闭合的标记按普通文本处理
pub fn parse_segments(translation: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = translation;

    loop {
        let next_open = [(BADGE_OPEN, BADGE_CLOSE), (LINK_OPEN, LINK_CLOSE)]
            .into_iter()
            .filter_map(|(open, close)| rest.find(open).map(|at| (at, open, close)))
            .min_by_key(|(at, _, _)| *at);

        let Some((at, open, close)) = next_open else {
            break;
        };

        let inner_start = at + open.len();
        let Some(inner_len) = rest[inner_start..].find(close) else {
            break;
        };

        if at > 0 {
            segments.push(Segment::Text(&rest[..at]));
        }

        let inner = &rest[inner_start..inner_start + inner_len];
        segments.push(if open == BADGE_OPEN {
            Segment::Badge(inner)
        } else {
            Segment::Link(inner)
        });

        rest = &rest[inner_start + inner_len + close.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }

    segments
}

/// 译文是否包含富内容标记
pub fn has_markup(translation: &str) -> bool {
    parse_segments(translation)
        .iter()
        .any(|segment| !matches!(segment, Segment::Text(_)))
}

/// 译文是否包含徽标标记
pub fn has_badge(translation: &str) -> bool {
    parse_segments(translation)
        .iter()
        .any(|segment| matches!(segment, Segment::Badge(_)))
}

/// 译文渲染后的规范化可见文本
pub fn plain_text(translation: &str) -> String {
    let joined: String = parse_segments(translation)
        .iter()
        .map(|segment| segment.text())
        .collect();
    normalize_text(&joined)
}

/// 标识符 → 活节点 映射，每个节点最多被取出一次
#[derive(Default, Clone)]
pub struct PlaceholderMap {
    entries: Vec<(String, Handle)>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集 `root` 下所有指定标签的元素，以规范化文本作为标识符
    pub fn from_descendants(root: &Handle, tag_name: &str) -> Self {
        let entries = descendants(root)
            .into_iter()
            .filter(|node| get_node_name(node) == Some(tag_name))
            .map(|node| (normalize_text(&text_content(&node)), node))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, identifier: impl Into<String>, node: Handle) {
        self.entries.push((identifier.into(), node));
    }

    /// 按"精确匹配 → 忽略大小写 → 剩余的第一个 `fallback_tag` 元素"的顺序取出节点
    pub fn take(&mut self, identifier: &str, fallback_tag: &str) -> Option<Handle> {
        let lowered = identifier.to_lowercase();
        let position = self
            .entries
            .iter()
            .position(|(key, _)| key == identifier)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|(key, _)| key.to_lowercase() == lowered)
            })
            .or_else(|| {
                self.entries.iter().position(|(_, node)| {
                    get_node_name(node)
                        .is_some_and(|name| name.eq_ignore_ascii_case(fallback_tag))
                })
            })?;

        Some(self.entries.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 重建出的游离节点序列
#[derive(Debug, Default)]
pub struct Fragment {
    nodes: Vec<Handle>,
}

impl Fragment {
    pub fn nodes(&self) -> &[Handle] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Handle> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 片段的文本内容
    pub fn text(&self) -> String {
        self.nodes.iter().map(text_content).collect()
    }
}

/// 链接译文的三段式拆分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParts<'a> {
    pub prefix: &'a str,
    pub link_text: &'a str,
    pub suffix: &'a str,
}

/// 拆分恰好包含一对 `[link]…[/link]` 的译文
pub fn split_link(translation: &str) -> Option<LinkParts<'_>> {
    if translation.matches(LINK_OPEN).count() != 1 || translation.matches(LINK_CLOSE).count() != 1
    {
        return None;
    }

    let open = translation.find(LINK_OPEN)?;
    let close = translation.find(LINK_CLOSE)?;
    if close < open + LINK_OPEN.len() {
        return None;
    }

    Some(LinkParts {
        prefix: &translation[..open],
        link_text: &translation[open + LINK_OPEN.len()..close],
        suffix: &translation[close + LINK_CLOSE.len()..],
    })
}

/// 内容重建器
pub struct ContentReconciler<'a> {
    document: &'a Document,
    rewrite_badge_text: bool,
    badge_tag: String,
}

impl<'a> ContentReconciler<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            rewrite_badge_text: true,
            badge_tag: "kbd".to_string(),
        }
    }

    /// 徽标元素的标签名
    pub fn badge_tag(mut self, tag_name: impl Into<String>) -> Self {
        self.badge_tag = tag_name.into();
        self
    }

    /// 是否把复用的徽标文本改写成标记里的标识符
    pub fn rewrite_badge_text(mut self, rewrite: bool) -> Self {
        self.rewrite_badge_text = rewrite;
        self
    }

    /// 根据译文和占位映射重建节点序列
    pub fn reconcile(&self, translation: &str, placeholders: &mut PlaceholderMap) -> Fragment {
        let segments = parse_segments(translation);

        if segments.iter().all(|s| matches!(s, Segment::Text(_))) {
            let nodes = if translation.is_empty() {
                Vec::new()
            } else {
                vec![self.document.create_text(translation)]
            };
            return Fragment { nodes };
        }

        let mut nodes = Vec::with_capacity(segments.len());
        let mut pending_text = String::new();

        for segment in segments {
            let live_node = match segment {
                Segment::Text(text) => {
                    pending_text.push_str(text);
                    continue;
                }
                Segment::Badge(identifier) => placeholders
                    .take(identifier, &self.badge_tag)
                    .inspect(|badge| {
                        if self.rewrite_badge_text
                            && normalize_text(&text_content(badge)) != identifier
                        {
                            self.document.set_text_content(badge, identifier);
                        }
                    }),
                Segment::Link(link_text) => placeholders.take(link_text, "a").inspect(|anchor| {
                    if text_content(anchor) != link_text {
                        self.document.set_text_content(anchor, link_text);
                    }
                }),
            };

            match live_node {
                Some(node) => {
                    if !pending_text.is_empty() {
                        nodes.push(self.document.create_text(&pending_text));
                        pending_text.clear();
                    }
                    nodes.push(node);
                }
                None => {
                    debug!("占位符 '{}' 没有对应的节点，按文本插入", segment.text());
                    pending_text.push_str(segment.text());
                }
            }
        }

        if !pending_text.is_empty() {
            nodes.push(self.document.create_text(&pending_text));
        }

        Fragment { nodes }
    }

    /// 三段式链接重建：前缀文本 + 原有链接 + 后缀文本
    ///
    /// 译文不是恰好一对链接标记时返回 `None`，由调用方退回纯文本替换。
    pub fn reconcile_link(&self, translation: &str, anchor: &Handle) -> Option<Fragment> {
        let parts = split_link(translation)?;

        if text_content(anchor) != parts.link_text {
            self.document.set_text_content(anchor, parts.link_text);
        }

        let mut nodes = Vec::with_capacity(3);
        if !parts.prefix.is_empty() {
            nodes.push(self.document.create_text(parts.prefix));
        }
        nodes.push(anchor.clone());
        if !parts.suffix.is_empty() {
            nodes.push(self.document.create_text(parts.suffix));
        }

        Some(Fragment { nodes })
    }
}
