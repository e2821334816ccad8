//! 变更记录与观察者选项
//!
//! 与浏览器 MutationObserver 的语义保持一致：记录在变更完全生效之后才会
//! 投递给观察者，观察者在回调中产生的新变更会在下一轮投递。

use std::fmt;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::Document;

/// 观察者标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// 观察者回调
pub type ObserverCallback = Rc<dyn Fn(&Document, &[MutationRecord])>;

/// 变更类型
#[derive(Clone)]
pub enum MutationKind {
    /// 子节点列表变化
    ChildList {
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData { old_value: String },
    /// 属性变化
    Attributes {
        name: String,
        old_value: Option<String>,
    },
}

/// 单条变更记录
#[derive(Clone)]
pub struct MutationRecord {
    /// 发生变更的节点
    pub target: Handle,
    /// 变更内容
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn child_list(target: Handle, added: Vec<Handle>, removed: Vec<Handle>) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList { added, removed },
        }
    }

    pub fn character_data(target: Handle, old_value: String) -> Self {
        Self {
            target,
            kind: MutationKind::CharacterData { old_value },
        }
    }

    pub fn attributes(target: Handle, name: &str, old_value: Option<String>) -> Self {
        Self {
            target,
            kind: MutationKind::Attributes {
                name: name.to_string(),
                old_value,
            },
        }
    }

    /// 是否有新插入的节点
    pub fn has_added_nodes(&self) -> bool {
        matches!(&self.kind, MutationKind::ChildList { added, .. } if !added.is_empty())
    }
}

impl fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = super::node::get_node_name(&self.target).unwrap_or("#node");
        match &self.kind {
            MutationKind::ChildList { added, removed } => write!(
                f,
                "childList({}, +{}, -{})",
                target,
                added.len(),
                removed.len()
            ),
            MutationKind::CharacterData { old_value } => {
                write!(f, "characterData({:?})", old_value)
            }
            MutationKind::Attributes { name, .. } => write!(f, "attributes({}, {})", target, name),
        }
    }
}

/// 观察选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    pub subtree: bool,
}

impl ObserveOptions {
    /// 观察整棵子树的文本与子节点变化（翻译守卫使用）
    pub fn text_subtree() -> Self {
        Self {
            child_list: true,
            character_data: true,
            attributes: false,
            subtree: true,
        }
    }

    /// 只观察整棵子树的子节点变化（重扫调度器使用）
    pub fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            character_data: false,
            attributes: false,
            subtree: true,
        }
    }

    /// 记录类型是否在观察范围内
    pub fn accepts(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::CharacterData { .. } => self.character_data,
            MutationKind::Attributes { .. } => self.attributes,
        }
    }
}
