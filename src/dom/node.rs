//! 基础节点操作
//!
//! 只读的节点查询函数。所有会修改树结构的操作都在 [`super::Document`] 上，
//! 因为修改必须产生变更记录并通知观察者。

use std::rc::Rc;

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::StrTendril;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData};

/// 节点身份标识，用于以节点为键的旁路表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

impl NodeKey {
    /// 获取节点的身份标识（只要节点存活，标识就是唯一的）
    pub fn of(node: &Handle) -> Self {
        NodeKey(Rc::as_ptr(node) as usize)
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 是否为元素节点
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 是否为文本节点
pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 节点是否带有指定属性
pub fn has_node_attr(node: &Handle, attr_name: &str) -> bool {
    get_node_attr(node, attr_name).is_some()
}

/// 写入属性，`None` 表示删除。返回旧值
pub(crate) fn write_node_attr(
    node: &Handle,
    attr_name: &str,
    attr_value: Option<&str>,
) -> Option<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };

    let mut attrs_mut = attrs.borrow_mut();
    let position = attrs_mut
        .iter()
        .position(|attr| &*attr.name.local == attr_name);

    match (position, attr_value) {
        (Some(i), Some(value)) => {
            let old = attrs_mut[i].value.to_string();
            attrs_mut[i].value = StrTendril::from_slice(value);
            Some(old)
        }
        (Some(i), None) => Some(attrs_mut.remove(i).value.to_string()),
        (None, Some(value)) => {
            attrs_mut.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: StrTendril::from_slice(value),
            });
            None
        }
        (None, None) => None,
    }
}

/// 获取父节点（不会破坏节点内部的弱引用）
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 获取子节点快照
pub fn get_children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

/// 获取子元素快照
pub fn get_child_elements(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    children
        .iter()
        .find(|child| match child.data {
            NodeData::Element { ref name, .. } => &*name.local == node_name,
            _ => false,
        })
        .cloned()
}

/// 按文档顺序收集所有后代节点（不含自身）
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_descendants(node, &mut found);
    found
}

fn collect_descendants(node: &Handle, found: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        found.push(child.clone());
        collect_descendants(child, found);
    }
}

/// `ancestor` 是否为 `node` 自身或其祖先
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 获取节点的文本内容（等价于 DOM 的 textContent）
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, text: &mut String) {
    match &node.data {
        NodeData::Text { contents } => text.push_str(&contents.borrow()),
        NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. }
        | NodeData::Doctype { .. } => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, text);
            }
        }
    }
}

/// 查找第一个指定标签名的后代元素
pub fn find_descendant_by_name(node: &Handle, node_name: &str) -> Option<Handle> {
    descendants(node)
        .into_iter()
        .find(|candidate| get_node_name(candidate) == Some(node_name))
}

/// 查找全部指定标签名的后代元素
pub fn find_descendants_by_name(node: &Handle, node_name: &str) -> Vec<Handle> {
    descendants(node)
        .into_iter()
        .filter(|candidate| get_node_name(candidate) == Some(node_name))
        .collect()
}
