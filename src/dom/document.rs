//! 实时文档
//!
//! 在 `RcDom` 之上提供"修改并通知"的原语：每次修改先完整生效，再把变更
//! 记录同步投递给匹配的观察者。观察者回调中产生的修改会进入队列，
//! 在下一轮投递，因此回调永远看不到半完成的修改。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use super::html::{html_to_dom, serialize_node};
use super::mutation::{MutationRecord, ObserveOptions, ObserverCallback, ObserverId};
use super::node::{
    get_child_node_by_name, get_node_attr, get_parent_node, is_inclusive_ancestor,
    write_node_attr,
};
use super::selector::SelectorList;
use crate::error::LocalizerResult;

/// 单轮投递链的默认上限，防止两个观察者互相改写造成死循环
pub const DEFAULT_MAX_DELIVERY_ROUNDS: usize = 32;

struct Registration {
    id: ObserverId,
    target: Handle,
    options: ObserveOptions,
    callback: ObserverCallback,
}

/// 可观察的实时文档
pub struct Document {
    dom: RcDom,
    observers: RefCell<Vec<Registration>>,
    queue: RefCell<VecDeque<MutationRecord>>,
    next_observer_id: Cell<u64>,
    delivering: Cell<bool>,
    batch_depth: Cell<usize>,
    max_delivery_rounds: Cell<usize>,
}

/// 投递结束（包括回调 panic）时复位投递标志
struct DeliveryScope<'a>(&'a Cell<bool>);

impl Drop for DeliveryScope<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Document {
    /// 基于已解析的 DOM 创建文档
    pub fn from_dom(dom: RcDom) -> Self {
        Self {
            dom,
            observers: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            next_observer_id: Cell::new(1),
            delivering: Cell::new(false),
            batch_depth: Cell::new(0),
            max_delivery_rounds: Cell::new(DEFAULT_MAX_DELIVERY_ROUNDS),
        }
    }

    /// 解析 HTML 字节
    pub fn parse_html(data: &[u8], document_encoding: Option<&str>) -> LocalizerResult<Self> {
        Ok(Self::from_dom(html_to_dom(data, document_encoding)?))
    }

    /// 解析 HTML 字符串
    pub fn parse_str(html: &str) -> LocalizerResult<Self> {
        Self::parse_html(html.as_bytes(), None)
    }

    /// 序列化整个文档
    pub fn serialize(&self, document_encoding: Option<&str>) -> LocalizerResult<Vec<u8>> {
        serialize_node(&self.dom.document, document_encoding)
    }

    /// 元素的 innerHTML
    pub fn inner_html(&self, node: &Handle) -> LocalizerResult<String> {
        let bytes = serialize_node(node, None)?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// 文档根节点
    pub fn root(&self) -> Handle {
        self.dom.document.clone()
    }

    /// `<body>` 元素
    pub fn body(&self) -> Option<Handle> {
        get_child_node_by_name(&self.dom.document, "html")
            .and_then(|html| get_child_node_by_name(&html, "body"))
    }

    /// 设置单轮投递链上限
    pub fn set_max_delivery_rounds(&self, rounds: usize) {
        self.max_delivery_rounds.set(rounds.max(1));
    }

    /// 节点是否仍挂在文档上
    pub fn is_connected(&self, node: &Handle) -> bool {
        is_inclusive_ancestor(&self.dom.document, node)
    }

    // ========================================================================
    // 查询
    // ========================================================================

    /// 在根节点下按选择器查找全部元素（文档顺序）
    pub fn query_selector_all(&self, selectors: &SelectorList) -> Vec<Handle> {
        selectors.select_all(&self.dom.document)
    }

    /// 在根节点下按选择器查找第一个元素
    pub fn query_selector(&self, selectors: &SelectorList) -> Option<Handle> {
        selectors.select_all(&self.dom.document).into_iter().next()
    }

    // ========================================================================
    // 节点工厂
    // ========================================================================

    /// 创建游离的元素
    pub fn create_element(&self, tag_name: &str, attributes: &[(&str, &str)]) -> Handle {
        let attrs = attributes
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: StrTendril::from_slice(value),
            })
            .collect();

        create_element(
            &self.dom,
            QualName::new(None, ns!(html), LocalName::from(tag_name)),
            attrs,
        )
    }

    /// 创建游离的文本节点
    pub fn create_text(&self, text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        })
    }

    // ========================================================================
    // 修改原语
    // ========================================================================

    /// 用单个文本节点替换元素的全部子节点（等价于设置 textContent）
    pub fn set_text_content(&self, node: &Handle, text: &str) {
        if let NodeData::Text { .. } = node.data {
            self.set_data(node, text);
            return;
        }

        let nodes = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.create_text(text)]
        };
        self.replace_children(node, nodes);
    }

    /// 修改文本节点的内容
    pub fn set_data(&self, node: &Handle, text: &str) {
        let NodeData::Text { ref contents } = node.data else {
            return;
        };

        let old_value = {
            let mut contents = contents.borrow_mut();
            let old = contents.to_string();
            *contents = StrTendril::from_slice(text);
            old
        };

        self.enqueue(MutationRecord::character_data(node.clone(), old_value));
        self.deliver();
    }

    /// 一次性替换全部子节点
    ///
    /// 新节点如果原本挂在别处会先被摘下；原本就是该元素子节点的会被原样复用，
    /// 这是保留徽标、链接等活节点身份的关键。
    pub fn replace_children(&self, parent: &Handle, nodes: Vec<Handle>) {
        let removed: Vec<Handle> = parent.children.borrow_mut().drain(..).collect();
        for child in &removed {
            child.parent.set(None);
        }

        for node in &nodes {
            self.detach_silently(node);
        }

        {
            let mut children = parent.children.borrow_mut();
            for node in &nodes {
                node.parent.set(Some(Rc::downgrade(parent)));
                children.push(node.clone());
            }
        }

        if removed.is_empty() && nodes.is_empty() {
            return;
        }

        self.enqueue(MutationRecord::child_list(parent.clone(), nodes, removed));
        self.deliver();
    }

    /// 追加子节点
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        self.detach_silently(child);

        child.parent.set(Some(Rc::downgrade(parent)));
        parent.children.borrow_mut().push(child.clone());

        self.enqueue(MutationRecord::child_list(
            parent.clone(),
            vec![child.clone()],
            Vec::new(),
        ));
        self.deliver();
    }

    /// 从父节点上移除
    pub fn remove(&self, node: &Handle) {
        self.detach_silently(node);
        self.deliver();
    }

    /// 设置属性
    pub fn set_attribute(&self, node: &Handle, name: &str, value: &str) {
        if get_node_attr(node, name).as_deref() == Some(value) {
            return;
        }

        let old_value = write_node_attr(node, name, Some(value));
        self.enqueue(MutationRecord::attributes(node.clone(), name, old_value));
        self.deliver();
    }

    /// 删除属性
    pub fn remove_attribute(&self, node: &Handle, name: &str) {
        if get_node_attr(node, name).is_none() {
            return;
        }

        let old_value = write_node_attr(node, name, None);
        self.enqueue(MutationRecord::attributes(node.clone(), name, old_value));
        self.deliver();
    }

    /// 把一组修改合并成一次原子更新：闭包结束前不投递任何记录
    pub fn batch<R>(&self, update: impl FnOnce() -> R) -> R {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let result = update();
        self.batch_depth.set(self.batch_depth.get() - 1);
        self.deliver();
        result
    }

    /// 摘下节点并记录父节点的变更，但不触发投递
    fn detach_silently(&self, node: &Handle) {
        let Some(parent) = get_parent_node(node) else {
            return;
        };

        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
        node.parent.set(None);

        self.enqueue(MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![node.clone()],
        ));
    }

    // ========================================================================
    // 观察者
    // ========================================================================

    /// 注册观察者
    pub fn observe(
        &self,
        target: &Handle,
        options: ObserveOptions,
        callback: ObserverCallback,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer_id.get());
        self.next_observer_id.set(id.0 + 1);

        self.observers.borrow_mut().push(Registration {
            id,
            target: target.clone(),
            options,
            callback,
        });

        id
    }

    /// 注销观察者，返回是否确实存在
    pub fn disconnect(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|registration| registration.id != id);
        observers.len() != before
    }

    /// 当前注册的观察者数量
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// 观察者是否仍然注册
    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.observers
            .borrow()
            .iter()
            .any(|registration| registration.id == id)
    }

    fn enqueue(&self, record: MutationRecord) {
        self.queue.borrow_mut().push_back(record);
    }

    /// 投递队列中的记录，直到队列清空或达到轮数上限
    fn deliver(&self) {
        if self.delivering.get() || self.batch_depth.get() > 0 {
            return;
        }

        self.delivering.set(true);
        let _scope = DeliveryScope(&self.delivering);

        let mut rounds = 0;
        loop {
            let records: Vec<MutationRecord> = self.queue.borrow_mut().drain(..).collect();
            if records.is_empty() {
                break;
            }

            rounds += 1;
            if rounds > self.max_delivery_rounds.get() {
                tracing::warn!(
                    "变更投递超过 {} 轮仍未收敛，丢弃 {} 条记录",
                    self.max_delivery_rounds.get(),
                    records.len()
                );
                break;
            }

            // 快照：回调里可能注册或注销观察者
            let snapshot: Vec<(ObserverId, Handle, ObserveOptions, ObserverCallback)> = self
                .observers
                .borrow()
                .iter()
                .map(|r| (r.id, r.target.clone(), r.options, r.callback.clone()))
                .collect();

            for (id, target, options, callback) in snapshot {
                if !self.is_observing(id) || !self.is_connected(&target) {
                    continue;
                }

                let matching: Vec<MutationRecord> = records
                    .iter()
                    .filter(|record| options.accepts(record))
                    .filter(|record| {
                        if options.subtree {
                            is_inclusive_ancestor(&target, &record.target)
                        } else {
                            Rc::ptr_eq(&target, &record.target)
                        }
                    })
                    .cloned()
                    .collect();

                if !matching.is_empty() {
                    callback(self, &matching);
                }
            }
        }
    }
}
