//! 最小化的实时 DOM
//!
//! 基于 html5ever 的 `RcDom`，在其上补充变更通知与选择器查询，
//! 供本地化引擎在"宿主页面不断改写"的环境中工作。

pub mod document;
pub mod html;
pub mod mutation;
pub mod node;
pub mod selector;

pub use document::{Document, DEFAULT_MAX_DELIVERY_ROUNDS};
pub use mutation::{MutationKind, MutationRecord, ObserveOptions, ObserverCallback, ObserverId};
pub use node::{
    descendants, find_descendant_by_name, find_descendants_by_name, get_child_elements,
    get_children, get_node_attr, get_node_name, get_parent_node, has_node_attr, is_element,
    is_text, text_content, NodeKey,
};
pub use selector::SelectorList;

pub use markup5ever_rcdom::Handle;
