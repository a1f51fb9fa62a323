//! DOM 文档模型与变更观察
//!
//! 提供内存中的文档树、CSS 选择器子集以及变更订阅机制:
//!
//! - `traits`: 文档抽象 [`DomDocument`] 与观察配置、变更记录类型
//! - `selector`: 选择器编译([`Selector`]),不支持的语法在编译期报错
//! - `tree`: 基于 arena 的文档树 [`DomTree`],所有结构变更都会派发批次
//! - `observer`: 变更订阅端 [`MutationFeed`] 及其断开句柄
//!
//! 观察语义与浏览器的 MutationObserver 对齐:仅投递 child-list 变更,
//! `subtree` 决定是否覆盖整棵子树;条目移除后不再有任何投递。

pub mod observer;
pub mod selector;
pub mod traits;
pub mod tree;

pub use observer::{MutationFeed, ObserverHandle};
pub use selector::Selector;
pub use traits::{DomDocument, MutationBatch, MutationRecord, NodeId, ObserveOptions, ObserverId};
pub use tree::{DomTree, ElementSpec};

#[cfg(test)]
mod tests;
