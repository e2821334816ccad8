//! 重扫调度器
//!
//! 在文档根节点上注册一个子树 childList 观察者。只要有节点被插入就重新开始
//! 计时，计时结束后执行一次完整的规则集。计时器是 tokio 的本地任务，
//! 所以必须在 `LocalSet` 中使用。

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Localizer;
use crate::dom::{Document, ObserveOptions, ObserverId};

/// 去抖重扫调度器
pub struct RescanScheduler {
    delay: Duration,
    observer: Cell<Option<ObserverId>>,
    pending: RefCell<Option<JoinHandle<()>>>,
}

impl RescanScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            observer: Cell::new(None),
            pending: RefCell::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_active(&self) -> bool {
        self.observer.get().is_some()
    }

    /// 是否有尚未执行的重扫
    pub fn has_pending(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 注册根观察者（重复调用无副作用）
    pub(crate) fn start(&self, localizer: &Localizer) {
        if self.is_active() {
            return;
        }

        let document = localizer.document();
        let weak = localizer.weak();
        let observer = document.observe(
            &document.root(),
            ObserveOptions::child_list_subtree(),
            Rc::new(move |_document, records| {
                if !records.iter().any(|record| record.has_added_nodes()) {
                    return;
                }
                if let Some(localizer) = weak.upgrade() {
                    localizer.scheduler.schedule(&localizer);
                }
            }),
        );

        self.observer.set(Some(observer));
        debug!("{} 已开始监听文档插入", localizer.config().log_prefix);
    }

    /// 重新开始计时：取消尚未执行的重扫，再安排一次新的
    fn schedule(&self, localizer: &Localizer) {
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.abort();
        }

        let weak = localizer.weak();
        let delay = self.delay;
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(
                "{} 当前不在 tokio 运行时中，无法安排重扫",
                localizer.config().log_prefix
            );
            return;
        }

        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(localizer) = weak.upgrade() {
                localizer.scheduler.pending.borrow_mut().take();
                localizer.run();
            }
        });

        *self.pending.borrow_mut() = Some(handle);
    }

    /// 注销根观察者并取消尚未执行的重扫
    pub(crate) fn stop(&self, document: &Document) {
        if let Some(observer) = self.observer.take() {
            document.disconnect(observer);
        }
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.abort();
        }
    }
}
