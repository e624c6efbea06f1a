//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合的核心行为：
//! - 通过 `Entity` 约束聚合具备标识；
//! - 以 `PendingEvents` 持有尚未发布的领域事件（按记录顺序）；
//! - `append_event` 记录事件的同时登记到 `DispatchRegistry`，
//!   由调用方在持久化之后显式 flush。
//!
use crate::dispatch::DispatchRegistry;
use crate::domain_event::{AggregateEvent, DomainEvent};
use crate::entity::Entity;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// 聚合根接口
pub trait Aggregate: Entity + Sized {
    const TYPE: &'static str;

    /// 该聚合产生的领域事件类型
    type Event: AggregateEvent<Id = <Self as Entity>::Id>;
    /// 聚合状态的序列化形式
    type Primitives: Serialize;

    /// 聚合持有的待发布事件缓冲区
    fn pending(&self) -> &PendingEvents<Self::Event>;

    /// 导出聚合状态
    fn to_primitives(&self) -> Self::Primitives;

    /// 记录一个事件并登记到分发注册表。
    ///
    /// 不校验事件的聚合标识是否与当前聚合一致，由调用方保证。
    fn append_event(&mut self, registry: &DispatchRegistry, event: Self::Event) {
        self.pending().push(event);
        registry.mark_for_dispatch(self);
    }

    /// 待发布事件的快照（按记录顺序）
    fn pending_events(&self) -> Vec<Arc<Self::Event>> {
        self.pending().snapshot()
    }

    /// 清空缓冲区；不会将聚合从注册表中移除
    fn clear_events(&mut self) {
        self.pending().clear();
    }
}

/// 待发布事件缓冲区
///
/// 由聚合独占持有；注册表只保存一个 `Weak` 句柄，聚合实例被丢弃后句柄随之失效。
/// 克隆得到的是一个空缓冲区：事件只属于记录它的那个实例。
pub struct PendingEvents<E> {
    inner: Arc<Mutex<Vec<Arc<E>>>>,
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<E> Clone for PendingEvents<E> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<E> fmt::Debug for PendingEvents<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEvents")
            .field("len", &self.inner.lock().len())
            .finish()
    }
}

impl<E: DomainEvent> PendingEvents<E> {
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<E>> {
        self.inner.lock().clone()
    }

    pub(crate) fn push(&self, event: E) {
        self.inner.lock().push(Arc::new(event));
    }

    pub(crate) fn clear(&self) {
        self.inner.lock().clear();
    }

    pub(crate) fn source(&self) -> Weak<dyn EventSource> {
        let weak: Weak<Mutex<Vec<Arc<E>>>> = Arc::downgrade(&self.inner);
        weak
    }
}

/// 注册表视角下的事件缓冲区（类型擦除）
pub(crate) trait EventSource: Send + Sync {
    /// 当前事件的快照
    fn snapshot(&self) -> Vec<Arc<dyn DomainEvent>>;

    /// 移除已分发的事件（仅移除队首与快照逐一对应的部分），返回剩余数量
    fn commit(&self, dispatched: &[Arc<dyn DomainEvent>]) -> usize;
}

impl<E: DomainEvent> EventSource for Mutex<Vec<Arc<E>>> {
    fn snapshot(&self) -> Vec<Arc<dyn DomainEvent>> {
        self.lock()
            .iter()
            .map(|event| event.clone() as Arc<dyn DomainEvent>)
            .collect()
    }

    fn commit(&self, dispatched: &[Arc<dyn DomainEvent>]) -> usize {
        let mut events = self.lock();
        let matched = events
            .iter()
            .zip(dispatched)
            .take_while(|(held, sent)| std::ptr::addr_eq(Arc::as_ptr(held), Arc::as_ptr(sent)))
            .count();
        events.drain(..matched);
        events.len()
    }
}
