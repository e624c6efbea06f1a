//! 分发注册表（DispatchRegistry）
//!
//! 进程内共享的两份状态：
//! - 登记集合：持有待发布事件的聚合（按 `AggregateKey` 索引，只保存 `Weak` 句柄）；
//! - 处理器表：事件类别 → 有序处理器列表，外加订阅全部事件的处理器。
//!
//! 使用方式：用例修改聚合 → 持久化 → 调用 `dispatch_events_for_aggregate` 显式 flush。
//! flush 按记录顺序逐个事件、按注册顺序逐个处理器依次 await，
//! 全部成功后才清理缓冲区并移出登记集合。
//!
use super::config::{DispatchConfig, FailurePolicy};
use super::handler::{EventHandler, FnHandler, HandledEventType};
use super::report::{DispatchReport, HandlerFailure};
use crate::aggregate::{Aggregate, EventSource};
use crate::domain_event::{DomainEvent, EventKind};
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::value_object::{AggregateId, AggregateKey};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 领域事件分发注册表，进程启动时创建一次，以 `Arc` 在各用例间共享
pub struct DispatchRegistry {
    tracked: DashMap<AggregateKey, Arc<TrackedAggregate>>,
    handlers: RwLock<HandlerTable>,
    config: DispatchConfig,
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::with_config(DispatchConfig::default())
    }
}

impl fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("DispatchRegistry")
            .field("tracked", &self.tracked.len())
            .field("kinds", &handlers.by_kind.len())
            .field("wildcards", &handlers.all.len())
            .field("config", &self.config)
            .finish()
    }
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            tracked: DashMap::new(),
            handlers: RwLock::new(HandlerTable::default()),
            config,
        }
    }

    // ---- 处理器 ----

    /// 为某一事件类别追加处理器（同类别下按注册顺序执行）
    pub fn register_handler(&self, kind: impl Into<EventKind>, handler: Arc<dyn EventHandler>) {
        let kind = kind.into();
        debug!(%kind, handler = handler.handler_name(), "event handler registered");
        self.handlers.write().add(kind, handler);
    }

    /// 按处理器自身声明的订阅类别注册
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        match handler.handled_event_type() {
            HandledEventType::One(kind) => self.register_handler(kind, handler),
            HandledEventType::Many(kinds) => {
                for kind in kinds {
                    self.register_handler(kind, handler.clone());
                }
            }
            HandledEventType::All => {
                debug!(handler = handler.handler_name(), "wildcard handler registered");
                self.handlers.write().all.push(handler);
            }
        }
    }

    /// 以同步闭包注册处理器；事件会先还原为 `E`，类型不符时视为处理失败
    pub fn register_fn<E, F>(&self, kind: impl Into<EventKind>, name: impl Into<String>, f: F)
    where
        E: DomainEvent,
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::<E, F>::new(kind, name.into(), f));
        self.register_handler(kind, handler);
    }

    /// 某一类别分发时会调用的处理器数量（含订阅全部事件的处理器）
    pub fn handler_count(&self, kind: impl Into<EventKind>) -> usize {
        self.handlers.read().matching(kind.into()).len()
    }

    /// 清空全部处理器
    pub fn clear_handlers(&self) {
        *self.handlers.write() = HandlerTable::default();
    }

    // ---- 登记集合 ----

    /// 登记持有待发布事件的聚合。已登记（且原实例仍存活）时不做任何事。
    ///
    /// 同一标识下只登记先到的存活实例：另一个存活实例记录的事件不会被分发，
    /// 此时记一条 `warn!`。
    ///
    /// 由 `Aggregate::append_event` 调用，应用代码无需直接调用。
    pub fn mark_for_dispatch<A: Aggregate>(&self, aggregate: &A) {
        match self.tracked.entry(AggregateKey::of(aggregate.id())) {
            Entry::Occupied(mut entry) => {
                let tracked = entry.get();
                if tracked.is_alive() {
                    if !tracked.is_instance(&aggregate.pending().source()) {
                        warn!(
                            aggregate = %entry.key(),
                            aggregate_type = A::TYPE,
                            "another live instance is tracked under this identity; events of this instance will not be dispatched"
                        );
                    }
                    return;
                }
                debug!(aggregate = %entry.key(), "previous instance dropped, tracking the new one");
                entry.insert(Arc::new(TrackedAggregate::new(aggregate.pending().source())));
            }
            Entry::Vacant(entry) => {
                debug!(aggregate = %entry.key(), aggregate_type = A::TYPE, "aggregate marked for dispatch");
                entry.insert(Arc::new(TrackedAggregate::new(aggregate.pending().source())));
            }
        }
    }

    pub fn is_tracked<I: AggregateId>(&self, id: &I) -> bool {
        self.tracked.contains_key(&AggregateKey::of(id))
    }

    /// 登记的是否正是这个实例（而非同一标识的另一个实例）
    pub fn tracks_instance<A: Aggregate>(&self, aggregate: &A) -> bool {
        self.tracked
            .get(&AggregateKey::of(aggregate.id()))
            .is_some_and(|tracked| tracked.is_instance(&aggregate.pending().source()))
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// 清空登记集合（未 flush 的事件仍留在各自聚合内，但不会再被分发）
    pub fn clear_tracked_aggregates(&self) {
        self.tracked.clear();
    }

    /// 移除聚合实例已被丢弃的登记，返回移除数量
    pub fn release_orphans(&self) -> usize {
        let before = self.tracked.len();
        self.tracked.retain(|_, tracked| tracked.is_alive());
        let released = before.saturating_sub(self.tracked.len());
        if released > 0 {
            debug!(released, "orphaned aggregates released");
        }
        released
    }

    // ---- 分发 ----

    /// 分发某一聚合的全部待发布事件。
    ///
    /// - 未登记的标识：直接返回空报告；
    /// - 无处理器的事件类别：静默跳过；
    /// - 处理器失败（`Err` 或 panic）按 `FailurePolicy` 处理：
    ///   `Abort` 返回 `DomainError::EventHandler` 并保留事件与登记，可再次 flush；
    ///   `Isolate` 记录到报告中并继续。
    #[tracing::instrument(skip(self, id), fields(aggregate = %id))]
    pub async fn dispatch_events_for_aggregate<I: AggregateId>(
        &self,
        id: &I,
    ) -> DomainResult<DispatchReport> {
        let key = AggregateKey::of(id);
        let mut report = DispatchReport::new(&key);

        let tracked = self.tracked.get(&key).map(|entry| Arc::clone(entry.value()));
        let Some(tracked) = tracked else {
            debug!("nothing tracked, flush skipped");
            return Ok(report);
        };
        let Some(source) = tracked.source.upgrade() else {
            self.untrack(&key, &tracked);
            debug!("aggregate instance dropped before flush, tracking released");
            return Ok(report);
        };
        let Some(_flight) = tracked.begin_flush() else {
            debug!("flush already in flight");
            return Ok(report);
        };

        let events = source.snapshot();
        for event in &events {
            let kind = event.kind();
            let handlers = self.handlers.read().matching(kind);

            if handlers.is_empty() {
                report.events_skipped += 1;
                if self.config.log_unhandled {
                    debug!(%kind, event_id = event.event_id(), "no handler registered, event skipped");
                }
            }

            for handler in handlers {
                match invoke(handler.as_ref(), event.as_ref()).await {
                    Ok(()) => report.handlers_invoked += 1,
                    Err(reason) => {
                        warn!(
                            %kind,
                            handler = handler.handler_name(),
                            event_id = event.event_id(),
                            %reason,
                            "event handler failed"
                        );
                        match self.config.failure_policy {
                            FailurePolicy::Abort => {
                                return Err(DomainError::EventHandler {
                                    handler: handler.handler_name().to_string(),
                                    kind: kind.to_string(),
                                    aggregate: key.to_string(),
                                    reason,
                                });
                            }
                            FailurePolicy::Isolate => report.failures.push(HandlerFailure {
                                handler: handler.handler_name().to_string(),
                                kind,
                                event_id: event.event_id().to_string(),
                                reason,
                            }),
                        }
                    }
                }
            }

            report.events_dispatched += 1;
        }

        // 分发期间新追加的事件保留，聚合继续处于登记状态
        if source.commit(&events) == 0 {
            self.untrack(&key, &tracked);
        }

        info!(
            events = report.events_dispatched,
            handlers = report.handlers_invoked,
            skipped = report.events_skipped,
            failures = report.failures.len(),
            "aggregate events dispatched"
        );
        Ok(report)
    }

    fn untrack(&self, key: &AggregateKey, tracked: &Arc<TrackedAggregate>) {
        self.tracked
            .remove_if(key, |_, current| Arc::ptr_eq(current, tracked));
    }
}

/// 调用单个处理器；`Err` 与 panic 都被收敛为失败原因
async fn invoke(handler: &dyn EventHandler, event: &dyn DomainEvent) -> Result<(), String> {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(format!("handler panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

struct TrackedAggregate {
    source: Weak<dyn EventSource>,
    in_flight: AtomicBool,
}

impl TrackedAggregate {
    fn new(source: Weak<dyn EventSource>) -> Self {
        Self {
            source,
            in_flight: AtomicBool::new(false),
        }
    }

    fn is_alive(&self) -> bool {
        self.source.strong_count() > 0
    }

    fn is_instance(&self, source: &Weak<dyn EventSource>) -> bool {
        Weak::ptr_eq(&self.source, source)
    }

    fn begin_flush(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.in_flight))
    }
}

/// flush 期间持有；离开作用域（含提前返回与 panic）时复位
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct HandlerTable {
    by_kind: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
    all: Vec<Arc<dyn EventHandler>>,
}

impl HandlerTable {
    fn add(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.by_kind.entry(kind).or_default().push(handler);
    }

    fn matching(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        let mut merged: Vec<Arc<dyn EventHandler>> = Vec::new();
        if let Some(list) = self.by_kind.get(&kind) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Named(&'static str, HandledEventType);

    #[async_trait]
    impl EventHandler for Named {
        fn handler_name(&self) -> &str {
            self.0
        }

        fn handled_event_type(&self) -> HandledEventType {
            self.1.clone()
        }

        async fn handle(&self, _event: &dyn DomainEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    const CREATED: EventKind = EventKind::new("Chat.Created");
    const RENAMED: EventKind = EventKind::new("Chat.Renamed");

    fn names(handlers: &[Arc<dyn EventHandler>]) -> Vec<String> {
        handlers
            .iter()
            .map(|h| h.handler_name().to_string())
            .collect()
    }

    #[test]
    fn matching_keeps_registration_order_then_wildcards() {
        let mut table = HandlerTable::default();
        table.all.push(Arc::new(Named("audit", HandledEventType::All)));
        table.add(CREATED, Arc::new(Named("first", HandledEventType::One(CREATED))));
        table.add(CREATED, Arc::new(Named("second", HandledEventType::One(CREATED))));

        assert_eq!(names(&table.matching(CREATED)), ["first", "second", "audit"]);
        assert_eq!(names(&table.matching(RENAMED)), ["audit"]);
    }

    #[test]
    fn subscribe_honours_declared_event_types() {
        let registry = DispatchRegistry::new();
        registry.subscribe(Arc::new(Named(
            "many",
            HandledEventType::Many(vec![CREATED, RENAMED]),
        )));
        registry.subscribe(Arc::new(Named("one", HandledEventType::One(CREATED))));
        registry.subscribe(Arc::new(Named("all", HandledEventType::All)));

        assert_eq!(registry.handler_count(CREATED), 3);
        assert_eq!(registry.handler_count(RENAMED), 2);
        assert_eq!(registry.handler_count("Chat.Closed"), 1);

        registry.clear_handlers();
        assert_eq!(registry.handler_count(CREATED), 0);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn flight_guard_resets_on_drop() {
        let (_keep, weak) = {
            let strong: Arc<parking_lot::Mutex<Vec<Arc<NoopEvent>>>> = Arc::default();
            let weak: Weak<dyn EventSource> = {
                let w: Weak<parking_lot::Mutex<Vec<Arc<NoopEvent>>>> = Arc::downgrade(&strong);
                w
            };
            (strong, weak)
        };
        let tracked = TrackedAggregate::new(weak);

        let guard = tracked.begin_flush();
        assert!(guard.is_some());
        assert!(tracked.begin_flush().is_none());
        drop(guard);
        assert!(tracked.begin_flush().is_some());
    }

    #[derive(Debug)]
    struct NoopEvent;

    impl DomainEvent for NoopEvent {
        fn event_id(&self) -> &str {
            "noop"
        }

        fn kind(&self) -> EventKind {
            EventKind::new("Noop")
        }

        fn aggregate_key(&self) -> AggregateKey {
            AggregateKey::of(&String::from("noop"))
        }

        fn occurred_at(&self) -> crate::domain_event::OccurredAt {
            chrono::Utc::now()
        }
    }
}
