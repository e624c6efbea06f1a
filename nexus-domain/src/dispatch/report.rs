use crate::domain_event::EventKind;
use crate::value_object::AggregateKey;
use serde::Serialize;

/// 一次 flush 的结果
#[derive(Clone, Debug, Serialize)]
pub struct DispatchReport {
    pub aggregate: String,
    /// 已分发（含无处理器而跳过）的事件数
    pub events_dispatched: usize,
    /// 成功执行的处理器调用次数
    pub handlers_invoked: usize,
    /// 因无处理器而跳过的事件数
    pub events_skipped: usize,
    /// `FailurePolicy::Isolate` 下收集的失败
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    pub(crate) fn new(key: &AggregateKey) -> Self {
        Self {
            aggregate: key.to_string(),
            events_dispatched: 0,
            handlers_invoked: 0,
            events_skipped: 0,
            failures: Vec::new(),
        }
    }

    /// 没有任何事件被分发（未登记、已在分发中或聚合已释放）
    pub fn is_noop(&self) -> bool {
        self.events_dispatched == 0
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HandlerFailure {
    pub handler: String,
    pub kind: EventKind,
    pub event_id: String,
    pub reason: String,
}
