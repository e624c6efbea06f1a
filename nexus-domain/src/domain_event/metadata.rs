use bon::Builder;
use serde::Serialize;

use super::{DomainEvent, EventKind, OccurredAt};

/// 事件元数据：从事件中提取的只读快照，用于审计与日志
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    #[builder(into)]
    event_id: String,
    kind: EventKind,
    #[builder(into)]
    aggregate: String,
    occurred_at: OccurredAt,
}

impl Metadata {
    pub fn of(event: &dyn DomainEvent) -> Self {
        Self::builder()
            .event_id(event.event_id())
            .kind(event.kind())
            .aggregate(event.aggregate_key().to_string())
            .occurred_at(event.occurred_at())
            .build()
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// 所属聚合（形如 `ChatId:<id>`）
    pub fn aggregate(&self) -> &str {
        &self.aggregate
    }

    pub fn occurred_at(&self) -> &OccurredAt {
        &self.occurred_at
    }
}
