//! 领域事件（Domain Event）
//!
//! 定义事件需要实现的最小接口（`DomainEvent` / `AggregateEvent`）、
//! 显式的事件类别判别值 `EventKind`，以及面向审计的只读元数据 `Metadata`。

mod domain_event_trait;
mod event_kind;
mod metadata;

pub use domain_event_trait::{AggregateEvent, AsAny, DomainEvent};
pub use event_kind::EventKind;
pub use metadata::Metadata;

use chrono::{DateTime, Utc};

/// 事件发生时间
pub type OccurredAt = DateTime<Utc>;

/// 生成新的事件唯一标识
pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
