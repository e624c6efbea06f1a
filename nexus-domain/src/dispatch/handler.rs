//! 事件处理器（EventHandler）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅类别）。
//!
use crate::domain_event::{DomainEvent, EventKind};
use crate::error::DomainError;
use async_trait::async_trait;
use std::any::type_name;
use std::marker::PhantomData;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventType {
    One(EventKind),
    Many(Vec<EventKind>),
    All,
}

/// 事件处理器：处理某一类别的事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于失败报告与日志）
    fn handler_name(&self) -> &str;
    /// 返回该处理器订阅的事件类别（供 `DispatchRegistry::subscribe` 使用）
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件
    async fn handle(&self, event: &dyn DomainEvent) -> anyhow::Result<()>;
}

/// 以同步闭包实现的处理器，按具体事件类型还原后调用
pub(crate) struct FnHandler<E, F> {
    name: String,
    kind: EventKind,
    f: F,
    _marker: PhantomData<fn(&E)>,
}

impl<E, F> FnHandler<E, F> {
    pub(crate) fn new(kind: EventKind, name: String, f: F) -> Self {
        Self {
            name,
            kind,
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E, F> EventHandler for FnHandler<E, F>
where
    E: DomainEvent,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn handler_name(&self) -> &str {
        &self.name
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(self.kind)
    }

    async fn handle(&self, event: &dyn DomainEvent) -> anyhow::Result<()> {
        let Some(event) = event.downcast_ref::<E>() else {
            return Err(DomainError::TypeMismatch {
                expected: type_name::<E>().to_string(),
                found: event.kind().to_string(),
            }
            .into());
        };
        (self.f)(event)
    }
}
