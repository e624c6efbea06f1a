use super::{EventKind, OccurredAt};
use crate::value_object::{AggregateId, AggregateKey};
use std::any::Any;
use std::fmt;

/// 将具体类型视作 `dyn Any`，供事件还原为具体类型
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 领域事件需要满足的通用能力边界（对象安全，可作为 `dyn DomainEvent` 分发）
pub trait DomainEvent: AsAny + fmt::Debug + Send + Sync + 'static {
    /// 事件唯一标识
    fn event_id(&self) -> &str;

    /// 事件类别（处理器查找键）
    fn kind(&self) -> EventKind;

    /// 所属聚合的定位键
    fn aggregate_key(&self) -> AggregateKey;

    /// 事件发生时间
    fn occurred_at(&self) -> OccurredAt;
}

impl dyn DomainEvent {
    /// 还原为具体事件类型
    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

/// 归属于某一种聚合的领域事件
pub trait AggregateEvent: DomainEvent + Sized {
    /// 所属聚合的标识类型
    type Id: AggregateId;

    /// 所属聚合的标识
    fn aggregate_id(&self) -> &Self::Id;
}
