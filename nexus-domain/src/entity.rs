//! 实体（Entity）基础抽象
//!
//! 为聚合与实体提供统一的标识能力。
//!
use crate::value_object::AggregateId;

/// 具备唯一标识的实体抽象
pub trait Entity: Send + Sync {
    /// 实体标识类型（在同一种实体内唯一）
    type Id: AggregateId;

    /// 获取实体标识
    fn id(&self) -> &Self::Id;
}
