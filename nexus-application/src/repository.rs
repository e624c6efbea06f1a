//! 聚合存储
//!
//! 只负责保存与读取聚合状态；待发布事件不随聚合落盘，
//! 由用例在保存之后通过 `DispatchRegistry` 显式 flush。
//!
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use dashmap::DashMap;
use nexus_domain::aggregate::Aggregate;
use nexus_domain::entity::Entity;
use tracing::debug;

/// 聚合仓储
#[async_trait]
pub trait Repository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 新增或覆盖聚合
    async fn save(&self, aggregate: &A) -> AppResult<()>;

    async fn find(&self, id: &<A as Entity>::Id) -> AppResult<Option<A>>;
}

/// 读取聚合，不存在时返回 `AppError::AggregateNotFound`
pub async fn load<A, R>(repo: &R, id: &<A as Entity>::Id) -> AppResult<A>
where
    A: Aggregate,
    R: Repository<A> + ?Sized,
{
    repo.find(id)
        .await?
        .ok_or_else(|| AppError::AggregateNotFound(format!("{}:{id}", A::TYPE)))
}

/// 基于内存的仓储实现
///
/// 保存的是聚合的克隆；克隆不携带待发布事件，读取得到的聚合缓冲区总是空的。
pub struct InMemoryRepository<A: Aggregate> {
    docs: DashMap<<A as Entity>::Id, A>,
}

impl<A: Aggregate> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self {
            docs: DashMap::new(),
        }
    }
}

impl<A: Aggregate> InMemoryRepository<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: Aggregate + Clone,
{
    async fn save(&self, aggregate: &A) -> AppResult<()> {
        debug!(aggregate_type = A::TYPE, id = %aggregate.id(), "aggregate saved");
        self.docs.insert(aggregate.id().clone(), aggregate.clone());
        Ok(())
    }

    async fn find(&self, id: &<A as Entity>::Id) -> AppResult<Option<A>> {
        Ok(self.docs.get(id).map(|doc| doc.value().clone()))
    }
}
