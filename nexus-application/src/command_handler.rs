use crate::{command::Command, context::AppContext, error::AppError};
use async_trait::async_trait;

/// 命令处理器：一个用例对应一个实现
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    /// 用例返回值（通常是新建聚合的标识，或 `()`）
    type Output: Send;

    async fn handle(&self, ctx: &AppContext, cmd: C) -> Result<Self::Output, AppError>;
}
