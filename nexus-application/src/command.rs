/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，执行时会修改聚合并产生领域事件。
/// 建议保持“动宾结构”命名，如 `CreateChat`、`LinkDevice`。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志与追踪。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（常量字符串，不随重构变化）
    const NAME: &'static str;
}
