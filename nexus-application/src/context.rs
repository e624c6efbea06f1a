use bon::Builder;
use uuid::Uuid;

/// 应用层上下文（Application Context）
///
/// 承载一次用例调用所需的横切信息：
/// - `correlation_id`：链路追踪标识，未指定时自动生成；
/// - `actor_id`：发起操作的用户（可选）；
/// - `tenant_id`：租户（可选）。
///
/// 典型用法：
/// ```rust
/// use nexus_application::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .correlation_id("cor-123")
///     .actor_id("u-1")
///     .build();
/// assert_eq!(ctx.correlation_id, "cor-123");
/// assert!(ctx.tenant_id.is_none());
/// ```
#[derive(Builder, Clone, Debug)]
pub struct AppContext {
    #[builder(into, default = Uuid::new_v4().to_string())]
    pub correlation_id: String,
    #[builder(into)]
    pub actor_id: Option<String>,
    #[builder(into)]
    pub tenant_id: Option<String>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::AppContext;

    #[test]
    fn default_context_gets_a_fresh_correlation_id() {
        let a = AppContext::default();
        let b = AppContext::default();

        assert!(!a.correlation_id.is_empty());
        assert_ne!(a.correlation_id, b.correlation_id);
        assert!(a.actor_id.is_none());
    }
}
