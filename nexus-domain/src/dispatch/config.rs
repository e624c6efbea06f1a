use crate::error::DomainError;
use bon::Builder;
use std::fmt;
use std::str::FromStr;

/// 处理器失败时的分发策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 首个失败即中止本次 flush，事件保留在缓冲区中，聚合保持登记，可重新 flush
    #[default]
    Abort,
    /// 记录失败并继续执行其余处理器与事件，flush 照常完成
    Isolate,
}

impl FromStr for FailurePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "isolate" => Ok(Self::Isolate),
            other => Err(DomainError::Parse {
                reason: format!("unknown failure policy: {other}"),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Isolate => f.write_str("isolate"),
        }
    }
}

/// 分发注册表配置
#[derive(Builder, Clone, Copy, Debug)]
pub struct DispatchConfig {
    #[builder(default)]
    pub failure_policy: FailurePolicy,
    /// 事件类别无处理器时是否输出 debug 日志
    #[builder(default = true)]
    pub log_unhandled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_abort() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.failure_policy, FailurePolicy::Abort);
        assert!(cfg.log_unhandled);
    }

    #[test]
    fn builder_overrides_policy() {
        let cfg = DispatchConfig::builder()
            .failure_policy(FailurePolicy::Isolate)
            .log_unhandled(false)
            .build();
        assert_eq!(cfg.failure_policy, FailurePolicy::Isolate);
        assert!(!cfg.log_unhandled);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Isolate".parse::<FailurePolicy>().unwrap(), FailurePolicy::Isolate);
        assert_eq!(" abort ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert!(matches!(
            "retry".parse::<FailurePolicy>(),
            Err(DomainError::Parse { .. })
        ));
    }
}
