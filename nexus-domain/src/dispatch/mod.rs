//! 进程内领域事件分发（dispatch）
//!
//! - `DispatchRegistry`：登记持有待发布事件的聚合，并在显式 flush 时按序调用处理器；
//! - `EventHandler`：订阅某类/多类/全部事件的处理器；
//! - `DispatchConfig`：失败策略等配置；
//! - `DispatchReport`：一次 flush 的结果。
//!
//! 单进程、同步（对单个聚合的事件顺序而言）的通知机制，不提供持久化、重试与跨进程投递。
//!
mod config;
mod handler;
mod registry;
mod report;

pub use config::{DispatchConfig, FailurePolicy};
pub use handler::{EventHandler, HandledEventType};
pub use registry::DispatchRegistry;
pub use report::{DispatchReport, HandlerFailure};
