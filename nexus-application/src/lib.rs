//! 应用层（nexus-application）
//!
//! 以聊天场景组织用例：修改聚合 → 持久化 → 显式 flush 领域事件。
//! - `chat` / `message` / `device`：聚合与事件定义
//! - `values`：聊天名称、消息正文等值对象
//! - `use_cases`：命令与命令处理器
//! - `notification`：订阅领域事件并经由通道对外通知
//! - `repository`：聚合存储抽象与内存实现
//!
pub mod chat;
pub mod command;
pub mod command_handler;
pub mod context;
pub mod device;
pub mod error;
pub mod identity;
pub mod message;
pub mod notification;
pub mod repository;
pub mod use_cases;
pub mod values;

pub use context::AppContext;
pub use error::{AppError, AppResult};
