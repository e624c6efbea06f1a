//! 领域层基础库（nexus-domain）
//!
//! 提供以 DDD 为中心的通用抽象与进程内事件分发核心：
//! - 聚合（`aggregate`）与实体（`entity`）建模，聚合自带待发布事件缓冲区
//! - 领域事件（`domain_event`）：显式的事件类别与类型还原
//! - 事件分发（`dispatch`）：登记“脏”聚合、按类别查找处理器并在 flush 时依次调用
//! - 值对象（`value_object`）与聚合标识
//!
//! 本 crate 与存储、传输实现解耦，注册表作为显式服务对象在进程启动时创建，
//! 并以参数形式传给聚合与用例。
//!
//! 典型用法：
//! 1. 定义聚合与事件（可借助 `nexus-macros` 中的 `#[aggregate]`、`#[domain_event]`）；
//! 2. 启动时创建 `DispatchRegistry` 并注册处理器；
//! 3. 用例中修改聚合（`append_event`）→ 持久化 → `dispatch_events_for_aggregate`。
//!
pub mod aggregate;
pub mod dispatch;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod value_object;

// 允许在本 crate 内部通过 ::nexus_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::nexus_domain 路径。
extern crate self as nexus_domain;
