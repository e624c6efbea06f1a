use nexus_macros::entity_id;

/// 用户标识（聊天成员、消息作者、设备所有者）
#[entity_id]
pub struct UserId(String);
