//! 聊天场景的值对象
//!
//! 构造即校验：`new` 通过 `ValueObject::validate` 后才返回实例。
//!
use nexus_domain::error::{DomainError, DomainResult};
use nexus_domain::value_object::ValueObject;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_CHAT_NAME_LEN: usize = 80;
pub const MAX_MESSAGE_BODY_LEN: usize = 4000;

/// 聊天名称，去除首尾空白后 1..=80 个字符
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatName(String);

impl ChatName {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let name = Self(value.into().trim().to_string());
        name.validate()?;
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for ChatName {
    type Error = DomainError;

    fn validate(&self) -> DomainResult<()> {
        let len = self.0.chars().count();
        if len == 0 || len > MAX_CHAT_NAME_LEN {
            return Err(DomainError::InvalidValue {
                reason: format!("chat name must be 1..={MAX_CHAT_NAME_LEN} characters"),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ChatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 消息正文：不能全是空白，最多 4000 个字符；原样保存不做裁剪
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let body = Self(value.into());
        body.validate()?;
        Ok(body)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for MessageBody {
    type Error = DomainError;

    fn validate(&self) -> DomainResult<()> {
        if self.0.trim().is_empty() || self.0.chars().count() > MAX_MESSAGE_BODY_LEN {
            return Err(DomainError::InvalidValue {
                reason: format!("message body must be 1..={MAX_MESSAGE_BODY_LEN} characters"),
            });
        }
        Ok(())
    }
}
