//! 消息（Message）聚合
//!
use crate::chat::ChatId;
use crate::identity::UserId;
use crate::values::MessageBody;
use chrono::Utc;
use nexus_domain::aggregate::{Aggregate, PendingEvents};
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::domain_event::new_event_id;
use nexus_domain::error::DomainResult;
use nexus_macros::{aggregate, domain_event, entity_id};
use serde::Serialize;

#[entity_id]
pub struct MessageId(String);

#[domain_event(aggregate = MessageId)]
pub enum MessageEvent {
    #[event(kind = "MessagePosted")]
    Posted {
        chat_id: ChatId,
        author: UserId,
        body: String,
    },
}

#[aggregate(id = MessageId, event = MessageEvent)]
pub struct Message {
    chat_id: ChatId,
    author: UserId,
    body: MessageBody,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessagePrimitives {
    pub id: String,
    pub chat_id: String,
    pub author: String,
    pub body: String,
}

impl Aggregate for Message {
    const TYPE: &'static str = "message";
    type Event = MessageEvent;
    type Primitives = MessagePrimitives;

    fn pending(&self) -> &PendingEvents<MessageEvent> {
        &self.events
    }

    fn to_primitives(&self) -> MessagePrimitives {
        MessagePrimitives {
            id: self.id.to_string(),
            chat_id: self.chat_id.to_string(),
            author: self.author.to_string(),
            body: self.body.as_str().to_string(),
        }
    }
}

impl Message {
    pub fn post(
        registry: &DispatchRegistry,
        id: MessageId,
        chat_id: ChatId,
        author: UserId,
        body: impl Into<String>,
    ) -> DomainResult<Self> {
        let body = MessageBody::new(body)?;

        let mut message = Self {
            id: id.clone(),
            events: PendingEvents::default(),
            chat_id: chat_id.clone(),
            author: author.clone(),
            body: body.clone(),
        };
        message.append_event(
            registry,
            MessageEvent::Posted {
                id: new_event_id(),
                aggregate_id: id,
                occurred_at: Utc::now(),
                chat_id,
                author,
                body: body.as_str().to_string(),
            },
        );
        Ok(message)
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    pub fn author(&self) -> &UserId {
        &self.author
    }

    pub fn body(&self) -> &str {
        self.body.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_domain::error::DomainError;

    #[test]
    fn blank_body_is_rejected_and_nothing_is_tracked() {
        let registry = DispatchRegistry::new();

        let result = Message::post(
            &registry,
            MessageId::new("m1".into()),
            ChatId::new("c1".into()),
            UserId::new("u1".into()),
            "   ",
        );

        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
        assert_eq!(registry.tracked_count(), 0);
    }

    #[test]
    fn posted_event_carries_chat_and_author() {
        let registry = DispatchRegistry::new();
        let message = Message::post(
            &registry,
            MessageId::new("m1".into()),
            ChatId::new("c1".into()),
            UserId::new("u1".into()),
            "hello",
        )
        .unwrap();

        let events = message.pending_events();
        match events[0].as_ref() {
            MessageEvent::Posted { chat_id, author, body, .. } => {
                assert_eq!(chat_id, &ChatId::new("c1".into()));
                assert_eq!(author, &UserId::new("u1".into()));
                assert_eq!(body, "hello");
            }
        }
    }
}
