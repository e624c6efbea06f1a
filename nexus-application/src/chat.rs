//! 聊天（Chat）聚合
//!
use crate::identity::UserId;
use crate::values::ChatName;
use chrono::Utc;
use nexus_domain::aggregate::{Aggregate, PendingEvents};
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::domain_event::new_event_id;
use nexus_domain::error::{DomainError, DomainResult};
use nexus_macros::{aggregate, domain_event, entity_id};
use serde::Serialize;

#[entity_id]
pub struct ChatId(String);

#[domain_event(aggregate = ChatId)]
pub enum ChatEvent {
    #[event(kind = "ChatCreated")]
    Created { name: String, owner: UserId },
    #[event(kind = "ChatMemberAdded")]
    MemberAdded { member: UserId },
    #[event(kind = "ChatRenamed")]
    Renamed { name: String },
}

#[aggregate(id = ChatId, event = ChatEvent)]
pub struct Chat {
    name: ChatName,
    owner: UserId,
    members: Vec<UserId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatPrimitives {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub members: Vec<String>,
}

impl Aggregate for Chat {
    const TYPE: &'static str = "chat";
    type Event = ChatEvent;
    type Primitives = ChatPrimitives;

    fn pending(&self) -> &PendingEvents<ChatEvent> {
        &self.events
    }

    fn to_primitives(&self) -> ChatPrimitives {
        ChatPrimitives {
            id: self.id.to_string(),
            name: self.name.to_string(),
            owner: self.owner.to_string(),
            members: self.members.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Chat {
    /// 创建聊天，创建者自动成为第一个成员
    pub fn create(
        registry: &DispatchRegistry,
        id: ChatId,
        name: impl Into<String>,
        owner: UserId,
    ) -> DomainResult<Self> {
        let name = ChatName::new(name)?;
        let mut chat = Self {
            id: id.clone(),
            events: PendingEvents::default(),
            name: name.clone(),
            owner: owner.clone(),
            members: vec![owner.clone()],
        };
        chat.append_event(
            registry,
            ChatEvent::Created {
                id: new_event_id(),
                aggregate_id: id,
                occurred_at: Utc::now(),
                name: name.to_string(),
                owner,
            },
        );
        Ok(chat)
    }

    pub fn add_member(&mut self, registry: &DispatchRegistry, member: UserId) -> DomainResult<()> {
        if self.is_member(&member) {
            return Err(DomainError::InvalidState {
                reason: format!("{member} is already a member of chat {}", self.id),
            });
        }
        self.members.push(member.clone());
        self.append_event(
            registry,
            ChatEvent::MemberAdded {
                id: new_event_id(),
                aggregate_id: self.id.clone(),
                occurred_at: Utc::now(),
                member,
            },
        );
        Ok(())
    }

    pub fn rename(&mut self, registry: &DispatchRegistry, name: impl Into<String>) -> DomainResult<()> {
        let name = ChatName::new(name)?;
        if name == self.name {
            return Ok(());
        }
        self.name = name.clone();
        self.append_event(
            registry,
            ChatEvent::Renamed {
                id: new_event_id(),
                aggregate_id: self.id.clone(),
                occurred_at: Utc::now(),
                name: name.to_string(),
            },
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }
}
