//! 通知订阅
//!
//! 订阅领域事件，把需要告知用户的变化写入通道（`NotificationOutbox`），
//! 由外层（推送、WebSocket 等）消费。设备相关事件另记一份审计。
//!
use crate::chat::{Chat, ChatEvent};
use crate::device::DeviceEvent;
use crate::identity::UserId;
use crate::message::MessageEvent;
use crate::repository::{Repository, load};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use nexus_domain::dispatch::{DispatchRegistry, EventHandler, HandledEventType};
use nexus_domain::domain_event::{DomainEvent, EventKind, Metadata};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

/// 发给某个用户的一条通知
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub recipient: UserId,
    pub topic: EventKind,
    pub text: String,
}

/// 通知出口：有界通道的发送端，可廉价克隆
///
/// 发送不等待：通道已满或已关闭时立即返回错误，
/// 处理器失败由分发注册表收敛，用例不会因为消费方停滞而挂起。
#[derive(Clone, Debug)]
pub struct NotificationOutbox {
    tx: mpsc::Sender<Notification>,
}

impl NotificationOutbox {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn send(&self, notification: Notification) -> anyhow::Result<()> {
        debug!(recipient = %notification.recipient, topic = %notification.topic, "notification queued");
        self.tx.try_send(notification).map_err(|err| match err {
            TrySendError::Full(n) => anyhow!("notification channel full, dropped for {}", n.recipient),
            TrySendError::Closed(_) => anyhow!("notification channel closed"),
        })
    }
}

/// 聊天通知：新成员加入时通知本人，新消息发布时通知除作者外的全部成员
pub struct ChatNotifier {
    chats: Arc<dyn Repository<Chat>>,
    outbox: NotificationOutbox,
}

impl ChatNotifier {
    pub fn new(chats: Arc<dyn Repository<Chat>>, outbox: NotificationOutbox) -> Self {
        Self { chats, outbox }
    }

    async fn on_member_added(&self, event: &ChatEvent) -> anyhow::Result<()> {
        let ChatEvent::MemberAdded {
            aggregate_id, member, ..
        } = event
        else {
            return Ok(());
        };
        let chat = load(self.chats.as_ref(), aggregate_id)
            .await
            .context("chat of added member")?;
        self.outbox.send(Notification {
            recipient: member.clone(),
            topic: ChatEvent::MEMBER_ADDED,
            text: format!("you were added to {}", chat.name()),
        })
    }

    async fn on_message_posted(&self, event: &MessageEvent) -> anyhow::Result<()> {
        let MessageEvent::Posted {
            chat_id, author, body, ..
        } = event;
        let chat = load(self.chats.as_ref(), chat_id)
            .await
            .context("chat of posted message")?;
        for member in chat.members().iter().filter(|m| *m != author) {
            self.outbox.send(Notification {
                recipient: member.clone(),
                topic: MessageEvent::POSTED,
                text: format!("[{}] {author}: {body}", chat.name()),
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ChatNotifier {
    fn handler_name(&self) -> &str {
        "chat-notifier"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::Many(vec![ChatEvent::MEMBER_ADDED, MessageEvent::POSTED])
    }

    async fn handle(&self, event: &dyn DomainEvent) -> anyhow::Result<()> {
        if let Some(event) = event.downcast_ref::<ChatEvent>() {
            return self.on_member_added(event).await;
        }
        if let Some(event) = event.downcast_ref::<MessageEvent>() {
            return self.on_message_posted(event).await;
        }
        Err(anyhow!("unexpected event {}", event.kind()))
    }
}

/// 设备审计：记录每个设备事件的元数据，并通知设备所有者
pub struct DeviceAuditLog {
    entries: Mutex<Vec<Metadata>>,
    outbox: NotificationOutbox,
}

impl DeviceAuditLog {
    pub fn new(outbox: NotificationOutbox) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            outbox,
        }
    }

    pub async fn entries(&self) -> Vec<Metadata> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl EventHandler for DeviceAuditLog {
    fn handler_name(&self) -> &str {
        "device-audit"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::Many(DeviceEvent::KINDS.to_vec())
    }

    async fn handle(&self, event: &dyn DomainEvent) -> anyhow::Result<()> {
        let metadata = Metadata::of(event);
        info!(
            event_id = metadata.event_id(),
            kind = %metadata.kind(),
            aggregate = metadata.aggregate(),
            "device event audited"
        );
        self.entries.lock().await.push(metadata);

        let (owner, text) = match event.downcast_ref::<DeviceEvent>() {
            Some(DeviceEvent::Linked {
                aggregate_id,
                owner,
                label,
                ..
            }) => (owner, format!("device {label} ({aggregate_id}) linked")),
            Some(DeviceEvent::Unlinked {
                aggregate_id, owner, ..
            }) => (owner, format!("device {aggregate_id} unlinked")),
            None => return Err(anyhow!("unexpected event {}", event.kind())),
        };
        self.outbox.send(Notification {
            recipient: owner.clone(),
            topic: event.kind(),
            text,
        })
    }
}

/// 启动时注册全部订阅者，返回设备审计日志以便查询
pub fn register_subscribers(
    registry: &DispatchRegistry,
    chats: Arc<dyn Repository<Chat>>,
    outbox: NotificationOutbox,
) -> Arc<DeviceAuditLog> {
    registry.subscribe(Arc::new(ChatNotifier::new(chats, outbox.clone())));

    let audit = Arc::new(DeviceAuditLog::new(outbox));
    registry.subscribe(audit.clone());
    audit
}
