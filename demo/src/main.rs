//! 演示：聊天与设备用例在同一个分发注册表上运行
//!
//! 环境变量：
//! - `RUST_LOG`：日志过滤（默认 `info`）
//! - `NEXUS_FAILURE_POLICY`：`abort`（默认）或 `isolate`

use nexus_application::chat::{Chat, ChatId};
use nexus_application::command_handler::CommandHandler;
use nexus_application::context::AppContext;
use nexus_application::device::{Device, DeviceId};
use nexus_application::identity::UserId;
use nexus_application::message::{Message, MessageId};
use nexus_application::notification::{NotificationOutbox, register_subscribers};
use nexus_application::repository::InMemoryRepository;
use nexus_application::use_cases::{
    AddChatMember, ChatService, CreateChat, DeviceService, LinkDevice, MessageService,
    PostMessage, UnlinkDevice,
};
use nexus_domain::dispatch::{DispatchConfig, DispatchRegistry, FailurePolicy};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn failure_policy() -> anyhow::Result<FailurePolicy> {
    match env::var("NEXUS_FAILURE_POLICY") {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(FailurePolicy::default()),
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DispatchConfig::builder()
        .failure_policy(failure_policy()?)
        .build();
    info!(policy = %config.failure_policy, "dispatch registry configured");
    let registry = Arc::new(DispatchRegistry::with_config(config));

    let chats = Arc::new(InMemoryRepository::<Chat>::new());
    let messages = Arc::new(InMemoryRepository::<Message>::new());
    let devices = Arc::new(InMemoryRepository::<Device>::new());

    let (outbox, mut inbox) = NotificationOutbox::channel(64);
    let audit = register_subscribers(&registry, chats.clone(), outbox);

    let chat_service = ChatService::new(registry.clone(), chats.clone());
    let message_service = MessageService::new(registry.clone(), chats, messages);
    let device_service = DeviceService::new(registry.clone(), devices);

    let ctx = AppContext::builder().actor_id("alice").build();

    let chat_id = chat_service
        .handle(
            &ctx,
            CreateChat {
                chat_id: ChatId::new("general".into()),
                name: "General".into(),
                owner: user("alice"),
            },
        )
        .await?;
    chat_service
        .handle(
            &ctx,
            AddChatMember {
                chat_id: chat_id.clone(),
                member: user("bob"),
            },
        )
        .await?;
    message_service
        .handle(
            &ctx,
            PostMessage {
                message_id: MessageId::new("m-1".into()),
                chat_id,
                author: user("alice"),
                body: "welcome aboard".into(),
            },
        )
        .await?;

    let device_id = DeviceId::new("bob-phone".into());
    device_service
        .handle(
            &ctx,
            LinkDevice {
                device_id: device_id.clone(),
                owner: user("bob"),
                label: "phone".into(),
            },
        )
        .await?;
    device_service
        .handle(
            &ctx,
            UnlinkDevice {
                device_id,
                requested_by: user("bob"),
            },
        )
        .await?;

    while let Ok(notification) = inbox.try_recv() {
        println!(
            "-> {} [{}] {}",
            notification.recipient, notification.topic, notification.text
        );
    }
    for entry in audit.entries().await {
        println!("audit {} {} {}", entry.occurred_at(), entry.kind(), entry.aggregate());
    }

    info!(
        tracked = registry.tracked_count(),
        orphans = registry.release_orphans(),
        "demo finished"
    );
    Ok(())
}
