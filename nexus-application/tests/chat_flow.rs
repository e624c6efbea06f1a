use nexus_application::chat::{Chat, ChatEvent, ChatId};
use nexus_application::command_handler::CommandHandler;
use nexus_application::context::AppContext;
use nexus_application::device::{Device, DeviceEvent, DeviceId};
use nexus_application::error::AppError;
use nexus_application::identity::UserId;
use nexus_application::message::{Message, MessageEvent, MessageId};
use nexus_application::notification::{
    DeviceAuditLog, Notification, NotificationOutbox, register_subscribers,
};
use nexus_application::repository::{InMemoryRepository, Repository};
use nexus_application::use_cases::{
    AddChatMember, ChatService, CreateChat, DeviceService, LinkDevice, MessageService,
    PostMessage, RenameChat, UnlinkDevice,
};
use nexus_domain::aggregate::Aggregate;
use nexus_domain::dispatch::DispatchRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct App {
    registry: Arc<DispatchRegistry>,
    chats: Arc<InMemoryRepository<Chat>>,
    messages: Arc<InMemoryRepository<Message>>,
    devices: Arc<InMemoryRepository<Device>>,
    chat_service: ChatService,
    message_service: MessageService,
    device_service: DeviceService,
    audit: Arc<DeviceAuditLog>,
    inbox: mpsc::Receiver<Notification>,
}

fn app() -> App {
    app_with_outbox(64)
}

fn app_with_outbox(capacity: usize) -> App {
    let registry = Arc::new(DispatchRegistry::new());
    let chats = Arc::new(InMemoryRepository::<Chat>::new());
    let messages = Arc::new(InMemoryRepository::<Message>::new());
    let devices = Arc::new(InMemoryRepository::<Device>::new());
    let (outbox, inbox) = NotificationOutbox::channel(capacity);
    let audit = register_subscribers(&registry, chats.clone(), outbox);

    App {
        chat_service: ChatService::new(registry.clone(), chats.clone()),
        message_service: MessageService::new(registry.clone(), chats.clone(), messages.clone()),
        device_service: DeviceService::new(registry.clone(), devices.clone()),
        registry,
        chats,
        messages,
        devices,
        audit,
        inbox,
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id.to_string())
}

fn drain(inbox: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = inbox.try_recv() {
        out.push(n);
    }
    out
}

async fn team_chat(app: &App, ctx: &AppContext) -> ChatId {
    let chat_id = app
        .chat_service
        .handle(
            ctx,
            CreateChat {
                chat_id: ChatId::new("c1".into()),
                name: "Team".into(),
                owner: user("alice"),
            },
        )
        .await
        .unwrap();
    for member in ["bob", "carol"] {
        app.chat_service
            .handle(
                ctx,
                AddChatMember {
                    chat_id: chat_id.clone(),
                    member: user(member),
                },
            )
            .await
            .unwrap();
    }
    chat_id
}

#[tokio::test]
async fn posting_a_message_notifies_other_members() {
    let mut app = app();
    let ctx = AppContext::builder().actor_id("alice").build();
    let chat_id = team_chat(&app, &ctx).await;

    let joined = drain(&mut app.inbox);
    let recipients: Vec<String> = joined.iter().map(|n| n.recipient.to_string()).collect();
    assert_eq!(recipients, vec!["bob", "carol"]);

    app.message_service
        .handle(
            &ctx,
            PostMessage {
                message_id: MessageId::new("m1".into()),
                chat_id: chat_id.clone(),
                author: user("bob"),
                body: "hi all".into(),
            },
        )
        .await
        .unwrap();

    let posted = drain(&mut app.inbox);
    assert_eq!(posted.len(), 2);
    assert!(posted.iter().all(|n| n.topic == MessageEvent::POSTED));
    assert_eq!(posted[0].recipient, user("alice"));
    assert_eq!(posted[1].recipient, user("carol"));
    assert_eq!(posted[0].text, "[Team] bob: hi all");

    assert_eq!(app.messages.len(), 1);
    assert_eq!(app.registry.tracked_count(), 0);
}

#[tokio::test]
async fn non_member_cannot_post() {
    let mut app = app();
    let ctx = AppContext::default();
    let chat_id = team_chat(&app, &ctx).await;
    drain(&mut app.inbox);

    let err = app
        .message_service
        .handle(
            &ctx,
            PostMessage {
                message_id: MessageId::new("m1".into()),
                chat_id,
                author: user("mallory"),
                body: "let me in".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Authorization(_)));
    assert!(app.messages.is_empty());
    assert!(drain(&mut app.inbox).is_empty());
    assert_eq!(app.registry.tracked_count(), 0);
}

#[tokio::test]
async fn rename_and_state_are_persisted() {
    let app = app();
    let ctx = AppContext::default();
    let chat_id = team_chat(&app, &ctx).await;

    app.chat_service
        .handle(
            &ctx,
            RenameChat {
                chat_id: chat_id.clone(),
                name: "Core".into(),
            },
        )
        .await
        .unwrap();

    let stored = app.chats.find(&chat_id).await.unwrap().unwrap();
    assert_eq!(stored.name(), "Core");
    assert_eq!(stored.members().len(), 3);
    assert!(stored.pending_events().is_empty());
}

#[tokio::test]
async fn duplicate_chat_is_a_conflict() {
    let app = app();
    let ctx = AppContext::default();
    team_chat(&app, &ctx).await;

    let err = app
        .chat_service
        .handle(
            &ctx,
            CreateChat {
                chat_id: ChatId::new("c1".into()),
                name: "Again".into(),
                owner: user("bob"),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn device_lifecycle_is_audited_in_order() {
    let mut app = app();
    let ctx = AppContext::default();
    let device_id = DeviceId::new("d1".into());

    app.device_service
        .handle(
            &ctx,
            LinkDevice {
                device_id: device_id.clone(),
                owner: user("alice"),
                label: "phone".into(),
            },
        )
        .await
        .unwrap();

    let err = app
        .device_service
        .handle(
            &ctx,
            UnlinkDevice {
                device_id: device_id.clone(),
                requested_by: user("bob"),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    app.device_service
        .handle(
            &ctx,
            UnlinkDevice {
                device_id: device_id.clone(),
                requested_by: user("alice"),
            },
        )
        .await
        .unwrap();
    app.device_service
        .handle(
            &ctx,
            LinkDevice {
                device_id: device_id.clone(),
                owner: user("bob"),
                label: "ignored".into(),
            },
        )
        .await
        .unwrap();

    let kinds: Vec<_> = app.audit.entries().await.iter().map(|m| m.kind()).collect();
    assert_eq!(
        kinds,
        vec![DeviceEvent::LINKED, DeviceEvent::UNLINKED, DeviceEvent::LINKED]
    );

    let notes = drain(&mut app.inbox);
    let texts: Vec<&str> = notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "device phone (d1) linked",
            "device d1 unlinked",
            "device phone (d1) linked"
        ]
    );
    assert_eq!(notes[2].recipient, user("bob"));

    let stored = app.devices.find(&device_id).await.unwrap().unwrap();
    assert_eq!(stored.to_primitives().owner.as_deref(), Some("bob"));
}

#[tokio::test]
async fn handler_failure_does_not_fail_the_use_case() {
    let app = app();
    let ctx = AppContext::default();
    // 无人消费的处理器故障：关闭收件箱后通知发送失败
    drop(app.inbox);

    let chat_id = app
        .chat_service
        .handle(
            &ctx,
            CreateChat {
                chat_id: ChatId::new("c9".into()),
                name: "Quiet".into(),
                owner: user("alice"),
            },
        )
        .await
        .unwrap();
    app.chat_service
        .handle(
            &ctx,
            AddChatMember {
                chat_id: chat_id.clone(),
                member: user("bob"),
            },
        )
        .await
        .unwrap();

    let stored = app.chats.find(&chat_id).await.unwrap().unwrap();
    assert!(stored.is_member(&user("bob")));
    // 失败的 flush 保留登记；聚合实例随用例结束而释放
    assert_eq!(app.registry.release_orphans(), 1);
    assert_eq!(app.registry.tracked_count(), 0);
}

#[tokio::test]
async fn full_outbox_does_not_block_the_use_case() {
    let mut app = app_with_outbox(1);
    let ctx = AppContext::default();
    // bob 的入群通知占满通道，carol 的入群通知发送失败
    let chat_id = team_chat(&app, &ctx).await;

    let posted = tokio::time::timeout(
        Duration::from_secs(2),
        app.message_service.handle(
            &ctx,
            PostMessage {
                message_id: MessageId::new("m1".into()),
                chat_id,
                author: user("alice"),
                body: "anyone there?".into(),
            },
        ),
    )
    .await
    .expect("use case returns while the outbox is full");

    assert_eq!(posted.unwrap(), MessageId::new("m1".into()));
    assert_eq!(app.messages.len(), 1);

    let delivered = drain(&mut app.inbox);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].recipient, user("bob"));
    assert_eq!(delivered[0].topic, ChatEvent::MEMBER_ADDED);
    // 两次失败的 flush 各留下一个已释放实例的登记
    assert_eq!(app.registry.release_orphans(), 2);
}
