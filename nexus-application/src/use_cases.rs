//! 用例（命令 + 命令处理器）
//!
//! 每个用例遵循同一流程：读取/创建聚合并修改（事件随之登记）→ 保存 → flush。
//! flush 失败只记录日志，不影响用例结果：状态已经保存成功。
//!
use crate::chat::{Chat, ChatId};
use crate::command::Command;
use crate::command_handler::CommandHandler;
use crate::context::AppContext;
use crate::device::{Device, DeviceId};
use crate::error::{AppError, AppResult};
use crate::identity::UserId;
use crate::message::{Message, MessageId};
use crate::repository::{Repository, load};
use async_trait::async_trait;
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::value_object::AggregateId;
use std::sync::Arc;
use tracing::{error, info, warn};

async fn flush<I: AggregateId>(registry: &DispatchRegistry, ctx: &AppContext, id: &I) {
    match registry.dispatch_events_for_aggregate(id).await {
        Ok(report) if !report.is_clean() => warn!(
            correlation_id = %ctx.correlation_id,
            aggregate = %report.aggregate,
            failures = report.failures.len(),
            "events dispatched with handler failures"
        ),
        Ok(_) => {}
        Err(err) => error!(
            correlation_id = %ctx.correlation_id,
            %err,
            "event dispatch failed"
        ),
    }
}

fn started(ctx: &AppContext, command: &'static str) {
    info!(
        command,
        correlation_id = %ctx.correlation_id,
        actor = ctx.actor_id.as_deref().unwrap_or("-"),
        "command received"
    );
}

// ---- 聊天 ----

#[derive(Clone, Debug)]
pub struct CreateChat {
    pub chat_id: ChatId,
    pub name: String,
    pub owner: UserId,
}

impl Command for CreateChat {
    const NAME: &'static str = "CreateChat";
}

#[derive(Clone, Debug)]
pub struct AddChatMember {
    pub chat_id: ChatId,
    pub member: UserId,
}

impl Command for AddChatMember {
    const NAME: &'static str = "AddChatMember";
}

#[derive(Clone, Debug)]
pub struct RenameChat {
    pub chat_id: ChatId,
    pub name: String,
}

impl Command for RenameChat {
    const NAME: &'static str = "RenameChat";
}

/// 聊天相关用例的处理器
pub struct ChatService {
    registry: Arc<DispatchRegistry>,
    chats: Arc<dyn Repository<Chat>>,
}

impl ChatService {
    pub fn new(registry: Arc<DispatchRegistry>, chats: Arc<dyn Repository<Chat>>) -> Self {
        Self { registry, chats }
    }
}

#[async_trait]
impl CommandHandler<CreateChat> for ChatService {
    type Output = ChatId;

    async fn handle(&self, ctx: &AppContext, cmd: CreateChat) -> AppResult<ChatId> {
        started(ctx, CreateChat::NAME);
        if self.chats.find(&cmd.chat_id).await?.is_some() {
            return Err(AppError::Conflict(format!("chat {} already exists", cmd.chat_id)));
        }

        let chat = Chat::create(&self.registry, cmd.chat_id.clone(), cmd.name, cmd.owner)?;
        self.chats.save(&chat).await?;
        flush(&self.registry, ctx, &cmd.chat_id).await;
        Ok(cmd.chat_id)
    }
}

#[async_trait]
impl CommandHandler<AddChatMember> for ChatService {
    type Output = ();

    async fn handle(&self, ctx: &AppContext, cmd: AddChatMember) -> AppResult<()> {
        started(ctx, AddChatMember::NAME);
        let mut chat = load(self.chats.as_ref(), &cmd.chat_id).await?;
        chat.add_member(&self.registry, cmd.member)?;
        self.chats.save(&chat).await?;
        flush(&self.registry, ctx, &cmd.chat_id).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<RenameChat> for ChatService {
    type Output = ();

    async fn handle(&self, ctx: &AppContext, cmd: RenameChat) -> AppResult<()> {
        started(ctx, RenameChat::NAME);
        let mut chat = load(self.chats.as_ref(), &cmd.chat_id).await?;
        chat.rename(&self.registry, cmd.name)?;
        self.chats.save(&chat).await?;
        flush(&self.registry, ctx, &cmd.chat_id).await;
        Ok(())
    }
}

// ---- 消息 ----

#[derive(Clone, Debug)]
pub struct PostMessage {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub author: UserId,
    pub body: String,
}

impl Command for PostMessage {
    const NAME: &'static str = "PostMessage";
}

pub struct MessageService {
    registry: Arc<DispatchRegistry>,
    chats: Arc<dyn Repository<Chat>>,
    messages: Arc<dyn Repository<Message>>,
}

impl MessageService {
    pub fn new(
        registry: Arc<DispatchRegistry>,
        chats: Arc<dyn Repository<Chat>>,
        messages: Arc<dyn Repository<Message>>,
    ) -> Self {
        Self {
            registry,
            chats,
            messages,
        }
    }
}

#[async_trait]
impl CommandHandler<PostMessage> for MessageService {
    type Output = MessageId;

    async fn handle(&self, ctx: &AppContext, cmd: PostMessage) -> AppResult<MessageId> {
        started(ctx, PostMessage::NAME);
        let chat = load(self.chats.as_ref(), &cmd.chat_id).await?;
        if !chat.is_member(&cmd.author) {
            return Err(AppError::Authorization(format!(
                "{} is not a member of chat {}",
                cmd.author, cmd.chat_id
            )));
        }

        let message = Message::post(
            &self.registry,
            cmd.message_id.clone(),
            cmd.chat_id,
            cmd.author,
            cmd.body,
        )?;
        self.messages.save(&message).await?;
        flush(&self.registry, ctx, &cmd.message_id).await;
        Ok(cmd.message_id)
    }
}

// ---- 设备 ----

#[derive(Clone, Debug)]
pub struct LinkDevice {
    pub device_id: DeviceId,
    pub owner: UserId,
    pub label: String,
}

impl Command for LinkDevice {
    const NAME: &'static str = "LinkDevice";
}

#[derive(Clone, Debug)]
pub struct UnlinkDevice {
    pub device_id: DeviceId,
    /// 只有当前所有者可以解除关联
    pub requested_by: UserId,
}

impl Command for UnlinkDevice {
    const NAME: &'static str = "UnlinkDevice";
}

pub struct DeviceService {
    registry: Arc<DispatchRegistry>,
    devices: Arc<dyn Repository<Device>>,
}

impl DeviceService {
    pub fn new(registry: Arc<DispatchRegistry>, devices: Arc<dyn Repository<Device>>) -> Self {
        Self { registry, devices }
    }
}

#[async_trait]
impl CommandHandler<LinkDevice> for DeviceService {
    type Output = ();

    /// 新设备直接登记；已存在且未关联的设备重新关联
    async fn handle(&self, ctx: &AppContext, cmd: LinkDevice) -> AppResult<()> {
        started(ctx, LinkDevice::NAME);
        let device = match self.devices.find(&cmd.device_id).await? {
            Some(mut device) => {
                if device.owner().is_some() {
                    return Err(AppError::Conflict(format!(
                        "device {} is already linked",
                        cmd.device_id
                    )));
                }
                device.link(&self.registry, cmd.owner)?;
                device
            }
            None => Device::register(&self.registry, cmd.device_id.clone(), cmd.owner, cmd.label)?,
        };
        self.devices.save(&device).await?;
        flush(&self.registry, ctx, &cmd.device_id).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<UnlinkDevice> for DeviceService {
    type Output = ();

    async fn handle(&self, ctx: &AppContext, cmd: UnlinkDevice) -> AppResult<()> {
        started(ctx, UnlinkDevice::NAME);
        let mut device = load(self.devices.as_ref(), &cmd.device_id).await?;
        if device.owner() != Some(&cmd.requested_by) {
            return Err(AppError::Authorization(format!(
                "{} does not own device {}",
                cmd.requested_by, cmd.device_id
            )));
        }
        device.unlink(&self.registry)?;
        self.devices.save(&device).await?;
        flush(&self.registry, ctx, &cmd.device_id).await;
        Ok(())
    }
}
