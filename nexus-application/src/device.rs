//! 设备（Device）聚合：设备与用户之间的关联关系
//!
use crate::identity::UserId;
use chrono::Utc;
use nexus_domain::aggregate::{Aggregate, PendingEvents};
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::domain_event::new_event_id;
use nexus_domain::error::{DomainError, DomainResult};
use nexus_macros::{aggregate, domain_event, entity_id};
use serde::Serialize;

#[entity_id]
pub struct DeviceId(String);

#[domain_event(aggregate = DeviceId)]
pub enum DeviceEvent {
    #[event(kind = "DeviceLinked")]
    Linked { owner: UserId, label: String },
    #[event(kind = "DeviceUnlinked")]
    Unlinked { owner: UserId },
}

#[aggregate(id = DeviceId, event = DeviceEvent)]
pub struct Device {
    label: String,
    owner: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DevicePrimitives {
    pub id: String,
    pub label: String,
    pub owner: Option<String>,
}

impl Aggregate for Device {
    const TYPE: &'static str = "device";
    type Event = DeviceEvent;
    type Primitives = DevicePrimitives;

    fn pending(&self) -> &PendingEvents<DeviceEvent> {
        &self.events
    }

    fn to_primitives(&self) -> DevicePrimitives {
        DevicePrimitives {
            id: self.id.to_string(),
            label: self.label.clone(),
            owner: self.owner.as_ref().map(ToString::to_string),
        }
    }
}

impl Device {
    /// 登记新设备并关联到所有者
    pub fn register(
        registry: &DispatchRegistry,
        id: DeviceId,
        owner: UserId,
        label: impl Into<String>,
    ) -> DomainResult<Self> {
        let mut device = Self {
            id,
            events: PendingEvents::default(),
            label: label.into(),
            owner: None,
        };
        device.link(registry, owner)?;
        Ok(device)
    }

    /// 关联到用户；已关联的设备需先解除
    pub fn link(&mut self, registry: &DispatchRegistry, owner: UserId) -> DomainResult<()> {
        if let Some(current) = &self.owner {
            return Err(DomainError::InvalidState {
                reason: format!("device {} is already linked to {current}", self.id),
            });
        }
        self.owner = Some(owner.clone());
        self.append_event(
            registry,
            DeviceEvent::Linked {
                id: new_event_id(),
                aggregate_id: self.id.clone(),
                occurred_at: Utc::now(),
                owner,
                label: self.label.clone(),
            },
        );
        Ok(())
    }

    pub fn unlink(&mut self, registry: &DispatchRegistry) -> DomainResult<()> {
        let Some(owner) = self.owner.take() else {
            return Err(DomainError::InvalidState {
                reason: format!("device {} is not linked", self.id),
            });
        };
        self.append_event(
            registry,
            DeviceEvent::Unlinked {
                id: new_event_id(),
                aggregate_id: self.id.clone(),
                occurred_at: Utc::now(),
                owner,
            },
        );
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }
}
