use nexus_domain::aggregate::{Aggregate, PendingEvents};
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::domain_event::new_event_id;
use nexus_domain::entity::Entity;
use nexus_macros::{aggregate, domain_event, entity_id};

#[entity_id]
struct ChatId(String);

#[domain_event(aggregate = ChatId)]
enum ChatEvent {
    Renamed { title: String },
}

#[aggregate(id = ChatId, event = ChatEvent)]
struct Chat {
    title: String,
}

impl Aggregate for Chat {
    const TYPE: &'static str = "chat";
    type Event = ChatEvent;
    type Primitives = String;

    fn pending(&self) -> &PendingEvents<ChatEvent> {
        &self.events
    }

    fn to_primitives(&self) -> String {
        self.title.clone()
    }
}

fn main() {
    let registry = DispatchRegistry::new();
    let mut chat = Chat {
        id: ChatId::new("c-1".into()),
        title: "general".into(),
        events: PendingEvents::default(),
    };
    let event = ChatEvent::Renamed {
        id: new_event_id(),
        aggregate_id: chat.id().clone(),
        occurred_at: chrono::Utc::now(),
        title: "lobby".into(),
    };
    chat.append_event(&registry, event);

    assert_eq!(chat.pending_events().len(), 1);
    assert!(registry.is_tracked(chat.id()));
    let _ = format!("{:?}", chat.clone());
}
