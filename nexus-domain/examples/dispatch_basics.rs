use chrono::Utc;
use nexus_domain::aggregate::{Aggregate, PendingEvents};
use nexus_domain::dispatch::DispatchRegistry;
use nexus_domain::domain_event::{AggregateEvent, DomainEvent, new_event_id};
use nexus_domain::entity::Entity;
use nexus_macros::{aggregate, domain_event, entity_id};

#[entity_id]
struct TopicId(String);

#[domain_event(aggregate = TopicId)]
enum TopicEvent {
    Opened { title: String },
    Closed,
}

#[aggregate(id = TopicId, event = TopicEvent)]
struct Topic {
    title: String,
    open: bool,
}

impl Aggregate for Topic {
    const TYPE: &'static str = "topic";
    type Event = TopicEvent;
    type Primitives = serde_json::Value;

    fn pending(&self) -> &PendingEvents<TopicEvent> {
        &self.events
    }

    fn to_primitives(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id.to_string(), "title": self.title, "open": self.open })
    }
}

impl Topic {
    fn open(registry: &DispatchRegistry, id: &str, title: &str) -> Self {
        let mut topic = Topic {
            id: TopicId::new(id.to_string()),
            events: PendingEvents::default(),
            title: title.to_string(),
            open: true,
        };
        let event = TopicEvent::Opened {
            id: new_event_id(),
            aggregate_id: topic.id.clone(),
            occurred_at: Utc::now(),
            title: title.to_string(),
        };
        topic.append_event(registry, event);
        topic
    }

    fn close(&mut self, registry: &DispatchRegistry) {
        self.open = false;
        let event = TopicEvent::Closed {
            id: new_event_id(),
            aggregate_id: self.id.clone(),
            occurred_at: Utc::now(),
        };
        self.append_event(registry, event);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = DispatchRegistry::new();

    registry.register_fn::<TopicEvent, _>(TopicEvent::OPENED, "printer", |e| {
        println!("opened: {} ({})", e.aggregate_id(), e.event_id());
        Ok(())
    });
    registry.register_fn::<TopicEvent, _>(TopicEvent::CLOSED, "printer", |e| {
        println!("closed: {}", e.aggregate_id());
        Ok(())
    });

    let mut topic = Topic::open(&registry, "t-1", "release planning");
    topic.close(&registry);
    println!("pending before flush: {}", topic.pending_events().len());

    let report = registry.dispatch_events_for_aggregate(topic.id()).await?;
    println!(
        "dispatched {} events, {} handler calls, state = {}",
        report.events_dispatched,
        report.handlers_invoked,
        topic.to_primitives()
    );
    Ok(())
}
