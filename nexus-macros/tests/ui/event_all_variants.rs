use nexus_domain::domain_event::{AggregateEvent, DomainEvent, EventKind};
use nexus_macros::{domain_event, entity_id};

#[entity_id]
struct MessageId(String);

#[domain_event(aggregate = MessageId)]
enum MessageEvent {
    #[event(kind = "MessageCreated")]
    Created { body: String },
    Edited { body: String },
    Deleted,
}

fn main() {
    let id = MessageId::new("m1".into());
    let now = chrono::Utc::now();

    let created = MessageEvent::Created {
        id: "e1".into(),
        aggregate_id: id.clone(),
        occurred_at: now,
        body: "hi".into(),
    };
    assert_eq!(created.event_id(), "e1");
    assert_eq!(created.kind(), EventKind::new("MessageCreated"));
    assert_eq!(created.kind(), MessageEvent::CREATED);
    assert_eq!(created.aggregate_id(), &id);
    assert_eq!(created.occurred_at(), now);

    let deleted = MessageEvent::Deleted {
        id: "e2".into(),
        aggregate_id: id.clone(),
        occurred_at: now,
    };
    assert_eq!(deleted.kind().as_str(), "MessageEvent.Deleted");
    assert_eq!(MessageEvent::EDITED.as_str(), "MessageEvent.Edited");
    assert_eq!(MessageEvent::KINDS.len(), 3);

    let erased: &dyn DomainEvent = &deleted;
    assert!(erased.downcast_ref::<MessageEvent>().is_some());
    assert_eq!(erased.aggregate_key().to_string(), "MessageId:m1");

    let json = serde_json::to_value(&created).unwrap();
    let back: MessageEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, created);
}
