use nexus_domain::value_object::{AggregateId, AggregateKey};
use nexus_macros::entity_id;
use uuid::Uuid;

#[entity_id]
struct DeviceId(Uuid);

#[entity_id]
struct TokenId(String);

fn assert_aggregate_id<I: AggregateId>(_: &I) {}

fn main() {
    let raw = Uuid::new_v4();
    let id = DeviceId::new(raw);
    assert_aggregate_id(&id);
    assert_eq!(id.to_string(), raw.to_string());
    assert_eq!(id.to_string().parse::<DeviceId>().unwrap(), id);
    assert_eq!(id.as_ref(), &raw);
    assert_eq!(DeviceId::from(raw).into_inner(), raw);
    assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{raw}\""));

    let token = TokenId::new("secret".into());
    assert_eq!(format!("{:?}", token), "TokenId(\"secret\")");
    assert_eq!(AggregateKey::of(&token).to_string(), "TokenId:secret");
}
