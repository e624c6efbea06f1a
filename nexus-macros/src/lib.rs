//! nexus 领域建模过程宏
//!
//! - `#[entity_id]`：为单字段 tuple struct 生成聚合标识所需的派生与转换；
//! - `#[aggregate]`：为聚合结构体注入标识与待发布事件缓冲区，并实现 `Entity`；
//! - `#[domain_event]`：为事件枚举注入事件元字段，实现 `DomainEvent` / `AggregateEvent`。
//!
use proc_macro::TokenStream;

mod aggregate;
mod domain_event;
mod entity_id;
mod utils;

#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate::expand(attr, item)
}

#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}
