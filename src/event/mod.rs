// Session event log and live fan-out
//
// Every committed game operation appends its events to the feed for polling
// clients and emits them on the bus for websocket subscribers.

pub use bus::EventBus;
pub use events::{EventKind, GameEvent};
pub use feed::{
    EventFeed, InMemoryEventFeed, PostgresEventFeed, DEFAULT_LATEST_EVENTS, MAX_RETAINED_EVENTS,
    MAX_RETURNED_EVENTS,
};

mod bus;
mod events;
mod feed;
pub mod handlers;
