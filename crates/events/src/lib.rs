//! Realtime events: names, envelopes, routing and the in-process bus.
//!
//! Every live update the server pushes is a [`RealtimeMessage`]: a named
//! event, its `{data, type, timestamp}` envelope and the audiences it is
//! routed to.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;
pub mod topic;

pub use bus::{EventBus, Subscription};
pub use envelope::{RealtimeEnvelope, RealtimeMessage};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use topic::{route, Audience, Channel, EventName, SubscribeFrame, UnknownEvent};
