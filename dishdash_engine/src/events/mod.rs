//! Events emitted by the engine.
//!
//! There are two independent mechanisms here:
//! * [`NotificationFabric`] is the scoped change feed that live views subscribe to. Events carry identifiers only,
//!   and subscribers are expected to refetch whatever they display.
//! * [`EventHooks`] lets the host application run its own async handlers when orders are placed or change status.
mod channel;
mod event_types;
mod fabric;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use fabric::{NotificationFabric, Scope, Subscription, DEFAULT_QUEUE_SIZE};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
