//! Domain events and the pub/sub mechanics that carry them.
//!
//! Stock operations commit synchronously; anything I/O bound (alerts, mail,
//! webhooks) reacts to the events published here after the commit.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
