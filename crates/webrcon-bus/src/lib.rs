//! # webrcon-bus
//!
//! Named-topic publish/subscribe bus decoupling the WebRCON bridge from its
//! consumers.
//!
//! - `publish` is fire-and-forget and never blocks the publisher
//! - each sink receives events in publish order
//! - a slow sink does not delay other sinks; a sink whose bounded queue is
//!   full misses events instead of growing without limit
//! - publishing to a topic without subscribers is a no-op

pub mod bus;
mod registry;

pub use bus::{DEFAULT_QUEUE_CAPACITY, EventBus, EventSink, FnSink};
pub use registry::SubscriptionId;
