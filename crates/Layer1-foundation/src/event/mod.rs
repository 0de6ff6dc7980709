//! Event System - typed emitters
//!
//! An [`Emitter`] is an event source over an opaque payload type. Consumers
//! register listeners and get back a [`Subscription`] that removes the
//! listener when disposed or dropped.
//!
//! ## Usage
//!
//! ```ignore
//! use tether_foundation::event::Emitter;
//!
//! let source = Emitter::<u32>::named("engine.state");
//! let relay = Arc::new(Emitter::<u32>::named("service.state"));
//!
//! // forward every event from `source` to `relay`
//! let _forward = source.forward_to(&relay, |event| tracing::debug!(event, "relaying"));
//!
//! let _sub = relay.subscribe(|event| println!("state changed: {event}"));
//! source.fire(1);
//! ```

pub mod emitter;

pub use emitter::{Emitter, EmitterConfig, ListenerId, Subscription};
