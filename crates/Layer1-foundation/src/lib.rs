//! # tether-foundation
//!
//! Foundation layer for Tether:
//! - Error: shared error taxonomy and `Result` alias
//! - Event: typed emitters with disposable subscriptions and relays
//! - Storage: JSON configuration store (global + project)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  tether-cli                                             │
//! │     │                         │                         │
//! │     ▼                         ▼                         │
//! │  HttpRequester            TaskService (selector)        │
//! │  (cancellable request)    (cached engine + relays)      │
//! │     │                         │                         │
//! │     └──────────┬──────────────┘                         │
//! │                ▼                                        │
//! │   Error · Emitter · JsonStore                           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Event
// ============================================================================
pub use event::{Emitter, EmitterConfig, ListenerId, Subscription};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
