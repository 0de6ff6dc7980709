//! Emitter - typed event source with disposable listeners
//!
//! Listeners run synchronously inside [`Emitter::fire`], in registration
//! order. The listener table is snapshotted before delivery, so a listener
//! may query or subscribe to its own source without deadlocking.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, trace};

// ============================================================================
// Listener ID
// ============================================================================

/// Listener ID, unique per emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;
type ListenerTable<E> = RwLock<BTreeMap<ListenerId, Listener<E>>>;

// ============================================================================
// Subscription
// ============================================================================

/// Handle to a registered listener
///
/// Dropping the handle (or calling [`Subscription::dispose`]) removes the
/// listener. Disposing after the emitter itself is gone does nothing.
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription {
    id: ListenerId,
    remove: Option<Box<dyn FnOnce() -> bool + Send + Sync>>,
}

impl Subscription {
    fn new(id: ListenerId, remove: impl FnOnce() -> bool + Send + Sync + 'static) -> Self {
        Self {
            id,
            remove: Some(Box::new(remove)),
        }
    }

    /// Listener ID this handle controls
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener now. Returns `true` if it was still registered.
    pub fn dispose(mut self) -> bool {
        self.remove.take().map(|remove| remove()).unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.remove.is_some())
            .finish()
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Emitter configuration
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Name used in log fields
    pub name: String,

    /// Broadcast channel capacity for [`Emitter::receiver`] consumers
    pub channel_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            name: "emitter".to_string(),
            channel_capacity: 256,
        }
    }
}

/// Typed event source
///
/// The payload type is opaque to the emitter; it is only cloned for
/// broadcast receivers and relays.
pub struct Emitter<E> {
    config: EmitterConfig,

    /// Stream-style consumers
    sender: broadcast::Sender<E>,

    /// Callback-style consumers
    listeners: Arc<ListenerTable<E>>,

    listener_counter: AtomicU64,

    event_count: AtomicU64,
}

impl<E> Emitter<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Create an emitter with default configuration
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create an emitter with a name for log fields
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(EmitterConfig {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Create an emitter with custom configuration
    pub fn with_config(config: EmitterConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            config,
            sender,
            listeners: Arc::new(RwLock::new(BTreeMap::new())),
            listener_counter: AtomicU64::new(0),
            event_count: AtomicU64::new(0),
        }
    }

    /// Emitter name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Register a listener for every future event
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.insert(id, Arc::new(listener))
    }

    /// Register a listener that is delivered at most one event, then removes itself
    pub fn once<F>(&self, listener: F) -> Subscription
    where
        F: FnOnce(&E) + Send + 'static,
    {
        let id = self.next_id();
        let table: Weak<ListenerTable<E>> = Arc::downgrade(&self.listeners);
        let slot = Mutex::new(Some(listener));

        let wrapped: Listener<E> = Arc::new(move |event: &E| {
            let Some(listener) = slot.lock().take() else {
                return;
            };
            if let Some(table) = table.upgrade() {
                table.write().remove(&id);
            }
            listener(event);
        });

        self.insert(id, wrapped)
    }

    /// Re-fire every event of this emitter on `target`, running `hook` first
    ///
    /// The relay holds `target` weakly; once it is dropped events are no
    /// longer forwarded.
    pub fn forward_to<H>(&self, target: &Arc<Emitter<E>>, hook: H) -> Subscription
    where
        H: Fn(&E) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.subscribe(move |event| {
            hook(event);
            if let Some(target) = target.upgrade() {
                target.fire(event.clone());
            }
        })
    }

    /// Deliver an event to all listeners and broadcast receivers
    pub fn fire(&self, event: E) {
        let count = self.event_count.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot: Vec<(ListenerId, Listener<E>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        trace!(
            emitter = %self.config.name,
            listeners = snapshot.len(),
            "Firing event #{}", count
        );

        for (id, listener) in snapshot {
            trace!(emitter = %self.config.name, listener_id = %id, "Delivering event");
            listener(&event);
        }

        // No receivers is not an error
        let _ = self.sender.send(event);
    }

    /// Broadcast receiver (stream style)
    pub fn receiver(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Total events fired
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.listener_counter.fetch_add(1, Ordering::SeqCst))
    }

    fn insert(&self, id: ListenerId, listener: Listener<E>) -> Subscription {
        self.listeners.write().insert(id, listener);

        debug!(
            emitter = %self.config.name,
            listener_id = %id,
            "Registered listener"
        );

        let table: Weak<ListenerTable<E>> = Arc::downgrade(&self.listeners);
        let name = self.config.name.clone();
        Subscription::new(id, move || {
            let Some(table) = table.upgrade() else {
                return false;
            };
            let removed = table.write().remove(&id).is_some();
            if removed {
                debug!(emitter = %name, listener_id = %id, "Unregistered listener");
            }
            removed
        })
    }
}

impl<E> Default for Emitter<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.config.name)
            .field("listeners", &self.listeners.read().len())
            .field("events", &self.event_count.load(Ordering::SeqCst))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
