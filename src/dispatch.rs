//! Fan-out of decoded messages to registered handlers.
//!
//! A [`MessageDispatcher`] holds a registry of `(filter, handler)` pairs.
//! Every message passed to [`MessageDispatcher::dispatch`] is offered to all
//! registered filters, and each matching handler is invoked once on the
//! delivering thread.
//!
//! Registrations are RAII handles. Dropping a [`Registration`] (or calling
//! [`Registration::unregister`]) removes the handler, waiting for an
//! in-flight invocation of it to finish first. Once removal returns, the
//! handler is never called again.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use icsneo_rs::dispatch::MessageDispatcher;
//! use icsneo_rs::filter::MessageFilter;
//! use icsneo_rs::message::{CanMessage, Message};
//! use icsneo_rs::network::NetId;
//!
//! let dispatcher = MessageDispatcher::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! let registration = dispatcher.register(MessageFilter::for_network(NetId::HsCan), move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! let msg: Message = CanMessage::builder(NetId::HsCan, 0x100).build().into();
//! dispatcher.dispatch(Arc::new(msg));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! registration.unregister();
//! assert!(dispatcher.is_empty());
//! ```

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, trace, warn};

use crate::error::Result;
use crate::filter::MessageFilter;
use crate::message::Message;

/// Handler signature accepted by the dispatcher.
pub type MessageHandler = dyn Fn(&Arc<Message>) -> Result<()> + Send + Sync;

/// One registered handler.
struct Entry {
    id: u64,
    filter: MessageFilter,
    handler: Box<MessageHandler>,
    /// Held for the whole of every invocation. Cleared exactly once on removal.
    ///
    /// Re-entrant so a handler can remove its own registration.
    active: ReentrantMutex<Cell<bool>>,
}

impl Entry {
    /// Invoke the handler if the entry is still registered.
    ///
    /// Returns `false` if the entry was removed before the gate was taken.
    fn invoke(&self, message: &Arc<Message>) -> bool {
        let gate = self.active.lock();
        if !gate.get() {
            return false;
        }

        match catch_unwind(AssertUnwindSafe(|| (self.handler)(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(registration = self.id, error = %e, "Message handler returned an error");
            }
            Err(_) => {
                error!(registration = self.id, "Message handler panicked");
            }
        }
        true
    }

    /// Mark the entry removed, blocking until any in-flight invocation ends.
    fn deactivate(&self) {
        let gate = self.active.lock();
        gate.set(false);
    }
}

/// Shared registry state.
struct Registry {
    next_id: AtomicU64,
    entries: RwLock<Vec<Arc<Entry>>>,
}

impl Registry {
    fn remove(&self, id: u64) -> Option<Arc<Entry>> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|e| e.id == id)?;
        Some(entries.swap_remove(pos))
    }
}

/// Routes decoded messages to interested handlers.
///
/// Cloning a dispatcher yields another handle to the same registry.
#[derive(Clone)]
pub struct MessageDispatcher {
    inner: Arc<Registry>,
}

impl MessageDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                entries: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a handler for messages matching `filter`.
    ///
    /// The handler stays registered for as long as the returned
    /// [`Registration`] is alive.
    #[must_use = "dropping the registration immediately removes the handler"]
    pub fn register<F>(&self, filter: MessageFilter, handler: F) -> Registration
    where
        F: Fn(&Arc<Message>) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            id,
            filter,
            handler: Box::new(handler),
            active: ReentrantMutex::new(Cell::new(true)),
        });

        self.inner.entries.write().push(entry.clone());
        debug!(registration = id, ?filter, "Message handler registered");

        Registration {
            entry: Some(entry),
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Offer a message to every matching handler.
    ///
    /// Matching entries are snapshotted before any handler runs, so handlers
    /// may register or remove entries freely. A handler that fails or
    /// panics does not affect delivery to the others.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, message: Arc<Message>) -> usize {
        let matching: Vec<Arc<Entry>> = self
            .inner
            .entries
            .read()
            .iter()
            .filter(|e| e.filter.matches(&message))
            .cloned()
            .collect();

        if matching.is_empty() {
            trace!(network = %message.network(), kind = ?message.kind(), "No handler for message");
            return 0;
        }

        matching.iter().filter(|e| e.invoke(&message)).count()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Check if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registration.
    ///
    /// Outstanding [`Registration`] handles become inert.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.entries.write());
        for entry in &removed {
            entry.deactivate();
        }
        debug!(count = removed.len(), "All message handlers removed");
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("registrations", &self.len())
            .finish()
    }
}

/// Handle keeping a handler registered.
///
/// Dropping the handle removes the handler. Removal blocks until an
/// in-flight invocation of this handler has returned, unless it happens on
/// the thread running that invocation (a handler removing itself).
#[must_use = "dropping the registration immediately removes the handler"]
pub struct Registration {
    entry: Option<Arc<Entry>>,
    registry: Weak<Registry>,
}

impl Registration {
    /// Numeric id of this registration, for logging.
    pub fn id(&self) -> u64 {
        self.entry.as_ref().map_or(0, |e| e.id)
    }

    /// The filter this registration was created with.
    pub fn filter(&self) -> MessageFilter {
        self.entry.as_ref().map(|e| e.filter).unwrap_or_default()
    }

    /// Remove the handler now.
    ///
    /// Blocks while another thread is running this handler. Two handlers
    /// that run on different delivery threads and each remove the other's
    /// registration will therefore deadlock. Removing a handler from inside
    /// itself, or from a handler on the same delivery thread, is safe.
    pub fn unregister(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(entry.id);
        }
        entry.deactivate();
        debug!(registration = entry.id, "Message handler removed");
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id())
            .field("filter", &self.filter())
            .finish()
    }
}
