//! In-process [`EventSink`]: named, synchronous event dispatch.
//!
//! Listeners are kept per event name in registration order.  `dispatch`
//! copies the listener list for the event's name and releases the lock
//! before calling anything, so listeners may subscribe or unsubscribe
//! (themselves included) while they run.  A listener removed during a
//! dispatch may still see that one in-flight event; the bus guards against
//! that with the subscription's `active` flag.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::application::ports::{EventSink, LocalListener, MessageEvent};
use crate::domain::context::Context;
use crate::protocol::sequence::{ListenerId, SequenceCounter};

type Registry<C> = HashMap<String, Vec<(ListenerId, LocalListener<C>)>>;

/// A name-keyed listener registry.
pub struct LocalEventBus<C: Context> {
    listeners: Mutex<Registry<C>>,
    ids: SequenceCounter,
}

impl<C: Context> LocalEventBus<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            ids: SequenceCounter::new(),
        }
    }

    /// Number of listeners currently registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.registry().get(name).map_or(0, Vec::len)
    }

    fn registry(&self) -> MutexGuard<'_, Registry<C>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Context> Default for LocalEventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> EventSink<C> for LocalEventBus<C> {
    fn dispatch(&self, event: &MessageEvent<C>) {
        let snapshot: Vec<LocalListener<C>> = match self.registry().get(&event.name) {
            Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
            None => return,
        };
        for listener in snapshot {
            listener(event);
        }
    }

    fn subscribe(&self, name: &str, listener: LocalListener<C>) -> ListenerId {
        let id = self.ids.next();
        self.registry()
            .entry(name.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, name: &str, id: ListenerId) {
        let mut registry = self.registry();
        if let Some(entries) = registry.get_mut(name) {
            entries.retain(|(existing, _)| *existing != id);
            if entries.is_empty() {
                registry.remove(name);
            }
        }
    }
}

impl<C: Context> fmt::Debug for LocalEventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        let counts: HashMap<&str, usize> = registry
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("LocalEventBus")
            .field("listeners", &counts)
            .finish()
    }
}
