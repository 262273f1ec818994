//! MessageBus: namespaced, origin-checked pub/sub over one string channel.
//!
//! The bus is the only owner of the routing policy (trusted origins,
//! registered namespaces, proxy routes) and of the single inbound
//! subscription on the channel.  Application code talks to it through a
//! cheaply clonable handle; every clone shares the same state.
//!
//! # Lifecycle of the wire subscription
//!
//! ```text
//!            listen(ns) [first registration]
//!   off  ─────────────────────────────────────►  on
//!        ◄─────────────────────────────────────
//!            stop_listening(ns) [last registration removed]
//! ```
//!
//! `receive` never touches the wire subscription: it only registers a local
//! listener.  A message reaches local listeners only while its namespace is
//! registered.
//!
//! # Locking
//!
//! State sits behind one `Mutex`.  The lock is released before the bus posts
//! to the channel or dispatches to the event sink, so callbacks may call
//! back into the bus (`listen`, `stop_listening`, `off`, `send`) without
//! deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::application::ports::{
    Channel, ChannelError, EventSink, InboundHandler, InboundMessage, LocalListener, MessageEvent,
};
use crate::application::screen::{Admitted, Rejection, ScreenPolicy};
use crate::application::subscription::Subscription;
use crate::domain::config::BusConfig;
use crate::domain::context::Context;
use crate::domain::namespace::{bare_namespace, qualify_type, NamespaceSet};
use crate::domain::origin::OriginAllowList;
use crate::domain::proxy::ProxyTable;
use crate::protocol::envelope::{encode_envelope, Envelope, PostOptions};
use crate::protocol::sequence::ListenerId;

/// Errors surfaced to callers of the bus.
///
/// Only caller misuse and channel failures on `send` are reported.  Problems
/// with *inbound* traffic are never errors: they are dropped silently.
#[derive(Debug, Error)]
pub enum BusError {
    /// The message data could not be serialized to JSON.
    #[error("failed to serialize message data: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The channel refused the post.
    #[error("channel rejected post: {0}")]
    Channel(#[from] ChannelError),

    /// The namespace is empty (after stripping a leading `.`).
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),
}

/// Callback form used by `receive_once` and `ignore_once`.
type OnceCallback<C> = Box<dyn FnOnce(&MessageEvent<C>) + Send>;

struct BusState<C: Context> {
    origins: OriginAllowList,
    namespaces: NamespaceSet,
    proxies: ProxyTable<C>,
    /// The channel registration while listening; `None` while not.
    wire: Option<ListenerId>,
}

struct BusInner<C: Context> {
    channel: Arc<dyn Channel<C>>,
    sink: Arc<dyn EventSink<C>>,
    self_origin: String,
    state: Mutex<BusState<C>>,
}

/// Handle to a message bus.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use framebus_core::infrastructure::{FrameHandle, FrameHub, LocalEventBus};
/// use framebus_core::MessageBus;
///
/// let hub = FrameHub::new();
/// let page = hub.open("https://www.example.com");
/// let ad = hub.embed(&page, "https://ads.example.com");
///
/// let page_bus: MessageBus<FrameHandle> = MessageBus::new(Arc::new(page.clone()), Arc::new(LocalEventBus::new()), page.origin());
/// let ad_bus: MessageBus<FrameHandle> = MessageBus::new(Arc::new(ad.clone()), Arc::new(LocalEventBus::new()), ad.origin());
///
/// page_bus.listen("dfp").unwrap();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = Arc::clone(&seen);
/// page_bus.receive(Some(&ad.element()), "init.dfp", move |event| {
///     log.lock().unwrap().push(event.detail.clone());
/// });
///
/// ad_bus.send(&page.window(), "init.dfp", &serde_json::json!({"slot": "top"}), None).unwrap();
/// hub.run_until_idle();
///
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
pub struct MessageBus<C: Context> {
    inner: Arc<BusInner<C>>,
}

impl<C: Context> MessageBus<C> {
    /// Creates a bus that trusts any origin and listens on nothing.
    ///
    /// `self_origin` is the origin of the context the bus runs in; messages
    /// from it are always trusted.
    pub fn new(
        channel: Arc<dyn Channel<C>>,
        sink: Arc<dyn EventSink<C>>,
        self_origin: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channel,
                sink,
                self_origin: self_origin.into(),
                state: Mutex::new(BusState {
                    origins: OriginAllowList::new(),
                    namespaces: NamespaceSet::new(),
                    proxies: ProxyTable::new(),
                    wire: None,
                }),
            }),
        }
    }

    /// Creates a bus from a [`BusConfig`]: applies its allow-list and starts
    /// listening on its namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidNamespace`] if a configured namespace is empty.
    pub fn from_config(
        channel: Arc<dyn Channel<C>>,
        sink: Arc<dyn EventSink<C>>,
        config: &BusConfig,
    ) -> Result<Self, BusError> {
        let bus = Self::new(channel, sink, config.self_origin.clone());
        bus.inner.state().origins = OriginAllowList::from_origins(&config.allowed_origins);
        for namespace in &config.namespaces {
            bus.listen(namespace)?;
        }
        Ok(bus)
    }

    // ── Sending ───────────────────────────────────────────────────────────────

    /// Sends a message to `target`.
    ///
    /// A `kind` without a namespace is qualified with the default namespace.
    /// Unset `options` fields take their defaults (`targetOrigin = "*"`);
    /// fields the caller set are kept.
    ///
    /// # Errors
    ///
    /// - [`BusError::Serialize`] if `data` cannot be represented as JSON.
    /// - [`BusError::Channel`] if the channel refuses the post.
    pub fn send<T>(
        &self,
        target: &C,
        kind: &str,
        data: &T,
        options: Option<PostOptions>,
    ) -> Result<(), BusError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        let envelope = Envelope::new(
            qualify_type(kind),
            data,
            options.unwrap_or_default().with_defaults(),
        );
        self.inner.post_envelope(target, &envelope)
    }

    // ── Local listeners ───────────────────────────────────────────────────────

    /// Registers `callback` for local events named `kind` (qualified with the
    /// default namespace if it has none).
    ///
    /// With `source` set, only events whose sender is `source` or the context
    /// `source` embeds are delivered.
    ///
    /// This does not register the namespace on the wire; call
    /// [`listen`](Self::listen) for that.
    pub fn receive<F>(&self, source: Option<&C>, kind: &str, callback: F) -> Subscription<C>
    where
        F: Fn(&MessageEvent<C>) + Send + Sync + 'static,
    {
        let name = qualify_type(kind);
        let active = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&active);
        let filter = source.cloned();

        let listener: LocalListener<C> = Arc::new(move |event: &MessageEvent<C>| {
            if !gate.load(Ordering::Acquire) || !passes_source_filter(filter.as_ref(), event) {
                return;
            }
            callback(event);
        });

        let id = self.inner.sink.subscribe(&name, listener);
        Subscription::new(Arc::clone(&self.inner.sink), name, id, active)
    }

    /// Like [`receive`](Self::receive), but delivers at most one event and
    /// then deregisters itself.
    pub fn receive_once<F>(&self, source: Option<&C>, kind: &str, callback: F) -> Subscription<C>
    where
        F: FnOnce(&MessageEvent<C>) + Send + 'static,
    {
        self.register_once(source, kind, Some(Box::new(callback)))
    }

    /// Consumes the next matching event without a callback, then deregisters.
    pub fn ignore_once(&self, source: Option<&C>, kind: &str) -> Subscription<C> {
        self.register_once(source, kind, None)
    }

    fn register_once(
        &self,
        source: Option<&C>,
        kind: &str,
        callback: Option<OnceCallback<C>>,
    ) -> Subscription<C> {
        let fired = Arc::new(AtomicBool::new(false));
        let slot = Mutex::new(callback);
        let handle: Arc<OnceLock<Subscription<C>>> = Arc::new(OnceLock::new());

        let fired_in = Arc::clone(&fired);
        let handle_in = Arc::clone(&handle);
        let subscription = self.receive(source, kind, move |event| {
            if fired_in.swap(true, Ordering::AcqRel) {
                return;
            }
            let callback = slot.lock().ok().and_then(|mut guard| guard.take());
            if let Some(callback) = callback {
                callback(event);
            }
            if let Some(subscription) = handle_in.get() {
                subscription.off();
            }
        });

        let _ = handle.set(subscription.clone());
        // An event delivered before the handle was stored could not call off().
        if fired.load(Ordering::Acquire) {
            subscription.off();
        }
        subscription
    }

    // ── Wire subscription ─────────────────────────────────────────────────────

    /// Registers `namespace` and makes sure the inbound handler is attached
    /// to the channel.  Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidNamespace`] for an empty namespace.
    pub fn listen(&self, namespace: &str) -> Result<(), BusError> {
        let bare = bare_namespace(namespace)
            .ok_or_else(|| BusError::InvalidNamespace(namespace.to_string()))?;

        let mut state = self.inner.state();
        if state.namespaces.insert(bare) {
            debug!(namespace = bare, "listening on namespace");
        }
        if state.wire.is_none() {
            let id = self.inner.channel.subscribe(self.inbound_handler());
            debug!(%id, "attached inbound handler to channel");
            state.wire = Some(id);
        }
        Ok(())
    }

    /// Deregisters `namespace`.  When no registration is left, the inbound
    /// handler is detached from the channel.  Unknown namespaces are ignored.
    pub fn stop_listening(&self, namespace: &str) {
        let Some(bare) = bare_namespace(namespace) else {
            return;
        };

        let mut state = self.inner.state();
        if !state.namespaces.remove(bare) {
            return;
        }
        debug!(namespace = bare, "stopped listening on namespace");
        if state.namespaces.is_empty() {
            self.inner.detach(&mut state);
        }
    }

    /// Deregisters every namespace and detaches from the channel.
    pub fn stop_listening_all(&self) {
        let mut state = self.inner.state();
        let removed = state.namespaces.clear();
        if !removed.is_empty() {
            debug!(namespaces = ?removed, "stopped listening on all namespaces");
        }
        self.inner.detach(&mut state);
    }

    fn inbound_handler(&self) -> InboundHandler<C> {
        // Weak: the channel holds the handler, the handler must not keep the
        // bus alive.
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |message: &InboundMessage<C>| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_inbound(message);
            }
        })
    }

    // ── Origins ───────────────────────────────────────────────────────────────

    /// Trusts `origin`.  `"*"` collapses the allow-list to the wildcard; any
    /// other origin replaces the wildcard.
    pub fn add_origin(&self, origin: &str) {
        if self.inner.state().origins.add(origin) {
            debug!(origin, "allowed origin");
        }
    }

    /// Stops trusting `origin`.  Unknown origins are ignored.
    pub fn remove_origin(&self, origin: &str) {
        if self.inner.state().origins.remove(origin) {
            debug!(origin, "removed allowed origin");
        }
    }

    // ── Proxying ──────────────────────────────────────────────────────────────

    /// Relays every inbound message of `namespace` to `targets`, in order,
    /// before local dispatch.  Also starts listening on `namespace`.
    ///
    /// Successive calls for the same namespace append their targets.  A
    /// single target can be passed as `[target]` or `Some(target)`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidNamespace`] for an empty namespace.
    pub fn proxy<I>(&self, namespace: &str, targets: I) -> Result<(), BusError>
    where
        I: IntoIterator<Item = C>,
    {
        self.listen(namespace)?;
        let bare = bare_namespace(namespace)
            .ok_or_else(|| BusError::InvalidNamespace(namespace.to_string()))?;

        let mut state = self.inner.state();
        state.proxies.extend(bare, targets);
        debug!(
            namespace = bare,
            targets = state.proxies.targets(bare).len(),
            "registered proxy route"
        );
        Ok(())
    }

    // ── Observation ───────────────────────────────────────────────────────────

    /// Screens `message` against the current policy without delivering it.
    ///
    /// Returns `Err(Rejection::NotListening)` while the bus is not attached
    /// to the channel, since the inbound handler would drop the message.
    pub fn inspect(&self, message: &InboundMessage<C>) -> Result<Admitted, Rejection> {
        let state = self.inner.state();
        if state.wire.is_none() {
            return Err(Rejection::NotListening);
        }
        self.inner.policy(&state).screen(&message.origin, &message.data)
    }

    /// `true` while the inbound handler is attached to the channel.
    pub fn is_listening(&self) -> bool {
        self.inner.state().wire.is_some()
    }

    /// The registered namespaces in registration order.
    pub fn namespaces(&self) -> Vec<String> {
        self.inner.state().namespaces.registered().to_vec()
    }

    /// The allow-list entries in insertion order.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.inner.state().origins.entries().to_vec()
    }

    /// The proxy targets for `namespace` in registration order.
    pub fn proxy_targets(&self, namespace: &str) -> Vec<C> {
        let bare = bare_namespace(namespace).unwrap_or(namespace);
        self.inner.state().proxies.targets(bare).to_vec()
    }

    /// The origin this bus considers its own.
    pub fn self_origin(&self) -> &str {
        &self.inner.self_origin
    }
}

impl<C: Context> Drop for BusInner<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = state.wire.take() {
            self.channel.unsubscribe(id);
            debug!(%id, "bus dropped; detached inbound handler from channel");
        }
    }
}

impl<C: Context> BusInner<C> {
    fn state(&self) -> MutexGuard<'_, BusState<C>> {
        // A panicking callback never runs under this lock, so a poisoned
        // guard still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn policy<'a>(&'a self, state: &'a BusState<C>) -> ScreenPolicy<'a> {
        ScreenPolicy {
            self_origin: &self.self_origin,
            origins: &state.origins,
            namespaces: &state.namespaces,
        }
    }

    fn detach(&self, state: &mut BusState<C>) {
        if let Some(id) = state.wire.take() {
            self.channel.unsubscribe(id);
            debug!(%id, "detached inbound handler from channel");
        }
    }

    fn post_envelope(&self, target: &C, envelope: &Envelope) -> Result<(), BusError> {
        let payload = encode_envelope(envelope)?;
        self.channel
            .post(target, &payload, envelope.options.target_origin())?;
        Ok(())
    }

    /// The inbound pipeline.  Nothing in here may fail outward: every
    /// rejection is a silent drop.
    fn handle_inbound(&self, message: &InboundMessage<C>) {
        let (admitted, targets) = {
            let state = self.state();
            if state.wire.is_none() {
                return;
            }
            match self.policy(&state).screen(&message.origin, &message.data) {
                Ok(admitted) => {
                    let targets = state.proxies.targets(&admitted.namespace).to_vec();
                    (admitted, targets)
                }
                // Foreign senders are expected noise on a shared channel.
                Err(Rejection::Origin) => return,
                Err(rejection) => {
                    trace!(origin = %message.origin, %rejection, "dropped inbound message");
                    return;
                }
            }
        };

        if !targets.is_empty() {
            let forwarded = Envelope {
                options: admitted.envelope.options.clone().with_defaults(),
                ..admitted.envelope.clone()
            };
            for target in &targets {
                if let Err(e) = self.post_envelope(target, &forwarded) {
                    warn!(?target, kind = %forwarded.kind, "proxy send failed: {e}");
                }
            }
        }

        let Admitted { envelope, .. } = admitted;
        self.sink.dispatch(&MessageEvent {
            name: envelope.kind,
            detail: envelope.data,
            source: message.source.clone(),
        });
    }
}

fn passes_source_filter<C: Context>(filter: Option<&C>, event: &MessageEvent<C>) -> bool {
    match filter {
        None => true,
        Some(expected) => event
            .source
            .as_ref()
            .is_some_and(|sender| expected.is_sender(sender)),
    }
}

impl<C: Context> Clone for MessageBus<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Context> fmt::Debug for MessageBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("MessageBus")
            .field("self_origin", &self.inner.self_origin)
            .field("listening", &state.wire.is_some())
            .field("namespaces", &state.namespaces.registered())
            .field("origins", &state.origins.entries())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
