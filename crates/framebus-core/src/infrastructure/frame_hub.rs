//! In-process [`Channel`]: a queued, origin-tagged router between frames.
//!
//! `FrameHub` stands in for the host's cross-context delivery.  Each frame
//! has an origin and an optional parent.  Posting enqueues the string; the
//! hub's owner drains the queue with [`FrameHub::run_until_idle`] (or one
//! step at a time with [`FrameHub::deliver_next`]), so a handler never runs
//! inside the `post` call that produced its message.
//!
//! # Addressing (for beginners)
//!
//! A frame can be addressed two ways:
//!
//! | Handle                     | Meaning                                         |
//! |----------------------------|-------------------------------------------------|
//! | `FrameHandle::Window(id)`  | the frame's own execution context               |
//! | `FrameHandle::Element(id)` | the embedding element that hosts frame `id`     |
//!
//! Messages always report their sender as a `Window`.  An `Element` embeds
//! the `Window` with the same id, so a bus filtering on the element accepts
//! messages from the window it hosts.
//!
//! # Drops
//!
//! Like the host primitive it models, the hub drops silently (with a `debug!`
//! log) when the target frame has been closed, or when the post's
//! `target_origin` is neither `"*"` nor the target's origin.  Posting to an
//! id the hub never issued is an error.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::{Channel, ChannelError, InboundHandler, InboundMessage};
use crate::domain::context::Context;
use crate::domain::origin::WILDCARD_ORIGIN;
use crate::protocol::sequence::{ListenerId, SequenceCounter};

/// Upper bound on deliveries in one `run_until_idle` call.  Two proxies
/// pointing at each other would otherwise ping-pong forever.
pub const MAX_DELIVERIES_PER_RUN: usize = 10_000;

/// Unique identity of a frame within a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(Uuid);

impl FrameId {
    fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First UUID group is enough to tell frames apart in logs.
        let text = self.0.to_string();
        f.write_str(text.split('-').next().unwrap_or(&text))
    }
}

/// An addressable context inside a [`FrameHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameHandle {
    /// The frame's execution context.
    Window(FrameId),
    /// The element embedding the frame.
    Element(FrameId),
}

impl FrameHandle {
    /// The frame this handle refers to.
    pub fn frame_id(&self) -> FrameId {
        match self {
            FrameHandle::Window(id) | FrameHandle::Element(id) => *id,
        }
    }
}

impl Context for FrameHandle {
    fn embedded(&self) -> Option<Self> {
        match self {
            FrameHandle::Element(id) => Some(FrameHandle::Window(*id)),
            FrameHandle::Window(_) => None,
        }
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameHandle::Window(id) => write!(f, "window:{id}"),
            FrameHandle::Element(id) => write!(f, "element:{id}"),
        }
    }
}

struct FrameRecord {
    origin: String,
    handlers: Vec<(ListenerId, InboundHandler<FrameHandle>)>,
}

struct Delivery {
    target: FrameId,
    data: String,
    sender: FrameId,
    sender_origin: String,
}

struct HubState {
    frames: HashMap<FrameId, FrameRecord>,
    /// Every frame ever closed on this hub.  Never pruned: a post to a closed
    /// frame must stay a quiet drop rather than become `UnknownTarget`.
    closed: HashSet<FrameId>,
    queue: VecDeque<Delivery>,
}

struct HubInner {
    state: Mutex<HubState>,
    ids: SequenceCounter,
}

/// The shared router.  Clones refer to the same hub.
#[derive(Clone)]
pub struct FrameHub {
    inner: Arc<HubInner>,
}

impl FrameHub {
    /// Creates a hub with no frames.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState {
                    frames: HashMap::new(),
                    closed: HashSet::new(),
                    queue: VecDeque::new(),
                }),
                ids: SequenceCounter::new(),
            }),
        }
    }

    /// Opens a top-level frame with the given origin.
    pub fn open(&self, origin: impl Into<String>) -> FrameEndpoint {
        self.insert_frame(origin.into(), None)
    }

    /// Opens a frame embedded in `parent`.
    pub fn embed(&self, parent: &FrameEndpoint, origin: impl Into<String>) -> FrameEndpoint {
        self.insert_frame(origin.into(), Some(parent.id))
    }

    fn insert_frame(&self, origin: String, parent: Option<FrameId>) -> FrameEndpoint {
        let id = FrameId::new_v4();
        self.state().frames.insert(
            id,
            FrameRecord {
                origin: origin.clone(),
                handlers: Vec::new(),
            },
        );
        debug!(frame = %id, %origin, "opened frame");
        FrameEndpoint {
            hub: self.clone(),
            id,
            origin,
            parent,
        }
    }

    /// Removes a frame.  Queued messages for it are dropped on delivery and
    /// later posts to it are dropped at once.
    pub fn close(&self, id: FrameId) {
        let mut state = self.state();
        if state.frames.remove(&id).is_some() {
            state.closed.insert(id);
            debug!(frame = %id, "closed frame");
        }
    }

    /// `true` while the frame exists.
    pub fn is_open(&self, id: FrameId) -> bool {
        self.state().frames.contains_key(&id)
    }

    /// Number of frames closed so far.
    pub fn closed_count(&self) -> usize {
        self.state().closed.len()
    }

    /// Number of queued, undelivered messages.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Delivers the oldest queued message.  Returns `false` if the queue was
    /// empty.
    pub fn deliver_next(&self) -> bool {
        let (delivery, handlers) = {
            let mut state = self.state();
            let Some(delivery) = state.queue.pop_front() else {
                return false;
            };
            let handlers: Vec<InboundHandler<FrameHandle>> = match state.frames.get(&delivery.target) {
                Some(record) => record.handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => {
                    debug!(frame = %delivery.target, "dropped message for closed frame");
                    return true;
                }
            };
            (delivery, handlers)
        };

        let message = InboundMessage::new(
            delivery.data,
            delivery.sender_origin,
            Some(FrameHandle::Window(delivery.sender)),
        );
        for handler in handlers {
            handler(&message);
        }
        true
    }

    /// Delivers queued messages, including ones posted by handlers, until
    /// the queue is empty.  Returns the number of messages taken off the
    /// queue.
    pub fn run_until_idle(&self) -> usize {
        let mut delivered = 0;
        while delivered < MAX_DELIVERIES_PER_RUN {
            if !self.deliver_next() {
                return delivered;
            }
            delivered += 1;
        }
        warn!(
            pending = self.pending(),
            "delivery limit reached; possible message loop between frames"
        );
        delivered
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("FrameHub")
            .field("frames", &state.frames.len())
            .field("closed", &state.closed.len())
            .field("pending", &state.queue.len())
            .finish()
    }
}

/// One frame's view of the hub: what a bus running inside that frame is
/// given as its [`Channel`].
#[derive(Clone)]
pub struct FrameEndpoint {
    hub: FrameHub,
    id: FrameId,
    origin: String,
    parent: Option<FrameId>,
}

impl FrameEndpoint {
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// This frame's origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Handle to this frame's execution context.
    pub fn window(&self) -> FrameHandle {
        FrameHandle::Window(self.id)
    }

    /// Handle to the element hosting this frame.
    pub fn element(&self) -> FrameHandle {
        FrameHandle::Element(self.id)
    }

    /// Handle to the embedding frame's window, if any.
    pub fn parent(&self) -> Option<FrameHandle> {
        self.parent.map(FrameHandle::Window)
    }

    /// Closes this frame.
    pub fn close(&self) {
        self.hub.close(self.id);
    }
}

impl fmt::Debug for FrameEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameEndpoint")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("parent", &self.parent)
            .finish()
    }
}

impl Channel<FrameHandle> for FrameEndpoint {
    fn post(
        &self,
        target: &FrameHandle,
        payload: &str,
        target_origin: &str,
    ) -> Result<(), ChannelError> {
        let target_id = target.frame_id();
        let mut state = self.hub.state();

        if !state.frames.contains_key(&self.id) {
            return Err(ChannelError::Closed);
        }
        let target_frame_origin = match state.frames.get(&target_id) {
            Some(record) => record.origin.as_str(),
            None if state.closed.contains(&target_id) => {
                debug!(frame = %target, "dropped post to closed frame");
                return Ok(());
            }
            None => return Err(ChannelError::UnknownTarget(target.to_string())),
        };
        if target_origin != WILDCARD_ORIGIN && target_origin != target_frame_origin {
            debug!(
                frame = %target,
                target_origin,
                actual = target_frame_origin,
                "dropped post with mismatched target origin"
            );
            return Ok(());
        }

        state.queue.push_back(Delivery {
            target: target_id,
            data: payload.to_string(),
            sender: self.id,
            sender_origin: self.origin.clone(),
        });
        Ok(())
    }

    fn subscribe(&self, handler: InboundHandler<FrameHandle>) -> ListenerId {
        let id = self.hub.inner.ids.next();
        if let Some(record) = self.hub.state().frames.get_mut(&self.id) {
            record.handlers.push((id, handler));
        }
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        if let Some(record) = self.hub.state().frames.get_mut(&self.id) {
            record.handlers.retain(|(existing, _)| *existing != id);
        }
    }
}
