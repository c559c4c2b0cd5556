//! Session-level glue binding a connection to protocol factories.
//!
//! A [`PeerSession`] is pure plumbing: it pairs a session identifier
//! with the message and AVP factories an application layer uses to
//! build traffic for that session, and it remembers the most recent
//! incoming request so an answer can be correlated later. The
//! [`SessionRegistry`] stores non-owning weak references so background
//! tasks can look sessions up without keeping dead ones alive.

use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use dashmap::DashMap;

/// Protocol session glue: factories plus the last incoming request.
///
/// The request slot holds at most one message. Recording a new request
/// unconditionally overwrites the previous one; there is no queue and
/// no history.
#[derive(Debug)]
pub struct PeerSession<M, A> {
    session_id: String,
    message_factory: M,
    avp_factory: A,
    last_request: Mutex<Option<Bytes>>,
}

impl<M, A> PeerSession<M, A> {
    /// Create a session bound to the given factories.
    #[must_use]
    pub fn new(session_id: impl Into<String>, message_factory: M, avp_factory: A) -> Self {
        Self {
            session_id: session_id.into(),
            message_factory,
            avp_factory,
            last_request: Mutex::new(None),
        }
    }

    /// The session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str { &self.session_id }

    /// The message factory for this session.
    #[must_use]
    pub fn message_factory(&self) -> &M { &self.message_factory }

    /// The AVP factory for this session.
    #[must_use]
    pub fn avp_factory(&self) -> &A { &self.avp_factory }

    /// Remember `request` as the most recent incoming request,
    /// replacing whatever was held before.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the internal lock panicked.
    pub fn record_incoming_request(&self, request: Bytes) {
        let mut slot = self
            .last_request
            .lock()
            .expect("last-request lock poisoned");
        *slot = Some(request);
    }

    /// The most recently recorded incoming request, if any.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the internal lock panicked.
    #[must_use]
    pub fn last_request(&self) -> Option<Bytes> {
        self.last_request
            .lock()
            .expect("last-request lock poisoned")
            .clone()
    }
}

/// Concurrent registry of sessions keyed by session identifier.
///
/// Entries are weak; a session dies when its owner drops the last
/// strong reference, and stale entries are removed lazily at lookup or
/// explicitly via [`prune`](Self::prune).
#[derive(Debug)]
pub struct SessionRegistry<M, A>(DashMap<String, Weak<PeerSession<M, A>>>);

impl<M, A> Default for SessionRegistry<M, A> {
    fn default() -> Self { Self(DashMap::new()) }
}

impl<M, A> SessionRegistry<M, A> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Retrieve the session for `id` if it is still alive.
    pub fn get(&self, id: &str) -> Option<Arc<PeerSession<M, A>>> {
        let guard = self.0.get(id);
        let session = guard.as_ref().and_then(|weak| weak.upgrade());
        drop(guard);
        if session.is_none() {
            self.0.remove_if(id, |_, weak| weak.strong_count() == 0);
        }
        session
    }

    /// Insert a session under its own identifier.
    pub fn insert(&self, session: &Arc<PeerSession<M, A>>) {
        self.0
            .insert(session.session_id().to_owned(), Arc::downgrade(session));
    }

    /// Remove a session, typically on teardown.
    pub fn remove(&self, id: &str) { self.0.remove(id); }

    /// Remove all stale weak references.
    ///
    /// `DashMap::retain` acquires per-bucket write locks, so other
    /// operations may contend briefly while the registry is pruned.
    pub fn prune(&self) { self.0.retain(|_, weak| weak.strong_count() > 0); }

    /// Number of entries, dead or alive, currently stored.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the registry holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
