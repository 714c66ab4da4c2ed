//! Session registry — the live peers, keyed on identifier.

use std::sync::Arc;

use dashmap::DashMap;

use rendezvous_core::PeerId;

use crate::session::Session;

/// The session registry, shared by every connection's handler.
///
/// Cloning is cheap and yields a handle to the same set. Each relay owns
/// its own registry; there is no process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<PeerId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session under its identifier.
    ///
    /// No uniqueness check: if the id is already taken the new session
    /// replaces the old one, which is returned.
    pub fn insert(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(session.id(), session)
    }

    /// Remove whatever session holds `id`. Absent ids are a no-op.
    pub fn remove(&self, id: PeerId) -> Option<Arc<Session>> {
        self.sessions.remove(&id).map(|(_, s)| s)
    }

    /// Remove `session` only if it is still the one registered under its id.
    ///
    /// A session displaced by a colliding insert leaves the newer one alone.
    pub fn remove_exact(&self, session: &Session) -> Option<Arc<Session>> {
        self.sessions
            .remove_if(&session.id(), |_, s| std::ptr::eq(Arc::as_ptr(s), session))
            .map(|(_, s)| s)
    }

    pub fn find(&self, id: PeerId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Every open session except `excluded`, yielded lazily.
    ///
    /// Sessions that close mid-iteration are skipped if not yet reached.
    /// Shard read locks are held while iterating: do not insert or remove
    /// from the same thread until the iterator is dropped.
    pub fn for_each_except(&self, excluded: PeerId) -> impl Iterator<Item = Arc<Session>> + '_ {
        self.sessions.iter().filter_map(move |entry| {
            let session = entry.value();
            (session.id() != excluded && session.is_open()).then(|| Arc::clone(session))
        })
    }

    /// Point-in-time copy of every registered session, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        let mut all: Vec<_> = self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        all.sort_by_key(|s| s.id());
        all
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
