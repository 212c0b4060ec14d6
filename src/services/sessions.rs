use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::models::CallSession;

pub type SharedSession = Arc<Mutex<CallSession>>;

/// In-memory sessions keyed by call id.
///
/// Each session sits behind its own async mutex, so turns of one call run one at a time while
/// different calls proceed in parallel.
pub struct SessionStore {
    sessions: DashMap<String, SharedSession>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live session for `call_id`, creating it with `init` when absent.
    pub fn get_or_create<F>(&self, call_id: &str, init: F) -> SharedSession
    where
        F: FnOnce() -> CallSession,
    {
        self.sessions
            .entry(call_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(call_id = %call_id, "new call session");
                Arc::new(Mutex::new(init()))
            })
            .clone()
    }

    pub fn get(&self, call_id: &str) -> Option<SharedSession> {
        self.sessions.get(call_id).map(|s| s.clone())
    }

    /// Puts a session fetched earlier back under `call_id` if the entry has since been purged.
    /// Returns false when another session now owns the id.
    pub fn attach(&self, call_id: &str, session: &SharedSession) -> bool {
        match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(entry) => Arc::ptr_eq(entry.get(), session),
            Entry::Vacant(entry) => {
                tracing::debug!(call_id = %call_id, "session re-attached after purge");
                entry.insert(Arc::clone(session));
                true
            }
        }
    }

    pub fn remove(&self, call_id: &str) -> bool {
        self.sessions.remove(call_id).is_some()
    }

    /// Drops sessions whose expiry has passed. Sessions locked by a turn in flight are kept.
    pub fn purge_expired(&self, now: NaiveDateTime) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => !s.is_expired(now),
            Err(_) => true,
        });
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::info!(purged, "expired call sessions purged");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
