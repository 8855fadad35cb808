//! Authority-side registry of connected client sessions
//!
//! This module owns the canonical record of every client that is currently
//! reporting state over the reply channel:
//! - Session creation on the first message bearing an unseen name
//! - Position and activity overwrites on every later message
//! - Terminal removal when a client reports itself inactive
//! - Expiry of sessions that stopped reporting altogether
//!
//! The registry keeps only the most recent position per name. It performs no
//! validation of reported movement; any position a client sends is accepted.

use shared::Position;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Registry handle shared between the reply loop, the broadcast loop and the
/// expiry task.
pub type SharedRegistry = Arc<RwLock<SessionRegistry>>;

/// Last-known state of one client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSession {
    /// Client-chosen name, unique among live sessions
    pub name: String,
    /// Most recently reported position
    pub position: Position,
    /// Whether the client still considers itself in the game
    pub active: bool,
    /// Last time a message from this client was applied
    pub last_seen: Instant,
}

impl ClientSession {
    /// Creates an active session at the given position
    pub fn new(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            position,
            active: true,
            last_seen: Instant::now(),
        }
    }

    /// Returns true if no message arrived within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Mapping from client name to its last-known session state
///
/// Not synchronized on its own; wrap it in a [`SharedRegistry`] to share it
/// between tasks. Every read and write then happens under the lock, so
/// [`SessionRegistry::snapshot`] can never observe a half-applied update.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, ClientSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Records the latest position reported under `name`
    ///
    /// Creates an active session when the name is unknown, otherwise
    /// overwrites the position and marks the session active and fresh.
    /// Returns true if a new session was created.
    pub fn upsert(&mut self, name: &str, x: f64, y: f64) -> bool {
        let position = Position::new(x, y);

        match self.sessions.get_mut(name) {
            Some(session) => {
                session.position = position;
                session.active = true;
                session.last_seen = Instant::now();
                false
            }
            None => {
                self.sessions
                    .insert(name.to_string(), ClientSession::new(name, position));
                true
            }
        }
    }

    /// Removes the session for `name` and returns its final state
    ///
    /// The returned session is marked inactive. Returns None if no session
    /// with that name exists. Removal is terminal: a later
    /// [`SessionRegistry::upsert`] with the same name starts from scratch.
    pub fn mark_inactive_and_remove(&mut self, name: &str) -> Option<ClientSession> {
        self.sessions.remove(name).map(|mut session| {
            session.active = false;
            session
        })
    }

    /// Returns every live session, ordered by name
    pub fn snapshot(&self) -> Vec<ClientSession> {
        self.sessions.values().cloned().collect()
    }

    /// Removes sessions that have not reported within `timeout`
    ///
    /// Returns the removed sessions (marked inactive) so the caller can
    /// announce the departures.
    pub fn expire(&mut self, timeout: Duration) -> Vec<ClientSession> {
        let expired: Vec<String> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.name.clone())
            .collect();

        expired
            .iter()
            .filter_map(|name| self.mark_inactive_and_remove(name))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ClientSession> {
        self.sessions.get(name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
