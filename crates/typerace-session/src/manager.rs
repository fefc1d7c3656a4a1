//! The session manager: issues and tracks participant ids.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain struct over two `HashMap`s. The server
//! wraps it in a mutex; it does no locking of its own.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;
use typerace_protocol::ParticipantId;
use typerace_transport::ConnectionId;

use crate::{Session, SessionError};

/// Length of generated participant ids.
const PARTICIPANT_ID_LEN: usize = 20;

/// Characters participant ids are drawn from.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Tracks every live connection and its participant id.
///
/// ## Lifecycle
///
/// ```text
/// accept ──→ create() ──→ [live] ──→ disconnect() ──→ gone
/// ```
///
/// There is no disconnected-but-resumable state: when the socket goes,
/// the id goes with it, and the lobby coordinator is told to drop the
/// participant from whatever lobby it was in.
pub struct SessionManager {
    /// Live sessions, keyed by participant id.
    sessions: HashMap<ParticipantId, Session>,

    /// Reverse index so the transport side can find a session by the
    /// connection it came in on. Kept in sync with `sessions`.
    connections: HashMap<ConnectionId, ParticipantId>,
}

impl SessionManager {
    /// Creates an empty session manager.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Binds a freshly accepted connection to a new participant id.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the connection
    /// already has a session.
    pub fn create(&mut self, connection_id: ConnectionId) -> Result<&Session, SessionError> {
        if self.connections.contains_key(&connection_id) {
            return Err(SessionError::AlreadyConnected(connection_id));
        }

        let participant_id = loop {
            let candidate = generate_participant_id();
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        self.connections
            .insert(connection_id, participant_id.clone());
        let session = self
            .sessions
            .entry(participant_id.clone())
            .or_insert(Session {
                participant_id: participant_id.clone(),
                connection_id,
                connected_at: Instant::now(),
            });

        tracing::info!(%connection_id, %participant_id, "session created");
        Ok(session)
    }

    /// Forgets a participant. Returns the session that was removed.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if there is no such session.
    pub fn disconnect(&mut self, participant_id: &ParticipantId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(participant_id)
            .ok_or_else(|| SessionError::NotFound(participant_id.clone()))?;
        self.connections.remove(&session.connection_id);

        tracing::info!(
            %participant_id,
            connected_for_ms = session.age().as_millis() as u64,
            "session closed"
        );
        Ok(session)
    }

    /// Looks up a session by participant id.
    pub fn get(&self, participant_id: &ParticipantId) -> Option<&Session> {
        self.sessions.get(participant_id)
    }

    /// Looks up the participant id bound to a connection.
    pub fn participant_for(&self, connection_id: ConnectionId) -> Option<&ParticipantId> {
        self.connections.get(&connection_id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a random lowercase base-36 id.
///
/// Ids are ephemeral and never authenticate anything, so all they need
/// is to be unique among live sessions; `create` retries on collision.
fn generate_participant_id() -> ParticipantId {
    let mut rng = rand::rng();
    let id: String = (0..PARTICIPANT_ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    ParticipantId(id)
}

// =========================================================================
// Tests
// =========================================================================
