//! Message envelopes exchanged between racers' clients and the server.
//!
//! Every frame on the wire is one [`Envelope`]. Its [`Payload`] is one of:
//!
//! - [`SystemMessage`] — connection plumbing (hello, heartbeat, goodbye).
//! - [`ClientRequest`] — a lobby operation the client asks for.
//! - a reply to one request, correlated by the request's `seq`.
//! - [`ServerEvent`] — a broadcast to everyone in a lobby.

use serde::{Deserialize, Serialize};

use crate::types::{LobbyCode, LobbySnapshot, ParticipantId, TelemetryPatch, TrackId};

// ---------------------------------------------------------------------------
// SystemMessage
// ---------------------------------------------------------------------------

/// Connection-level messages, independent of any lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server, first message on a connection.
    Hello { version: u32 },

    /// Server → Client: the connection is live and this is the id the
    /// server will attribute every request on it to.
    Welcome {
        participant_id: ParticipantId,
        server_time: u64,
    },

    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client keep-alive answer.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Client → Server: "I'm leaving." Handled like a dropped socket.
    Goodbye { reason: String },

    /// Server → Client: a connection-level failure (bad version, bad
    /// first message). Lobby failures use [`Reply::JoinFailed`] and
    /// [`Reply::CreateFailed`] instead.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// ClientRequest
// ---------------------------------------------------------------------------

/// A lobby operation requested by a client.
///
/// The sender's identity is never part of the request; the server
/// attributes it to the participant id bound to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientRequest {
    CreateLobby { host_name: String },
    SelectTrack { code: LobbyCode, track_id: TrackId },
    JoinLobby { code: LobbyCode, player_name: String },
    StartGame { code: LobbyCode },
    PlayerUpdate { code: LobbyCode, update: TelemetryPatch },
    SubmitFinalText { code: LobbyCode, final_input: String },
}

impl ClientRequest {
    /// The wire name of this request, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateLobby { .. } => "create-lobby",
            Self::SelectTrack { .. } => "select-track",
            Self::JoinLobby { .. } => "join-lobby",
            Self::StartGame { .. } => "start-game",
            Self::PlayerUpdate { .. } => "player-update",
            Self::SubmitFinalText { .. } => "submit-final-text",
        }
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Direct answer to the two requests that have one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Reply {
    /// Answer to `create-lobby`.
    LobbyCreated { code: LobbyCode, lobby: LobbySnapshot },
    /// Successful answer to `join-lobby`.
    Joined { lobby: LobbySnapshot },
    /// Failed `join-lobby`. `error` is human-readable: `"Lobby not
    /// found."` or `"Race has already started."`, or, when the sender
    /// already belongs to another lobby, a message naming that lobby.
    JoinFailed { error: String },
    /// Failed `create-lobby`. Only sent when the sender already hosts or
    /// races in a lobby.
    CreateFailed { error: String },
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// A broadcast to every participant subscribed to one lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Generic "here is the new state".
    LobbyUpdated { lobby: LobbySnapshot },
    /// The host started the race. Clients switch to the race view and
    /// run their countdown before accepting input.
    GameStarted { lobby: LobbySnapshot },
    /// The host left and the lobby no longer exists. Terminal: nothing
    /// else is sent for this lobby.
    LobbyClosed,
}

impl ServerEvent {
    /// The snapshot carried by this event, if any.
    pub fn lobby(&self) -> Option<&LobbySnapshot> {
        match self {
            Self::LobbyUpdated { lobby } | Self::GameStarted { lobby } => Some(lobby),
            Self::LobbyClosed => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// What's inside an envelope.
///
/// Adjacently tagged, so a frame reads as
/// `{ "type": "Request", "data": { "type": "join-lobby", ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Request(ClientRequest),
    Reply { request_seq: u64, reply: Reply },
    Event(ServerEvent),
}

/// The top-level frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number. Clients use it to match replies
    /// (`Payload::Reply::request_seq`) to the request they sent.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    /// Wraps a payload with the given sequence number and timestamp.
    pub fn new(seq: u64, timestamp: u64, payload: Payload) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}
