//! The lobby data model as it travels on the wire.
//!
//! Everything here is plain data: the coordinator in `typerace-lobby`
//! owns the rules, and hands out these types as snapshots. Field names
//! are camelCase in JSON because the clients are browser code.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Ephemeral id of a connected participant.
///
/// Issued by the session layer when a connection is accepted and
/// forgotten when it closes. The coordinator treats it as an opaque
/// string: two participants are the same iff their ids are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The short code players type in to join a lobby (e.g. `ACM7QZ`).
///
/// Unique among the lobbies currently registered, immutable for the
/// lifetime of its lobby.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyCode(pub String);

impl LobbyCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LobbyCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// Identifier of a race track, e.g. `track1`.
///
/// Only ids present in the server's track catalog are ever stored in a
/// lobby; anything else a client sends is rejected before it gets there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A host or racer inside a lobby.
///
/// `progress`, `wpm` and `accuracy` are telemetry computed by the client.
/// They are shown to everyone in the lobby but never used to award the
/// win; that check runs against `assigned_text` on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Percent of the assigned text typed, 0–100.
    pub progress: f64,
    /// Words per minute, never negative.
    pub wpm: f64,
    /// Client-side accuracy percent, 0–100.
    pub accuracy: f64,
    /// The paragraph this participant races against. Fixed at join time.
    pub assigned_text: String,
}

impl Participant {
    /// Creates a participant with fresh telemetry: no progress, no speed,
    /// and full accuracy.
    pub fn new(id: ParticipantId, name: impl Into<String>, assigned_text: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            progress: 0.0,
            wpm: 0.0,
            accuracy: 100.0,
            assigned_text: assigned_text.into(),
        }
    }

    /// Returns `true` once the participant reports the whole text typed.
    pub fn has_finished(&self) -> bool {
        self.progress >= 100.0
    }
}

// ---------------------------------------------------------------------------
// TelemetryPatch
// ---------------------------------------------------------------------------

/// A partial telemetry update sent by a racer while typing.
///
/// Only the fields present are merged into the racer's record. Use
/// [`sanitized`](Self::sanitized) before merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl TelemetryPatch {
    /// Drops non-finite values and clamps the rest into range:
    /// progress and accuracy to `[0, 100]`, wpm to `[0, ∞)`.
    pub fn sanitized(self) -> Self {
        let percent = |v: f64| v.clamp(0.0, 100.0);
        Self {
            progress: self.progress.filter(|v| v.is_finite()).map(percent),
            wpm: self.wpm.filter(|v| v.is_finite()).map(|v| v.max(0.0)),
            accuracy: self.accuracy.filter(|v| v.is_finite()).map(percent),
        }
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.progress.is_none() && self.wpm.is_none() && self.accuracy.is_none()
    }

    /// Overwrites the fields of `participant` that this patch carries.
    pub fn apply_to(&self, participant: &mut Participant) {
        if let Some(progress) = self.progress {
            participant.progress = progress;
        }
        if let Some(wpm) = self.wpm {
            participant.wpm = wpm;
        }
        if let Some(accuracy) = self.accuracy {
            participant.accuracy = accuracy;
        }
    }
}

// ---------------------------------------------------------------------------
// RaceState
// ---------------------------------------------------------------------------

/// Where a lobby is in its race lifecycle.
///
/// Transitions only move forward:
///
/// ```text
/// Waiting ──(host starts)──→ InProgress ──(every racer at 100%)──→ Finished
/// ```
///
/// A lobby is destroyed when its host disconnects, from any state; that
/// is not a state of its own because nothing is left to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaceState {
    Waiting,
    InProgress,
    Finished,
}

impl RaceState {
    /// Returns `true` if racers may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns the state after this one, or `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::InProgress),
            Self::InProgress => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal single step.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// LobbySnapshot
// ---------------------------------------------------------------------------

/// The full state of one lobby at one moment.
///
/// Sent to every participant after each state change and returned to
/// the requester of `create-lobby` / `join-lobby`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySnapshot {
    pub code: LobbyCode,
    pub host: Participant,
    /// Racers in join order.
    pub racers: Vec<Participant>,
    pub track_id: TrackId,
    pub state: RaceState,
    /// Unix time in milliseconds when the host started the race.
    pub started_at: Option<u64>,
    /// The first racer whose final text passed the accuracy check,
    /// frozen with the telemetry it had at that moment.
    pub winner: Option<Participant>,
}

impl LobbySnapshot {
    /// Looks up a racer by id.
    pub fn racer(&self, id: &ParticipantId) -> Option<&Participant> {
        self.racers.iter().find(|r| &r.id == id)
    }
}
