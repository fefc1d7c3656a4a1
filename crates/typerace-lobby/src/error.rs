//! Error types for the lobby layer.

use typerace_protocol::{LobbyCode, ParticipantId, RaceState, TrackId};

/// Why an operation on an existing lobby was turned down.
///
/// On the wire these are silent: the requester gets no answer and no
/// broadcast goes out. Internally they are ordinary values so callers
/// and tests can see exactly what happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    /// Only the host may select the track or start the race.
    #[error("participant {0} is not the host")]
    NotHost(ParticipantId),

    /// The track is not in the catalog.
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    /// The operation is not allowed in the lobby's current race state.
    #[error("not allowed while the race is {0}")]
    InvalidState(RaceState),

    /// The participant is not one of the lobby's racers.
    #[error("participant {0} is not racing in this lobby")]
    NotARacer(ParticipantId),

    /// Someone already won; later submissions change nothing.
    #[error("a winner has already been declared")]
    WinnerAlreadySet,

    /// The submitted text did not match the assigned text closely enough.
    #[error("final text accuracy {accuracy:.1}% is below the {threshold}% bar")]
    BelowAccuracy { accuracy: f64, threshold: f64 },
}

/// Errors that can occur during lobby operations.
///
/// The `Display` text of [`NotFound`](Self::NotFound) and
/// [`RaceAlreadyStarted`](Self::RaceAlreadyStarted) is exactly what a
/// client is shown when its join fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LobbyError {
    /// No lobby is registered under this code.
    #[error("Lobby not found.")]
    NotFound(LobbyCode),

    /// The lobby is past `waiting` and no longer takes racers.
    #[error("Race has already started.")]
    RaceAlreadyStarted(LobbyCode),

    /// The participant already hosts or races in another lobby.
    #[error("participant {0} is already in lobby {1}")]
    AlreadyInLobby(ParticipantId, LobbyCode),

    /// The lobby exists but the request was not allowed.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The coordinator task is gone (server shutting down).
    #[error("lobby coordinator is unavailable")]
    Unavailable,
}
