//! # Typerace
//!
//! Server for short multiplayer typing races.
//!
//! A host opens a lobby and shares its code, racers join with the code,
//! the host starts the race, and everyone's progress is broadcast until
//! the first racer whose final text passes the server's accuracy check
//! is declared the winner.
//!
//! This crate wires the layers together: WebSocket transport → JSON
//! protocol → per-connection sessions → the lobby coordinator actor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typerace::prelude::*;
//!
//! # async fn run() -> Result<(), TyperaceError> {
//! let server = TyperaceServer::<JsonCodec>::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::TyperaceError;
pub use server::{PROTOCOL_VERSION, ServerBuilder, TyperaceServer};

/// Everything needed to configure and run a server, plus the wire types
/// a client needs to talk to it.
pub mod prelude {
    pub use crate::{PROTOCOL_VERSION, ServerBuilder, TyperaceError, TyperaceServer};
    pub use typerace_lobby::{CoordinatorHandle, LobbyConfig, LobbyError, SamplePool, TrackCatalog};
    pub use typerace_protocol::{
        ClientRequest, Codec, Envelope, JsonCodec, LobbyCode, LobbySnapshot, Participant,
        ParticipantId, Payload, RaceState, Reply, ServerEvent, SystemMessage, TelemetryPatch,
        TrackId,
    };
}
