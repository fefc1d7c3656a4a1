//! Wire protocol for Typerace.
//!
//! This crate defines what racers' clients and the server say to each
//! other:
//!
//! - **Types** ([`LobbySnapshot`], [`Participant`], [`RaceState`],
//!   [`TelemetryPatch`], ids) — the lobby data model as serialized.
//! - **Messages** ([`Envelope`], [`Payload`], [`ClientRequest`],
//!   [`Reply`], [`ServerEvent`], [`SystemMessage`]) — the frames.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes ↔ frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about sockets or lobby rules.

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ClientRequest, Envelope, Payload, Reply, ServerEvent, SystemMessage};
pub use types::{
    LobbyCode, LobbySnapshot, Participant, ParticipantId, RaceState, TelemetryPatch, TrackId,
};
