//! Lobby coordination for Typerace.
//!
//! All lobbies live in one [`Coordinator`], owned by a single Tokio task
//! (the coordinator actor). Connection handlers reach it through a
//! [`CoordinatorHandle`].
//!
//! # Key types
//!
//! - [`Lobby`] — one lobby and its race state machine
//! - [`Coordinator`] — create/join/select-track/start/update/submit/disconnect
//! - [`CoordinatorHandle`] — send commands to the running actor
//! - [`Broadcast`] — publish/subscribe seam; [`ChannelGateway`] for the server
//! - [`TextProvider`] — where race texts come from; [`SamplePool`] by default
//! - [`TrackCatalog`] — selectable tracks
//! - [`LobbyConfig`] — code shape, win threshold, channel size

mod actor;
mod code;
mod config;
mod coordinator;
mod error;
mod gateway;
mod lobby;
mod registry;
mod scoring;
mod text;
mod tracks;

pub use actor::{CoordinatorHandle, spawn_coordinator};
pub use code::{generate_code, generate_unique_code, normalize_code};
pub use config::LobbyConfig;
pub use coordinator::{Coordinator, Departure, unix_millis};
pub use error::{LobbyError, Rejection};
pub use gateway::{Broadcast, ChannelGateway, Outbox};
pub use lobby::{JoinOutcome, Lobby};
pub use registry::{LobbyRegistry, Role};
pub use scoring::{passes, score_accuracy};
pub use text::{DEFAULT_SAMPLE_LEN, FALLBACK_TEXT, SamplePool, TextProvider, split_into_samples};
pub use tracks::TrackCatalog;
