//! Connection identity for Typerace.
//!
//! Every live connection gets an ephemeral [`ParticipantId`] when it is
//! accepted. The lobby coordinator only ever sees that id: it is who
//! created a lobby, who joined it, and who a progress update belongs to.
//! The id dies with the connection; there is no login and no resume.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)     ← attributes requests to ParticipantIds
//!     ↕
//! Session Layer (this)    ← ConnectionId → ParticipantId
//!     ↕
//! Transport Layer (below) ← provides ConnectionId
//! ```
//!
//! [`ParticipantId`]: typerace_protocol::ParticipantId

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::Session;
