//! Lobby configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Settings shared by every lobby a coordinator manages.
///
/// The server builder accepts one of these; anything not overridden
/// keeps the default below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Fixed start of every lobby code.
    pub code_prefix: String,

    /// Number of random base-36 characters after the prefix. Grows on
    /// its own if the code space fills up.
    pub code_suffix_len: usize,

    /// Minimum server-computed accuracy (percent) a final text needs to
    /// win the race.
    pub win_accuracy_threshold: f64,

    /// Capacity of the coordinator's command channel. Connection handlers
    /// wait when it is full.
    pub command_channel_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            code_prefix: "ACM".to_string(),
            code_suffix_len: 3,
            win_accuracy_threshold: 70.0,
            command_channel_size: 64,
        }
    }
}
