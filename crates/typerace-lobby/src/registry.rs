//! Every live lobby, keyed by code.

use std::collections::HashMap;

use typerace_protocol::{LobbyCode, ParticipantId};

use crate::Lobby;

/// The part a participant plays in its lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Racer,
}

/// Owns all lobbies. Lives inside the coordinator, which is the only
/// thing that touches it, so there is no locking here.
#[derive(Debug, Default)]
pub struct LobbyRegistry {
    lobbies: HashMap<LobbyCode, Lobby>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a lobby under its code, replacing nothing: the caller
    /// generates codes that are not in use.
    pub fn insert(&mut self, lobby: Lobby) {
        debug_assert!(!self.lobbies.contains_key(lobby.code()));
        self.lobbies.insert(lobby.code().clone(), lobby);
    }

    pub fn get(&self, code: &LobbyCode) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub fn get_mut(&mut self, code: &LobbyCode) -> Option<&mut Lobby> {
        self.lobbies.get_mut(code)
    }

    pub fn remove(&mut self, code: &LobbyCode) -> Option<Lobby> {
        self.lobbies.remove(code)
    }

    pub fn contains(&self, code: &LobbyCode) -> bool {
        self.lobbies.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &LobbyCode> {
        self.lobbies.keys()
    }

    /// Finds the lobby `id` belongs to and in which role.
    ///
    /// A participant is in at most one lobby at a time; the coordinator
    /// refuses creates and joins that would break that.
    pub fn find_membership(&self, id: &ParticipantId) -> Option<(LobbyCode, Role)> {
        self.lobbies.values().find_map(|lobby| {
            if lobby.is_host(id) {
                Some((lobby.code().clone(), Role::Host))
            } else if lobby.racer(id).is_some() {
                Some((lobby.code().clone(), Role::Racer))
            } else {
                None
            }
        })
    }
}
