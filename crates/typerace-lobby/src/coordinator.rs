//! The lobby coordinator: every lobby operation, run against the
//! registry it owns.
//!
//! `Coordinator` is synchronous and knows nothing about tasks or
//! sockets. The actor in [`crate::actor`] wraps it for the server; tests
//! drive it directly with their own [`Broadcast`] and [`TextProvider`].
//!
//! Each operation either succeeds (and publishes whatever event it
//! implies) or returns an error having changed nothing.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;
use typerace_protocol::{
    LobbyCode, LobbySnapshot, Participant, ParticipantId, ServerEvent, TelemetryPatch, TrackId,
};

use crate::code::{generate_unique_code, normalize_code};
use crate::registry::Role;
use crate::{
    Broadcast, Lobby, LobbyConfig, LobbyError, LobbyRegistry, Rejection, TextProvider,
    TrackCatalog,
};

/// What a disconnect did to the participant's lobby.
#[derive(Debug, Clone, PartialEq)]
pub enum Departure {
    /// The host left; the lobby is gone and its subscribers were sent
    /// `lobby-closed`.
    LobbyClosed { code: LobbyCode, racers: usize },
    /// A racer left; `lobby` is the state the others were sent.
    LeftLobby { code: LobbyCode, lobby: LobbySnapshot },
}

/// Owns the registry and applies lobby operations to it.
pub struct Coordinator<P: TextProvider, B: Broadcast> {
    registry: LobbyRegistry,
    config: LobbyConfig,
    tracks: TrackCatalog,
    texts: P,
    gateway: B,
    rng: StdRng,
}

impl<P: TextProvider, B: Broadcast> Coordinator<P, B> {
    pub fn new(config: LobbyConfig, tracks: TrackCatalog, texts: P, gateway: B) -> Self {
        Self {
            registry: LobbyRegistry::new(),
            config,
            tracks,
            texts,
            gateway,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Fixes the seed used for lobby codes, for reproducible tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn registry(&self) -> &LobbyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn gateway(&self) -> &B {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut B {
        &mut self.gateway
    }

    /// Current state of a lobby, if it exists.
    pub fn snapshot(&self, code: &LobbyCode) -> Option<LobbySnapshot> {
        self.registry.get(&normalize_code(code)).map(Lobby::snapshot)
    }

    // -- lifecycle ---------------------------------------------------------

    /// Opens a new lobby hosted by `host_id`.
    ///
    /// The host gets a practice text of its own and is subscribed to the
    /// lobby channel. Nothing is broadcast; the snapshot goes back to the
    /// host in the reply.
    ///
    /// # Errors
    /// [`LobbyError::AlreadyInLobby`] if `host_id` already belongs to a
    /// lobby.
    pub fn create_lobby(
        &mut self,
        host_id: ParticipantId,
        host_name: String,
    ) -> Result<(LobbyCode, LobbySnapshot), LobbyError> {
        if let Some((current, _)) = self.registry.find_membership(&host_id) {
            return Err(LobbyError::AlreadyInLobby(host_id, current));
        }

        let code = generate_unique_code(
            &mut self.rng,
            &self.config.code_prefix,
            self.config.code_suffix_len,
            |candidate| self.registry.contains(candidate),
        );
        let text = self.texts.next_sample(&HashSet::new());
        let host = Participant::new(host_id.clone(), host_name, text);
        let lobby = Lobby::new(code.clone(), host, self.tracks.default_track().clone());
        let snapshot = lobby.snapshot();

        self.registry.insert(lobby);
        self.gateway.subscribe(&code, &host_id);

        tracing::info!(
            %code,
            participant_id = %host_id,
            lobbies = self.registry.len(),
            "lobby created"
        );
        Ok((code, snapshot))
    }

    /// Adds `id` to the lobby as a racer.
    ///
    /// A participant already in this lobby (host or racer) gets the
    /// current snapshot back and nothing changes.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`] if no lobby has this code.
    /// - [`LobbyError::RaceAlreadyStarted`] once the lobby left `waiting`.
    /// - [`LobbyError::AlreadyInLobby`] if `id` belongs to another lobby.
    pub fn join_lobby(
        &mut self,
        code: &LobbyCode,
        id: ParticipantId,
        name: String,
    ) -> Result<LobbySnapshot, LobbyError> {
        let code = normalize_code(code);
        let lobby = self
            .registry
            .get(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        if !lobby.state().is_joinable() {
            return Err(LobbyError::RaceAlreadyStarted(code));
        }
        if lobby.has_member(&id) {
            return Ok(lobby.snapshot());
        }
        if let Some((current, _)) = self.registry.find_membership(&id) {
            return Err(LobbyError::AlreadyInLobby(id, current));
        }

        let text = self.texts.next_sample(&lobby.assigned_texts());
        let lobby = self
            .registry
            .get_mut(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
        lobby.add_racer(Participant::new(id.clone(), name, text))?;
        let snapshot = lobby.snapshot();

        self.gateway.subscribe(&code, &id);
        self.gateway.publish(
            &code,
            ServerEvent::LobbyUpdated {
                lobby: snapshot.clone(),
            },
        );

        tracing::info!(
            %code,
            participant_id = %id,
            racers = snapshot.racers.len(),
            "racer joined"
        );
        Ok(snapshot)
    }

    /// Host-only track change.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`], or [`Rejection::NotHost`] /
    /// [`Rejection::UnknownTrack`].
    pub fn select_track(
        &mut self,
        code: &LobbyCode,
        by: &ParticipantId,
        track_id: TrackId,
    ) -> Result<LobbySnapshot, LobbyError> {
        let code = normalize_code(code);
        let known = self.tracks.contains(&track_id);
        let lobby = self
            .registry
            .get_mut(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        lobby.select_track(by, track_id, known)?;
        let snapshot = lobby.snapshot();

        self.gateway.publish(
            &code,
            ServerEvent::LobbyUpdated {
                lobby: snapshot.clone(),
            },
        );
        tracing::debug!(%code, track_id = %snapshot.track_id, "track selected");
        Ok(snapshot)
    }

    /// Removes `id` from whatever lobby it is in.
    ///
    /// The host leaving closes the lobby: everyone else gets
    /// `lobby-closed` and the lobby is unregistered. A racer leaving is
    /// unsubscribed and the rest get the new snapshot. Returns `None` if
    /// `id` was in no lobby.
    pub fn disconnect(&mut self, id: &ParticipantId) -> Option<Departure> {
        let (code, role) = self.registry.find_membership(id)?;

        match role {
            Role::Host => {
                let lobby = self.registry.remove(&code)?;
                self.gateway.publish(&code, ServerEvent::LobbyClosed);
                self.gateway.close(&code);

                tracing::info!(
                    %code,
                    participant_id = %id,
                    racers = lobby.racers().len(),
                    "host left, lobby closed"
                );
                Some(Departure::LobbyClosed {
                    code,
                    racers: lobby.racers().len(),
                })
            }
            Role::Racer => {
                let lobby = self.registry.get_mut(&code)?;
                lobby.remove_racer(id);
                let snapshot = lobby.snapshot();

                self.gateway.unsubscribe(&code, id);
                self.gateway.publish(
                    &code,
                    ServerEvent::LobbyUpdated {
                        lobby: snapshot.clone(),
                    },
                );

                tracing::info!(
                    %code,
                    participant_id = %id,
                    racers = snapshot.racers.len(),
                    "racer left"
                );
                Some(Departure::LeftLobby {
                    code,
                    lobby: snapshot,
                })
            }
        }
    }

    // -- race --------------------------------------------------------------

    /// Host-only start. Broadcasts `game-started`.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`], or [`Rejection::NotHost`] /
    /// [`Rejection::InvalidState`].
    pub fn start_game(
        &mut self,
        code: &LobbyCode,
        by: &ParticipantId,
    ) -> Result<LobbySnapshot, LobbyError> {
        let code = normalize_code(code);
        let lobby = self
            .registry
            .get_mut(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        lobby.start(by, unix_millis())?;
        let snapshot = lobby.snapshot();

        self.gateway.publish(
            &code,
            ServerEvent::GameStarted {
                lobby: snapshot.clone(),
            },
        );
        tracing::info!(%code, racers = snapshot.racers.len(), "race started");
        Ok(snapshot)
    }

    /// Merges a racer's telemetry and broadcasts the result.
    ///
    /// Every accepted update is broadcast, and the one that brings the
    /// last racer to 100% also moves the lobby to `finished`.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`], or [`Rejection::NotARacer`].
    pub fn apply_progress_update(
        &mut self,
        code: &LobbyCode,
        by: &ParticipantId,
        patch: TelemetryPatch,
    ) -> Result<LobbySnapshot, LobbyError> {
        let code = normalize_code(code);
        let lobby = self
            .registry
            .get_mut(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        let finished = lobby.apply_telemetry(by, patch)?;
        let snapshot = lobby.snapshot();

        if finished {
            tracing::info!(%code, racers = snapshot.racers.len(), "race finished");
        }
        self.gateway.publish(
            &code,
            ServerEvent::LobbyUpdated {
                lobby: snapshot.clone(),
            },
        );
        Ok(snapshot)
    }

    /// Checks a racer's final text and, if it passes, declares the
    /// racer the winner and broadcasts.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`], or one of [`Rejection::NotARacer`],
    /// [`Rejection::WinnerAlreadySet`], [`Rejection::BelowAccuracy`].
    /// None of them broadcast.
    pub fn submit_final_text(
        &mut self,
        code: &LobbyCode,
        by: &ParticipantId,
        final_input: &str,
    ) -> Result<LobbySnapshot, LobbyError> {
        let code = normalize_code(code);
        let threshold = self.config.win_accuracy_threshold;
        let lobby = self
            .registry
            .get_mut(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        let accuracy = match lobby.submit_final_text(by, final_input, threshold) {
            Ok(accuracy) => accuracy,
            Err(rejection @ Rejection::BelowAccuracy { .. }) => {
                tracing::warn!(%code, participant_id = %by, %rejection, "final text rejected");
                return Err(rejection.into());
            }
            Err(rejection) => return Err(rejection.into()),
        };
        let snapshot = lobby.snapshot();

        self.gateway.publish(
            &code,
            ServerEvent::LobbyUpdated {
                lobby: snapshot.clone(),
            },
        );
        tracing::info!(%code, participant_id = %by, accuracy, "winner declared");
        Ok(snapshot)
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
