//! A single lobby and the rules of its race.
//!
//! [`Lobby`] keeps its fields private so the invariants below can only
//! be broken from inside this file:
//!
//! - the host is fixed at creation and never appears among the racers;
//! - racer ids are unique and racers stay in join order;
//! - the race state only moves forward, and `started_at` is set exactly
//!   when the state leaves `waiting`;
//! - the winner is set at most once;
//! - a racer's assigned text never changes after join.

use std::collections::HashSet;

use typerace_protocol::{
    LobbyCode, LobbySnapshot, Participant, ParticipantId, RaceState, TelemetryPatch, TrackId,
};

use crate::scoring::{passes, score_accuracy};
use crate::{LobbyError, Rejection};

/// Result of [`Lobby::add_racer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The racer was appended.
    Joined,
    /// The id was already the host or a racer; nothing changed.
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct Lobby {
    code: LobbyCode,
    host: Participant,
    racers: Vec<Participant>,
    track_id: TrackId,
    state: RaceState,
    started_at: Option<u64>,
    winner: Option<Participant>,
}

impl Lobby {
    /// Creates a waiting lobby with no racers.
    pub fn new(code: LobbyCode, host: Participant, track_id: TrackId) -> Self {
        Self {
            code,
            host,
            racers: Vec::new(),
            track_id,
            state: RaceState::Waiting,
            started_at: None,
            winner: None,
        }
    }

    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    pub fn host(&self) -> &Participant {
        &self.host
    }

    pub fn racers(&self) -> &[Participant] {
        &self.racers
    }

    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn winner(&self) -> Option<&Participant> {
        self.winner.as_ref()
    }

    pub fn is_host(&self, id: &ParticipantId) -> bool {
        &self.host.id == id
    }

    pub fn racer(&self, id: &ParticipantId) -> Option<&Participant> {
        self.racers.iter().find(|r| &r.id == id)
    }

    /// Returns `true` if `id` is the host or one of the racers.
    pub fn has_member(&self, id: &ParticipantId) -> bool {
        self.is_host(id) || self.racer(id).is_some()
    }

    /// Texts currently assigned to racers, for the text provider to avoid.
    pub fn assigned_texts(&self) -> HashSet<String> {
        self.racers.iter().map(|r| r.assigned_text.clone()).collect()
    }

    /// Appends a racer.
    ///
    /// # Errors
    /// [`LobbyError::RaceAlreadyStarted`] unless the lobby is waiting.
    /// The state check comes first, so even a known id is refused once
    /// the race is under way.
    pub fn add_racer(&mut self, racer: Participant) -> Result<JoinOutcome, LobbyError> {
        if !self.state.is_joinable() {
            return Err(LobbyError::RaceAlreadyStarted(self.code.clone()));
        }
        if self.has_member(&racer.id) {
            return Ok(JoinOutcome::AlreadyPresent);
        }
        self.racers.push(racer);
        Ok(JoinOutcome::Joined)
    }

    /// Host-only track change. `known` says whether the catalog has it.
    pub fn select_track(
        &mut self,
        by: &ParticipantId,
        track_id: TrackId,
        known: bool,
    ) -> Result<(), Rejection> {
        if !self.is_host(by) {
            return Err(Rejection::NotHost(by.clone()));
        }
        if !known {
            return Err(Rejection::UnknownTrack(track_id));
        }
        self.track_id = track_id;
        Ok(())
    }

    /// Host-only start. Moves `waiting` to `in-progress` and stamps
    /// `started_at` with `now_ms`.
    pub fn start(&mut self, by: &ParticipantId, now_ms: u64) -> Result<(), Rejection> {
        if !self.is_host(by) {
            return Err(Rejection::NotHost(by.clone()));
        }
        if !self.state.can_transition_to(RaceState::InProgress) {
            return Err(Rejection::InvalidState(self.state));
        }
        self.state = RaceState::InProgress;
        self.started_at = Some(now_ms);
        Ok(())
    }

    /// Merges a racer's telemetry.
    ///
    /// Returns `true` if this update finished the race: the lobby was in
    /// progress and now every racer reports 100%. Updates are accepted
    /// in any state; only the finish check depends on it.
    pub fn apply_telemetry(
        &mut self,
        by: &ParticipantId,
        patch: TelemetryPatch,
    ) -> Result<bool, Rejection> {
        let racer = self
            .racers
            .iter_mut()
            .find(|r| &r.id == by)
            .ok_or_else(|| Rejection::NotARacer(by.clone()))?;
        patch.sanitized().apply_to(racer);

        let all_done = !self.racers.is_empty() && self.racers.iter().all(Participant::has_finished);
        if self.state == RaceState::InProgress && all_done {
            self.state = RaceState::Finished;
            return Ok(true);
        }
        Ok(false)
    }

    /// Checks a racer's final text and records the winner if it passes.
    ///
    /// Returns the computed accuracy on success. The winner is a copy of
    /// the racer as it stands, telemetry included. The race state is left
    /// alone: winning and finishing are tracked separately.
    pub fn submit_final_text(
        &mut self,
        by: &ParticipantId,
        final_input: &str,
        threshold: f64,
    ) -> Result<f64, Rejection> {
        let racer = self
            .racers
            .iter()
            .find(|r| &r.id == by)
            .ok_or_else(|| Rejection::NotARacer(by.clone()))?;
        if self.winner.is_some() {
            return Err(Rejection::WinnerAlreadySet);
        }

        let accuracy = score_accuracy(final_input, &racer.assigned_text);
        if !passes(accuracy, threshold) {
            return Err(Rejection::BelowAccuracy {
                accuracy,
                threshold,
            });
        }

        self.winner = Some(racer.clone());
        Ok(accuracy)
    }

    /// Removes a racer, keeping the others in order.
    pub fn remove_racer(&mut self, id: &ParticipantId) -> Option<Participant> {
        let index = self.racers.iter().position(|r| &r.id == id)?;
        Some(self.racers.remove(index))
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            code: self.code.clone(),
            host: self.host.clone(),
            racers: self.racers.clone(),
            track_id: self.track_id.clone(),
            state: self.state,
            started_at: self.started_at,
            winner: self.winner.clone(),
        }
    }
}
