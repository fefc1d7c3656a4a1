//! Coordinator actor: a Tokio task that owns the [`Coordinator`].
//!
//! Connection handlers never touch the registry. They send a
//! [`Command`] over a bounded channel and, for most commands, wait on a
//! `oneshot` for the answer. Commands run one at a time, to completion,
//! so every lobby operation sees a consistent registry without locks.

use typerace_protocol::{LobbyCode, LobbySnapshot, ParticipantId, TelemetryPatch, TrackId};
use tokio::sync::{mpsc, oneshot};

use crate::coordinator::{Coordinator, Departure};
use crate::gateway::{ChannelGateway, Outbox};
use crate::{LobbyError, TextProvider};

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to the coordinator actor.
pub(crate) enum Command {
    /// Register where a participant's lobby events should go.
    Attach { id: ParticipantId, outbox: Outbox },

    CreateLobby {
        host_id: ParticipantId,
        host_name: String,
        reply: Reply<Result<(LobbyCode, LobbySnapshot), LobbyError>>,
    },

    JoinLobby {
        code: LobbyCode,
        id: ParticipantId,
        name: String,
        reply: Reply<Result<LobbySnapshot, LobbyError>>,
    },

    SelectTrack {
        code: LobbyCode,
        id: ParticipantId,
        track_id: TrackId,
        reply: Reply<Result<LobbySnapshot, LobbyError>>,
    },

    StartGame {
        code: LobbyCode,
        id: ParticipantId,
        reply: Reply<Result<LobbySnapshot, LobbyError>>,
    },

    PlayerUpdate {
        code: LobbyCode,
        id: ParticipantId,
        patch: TelemetryPatch,
        reply: Reply<Result<LobbySnapshot, LobbyError>>,
    },

    SubmitFinalText {
        code: LobbyCode,
        id: ParticipantId,
        final_input: String,
        reply: Reply<Result<LobbySnapshot, LobbyError>>,
    },

    /// Leave any lobby and drop the outbox.
    Disconnect {
        id: ParticipantId,
        reply: Reply<Option<Departure>>,
    },

    Snapshot {
        code: LobbyCode,
        reply: Reply<Option<LobbySnapshot>>,
    },

    LobbyCount { reply: Reply<usize> },

    Shutdown,
}

/// Handle to the running coordinator actor.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Sends a command and waits for its reply.
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| LobbyError::Unavailable)?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Registers `outbox` as the destination for `id`'s lobby events
    /// (fire-and-forget).
    pub async fn attach(&self, id: ParticipantId, outbox: Outbox) -> Result<(), LobbyError> {
        self.sender
            .send(Command::Attach { id, outbox })
            .await
            .map_err(|_| LobbyError::Unavailable)
    }

    pub async fn create_lobby(
        &self,
        host_id: ParticipantId,
        host_name: String,
    ) -> Result<(LobbyCode, LobbySnapshot), LobbyError> {
        self.request(|reply| Command::CreateLobby {
            host_id,
            host_name,
            reply,
        })
        .await?
    }

    pub async fn join_lobby(
        &self,
        code: LobbyCode,
        id: ParticipantId,
        name: String,
    ) -> Result<LobbySnapshot, LobbyError> {
        self.request(|reply| Command::JoinLobby {
            code,
            id,
            name,
            reply,
        })
        .await?
    }

    pub async fn select_track(
        &self,
        code: LobbyCode,
        id: ParticipantId,
        track_id: TrackId,
    ) -> Result<LobbySnapshot, LobbyError> {
        self.request(|reply| Command::SelectTrack {
            code,
            id,
            track_id,
            reply,
        })
        .await?
    }

    pub async fn start_game(
        &self,
        code: LobbyCode,
        id: ParticipantId,
    ) -> Result<LobbySnapshot, LobbyError> {
        self.request(|reply| Command::StartGame { code, id, reply })
            .await?
    }

    pub async fn player_update(
        &self,
        code: LobbyCode,
        id: ParticipantId,
        patch: TelemetryPatch,
    ) -> Result<LobbySnapshot, LobbyError> {
        self.request(|reply| Command::PlayerUpdate {
            code,
            id,
            patch,
            reply,
        })
        .await?
    }

    pub async fn submit_final_text(
        &self,
        code: LobbyCode,
        id: ParticipantId,
        final_input: String,
    ) -> Result<LobbySnapshot, LobbyError> {
        self.request(|reply| Command::SubmitFinalText {
            code,
            id,
            final_input,
            reply,
        })
        .await?
    }

    /// Removes `id` from its lobby, if any, and forgets its outbox.
    pub async fn disconnect(&self, id: ParticipantId) -> Result<Option<Departure>, LobbyError> {
        self.request(|reply| Command::Disconnect { id, reply }).await
    }

    pub async fn snapshot(&self, code: LobbyCode) -> Result<Option<LobbySnapshot>, LobbyError> {
        self.request(|reply| Command::Snapshot { code, reply }).await
    }

    /// Number of live lobbies.
    pub async fn lobby_count(&self) -> Result<usize, LobbyError> {
        self.request(|reply| Command::LobbyCount { reply }).await
    }

    /// Stops the actor. Pending and later commands fail with
    /// [`LobbyError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }
}

struct CoordinatorActor<P: TextProvider> {
    coordinator: Coordinator<P, ChannelGateway>,
    receiver: mpsc::Receiver<Command>,
}

impl<P: TextProvider> CoordinatorActor<P> {
    async fn run(mut self) {
        tracing::info!("lobby coordinator started");

        while let Some(cmd) = self.receiver.recv().await {
            let c = &mut self.coordinator;
            match cmd {
                Command::Attach { id, outbox } => {
                    c.gateway_mut().attach(id, outbox);
                }
                Command::CreateLobby {
                    host_id,
                    host_name,
                    reply,
                } => {
                    let _ = reply.send(c.create_lobby(host_id, host_name));
                }
                Command::JoinLobby {
                    code,
                    id,
                    name,
                    reply,
                } => {
                    let _ = reply.send(c.join_lobby(&code, id, name));
                }
                Command::SelectTrack {
                    code,
                    id,
                    track_id,
                    reply,
                } => {
                    let _ = reply.send(c.select_track(&code, &id, track_id));
                }
                Command::StartGame { code, id, reply } => {
                    let _ = reply.send(c.start_game(&code, &id));
                }
                Command::PlayerUpdate {
                    code,
                    id,
                    patch,
                    reply,
                } => {
                    let _ = reply.send(c.apply_progress_update(&code, &id, patch));
                }
                Command::SubmitFinalText {
                    code,
                    id,
                    final_input,
                    reply,
                } => {
                    let _ = reply.send(c.submit_final_text(&code, &id, &final_input));
                }
                Command::Disconnect { id, reply } => {
                    // Detach first so a departing host is not sent its
                    // own lobby-closed.
                    c.gateway_mut().detach(&id);
                    let _ = reply.send(c.disconnect(&id));
                }
                Command::Snapshot { code, reply } => {
                    let _ = reply.send(c.snapshot(&code));
                }
                Command::LobbyCount { reply } => {
                    let _ = reply.send(c.registry().len());
                }
                Command::Shutdown => {
                    tracing::info!(lobbies = c.registry().len(), "lobby coordinator shutting down");
                    break;
                }
            }
        }

        tracing::info!("lobby coordinator stopped");
    }
}

/// Spawns the coordinator actor and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is
/// full.
pub fn spawn_coordinator<P: TextProvider>(
    coordinator: Coordinator<P, ChannelGateway>,
    channel_size: usize,
) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = CoordinatorActor {
        coordinator,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    CoordinatorHandle { sender: tx }
}
