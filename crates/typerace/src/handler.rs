//! Per-connection handler: handshake, request routing, and event delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Hello → validate version
//!   2. Issue a participant id → send Welcome
//!   3. Register an outbox with the lobby coordinator
//!   4. Loop: receive envelopes and dispatch them, while forwarding lobby
//!      events from the outbox to the socket

use std::sync::Arc;
use std::time::{Duration, Instant};

use typerace_lobby::{LobbyError, unix_millis};
use typerace_protocol::{
    ClientRequest, Codec, Envelope, ParticipantId, Payload, ProtocolError, Reply, ServerEvent,
    SystemMessage,
};
use typerace_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::TyperaceError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// How long a new connection has to send its `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that takes a participant out of its lobby and forgets its
/// session when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct SessionGuard<C: Codec> {
    participant_id: ParticipantId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let participant_id = self.participant_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.coordinator.disconnect(participant_id.clone()).await {
                tracing::debug!(%participant_id, error = %e, "lobby cleanup failed");
            }
            let _ = state.sessions.lock().await.disconnect(&participant_id);
        });
    }
}

/// Outgoing half of a connection: the socket plus this side's sequence
/// counter and clock.
struct Outgoing<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Outgoing<'_, C> {
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn send(&mut self, payload: Payload) -> Result<(), TyperaceError> {
        let envelope = Envelope::new(next_seq(&mut self.seq), self.elapsed_ms(), payload);
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, message: &str) -> Result<(), TyperaceError> {
        self.send(Payload::System(SystemMessage::Error {
            code,
            message: message.to_string(),
        }))
        .await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TyperaceError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut out = Outgoing {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        start: Instant::now(),
    };

    // --- Step 1: Handshake ---
    perform_handshake(&conn, &state, &mut out).await?;

    // --- Step 2: Participant id ---
    // Session and guard are created together: if creation fails there is
    // nothing to clean up, and if it succeeds the guard is active at once.
    let participant_id = {
        let mut sessions = state.sessions.lock().await;
        sessions.create(conn_id)?.participant_id.clone()
    };
    let _guard = SessionGuard {
        participant_id: participant_id.clone(),
        state: Arc::clone(&state),
    };

    out.send(Payload::System(SystemMessage::Welcome {
        participant_id: participant_id.clone(),
        server_time: unix_millis(),
    }))
    .await?;
    tracing::info!(%conn_id, %participant_id, "participant connected");

    // --- Step 3: Outbox ---
    let (outbox, mut events) = mpsc::unbounded_channel();
    state
        .coordinator
        .attach(participant_id.clone(), outbox)
        .await?;

    // --- Step 4: Message loop ---
    // One deadline for the whole loop, pushed forward by inbound frames
    // only. Outgoing broadcasts do not count as activity.
    let idle = tokio::time::sleep(state.idle_timeout.unwrap_or_default());
    tokio::pin!(idle);

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%participant_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%participant_id, error = %e, "recv error");
                        break;
                    }
                };
                if let Some(timeout) = state.idle_timeout {
                    idle.as_mut().reset(tokio::time::Instant::now() + timeout);
                }

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(%participant_id, error = %e, "failed to decode envelope");
                        continue;
                    }
                };

                let should_close =
                    handle_envelope(&state, &participant_id, envelope, &mut out).await?;
                if should_close {
                    break;
                }
            }
            () = &mut idle, if state.idle_timeout.is_some() => {
                tracing::info!(%participant_id, "connection timed out");
                break;
            }
            Some(event) = events.recv() => {
                if event == ServerEvent::LobbyClosed {
                    tracing::debug!(%participant_id, "lobby closed by its host");
                }
                out.send(Payload::Event(event)).await?;
            }
        }
    }

    // _guard drops here → lobby departure and session cleanup fire.
    Ok(())
}

/// Receives `Hello`, checks the version. Replies with an `Error` frame and
/// fails if anything is off.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    out: &mut Outgoing<'_, C>,
) -> Result<(), TyperaceError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(
                ProtocolError::InvalidMessage("connection closed before handshake".into()).into(),
            );
        }
        Ok(Err(e)) => return Err(TyperaceError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let version = match envelope.payload {
        Payload::System(SystemMessage::Hello { version }) => version,
        _ => {
            out.send_error(400, "expected Hello").await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Hello".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        out.send_error(
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    Ok(())
}

/// Handles one decoded envelope. Returns `true` if the connection should
/// close.
async fn handle_envelope<C: Codec>(
    state: &ServerState<C>,
    participant_id: &ParticipantId,
    envelope: Envelope,
    out: &mut Outgoing<'_, C>,
) -> Result<bool, TyperaceError> {
    match envelope.payload {
        Payload::System(SystemMessage::Heartbeat { client_time }) => {
            let server_time = out.elapsed_ms();
            out.send(Payload::System(SystemMessage::HeartbeatAck {
                client_time,
                server_time,
            }))
            .await?;
        }
        Payload::System(SystemMessage::Goodbye { reason }) => {
            tracing::info!(%participant_id, %reason, "client said goodbye");
            return Ok(true);
        }
        Payload::Request(request) => {
            handle_request(state, participant_id, envelope.seq, request, out).await?;
        }
        _ => {
            tracing::debug!(%participant_id, "ignoring unexpected message");
        }
    }

    Ok(false)
}

/// Routes a lobby request to the coordinator.
///
/// `create-lobby` and `join-lobby` always get a reply. The rest answer
/// through lobby broadcasts only; when the coordinator turns one down,
/// the client hears nothing.
async fn handle_request<C: Codec>(
    state: &ServerState<C>,
    participant_id: &ParticipantId,
    request_seq: u64,
    request: ClientRequest,
    out: &mut Outgoing<'_, C>,
) -> Result<(), TyperaceError> {
    let kind = request.kind();
    let coordinator = &state.coordinator;
    let id = participant_id.clone();

    let reply = match request {
        ClientRequest::CreateLobby { host_name } => {
            match coordinator.create_lobby(id, host_name).await {
                Ok((code, lobby)) => Some(Reply::LobbyCreated { code, lobby }),
                Err(LobbyError::Unavailable) => return Err(LobbyError::Unavailable.into()),
                Err(e) => Some(Reply::CreateFailed {
                    error: e.to_string(),
                }),
            }
        }
        ClientRequest::JoinLobby { code, player_name } => {
            match coordinator.join_lobby(code, id, player_name).await {
                Ok(lobby) => Some(Reply::Joined { lobby }),
                Err(LobbyError::Unavailable) => return Err(LobbyError::Unavailable.into()),
                Err(e) => Some(Reply::JoinFailed {
                    error: e.to_string(),
                }),
            }
        }
        ClientRequest::SelectTrack { code, track_id } => {
            silent(kind, participant_id, coordinator.select_track(code, id, track_id).await)?
        }
        ClientRequest::StartGame { code } => {
            silent(kind, participant_id, coordinator.start_game(code, id).await)?
        }
        ClientRequest::PlayerUpdate { code, update } => {
            silent(kind, participant_id, coordinator.player_update(code, id, update).await)?
        }
        ClientRequest::SubmitFinalText { code, final_input } => silent(
            kind,
            participant_id,
            coordinator.submit_final_text(code, id, final_input).await,
        )?,
    };

    if let Some(reply) = reply {
        out.send(Payload::Reply { request_seq, reply }).await?;
    }
    Ok(())
}

/// Swallows a turned-down request after logging it. Only a vanished
/// coordinator is an error for the connection.
fn silent<T>(
    kind: &str,
    participant_id: &ParticipantId,
    result: Result<T, LobbyError>,
) -> Result<Option<Reply>, TyperaceError> {
    match result {
        Ok(_) => Ok(None),
        Err(LobbyError::Unavailable) => Err(LobbyError::Unavailable.into()),
        Err(e) => {
            tracing::debug!(%participant_id, request = kind, error = %e, "request rejected");
            Ok(None)
        }
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
