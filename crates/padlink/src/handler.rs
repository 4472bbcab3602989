//! Per-connection handler: register handshake, role dispatch, read loops.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The state machine:
//!
//! ```text
//!         accept
//!           │
//!           ▼
//!   AWAIT_REGISTER ── timeout / non-text / bad JSON / bad id ──► CLOSE
//!      │        │
//!      │ game   │ controller (resolve token, validate slot)
//!      ▼        ▼
//!   GAME_RUN   CTRL_RUN ── peer close / invalid payload ──► CLOSE
//! ```
//!
//! Every close sends an explicit status + reason; the reason strings are
//! wire contract (clients display them) and log contract (operators grep
//! for them).

use std::sync::Arc;

use bytes::Bytes;

use padlink_hub::{Hub, HubError};
use padlink_protocol::{CloseCode, ProtocolError, Register, SlotId, UserProfile};
use padlink_protocol::state_frame_slot;
use padlink_session::{ControllerSession, GameSession};
use padlink_transport::{Frame, WsReader, WsSender};

use crate::RelayError;

/// Handles a single connection from register to close.
///
/// By the time this returns, the transport has been closed with a status
/// and reason; the returned error (if any) only feeds the accept loop's
/// debug log.
pub(crate) async fn handle_connection(
    hub: Arc<Hub>,
    mut reader: WsReader,
    sender: WsSender,
    remote: String,
) -> Result<(), RelayError> {
    let register = match read_register(&mut reader, &hub, &remote).await {
        Ok(register) => register,
        Err(reject) => {
            sender.close(reject.code, &reject.reason).await;
            return reject.source.map_or(Ok(()), Err);
        }
    };

    match register {
        Register::Game => run_game(hub, reader, sender, remote).await,
        Register::Controller { slot, token } => {
            run_controller(hub, reader, sender, remote, slot, token).await
        }
    }
}

/// A failed handshake: what to tell the peer, and what to log upstream.
struct Reject {
    code: CloseCode,
    reason: String,
    /// `None` for ordinary endings (peer never spoke, deadline hit).
    source: Option<RelayError>,
}

impl Reject {
    fn normal() -> Self {
        Self {
            code: CloseCode::Normal,
            reason: CloseCode::Normal.default_reason().into(),
            source: None,
        }
    }
}

/// AWAIT_REGISTER: reads and validates the mandatory first frame under the
/// register timeout.
async fn read_register(
    reader: &mut WsReader,
    hub: &Hub,
    remote: &str,
) -> Result<Register, Reject> {
    let timeout = hub.config().register_timeout;
    let frame = match tokio::time::timeout(timeout, reader.next_frame()).await {
        Ok(Ok(Some(frame))) => frame,
        Ok(Ok(None)) => {
            tracing::warn!(remote_ip = %remote, "register_read_failed");
            return Err(Reject::normal());
        }
        Ok(Err(e)) => {
            tracing::warn!(remote_ip = %remote, error = %e, "register_read_failed");
            return Err(Reject {
                code: CloseCode::Policy,
                reason: CloseCode::Policy.default_reason().into(),
                source: Some(RelayError::Transport(e)),
            });
        }
        Err(_) => {
            tracing::warn!(
                remote_ip = %remote,
                error = "register timeout",
                "register_read_failed"
            );
            return Err(Reject::normal());
        }
    };

    let data = match frame {
        Frame::Text(data) => data,
        Frame::Binary(_) => {
            tracing::warn!(remote_ip = %remote, "register_invalid_type");
            return Err(Reject {
                code: CloseCode::Unsupported,
                reason: "text frame required".into(),
                source: None,
            });
        }
    };

    Register::parse(&data).map_err(|e| {
        let reason = match &e {
            ProtocolError::MalformedRegister(_) => {
                tracing::warn!(remote_ip = %remote, error = %e, "register_invalid_json");
                "invalid register payload"
            }
            ProtocolError::MissingControllerId => {
                tracing::warn!(
                    role = "controller",
                    remote_ip = %remote,
                    "register_missing_id"
                );
                "controller id required"
            }
            ProtocolError::InvalidSlotId(_) => {
                tracing::warn!(
                    role = "controller",
                    remote_ip = %remote,
                    error = %e,
                    "register_invalid_id"
                );
                "invalid controller id"
            }
            ProtocolError::UnknownRole(_) | ProtocolError::MalformedState(_) => {
                tracing::warn!(remote_ip = %remote, error = %e, "register_invalid_role");
                "invalid role"
            }
        };
        Reject {
            code: CloseCode::Policy,
            reason: reason.into(),
            source: Some(RelayError::Protocol(e)),
        }
    })
}

/// GAME_RUN: the game is write-only from the hub's perspective. Inbound
/// frames are read and discarded — the loop exists solely to detect
/// disconnect.
async fn run_game(
    hub: Arc<Hub>,
    mut reader: WsReader,
    sender: WsSender,
    remote: String,
) -> Result<(), RelayError> {
    let session = GameSession::new(
        sender,
        remote.clone(),
        hub.config().relay_queue_size,
        hub.config().write_timeout,
    );

    let previous = hub.admit_game(Arc::clone(&session));
    if let Some(previous) = previous {
        previous.close(CloseCode::Policy, "game replaced").await;
    }

    tracing::info!(role = "game", remote_ip = %remote, "connected");
    session.spawn_writer();

    let (code, reason) = loop {
        match reader.next_frame().await {
            Ok(Some(_)) => continue,
            Ok(None) => break (CloseCode::Normal, CloseCode::Normal.default_reason()),
            Err(e) => {
                tracing::debug!(role = "game", remote_ip = %remote, error = %e, "read ended");
                break (CloseCode::Normal, CloseCode::Normal.default_reason());
            }
        }
    };

    hub.remove_game(&session);
    session.close(code, reason).await;
    tracing::info!(
        role = "game",
        remote_ip = %remote,
        status = code.as_u16(),
        reason,
        "disconnected"
    );
    Ok(())
}

/// CTRL_REGISTER + CTRL_RUN: resolve the token (if any), admit, then pump
/// state frames into the relay.
async fn run_controller(
    hub: Arc<Hub>,
    mut reader: WsReader,
    sender: WsSender,
    remote: String,
    claimed_slot: Option<SlotId>,
    token: Option<String>,
) -> Result<(), RelayError> {
    let mut slot = claimed_slot;
    let mut user = UserProfile::default();

    if let Some(token_value) = token {
        match hub.resolve_token(&token_value) {
            Ok(binding) => {
                // The token is authoritative; a supplied id may only agree.
                if let Some(claimed) = &slot {
                    if *claimed != binding.slot {
                        tracing::warn!(
                            role = "controller",
                            id = %claimed,
                            remote_ip = %remote,
                            expected = %binding.slot,
                            "register_token_slot_mismatch"
                        );
                        let err = HubError::TokenSlotMismatch;
                        sender.close(CloseCode::Policy, &err.to_string()).await;
                        return Err(RelayError::Hub(err));
                    }
                }
                slot = Some(binding.slot);
                user = binding.user;
            }
            Err(e) => {
                tracing::warn!(
                    role = "controller",
                    remote_ip = %remote,
                    error = %e,
                    "register_token_invalid"
                );
                sender.close(CloseCode::Policy, &e.to_string()).await;
                return Err(RelayError::Hub(e));
            }
        }
    }

    // Register::parse guarantees a slot whenever there was no token, and
    // the token path just filled it in.
    let Some(slot) = slot else {
        sender
            .close(CloseCode::Policy, "controller id required")
            .await;
        return Err(RelayError::Protocol(ProtocolError::MissingControllerId));
    };

    let session =
        ControllerSession::new(sender.clone(), slot.clone(), remote.clone(), user);

    let replaced = match hub.admit_controller(Arc::clone(&session)) {
        Ok(replaced) => replaced,
        Err(e) => {
            tracing::warn!(
                role = "controller",
                id = %slot,
                remote_ip = %remote,
                reason = %e,
                "rejected"
            );
            sender.close(CloseCode::Policy, &e.to_string()).await;
            return Err(RelayError::Hub(e));
        }
    };
    if let Some(replaced) = replaced {
        replaced
            .sender()
            .close(CloseCode::Policy, "controller replaced")
            .await;
    }

    tracing::info!(
        role = "controller",
        id = %slot,
        remote_ip = %remote,
        user_id = %session.user().id,
        "connected"
    );

    let (code, reason): (CloseCode, String) = loop {
        match reader.next_frame().await {
            Ok(Some(Frame::Text(payload))) => {
                if let Err(reason) = relay_state_frame(&hub, &session, payload) {
                    tracing::warn!(
                        role = "controller",
                        id = %slot,
                        remote_ip = %remote,
                        error = %reason,
                        "payload_invalid"
                    );
                    break (CloseCode::Policy, reason);
                }
            }
            Ok(Some(Frame::Binary(_))) => {
                break (CloseCode::Unsupported, "text frame required".into());
            }
            Ok(None) => {
                break (
                    CloseCode::Normal,
                    CloseCode::Normal.default_reason().into(),
                );
            }
            Err(e) => {
                tracing::debug!(
                    role = "controller",
                    id = %slot,
                    remote_ip = %remote,
                    error = %e,
                    "read ended"
                );
                break (
                    CloseCode::Normal,
                    CloseCode::Normal.default_reason().into(),
                );
            }
        }
    };

    hub.remove_controller(&slot, &session);
    session.sender().close(code, &reason).await;
    tracing::info!(
        role = "controller",
        id = %slot,
        remote_ip = %remote,
        status = code.as_u16(),
        reason = %reason,
        "disconnected"
    );
    Ok(())
}

/// Validates one state frame and hands the original bytes to the relay.
///
/// The payload is forwarded exactly as received — the one thing checked is
/// that a present `id` field names the session's own slot.
fn relay_state_frame(
    hub: &Hub,
    session: &ControllerSession,
    payload: Bytes,
) -> Result<(), String> {
    match state_frame_slot(&payload) {
        Ok(Some(id)) if id != session.slot().as_str() => {
            return Err("id mismatch".into());
        }
        Ok(_) => {}
        Err(e) => return Err(e.to_string()),
    }
    session.touch();
    hub.forward_to_game(payload, session.slot());
    Ok(())
}
