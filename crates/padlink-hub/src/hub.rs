//! The hub registry: admission, replacement, forwarding, tokens, shutdown.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;

use padlink_protocol::{CloseCode, SlotId, UserProfile};
use padlink_session::{
    ControllerSession, GameSession, IssuedToken, TokenBinding, TokenStore,
};

use crate::{HubConfig, HubError};

/// How long shutdown lingers after close frames go out, at most.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// The externally visible merged view of one slot: token-reserved,
/// live-connected, or both.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub slot: SlotId,
    pub user_id: String,
    pub name: String,
    pub personality: String,
    pub connected: bool,
    /// Present only while a session is connected.
    pub last_seen: Option<SystemTime>,
    /// Present only while the slot is reserved by a token but unconnected.
    pub token_expires_at: Option<SystemTime>,
}

/// Everything the lock protects. Cross-map invariants (one session per
/// slot, one live token per slot) hold exactly because every mutation of
/// these maps goes through one critical section.
struct HubState {
    controllers: HashMap<SlotId, Arc<ControllerSession>>,
    game: Option<Arc<GameSession>>,
    tokens: TokenStore,
}

/// Coordinator for controller and game sessions.
///
/// All registry operations are brief critical sections with no I/O inside;
/// anything that touches a transport (closing a replaced session, the
/// relay enqueue) happens after the lock is released. That is also the
/// deadlock-avoidance rule: never call a session's `close` while holding
/// the hub lock.
pub struct Hub {
    cfg: HubConfig,
    state: Mutex<HubState>,
}

impl Hub {
    /// Creates a hub with the given (normalized) configuration.
    pub fn new(cfg: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            cfg: cfg.normalized(),
            state: Mutex::new(HubState {
                controllers: HashMap::new(),
                game: None,
                tokens: TokenStore::new(),
            }),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().expect("hub lock poisoned")
    }

    // -- session admission ------------------------------------------------

    /// Admits a controller session.
    ///
    /// A session for an already-claimed slot replaces the current one and
    /// returns it for the caller to close ("controller replaced") — a
    /// reconnection never counts against the capacity limit. Otherwise the
    /// session takes a free slot, or fails with
    /// [`HubError::ControllerLimitReached`].
    pub fn admit_controller(
        &self,
        session: Arc<ControllerSession>,
    ) -> Result<Option<Arc<ControllerSession>>, HubError> {
        let mut state = self.lock();
        let slot = session.slot().clone();
        if state.controllers.contains_key(&slot) {
            let previous = state.controllers.insert(slot, session);
            return Ok(previous);
        }
        if state.controllers.len() >= self.cfg.max_controllers {
            return Err(HubError::ControllerLimitReached);
        }
        state.controllers.insert(slot, session);
        Ok(None)
    }

    /// Removes a controller, but only if `session` is still the current
    /// occupant — a closing old session must not evict its replacement.
    pub fn remove_controller(&self, slot: &SlotId, session: &Arc<ControllerSession>) {
        let mut state = self.lock();
        if state
            .controllers
            .get(slot)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            state.controllers.remove(slot);
        }
    }

    /// Swaps in a game session, returning the prior one for the caller to
    /// close with reason "game replaced".
    pub fn admit_game(&self, session: Arc<GameSession>) -> Option<Arc<GameSession>> {
        self.lock().game.replace(session)
    }

    /// Clears the current game, but only if `session` is still it.
    pub fn remove_game(&self, session: &Arc<GameSession>) {
        let mut state = self.lock();
        if state
            .game
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            state.game = None;
        }
    }

    /// `true` while a game session is registered.
    pub fn game_connected(&self) -> bool {
        self.lock().game.is_some()
    }

    // -- forwarding -------------------------------------------------------

    /// Relays a controller payload to the current game, if any.
    ///
    /// The lock is held only to snapshot the game reference; the enqueue
    /// itself runs outside it. Without a game the payload is dropped —
    /// input is time-valued, there is nothing useful to buffer for.
    pub fn forward_to_game(&self, payload: Bytes, source: &SlotId) {
        let game = self.lock().game.as_ref().map(Arc::clone);
        if let Some(game) = game {
            game.enqueue(payload, source);
        }
    }

    // -- tokens -----------------------------------------------------------

    /// Mints a controller token for `slot_id`, evicting any previous token
    /// for the slot. `ttl` of `None` uses the configured default.
    ///
    /// A live controller session on the slot is left untouched; only the
    /// token reservation changes hands.
    pub fn issue_token(
        &self,
        slot_id: &str,
        user: UserProfile,
        ttl: Option<Duration>,
    ) -> Result<IssuedToken, HubError> {
        let slot = SlotId::parse(slot_id)?;
        let ttl = ttl.unwrap_or(self.cfg.session_token_ttl);
        let mut state = self.lock();
        let issued = state.tokens.issue(slot, user, ttl, Instant::now())?;
        Ok(issued)
    }

    /// Resolves a token to its binding without consuming it.
    pub fn resolve_token(&self, token: &str) -> Result<TokenBinding, HubError> {
        let mut state = self.lock();
        let binding = state.tokens.resolve(token, Instant::now())?;
        Ok(binding)
    }

    // -- assignments ------------------------------------------------------

    /// One record per slot that is live, token-reserved, or both; sorted
    /// by slot. Live session data wins over the token reservation where
    /// both exist.
    pub fn assignments(&self) -> Vec<Assignment> {
        let mut state = self.lock();
        state.tokens.sweep(Instant::now());

        let mut by_slot: BTreeMap<SlotId, Assignment> = BTreeMap::new();

        for binding in state.tokens.iter() {
            by_slot.insert(
                binding.slot.clone(),
                Assignment {
                    slot: binding.slot.clone(),
                    user_id: binding.user.id.clone(),
                    name: binding.user.name.clone(),
                    personality: binding.user.personality.clone(),
                    connected: false,
                    last_seen: None,
                    token_expires_at: Some(binding.expires_wall),
                },
            );
        }

        for (slot, session) in &state.controllers {
            let entry = by_slot.entry(slot.clone()).or_insert_with(|| Assignment {
                slot: slot.clone(),
                user_id: String::new(),
                name: String::new(),
                personality: String::new(),
                connected: false,
                last_seen: None,
                token_expires_at: None,
            });
            let user = session.user();
            if !user.id.is_empty() {
                entry.user_id = user.id.clone();
            }
            if !user.name.is_empty() {
                entry.name = user.name.clone();
            }
            if !user.personality.is_empty() {
                entry.personality = user.personality.clone();
            }
            entry.connected = true;
            entry.last_seen = Some(session.last_seen_wall());
            entry.token_expires_at = None;
        }

        by_slot.into_values().collect()
    }

    // -- shutdown ---------------------------------------------------------

    /// Gracefully closes every session with reason "server shutdown".
    ///
    /// Both maps are snapshotted and cleared under the lock, then the
    /// close frames go out lock-free. Lingers for the smaller of `timeout`
    /// and a fixed 500 ms grace so close frames have a chance to flush.
    pub async fn shutdown(&self, timeout: Duration) {
        let (game, controllers) = {
            let mut state = self.lock();
            let game = state.game.take();
            let controllers: Vec<_> =
                state.controllers.drain().map(|(_, s)| s).collect();
            (game, controllers)
        };

        if let Some(game) = game {
            game.close(CloseCode::Normal, "server shutdown").await;
        }
        for controller in controllers {
            controller
                .sender()
                .close(CloseCode::Normal, "server shutdown")
                .await;
        }

        tokio::time::sleep(timeout.min(SHUTDOWN_GRACE)).await;
    }
}

// =========================================================================
// Tests
// =========================================================================
