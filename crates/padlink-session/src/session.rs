//! Controller and game session objects.
//!
//! A session owns the write half of its transport. Read halves stay with
//! the connection handler: after a session is admitted, only its handler
//! reads from the socket, and only the session (writer task, replacement
//! path, shutdown) writes to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use padlink_protocol::{CloseCode, SlotId, UserProfile};
use padlink_transport::WsSender;

use crate::relay::{Push, RelayQueue};

// ---------------------------------------------------------------------------
// ControllerSession
// ---------------------------------------------------------------------------

/// One registered controller, bound to exactly one slot.
///
/// The last-seen timestamp sits behind its own mutex so that touching it on
/// every input frame never contends with the hub registry lock.
pub struct ControllerSession {
    slot: SlotId,
    remote_ip: String,
    sender: WsSender,
    user: UserProfile,
    last_seen: Mutex<Instant>,
}

impl ControllerSession {
    pub fn new(
        sender: WsSender,
        slot: SlotId,
        remote_ip: String,
        user: UserProfile,
    ) -> Arc<Self> {
        Arc::new(Self {
            slot,
            remote_ip,
            sender,
            user,
            last_seen: Mutex::new(Instant::now()),
        })
    }

    pub fn slot(&self) -> &SlotId {
        &self.slot
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    /// The write half, used only to close the transport when this session
    /// is replaced or the hub shuts down.
    pub fn sender(&self) -> &WsSender {
        &self.sender
    }

    /// Records activity now. `Instant` is monotonic, so the stored value
    /// never decreases.
    pub fn touch(&self) {
        *self.last_seen.lock().expect("last_seen lock poisoned") = Instant::now();
    }

    pub fn last_seen(&self) -> Instant {
        *self.last_seen.lock().expect("last_seen lock poisoned")
    }

    /// Wall-clock projection of [`last_seen`](Self::last_seen), for
    /// display surfaces that need an absolute timestamp.
    pub fn last_seen_wall(&self) -> SystemTime {
        SystemTime::now() - self.last_seen().elapsed()
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// The singleton downstream consumer of relayed controller input.
///
/// Owns the bounded relay queue and (once [`spawn_writer`](Self::spawn_writer)
/// is called) the single writer task that drains it. Producers call
/// [`enqueue`](Self::enqueue) from controller handler tasks; the queue's own
/// mutex is the only synchronization between them and the writer.
///
/// ```text
///  controller handlers ──enqueue──► [RelayQueue] ──pop──► writer task ──► game
///                                      (drop-oldest)        (write timeout)
/// ```
pub struct GameSession {
    sender: WsSender,
    remote_ip: String,
    queue: Mutex<RelayQueue>,
    /// Wakes the writer when a payload lands in an empty queue or the
    /// session closes.
    notify: Notify,
    write_timeout: Duration,
    closed: AtomicBool,
}

impl GameSession {
    pub fn new(
        sender: WsSender,
        remote_ip: String,
        queue_capacity: usize,
        write_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            sender,
            remote_ip,
            queue: Mutex::new(RelayQueue::new(queue_capacity)),
            notify: Notify::new(),
            write_timeout,
            closed: AtomicBool::new(false),
        })
    }

    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Starts the writer task. Call exactly once, after the session has
    /// been admitted to the hub.
    pub fn spawn_writer(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.run_writer().await })
    }

    /// Queues a payload for delivery to the game.
    ///
    /// Never blocks and never holds any lock across I/O. On overflow the
    /// oldest queued payload is evicted; if the session is closed the
    /// payload is silently discarded.
    pub fn enqueue(&self, payload: Bytes, source: &SlotId) {
        if self.is_closed() {
            return;
        }
        let outcome = self
            .queue
            .lock()
            .expect("relay queue lock poisoned")
            .push(payload);
        match outcome {
            Push::Stored => self.notify.notify_one(),
            Push::DroppedOldest => {
                tracing::warn!(
                    role = "game",
                    controller = %source,
                    remote_ip = %self.remote_ip,
                    "queue_drop_oldest"
                );
                self.notify.notify_one();
            }
            Push::DroppedLatest => {
                tracing::warn!(
                    role = "game",
                    controller = %source,
                    remote_ip = %self.remote_ip,
                    "queue_drop_latest"
                );
            }
            Push::Closed => {}
        }
    }

    /// Closes the session: stops the writer, discards queued payloads, and
    /// sends a close frame. Idempotent — only the first call acts.
    pub async fn close(&self, code: CloseCode, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue
            .lock()
            .expect("relay queue lock poisoned")
            .close();
        self.notify.notify_one();
        self.sender.close(code, reason).await;
    }

    fn pop(&self) -> Option<Bytes> {
        self.queue
            .lock()
            .expect("relay queue lock poisoned")
            .pop()
    }

    /// The single consumer: drains the queue, writing each payload as a
    /// text frame under the per-write timeout. Any write failure is
    /// terminal for the session (but not for the controllers feeding it).
    async fn run_writer(self: Arc<Self>) {
        loop {
            while let Some(payload) = self.pop() {
                let result = tokio::time::timeout(
                    self.write_timeout,
                    self.sender.send_text(payload),
                )
                .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(
                            role = "game",
                            remote_ip = %self.remote_ip,
                            error = %e,
                            "write_failed"
                        );
                        self.close(CloseCode::Internal, "relay failed").await;
                        return;
                    }
                    Err(_) => {
                        tracing::error!(
                            role = "game",
                            remote_ip = %self.remote_ip,
                            error = "write timeout",
                            "write_failed"
                        );
                        self.close(CloseCode::Internal, "relay failed").await;
                        return;
                    }
                }
            }
            if self.is_closed() {
                return;
            }
            // `Notify` stores a permit, so a payload enqueued between the
            // empty pop() above and this await still wakes us immediately.
            self.notify.notified().await;
        }
    }
}
