//! Connection supervision.
//!
//! [`Dialer`] opens an authenticated session for a single trading pair
//! and hands back a [`Conn`]. A background manager task owns the session
//! lifecycle: dial → authenticate → spawn ping emitter → read loop
//! feeding the message processor. Any transport or processor error tears
//! the session down, resets the book to its uninitialized state, and
//! reconnects with exponential backoff plus jitter. A session that
//! stayed up for over an hour resets the backoff penalty.
//!
//! The processor state is guarded by a single mutex per handle;
//! `snapshot()` copies the book into sorted lists under that lock, so
//! consumers on any thread observe a consistent view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use rand::Rng;
use tokio::sync::Notify;
use tracing::{error, info};
use tungstenite::Message as WsMessage;

use super::{WsReader, WsWriter, authenticate, connect, send_keepalive};
use crate::error::{Result, StreamError};
use crate::models::Credentials;
use crate::models::book::OrderBookEntry;
use crate::models::update::UpdateMessage;
use crate::processor::MessageProcessor;

/// Default public streaming endpoint.
pub const DEFAULT_WS_HOST: &str = "wss://ws.luno.com";

/// Interval between outbound keepalive frames.
const PING_INTERVAL: Duration = Duration::from_secs(60);

/// A session that survives past this threshold resets the backoff
/// penalty for the attempt that follows it.
const STABLE_SESSION: Duration = Duration::from_secs(60 * 60);

/// Base backoff wait in seconds, doubled per capped attempt.
const BACKOFF_BASE_SECS: u64 = 5;

/// Attempt cap for the backoff doubling.
const BACKOFF_MAX_EXPONENT: u32 = 5;

/// Configures and opens a streaming connection.
///
/// The Rust surface of the protocol's `Dial(keyID, keySecret, pair,
/// options…)` operation:
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> lunostream::Result<()> {
/// let conn = lunostream::Dialer::new("key_id", "key_secret", "XBTZAR")
///     .update_callback(|update| println!("applied {}", update.sequence))
///     .dial()?;
/// # Ok(())
/// # }
/// ```
pub struct Dialer {
    key_id: String,
    key_secret: String,
    pair: String,
    host: String,
    update_callback: Option<Box<dyn FnMut(&UpdateMessage) + Send>>,
}

impl Dialer {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        pair: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            pair: pair.into(),
            host: DEFAULT_WS_HOST.to_string(),
            update_callback: None,
        }
    }

    /// Overrides the websocket host (default [`DEFAULT_WS_HOST`]).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Registers a consumer hook invoked once per applied update.
    ///
    /// The callback runs while the handle's state lock is held, in
    /// applied-sequence order; it must not call back into the [`Conn`].
    #[must_use]
    pub fn update_callback(
        mut self,
        callback: impl FnMut(&UpdateMessage) + Send + 'static,
    ) -> Self {
        self.update_callback = Some(Box::new(callback));
        self
    }

    /// Validates the credentials, spawns the background session manager,
    /// and returns the connection handle immediately. The book fills in
    /// asynchronously once the first snapshot arrives.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::MissingCredentials`] if the key id or
    /// secret is empty. Transport and processor errors never surface
    /// here; they are handled internally by reconnection.
    pub fn dial(self) -> Result<Conn> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(StreamError::MissingCredentials);
        }

        let mut processor = MessageProcessor::new();
        if let Some(callback) = self.update_callback {
            processor.set_update_callback(callback);
        }

        let shared = Arc::new(Shared {
            processor: Mutex::new(processor),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
        });

        let manager = Manager {
            shared: Arc::clone(&shared),
            credentials: Credentials {
                api_key_id: self.key_id,
                api_key_secret: self.key_secret,
            },
            pair: self.pair.clone(),
            url: format!("{}/api/1/stream/{}", self.host, self.pair),
        };
        tokio::spawn(manager.run());

        Ok(Conn { shared })
    }
}

/// Dials the streaming service with default options.
///
/// # Errors
///
/// Returns [`StreamError::MissingCredentials`] if either credential is
/// empty.
pub fn dial(
    key_id: impl Into<String>,
    key_secret: impl Into<String>,
    pair: impl Into<String>,
) -> Result<Conn> {
    Dialer::new(key_id, key_secret, pair).dial()
}

/// Handle to a supervised streaming session.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct Conn {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn").finish_non_exhaustive()
    }
}

struct Shared {
    processor: Mutex<MessageProcessor>,
    closed: AtomicBool,
    wake: Notify,
}

impl Conn {
    /// Returns the latest book as `(sequence, bids, asks)` with bids
    /// sorted by price descending and asks ascending. During a gap
    /// (before the first snapshot, or between a disconnect and the next
    /// re-snapshot) this is `(0, [], [])`.
    pub fn snapshot(&self) -> (i64, Vec<OrderBookEntry>, Vec<OrderBookEntry>) {
        self.processor().snapshot()
    }

    /// When the session last received a keepalive, snapshot, or applied
    /// update. `None` during a gap.
    pub fn last_message_at(&self) -> Option<Instant> {
        self.processor().last_message_at()
    }

    /// Closes the connection and stops the background manager.
    /// Idempotent.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    fn processor(&self) -> MutexGuard<'_, MessageProcessor> {
        self.shared
            .processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Why a session's read loop stopped.
enum SessionEnd {
    /// The handle was closed; the manager must exit.
    Closed,
    /// The transport or processor failed; reconnect after backoff.
    Failed(StreamError),
}

/// Background task driving one logical connection across reconnects.
struct Manager {
    shared: Arc<Shared>,
    credentials: Credentials,
    pair: String,
    url: String,
}

impl Manager {
    async fn run(self) {
        let mut attempts: u32 = 0;

        loop {
            if self.closed() {
                return;
            }

            let attempt_started = Instant::now();
            attempts += 1;

            let end = self.run_session().await;

            // The reset contract: whatever ended the session, the book
            // is stale and must return to the sentinel state until the
            // next snapshot arrives.
            self.processor().reset();

            match end {
                SessionEnd::Closed => return,
                SessionEnd::Failed(e) => {
                    error!(
                        key_id = %self.credentials.api_key_id,
                        pair = %self.pair,
                        error = %e,
                        "connection error"
                    );
                }
            }

            if attempt_started.elapsed() > STABLE_SESSION {
                attempts = 0;
            }

            let wait = backoff_delay(attempts, &mut rand::thread_rng());
            info!(
                key_id = %self.credentials.api_key_id,
                pair = %self.pair,
                wait_secs = wait.as_secs(),
                "waiting before reconnecting"
            );
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.shared.wake.notified() => return,
            }
        }
    }

    /// Runs one session to completion: dial, authenticate, ping
    /// emitter, read loop.
    async fn run_session(&self) -> SessionEnd {
        let (mut write, mut read) = match connect(&self.url).await {
            Ok(halves) => halves,
            Err(e) => return SessionEnd::Failed(e),
        };

        // The handle may have been closed while the dial was in
        // flight; abandon the fresh socket rather than serve it.
        if self.closed() {
            return SessionEnd::Closed;
        }

        if let Err(e) = authenticate(&mut write, &self.credentials).await {
            return SessionEnd::Failed(e);
        }
        info!(
            key_id = %self.credentials.api_key_id,
            pair = %self.pair,
            "connection established"
        );

        // The ping emitter owns the write half from here on. A failed
        // send ends the task; the server then times the session out and
        // the read loop observes the dead socket.
        let ping_task = tokio::spawn(send_pings(write));

        let end = self.read_loop(&mut read).await;
        ping_task.abort();
        end
    }

    /// Receives frames and feeds them to the processor until the
    /// transport fails, the processor reports a fatal error, or the
    /// handle is closed.
    async fn read_loop(&self, read: &mut WsReader) -> SessionEnd {
        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Err(e) = self.processor().handle_message(text.as_str()) {
                            return SessionEnd::Failed(e);
                        }
                    }
                    // Control frames carry no book data.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Failed(e.into()),
                    None => {
                        return SessionEnd::Failed(tungstenite::Error::ConnectionClosed.into());
                    }
                },
                () = self.shared.wake.notified() => return SessionEnd::Closed,
            }
        }
    }

    fn closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn processor(&self) -> MutexGuard<'_, MessageProcessor> {
        self.shared
            .processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Emits a keepalive immediately and then every [`PING_INTERVAL`],
/// exiting on the first failed send.
async fn send_pings(mut write: WsWriter) {
    loop {
        if send_keepalive(&mut write).await.is_err() {
            return;
        }
        tokio::time::sleep(PING_INTERVAL).await;
    }
}

/// Computes the wait before reconnect attempt number `attempts`:
/// `5 · 2^min(attempts, 5)` seconds plus a uniform random jitter in
/// `[0, wait)` seconds.
fn backoff_delay<R: Rng>(attempts: u32, rng: &mut R) -> Duration {
    let wait = BACKOFF_BASE_SECS << attempts.min(BACKOFF_MAX_EXPONENT);
    Duration::from_secs(wait + rng.gen_range(0..wait))
}
