//! Message processing for one streaming session.
//!
//! [`MessageProcessor`] owns the book replica and the sequence cursor.
//! It classifies each inbound frame as a keepalive, a snapshot, or an
//! incremental update, and drives the book accordingly. It never blocks
//! on I/O; the connection supervisor feeds it raw frame payloads.
//!
//! The error policy follows the streaming protocol: stale updates and
//! updates arriving before any snapshot are dropped silently, while a
//! sequence gap or any invalid mutation is returned as an error the
//! supervisor must treat as fatal (disconnect, reset, re-snapshot).

use std::time::Instant;

use tracing::trace;

use crate::error::{Result, StreamError};
use crate::models::KEEPALIVE_FRAME;
use crate::models::book::{OrderBookEntry, OrderBookSnapshot};
use crate::models::update::UpdateMessage;
use crate::orderbook::OrderBook;

/// Consumer hook invoked once per successfully applied update.
pub type UpdateCallback = Box<dyn FnMut(&UpdateMessage) + Send>;

/// Ingests sequenced frames and maintains the book replica.
#[derive(Default)]
pub struct MessageProcessor {
    book: OrderBook,
    update_callback: Option<UpdateCallback>,
    last_message_at: Option<Instant>,
}

impl MessageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer hook, replacing any previous one.
    ///
    /// The callback runs while the processor's owner holds its state
    /// lock, in applied-sequence order. It is invoked exactly once per
    /// successfully applied update (never for snapshots, keepalives, or
    /// failed updates) and must not call back into the connection
    /// handle.
    pub fn set_update_callback(&mut self, callback: impl FnMut(&UpdateMessage) + Send + 'static) {
        self.update_callback = Some(Box::new(callback));
    }

    /// Handles one inbound frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Json`] if the payload matches no known
    /// message shape, or any of the book-validation variants if an
    /// in-sequence update is invalid. Every error is fatal for the
    /// session that produced it.
    pub fn handle_message(&mut self, payload: &str) -> Result<()> {
        if payload == KEEPALIVE_FRAME {
            trace!("received keepalive");
            self.last_message_at = Some(Instant::now());
            return Ok(());
        }

        let value: serde_json::Value = serde_json::from_str(payload)?;
        if has_side_array(&value) {
            let snapshot: OrderBookSnapshot = serde_json::from_value(value)?;
            self.book.install(snapshot);
            self.last_message_at = Some(Instant::now());
            return Ok(());
        }

        let update: UpdateMessage = serde_json::from_value(value)?;
        self.apply_update(&update)
    }

    fn apply_update(&mut self, update: &UpdateMessage) -> Result<()> {
        let current = self.book.sequence();
        if current == 0 {
            // No baseline to apply against.
            return Ok(());
        }
        if update.sequence <= current {
            // Stale or replayed.
            return Ok(());
        }
        if update.sequence != current + 1 {
            return Err(StreamError::OutOfSequence {
                book: current,
                update: update.sequence,
            });
        }

        self.book.apply(update)?;
        self.last_message_at = Some(Instant::now());

        if let Some(callback) = &mut self.update_callback {
            callback(update);
        }
        Ok(())
    }

    /// Flattens the current book into `(sequence, bids, asks)` with
    /// bids sorted by price descending and asks ascending. Never fails;
    /// before any snapshot has been installed it returns `(0, [], [])`.
    pub fn snapshot(&self) -> (i64, Vec<OrderBookEntry>, Vec<OrderBookEntry>) {
        self.book.snapshot()
    }

    /// Clears the book back to the uninitialized sentinel state.
    pub fn reset(&mut self) {
        self.book.reset();
        self.last_message_at = None;
    }

    /// When the last keepalive, snapshot, or applied update was
    /// received, for staleness monitoring. `None` before the first
    /// frame and after a reset.
    pub fn last_message_at(&self) -> Option<Instant> {
        self.last_message_at
    }
}

/// A frame carrying a non-null `asks` or `bids` key is a snapshot;
/// everything else decodes as an incremental update.
fn has_side_array(value: &serde_json::Value) -> bool {
    ["asks", "bids"]
        .iter()
        .any(|key| value.get(key).is_some_and(|side| !side.is_null()))
}
