//! Crate-level error types.
//!
//! [`StreamError`] unifies every error source (configuration, transport,
//! JSON decoding, book validation) behind a single enum so callers can
//! match on the variant they care about while still using the `?`
//! operator for easy propagation.
//!
//! Every book-validation variant is fatal for the session that produced
//! it: the connection supervisor closes the socket, resets the book to
//! the uninitialized state, and reconnects to obtain a fresh snapshot.

use rust_decimal::Decimal;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// `dial` was called without an API key id or secret.
    #[error("streaming API requires credentials")]
    MissingCredentials,

    /// Environment configuration is missing or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// A frame could not be decoded as any known message shape.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// An update skipped ahead of the book's sequence cursor. The gap
    /// cannot be healed locally; only a reconnect and fresh snapshot can.
    #[error("update {update} received out of sequence (book at {book})")]
    OutOfSequence {
        /// Sequence number of the last applied message.
        book: i64,
        /// Sequence number carried by the offending update.
        update: i64,
    },

    /// A trade update carried a zero or negative base volume.
    #[error("nonpositive trade of {base} against order {order_id}")]
    NonPositiveTrade { order_id: String, base: Decimal },

    /// A trade referenced an order resting on neither side of the book.
    #[error("trade against unknown order {0}")]
    UnknownOrder(String),

    /// A trade would reduce an order's volume below zero.
    #[error("trade of {base} exceeds remaining volume of order {order_id}")]
    OversizedTrade { order_id: String, base: Decimal },

    /// A create update carried an order type other than `BID` or `ASK`.
    #[error("unknown order type {0:?}")]
    UnknownOrderType(String),
}
