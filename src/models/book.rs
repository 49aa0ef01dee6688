//! Order book models.

use rust_decimal::Decimal;
use serde::Deserialize;

/// A single resting order, keyed by its exchange-assigned id.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub price: Decimal,
    /// Remaining volume; strictly positive while the order is live.
    pub volume: Decimal,
}

/// A price level in a produced snapshot. Order ids are elided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookEntry {
    pub price: Decimal,
    pub volume: Decimal,
}

/// A full book dump anchored to a specific sequence number.
///
/// The server sends at least one of `bids`/`asks` as a non-null array;
/// a frame with both absent is classified as an incremental update
/// instead (see [`MessageProcessor`](crate::processor::MessageProcessor)).
#[derive(Debug, Deserialize)]
pub struct OrderBookSnapshot {
    #[serde(deserialize_with = "super::sequence_from_str")]
    pub sequence: i64,
    pub bids: Option<Vec<Order>>,
    pub asks: Option<Vec<Order>>,
}
