//! Order book state and mutation rules.
//!
//! [`OrderBook`] is the local replica of the exchange book for one
//! trading pair: a sequence cursor plus the two id-keyed sides. It is
//! pure state: sequence gating and message classification live in
//! [`processor`](crate::processor); this module only knows how to
//! install a snapshot, apply one already-gated update, and flatten
//! itself into sorted price levels.
//!
//! Update application is transactional: all trades are staged against a
//! scratch volume map and the create's order type is validated before
//! anything is committed, so a failed update leaves the book untouched.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{Result, StreamError};
use crate::models::book::{Order, OrderBookEntry, OrderBookSnapshot};
use crate::models::update::{TradeUpdate, UpdateMessage};

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Bid,
    Ask,
}

fn side_of(order_type: &str) -> Result<Side> {
    match order_type {
        "BID" => Ok(Side::Bid),
        "ASK" => Ok(Side::Ask),
        other => Err(StreamError::UnknownOrderType(other.to_string())),
    }
}

/// The book replica for a single trading pair.
///
/// `sequence == 0` is the uninitialized sentinel: both sides are empty
/// and no update may mutate anything until a snapshot is installed.
#[derive(Debug, Default)]
pub struct OrderBook {
    sequence: i64,
    bids: HashMap<String, Order>,
    asks: HashMap<String, Order>,
}

impl OrderBook {
    /// Sequence number of the last applied message, or 0 before any
    /// snapshot has been installed.
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Installs a full snapshot, replacing any prior book atomically.
    pub fn install(&mut self, snapshot: OrderBookSnapshot) {
        self.sequence = snapshot.sequence;
        self.bids = index_orders(snapshot.bids.unwrap_or_default());
        self.asks = index_orders(snapshot.asks.unwrap_or_default());
    }

    /// Clears the book back to the uninitialized sentinel state.
    pub fn reset(&mut self) {
        *self = OrderBook::default();
    }

    /// Applies one update whose sequence the caller has already checked
    /// to be exactly one past [`sequence`](Self::sequence).
    ///
    /// Sub-steps run in wire order: trades, then create, then delete.
    /// If any sub-step fails the book is left exactly as it was.
    pub fn apply(&mut self, update: &UpdateMessage) -> Result<()> {
        let trades = update.trade_updates.as_deref().unwrap_or_default();
        let staged = self.stage_trades(trades)?;
        let create_side = match &update.create_update {
            Some(create) => Some(side_of(&create.order_type)?),
            None => None,
        };

        // Validation is complete; every mutation below succeeds.
        for (id, (side, volume)) in staged {
            let orders = self.side_mut(side);
            if volume.is_zero() {
                orders.remove(id);
            } else if let Some(order) = orders.get_mut(id) {
                order.volume = volume;
            }
        }

        if let (Some(create), Some(side)) = (&update.create_update, create_side) {
            let order = Order {
                id: create.order_id.clone(),
                price: create.price,
                volume: create.volume,
            };
            // A duplicate id overwrites the resting order.
            self.side_mut(side).insert(create.order_id.clone(), order);
        }

        if let Some(delete) = &update.delete_update {
            // Absence is not an error.
            self.bids.remove(&delete.order_id);
            self.asks.remove(&delete.order_id);
        }

        self.sequence = update.sequence;
        Ok(())
    }

    /// Computes the post-trade volume of every touched order without
    /// mutating the book. An order drained to zero earlier in the same
    /// message no longer rests on the book, so a later trade against it
    /// fails [`StreamError::UnknownOrder`].
    fn stage_trades<'a>(
        &self,
        trades: &'a [TradeUpdate],
    ) -> Result<HashMap<&'a str, (Side, Decimal)>> {
        let mut staged: HashMap<&str, (Side, Decimal)> = HashMap::new();

        for trade in trades {
            if trade.base <= Decimal::ZERO {
                return Err(StreamError::NonPositiveTrade {
                    order_id: trade.order_id.clone(),
                    base: trade.base,
                });
            }

            let (side, remaining) = match staged.get(trade.order_id.as_str()) {
                Some((_, volume)) if volume.is_zero() => {
                    return Err(StreamError::UnknownOrder(trade.order_id.clone()));
                }
                Some(&pending) => pending,
                None => self
                    .resting_volume(&trade.order_id)
                    .ok_or_else(|| StreamError::UnknownOrder(trade.order_id.clone()))?,
            };

            let next = remaining - trade.base;
            if next < Decimal::ZERO {
                return Err(StreamError::OversizedTrade {
                    order_id: trade.order_id.clone(),
                    base: trade.base,
                });
            }
            staged.insert(trade.order_id.as_str(), (side, next));
        }

        Ok(staged)
    }

    fn resting_volume(&self, id: &str) -> Option<(Side, Decimal)> {
        if let Some(order) = self.bids.get(id) {
            return Some((Side::Bid, order.volume));
        }
        self.asks.get(id).map(|order| (Side::Ask, order.volume))
    }

    fn side_mut(&mut self, side: Side) -> &mut HashMap<String, Order> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Flattens the book into freshly allocated price levels: bids
    /// sorted by price descending (best bid first), asks ascending
    /// (best ask first). Orders sharing a price keep no particular
    /// relative order.
    pub fn snapshot(&self) -> (i64, Vec<OrderBookEntry>, Vec<OrderBookEntry>) {
        let mut bids = flatten(&self.bids);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        let mut asks = flatten(&self.asks);
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        (self.sequence, bids, asks)
    }
}

fn index_orders(orders: Vec<Order>) -> HashMap<String, Order> {
    orders
        .into_iter()
        .map(|order| (order.id.clone(), order))
        .collect()
}

fn flatten(orders: &HashMap<String, Order>) -> Vec<OrderBookEntry> {
    orders
        .values()
        .map(|order| OrderBookEntry {
            price: order.price,
            volume: order.volume,
        })
        .collect()
}
