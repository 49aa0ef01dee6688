//! Incremental update models.

use rust_decimal::Decimal;
use serde::Deserialize;

/// An incremental message advancing the book's sequence by 1.
///
/// Any combination of the three update kinds may coexist in one message;
/// they are applied in the order trades → create → delete.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessage {
    #[serde(deserialize_with = "super::sequence_from_str")]
    pub sequence: i64,
    #[serde(default)]
    pub trade_updates: Option<Vec<TradeUpdate>>,
    #[serde(default)]
    pub create_update: Option<CreateUpdate>,
    #[serde(default)]
    pub delete_update: Option<DeleteUpdate>,
    /// Server-side timestamp in milliseconds. Opaque to book mutation.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// The filling (partial or total) of a resting order.
///
/// Only `order_id` and `base` affect the book; the remaining fields are
/// informational.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeUpdate {
    pub order_id: String,
    /// Base-currency volume filled; must be strictly positive.
    pub base: Decimal,
    #[serde(default)]
    pub counter: Option<Decimal>,
    #[serde(default)]
    pub maker_order_id: Option<String>,
    #[serde(default)]
    pub taker_order_id: Option<String>,
}

/// A new order entering the book.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUpdate {
    pub order_id: String,
    /// `"BID"` or `"ASK"`; validated at application time.
    #[serde(rename = "type")]
    pub order_type: String,
    pub price: Decimal,
    pub volume: Decimal,
}

/// An order leaving the book for a reason other than being fully filled.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUpdate {
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn update_message_deserializes_quoted_sequence() {
        let json = r#"{"sequence":"40413239","trade_updates":null,"create_update":null,"delete_update":{"order_id":"BXNC7TGBBJJ885S"},"timestamp":1530887350936}"#;

        let update: UpdateMessage = serde_json::from_str(json).unwrap();
        assert_eq!(update.sequence, 40413239);
        assert!(update.trade_updates.is_none());
        assert!(update.create_update.is_none());
        assert_eq!(update.delete_update.unwrap().order_id, "BXNC7TGBBJJ885S");
        assert_eq!(update.timestamp, Some(1530887350936));
    }

    #[test]
    fn trade_update_parses_decimal_base() {
        let json = r#"{"sequence":"7","trade_updates":[{"base":"0.094976","counter":"8800.00128","maker_order_id":"BXM","taker_order_id":"BXT","order_id":"BXM"}],"create_update":null,"delete_update":null,"timestamp":1}"#;

        let update: UpdateMessage = serde_json::from_str(json).unwrap();
        let trades = update.trade_updates.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].base, dec!(0.094976));
        assert_eq!(trades[0].counter, Some(dec!(8800.00128)));
    }

    #[test]
    fn create_update_renames_type_field() {
        let json = r#"{"sequence":"8","trade_updates":null,"create_update":{"order_id":"BXK","type":"BID","price":"88501.00","volume":"3.0485"},"delete_update":null,"timestamp":1}"#;

        let update: UpdateMessage = serde_json::from_str(json).unwrap();
        let create = update.create_update.unwrap();
        assert_eq!(create.order_type, "BID");
        assert_eq!(create.price, dec!(88501.00));
        assert_eq!(create.volume, dec!(3.0485));
    }

    #[test]
    fn delete_update_rejects_non_string_order_id() {
        let json = r#"{"sequence":"9","trade_updates":null,"create_update":null,"delete_update":{"order_id":{"order_id":"BXNC7TGBBJJ885S"}},"timestamp":1}"#;

        assert!(serde_json::from_str::<UpdateMessage>(json).is_err());
    }
}
