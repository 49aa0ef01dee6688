//! Wire models for the Luno streaming protocol.
//!
//! All inbound frames are JSON text. Numeric fields arrive as quoted
//! strings and are parsed into exact types at the deserialization
//! boundary: prices and volumes into [`rust_decimal::Decimal`], sequence
//! numbers into `i64`.

pub mod book;
pub mod update;

use serde::{Deserialize, Deserializer, Serialize};

/// The keepalive frame used in both directions: a JSON empty string.
pub const KEEPALIVE_FRAME: &str = "\"\"";

/// The authentication frame sent first on every new connection.
#[derive(Debug, Serialize)]
pub struct Credentials {
    pub api_key_id: String,
    pub api_key_secret: String,
}

/// Deserializes an `i64` sent on the wire as a quoted decimal string.
pub(crate) fn sequence_from_str<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
