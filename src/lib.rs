//! Streaming client for the Luno market-data API.
//!
//! Opens an authenticated WebSocket session for a single trading pair,
//! receives an initial order-book snapshot followed by strictly ordered
//! incremental updates, and maintains a consistent local replica of the
//! book. The connection reconnects automatically with exponential
//! backoff; consumers query the replica through [`Conn::snapshot`].
//!
//! Example:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> lunostream::Result<()> {
//!     let conn = lunostream::dial("key_id", "key_secret", "XBTZAR")?;
//!
//!     loop {
//!         let (sequence, bids, asks) = conn.snapshot();
//!         println!("{sequence}: {bids:?} {asks:?}");
//!         tokio::time::sleep(Duration::from_secs(60)).await;
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod orderbook;
pub mod processor;
pub mod websocket;

pub use error::{Result, StreamError};
pub use websocket::{Conn, Dialer, dial};
