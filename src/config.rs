//! Application configuration loaded from environment variables.
//!
//! Credentials are provided via environment variables:
//! - `LUNO_API_KEY_ID` - API key id for streaming authentication
//! - `LUNO_API_KEY_SECRET` - API key secret for streaming authentication
//!
//! An optional `LUNO_WEBSOCKET_URL` overrides the default public
//! endpoint and `LUNO_PAIR` selects the market pair for the demo binary.

use crate::websocket::DEFAULT_WS_HOST;

/// Default market pair used by the demo binary.
const DEFAULT_PAIR: &str = "XBTZAR";

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub luno: LunoConfig,
}

/// Luno-specific configuration values.
#[derive(Debug)]
pub struct LunoConfig {
    pub websocket_url: String,
    pub pair: String,
    pub api_key_id: Option<String>,
    pub api_key_secret: Option<String>,
}

/// Loads the application configuration from environment variables.
///
/// The WebSocket URL defaults to `wss://ws.luno.com` and can be
/// overridden with `LUNO_WEBSOCKET_URL`. When one credential variable is
/// set the other must be too.
///
/// # Errors
///
/// Returns [`StreamError::Config`](crate::StreamError::Config) if only
/// one of the two credential variables is set.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let websocket_url =
        non_empty_var("LUNO_WEBSOCKET_URL").unwrap_or_else(|| DEFAULT_WS_HOST.to_string());
    let pair = non_empty_var("LUNO_PAIR").unwrap_or_else(|| DEFAULT_PAIR.to_string());

    let api_key_id = non_empty_var("LUNO_API_KEY_ID");
    let api_key_secret = non_empty_var("LUNO_API_KEY_SECRET");

    match (&api_key_id, &api_key_secret) {
        (Some(_), None) => {
            return Err(crate::StreamError::Config(
                "LUNO_API_KEY_ID is set but LUNO_API_KEY_SECRET is missing".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(crate::StreamError::Config(
                "LUNO_API_KEY_SECRET is set but LUNO_API_KEY_ID is missing".to_string(),
            ));
        }
        _ => {}
    }

    Ok(AppConfig {
        luno: LunoConfig {
            websocket_url,
            pair,
            api_key_id,
            api_key_secret,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
