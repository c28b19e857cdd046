//! Minimal Chrome DevTools Protocol client.
//!
//! The generator needs exactly one browser with one page, driven strictly
//! sequentially, so the client is a plain request/response loop over the
//! DevTools websocket: send a command, read frames until the matching
//! response id arrives. No event subscriptions, no spawned tasks.

pub mod browser;
pub mod page;
pub mod protocol;

pub use browser::Browser;
pub use page::Page;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("no Chromium binary found; set TOURCAP_CHROME to the browser executable")]
    BrowserNotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DevTools endpoint did not come up within {0} seconds")]
    EndpointTimeout(u64),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("endpoint discovery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid DevTools url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed protocol message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("command {method} failed: {message}")]
    Command { method: String, message: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no response to {method} within {seconds} seconds")]
    ResponseTimeout { method: String, seconds: u64 },

    #[error("screenshot payload was not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}
