//! Client configuration: where the server lives and how media URLs resolve.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! server_url = "ws://localhost:8080"
//! ws_path = "/ws"
//! media_base_url = "http://localhost:8080"
//! upload_path = "/api/upload"
//! username = "alice"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080";
pub const DEFAULT_WS_PATH: &str = "/ws";
pub const DEFAULT_MEDIA_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base WebSocket URL of the server (`ws://` or `wss://`).
    pub server_url: String,
    /// Endpoint path of the session socket.
    pub ws_path: String,
    /// HTTP base that relative media URLs are resolved against.
    pub media_base_url: String,
    /// Endpoint path of the multipart upload handler.
    pub upload_path: String,
    /// Default username for the terminal front-end.
    pub username: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            username: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Full socket URL. A `server_url` that already ends in `ws_path` is used as-is.
    pub fn ws_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let path = normalize_path(&self.ws_path);
        if base.ends_with(&path) {
            base.to_string()
        } else {
            format!("{base}{path}")
        }
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}{}",
            self.media_base_url.trim_end_matches('/'),
            normalize_path(&self.upload_path)
        )
    }

    /// Resolve a media reference to an absolute URL.
    ///
    /// Values starting with `http` are already absolute and pass through;
    /// anything else is treated as a server path under `media_base_url`.
    pub fn media_url(&self, media_path: &str) -> String {
        if media_path.starts_with("http") {
            return media_path.to_string();
        }
        format!(
            "{}{}",
            self.media_base_url.trim_end_matches('/'),
            normalize_path(media_path)
        )
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
