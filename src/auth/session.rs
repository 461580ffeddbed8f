//! Durable session storage for the access/refresh token pair.
//!
//! The pair is the only durable session state the client keeps. It is
//! written on a successful login or callback capture, read as a snapshot
//! before protected requests, and removed on logout. Storage failures are
//! never fatal: an unreadable or missing session simply means the user is
//! anonymous.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Session file name inside the store directory
const SESSION_FILE: &str = "session.json";

/// The access/refresh token pair issued by the backend.
///
/// Both fields are required: a pair with only one token is not a valid
/// session and cannot be constructed or deserialized. The serialized key
/// names match the layout the browser frontend has always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// File-backed store for the current [`TokenPair`].
///
/// Writes go through a temp file and rename, so a reader in the same
/// process never observes a half-written pair.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist the pair, replacing any previously stored one.
    ///
    /// Failures (directory not creatable, disk full) are logged and
    /// swallowed; the next `read` reports absence and the caller proceeds
    /// as anonymous.
    pub fn save(&self, pair: &TokenPair) {
        if let Err(e) = self.try_save(pair) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn try_save(&self, pair: &TokenPair) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(pair).map_err(std::io::Error::other)?;
        let tmp = self.dir.join(format!("{SESSION_FILE}.tmp"));
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, self.session_path())?;
        Ok(())
    }

    /// Return the stored pair, or `None` if no complete pair is stored.
    ///
    /// A missing file, an unreadable file, and a body that does not parse
    /// to a complete pair are all reported as absence, never as an error.
    pub fn read(&self) -> Option<TokenPair> {
        let path = self.session_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(pair) => Some(pair),
            Err(e) => {
                debug!(error = %e, "Stored session is not a complete token pair");
                None
            }
        }
    }

    /// Remove the stored pair. Calling this with nothing stored is fine.
    pub fn clear(&self) {
        match std::fs::remove_file(self.session_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to remove session file"),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}
