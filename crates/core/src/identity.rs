//! Durable anonymous client identity.
//!
//! The server correlates submissions and cancellations with an opaque
//! `user_key` rather than an account. [`IdentityStore`] persists one such
//! key at a filesystem path so the same identity survives restarts, and
//! caches it for the rest of the session.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::types::ClientIdentity;

/// File-backed store for the per-client identity key.
///
/// `get_or_create` is idempotent within a session: the first call reads
/// or generates the key, every later call returns the cached value.
pub struct IdentityStore {
    path: PathBuf,
    cached: Mutex<Option<ClientIdentity>>,
}

impl IdentityStore {
    /// Create a store persisting at `path`. Nothing is read until the
    /// first [`get_or_create`](Self::get_or_create) call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Return the persisted identity, generating and persisting a new one
    /// if none exists yet.
    ///
    /// There is no error path: if the file cannot be read or written the
    /// store degrades to a fresh in-memory identity for this session.
    /// Correlation across restarts is then lost, which is acceptable.
    pub fn get_or_create(&self) -> ClientIdentity {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(identity) = cached.as_ref() {
            return identity.clone();
        }

        let identity = match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let stored = contents.trim();
                if stored.is_empty() {
                    self.persist_new()
                } else {
                    stored.to_string()
                }
            }
            Err(_) => self.persist_new(),
        };

        *cached = Some(identity.clone());
        identity
    }

    /// Generate a fresh identity and best-effort persist it.
    fn persist_new(&self) -> ClientIdentity {
        let identity = generate_identity();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }
        if let Err(e) = fs::write(&self.path, &identity) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist client identity, using in-memory identity for this session",
            );
        }

        identity
    }
}

/// Build a new opaque identity: `user_<millis>_<random>`.
fn generate_identity() -> ClientIdentity {
    format!(
        "user_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
    )
}
