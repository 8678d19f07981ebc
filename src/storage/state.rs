//! Persistence of per-directory conversation state.
//!
//! The session controller only talks to [`StateStore`]; [`FileStore`] is the
//! flat-file implementation rooted at the user's state directory. Every save
//! rewrites its file wholesale.

use std::io::ErrorKind;

use serde_json::Value;
use uuid::Uuid;

use super::paths::StatePaths;
use super::settings::{Credentials, Prompts, Target, read_json, write_json};
use crate::error::{Result, UncleError};

/// Length of a canonical hyphenated UUID.
pub const UUID_LEN: usize = 36;

/// Load/save access to the state files.
pub trait StateStore {
    /// Load `target.json`.
    ///
    /// # Errors
    /// Fails if the file is missing or malformed.
    fn load_target(&self) -> Result<Target>;

    /// Load `creds.json`.
    ///
    /// # Errors
    /// Fails if the file is missing or malformed.
    fn load_credentials(&self) -> Result<Credentials>;

    /// Persist credentials.
    ///
    /// # Errors
    /// Fails if the write fails.
    fn save_credentials(&mut self, creds: &Credentials) -> Result<()>;

    /// Load `prompts.json`.
    ///
    /// # Errors
    /// Fails if the file is missing or malformed.
    fn load_prompts(&self) -> Result<Prompts>;

    /// The stored parent pointer, `None` when absent or not a UUID.
    ///
    /// # Errors
    /// Fails only on unexpected I/O errors.
    fn load_parent(&self) -> Result<Option<Uuid>>;

    /// Store a parent pointer.
    ///
    /// # Errors
    /// Fails if the write fails.
    fn save_parent(&mut self, parent: Uuid) -> Result<()>;

    /// Forget the parent pointer so the next prompt starts a fresh thread.
    ///
    /// # Errors
    /// Fails on unexpected I/O errors; an already-absent pointer is fine.
    fn clear_parent(&mut self) -> Result<()>;

    /// The cached listing, `None` if nothing has been listed yet.
    ///
    /// # Errors
    /// Fails if the cache exists but is malformed.
    fn load_listing(&self) -> Result<Option<Vec<Value>>>;

    /// Replace the cached listing.
    ///
    /// # Errors
    /// Fails if the write fails.
    fn save_listing(&mut self, listing: &[Value]) -> Result<()>;
}

/// Parse a bare parent pointer file.
///
/// Only a canonical 36-character UUID is accepted.
#[must_use]
pub fn parse_parent(content: &str) -> Option<Uuid> {
    let trimmed = content.trim();
    if trimmed.len() != UUID_LEN {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

/// State files in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: StatePaths,
}

impl FileStore {
    /// Store rooted at the given state paths.
    #[must_use]
    pub const fn new(paths: StatePaths) -> Self {
        Self { paths }
    }

    /// Paths backing this store.
    #[must_use]
    pub const fn paths(&self) -> &StatePaths {
        &self.paths
    }
}

impl StateStore for FileStore {
    fn load_target(&self) -> Result<Target> {
        read_json(&self.paths.target_file())
    }

    fn load_credentials(&self) -> Result<Credentials> {
        read_json(&self.paths.creds_file())
    }

    fn save_credentials(&mut self, creds: &Credentials) -> Result<()> {
        tracing::debug!(path = %self.paths.creds_file().display(), "Saving credentials");
        write_json(&self.paths.creds_file(), creds)
    }

    fn load_prompts(&self) -> Result<Prompts> {
        read_json(&self.paths.prompts_file())
    }

    fn load_parent(&self) -> Result<Option<Uuid>> {
        match std::fs::read_to_string(self.paths.parent_file()) {
            Ok(content) => {
                let parent = parse_parent(&content);
                if parent.is_none() {
                    tracing::warn!(content = %content.trim(), "Ignoring malformed parent pointer");
                }
                Ok(parent)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Undecodable bytes are as good as no pointer.
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_parent(&mut self, parent: Uuid) -> Result<()> {
        tracing::debug!(%parent, "Saving parent pointer");
        std::fs::write(self.paths.parent_file(), parent.hyphenated().to_string())?;
        Ok(())
    }

    fn clear_parent(&mut self) -> Result<()> {
        match std::fs::remove_file(self.paths.parent_file()) {
            Ok(()) => {
                tracing::debug!("Cleared parent pointer");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_listing(&self) -> Result<Option<Vec<Value>>> {
        let path = self.paths.listing_file();
        match read_json(&path) {
            Ok(listing) => Ok(Some(listing)),
            Err(UncleError::StateFileMissing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_listing(&mut self, listing: &[Value]) -> Result<()> {
        write_json(&self.paths.listing_file(), &listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(StatePaths::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn parent_accepts_only_canonical_uuids() {
        let id = "0f8fad5b-d9cb-469f-a165-70867728950e";
        assert_eq!(parse_parent(&format!("{id}\n")), Some(Uuid::parse_str(id).unwrap()));
        assert_eq!(parse_parent("0f8fad5bd9cb469fa16570867728950e"), None);
        assert_eq!(parse_parent("not-a-uuid-at-all-but-36-chars-long!"), None);
        assert_eq!(parse_parent(""), None);
    }

    #[test]
    fn parent_round_trip_and_clear() {
        let (_dir, mut store) = store();
        assert_eq!(store.load_parent().unwrap(), None);

        let id = Uuid::new_v4();
        store.save_parent(id).unwrap();
        assert_eq!(store.load_parent().unwrap(), Some(id));
        assert!(store.paths().parent_file().exists());

        store.clear_parent().unwrap();
        assert!(!store.paths().parent_file().exists());
        // Clearing twice is harmless.
        store.clear_parent().unwrap();
    }

    #[test]
    fn malformed_parent_reads_as_absent() {
        let (_dir, store) = store();
        std::fs::write(store.paths().parent_file(), "garbage").unwrap();
        assert_eq!(store.load_parent().unwrap(), None);
    }

    #[test]
    fn listing_cache_round_trip() {
        let (_dir, mut store) = store();
        assert_eq!(store.load_listing().unwrap(), None);

        let listing = vec![json!({"name": "a", "uuid": "u1"}), json!({"name": "b", "uuid": "u2"})];
        store.save_listing(&listing).unwrap();
        assert_eq!(store.load_listing().unwrap(), Some(listing));
    }
}
