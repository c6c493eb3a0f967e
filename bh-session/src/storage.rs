// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Durable storage substrate for the session token.

use std::{
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

/// Storage for the single persisted bearer token.
///
/// There is at most one token live at a time; absence of a value means
/// "unauthenticated".  Clearing an absent token must be a no-op.
pub trait TokenStore: Send + Sync {
    /// Read the currently persisted token, if any.
    fn load(&self) -> io::Result<Option<String>>;

    /// Persist `token`, replacing any previous value.
    fn store(&self, token: &str) -> io::Result<()>;

    /// Remove the persisted token.
    fn clear(&self) -> io::Result<()>;
}

/// [`TokenStore`] keeping the raw token in a single file.
///
/// The file plays the role of the fixed storage key: its absence means
/// logged out, its full content is the token.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Construct a store persisting the token at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(token) => Ok(Some(token)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn store(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory [`TokenStore`] for tests and ephemeral processes.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().expect("token lock poisoned").clone())
    }

    fn store(&self, token: &str) -> io::Result<()> {
        *self.token.lock().expect("token lock poisoned") = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().expect("token lock poisoned") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bh-session-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_file_store_round_trip() {
        let store = FileTokenStore::new(scratch_path("round-trip"));

        store.store("token-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("token-1".to_owned()));

        store.store("token-2").unwrap();
        assert_eq!(store.load().unwrap(), Some("token-2".to_owned()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_absent() {
        let store = FileTokenStore::new(scratch_path("absent"));

        assert_eq!(store.load().unwrap(), None);
        // Clearing an absent token is a no-op.
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let store = FileTokenStore::new(scratch_path("nested").join("dir").join("token"));

        store.store("token-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("token-1".to_owned()));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();

        assert_eq!(store.load().unwrap(), None);
        store.store("token-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("token-1".to_owned()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }
}
