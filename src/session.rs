use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Session-scoped key-value storage for the external service bearer token.
///
/// One storage key, shared by every site that touches the token (sign-in
/// callback, sign-out, 401 handler), so in-memory and persisted state can
/// never diverge.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<StoredToken>;
    fn set(&self, token: &StoredToken);
    fn clear(&self);
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredToken {
    pub access_token: String,
}

impl StoredToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// File-backed store under the data dir. Survives an app restart; an explicit
/// sign-out or a 401 removes the file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<StoredToken> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn set(&self, token: &StoredToken) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(content) = serde_json::to_string_pretty(token) {
            let _ = fs::write(&self.path, content);
        }
    }

    fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn with_token(access_token: &str) -> Self {
        Self {
            token: Mutex::new(Some(StoredToken::new(access_token))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<StoredToken> {
        self.token.lock().ok()?.clone()
    }

    fn set(&self, token: &StoredToken) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

/// Authenticated identity against the Remote Data Gateway. Every outgoing
/// write sets `user_id`, every read filters on it.
#[derive(Clone, Debug)]
pub struct GatewaySession {
    pub user_id: String,
    pub access_token: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_token_path() -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "nexus-test-{}-{}/google_token.json",
            std::process::id(),
            stamp
        ))
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let store = FileTokenStore::new(temp_token_path());
        assert!(store.get().is_none());

        store.set(&StoredToken::new("ya29.token"));
        assert_eq!(store.get(), Some(StoredToken::new("ya29.token")));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemoryTokenStore::default();
        assert!(store.get().is_none());

        store.set(&StoredToken::new("tok"));
        assert_eq!(store.get(), Some(StoredToken::new("tok")));

        store.clear();
        assert!(store.get().is_none());
    }
}
