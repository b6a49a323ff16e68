use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{debug, warn};

/// Persisted bearer token, the local-storage analogue.
///
/// The token is opaque to the client: it is written verbatim on login, read at
/// startup for the eager-optimistic session restore, and removed on logout or
/// any observed 401. Persistence failures are non-fatal; the in-memory copy
/// still carries the session for the current process.
pub struct TokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    debug!("Restored persisted session token from {}", path.display());
                    Some(token)
                }
            }
            Err(_) => None,
        };
        TokenStore {
            path,
            cached: RwLock::new(cached),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.cached.read().expect("token lock poisoned").clone()
    }

    pub fn is_present(&self) -> bool {
        self.cached.read().expect("token lock poisoned").is_some()
    }

    pub fn set(&self, token: &str) {
        *self.cached.write().expect("token lock poisoned") = Some(token.to_string());
        if let Err(e) = std::fs::write(&self.path, token) {
            warn!("Could not persist session token to {}: {}", self.path.display(), e);
        }
    }

    pub fn clear(&self) {
        *self.cached.write().expect("token lock poisoned") = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove token file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_token_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ops_token_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn token_survives_reload() {
        let path = temp_token_path("reload");
        let store = TokenStore::load(&path);
        store.set("abc123");
        drop(store);

        let restored = TokenStore::load(&path);
        assert_eq!(restored.get().as_deref(), Some("abc123"));
        restored.clear();
        assert!(TokenStore::load(&path).get().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let path = temp_token_path("clear");
        let store = TokenStore::load(&path);
        store.clear();
        store.clear();
        assert!(store.get().is_none());
    }
}
