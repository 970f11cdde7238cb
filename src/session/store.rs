use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::eligibility::SessionState;
use crate::error::Result;

/// Generates an opaque session key.
pub fn new_session_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Where interview state lives between requests. Implementations must treat
/// an unknown key as absent, not as an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Mints a key for a new session. Keys are opaque; only uniqueness
    /// matters.
    fn initialize_key(&self) -> String {
        new_session_key()
    }

    async fn load(&self, key: &str) -> Result<Option<SessionState>>;
    async fn save(&self, key: &str, state: &SessionState) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per session under a configured directory.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("trials_{key}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &str) -> Result<Option<SessionState>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, key: &str, state: &SessionState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        fs::write(&path, serde_json::to_vec_pretty(state)?).await?;
        debug!(path = %path.display(), "Session saved");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and single-process embedding.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.read().get(key).cloned())
    }

    async fn save(&self, key: &str, state: &SessionState) -> Result<()> {
        self.sessions.write().insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.sessions.write().remove(key);
        Ok(())
    }
}
