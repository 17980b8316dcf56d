//! Durable copy of the active shift, so a restarted terminal resumes it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::domain::Session;
use storage::Storage;
use thiserror::Error;
use tokio::sync::Mutex;

pub const SESSION_STORAGE_KEY: &str = "shiftSession";
pub const SESSION_RECORD_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("stored shift is not readable: {0}")]
    Incompatible(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, SessionStoreError>;
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Serialize)]
struct PersistedSessionRef<'a> {
    version: u32,
    session: &'a Session,
}

#[derive(Deserialize)]
struct PersistedSession {
    version: u32,
    session: Session,
}

pub fn encode_session(session: &Session) -> Result<String, SessionStoreError> {
    let record = PersistedSessionRef {
        version: SESSION_RECORD_VERSION,
        session,
    };
    serde_json::to_string(&record).map_err(|err| SessionStoreError::Backend(err.into()))
}

/// Decodes a stored record.
///
/// Accepts the versioned envelope and, for records written before the
/// envelope existed, a bare session object. Anything else is incompatible.
pub fn decode_session(raw: &str) -> Result<Session, SessionStoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| SessionStoreError::Incompatible(format!("not JSON: {err}")))?;

    let session = match value.get("version") {
        Some(version) if version.as_u64() == Some(u64::from(SESSION_RECORD_VERSION)) => {
            serde_json::from_value::<PersistedSession>(value)
                .map(|record| record.session)
                .map_err(|err| SessionStoreError::Incompatible(err.to_string()))?
        }
        Some(version) => {
            return Err(SessionStoreError::Incompatible(format!(
                "unsupported record version {version}"
            )))
        }
        None => serde_json::from_value::<Session>(value)
            .map_err(|err| SessionStoreError::Incompatible(err.to_string()))?,
    };

    if session.log_ids.is_empty() {
        return Err(SessionStoreError::Incompatible(
            "stored shift has no log ids".to_string(),
        ));
    }
    Ok(session)
}

/// Session store over the local SQLite key/value table.
#[derive(Clone)]
pub struct SqliteSessionStore {
    storage: Storage,
}

impl SqliteSessionStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        match self.storage.get_item(SESSION_STORAGE_KEY).await? {
            Some(raw) => decode_session(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let raw = encode_session(session)?;
        self.storage.set_item(SESSION_STORAGE_KEY, &raw).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        self.storage.remove_item(SESSION_STORAGE_KEY).await?;
        Ok(())
    }
}

/// In-process store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The stored blob exactly as written.
    pub async fn raw(&self) -> Option<String> {
        self.raw.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        match self.raw.lock().await.as_deref() {
            Some(raw) => decode_session(raw).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let raw = encode_session(session)?;
        *self.raw.lock().await = Some(raw);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.raw.lock().await = None;
        Ok(())
    }
}
