use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;
use wc_bridge_core::{PortError, Session, SessionsRepository};

type SessionsByWallet = BTreeMap<String, Vec<Session>>;

fn upsert(sessions: &mut Vec<Session>, session: Session) {
    match sessions.iter_mut().find(|s| s.topic == session.topic) {
        Some(existing) => *existing = session,
        None => sessions.push(session),
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionsRepository {
    inner: Arc<Mutex<SessionsByWallet>>,
}

impl InMemorySessionsRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SessionsByWallet>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("sessions lock poisoned: {e}")))
    }
}

impl SessionsRepository for InMemorySessionsRepository {
    async fn load_sessions(&self, user_wallet_id: &str) -> Result<Vec<Session>, PortError> {
        Ok(self.lock()?.get(user_wallet_id).cloned().unwrap_or_default())
    }

    async fn save_session(&self, user_wallet_id: &str, session: Session) -> Result<(), PortError> {
        upsert(
            self.lock()?.entry(user_wallet_id.to_owned()).or_default(),
            session,
        );
        Ok(())
    }

    async fn remove_session(&self, user_wallet_id: &str, topic: &str) -> Result<(), PortError> {
        if let Some(sessions) = self.lock()?.get_mut(user_wallet_id) {
            sessions.retain(|s| s.topic != topic);
        }
        Ok(())
    }
}

/// Sessions persisted as one JSON document keyed by user wallet id.
///
/// Writes go to a sibling temp file that is renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileSessionsRepository {
    path: PathBuf,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonFileSessionsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<SessionsByWallet, PortError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(SessionsByWallet::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PortError::Storage(format!("corrupt sessions file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionsByWallet::new()),
            Err(e) => Err(PortError::Storage(format!(
                "read sessions file {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, all: &SessionsByWallet) -> Result<(), PortError> {
        let bytes = serde_json::to_vec_pretty(all)
            .map_err(|e| PortError::Storage(format!("serialize sessions: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| PortError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PortError::Storage(format!("replace {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "sessions file written");
        Ok(())
    }
}

impl SessionsRepository for JsonFileSessionsRepository {
    async fn load_sessions(&self, user_wallet_id: &str) -> Result<Vec<Session>, PortError> {
        let _guard = self.write_lock.lock().await;
        Ok(self
            .read_all()
            .await?
            .remove(user_wallet_id)
            .unwrap_or_default())
    }

    async fn save_session(&self, user_wallet_id: &str, session: Session) -> Result<(), PortError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        upsert(all.entry(user_wallet_id.to_owned()).or_default(), session);
        self.write_all(&all).await
    }

    async fn remove_session(&self, user_wallet_id: &str, topic: &str) -> Result<(), PortError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        let Some(sessions) = all.get_mut(user_wallet_id) else {
            return Ok(());
        };
        sessions.retain(|s| s.topic != topic);
        self.write_all(&all).await
    }
}
