//! Session manager: keeps a launched browser page alive across independent step calls.

use artifact_store::ArtifactStore;
use async_trait::async_trait;
use cdp_adapter::{BrowserLauncher, PageDriver};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tenderscout_core_types::{Configuration, StepResult};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{errors::EngineError, ports::ConfigurationLoader};

const RUN_SEPARATOR: &str = "::run::";

/// `{configuration_id}::run::{unix_millis}-{uuid}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn mint(configuration_id: &str) -> Self {
        Self(format!(
            "{configuration_id}{RUN_SEPARATOR}{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidSessionIdFormat(raw.to_string());
        let (configuration_id, run) = raw.rsplit_once(RUN_SEPARATOR).ok_or_else(invalid)?;
        let (millis, nonce) = run.split_once('-').ok_or_else(invalid)?;
        let well_formed = !configuration_id.is_empty()
            && !millis.is_empty()
            && millis.bytes().all(|b| b.is_ascii_digit())
            && !nonce.is_empty()
            && nonce.bytes().all(|b| b.is_ascii_hexdigit());
        if !well_formed {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    pub fn configuration_id(&self) -> &str {
        self.0
            .rsplit_once(RUN_SEPARATOR)
            .map(|(configuration_id, _)| configuration_id)
            .unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Results gathered so far; guarded so steps of one session never overlap.
#[derive(Debug, Default)]
pub struct SessionProgress {
    pub results: Vec<StepResult>,
}

impl SessionProgress {
    pub fn steps_completed(&self) -> usize {
        self.results.len()
    }
}

/// Browser page, artifact store and loaded configuration of one run.
pub struct ExecutionSession {
    id: SessionId,
    configuration: Configuration,
    page: Arc<dyn PageDriver>,
    store: Arc<dyn ArtifactStore>,
    created_at: DateTime<Utc>,
    started: Instant,
    progress: Mutex<SessionProgress>,
}

impl ExecutionSession {
    pub fn new(
        id: SessionId,
        configuration: Configuration,
        page: Arc<dyn PageDriver>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            id,
            configuration,
            page,
            store,
            created_at: Utc::now(),
            started: Instant::now(),
            progress: Mutex::new(SessionProgress::default()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    pub fn store(&self) -> Arc<dyn ArtifactStore> {
        self.store.clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Exclusive access to the session's progress for the duration of one step.
    pub async fn lock_progress(&self) -> MutexGuard<'_, SessionProgress> {
        self.progress.lock().await
    }
}

/// Registry of live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Option<Arc<ExecutionSession>>;

    /// Register a session. A failed registration leaves the browser for the caller to close.
    async fn put(&self, session: Arc<ExecutionSession>) -> Result<(), EngineError>;

    async fn remove(&self, id: &SessionId) -> Option<Arc<ExecutionSession>>;

    async fn len(&self) -> usize;
}

/// Process-local store; live sessions are lost when the process exits.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Arc<ExecutionSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Option<Arc<ExecutionSession>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    async fn put(&self, session: Arc<ExecutionSession>) -> Result<(), EngineError> {
        self.sessions.insert(session.id().clone(), session);
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Option<Arc<ExecutionSession>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    async fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSession {
    pub session_id: String,
    pub total_steps: usize,
}

pub struct SessionManager {
    loader: Arc<dyn ConfigurationLoader>,
    launcher: Arc<dyn BrowserLauncher>,
    artifacts: Arc<dyn ArtifactStore>,
    sessions: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(
        loader: Arc<dyn ConfigurationLoader>,
        launcher: Arc<dyn BrowserLauncher>,
        artifacts: Arc<dyn ArtifactStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            loader,
            launcher,
            artifacts,
            sessions,
        }
    }

    pub fn loader(&self) -> &Arc<dyn ConfigurationLoader> {
        &self.loader
    }

    /// Load the configuration, launch a browser and register the new session.
    pub async fn start(&self, configuration_id: &str) -> Result<StartedSession, EngineError> {
        let configuration = self.loader.load(configuration_id).await?.into_ordered()?;
        let page = self
            .launcher
            .launch()
            .await
            .map_err(|err| EngineError::BrowserLaunchFailed(err.to_string()))?;

        let id = SessionId::mint(&configuration.id);
        let total_steps = configuration.total_steps();
        let session = Arc::new(ExecutionSession::new(
            id.clone(),
            configuration,
            page.clone(),
            self.artifacts.clone(),
        ));
        if let Err(err) = self.sessions.put(session).await {
            warn!(session_id = %id, error = %err, "Session registration failed, closing browser");
            if let Err(close_err) = page.close().await {
                warn!(session_id = %id, error = %close_err, "Browser close failed");
            }
            return Err(err);
        }

        info!(session_id = %id, total_steps, "Session started");
        Ok(StartedSession {
            session_id: id.to_string(),
            total_steps,
        })
    }

    pub async fn lookup(&self, session_id: &str) -> Result<Arc<ExecutionSession>, EngineError> {
        let id = SessionId::parse(session_id)?;
        self.sessions
            .get(&id)
            .await
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Remove the session and close its browser. Returns `false` when nothing was registered.
    pub async fn cleanup(&self, session_id: &str) -> Result<bool, EngineError> {
        let id = SessionId::parse(session_id)?;
        let Some(session) = self.sessions.remove(&id).await else {
            debug!(session_id = %id, "Cleanup requested for unknown session");
            return Ok(false);
        };
        if let Err(err) = session.page().close().await {
            warn!(session_id = %id, error = %err, "Browser close failed during cleanup");
        }
        info!(
            session_id = %id,
            elapsed_ms = session.elapsed_ms(),
            "Session cleaned up"
        );
        Ok(true)
    }

    /// Whether `session` is still the registered session for its id.
    pub async fn is_registered(&self, session: &ExecutionSession) -> bool {
        self.sessions
            .get(session.id())
            .await
            .map(|current| std::ptr::eq(current.as_ref(), session))
            .unwrap_or(false)
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.len().await
    }
}
