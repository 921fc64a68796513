//! Persisted semesters and the active-semester selection.
//!
//! Three tiers, consulted in this order:
//! - in-memory cache: authoritative once populated in this process;
//! - local key-value store: synchronous, read on start-up before the
//!   external store answers, written through on every save;
//! - external store (`DataBridge`): the eventual source of truth, optional.
//!
//! External failures degrade to local-only operation and are never
//! surfaced to callers except through `PendingWrite::wait`.

use crate::bridge::{BridgeError, BridgeResult, DataBridge};
use crate::config::Config;
use crate::local::{LocalStore, SqliteLocalStore};
use crate::model::{new_id, Course, Semester, DEFAULT_SEMESTER_NAME};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default, deserialize_with = "crate::model::lenient_list")]
    pub semesters: Vec<Semester>,
    #[serde(default)]
    pub active_semester_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageKeys {
    pub semesters: String,
    pub active_semester: String,
    /// Pre-semester format: a bare JSON array of courses.
    pub legacy_courses: String,
    pub api_key: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            semesters: format!("{namespace}:semesters:v1"),
            active_semester: format!("{namespace}:active-semester:v1"),
            legacy_courses: format!("{namespace}:v1"),
            api_key: format!("{namespace}:groq-api-key"),
        }
    }
}

/// Handle to a detached external write.
///
/// Dropping it leaves the write running in the background; awaiting
/// `wait` reports how it ended.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<BridgeResult<()>>,
}

impl PendingWrite {
    pub async fn wait(self) -> BridgeResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(BridgeError::Task(e.to_string())),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

pub struct SemesterStore {
    keys: StorageKeys,
    cache: Mutex<Option<StoredState>>,
    local: Mutex<Box<dyn LocalStore>>,
    bridge: Arc<dyn DataBridge>,
    runtime: Handle,
}

impl SemesterStore {
    pub fn new(
        namespace: &str,
        local: Box<dyn LocalStore>,
        bridge: Arc<dyn DataBridge>,
        runtime: Handle,
    ) -> Self {
        Self {
            keys: StorageKeys::new(namespace),
            cache: Mutex::new(None),
            local: Mutex::new(local),
            bridge,
            runtime,
        }
    }

    /// Local tier in `<data_dir>/local.sqlite3`; writes are spawned on the
    /// current tokio runtime.
    pub fn open(config: &Config, bridge: Arc<dyn DataBridge>) -> anyhow::Result<Self> {
        let local = SqliteLocalStore::open(&config.local_db_path())?;
        let runtime = Handle::try_current()?;
        Ok(Self::new(&config.namespace, Box::new(local), bridge, runtime))
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    fn cache(&self) -> MutexGuard<'_, Option<StoredState>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn local(&self) -> MutexGuard<'_, Box<dyn LocalStore>> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Empty strings count as absent.
    fn local_get(&self, key: &str) -> Option<String> {
        match self.local().get(key) {
            Ok(v) => v.filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::warn!(key, error = %e, "local store read failed");
                None
            }
        }
    }

    fn local_set(&self, key: &str, value: &str) {
        if let Err(e) = self.local().set(key, value) {
            tracing::warn!(key, error = %e, "local store write failed");
        }
    }

    fn read_local_semesters(&self) -> Vec<Semester> {
        if let Some(raw) = self.local_get(&self.keys.semesters) {
            return match serde_json::from_str::<Vec<Semester>>(&raw) {
                Ok(semesters) => semesters,
                Err(e) => {
                    tracing::debug!(error = %e, "stored semesters unreadable; treating as empty");
                    Vec::new()
                }
            };
        }

        let Some(raw) = self.local_get(&self.keys.legacy_courses) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Course>>(&raw) {
            Ok(courses) if !courses.is_empty() => {
                tracing::info!(courses = courses.len(), "migrating legacy course list");
                vec![Semester {
                    id: new_id(),
                    name: DEFAULT_SEMESTER_NAME.to_string(),
                    courses,
                }]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!(error = %e, "legacy courses unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    /// Cache if populated, else the local tier (with legacy migration).
    /// Never touches the external store.
    pub fn load_semesters(&self) -> Vec<Semester> {
        let cached = self.cache().as_ref().map(|s| s.semesters.clone());
        cached.unwrap_or_else(|| self.read_local_semesters())
    }

    /// Updates the cache, writes the local tier, and starts the external
    /// write. The external write is not finished when this returns.
    pub fn save_semesters(&self, semesters: Vec<Semester>) -> PendingWrite {
        let snapshot = {
            let mut cache = self.cache();
            let state = cache.get_or_insert_with(StoredState::default);
            state.semesters = semesters;
            state.clone()
        };

        match serde_json::to_string(&snapshot.semesters) {
            Ok(raw) => self.local_set(&self.keys.semesters, &raw),
            Err(e) => tracing::warn!(error = %e, "could not serialize semesters"),
        }
        self.spawn_external_write(snapshot)
    }

    pub fn get_active_semester_id(&self) -> Option<String> {
        let cached = self.cache().as_ref().map(|s| s.active_semester_id.clone());
        match cached {
            Some(id) => id,
            None => self.local_get(&self.keys.active_semester),
        }
    }

    pub fn set_active_semester_id(&self, id: &str) -> PendingWrite {
        let snapshot = {
            let mut cache = self.cache();
            let state = cache.get_or_insert_with(StoredState::default);
            state.active_semester_id = Some(id.to_string());
            state.clone()
        };

        self.local_set(&self.keys.active_semester, id);
        self.spawn_external_write(snapshot)
    }

    /// Populates the cache from the external store. When that store has no
    /// semesters but the local tier does, the local data is adopted and
    /// written back to the external store once.
    pub async fn initialize_store(&self) -> StoredState {
        let mut state = self.load_external().await;

        if state.semesters.is_empty() {
            let local_semesters = self.read_local_semesters();
            if !local_semesters.is_empty() {
                tracing::info!(
                    semesters = local_semesters.len(),
                    "external store empty; adopting local data"
                );
                state.semesters = local_semesters;
                state.active_semester_id = self.local_get(&self.keys.active_semester);
                if let Err(e) = write_external(self.bridge.as_ref(), &state).await {
                    log_write_failure(&e);
                }
            }
        }

        *self.cache() = Some(state.clone());
        state
    }

    /// Where data is persisted: the external store's location, else the
    /// local tier's.
    pub async fn get_data_location(&self) -> String {
        match self.bridge.data_location().await {
            Ok(location) => location,
            Err(e) => {
                tracing::debug!(error = %e, "external location unavailable");
                self.local().location()
            }
        }
    }

    pub fn get_api_key(&self) -> Option<String> {
        self.local_get(&self.keys.api_key)
    }

    pub fn set_api_key(&self, key: &str) {
        self.local_set(&self.keys.api_key, key.trim());
    }

    async fn load_external(&self) -> StoredState {
        let raw = match self.bridge.load_data().await {
            Ok(raw) => raw,
            Err(BridgeError::Unavailable) => return StoredState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "external store load failed; using local data");
                return StoredState::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "external data unreadable; treating as empty");
            StoredState::default()
        })
    }

    fn spawn_external_write(&self, state: StoredState) -> PendingWrite {
        let bridge = Arc::clone(&self.bridge);
        let handle = self.runtime.spawn(async move {
            let result = write_external(bridge.as_ref(), &state).await;
            if let Err(e) = &result {
                log_write_failure(e);
            }
            result
        });
        PendingWrite { handle }
    }
}

async fn write_external(bridge: &dyn DataBridge, state: &StoredState) -> BridgeResult<()> {
    let data = serde_json::to_string_pretty(state)?;
    bridge.save_data(data).await
}

fn log_write_failure(e: &BridgeError) {
    match e {
        BridgeError::Unavailable => tracing::debug!("no external store; kept local copy only"),
        _ => tracing::error!(error = %e, "failed to save data to external store"),
    }
}
