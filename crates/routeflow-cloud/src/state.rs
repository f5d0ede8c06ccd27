//! Local record of identity bindings
//!
//! Manages the `.routeflow/state.json` file which maps each manifest entry
//! (`kind:name`) to the identity the backend assigned when it was created or
//! imported.

use crate::error::{CloudError, Result};
use crate::resource::ResourceIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".routeflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// All bindings of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Bindings indexed by `kind:name`
    pub bindings: BTreeMap<String, Binding>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            bindings: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(kind: &str, name: &str) -> String {
        format!("{}:{}", kind, name)
    }

    /// Bindings of one resource kind, in name order
    pub fn bindings_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings.values().filter(move |b| b.kind == kind)
    }

    pub fn get(&self, kind: &str, name: &str) -> Option<&Binding> {
        self.bindings.get(&Self::key(kind, name))
    }

    pub fn identity(&self, kind: &str, name: &str) -> Option<ResourceIdentity> {
        self.get(kind, name).map(|b| b.identity.clone())
    }

    /// Add or refresh a binding. `created_at` survives a refresh.
    pub fn bind(&mut self, binding: Binding) {
        let key = Self::key(&binding.kind, &binding.name);
        let binding = match self.bindings.get(&key) {
            Some(existing) if existing.identity == binding.identity => Binding {
                created_at: existing.created_at,
                ..binding
            },
            _ => binding,
        };
        self.bindings.insert(key, binding);
        self.updated_at = Utc::now();
    }

    pub fn unbind(&mut self, kind: &str, name: &str) -> Option<Binding> {
        let result = self.bindings.remove(&Self::key(kind, name));
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }
}

/// Manifest entry bound to a remote identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub kind: String,
    pub name: String,
    pub identity: ResourceIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Binding {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        identity: impl Into<ResourceIdentity>,
    ) -> Self {
        let now = Utc::now();
        Self {
            kind: kind.into(),
            name: name.into(),
            identity: identity.into(),
            crn: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_crn(mut self, crn: Option<String>) -> Self {
        self.crn = crn;
        self
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state, empty when no state file exists yet
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} bindings", state.bindings.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} bindings", state.bindings.len());
        Ok(())
    }

    /// Acquire a lock for exclusive access
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // locks older than an hour are stale
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.bind(
            Binding::new("target", "audit-cos", "f7dc01e4-3bf3-4f9a-b1b4-1ad2b7cbd4aa")
                .with_crn(Some("crn:v1:bluemix:public:atracker:us-south:a/ACCT::target:f7dc".to_string())),
        );
        state.bind(Binding::new("route", "all-regions", "c3a7"));

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.bindings.len(), 2);
        assert_eq!(
            loaded.identity("target", "audit-cos").unwrap().as_str(),
            "f7dc01e4-3bf3-4f9a-b1b4-1ad2b7cbd4aa"
        );
        assert_eq!(loaded.bindings_of("route").count(), 1);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.bindings.is_empty());
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        manager.save(&GlobalState::new()).await.unwrap();

        assert!(temp_dir.path().join(".routeflow/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_newer_state_version_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        assert!(matches!(
            manager.load().await,
            Err(CloudError::StateError(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        manager.acquire_lock().await.unwrap();
    }

    #[test]
    fn test_rebind_keeps_created_at() {
        let mut state = GlobalState::new();
        let first = Binding::new("target", "a", "id-1");
        let created_at = first.created_at;
        state.bind(first);
        state.bind(Binding::new("target", "a", "id-1"));
        assert_eq!(state.get("target", "a").unwrap().created_at, created_at);

        assert!(state.unbind("target", "a").is_some());
        assert!(state.unbind("target", "a").is_none());
    }
}
