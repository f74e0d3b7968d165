//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use offline_cache::{DiskCacheStorage, Registration, ServiceWorker};
use offline_core::{WorkerConfig, WorkerPhase};
use offline_fetch::HttpFetcher;
use offline_sdk::{CacheManager, CacheStorageEstimator};
use offline_store::{ExpiryStore, FileStorage};

use crate::config::{CliConfig, CONFIG_NAMES};
use crate::output::Output;
use crate::state::WorkerState;

pub type Storage = Arc<DiskCacheStorage>;
pub type Network = Arc<HttpFetcher>;
pub type Worker = ServiceWorker<Storage, Network>;

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (CliConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            match find_config(&cwd) {
                Some(path) => {
                    let config = CliConfig::load(&path.to_string_lossy())?;
                    (config, Some(path))
                }
                None => (CliConfig::default(), None),
            }
        };
        config.validate()?;

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Root of all persisted data.
    pub fn storage_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.storage.dir)
    }

    pub fn state_path(&self) -> PathBuf {
        self.storage_dir().join("worker.json")
    }

    pub fn load_state(&self) -> Result<WorkerState> {
        WorkerState::load(&self.state_path())
    }

    pub fn save_state(&self, state: &WorkerState) -> Result<()> {
        state.save(&self.state_path())
    }

    /// Cache partitions on disk.
    pub async fn cache_storage(&self) -> Result<Storage> {
        let dir = self.storage_dir().join("cache");
        let storage = DiskCacheStorage::open_dir(&dir)
            .await
            .with_context(|| format!("Failed to open cache storage at {}", dir.display()))?;
        Ok(Arc::new(storage))
    }

    pub fn network(&self) -> Result<Network> {
        let fetcher = HttpFetcher::new(self.config.network.timeouts())
            .context("Failed to build HTTP client")?;
        Ok(Arc::new(fetcher))
    }

    pub fn store_path(&self) -> PathBuf {
        self.storage_dir().join("store.json")
    }

    /// Keyed expiry store backed by a JSON file. With `sweep`, expired
    /// entries are reaped before the store is handed out.
    pub async fn store(&self, sweep: bool) -> Result<ExpiryStore<FileStorage>> {
        let path = self.store_path();
        let storage = FileStorage::open(&path)
            .await
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let store = ExpiryStore::new(self.config.store.clone(), storage);
        if sweep {
            let report = store.cleanup().await;
            self.output
                .debug(&format!("Startup cleanup removed {} entries", report.removed));
        }
        Ok(store)
    }

    /// Worker configuration for a version, other settings from the config file.
    pub fn worker_config(&self, version: &str) -> WorkerConfig {
        WorkerConfig {
            version: version.to_string(),
            ..self.config.worker.clone()
        }
    }

    /// A fresh worker for the configured version.
    pub fn new_worker(&self, storage: &Storage, network: &Network) -> Worker {
        ServiceWorker::new(self.config.worker.clone(), storage.clone(), network.clone())
    }

    fn resume_worker(
        &self,
        version: &str,
        phase: WorkerPhase,
        storage: &Storage,
        network: &Network,
    ) -> Worker {
        ServiceWorker::new(self.worker_config(version), storage.clone(), network.clone())
            .with_phase(phase)
    }

    /// Rebuild the registration recorded by earlier runs.
    pub fn registration(
        &self,
        state: &WorkerState,
        storage: &Storage,
        network: &Network,
    ) -> Registration<Storage, Network> {
        let mut registration = match &state.active {
            Some(active) => Registration::with_active(
                network.clone(),
                self.resume_worker(&active.version, active.phase, storage, network),
            ),
            None => Registration::new(network.clone()),
        };
        if let Some(waiting) = &state.waiting {
            registration = registration.with_waiting(self.resume_worker(
                &waiting.version,
                waiting.phase,
                storage,
                network,
            ));
        }
        registration
    }

    /// Page-side manager over the persisted store, with size estimates.
    /// With `sweep`, the manager's startup cleanup has already run.
    pub async fn manager(&self, storage: &Storage, sweep: bool) -> Result<CacheManager<FileStorage>> {
        let estimator = CacheStorageEstimator::new(storage.clone(), self.config.page.quota_bytes);
        let manager =
            CacheManager::new(self.store(false).await?).with_estimator(Arc::new(estimator));
        if sweep {
            let report = manager.start().await;
            self.output
                .debug(&format!("Startup cleanup removed {} entries", report.removed));
        }
        Ok(manager)
    }
}

/// Find the nearest config file walking up from `start`.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let config_path = current.join(name);
            if config_path.exists() {
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
