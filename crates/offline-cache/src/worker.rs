//! The request-intercepting worker: install, activate, fetch and message handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::try_join_all;
use offline_core::{CacheStatus, Request, Response, WorkerConfig, WorkerPhase};
use offline_fetch::Fetcher;
use offline_observability::{CacheEvent, CacheMetrics};

use crate::classify::{classify, Route};
use crate::error::{CacheError, CacheResult};
use crate::message::ControlMessage;
use crate::partition::{PartitionNames, Purpose};
use crate::storage::CacheStorage;
use crate::strategy::{add_all, cache_first, network_first};

/// What the worker did with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; the request goes to the network as if no worker existed.
    Passthrough,
    /// Answered by a strategy.
    Respond {
        response: Response,
        status: CacheStatus,
    },
}

impl FetchOutcome {
    /// The response, if the worker answered.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Passthrough => None,
            Self::Respond { response, .. } => Some(response),
        }
    }
}

/// One version of the cache router.
///
/// `S` is the cache storage shared by every worker version on the origin;
/// `F` is the network.
pub struct ServiceWorker<S, F> {
    config: WorkerConfig,
    names: PartitionNames,
    storage: S,
    fetcher: F,
    metrics: Arc<CacheMetrics>,
    phase: Mutex<WorkerPhase>,
    skip_waiting_on_install: bool,
    skip_waiting: AtomicBool,
    controls_clients: AtomicBool,
}

impl<S, F> ServiceWorker<S, F>
where
    S: CacheStorage,
    F: Fetcher,
{
    /// Create a worker in the `Parsed` phase.
    pub fn new(config: WorkerConfig, storage: S, fetcher: F) -> Self {
        let names = PartitionNames::from_config(&config);
        Self {
            config,
            names,
            storage,
            fetcher,
            metrics: Arc::new(CacheMetrics::new()),
            phase: Mutex::new(WorkerPhase::Parsed),
            skip_waiting_on_install: true,
            skip_waiting: AtomicBool::new(false),
            controls_clients: AtomicBool::new(false),
        }
    }

    /// Share a metrics collector across worker versions.
    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether a successful install requests immediate activation (default true).
    pub fn with_skip_waiting_on_install(mut self, enabled: bool) -> Self {
        self.skip_waiting_on_install = enabled;
        self
    }

    /// Resume a worker whose lifecycle already progressed in an earlier run.
    pub fn with_phase(self, phase: WorkerPhase) -> Self {
        self.set_phase(phase);
        if phase == WorkerPhase::Activated {
            self.controls_clients.store(true, Ordering::SeqCst);
        }
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> WorkerPhase {
        *lock(&self.phase)
    }

    /// Whether this worker asked to activate without waiting.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether this worker has claimed open pages.
    pub fn controls_clients(&self) -> bool {
        self.controls_clients.load(Ordering::SeqCst)
    }

    /// Retire this worker; it never handles fetches again.
    pub fn mark_redundant(&self) {
        self.set_phase(WorkerPhase::Redundant);
        self.controls_clients.store(false, Ordering::SeqCst);
    }

    /// Pre-populate the static shell partition from the manifest.
    ///
    /// Every manifest URL must answer 2xx or nothing is written and the
    /// worker becomes redundant. Returns the number of entries stored.
    pub async fn install(&self) -> CacheResult<usize> {
        self.transition("install", WorkerPhase::can_install, WorkerPhase::Installing)?;
        tracing::info!(version = %self.config.version, "installing worker");

        match self.precache_shell().await {
            Ok(count) => {
                self.set_phase(WorkerPhase::Installed);
                if self.skip_waiting_on_install {
                    self.skip_waiting.store(true, Ordering::SeqCst);
                }
                tracing::info!(
                    version = %self.config.version,
                    partition = self.names.name(Purpose::StaticShell),
                    entries = count,
                    "worker installed"
                );
                Ok(count)
            }
            Err(e) => {
                self.set_phase(WorkerPhase::Redundant);
                tracing::error!(version = %self.config.version, error = %e, "install failed");
                Err(match e {
                    CacheError::InstallFailed(_) => e,
                    other => CacheError::InstallFailed(other.to_string()),
                })
            }
        }
    }

    async fn precache_shell(&self) -> CacheResult<usize> {
        let requests = self
            .config
            .precache
            .iter()
            .map(|url| Request::resolve(&self.config.origin, url))
            .collect::<Result<Vec<_>, _>>()?;
        add_all(
            &self.storage,
            &self.fetcher,
            self.names.name(Purpose::StaticShell),
            &requests,
        )
        .await
    }

    /// Delete partitions left by other versions, then claim open pages.
    ///
    /// Returns the deleted partition names.
    pub async fn activate(&self) -> CacheResult<Vec<String>> {
        self.transition("activate", WorkerPhase::can_activate, WorkerPhase::Activating)?;
        tracing::info!(version = %self.config.version, "activating worker");

        let stale: Vec<String> = match self.storage.keys().await {
            Ok(keys) => keys.into_iter().filter(|n| self.names.is_stale(n)).collect(),
            Err(e) => {
                self.set_phase(WorkerPhase::Installed);
                return Err(e);
            }
        };

        if let Err(e) = try_join_all(stale.iter().map(|name| self.storage.delete(name))).await {
            self.set_phase(WorkerPhase::Installed);
            return Err(e);
        }
        for name in &stale {
            tracing::info!(partition = %name, "deleted stale partition");
        }

        self.set_phase(WorkerPhase::Activated);
        self.controls_clients.store(true, Ordering::SeqCst);
        tracing::info!(version = %self.config.version, deleted = stale.len(), "worker activated");
        Ok(stale)
    }

    /// Route one request through the matching strategy.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        let started = Instant::now();

        let route = if self.phase().handles_fetches() {
            classify(request, &self.config.origin)
        } else {
            Route::Passthrough
        };
        let Some(purpose) = route.purpose() else {
            self.metrics.record(CacheStatus::Bypass);
            tracing::trace!(url = %request.url, "not intercepted");
            return FetchOutcome::Passthrough;
        };

        let partition = self.names.name(purpose);
        let (response, status) = match route {
            Route::Image => {
                cache_first(&self.storage, &self.fetcher, request, partition, &self.metrics).await
            }
            _ => network_first(&self.storage, &self.fetcher, request, partition, &self.metrics).await,
        };

        self.metrics.record(status);
        CacheEvent::new(request, Some(partition), status, response.status, started.elapsed()).emit();
        FetchOutcome::Respond { response, status }
    }

    /// Handle a control message from page code.
    pub async fn handle_message(&self, message: ControlMessage) -> CacheResult<()> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(version = %self.config.version, "skip waiting requested");
            }
            ControlMessage::ClearCache => {
                self.clear_partitions().await?;
            }
            ControlMessage::Unknown => tracing::debug!("ignoring unknown control message"),
        }
        Ok(())
    }

    /// Delete every partition in storage. Returns the deleted names.
    pub async fn clear_partitions(&self) -> CacheResult<Vec<String>> {
        let names = self.storage.keys().await?;
        try_join_all(names.iter().map(|name| self.storage.delete(name))).await?;
        tracing::info!(deleted = names.len(), "cleared all partitions");
        Ok(names)
    }

    fn transition(
        &self,
        action: &'static str,
        allowed: fn(&WorkerPhase) -> bool,
        next: WorkerPhase,
    ) -> CacheResult<()> {
        let mut phase = lock(&self.phase);
        if !allowed(&*phase) {
            return Err(CacheError::InvalidPhase {
                action,
                phase: *phase,
            });
        }
        *phase = next;
        Ok(())
    }

    fn set_phase(&self, next: WorkerPhase) {
        *lock(&self.phase) = next;
    }
}

impl<S, F> std::fmt::Debug for ServiceWorker<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("version", &self.config.version)
            .field("phase", &*lock(&self.phase))
            .field("skip_waiting", &self.skip_waiting.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
