//! Worker registration and the update flow between versions.

use std::sync::Arc;

use async_trait::async_trait;
use offline_core::{CacheStatus, Request, Response};
use offline_fetch::{FetchError, Fetcher};
use tokio::sync::Mutex;

use crate::error::CacheResult;
use crate::message::ControlMessage;
use crate::storage::CacheStorage;
use crate::worker::{FetchOutcome, ServiceWorker};

/// Message port from a page to whichever worker controls it.
#[async_trait]
pub trait WorkerController: Send + Sync {
    /// Whether a worker currently controls the page.
    async fn has_controller(&self) -> bool;

    /// Deliver a control message.
    async fn post_message(&self, message: ControlMessage) -> CacheResult<()>;
}

#[async_trait]
impl<T: WorkerController + ?Sized> WorkerController for Arc<T> {
    async fn has_controller(&self) -> bool {
        (**self).has_controller().await
    }

    async fn post_message(&self, message: ControlMessage) -> CacheResult<()> {
        (**self).post_message(message).await
    }
}

/// Result of registering a new worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Installed and activated; it now controls the page.
    Activated,
    /// Installed; waiting for the current worker to be released.
    Waiting,
}

struct Slots<S, F> {
    active: Option<Arc<ServiceWorker<S, F>>>,
    waiting: Option<Arc<ServiceWorker<S, F>>>,
}

/// Tracks the active and waiting worker versions for one origin.
pub struct Registration<S, F> {
    network: F,
    slots: Mutex<Slots<S, F>>,
}

impl<S, F> Registration<S, F>
where
    S: CacheStorage,
    F: Fetcher,
{
    /// An empty registration. `network` serves requests no worker handles.
    pub fn new(network: F) -> Self {
        Self {
            network,
            slots: Mutex::new(Slots {
                active: None,
                waiting: None,
            }),
        }
    }

    /// A registration with an already-activated worker in control.
    pub fn with_active(network: F, worker: ServiceWorker<S, F>) -> Self {
        Self {
            network,
            slots: Mutex::new(Slots {
                active: Some(Arc::new(worker)),
                waiting: None,
            }),
        }
    }

    /// Resume an installed worker that is waiting to take over.
    pub fn with_waiting(mut self, worker: ServiceWorker<S, F>) -> Self {
        self.slots.get_mut().waiting = Some(Arc::new(worker));
        self
    }

    /// The worker currently in control.
    pub async fn active(&self) -> Option<Arc<ServiceWorker<S, F>>> {
        self.slots.lock().await.active.clone()
    }

    /// The installed worker waiting to take over.
    pub async fn waiting(&self) -> Option<Arc<ServiceWorker<S, F>>> {
        self.slots.lock().await.waiting.clone()
    }

    /// Whether a new version is installed and waiting.
    pub async fn update_available(&self) -> bool {
        self.slots.lock().await.waiting.is_some()
    }

    /// Install a new worker version and activate it if allowed.
    ///
    /// On install failure the previous worker keeps control.
    pub async fn register(&self, worker: ServiceWorker<S, F>) -> CacheResult<RegisterOutcome> {
        let worker = Arc::new(worker);
        worker.install().await?;

        let mut slots = self.slots.lock().await;
        if slots.active.is_none() || worker.skip_waiting_requested() {
            promote(&mut *slots, worker).await?;
            return Ok(RegisterOutcome::Activated);
        }

        if let Some(previous) = slots.waiting.replace(worker) {
            previous.mark_redundant();
        }
        tracing::info!("new worker version waiting");
        Ok(RegisterOutcome::Waiting)
    }

    /// Send a message to the waiting worker, or the active one if none waits.
    ///
    /// A waiting worker that has been told to skip waiting is activated.
    pub async fn post_message(&self, message: ControlMessage) -> CacheResult<()> {
        let mut slots = self.slots.lock().await;
        let Some(target) = slots.waiting.clone().or_else(|| slots.active.clone()) else {
            tracing::debug!("no worker to receive message");
            return Ok(());
        };
        target.handle_message(message).await?;

        if let Some(waiting) = slots.waiting.take() {
            if waiting.skip_waiting_requested() {
                promote(&mut *slots, waiting).await?;
            } else {
                slots.waiting = Some(waiting);
            }
        }
        Ok(())
    }

    /// Route a page request through the controlling worker, or the network.
    pub async fn fetch(&self, request: &Request) -> Result<(Response, CacheStatus), FetchError> {
        if let Some(worker) = self.active().await {
            if let FetchOutcome::Respond { response, status } = worker.handle_fetch(request).await {
                return Ok((response, status));
            }
        }
        let response = self.network.fetch(request).await?;
        Ok((response, CacheStatus::Bypass))
    }
}

async fn promote<S, F>(
    slots: &mut Slots<S, F>,
    worker: Arc<ServiceWorker<S, F>>,
) -> CacheResult<()>
where
    S: CacheStorage,
    F: Fetcher,
{
    if let Err(e) = worker.activate().await {
        // Keep it waiting so a later message can retry.
        slots.waiting = Some(worker);
        return Err(e);
    }
    if let Some(previous) = slots.active.replace(worker) {
        previous.mark_redundant();
    }
    if let Some(stale) = slots.waiting.take() {
        stale.mark_redundant();
    }
    Ok(())
}

#[async_trait]
impl<S, F> WorkerController for Registration<S, F>
where
    S: CacheStorage,
    F: Fetcher,
{
    async fn has_controller(&self) -> bool {
        self.active().await.is_some()
    }

    async fn post_message(&self, message: ControlMessage) -> CacheResult<()> {
        Registration::post_message(self, message).await
    }
}

impl<S, F> std::fmt::Debug for Registration<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}
