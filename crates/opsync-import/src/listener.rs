//! Sync job listener
//!
//! Background worker subscribing to the job queue and executing import jobs.
//! Retryable failures (lock contention, transient network errors) re-run the
//! job with linear backoff up to a bounded attempt count; everything else is
//! logged and dropped so one record's problem never stalls the queue.

use std::sync::Arc;

use opsync_core::{Job, JobQueue, SyncResult, WorkerSettings};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::SyncService;

pub struct SyncJobListener {
    sync_service: Arc<SyncService>,
    queue: Arc<dyn JobQueue>,
    settings: WorkerSettings,
    running: Arc<RwLock<bool>>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl SyncJobListener {
    pub fn new(sync_service: Arc<SyncService>, queue: Arc<dyn JobQueue>) -> Self {
        let settings = sync_service.settings().clone();
        Self {
            sync_service,
            queue,
            settings,
            running: Arc::new(RwLock::new(false)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start processing jobs from the queue.
    pub async fn start(&self) -> SyncResult<()> {
        let mut running = self.running.write().await;
        if *running {
            info!("Sync job listener already running");
            return Ok(());
        }
        *running = true;
        drop(running);

        info!("Starting sync job listener");

        let mut receiver = self.queue.subscribe();
        let sync_service = Arc::clone(&self.sync_service);
        let settings = self.settings.clone();
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            while *running.read().await {
                match receiver.recv().await {
                    Ok(job) => {
                        Self::execute_with_retry(&sync_service, &settings, job).await;
                    }
                    Err(e) => {
                        error!("Failed to receive job from queue: {}", e);
                        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    }
                }
            }
            info!("Sync job listener task stopped");
        });

        *self.task_handle.write().await = Some(handle);
        Ok(())
    }

    /// Stop the listener and wait for the worker task to finish.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        drop(running);

        if let Some(handle) = self.task_handle.write().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        info!("Stopped sync job listener");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run one job to completion, re-running retryable failures with
    /// backoff. The in-process retry loop is the job layer's retry policy;
    /// the import call itself never spins on contention.
    async fn execute_with_retry(service: &SyncService, settings: &WorkerSettings, job: Job) {
        let max_attempts = settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match Self::process_job(service, &job).await {
                Ok(Some(outcome)) => {
                    info!("Job {} finished: {}", job, outcome);
                    return;
                }
                Ok(None) => {
                    debug!("Job {} finished", job);
                    return;
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Job {} failed with retryable error (attempt {}/{}): {}",
                        job, attempt, max_attempts, e
                    );
                    let backoff = settings.retry_backoff_ms * attempt as u64;
                    tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!("Job {} failed: {}", job, e);
                    return;
                }
            }
        }
    }

    /// Execute one job. `Ok(Some(..))` carries a human-readable outcome.
    async fn process_job(service: &SyncService, job: &Job) -> SyncResult<Option<String>> {
        match job {
            Job::ImportRecord(data) => {
                let outcome = service.import_record_job(data).await?;
                Ok(Some(outcome.to_string()))
            }
            Job::ImportProjects(data) => {
                service.import_projects(data.backend_id, data.delay).await?;
                Ok(None)
            }
            Job::ImportWorkPackages(data) => {
                let count = service
                    .import_project_work_packages(data.backend_id, data.delay)
                    .await?;
                Ok(Some(format!("{} work packages dispatched", count)))
            }
            Job::ImportTimeEntries(data) => {
                let count = service
                    .import_project_time_entries(data.backend_id, data.delay)
                    .await?;
                Ok(Some(format!("{} time entries dispatched", count)))
            }
            Job::ImportActivities(data) => {
                let count = service
                    .import_activities(data.backend_id, &data.work_package_external_id)
                    .await?;
                Ok(Some(format!("{} activities dispatched", count)))
            }
            Job::ImportAvatar(data) => {
                let outcome = service.import_avatar(data).await?;
                Ok(Some(outcome))
            }
            // Domain events emitted on local writes; other subscribers own them
            Job::UserCreated(_) | Job::TaskChanged(_) => Ok(None),
        }
    }
}
