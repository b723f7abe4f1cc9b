//! Job executor.
//!
//! Consumes scan jobs from the queue under a concurrency semaphore. Every
//! job gets a single attempt: success and fail-open both ack; only a failed
//! terminal-status write parks the job on the dead-letter stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use vshare_firestore::{FirestoreClient, VideoRepository};
use vshare_queue::{EventChannel, JobQueue, SensitivityScanJob};
use vshare_sensitivity::SensitivityClient;
use vshare_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::run_sensitivity_scan;

/// Everything one scan needs, wired once at startup and shared by all job
/// tasks. The event channel is an explicit capability, not ambient state.
pub struct ScanContext {
    pub config: WorkerConfig,
    pub videos: VideoRepository,
    pub storage: StorageClient,
    pub analyzer: SensitivityClient,
    pub events: EventChannel,
}

impl ScanContext {
    /// Create a new scan context from the environment.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let firestore = FirestoreClient::from_env().await?;
        let storage = StorageClient::from_env().await?;
        let analyzer = SensitivityClient::from_env()?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let events = EventChannel::new(&redis_url)?;

        Ok(Self {
            config,
            videos: VideoRepository::new(firestore),
            storage,
            analyzer,
            events,
        })
    }
}

/// Job executor that processes scan jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting scan executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let ctx = Arc::new(ScanContext::new(self.config.clone()).await?);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs(&ctx) => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight scans to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Scan executor stopped");
        Ok(())
    }

    /// Consume and dispatch jobs from the queue.
    async fn consume_jobs(&self, ctx: &Arc<ScanContext>) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(
                &self.consumer_name,
                1000, // block for 1 second
                available.min(5),
            )
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let ctx = Arc::clone(ctx);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single scan job.
    async fn execute_job(
        ctx: Arc<ScanContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: SensitivityScanJob,
    ) {
        info!(job_id = %job.job_id, video_id = %job.video_id, "Executing scan job");

        // A presign failure takes the fail-open path inside the scan rather
        // than bouncing the job.
        let media_url = match ctx
            .storage
            .presign_get(&job.file_key, ctx.config.presign_ttl)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                error!(video_id = %job.video_id, "Failed to presign stored file: {}", e);
                None
            }
        };

        let result = run_sensitivity_scan(
            &ctx.videos,
            &ctx.analyzer,
            &ctx.events,
            &job,
            media_url,
            ctx.config.scan_timeout,
        )
        .await;

        match result {
            Ok(()) => {
                if let Err(e) = queue.ack(&message_id).await {
                    error!(job_id = %job.job_id, "Failed to ack job: {}", e);
                }
                metrics::counter!("worker_scans_total", "outcome" => "completed").increment(1);
            }
            Err(e) => {
                // Terminal-status write failed; park for operator attention
                // instead of redelivering (one attempt per upload).
                error!(job_id = %job.job_id, "Scan failed: {}", e);
                if let Err(dlq_err) = queue.dlq(&message_id, &job, &e.to_string()).await {
                    error!(job_id = %job.job_id, "Failed to move job to DLQ: {}", dlq_err);
                }
                metrics::counter!("worker_scans_total", "outcome" => "dead_lettered").increment(1);
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
