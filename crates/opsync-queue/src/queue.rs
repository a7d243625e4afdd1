use std::sync::Arc;

use opsync_core::async_trait::async_trait;
use opsync_core::{
    ImportAvatarJob, ImportProjectsJob, ImportRecordJob, Job, JobQueue, JobReceiver, QueueError,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum QueueServiceError {
    #[error("Failed to send job to queue: {details}")]
    QueueSendError { details: String, job_type: String },

    #[error("Queue channel closed")]
    QueueChannelClosed { job_type: String },

    #[error("Invalid job data: {details}")]
    InvalidJobData { details: String, job_type: String },

    #[error("Queue service error: {0}")]
    Internal(String),
}

impl<T> From<mpsc::error::SendError<T>> for QueueServiceError {
    fn from(_err: mpsc::error::SendError<T>) -> Self {
        QueueServiceError::QueueChannelClosed {
            job_type: "unknown".to_string(),
        }
    }
}

/// Point-to-point queue: each job is consumed by exactly one worker.
#[derive(Clone)]
pub struct QueueService {
    job_sender: mpsc::Sender<Job>,
}

/// Fan-out queue: every subscriber sees every job.
#[derive(Clone)]
pub struct BroadcastQueueService {
    broadcast_sender: broadcast::Sender<Job>,
}

// Wrapper for broadcast::Receiver to implement JobReceiver trait
pub struct BroadcastJobReceiver {
    receiver: broadcast::Receiver<Job>,
}

#[async_trait]
impl JobReceiver for BroadcastJobReceiver {
    async fn recv(&mut self) -> Result<Job, QueueError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => QueueError::ChannelClosed,
            broadcast::error::RecvError::Lagged(n) => {
                error!("Job receiver lagged by {} messages", n);
                QueueError::ReceiveError(format!("Receiver lagged by {} messages", n))
            }
        })
    }
}

#[async_trait]
impl JobQueue for BroadcastQueueService {
    async fn send(&self, job: Job) -> Result<(), QueueError> {
        debug!("Broadcasting job: {}", job);

        if self.broadcast_sender.receiver_count() == 0 {
            error!(
                "No subscribers listening to broadcast channel, job will be lost: {}",
                job
            );
        }

        self.broadcast_sender
            .send(job)
            .map(|_| ())
            .map_err(|e| QueueError::SendError(format!("Broadcast send failed: {}", e)))
    }

    fn subscribe(&self) -> Box<dyn JobReceiver> {
        Box::new(BroadcastJobReceiver {
            receiver: self.broadcast_sender.subscribe(),
        })
    }
}

impl QueueService {
    pub fn new(job_sender: mpsc::Sender<Job>) -> Self {
        Self { job_sender }
    }

    pub fn create_channel(buffer_size: usize) -> (QueueService, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (QueueService::new(sender), receiver)
    }
}

impl BroadcastQueueService {
    pub fn new(broadcast_sender: broadcast::Sender<Job>) -> Self {
        Self { broadcast_sender }
    }

    pub fn create_broadcast_channel(
        buffer_size: usize,
    ) -> (BroadcastQueueService, broadcast::Receiver<Job>) {
        let (sender, receiver) = broadcast::channel(buffer_size);
        (BroadcastQueueService::new(sender), receiver)
    }

    /// Create a new broadcast queue that implements the JobQueue trait
    /// Returns (queue, keep_alive_receiver) - the receiver must be kept alive!
    pub fn create_job_queue_arc_with_receiver(
        buffer_size: usize,
    ) -> (Arc<dyn JobQueue>, broadcast::Receiver<Job>) {
        let (sender, receiver) = broadcast::channel(buffer_size);
        (Arc::new(BroadcastQueueService::new(sender)), receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.broadcast_sender.subscribe()
    }
}

impl QueueService {
    pub async fn launch_record_import(
        &self,
        data: ImportRecordJob,
    ) -> Result<(), QueueServiceError> {
        info!(
            "Queueing record import for {} {} on backend {}",
            data.model, data.external_id, data.backend_id
        );
        if data.external_id.is_empty() {
            return Err(QueueServiceError::InvalidJobData {
                details: "External id cannot be empty".to_string(),
                job_type: "import_record".to_string(),
            });
        }
        self.job_sender
            .send(Job::ImportRecord(data))
            .await
            .map_err(|e| {
                error!("Failed to queue record import job: {}", e);
                QueueServiceError::QueueSendError {
                    details: e.to_string(),
                    job_type: "import_record".to_string(),
                }
            })?;
        Ok(())
    }

    pub async fn launch_project_import(
        &self,
        data: ImportProjectsJob,
    ) -> Result<(), QueueServiceError> {
        info!(
            "Queueing project batch import for backend {}",
            data.backend_id
        );
        self.job_sender
            .send(Job::ImportProjects(data))
            .await
            .map_err(|e| {
                error!("Failed to queue project batch import job: {}", e);
                QueueServiceError::QueueSendError {
                    details: e.to_string(),
                    job_type: "import_projects".to_string(),
                }
            })?;
        Ok(())
    }

    pub async fn launch_avatar_import(
        &self,
        data: ImportAvatarJob,
    ) -> Result<(), QueueServiceError> {
        info!("Queueing avatar import for user {}", data.user_id);
        if data.url.is_empty() {
            return Err(QueueServiceError::InvalidJobData {
                details: "Avatar URL cannot be empty".to_string(),
                job_type: "import_avatar".to_string(),
            });
        }
        self.job_sender
            .send(Job::ImportAvatar(data))
            .await
            .map_err(|e| {
                error!("Failed to queue avatar import job: {}", e);
                QueueServiceError::QueueSendError {
                    details: e.to_string(),
                    job_type: "import_avatar".to_string(),
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsync_core::SyncModel;
    use tokio::time::{timeout, Duration};

    fn record_job(external_id: &str) -> ImportRecordJob {
        ImportRecordJob {
            backend_id: 1,
            model: SyncModel::Task,
            external_id: external_id.to_string(),
            record: None,
            force: false,
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe_record_import_job() {
        let (queue_service, mut receiver) = QueueService::create_channel(10);

        queue_service
            .launch_record_import(record_job("1528"))
            .await
            .unwrap();

        let received_job = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("Should receive job within timeout")
            .expect("Should receive a job");

        match received_job {
            Job::ImportRecord(received_data) => {
                assert_eq!(received_data.backend_id, 1);
                assert_eq!(received_data.model, SyncModel::Task);
                assert_eq!(received_data.external_id, "1528");
            }
            _ => panic!("Expected ImportRecord job"),
        }
    }

    #[tokio::test]
    async fn test_multiple_jobs_fifo_order() {
        let (queue_service, mut receiver) = QueueService::create_channel(10);

        queue_service
            .launch_record_import(record_job("1"))
            .await
            .unwrap();
        queue_service
            .launch_project_import(ImportProjectsJob {
                backend_id: 1,
                delay: true,
            })
            .await
            .unwrap();
        queue_service
            .launch_record_import(record_job("2"))
            .await
            .unwrap();

        let job1 = receiver.recv().await.expect("Should receive first job");
        let job2 = receiver.recv().await.expect("Should receive second job");
        let job3 = receiver.recv().await.expect("Should receive third job");

        match job1 {
            Job::ImportRecord(data) => assert_eq!(data.external_id, "1"),
            _ => panic!("Expected ImportRecord job first"),
        }

        match job2 {
            Job::ImportProjects(data) => assert_eq!(data.backend_id, 1),
            _ => panic!("Expected ImportProjects job second"),
        }

        match job3 {
            Job::ImportRecord(data) => assert_eq!(data.external_id, "2"),
            _ => panic!("Expected ImportRecord job third"),
        }
    }

    #[tokio::test]
    async fn test_invalid_job_data_validation() {
        let (queue_service, _receiver) = QueueService::create_channel(10);

        let result = queue_service.launch_record_import(record_job("")).await;
        assert!(result.is_err());

        match result.unwrap_err() {
            QueueServiceError::InvalidJobData { details, job_type } => {
                assert_eq!(details, "External id cannot be empty");
                assert_eq!(job_type, "import_record");
            }
            _ => panic!("Expected InvalidJobData error"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_multiple_subscribers() {
        let (broadcast_service, _initial_receiver) =
            BroadcastQueueService::create_broadcast_channel(10);

        let mut subscriber1 = broadcast_service.subscribe();
        let mut subscriber2 = broadcast_service.subscribe();

        broadcast_service
            .send(Job::ImportAvatar(ImportAvatarJob {
                backend_id: 1,
                url: "http://openproject/avatar/1".to_string(),
                user_id: 7,
            }))
            .await
            .unwrap();

        for subscriber in [&mut subscriber1, &mut subscriber2] {
            let job = timeout(Duration::from_secs(1), subscriber.recv())
                .await
                .expect("Subscriber should receive job")
                .expect("Should receive a job");

            match job {
                Job::ImportAvatar(data) => assert_eq!(data.user_id, 7),
                _ => panic!("Expected ImportAvatar job"),
            }
        }
    }

    #[tokio::test]
    async fn test_job_queue_trait_subscribe() {
        let (queue, _keep_alive) = BroadcastQueueService::create_job_queue_arc_with_receiver(10);
        let mut receiver = queue.subscribe();

        queue
            .send(Job::ImportRecord(record_job("42")))
            .await
            .unwrap();

        let job = receiver.recv().await.unwrap();
        match job {
            Job::ImportRecord(data) => assert_eq!(data.external_id, "42"),
            _ => panic!("Expected ImportRecord job"),
        }
    }
}
