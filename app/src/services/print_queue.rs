//! Print job queue and orchestration.
//!
//! A background worker takes jobs in FIFO order and runs them one at a
//! time against the shared session: connect (reusing a live link), then
//! transmit. Each submitter gets its own result through a oneshot reply.

use std::sync::Arc;

use thermal_printer::{BleBackend, PrintJob, PrinterError, TransportSession};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Reply = oneshot::Sender<Result<(), PrinterError>>;

/// A print job waiting for the worker.
#[derive(Debug)]
struct QueuedJob {
    job: PrintJob,
    /// Description for logging.
    description: String,
    reply: Reply,
}

/// Counters exposed by [`PrintQueue::status`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    pub processed: u64,
    pub failed: u64,
}

/// Handle for submitting jobs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PrintQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    status: Arc<RwLock<QueueStatus>>,
}

impl PrintQueue {
    /// Start the worker for `session`.
    ///
    /// `identity` is the persisted device identity passed to every connect.
    /// Firing `cancel` abandons the job in flight between chunks and fails
    /// everything still queued with [`PrinterError::Cancelled`].
    pub fn start<B>(
        session: Arc<TransportSession<B>>,
        identity: Option<String>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>)
    where
        B: BleBackend + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(RwLock::new(QueueStatus::default()));
        let handle = tokio::spawn(worker_loop(session, identity, rx, Arc::clone(&status), cancel));
        tracing::info!("Print queue worker started");
        (Self { tx, status }, handle)
    }

    /// Queue a job. The receiver resolves once the job has run.
    pub async fn enqueue(
        &self,
        job: PrintJob,
        description: impl Into<String>,
    ) -> anyhow::Result<oneshot::Receiver<Result<(), PrinterError>>> {
        let (reply, rx) = oneshot::channel();
        let queued = QueuedJob {
            job,
            description: description.into(),
            reply,
        };

        // Count before sending so the worker never decrements below zero.
        self.status.write().await.pending += 1;
        if self.tx.send(queued).is_err() {
            self.status.write().await.pending -= 1;
            anyhow::bail!("print queue worker has stopped");
        }
        Ok(rx)
    }

    /// Queue a job and wait for its result.
    pub async fn print(&self, job: PrintJob, description: impl Into<String>) -> anyhow::Result<()> {
        let rx = self.enqueue(job, description).await?;
        let result = rx
            .await
            .map_err(|_| anyhow::anyhow!("print queue worker dropped the job"))?;
        Ok(result?)
    }

    pub async fn status(&self) -> QueueStatus {
        *self.status.read().await
    }
}

/// Background worker loop. Processes jobs sequentially.
async fn worker_loop<B: BleBackend>(
    session: Arc<TransportSession<B>>,
    identity: Option<String>,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    status: Arc<RwLock<QueueStatus>>,
    cancel: CancellationToken,
) {
    loop {
        let queued = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(q) => q,
                None => break,
            },
        };
        status.write().await.pending -= 1;

        tracing::info!(desc = %queued.description, bytes = queued.job.len(), "Printing job");
        let result = execute_print(&session, identity.as_deref(), &queued.job, &cancel).await;

        {
            let mut st = status.write().await;
            st.processed += 1;
            match &result {
                Ok(()) => tracing::info!(desc = %queued.description, "Print job completed"),
                Err(e) => {
                    st.failed += 1;
                    tracing::error!(
                        desc = %queued.description,
                        kind = ?e.kind(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "Print job failed"
                    );
                }
            }
        }

        // The submitter may have stopped waiting.
        let _ = queued.reply.send(result);
    }

    rx.close();
    while let Ok(queued) = rx.try_recv() {
        status.write().await.pending -= 1;
        tracing::info!(desc = %queued.description, "Dropping queued job on shutdown");
        let _ = queued.reply.send(Err(PrinterError::Cancelled { sent: 0 }));
    }

    tracing::info!("Print queue worker stopped");
}

async fn execute_print<B: BleBackend>(
    session: &TransportSession<B>,
    identity: Option<&str>,
    job: &PrintJob,
    cancel: &CancellationToken,
) -> Result<(), PrinterError> {
    session.connect(identity).await?;
    session.transmit_with_cancel(job, cancel).await
}
