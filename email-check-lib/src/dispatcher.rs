//! Bulk validation worker pool.
//!
//! A batch is split across a fixed number of workers by round-robin position:
//! worker `k` owns addresses `k, k + n, k + 2n, ...`. Each worker walks its
//! slice in order, taking a rate-limiter token before every provider call.
//! Workers keep their outcomes locally and hand them back on join, so the
//! rate limiter is the only state they share.

use crate::error::EmailCheckError;
use crate::protocols::ValidationTransport;
use crate::rate_limiter::RateLimiter;
use crate::types::{
    BatchJob, BatchReport, ItemOutcome, ProviderErrorPolicy, ValidationRequest, ValidationResult,
};
use crate::utils::validate_email;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Split positions `0..len` across `workers` by round-robin.
///
/// Every position lands in exactly one slot; slots beyond `len` are empty.
pub fn partition(len: usize, workers: usize) -> Vec<Vec<usize>> {
    let workers = workers.max(1);
    (0..workers)
        .map(|k| (k..len).step_by(workers).collect())
        .collect()
}

/// The acquire-then-call sequence shared by the facade and every worker.
#[derive(Clone)]
pub(crate) struct ValidationPipeline {
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) transport: Arc<dyn ValidationTransport>,
    pub(crate) timeout: Duration,
    pub(crate) policy: ProviderErrorPolicy,
}

impl ValidationPipeline {
    /// Take one token, then issue one provider call.
    ///
    /// Cancellation is observed both while waiting for the token and while
    /// the request is in flight.
    pub(crate) async fn run(
        &self,
        request: &ValidationRequest,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult, EmailCheckError> {
        self.limiter.acquire(cancel).await?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(EmailCheckError::cancelled("waiting for the provider"));
            }
            result = self.transport.validate(request, self.timeout) => result,
        };

        apply_policy(self.policy, result)
    }

    /// Validate the raw address from a batch, input checks included.
    pub(crate) async fn run_address(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult, EmailCheckError> {
        validate_email(email)?;
        let request = ValidationRequest::new(email)?;
        self.run(&request, cancel).await
    }
}

/// Turn a provider-embedded error into a plain result when the policy allows it.
pub(crate) fn apply_policy(
    policy: ProviderErrorPolicy,
    result: Result<ValidationResult, EmailCheckError>,
) -> Result<ValidationResult, EmailCheckError> {
    match (policy, result) {
        (ProviderErrorPolicy::Accept, Err(EmailCheckError::ProviderReportedError { result, .. })) => {
            Ok(result)
        }
        (_, result) => result,
    }
}

/// Fan-out dispatcher for bulk validation.
#[derive(Clone)]
pub struct BulkDispatcher {
    pipeline: ValidationPipeline,
}

impl BulkDispatcher {
    /// Create a dispatcher sharing `limiter` with any other caller.
    pub fn new(
        limiter: Arc<RateLimiter>,
        transport: Arc<dyn ValidationTransport>,
        timeout: Duration,
        policy: ProviderErrorPolicy,
    ) -> Self {
        Self {
            pipeline: ValidationPipeline {
                limiter,
                transport,
                timeout,
                policy,
            },
        }
    }

    pub(crate) fn from_pipeline(pipeline: ValidationPipeline) -> Self {
        Self { pipeline }
    }

    /// Validate every address in `job` and return once all workers are done.
    ///
    /// The report holds one outcome per input address, in input order.
    /// Failures are recorded per address and never stop sibling work.
    pub async fn dispatch(&self, job: BatchJob, cancel: &CancellationToken) -> BatchReport {
        self.run(job, cancel, None).await
    }

    /// Like `dispatch`, but also yields each outcome as soon as it is recorded.
    ///
    /// The channel closes once every worker has finished; the join handle
    /// resolves to the full report.
    pub fn dispatch_streaming(
        &self,
        job: BatchJob,
        cancel: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<ItemOutcome>, JoinHandle<BatchReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run(job, &cancel, Some(tx)).await });
        (rx, handle)
    }

    async fn run(
        &self,
        job: BatchJob,
        cancel: &CancellationToken,
        sink: Option<mpsc::UnboundedSender<ItemOutcome>>,
    ) -> BatchReport {
        let start_time = Instant::now();
        let workers = job.effective_workers();

        if workers == 0 {
            return BatchReport::default();
        }

        let total = job.addresses.len();
        info!(addresses = total, workers, "Starting bulk validation");

        // Workers are detached tasks; if this future is dropped the guard
        // cancels them so no further provider calls go out.
        let worker_cancel = cancel.child_token();
        let _abandon_guard = worker_cancel.clone().drop_guard();

        let assignments = partition(total, workers);
        let mut handles = Vec::with_capacity(workers);

        for (worker_id, positions) in assignments.iter().enumerate() {
            let items: Vec<(usize, String)> = positions
                .iter()
                .map(|&i| (i, job.addresses[i].clone()))
                .collect();
            let worker = Worker {
                worker_id,
                items,
                pipeline: self.pipeline.clone(),
                cancel: worker_cancel.clone(),
                sink: sink.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }
        drop(sink);

        let mut slots: Vec<Option<ItemOutcome>> = vec![None; total];
        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        let index = outcome.index;
                        slots[index] = Some(outcome);
                    }
                }
                Err(e) => {
                    warn!(worker_id, error = %e, "Worker terminated abnormally");
                }
            }
        }

        let outcomes: Vec<ItemOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| ItemOutcome {
                    index,
                    email: job.addresses[index].clone(),
                    outcome: Err(EmailCheckError::internal("worker terminated before completion")),
                    duration: None,
                })
            })
            .collect();

        let report = BatchReport {
            outcomes,
            workers,
            duration: start_time.elapsed(),
        };

        info!(
            addresses = total,
            succeeded = report.succeeded(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            duration_ms = report.duration.as_millis() as u64,
            "Completed bulk validation"
        );

        report
    }
}

/// A single worker owning a disjoint slice of the batch.
struct Worker {
    worker_id: usize,
    items: Vec<(usize, String)>,
    pipeline: ValidationPipeline,
    cancel: CancellationToken,
    sink: Option<mpsc::UnboundedSender<ItemOutcome>>,
}

impl Worker {
    async fn run(self) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(self.items.len());

        for (index, email) in self.items {
            let started = Instant::now();

            let outcome = if self.cancel.is_cancelled() {
                Err(EmailCheckError::cancelled("batch was cancelled"))
            } else {
                self.pipeline.run_address(&email, &self.cancel).await
            };

            match &outcome {
                Ok(result) => debug!(worker_id = self.worker_id, email = %email, status = %result.status, "validated"),
                Err(e) => debug!(worker_id = self.worker_id, email = %email, error = %e, "validation failed"),
            }

            let item = ItemOutcome {
                index,
                email,
                outcome,
                duration: Some(started.elapsed()),
            };

            if let Some(sink) = &self.sink {
                // receiver may have gone away; the report still has everything
                let _ = sink.send(item.clone());
            }
            outcomes.push(item);
        }

        outcomes
    }
}
