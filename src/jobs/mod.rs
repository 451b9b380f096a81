use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::db::Store;
use crate::metrics::Metrics;
use crate::models::*;
use crate::onboarding::{fail_reason, Reconciler, TaskStore};
use crate::ws::{EventType, Hub};

/// Work item for the onboarding worker. Credentials travel with the queue
/// entry only; they are never persisted.
struct QueuedTask {
    task_id: String,
    credentials: Option<Credentials>,
}

/// OnboardingService accepts onboarding requests and runs them one at a
/// time on a background worker
pub struct OnboardingService {
    store: Store,
    reconciler: Reconciler,
    ws_hub: Option<Arc<Hub>>,
    metrics: Arc<Metrics>,
    pending_tx: mpsc::Sender<QueuedTask>,
}

impl OnboardingService {
    pub async fn new(
        store: Store,
        reconciler: Reconciler,
        ws_hub: Option<Arc<Hub>>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let (pending_tx, pending_rx) = mpsc::channel(100);

        let service = Arc::new(Self {
            store,
            reconciler,
            ws_hub,
            metrics,
            pending_tx,
        });

        let worker_service = service.clone();
        tokio::spawn(async move {
            worker_service.worker(pending_rx).await;
        });

        // Re-queue tasks left pending by a previous run before accepting new ones
        service.requeue_pending_tasks().await;

        service
    }

    /// Record a pending task for `req` and queue it for the worker
    pub async fn submit(&self, req: OnboardingRequest) -> Result<OnboardingTask> {
        let id = uuid::Uuid::new_v4().to_string();
        let task = TaskStore::create_task(&self.store, &id, &req).await?;
        tracing::info!("Queued onboarding task {} for {} at site {}", task.id, task.target, task.site);
        self.broadcast(EventType::OnboardingQueued, &task).await;

        let queued = QueuedTask {
            task_id: id,
            credentials: req.credentials,
        };
        if let Err(e) = self.pending_tx.send(queued).await {
            tracing::warn!("Failed to queue onboarding task {}: {}", task.id, e);
        }
        Ok(task)
    }

    /// Tasks still pending from a previous run go back on the queue with
    /// the default credentials
    async fn requeue_pending_tasks(&self) {
        match self.store.list_pending_tasks().await {
            Ok(tasks) => {
                for task in &tasks {
                    tracing::info!("Re-queuing pending onboarding task {} ({})", task.id, task.target);
                    let queued = QueuedTask {
                        task_id: task.id.clone(),
                        credentials: None,
                    };
                    if let Err(e) = self.pending_tx.send(queued).await {
                        tracing::warn!("Failed to re-queue onboarding task {}: {}", task.id, e);
                    }
                }
                if !tasks.is_empty() {
                    tracing::info!("Re-queued {} pending onboarding tasks", tasks.len());
                }
            }
            Err(e) => {
                tracing::error!("Failed to list pending onboarding tasks: {}", e);
            }
        }
    }

    async fn worker(&self, mut rx: mpsc::Receiver<QueuedTask>) {
        while let Some(queued) = rx.recv().await {
            if let Err(e) = self.process_task(queued).await {
                tracing::error!("Onboarding task processing error: {}", e);
            }
        }
    }

    async fn process_task(&self, queued: QueuedTask) -> Result<OnboardingTask> {
        let task = match self.store.get_task(&queued.task_id).await? {
            Some(t) => t,
            None => anyhow::bail!("onboarding task {} not found", queued.task_id),
        };
        if task.is_terminal() {
            tracing::debug!("Onboarding task {} already {}, skipping", task.id, task.status);
            return Ok(task);
        }

        self.broadcast(EventType::OnboardingStarted, &task).await;
        let started = Instant::now();

        let policy = match self.store.get_policy().await {
            Ok(policy) => policy,
            Err(e) => {
                tracing::error!("Failed to load onboarding policy: {}", e);
                let outcome = TaskStore::fail_task(
                    &self.store,
                    &task.id,
                    fail_reason::STORE,
                    &format!("failed to load onboarding policy: {:#}", e),
                    None,
                )
                .await?;
                self.metrics.record_task(&outcome, started.elapsed());
                self.broadcast(EventType::OnboardingFailed, &outcome).await;
                return Ok(outcome);
            }
        };

        let outcome = self
            .reconciler
            .run_task(&task, queued.credentials.as_ref(), &policy)
            .await;

        self.metrics.record_task(&outcome, started.elapsed());
        self.broadcast(EventType::for_outcome(&outcome.status), &outcome).await;
        Ok(outcome)
    }

    async fn broadcast(&self, event_type: EventType, task: &OnboardingTask) {
        if let Some(ref hub) = self.ws_hub {
            hub.broadcast_task_update(event_type, task).await;
        }
    }
}
