//! Reconciliation between the metadata store and the blob directory.
//!
//! Two passes, each callable on its own:
//!
//! - **Session expiry**: every session with `expires_at < now` is removed with
//!   its documents (rows in one transaction, then blobs).
//! - **Orphan sweep**: blobs no document row references are deleted once
//!   `now - last_modified >= grace`. Younger orphans may belong to an upload
//!   that has written its blob but not yet committed its row.
//!
//! [`ReconciliationService::run_once`] runs both and refuses to overlap with
//! itself; [`ReconciliationService::start`] drives it from an interval.

use crate::DocumentStore;
use chrono::TimeDelta;
use docvault_core::{AppError, ReconciliationSettings};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Counters from one orphan sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanSweepReport {
    pub blobs_listed: usize,
    pub referenced: usize,
    pub orphans_found: usize,
    pub orphans_deleted: usize,
    /// Orphans younger than the grace window, left for a later sweep.
    pub orphans_deferred: usize,
    pub failures: usize,
}

/// Result of one full reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sessions_reaped: usize,
    pub orphans: OrphanSweepReport,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another run was still in progress.
    Skipped,
}

pub struct ReconciliationService {
    store: Arc<DocumentStore>,
    settings: ReconciliationSettings,
    running: Mutex<()>,
}

impl ReconciliationService {
    pub fn new(store: Arc<DocumentStore>, settings: ReconciliationSettings) -> Self {
        Self {
            store,
            settings,
            running: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ReconciliationSettings {
        &self.settings
    }

    /// Run the expiry pass then the orphan sweep.
    ///
    /// Returns [`SweepOutcome::Skipped`] without doing anything if a run is
    /// already in progress. Both passes run even if the first fails; the first
    /// error is returned.
    #[tracing::instrument(skip(self), fields(reconciliation.operation = "run_once"))]
    pub async fn run_once(&self) -> Result<SweepOutcome, AppError> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("Reconciliation already running, skipping this run");
            return Ok(SweepOutcome::Skipped);
        };

        let started = Instant::now();
        let reaped = self.reap_expired_sessions().await;
        let orphans = self.sweep_orphan_blobs().await;

        let report = SweepReport {
            sessions_reaped: reaped?,
            orphans: orphans?,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        tracing::info!(
            sessions_reaped = report.sessions_reaped,
            orphans_found = report.orphans.orphans_found,
            orphans_deleted = report.orphans.orphans_deleted,
            orphans_deferred = report.orphans.orphans_deferred,
            failures = report.orphans.failures,
            duration_ms = report.duration_ms,
            "Reconciliation completed"
        );

        Ok(SweepOutcome::Completed(report))
    }

    /// Remove every session that expired before now, with its documents and
    /// blobs. Returns the number of sessions removed.
    ///
    /// A session that fails to delete is logged and retried on the next run.
    #[tracing::instrument(skip(self), fields(reconciliation.pass = "session_expiry"))]
    pub async fn reap_expired_sessions(&self) -> Result<usize, AppError> {
        let now = self.store.now();
        let expired = self.store.expired_sessions(now).await?;

        let mut reaped = 0usize;
        for session in expired {
            tracing::debug!(
                session_id = %session.id,
                expires_at = %session.expires_at,
                "Reaping expired session"
            );

            match self.store.cascade_session(session.id).await {
                Ok(Some(_)) => reaped += 1,
                Ok(None) => {
                    tracing::debug!(session_id = %session.id, "Session already removed");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        session_id = %session.id,
                        "Failed to remove expired session"
                    );
                }
            }
        }

        tracing::info!(sessions_reaped = reaped, "Session expiry pass completed");
        Ok(reaped)
    }

    /// Orphan sweep with the configured grace window.
    pub async fn sweep_orphan_blobs(&self) -> Result<OrphanSweepReport, AppError> {
        self.sweep_orphan_blobs_with_grace(self.settings.orphan_grace)
            .await
    }

    /// Orphan sweep with an explicit grace window.
    ///
    /// The blob listing is taken before the referenced keys, so any row
    /// committed before the sweep starts protects its blob.
    #[tracing::instrument(skip(self), fields(reconciliation.pass = "orphan_sweep"))]
    pub async fn sweep_orphan_blobs_with_grace(
        &self,
        grace: Duration,
    ) -> Result<OrphanSweepReport, AppError> {
        let now = self.store.now();
        let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);

        let blobs = self.store.list_blobs().await?;
        let referenced = self.store.list_referenced_keys().await?;

        let mut report = OrphanSweepReport {
            blobs_listed: blobs.len(),
            referenced: referenced.len(),
            ..Default::default()
        };

        for blob in blobs {
            if referenced.contains(&blob.key) {
                continue;
            }
            report.orphans_found += 1;

            // Future mtimes (clock skew) give a negative age and are deferred.
            let age = now.signed_duration_since(blob.last_modified);
            if age < grace {
                report.orphans_deferred += 1;
                continue;
            }

            match self.store.raw_delete_blob(&blob.key).await {
                Ok(()) => {
                    report.orphans_deleted += 1;
                    tracing::debug!(
                        storage_key = %blob.key,
                        age_secs = age.num_seconds(),
                        "Deleted orphan blob"
                    );
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(error = %e, storage_key = %blob.key, "Failed to delete orphan blob");
                }
            }
        }

        tracing::info!(
            blobs_listed = report.blobs_listed,
            orphans_found = report.orphans_found,
            orphans_deleted = report.orphans_deleted,
            orphans_deferred = report.orphans_deferred,
            failures = report.failures,
            "Orphan sweep completed"
        );

        Ok(report)
    }

    /// Run [`run_once`](Self::run_once) on the configured interval until the
    /// returned handle is shut down. The first run starts immediately.
    pub fn start(self: Arc<Self>) -> ReconciliationHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let join = tokio::spawn(async move {
            // interval() panics on a zero period.
            let period = self.settings.sweep_interval.max(Duration::from_millis(1));
            let mut sweep_interval = interval(period);
            sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                interval_secs = period.as_secs(),
                orphan_grace_secs = self.settings.orphan_grace.as_secs(),
                "Reconciliation service started"
            );

            loop {
                tokio::select! {
                    _ = sweep_interval.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "Reconciliation run failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Reconciliation service shutting down");
                        break;
                    }
                }
            }
        });

        ReconciliationHandle { join, shutdown_tx }
    }
}

/// Handle to a running reconciliation loop.
pub struct ReconciliationHandle {
    join: JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ReconciliationHandle {
    /// Stop the loop and wait for it to exit. A run in progress completes
    /// first.
    pub async fn shutdown(self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(error = %e, "Failed to send shutdown signal to reconciliation service");
        }
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Reconciliation task ended abnormally");
        }
    }
}
