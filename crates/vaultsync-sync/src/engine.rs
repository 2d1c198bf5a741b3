//! Reconciliation engine
//!
//! The [`Reconciler`] repairs divergence between the primary store and the
//! local store, using the artifact on disk as the tie-breaker.
//!
//! ## Cycle Flow
//!
//! 1. **Pull**: merge primary rows into the local store, flag disagreements
//! 2. **Resolve**: settle every conflicting record from the File Verifier's answer
//! 3. **Push**: write the local view back to the primary store
//! 4. **Statistics**: read-only snapshot for observability
//!
//! Records are processed one at a time and committed individually, so a
//! failure never rolls back records already handled. Only one cycle or
//! phase runs at a time per reconciler; cancellation is checked between
//! records.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vaultsync_audit::{ReasonCode, StatisticsCollector, SyncLogger, SyncStatistics};
use vaultsync_conflict::{
    ConflictDetector, ConflictError, ConflictResolver, DetectionResult, FieldPrecedence,
    ReconcilePolicy, Resolution, ResolutionOutcome,
};
use vaultsync_core::config::Config;
use vaultsync_core::domain::{BackupRecord, PrimaryRecord, RecordStatus, RecordType, SyncStatus};
use vaultsync_core::ports::{FileCheck, IFileVerifier, ILocalStore, IPrimaryStore, RecordFilter};

use crate::verifier::combine_checks;
use crate::ReconcileError;

// ============================================================================
// Phase summaries
// ============================================================================

/// Result of [`Reconciler::sync_from_primary`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub total_processed: u32,
    pub created: u32,
    pub updated: u32,
    pub conflicts: u32,
    /// One message per rejected row; the batch continued past each
    pub errors: Vec<String>,
    pub oracle_failures: u32,
    pub cancelled: bool,
}

/// Result of [`Reconciler::resolve_all_conflicts`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolveSummary {
    pub total_conflicts: u32,
    pub resolved: u32,
    /// Deferred because the file check itself failed
    pub still_conflicted: u32,
    pub fixed_to_completed: u32,
    pub fixed_to_failed: u32,
    pub verified_consistent: u32,
    pub oracle_failures: u32,
    pub cancelled: bool,
}

/// Result of [`Reconciler::sync_to_primary`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PushSummary {
    pub backups_pushed: u32,
    pub restores_pushed: u32,
    /// Records left alone because they are still in conflict
    pub skipped_conflicts: u32,
    pub cancelled: bool,
}

impl PushSummary {
    pub fn total_pushed(&self) -> u32 {
        self.backups_pushed + self.restores_pushed
    }
}

/// Result of a full [`Reconciler::run_cycle`]
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub sync: SyncSummary,
    pub resolve: ResolveSummary,
    pub push: PushSummary,
    pub statistics: SyncStatistics,
}

impl CycleReport {
    pub fn cancelled(&self) -> bool {
        self.sync.cancelled || self.resolve.cancelled || self.push.cancelled
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

/// How one primary row was absorbed
enum PullAction {
    Created,
    Updated,
    Conflict,
}

/// Oracle answer for a record plus how it was located
struct ArtifactCheck {
    check: FileCheck,
    /// What was probed, for diagnostics
    location: String,
    /// The record has no `file_path` and no fallback location held the artifact
    no_path: bool,
}

/// Counts oracle failures within one phase
struct OracleTally {
    phase: &'static str,
    count: u32,
    threshold: u32,
}

impl OracleTally {
    fn new(phase: &'static str, threshold: u32) -> Self {
        Self {
            phase,
            count: 0,
            threshold,
        }
    }

    fn record(&mut self, backup_id: &str, artifact: &ArtifactCheck) {
        if !artifact.check.is_oracle_failure() {
            return;
        }
        self.count += 1;
        let err = ReconcileError::Oracle {
            path: artifact.location.clone(),
            reason: artifact.check.to_string(),
        };
        debug!(backup_id, error = %err, "Oracle failure");
        if self.count == self.threshold {
            warn!(
                phase = self.phase,
                failures = self.count,
                threshold = self.threshold,
                "File checks keep failing; artifacts may be on an unreachable mount"
            );
        }
    }
}

/// Names of the fields that differ between two versions of a record
fn changed_fields(before: &BackupRecord, after: &BackupRecord) -> Vec<&'static str> {
    let (b, a) = (before.details(), after.details());
    let mut fields = Vec::new();
    if before.status() != after.status() {
        fields.push("status");
    }
    if b.backup_type != a.backup_type {
        fields.push("backup_type");
    }
    if b.file_path != a.file_path {
        fields.push("file_path");
    }
    if b.file_size != a.file_size {
        fields.push("file_size");
    }
    if b.compressed_size != a.compressed_size {
        fields.push("compressed_size");
    }
    if b.compression_ratio != a.compression_ratio {
        fields.push("compression_ratio");
    }
    if b.checksum != a.checksum {
        fields.push("checksum");
    }
    if b.databases_count != a.databases_count {
        fields.push("databases_count");
    }
    if b.encryption_enabled != a.encryption_enabled {
        fields.push("encryption_enabled");
    }
    if b.error_message != a.error_message {
        fields.push("error_message");
    }
    if b.extra_data != a.extra_data {
        fields.push("extra_data");
    }
    if before.started_at() != after.started_at() {
        fields.push("started_at");
    }
    if before.completed_at() != after.completed_at() {
        fields.push("completed_at");
    }
    fields
}

fn local_err(err: anyhow::Error) -> ReconcileError {
    ReconcileError::LocalStore(err)
}

fn primary_err(err: anyhow::Error) -> ReconcileError {
    ReconcileError::PrimaryStore(err)
}

// ============================================================================
// Reconciler
// ============================================================================

/// Reconciles the primary store with the local store
///
/// ## Dependencies
///
/// - `local`: the isolated store this engine owns
/// - `primary`: the shared store of record
/// - `verifier`: the artifact existence oracle
pub struct Reconciler {
    local: Arc<dyn ILocalStore>,
    primary: Arc<dyn IPrimaryStore>,
    verifier: Arc<dyn IFileVerifier>,
    policy: ReconcilePolicy,
    detector: ConflictDetector,
    resolver: ConflictResolver,
    logger: SyncLogger,
    oracle_warn_threshold: u32,
    cancel: CancellationToken,
    /// Serializes cycles and phases
    cycle_lock: Mutex<()>,
}

impl Reconciler {
    /// Creates a new `Reconciler` with the given dependencies
    ///
    /// Unknown policy values in `config` fall back to their defaults with a
    /// warning; run `Config::validate` first to reject them instead.
    pub fn new(
        local: Arc<dyn ILocalStore>,
        primary: Arc<dyn IPrimaryStore>,
        verifier: Arc<dyn IFileVerifier>,
        config: &Config,
    ) -> Self {
        let policy = ReconcilePolicy::from_config(&config.reconcile);
        Self {
            logger: SyncLogger::new(Arc::clone(&local)),
            local,
            primary,
            verifier,
            detector: ConflictDetector::new(policy.detection),
            resolver: ConflictResolver::new(policy.oracle_failure),
            policy,
            oracle_warn_threshold: config.reconcile.oracle_warn_threshold,
            cancel: CancellationToken::new(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Attaches a cancellation token checked between records
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn local_store(&self) -> Arc<dyn ILocalStore> {
        Arc::clone(&self.local)
    }

    /// Takes the cycle lock and a logger stamped with a fresh cycle id
    fn begin(&self) -> Result<(MutexGuard<'_, ()>, SyncLogger), ReconcileError> {
        let guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| ReconcileError::CycleInProgress)?;
        Ok((guard, self.logger.for_cycle(Uuid::new_v4())))
    }

    // ========================================================================
    // Public entry points
    // ========================================================================

    /// Merges a batch of primary-store rows into the local store
    ///
    /// # Errors
    ///
    /// Store errors abort the phase. Malformed rows do not; they are
    /// listed in [`SyncSummary::errors`].
    pub async fn sync_from_primary(
        &self,
        records: &[PrimaryRecord],
    ) -> Result<SyncSummary, ReconcileError> {
        let (_guard, logger) = self.begin()?;
        self.pull(&logger, records).await
    }

    /// Resolves every local record currently in `conflict`
    pub async fn resolve_all_conflicts(&self) -> Result<ResolveSummary, ReconcileError> {
        let (_guard, logger) = self.begin()?;
        self.resolve(&logger).await
    }

    /// Writes local backups and restores back to the primary store
    ///
    /// # Errors
    ///
    /// A primary write failure aborts the phase with a retryable
    /// [`ReconcileError::PrimaryStore`]; nothing is retried here.
    pub async fn sync_to_primary(&self) -> Result<PushSummary, ReconcileError> {
        let (_guard, logger) = self.begin()?;
        self.push(&logger).await
    }

    /// Read-only statistics snapshot
    pub async fn get_statistics(&self) -> Result<SyncStatistics, ReconcileError> {
        StatisticsCollector::new(Arc::clone(&self.local))
            .collect(Utc::now())
            .await
            .map_err(local_err)
    }

    /// Runs pull, resolve, push and statistics as one serialized cycle
    ///
    /// # Errors
    ///
    /// `CycleInProgress` when another cycle holds this reconciler; store
    /// errors from any phase.
    pub async fn run_cycle(&self) -> Result<CycleReport, ReconcileError> {
        let (_guard, logger) = self.begin()?;
        let cycle_id = logger.cycle_id().unwrap_or_else(Uuid::new_v4);
        let started_at = Utc::now();
        let start = Instant::now();

        info!(%cycle_id, "Starting reconciliation cycle");

        let result = self.run_phases(&logger).await;
        let duration_ms = crate::saturating_millis(start.elapsed());

        match result {
            Ok((sync, resolve, push, statistics)) => {
                let report = CycleReport {
                    cycle_id,
                    started_at,
                    duration_ms,
                    sync,
                    resolve,
                    push,
                    statistics,
                };
                info!(
                    %cycle_id,
                    duration_ms,
                    created = report.sync.created,
                    conflicts = report.sync.conflicts,
                    resolved = report.resolve.resolved,
                    pushed = report.push.total_pushed(),
                    cancelled = report.cancelled(),
                    "Reconciliation cycle complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(%cycle_id, duration_ms, error = %e, "Reconciliation cycle failed");
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        logger: &SyncLogger,
    ) -> Result<(SyncSummary, ResolveSummary, PushSummary, SyncStatistics), ReconcileError> {
        let rows = self.primary.fetch_backups().await.map_err(primary_err)?;
        let sync = self.pull(logger, &rows).await?;
        let resolve = self.resolve(logger).await?;
        let push = self.push(logger).await?;
        let statistics = self.get_statistics().await?;
        Ok((sync, resolve, push, statistics))
    }

    // ========================================================================
    // Artifact lookup
    // ========================================================================

    /// Asks the verifier about a record's artifact
    ///
    /// Records without a path are looked up in the verifier's fallback
    /// locations.
    async fn check_artifact(&self, backup_id: &str, file_path: Option<&str>) -> ArtifactCheck {
        if let Some(path) = file_path.filter(|p| !p.trim().is_empty()) {
            let path = PathBuf::from(path);
            return ArtifactCheck {
                check: self.verifier.check(&path).await,
                location: path.display().to_string(),
                no_path: false,
            };
        }

        let mut checks = Vec::new();
        for candidate in self.verifier.fallback_paths(backup_id) {
            let check = self.verifier.check(&candidate).await;
            let found = check.is_present();
            checks.push(check);
            if found {
                break;
            }
        }
        let check = combine_checks(checks);
        ArtifactCheck {
            no_path: !check.is_present(),
            check,
            location: format!("<no file_path> ({backup_id})"),
        }
    }

    // ========================================================================
    // Pull (primary -> local)
    // ========================================================================

    #[tracing::instrument(skip(self, logger, records), fields(count = records.len()))]
    async fn pull(
        &self,
        logger: &SyncLogger,
        records: &[PrimaryRecord],
    ) -> Result<SyncSummary, ReconcileError> {
        let mut summary = SyncSummary::default();
        let mut tally = OracleTally::new("pull", self.oracle_warn_threshold);

        for row in records {
            if self.cancel.is_cancelled() {
                info!(processed = summary.total_processed, "Pull cancelled");
                summary.cancelled = true;
                break;
            }
            summary.total_processed += 1;

            match self.pull_one(logger, row, &mut tally).await {
                Ok(PullAction::Created) => summary.created += 1,
                Ok(PullAction::Updated) => summary.updated += 1,
                Ok(PullAction::Conflict) => summary.conflicts += 1,
                Err(e @ ReconcileError::InvalidRecord(_)) => {
                    warn!(row_id = ?row.row_id, error = %e, "Skipping primary row");
                    summary.errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        summary.oracle_failures = tally.count;
        info!(
            total = summary.total_processed,
            created = summary.created,
            updated = summary.updated,
            conflicts = summary.conflicts,
            errors = summary.errors.len(),
            "Pull complete"
        );
        Ok(summary)
    }

    async fn pull_one(
        &self,
        logger: &SyncLogger,
        row: &PrimaryRecord,
        tally: &mut OracleTally,
    ) -> Result<PullAction, ReconcileError> {
        let backup_id = row
            .require_id()
            .map_err(|e| ReconcileError::InvalidRecord(e.to_string()))?
            .to_string();
        let primary_status = row
            .parsed_status()
            .map_err(|e| ReconcileError::InvalidRecord(format!("{backup_id}: {e}")))?;
        let now = Utc::now();

        let Some(local) = self.local.get_backup(&backup_id).await.map_err(local_err)? else {
            let mut record = row
                .to_backup_record()
                .map_err(|e| ReconcileError::InvalidRecord(format!("{backup_id}: {e}")))?;
            record.transition_sync(SyncStatus::Synced, None, now)?;
            let entry = logger.created_entry(&backup_id, primary_status);
            self.local
                .save_backup_with_log(&record, &entry)
                .await
                .map_err(local_err)?;
            debug!(backup_id = %backup_id, status = %primary_status, "Created local record");
            return Ok(PullAction::Created);
        };

        if !ConflictDetector::needs_file_check(local.status(), primary_status) {
            self.apply_update(logger, local, row, None, now).await?;
            return Ok(PullAction::Updated);
        }

        let file_path = local
            .file_path()
            .map(str::to_string)
            .or_else(|| row.details.file_path.clone());
        let artifact = self.check_artifact(&backup_id, file_path.as_deref()).await;
        tally.record(&backup_id, &artifact);

        match self
            .detector
            .detect(local.status(), primary_status, artifact.check.is_present())
        {
            DetectionResult::InSync => {
                self.apply_update(logger, local, row, None, now).await?;
                Ok(PullAction::Updated)
            }
            DetectionResult::AdoptPrimary(status) => {
                self.apply_update(logger, local, row, Some((status, &artifact)), now)
                    .await?;
                Ok(PullAction::Updated)
            }
            DetectionResult::Conflicted { reason } => {
                let mut record = local;
                record.set_primary_row_id(row.row_id);
                record.transition_sync(SyncStatus::Conflict, Some(reason.clone()), now)?;
                let entry = logger.detect_conflict_entry(
                    &backup_id,
                    record.status(),
                    primary_status,
                    &artifact.check,
                    &reason,
                );
                self.local
                    .save_backup_with_log(&record, &entry)
                    .await
                    .map_err(local_err)?;
                info!(backup_id = %backup_id, %reason, "Record flagged as conflict");
                Ok(PullAction::Conflict)
            }
        }
    }

    /// Clean update: merge descriptive fields, optionally adopt the primary
    /// status, refresh the row id and touch `last_sync_at`
    async fn apply_update(
        &self,
        logger: &SyncLogger,
        local: BackupRecord,
        row: &PrimaryRecord,
        adopt: Option<(RecordStatus, &ArtifactCheck)>,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let before = local.clone();
        let mut record = local;

        record.set_details(self.policy.merge_details(before.details(), &row.details));
        let (started_at, completed_at) = match self.policy.field_precedence {
            FieldPrecedence::Primary => (
                row.started_at.or(before.started_at()),
                row.completed_at.or(before.completed_at()),
            ),
            FieldPrecedence::Local => (
                before.started_at().or(row.started_at),
                before.completed_at().or(row.completed_at),
            ),
        };
        if record.started_at() != started_at {
            record.set_started_at(started_at);
        }
        if record.completed_at() != completed_at {
            record.set_completed_at(completed_at);
        }
        if let Some((status, artifact)) = adopt {
            record.set_status(status);
            if artifact.check.is_present() {
                record.mark_file_verified(now);
            }
        }
        record.set_primary_row_id(row.row_id);
        record.touch_sync(now);
        // The stores agree now, so an earlier conflict no longer holds
        if matches!(
            record.sync_status(),
            SyncStatus::Pending | SyncStatus::Conflict
        ) {
            record.transition_sync(SyncStatus::Synced, None, now)?;
        }

        let mut changed = changed_fields(&before, &record);
        if before.sync_status() == SyncStatus::Conflict {
            changed.push("sync_status");
            info!(
                backup_id = %record.backup_id(),
                previous_reason = ?before.conflict_reason(),
                "Stores agree again; conflict cleared"
            );
        }
        if changed.is_empty() {
            self.local.save_backup(&record).await.map_err(local_err)?;
        } else {
            let entry =
                logger.updated_entry(record.backup_id(), before.status(), record.status(), &changed);
            self.local
                .save_backup_with_log(&record, &entry)
                .await
                .map_err(local_err)?;
            debug!(backup_id = %record.backup_id(), ?changed, "Updated local record");
        }
        Ok(())
    }

    // ========================================================================
    // Resolve
    // ========================================================================

    #[tracing::instrument(skip(self, logger))]
    async fn resolve(&self, logger: &SyncLogger) -> Result<ResolveSummary, ReconcileError> {
        let conflicts = self
            .local
            .query_backups(&RecordFilter::new().with_sync_status(SyncStatus::Conflict))
            .await
            .map_err(local_err)?;

        let mut summary = ResolveSummary {
            total_conflicts: conflicts.len() as u32,
            ..ResolveSummary::default()
        };
        let mut tally = OracleTally::new("resolve", self.oracle_warn_threshold);

        for mut record in conflicts {
            if self.cancel.is_cancelled() {
                info!(resolved = summary.resolved, "Resolution cancelled");
                summary.cancelled = true;
                break;
            }

            let backup_id = record.backup_id().to_string();
            let artifact = self.check_artifact(&backup_id, record.file_path()).await;
            tally.record(&backup_id, &artifact);
            if artifact.no_path {
                warn!(
                    backup_id = %backup_id,
                    "Conflicting record has no artifact path; resolving as absent"
                );
            }

            let now = Utc::now();
            let resolution = self
                .resolver
                .apply(&mut record, &artifact.check, now)
                .map_err(|e| match e {
                    ConflictError::Domain(d) => ReconcileError::Domain(d),
                    other => ReconcileError::Inconsistent {
                        backup_id: backup_id.clone(),
                        reason: other.to_string(),
                    },
                })?;

            match resolution {
                Resolution::Resolved {
                    outcome,
                    old_status,
                    new_status,
                    ..
                } => {
                    let entry = logger.resolve_conflict_entry(
                        &backup_id,
                        old_status,
                        new_status,
                        outcome.as_str(),
                        &artifact.check,
                        artifact.no_path.then_some(ReasonCode::NoArtifactPath),
                    );
                    self.local
                        .save_backup_with_log(&record, &entry)
                        .await
                        .map_err(local_err)?;

                    summary.resolved += 1;
                    match outcome {
                        ResolutionOutcome::FixedToCompleted => summary.fixed_to_completed += 1,
                        ResolutionOutcome::FixedToFailed => summary.fixed_to_failed += 1,
                        ResolutionOutcome::VerifiedConsistent => summary.verified_consistent += 1,
                    }
                }
                Resolution::Deferred { reason } => {
                    logger
                        .log_resolution_deferred(&backup_id, record.status(), &artifact.check, &reason)
                        .await;
                    summary.still_conflicted += 1;
                }
            }
        }

        summary.oracle_failures = tally.count;
        if summary.still_conflicted > 0 {
            warn!(
                still_conflicted = summary.still_conflicted,
                "Some conflicts could not be resolved because file checks failed"
            );
        }
        info!(
            total = summary.total_conflicts,
            resolved = summary.resolved,
            still_conflicted = summary.still_conflicted,
            "Resolution complete"
        );
        Ok(summary)
    }

    // ========================================================================
    // Push (local -> primary)
    // ========================================================================

    #[tracing::instrument(skip(self, logger))]
    async fn push(&self, logger: &SyncLogger) -> Result<PushSummary, ReconcileError> {
        let mut summary = PushSummary::default();

        let backups = self
            .local
            .query_backups(&RecordFilter::new())
            .await
            .map_err(local_err)?;

        for mut record in backups {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if record.sync_status() == SyncStatus::Conflict {
                debug!(backup_id = %record.backup_id(), "Skipping unresolved conflict");
                summary.skipped_conflicts += 1;
                continue;
            }

            let projected = PrimaryRecord::from_backup_record(&record);
            let existing = self
                .primary
                .get_backup(record.backup_id())
                .await
                .map_err(primary_err)?;
            let reason = match existing {
                None => ReasonCode::PrimaryMissing,
                Some(row) if !row.same_content(&projected) => ReasonCode::PrimaryStale,
                Some(row) => {
                    // Already identical: only settle local bookkeeping
                    if record.sync_status() == SyncStatus::Pending {
                        record.set_primary_row_id(row.row_id);
                        record.transition_sync(SyncStatus::Synced, None, Utc::now())?;
                        self.local.save_backup(&record).await.map_err(local_err)?;
                    }
                    continue;
                }
            };

            self.primary
                .upsert_backup(&projected)
                .await
                .map_err(primary_err)?;

            let now = Utc::now();
            if record.sync_status() == SyncStatus::Pending {
                record.transition_sync(SyncStatus::Synced, None, now)?;
            } else {
                record.touch_sync(now);
            }
            self.local.save_backup(&record).await.map_err(local_err)?;
            logger
                .log_sync_to_primary(
                    RecordType::Backup,
                    record.backup_id(),
                    record.status(),
                    reason,
                )
                .await;
            summary.backups_pushed += 1;
        }

        if !summary.cancelled {
            self.push_restores(logger, &mut summary).await?;
        }

        info!(
            backups = summary.backups_pushed,
            restores = summary.restores_pushed,
            skipped = summary.skipped_conflicts,
            "Push complete"
        );
        Ok(summary)
    }

    async fn push_restores(
        &self,
        logger: &SyncLogger,
        summary: &mut PushSummary,
    ) -> Result<(), ReconcileError> {
        let restores = self.local.list_restores().await.map_err(local_err)?;

        for mut record in restores {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if record.sync_status() == SyncStatus::Conflict {
                summary.skipped_conflicts += 1;
                continue;
            }

            let existing = self
                .primary
                .get_restore(record.restore_id())
                .await
                .map_err(primary_err)?;
            let reason = match existing {
                None => ReasonCode::PrimaryMissing,
                Some(row) if !row.same_content(&record) => ReasonCode::PrimaryStale,
                Some(_) => continue,
            };

            self.primary
                .upsert_restore(&record)
                .await
                .map_err(primary_err)?;
            record.mark_pushed(Utc::now());
            self.local.save_restore(&record).await.map_err(local_err)?;
            logger
                .log_sync_to_primary(
                    RecordType::Restore,
                    record.restore_id(),
                    record.status(),
                    reason,
                )
                .await;
            summary.restores_pushed += 1;
        }
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_core::domain::BackupDetails;

    #[test]
    fn test_changed_fields_empty_for_identical_records() {
        let record = BackupRecord::new("bk-1", RecordStatus::Completed).unwrap();
        assert!(changed_fields(&record, &record.clone()).is_empty());
    }

    #[test]
    fn test_changed_fields_lists_differences() {
        let before = BackupRecord::new("bk-1", RecordStatus::Running).unwrap();
        let mut after = before.clone();
        after.set_status(RecordStatus::Completed);
        after.set_details(BackupDetails {
            file_size: Some(10),
            checksum: Some("abc".into()),
            ..BackupDetails::default()
        });

        assert_eq!(
            changed_fields(&before, &after),
            vec!["status", "file_size", "checksum"]
        );
    }

    #[test]
    fn test_oracle_tally_counts_only_failures() {
        let mut tally = OracleTally::new("resolve", 2);
        let check = |check: FileCheck| ArtifactCheck {
            check,
            location: "/b/x".into(),
            no_path: false,
        };

        tally.record("a", &check(FileCheck::Missing));
        tally.record("b", &check(FileCheck::Empty));
        assert_eq!(tally.count, 0);

        tally.record("c", &check(FileCheck::TimedOut));
        tally.record("d", &check(FileCheck::Unreadable("denied".into())));
        tally.record("e", &check(FileCheck::TimedOut));
        assert_eq!(tally.count, 3);
    }

    #[test]
    fn test_push_summary_total() {
        let summary = PushSummary {
            backups_pushed: 2,
            restores_pushed: 1,
            ..PushSummary::default()
        };
        assert_eq!(summary.total_pushed(), 3);
    }
}
