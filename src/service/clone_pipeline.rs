// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup, copy and restore of one database onto another server.
//!
//! The pipeline talks to SQL servers through [`SqlConnector`] and to backup
//! shares through [`ShareConnector`]. It blocks the calling thread; run it on
//! a worker thread when the caller must stay responsive.

use crate::domain::{
    join_remote_path, share_root, tsql, BackupFileEntry, BackupFileKind, CloneError,
    CloneProgress, CloneReport, CloneStage, ConnectionDescriptor, DbCloneJob, DbConfig, DbTarget,
    RetryPolicy, ShareError, SqlError,
};
use crate::ports::{ServerPaths, ShareConnector, SqlConnector, SqlSession};
use crate::service::NetworkShareSession;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Catalog the pipeline connects to for backup and restore statements.
const SYSTEM_CATALOG: &str = "master";

/// Granularity of the cancellable wait between copy attempts.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Destinations with a clone in progress, keyed by server and database.
static IN_FLIGHT: Lazy<Mutex<HashSet<(String, String)>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Callback receiving pipeline progress.
pub type ProgressCallback = Arc<dyn Fn(&CloneProgress) + Send + Sync>;

/// Source of the timestamp used in backup file names.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Shared flag a caller sets to stop a running clone.
///
/// The pipeline checks it before each stage and between copy attempts.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Restore step names reported in [`CloneError::RestoreFailed`].
pub mod steps {
    /// Connecting to the destination server
    pub const CONNECT: &str = "connect";
    /// Reading the backup's file list
    pub const FILE_LIST: &str = "file list";
    /// Reading the server's default data and log folders
    pub const SERVER_PATHS: &str = "server paths";
    /// Switching the destination to single-user mode
    pub const SINGLE_USER: &str = "single user";
    /// Restoring the backup
    pub const RESTORE: &str = "restore";
    /// Renaming the logical data file
    pub const RENAME_DATA: &str = "rename data file";
    /// Renaming the logical log file
    pub const RENAME_LOG: &str = "rename log file";
    /// Bringing the destination online
    pub const ONLINE: &str = "online";
    /// Returning the destination to multi-user mode
    pub const MULTI_USER: &str = "multi user";
}

/// Runs [`DbCloneJob`]s.
///
/// # Examples
///
/// ```rust,no_run
/// # #[cfg(feature = "mssql")]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use openenv::adapters::{LocalShareConnector, SqlServerConnector};
/// use openenv::domain::{DbCloneJob, DbTarget, EnvironmentEntry};
/// use openenv::service::{CancellationFlag, ClonePipeline};
/// use std::sync::Arc;
///
/// let pipeline = ClonePipeline::builder(
///     Arc::new(SqlServerConnector::new()?),
///     Arc::new(LocalShareConnector::new()),
/// )
/// .on_progress(|progress| println!("{}: {}", progress.stage, progress.message))
/// .build();
///
/// let mut job = DbCloneJob::new(
///     DbTarget::new("Orders_Live", EnvironmentEntry::default()),
///     DbTarget::new("Orders_Test", EnvironmentEntry::default()),
/// );
/// let report = pipeline.clone(&mut job, &CancellationFlag::new())?;
/// println!("copied in {} attempt(s)", report.copy_attempts);
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "mssql"))]
/// # fn main() {}
/// ```
pub struct ClonePipeline {
    sql: Arc<dyn SqlConnector>,
    shares: Arc<dyn ShareConnector>,
    retry: RetryPolicy,
    progress: Option<ProgressCallback>,
    clock: Clock,
}

impl ClonePipeline {
    /// Starts building a pipeline over the given connectors.
    pub fn builder(
        sql: Arc<dyn SqlConnector>,
        shares: Arc<dyn ShareConnector>,
    ) -> ClonePipelineBuilder {
        ClonePipelineBuilder {
            sql,
            shares,
            retry: RetryPolicy::default(),
            progress: None,
            clock: None,
        }
    }

    /// The copy retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Backs up the source, copies the backup to the destination share and
    /// restores it over the destination database.
    ///
    /// Both `backup_path` fields of `job` are filled in as the run proceeds.
    /// Only one clone per destination may run in the process at a time; a
    /// second one fails with [`CloneError::DestinationBusy`].
    pub fn clone(
        &self,
        job: &mut DbCloneJob,
        cancel: &CancellationFlag,
    ) -> Result<CloneReport, CloneError> {
        let _lock = DestinationLock::acquire(&job.destination)?;

        let started = (self.clock)();
        tracing::info!(
            "Cloning {} on {} into {} on {}",
            job.source.database_name,
            job.source.data_source,
            job.destination.database_name,
            job.destination.data_source
        );

        match self.run(job, cancel, started) {
            Ok(report) => {
                self.emit(
                    CloneStage::Done,
                    format!(
                        "{} restored from {}",
                        job.destination.database_name, report.destination_backup_path
                    ),
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Clone into {} failed: {}", job.destination.database_name, e);
                self.emit(CloneStage::Failed, e.to_string());
                Err(e)
            }
        }
    }

    fn run(
        &self,
        job: &mut DbCloneJob,
        cancel: &CancellationFlag,
        started: NaiveDateTime,
    ) -> Result<CloneReport, CloneError> {
        check_cancelled(cancel, CloneStage::BackingUp)?;
        require_backup_folder(&job.source)?;
        require_backup_folder(&job.destination)?;
        let source_path = job.source.backup_file_path(started);
        job.source.backup_path = Some(source_path.clone());
        self.emit(
            CloneStage::BackingUp,
            format!("Backing up {} to {}", job.source.database_name, source_path),
        );
        self.backup(&job.source, &source_path)?;

        check_cancelled(cancel, CloneStage::Copying)?;
        let destination_path = job.destination.backup_file_path(started);
        job.destination.backup_path = Some(destination_path.clone());
        self.emit(
            CloneStage::Copying,
            format!("Copying {} to {}", source_path, destination_path),
        );
        let copy_attempts = self.copy(job, &source_path, &destination_path, cancel)?;

        check_cancelled(cancel, CloneStage::Restoring)?;
        self.emit(
            CloneStage::Restoring,
            format!(
                "Restoring {} from {}",
                job.destination.database_name, destination_path
            ),
        );
        self.restore(&job.destination, &destination_path)?;

        Ok(CloneReport {
            source_backup_path: source_path,
            destination_backup_path: destination_path,
            copy_attempts,
        })
    }

    fn backup(&self, source: &DbTarget, path: &str) -> Result<(), CloneError> {
        let failed = |e: SqlError| CloneError::BackupFailed {
            database: source.database_name.clone(),
            path: path.to_string(),
            source: e,
        };

        let mut session = self.sql.connect(&system_descriptor(source)).map_err(failed)?;
        session
            .execute(&tsql::backup_database(&source.database_name, path))
            .map_err(failed)?;

        tracing::info!("Backed up {} to {}", source.database_name, path);
        Ok(())
    }

    /// Copies with bounded retries. Returns the number of attempts made.
    fn copy(
        &self,
        job: &DbCloneJob,
        from: &str,
        to: &str,
        cancel: &CancellationFlag,
    ) -> Result<u32, CloneError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.copy_once(job, from, to) {
                Ok(bytes) => {
                    tracing::info!(
                        attempt,
                        bytes,
                        "Copied {} to {}",
                        from,
                        to
                    );
                    return Ok(attempt);
                }
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= max_attempts {
                return Err(CloneError::CopyFailed {
                    from: from.to_string(),
                    to: to.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }

            tracing::warn!(
                attempt,
                max_attempts,
                "Copy of {} failed, retrying in {:?}: {}",
                from,
                self.retry.delay,
                error
            );
            if !wait_unless_cancelled(self.retry.delay, cancel) {
                return Err(CloneError::Cancelled {
                    step: CloneStage::Copying.to_string(),
                });
            }
        }
    }

    /// One copy attempt with both shares connected under their own credentials.
    fn copy_once(&self, job: &DbCloneJob, from: &str, to: &str) -> Result<u64, ShareError> {
        let shares = self.shares.as_ref();
        let source = NetworkShareSession::open(
            shares,
            &share_root(from),
            &job.source.environment.network_credentials,
        )?;
        let destination = NetworkShareSession::open(
            shares,
            &share_root(to),
            &job.destination.environment.network_credentials,
        )?;

        let copied = shares.copy_file(from, to);

        for session in [destination, source] {
            let share = session.share().to_string();
            if let Err(e) = session.release() {
                tracing::warn!("Failed to release share {}: {}", share, e);
            }
        }

        copied
    }

    fn restore(&self, destination: &DbTarget, backup_path: &str) -> Result<(), CloneError> {
        let database = destination.database_name.as_str();
        let failed = |step: &str| {
            let step = step.to_string();
            move |e: SqlError| CloneError::RestoreFailed {
                database: database.to_string(),
                step,
                source: e,
            }
        };

        let mut session = self
            .sql
            .connect(&system_descriptor(destination))
            .map_err(failed(steps::CONNECT))?;

        let manifest = session
            .backup_file_list(backup_path)
            .map_err(failed(steps::FILE_LIST))?;
        let plan = RestorePlan::new(destination, &manifest).map_err(failed(steps::FILE_LIST))?;
        let paths = session
            .server_paths()
            .map_err(failed(steps::SERVER_PATHS))?;

        session
            .execute(&tsql::set_single_user(database))
            .map_err(failed(steps::SINGLE_USER))?;

        let result = self.restore_single_user(session.as_mut(), database, backup_path, &plan, &paths);
        if let Err(e) = &result {
            tracing::warn!(
                "{} may remain in single-user mode after a failed restore: {}",
                database,
                e
            );
        }
        result
    }

    /// Restores over `database` (already in single-user mode), renames its
    /// logical files to `<database>` and `<database>_log`, then brings it
    /// online in multi-user mode.
    ///
    /// A logical file whose name already equals its target (ignoring case)
    /// is left alone, so no rename statement is issued for it.
    fn restore_single_user(
        &self,
        session: &mut dyn SqlSession,
        database: &str,
        backup_path: &str,
        plan: &RestorePlan,
        paths: &ServerPaths,
    ) -> Result<(), CloneError> {
        let failed = |step: &'static str| {
            move |e: SqlError| CloneError::RestoreFailed {
                database: database.to_string(),
                step: step.to_string(),
                source: e,
            }
        };

        session
            .execute(&tsql::restore_with_move(
                database,
                backup_path,
                &plan.moves(database, paths),
            ))
            .map_err(failed(steps::RESTORE))?;

        let data_name = database.to_string();
        if !plan.data.eq_ignore_ascii_case(&data_name) {
            session
                .execute(&tsql::rename_logical_file(database, &plan.data, &data_name))
                .map_err(failed(steps::RENAME_DATA))?;
        }
        let log_name = format!("{}_log", database);
        if !plan.log.eq_ignore_ascii_case(&log_name) {
            session
                .execute(&tsql::rename_logical_file(database, &plan.log, &log_name))
                .map_err(failed(steps::RENAME_LOG))?;
        }

        session
            .execute(&tsql::set_online(database))
            .map_err(failed(steps::ONLINE))?;
        session
            .execute(&tsql::set_multi_user(database))
            .map_err(failed(steps::MULTI_USER))?;

        tracing::info!("Restored {} from {}", database, backup_path);
        Ok(())
    }

    fn emit(&self, stage: CloneStage, message: String) {
        tracing::debug!(%stage, "{}", message);
        if let Some(progress) = &self.progress {
            progress(&CloneProgress { stage, message });
        }
    }
}

impl std::fmt::Debug for ClonePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClonePipeline")
            .field("retry", &self.retry)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Builder for [`ClonePipeline`].
pub struct ClonePipelineBuilder {
    sql: Arc<dyn SqlConnector>,
    shares: Arc<dyn ShareConnector>,
    retry: RetryPolicy,
    progress: Option<ProgressCallback>,
    clock: Option<Clock>,
}

impl ClonePipelineBuilder {
    /// Sets the copy retry policy.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Registers a progress callback.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CloneProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Overrides the clock used for backup file names (local time by default).
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> ClonePipeline {
        ClonePipeline {
            sql: self.sql,
            shares: self.shares,
            retry: self.retry,
            progress: self.progress,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(|| chrono::Local::now().naive_local())),
        }
    }
}

/// Logical files of a backup and where they go.
#[derive(Debug)]
struct RestorePlan {
    data: String,
    log: String,
    extra: Vec<BackupFileEntry>,
}

impl RestorePlan {
    fn new(destination: &DbTarget, manifest: &[BackupFileEntry]) -> Result<Self, SqlError> {
        let mut data = None;
        let mut log = None;
        let mut extra = Vec::new();
        for entry in manifest {
            match entry.kind {
                BackupFileKind::Data if data.is_none() => data = Some(entry.logical_name.clone()),
                BackupFileKind::Log if log.is_none() => log = Some(entry.logical_name.clone()),
                _ => extra.push(entry.clone()),
            }
        }

        match (data, log) {
            (Some(data), Some(log)) => Ok(Self { data, log, extra }),
            _ => Err(SqlError::new(
                destination.data_source.as_str(),
                "backup does not contain both a data file and a log file",
            )),
        }
    }

    /// `(logical, physical)` pairs for `RESTORE ... WITH MOVE`.
    fn moves(&self, database: &str, paths: &ServerPaths) -> Vec<(String, String)> {
        let mut moves = vec![
            (
                self.data.clone(),
                join_remote_path(&paths.data, &format!("{}.mdf", database)),
            ),
            (
                self.log.clone(),
                join_remote_path(&paths.log, &format!("{}_log.ldf", database)),
            ),
        ];
        for (i, entry) in self.extra.iter().enumerate() {
            let (folder, extension) = match entry.kind {
                BackupFileKind::Log => (&paths.log, "ldf"),
                _ => (&paths.data, "ndf"),
            };
            moves.push((
                entry.logical_name.clone(),
                join_remote_path(folder, &format!("{}_{}.{}", database, i + 1, extension)),
            ));
        }
        moves
    }
}

/// Registration of a destination in [`IN_FLIGHT`], removed on drop.
struct DestinationLock {
    key: (String, String),
}

impl DestinationLock {
    fn acquire(destination: &DbTarget) -> Result<Self, CloneError> {
        let key = (
            destination.data_source.to_ascii_lowercase(),
            destination.database_name.to_ascii_lowercase(),
        );
        let mut in_flight = IN_FLIGHT
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(key.clone()) {
            return Err(CloneError::DestinationBusy {
                database: destination.database_name.clone(),
                data_source: destination.data_source.clone(),
            });
        }
        Ok(Self { key })
    }
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        let mut in_flight = IN_FLIGHT
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.key);
    }
}

fn system_descriptor(target: &DbTarget) -> ConnectionDescriptor {
    let config = DbConfig::new(target.database_name.as_str(), target.environment.clone());
    let mut descriptor = ConnectionDescriptor::build(&config, SYSTEM_CATALOG);
    descriptor.data_source = target.data_source.clone();
    descriptor
}

/// Fails when `target` has no backup folder to write or read the backup.
fn require_backup_folder(target: &DbTarget) -> Result<(), CloneError> {
    if !target.backup_folder.trim().is_empty() {
        return Ok(());
    }
    Err(CloneError::BackupFailed {
        database: target.database_name.clone(),
        path: String::new(),
        source: SqlError::new(
            target.data_source.as_str(),
            format!(
                "no backup location is configured for '{}'",
                target.database_name
            ),
        ),
    })
}

fn check_cancelled(cancel: &CancellationFlag, stage: CloneStage) -> Result<(), CloneError> {
    if cancel.is_cancelled() {
        return Err(CloneError::Cancelled {
            step: stage.to_string(),
        });
    }
    Ok(())
}

/// Sleeps for `delay`, waking early on cancellation. Returns false when cancelled.
fn wait_unless_cancelled(delay: Duration, cancel: &CancellationFlag) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(CANCEL_POLL.min(deadline - now));
    }
}
