// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clone jobs, backup naming and pipeline progress types.

use crate::domain::connection::catalog_name;
use crate::domain::deployment::DeploymentMode;
use crate::domain::environment::EnvironmentEntry;
use chrono::NaiveDateTime;
use std::fmt;

/// One side of a clone: a database on a server plus where its backups live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTarget {
    /// Database (catalog) name
    pub database_name: String,
    /// Server address
    pub data_source: String,
    /// Folder where backups for this side are written
    pub backup_folder: String,
    /// Backup file of this side, set while the job runs
    pub backup_path: Option<String>,
    /// The environment entry providing credentials
    pub environment: EnvironmentEntry,
}

impl DbTarget {
    /// Builds a target for `database_name` hosted in `environment`.
    pub fn new(database_name: impl Into<String>, environment: EnvironmentEntry) -> Self {
        Self {
            database_name: database_name.into(),
            data_source: environment.server_ip.clone(),
            backup_folder: environment.backup_location.clone(),
            backup_path: None,
            environment,
        }
    }

    /// Overrides the backup folder.
    pub fn with_backup_folder(mut self, folder: impl Into<String>) -> Self {
        self.backup_folder = folder.into();
        self
    }

    /// The backup file this side uses for a run started at `at`.
    pub fn backup_file_path(&self, at: NaiveDateTime) -> String {
        join_remote_path(&self.backup_folder, &backup_file_name(&self.database_name, at))
    }
}

/// A single backup → copy → restore operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCloneJob {
    /// The database that is backed up
    pub source: DbTarget,
    /// The database that is overwritten
    pub destination: DbTarget,
}

impl DbCloneJob {
    /// Creates a job from two targets.
    pub fn new(source: DbTarget, destination: DbTarget) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Creates a job cloning `database_name` between two deployment modes,
    /// naming both catalogs with the mode suffixes.
    ///
    /// ```
    /// use openenv::domain::{DbCloneJob, DeploymentMode, EnvironmentEntry};
    ///
    /// let job = DbCloneJob::between(
    ///     "Orders",
    ///     (DeploymentMode::Production, EnvironmentEntry::default()),
    ///     (DeploymentMode::Testing, EnvironmentEntry::default()),
    /// );
    /// assert_eq!(job.source.database_name, "Orders_Live");
    /// assert_eq!(job.destination.database_name, "Orders_Test");
    /// ```
    pub fn between(
        database_name: &str,
        source: (DeploymentMode, EnvironmentEntry),
        destination: (DeploymentMode, EnvironmentEntry),
    ) -> Self {
        Self {
            source: DbTarget::new(catalog_name(database_name, source.0), source.1),
            destination: DbTarget::new(catalog_name(database_name, destination.0), destination.1),
        }
    }
}

/// Backup file name `<database>_<yyyyMMddHHmm>.bak`.
///
/// ```
/// use chrono::NaiveDate;
/// use openenv::domain::backup_file_name;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(7, 5, 0).unwrap();
/// assert_eq!(backup_file_name("Orders_Live", at), "Orders_Live_202403090705.bak");
/// ```
pub fn backup_file_name(database_name: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.bak", database_name, at.format("%Y%m%d%H%M"))
}

fn separator_of(path: &str) -> char {
    if path.contains('\\') || !path.contains('/') {
        '\\'
    } else {
        '/'
    }
}

/// Joins a file name onto a remote folder, keeping the folder's separator style.
pub fn join_remote_path(folder: &str, file_name: &str) -> String {
    if folder.is_empty() {
        return file_name.to_string();
    }
    let separator = separator_of(folder);
    let trimmed = folder.trim_end_matches(['\\', '/']);
    format!("{}{}{}", trimmed, separator, file_name)
}

/// The share a remote path lives on.
///
/// For UNC paths this is `\\server\share`; for other paths it is the parent
/// folder.
///
/// ```
/// use openenv::domain::share_root;
///
/// assert_eq!(share_root("\\\\10.0.0.5\\Backups\\sql\\a.bak"), "\\\\10.0.0.5\\Backups");
/// assert_eq!(share_root("/mnt/backups/a.bak"), "/mnt/backups");
/// ```
pub fn share_root(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("\\\\") {
        let mut parts = rest.split('\\').filter(|p| !p.is_empty());
        return match (parts.next(), parts.next()) {
            (Some(server), Some(share)) => format!("\\\\{}\\{}", server, share),
            (Some(server), None) => format!("\\\\{}", server),
            _ => path.to_string(),
        };
    }
    let separator = separator_of(path);
    match path.trim_end_matches(separator).rsplit_once(separator) {
        Some(("", _)) => separator.to_string(),
        Some((parent, _)) => parent.to_string(),
        None => path.to_string(),
    }
}

/// The kind of a file inside a backup set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFileKind {
    /// Data file (`D`)
    Data,
    /// Transaction log (`L`)
    Log,
    /// Full-text catalogs, filestream and other kinds
    Other,
}

impl BackupFileKind {
    /// Maps the `Type` column of a backup file list.
    pub fn from_type_code(code: &str) -> Self {
        match code.trim() {
            "D" | "d" => BackupFileKind::Data,
            "L" | "l" => BackupFileKind::Log,
            _ => BackupFileKind::Other,
        }
    }
}

/// One file listed in a backup's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFileEntry {
    /// The logical name the engine uses for the file
    pub logical_name: String,
    /// The file kind
    pub kind: BackupFileKind,
}

impl BackupFileEntry {
    /// Creates a manifest entry.
    pub fn new(logical_name: impl Into<String>, kind: BackupFileKind) -> Self {
        Self {
            logical_name: logical_name.into(),
            kind,
        }
    }
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStage {
    /// Nothing has started
    Idle,
    /// Backing up the source database
    BackingUp,
    /// Copying the backup between shares
    Copying,
    /// Restoring into the destination database
    Restoring,
    /// Finished successfully
    Done,
    /// Aborted
    Failed,
}

impl fmt::Display for CloneStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloneStage::Idle => "idle",
            CloneStage::BackingUp => "backup",
            CloneStage::Copying => "copy",
            CloneStage::Restoring => "restore",
            CloneStage::Done => "done",
            CloneStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A progress notification emitted at each step boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneProgress {
    /// The stage the pipeline is in
    pub stage: CloneStage,
    /// Human readable detail
    pub message: String,
}

/// Outcome of a successful clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneReport {
    /// Backup written by the source server
    pub source_backup_path: String,
    /// Backup restored by the destination server
    pub destination_backup_path: String,
    /// Copy attempts needed
    pub copy_attempts: u32,
}
