//! Batch driver: one transaction per input file.
//!
//! Files are processed in path order. Each file's rows are loaded inside a
//! single transaction that commits only when every table loaded cleanly;
//! any error rolls the whole file back and the run moves on to the next
//! file. Only a storage connection failure stops the run.

use backon::{BlockingRetryable, ConstantBuilder};
use rusqlite::Connection;
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::time::Duration;

use songplay_core::model::{Artist, Song};
use songplay_core::schema::lookup::next_songplay_id;
use songplay_core::schema::Database;

use crate::config::Config;
use crate::dimensions::{build_time_dimension, build_user_dimension};
use crate::error::{EtlError, EtlResult};
use crate::facts::{resolve_facts, select_plays};
use crate::load::{copy_rows, CopyOptions};
use crate::records::{read_catalog_file, read_event_file};
use crate::scan::find_json_files;

/// Which source tree a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Catalog,
    Events,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Events => write!(f, "event"),
        }
    }
}

/// Rows written per table for one or more files.
///
/// Rows skipped by an ignore-on-conflict policy are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileSummary {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
    /// Songplays that resolved to a catalog song.
    pub matched: usize,
}

impl AddAssign for FileSummary {
    fn add_assign(&mut self, other: Self) {
        self.songs += other.songs;
        self.artists += other.artists;
        self.users += other.users;
        self.time += other.time;
        self.songplays += other.songplays;
        self.matched += other.matched;
    }
}

/// Transform and load one catalog file against an open transaction.
pub fn load_song_file(conn: &Connection, path: &Path, options: &CopyOptions) -> EtlResult<FileSummary> {
    let records = read_catalog_file(path)?;
    let (songs, artists): (Vec<Song>, Vec<Artist>) =
        records.into_iter().map(|r| r.into_rows()).unzip();

    // Songs reference artists
    let artists = copy_rows(conn, &artists, options)?;
    let songs = copy_rows(conn, &songs, options)?;

    Ok(FileSummary {
        songs,
        artists,
        ..FileSummary::default()
    })
}

/// Transform and load one event log file against an open transaction.
///
/// The catalog must already be loaded: plays are resolved against whatever
/// `songs` and `artists` hold at this point.
pub fn load_log_file(conn: &Connection, path: &Path, options: &CopyOptions) -> EtlResult<FileSummary> {
    let events = read_event_file(path)?;
    let plays = select_plays(&events)?;
    log::debug!(
        "{}: {} of {} events are plays",
        path.display(),
        plays.len(),
        events.len()
    );

    let time_marks = build_time_dimension(&plays)?;
    let users = build_user_dimension(&plays);

    // Songplays reference both dimensions
    let time = copy_rows(conn, &time_marks, options)?;
    let users = copy_rows(conn, &users, options)?;

    let first_id = next_songplay_id(conn)?;
    let facts = resolve_facts(conn, &plays, first_id)?;
    let matched = facts.iter().filter(|f| f.is_matched()).count();
    let songplays = copy_rows(conn, &facts, options)?;

    Ok(FileSummary {
        users,
        time,
        songplays,
        matched,
        ..FileSummary::default()
    })
}

/// A file whose transaction was rolled back.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: EtlError,
}

/// Outcome of loading one source tree.
#[derive(Debug)]
pub struct BatchReport {
    pub kind: SourceKind,
    pub files_found: usize,
    pub files_loaded: usize,
    pub failures: Vec<FileFailure>,
    pub totals: FileSummary,
}

impl BatchReport {
    fn new(kind: SourceKind, files_found: usize) -> Self {
        Self {
            kind,
            files_found,
            files_loaded: 0,
            failures: Vec::new(),
            totals: FileSummary::default(),
        }
    }

    /// Returns `true` when every file loaded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads source trees file by file.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    options: CopyOptions,
    retries: usize,
    retry_delay: Duration,
}

impl BatchRunner {
    #[must_use]
    pub fn new(options: CopyOptions) -> Self {
        Self {
            options,
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Build a runner from the configured buffer format and retry count.
    ///
    /// # Errors
    /// Returns an error if the configured delimiter is unusable.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.copy_options()?).with_retries(config.retries))
    }

    /// Re-run a file's transaction up to `retries` more times after a
    /// storage-level failure.
    #[must_use]
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Load one file in its own transaction.
    ///
    /// The transaction commits only if the whole file loads; on error it is
    /// dropped, which rolls it back.
    pub fn load_file(&self, db: &mut Database, path: &Path, kind: SourceKind) -> EtlResult<FileSummary> {
        let tx = db.transaction()?;
        let summary = match kind {
            SourceKind::Catalog => load_song_file(&tx, path, &self.options)?,
            SourceKind::Events => load_log_file(&tx, path, &self.options)?,
        };
        tx.commit().map_err(|e| EtlError::storage("commit", 0, e))?;
        Ok(summary)
    }

    fn load_file_with_retry(
        &self,
        db: &mut Database,
        path: &Path,
        kind: SourceKind,
    ) -> EtlResult<FileSummary> {
        if self.retries == 0 {
            return self.load_file(db, path, kind);
        }

        let backoff = ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(self.retries);

        (|| self.load_file(&mut *db, path, kind))
            .retry(backoff)
            .when(EtlError::is_retryable)
            .notify(|err, delay| {
                log::warn!(
                    "Retrying {} in {:?} after: {}",
                    path.display(),
                    delay,
                    err
                );
            })
            .call()
    }

    /// Load every `*.json` file under `root`.
    ///
    /// File-scoped failures are logged and collected in the report. A
    /// connection failure aborts the run and is returned as the error.
    pub fn run(&self, db: &mut Database, root: &Path, kind: SourceKind) -> EtlResult<BatchReport> {
        let files = find_json_files(root);
        let total = files.len();
        log::info!("{} {} files found in {}", total, kind, root.display());

        let mut report = BatchReport::new(kind, total);
        for (i, path) in files.into_iter().enumerate() {
            match self.load_file_with_retry(db, &path, kind) {
                Ok(summary) => {
                    report.files_loaded += 1;
                    report.totals += summary;
                    log::info!("{}/{} {} files processed", i + 1, total, kind);
                }
                Err(e) if e.is_fatal() => {
                    log::error!("Aborting run at {}: {}", path.display(), e);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("Skipping {}: {}", path.display(), e);
                    report.failures.push(FileFailure { path, error: e });
                }
            }
        }

        Ok(report)
    }

    /// Load the catalog tree, then the event tree.
    pub fn run_all(
        &self,
        db: &mut Database,
        song_root: &Path,
        log_root: &Path,
    ) -> EtlResult<(BatchReport, BatchReport)> {
        let catalog = self.run(db, song_root, SourceKind::Catalog)?;
        let events = self.run(db, log_root, SourceKind::Events)?;
        Ok((catalog, events))
    }
}
