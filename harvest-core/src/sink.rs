//! Record sinks and the inventory of already harvested repositories
//!
//! A sink receives one complete batch per repository. Its inventory is what
//! makes a sweep resumable: repositories that already have a batch are not
//! harvested again.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::record::{DerivedRecord, RepositoryId, RECORD_COLUMNS};
use crate::Result;

/// Repositories harvested by an earlier run, keyed by file stem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    keys: HashSet<String>,
}

impl ProcessedSet {
    /// Build a set from batch keys (`owner_name`)
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, repo: &RepositoryId) -> bool {
        self.keys.contains(&repo.file_stem())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Destination for completed per-repository batches
pub trait RecordSink {
    /// Repositories that already have a batch in this sink
    fn inventory(&self) -> Result<ProcessedSet>;

    /// Persist the full batch for one repository
    fn write_batch(&mut self, repo: &RepositoryId, records: &[DerivedRecord]) -> Result<()>;
}

/// Writes one `owner_name.csv` file per repository into a directory
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
}

impl CsvDirectorySink {
    /// Open (and create if needed) the output directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final location of a repository's batch
    pub fn path_for(&self, repo: &RepositoryId) -> PathBuf {
        self.dir.join(format!("{}.csv", repo.file_stem()))
    }
}

impl RecordSink for CsvDirectorySink {
    fn inventory(&self) -> Result<ProcessedSet> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        debug!(dir = %self.dir.display(), count = keys.len(), "Loaded output inventory");
        Ok(ProcessedSet::from_keys(keys))
    }

    fn write_batch(&mut self, repo: &RepositoryId, records: &[DerivedRecord]) -> Result<()> {
        let target = self.path_for(repo);
        // A half-written file must never look like a finished batch
        let staging = self.dir.join(format!(".{}.csv.tmp", repo.file_stem()));

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&staging)?;
        writer.write_record(RECORD_COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&staging, &target)?;

        info!(
            repository = %repo,
            records = records.len(),
            path = %target.display(),
            "Saved repository batch"
        );
        Ok(())
    }
}
