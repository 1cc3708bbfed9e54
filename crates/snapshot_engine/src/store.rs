use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use monitor_logging::{monitor_debug, monitor_info};

use crate::diff::unified_diff;
use crate::fingerprint::ContentFingerprint;
use crate::persist::{ensure_output_dir, read_optional, AtomicFileWriter, StorageError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const RAW_SUFFIX: &str = ".html";
const DIFF_SUFFIX: &str = ".diff.txt";
const PREVIOUS_LABEL: &str = "previous.html";
const CURRENT_LABEL: &str = "current.html";

/// Where the store keeps its three kinds of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Holds `<date>.html` and `<date>.diff.txt`.
    pub archive_dir: PathBuf,
    pub latest_file: PathBuf,
    pub fingerprint_file: PathBuf,
}

impl StoreLayout {
    /// `root/snapshots/` for the archive and latest content, `root/last_hash.txt` for the fingerprint.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let archive_dir = root.join("snapshots");
        Self {
            latest_file: archive_dir.join("latest.html"),
            fingerprint_file: root.join("last_hash.txt"),
            archive_dir,
        }
    }
}

/// Names the diff written by a successful [`SnapshotStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReference {
    pub file_name: String,
    pub path: PathBuf,
}

impl fmt::Display for DiffReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}

/// One day's archived capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedSnapshot {
    pub date: NaiveDate,
    pub content: String,
    /// `None` when the diff record is missing from the archive.
    pub diff: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: StoreLayout,
}

impl SnapshotStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Content of the most recent snapshot, empty before the first one.
    pub fn load_latest(&self) -> Result<String, StorageError> {
        Ok(read_optional(&self.layout.latest_file)?.unwrap_or_default())
    }

    /// Fingerprint recorded by the last change, empty before the first one.
    pub fn load_last_fingerprint(&self) -> Result<ContentFingerprint, StorageError> {
        Ok(read_optional(&self.layout.fingerprint_file)?
            .map(|text| ContentFingerprint::from_recorded(&text))
            .unwrap_or_default())
    }

    /// Record a changed page under `today`.
    ///
    /// Writes the raw content and the diff against the previous latest content,
    /// then replaces the latest content and fingerprint. Each file is replaced
    /// atomically, the sequence as a whole is not: a failure part way leaves the
    /// earlier records written.
    pub fn save(
        &self,
        new_content: &str,
        new_fingerprint: &ContentFingerprint,
        today: NaiveDate,
    ) -> Result<DiffReference, StorageError> {
        ensure_output_dir(&self.layout.archive_dir)?;
        let archive = AtomicFileWriter::new(self.layout.archive_dir.clone());
        let stamp = today.format(DATE_FORMAT).to_string();

        let raw_path = archive.write(&format!("{stamp}{RAW_SUFFIX}"), new_content)?;
        monitor_debug!("Wrote snapshot {:?}", raw_path);

        let previous = self.load_latest()?;
        let diff = unified_diff(&previous, new_content, PREVIOUS_LABEL, CURRENT_LABEL);
        let diff_name = format!("{stamp}{DIFF_SUFFIX}");
        let diff_path = archive.write(&diff_name, &diff)?;
        monitor_debug!("Wrote diff {:?} ({} lines)", diff_path, diff.lines().count());

        write_record(&self.layout.latest_file, new_content)?;
        write_record(&self.layout.fingerprint_file, new_fingerprint.as_str())?;
        monitor_info!("Saved snapshot for {} ({})", stamp, new_fingerprint);

        Ok(DiffReference {
            file_name: diff_name,
            path: diff_path,
        })
    }

    /// Dates present in the archive, oldest first.
    pub fn archived_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let read_error = |source: io::Error| StorageError::Read {
            path: self.layout.archive_dir.clone(),
            source,
        };
        let entries = match fs::read_dir(&self.layout.archive_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(read_error(err)),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(read_error)?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(RAW_SUFFIX)) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    /// The capture stored for `date`, if any.
    pub fn load_dated(&self, date: NaiveDate) -> Result<Option<DatedSnapshot>, StorageError> {
        let stamp = date.format(DATE_FORMAT).to_string();
        let dir = &self.layout.archive_dir;
        let Some(content) = read_optional(&dir.join(format!("{stamp}{RAW_SUFFIX}")))? else {
            return Ok(None);
        };
        let diff = read_optional(&dir.join(format!("{stamp}{DIFF_SUFFIX}")))?;
        Ok(Some(DatedSnapshot {
            date,
            content,
            diff,
        }))
    }
}

fn write_record(path: &Path, content: &str) -> Result<PathBuf, StorageError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::Directory {
            path: path.to_path_buf(),
            message: "record path has no file name".into(),
        })?;
    AtomicFileWriter::for_file(path).write(file_name, content)
}
