use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use monitor_logging::{monitor_debug, monitor_info};
use thiserror::Error;

use crate::fetch::Fetcher;
use crate::fingerprint::{fingerprint, has_changed, ContentFingerprint};
use crate::persist::StorageError;
use crate::store::{DiffReference, SnapshotStore};
use crate::FetchError;

/// Supplies the calendar date that keys the archive.
pub type TodayFn = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("could not start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Changed {
        fingerprint: ContentFingerprint,
        diff: DiffReference,
    },
    Unchanged {
        fingerprint: ContentFingerprint,
    },
}

impl RunOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, RunOutcome::Changed { .. })
    }

    /// Diff file name for a change, empty otherwise.
    pub fn diff_reference(&self) -> &str {
        match self {
            RunOutcome::Changed { diff, .. } => &diff.file_name,
            RunOutcome::Unchanged { .. } => "",
        }
    }

    pub fn fingerprint(&self) -> &ContentFingerprint {
        match self {
            RunOutcome::Changed { fingerprint, .. } | RunOutcome::Unchanged { fingerprint } => {
                fingerprint
            }
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self {
            RunOutcome::Changed { .. } => "Change detected. Saving snapshot and diff.",
            RunOutcome::Unchanged { .. } => "No change detected.",
        }
    }
}

/// Fetch, compare against the last fingerprint, and archive on change.
pub struct SnapshotMonitor<F> {
    fetcher: F,
    store: SnapshotStore,
    settings: MonitorSettings,
    today: TodayFn,
}

impl<F: Fetcher> SnapshotMonitor<F> {
    pub fn new(fetcher: F, store: SnapshotStore, settings: MonitorSettings) -> Self {
        Self {
            fetcher,
            store,
            settings,
            today: Arc::new(|| Utc::now().date_naive()),
        }
    }

    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One fetch-compare-maybe-save cycle.
    ///
    /// Nothing is written unless the fetch succeeds and the fingerprint differs.
    pub async fn run_once(&self) -> Result<RunOutcome, MonitorError> {
        let page = self.fetcher.fetch(&self.settings.url).await?;
        let new_fingerprint = fingerprint(&page.text);
        let old_fingerprint = self.store.load_last_fingerprint()?;
        monitor_debug!(
            "Fingerprint {} (last recorded: {})",
            new_fingerprint,
            if old_fingerprint.is_empty() { "none" } else { old_fingerprint.as_str() }
        );

        if !has_changed(&new_fingerprint, &old_fingerprint) {
            monitor_info!("No change detected for {}", self.settings.url);
            return Ok(RunOutcome::Unchanged {
                fingerprint: new_fingerprint,
            });
        }

        monitor_info!("Change detected for {}; saving snapshot and diff", self.settings.url);
        let diff = self
            .store
            .save(&page.text, &new_fingerprint, (self.today)())?;
        monitor_info!("Diff written to {:?}", diff.path);
        Ok(RunOutcome::Changed {
            fingerprint: new_fingerprint,
            diff,
        })
    }

    /// Runs [`Self::run_once`] to completion on a single-threaded runtime.
    pub fn run_blocking(&self) -> Result<RunOutcome, MonitorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(MonitorError::Runtime)?;
        runtime.block_on(self.run_once())
    }
}
