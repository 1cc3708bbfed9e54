//! Snapshot engine: fetch a page, detect changes, archive dated snapshots and diffs.
mod decode;
mod diff;
mod fetch;
mod fingerprint;
mod monitor;
mod persist;
mod store;
mod types;

pub use decode::{decode_body, DecodedBody};
pub use diff::unified_diff;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use fingerprint::{fingerprint, has_changed, ContentFingerprint};
pub use monitor::{MonitorError, MonitorSettings, RunOutcome, SnapshotMonitor, TodayFn};
pub use persist::{ensure_output_dir, read_optional, AtomicFileWriter, StorageError};
pub use store::{DatedSnapshot, DiffReference, SnapshotStore, StoreLayout};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchedPage};
