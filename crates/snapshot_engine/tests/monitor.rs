use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use snapshot_engine::{
    fingerprint, ContentFingerprint, FailureKind, FetchError, FetchMetadata, FetchSettings,
    FetchedPage, Fetcher, MonitorError, MonitorSettings, ReqwestFetcher, RunOutcome,
    SnapshotMonitor, SnapshotStore, StoreLayout,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves whatever body was last queued, or a timeout when none is.
#[derive(Clone, Default)]
struct StubFetcher {
    body: Arc<Mutex<Option<String>>>,
}

impl StubFetcher {
    fn serve(&self, body: &str) {
        *self.body.lock().unwrap() = Some(body.to_string());
    }

    fn fail(&self) {
        *self.body.lock().unwrap() = None;
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let body = self.body.lock().unwrap().clone();
        match body {
            Some(text) => Ok(FetchedPage {
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    redirect_count: 0,
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    byte_len: text.len() as u64,
                    encoding_label: "UTF-8".to_string(),
                },
                text,
            }),
            None => Err(FetchError {
                kind: FailureKind::Timeout,
                message: "operation timed out".to_string(),
            }),
        }
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Monitor whose clock advances one day per run, starting at the 1st.
fn monitor_in(temp: &TempDir, fetcher: StubFetcher) -> SnapshotMonitor<StubFetcher> {
    monitor_logging::initialize_for_tests();
    let store = SnapshotStore::new(StoreLayout::under(temp.path()));
    let settings = MonitorSettings {
        url: "https://example.com/".to_string(),
    };
    let calls = AtomicU32::new(0);
    SnapshotMonitor::new(fetcher, store, settings)
        .with_clock(move || day(calls.fetch_add(1, Ordering::SeqCst) + 1))
}

fn archive_files(temp: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(temp.path().join("snapshots"))
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn first_run_is_always_a_change() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    fetcher.serve("<h1>Hello</h1>\n<p>World</p>\n");
    let monitor = monitor_in(&temp, fetcher);

    let outcome = monitor.run_once().await.unwrap();

    assert!(outcome.is_changed());
    assert_eq!(outcome.diff_reference(), "2024-06-01.diff.txt");
    assert_eq!(
        archive_files(&temp),
        vec!["2024-06-01.diff.txt", "2024-06-01.html", "latest.html"]
    );
    let diff = fs::read_to_string(temp.path().join("snapshots/2024-06-01.diff.txt")).unwrap();
    let body: Vec<&str> = diff.lines().skip(3).collect();
    assert_eq!(body, vec!["+<h1>Hello</h1>", "+<p>World</p>"]);
    assert_eq!(
        monitor.store().load_latest().unwrap(),
        "<h1>Hello</h1>\n<p>World</p>\n"
    );
}

#[tokio::test]
async fn unchanged_content_writes_nothing_on_second_run() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    fetcher.serve("same\n");
    let monitor = monitor_in(&temp, fetcher);

    let first = monitor.run_once().await.unwrap();
    let files_after_first = archive_files(&temp);
    let second = monitor.run_once().await.unwrap();

    assert!(first.is_changed());
    assert_eq!(
        second,
        RunOutcome::Unchanged {
            fingerprint: fingerprint("same\n")
        }
    );
    assert_eq!(second.diff_reference(), "");
    assert_eq!(second.status_message(), "No change detected.");
    assert_eq!(archive_files(&temp), files_after_first);
}

#[tokio::test]
async fn changed_run_records_fingerprint_and_latest() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    let monitor = monitor_in(&temp, fetcher.clone());

    fetcher.serve("A\nB\n");
    monitor.run_once().await.unwrap();
    fetcher.serve("A\nC\n");
    let outcome = monitor.run_once().await.unwrap();

    assert_eq!(outcome.diff_reference(), "2024-06-02.diff.txt");
    assert_eq!(outcome.fingerprint(), &fingerprint("A\nC\n"));
    assert_eq!(
        monitor.store().load_last_fingerprint().unwrap(),
        fingerprint("A\nC\n")
    );
    assert_eq!(monitor.store().load_latest().unwrap(), "A\nC\n");

    let diff = fs::read_to_string(temp.path().join("snapshots/2024-06-02.diff.txt")).unwrap();
    assert_eq!(
        diff,
        "--- previous.html\n+++ current.html\n@@ -1,2 +1,2 @@\n A\n-B\n+C"
    );
}

#[tokio::test]
async fn single_edit_in_long_page_gives_one_hunk_with_context() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    let monitor = monitor_in(&temp, fetcher.clone());

    let mut lines: Vec<String> = (1..=50).map(|n| format!("<li>item {n}</li>")).collect();
    fetcher.serve(&lines.join("\n"));
    monitor.run_once().await.unwrap();
    lines[24] = "<li>item 25 (updated)</li>".to_string();
    fetcher.serve(&lines.join("\n"));
    let outcome = monitor.run_once().await.unwrap();

    let diff = fs::read_to_string(
        temp.path()
            .join("snapshots")
            .join(outcome.diff_reference()),
    )
    .unwrap();
    let expected = [
        "--- previous.html",
        "+++ current.html",
        "@@ -22,7 +22,7 @@",
        " <li>item 22</li>",
        " <li>item 23</li>",
        " <li>item 24</li>",
        "-<li>item 25</li>",
        "+<li>item 25 (updated)</li>",
        " <li>item 26</li>",
        " <li>item 27</li>",
        " <li>item 28</li>",
    ]
    .join("\n");
    assert_eq!(diff, expected);
}

#[tokio::test]
async fn same_day_changes_overwrite_the_days_files() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    let store = SnapshotStore::new(StoreLayout::under(temp.path()));
    let monitor = SnapshotMonitor::new(
        fetcher.clone(),
        store,
        MonitorSettings {
            url: "https://example.com/".to_string(),
        },
    )
    .with_clock(|| day(15));

    fetcher.serve("morning\n");
    monitor.run_once().await.unwrap();
    fetcher.serve("evening\n");
    let outcome = monitor.run_once().await.unwrap();

    assert_eq!(outcome.diff_reference(), "2024-06-15.diff.txt");
    assert_eq!(
        archive_files(&temp),
        vec!["2024-06-15.diff.txt", "2024-06-15.html", "latest.html"]
    );
    let snapshot = monitor.store().load_dated(day(15)).unwrap().unwrap();
    assert_eq!(snapshot.content, "evening\n");
    assert!(snapshot.diff.unwrap().contains("-morning"));
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    let monitor = monitor_in(&temp, fetcher.clone());

    fetcher.serve("stable\n");
    monitor.run_once().await.unwrap();
    let files_before = archive_files(&temp);

    fetcher.fail();
    let err = monitor.run_once().await.unwrap_err();

    match err {
        MonitorError::Fetch(fetch) => assert_eq!(fetch.kind, FailureKind::Timeout),
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert_eq!(monitor.store().load_latest().unwrap(), "stable\n");
    assert_eq!(
        monitor.store().load_last_fingerprint().unwrap(),
        fingerprint("stable\n")
    );
    assert_eq!(archive_files(&temp), files_before);
}

#[tokio::test]
async fn fetch_failure_on_first_run_creates_nothing() {
    let temp = TempDir::new().unwrap();
    let monitor = monitor_in(&temp, StubFetcher::default());

    assert!(monitor.run_once().await.is_err());
    assert_eq!(
        monitor.store().load_last_fingerprint().unwrap(),
        ContentFingerprint::empty()
    );
    assert!(!temp.path().join("snapshots").exists());
}

#[tokio::test]
async fn runs_end_to_end_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>live</p>\n", "text/html"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let monitor = SnapshotMonitor::new(
        ReqwestFetcher::new(FetchSettings::default()),
        SnapshotStore::new(StoreLayout::under(temp.path())),
        MonitorSettings {
            url: format!("{}/page", server.uri()),
        },
    )
    .with_clock(|| day(20));

    let first = monitor.run_once().await.unwrap();
    let second = monitor.run_once().await.unwrap();

    assert_eq!(first.diff_reference(), "2024-06-20.diff.txt");
    assert!(!second.is_changed());
    assert_eq!(monitor.store().load_latest().unwrap(), "<p>live</p>\n");
}

#[test]
fn run_blocking_drives_a_cycle_without_an_outer_runtime() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::default();
    fetcher.serve("sync\n");
    let monitor = monitor_in(&temp, fetcher);

    let outcome = monitor.run_blocking().unwrap();
    assert_eq!(outcome.diff_reference(), "2024-06-01.diff.txt");
    assert_eq!(
        outcome.status_message(),
        "Change detected. Saving snapshot and diff."
    );
}
