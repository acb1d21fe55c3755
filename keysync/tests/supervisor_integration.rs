//! Integration tests for the synchronization engine.
//!
//! These tests run the real supervisor, follower, scanner and Tantivy sink
//! against a scripted in-memory source store, so the convergence properties
//! are exercised end to end without an external cluster.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::timeout;

use keysync::errors::SyncError;
use keysync::follower::{ChangeFollower, FollowerState};
use keysync::scanner::{ReconciliationScanner, ScannerState};
use keysync::store::{ChangeStream, SourceStore};
use keysync::supervisor::SyncSupervisor;
use keysync_repository::{IndexConfig, IndexSink, TantivyIndexSink};
use keysync_shared::{ChangeEvent, Entry};

const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// One scripted watch subscription: events to deliver, then either stay open
/// or terminate (simulating a dropped stream).
struct WatchScript {
    items: Vec<Result<ChangeEvent, SyncError>>,
    stay_open: bool,
}

/// Scripted in-memory source store.
///
/// Watch subscriptions are served from a queue of scripts; scans are served
/// from a queue of results, falling back to `snapshot` once exhausted.
struct ScriptedStore {
    watch_scripts: Mutex<VecDeque<WatchScript>>,
    scan_results: Mutex<VecDeque<Result<Vec<Entry>, SyncError>>>,
    snapshot: Mutex<Vec<Entry>>,
    watch_calls: AtomicUsize,
    scan_calls: AtomicUsize,
}

impl ScriptedStore {
    fn new(
        watch_scripts: Vec<WatchScript>,
        scan_results: Vec<Result<Vec<Entry>, SyncError>>,
        snapshot: Vec<Entry>,
    ) -> Self {
        Self {
            watch_scripts: Mutex::new(watch_scripts.into()),
            scan_results: Mutex::new(scan_results.into()),
            snapshot: Mutex::new(snapshot),
            watch_calls: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceStore for ScriptedStore {
    async fn watch(&self, _prefix: &str) -> Result<ChangeStream, SyncError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);

        let script = self
            .watch_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WatchScript {
                items: vec![],
                stay_open: true,
            });

        let head = futures::stream::iter(script.items);
        if script.stay_open {
            Ok(Box::pin(head.chain(futures::stream::pending())))
        } else {
            Ok(Box::pin(head))
        }
    }

    async fn scan(&self, _prefix: &str) -> Result<Vec<Entry>, SyncError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);

        match self.scan_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.snapshot.lock().unwrap().clone()),
        }
    }
}

fn new_supervisor(
    store: Arc<ScriptedStore>,
    sink: Arc<TantivyIndexSink>,
) -> SyncSupervisor {
    let store: Arc<dyn SourceStore> = store;
    let sink: Arc<dyn IndexSink> = sink;

    let follower = ChangeFollower::new(Arc::clone(&store), Arc::clone(&sink), "test/");
    let scanner = ReconciliationScanner::new(store, sink, "test/", SCAN_INTERVAL);

    SyncSupervisor::new(follower, scanner)
}

fn new_sink() -> Arc<TantivyIndexSink> {
    Arc::new(TantivyIndexSink::new(IndexConfig::default()).unwrap())
}

async fn wait_for_doc(sink: &TantivyIndexSink, id: &str) -> keysync_shared::IndexDocument {
    for _ in 0..10_000 {
        if let Some(doc) = sink.fetch(id).await.unwrap() {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document {id} never appeared in the index");
}

async fn shut_down(supervisor: &SyncSupervisor, handle: tokio::task::JoinHandle<Result<(), SyncError>>) {
    supervisor.shutdown();
    timeout(Duration::from_secs(30), handle)
        .await
        .expect("supervisor did not shut down in time")
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_scan_and_live_events_converge_on_highest_revision() {
    // Store holds a=1@10, b=2@11; the live stream then overwrites a at
    // revision 15 and later replays the stale revision 10.
    let store = Arc::new(ScriptedStore::new(
        vec![WatchScript {
            items: vec![
                Ok(ChangeEvent::put("test/a", b"9".to_vec(), 15)),
                Ok(ChangeEvent::put("test/a", b"1".to_vec(), 10)),
            ],
            stay_open: true,
        }],
        vec![],
        vec![
            Entry::new("test/a", b"1".to_vec(), 10),
            Entry::new("test/b", b"2".to_vec(), 11),
        ],
    ));
    let sink = new_sink();
    let supervisor = Arc::new(new_supervisor(store, Arc::clone(&sink)));

    let runner = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move { runner.run().await });

    // Past the first scan interval both keys must be present.
    tokio::time::sleep(SCAN_INTERVAL + Duration::from_secs(1)).await;
    let doc_b = wait_for_doc(&sink, "test/b").await;
    assert_eq!(doc_b.body, b"2");
    assert_eq!(doc_b.revision, 11);

    // Neither the scan's older copy nor the stale replay may regress `a`.
    let doc_a = wait_for_doc(&sink, "test/a").await;
    assert_eq!(doc_a.body, b"9");
    assert_eq!(doc_a.revision, 15);

    shut_down(&supervisor, handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_heals_gap_after_stream_drop() {
    // The first stream dies after one event; k2 is written during the gap
    // and only ever appears in the snapshot.
    let store = Arc::new(ScriptedStore::new(
        vec![
            WatchScript {
                items: vec![Ok(ChangeEvent::put("test/k1", b"v1".to_vec(), 1))],
                stay_open: false,
            },
            WatchScript {
                items: vec![],
                stay_open: true,
            },
        ],
        vec![],
        vec![
            Entry::new("test/k1", b"v1".to_vec(), 1),
            Entry::new("test/k2", b"v2".to_vec(), 2),
        ],
    ));
    let sink = new_sink();
    let supervisor = Arc::new(new_supervisor(Arc::clone(&store), Arc::clone(&sink)));
    let follower_state = supervisor.follower_state();

    let runner = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move { runner.run().await });

    let doc = wait_for_doc(&sink, "test/k1").await;
    assert_eq!(doc.revision, 1);

    // The gap event was never replayed, yet the next scan converges the index.
    tokio::time::sleep(SCAN_INTERVAL + Duration::from_secs(1)).await;
    let doc = wait_for_doc(&sink, "test/k2").await;
    assert_eq!(doc.body, b"v2");
    assert_eq!(doc.revision, 2);

    // The follower re-subscribed on its own and is streaming again.
    assert!(store.watch_calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(*follower_state.borrow(), FollowerState::Streaming);

    shut_down(&supervisor, handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_scan_does_not_stop_follower_or_next_tick() {
    let store = Arc::new(ScriptedStore::new(
        vec![WatchScript {
            items: vec![Ok(ChangeEvent::put("test/live", b"y".to_vec(), 7))],
            stay_open: true,
        }],
        vec![Err(SyncError::store("store unavailable"))],
        vec![Entry::new("test/scanned", b"x".to_vec(), 5)],
    ));
    let sink = new_sink();
    let supervisor = Arc::new(new_supervisor(Arc::clone(&store), Arc::clone(&sink)));

    let runner = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move { runner.run().await });

    // The follower keeps indexing while the first scan fails.
    let doc = wait_for_doc(&sink, "test/live").await;
    assert_eq!(doc.revision, 7);

    tokio::time::sleep(SCAN_INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(store.scan_calls.load(Ordering::SeqCst), 1);
    assert!(sink.fetch("test/scanned").await.unwrap().is_none());

    // Tick K failed; tick K+1 indexes normally.
    tokio::time::sleep(SCAN_INTERVAL).await;
    let doc = wait_for_doc(&sink, "test/scanned").await;
    assert_eq!(doc.revision, 5);

    shut_down(&supervisor, handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_delete_event_wins_over_stale_scan_entry() {
    // The snapshot still contains the key at an old revision; the live
    // stream deletes it at a higher one. Scans after the delete must not
    // resurrect it.
    let store = Arc::new(ScriptedStore::new(
        vec![WatchScript {
            items: vec![Ok(ChangeEvent::delete("test/gone", 20))],
            stay_open: true,
        }],
        vec![],
        vec![Entry::new("test/gone", b"old".to_vec(), 12)],
    ));
    let sink = new_sink();
    let supervisor = Arc::new(new_supervisor(Arc::clone(&store), Arc::clone(&sink)));

    let runner = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move { runner.run().await });

    // Let two scan ticks replay the stale snapshot entry.
    tokio::time::sleep(SCAN_INTERVAL * 2 + Duration::from_secs(1)).await;
    assert!(store.scan_calls.load(Ordering::SeqCst) >= 2);
    assert!(sink.fetch("test/gone").await.unwrap().is_none());

    shut_down(&supervisor, handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_clean_with_idle_workers() {
    let store = Arc::new(ScriptedStore::new(vec![], vec![], vec![]));
    let sink = new_sink();
    let supervisor = Arc::new(new_supervisor(store, Arc::clone(&sink)));
    let follower_state = supervisor.follower_state();
    let scanner_state = supervisor.scanner_state();

    let runner = Arc::clone(&supervisor);
    let handle = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shut_down(&supervisor, handle).await;

    assert_eq!(*follower_state.borrow(), FollowerState::Stopped);
    assert_eq!(*scanner_state.borrow(), ScannerState::Stopped);
}
