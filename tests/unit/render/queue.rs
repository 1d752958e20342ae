use std::time::{SystemTime, UNIX_EPOCH};

use super::*;
use crate::encode::memory::InMemoryEngine;
use crate::scene::model::Element;

struct Fixture {
    root: PathBuf,
    engine: Arc<InMemoryEngine>,
    queue: RenderQueue,
    options: CompositionOptions,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn fixture(tag: &str, engine: InMemoryEngine) -> Fixture {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!(
        "framecraft_queue_{tag}_{}_{nanos}",
        std::process::id()
    ));
    let engine = Arc::new(engine);
    let cache = Arc::new(CacheManager::new(root.join("cache"), root.join("out.mp4")));
    let queue = RenderQueue::new(
        engine.clone(),
        Arc::new(JobTable::new()),
        cache,
        RetryPolicy {
            max_retries: 2,
            pause: Duration::from_millis(1),
        },
    );
    Fixture {
        root,
        engine,
        queue,
        options: CompositionOptions::default(),
    }
}

fn text_scenes(n: usize) -> Vec<Scene> {
    (0..n)
        .map(|i| {
            let mut s = Scene::new();
            s.set_duration(2.0).unwrap();
            s.add_element(Element::text(format!("scene {i}")));
            s
        })
        .collect()
}

#[test]
fn renders_every_scene_in_order() {
    let f = fixture("order", InMemoryEngine::new());
    let scenes = text_scenes(3);
    let artifacts = f
        .queue
        .run_scenes(&scenes, &f.options, 2, &CancelToken::new(), &|_| {})
        .unwrap();
    assert_eq!(
        artifacts.iter().map(|a| a.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(artifacts.iter().all(|a| a.produced && a.path.is_file()));
    assert_eq!(f.engine.invocation_count(), 3);
    // Side files are cleaned up after each invocation.
    for inv in f.engine.invocations() {
        for (p, _) in inv.side_files {
            assert!(!p.exists());
        }
    }
}

#[test]
fn completed_artifacts_are_reused() {
    let f = fixture("reuse", InMemoryEngine::new());
    let scenes = text_scenes(2);
    let token = CancelToken::new();
    f.queue
        .run_scenes(&scenes, &f.options, 1, &token, &|_| {})
        .unwrap();
    let again = f
        .queue
        .run_scenes(&scenes, &f.options, 1, &token, &|_| {})
        .unwrap();
    assert!(again.iter().all(|a| a.cache_hit));
    assert_eq!(f.engine.invocation_count(), 2);
    assert_eq!(f.queue.counts().cache_hits, 2);
}

#[test]
fn retryable_failures_are_retried() {
    let f = fixture("retry", InMemoryEngine::new());
    f.engine
        .fail_with("scene 0", [FramecraftError::external_retryable("crashed")]);
    let artifacts = f
        .queue
        .run_scenes(&text_scenes(1), &f.options, 1, &CancelToken::new(), &|_| {})
        .unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(f.engine.invocation_count(), 2);
    assert_eq!(f.queue.counts().retries, 1);
}

#[test]
fn retries_are_bounded() {
    let f = fixture("bounded", InMemoryEngine::new());
    f.engine.fail_with(
        "scene 0",
        (0..5).map(|_| FramecraftError::external_retryable("crashed")),
    );
    let err = f
        .queue
        .run_scenes(&text_scenes(1), &f.options, 1, &CancelToken::new(), &|_| {})
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(f.engine.invocation_count(), 3);
}

#[test]
fn terminal_failure_aborts_and_discards_siblings() {
    let f = fixture("abort", InMemoryEngine::new());
    f.engine
        .fail_with("scene 2", [FramecraftError::external_terminal("bad args")]);
    let done = AtomicUsize::new(0);
    let err = f
        .queue
        .run_scenes(&text_scenes(3), &f.options, 1, &CancelToken::new(), &|n| {
            done.store(n, Ordering::SeqCst);
        })
        .unwrap_err();
    assert!(matches!(
        err,
        FramecraftError::ExternalProcess {
            retryable: false,
            ..
        }
    ));
    assert_eq!(done.load(Ordering::SeqCst), 2);
    assert_eq!(f.engine.count_labelled("scene 2"), 1);
    assert!(f.queue.cache().held().is_empty());
    let leftovers = std::fs::read_dir(f.queue.cache().cache_dir())
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn missing_source_is_not_retried() {
    let f = fixture("missing", InMemoryEngine::new());
    let mut s = Scene::new();
    s.add_element(Element::video("/definitely/missing/clip.mp4"));
    let err = f
        .queue
        .run_scenes(&[s], &f.options, 1, &CancelToken::new(), &|_| {})
        .unwrap_err();
    assert!(matches!(err, FramecraftError::ResourceNotFound { .. }));
    assert_eq!(f.engine.invocation_count(), 0);
}

#[test]
fn concurrency_is_bounded() {
    let f = fixture("bound", InMemoryEngine::with_delay(Duration::from_millis(40)));
    f.queue
        .run_scenes(&text_scenes(6), &f.options, 2, &CancelToken::new(), &|_| {})
        .unwrap();
    assert!(f.engine.peak_concurrency() <= 2);

    let g = fixture("serial", InMemoryEngine::with_delay(Duration::from_millis(10)));
    g.queue
        .run_scenes(&text_scenes(3), &g.options, 1, &CancelToken::new(), &|_| {})
        .unwrap();
    assert_eq!(g.engine.peak_concurrency(), 1);
}

#[test]
fn same_fingerprint_in_flight_encodes_once() {
    let f = fixture("dedup", InMemoryEngine::with_delay(Duration::from_millis(150)));
    let scenes = text_scenes(1);
    let job = SceneJob::prepare(0, &scenes[0], &f.options, f.engine.as_ref()).unwrap();
    let token = CancelToken::new();

    let (a, b) = std::thread::scope(|s| {
        let first = s.spawn(|| f.queue.execute(&job, &f.options, &token));
        while f.engine.invocation_count() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        let second = s.spawn(|| f.queue.execute(&job, &f.options, &token));
        (first.join().unwrap(), second.join().unwrap())
    });
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(f.engine.invocation_count(), 1);
    assert_eq!(a.path, b.path);
    assert!(a.produced != b.produced);
}

#[test]
fn cancellation_stops_in_flight_job_and_removes_partial() {
    let f = fixture("cancel", InMemoryEngine::with_delay(Duration::from_secs(5)));
    let token = CancelToken::new();
    let scenes = text_scenes(1);
    let err = std::thread::scope(|s| {
        let h = s.spawn(|| f.queue.run_scenes(&scenes, &f.options, 1, &token, &|_| {}));
        while f.engine.invocation_count() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        token.cancel();
        h.join().unwrap().unwrap_err()
    });
    assert!(err.is_cancelled());
    let inv = &f.engine.invocations()[0];
    assert!(!inv.output.exists());
}

#[test]
fn zero_concurrency_is_rejected() {
    let f = fixture("zero", InMemoryEngine::new());
    assert!(matches!(
        f.queue
            .run_scenes(&text_scenes(1), &f.options, 0, &CancelToken::new(), &|_| {}),
        Err(FramecraftError::Config(_))
    ));
}

fn sibling_queue(f: &Fixture, table: &Arc<JobTable>) -> RenderQueue {
    RenderQueue::new(
        f.engine.clone(),
        Arc::clone(table),
        Arc::new(CacheManager::new(f.root.join("cache"), f.root.join("out.mp4"))),
        RetryPolicy::DEFAULT,
    )
}

#[test]
fn queues_sharing_a_cache_dir_encode_once_and_keep_shared_artifacts() {
    let f = fixture("shared", InMemoryEngine::with_delay(Duration::from_millis(150)));
    let table = Arc::new(JobTable::new());
    let first = sibling_queue(&f, &table);
    let second = sibling_queue(&f, &table);
    let scenes = text_scenes(1);
    let job = SceneJob::prepare(0, &scenes[0], &f.options, f.engine.as_ref()).unwrap();
    let token = CancelToken::new();

    let (a, b) = std::thread::scope(|s| {
        let one = s.spawn(|| first.execute(&job, &f.options, &token));
        let two = s.spawn(|| second.execute(&job, &f.options, &token));
        (one.join().unwrap().unwrap(), two.join().unwrap().unwrap())
    });
    assert_eq!(f.engine.invocation_count(), 1);
    assert_eq!(a.path, b.path);

    // Whoever wrote it, the artifact lives until its last holder lets go.
    first.cache().cleanup();
    assert!(a.path.is_file());
    second.cache().cleanup();
    assert!(!a.path.exists());
}

#[test]
fn follower_takes_over_when_its_leader_is_cancelled() {
    let f = fixture("takeover", InMemoryEngine::with_delay(Duration::from_millis(300)));
    let table = Arc::new(JobTable::new());
    let leader = sibling_queue(&f, &table);
    let follower = sibling_queue(&f, &table);
    let scenes = text_scenes(1);
    let job = SceneJob::prepare(0, &scenes[0], &f.options, f.engine.as_ref()).unwrap();
    let leader_token = CancelToken::new();
    let follower_token = CancelToken::new();

    let (a, b) = std::thread::scope(|s| {
        let first = s.spawn(|| leader.execute(&job, &f.options, &leader_token));
        while f.engine.invocation_count() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        let second = s.spawn(|| follower.execute(&job, &f.options, &follower_token));
        std::thread::sleep(Duration::from_millis(50));
        leader_token.cancel();
        (first.join().unwrap(), second.join().unwrap())
    });
    assert!(a.unwrap_err().is_cancelled());
    let b = b.unwrap();
    assert!(b.produced);
    assert!(b.path.is_file());
    assert_eq!(f.engine.invocation_count(), 2);
    assert!(leader.cache().held().is_empty());
}
