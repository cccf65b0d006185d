// tests/watch_engine.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use builddag::errors::{BuildError, Result};
use builddag::fs::mock::MockFileSystem;
use builddag::pipeline::{CompilationPipeline, PathSpec};
use builddag::types::TriggerWhileRunningBehaviour;
use builddag::watch::{WatchEngine, WatchEvent, WatchSubscription};
use builddag_test_utils::fakes::{FakeTransform, RecordingReporter};
use builddag_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

fn changed(paths: &[&str]) -> WatchEvent {
    WatchEvent::Changed(paths.iter().map(PathBuf::from).collect())
}

/// Subscription that counts invocations and sleeps for `delay` each time.
fn counting(name: &str, include: &str, delay: Duration) -> (WatchSubscription, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sub = WatchSubscription::new(name, PathSpec::new(include, &[]).unwrap(), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Result::Ok(())
        }
    });
    (sub, calls)
}

#[tokio::test]
async fn script_change_rebuilds_only_the_script_pipeline() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/main.coffee", "main");
    fs.add_file("style/site.styl", "body");

    let reporter = RecordingReporter::new();
    let scripts_transform = Arc::new(FakeTransform::new());
    let styles_transform = Arc::new(FakeTransform::new());

    let scripts = CompilationPipeline::new(
        "scripts",
        PathSpec::new("src/**/*.coffee", &[]).unwrap(),
        scripts_transform.clone(),
        Arc::new(fs.clone()),
        ".",
        "./lib",
    )
    .with_extension(Some("js".to_string()))
    .with_reporter(reporter.clone());
    let styles = CompilationPipeline::new(
        "styles",
        PathSpec::new("style/**/*.styl", &[]).unwrap(),
        styles_transform.clone(),
        Arc::new(fs.clone()),
        ".",
        "./lib",
    )
    .with_extension(Some("css".to_string()))
    .with_reporter(reporter.clone());

    let engine = WatchEngine::new(
        ".",
        vec![
            WatchSubscription::for_pipeline(scripts.spec().clone(), scripts),
            WatchSubscription::for_pipeline(styles.spec().clone(), styles),
        ],
    );

    let (tx, rx) = mpsc::unbounded_channel();
    fs.add_file("src/main.coffee", "main v2");
    tx.send(changed(&["src/main.coffee"])).unwrap();
    drop(tx);

    with_timeout(engine.run(rx)).await.unwrap();

    assert_eq!(reporter.batch_count("scripts"), 1);
    assert_eq!(reporter.batch_count("styles"), 0);
    assert_eq!(styles_transform.calls(), 0);
    assert_eq!(fs.contents("lib/main.js"), Some(b"MAIN V2".to_vec()));
}

#[tokio::test]
async fn one_batch_triggers_each_matching_subscription_once() {
    let (scripts, script_calls) = counting("scripts", "src/**/*.coffee", Duration::ZERO);
    let (styles, style_calls) = counting("styles", "style/**/*.styl", Duration::ZERO);
    let engine = WatchEngine::new(".", vec![scripts, styles]);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(changed(&["src/a.coffee", "src/b.coffee", "style/x.styl", "README.md"]))
        .unwrap();
    drop(tx);

    with_timeout(engine.run(rx)).await.unwrap();

    assert_eq!(script_calls.load(Ordering::SeqCst), 1);
    assert_eq!(style_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unmatched_changes_trigger_nothing() {
    let (scripts, calls) = counting("scripts", "src/**/*.coffee", Duration::ZERO);
    let engine = WatchEngine::new(".", vec![scripts]);

    assert!(engine.matching(&[PathBuf::from("docs/index.md")]).is_empty());
    assert_eq!(engine.matching(&[PathBuf::from("./src/x.coffee")]), vec![0]);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(changed(&["docs/index.md", "/somewhere/else/src/x.coffee"])).unwrap();
    drop(tx);

    with_timeout(engine.run(rx)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn queue_mode_folds_bursts_into_one_pending_rerun() {
    let (scripts, calls) = counting("scripts", "src/**/*.coffee", Duration::from_millis(100));
    let engine = WatchEngine::new(".", vec![scripts])
        .with_behaviour(TriggerWhileRunningBehaviour::Queue, 1);

    let (tx, rx) = mpsc::unbounded_channel();
    let session = tokio::spawn(engine.run(rx));

    tx.send(changed(&["src/a.coffee"])).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    for _ in 0..3 {
        tx.send(changed(&["src/a.coffee"])).unwrap();
    }
    drop(tx);

    with_timeout(session).await.unwrap().unwrap();
    // The running invocation plus one queued re-run.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancel_mode_aborts_the_running_invocation() {
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let sub = {
        let started = Arc::clone(&started);
        let finished = Arc::clone(&finished);
        WatchSubscription::new("scripts", PathSpec::new("src/**/*", &[]).unwrap(), move || {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(150)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Result::Ok(())
            }
        })
    };
    let engine = WatchEngine::new(".", vec![sub]).with_behaviour(TriggerWhileRunningBehaviour::Cancel, 1);

    let (tx, rx) = mpsc::unbounded_channel();
    let session = tokio::spawn(engine.run(rx));

    tx.send(changed(&["src/a.coffee"])).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(changed(&["src/a.coffee"])).unwrap();
    drop(tx);

    with_timeout(session).await.unwrap().unwrap();
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn compile_failures_keep_the_session_alive() {
    let fs = MockFileSystem::new();
    fs.add_file("src/a.coffee", "!syntax-error");

    let reporter = RecordingReporter::new();
    let pipeline = CompilationPipeline::new(
        "scripts",
        PathSpec::new("src/**/*.coffee", &[]).unwrap(),
        Arc::new(FakeTransform::new()),
        Arc::new(fs.clone()),
        ".",
        "./lib",
    )
    .with_reporter(reporter.clone());
    let engine = WatchEngine::new(
        ".",
        vec![WatchSubscription::for_pipeline(pipeline.spec().clone(), pipeline)],
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let session = tokio::spawn(engine.run(rx));

    tx.send(changed(&["src/a.coffee"])).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    fs.add_file("src/a.coffee", "fixed");
    tx.send(changed(&["src/a.coffee"])).unwrap();
    drop(tx);

    with_timeout(session).await.unwrap().unwrap();
    assert_eq!(reporter.batch_count("scripts"), 2);
    assert_eq!(reporter.failures().len(), 1);
    assert_eq!(fs.contents("lib/a.coffee"), Some(b"FIXED".to_vec()));
}

#[tokio::test]
async fn fatal_invocation_error_ends_the_session() {
    let sub = WatchSubscription::new("scripts", PathSpec::new("src/**/*", &[]).unwrap(), || async {
        Result::<()>::Err(BuildError::from(anyhow!("disk full")))
    });
    let engine = WatchEngine::new(".", vec![sub]);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(changed(&["src/a.coffee"])).unwrap();

    // The sender stays open: only the fatal error can end the session.
    let err = with_timeout(engine.run(rx)).await.unwrap_err();
    assert!(err.to_string().contains("disk full"));
    drop(tx);
}
