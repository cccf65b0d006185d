// tests/project_tasks.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use builddag::errors::BuildError;
use builddag::fs::mock::MockFileSystem;
use builddag::pipeline::{CompileFailure, Transform, TransformFuture};
use builddag::project::{self, Project};
use builddag::types::Platform;
use builddag_test_utils::builders::ConfigFileBuilder;
use builddag_test_utils::fakes::{
    FakeTransform, RecordingPackager, RecordingReporter, RecordingTestRunner,
};
use builddag_test_utils::{init_tracing, with_timeout};

/// Uppercasing transform that also records whether the vendor copy was
/// already in place when it ran.
#[derive(Debug)]
struct VendorProbe {
    fs: MockFileSystem,
    saw_vendor: Mutex<Vec<bool>>,
}

impl VendorProbe {
    fn new(fs: &MockFileSystem) -> Arc<Self> {
        Arc::new(Self {
            fs: fs.clone(),
            saw_vendor: Mutex::new(Vec::new()),
        })
    }
}

impl Transform for VendorProbe {
    fn transform<'a>(&'a self, source: &'a str, _path: &'a Path) -> TransformFuture<'a> {
        Box::pin(async move {
            let present = self.fs.contents("lib/jquery.js").is_some();
            self.saw_vendor.lock().unwrap().push(present);
            Ok::<_, CompileFailure>(source.to_uppercase())
        })
    }
}

fn project_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("lib/stale.js", "old output");
    fs.add_file("vendor/jquery.js", "jquery");
    fs.add_file("src/main.coffee", "main");
    fs.add_file("src/views/list.coffee", "list");
    fs.add_file("style/site.styl", "body");
    fs.add_file("style/constants.styl", "$red = #f00");
    fs.add_file("test/app_test.coffee", "it works");
    fs.add_file("package.json", "{}");
    fs
}

fn fake_project(fs: &MockFileSystem, config: ConfigFileBuilder) -> Arc<Project> {
    let project = Project::new(Arc::new(config.build()), ".")
        .unwrap()
        .with_fs(Arc::new(fs.clone()))
        .with_transforms(Arc::new(FakeTransform::new()), Arc::new(FakeTransform::new()))
        .with_reporter(RecordingReporter::new());
    Arc::new(project)
}

#[tokio::test]
async fn build_cleans_vendors_then_compiles_both_pipelines() {
    init_tracing();
    let fs = project_tree();
    let scripts = VendorProbe::new(&fs);
    let styles = VendorProbe::new(&fs);
    let reporter = RecordingReporter::new();

    let project = Project::new(Arc::new(ConfigFileBuilder::new().build()), ".")
        .unwrap()
        .with_fs(Arc::new(fs.clone()))
        .with_transforms(scripts.clone(), styles.clone())
        .with_reporter(reporter.clone());
    let graph = Arc::new(project).task_graph().unwrap();

    let report = with_timeout(graph.run(project::BUILD)).await.unwrap();

    assert_eq!(
        report.completed,
        vec![
            project::CLEAN.to_string(),
            project::VENDOR.to_string(),
            project::BUILD.to_string()
        ]
    );

    // Every compilation saw the vendor copy.
    let seen: Vec<bool> = scripts
        .saw_vendor
        .lock()
        .unwrap()
        .iter()
        .chain(styles.saw_vendor.lock().unwrap().iter())
        .copied()
        .collect();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|&s| s));

    assert_eq!(fs.contents("lib/stale.js"), None);
    assert_eq!(fs.contents("lib/jquery.js"), Some(b"jquery".to_vec()));
    assert_eq!(fs.contents("lib/main.js"), Some(b"MAIN".to_vec()));
    assert_eq!(fs.contents("lib/views/list.js"), Some(b"LIST".to_vec()));
    assert_eq!(fs.contents("lib/site.css"), Some(b"BODY".to_vec()));
    assert_eq!(fs.contents("lib/constants.css"), None);

    assert_eq!(reporter.batch_count(project::SCRIPTS), 1);
    assert_eq!(reporter.batch_count(project::STYLES), 1);
}

#[tokio::test]
async fn single_pipeline_tasks_only_compile_their_source_type() {
    let fs = project_tree();
    let graph = fake_project(&fs, ConfigFileBuilder::new()).task_graph().unwrap();

    with_timeout(graph.run(project::BUILD_STYLES)).await.unwrap();

    assert_eq!(fs.contents("lib/site.css"), Some(b"BODY".to_vec()));
    assert_eq!(fs.contents("lib/main.js"), None);
}

#[tokio::test]
async fn single_pipeline_task_keeps_earlier_build_output() {
    let fs = project_tree();
    let graph = fake_project(&fs, ConfigFileBuilder::new()).task_graph().unwrap();

    with_timeout(graph.run(project::BUILD)).await.unwrap();
    assert_eq!(fs.contents("lib/main.js"), Some(b"MAIN".to_vec()));

    fs.add_file("style/site.styl", "body { color: red }");
    let report = with_timeout(graph.run(project::BUILD_STYLES)).await.unwrap();

    assert_eq!(report.completed, vec![project::BUILD_STYLES.to_string()]);
    assert_eq!(fs.contents("lib/main.js"), Some(b"MAIN".to_vec()));
    assert_eq!(fs.contents("lib/jquery.js"), Some(b"jquery".to_vec()));
    assert_eq!(fs.contents("lib/site.css"), Some(b"BODY { COLOR: RED }".to_vec()));
}

#[tokio::test]
async fn compile_failures_do_not_fail_the_build_task() {
    let fs = project_tree();
    fs.add_file("src/broken.coffee", "!syntax-error");
    let graph = fake_project(&fs, ConfigFileBuilder::new()).task_graph().unwrap();

    with_timeout(graph.run(project::BUILD)).await.unwrap();

    assert_eq!(fs.contents("lib/main.js"), Some(b"MAIN".to_vec()));
    assert_eq!(fs.contents("lib/broken.js"), None);
}

#[tokio::test]
async fn unwritable_destination_fails_the_build_task() {
    let fs = project_tree();
    fs.deny_writes_under("lib");
    let graph = fake_project(&fs, ConfigFileBuilder::new()).task_graph().unwrap();

    let err = with_timeout(graph.run(project::BUILD)).await.unwrap_err();
    match err {
        BuildError::TaskFailed { task, .. } => assert_eq!(task, project::VENDOR),
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn dist_hands_a_complete_manifest_to_the_packager() {
    let fs = project_tree();
    let packager = RecordingPackager::new();
    let project = Project::clone(&fake_project(&fs, ConfigFileBuilder::new())).with_packager(packager.clone());
    let graph = Arc::new(project).task_graph().unwrap();

    with_timeout(graph.run(project::DIST)).await.unwrap();

    let manifests = packager.manifests();
    assert_eq!(manifests.len(), 1);
    let manifest = &manifests[0];
    assert_eq!(manifest.source_dir, PathBuf::from("lib"));
    assert_eq!(
        manifest.files,
        vec![
            PathBuf::from("jquery.js"),
            PathBuf::from("main.js"),
            PathBuf::from("site.css"),
            PathBuf::from("views/list.js"),
        ]
    );
    assert_eq!(manifest.aux_files, vec![PathBuf::from("package.json")]);
    assert_eq!(manifest.platforms, vec![Platform::Osx64]);

    let toml = manifest.to_toml().unwrap();
    assert!(toml.contains("platforms = [\"osx64\"]"));
}

#[tokio::test]
async fn dist_without_auxiliary_files_fails() {
    let fs = project_tree();
    let packager = RecordingPackager::new();
    let config = ConfigFileBuilder::new().aux_files(&["package.json", "LICENSE"]);
    let project = Project::clone(&fake_project(&fs, config)).with_packager(packager.clone());
    let graph = Arc::new(project).task_graph().unwrap();

    let err = with_timeout(graph.run(project::DIST)).await.unwrap_err();
    assert!(matches!(err, BuildError::TaskFailed { ref task, ref message }
        if task == project::DIST && message.contains("LICENSE")));
    assert!(packager.manifests().is_empty());
}

#[tokio::test]
async fn test_task_passes_matched_files_and_environment() {
    let fs = project_tree();
    let runner = RecordingTestRunner::new();
    let project = Project::clone(&fake_project(&fs, ConfigFileBuilder::new())).with_test_runner(runner.clone());
    let graph = Arc::new(project).task_graph().unwrap();

    let report = with_timeout(graph.run(project::TEST)).await.unwrap();
    assert_eq!(report.completed, vec![project::TEST.to_string()]);

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    let (files, env) = &runs[0];
    assert_eq!(files, &vec![PathBuf::from("./test/app_test.coffee")]);
    assert_eq!(env.get("NODE_ENV").map(String::as_str), Some("test"));

    // Nothing else ran.
    assert_eq!(fs.contents("lib/stale.js"), Some(b"old output".to_vec()));
}

#[tokio::test]
async fn failing_tests_fail_the_test_task() {
    let fs = project_tree();
    let project = Project::clone(&fake_project(&fs, ConfigFileBuilder::new()))
        .with_test_runner(RecordingTestRunner::failing());
    let graph = Arc::new(project).task_graph().unwrap();

    let err = with_timeout(graph.run(project::TEST)).await.unwrap_err();
    assert!(matches!(err, BuildError::TaskFailed { ref task, .. } if task == project::TEST));
}

#[tokio::test]
async fn test_task_without_test_files_fails() {
    let fs = project_tree();
    let runner = RecordingTestRunner::new();
    let config = ConfigFileBuilder::new().test_include("spec/**/*.coffee");
    let project = Project::clone(&fake_project(&fs, config)).with_test_runner(runner.clone());

    let err = with_timeout(project.test()).await.unwrap_err();
    assert!(matches!(err, BuildError::TestRunner(ref msg) if msg.contains("spec/**/*.coffee")));
    assert!(runner.runs().is_empty());
}

#[test]
fn default_task_is_watch() {
    let fs = project_tree();
    let graph = fake_project(&fs, ConfigFileBuilder::new()).task_graph().unwrap();
    assert_eq!(graph.default_task(), Some(project::WATCH));
    assert_eq!(
        graph.dag().closure_of(project::WATCH).unwrap(),
        vec!["clean", "vendor", "build", "watch"]
    );
}

#[test]
fn watch_subscriptions_follow_the_configured_watch_patterns() {
    let fs = project_tree();
    let subs = fake_project(&fs, ConfigFileBuilder::new()).watch_subscriptions().unwrap();

    let names: Vec<&str> = subs.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec![project::SCRIPTS, project::STYLES]);

    assert!(subs[0].matches("src/views/list.coffee"));
    assert!(!subs[0].matches("style/site.styl"));
    // Partials are not compiled but still trigger a styles rebuild.
    assert!(subs[1].matches("style/constants.styl"));
    assert!(!subs[1].matches("src/main.coffee"));
}
