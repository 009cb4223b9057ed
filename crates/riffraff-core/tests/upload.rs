use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use riffraff_core::config::{ConfigReconciler, Configuration, Environment, MapSource};
use riffraff_core::error::StorageError;
use riffraff_core::github::GithubContext;
use riffraff_core::pipeline::{Pipeline, RunOutcome};
use riffraff_core::storage::{ARTIFACT_BUCKET, BUILDS_BUCKET, MemoryStore, publish, sync_dir};

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    fs::write(path, content).expect("write should succeed in test temp dirs");
}

fn configuration(dry_run: bool) -> Configuration {
    let source = MapSource::new()
        .with("app", "foo")
        .with("config", "stacks: [deploy]\ndeployments:\n  upload:\n    type: aws-s3\n")
        .with("contentDirectories", "upload: [test-data]\n")
        .with("buildNumber", "42")
        .with("stagingDir", "staging")
        .with("dryRun", if dry_run { "true" } else { "false" });
    ConfigReconciler::new(&source, &Environment::default())
        .reconcile()
        .expect("reconcile should succeed")
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().expect("tempdir should succeed");
    write_file(&tmp.path().join("test-data/foo.txt"), "foo");
    write_file(&tmp.path().join("test-data/nested/bar.txt"), "bar");
    tmp
}

#[tokio::test]
async fn manifest_written_last_after_all_artifacts() {
    let tmp = fixture();
    let cfg = configuration(false);
    let context = GithubContext::default();
    let store = Arc::new(MemoryStore::new());

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap();
    let pipeline = Pipeline::new(&cfg, &context, tmp.path()).with_start_time(start);
    let prepared = pipeline.prepare().expect("prepare should succeed");
    let report = pipeline
        .upload(&prepared, Arc::clone(&store))
        .await
        .expect("upload should succeed");

    assert_eq!(report.key_prefix, "deploy::foo/42");
    assert_eq!(report.artifacts, 3);
    assert_eq!(report.manifest_key, "deploy::foo/42/build.json");

    let objects = store.objects();
    assert_eq!(objects.len(), 4);
    let last = objects.last().unwrap();
    assert_eq!(last.bucket, BUILDS_BUCKET);
    assert_eq!(last.key, "deploy::foo/42/build.json");

    let mut artifact_keys: Vec<&str> = objects[..3]
        .iter()
        .inspect(|o| assert_eq!(o.bucket, ARTIFACT_BUCKET))
        .map(|o| o.key.as_str())
        .collect();
    artifact_keys.sort();
    assert_eq!(
        artifact_keys,
        vec![
            "deploy::foo/42/riff-raff.yaml",
            "deploy::foo/42/upload/foo.txt",
            "deploy::foo/42/upload/nested/bar.txt",
        ]
    );

    let manifest: serde_json::Value = serde_json::from_slice(&last.data).unwrap();
    assert_eq!(manifest["projectName"], "deploy::foo");
    assert_eq!(manifest["buildNumber"], "42");
    assert_eq!(manifest["startTime"], "2024-01-02T03:04:05.000Z");
    assert_eq!(manifest["buildTool"], "riffraff-upload");
    assert_eq!(manifest["branch"], "dev");
}

#[tokio::test]
async fn failed_artifact_means_no_manifest() {
    let tmp = fixture();
    let cfg = configuration(false);
    let context = GithubContext::default();
    let store = Arc::new(MemoryStore::new().fail("deploy::foo/42/upload/foo.txt"));

    let pipeline = Pipeline::new(&cfg, &context, tmp.path());
    let prepared = pipeline.prepare().expect("prepare should succeed");
    let err = pipeline
        .upload(&prepared, Arc::clone(&store))
        .await
        .unwrap_err();

    match err.downcast_ref::<StorageError>() {
        Some(StorageError::Incomplete { failed, total, .. }) => {
            assert_eq!(*failed, 1);
            assert_eq!(*total, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let objects = store.objects();
    assert_eq!(objects.len(), 2);
    assert!(objects.iter().all(|o| o.bucket != BUILDS_BUCKET));
}

#[tokio::test]
async fn access_denied_surfaces_through_batch() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    write_file(&tmp.path().join("a.txt"), "a");
    let store = Arc::new(MemoryStore::new().deny("p/1/a.txt"));

    let err = sync_dir(store, tmp.path(), ARTIFACT_BUCKET, "p/1")
        .await
        .unwrap_err();
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn publish_empty_tree_writes_manifest_only() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let store = Arc::new(MemoryStore::new());
    let manifest = riffraff_core::manifest::Manifest::new(
        "p",
        "1",
        "main",
        "https://github.com/o/r",
        "sha",
        "riffraff-upload",
        Utc::now(),
    );

    let report = publish(Arc::clone(&store), tmp.path(), &manifest)
        .await
        .expect("publish should succeed");
    assert_eq!(report.artifacts, 0);
    assert_eq!(store.objects().len(), 1);
    assert!(store.get(BUILDS_BUCKET, "p/1/build.json").is_some());
}

#[tokio::test]
async fn dry_run_lists_files_without_connecting() {
    let tmp = fixture();
    let cfg = configuration(true);
    let context = GithubContext::default();
    let store = Arc::new(MemoryStore::new());
    let connected = AtomicBool::new(false);

    let outcome = Pipeline::new(&cfg, &context, tmp.path())
        .run(|| {
            connected.store(true, Ordering::SeqCst);
            let store = Arc::clone(&store);
            async move { store }
        })
        .await
        .expect("dry run should succeed");

    assert!(!connected.load(Ordering::SeqCst));
    assert!(store.objects().is_empty());

    match outcome {
        RunOutcome::DryRun { staging_dir, files } => {
            assert_eq!(staging_dir, tmp.path().join("staging"));
            let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
            assert_eq!(
                paths,
                vec!["riff-raff.yaml", "upload/foo.txt", "upload/nested/bar.txt"]
            );
            assert!(files.iter().all(|f| f.digest.len() == 64));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn full_run_without_token_skips_comment() {
    let tmp = fixture();
    let cfg = configuration(false);
    let context = GithubContext::default();
    let store = Arc::new(MemoryStore::new());

    let outcome = Pipeline::new(&cfg, &context, tmp.path())
        .run(|| {
            let store = Arc::clone(&store);
            async move { store }
        })
        .await
        .expect("run should succeed");

    match outcome {
        RunOutcome::Uploaded { report, comment, .. } => {
            assert_eq!(report.artifacts, 3);
            assert!(comment.is_none());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(store.get(BUILDS_BUCKET, "deploy::foo/42/build.json").is_some());
}

#[tokio::test]
async fn step_summary_written_before_staging() {
    let tmp = fixture();
    let cfg = configuration(true);
    let summary = tmp.path().join("summary.md");
    let context = GithubContext {
        step_summary: Some(summary.clone()),
        ..Default::default()
    };

    Pipeline::new(&cfg, &context, tmp.path())
        .prepare()
        .expect("prepare should succeed");

    let content = fs::read_to_string(&summary).expect("summary should exist");
    assert!(content.contains("deploy::foo"));
    assert!(content.contains("42"));
}
