#![cfg(target_family = "unix")]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use masher_core::{Composer, Dispatcher, JobEvent, JobOutcome, MemoryBuildSystem};
use masher_exec::{MashComposer, MashConfig};
use masher_model::{Release, Request, Tag, Update, UpdateRef, UpdateStatus};
use tokio::runtime::Handle;
use masher_observe::{LoggerConfig, logger_init};

const FAKE_MASH: &str = r#"#!/bin/sh
# mash -o <dir> -c <conf> <repo>
out="$2"
conf="$4"
repo="$5"
echo "$repo" >> "$MASH_CALLS"
echo "composing $repo into $out with $conf"
if [ "$repo" = "$MASH_FAIL_REPO" ]; then
    mkdir -p "$out"
    echo "half-written" > "$out/partial"
    echo "boom: $repo" >&2
    exit 2
fi
mkdir -p "$out/$repo"
echo "warning: $repo is empty" >&2
exit 0
"#;

#[derive(Debug)]
struct TestUpdate {
    nvr: String,
    request: Request,
    tag: Tag,
    release: Release,
    completions: AtomicUsize,
}

impl TestUpdate {
    fn new(nvr: &str, request: Request, tag: &str) -> Arc<Self> {
        Arc::new(Self {
            nvr: nvr.to_string(),
            request,
            tag: tag.to_string(),
            release: Release::new("F20", "f20"),
            completions: AtomicUsize::new(0),
        })
    }
}

impl Update for TestUpdate {
    fn nvr(&self) -> &str {
        &self.nvr
    }
    fn request(&self) -> Request {
        self.request
    }
    fn status(&self) -> UpdateStatus {
        UpdateStatus::Testing
    }
    fn release(&self) -> &Release {
        &self.release
    }
    fn current_build_tag(&self) -> Tag {
        self.tag.clone()
    }
    fn request_complete(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    mashed: PathBuf,
    calls: PathBuf,
    cfg: MashConfig,
}

fn fixture(fail_repo: &str) -> Fixture {
    // Every test races to install it; the first one wins.
    let _ = logger_init(&LoggerConfig {
        level: "masher=debug".to_string(),
        use_color: false,
        ..LoggerConfig::default()
    });

    let tmp = tempfile::tempdir().unwrap();
    let script = tmp.path().join("mash");
    fs::write(&script, FAKE_MASH).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let mashed = tmp.path().join("mashed");
    let calls = tmp.path().join("calls");
    let mut cfg = MashConfig {
        program: script.to_string_lossy().into_owned(),
        config_path: tmp.path().join("mash.conf"),
        mashed_dir: mashed.clone(),
        ..MashConfig::default()
    };
    cfg.env
        .insert("MASH_CALLS".into(), calls.to_string_lossy().into_owned());
    cfg.env.insert("MASH_FAIL_REPO".into(), fail_repo.into());

    Fixture {
        _tmp: tmp,
        mashed,
        calls,
        cfg,
    }
}

fn calls(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn is_stamped_dir_of(path: &Path, repo: &str) -> bool {
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    let Some(stamp) = name.strip_prefix(&format!("{repo}-")) else {
        return false;
    };
    stamp.len() == 11
        && stamp.as_bytes()[6] == b'.'
        && stamp
            .chars()
            .enumerate()
            .all(|(i, c)| i == 6 || c.is_ascii_digit())
}

async fn finish(d: &Dispatcher) {
    tokio::time::timeout(Duration::from_secs(20), d.wait_idle())
        .await
        .expect("job did not finish");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn move_job_composes_each_repo_once_and_publishes() {
    let fx = fixture("");
    let build = Arc::new(MemoryBuildSystem::new());
    let composer = Arc::new(MashComposer::new(fx.cfg.clone()).unwrap());
    let d = Dispatcher::new(Handle::current(), build.clone(), composer);
    let mut rx = d.subscribe();

    let a = TestUpdate::new("bash-5.2-1.fc20", Request::Move, "f20-updates-testing");
    let b = TestUpdate::new("zsh-5.9-1.fc20", Request::Move, "f20-updates-testing");
    d.submit(vec![a.clone() as UpdateRef, b.clone() as UpdateRef]);
    finish(&d).await;

    assert_eq!(calls(&fx.calls), vec!["f20-updates", "f20-updates-testing"]);
    for repo in ["f20-updates", "f20-updates-testing"] {
        let target = fs::read_link(fx.mashed.join(repo)).unwrap();
        assert!(is_stamped_dir_of(&target, repo), "bad target {target:?}");
        let log = fs::read_to_string(target.join("mash.out")).unwrap();
        assert!(log.contains(&format!("composing {repo}")));
        assert!(log.contains(&format!("warning: {repo} is empty")));
    }

    assert_eq!(a.completions.load(Ordering::SeqCst), 1);
    assert_eq!(b.completions.load(Ordering::SeqCst), 1);
    assert_eq!(build.tag_of("bash-5.2-1.fc20").as_deref(), Some("f20-updates"));
    assert_eq!(build.tag_of("zsh-5.9-1.fc20").as_deref(), Some("f20-updates"));

    let mut finished = None;
    while let Ok(event) = rx.try_recv() {
        if let JobEvent::Finished { outcome, .. } = event {
            finished = Some(outcome);
        }
    }
    assert_eq!(
        finished,
        Some(JobOutcome::Completed {
            repos: vec!["f20-updates".into(), "f20-updates-testing".into()]
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_compose_keeps_link_logs_failure_and_reverts_tags() {
    let fx = fixture("f20-updates-testing");
    fs::create_dir_all(&fx.mashed).unwrap();
    let previous = fx.mashed.join("f20-updates-testing-140101.0000");
    fs::create_dir_all(&previous).unwrap();
    std::os::unix::fs::symlink(&previous, fx.mashed.join("f20-updates-testing")).unwrap();

    let build = Arc::new(MemoryBuildSystem::new());
    let composer = Arc::new(MashComposer::new(fx.cfg.clone()).unwrap());
    let d = Dispatcher::new(Handle::current(), build.clone(), composer);

    let a = TestUpdate::new("bash-5.2-1.fc20", Request::Push, "f20-updates-candidate");
    let b = TestUpdate::new("zsh-5.9-1.fc20", Request::Push, "f20-updates-candidate");
    d.submit(vec![a.clone() as UpdateRef, b.clone() as UpdateRef]);
    finish(&d).await;

    assert_eq!(
        fs::read_link(fx.mashed.join("f20-updates-testing")).unwrap(),
        previous
    );

    let failed: Vec<_> = fs::read_dir(&fx.mashed)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("mash-failed-"))
        .collect();
    assert_eq!(failed.len(), 1);
    let log = fs::read_to_string(failed[0].path()).unwrap();
    assert!(log.contains("boom: f20-updates-testing"));

    assert_eq!(a.completions.load(Ordering::SeqCst), 0);
    assert_eq!(b.completions.load(Ordering::SeqCst), 0);

    let moves = build.moves();
    assert_eq!(moves.len(), 4);
    let (forward, back) = moves.split_at(2);
    for action in forward {
        assert_eq!(back.iter().filter(|m| **m == action.reversed()).count(), 1);
    }
    assert_eq!(
        build.tag_of("bash-5.2-1.fc20").as_deref(),
        Some("f20-updates-candidate")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queued_jobs_run_after_a_failed_one() {
    let fx = fixture("f20-updates");
    let build = Arc::new(MemoryBuildSystem::new());
    let composer = Arc::new(MashComposer::new(fx.cfg.clone()).unwrap());
    let d = Dispatcher::new(Handle::current(), build.clone(), composer);

    let stable = TestUpdate::new("bash-5.2-1.fc20", Request::Move, "f20-updates-testing");
    let testing = TestUpdate::new("zsh-5.9-1.fc20", Request::Push, "f20-updates-candidate");
    d.submit(vec![stable.clone() as UpdateRef]);
    d.submit(vec![testing.clone() as UpdateRef]);
    finish(&d).await;

    assert_eq!(stable.completions.load(Ordering::SeqCst), 0);
    assert_eq!(testing.completions.load(Ordering::SeqCst), 1);
    assert!(!fx.mashed.join("f20-updates").exists());
    assert!(fx.mashed.join("f20-updates-testing").exists());
    assert_eq!(
        calls(&fx.calls),
        vec!["f20-updates", "f20-updates-testing", "f20-updates-testing"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_move_publishes_none_of_its_repos() {
    let fx = fixture("f20-updates");
    let build = Arc::new(MemoryBuildSystem::new());
    let composer = Arc::new(MashComposer::new(fx.cfg.clone()).unwrap());
    let d = Dispatcher::new(Handle::current(), build.clone(), composer);

    let a = TestUpdate::new("bash-5.2-1.fc20", Request::Move, "f20-updates-testing");
    d.submit(vec![a.clone() as UpdateRef]);
    finish(&d).await;

    // f20-updates-testing composed fine but must not go live while its tags
    // are rolled back.
    assert_eq!(calls(&fx.calls), vec!["f20-updates", "f20-updates-testing"]);
    assert!(!fx.mashed.join("f20-updates").exists());
    assert!(!fx.mashed.join("f20-updates-testing").exists());
    assert_eq!(a.completions.load(Ordering::SeqCst), 0);
    assert_eq!(
        build.tag_of("bash-5.2-1.fc20").as_deref(),
        Some("f20-updates-testing")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_recompose_in_same_minute_leaves_published_output_intact() {
    let fx = fixture("");
    let good = MashComposer::new(fx.cfg.clone()).unwrap();
    let mut failing_cfg = fx.cfg.clone();
    failing_cfg
        .env
        .insert("MASH_FAIL_REPO".into(), "f20-updates".into());
    let failing = MashComposer::new(failing_cfg).unwrap();

    let report = good.compose("f20-updates").await.unwrap();
    good.publish(&report).await.unwrap();

    failing.compose("f20-updates").await.unwrap_err();
    failing.compose("f20-updates").await.unwrap_err();

    let link = fx.mashed.join("f20-updates");
    assert_eq!(fs::read_link(&link).unwrap(), report.output_dir);
    let mut published: Vec<_> = fs::read_dir(&report.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    published.sort();
    assert_eq!(published, vec!["f20-updates", "mash.out"]);
    let log = fs::read_to_string(report.output_dir.join("mash.out")).unwrap();
    assert!(!log.contains("boom"));

    // Both failures kept their own log.
    let failed = fs::read_dir(&fx.mashed)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("mash-failed-"))
        .count();
    assert_eq!(failed, 2);
}
