//! Fakes shared by the unit tests of this crate.

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use masher_model::{Release, Request, Tag, Update, UpdateRef, UpdateStatus};
use tokio::sync::Semaphore;

use crate::{ComposeReport, Composer, error::ComposeError};

pub fn f20() -> Release {
    Release::new("F20", "f20")
}

pub fn refs(updates: &[Arc<FakeUpdate>]) -> Vec<UpdateRef> {
    updates.iter().map(|u| u.clone() as UpdateRef).collect()
}

#[derive(Debug)]
pub struct FakeUpdate {
    nvr: String,
    request: Request,
    status: UpdateStatus,
    release: Release,
    tag: Tag,
    completions: AtomicUsize,
}

impl FakeUpdate {
    pub fn new(nvr: &str, request: Request, status: UpdateStatus, release: Release) -> Arc<Self> {
        let tag = match status {
            UpdateStatus::Testing => release.tag("updates-testing"),
            UpdateStatus::Stable => release.tag("updates"),
            _ => release.tag("updates-candidate"),
        };
        Arc::new(Self {
            nvr: nvr.to_string(),
            request,
            status,
            release,
            tag,
            completions: AtomicUsize::new(0),
        })
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

impl Update for FakeUpdate {
    fn nvr(&self) -> &str {
        &self.nvr
    }

    fn request(&self) -> Request {
        self.request
    }

    fn status(&self) -> UpdateStatus {
        self.status
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

/// Composer that records what it was asked to do.
///
/// When gated, every compose waits for one permit from [`RecordingComposer::release`].
#[derive(Default)]
pub struct RecordingComposer {
    composed: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
    failing: HashSet<String>,
    unpublishable: HashSet<String>,
    panicking: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, repo: &str) -> Self {
        self.failing.insert(repo.to_string());
        self
    }

    pub fn unpublishable(mut self, repo: &str) -> Self {
        self.unpublishable.insert(repo.to_string());
        self
    }

    /// Panic instead of composing `repo`.
    pub fn panicking(mut self, repo: &str) -> Self {
        self.panicking.insert(repo.to_string());
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` more composes through the gate.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn composed(&self) -> Vec<String> {
        self.composed.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    /// Highest number of composes seen running at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Composer for RecordingComposer {
    async fn compose(&self, repo: &str) -> Result<ComposeReport, ComposeError> {
        if self.panicking.contains(repo) {
            panic!("composer blew up on {repo}");
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.composed.lock().unwrap().push(repo.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let dir = PathBuf::from("/tmp/mashed").join(format!("{repo}-000000.0000"));
        if self.failing.contains(repo) {
            return Err(ComposeError::Failed {
                repo: repo.to_string(),
                code: Some(1),
                log: PathBuf::from("/tmp/mashed/mash-failed-000000.0000"),
            });
        }
        Ok(ComposeReport {
            repo: repo.to_string(),
            log_path: dir.join("mash.out"),
            output_dir: dir,
        })
    }

    async fn publish(&self, report: &ComposeReport) -> Result<(), ComposeError> {
        if self.unpublishable.contains(&report.repo) {
            return Err(ComposeError::Io {
                repo: report.repo.clone(),
                reason: "link is a directory".to_string(),
            });
        }
        self.published.lock().unwrap().push(report.repo.clone());
        Ok(())
    }
}
