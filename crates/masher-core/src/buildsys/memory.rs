use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use masher_model::{Tag, TagAction};
use tracing::trace;

use crate::{BuildSystem, BuildTaskId, error::BuildSysError};

/// In-process build service: keeps one tag per build and finishes every task
/// immediately.
///
/// Meant for development setups without a real build service and for tests.
/// Faults can be injected per build or per destination tag.
#[derive(Default)]
pub struct MemoryBuildSystem {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tags: HashMap<String, Tag>,
    moves: Vec<TagAction>,
    tasks: HashMap<BuildTaskId, Result<(), String>>,
    next_task: BuildTaskId,
    reject_nvr: HashSet<String>,
    reject_into: HashSet<Tag>,
    fail_nvr: HashSet<String>,
}

impl MemoryBuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the tag a build currently carries.
    pub fn with_build(self, nvr: impl Into<String>, tag: impl Into<Tag>) -> Self {
        self.lock().tags.insert(nvr.into(), tag.into());
        self
    }

    /// Tag the build carries right now.
    pub fn tag_of(&self, nvr: &str) -> Option<Tag> {
        self.lock().tags.get(nvr).cloned()
    }

    /// Every accepted move request, in the order it was issued.
    pub fn moves(&self) -> Vec<TagAction> {
        self.lock().moves.clone()
    }

    /// Refuse any move request for `nvr`.
    pub fn reject_moves_for(&self, nvr: impl Into<String>) {
        self.lock().reject_nvr.insert(nvr.into());
    }

    /// Refuse any move request whose destination is `tag`.
    pub fn reject_moves_into(&self, tag: impl Into<Tag>) {
        self.lock().reject_into.insert(tag.into());
    }

    /// Accept move requests for `nvr` but let their tasks fail.
    pub fn fail_tasks_for(&self, nvr: impl Into<String>) {
        self.lock().fail_nvr.insert(nvr.into());
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BuildSystem for MemoryBuildSystem {
    async fn move_build(
        &self,
        from_tag: &str,
        to_tag: &str,
        nvr: &str,
        force: bool,
    ) -> Result<BuildTaskId, BuildSysError> {
        let mut inner = self.lock();

        let rejected = |reason: &str| BuildSysError::MoveRejected {
            nvr: nvr.to_string(),
            from_tag: from_tag.to_string(),
            to_tag: to_tag.to_string(),
            reason: reason.to_string(),
        };
        if inner.reject_nvr.contains(nvr) || inner.reject_into.contains(to_tag) {
            return Err(rejected("refused by service"));
        }
        if !force {
            if let Some(current) = inner.tags.get(nvr) {
                if current != from_tag {
                    return Err(rejected("build is not tagged with the source tag"));
                }
            }
        }

        let task = inner.next_task;
        inner.next_task += 1;
        inner.moves.push(TagAction::new(nvr, from_tag, to_tag));

        if inner.fail_nvr.contains(nvr) {
            inner.tasks.insert(task, Err(format!("tagging {nvr} failed")));
        } else {
            inner.tags.insert(nvr.to_string(), to_tag.to_string());
            inner.tasks.insert(task, Ok(()));
        }
        trace!(target: "masher.core.buildsys", task, nvr, from_tag, to_tag, "move issued");
        Ok(task)
    }

    async fn wait_for_tasks(&self, tasks: &[BuildTaskId]) -> Result<(), BuildSysError> {
        let inner = self.lock();
        for task in tasks {
            match inner.tasks.get(task) {
                Some(Ok(())) => {}
                Some(Err(reason)) => {
                    return Err(BuildSysError::TaskFailed {
                        task: *task,
                        reason: reason.clone(),
                    });
                }
                None => return Err(BuildSysError::UnknownTask(*task)),
            }
        }
        Ok(())
    }
}
