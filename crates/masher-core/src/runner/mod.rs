//! Execution of a single compose job.
//!
//! A job goes through three phases: tag moves, repository composes and, when
//! anything failed, the rollback of the tag moves already performed.

use std::{collections::BTreeSet, sync::Arc};

use masher_model::{JobId, RepoName, Tag, TagAction, UpdateRef};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    BuildSystem, Composer, MovePlan,
    compose::ComposeReport,
    error::{BuildSysError, JobError},
};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Builds moved and every repository composed.
    Completed { repos: Vec<RepoName> },
    /// Something failed; every tag move was reverted.
    RolledBack { cause: JobError },
    /// Something failed and the revert failed too. Tags in the build service no
    /// longer match what the updates claim.
    RollbackFailed { cause: JobError, rollback: JobError },
    /// The runner panicked. Nothing was reverted, so tags moved before the
    /// panic stay where they are.
    Crashed { reason: String },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    /// The failure that made the job roll back, if any. A crashed job has none.
    pub fn cause(&self) -> Option<&JobError> {
        match self {
            JobOutcome::Completed { .. } | JobOutcome::Crashed { .. } => None,
            JobOutcome::RolledBack { cause } | JobOutcome::RollbackFailed { cause, .. } => {
                Some(cause)
            }
        }
    }
}

/// State of one job while it runs.
pub struct JobRunner {
    id: JobId,
    updates: Vec<UpdateRef>,
    build: Arc<dyn BuildSystem>,
    composer: Arc<dyn Composer>,

    tag: Option<Tag>,
    repos: BTreeSet<RepoName>,
    actions: Vec<TagAction>,
    success: bool,
}

impl JobRunner {
    pub fn new(
        id: JobId,
        updates: Vec<UpdateRef>,
        build: Arc<dyn BuildSystem>,
        composer: Arc<dyn Composer>,
    ) -> Self {
        debug!(target: "masher.core.runner", job = %id, updates = updates.len(), "runner created");
        Self {
            id,
            updates,
            build,
            composer,
            tag: None,
            repos: BTreeSet::new(),
            actions: Vec::new(),
            success: false,
        }
    }

    /// Target tag of the last update moved.
    pub fn target_tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Tag moves performed so far, in issue order.
    pub fn actions(&self) -> &[TagAction] {
        &self.actions
    }

    /// Set once every repository of the job composed.
    pub fn succeeded(&self) -> bool {
        self.success
    }

    /// Run all phases and report how the job ended.
    #[instrument(level = "debug", target = "masher.core.runner", skip(self), fields(job = %self.id))]
    pub async fn run(&mut self) -> JobOutcome {
        let result = match self.move_builds().await {
            Ok(()) => self.compose_repos().await.map(|_| ()),
            Err(e) => {
                error!(target: "masher.core.runner", error = %e, "error with build moves, rolling back");
                Err(e)
            }
        };

        let outcome = match result {
            Ok(()) => JobOutcome::Completed {
                repos: self.repos.iter().cloned().collect(),
            },
            Err(cause) => {
                if matches!(cause, JobError::Compose(_)) {
                    error!(target: "masher.core.runner", error = %cause, "error composing, skipping post-request actions");
                }
                match self.undo_moves().await {
                    Ok(()) => {
                        info!(target: "masher.core.runner", "tag rollback successful");
                        JobOutcome::RolledBack { cause }
                    }
                    Err(rollback) => {
                        error!(target: "masher.core.runner", error = %rollback, "tag rollback failed");
                        JobOutcome::RollbackFailed { cause, rollback }
                    }
                }
            }
        };
        debug!(target: "masher.core.runner", completed = outcome.is_completed(), "runner done");
        outcome
    }

    /// Phase 1: move every build to its target tag and wait for the service.
    ///
    /// Stops issuing at the first rejected request. Tasks issued before that are
    /// still awaited so the recorded actions match what the service did.
    pub async fn move_builds(&mut self) -> Result<(), JobError> {
        let mut tasks = Vec::with_capacity(self.updates.len());
        let mut rejected: Option<BuildSysError> = None;

        for update in &self.updates {
            let plan = MovePlan::for_update(update.as_ref());
            self.repos.extend(plan.repos);

            let current = update.current_build_tag();
            debug!(
                target: "masher.core.runner",
                nvr = update.nvr(),
                from = %current,
                to = %plan.target_tag,
                "moving build"
            );
            match self
                .build
                .move_build(&current, &plan.target_tag, update.nvr(), true)
                .await
            {
                Ok(task) => {
                    self.actions
                        .push(TagAction::new(update.nvr(), current, plan.target_tag.clone()));
                    tasks.push(task);
                    self.tag = Some(plan.target_tag);
                }
                Err(e) => {
                    rejected = Some(e);
                    break;
                }
            }
        }

        let waited = self.build.wait_for_tasks(&tasks).await;
        match rejected {
            Some(e) => Err(JobError::TagMove(e)),
            None => waited.map_err(JobError::TagMove),
        }
    }

    /// Phase 2: compose each repository once, then publish them together.
    ///
    /// Every repository is attempted even after a failure. Nothing is published
    /// unless all of them composed, so a failed job never leaves a repository
    /// built from tags that are about to be rolled back.
    pub async fn compose_repos(&mut self) -> Result<Vec<ComposeReport>, JobError> {
        let mut reports = Vec::with_capacity(self.repos.len());
        let mut failures = Vec::new();

        for repo in &self.repos {
            info!(target: "masher.core.runner", %repo, "running compose");
            match self.composer.compose(repo).await {
                Ok(report) => {
                    info!(target: "masher.core.runner", %repo, log = %report.log_path.display(), "compose finished");
                    reports.push(report);
                }
                Err(e) => {
                    warn!(target: "masher.core.runner", %repo, error = %e, "compose failed");
                    failures.push(e);
                }
            }
        }
        if !failures.is_empty() {
            warn!(target: "masher.core.runner", composed = reports.len(), "holding back composed repositories");
            return Err(JobError::Compose(failures));
        }

        for report in &reports {
            if let Err(e) = self.composer.publish(report).await {
                warn!(target: "masher.core.runner", repo = %report.repo, error = %e, "publish failed");
                failures.push(e);
            }
        }
        if !failures.is_empty() {
            return Err(JobError::Compose(failures));
        }

        self.success = true;
        Ok(reports)
    }

    /// Phase 3: move every build back to the tag it came from.
    ///
    /// One reversal is issued per recorded action even when some are refused.
    pub async fn undo_moves(&self) -> Result<(), JobError> {
        debug!(target: "masher.core.runner", actions = self.actions.len(), "rolling back updates to their original tag");
        let mut tasks = Vec::with_capacity(self.actions.len());
        let mut errors = Vec::new();

        for action in &self.actions {
            let back = action.reversed();
            debug!(
                target: "masher.core.runner",
                nvr = %back.nvr,
                from = %back.from_tag,
                to = %back.to_tag,
                "moving build back"
            );
            match self
                .build
                .move_build(&back.from_tag, &back.to_tag, &back.nvr, true)
                .await
            {
                Ok(task) => tasks.push(task),
                Err(e) => errors.push(e),
            }
        }

        if let Err(e) = self.build.wait_for_tasks(&tasks).await {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(JobError::Rollback {
                total: self.actions.len(),
                errors,
            })
        }
    }
}
