use std::path::PathBuf;

use thiserror::Error;

use crate::BuildTaskId;

/// Failures reported by the build-tracking service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildSysError {
    #[error("move of {nvr} from {from_tag} to {to_tag} rejected: {reason}")]
    MoveRejected {
        nvr: String,
        from_tag: String,
        to_tag: String,
        reason: String,
    },
    #[error("build task {task} failed: {reason}")]
    TaskFailed { task: BuildTaskId, reason: String },
    #[error("unknown build task {0}")]
    UnknownTask(BuildTaskId),
    #[error("build service unavailable: {0}")]
    Unavailable(String),
}

/// Failures of one repository compose.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("compose of {repo} failed ({}), output in {}", exit_label(.code), .log.display())]
    Failed {
        repo: String,
        code: Option<i32>,
        log: PathBuf,
    },
    #[error("compose of {repo} could not start: {reason}")]
    Spawn { repo: String, reason: String },
    #[error("compose of {repo}: io error: {reason}")]
    Io { repo: String, reason: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Why a job did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("tag move failed: {0}")]
    TagMove(BuildSysError),
    #[error("{} repositories failed to compose: {}", .0.len(), join(.0))]
    Compose(Vec<ComposeError>),
    #[error("tag rollback failed for {} of {total} moves: {}", .errors.len(), join(.errors))]
    Rollback {
        total: usize,
        errors: Vec<BuildSysError>,
    },
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
