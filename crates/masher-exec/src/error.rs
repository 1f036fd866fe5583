use std::path::PathBuf;

use masher_core::ComposeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("compose program is not configured")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("compose failed with exit code {code}, output in {}", .log.display())]
    NonZeroExit { code: i32, log: PathBuf },
    #[error("compose killed by signal, output in {}", .log.display())]
    KilledBySignal { log: PathBuf },
    #[error("io error: {0}")]
    Io(String),
}

pub type ExecResult<T> = Result<T, ExecError>;

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

impl ExecError {
    /// Attach the repository name and convert into the core error type.
    pub fn into_compose_error(self, repo: &str) -> ComposeError {
        let repo = repo.to_string();
        match self {
            ExecError::NonZeroExit { code, log } => ComposeError::Failed {
                repo,
                code: Some(code),
                log,
            },
            ExecError::KilledBySignal { log } => ComposeError::Failed {
                repo,
                code: None,
                log,
            },
            ExecError::MissingProgram => ComposeError::Spawn {
                repo,
                reason: ExecError::MissingProgram.to_string(),
            },
            ExecError::Spawn(reason) => ComposeError::Spawn { repo, reason },
            ExecError::Io(reason) => ComposeError::Io { repo, reason },
        }
    }
}
