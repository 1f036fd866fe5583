use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ComposeError;

/// Result of a successful repository compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeReport {
    pub repo: String,
    /// Directory the new repository was written to.
    pub output_dir: PathBuf,
    /// Where the composer's output was saved.
    pub log_path: PathBuf,
}

/// Regenerates one repository from the current contents of its tags.
///
/// Composing and publishing are separate steps so a job can hold back every
/// repository until all of them composed.
#[async_trait]
pub trait Composer: Send + Sync {
    /// Build the repository into a new output directory. Must not touch what
    /// consumers currently see.
    async fn compose(&self, repo: &str) -> Result<ComposeReport, ComposeError>;

    /// Make a finished compose the one consumers see.
    async fn publish(&self, report: &ComposeReport) -> Result<(), ComposeError>;
}
