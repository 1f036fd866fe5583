//! Build-tracking service seam.
//!
//! The masher never talks to the service directly; it only needs to move a
//! build between tags and wait for the resulting service-side tasks.

mod memory;
pub use memory::MemoryBuildSystem;

use async_trait::async_trait;

use crate::error::BuildSysError;

/// Handle of an asynchronous task running inside the build service.
pub type BuildTaskId = u64;

#[async_trait]
pub trait BuildSystem: Send + Sync {
    /// Ask the service to move `nvr` from `from_tag` to `to_tag`.
    ///
    /// With `force` set the service skips its tag-transition policy checks.
    async fn move_build(
        &self,
        from_tag: &str,
        to_tag: &str,
        nvr: &str,
        force: bool,
    ) -> Result<BuildTaskId, BuildSysError>;

    /// Block until every task finished.
    ///
    /// Returns an error if any of them did not finish successfully.
    async fn wait_for_tasks(&self, tasks: &[BuildTaskId]) -> Result<(), BuildSysError>;
}
