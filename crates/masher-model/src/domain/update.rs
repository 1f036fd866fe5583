use std::{fmt::Debug, sync::Arc};

use crate::{Release, Request, Tag, UpdateStatus};

/// View of an update record needed to compose it.
///
/// The record itself is owned by the host application; the masher only reads it
/// and calls [`Update::request_complete`] once a job carrying it fully succeeded.
pub trait Update: Send + Sync + Debug {
    /// Build identifier (name-version-release).
    fn nvr(&self) -> &str;

    fn request(&self) -> Request;

    fn status(&self) -> UpdateStatus;

    fn release(&self) -> &Release;

    /// Tag the build currently carries in the build-tracking service.
    fn current_build_tag(&self) -> Tag;

    /// Post-request bookkeeping. Idempotency is up to the implementor.
    fn request_complete(&self);
}

/// Shared handle to an update record.
pub type UpdateRef = Arc<dyn Update>;
