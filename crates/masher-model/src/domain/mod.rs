mod job_id;
pub use job_id::JobId;

mod release;
pub use release::Release;

mod request;
pub use request::Request;

mod update_status;
pub use update_status::UpdateStatus;

mod tag_action;
pub use tag_action::TagAction;

mod update;
pub use update::{Update, UpdateRef};

/// Name of a build tag in the build-tracking service (e.g. `"f20-updates-testing"`).
pub type Tag = String;

/// Name of a composed repository (e.g. `"f20-updates"`).
pub type RepoName = String;
