pub mod buildsys;
pub use buildsys::{BuildSystem, BuildTaskId, MemoryBuildSystem};

pub mod compose;
pub use compose::{ComposeReport, Composer};

pub mod dispatcher;
pub use dispatcher::{Dispatcher, Job, JobEvent};

pub mod error;
pub use error::{BuildSysError, ComposeError, JobError};

pub mod plan;
pub use plan::MovePlan;

pub mod runner;
pub use runner::{JobOutcome, JobRunner};

#[cfg(test)]
mod testing;
