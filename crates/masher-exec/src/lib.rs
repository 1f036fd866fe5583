mod config;
pub use config::MashConfig;

mod error;
pub use error::{ExecError, ExecResult};

mod mashed;
pub use mashed::{MashedDir, compose_stamp};

pub mod mash;
pub use mash::MashComposer;

mod util;
