use serde::{Deserialize, Serialize};

/// Where an update currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStatus {
    Pending,
    Testing,
    Stable,
    Obsolete,
    Other,
}
