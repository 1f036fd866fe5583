use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// How to run the compose executable and where its results go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MashConfig {
    /// Compose executable, looked up in `PATH` when not absolute.
    pub program: String,
    /// Passed to the executable with `-c`.
    pub config_path: PathBuf,
    /// Root holding per-compose output dirs, failure logs and the stable links.
    pub mashed_dir: PathBuf,
    /// Extra environment for the executable.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for MashConfig {
    fn default() -> Self {
        Self {
            program: "mash".to_string(),
            config_path: PathBuf::from("/etc/mash/mash.conf"),
            mashed_dir: PathBuf::from("/var/cache/masher/mashed"),
            env: BTreeMap::new(),
        }
    }
}
