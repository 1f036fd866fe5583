use serde::{Deserialize, Serialize};

/// Release an update belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Human name, e.g. `"F20"`. Repository names use its lowercase form.
    pub name: String,
    /// Prefix of the release's build tags, e.g. `"f20"`.
    pub dist_tag: String,
}

impl Release {
    pub fn new(name: impl Into<String>, dist_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dist_tag: dist_tag.into(),
        }
    }

    /// Repository name for this release: `<lowercase name>-<suffix>`.
    pub fn repo_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.name.to_lowercase(), suffix)
    }

    /// Build tag for this release: `<dist tag>-<suffix>`.
    pub fn tag(&self, suffix: &str) -> String {
        format!("{}-{}", self.dist_tag, suffix)
    }
}
