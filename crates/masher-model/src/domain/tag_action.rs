use serde::{Deserialize, Serialize};

use crate::Tag;

/// One performed tag move, kept so it can be reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAction {
    pub nvr: String,
    pub from_tag: Tag,
    pub to_tag: Tag,
}

impl TagAction {
    pub fn new(nvr: impl Into<String>, from_tag: impl Into<Tag>, to_tag: impl Into<Tag>) -> Self {
        Self {
            nvr: nvr.into(),
            from_tag: from_tag.into(),
            to_tag: to_tag.into(),
        }
    }

    /// The move that puts the build back where it started.
    pub fn reversed(&self) -> Self {
        Self {
            nvr: self.nvr.clone(),
            from_tag: self.to_tag.clone(),
            to_tag: self.from_tag.clone(),
        }
    }
}
