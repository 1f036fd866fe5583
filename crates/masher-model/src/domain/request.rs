use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Action requested for an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    /// Promote to the stable updates repository.
    Move,
    /// Push to the testing repository.
    Push,
    /// Pull the update back out of whichever repository it is in.
    Unpush,
}

impl Request {
    pub fn as_str(&self) -> &'static str {
        match self {
            Request::Move => "move",
            Request::Push => "push",
            Request::Unpush => "unpush",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Request {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(Request::Move),
            "push" => Ok(Request::Push),
            "unpush" => Ok(Request::Unpush),
            _ => Err(ModelError::UnknownRequest(s.to_string())),
        }
    }
}
