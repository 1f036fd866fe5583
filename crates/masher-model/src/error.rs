use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown update request: {0} (expected: move|push|unpush)")]
    UnknownRequest(String),
}
