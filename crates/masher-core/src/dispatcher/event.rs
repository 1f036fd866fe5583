use masher_model::JobId;

use crate::JobOutcome;

/// Bookkeeping events, emitted in the order the dispatcher performed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Job accepted; `pending` is the backlog size right after it was added.
    Queued { id: JobId, pending: usize },
    /// Runner spawned for the job.
    Started { id: JobId },
    /// Runner reported back.
    Finished { id: JobId, outcome: JobOutcome },
}

impl JobEvent {
    pub fn id(&self) -> JobId {
        match self {
            JobEvent::Queued { id, .. } | JobEvent::Started { id } | JobEvent::Finished { id, .. } => {
                *id
            }
        }
    }
}
