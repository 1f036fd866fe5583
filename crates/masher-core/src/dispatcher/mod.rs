//! Serialized compose queue.
//!
//! At most one job runs at a time. Submitting while idle starts the job right
//! away; otherwise it waits in a FIFO backlog and is started when the running
//! job reports back, even if its runner panicked. All bookkeeping happens under
//! one mutex which is never held while a job executes.

mod event;
pub use event::JobEvent;

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use masher_model::{JobId, UpdateRef};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{BuildSystem, Composer, JobOutcome, JobRunner};

const EVENTS_CAPACITY: usize = 256;

/// A batch of updates composed together.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub updates: Vec<UpdateRef>,
}

/// Owner of the compose queue.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Shared>,
}

struct Shared {
    runtime: Handle,
    build: Arc<dyn BuildSystem>,
    composer: Arc<dyn Composer>,
    state: Mutex<DispatchState>,
    events: broadcast::Sender<JobEvent>,
    idle: watch::Sender<bool>,
}

struct DispatchState {
    next_id: JobId,
    pending: VecDeque<Job>,
    /// Updates of each running job, kept for post-request bookkeeping.
    running: HashMap<JobId, Vec<UpdateRef>>,
}

impl Dispatcher {
    /// Jobs are spawned on `runtime`, so [`Dispatcher::submit`] may be called
    /// from any thread.
    pub fn new(runtime: Handle, build: Arc<dyn BuildSystem>, composer: Arc<dyn Composer>) -> Self {
        info!(target: "masher.core.dispatch", "starting the masher");
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(Shared {
                runtime,
                build,
                composer,
                state: Mutex::new(DispatchState {
                    next_id: JobId::new(0),
                    pending: VecDeque::new(),
                    running: HashMap::new(),
                }),
                events,
                idle,
            }),
        }
    }

    /// Queue a batch of updates for composing and return the id of its job.
    ///
    /// When nothing is running the job is spawned before this returns.
    pub fn submit(&self, updates: Vec<UpdateRef>) -> JobId {
        let mut state = self.lock();

        let id = state.next_id;
        state.next_id = id.next();
        state.pending.push_back(Job { id, updates });
        self.emit(JobEvent::Queued {
            id,
            pending: state.pending.len(),
        });
        debug!(target: "masher.core.dispatch", job = %id, pending = state.pending.len(), "job queued");

        if state.running.is_empty() {
            self.dispatch_next(&mut state);
        }
        self.refresh_idle(&state);
        id
    }

    /// Number of jobs waiting for the running one to finish.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Ids of the jobs currently running.
    pub fn running(&self) -> Vec<JobId> {
        let mut ids: Vec<_> = self.lock().running.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.running.is_empty() && state.pending.is_empty()
    }

    /// Wait until nothing is running and nothing is queued.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Stream of bookkeeping events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Completion callback of a runner.
    ///
    /// Post-request bookkeeping only happens for completed jobs; a failed job
    /// leaves its updates untouched so they can be submitted again. The next
    /// queued job is started either way.
    fn job_done(&self, id: JobId, outcome: JobOutcome) {
        let mut state = self.lock();

        let Some(updates) = state.running.remove(&id) else {
            warn!(target: "masher.core.dispatch", job = %id, "completion for unknown job ignored");
            return;
        };
        debug!(target: "masher.core.dispatch", job = %id, "job done");

        if outcome.is_completed() {
            for update in &updates {
                debug!(target: "masher.core.dispatch", nvr = update.nvr(), "doing post-request stuff");
                update.request_complete();
            }
            info!(target: "masher.core.dispatch", job = %id, "push complete");
        } else {
            warn!(target: "masher.core.dispatch", job = %id, updates = updates.len(), "job failed, post-request actions skipped");
        }
        self.emit(JobEvent::Finished { id, outcome });

        self.dispatch_next(&mut state);
        self.refresh_idle(&state);
    }

    /// Start the oldest pending job. Caller holds the state lock.
    fn dispatch_next(&self, state: &mut DispatchState) {
        let Some(Job { id, updates }) = state.pending.pop_front() else {
            return;
        };
        debug!(target: "masher.core.dispatch", job = %id, "dispatching");

        let mut runner = JobRunner::new(
            id,
            updates.clone(),
            Arc::clone(&self.inner.build),
            Arc::clone(&self.inner.composer),
        );
        state.running.insert(id, updates);
        self.emit(JobEvent::Started { id });

        let span = info_span!("job", id = %id);
        let job = self
            .inner
            .runtime
            .spawn(async move { runner.run().await }.instrument(span.clone()));

        let dispatcher = self.clone();
        self.inner.runtime.spawn(
            async move {
                let outcome = job.await.unwrap_or_else(|e| {
                    error!(target: "masher.core.dispatch", job = %id, error = %e, "runner crashed, tags were not reverted");
                    JobOutcome::Crashed {
                        reason: e.to_string(),
                    }
                });
                dispatcher.job_done(id, outcome);
            }
            .instrument(span),
        );
    }

    fn refresh_idle(&self, state: &DispatchState) {
        self.inner
            .idle
            .send_replace(state.running.is_empty() && state.pending.is_empty());
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
