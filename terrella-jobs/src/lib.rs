#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]
use bevy::{
    tasks::{AsyncComputeTaskPool, Task},
    utils::HashMap,
};
use std::{any, future, pin};

#[cfg(not(target_arch = "wasm32"))]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + 'static>>;

pub trait Job: any::Any + Sized + Send + Sync + 'static {
    type Outcome: any::Any + Send + Sync;

    fn name(&self) -> String;

    fn perform(self, context: Context) -> AsyncReturn<Self::Outcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

pub type Progress = u8;
pub type ProgressSender = async_channel::Sender<Progress>;

pub struct Context {
    pub progress_tx: ProgressSender,
}

impl Context {
    pub fn send_progress(&self, progress: Progress) -> async_channel::Send<u8> {
        self.progress_tx.send(progress)
    }
}

pub struct JobOutcomePayload {
    pub job_id: JobId,
    pub job_outcome_type_id: any::TypeId,
    pub job_outcome: Box<dyn any::Any + Send + Sync>,
}

pub struct InProgressJob {
    pub name: String,
    pub progress: Progress,
    pub progress_recv: async_channel::Receiver<Progress>,
    pub outcome_recv: async_channel::Receiver<JobOutcomePayload>,
    started: instant::Instant,
    // Dropping the task cancels the job's future.
    _task: Task<()>,
}

/// Jobs running on the async compute pool plus the outcomes that came back
/// and are waiting to be taken on the main thread. Call [`JobQueue::poll`]
/// once per frame.
#[derive(Default)]
pub struct JobQueue {
    in_progress: HashMap<JobId, InProgressJob>,
    outcomes: Vec<JobOutcomePayload>,
    next_id: u64,
}

impl JobQueue {
    pub fn spawn<J: Job>(&mut self, job: J) -> JobId {
        let job_id = JobId(self.next_id);
        self.next_id += 1;

        let (outcome_tx, outcome_recv) = async_channel::unbounded::<JobOutcomePayload>();
        let (progress_tx, progress_recv) = async_channel::unbounded::<Progress>();

        let job_name = job.name();
        let name = job_name.clone();
        let task = AsyncComputeTaskPool::get().spawn(async move {
            let outcome = job.perform(Context { progress_tx }).await;
            if let Err(e) = outcome_tx
                .send(JobOutcomePayload {
                    job_id,
                    job_outcome_type_id: any::TypeId::of::<J>(),
                    job_outcome: Box::new(outcome),
                })
                .await
            {
                bevy::log::error!(
                    "Failed to send result from job {} back to main thread: {:?}",
                    job_name,
                    e
                );
            }
        });

        self.in_progress.insert(
            job_id,
            InProgressJob {
                name,
                progress: 0,
                progress_recv,
                outcome_recv,
                started: instant::Instant::now(),
                _task: task,
            },
        );
        job_id
    }

    /// Drains progress and outcome channels of every running job.
    pub fn poll(&mut self) {
        let mut finished = vec![];
        for (job_id, in_progress_job) in self.in_progress.iter_mut() {
            while let Ok(progress) = in_progress_job.progress_recv.try_recv() {
                in_progress_job.progress = progress;
            }
            match in_progress_job.outcome_recv.try_recv() {
                Ok(outcome) => {
                    bevy::log::debug!(
                        "Completed job '{}' in {:?}",
                        in_progress_job.name,
                        in_progress_job.started.elapsed()
                    );
                    self.outcomes.push(outcome);
                    finished.push(*job_id);
                }
                Err(async_channel::TryRecvError::Closed) => {
                    bevy::log::error!("job '{}' ended without an outcome", in_progress_job.name);
                    finished.push(*job_id);
                }
                Err(async_channel::TryRecvError::Empty) => {}
            }
        }
        for job_id in finished {
            self.in_progress.remove(&job_id);
        }
    }

    /// Cancels a running job or discards its unclaimed outcome. Returns
    /// whether anything was dropped.
    pub fn abort(&mut self, job_id: JobId) -> bool {
        let running = self.in_progress.remove(&job_id).is_some();
        let before = self.outcomes.len();
        self.outcomes.retain(|o| o.job_id != job_id);
        running || self.outcomes.len() != before
    }

    #[inline]
    pub fn take_next<J: Job>(&mut self) -> Option<(JobId, J::Outcome)> {
        let index = self.outcomes.iter().position(|outcome_payload| {
            any::TypeId::of::<J>() == outcome_payload.job_outcome_type_id
                && outcome_payload.job_outcome.is::<J::Outcome>()
        })?;
        let outcome_payload = self.outcomes.remove(index);
        let job_id = outcome_payload.job_id;
        let outcome = outcome_payload.job_outcome.downcast::<J::Outcome>();
        if outcome.is_err() {
            bevy::log::error!("encountered unexpected job result type");
        }
        outcome.map(|n| (job_id, *n)).ok()
    }

    pub fn take_all<J: Job>(&mut self) -> Vec<(JobId, J::Outcome)> {
        let mut taken = vec![];
        while let Some(outcome) = self.take_next::<J>() {
            taken.push(outcome);
        }
        taken
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.in_progress.contains_key(&job_id)
    }

    pub fn progress(&self, job_id: JobId) -> Option<Progress> {
        self.in_progress.get(&job_id).map(|j| j.progress)
    }

    pub fn running_count(&self) -> usize {
        self.in_progress.len()
    }

    pub fn pending_outcomes(&self) -> usize {
        self.outcomes.len()
    }
}
