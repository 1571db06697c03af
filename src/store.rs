//! In-memory job registry with time-to-live expiry.
//!
//! Every job is written by exactly one orchestration task, so the map lock
//! is only held for the duration of a single insert/update/read. Records are
//! volatile: nothing survives a process restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state_machine::{Job, JobId, JobRequest, JobView, StateMachine, Transition};

pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    ttl: TimeDelta,
}

impl JobStore {
    /// Create an empty store whose records expire `ttl` after their last update.
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Insert a new `queued` job and return its id.
    pub async fn create(&self, request: JobRequest, owner: Option<String>) -> JobId {
        self.create_at(request, owner, Utc::now()).await
    }

    pub(crate) async fn create_at(
        &self,
        request: JobRequest,
        owner: Option<String>,
        now: DateTime<Utc>,
    ) -> JobId {
        let job = Job::new(request, owner, now);
        let id = job.id.clone();
        tracing::info!(job_id = %id, kind = %job.kind, "Job queued");
        self.jobs.write().await.insert(id.clone(), job);
        id
    }

    /// Snapshot of a job; `None` when unknown or already reaped.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// The polling view of a job.
    pub async fn view(&self, id: &JobId) -> Option<JobView> {
        self.jobs.read().await.get(id).map(Job::view)
    }

    /// Apply a transition on behalf of the job's orchestration task.
    ///
    /// Returns `false` when the job has already been reaped or the transition
    /// is not legal from its current status; neither case is an error for the
    /// caller.
    pub async fn transition(&self, id: &JobId, transition: Transition) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            tracing::warn!(
                job_id = %id,
                to = %transition.target(),
                "Transition on reaped job ignored"
            );
            return false;
        };

        match StateMachine::apply(job, transition, Utc::now()) {
            Ok(()) => {
                tracing::debug!(job_id = %id, status = %job.status, "Job transitioned");
                true
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Transition rejected");
                false
            }
        }
    }

    /// Remove every job whose last update is older than the TTL at `now`.
    /// Returns how many records were dropped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| now - job.updated_at <= self.ttl);
        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `every` for as long as the returned
    /// task is alive.
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reaped = store.sweep(Utc::now()).await;
                if reaped > 0 {
                    let remaining = store.len().await;
                    tracing::info!(reaped, remaining, "Reaped expired jobs");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::state_machine::{
        GenType, ImageRef, ImageRequest, JobFailure, JobResult, JobStatus,
    };

    const TTL: Duration = Duration::from_secs(6 * 60 * 60);

    fn request() -> JobRequest {
        JobRequest::Image(ImageRequest {
            prompt: "a red fox".into(),
            model: "kie_nano_banana_pro".into(),
            mapped_model: "kie_nano_banana_pro".into(),
            resolution: "2K".into(),
            aspect_ratio: "1:1".into(),
            gen_type: GenType::T2i,
            reference_images_count: 0,
        })
    }

    fn ms(n: i64) -> TimeDelta {
        TimeDelta::milliseconds(n)
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = JobStore::new(TTL);
        let id = store.create(request(), Some("u1".into())).await;

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.owner.as_deref(), Some("u1"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = JobStore::new(TTL);
        assert!(store.get(&JobId::from("missing")).await.is_none());
        assert!(store.view(&JobId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn transitions_are_applied_in_order() {
        let store = JobStore::new(TTL);
        let id = store.create(request(), None).await;

        assert!(store.transition(&id, Transition::Start).await);
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Running);

        let result = JobResult::Images {
            images: vec![ImageRef {
                url: "https://x/1.png".into(),
            }],
        };
        assert!(store.transition(&id, Transition::Complete(result.clone())).await);

        let view = store.view(&id).await.unwrap();
        assert_eq!(view.status, JobStatus::Completed);
        assert_eq!(view.result, Some(result));
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn transition_after_terminal_is_ignored() {
        let store = JobStore::new(TTL);
        let id = store.create(request(), None).await;
        store.transition(&id, Transition::Start).await;
        store
            .transition(
                &id,
                Transition::Fail(JobFailure::new(ErrorKind::Protocol, "code 500")),
            )
            .await;

        assert!(!store.transition(&id, Transition::Start).await);
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.unwrap().kind, ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn transition_on_reaped_job_is_noop() {
        let store = JobStore::new(TTL);
        let id = store.create(request(), None).await;
        let far_future = Utc::now() + TimeDelta::days(1);
        assert_eq!(store.sweep(far_future).await, 1);

        assert!(!store.transition(&id, Transition::Start).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn sweep_respects_ttl_boundary() {
        let store = JobStore::new(TTL);
        let now = Utc::now();
        let ttl = TimeDelta::from_std(TTL).unwrap();

        let expired = store.create_at(request(), None, now - ttl - ms(1)).await;
        let fresh = store.create_at(request(), None, now - ttl + ms(1)).await;

        assert_eq!(store.sweep(now).await, 1);
        assert!(store.get(&expired).await.is_none());
        assert!(store.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn sweep_reclaims_stuck_running_jobs() {
        let store = JobStore::new(TTL);
        let id = store.create(request(), None).await;
        store.transition(&id, Transition::Start).await;
        let updated = store.get(&id).await.unwrap().updated_at;

        let ttl = TimeDelta::from_std(TTL).unwrap();
        assert_eq!(store.sweep(updated + ttl).await, 0);
        assert_eq!(store.sweep(updated + ttl + ms(1)).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn reaper_task_sweeps_periodically() {
        let store = Arc::new(JobStore::new(Duration::from_millis(1)));
        store.create(request(), None).await;

        let reaper = store.spawn_reaper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        reaper.abort();

        assert!(store.is_empty().await);
    }
}
