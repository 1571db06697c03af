use chrono::{DateTime, Utc};
use thiserror::Error;

use super::job::{Job, JobFailure, JobResult, JobStatus};

/// A status change requested by a job's orchestration task.
///
/// Each job flows through: QUEUED → RUNNING → COMPLETED | ERROR
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Admission slot acquired; upstream work begins.
    Start,
    /// The upstream produced a result.
    Complete(JobResult),
    /// Any failure, at any point before a terminal state.
    Fail(JobFailure),
}

impl Transition {
    pub fn target(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Running,
            Transition::Complete(_) => JobStatus::Completed,
            Transition::Fail(_) => JobStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Applies transitions to a `Job`, keeping status monotonic and the
/// result/error pair consistent with it.
pub struct StateMachine;

impl StateMachine {
    /// Apply `transition` to `job`, refreshing `updated_at` to `now`.
    ///
    /// - `Start` is only valid from `Queued`.
    /// - `Complete` is only valid from `Running`.
    /// - `Fail` is valid from any non-terminal status.
    /// - Terminal jobs never change again.
    pub fn apply(
        job: &mut Job,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let to = transition.target();
        let allowed = matches!(
            (job.status, &transition),
            (JobStatus::Queued, Transition::Start)
                | (JobStatus::Running, Transition::Complete(_))
                | (JobStatus::Queued | JobStatus::Running, Transition::Fail(_))
        );
        if !allowed {
            return Err(InvalidTransition {
                from: job.status,
                to,
            });
        }

        match transition {
            Transition::Start => {}
            Transition::Complete(result) => job.result = Some(result),
            Transition::Fail(failure) => job.error = Some(failure),
        }
        job.status = to;
        job.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::state_machine::job::{GenType, ImageRef, JobRequest, VideoRequest};

    fn make_job() -> Job {
        Job::new(
            JobRequest::Video(VideoRequest {
                prompt: "tide pools".into(),
                gen_type: GenType::T2v,
                ratio: "16:9".into(),
                resolution: "720p".into(),
                duration: 5,
                mode: "pro".into(),
                has_reference_image: false,
            }),
            None,
            Utc::now(),
        )
    }

    fn images() -> JobResult {
        JobResult::Images {
            images: vec![ImageRef {
                url: "https://x/1.png".into(),
            }],
        }
    }

    #[test]
    fn happy_path_walks_all_states() {
        let mut job = make_job();
        let t0 = job.updated_at;

        StateMachine::apply(&mut job, Transition::Start, t0 + Duration::seconds(1)).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.updated_at, t0 + Duration::seconds(1));
        assert!(job.result.is_none() && job.error.is_none());

        StateMachine::apply(&mut job, Transition::Complete(images()), t0 + Duration::seconds(9))
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
        assert_eq!(job.created_at, t0);
    }

    #[test]
    fn fail_from_running_sets_only_error() {
        let mut job = make_job();
        let now = Utc::now();
        StateMachine::apply(&mut job, Transition::Start, now).unwrap();
        StateMachine::apply(
            &mut job,
            Transition::Fail(JobFailure::new(ErrorKind::Upstream, "task failed")),
            now,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.result.is_none());
        assert_eq!(job.error.as_ref().unwrap().message, "task failed");
    }

    #[test]
    fn fail_from_queued_is_allowed() {
        let mut job = make_job();
        let failure = JobFailure::new(ErrorKind::InvalidInput, "bad reference");
        StateMachine::apply(&mut job, Transition::Fail(failure), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Error);
    }

    #[test]
    fn complete_requires_running() {
        let mut job = make_job();
        let err = StateMachine::apply(&mut job, Transition::Complete(images()), Utc::now())
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Queued);
        assert_eq!(err.to, JobStatus::Completed);
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn terminal_states_do_not_move() {
        let mut job = make_job();
        let now = Utc::now();
        StateMachine::apply(&mut job, Transition::Start, now).unwrap();
        StateMachine::apply(&mut job, Transition::Complete(images()), now).unwrap();
        let stamped = job.updated_at;

        for t in [
            Transition::Start,
            Transition::Complete(images()),
            Transition::Fail(JobFailure::new(ErrorKind::Timeout, "late")),
        ] {
            assert!(StateMachine::apply(&mut job, t, now + Duration::seconds(5)).is_err());
        }
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
        assert_eq!(job.updated_at, stamped);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut job = make_job();
        StateMachine::apply(&mut job, Transition::Start, Utc::now()).unwrap();
        assert!(StateMachine::apply(&mut job, Transition::Start, Utc::now()).is_err());
    }

    #[test]
    fn invalid_transition_display() {
        let err = InvalidTransition {
            from: JobStatus::Error,
            to: JobStatus::Running,
        };
        assert_eq!(err.to_string(), "invalid transition error -> running");
    }
}
