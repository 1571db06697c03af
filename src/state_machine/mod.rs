mod job;
mod state;

pub use job::{
    GenType, ImageRef, ImageRequest, Job, JobFailure, JobId, JobKind, JobRequest, JobResult,
    JobStatus, JobView, VideoRequest,
};
pub use state::{InvalidTransition, StateMachine, Transition};
