//! Job orchestration and upstream dispatch for slow, rate-limited
//! image/video generation services.
//!
//! Callers submit through [`Orchestrator`], get a [`JobId`] back at once, and
//! poll [`Orchestrator::status`] until the job is terminal. Each job runs in
//! its own task behind a global [`ConcurrencyLimiter`].

pub mod config;
pub mod error;
pub mod generation;
pub mod limiter;
pub mod orchestrator;
pub mod state_machine;
pub mod store;
pub mod upload;
pub mod upstream;

pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind};
pub use generation::{GenerationError, ImageSubmission, VideoSubmission};
pub use limiter::ConcurrencyLimiter;
pub use orchestrator::{CompletionHook, Orchestrator};
pub use state_machine::{JobId, JobStatus, JobView};
pub use store::JobStore;
