//! Bounded polling against a wall-clock budget.
//!
//! The deadline is checked before every attempt, never by a cancellable
//! timer, so a slow attempt always runs to completion.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::GenerationError;
use crate::config::PollConfig;

/// Time source for the poll loop.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock was created.
    fn elapsed(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Real time, via the tokio timer.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl From<&PollConfig> for PollSchedule {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            max_wait: config.max_wait(),
        }
    }
}

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    Pending,
}

/// Call `check` every `schedule.interval` until it reports [`Attempt::Done`],
/// returns an error, or `schedule.max_wait` has elapsed.
///
/// `check` receives the 1-based attempt number.
pub async fn poll_until<T, F, Fut>(
    clock: &dyn Clock,
    schedule: PollSchedule,
    mut check: F,
) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, GenerationError>>,
{
    let start = clock.elapsed();
    let mut polls = 0u32;

    while clock.elapsed().saturating_sub(start) < schedule.max_wait {
        polls += 1;
        if let Attempt::Done(value) = check(polls).await? {
            return Ok(value);
        }
        clock.sleep(schedule.interval).await;
    }

    Err(GenerationError::Timeout {
        polls,
        waited: clock.elapsed().saturating_sub(start),
    })
}

/// Virtual time for tests: `sleep` advances the clock instantly.
#[cfg(test)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: std::sync::Mutex::new(Duration::ZERO),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}
