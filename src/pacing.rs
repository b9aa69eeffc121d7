use std::thread;
use std::time::Duration;

/// Fixed delays used to stay under remote rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Pause after every job, whatever its outcome.
    pub job_delay: Duration,
    /// Pause between two consecutive batches.
    pub batch_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    AfterJob,
    BetweenBatches,
}

pub trait Pacer {
    fn pause(&self, kind: Pause, duration: Duration);
}

/// Blocks the calling thread for the requested time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, _kind: Pause, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}
