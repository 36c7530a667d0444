use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long to wait for images to become active.
///
/// The defaults wait forever at a fixed 10 second interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause before each round of status checks.
    pub interval: Duration,
    /// Give up after this many rounds.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since polling started.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// At least one round of status checks always runs.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` when another round is allowed after `done` rounds.
    pub(crate) fn allows(&self, done: u32) -> bool {
        self.max_attempts.is_none_or(|max| done < max)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}
