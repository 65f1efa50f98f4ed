//! Bounded resending of a request while the service is not ready yet.

use crate::{data::ResponseData, error::Error, http_client::HttpClient, http_request::HttpRequest};
use std::{
    fmt::Debug,
    thread,
    time::{Duration, Instant},
};
use tracing::debug;

/// Source of time for the polling loop.
pub trait Clock: Debug {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// How often and for how long a request is resent.
///
/// `interval` is the pause between two attempts. A zero interval retries
/// immediately. `max_attempts`, when set, stops polling early even if the
/// deadline has not passed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_attempts: None,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub response: ResponseData,
    pub attempts: u32,
    /// True when polling stopped while the stop code was still returned.
    pub exhausted: bool,
}

/// Sends `request` until its status differs from `stop_code` or the policy
/// runs out. The request is always sent at least once, and the loop never
/// gives up before `policy.timeout` has elapsed unless `max_attempts` is hit.
/// A timeout too large to be added to the current instant means no deadline.
/// Transport errors end polling immediately.
pub fn poll_while_status(
    request: &HttpRequest,
    stop_code: u16,
    policy: &RetryPolicy,
    client: &dyn HttpClient,
    clock: &dyn Clock,
) -> Result<PollOutcome, Error> {
    let deadline = clock.now().checked_add(policy.timeout);
    let mut attempts = 0;

    loop {
        let response = request.perform_request(client)?;
        attempts += 1;

        if response.status_code != stop_code {
            return Ok(PollOutcome {
                response,
                attempts,
                exhausted: false,
            });
        }

        let now = clock.now();
        let expired = deadline.map_or(false, |deadline| now >= deadline);
        let out_of_attempts = policy.max_attempts.map_or(false, |max| attempts >= max);
        if expired || out_of_attempts {
            debug!(attempts, stop_code, "polling gave up");
            return Ok(PollOutcome {
                response,
                attempts,
                exhausted: true,
            });
        }

        let pause = match deadline {
            Some(deadline) => policy.interval.min(deadline.saturating_duration_since(now)),
            None => policy.interval,
        };
        clock.sleep(pause);
    }
}
