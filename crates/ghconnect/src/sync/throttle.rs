use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

use crate::catalog::{Annotation, RateLimitDescription, rate_limits};
use crate::error::{ConnectorError, Result};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour; 10/sec leaves room for bursts.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Wait applied when upstream reports an exhausted budget without a reset time.
const OVERLIMIT_FALLBACK: Duration = Duration::from_secs(60);

/// How long to wait before the budget described by `desc` is usable again.
///
/// `None` when the budget is not exhausted or has already reset.
#[must_use]
pub fn delay_until_reset(desc: &RateLimitDescription, now: DateTime<Utc>) -> Option<Duration> {
    if !desc.is_overlimit() {
        return None;
    }
    match desc.reset_at {
        Some(reset_at) => (reset_at - now).to_std().ok().filter(|d| !d.is_zero()),
        None => Some(OVERLIMIT_FALLBACK),
    }
}

/// Client-side pacing for the sync runner.
///
/// A governor limiter spaces requests out; [`Throttle::observe`] additionally
/// parks the runner until an exhausted upstream budget resets.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<GovernorRateLimiter>,
    cancel: CancellationToken,
}

impl Throttle {
    /// Create a throttle allowing `requests_per_second` (at least 1).
    pub fn new(requests_per_second: u32, cancel: CancellationToken) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            cancel,
        }
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Inspect rate-limit annotations from a response and sleep until the
    /// latest reset of any exhausted budget.
    pub async fn observe(&self, annotations: &[Annotation]) -> Result<()> {
        let now = Utc::now();
        let Some(delay) = rate_limits(annotations)
            .filter_map(|desc| delay_until_reset(desc, now))
            .max()
        else {
            return Ok(());
        };

        tracing::warn!(wait_secs = delay.as_secs(), "Upstream rate limit exhausted, waiting for reset");
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ConnectorError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
