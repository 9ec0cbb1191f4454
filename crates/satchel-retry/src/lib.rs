//! Retry with jittered exponential backoff for Satchel.
//!
//! A unit of work is run up to `attempts` times. Each run receives a
//! [`RetryControl`] handle and reports its outcome through it:
//!
//! - [`RetryControl::done`]: success, stop and return the value
//! - [`RetryControl::abort`]: non-retryable failure, stop immediately
//! - neither: retryable failure, back off and try again
//!
//! The delay before attempt `i + 1` is `base * growth^(i - 1)`, scaled at
//! sleep time by a uniform factor in `[1 - jitter, 1 + jitter]`. The jitter
//! never feeds back into the running delay, and nothing sleeps after the
//! last attempt.
//!
//! ```ignore
//! let id = Backoff::default()
//!     .run(4, |ctl| async move {
//!         match store.set(&id, &session, ttl).await {
//!             Ok(()) => ctl.done(id),
//!             Err(e) if e.is_permanent() => ctl.abort(),
//!             Err(_) => {} // retry
//!         }
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why [`Backoff::run`] gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// The policy parameters are out of range. The work was never run.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    /// The work called [`RetryControl::abort`].
    #[error("aborted after {attempts} attempt(s)")]
    Aborted {
        /// Attempts made, including the one that aborted.
        attempts: u32,
    },

    /// Every attempt in the budget failed.
    #[error("gave up after {attempts} attempt(s)")]
    Exhausted {
        /// The attempt budget that was used up.
        attempts: u32,
    },
}

// ---------------------------------------------------------------------------
// RetryControl
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Signal<T> {
    Pending,
    Done(T),
    Aborted,
}

/// Outcome handle passed to each attempt.
///
/// Cloning is cheap; all clones report into the same attempt. The first
/// call to `done` or `abort` wins and later calls are ignored.
#[derive(Debug)]
pub struct RetryControl<T> {
    signal: Arc<Mutex<Signal<T>>>,
}

impl<T> Clone for RetryControl<T> {
    fn clone(&self) -> Self {
        Self {
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<T> RetryControl<T> {
    fn new() -> Self {
        Self {
            signal: Arc::new(Mutex::new(Signal::Pending)),
        }
    }

    /// Marks the attempt as successful with `value`.
    pub fn done(&self, value: T) {
        let mut signal = self.signal.lock();
        if matches!(*signal, Signal::Pending) {
            *signal = Signal::Done(value);
        }
    }

    /// Marks the attempt as a failure that retrying cannot fix.
    pub fn abort(&self) {
        let mut signal = self.signal.lock();
        if matches!(*signal, Signal::Pending) {
            *signal = Signal::Aborted;
        }
    }

    fn take(&self) -> Signal<T> {
        std::mem::replace(&mut *self.signal.lock(), Signal::Pending)
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Jittered exponential backoff.
///
/// Plain data: one value can drive any number of concurrent
/// [`run`](Self::run) calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    /// Delay before the second attempt.
    pub base: Duration,
    /// Multiplier applied to the delay after every sleep. Must be `>= 1`.
    pub growth: f64,
    /// Fractional jitter amplitude. Must be within `[0, 1]`.
    pub jitter: f64,
}

/// Roughly 100 ms, 200 ms, 400 ms between attempts, each ±20%.
impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            growth: 2.0,
            jitter: 0.2,
        }
    }
}

impl Backoff {
    /// Checks that `growth >= 1` and `0 <= jitter <= 1`.
    ///
    /// NaN fails both checks.
    pub fn validate(&self) -> Result<(), RetryError> {
        if !(self.growth >= 1.0) || !self.growth.is_finite() {
            return Err(RetryError::InvalidPolicy(format!(
                "growth factor must be a finite value >= 1, got {}",
                self.growth
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(RetryError::InvalidPolicy(format!(
                "jitter amplitude must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(())
    }

    /// Runs `work` up to `attempts` times, sleeping on the Tokio timer
    /// between failed attempts.
    ///
    /// # Errors
    /// - [`RetryError::InvalidPolicy`]: parameters rejected by
    ///   [`validate`](Self::validate); `work` is not called
    /// - [`RetryError::Aborted`]: `work` called [`RetryControl::abort`]
    /// - [`RetryError::Exhausted`]: no attempt called
    ///   [`RetryControl::done`]
    pub async fn run<T, F, Fut>(
        &self,
        attempts: u32,
        work: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(RetryControl<T>) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.run_with_sleep(attempts, work, tokio::time::sleep).await
    }

    async fn run_with_sleep<T, F, Fut, S, SFut>(
        &self,
        attempts: u32,
        mut work: F,
        mut sleep: S,
    ) -> Result<T, RetryError>
    where
        F: FnMut(RetryControl<T>) -> Fut,
        Fut: Future<Output = ()>,
        S: FnMut(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        self.validate()?;

        let mut delay = self.base;
        for attempt in 1..=attempts {
            let control = RetryControl::new();
            work(control.clone()).await;

            match control.take() {
                Signal::Done(value) => {
                    trace!(attempt, "attempt succeeded");
                    return Ok(value);
                }
                Signal::Aborted => {
                    debug!(attempt, "attempt aborted, not retrying");
                    return Err(RetryError::Aborted { attempts: attempt });
                }
                Signal::Pending => {}
            }

            if attempt < attempts {
                let pause = self.jittered(delay);
                trace!(attempt, ?pause, "attempt failed, backing off");
                sleep(pause).await;
                delay = scale(delay, self.growth);
            }
        }

        debug!(attempts, "retry budget exhausted");
        Err(RetryError::Exhausted { attempts })
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter == 0.0 {
            return delay;
        }
        let factor = rand::rng()
            .random_range(1.0 - self.jitter..=1.0 + self.jitter);
        scale(delay, factor)
    }
}

/// Scales `d` by `f`, saturating at `Duration::MAX`.
fn scale(d: Duration, f: f64) -> Duration {
    Duration::try_from_secs_f64(d.as_secs_f64() * f).unwrap_or(Duration::MAX)
}

// =========================================================================
// Tests
// =========================================================================
