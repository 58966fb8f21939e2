//! Cancellable redirect countdowns.
//!
//! A countdown advances one tick at a time and checks its cancellation token
//! on every tick. Cancelling takes effect at the next tick, and a cancelled
//! countdown stays cancelled.

use super::decision::RedirectPlan;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A shared flag that suppresses a scheduled redirect.
///
/// Clones share the same flag, so the handle given to a "stay on this page"
/// control cancels the countdown that holds the other clone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. There is no way to undo it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of advancing a countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Still counting down.
    Pending {
        /// Whole seconds until navigation.
        remaining: u64,
    },
    /// Time is up; navigate to the target.
    Navigate(String),
    /// The visitor cancelled the redirect.
    Cancelled,
}

impl Tick {
    /// Whether the countdown has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// A redirect waiting for its delay to elapse.
///
/// # Examples
///
/// ```
/// use repo_trust::squatting::{CancellationToken, RedirectCountdown, RedirectPlan, Tick};
/// use std::time::Duration;
///
/// let plan = RedirectPlan { target: "https://github.com/octo/widgets".into(), delay: Duration::from_secs(2) };
/// let token = CancellationToken::new();
/// let mut countdown = RedirectCountdown::new(plan, token.clone());
/// assert_eq!(countdown.tick(), Tick::Pending { remaining: 1 });
/// token.cancel();
/// assert_eq!(countdown.tick(), Tick::Cancelled);
/// assert_eq!(countdown.tick(), Tick::Cancelled);
/// ```
#[derive(Debug)]
pub struct RedirectCountdown {
    plan: RedirectPlan,
    remaining: u64,
    token: CancellationToken,
    outcome: Option<Tick>,
}

impl RedirectCountdown {
    /// Arm a countdown for `plan`, cancellable through `token`.
    #[must_use]
    pub fn new(plan: RedirectPlan, token: CancellationToken) -> Self {
        let remaining = plan.delay.as_secs();
        Self {
            plan,
            remaining,
            token,
            outcome: None,
        }
    }

    /// Seconds left before navigation.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The redirect being counted down.
    #[must_use]
    pub fn plan(&self) -> &RedirectPlan {
        &self.plan
    }

    /// Advance by one tick.
    ///
    /// Once the countdown has navigated or been cancelled, every further tick
    /// repeats that outcome.
    pub fn tick(&mut self) -> Tick {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        if self.token.is_cancelled() {
            return self.finish(Tick::Cancelled);
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return self.finish(Tick::Navigate(self.plan.target.clone()));
        }
        Tick::Pending {
            remaining: self.remaining,
        }
    }

    /// Tick until the countdown finishes, calling `wait` between ticks and
    /// `observe` after each one.
    pub fn run(mut self, mut wait: impl FnMut(Duration), mut observe: impl FnMut(&Tick)) -> Tick {
        loop {
            wait(TICK_INTERVAL);
            let tick = self.tick();
            observe(&tick);
            if tick.is_terminal() {
                return tick;
            }
        }
    }

    fn finish(&mut self, outcome: Tick) -> Tick {
        self.outcome = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(secs: u64) -> RedirectPlan {
        RedirectPlan {
            target: "https://github.com/octo/widgets".to_owned(),
            delay: Duration::from_secs(secs),
        }
    }

    #[test]
    fn navigates_after_the_delay() {
        let mut waited = Vec::new();
        let outcome = RedirectCountdown::new(plan(3), CancellationToken::new())
            .run(|interval| waited.push(interval), |_| {});
        assert_eq!(outcome, Tick::Navigate("https://github.com/octo/widgets".to_owned()));
        assert_eq!(waited.len(), 3);
    }

    #[test]
    fn cancellation_applies_on_the_next_tick() {
        let token = CancellationToken::new();
        let mut countdown = RedirectCountdown::new(plan(5), token.clone());
        assert_eq!(countdown.tick(), Tick::Pending { remaining: 4 });
        token.cancel();
        assert_eq!(countdown.remaining(), 4);
        assert_eq!(countdown.tick(), Tick::Cancelled);
    }

    #[test]
    fn cancelled_countdowns_are_never_rearmed() {
        let token = CancellationToken::new();
        let mut countdown = RedirectCountdown::new(plan(1), token.clone());
        token.cancel();
        for _ in 0..5 {
            assert_eq!(countdown.tick(), Tick::Cancelled);
        }
    }

    #[test]
    fn navigation_is_reported_once_and_then_repeated() {
        let mut countdown = RedirectCountdown::new(plan(1), CancellationToken::new());
        let first = countdown.tick();
        assert!(matches!(first, Tick::Navigate(_)));
        assert_eq!(countdown.tick(), first);
    }

    #[test]
    fn cancelling_while_running_stops_the_loop() {
        let token = CancellationToken::new();
        let handle = token.clone();
        let mut observed = Vec::new();
        let outcome = RedirectCountdown::new(plan(10), token).run(
            |_| {},
            |tick| {
                observed.push(tick.clone());
                if observed.len() == 2 {
                    handle.cancel();
                }
            },
        );
        assert_eq!(outcome, Tick::Cancelled);
        assert_eq!(observed.len(), 3);
    }

    #[test]
    fn zero_delay_navigates_on_first_tick() {
        let mut countdown = RedirectCountdown::new(plan(0), CancellationToken::new());
        assert!(matches!(countdown.tick(), Tick::Navigate(_)));
    }
}
