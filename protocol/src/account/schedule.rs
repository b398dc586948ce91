//! Clocks, epoch arithmetic and spend scheduling.
//!
//! Epochs are `floor(now / epoch_length)` with `now` in seconds since the
//! Unix epoch. A proof is only worth building when it can land in the same
//! epoch it was built for, so every spend first asks [`plan_spend`] whether
//! to go now or wait for the boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{AccountError, AccountState};
use crate::config::{ESTIMATE_BASE_MILLIS, ESTIMATE_LEDGER_MARGIN_MILLIS, ESTIMATE_MILLIS_PER_UNIT};

/// Wall-clock source in milliseconds. Ledger and clients in one deployment
/// must share a clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// System time via `chrono`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Clock driven by the tokio timer, so paused-time tests can jump epochs
/// with `tokio::time::advance` or auto-advancing sleeps.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    origin_millis: u64,
    start: tokio::time::Instant,
}

impl TokioClock {
    /// Reads `origin_millis` now and advances with the tokio timer.
    pub fn new(origin_millis: u64) -> Self {
        Self {
            origin_millis,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.origin_millis.saturating_add(elapsed)
    }
}

/// Epoch boundaries for one ledger deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochSchedule {
    epoch_length: u64,
}

impl EpochSchedule {
    /// `epoch_length` in seconds; zero is clamped to one.
    pub fn new(epoch_length: u64) -> Self {
        Self {
            epoch_length: epoch_length.max(1),
        }
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    pub fn length_millis(&self) -> u64 {
        self.epoch_length.saturating_mul(1000)
    }

    pub fn epoch_at(&self, now_millis: u64) -> u64 {
        now_millis / self.length_millis()
    }

    /// Milliseconds until the next boundary. Never zero.
    pub fn millis_until_next(&self, now_millis: u64) -> u64 {
        let length = self.length_millis();
        length - now_millis % length
    }

    pub fn until_next(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.millis_until_next(now_millis))
    }
}

/// Expected milliseconds to build a transfer proof over `size` parties.
/// With `ledger_interaction` a margin for submission is added.
pub fn estimate_proving_millis(size: usize, ledger_interaction: bool) -> u64 {
    let n = size.max(1) as f64;
    let base = (n * n.log2() * ESTIMATE_MILLIS_PER_UNIT + ESTIMATE_BASE_MILLIS).ceil() as u64;
    if ledger_interaction {
        base + ESTIMATE_LEDGER_MARGIN_MILLIS
    } else {
        base
    }
}

/// Fail when proving over `size` parties may outlast a whole epoch. Such a
/// transfer would defer forever.
pub fn check_capacity(size: usize, epoch_length: u64) -> Result<(), AccountError> {
    if estimate_proving_millis(size, false) > epoch_length.saturating_mul(1000) {
        return Err(AccountError::EpochTooShort {
            size,
            epoch_length,
            suggested: estimate_proving_millis(size, true).div_ceil(1000),
        });
    }
    Ok(())
}

/// Why an operation waits for the next epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferReason {
    /// Enough funds exist, but some are still pending.
    FundsPending,
    /// This epoch's nonce is spent.
    NonceUsed,
    /// The proof would not be ready before the boundary.
    EpochEnding,
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::FundsPending => "funds pending",
            Self::NonceUsed => "nonce used",
            Self::EpochEnding => "epoch ending",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Now,
    Defer(DeferReason),
}

/// Decide whether to spend `total` now. `state` must already be rolled over
/// to the current epoch.
pub fn plan_spend(
    state: &AccountState,
    total: u64,
    required_millis: u64,
    millis_left: u64,
) -> Result<Schedule, AccountError> {
    if total > state.balance() {
        return Err(AccountError::InsufficientBalance {
            requested: total,
            balance: state.balance(),
        });
    }
    let schedule = if total > state.available {
        Schedule::Defer(DeferReason::FundsPending)
    } else if state.nonce_used {
        Schedule::Defer(DeferReason::NonceUsed)
    } else if required_millis > millis_left {
        Schedule::Defer(DeferReason::EpochEnding)
    } else {
        Schedule::Now
    };
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_arithmetic() {
        let schedule = EpochSchedule::new(8);
        assert_eq!(schedule.epoch_at(0), 0);
        assert_eq!(schedule.epoch_at(7_999), 0);
        assert_eq!(schedule.epoch_at(8_000), 1);
        assert_eq!(schedule.millis_until_next(0), 8_000);
        assert_eq!(schedule.millis_until_next(7_999), 1);
        assert_eq!(EpochSchedule::new(0).epoch_length(), 1);
    }

    #[test]
    fn estimates() {
        assert_eq!(estimate_proving_millis(2, false), 5_240);
        assert_eq!(estimate_proving_millis(4, false), 5_360);
        assert_eq!(estimate_proving_millis(4, true), 5_380);
        assert_eq!(estimate_proving_millis(1024, false), 210_000);
    }

    #[test]
    fn capacity_suggests_a_longer_epoch() {
        assert!(check_capacity(4, 6).is_ok());
        assert_eq!(
            check_capacity(1024, 100),
            Err(AccountError::EpochTooShort {
                size: 1024,
                epoch_length: 100,
                suggested: 211,
            })
        );
        assert!(check_capacity(1024, 211).is_ok());
    }

    #[test]
    fn plan_spend_orders_reasons() {
        let state = AccountState {
            available: 10,
            pending: 5,
            nonce_used: false,
            last_roll_over: 0,
        };
        assert_eq!(
            plan_spend(&state, 16, 0, 1_000),
            Err(AccountError::InsufficientBalance {
                requested: 16,
                balance: 15,
            })
        );
        assert_eq!(
            plan_spend(&state, 12, 0, 1_000),
            Ok(Schedule::Defer(DeferReason::FundsPending))
        );
        assert_eq!(
            plan_spend(&state, 10, 2_000, 1_000),
            Ok(Schedule::Defer(DeferReason::EpochEnding))
        );
        assert_eq!(plan_spend(&state, 10, 1_000, 1_000), Ok(Schedule::Now));

        let used = AccountState {
            nonce_used: true,
            ..state
        };
        assert_eq!(
            plan_spend(&used, 1, 0, 1_000),
            Ok(Schedule::Defer(DeferReason::NonceUsed))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock::new(5_000);
        assert_eq!(clock.now_millis(), 5_000);
        tokio::time::advance(Duration::from_millis(1_250)).await;
        assert_eq!(clock.now_millis(), 6_250);
    }
}
