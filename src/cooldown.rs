use std::time::Duration;
use tokio::time::Instant;

/// Fixed wait between two accepted manual refreshes of the player list.
pub const PLAYER_REFRESH_COOLDOWN: Duration = Duration::from_secs(5);

/// Countdown that gates a manual action.
///
/// Accepting an invocation restarts the countdown; while it is above zero
/// further invocations are no-ops. The remaining time is reported in whole
/// seconds, counting down once per second like the button label does.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    ready_at: Option<Instant>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ready_at: None,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.ready_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Seconds left, rounded up: 5, 4, ... 1, then 0 when available.
    pub fn remaining_secs(&self) -> u64 {
        let left = self.remaining();
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Accepts the invocation and restarts the countdown, or refuses it.
    pub fn try_start(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.ready_at = Some(Instant::now() + self.period);
        true
    }

    pub fn reset(&mut self) {
        self.ready_at = None;
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(PLAYER_REFRESH_COOLDOWN)
    }
}
