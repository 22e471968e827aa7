//! Remaining-wait countdown logic.
//!
//! The waiting indicator shows a second-resolution estimate of the time
//! until the tracked job starts. The countdown is seeded from the server's
//! `eta_ms`, decremented locally once per second, and re-seeded on every
//! queued-status event so the display self-corrects toward server truth
//! instead of drifting from local elapsed time.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Milliseconds per countdown step.
pub const MS_PER_SECOND: i64 = 1_000;

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Second-resolution countdown toward zero.
///
/// Stops at zero on its own; `tick` past zero is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: i64,
}

impl Countdown {
    /// Seed a countdown from a millisecond estimate, rounding up to whole
    /// seconds. Negative estimates clamp to zero.
    pub fn from_eta_ms(eta_ms: i64) -> Self {
        let clamped = eta_ms.max(0);
        Self {
            remaining_secs: (clamped + MS_PER_SECOND - 1) / MS_PER_SECOND,
        }
    }

    /// Replace the remaining time from a fresh server estimate.
    pub fn reset(&mut self, eta_ms: i64) {
        *self = Self::from_eta_ms(eta_ms);
    }

    /// Advance one second. Floors at zero.
    pub fn tick(&mut self) {
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
        }
    }

    /// Seconds left until the estimate reaches zero.
    pub fn remaining_secs(&self) -> i64 {
        self.remaining_secs
    }

    /// `true` once the countdown has reached zero.
    pub fn is_finished(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Clock-style display, e.g. `"01:05"`.
    pub fn display(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format a second count as `MM:SS`. Negative values render as `00:00`.
pub fn format_clock(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
