//! Bounded DCD-timeout debounce.
//!
//! A DCD timeout without a JIG cable usually means the data pins have not
//! settled yet. The gate asks for a fresh snapshot until the condition clears
//! or the retry budget runs out.

use crate::config::DCD_RETRY_LIMIT;
use crate::status::ResolvedStatus;

/// What the engine should do with the status it just resolved.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GateDecision {
    /// The status is settled; dispatch it.
    Proceed,
    /// Drop the status and re-snapshot after the retry interval.
    Retry { attempt: u8 },
    /// Budget exhausted; dispatch with the cable forced to a charger.
    ForceCharger,
    /// Budget exhausted while the part reports power-on reset; leave the
    /// previous status in place.
    Unresolved,
}

/// Retry counter for the DCD-timeout debounce.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RetryState {
    count: u8,
    limit: u8,
}

impl RetryState {
    pub const fn new() -> Self {
        Self::with_limit(DCD_RETRY_LIMIT)
    }

    pub const fn with_limit(limit: u8) -> Self {
        Self { count: 0, limit }
    }

    pub const fn count(&self) -> u8 {
        self.count
    }

    pub const fn limit(&self) -> u8 {
        self.limit
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// `true` when `status` still shows DCD noise.
    pub const fn needs_debounce(status: &ResolvedStatus) -> bool {
        status.dcd_t() && !status.jig_connect()
    }

    /// Feeds one resolved status through the gate.
    pub fn evaluate(&mut self, status: &ResolvedStatus) -> GateDecision {
        if !Self::needs_debounce(status) {
            self.reset();
            return GateDecision::Proceed;
        }

        if self.count < self.limit {
            self.count += 1;
            return GateDecision::Retry {
                attempt: self.count,
            };
        }

        self.reset();
        if status.snapshot.power_on_reset() {
            GateDecision::Unresolved
        } else {
            GateDecision::ForceCharger
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::ADC_OPEN;
    use crate::registers::{int1, int2};
    use crate::status::StatusSnapshot;

    fn resolved(int1_flags: u8, int2_flags: u8, adc: u8) -> ResolvedStatus {
        let snapshot = StatusSnapshot::from_raw([int1_flags, int2_flags], [0, 0], adc);
        ResolvedStatus::resolve(snapshot, &ResolvedStatus::INITIAL)
    }

    #[test]
    fn settled_status_resets_counter() {
        let mut retry = RetryState::new();
        let noisy = resolved(int1::DCD_T, 0, ADC_OPEN);
        assert_eq!(retry.evaluate(&noisy), GateDecision::Retry { attempt: 1 });

        let settled = resolved(int1::ATTACH, 0, ADC_OPEN);
        assert_eq!(retry.evaluate(&settled), GateDecision::Proceed);
        assert_eq!(retry.count(), 0);
    }

    #[test]
    fn jig_cable_skips_debounce() {
        let mut retry = RetryState::new();
        let jig = resolved(int1::DCD_T, 0, 0x1C);
        assert_eq!(retry.evaluate(&jig), GateDecision::Proceed);
    }

    #[test]
    fn terminates_within_limit() {
        let mut retry = RetryState::new();
        let noisy = resolved(int1::DCD_T, 0, ADC_OPEN);

        let mut iterations = 0;
        loop {
            iterations += 1;
            assert!(retry.count() <= retry.limit());
            match retry.evaluate(&noisy) {
                GateDecision::Retry { .. } => {}
                other => {
                    assert_eq!(other, GateDecision::ForceCharger);
                    break;
                }
            }
        }
        assert_eq!(iterations, usize::from(DCD_RETRY_LIMIT) + 1);
        assert_eq!(retry.count(), 0);
    }

    #[test]
    fn power_on_reset_leaves_cycle_unresolved() {
        let mut retry = RetryState::with_limit(2);
        let noisy = resolved(int1::DCD_T, int2::POR, ADC_OPEN);

        assert_eq!(retry.evaluate(&noisy), GateDecision::Retry { attempt: 1 });
        assert_eq!(retry.evaluate(&noisy), GateDecision::Retry { attempt: 2 });
        assert_eq!(retry.evaluate(&noisy), GateDecision::Unresolved);
    }
}
