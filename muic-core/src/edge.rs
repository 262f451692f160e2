//! Edge detection over the status bitmask view.

use bitflags::bitflags;

use crate::status::StatusBits;

bitflags! {
    /// Per-bit transition between two consecutive statuses.
    ///
    /// A rising edge also carries `HIGH` and a falling edge also carries
    /// `LOW`, so an entry declared for `HIGH` fires on both steady-high and
    /// freshly risen bits.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct Transition: u8 {
        const HIGH = 1 << 0;
        const LOW = 1 << 1;
        const RISING = 1 << 2;
        const FALLING = 1 << 3;
        const CHANGED = Self::RISING.bits() | Self::FALLING.bits();
    }
}

/// Computes the transition of the bits selected by `mask`.
///
/// With more than one bit in `mask` the check is "any selected bit set".
pub fn state_check(prev: StatusBits, curr: StatusBits, mask: StatusBits) -> Transition {
    let was = prev.intersects(mask);
    let is = curr.intersects(mask);
    match (was, is) {
        (false, true) => Transition::RISING | Transition::HIGH,
        (true, false) => Transition::FALLING | Transition::LOW,
        (true, true) => Transition::HIGH,
        (false, false) => Transition::LOW,
    }
}

/// Bits that differ between two statuses.
pub fn changed_bits(prev: StatusBits, curr: StatusBits) -> StatusBits {
    prev.symmetric_difference(curr)
}
