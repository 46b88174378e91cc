//! Timing-only pulse/triangle/noise channel state.
//!
//! Real hardware drives these three channel types with a timer,
//! sequencer, and (for pulse/noise) an envelope and sweep unit, none of
//! which are observable from the CPU side — only the length counter is,
//! through bit 0-3 of $4015. Since this crate does not synthesize audio,
//! each channel here is reduced to exactly that length counter plus the
//! halt flag and length-load register its control byte carries.

use crate::length_counter::LengthCounter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A pulse, triangle, or noise channel's CPU-visible timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Channel {
    length_counter: LengthCounter,
}

impl Channel {
    /// Create a new, disabled channel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            length_counter: LengthCounter::new(),
        }
    }

    /// Set the length counter halt flag (from the channel's control byte).
    pub fn set_halt(&mut self, halt: bool) {
        self.length_counter.set_halt(halt);
    }

    /// Load the length counter from a `$4xx3`-style upper-5-bits index.
    pub fn load_length(&mut self, index: u8) {
        self.length_counter.load(index);
    }

    /// Gate the channel via a `$4015` enable bit.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.length_counter.set_enabled(enabled);
    }

    /// Clock the length counter. Call on half frames.
    pub fn clock_length(&mut self) {
        self.length_counter.clock();
    }

    /// Whether the length counter is non-zero (drives the `$4015` status bit).
    #[must_use]
    pub const fn active(&self) -> bool {
        self.length_counter.active()
    }

    /// Current length counter value.
    #[must_use]
    pub const fn length_value(&self) -> u8 {
        self.length_counter.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_channel_is_inactive() {
        let channel = Channel::new();
        assert!(!channel.active());
    }

    #[test]
    fn enable_then_load_activates() {
        let mut channel = Channel::new();
        channel.set_enabled(true);
        channel.load_length(0);
        assert!(channel.active());
        assert_eq!(channel.length_value(), 10);
    }

    #[test]
    fn halt_prevents_decrement() {
        let mut channel = Channel::new();
        channel.set_enabled(true);
        channel.load_length(0);
        channel.set_halt(true);
        channel.clock_length();
        assert_eq!(channel.length_value(), 10);
    }

    #[test]
    fn disable_forces_inactive() {
        let mut channel = Channel::new();
        channel.set_enabled(true);
        channel.load_length(0);
        channel.set_enabled(false);
        assert!(!channel.active());
    }
}
