//! APU (Audio Processing Unit) Main Module.
//!
//! The NES APU (2A03) contains:
//! - Two pulse (square wave) channels
//! - One triangle channel
//! - One noise channel
//! - One DMC (delta modulation channel)
//! - Frame counter
//!
//! This implementation tracks the timing and DMA side effects of all five
//! channels (length counters, the frame sequencer, and DMC sample
//! scheduling) with cycle accuracy, since those drive CPU-visible behavior
//! through $4015 and the frame IRQ/DMC IRQ lines. It does not synthesize or
//! mix an audio waveform; there is no host-facing sample output surface, so
//! the envelope/sweep/sequencer units that exist only to shape analog
//! output are not modeled.
//!
//! The APU runs at half the CPU clock rate (CPU/2).

use crate::{
    channel::Channel,
    dmc::Dmc,
    frame_counter::{FrameCounter, FrameEvent},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// APU structure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Apu {
    /// Pulse channel 1.
    pulse1: Channel,
    /// Pulse channel 2.
    pulse2: Channel,
    /// Triangle channel.
    triangle: Channel,
    /// Noise channel.
    noise: Channel,
    /// DMC channel.
    dmc: Dmc,
    /// Frame counter.
    frame_counter: FrameCounter,
    /// Cycle counter (for APU cycles).
    cycle: u64,
}

impl Apu {
    /// Create a new APU.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pulse1: Channel::new(),
            pulse2: Channel::new(),
            triangle: Channel::new(),
            noise: Channel::new(),
            dmc: Dmc::new(),
            frame_counter: FrameCounter::new(),
            cycle: 0,
        }
    }

    /// Reset the APU to initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read from an APU register.
    /// Only $4015 is readable.
    #[must_use]
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();

        // Reading status clears frame counter IRQ
        self.frame_counter.clear_irq();

        status
    }

    /// Peek at APU status without side effects.
    ///
    /// Returns the same value as `read_status()` but does not clear the
    /// frame counter IRQ. Useful for debugging/display purposes.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0u8;

        if self.pulse1.active() {
            status |= 0x01;
        }
        if self.pulse2.active() {
            status |= 0x02;
        }
        if self.triangle.active() {
            status |= 0x04;
        }
        if self.noise.active() {
            status |= 0x08;
        }
        if self.dmc.active() {
            status |= 0x10;
        }
        if self.frame_counter.irq_pending() {
            status |= 0x40;
        }
        if self.dmc.irq_pending() {
            status |= 0x80;
        }

        status
    }

    /// Write to an APU register.
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            // Pulse 1
            0x4000 => self.pulse1.set_halt(value & 0x20 != 0),
            0x4003 => self.pulse1.load_length(value >> 3),

            // Pulse 2
            0x4004 => self.pulse2.set_halt(value & 0x20 != 0),
            0x4007 => self.pulse2.load_length(value >> 3),

            // Triangle (the control/halt flag is bit 7, not bit 5)
            0x4008 => self.triangle.set_halt(value & 0x80 != 0),
            0x400B => self.triangle.load_length(value >> 3),

            // Noise
            0x400C => self.noise.set_halt(value & 0x20 != 0),
            0x400F => self.noise.load_length(value >> 3),

            // Registers that only shape the synthesized waveform
            // (duty/sweep/timer-period/envelope-period) have no CPU-visible
            // timing effect and are accepted as no-ops.
            0x4001 | 0x4002 | 0x4005 | 0x4006 | 0x4009 | 0x400A | 0x400D | 0x400E => {}

            // DMC
            0x4010 => self.dmc.write_ctrl(value),
            0x4011 => self.dmc.write_direct_load(value),
            0x4012 => self.dmc.write_sample_address(value),
            0x4013 => self.dmc.write_sample_length(value),

            // Status
            0x4015 => {
                self.pulse1.set_enabled(value & 0x01 != 0);
                self.pulse2.set_enabled(value & 0x02 != 0);
                self.triangle.set_enabled(value & 0x04 != 0);
                self.noise.set_enabled(value & 0x08 != 0);
                self.dmc.set_enabled(value & 0x10 != 0);
            }

            // Frame counter
            0x4017 => self.frame_counter.write(value),

            _ => {}
        }
    }

    /// Clock the APU for one CPU cycle.
    /// The APU runs at half the CPU clock rate; only the DMC's DMA
    /// scheduling and the frame sequencer are CPU-visible, so only they
    /// are clocked here.
    pub fn clock(&mut self) {
        if self.cycle % 2 == 1 {
            self.dmc.clock_timer();
        }

        let events = self.frame_counter.clock();
        for event in events.iter().flatten() {
            if matches!(event, FrameEvent::HalfFrame) {
                self.pulse1.clock_length();
                self.pulse2.clock_length();
                self.triangle.clock_length();
                self.noise.clock_length();
            }
            // QuarterFrame would clock envelope/linear-counter units, which
            // only affect the (unmodeled) audio waveform.
            // Irq is observed via frame_counter.irq_pending().
        }

        self.cycle = self.cycle.wrapping_add(1);
    }

    /// Check if DMC needs a sample byte.
    #[must_use]
    pub fn dmc_needs_sample(&self) -> bool {
        self.dmc.needs_sample()
    }

    /// Get the DMC sample address.
    #[must_use]
    pub fn dmc_sample_addr(&self) -> u16 {
        self.dmc.sample_addr()
    }

    /// Fill the DMC sample buffer.
    pub fn dmc_fill_sample(&mut self, sample: u8) {
        self.dmc.fill_sample_buffer(sample);
    }

    /// Check if any APU IRQ is pending.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending() || self.dmc.irq_pending()
    }

    /// Get the current APU cycle count.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Get the current APU cycle count (alias for `cycle()`).
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Get pulse 1 length counter value.
    #[must_use]
    pub const fn pulse1_length(&self) -> u8 {
        self.pulse1.length_value()
    }

    /// Get pulse 2 length counter value.
    #[must_use]
    pub const fn pulse2_length(&self) -> u8 {
        self.pulse2.length_value()
    }

    /// Get triangle length counter value.
    #[must_use]
    pub const fn triangle_length(&self) -> u8 {
        self.triangle.length_value()
    }

    /// Get noise length counter value.
    #[must_use]
    pub const fn noise_length(&self) -> u8 {
        self.noise.length_value()
    }

    /// Get DMC bytes remaining.
    #[must_use]
    pub fn dmc_bytes_remaining(&self) -> u16 {
        self.dmc.bytes_remaining()
    }

    /// Serialize the complete APU state (frame counter, length counters,
    /// and DMC) to a byte blob.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Restore APU state previously produced by [`Apu::save_state`].
    ///
    /// Malformed data is ignored; the APU is left unchanged.
    #[cfg(feature = "serde")]
    pub fn load_state(&mut self, data: &[u8]) {
        if let Ok(state) = postcard::from_bytes(data) {
            *self = state;
        }
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apu_initial() {
        let apu = Apu::new();
        assert_eq!(apu.cycle(), 0);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn test_apu_status_read() {
        let mut apu = Apu::new();
        let status = apu.read_status();
        assert_eq!(status, 0); // All channels disabled initially
    }

    #[test]
    fn test_apu_enable_channels() {
        let mut apu = Apu::new();
        apu.write(0x4015, 0x1F); // Enable all channels

        // Write timer high to load length counters
        apu.write(0x4003, 0xF8);
        apu.write(0x4007, 0xF8);
        apu.write(0x400B, 0xF8);
        apu.write(0x400F, 0xF8);
        apu.write(0x4013, 0x10);

        let status = apu.read_status();
        // Channels should be active
        assert!(status & 0x0F != 0);
    }

    #[test]
    fn test_apu_clock() {
        let mut apu = Apu::new();
        apu.clock();
        assert_eq!(apu.cycle(), 1);
        apu.clock();
        assert_eq!(apu.cycle(), 2);
    }

    #[test]
    fn test_apu_pulse1_length_tracks_enable() {
        let mut apu = Apu::new();
        apu.write(0x4015, 0x01);
        apu.write(0x4003, 0xF8); // load length counter
        assert!(apu.pulse1_length() > 0);

        apu.write(0x4015, 0x00);
        assert_eq!(apu.pulse1_length(), 0);
    }

    #[test]
    fn test_apu_reset() {
        let mut apu = Apu::new();
        apu.clock();
        apu.clock();
        apu.reset();
        assert_eq!(apu.cycle(), 0);
    }

    #[test]
    fn test_triangle_halt_is_bit7_not_bit5() {
        let mut apu = Apu::new();
        apu.write(0x4015, 0x04); // enable triangle
        apu.write(0x4008, 0x20); // bit 5 set, bit 7 clear -> not halted
        apu.write(0x400B, 0xF8); // load length counter
        let loaded = apu.triangle_length();
        assert!(loaded > 0);

        // Run a full frame-counter sequence; with halt clear the length
        // counter must have decremented by the end of it.
        for _ in 0..29830 {
            apu.clock();
        }
        assert!(apu.triangle_length() < loaded);
    }

    #[test]
    fn test_frame_counter_irq_observable_via_status() {
        let mut apu = Apu::new();
        // Default 4-step mode generates an IRQ at frame wrap unless inhibited.
        for _ in 0..(29830 * 2) {
            apu.clock();
        }
        assert!(apu.irq_pending());
        let status = apu.read_status();
        assert!(status & 0x40 != 0);
        assert!(!apu.irq_pending());
    }
}
