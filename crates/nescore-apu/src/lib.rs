//! NES APU (Audio Processing Unit) Emulation.
//!
//! This crate provides a cycle-accurate model of the NES 2A03 APU's timing
//! and DMA behavior. The APU contains five channels:
//!
//! - **Pulse 1 & 2**: Square wave generators
//! - **Triangle**: Triangle wave generator
//! - **Noise**: Pseudo-random noise generator
//! - **DMC**: Delta modulation channel, including sample DMA scheduling
//!
//! Each channel's length counter is tracked precisely because it is
//! observable from the CPU side through the $4015 status register. This
//! crate does not synthesize or mix an audio waveform — there is no sample
//! output surface — so the envelope, sweep, and sequencer units that exist
//! purely to shape analog output are not modeled; pulse/triangle/noise are
//! reduced to their length-counter timing (see `channel::Channel`).
//!
//! # Architecture
//!
//! The APU runs at half the CPU clock rate. The frame counter provides
//! timing signals for length-counter updates and the frame IRQ at specific
//! cycle intervals; the DMC schedules sample-fetch DMA independently.
//!
//! # Example
//!
//! ```no_run
//! use nescore_apu::Apu;
//!
//! let mut apu = Apu::new();
//!
//! // Enable pulse channel 1
//! apu.write(0x4015, 0x01);
//!
//! // Load pulse 1's length counter (upper 5 bits of $4003)
//! apu.write(0x4003, 0x00);
//!
//! // Clock the APU
//! for _ in 0..29780 {
//!     apu.clock();
//! }
//! assert!(apu.pulse1_length() > 0);
//! ```
//!
//! # no_std Support
//!
//! This crate supports `no_std` environments with the `alloc` crate.
//! Enable the `std` feature (enabled by default) for standard library support.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod apu;
mod channel;
mod dmc;
mod frame_counter;
mod length_counter;

pub use apu::Apu;
pub use channel::Channel;
pub use dmc::Dmc;
pub use frame_counter::{FrameCounter, FrameCounterMode, FrameEvent};
pub use length_counter::LengthCounter;

/// NTSC CPU clock rate in Hz.
pub const CPU_CLOCK_NTSC: u32 = 1_789_773;

/// PAL CPU clock rate in Hz.
pub const CPU_CLOCK_PAL: u32 = 1_662_607;

/// NTSC APU sample rate (before resampling).
/// This is the CPU clock rate since we sample every CPU cycle.
pub const APU_SAMPLE_RATE_NTSC: u32 = CPU_CLOCK_NTSC;

/// Cycles per frame (NTSC).
pub const CYCLES_PER_FRAME_NTSC: u32 = 29780;

/// Cycles per frame (PAL).
pub const CYCLES_PER_FRAME_PAL: u32 = 33247;
