//! NES Console Implementation.
//!
//! The Console struct provides the high-level emulation API, managing the
//! CPU, PPU, APU, and mapper integration with proper timing.

use crate::bus::{ControllerState, NesBus};
#[cfg(feature = "serde")]
use crate::save_state::{SAVE_STATE_MAGIC, SAVE_STATE_VERSION, SaveStateError, StateReader, StateWriter};
use nescore_cpu::{Cpu, StatusFlags};
use nescore_mappers::{Mapper, Rom, RomError, create_mapper};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

/// NES emulation timing constants.
pub mod timing {
    /// Master clock frequency (NTSC).
    pub const MASTER_CLOCK_NTSC: u32 = 21_477_272;
    /// CPU clock frequency (NTSC).
    pub const CPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 12;
    /// PPU clock frequency (NTSC).
    pub const PPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 4;
    /// CPU cycles per frame (NTSC).
    pub const CPU_CYCLES_PER_FRAME: u32 = 29_780;
    /// PPU dots per scanline.
    pub const PPU_DOTS_PER_SCANLINE: u16 = 341;
    /// Total scanlines (including vblank).
    pub const PPU_SCANLINES: u16 = 262;
    /// Target frame rate (NTSC).
    pub const FRAME_RATE_NTSC: f64 = 60.0988;
}

/// Console error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsoleError {
    /// ROM loading or mapper construction failed.
    #[error("ROM error: {0}")]
    Rom(#[from] RomError),
    /// Console was asked to do something it can't in its current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Power-on values for the 32-byte palette RAM, matching what real hardware
/// (and therefore every observable test ROM) finds there before any write.
pub const POWER_ON_PALETTE: [u8; 32] = [
    0x09, 0x01, 0x00, 0x01, 0x00, 0x02, 0x02, 0x0D, 0x08, 0x10, 0x08, 0x24, 0x00, 0x00, 0x04, 0x2C,
    0x09, 0x01, 0x34, 0x03, 0x00, 0x04, 0x00, 0x14, 0x08, 0x3A, 0x00, 0x02, 0x00, 0x20, 0x2C, 0x08,
];

/// NES console emulator.
pub struct Console {
    /// 6502 CPU.
    cpu: Cpu,
    /// System bus (PPU, APU, mapper, RAM).
    bus: NesBus,
    /// Frame buffer (256x240 RGBA).
    framebuffer: Vec<u8>,
    /// Total CPU cycles executed.
    total_cycles: u64,
    /// Frame counter.
    frame_count: u64,
    /// Is emulation running?
    running: bool,
}

impl Console {
    /// Create a new console with the given ROM.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn new(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_data)?;
        let mapper = create_mapper(&rom)?;
        Self::with_mapper(mapper)
    }

    /// Create a new console from ROM bytes (alias for `new`).
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn from_rom_bytes(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        Self::new(rom_data)
    }

    /// Create a new console from ROM bytes with sample rate configuration.
    ///
    /// Note: The sample rate is currently unused as the APU handles resampling internally.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn from_rom_bytes_with_sample_rate(
        rom_data: &[u8],
        _sample_rate: u32,
    ) -> Result<Self, ConsoleError> {
        Self::new(rom_data)
    }

    /// Create a console with a pre-created mapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the console cannot be initialized.
    pub fn with_mapper(mapper: Box<dyn Mapper>) -> Result<Self, ConsoleError> {
        let bus = NesBus::new(mapper);
        let cpu = Cpu::new();

        Ok(Self {
            cpu,
            bus,
            framebuffer: vec![0; 256 * 240 * 4],
            total_cycles: 0,
            frame_count: 0,
            running: true,
        })
    }

    /// Reset the console to initial state.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.reset();
        self.total_cycles = 0;
        self.running = true;
    }

    /// Power on the console (cold boot).
    pub fn power_on(&mut self) {
        self.reset();
    }

    /// Run emulation for one CPU instruction.
    ///
    /// Every individual bus access the instruction performs (including
    /// dummy reads) ticks the APU once and the PPU three times inline,
    /// through `NesBus`'s `Bus` implementation — this method just drives
    /// `Cpu::tick` until it reports an instruction boundary. This is the
    /// per-cycle coordinator loop, replacing the bulk post-hoc
    /// `step_components` this crate used previously.
    ///
    /// Returns the number of CPU cycles executed.
    pub fn step(&mut self) -> u8 {
        if !self.running {
            return 0;
        }

        // Handle DMC DMA stall: the stolen cycle still ticks everything.
        if self.bus.dmc_stall_active() {
            self.bus.decrement_dmc_stall();
            self.bus.dummy_read();
            self.bus.add_cpu_cycles(1);
            self.total_cycles += 1;
            return 1;
        }

        // Handle OAM DMA: commits at the start of the next read cycle.
        if self.bus.oam_dma_pending() {
            let dma_cycles = self.bus.execute_oam_dma();
            self.total_cycles += u64::from(dma_cycles);
            return dma_cycles as u8;
        }

        // Handle interrupts
        if self.bus.nmi_pending() {
            self.bus.acknowledge_nmi();
            self.cpu.trigger_nmi();
        } else if self.bus.irq_pending() && !self.cpu.status.contains(StatusFlags::I) {
            self.cpu.set_irq(true);
        }

        // Execute one CPU instruction, one cycle (one bus access) at a time.
        let mut cycles: u8 = 0;
        loop {
            let instruction_done = self.cpu.tick(&mut self.bus);
            cycles = cycles.saturating_add(1);
            if instruction_done {
                break;
            }
        }

        self.bus.add_cpu_cycles(cycles);
        self.total_cycles += u64::from(cycles);

        cycles
    }

    /// Run emulation for one frame (approximately 29,780 CPU cycles).
    ///
    /// Returns the actual number of CPU cycles executed.
    pub fn step_frame(&mut self) -> u64 {
        let start_cycles = self.total_cycles;
        let target_cycles = self.total_cycles + u64::from(timing::CPU_CYCLES_PER_FRAME);

        while self.total_cycles < target_cycles && self.running {
            self.step();
        }

        // Copy PPU framebuffer
        self.update_framebuffer();
        self.frame_count += 1;

        self.total_cycles - start_cycles
    }

    /// Run emulation for one frame with cycle-accurate timing.
    ///
    /// This is an alias for `step_frame()` for API compatibility.
    /// Returns the actual number of CPU cycles executed.
    pub fn step_frame_accurate(&mut self) -> u64 {
        self.step_frame()
    }

    /// Update the framebuffer from PPU output.
    fn update_framebuffer(&mut self) {
        let ppu_buffer = self.bus.ppu.frame_buffer();

        // Convert PPU palette indices to RGBA
        for (i, &palette_idx) in ppu_buffer.iter().enumerate() {
            let rgb = crate::palette::NES_PALETTE[palette_idx as usize & 0x3F];
            let offset = i * 4;
            self.framebuffer[offset] = rgb.0; // R
            self.framebuffer[offset + 1] = rgb.1; // G
            self.framebuffer[offset + 2] = rgb.2; // B
            self.framebuffer[offset + 3] = 255; // A
        }
    }

    /// Get the current framebuffer (256x240 RGBA).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Set controller 1 state from button byte.
    pub fn set_controller_1(&mut self, buttons: u8) {
        self.bus.controller1 = ControllerState { buttons };
    }

    /// Set controller 2 state from button byte.
    pub fn set_controller_2(&mut self, buttons: u8) {
        self.bus.controller2 = ControllerState { buttons };
    }

    /// Set controller 1 state.
    pub fn set_controller1(&mut self, state: ControllerState) {
        self.bus.controller1 = state;
    }

    /// Set controller 2 state.
    pub fn set_controller2(&mut self, state: ControllerState) {
        self.bus.controller2 = state;
    }

    /// Get controller 1 state.
    #[must_use]
    pub fn controller1(&self) -> ControllerState {
        self.bus.controller1
    }

    /// Get controller 2 state.
    #[must_use]
    pub fn controller2(&self) -> ControllerState {
        self.bus.controller2
    }

    /// Get the total CPU cycles executed.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Get the frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if emulation is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause emulation.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume emulation.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Get a reference to the CPU for debugging.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get a reference to the PPU for debugging.
    #[must_use]
    pub fn ppu(&self) -> &nescore_ppu::Ppu {
        &self.bus.ppu
    }

    /// Get a reference to the APU for debugging.
    #[must_use]
    pub fn apu(&self) -> &nescore_apu::Apu {
        &self.bus.apu
    }

    /// Get the total CPU cycles (alias for `total_cycles`).
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Peek at memory without side effects.
    ///
    /// This is useful for debugging/display purposes where we don't want
    /// to trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Peek at memory without side effects (alias for `peek`).
    #[must_use]
    pub fn peek_memory(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Write a byte directly onto the bus, as if the CPU had written it.
    ///
    /// Goes through the same register/mapper side effects a real CPU write
    /// would trigger; useful for test harnesses poking known-good state.
    pub fn poke(&mut self, addr: u16, value: u8) {
        use nescore_cpu::Bus;
        self.bus.write(addr, value);
    }

    /// Get a reference to the bus for debugging.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Get a mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Get the mapper number.
    #[must_use]
    pub fn mapper_number(&self) -> u16 {
        self.bus.mapper.mapper_number()
    }

    /// Get the mapper name.
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        self.bus.mapper.mapper_name()
    }

    /// Check if the ROM has battery-backed RAM.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.bus.mapper.has_battery()
    }

    /// Get battery-backed RAM for saving.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Load battery-backed RAM.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.mapper.set_battery_ram(data);
    }

    /// Byte-exact serialization of every piece of live emulator state: CPU,
    /// PPU, APU, the active mapper's banking state, both RAM regions the bus
    /// owns, and the controller/open-bus latches.
    ///
    /// `load(save(x))` is a no-op; `save` after `load(b)` reproduces `b`.
    /// Only call this between frames — mid-frame the PPU/APU pipeline holds
    /// transient state that round-trips fine but is meaningless to inspect.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn save(&self) -> Vec<u8> {
        let mut w = StateWriter::new();
        w.write_bytes(&SAVE_STATE_MAGIC);
        w.write_u32(SAVE_STATE_VERSION);
        w.write_u64(self.total_cycles);
        w.write_u64(self.frame_count);
        w.write_bool(self.running);
        w.write_blob(&self.cpu.save_state());
        w.write_blob(&self.bus.save_state());
        let body = w.into_vec();
        let checksum = crc32fast::hash(&body);
        let mut out = Vec::with_capacity(body.len() + 4);
        out.extend_from_slice(&checksum.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Size in bytes of the buffer [`Console::save`] would currently
    /// produce. Constant across execution for a fixed ROM.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn save_state_size(&self) -> usize {
        self.save().len()
    }

    /// Restore state previously produced by [`Console::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is truncated, the checksum does not
    /// match, the magic bytes are wrong, or the format version is
    /// unsupported.
    #[cfg(feature = "serde")]
    pub fn load(&mut self, data: &[u8]) -> Result<(), SaveStateError> {
        if data.len() < 4 {
            return Err(SaveStateError::InsufficientData {
                needed: 4,
                available: data.len(),
            });
        }
        let checksum = u32::from_le_bytes(data[0..4].try_into().unwrap_or([0; 4]));
        let body = &data[4..];
        let actual = crc32fast::hash(body);
        if actual != checksum {
            return Err(SaveStateError::ChecksumMismatch {
                expected: checksum,
                actual,
            });
        }

        let mut r = StateReader::new(body);
        let magic = r.read_bytes(4)?;
        if magic != SAVE_STATE_MAGIC {
            return Err(SaveStateError::InvalidMagic);
        }
        let version = r.read_u32()?;
        if version != SAVE_STATE_VERSION {
            return Err(SaveStateError::UnsupportedVersion(version));
        }

        let total_cycles = r.read_u64()?;
        let frame_count = r.read_u64()?;
        let running = r.read_bool()?;
        let cpu_blob = r.read_blob()?;
        let bus_blob = r.read_blob()?;

        self.cpu.load_state(cpu_blob);
        self.bus.load_state(bus_blob)?;
        self.total_cycles = total_cycles;
        self.frame_count = frame_count;
        self.running = running;
        self.update_framebuffer();

        Ok(())
    }
}
