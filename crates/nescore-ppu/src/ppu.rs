//! Main PPU (Picture Processing Unit) implementation
//!
//! The Ricoh 2C02 PPU is responsible for generating the video output
//! for the NES. It renders 256×240 pixel frames at 60Hz (NTSC).
//!
//! # Memory Map (PPU address space)
//!
//! ```text
//! $0000-$0FFF: Pattern Table 0 (CHR ROM/RAM, via mapper)
//! $1000-$1FFF: Pattern Table 1 (CHR ROM/RAM, via mapper)
//! $2000-$2FFF: Nametables (internal VRAM with mirroring)
//! $3F00-$3F1F: Palette RAM
//! ```
//!
//! # CPU Registers ($2000-$2007)
//!
//! ```text
//! $2000: PPUCTRL   - Control register
//! $2001: PPUMASK   - Mask register
//! $2002: PPUSTATUS - Status register
//! $2003: OAMADDR   - OAM address
//! $2004: OAMDATA   - OAM data
//! $2005: PPUSCROLL - Scroll position
//! $2006: PPUADDR   - VRAM address
//! $2007: PPUDATA   - VRAM data
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::background::Background;
use crate::oam::{Oam, SecondaryOam};
use crate::registers::{PpuCtrl, PpuMask, PpuStatus};
use crate::scroll::ScrollRegisters;
use crate::sprites::{SpriteEvaluator, SpriteRenderer};
use crate::timing::Timing;
use crate::vram::{Mirroring, Vram};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame buffer width (256 pixels)
pub const FRAME_WIDTH: usize = 256;
/// Frame buffer height (240 pixels)
pub const FRAME_HEIGHT: usize = 240;
/// Frame buffer total size (256×240 = 61440 pixels)
pub const FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// Number of frames an open-bus decay group holds its value before the
/// corresponding latch bits decay to zero.
const DECAY_FRAMES: u8 = 30;

/// The PPU's 8-bit register open-bus latch decays in three independent
/// groups rather than all at once, because different registers drive
/// different subsets of the bus on a read: `$2002` (PPUSTATUS) only drives
/// bits 7-5, `$2004`/`$2007` buffered reads drive all 8, and `$2007`
/// palette reads drive only bits 5-0. Each group tracks its own remaining
/// lifetime in frames and is masked independently when the latch is read.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct OpenBusDecay {
    /// Frames remaining before bits 4-0 decay.
    low5: u8,
    /// Frames remaining before bit 5 decays.
    bit5: u8,
    /// Frames remaining before bits 7-6 decay.
    high2: u8,
}

impl OpenBusDecay {
    /// Refresh all three groups (any register write drives the full byte).
    fn refresh_all(&mut self) {
        self.low5 = DECAY_FRAMES;
        self.bit5 = DECAY_FRAMES;
        self.high2 = DECAY_FRAMES;
    }

    /// Refresh the groups a palette `$2007` read drives (bits 5-0).
    fn refresh_low(&mut self) {
        self.low5 = DECAY_FRAMES;
        self.bit5 = DECAY_FRAMES;
    }

    /// Refresh the groups a `$2002` read drives (bits 7-5).
    fn refresh_high(&mut self) {
        self.bit5 = DECAY_FRAMES;
        self.high2 = DECAY_FRAMES;
    }

    /// Age all groups by one frame.
    fn tick_frame(&mut self) {
        self.low5 = self.low5.saturating_sub(1);
        self.bit5 = self.bit5.saturating_sub(1);
        self.high2 = self.high2.saturating_sub(1);
    }

    /// Bitmask of latch bits that are still live (not yet decayed).
    const fn mask(self) -> u8 {
        let mut m = 0u8;
        if self.low5 > 0 {
            m |= 0x1F;
        }
        if self.bit5 > 0 {
            m |= 0x20;
        }
        if self.high2 > 0 {
            m |= 0xC0;
        }
        m
    }
}

/// Memory the PPU reaches out to when it needs pattern-table data.
///
/// Pattern tables ($0000-$1FFF) live on the cartridge, so every fetch is
/// routed through an implementor of this trait rather than owned directly
/// by `Ppu`. The caller is expected to forward these calls to the mapper.
pub trait PpuBus {
    /// Read a byte from pattern-table space ($0000-$1FFF).
    fn read(&mut self, addr: u16) -> u8;
    /// Write a byte to pattern-table space ($0000-$1FFF) (CHR-RAM only).
    fn write(&mut self, addr: u16, value: u8);
}

/// PPU (Picture Processing Unit)
///
/// Implements the Ricoh 2C02 PPU for cycle-accurate NES emulation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ppu {
    // Registers
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    scroll: ScrollRegisters,

    // Memory
    vram: Vram,
    oam: Oam,

    // Rendering components
    background: Background,
    sprite_renderer: SpriteRenderer,
    sprite_evaluator: SpriteEvaluator,
    secondary_oam: SecondaryOam,

    // Timing
    timing: Timing,

    // Frame buffer (palette indices 0-63)
    frame_buffer: Vec<u8>,

    // Internal state
    vram_read_buffer: u8,
    open_bus_latch: u8,
    decay: OpenBusDecay,
    nmi_pending: bool,
}

impl Ppu {
    /// Create new PPU
    pub fn new(mirroring: Mirroring) -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            scroll: ScrollRegisters::new(),
            vram: Vram::new(mirroring),
            oam: Oam::new(),
            background: Background::new(),
            sprite_renderer: SpriteRenderer::new(),
            sprite_evaluator: SpriteEvaluator::new(),
            secondary_oam: SecondaryOam::new(),
            timing: Timing::new(),
            frame_buffer: vec![0; FRAME_SIZE],
            vram_read_buffer: 0,
            open_bus_latch: 0,
            decay: OpenBusDecay::default(),
            nmi_pending: false,
        }
    }

    /// Check if we're currently in a visible rendering position
    ///
    /// Returns true if:
    /// - We're on a visible scanline (0-239)
    /// - We're past dot 0 (rendering has started for this scanline)
    /// - Rendering is enabled
    ///
    /// This is used to detect mid-scanline scroll/address writes which
    /// are used by games for split-screen effects.
    #[inline]
    fn is_visible_rendering_position(&self) -> bool {
        self.mask.rendering_enabled() && self.timing.is_visible_scanline() && self.timing.dot() > 0
    }

    /// Check whether the internal address-generation circuitry is actively
    /// scanning (visible scanlines or the pre-render line, with rendering
    /// enabled). A PPUDATA access while this holds does not perform the
    /// normal linear +1/+32 increment; the fetch pipeline's coarse-x/y
    /// increments fire instead, corrupting v.
    #[inline]
    fn is_rendering_active(&self) -> bool {
        self.mask.rendering_enabled()
            && (self.timing.is_visible_scanline() || self.timing.is_prerender_scanline())
    }

    /// Read from PPU register (CPU memory map $2000-$2007)
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address
    /// * `bus` - Pattern-table memory (mapper) for addresses < $2000
    pub fn read_register(&mut self, addr: u16, bus: &mut dyn PpuBus) -> u8 {
        match addr & 0x07 {
            // $2000: PPUCTRL (write-only) -> return decayed open bus
            0 => self.open_bus_latch & self.decay.mask(),

            // $2001: PPUMASK (write-only) -> return decayed open bus
            1 => self.open_bus_latch & self.decay.mask(),

            // $2002: PPUSTATUS
            2 => {
                // Reading $2002 only drives bits 7-5; bits 4-0 keep decaying
                // on whatever schedule their last driving read/write left
                // them on.
                let status = self.status.bits();

                // Race condition: Reading $2002 on the exact cycle VBlank is set
                // suppresses the NMI. This happens at scanline 241, dot 1.
                if self.timing.scanline() == 241 && self.timing.dot() == 1 {
                    self.nmi_pending = false;
                }

                self.status.clear_vblank(); // Reading clears VBlank flag
                self.scroll.read_ppustatus(); // Reset write latch

                // Bits 7-5 are freshly driven; bits 4-0 are whatever is left
                // of the decayed latch.
                let decayed_low = self.open_bus_latch & self.decay.mask() & 0x1F;
                let result = (status & 0xE0) | decayed_low;

                self.open_bus_latch = (self.open_bus_latch & 0x1F) | (status & 0xE0);
                self.decay.refresh_high();

                result
            }

            // $2003: OAMADDR (write-only) -> return decayed open bus
            3 => self.open_bus_latch & self.decay.mask(),

            // $2004: OAMDATA
            4 => {
                let data = self.oam.read();
                // OAMDATA drives the full 8 bits.
                self.open_bus_latch = data;
                self.decay.refresh_all();
                data
            }

            // $2005: PPUSCROLL (write-only) -> return decayed open bus
            5 => self.open_bus_latch & self.decay.mask(),

            // $2006: PPUADDR (write-only) -> return decayed open bus
            6 => self.open_bus_latch & self.decay.mask(),

            // $2007: PPUDATA
            7 => {
                let addr = self.scroll.vram_addr();

                // Read from CHR (mapper) or VRAM/Palette
                let data = if (addr & 0x3FFF) < 0x2000 {
                    bus.read(addr & 0x3FFF)
                } else {
                    self.vram.read(addr)
                };

                // Buffered read behavior
                let result = if addr >= 0x3F00 {
                    // Palette reads are immediate and only drive bits 5-0;
                    // bits 7-6 come from whatever is left of the latch.
                    let pal_data =
                        (data & 0x3F) | (self.open_bus_latch & self.decay.mask() & 0xC0);

                    // Reading the palette also updates the VRAM read buffer with
                    // the contents of the mirrored nametable address ($2F00-$2FFF)
                    self.vram_read_buffer = self.vram.read(addr - 0x1000);

                    self.open_bus_latch = (self.open_bus_latch & 0xC0) | (data & 0x3F);
                    self.decay.refresh_low();

                    pal_data
                } else {
                    // Normal reads return the previous buffer and drive all 8 bits.
                    let buffered = self.vram_read_buffer;
                    self.vram_read_buffer = data;
                    self.open_bus_latch = buffered;
                    self.decay.refresh_all();
                    buffered
                };

                // Increment VRAM address
                let increment = self.ctrl.vram_increment();
                self.scroll.increment_vram(increment);

                result
            }
            _ => unreachable!(),
        }
    }
    /// Write to PPU register (CPU memory map $2000-$2007)
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address
    /// * `value` - Value to write
    /// * `bus` - Pattern-table memory (mapper) for addresses < $2000
    pub fn write_register(&mut self, addr: u16, value: u8, bus: &mut dyn PpuBus) {
        // Writing to any register updates the open bus latch and refreshes decay
        self.open_bus_latch = value;
        self.decay.refresh_all();

        match addr & 0x07 {
            // $2000: PPUCTRL
            0 => {
                self.ctrl = PpuCtrl::from_bits_truncate(value);
                self.scroll.write_ppuctrl(value);

                // Check NMI enable
                if self.ctrl.nmi_enabled() && self.status.in_vblank() {
                    self.nmi_pending = true;
                }
            }

            // $2001: PPUMASK
            1 => {
                self.mask = PpuMask::from_bits_truncate(value);
            }

            // $2002: PPUSTATUS (read-only)
            2 => {}

            // $2003: OAMADDR
            3 => {
                self.oam.set_addr(value);
            }

            // $2004: OAMDATA
            4 => {
                self.oam.write(value);
            }

            // $2005: PPUSCROLL
            5 => {
                // Detect mid-scanline write for split-screen effects
                if self.is_visible_rendering_position() {
                    self.scroll.record_mid_scanline_write();
                }
                self.scroll.write_ppuscroll(value);
            }

            // $2006: PPUADDR
            6 => {
                // Detect mid-scanline write for split-screen effects
                // The second write to $2006 copies t to v, which affects rendering
                if self.is_visible_rendering_position() {
                    self.scroll.record_mid_scanline_write();
                }
                self.scroll.write_ppuaddr(value);
            }

            // $2007: PPUDATA
            7 => {
                let addr = self.scroll.vram_addr();

                // During active rendering the address-generation circuitry
                // is mid-scan: the write's data bus never carries the
                // caller's value all the way through, it carries V's own
                // low byte instead.
                let committed = if self.is_rendering_active() {
                    (addr & 0x00FF) as u8
                } else {
                    value
                };

                // Write to CHR (mapper) or VRAM/Palette
                if (addr & 0x3FFF) < 0x2000 {
                    bus.write(addr & 0x3FFF, committed);
                } else {
                    self.vram.write(addr, committed);
                }

                if self.is_rendering_active() {
                    // The address-generation circuitry is mid-scan and
                    // glitches v with its own coarse-x/y increments instead
                    // of honoring the normal +1/+32 step.
                    self.scroll.increment_x();
                    self.scroll.increment_y();
                } else {
                    let increment = self.ctrl.vram_increment();
                    self.scroll.increment_vram(increment);
                }
            }

            _ => unreachable!(),
        }
    }

    /// Perform OAM DMA (copy 256 bytes from CPU memory)
    pub fn oam_dma(&mut self, data: &[u8; 256]) {
        self.oam.dma_write(data);
    }

    /// Write a single byte to OAM at the current OAMADDR (auto-increments),
    /// as if through $2004. Used by the bus's OAM DMA loop, which drives
    /// the transfer one CPU-visible cycle at a time rather than handing
    /// the PPU a whole 256-byte block at once.
    pub fn write_oam(&mut self, value: u8) {
        self.oam.write(value);
    }

    /// Step PPU by one dot.
    ///
    /// `bus` supplies pattern-table reads from the cartridge (mapper) for
    /// background and sprite tile fetches.
    ///
    /// Returns true if an NMI was triggered this dot.
    #[inline]
    #[allow(clippy::too_many_lines)] // PPU step naturally handles many timing states
    pub fn step(&mut self, bus: &mut dyn PpuBus) -> bool {
        let rendering_enabled = self.mask.rendering_enabled();

        // Tick timing FIRST to advance to the next position
        let frame_ended = self.timing.tick(rendering_enabled);

        // Open bus decay counters tick once per frame (approx 30 frames to
        // fully decay, ~0.5s at 60 Hz).
        if frame_ended {
            self.decay.tick_frame();
        }

        let scanline = self.timing.scanline();
        let dot = self.timing.dot();

        // VBlank flag management (check AFTER tick)
        if self.timing.is_vblank_set_dot() {
            self.status.set_vblank();
            if self.ctrl.nmi_enabled() {
                self.nmi_pending = true;
            }
        }

        if self.timing.is_vblank_clear_dot() {
            self.status.clear_vblank();
            self.status.clear_sprite_flags();
            self.nmi_pending = false;
            // Reset frame-specific scroll tracking for mid-scanline detection
            self.scroll.start_frame();
        }

        // Rendering logic (visible and pre-render scanlines)
        if rendering_enabled && self.timing.is_rendering_scanline() {
            // Background rendering
            if self.timing.is_visible_dot() || self.timing.is_prefetch_dot() {
                self.background.shift_registers();

                // 8-dot tile fetch cycle
                // Dots are 1-indexed: 1-256 visible, 321-336 prefetch
                let fetch_dot = dot;
                match fetch_dot % 8 {
                    1 => {
                        // Fetch nametable byte (tile index)
                        let nt_addr = 0x2000 | (self.scroll.vram_addr() & 0x0FFF);
                        let tile_index = self.vram.read(nt_addr);
                        self.background.set_nametable_byte(tile_index);
                    }
                    3 => {
                        // Fetch attribute byte
                        let v = self.scroll.vram_addr();
                        let attr_addr =
                            0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                        let attr_byte = self.vram.read(attr_addr);
                        self.background.set_attribute_byte(
                            attr_byte,
                            self.scroll.coarse_x(),
                            self.scroll.coarse_y(),
                        );
                    }
                    5 => {
                        // Fetch pattern table low byte
                        let bg_base = self.ctrl.bg_table_addr();
                        let tile_index = self.background.nametable_byte();
                        let fine_y = self.scroll.fine_y();
                        let pattern_addr = bg_base + u16::from(tile_index) * 16 + u16::from(fine_y);
                        let pattern_low = bus.read(pattern_addr);
                        self.background.set_pattern_low(pattern_low);
                    }
                    7 => {
                        // Fetch pattern table high byte
                        let bg_base = self.ctrl.bg_table_addr();
                        let tile_index = self.background.nametable_byte();
                        let fine_y = self.scroll.fine_y();
                        let pattern_addr =
                            bg_base + u16::from(tile_index) * 16 + u16::from(fine_y) + 8;
                        let pattern_high = bus.read(pattern_addr);
                        self.background.set_pattern_high(pattern_high);
                    }
                    0 => {
                        // Load shift registers and increment coarse X
                        self.background.load_shift_registers();
                        self.scroll.increment_x();
                    }
                    _ => {}
                }

                // Increment Y at dot 256
                if dot == 256 {
                    self.scroll.increment_y();
                }
            }

            // Sprite rendering
            if self.timing.is_visible_dot() {
                self.sprite_renderer.tick();
            }

            // Scrolling updates
            if self.timing.is_hori_copy_dot() {
                self.scroll.copy_horizontal();
            }

            if self.timing.is_vert_copy_range() {
                self.scroll.copy_vertical();
            }

            // Sprite evaluation (visible scanlines only)
            if self.timing.is_visible_scanline() {
                if self.timing.is_sprite_eval_start() {
                    self.sprite_evaluator.start_evaluation();
                    self.secondary_oam.clear();
                }

                if self.timing.is_sprite_eval_range() {
                    self.sprite_evaluator.evaluate_step(
                        self.oam.data(),
                        scanline + 1, // Evaluate for next scanline
                        self.ctrl.sprite_height(),
                        &mut self.secondary_oam,
                    );
                }
            }

            // Sprite fetching (all rendering scanlines)
            if self.timing.is_sprite_fetch_start() {
                // Load sprites from secondary OAM into sprite renderer
                let sprite_zero_in_range = self.sprite_evaluator.sprite_zero_in_range();
                self.sprite_renderer
                    .load_sprites(&self.secondary_oam, sprite_zero_in_range);
            }

            if self.timing.is_sprite_fetch_range() {
                // Fetch sprite pattern data during dots 257-320 (8 dots per sprite, 8 sprites)
                let fetch_cycle = dot - 257; // 0-63
                let sprite_index = fetch_cycle / 8; // 0-7 (which sprite)
                let fetch_step = fetch_cycle % 8; // 0-7 (which step in the 8-dot cycle)

                // On step 7, fetch both pattern bytes and load into sprite renderer
                // (simplified from hardware timing which fetches in steps 4 and 6)
                if fetch_step == 7
                    && let Some(sprite) = self.secondary_oam.get_sprite(sprite_index as u8)
                {
                    let sprite_base = self.ctrl.sprite_table_addr();
                    let tile_index = sprite.tile_index;

                    // Calculate which row of the sprite to fetch
                    // Note: We're fetching for scanline+1 (next scanline) since
                    // sprite evaluation fills secondary OAM with sprites for next scanline
                    let next_scanline = scanline + 1;
                    let sprite_y = next_scanline.saturating_sub(sprite.y as u16);

                    // Clamp sprite_y to valid range (0-7 for 8x8 sprites)
                    // This prevents overflow when calculating flipped row
                    let sprite_y = sprite_y.min(7);

                    // Handle vertical flip
                    let row = if sprite.attributes.flip_vertical() {
                        7 - sprite_y
                    } else {
                        sprite_y
                    };

                    // Fetch pattern table low byte
                    let pattern_addr_low = sprite_base + u16::from(tile_index) * 16 + row;
                    let mut pattern_low = bus.read(pattern_addr_low);

                    // Fetch pattern table high byte
                    let pattern_addr_high = pattern_addr_low + 8;
                    let mut pattern_high = bus.read(pattern_addr_high);

                    // Handle horizontal flip
                    if sprite.attributes.flip_horizontal() {
                        pattern_low = pattern_low.reverse_bits();
                        pattern_high = pattern_high.reverse_bits();
                    }

                    // Load pattern data into sprite renderer
                    self.sprite_renderer.load_sprite_pattern(
                        sprite_index as u8,
                        pattern_low,
                        pattern_high,
                    );
                }
            }

            // Render pixel (visible scanlines only)
            if self.timing.is_visible_scanline() && self.timing.is_visible_dot() {
                let x = dot - 1;
                let y = scanline;
                self.render_pixel(x as usize, y as usize);
            }
        }

        let nmi = self.nmi_pending;
        if nmi {
            self.nmi_pending = false;
        }

        nmi
    }

    /// Render a single pixel
    #[inline]
    fn render_pixel(&mut self, x: usize, y: usize) {
        let mut bg_pixel = 0;
        let mut bg_palette = 0;

        // Get background pixel
        if self.mask.show_background() {
            let fine_x = self.scroll.fine_x();
            let (pixel, palette) = self.background.get_pixel(fine_x);
            bg_pixel = pixel;
            bg_palette = palette;
        }

        let mut sprite_pixel = 0;
        let mut sprite_palette = 0;
        let mut sprite_priority = false;
        let mut sprite_zero = false;

        // Get sprite pixel
        if self.mask.show_sprites()
            && let Some((pixel, palette, priority, is_sprite_zero)) =
                self.sprite_renderer.get_pixel()
        {
            sprite_pixel = pixel;
            sprite_palette = palette;
            sprite_priority = priority;
            sprite_zero = is_sprite_zero;
        }

        // Sprite 0 hit detection
        if sprite_zero && bg_pixel != 0 && sprite_pixel != 0 {
            self.status.set_sprite_zero_hit();
        }

        // Multiplexing (determine final pixel)
        let (final_pixel, final_palette) = if bg_pixel == 0 && sprite_pixel == 0 {
            // Both transparent - use backdrop color
            (0, 0)
        } else if bg_pixel == 0 {
            // Background transparent - show sprite
            (sprite_pixel, sprite_palette)
        } else if sprite_pixel == 0 {
            // Sprite transparent - show background
            (bg_pixel, bg_palette)
        } else {
            // Both opaque - check priority
            if sprite_priority {
                (bg_pixel, bg_palette)
            } else {
                (sprite_pixel, sprite_palette)
            }
        };

        // Read palette and write to frame buffer
        let palette_addr = (final_palette << 2) | final_pixel;
        let color_index = self.vram.read_palette(palette_addr);

        let offset = y * FRAME_WIDTH + x;
        self.frame_buffer[offset] = color_index;
    }

    /// Get frame buffer (palette indices 0-63)
    #[inline]
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    /// Set nametable mirroring
    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.vram.set_mirroring(mirroring);
    }

    /// Seed palette RAM with the bytes real hardware holds at power-on.
    pub fn seed_power_on_palette(&mut self, bytes: &[u8; 32]) {
        self.vram.seed_palette(bytes);
    }

    /// Reset to power-up state
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.scroll = ScrollRegisters::new();
        self.vram.reset();
        self.oam.reset();
        self.background.reset();
        self.sprite_renderer.reset();
        self.timing.reset();
        self.frame_buffer.fill(0);
        self.vram_read_buffer = 0;
        self.nmi_pending = false;
    }

    /// Get current scanline number (0-261)
    pub fn scanline(&self) -> u16 {
        self.timing.scanline()
    }

    /// Get current dot within scanline (0-340)
    pub fn dot(&self) -> u16 {
        self.timing.dot()
    }

    /// Get current VRAM address (v register)
    pub fn vram_addr(&self) -> u16 {
        self.scroll.vram_addr()
    }

    /// Get temporary VRAM address (t register)
    pub fn temp_vram_addr(&self) -> u16 {
        self.scroll.temp_vram_addr()
    }

    /// Get fine X scroll (0-7)
    pub fn fine_x(&self) -> u8 {
        self.scroll.fine_x()
    }

    /// Get coarse X scroll (tile column 0-31)
    pub fn coarse_x(&self) -> u8 {
        self.scroll.coarse_x()
    }

    /// Get coarse Y scroll (tile row 0-31)
    pub fn coarse_y(&self) -> u8 {
        self.scroll.coarse_y()
    }

    /// Get fine Y scroll (pixel row 0-7)
    pub fn fine_y(&self) -> u8 {
        self.scroll.fine_y()
    }

    /// Check if a mid-scanline write was detected this frame
    ///
    /// Games use mid-scanline writes to $2005/$2006 for split-screen effects
    /// like Super Mario Bros. 3's status bar.
    pub fn mid_scanline_write_detected(&self) -> bool {
        self.scroll.mid_scanline_write_detected()
    }

    /// Get the last v value before a mid-scanline update (for debugging)
    pub fn last_v_before_update(&self) -> u16 {
        self.scroll.last_v_before_update()
    }

    /// Serialize the complete PPU state (registers, VRAM/OAM, pipeline
    /// shifters, timing, and open-bus decay) to a byte blob.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Restore PPU state previously produced by [`Ppu::save_state`].
    ///
    /// Malformed data is ignored; the PPU is left unchanged.
    #[cfg(feature = "serde")]
    pub fn load_state(&mut self, data: &[u8]) {
        if let Ok(state) = postcard::from_bytes(data) {
            *self = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pattern table backed by a flat byte array, for register-level tests
    /// that don't care about real CHR data.
    struct TestBus {
        chr: [u8; 0x2000],
    }

    impl TestBus {
        fn new() -> Self {
            Self { chr: [0; 0x2000] }
        }
    }

    impl PpuBus for TestBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.chr[(addr & 0x1FFF) as usize]
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.chr[(addr & 0x1FFF) as usize] = value;
        }
    }

    #[test]
    fn test_ppu_creation() {
        let ppu = Ppu::new(Mirroring::Horizontal);
        assert_eq!(ppu.frame_buffer().len(), FRAME_SIZE);
    }

    #[test]
    fn test_ppuctrl_write() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        ppu.write_register(0x2000, 0x80, &mut bus); // Enable NMI
        assert!(ppu.ctrl.nmi_enabled());
    }

    #[test]
    fn test_ppustatus_read() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        ppu.status.set_vblank();
        let status = ppu.read_register(0x2002, &mut bus);

        assert_eq!(status & 0x80, 0x80); // VBlank bit set
        assert!(!ppu.status.in_vblank()); // Should be cleared after read
    }

    #[test]
    fn test_oam_write() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        ppu.write_register(0x2003, 0x00, &mut bus); // OAMADDR = 0
        ppu.write_register(0x2004, 0x42, &mut bus); // OAMDATA = $42

        ppu.write_register(0x2003, 0x00, &mut bus); // Reset OAMADDR
        let value = ppu.read_register(0x2004, &mut bus);
        assert_eq!(value, 0x42);
    }

    #[test]
    fn test_vram_write_read() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        // Write address $2000
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);

        // Write data
        ppu.write_register(0x2007, 0x55, &mut bus);

        // Read address $2000
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);

        // First read is buffered (returns garbage)
        let _ = ppu.read_register(0x2007, &mut bus);
        // Second read returns actual data
        let value = ppu.read_register(0x2007, &mut bus);
        assert_eq!(value, 0x55);
    }

    #[test]
    fn test_palette_immediate_read() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        // Write to palette
        ppu.write_register(0x2006, 0x3F, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);
        ppu.write_register(0x2007, 0x0F, &mut bus);

        // Read from palette (immediate, no buffer)
        ppu.write_register(0x2006, 0x3F, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);
        let value = ppu.read_register(0x2007, &mut bus);
        assert_eq!(value, 0x0F);
    }

    #[test]
    fn test_vblank_flag() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        // Step to VBlank set point (scanline 241, dot 1)
        while ppu.timing.scanline() != 241 || ppu.timing.dot() != 0 {
            ppu.step(&mut bus);
        }

        // Next step should set VBlank
        ppu.step(&mut bus);
        assert!(ppu.status.in_vblank());
    }

    #[test]
    fn test_nmi_trigger() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        // Enable NMI
        ppu.write_register(0x2000, 0x80, &mut bus);

        // Step to VBlank
        while ppu.timing.scanline() != 241 || ppu.timing.dot() != 0 {
            ppu.step(&mut bus);
        }

        // Next step should trigger NMI
        let nmi = ppu.step(&mut bus);
        assert!(nmi);
    }

    #[test]
    fn test_scroll_write() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut bus = TestBus::new();

        // Write X scroll = 100
        ppu.write_register(0x2005, 100, &mut bus);
        // Write Y scroll = 50
        ppu.write_register(0x2005, 50, &mut bus);

        // Verify scroll registers updated
        assert_eq!(ppu.scroll.fine_x(), 100 & 0x07);
    }

    #[test]
    fn test_oam_dma() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        let mut data = [0u8; 256];

        // Fill with test pattern
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = i as u8;
        }

        ppu.oam_dma(&data);

        // Verify OAM contents by reading each address
        for i in 0..256u16 {
            ppu.oam.set_addr(i as u8);
            let expected = if i % 4 == 2 {
                // Attribute bytes (byte 2 of each sprite) have bits 2-4 masked
                // due to hardware - these bits don't physically exist in PPU OAM
                (i as u8) & 0xE3
            } else {
                i as u8
            };
            assert_eq!(ppu.oam.read(), expected);
        }
    }

    #[test]
    fn test_write_oam_auto_increments() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);

        ppu.write_oam(0x11);
        ppu.write_oam(0x22);

        ppu.oam.set_addr(0);
        assert_eq!(ppu.oam.read(), 0x11);
        ppu.oam.set_addr(1);
        assert_eq!(ppu.oam.read(), 0x22);
    }
}
