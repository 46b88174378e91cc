//! MMC2/MMC4 Mappers (Mapper 9/10).
//!
//! MMC2 (Punch-Out!!) and MMC4 (Fire Emblem, Famicom Wars U.S. prototypes)
//! share the same CHR dual-latch trick: reading specific pattern-table
//! addresses during background rendering flips a hidden per-half latch that
//! selects between two 4KB CHR banks for that half of the pattern table.
//! They differ only in PRG-ROM banking granularity (MMC2 switches 8KB at
//! $8000-$9FFF with three fixed 8KB banks above it; MMC4 switches 16KB at
//! $8000-$BFFF with one fixed 16KB bank above it).
//!
//! # Register Map (shared by both)
//!
//! - $A000-$AFFF: PRG-ROM bank select
//! - $B000-$BFFF: CHR bank for $0000-$0FFF, selected when latch 0 reads "FD"
//! - $C000-$CFFF: CHR bank for $0000-$0FFF, selected when latch 0 reads "FE"
//! - $D000-$DFFF: CHR bank for $1000-$1FFF, selected when latch 1 reads "FD"
//! - $E000-$EFFF: CHR bank for $1000-$1FFF, selected when latch 1 reads "FE"
//! - $F000-$FFFF: Mirroring select (bit 0: 0 = vertical, 1 = horizontal)
//!
//! # Games
//!
//! - Mike Tyson's Punch-Out!! (MMC2)
//! - Fire Emblem / Fire Emblem Gaiden (MMC4)

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;
use core::cell::Cell;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shared CHR dual-latch state.
///
/// Reading PPU $0FD8 or $0FE8 flips latch 0; reading $1FD8-$1FDF or
/// $1FE8-$1FEF flips latch 1. `false` means the latch reads "FD", `true`
/// means it reads "FE". Interior mutability is required because
/// `Mapper::read_chr` takes `&self`, yet real hardware mutates this latch
/// as a side effect of the PPU reading those specific addresses.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct ChrLatch {
    latch0: Cell<bool>,
    latch1: Cell<bool>,
}

impl ChrLatch {
    fn observe(&self, addr: u16) {
        match addr {
            0x0FD8 => self.latch0.set(false),
            0x0FE8 => self.latch0.set(true),
            0x1FD8..=0x1FDF => self.latch1.set(false),
            0x1FE8..=0x1FEF => self.latch1.set(true),
            _ => {}
        }
    }

    fn chr_bank(&self, half: u8, bank_fd: u8, bank_fe: u8) -> u8 {
        let selected = if half == 0 {
            self.latch0.get()
        } else {
            self.latch1.get()
        };
        if selected { bank_fe } else { bank_fd }
    }
}

fn mirroring_from_bit(val: u8) -> Mirroring {
    if val & 1 != 0 {
        Mirroring::Horizontal
    } else {
        Mirroring::Vertical
    }
}

fn chr_addr(bank: u8, chr_banks: usize, addr: u16) -> usize {
    let bank = (bank as usize) % chr_banks.max(1);
    bank * 4096 + (addr & 0x0FFF) as usize
}

/// MMC2 mapper implementation (Mapper 9).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mmc2 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_banks: usize,
    chr_banks_4k: usize,
    prg_bank: u8,
    chr_bank_0_fd: u8,
    chr_bank_0_fe: u8,
    chr_bank_1_fd: u8,
    chr_bank_1_fe: u8,
    mirroring: Mirroring,
    latch: ChrLatch,
}

impl Mmc2 {
    /// Create a new MMC2 mapper from ROM data.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let prg_banks = (rom.prg_rom.len() / 8192).max(1);
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0u8; 8192]
        } else {
            rom.chr_rom.clone()
        };
        let chr_banks_4k = (chr.len() / 4096).max(1);

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_banks,
            chr_banks_4k,
            prg_bank: 0,
            chr_bank_0_fd: 0,
            chr_bank_0_fe: 0,
            chr_bank_1_fd: 0,
            chr_bank_1_fe: 0,
            mirroring: rom.header.mirroring,
            latch: ChrLatch::default(),
        }
    }

    fn prg_addr(&self, addr: u16) -> usize {
        let bank = match addr {
            0x8000..=0x9FFF => (self.prg_bank as usize) % self.prg_banks,
            0xA000..=0xBFFF => self.prg_banks.saturating_sub(3) % self.prg_banks.max(1),
            0xC000..=0xDFFF => self.prg_banks.saturating_sub(2) % self.prg_banks.max(1),
            0xE000..=0xFFFF => self.prg_banks.saturating_sub(1),
            _ => 0,
        };
        bank * 8192 + (addr & 0x1FFF) as usize
    }
}

impl Mapper for Mmc2 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => self.prg_rom.get(self.prg_addr(addr)).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        match addr {
            0xA000..=0xAFFF => self.prg_bank = val & 0x0F,
            0xB000..=0xBFFF => self.chr_bank_0_fd = val & 0x1F,
            0xC000..=0xCFFF => self.chr_bank_0_fe = val & 0x1F,
            0xD000..=0xDFFF => self.chr_bank_1_fd = val & 0x1F,
            0xE000..=0xEFFF => self.chr_bank_1_fe = val & 0x1F,
            0xF000..=0xFFFF => self.mirroring = mirroring_from_bit(val),
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x0FFF => {
                let bank = self.latch.chr_bank(0, self.chr_bank_0_fd, self.chr_bank_0_fe);
                self.chr
                    .get(chr_addr(bank, self.chr_banks_4k, addr))
                    .copied()
                    .unwrap_or(0)
            }
            0x1000..=0x1FFF => {
                let bank = self.latch.chr_bank(1, self.chr_bank_1_fd, self.chr_bank_1_fe);
                self.chr
                    .get(chr_addr(bank, self.chr_banks_4k, addr))
                    .copied()
                    .unwrap_or(0)
            }
            _ => 0,
        };
        self.latch.observe(addr);
        value
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        if !self.chr_is_ram {
            return;
        }
        let half = u8::from(addr >= 0x1000);
        let bank = self.latch.chr_bank(
            half,
            if half == 0 {
                self.chr_bank_0_fd
            } else {
                self.chr_bank_1_fd
            },
            if half == 0 {
                self.chr_bank_0_fe
            } else {
                self.chr_bank_1_fe
            },
        );
        let offset = chr_addr(bank, self.chr_banks_4k, addr);
        if let Some(byte) = self.chr.get_mut(offset) {
            *byte = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        9
    }

    fn mapper_name(&self) -> &'static str {
        "MMC2"
    }

    fn save_state(&self) -> Vec<u8> {
        #[cfg(feature = "serde")]
        {
            postcard::to_allocvec(self).unwrap_or_default()
        }
        #[cfg(not(feature = "serde"))]
        {
            Vec::new()
        }
    }

    fn load_state(&mut self, data: &[u8]) {
        #[cfg(feature = "serde")]
        {
            if let Ok(state) = postcard::from_bytes(data) {
                *self = state;
            }
        }
        #[cfg(not(feature = "serde"))]
        {
            let _ = data;
        }
    }


    fn reset(&mut self) {
        self.prg_bank = 0;
        self.chr_bank_0_fd = 0;
        self.chr_bank_0_fe = 0;
        self.chr_bank_1_fd = 0;
        self.chr_bank_1_fe = 0;
        self.latch.latch0.set(false);
        self.latch.latch1.set(false);
    }
}

/// MMC4 mapper implementation (Mapper 10).
///
/// Identical CHR dual-latch mechanism to [`Mmc2`]; PRG-ROM banks in 16KB
/// windows instead of 8KB, and has optional battery-backed PRG-RAM.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mmc4 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    has_battery: bool,
    prg_banks: usize,
    chr_banks_4k: usize,
    prg_bank: u8,
    chr_bank_0_fd: u8,
    chr_bank_0_fe: u8,
    chr_bank_1_fd: u8,
    chr_bank_1_fe: u8,
    mirroring: Mirroring,
    latch: ChrLatch,
}

impl Mmc4 {
    /// Create a new MMC4 mapper from ROM data.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let prg_banks = (rom.prg_rom.len() / 16384).max(1);
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0u8; 8192]
        } else {
            rom.chr_rom.clone()
        };
        let chr_banks_4k = (chr.len() / 4096).max(1);

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0u8; 8192],
            has_battery: rom.header.has_battery,
            prg_banks,
            chr_banks_4k,
            prg_bank: 0,
            chr_bank_0_fd: 0,
            chr_bank_0_fe: 0,
            chr_bank_1_fd: 0,
            chr_bank_1_fe: 0,
            mirroring: rom.header.mirroring,
            latch: ChrLatch::default(),
        }
    }

    fn prg_addr(&self, addr: u16) -> usize {
        let bank = match addr {
            0x8000..=0xBFFF => (self.prg_bank as usize) % self.prg_banks,
            0xC000..=0xFFFF => self.prg_banks.saturating_sub(1),
            _ => 0,
        };
        bank * 16384 + (addr & 0x3FFF) as usize
    }
}

impl Mapper for Mmc4 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                let offset = (addr - 0x6000) as usize;
                self.prg_ram.get(offset).copied().unwrap_or(0)
            }
            0x8000..=0xFFFF => self.prg_rom.get(self.prg_addr(addr)).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        match addr {
            0x6000..=0x7FFF => {
                let offset = (addr - 0x6000) as usize;
                if let Some(byte) = self.prg_ram.get_mut(offset) {
                    *byte = val;
                }
            }
            0xA000..=0xAFFF => self.prg_bank = val & 0x0F,
            0xB000..=0xBFFF => self.chr_bank_0_fd = val & 0x1F,
            0xC000..=0xCFFF => self.chr_bank_0_fe = val & 0x1F,
            0xD000..=0xDFFF => self.chr_bank_1_fd = val & 0x1F,
            0xE000..=0xEFFF => self.chr_bank_1_fe = val & 0x1F,
            0xF000..=0xFFFF => self.mirroring = mirroring_from_bit(val),
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x0FFF => {
                let bank = self.latch.chr_bank(0, self.chr_bank_0_fd, self.chr_bank_0_fe);
                self.chr
                    .get(chr_addr(bank, self.chr_banks_4k, addr))
                    .copied()
                    .unwrap_or(0)
            }
            0x1000..=0x1FFF => {
                let bank = self.latch.chr_bank(1, self.chr_bank_1_fd, self.chr_bank_1_fe);
                self.chr
                    .get(chr_addr(bank, self.chr_banks_4k, addr))
                    .copied()
                    .unwrap_or(0)
            }
            _ => 0,
        };
        self.latch.observe(addr);
        value
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        if !self.chr_is_ram {
            return;
        }
        let half = u8::from(addr >= 0x1000);
        let bank = self.latch.chr_bank(
            half,
            if half == 0 {
                self.chr_bank_0_fd
            } else {
                self.chr_bank_1_fd
            },
            if half == 0 {
                self.chr_bank_0_fe
            } else {
                self.chr_bank_1_fe
            },
        );
        let offset = chr_addr(bank, self.chr_banks_4k, addr);
        if let Some(byte) = self.chr.get_mut(offset) {
            *byte = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        10
    }

    fn mapper_name(&self) -> &'static str {
        "MMC4"
    }

    fn save_state(&self) -> Vec<u8> {
        #[cfg(feature = "serde")]
        {
            postcard::to_allocvec(self).unwrap_or_default()
        }
        #[cfg(not(feature = "serde"))]
        {
            Vec::new()
        }
    }

    fn load_state(&mut self, data: &[u8]) {
        #[cfg(feature = "serde")]
        {
            if let Ok(state) = postcard::from_bytes(data) {
                *self = state;
            }
        }
        #[cfg(not(feature = "serde"))]
        {
            let _ = data;
        }
    }


    fn has_battery(&self) -> bool {
        self.has_battery
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        if self.has_battery {
            Some(&self.prg_ram)
        } else {
            None
        }
    }

    fn set_battery_ram(&mut self, data: &[u8]) {
        let len = data.len().min(self.prg_ram.len());
        self.prg_ram[..len].copy_from_slice(&data[..len]);
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.chr_bank_0_fd = 0;
        self.chr_bank_0_fe = 0;
        self.chr_bank_1_fd = 0;
        self.chr_bank_1_fe = 0;
        self.latch.latch0.set(false);
        self.latch.latch1.set(false);
    }
}
