//! 2C02 master palette.
//!
//! The PPU never stores RGB directly; every pixel it emits is a 6-bit
//! index into this 64-entry hardware palette (`$3F00`-`$3F1F` select one
//! of these 64 entries, not an arbitrary RGB value). This module is the
//! only place that RGB conversion happens, so host code (and
//! [`crate::console::Console::framebuffer`]) never has to know the 2C02's
//! color generation circuitry exists.

/// The 64-entry NES 2C02 master palette, indexed by the 6-bit palette code.
///
/// Entries `$0E`, `$0F`, `$1E`, `$1F`, `$2E`, `$2F`, `$3E`, `$3F` are
/// unused "blacker than black"/sync columns on real hardware and are
/// mapped to plain black here.
pub const NES_PALETTE: [(u8, u8, u8); 64] = [
    (0x54, 0x54, 0x54), // 0x00
    (0x00, 0x1E, 0x74), // 0x01
    (0x08, 0x10, 0x90), // 0x02
    (0x30, 0x00, 0x88), // 0x03
    (0x44, 0x00, 0x64), // 0x04
    (0x5C, 0x00, 0x30), // 0x05
    (0x54, 0x04, 0x00), // 0x06
    (0x3C, 0x18, 0x00), // 0x07
    (0x20, 0x2A, 0x00), // 0x08
    (0x08, 0x3A, 0x00), // 0x09
    (0x00, 0x40, 0x00), // 0x0A
    (0x00, 0x3C, 0x00), // 0x0B
    (0x00, 0x32, 0x3C), // 0x0C
    (0x00, 0x00, 0x00), // 0x0D
    (0x00, 0x00, 0x00), // 0x0E
    (0x00, 0x00, 0x00), // 0x0F
    (0x98, 0x96, 0x98), // 0x10
    (0x08, 0x4C, 0xC4), // 0x11
    (0x30, 0x32, 0xEC), // 0x12
    (0x5C, 0x1E, 0xE4), // 0x13
    (0x88, 0x14, 0xB0), // 0x14
    (0xA0, 0x14, 0x64), // 0x15
    (0x98, 0x22, 0x20), // 0x16
    (0x78, 0x3C, 0x00), // 0x17
    (0x54, 0x5A, 0x00), // 0x18
    (0x28, 0x72, 0x00), // 0x19
    (0x08, 0x7C, 0x00), // 0x1A
    (0x00, 0x76, 0x28), // 0x1B
    (0x00, 0x66, 0x78), // 0x1C
    (0x00, 0x00, 0x00), // 0x1D
    (0x00, 0x00, 0x00), // 0x1E
    (0x00, 0x00, 0x00), // 0x1F
    (0xFF, 0xFF, 0xFF), // 0x20
    (0x4C, 0x9A, 0xEC), // 0x21
    (0x78, 0x7C, 0xEC), // 0x22
    (0xB0, 0x62, 0xEC), // 0x23
    (0xE4, 0x54, 0xEC), // 0x24
    (0xEC, 0x58, 0xB4), // 0x25
    (0xEC, 0x6A, 0x64), // 0x26
    (0xD4, 0x88, 0x20), // 0x27
    (0xA0, 0xAA, 0x00), // 0x28
    (0x74, 0xC4, 0x00), // 0x29
    (0x4C, 0xD0, 0x20), // 0x2A
    (0x38, 0xCC, 0x6C), // 0x2B
    (0x38, 0xB4, 0xCC), // 0x2C
    (0x3C, 0x3C, 0x3C), // 0x2D
    (0x00, 0x00, 0x00), // 0x2E
    (0x00, 0x00, 0x00), // 0x2F
    (0xEC, 0xEE, 0xEC), // 0x30
    (0xA8, 0xCC, 0xEC), // 0x31
    (0xBC, 0xBC, 0xEC), // 0x32
    (0xD4, 0xB2, 0xEC), // 0x33
    (0xEC, 0xAE, 0xEC), // 0x34
    (0xEC, 0xAE, 0xD4), // 0x35
    (0xEC, 0xB4, 0xB0), // 0x36
    (0xE4, 0xC4, 0x90), // 0x37
    (0xCC, 0xD2, 0x78), // 0x38
    (0xB4, 0xDE, 0x78), // 0x39
    (0xA8, 0xE2, 0x90), // 0x3A
    (0x98, 0xE2, 0xB4), // 0x3B
    (0xA0, 0xD6, 0xE4), // 0x3C
    (0xA0, 0xA2, 0xA0), // 0x3D
    (0x00, 0x00, 0x00), // 0x3E
    (0x00, 0x00, 0x00), // 0x3F
];

/// Convert a 6-bit palette index into an `(r, g, b)` triple.
///
/// The index is masked to 6 bits, matching the PPU's own masking of
/// palette addresses (`addr & 0x3F`) before lookup, so out-of-range
/// inputs never panic.
#[must_use]
pub fn palette_to_rgb(index: u8) -> (u8, u8, u8) {
    NES_PALETTE[(index & 0x3F) as usize]
}
