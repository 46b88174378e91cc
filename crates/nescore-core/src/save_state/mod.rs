//! Save state system for `NesCore` emulator.
//!
//! Produces a byte-exact snapshot of every piece of live emulation state:
//! CPU registers and execution state machine, PPU registers/VRAM/OAM/pipeline,
//! APU channel/frame-counter/DMC state, the active mapper's bank registers
//! and PRG/CHR-RAM contents, the two RAM regions the bus owns directly
//! (internal RAM and CIRAM), and the controller shift registers and open-bus
//! latch. Save states are only meaningful when loaded back into a `Console`
//! constructed from the same ROM image and mapper.
//!
//! # Format
//!
//! ```text
//! ┌───────────────────────────────┐
//! │ CRC32 of everything below (4) │
//! ├───────────────────────────────┤
//! │ Magic "RNES" (4)              │
//! │ Version (4)                   │
//! │ Frame count (8)               │
//! │ Total CPU cycles (8)          │
//! │ Running flag (1)              │
//! │ CPU state blob (len-prefixed) │
//! │ Bus state blob (len-prefixed) │
//! └───────────────────────────────┘
//! ```
//!
//! Each "blob" is a `u32` little-endian length followed by that many bytes,
//! produced by the owning component's own `save_state`/`load_state` pair
//! (`Cpu`, `Ppu`, `Apu` serialize via `postcard`; the active `Mapper`
//! serializes via its own `save_state`/`load_state` trait methods, since a
//! `Box<dyn Mapper>` cannot derive `Serialize` itself). The size of the
//! resulting buffer is constant for a fixed ROM: nothing in the format grows
//! with execution history.
//!
//! # Usage
//!
//! ```no_run
//! use nescore_core::Console;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rom = std::fs::read("game.nes")?;
//! let mut console = Console::from_rom_bytes(&rom)?;
//!
//! for _ in 0..1000 {
//!     console.step_frame();
//! }
//!
//! let saved = console.save();
//! assert_eq!(saved.len(), console.save_state_size());
//!
//! for _ in 0..500 {
//!     console.step_frame();
//! }
//!
//! console.load(&saved)?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::SaveStateError;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Save state format version.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Magic bytes at the start of every save state body.
pub const SAVE_STATE_MAGIC: [u8; 4] = *b"RNES";

/// Growable little-endian byte writer used to build save-state blobs.
///
/// Kept deliberately dumb (no varints, no field tags) so that encoding a
/// given live state always produces the same bytes, which is the property
/// the round-trip and constant-size invariants depend on.
#[derive(Default)]
pub(crate) struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a `u32` length prefix followed by `bytes`.
    pub(crate) fn write_blob(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based reader mirroring [`StateWriter`]'s layout.
pub(crate) struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SaveStateError> {
        if self.pos + n > self.data.len() {
            return Err(SaveStateError::InsufficientData {
                needed: n,
                available: self.data.len() - self.pos,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, SaveStateError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool, SaveStateError> {
        Ok(self.read_u8()? != 0)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, SaveStateError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap_or([0; 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, SaveStateError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap_or([0; 8]);
        Ok(u64::from_le_bytes(bytes))
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], SaveStateError> {
        self.take(n)
    }

    pub(crate) fn read_blob(&mut self) -> Result<&'a [u8], SaveStateError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }
}
