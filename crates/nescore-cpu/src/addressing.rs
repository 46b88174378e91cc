//! 6502 Addressing Modes.
//!
//! The 6502 CPU supports various addressing modes that determine how
//! the operand for an instruction is fetched. The cycle-by-cycle state
//! machine in `cpu.rs` drives its own read/write-penalty logic from
//! `InstructionType`, so unlike some 6502 references this enum does not
//! need separate variants for write-only forced dummy reads.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Addressing modes for 6502 instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressingMode {
    /// Implied - No operand, operation is implied.
    /// Example: CLC, SEC, INX
    #[default]
    Implied,

    /// Accumulator - Operates on the accumulator.
    /// Example: ASL A, ROL A
    Accumulator,

    /// Immediate - 8-bit constant operand.
    /// Example: LDA #$42
    Immediate,

    /// Zero Page - 8-bit address in zero page ($0000-$00FF).
    /// Example: LDA $42
    ZeroPage,

    /// Zero Page,X - Zero page address plus X register (wraps within zero page).
    /// Example: LDA $42,X
    ZeroPageX,

    /// Zero Page,Y - Zero page address plus Y register (wraps within zero page).
    /// Example: LDX $42,Y
    ZeroPageY,

    /// Relative - Signed 8-bit offset for branch instructions.
    /// Example: BEQ label
    Relative,

    /// Absolute - Full 16-bit address.
    /// Example: LDA $1234
    Absolute,

    /// Absolute,X - 16-bit address plus X register.
    /// Example: LDA $1234,X
    AbsoluteX,

    /// Absolute,Y - 16-bit address plus Y register.
    /// Example: LDA $1234,Y
    AbsoluteY,

    /// Indirect - 16-bit address points to 16-bit target address.
    /// Used only by JMP. Has a bug where crossing a page boundary wraps
    /// within the page instead of incrementing the high byte.
    /// Example: JMP ($1234)
    Indirect,

    /// Indexed Indirect - (Zero Page,X)
    /// Pointer in zero page indexed by X.
    /// Example: LDA ($42,X)
    IndexedIndirectX,

    /// Indirect Indexed - (Zero Page),Y
    /// Pointer in zero page, indexed by Y after fetching.
    /// Example: LDA ($42),Y
    IndirectIndexedY,
}

impl AddressingMode {
    /// Returns the number of operand bytes for this addressing mode.
    /// Does not include the opcode byte.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::Relative
            | Self::IndexedIndirectX
            | Self::IndirectIndexedY => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }

    /// Returns the base number of cycles for this addressing mode.
    /// Additional cycles may be added for page boundary crossings or
    /// forced on write/RMW instructions; see `InstructionType`.
    #[must_use]
    pub const fn base_cycles(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate => 1,
            Self::ZeroPage => 2,
            Self::ZeroPageX | Self::ZeroPageY => 3,
            Self::Relative => 1, // +1 if branch taken, +1 if page crossed
            Self::Absolute => 3,
            Self::AbsoluteX | Self::AbsoluteY => 3, // +1 if page crossed for reads
            Self::Indirect => 4,
            Self::IndexedIndirectX => 5,
            Self::IndirectIndexedY => 4, // +1 if page crossed for reads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_bytes() {
        assert_eq!(AddressingMode::Implied.operand_bytes(), 0);
        assert_eq!(AddressingMode::Accumulator.operand_bytes(), 0);
        assert_eq!(AddressingMode::Immediate.operand_bytes(), 1);
        assert_eq!(AddressingMode::ZeroPage.operand_bytes(), 1);
        assert_eq!(AddressingMode::Absolute.operand_bytes(), 2);
        assert_eq!(AddressingMode::Indirect.operand_bytes(), 2);
    }
}
