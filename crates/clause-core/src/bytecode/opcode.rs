use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Instruction set of the clause VM.
///
/// The discriminant is the word written into the instruction stream.
/// Opcodes whose [`Opcode::operands`] is 1 are followed by a constant-pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum Opcode {
    /// Does nothing.
    Nop = 0,
    /// Resolve a `DataRef` constant through the static binding table.
    GetStatic,
    /// Pop an object/array and push the member named by an `AttrRef` constant.
    GetAttr,
    /// Method reference call. Reserved, not executable.
    Invoke,
    /// Push an Int/Bool/Char constant.
    ILoad,
    /// Int addition.
    IAdd,
    /// Int subtraction.
    ISub,
    /// Int multiplication.
    IMul,
    /// Int division.
    IDiv,
    /// Int remainder.
    IMod,
    /// Bitwise and (logical on 0/1).
    IAnd,
    /// Bitwise or (logical on 0/1).
    IOr,
    /// Int to Bool.
    I2B,
    /// Int to Char (low byte).
    I2C,
    /// Int to Double.
    I2D,
    /// Push a Double constant.
    DLoad,
    /// Double addition.
    DAdd,
    /// Double subtraction.
    DSub,
    /// Double multiplication.
    DMul,
    /// Double division.
    DDiv,
    /// Double remainder.
    DMod,
    /// Double power.
    DExp,
    /// Push a String constant.
    SLoad,
    /// String concatenation.
    SConcat,
    /// Representational equality.
    CmpEq,
    /// Representational inequality.
    CmpNe,
    /// Greater than.
    CmpG,
    /// Greater or equal.
    CmpGe,
    /// Less than.
    CmpL,
    /// Less or equal.
    CmpLe,
}

impl Opcode {
    /// Every opcode, indexed by its word.
    pub const ALL: [Self; 30] = [
        Self::Nop,
        Self::GetStatic,
        Self::GetAttr,
        Self::Invoke,
        Self::ILoad,
        Self::IAdd,
        Self::ISub,
        Self::IMul,
        Self::IDiv,
        Self::IMod,
        Self::IAnd,
        Self::IOr,
        Self::I2B,
        Self::I2C,
        Self::I2D,
        Self::DLoad,
        Self::DAdd,
        Self::DSub,
        Self::DMul,
        Self::DDiv,
        Self::DMod,
        Self::DExp,
        Self::SLoad,
        Self::SConcat,
        Self::CmpEq,
        Self::CmpNe,
        Self::CmpG,
        Self::CmpGe,
        Self::CmpL,
        Self::CmpLe,
    ];

    /// Decode an instruction word.
    pub fn from_word(word: u32) -> Option<Self> {
        usize::try_from(word).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Word written into the instruction stream.
    pub const fn word(self) -> u32 { self as u32 }

    /// Number of inline operand slots following the opcode.
    pub const fn operands(self) -> usize {
        match self {
            Self::GetStatic | Self::GetAttr | Self::Invoke | Self::ILoad | Self::DLoad | Self::SLoad => 1,
            _ => 0,
        }
    }

    /// Lower-case mnemonic used by the disassembler and traces.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::GetStatic => "getstatic",
            Self::GetAttr => "getattr",
            Self::Invoke => "invoke",
            Self::ILoad => "iload",
            Self::IAdd => "iadd",
            Self::ISub => "isub",
            Self::IMul => "imul",
            Self::IDiv => "idiv",
            Self::IMod => "imod",
            Self::IAnd => "iand",
            Self::IOr => "ior",
            Self::I2B => "i2b",
            Self::I2C => "i2c",
            Self::I2D => "i2d",
            Self::DLoad => "dload",
            Self::DAdd => "dadd",
            Self::DSub => "dsub",
            Self::DMul => "dmul",
            Self::DDiv => "ddiv",
            Self::DMod => "dmod",
            Self::DExp => "dexp",
            Self::SLoad => "sload",
            Self::SConcat => "sconcat",
            Self::CmpEq => "cmp_eq",
            Self::CmpNe => "cmp_ne",
            Self::CmpG => "cmp_g",
            Self::CmpGe => "cmp_ge",
            Self::CmpL => "cmp_l",
            Self::CmpLe => "cmp_le",
        }
    }
}

impl From<Opcode> for u32 {
    fn from(op: Opcode) -> Self { op.word() }
}

impl TryFrom<u32> for Opcode {
    type Error = u32;
    fn try_from(word: u32) -> Result<Self, Self::Error> { Self::from_word(word).ok_or(word) }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn words_match_table_order() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.word() as usize, i);
            assert_eq!(Opcode::from_word(op.word()), Some(*op));
        }
        assert_eq!(Opcode::from_word(30), None);
        assert_eq!(Opcode::try_from(99), Err(99));
    }

    #[test]
    fn operand_arity() {
        assert_eq!(Opcode::GetStatic.operands(), 1);
        assert_eq!(Opcode::SLoad.operands(), 1);
        assert_eq!(Opcode::IAdd.operands(), 0);
        assert_eq!(Opcode::CmpLe.to_string(), "cmp_le");
    }
}
