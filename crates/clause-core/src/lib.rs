//! clause-core — primitives partagées par tout le pipeline
//!
//! Fournit :
//! - `Range` (ligne, colonne, index absolu)
//! - le vocabulaire bytecode : `Opcode`, `Value`, `Program`
//! - validation structurelle et désassemblage textuel d'un `Program`
//! - `CoreError` + alias `CoreResult<T>`
//!
//! Features :
//! - `serde` : derive (dé)sérialisation sur les structures utiles

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (opcodes, valeurs, programme, désassembleur, helpers).
pub mod bytecode;

pub use bytecode::{disasm, helpers};
pub use bytecode::{Opcode, Program, Scope, Value, ValueKind};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Positions ─────────────────────────── */

/// Position d'un rune dans la source.
///
/// `line` commence à 1, `column` à 0 et repart à 0 après chaque `\n`,
/// `index` compte les runes depuis le début de l'entrée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Range {
    /// Ligne (1-based).
    pub line: u32,
    /// Colonne (0-based).
    pub column: u32,
    /// Index absolu en runes.
    pub index: u32,
}

impl Range {
    /// Début de source.
    pub const START: Self = Self { line: 1, column: 0, index: 0 };

    /// Construit une position.
    pub const fn new(line: u32, column: u32, index: u32) -> Self { Self { line, column, index } }

    /// Position après avoir consommé `c`.
    #[must_use]
    pub const fn advance(self, c: char) -> Self {
        if c == '\n' {
            Self { line: self.line + 1, column: 0, index: self.index + 1 }
        } else {
            Self { line: self.line, column: self.column + 1, index: self.index + 1 }
        }
    }
}

impl Default for Range {
    fn default() -> Self { Self::START }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs structurelles sur un programme compilé.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoreError {
    /// Mot d'instruction qui n'est pas un opcode connu.
    InvalidOpcode {
        /// Compteur ordinal fautif.
        pc: usize,
        /// Mot brut.
        word: u32,
    },
    /// Opcode à opérande en fin de flux.
    MissingOperand {
        /// Compteur ordinal de l'opcode.
        pc: usize,
        /// Opcode concerné.
        opcode: Opcode,
    },
    /// Opérande hors du pool de constantes.
    ConstantOutOfRange {
        /// Compteur ordinal de l'opérande.
        pc: usize,
        /// Index lu.
        index: u32,
        /// Taille du pool.
        len: usize,
    },
    /// La constante référencée n'a pas le tag attendu par l'opcode.
    OperandKind {
        /// Compteur ordinal de l'opérande.
        pc: usize,
        /// Opcode concerné.
        opcode: Opcode,
        /// Tag trouvé.
        found: ValueKind,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOpcode { pc, word } => write!(f, "invalid opcode {word} at pc {pc}"),
            Self::MissingOperand { pc, opcode } => write!(f, "{opcode} at pc {pc} is missing its operand"),
            Self::ConstantOutOfRange { pc, index, len } => {
                write!(f, "operand at pc {pc} references constant {index} but pool size is {len}")
            }
            Self::OperandKind { pc, opcode, found } => {
                write!(f, "{opcode} at pc {pc} cannot take a {found} constant")
            }
        }
    }
}

impl std::error::Error for CoreError {}

/* ─────────────────────────── Prélude ─────────────────────────── */

/// Prélude pratique pour importer les types clés du crate.
pub mod prelude {
    pub use super::{CoreError, CoreResult, Opcode, Program, Range, Scope, Value, ValueKind};
}

/* ─────────────────────────── Tests ─────────────────────────── */
