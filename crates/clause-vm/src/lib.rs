//! clause-vm — machine à pile pour les programmes clause
//!
//! - [`Vm`] : exécute un [`Program`] ; chaque `run` repart d'une pile vide
//! - [`StaticBindings`] : liaisons `@nom` vers des producteurs hôte
//! - [`execute`] : même boucle, programme et liaisons empruntés
//! - [`bridge`] : conversion des valeurs hôte ([`ToValue`], [`reflect`])
//!
//! Exemple éclair :
//! ```
//! use clause_core::{Opcode, Program, Value};
//! use clause_vm::Vm;
//!
//! let mut p = Program::new();
//! p.emit_with_const(Opcode::DLoad, Value::Double(2.0));
//! p.emit_with_const(Opcode::DLoad, Value::Double(3.0));
//! p.push_op(Opcode::DExp);
//! assert_eq!(Vm::new(p).run().unwrap(), Some(Value::Double(8.0)));
//! ```

#![deny(missing_docs)]

use clause_core::{Opcode, Program, Scope, ValueKind};
use thiserror::Error;

pub mod bindings;
pub mod bridge;

pub use bindings::{Producer, StaticBindings};
pub use bridge::{reflect, BridgeError, HostHandle, ToValue};
pub use clause_core::Value;

macro_rules! vm_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur d'exécution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Opérande d'un genre inattendu.
    #[error("{opcode} cannot operate on {found} at pc {pc}")]
    TypeMismatch {
        /// Compteur ordinal.
        pc: usize,
        /// Instruction.
        opcode: Opcode,
        /// Genre rencontré.
        found: ValueKind,
    },
    /// `@nom` absent de la table, ou portée non statique.
    #[error("unresolved binding `{name}` at pc {pc}")]
    UnresolvedBinding {
        /// Compteur ordinal.
        pc: usize,
        /// Nom référencé.
        name: String,
    },
    /// Clé absente d'un objet, ou index de tableau illisible.
    #[error("attribute `{name}` not found at pc {pc}")]
    AttributeNotFound {
        /// Compteur ordinal.
        pc: usize,
        /// Attribut demandé.
        name: String,
    },
    /// Index de tableau hors bornes.
    #[error("index {index} out of range (len {len}) at pc {pc}")]
    IndexOutOfRange {
        /// Compteur ordinal.
        pc: usize,
        /// Index demandé.
        index: usize,
        /// Taille du tableau.
        len: usize,
    },
    /// Diviseur nul.
    #[error("division by zero in {opcode} at pc {pc}")]
    DivisionByZero {
        /// Compteur ordinal.
        pc: usize,
        /// Instruction.
        opcode: Opcode,
    },
    /// Le producteur n'a pas pu convertir sa valeur.
    #[error("binding `{name}` produced an unsupported value at pc {pc}: {source}")]
    UnsupportedHostType {
        /// Compteur ordinal.
        pc: usize,
        /// Nom de la liaison.
        name: String,
        /// Erreur du pont.
        #[source]
        source: BridgeError,
    },
    /// Opcode réservé, sans implémentation.
    #[error("{opcode} is not implemented (pc {pc})")]
    UnimplementedOpcode {
        /// Compteur ordinal.
        pc: usize,
        /// Instruction.
        opcode: Opcode,
    },
    /// Mot d'instruction inconnu.
    #[error("invalid opcode {word} at pc {pc}")]
    InvalidOpcode {
        /// Compteur ordinal.
        pc: usize,
        /// Mot brut.
        word: u32,
    },
    /// Dépilement sur pile vide.
    #[error("stack underflow in {opcode} at pc {pc}")]
    StackUnderflow {
        /// Compteur ordinal.
        pc: usize,
        /// Instruction.
        opcode: Opcode,
    },
    /// Pile au-delà de `VmOptions::max_stack`.
    #[error("stack overflow (limit {limit}) at pc {pc}")]
    StackOverflow {
        /// Compteur ordinal.
        pc: usize,
        /// Limite configurée.
        limit: usize,
    },
    /// Opérande manquant ou hors du pool de constantes.
    #[error("missing or out-of-range constant operand at pc {pc}")]
    ConstantOutOfRange {
        /// Compteur ordinal de l'opcode.
        pc: usize,
        /// Index lu, s'il existe.
        index: Option<u32>,
    },
}

/// Résultat de la VM.
pub type VmResult<T> = Result<T, RuntimeError>;

/* ─────────────────────────── Options ─────────────────────────── */

/// Options d'exécution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Profondeur maximale de la pile d'opérandes.
    pub max_stack: usize,
}

impl Default for VmOptions {
    fn default() -> Self { Self { max_stack: 1024 } }
}

/* ─────────────────────────── Pile ─────────────────────────── */

struct Stack {
    items: Vec<Value>,
    limit: usize,
}

impl Stack {
    fn new(limit: usize) -> Self { Self { items: Vec::with_capacity(limit.min(64)), limit } }

    fn push(&mut self, pc: usize, v: Value) -> VmResult<()> {
        if self.items.len() >= self.limit {
            return Err(RuntimeError::StackOverflow { pc, limit: self.limit });
        }
        self.items.push(v);
        Ok(())
    }

    fn pop(&mut self, pc: usize, opcode: Opcode) -> VmResult<Value> {
        self.items.pop().ok_or(RuntimeError::StackUnderflow { pc, opcode })
    }

    /// Paire `(gauche, droite)` : droite est au sommet.
    fn pop2(&mut self, pc: usize, opcode: Opcode) -> VmResult<(Value, Value)> {
        let right = self.pop(pc, opcode)?;
        let left = self.pop(pc, opcode)?;
        Ok((left, right))
    }
}

/* ─────────────────────────── VM ─────────────────────────── */

/// Machine virtuelle : programme, liaisons, options.
#[derive(Debug)]
pub struct Vm {
    program: Program,
    bindings: StaticBindings,
    opts: VmOptions,
}

impl Vm {
    /// VM sur `program`, sans liaisons.
    pub fn new(program: Program) -> Self { Self::with_options(program, VmOptions::default()) }

    /// VM avec options.
    pub fn with_options(program: Program, opts: VmOptions) -> Self {
        Self { program, bindings: StaticBindings::new(), opts }
    }

    /// Programme chargé.
    pub const fn program(&self) -> &Program { &self.program }

    /// Liaisons statiques.
    pub const fn bindings(&self) -> &StaticBindings { &self.bindings }

    /// Accès mutable aux liaisons.
    pub fn bindings_mut(&mut self) -> &mut StaticBindings { &mut self.bindings }

    /// Lie `@name` à un producteur (remplace une liaison existante).
    pub fn register_static<F>(&mut self, name: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn() -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.bindings.register(name, producer);
        self
    }

    /// Lie `@name` à un producteur de valeur `Serialize`.
    pub fn register_serde<T, F>(&mut self, name: impl Into<String>, producer: F) -> &mut Self
    where
        T: serde::Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bindings.register_serde(name, producer);
        self
    }

    /// Exécute le programme depuis `pc = 0` ; renvoie le sommet de pile final.
    pub fn run(&self) -> VmResult<Option<Value>> { execute(&self.program, &self.bindings, self.opts) }
}

/// Exécute `program` contre une table de liaisons empruntée.
///
/// La pile d'opérandes est locale à l'appel : plusieurs exécutions peuvent
/// partager le même programme et les mêmes liaisons.
pub fn execute(program: &Program, bindings: &StaticBindings, opts: VmOptions) -> VmResult<Option<Value>> {
    let code = &program.instructions;
    let mut stack = Stack::new(opts.max_stack);
    let mut pc = 0usize;

    while let Some(&word) = code.get(pc) {
        let opcode = Opcode::from_word(word).ok_or(RuntimeError::InvalidOpcode { pc, word })?;
        let operand = if opcode.operands() == 1 {
            let Some(&index) = code.get(pc + 1) else {
                return Err(RuntimeError::ConstantOutOfRange { pc, index: None });
            };
            let value = program
                .constant(index)
                .ok_or(RuntimeError::ConstantOutOfRange { pc, index: Some(index) })?;
            Some(value)
        } else {
            None
        };
        vm_trace!(pc, op = %opcode, depth = stack.items.len(), "exec");

        match (opcode, operand) {
            (Opcode::Nop, _) => {}
            (Opcode::Invoke, _) => return Err(RuntimeError::UnimplementedOpcode { pc, opcode }),

            (Opcode::GetStatic, Some(c)) => {
                let v = get_static(bindings, pc, opcode, c)?;
                stack.push(pc, v)?;
            }
            (Opcode::GetAttr, Some(c)) => {
                let Value::AttrRef { name, .. } = c else {
                    return Err(RuntimeError::TypeMismatch { pc, opcode, found: c.kind() });
                };
                let target = stack.pop(pc, opcode)?;
                let v = get_attr(pc, opcode, target, name)?;
                stack.push(pc, v)?;
            }

            (Opcode::ILoad, Some(c @ (Value::Int(_) | Value::Bool(_) | Value::Char(_))))
            | (Opcode::DLoad, Some(c @ Value::Double(_)))
            | (Opcode::SLoad, Some(c @ Value::String(_))) => stack.push(pc, c.clone())?,
            (Opcode::ILoad | Opcode::DLoad | Opcode::SLoad, Some(c)) => {
                return Err(RuntimeError::TypeMismatch { pc, opcode, found: c.kind() });
            }

            (
                Opcode::IAdd | Opcode::ISub | Opcode::IMul | Opcode::IDiv | Opcode::IMod | Opcode::IAnd | Opcode::IOr,
                _,
            ) => {
                let (l, r) = stack.pop2(pc, opcode)?;
                let a = int_operand(pc, opcode, &l)?;
                let b = int_operand(pc, opcode, &r)?;
                stack.push(pc, Value::Int(int_op(pc, opcode, a, b)?))?;
            }
            (
                Opcode::DAdd | Opcode::DSub | Opcode::DMul | Opcode::DDiv | Opcode::DMod | Opcode::DExp,
                _,
            ) => {
                let (l, r) = stack.pop2(pc, opcode)?;
                let a = double_operand(pc, opcode, &l)?;
                let b = double_operand(pc, opcode, &r)?;
                stack.push(pc, Value::Double(double_op(pc, opcode, a, b)?))?;
            }

            (Opcode::I2B | Opcode::I2C | Opcode::I2D, _) => {
                let v = stack.pop(pc, opcode)?;
                let n = int_operand(pc, opcode, &v)?;
                stack.push(pc, convert_int(opcode, n))?;
            }

            (Opcode::SConcat, _) => {
                // Opérande absent : lu comme "undefined".
                let right = stack.items.pop().unwrap_or_else(|| Value::from("undefined"));
                let left = stack.items.pop().unwrap_or_else(|| Value::from("undefined"));
                match (left, right) {
                    (Value::String(mut l), Value::String(r)) => {
                        l.push_str(&r);
                        stack.push(pc, Value::String(l))?;
                    }
                    (Value::String(_), other) | (other, _) => {
                        return Err(RuntimeError::TypeMismatch { pc, opcode, found: other.kind() });
                    }
                }
            }

            (Opcode::CmpEq | Opcode::CmpNe | Opcode::CmpG | Opcode::CmpGe | Opcode::CmpL | Opcode::CmpLe, _) => {
                let (l, r) = stack.pop2(pc, opcode)?;
                stack.push(pc, Value::Int(i64::from(compare(opcode, &l, &r))))?;
            }

            (Opcode::GetStatic | Opcode::GetAttr | Opcode::ILoad | Opcode::DLoad | Opcode::SLoad, None) => {
                return Err(RuntimeError::ConstantOutOfRange { pc, index: None });
            }
        }
        pc += 1 + opcode.operands();
    }

    Ok(stack.items.pop())
}

fn get_static(bindings: &StaticBindings, pc: usize, opcode: Opcode, c: &Value) -> VmResult<Value> {
    let Value::DataRef { name, scope } = c else {
        return Err(RuntimeError::TypeMismatch { pc, opcode, found: c.kind() });
    };
    if *scope != Scope::Static {
        return Err(RuntimeError::UnresolvedBinding { pc, name: name.clone() });
    }
    match bindings.resolve(name) {
        None => Err(RuntimeError::UnresolvedBinding { pc, name: name.clone() }),
        Some(Err(source)) => Err(RuntimeError::UnsupportedHostType { pc, name: name.clone(), source }),
        Some(Ok(v)) => Ok(v),
    }
}

/* ─────────────────────────── Sémantique des opcodes ─────────────────────────── */

fn get_attr(pc: usize, opcode: Opcode, target: Value, name: &str) -> VmResult<Value> {
    match target {
        Value::Array(mut items) => {
            let index: usize = name.parse().map_err(|_| RuntimeError::AttributeNotFound { pc, name: name.to_owned() })?;
            let len = items.len();
            if index >= len {
                return Err(RuntimeError::IndexOutOfRange { pc, index, len });
            }
            Ok(items.swap_remove(index))
        }
        Value::Object(mut fields) => {
            fields.remove(name).ok_or_else(|| RuntimeError::AttributeNotFound { pc, name: name.to_owned() })
        }
        other => Err(RuntimeError::TypeMismatch { pc, opcode, found: other.kind() }),
    }
}

fn int_operand(pc: usize, opcode: Opcode, v: &Value) -> VmResult<i64> {
    v.as_int().ok_or(RuntimeError::TypeMismatch { pc, opcode, found: v.kind() })
}

fn double_operand(pc: usize, opcode: Opcode, v: &Value) -> VmResult<f64> {
    v.as_double().ok_or(RuntimeError::TypeMismatch { pc, opcode, found: v.kind() })
}

fn int_op(pc: usize, opcode: Opcode, a: i64, b: i64) -> VmResult<i64> {
    Ok(match opcode {
        Opcode::IAdd => a.wrapping_add(b),
        Opcode::ISub => a.wrapping_sub(b),
        Opcode::IMul => a.wrapping_mul(b),
        Opcode::IDiv | Opcode::IMod if b == 0 => return Err(RuntimeError::DivisionByZero { pc, opcode }),
        Opcode::IDiv => a.wrapping_div(b),
        Opcode::IMod => a.wrapping_rem(b),
        Opcode::IAnd => a & b,
        _ => a | b,
    })
}

fn double_op(pc: usize, opcode: Opcode, a: f64, b: f64) -> VmResult<f64> {
    Ok(match opcode {
        Opcode::DAdd => a + b,
        Opcode::DSub => a - b,
        Opcode::DMul => a * b,
        Opcode::DDiv | Opcode::DMod if b == 0.0 => return Err(RuntimeError::DivisionByZero { pc, opcode }),
        Opcode::DDiv => a / b,
        Opcode::DMod => a % b,
        _ => a.powf(b),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn convert_int(opcode: Opcode, n: i64) -> Value {
    match opcode {
        Opcode::I2B => Value::Bool(n != 0),
        Opcode::I2C => Value::Char(char::from(n as u8)),
        _ => Value::Double(n as f64),
    }
}

fn compare(opcode: Opcode, l: &Value, r: &Value) -> bool {
    match opcode {
        Opcode::CmpEq => l.repr_eq(r),
        Opcode::CmpNe => !l.repr_eq(r),
        _ => {
            let (Some(a), Some(b)) = (l.as_ordered(), r.as_ordered()) else { return false };
            match opcode {
                Opcode::CmpG => a > b,
                Opcode::CmpGe => a >= b,
                Opcode::CmpL => a < b,
                _ => a <= b,
            }
        }
    }
}

/* ─────────────────────────── Prelude ─────────────────────────── */

/// Imports courants.
pub mod prelude {
    pub use crate::{
        bridge::{reflect, BridgeError, HostHandle, ToValue},
        execute, host_object, RuntimeError, StaticBindings, Value, Vm, VmOptions, VmResult,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
