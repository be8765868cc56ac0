use crate::{bytecode::helpers, CoreError, CoreResult, Opcode, Value};

/// Compiled program: instruction words plus constant pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Opcodes and inline operands, in execution order.
    pub instructions: Vec<u32>,
    /// Constant pool, addressed by operand words.
    pub constants: Vec<Value>,
}

impl Program {
    /// Empty program.
    pub const fn new() -> Self { Self { instructions: Vec::new(), constants: Vec::new() } }

    /// Appends an opcode word.
    pub fn push_op(&mut self, op: Opcode) { self.instructions.push(op.word()); }

    /// Appends a raw word (operand slot).
    pub fn push_word(&mut self, word: u32) { self.instructions.push(word); }

    /// Appends a constant and returns its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_const(&mut self, value: Value) -> u32 {
        let idx = self.constants.len() as u32;
        self.constants.push(value);
        idx
    }

    /// Appends `value` to the pool then `op idx`.
    pub fn emit_with_const(&mut self, op: Opcode, value: Value) -> u32 {
        let idx = self.add_const(value);
        self.push_op(op);
        self.push_word(idx);
        idx
    }

    /// Constant lookup.
    pub fn constant(&self, idx: u32) -> Option<&Value> {
        usize::try_from(idx).ok().and_then(|i| self.constants.get(i))
    }

    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool { self.instructions.is_empty() }

    /// Decoded view of the instruction stream.
    pub fn decode(&self) -> Instructions<'_> { Instructions { words: &self.instructions, pc: 0 } }

    /// Structural validation (see [`helpers::validate_program`]).
    pub fn validate(&self) -> CoreResult<()> { helpers::validate_program(self) }
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Position of the opcode word.
    pub pc: usize,
    /// Opcode.
    pub opcode: Opcode,
    /// Inline operand, for operand-carrying opcodes.
    pub operand: Option<u32>,
}

/// Iterator returned by [`Program::decode`]. Stops after the first error.
pub struct Instructions<'a> {
    words: &'a [u32],
    pc: usize,
}

impl Iterator for Instructions<'_> {
    type Item = CoreResult<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        let pc = self.pc;
        let word = *self.words.get(pc)?;
        let Some(opcode) = Opcode::from_word(word) else {
            self.pc = self.words.len();
            return Some(Err(CoreError::InvalidOpcode { pc, word }));
        };
        if opcode.operands() == 0 {
            self.pc += 1;
            return Some(Ok(Instruction { pc, opcode, operand: None }));
        }
        match self.words.get(pc + 1) {
            Some(&operand) => {
                self.pc += 2;
                Some(Ok(Instruction { pc, opcode, operand: Some(operand) }))
            }
            None => {
                self.pc = self.words.len();
                Some(Err(CoreError::MissingOperand { pc, opcode }))
            }
        }
    }
}
