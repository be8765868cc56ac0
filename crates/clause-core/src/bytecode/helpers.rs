//! Structural validation of compiled programs.

use crate::{CoreError, CoreResult, Opcode, Program, ValueKind};

/// Checks that a program can be executed without tripping on its own shape.
///
/// Every word decodes, every operand slot exists and points into the
/// constant pool, and the referenced constant carries the tag its opcode
/// expects. Type errors between runtime values are left to the VM.
pub fn validate_program(program: &Program) -> CoreResult<()> {
    let len = program.constants.len();
    for ins in program.decode() {
        let ins = ins?;
        let Some(index) = ins.operand else { continue };
        let Some(value) = program.constant(index) else {
            return Err(CoreError::ConstantOutOfRange { pc: ins.pc + 1, index, len });
        };
        let found = value.kind();
        let ok = match ins.opcode {
            Opcode::GetStatic => found == ValueKind::DataRef,
            Opcode::GetAttr => found == ValueKind::AttrRef,
            Opcode::ILoad => matches!(found, ValueKind::Int | ValueKind::Bool | ValueKind::Char),
            Opcode::DLoad => found == ValueKind::Double,
            Opcode::SLoad => found == ValueKind::String,
            _ => true,
        };
        if !ok {
            return Err(CoreError::OperandKind { pc: ins.pc + 1, opcode: ins.opcode, found });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scope, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_well_formed() {
        let mut p = Program::new();
        let owner = p.emit_with_const(Opcode::GetStatic, Value::DataRef { name: "user".into(), scope: Scope::Static });
        p.emit_with_const(Opcode::GetAttr, Value::AttrRef { name: "role".into(), owner });
        p.emit_with_const(Opcode::ILoad, Value::Bool(true));
        p.push_op(Opcode::CmpEq);
        assert_eq!(validate_program(&p), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_and_wrong_tag() {
        let p = Program { instructions: vec![Opcode::DLoad.word(), 3], constants: vec![Value::Double(1.0)] };
        assert_eq!(validate_program(&p), Err(CoreError::ConstantOutOfRange { pc: 1, index: 3, len: 1 }));

        let p = Program { instructions: vec![Opcode::SLoad.word(), 0], constants: vec![Value::Double(1.0)] };
        assert_eq!(
            validate_program(&p),
            Err(CoreError::OperandKind { pc: 1, opcode: Opcode::SLoad, found: ValueKind::Double })
        );
    }

    #[test]
    fn rejects_unknown_word() {
        let p = Program { instructions: vec![Opcode::Nop.word(), 77], constants: vec![] };
        assert_eq!(validate_program(&p), Err(CoreError::InvalidOpcode { pc: 1, word: 77 }));
    }
}
