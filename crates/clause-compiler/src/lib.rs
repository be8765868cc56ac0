//! clause-compiler — AST vers programme à pile
//!
//! - Entrée : [`clause_ast::Node`] (racine `Program`)
//! - Sortie : [`clause_core::Program`] (mots `u32` + pool de constantes)
//! - Parcours post-ordre par récursion directe ; chaque nœud émet des
//!   [`Emitted`] dans un [`Sink`]
//!
//! Le choix de l'opcode pour `+` dépend du genre de la dernière constante
//! émise par chaque côté : une chaîne donne `sconcat`, un flottant `dadd`,
//! sinon `iadd`. Ce suivi vit dans [`EmitContext`] et repart de zéro après
//! chaque côté d'une `Expression`.
//!
//! ```
//! use clause_compiler::{Compiler, CompilerOptions};
//! use clause_core::Opcode;
//!
//! let ast = clause_parser::parse_str("1 + 2").unwrap();
//! let prog = Compiler::new(CompilerOptions::default()).compile(&ast).unwrap();
//! assert_eq!(prog.instructions.last(), Some(&Opcode::DAdd.word()));
//! ```

#![deny(missing_docs)]

use clause_ast::{ArithOp, CompareOp, Identifier, Literal, LiteralKind, Node, NodeKind};
use clause_core::{CoreError, Opcode, Program, Range, Scope, Value, ValueKind};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Options ─────────────────────────── */

/// Options du compilateur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompilerOptions {
    /// Passe `Program::validate` sur le résultat.
    pub validate: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self { Self { validate: true } }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Texte de littéral numérique non interprétable.
    #[error("invalid number literal {raw:?} at {range}")]
    InvalidNumber {
        /// Position du littéral.
        range: Range,
        /// Texte brut.
        raw: String,
    },
    /// Le programme émis ne passe pas la validation.
    #[error("emitted program is invalid: {0}")]
    Invalid(#[from] CoreError),
}

/// Résultat du compilateur.
pub type CompileResult<T> = Result<T, CompileError>;

/* ─────────────────────────── Émission ─────────────────────────── */

/// Unité émise par un nœud.
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    /// Mot d'instruction (opcode ou opérande).
    Inst(u32),
    /// Constante ajoutée au pool.
    Const(Value),
}

/// Destination des émissions, dans l'ordre.
pub trait Sink {
    /// Reçoit une émission.
    fn emit(&mut self, item: Emitted);
}

impl Sink for Vec<Emitted> {
    fn emit(&mut self, item: Emitted) { self.push(item); }
}

/// Assemble les émissions en [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    /// Builder vide.
    pub const fn new() -> Self { Self { program: Program::new() } }

    /// Programme assemblé.
    pub fn finish(self) -> Program { self.program }
}

impl Sink for ProgramBuilder {
    fn emit(&mut self, item: Emitted) {
        match item {
            Emitted::Inst(word) => self.program.push_word(word),
            Emitted::Const(value) => {
                self.program.add_const(value);
            }
        }
    }
}

/// État porté le long du parcours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitContext {
    /// Index de la prochaine constante.
    pub next_const: u32,
    /// Genre de la dernière constante émise.
    pub last_kind: Option<ValueKind>,
}

/* ─────────────────────────── Compilateur ─────────────────────────── */

/// Façade : compile un arbre en programme.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    opts: CompilerOptions,
}

impl Compiler {
    /// Crée un compilateur.
    pub const fn new(opts: CompilerOptions) -> Self { Self { opts } }

    /// Compile `root` en programme (validé si `opts.validate`).
    pub fn compile(&self, root: &Node) -> CompileResult<Program> {
        let mut builder = ProgramBuilder::new();
        self.compile_into(root, &mut builder)?;
        let program = builder.finish();
        if self.opts.validate {
            program.validate()?;
        }
        Ok(program)
    }

    /// Émet `root` dans un `Sink` quelconque.
    pub fn compile_into<S: Sink>(&self, root: &Node, sink: &mut S) -> CompileResult<EmitContext> {
        let mut ctx = EmitContext::default();
        emit_node(root, &mut ctx, sink)?;
        Ok(ctx)
    }
}

/// Compile avec les options par défaut.
pub fn compile(root: &Node) -> CompileResult<Program> { Compiler::default().compile(root) }

fn emit_node<S: Sink>(node: &Node, ctx: &mut EmitContext, sink: &mut S) -> CompileResult<()> {
    match &node.kind {
        NodeKind::Program(items) => {
            for item in items {
                emit_node(item, ctx, sink)?;
            }
        }
        NodeKind::Primitive(inner) => emit_node(inner, ctx, sink)?,
        NodeKind::Literal(lit) => emit_literal(lit, node.range, ctx, sink)?,
        NodeKind::Identifier(id) => emit_identifier(id, ctx, sink),
        NodeKind::Expression(e) => {
            // Le genre est remis à inconnu après chaque côté : une
            // sous-expression ne transmet rien à l'opérateur englobant.
            emit_node(&e.left, ctx, sink)?;
            let left = ctx.last_kind.take();
            emit_node(&e.right, ctx, sink)?;
            let right = ctx.last_kind.take();
            sink.emit(Emitted::Inst(arith_opcode(e.op, left, right).word()));
        }
        NodeKind::Equality(c) | NodeKind::Comparison(c) => {
            emit_node(&c.left, ctx, sink)?;
            emit_node(&c.right, ctx, sink)?;
            sink.emit(Emitted::Inst(compare_opcode(c.op).word()));
        }
        NodeKind::Conjunction(l) => {
            emit_node(&l.left, ctx, sink)?;
            emit_node(&l.right, ctx, sink)?;
            sink.emit(Emitted::Inst(Opcode::IAnd.word()));
        }
        NodeKind::Disjunction(l) => {
            emit_node(&l.left, ctx, sink)?;
            emit_node(&l.right, ctx, sink)?;
            sink.emit(Emitted::Inst(Opcode::IOr.word()));
        }
    }
    Ok(())
}

/// Émet la constante puis `op idx` ; renvoie l'index.
fn emit_const<S: Sink>(op: Opcode, value: Value, ctx: &mut EmitContext, sink: &mut S) -> u32 {
    let idx = ctx.next_const;
    ctx.next_const += 1;
    ctx.last_kind = Some(value.kind());
    sink.emit(Emitted::Const(value));
    sink.emit(Emitted::Inst(op.word()));
    sink.emit(Emitted::Inst(idx));
    idx
}

fn emit_literal<S: Sink>(lit: &Literal, range: Range, ctx: &mut EmitContext, sink: &mut S) -> CompileResult<()> {
    match lit.kind {
        LiteralKind::String => {
            emit_const(Opcode::SLoad, Value::String(lit.raw.clone()), ctx, sink);
        }
        LiteralKind::Boolean => {
            emit_const(Opcode::ILoad, Value::Bool(lit.raw == "true"), ctx, sink);
        }
        LiteralKind::Number => {
            let n: f64 = lit
                .raw
                .parse()
                .map_err(|_| CompileError::InvalidNumber { range, raw: lit.raw.clone() })?;
            emit_const(Opcode::DLoad, Value::Double(n), ctx, sink);
        }
    }
    Ok(())
}

fn emit_identifier<S: Sink>(id: &Identifier, ctx: &mut EmitContext, sink: &mut S) {
    // Seuls les identifiants `@` ont une représentation à l'exécution.
    if !id.is_external {
        return;
    }
    let mut owner = emit_const(
        Opcode::GetStatic,
        Value::DataRef { name: id.base.clone(), scope: Scope::Static },
        ctx,
        sink,
    );
    for seg in &id.path {
        owner = emit_const(Opcode::GetAttr, Value::AttrRef { name: seg.clone(), owner }, ctx, sink);
    }
}

fn arith_opcode(op: ArithOp, left: Option<ValueKind>, right: Option<ValueKind>) -> Opcode {
    let either = |k: ValueKind| left == Some(k) || right == Some(k);
    match op {
        ArithOp::Add if either(ValueKind::String) => Opcode::SConcat,
        ArithOp::Add if either(ValueKind::Double) => Opcode::DAdd,
        ArithOp::Add => Opcode::IAdd,
        ArithOp::Sub => Opcode::DSub,
        ArithOp::Mul => Opcode::DMul,
        ArithOp::Div => Opcode::DDiv,
        ArithOp::Pow => Opcode::DExp,
    }
}

const fn compare_opcode(op: CompareOp) -> Opcode {
    match op {
        CompareOp::Eq => Opcode::CmpEq,
        CompareOp::Ne => Opcode::CmpNe,
        CompareOp::Gt => Opcode::CmpG,
        CompareOp::Ge => Opcode::CmpGe,
        CompareOp::Lt => Opcode::CmpL,
        CompareOp::Le => Opcode::CmpLe,
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
