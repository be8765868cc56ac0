//! clause — langage d'expressions embarquable
//!
//! Chaîne complète : source → jetons → AST → programme → valeur.
//!
//! - [`Engine`] : options + liaisons `@nom`, puis `compile` / `run` / `eval`
//! - [`compile_str`], [`eval_str`], [`tokenize_str`] : raccourcis sans liaisons
//! - [`Error`] : erreur unifiée de toutes les étapes
//!
//! ```
//! use clause::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.register_static("user", || {
//!     Ok(Value::object([("role", Value::object([("name", Value::from("HI"))]))]))
//! });
//! let out = engine.eval(r#"@user.role.name + "I" == "HII""#).unwrap();
//! assert_eq!(out, Some(Value::Int(1)));
//! ```

#![deny(missing_docs)]

use clause_ast::Node;
use clause_compiler::{CompileError, Compiler, CompilerOptions};
use clause_lexer::{LexError, Lexer, LexerOptions, RuneReader, Token};
use clause_parser::{ParseError, Parser};
use clause_vm::{BridgeError, RuntimeError, StaticBindings, ToValue, VmOptions};
use thiserror::Error;

pub use clause_core::{disasm, Opcode, Program, Range, Scope, Value, ValueKind};
pub use clause_vm::{host_object, reflect, HostHandle};

pub use clause_ast as ast;
pub use clause_compiler as compiler;
pub use clause_lexer as lexer;
pub use clause_parser as parser;
pub use clause_vm as vm;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de la chaîne complète.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Analyse lexicale.
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    /// Analyse syntaxique.
    #[error("parse error: {0}")]
    Parse(ParseError),
    /// Compilation.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    /// Exécution.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Lex(lex) => Self::Lex(lex),
            other => Self::Parse(other),
        }
    }
}

/// Résultat de la façade.
pub type Result<T> = std::result::Result<T, Error>;

/* ─────────────────────────── Moteur ─────────────────────────── */

/// Options de chaque étape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Lexer.
    pub lexer: LexerOptions,
    /// Compilateur.
    pub compiler: CompilerOptions,
    /// VM.
    pub vm: VmOptions,
}

/// Compile et exécute des expressions contre un jeu de liaisons.
#[derive(Debug, Default)]
pub struct Engine {
    opts: EngineOptions,
    bindings: StaticBindings,
}

impl Engine {
    /// Moteur par défaut, sans liaisons.
    pub fn new() -> Self { Self::default() }

    /// Moteur avec options.
    pub fn with_options(opts: EngineOptions) -> Self { Self { opts, bindings: StaticBindings::new() } }

    /// Options courantes.
    pub const fn options(&self) -> &EngineOptions { &self.opts }

    /// Liaisons enregistrées.
    pub const fn bindings(&self) -> &StaticBindings { &self.bindings }

    /// Lie `@name` à un producteur (remplace une liaison existante).
    pub fn register_static<F>(&mut self, name: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn() -> std::result::Result<Value, BridgeError> + Send + Sync + 'static,
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

    /// Lie `@name` à une valeur hôte, reconvertie à chaque référence.
    pub fn register_value<T>(&mut self, name: impl Into<String>, host: T) -> &mut Self
    where
        T: ToValue + Send + Sync + 'static,
    {
        self.bindings.register_value(name, host);
        self
    }

    /// Source → jetons, `Eof` compris.
    pub fn tokenize(&self, src: &str) -> Result<Vec<Token>> {
        Ok(Lexer::with_options(RuneReader::from_source(src), self.opts.lexer).tokenize()?)
    }

    /// Source → AST.
    pub fn parse(&self, src: &str) -> Result<Node> {
        Ok(Parser::with_options(src.as_bytes(), self.opts.lexer).parse()?)
    }

    /// Source → programme.
    pub fn compile(&self, src: &str) -> Result<Program> {
        let ast = self.parse(src)?;
        Ok(Compiler::new(self.opts.compiler).compile(&ast)?)
    }

    /// Exécute un programme déjà compilé.
    pub fn run(&self, program: &Program) -> Result<Option<Value>> {
        Ok(clause_vm::execute(program, &self.bindings, self.opts.vm)?)
    }

    /// Compile puis exécute.
    pub fn eval(&self, src: &str) -> Result<Option<Value>> { self.run(&self.compile(src)?) }
}

/* ─────────────────────────── Raccourcis ─────────────────────────── */

/// Jetons de `src`, `Eof` compris.
pub fn tokenize_str(src: &str) -> Result<Vec<Token>> { Engine::new().tokenize(src) }

/// Compile `src` avec les options par défaut.
pub fn compile_str(src: &str) -> Result<Program> { Engine::new().compile(src) }

/// Évalue `src` sans liaisons.
pub fn eval_str(src: &str) -> Result<Option<Value>> { Engine::new().eval(src) }

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_errors_keep_lex_errors_flat() {
        assert!(matches!(eval_str("1.2.3"), Err(Error::Lex(_))));
        assert!(matches!(eval_str("1 +"), Err(Error::Parse(ParseError::MissingOperand { .. }))));
    }

    #[test]
    fn engine_without_validation_still_runs() {
        let opts = EngineOptions { compiler: CompilerOptions { validate: false }, ..EngineOptions::default() };
        let engine = Engine::with_options(opts);
        assert_eq!(engine.eval("2 * 4").unwrap(), Some(Value::Double(8.0)));
    }

    #[test]
    fn keyword_boundary_is_configurable() {
        let mut opts = EngineOptions::default();
        opts.lexer.keyword_boundary = false;
        let engine = Engine::with_options(opts);
        // `orx` devient `or` + `x` : opérande gauche manquant.
        assert!(engine.parse("orx").is_err());
        assert!(Engine::new().parse("orx").is_ok());
        assert_eq!(engine.tokenize("orx").unwrap().len(), 3);
        assert_eq!(tokenize_str("orx").unwrap().len(), 2);
    }

    #[test]
    fn register_value_reports_bridge_errors_at_lookup() {
        let mut engine = Engine::new();
        engine.register_value("x", None::<u8>);
        assert!(matches!(
            engine.eval("@x"),
            Err(Error::Runtime(RuntimeError::UnsupportedHostType { ref name, .. })) if name == "x"
        ));
        engine.register_value("x", 41i64);
        assert_eq!(engine.eval("@x").unwrap(), Some(Value::Int(41)));
    }
}
