//! clause-parser — parseur des expressions clause
//!
//! Branches :
//! - `clause-lexer` pour la tokenisation
//! - `clause-core` pour `Range`
//! - `clause-ast` pour l'arbre cible
//!
//! Grammaire (les espaces sont des jetons, sautés explicitement) :
//! ```text
//! program        := WS* disjunction? WS* EOF
//! disjunction    := conjunction (WS* "or" WS* conjunction)?
//! conjunction    := equality (WS* "and" WS* equality)?
//! equality       := comparison (WS* ("==" | "!=") WS* comparison)?
//! comparison     := additive (WS* ("<" | ">" | "<=" | ">=") WS* additive)?
//! additive       := multiplicative (WS* ("+" | "-") WS* multiplicative)*
//! multiplicative := exponential (WS* ("*" | "/") WS* exponential)?
//! exponential    := primitive (WS* "**" WS* primitive)?
//! primitive      := identifier | literal
//! identifier     := "@"? IDENT ("." WS* IDENT)*
//! literal        := STRING | NUMBER | BOOL
//! ```
//!
//! Seule l'addition s'enchaîne ; `2 * 3 * 4` laisse des jetons en trop et
//! échoue avec [`ParseError::UnexpectedToken`].

#![deny(missing_docs)]

use std::io::Read;

use clause_ast::{ArithOp, CompareOp, Identifier, Literal, LiteralKind, Node, NodeKind};
use clause_core::Range;
use clause_lexer::{LexError, Lexer, LexerOptions, RuneReader, Token, TokenKind};
use thiserror::Error;

mod cursor;

pub use cursor::TokenCursor;

macro_rules! p_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Jeton hors grammaire à cette position.
    #[error("unexpected {found} at {range}")]
    UnexpectedToken {
        /// Position du jeton.
        range: Range,
        /// Description du jeton.
        found: String,
    },
    /// Opérateur binaire sans opérande droit.
    #[error("missing right operand for `{operator}` at {range}")]
    MissingOperand {
        /// Position de l'opérateur.
        range: Range,
        /// Texte de l'opérateur.
        operator: String,
    },
    /// Erreur remontée par le lexer.
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// Position de l'erreur.
    pub const fn range(&self) -> Range {
        match self {
            Self::UnexpectedToken { range, .. } | Self::MissingOperand { range, .. } => *range,
            Self::Lex(e) => e.range,
        }
    }

    fn unexpected(tok: &Token) -> Self { Self::UnexpectedToken { range: tok.range, found: tok.to_string() } }
}

/// Résultat du parser.
pub type PResult<T> = Result<T, ParseError>;

/* ─────────────────────────── API ─────────────────────────── */

/// Parse une chaîne en mémoire.
pub fn parse_str(src: &str) -> PResult<Node> { Parser::from_source(src).parse() }

/// Parser clause.
pub struct Parser<R> {
    cur: TokenCursor<R>,
}

impl<'a> Parser<&'a [u8]> {
    /// Parser sur une chaîne en mémoire.
    pub fn from_source(src: &'a str) -> Self { Self::new(src.as_bytes()) }
}

impl<R: Read> Parser<R> {
    /// Parser sur un flux d'octets UTF-8.
    pub fn new(reader: R) -> Self { Self::with_options(reader, LexerOptions::default()) }

    /// Parser avec options de lexer.
    pub fn with_options(reader: R, opts: LexerOptions) -> Self {
        Self { cur: TokenCursor::new(Lexer::with_options(RuneReader::new(reader), opts)) }
    }

    /// Parse un programme complet : au plus une expression, puis la fin d'entrée.
    pub fn parse(mut self) -> PResult<Node> {
        self.cur.skip_whitespace()?;
        let Some(expr) = self.disjunction()? else {
            let tok = self.cur.advance()?;
            if tok.is_eof() {
                p_trace!("empty program");
                return Ok(Node::empty_program());
            }
            return Err(ParseError::unexpected(&tok));
        };
        self.cur.skip_whitespace()?;
        let tok = self.cur.advance()?;
        if !tok.is_eof() {
            return Err(ParseError::unexpected(&tok));
        }
        p_trace!(nodes = expr.count(), "parsed {expr}");
        Ok(Node::new(Range::START, NodeKind::Program(vec![expr])))
    }

    /* ─────────── Niveaux binaires ─────────── */

    fn disjunction(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.conjunction()? else { return Ok(None) };
        let Some(op) = self.operator(|k| k == TokenKind::Disjunction)? else { return Ok(Some(left)) };
        let right = self.operand(&op, Self::conjunction)?;
        Ok(Some(Node::or(op.range, left, right)))
    }

    fn conjunction(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.equality()? else { return Ok(None) };
        let Some(op) = self.operator(|k| k == TokenKind::Conjunction)? else { return Ok(Some(left)) };
        let right = self.operand(&op, Self::equality)?;
        Ok(Some(Node::and(op.range, left, right)))
    }

    fn equality(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.comparison()? else { return Ok(None) };
        self.compare_tail(left, TokenKind::EqualityOp, Self::comparison)
    }

    fn comparison(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.additive()? else { return Ok(None) };
        self.compare_tail(left, TokenKind::ComparisonOp, Self::additive)
    }

    fn compare_tail(
        &mut self,
        left: Node,
        kind: TokenKind,
        next: fn(&mut Self) -> PResult<Option<Node>>,
    ) -> PResult<Option<Node>> {
        let Some(op) = self.operator(|k| k == kind)? else { return Ok(Some(left)) };
        let Some(cmp) = CompareOp::from_symbol(&op.text) else { return Err(ParseError::unexpected(&op)) };
        let right = self.operand(&op, next)?;
        Ok(Some(Node::compare(op.range, cmp, left, right)))
    }

    fn additive(&mut self) -> PResult<Option<Node>> {
        let Some(mut left) = self.multiplicative()? else { return Ok(None) };
        while let Some(op) = self.operator(|k| matches!(k, TokenKind::Add | TokenKind::Sub))? {
            let right = self.operand(&op, Self::multiplicative)?;
            let arith = if op.kind == TokenKind::Add { ArithOp::Add } else { ArithOp::Sub };
            left = Node::arith(op.range, arith, left, right);
        }
        Ok(Some(left))
    }

    fn multiplicative(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.exponential()? else { return Ok(None) };
        let Some(op) = self.operator(|k| matches!(k, TokenKind::Mult | TokenKind::Div))? else {
            return Ok(Some(left));
        };
        let right = self.operand(&op, Self::exponential)?;
        let arith = if op.kind == TokenKind::Mult { ArithOp::Mul } else { ArithOp::Div };
        Ok(Some(Node::arith(op.range, arith, left, right)))
    }

    fn exponential(&mut self) -> PResult<Option<Node>> {
        let Some(left) = self.primitive()? else { return Ok(None) };
        let Some(op) = self.operator(|k| k == TokenKind::Pow)? else { return Ok(Some(left)) };
        let right = self.operand(&op, Self::primitive)?;
        Ok(Some(Node::arith(op.range, ArithOp::Pow, left, right)))
    }

    /// Saute les espaces puis consomme un opérateur accepté par `accept`.
    /// Sinon, le jeton est rendu (les espaces sautés sont perdus).
    fn operator(&mut self, accept: impl Fn(TokenKind) -> bool) -> PResult<Option<Token>> {
        self.cur.skip_whitespace()?;
        let tok = self.cur.advance()?;
        if accept(tok.kind) {
            p_trace!("operator {} at {}", tok.text, tok.range);
            Ok(Some(tok))
        } else {
            self.cur.pushback();
            Ok(None)
        }
    }

    fn operand(&mut self, op: &Token, next: fn(&mut Self) -> PResult<Option<Node>>) -> PResult<Node> {
        self.cur.skip_whitespace()?;
        next(self)?.ok_or_else(|| ParseError::MissingOperand { range: op.range, operator: op.text.clone() })
    }

    /* ─────────── Primitives ─────────── */

    fn primitive(&mut self) -> PResult<Option<Node>> {
        // Les appels de fonction sont réservés : aucune règle ne les produit.
        if let Some(id) = self.identifier()? {
            return Ok(Some(id.into_primitive()));
        }
        Ok(self.literal()?.map(Node::into_primitive))
    }

    fn identifier(&mut self) -> PResult<Option<Node>> {
        let first = self.cur.advance()?;
        let (is_external, base) = match first.kind {
            TokenKind::Identifier => (false, first.text),
            TokenKind::At => {
                let name = self.cur.advance()?;
                if name.kind != TokenKind::Identifier {
                    return Err(ParseError::unexpected(&name));
                }
                (true, name.text)
            }
            _ => {
                self.cur.pushback();
                return Ok(None);
            }
        };
        let mut path = Vec::new();
        loop {
            if self.cur.advance()?.kind != TokenKind::Dot {
                self.cur.pushback();
                break;
            }
            self.cur.skip_whitespace()?;
            let seg = self.cur.advance()?;
            if seg.kind != TokenKind::Identifier {
                return Err(ParseError::unexpected(&seg));
            }
            path.push(seg.text);
        }
        Ok(Some(Node::new(first.range, NodeKind::Identifier(Identifier { is_external, base, path }))))
    }

    fn literal(&mut self) -> PResult<Option<Node>> {
        let tok = self.cur.advance()?;
        let kind = match tok.kind {
            TokenKind::String => LiteralKind::String,
            TokenKind::Number => LiteralKind::Number,
            TokenKind::Bool => LiteralKind::Boolean,
            _ => {
                self.cur.pushback();
                return Ok(None);
            }
        };
        Ok(Some(Node::new(tok.range, NodeKind::Literal(Literal::new(kind, tok.text)))))
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
