use core::fmt;

use clause_core::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Genre de jeton lexical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenKind {
    /// Fin d'entrée.
    Eof,
    /// Caractère non reconnu.
    Illegal,
    /// Suite d'espaces (jamais ignorée par le lexer).
    Whitespace,
    /// Suite de lettres.
    Identifier,
    /// Littéral chaîne (texte sans guillemets).
    String,
    /// Littéral numérique.
    Number,
    /// `true` / `false`
    Bool,
    /// `@`
    At,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mult,
    /// `/`
    Div,
    /// `**`
    Pow,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `==` / `!=`
    EqualityOp,
    /// `<` `>` `<=` `>=`
    ComparisonOp,
    /// `and`
    Conjunction,
    /// `or`
    Disjunction,
}

impl TokenKind {
    /// Nom affiché dans les diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Illegal => "ILLEGAL",
            Self::Whitespace => "WHITESPACE",
            Self::Identifier => "IDENTIFIER",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Bool => "BOOL",
            Self::At => "AT",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
            Self::Pow => "POW",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::Comma => "COMMA",
            Self::Dot => "DOT",
            Self::EqualityOp => "EQUALITY_OP",
            Self::ComparisonOp => "COMPARISON_OP",
            Self::Conjunction => "CONJUNCTION",
            Self::Disjunction => "DISJUNCTION",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Jeton : genre, position du premier rune, texte.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    /// Genre.
    pub kind: TokenKind,
    /// Position du premier rune.
    pub range: Range,
    /// Texte source (contenu sans guillemets pour `String`).
    pub text: String,
}

impl Token {
    /// Construit un jeton.
    pub fn new(kind: TokenKind, range: Range, text: impl Into<String>) -> Self {
        Self { kind, range, text: text.into() }
    }

    /// Vrai pour `Eof`.
    pub fn is_eof(&self) -> bool { self.kind == TokenKind::Eof }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::String => write!(f, "{} {:?}", self.kind, self.text),
            _ => write!(f, "{} `{}`", self.kind, self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_names_the_kind() {
        assert_eq!(Token::new(TokenKind::Eof, Range::START, "").to_string(), "end of input");
        assert!(Token::new(TokenKind::Eof, Range::START, "").is_eof());
        assert!(!Token::new(TokenKind::Number, Range::START, "1").is_eof());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_shape() {
        let tok = Token::new(TokenKind::Number, Range::new(2, 3, 9), "1.5");
        let json = serde_json::to_value(&tok).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "Number", "range": { "line": 2, "column": 3, "index": 9 }, "text": "1.5" }));
        assert_eq!(serde_json::from_value::<Token>(json).unwrap(), tok);
    }
}
