//! clause-lexer — analyse lexicale des expressions clause
//!
//! Faits saillants :
//! - [`RuneReader`] : lecture UTF-8 rune par rune avec retour arrière
//! - [`Lexer`] : jetons `(genre, position, texte)`, espaces compris
//! - correspondance spéculative des opérateurs à deux runes et des mots-clés,
//!   avec restauration exacte de la position en cas d'échec
//!
//! Exemple éclair :
//! ```
//! use clause_lexer::{Lexer, TokenKind};
//!
//! let toks = Lexer::from_source("@user.age >= 18").tokenize().unwrap();
//! assert_eq!(toks[0].kind, TokenKind::At);
//! assert_eq!(toks[5].text, ">=");
//! assert!(toks.last().unwrap().is_eof());
//! ```

#![deny(missing_docs)]

use std::io::Read;

use clause_core::Range;
use thiserror::Error;

pub mod reader;
mod token;

pub use reader::{ReaderError, RuneReader};
pub use token::{Token, TokenKind};

/* ─────────────────────────── Options ─────────────────────────── */

/// Options du lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LexerOptions {
    /// Un mot-clé ne correspond que s'il n'est pas suivi d'une lettre.
    /// Désactivé, `orange` donne `or` puis `ange`.
    pub keyword_boundary: bool,
}

impl Default for LexerOptions {
    fn default() -> Self { Self { keyword_boundary: true } }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d'erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// Fin de ligne ou d'entrée avant le `"` fermant.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Deux points décimaux, ou plusieurs `0` en tête.
    #[error("malformed number literal")]
    MalformedNumber,
    /// Caractère hors grammaire (levée par le parser sur un jeton `Illegal`).
    #[error("illegal character {0:?}")]
    IllegalCharacter(char),
    /// Erreur du flux sous-jacent.
    #[error("source stream error: {0}")]
    Stream(String),
}

/// Erreur lexicale avec position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {range}")]
pub struct LexError {
    /// Position.
    pub range: Range,
    /// Genre d'erreur.
    pub kind: LexErrorKind,
}

impl LexError {
    /// Construit une erreur.
    pub const fn new(range: Range, kind: LexErrorKind) -> Self { Self { range, kind } }
}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical incrémental.
pub struct Lexer<R> {
    reader: RuneReader<R>,
    opts: LexerOptions,
    /// Position du prochain rune.
    pos: Range,
    /// Runes consommées pendant l'étape courante, avec leur position.
    step: Vec<(Range, char)>,
    finished: bool,
}

impl<'a> Lexer<&'a [u8]> {
    /// Lexer sur une chaîne en mémoire.
    pub fn from_source(src: &'a str) -> Self { Self::new(RuneReader::from_source(src)) }
}

impl<R: Read> Lexer<R> {
    /// Crée un lexer avec options par défaut.
    pub fn new(reader: RuneReader<R>) -> Self { Self::with_options(reader, LexerOptions::default()) }

    /// Crée un lexer avec `LexerOptions`.
    pub const fn with_options(reader: RuneReader<R>, opts: LexerOptions) -> Self {
        Self { reader, opts, pos: Range::START, step: Vec::new(), finished: false }
    }

    /// Position du prochain rune.
    pub const fn position(&self) -> Range { self.pos }

    /// Jeton suivant. Après la fin d'entrée, renvoie `Eof` indéfiniment.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.reader.cleanup();
        self.step.clear();
        let tok = self.lex()?;
        #[cfg(feature = "trace")]
        log::trace!("{} {} {:?}", tok.range, tok.kind, tok.text);
        Ok(tok)
    }

    /// Tokenise toute l'entrée (ajoute `Eof` final).
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            let t = self.next_token()?;
            let eof = t.is_eof();
            out.push(t);
            if eof {
                return Ok(out);
            }
        }
    }

    fn lex(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let Some(c) = self.bump()? else {
            self.finished = true;
            return Ok(Token::new(TokenKind::Eof, start, ""));
        };
        let kind = match c {
            '"' => return self.lex_string(start),
            '@' => TokenKind::At,
            '+' => TokenKind::Add,
            '-' => TokenKind::Sub,
            '*' => if self.speculate("*")? { TokenKind::Pow } else { TokenKind::Mult },
            '/' => TokenKind::Div,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '=' | '!' => if self.speculate("=")? { TokenKind::EqualityOp } else { TokenKind::Illegal },
            '>' | '<' => {
                self.speculate("=")?;
                TokenKind::ComparisonOp
            }
            d if d.is_ascii_digit() => return self.lex_number(start, d),
            w if w.is_whitespace() => {
                self.consume_while(char::is_whitespace)?;
                TokenKind::Whitespace
            }
            l if l.is_alphabetic() => match self.keyword(l)? {
                Some(kind) => kind,
                None => {
                    self.consume_while(char::is_alphabetic)?;
                    TokenKind::Identifier
                }
            },
            _ => TokenKind::Illegal,
        };
        Ok(Token::new(kind, start, self.step_text()))
    }

    /* ────────── Sous-lexers ────────── */

    /// Mots-clés, le premier rune étant déjà consommé.
    fn keyword(&mut self, first: char) -> Result<Option<TokenKind>, LexError> {
        let (rest, kind) = match first {
            'a' => ("nd", TokenKind::Conjunction),
            'o' => ("r", TokenKind::Disjunction),
            't' => ("rue", TokenKind::Bool),
            'f' => ("alse", TokenKind::Bool),
            _ => return Ok(None),
        };
        let mark = self.step.len();
        if !self.speculate(rest)? {
            return Ok(None);
        }
        if self.opts.keyword_boundary && self.peek_is(char::is_alphabetic)? {
            self.restore(mark)?;
            return Ok(None);
        }
        Ok(Some(kind))
    }

    fn lex_number(&mut self, start: Range, first: char) -> Result<Token, LexError> {
        let mut seen_dot = false;
        let mut leading_zeros = usize::from(first == '0');
        let mut in_leading = first == '0';
        loop {
            match self.bump()? {
                Some(d) if d.is_ascii_digit() => {
                    if in_leading {
                        if d == '0' {
                            leading_zeros += 1;
                        } else {
                            in_leading = false;
                        }
                    }
                    if leading_zeros > 1 {
                        return Err(LexError::new(start, LexErrorKind::MalformedNumber));
                    }
                }
                Some('.') => {
                    if seen_dot {
                        return Err(LexError::new(start, LexErrorKind::MalformedNumber));
                    }
                    seen_dot = true;
                    in_leading = false;
                }
                Some(_) => {
                    self.back()?;
                    break;
                }
                None => break,
            }
        }
        Ok(Token::new(TokenKind::Number, start, self.step_text()))
    }

    /// Seul le guillemet échappé est traité ; l'antislash reste dans le texte.
    fn lex_string(&mut self, start: Range) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut escape = false;
        loop {
            match self.bump()? {
                None | Some('\n') => return Err(LexError::new(start, LexErrorKind::UnterminatedString)),
                Some('"') if escape => {
                    escape = false;
                    text.push('"');
                }
                Some('"') => return Ok(Token::new(TokenKind::String, start, text)),
                Some(c) => {
                    if c == '\\' {
                        escape = !escape;
                    }
                    text.push(c);
                }
            }
        }
    }

    /* ────────── Primitives internes ────────── */

    fn bump(&mut self) -> Result<Option<char>, LexError> {
        if self.finished {
            return Ok(None);
        }
        match self.reader.read_rune() {
            Ok(Some((c, _))) => {
                self.step.push((self.pos, c));
                self.pos = self.pos.advance(c);
                Ok(Some(c))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LexError::new(self.pos, LexErrorKind::Stream(e.to_string()))),
        }
    }

    fn back(&mut self) -> Result<(), LexError> {
        let Some((pos, _)) = self.step.pop() else {
            return Err(LexError::new(self.pos, LexErrorKind::Stream(ReaderError::NothingToUnread.to_string())));
        };
        self.reader
            .unread()
            .map_err(|e| LexError::new(pos, LexErrorKind::Stream(e.to_string())))?;
        self.pos = pos;
        Ok(())
    }

    fn restore(&mut self, mark: usize) -> Result<(), LexError> {
        while self.step.len() > mark {
            self.back()?;
        }
        Ok(())
    }

    /// Consomme `candidate` rune par rune ; restaure tout en cas d'échec.
    fn speculate(&mut self, candidate: &str) -> Result<bool, LexError> {
        let mark = self.step.len();
        for expected in candidate.chars() {
            match self.bump()? {
                Some(c) if c == expected => {}
                Some(_) => {
                    self.restore(mark)?;
                    return Ok(false);
                }
                None => {
                    self.restore(mark)?;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn peek_is(&mut self, pred: impl Fn(char) -> bool) -> Result<bool, LexError> {
        match self.bump()? {
            Some(c) => {
                self.back()?;
                Ok(pred(c))
            }
            None => Ok(false),
        }
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> Result<(), LexError> {
        while let Some(c) = self.bump()? {
            if !pred(c) {
                self.back()?;
                break;
            }
        }
        Ok(())
    }

    fn step_text(&self) -> String { self.step.iter().map(|&(_, c)| c).collect() }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn toks(src: &str) -> Vec<Token> { Lexer::from_source(src).tokenize().unwrap() }

    fn kinds(src: &str) -> Vec<TokenKind> { toks(src).into_iter().map(|t| t.kind).collect() }

    fn lex_err(src: &str) -> LexError { Lexer::from_source(src).tokenize().unwrap_err() }

    #[test]
    fn demo_expression() {
        use TokenKind::*;
        let v = toks(r#"@user.role.name + "I" == "HII""#);
        let got: Vec<_> = v.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (At, "@"),
                (Identifier, "user"),
                (Dot, "."),
                (Identifier, "role"),
                (Dot, "."),
                (Identifier, "name"),
                (Whitespace, " "),
                (Add, "+"),
                (Whitespace, " "),
                (String, "I"),
                (Whitespace, " "),
                (EqualityOp, "=="),
                (Whitespace, " "),
                (String, "HII"),
                (Eof, ""),
            ]
        );
    }

    #[test]
    fn operators_with_speculative_fallback() {
        use TokenKind::*;
        assert_eq!(kinds("** * / ( ) , ."), vec![Pow, Whitespace, Mult, Whitespace, Div, Whitespace, LParen, Whitespace, RParen, Whitespace, Comma, Whitespace, Dot, Eof]);
        let v = toks(">= > <= < != ==");
        let texts: Vec<_> = v.iter().filter(|t| t.kind != Whitespace).map(|t| (t.kind, t.text.clone())).collect();
        assert_eq!(
            texts,
            vec![
                (ComparisonOp, ">=".to_string()),
                (ComparisonOp, ">".to_string()),
                (ComparisonOp, "<=".to_string()),
                (ComparisonOp, "<".to_string()),
                (EqualityOp, "!=".to_string()),
                (EqualityOp, "==".to_string()),
                (Eof, std::string::String::new()),
            ]
        );
        assert_eq!(kinds("=1"), vec![Illegal, Number, Eof]);
        assert_eq!(kinds("!"), vec![Illegal, Eof]);
        assert_eq!(kinds("*"), vec![Mult, Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(kinds("true and false or x"), vec![Bool, Whitespace, Conjunction, Whitespace, Bool, Whitespace, Disjunction, Whitespace, Identifier, Eof]);
        // Préfixes de mots-clés
        let v = toks("orange an tru android");
        let got: Vec<_> = v.iter().filter(|t| t.kind != Whitespace).map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(got, vec![(Identifier, "orange"), (Identifier, "an"), (Identifier, "tru"), (Identifier, "android"), (Eof, "")]);
    }

    #[test]
    fn keyword_prefix_matching_without_boundary() {
        use TokenKind::*;
        let opts = LexerOptions { keyword_boundary: false };
        let v = Lexer::with_options(RuneReader::from_source("orange"), opts).tokenize().unwrap();
        let got: Vec<_> = v.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(got, vec![(Disjunction, "or"), (Identifier, "ange"), (Eof, "")]);
    }

    #[test]
    fn unicode_identifiers_and_spaces() {
        use TokenKind::*;
        let v = toks("été\u{00A0}\tπ");
        let got: Vec<_> = v.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(got, vec![(Identifier, "été"), (Whitespace, "\u{00A0}\t"), (Identifier, "π"), (Eof, "")]);
        assert_eq!(kinds("a_b"), vec![Identifier, Illegal, Identifier, Eof]);
        assert_eq!(kinds("ab1"), vec![Identifier, Number, Eof]);
    }

    #[test]
    fn numbers() {
        let v = toks("0 0.5 10 100 1. 3.25");
        let nums: Vec<_> = v.iter().filter(|t| t.kind == TokenKind::Number).map(|t| t.text.as_str()).collect();
        assert_eq!(nums, vec!["0", "0.5", "10", "100", "1.", "3.25"]);
    }

    #[test]
    fn malformed_numbers() {
        assert_eq!(lex_err("007").kind, LexErrorKind::MalformedNumber);
        assert_eq!(lex_err("00.5").kind, LexErrorKind::MalformedNumber);
        let e = lex_err("x + 1.2.3");
        assert_eq!(e.kind, LexErrorKind::MalformedNumber);
        assert_eq!(e.range, Range::new(1, 4, 4));
    }

    #[test]
    fn strings_keep_backslashes() {
        let v = toks(r#""a\"b" "c\\" "plain""#);
        let s: Vec<_> = v.iter().filter(|t| t.kind == TokenKind::String).map(|t| t.text.as_str()).collect();
        assert_eq!(s, vec![r#"a\"b"#, r"c\\", "plain"]);
    }

    #[test]
    fn unterminated_strings() {
        let e = lex_err("\"abc");
        assert_eq!(e.kind, LexErrorKind::UnterminatedString);
        assert_eq!(e.range, Range::START);
        assert_eq!(lex_err("\"ab\ncd\"").kind, LexErrorKind::UnterminatedString);
        // `\x` laisse le drapeau levé : le guillemet suivant est échappé.
        assert_eq!(lex_err(r#""\x""#).kind, LexErrorKind::UnterminatedString);
        assert_eq!(e.to_string(), "unterminated string literal at 1:0");
    }

    #[test]
    fn ranges_track_lines_and_columns() {
        let v = toks("a\n  bc");
        let got: Vec<_> = v.iter().map(|t| (t.kind, t.range)).collect();
        assert_eq!(
            got,
            vec![
                (TokenKind::Identifier, Range::new(1, 0, 0)),
                (TokenKind::Whitespace, Range::new(1, 1, 1)),
                (TokenKind::Identifier, Range::new(2, 2, 4)),
                (TokenKind::Eof, Range::new(2, 4, 6)),
            ]
        );
    }

    #[test]
    fn eof_repeats() {
        let mut lx = Lexer::from_source("");
        assert!(lx.next_token().unwrap().is_eof());
        assert!(lx.next_token().unwrap().is_eof());
    }

    proptest! {
        #[test]
        fn texts_cover_input(src in "[ab12+\\-*/(),@=<>! \n]{0,40}") {
            let v = toks(&src);
            let joined: String = v.iter().map(|t| t.text.as_str()).collect();
            prop_assert_eq!(joined, src);
            for w in v.windows(2) {
                prop_assert!(w[0].range.index < w[1].range.index);
            }
        }

        #[test]
        fn plain_integers_lex_whole(n in 1u64..1_000_000_000) {
            let src = n.to_string();
            let v = toks(&src);
            prop_assert_eq!(v.len(), 2);
            prop_assert_eq!(v[0].kind, TokenKind::Number);
            prop_assert_eq!(&v[0].text, &src);
        }
    }
}
