//! Curseur de jetons à un jeton de retour.

use std::io::Read;

use clause_lexer::{LexError, LexErrorKind, Lexer, Token, TokenKind};

use crate::PResult;

/// Enveloppe le lexer : avance, rend le dernier jeton, saute les espaces.
pub struct TokenCursor<R> {
    lexer: Lexer<R>,
    /// Dernier jeton avancé, tant qu'il n'a pas été rendu.
    last: Option<Token>,
    /// Jeton rendu, resservi par le prochain `advance`.
    pushed: Option<Token>,
}

impl<R: Read> TokenCursor<R> {
    /// Curseur sur un lexer.
    pub const fn new(lexer: Lexer<R>) -> Self { Self { lexer, last: None, pushed: None } }

    /// Jeton suivant. `Illegal` devient une erreur lexicale.
    pub fn advance(&mut self) -> PResult<Token> {
        let tok = match self.pushed.take() {
            Some(t) => t,
            None => self.lexer.next_token()?,
        };
        if tok.kind == TokenKind::Illegal {
            let c = tok.text.chars().next().unwrap_or('\u{FFFD}');
            return Err(LexError::new(tok.range, LexErrorKind::IllegalCharacter(c)).into());
        }
        self.last = Some(tok.clone());
        Ok(tok)
    }

    /// Rend le dernier jeton avancé.
    ///
    /// # Panics
    /// Sans `advance` préalable, ou deux fois de suite.
    pub fn pushback(&mut self) {
        assert!(self.pushed.is_none(), "pushback: a token is already pushed back");
        let tok = self.last.take();
        assert!(tok.is_some(), "pushback without a prior advance");
        self.pushed = tok;
    }

    /// Consomme les jetons `Whitespace` ; le premier autre jeton est rendu.
    pub fn skip_whitespace(&mut self) -> PResult<()> {
        loop {
            if self.advance()?.kind != TokenKind::Whitespace {
                self.pushback();
                return Ok(());
            }
        }
    }

    /// Genre du prochain jeton, sans le consommer.
    pub fn peek_kind(&mut self) -> PResult<TokenKind> {
        let kind = self.advance()?.kind;
        self.pushback();
        Ok(kind)
    }
}
