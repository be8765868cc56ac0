//! Lecteur de runes avec retour arrière.
//!
//! Les runes lues depuis le flux sont gardées dans une fenêtre tampon ;
//! `unread` recule l'index dans cette fenêtre et la lecture suivante rejoue
//! le tampon avant de retourner au flux. `cleanup` oublie tout ce qui est
//! derrière l'index courant.

use std::io::{self, Read};

use thiserror::Error;

/// Erreur de retour arrière.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// L'index est déjà au début de la fenêtre tampon.
    #[error("nothing to unread")]
    NothingToUnread,
}

/// Lecteur UTF-8 rune par rune, avec retour arrière illimité dans la fenêtre.
#[derive(Debug)]
pub struct RuneReader<R> {
    inner: R,
    /// Runes lues et leur largeur UTF-8.
    buffer: Vec<(char, usize)>,
    index: usize,
    /// Runes rendues depuis la dernière lecture.
    pending_unread: usize,
}

impl<'a> RuneReader<&'a [u8]> {
    /// Lecteur sur une chaîne en mémoire.
    pub fn from_source(src: &'a str) -> Self { Self::new(src.as_bytes()) }
}

impl<R: Read> RuneReader<R> {
    /// Enveloppe un flux d'octets.
    pub const fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new(), index: 0, pending_unread: 0 }
    }

    /// Rune suivante et sa largeur en octets ; `None` en fin d'entrée.
    ///
    /// Un UTF-8 invalide remonte en `io::ErrorKind::InvalidData`.
    pub fn read_rune(&mut self) -> io::Result<Option<(char, usize)>> {
        self.pending_unread = 0;
        if let Some(&entry) = self.buffer.get(self.index) {
            self.index += 1;
            return Ok(Some(entry));
        }
        let Some(entry) = self.pull()? else { return Ok(None) };
        self.buffer.push(entry);
        self.index += 1;
        Ok(Some(entry))
    }

    /// Rend la dernière rune lue au tampon.
    pub fn unread(&mut self) -> Result<(), ReaderError> {
        if self.index == 0 {
            return Err(ReaderError::NothingToUnread);
        }
        self.index -= 1;
        self.pending_unread += 1;
        Ok(())
    }

    /// Oublie l'historique consommé. Les runes rendues restent disponibles.
    pub fn cleanup(&mut self) {
        self.buffer.drain(..self.index);
        self.index = 0;
    }

    /// Nombre de runes rendues depuis la dernière lecture.
    pub const fn pending_unread(&self) -> usize { self.pending_unread }

    /// Nombre de runes tamponnées (derrière et devant l'index).
    pub fn buffered(&self) -> usize { self.buffer.len() }

    /// Décode une rune depuis le flux sous-jacent.
    fn pull(&mut self) -> io::Result<Option<(char, usize)>> {
        let mut bytes = [0u8; 4];
        loop {
            match self.inner.read(&mut bytes[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        let width = utf8_width(bytes[0]).ok_or_else(invalid_utf8)?;
        if width > 1 {
            self.inner.read_exact(&mut bytes[1..width]).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof { invalid_utf8() } else { e }
            })?;
        }
        let c = std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(invalid_utf8)?;
        Ok(Some((c, width)))
    }
}

const fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn invalid_utf8() -> io::Error { io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8 in source") }
