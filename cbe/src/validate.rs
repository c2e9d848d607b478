//! Payload validation for the array field kinds.
//!
//! Strings and comments must be well-formed UTF-8; payloads arrive in
//! arbitrary fragments, so a code point split across fragment boundaries is
//! carried until its remaining bytes show up. URIs are a per-byte ASCII
//! class and need no carry.

use crate::types::ArrayKind;

/// Character rules layered on top of UTF-8 well-formedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextKind {
    /// Any scalar value except a byte-order mark.
    Plain,
    /// Plain rules plus no control characters other than tab, LF, and CR.
    Comment,
}

fn allowed(kind: TextKind, c: char) -> bool {
    if c == '\u{feff}' {
        return false;
    }
    match kind {
        TextKind::Plain => true,
        TextKind::Comment => !matches!(
            c,
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}'..='\u{9f}'
        ),
    }
}

/// Incremental UTF-8 validation with a carried partial code point.
#[derive(Debug, Default)]
pub(crate) struct Utf8Stream {
    pending: [u8; 4],
    pending_len: u8,
}

impl Utf8Stream {
    fn push(&mut self, kind: TextKind, mut chunk: &[u8]) -> bool {
        if self.pending_len > 0 {
            let need = sequence_len(self.pending[0]);
            let take = (need - usize::from(self.pending_len)).min(chunk.len());
            self.pending[usize::from(self.pending_len)..usize::from(self.pending_len) + take]
                .copy_from_slice(&chunk[..take]);
            self.pending_len += take as u8;
            chunk = &chunk[take..];
            if usize::from(self.pending_len) < need {
                return true;
            }
            match core::str::from_utf8(&self.pending[..need]) {
                Ok(s) if s.chars().all(|c| allowed(kind, c)) => self.pending_len = 0,
                _ => return false,
            }
        }
        match core::str::from_utf8(chunk) {
            Ok(s) => s.chars().all(|c| allowed(kind, c)),
            Err(e) => {
                let (valid, tail) = chunk.split_at(e.valid_up_to());
                match core::str::from_utf8(valid) {
                    Ok(s) if s.chars().all(|c| allowed(kind, c)) => {}
                    _ => return false,
                }
                if e.error_len().is_some() {
                    return false;
                }
                // The fragment ended inside a code point; carry the tail.
                self.pending[..tail.len()].copy_from_slice(tail);
                self.pending_len = tail.len() as u8;
                true
            }
        }
    }

    fn finish(&self) -> bool {
        self.pending_len == 0
    }
}

/// Expected byte length of a UTF-8 sequence with this lead byte.
fn sequence_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

fn is_uri_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b':'
                | b'/'
                | b'?'
                | b'#'
                | b'['
                | b']'
                | b'@'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b'%'
        )
}

/// Per-kind payload validation state for one array field.
#[derive(Debug)]
pub(crate) enum PayloadCheck {
    Unchecked,
    Uri,
    Text(TextKind, Utf8Stream),
}

impl PayloadCheck {
    pub(crate) fn for_kind(kind: ArrayKind) -> Self {
        match kind {
            ArrayKind::Bytes => PayloadCheck::Unchecked,
            ArrayKind::Uri => PayloadCheck::Uri,
            ArrayKind::String => PayloadCheck::Text(TextKind::Plain, Utf8Stream::default()),
            ArrayKind::Comment => PayloadCheck::Text(TextKind::Comment, Utf8Stream::default()),
        }
    }

    /// Validate the next payload fragment. `false` means the field can
    /// never become valid.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> bool {
        match self {
            PayloadCheck::Unchecked => true,
            PayloadCheck::Uri => chunk.iter().all(|&b| is_uri_byte(b)),
            PayloadCheck::Text(kind, stream) => stream.push(*kind, chunk),
        }
    }

    /// The field is complete; reject a dangling partial code point.
    pub(crate) fn finish(&self) -> bool {
        match self {
            PayloadCheck::Unchecked | PayloadCheck::Uri => true,
            PayloadCheck::Text(_, stream) => stream.finish(),
        }
    }
}
