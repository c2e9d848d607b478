//! Value kinds shared by the encode and decode surfaces.

/// Sign of an integer value.
///
/// Integers travel as a sign and an unsigned 64-bit magnitude so the full
/// negative range of the wire format stays reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Zero or greater.
    Positive,
    /// Less than zero.
    Negative,
}

/// The length-prefixed payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayKind {
    String,
    Bytes,
    Uri,
    Comment,
}
