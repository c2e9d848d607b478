//! Codec error type

/// Errors shared by every codec in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The input ended in the middle of an encoded value.
    #[error("Input ended in the middle of an encoded value")]
    Incomplete,

    /// The input cannot be a product of the matching encoder.
    #[error("Malformed encoding")]
    Malformed,

    /// The value cannot be represented in this encoding.
    #[error("Value not representable in this encoding")]
    Unrepresentable,
}
