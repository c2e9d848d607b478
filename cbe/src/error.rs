//! Status taxonomy of the two process types.
//!
//! `NeedMoreRoom`, `NeedMoreData`, and `StoppedInCallback` are resumable:
//! the operation that reported them changed nothing it cannot pick up
//! again, so the caller may rotate buffers, supply the unconsumed tail, or
//! simply call again. Every other status leaves the process in an
//! unspecified (but memory safe) state and the process should be
//! discarded.

use thiserror::Error;

/// Statuses reported by [`Encoder`](crate::Encoder) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The buffer cannot hold the encoded operation. Nothing was written;
    /// flush, rotate or reset the buffer, and retry.
    #[error("not enough room left in the encode buffer")]
    NeedMoreRoom,

    /// An operation argument cannot be represented on the wire.
    #[error("invalid argument")]
    InvalidArgument,

    /// Array payload bytes failed the field's validation.
    #[error("invalid array data")]
    InvalidArrayData,

    /// A container end with no open container.
    #[error("unbalanced containers")]
    UnbalancedContainers,

    /// Nil, lists, and maps cannot be map keys.
    #[error("incorrect map key type")]
    IncorrectMapKeyType,

    /// A map closed (or the document ended) right after a key.
    #[error("map is missing a value for the preceding key")]
    MapMissingValueForKey,

    /// Another operation was issued while an array field is still being
    /// streamed.
    #[error("incomplete array field")]
    IncompleteArrayField,

    /// More payload was supplied than the array field declared.
    #[error("array field length exceeded")]
    ArrayFieldLengthExceeded,

    /// `add_data` was called with no array field in progress.
    #[error("not inside an array field")]
    NotInsideArrayField,

    /// A container begin would exceed the configured depth limit.
    #[error("max container depth exceeded")]
    MaxContainerDepthExceeded,
}

/// Statuses reported by [`Decoder`](crate::Decoder) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended inside a token. Everything before the token was
    /// consumed; prepend the unconsumed tail to the next feed.
    #[error("need more data to decode the next token")]
    NeedMoreData,

    /// A handler returned `false`. The process is intact and another feed
    /// resumes after the stopping token.
    #[error("stopped in callback")]
    StoppedInCallback,

    /// A reserved tag byte or a malformed field.
    #[error("invalid argument")]
    InvalidArgument,

    /// Array payload bytes failed the field's validation.
    #[error("invalid array data")]
    InvalidArrayData,

    /// A container end with no open container.
    #[error("unbalanced containers")]
    UnbalancedContainers,

    /// Nil, lists, and maps cannot be map keys.
    #[error("incorrect map key type")]
    IncorrectMapKeyType,

    /// A map closed (or the document ended) right after a key.
    #[error("map is missing a value for the preceding key")]
    MapMissingValueForKey,

    /// The document ended while an array field was still being streamed.
    #[error("incomplete array field")]
    IncompleteArrayField,

    /// Array payload accounting overran the declared length.
    #[error("array field length exceeded")]
    ArrayFieldLengthExceeded,

    /// A container begin would exceed the configured depth limit.
    #[error("max container depth exceeded")]
    MaxContainerDepthExceeded,

    /// The process reached a state it never should.
    #[error("internal bug")]
    InternalBug,
}

/// Grammar faults shared by both machines.
///
/// `DocumentComplete` (a value past the document's one top-level value)
/// surfaces as an unbalanced-container fault: the document's structure
/// closed and nothing can reopen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    TooDeep,
    Unbalanced,
    KeyType,
    MissingValue,
    DocumentComplete,
}

impl From<Violation> for EncodeError {
    fn from(violation: Violation) -> Self {
        match violation {
            Violation::TooDeep => EncodeError::MaxContainerDepthExceeded,
            Violation::Unbalanced | Violation::DocumentComplete => {
                EncodeError::UnbalancedContainers
            }
            Violation::KeyType => EncodeError::IncorrectMapKeyType,
            Violation::MissingValue => EncodeError::MapMissingValueForKey,
        }
    }
}

impl From<Violation> for DecodeError {
    fn from(violation: Violation) -> Self {
        match violation {
            Violation::TooDeep => DecodeError::MaxContainerDepthExceeded,
            Violation::Unbalanced | Violation::DocumentComplete => {
                DecodeError::UnbalancedContainers
            }
            Violation::KeyType => DecodeError::IncorrectMapKeyType,
            Violation::MissingValue => DecodeError::MapMissingValueForKey,
        }
    }
}
