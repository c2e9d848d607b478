//! Tag bytes of the CBE wire format.
//!
//! Every token starts with one tag byte. Three regions are ranges rather
//! than single tags: small integer literals occupy the signed byte range
//! -100..=100, short strings carry their length in the low nibble of
//! 0x80..=0x8f, and everything else is a fixed tag from [`Tag`]. The
//! remaining bytes (0x72..=0x76 and 0x94..=0x98) are reserved and rejected
//! at decode time.

use std::convert::TryFrom;

use crate::error::DecodeError;

/// Smallest integer encoded directly in the tag byte.
pub const SMALL_INT_MIN: i8 = -100;

/// Largest integer encoded directly in the tag byte.
pub const SMALL_INT_MAX: i8 = 100;

/// Tag of a zero-length short string; lengths 0..=15 add onto it.
pub const SHORT_STRING_BASE: u8 = 0x80;

/// Longest string whose length fits in the tag's low nibble.
pub const SHORT_STRING_MAX_LEN: u64 = 15;

/// Fixed tag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// Compact decimal float follows.
    DecimalFloat = 0x65,
    /// Positive integer, base-128 magnitude.
    IntPos = 0x66,
    /// Negative integer, base-128 magnitude.
    IntNeg = 0x67,
    /// Positive integer, 8-bit magnitude.
    IntPos8 = 0x68,
    /// Negative integer, 8-bit magnitude.
    IntNeg8 = 0x69,
    /// Positive integer, 16-bit magnitude.
    IntPos16 = 0x6a,
    /// Negative integer, 16-bit magnitude.
    IntNeg16 = 0x6b,
    /// Positive integer, 32-bit magnitude.
    IntPos32 = 0x6c,
    /// Negative integer, 32-bit magnitude.
    IntNeg32 = 0x6d,
    /// Positive integer, 64-bit magnitude.
    IntPos64 = 0x6e,
    /// Negative integer, 64-bit magnitude.
    IntNeg64 = 0x6f,
    /// IEEE-754 binary32, little endian.
    Float32 = 0x70,
    /// IEEE-754 binary64, little endian.
    Float64 = 0x71,
    /// List begin.
    List = 0x77,
    /// Unordered map begin.
    MapUnordered = 0x78,
    /// Ordered map begin.
    MapOrdered = 0x79,
    /// Metadata map begin.
    MapMetadata = 0x7a,
    /// End of the innermost open container.
    ContainerEnd = 0x7b,
    /// Boolean false.
    False = 0x7c,
    /// Boolean true.
    True = 0x7d,
    /// Nil.
    Nil = 0x7e,
    /// Ignored filler byte.
    Padding = 0x7f,
    /// String with a length prefix.
    String = 0x90,
    /// Opaque bytes with a length prefix.
    Bytes = 0x91,
    /// URI with a length prefix.
    Uri = 0x92,
    /// Comment with a length prefix.
    Comment = 0x93,
    /// Compact date follows.
    Date = 0x99,
    /// Compact time follows.
    Time = 0x9a,
    /// Compact timestamp follows.
    Timestamp = 0x9b,
}

impl TryFrom<u8> for Tag {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let tag = match value {
            0x65 => Tag::DecimalFloat,

            0x66 => Tag::IntPos,
            0x67 => Tag::IntNeg,
            0x68 => Tag::IntPos8,
            0x69 => Tag::IntNeg8,
            0x6a => Tag::IntPos16,
            0x6b => Tag::IntNeg16,
            0x6c => Tag::IntPos32,
            0x6d => Tag::IntNeg32,
            0x6e => Tag::IntPos64,
            0x6f => Tag::IntNeg64,

            0x70 => Tag::Float32,
            0x71 => Tag::Float64,

            0x77 => Tag::List,
            0x78 => Tag::MapUnordered,
            0x79 => Tag::MapOrdered,
            0x7a => Tag::MapMetadata,
            0x7b => Tag::ContainerEnd,

            0x7c => Tag::False,
            0x7d => Tag::True,
            0x7e => Tag::Nil,
            0x7f => Tag::Padding,

            0x90 => Tag::String,
            0x91 => Tag::Bytes,
            0x92 => Tag::Uri,
            0x93 => Tag::Comment,

            0x99 => Tag::Date,
            0x9a => Tag::Time,
            0x9b => Tag::Timestamp,

            _ => return Err(DecodeError::InvalidArgument),
        };

        Ok(tag)
    }
}
