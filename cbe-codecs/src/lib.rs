#![deny(missing_docs, missing_debug_implementations)]

//! Compact byte-level codecs used by the CBE wire format.
//!
//! The CBE document codec keeps its token grammar in the `cbe` crate and
//! delegates the byte layout of its numeric and temporal payloads to this
//! crate:
//!
//! - [`vlq`]: unsigned big-endian base-128 integers (array length prefixes
//!   and oversized integer magnitudes), plus the zigzag mapping for signed
//!   values.
//! - [`decimal`]: the compact decimal floating point form.
//! - [`time`]: compact dates, times, and timestamps, including the timezone
//!   payload.
//!
//! All decoders distinguish an input that ended mid-value
//! ([`Error::Incomplete`]) from one that is actually malformed, so a
//! streaming caller can hold back a split token and retry once more bytes
//! arrive.

pub mod decimal;
pub mod time;
pub mod vlq;

mod error;

pub use error::Error;
