#![deny(missing_docs, missing_debug_implementations)]

//! A streaming codec for the Concise Binary Encoding (CBE) document
//! format.
//!
//! CBE is a self-describing, schema-less binary format carrying a tree of
//! typed values — booleans, arbitrary-width integers, binary and decimal
//! floats, dates/times/timestamps, strings, URIs, comments, opaque bytes,
//! lists, and three flavors of map — as a sequence of tagged,
//! length-prefixed records.
//!
//! Both processes work incrementally against caller-owned, bounded
//! buffers. The [`Encoder`] is push-driven: it suspends with
//! [`EncodeError::NeedMoreRoom`] when its buffer fills, and resumes after
//! the caller drains it. The [`Decoder`] is event-driven: it delivers
//! [`Handler`] events as bytes arrive and suspends with
//! [`DecodeError::NeedMoreData`] on a split token, never losing partially
//! consumed input. Neither process allocates per token and both enforce
//! the document grammar — balanced containers, map key/value alternation,
//! restricted key kinds, completed array fields, and exactly one top-level
//! value per document — in constant time per token.
//!
//! # Encoding
//!
//! ```
//! use cbe::{Encoder, Sign};
//!
//! let mut buffer = [0u8; 64];
//! let mut encoder = Encoder::new(&mut buffer, 0);
//! encoder.list_begin()?;
//! encoder.add_string("1")?;
//! encoder.add_integer(Sign::Positive, 1)?;
//! encoder.container_end()?;
//! assert_eq!(encoder.written(), [0x77, 0x81, 0x31, 0x01, 0x7b]);
//! encoder.end()?;
//! # Ok::<(), cbe::EncodeError>(())
//! ```
//!
//! # Decoding
//!
//! ```
//! use cbe::{Handler, Sign};
//!
//! #[derive(Default)]
//! struct Integers(Vec<u64>);
//!
//! impl Handler for Integers {
//!     fn on_integer(&mut self, _sign: Sign, magnitude: u64) -> bool {
//!         self.0.push(magnitude);
//!         true
//!     }
//! }
//!
//! let document = [0x77, 0x81, 0x31, 0x01, 0x7b];
//! let integers = cbe::decode(Integers::default(), &document, 0)?;
//! assert_eq!(integers.0, [1]);
//! # Ok::<(), cbe::DecodeError>(())
//! ```

pub mod decode;
pub mod encode;
pub mod error;
pub mod tag;

mod container;
mod types;
mod validate;

pub use decode::{decode, Decoder, Handler};
pub use encode::Encoder;
pub use error::{DecodeError, EncodeError};
pub use types::Sign;

pub use cbe_codecs::time::{Date, Time, Timestamp, Timezone};

/// Container depth limit applied when a process is begun with a
/// `max_depth` of zero.
pub const DEFAULT_MAX_CONTAINER_DEPTH: usize = 500;
