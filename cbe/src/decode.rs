//! Decoder state machine.
//!
//! A [`Decoder`] consumes wire bytes fed in arbitrary slices and delivers
//! document events to a [`Handler`]. Tokens are atomic: when a feed ends
//! inside one, the position rewinds to just before its tag,
//! [`DecodeError::NeedMoreData`] is reported, and the caller prepends the
//! unconsumed tail to its next feed. The exception is array payloads,
//! which stream through [`Handler::on_array_data`] in as many fragments as
//! the feeds dictate — always in order, with the field's begin event fired
//! exactly once even when its length prefix itself spans feeds.
//!
//! Grammar state advances before a token's event fires, so a handler that
//! stops the process (`false` return) can be resumed with another feed at
//! the following token.

use std::convert::TryFrom;

use bytes::Buf;
use tracing::trace;

use cbe_codecs::decimal::Decimal;
use cbe_codecs::time::{Date, Time, Timestamp};
use cbe_codecs::{vlq, Error as CodecError};

use crate::container::ContainerTracker;
use crate::error::DecodeError;
use crate::tag::{Tag, SHORT_STRING_BASE, SMALL_INT_MAX, SMALL_INT_MIN};
use crate::types::{ArrayKind, Sign};
use crate::validate::PayloadCheck;

/// Document events delivered by a [`Decoder`].
///
/// Every method defaults to doing nothing and continuing, so a handler
/// implements only the events it cares about. Returning `false` from any
/// method stops the feed with [`DecodeError::StoppedInCallback`]; the
/// process stays consistent and may be resumed or discarded.
pub trait Handler {
    /// A nil value.
    fn on_nil(&mut self) -> bool {
        true
    }

    /// A boolean value.
    fn on_boolean(&mut self, _value: bool) -> bool {
        true
    }

    /// An integer as sign and magnitude.
    fn on_integer(&mut self, _sign: Sign, _magnitude: u64) -> bool {
        true
    }

    /// A binary float (either wire width).
    fn on_float(&mut self, _value: f64) -> bool {
        true
    }

    /// A decimal float.
    fn on_decimal_float(&mut self, _value: f64) -> bool {
        true
    }

    /// A date.
    fn on_date(&mut self, _date: Date) -> bool {
        true
    }

    /// A time of day. A named zone borrows from the feed buffer.
    fn on_time(&mut self, _time: Time<'_>) -> bool {
        true
    }

    /// A timestamp. A named zone borrows from the feed buffer.
    fn on_timestamp(&mut self, _timestamp: Timestamp<'_>) -> bool {
        true
    }

    /// A list opened.
    fn on_list_begin(&mut self) -> bool {
        true
    }

    /// An unordered map opened.
    fn on_unordered_map_begin(&mut self) -> bool {
        true
    }

    /// An ordered map opened.
    fn on_ordered_map_begin(&mut self) -> bool {
        true
    }

    /// A metadata map opened.
    fn on_metadata_map_begin(&mut self) -> bool {
        true
    }

    /// The innermost open container closed.
    fn on_container_end(&mut self) -> bool {
        true
    }

    /// A string field of the given payload length begins.
    fn on_string_begin(&mut self, _byte_count: u64) -> bool {
        true
    }

    /// A bytes field of the given payload length begins.
    fn on_bytes_begin(&mut self, _byte_count: u64) -> bool {
        true
    }

    /// A URI field of the given payload length begins.
    fn on_uri_begin(&mut self, _byte_count: u64) -> bool {
        true
    }

    /// A comment field of the given payload length begins.
    fn on_comment_begin(&mut self, _byte_count: u64) -> bool {
        true
    }

    /// One fragment of the open array field's payload.
    fn on_array_data(&mut self, _fragment: &[u8]) -> bool {
        true
    }
}

/// Progress of the array sub-state across feeds.
#[derive(Debug)]
enum ArrayPhase {
    /// No array field in progress.
    Idle,
    /// The length prefix is being accumulated, possibly across feeds.
    ReadingLength {
        kind: ArrayKind,
        acc: vlq::Accumulator,
    },
    /// Length known; the begin event has not fired yet.
    Begin { kind: ArrayKind, total: u64 },
    /// Payload is streaming.
    Streaming {
        total: u64,
        written: u64,
        check: PayloadCheck,
    },
}

/// A streaming CBE decoder delivering events to a handler.
#[derive(Debug)]
pub struct Decoder<H> {
    handler: H,
    containers: ContainerTracker,
    array: ArrayPhase,
    stream_offset: u64,
}

impl<H: Handler> Decoder<H> {
    /// Begin a decode process. A `max_depth` of zero selects
    /// [`DEFAULT_MAX_CONTAINER_DEPTH`](crate::DEFAULT_MAX_CONTAINER_DEPTH).
    pub fn new(handler: H, max_depth: usize) -> Self {
        trace!(max_depth, "begin decode process");
        Self {
            handler,
            containers: ContainerTracker::new(max_depth),
            array: ArrayPhase::Idle,
            stream_offset: 0,
        }
    }

    /// Total bytes consumed since the process began. The difference across
    /// a [`Self::feed`] call tells the caller how much of its slice was
    /// taken.
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }

    /// Number of containers currently open.
    pub fn document_depth(&self) -> usize {
        self.containers.depth()
    }

    /// The handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The handler, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the decoder and return the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Finish the document. Fails if a container or an array field is
    /// still open.
    pub fn end(&mut self) -> Result<(), DecodeError> {
        if !matches!(self.array, ArrayPhase::Idle) {
            return Err(DecodeError::IncompleteArrayField);
        }
        self.containers.finish()?;
        trace!(offset = self.stream_offset, "end decode process");
        Ok(())
    }

    /// Consume as much of `data` as possible, delivering events in
    /// document order.
    ///
    /// [`DecodeError::NeedMoreData`] and [`DecodeError::StoppedInCallback`]
    /// are resumable; compare [`Self::stream_offset`] before and after to
    /// find the unconsumed tail. Any other error poisons the process.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        trace!(len = data.len(), offset = self.stream_offset, "feed");
        let mut pos = 0usize;
        loop {
            if !matches!(self.array, ArrayPhase::Idle) {
                self.advance_array(data, &mut pos)?;
                if !matches!(self.array, ArrayPhase::Idle) {
                    return Err(DecodeError::InternalBug);
                }
            }
            if pos == data.len() {
                return Ok(());
            }
            self.next_token(data, &mut pos)?;
        }
    }

    /// Drive the array sub-state until it returns to idle or the input
    /// runs out.
    fn advance_array(&mut self, data: &[u8], pos: &mut usize) -> Result<(), DecodeError> {
        loop {
            match std::mem::replace(&mut self.array, ArrayPhase::Idle) {
                ArrayPhase::Idle => return Ok(()),
                ArrayPhase::ReadingLength { kind, mut acc } => loop {
                    let Some(&byte) = data.get(*pos) else {
                        self.array = ArrayPhase::ReadingLength { kind, acc };
                        return Err(DecodeError::NeedMoreData);
                    };
                    *pos += 1;
                    self.stream_offset += 1;
                    match acc.push(byte) {
                        Err(_) => return Err(DecodeError::InvalidArgument),
                        Ok(Some(total)) => {
                            self.array = ArrayPhase::Begin { kind, total };
                            break;
                        }
                        Ok(None) => {}
                    }
                },
                ArrayPhase::Begin { kind, total } => {
                    self.array = ArrayPhase::Streaming {
                        total,
                        written: 0,
                        check: PayloadCheck::for_kind(kind),
                    };
                    let go = match kind {
                        ArrayKind::String => self.handler.on_string_begin(total),
                        ArrayKind::Bytes => self.handler.on_bytes_begin(total),
                        ArrayKind::Uri => self.handler.on_uri_begin(total),
                        ArrayKind::Comment => self.handler.on_comment_begin(total),
                    };
                    if !go {
                        return Err(DecodeError::StoppedInCallback);
                    }
                }
                ArrayPhase::Streaming {
                    total,
                    mut written,
                    mut check,
                } => {
                    if written > total {
                        return Err(DecodeError::ArrayFieldLengthExceeded);
                    }
                    if written == total {
                        // Zero-length fields close without payload events.
                        if !check.finish() {
                            return Err(DecodeError::InvalidArrayData);
                        }
                        self.containers.complete_value();
                        continue;
                    }
                    if *pos == data.len() {
                        self.array = ArrayPhase::Streaming {
                            total,
                            written,
                            check,
                        };
                        return Err(DecodeError::NeedMoreData);
                    }
                    let take = (total - written).min((data.len() - *pos) as u64) as usize;
                    let fragment = &data[*pos..*pos + take];
                    if !check.push(fragment) {
                        return Err(DecodeError::InvalidArrayData);
                    }
                    *pos += take;
                    self.stream_offset += take as u64;
                    written += take as u64;
                    if written == total {
                        if !check.finish() {
                            return Err(DecodeError::InvalidArrayData);
                        }
                        self.containers.complete_value();
                    } else {
                        self.array = ArrayPhase::Streaming {
                            total,
                            written,
                            check,
                        };
                    }
                    if !self.handler.on_array_data(fragment) {
                        return Err(DecodeError::StoppedInCallback);
                    }
                }
            }
        }
    }

    /// Dispatch one token starting at `data[*pos]`.
    fn next_token(&mut self, data: &[u8], pos: &mut usize) -> Result<(), DecodeError> {
        let byte = data[*pos];
        trace!(tag = byte, offset = self.stream_offset, "token");

        // Range tags first: small integer literals and short strings.
        let literal = byte as i8;
        if (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&literal) {
            self.containers.check_value(true)?;
            self.take(pos, 1);
            self.containers.complete_value();
            let (sign, magnitude) = if literal < 0 {
                (Sign::Negative, u64::from(literal.unsigned_abs()))
            } else {
                (Sign::Positive, literal as u64)
            };
            return proceed(self.handler.on_integer(sign, magnitude));
        }
        if (SHORT_STRING_BASE..=0x8f).contains(&byte) {
            self.containers.check_value(true)?;
            self.take(pos, 1);
            self.array = ArrayPhase::Begin {
                kind: ArrayKind::String,
                total: u64::from(byte - SHORT_STRING_BASE),
            };
            return Ok(());
        }

        match Tag::try_from(byte)? {
            Tag::Padding => {
                self.take(pos, 1);
                Ok(())
            }
            Tag::Nil => {
                self.containers.check_value(false)?;
                self.take(pos, 1);
                self.containers.complete_value();
                proceed(self.handler.on_nil())
            }
            Tag::True => self.boolean(pos, true),
            Tag::False => self.boolean(pos, false),
            Tag::IntPos8 => self.fixed_integer(data, pos, 1, Sign::Positive),
            Tag::IntNeg8 => self.fixed_integer(data, pos, 1, Sign::Negative),
            Tag::IntPos16 => self.fixed_integer(data, pos, 2, Sign::Positive),
            Tag::IntNeg16 => self.fixed_integer(data, pos, 2, Sign::Negative),
            Tag::IntPos32 => self.fixed_integer(data, pos, 4, Sign::Positive),
            Tag::IntNeg32 => self.fixed_integer(data, pos, 4, Sign::Negative),
            Tag::IntPos64 => self.fixed_integer(data, pos, 8, Sign::Positive),
            Tag::IntNeg64 => self.fixed_integer(data, pos, 8, Sign::Negative),
            Tag::IntPos => self.vlq_integer(data, pos, Sign::Positive),
            Tag::IntNeg => self.vlq_integer(data, pos, Sign::Negative),
            Tag::Float32 => {
                self.containers.check_value(true)?;
                let mut payload = self.payload(data, *pos, 4)?;
                let value = f64::from(payload.get_f32_le());
                self.take(pos, 5);
                self.containers.complete_value();
                proceed(self.handler.on_float(value))
            }
            Tag::Float64 => {
                self.containers.check_value(true)?;
                let mut payload = self.payload(data, *pos, 8)?;
                let value = payload.get_f64_le();
                self.take(pos, 9);
                self.containers.complete_value();
                proceed(self.handler.on_float(value))
            }
            Tag::DecimalFloat => {
                self.containers.check_value(true)?;
                let (decimal, used) = Decimal::decode(&data[*pos + 1..]).map_err(reject)?;
                self.take(pos, 1 + used);
                self.containers.complete_value();
                proceed(self.handler.on_decimal_float(decimal.to_f64()))
            }
            Tag::Date => {
                self.containers.check_value(true)?;
                let (date, used) = Date::decode(&data[*pos + 1..]).map_err(reject)?;
                self.take(pos, 1 + used);
                self.containers.complete_value();
                proceed(self.handler.on_date(date))
            }
            Tag::Time => {
                self.containers.check_value(true)?;
                let (time, used) = Time::decode(&data[*pos + 1..]).map_err(reject)?;
                self.take(pos, 1 + used);
                self.containers.complete_value();
                proceed(self.handler.on_time(time))
            }
            Tag::Timestamp => {
                self.containers.check_value(true)?;
                let (timestamp, used) = Timestamp::decode(&data[*pos + 1..]).map_err(reject)?;
                self.take(pos, 1 + used);
                self.containers.complete_value();
                proceed(self.handler.on_timestamp(timestamp))
            }
            Tag::List => self.container_begin(pos, false, |handler| handler.on_list_begin()),
            Tag::MapUnordered => {
                self.container_begin(pos, true, |handler| handler.on_unordered_map_begin())
            }
            Tag::MapOrdered => {
                self.container_begin(pos, true, |handler| handler.on_ordered_map_begin())
            }
            Tag::MapMetadata => {
                self.container_begin(pos, true, |handler| handler.on_metadata_map_begin())
            }
            Tag::ContainerEnd => {
                self.containers.check_end()?;
                self.take(pos, 1);
                self.containers.end();
                proceed(self.handler.on_container_end())
            }
            Tag::String => self.long_array_begin(pos, ArrayKind::String),
            Tag::Bytes => self.long_array_begin(pos, ArrayKind::Bytes),
            Tag::Uri => self.long_array_begin(pos, ArrayKind::Uri),
            Tag::Comment => self.long_array_begin(pos, ArrayKind::Comment),
        }
    }

    fn boolean(&mut self, pos: &mut usize, value: bool) -> Result<(), DecodeError> {
        self.containers.check_value(true)?;
        self.take(pos, 1);
        self.containers.complete_value();
        proceed(self.handler.on_boolean(value))
    }

    fn fixed_integer(
        &mut self,
        data: &[u8],
        pos: &mut usize,
        width: usize,
        sign: Sign,
    ) -> Result<(), DecodeError> {
        self.containers.check_value(true)?;
        let payload = self.payload(data, *pos, width)?;
        let magnitude = payload
            .iter()
            .rev()
            .fold(0u64, |acc, &byte| acc << 8 | u64::from(byte));
        self.take(pos, 1 + width);
        self.containers.complete_value();
        proceed(self.handler.on_integer(sign, magnitude))
    }

    fn vlq_integer(&mut self, data: &[u8], pos: &mut usize, sign: Sign) -> Result<(), DecodeError> {
        self.containers.check_value(true)?;
        let (magnitude, used) = vlq::decode(&data[*pos + 1..]).map_err(reject)?;
        self.take(pos, 1 + used);
        self.containers.complete_value();
        proceed(self.handler.on_integer(sign, magnitude))
    }

    fn container_begin(
        &mut self,
        pos: &mut usize,
        is_map: bool,
        event: impl FnOnce(&mut H) -> bool,
    ) -> Result<(), DecodeError> {
        self.containers.check_value(false)?;
        self.containers.check_depth()?;
        self.take(pos, 1);
        self.containers.begin(is_map);
        proceed(event(&mut self.handler))
    }

    fn long_array_begin(&mut self, pos: &mut usize, kind: ArrayKind) -> Result<(), DecodeError> {
        self.containers.check_value(true)?;
        self.take(pos, 1);
        self.array = ArrayPhase::ReadingLength {
            kind,
            acc: vlq::Accumulator::new(),
        };
        Ok(())
    }

    /// The token's follow-on bytes, or a rewind to before the tag.
    fn payload<'d>(&self, data: &'d [u8], pos: usize, len: usize) -> Result<&'d [u8], DecodeError> {
        data.get(pos + 1..pos + 1 + len)
            .ok_or(DecodeError::NeedMoreData)
    }

    fn take(&mut self, pos: &mut usize, len: usize) {
        *pos += len;
        self.stream_offset += len as u64;
    }
}

/// Decode a whole document in one call, returning the handler.
pub fn decode<H: Handler>(handler: H, document: &[u8], max_depth: usize) -> Result<H, DecodeError> {
    let mut decoder = Decoder::new(handler, max_depth);
    decoder.feed(document)?;
    decoder.end()?;
    Ok(decoder.into_handler())
}

/// Map a callback's continue flag onto the feed result.
fn proceed(go: bool) -> Result<(), DecodeError> {
    if go {
        Ok(())
    } else {
        Err(DecodeError::StoppedInCallback)
    }
}

/// Auxiliary codec errors at a token position: a short read rewinds, all
/// else is a bad argument.
fn reject(error: CodecError) -> DecodeError {
    match error {
        CodecError::Incomplete => DecodeError::NeedMoreData,
        _ => DecodeError::InvalidArgument,
    }
}
