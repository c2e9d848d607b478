//! Encoder state machine.
//!
//! An [`Encoder`] turns caller operations into wire bytes inside a
//! caller-owned buffer. Every operation preflights the array sub-state,
//! the container grammar, and the exact byte cost before touching the
//! buffer, so a failed operation writes nothing: on
//! [`EncodeError::NeedMoreRoom`] the caller drains [`Encoder::written`],
//! resets or rotates the buffer, and retries the same operation.
//!
//! Array fields are the one place a token may span buffers: a
//! `<kind>_begin` emits the tag and length prefix, then
//! [`Encoder::add_data`] streams the payload in as many fragments as the
//! buffer demands.

use bytes::BufMut;
use tracing::trace;

use cbe_codecs::decimal::{Decimal, MAX_ENCODED_LEN as DECIMAL_MAX_LEN};
use cbe_codecs::time::{Date, Time, Timestamp, DATE_MAX_LEN, TIMESTAMP_MAX_LEN, TIME_MAX_LEN};
use cbe_codecs::vlq;

use crate::container::ContainerTracker;
use crate::error::EncodeError;
use crate::tag::{Tag, SHORT_STRING_BASE, SHORT_STRING_MAX_LEN, SMALL_INT_MAX};
use crate::types::{ArrayKind, Sign};
use crate::validate::PayloadCheck;

/// A streaming CBE encoder over a caller-owned buffer.
#[derive(Debug)]
pub struct Encoder<'b> {
    buf: &'b mut [u8],
    pos: usize,
    containers: ContainerTracker,
    array: Option<ArrayField>,
}

#[derive(Debug)]
struct ArrayField {
    total: u64,
    written: u64,
    check: PayloadCheck,
}

impl<'b> Encoder<'b> {
    /// Begin an encode process over `buffer`. A `max_depth` of zero
    /// selects [`DEFAULT_MAX_CONTAINER_DEPTH`](crate::DEFAULT_MAX_CONTAINER_DEPTH).
    pub fn new(buffer: &'b mut [u8], max_depth: usize) -> Self {
        trace!(buffer_len = buffer.len(), max_depth, "begin encode process");
        Self {
            buf: buffer,
            pos: 0,
            containers: ContainerTracker::new(max_depth),
            array: None,
        }
    }

    /// Rotate to a fresh buffer; [`Self::buffer_offset`] restarts at zero.
    /// Legal between operations and between array fragments.
    pub fn set_buffer(&mut self, buffer: &'b mut [u8]) {
        self.buf = buffer;
        self.pos = 0;
    }

    /// Reuse the current buffer from its start, discarding the bytes a
    /// caller has already drained through [`Self::written`].
    pub fn reset_buffer(&mut self) {
        self.pos = 0;
    }

    /// The bytes encoded into the current buffer so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Offset of the next byte relative to the current buffer's start.
    pub fn buffer_offset(&self) -> usize {
        self.pos
    }

    /// Number of containers currently open.
    pub fn document_depth(&self) -> usize {
        self.containers.depth()
    }

    /// Finish the document. Fails if a container or an array field is
    /// still open.
    pub fn end(self) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.finish()?;
        trace!(bytes = self.pos, "end encode process");
        Ok(())
    }

    /// Encode a nil value.
    pub fn add_nil(&mut self) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_value(false)?;
        self.ensure_room(1)?;
        self.emit(&[Tag::Nil as u8]);
        self.containers.complete_value();
        Ok(())
    }

    /// Encode a boolean.
    pub fn add_boolean(&mut self, value: bool) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_value(true)?;
        self.ensure_room(1)?;
        let tag = if value { Tag::True } else { Tag::False };
        self.emit(&[tag as u8]);
        self.containers.complete_value();
        Ok(())
    }

    /// Encode an integer in its narrowest wire form.
    pub fn add_integer(&mut self, sign: Sign, magnitude: u64) -> Result<(), EncodeError> {
        let mut token = [0u8; 1 + vlq::MAX_LEN];
        let len = shrink_integer(sign, magnitude, &mut token);
        self.add_scalar(&token[..len])
    }

    /// Encode a signed integer. Shorthand for [`Self::add_integer`].
    pub fn add_i64(&mut self, value: i64) -> Result<(), EncodeError> {
        if value < 0 {
            self.add_integer(Sign::Negative, value.unsigned_abs())
        } else {
            self.add_integer(Sign::Positive, value as u64)
        }
    }

    /// Encode an unsigned integer. Shorthand for [`Self::add_integer`].
    pub fn add_u64(&mut self, value: u64) -> Result<(), EncodeError> {
        self.add_integer(Sign::Positive, value)
    }

    /// Encode a binary float, shrinking to binary32 when the value
    /// survives the round trip bit for bit. A `significant_digits` count
    /// in `1..=15` switches to the compact decimal form instead.
    pub fn add_float(&mut self, value: f64, significant_digits: u32) -> Result<(), EncodeError> {
        if (1..=15).contains(&significant_digits) {
            return self.add_decimal_float(value, significant_digits);
        }
        let mut token = [0u8; 9];
        let single = value as f32;
        let len = if f64::from(single) == value {
            token[0] = Tag::Float32 as u8;
            (&mut token[1..5]).put_f32_le(single);
            5
        } else {
            token[0] = Tag::Float64 as u8;
            (&mut token[1..9]).put_f64_le(value);
            9
        };
        self.add_scalar(&token[..len])
    }

    /// Encode a decimal float rounded to `significant_digits` digits
    /// (`1..=15`; zero keeps the shortest form that round-trips).
    pub fn add_decimal_float(
        &mut self,
        value: f64,
        significant_digits: u32,
    ) -> Result<(), EncodeError> {
        if significant_digits > 15 {
            return Err(EncodeError::InvalidArgument);
        }
        let decimal = Decimal::from_f64(value, significant_digits)
            .map_err(|_| EncodeError::InvalidArgument)?;
        let mut token = [0u8; 1 + DECIMAL_MAX_LEN];
        token[0] = Tag::DecimalFloat as u8;
        let len = 1 + decimal.encode_into(&mut token[1..]);
        self.add_scalar(&token[..len])
    }

    /// Encode a date.
    pub fn add_date(&mut self, date: Date) -> Result<(), EncodeError> {
        let mut token = [0u8; 1 + DATE_MAX_LEN];
        token[0] = Tag::Date as u8;
        let len = 1 + date
            .encode_into(&mut token[1..])
            .map_err(|_| EncodeError::InvalidArgument)?;
        self.add_scalar(&token[..len])
    }

    /// Encode a time of day. A zone name longer than the wire format's
    /// bound is an invalid argument.
    pub fn add_time(&mut self, time: Time<'_>) -> Result<(), EncodeError> {
        let mut token = [0u8; 1 + TIME_MAX_LEN];
        token[0] = Tag::Time as u8;
        let len = 1 + time
            .encode_into(&mut token[1..])
            .map_err(|_| EncodeError::InvalidArgument)?;
        self.add_scalar(&token[..len])
    }

    /// Encode a timestamp.
    pub fn add_timestamp(&mut self, timestamp: Timestamp<'_>) -> Result<(), EncodeError> {
        let mut token = [0u8; 1 + TIMESTAMP_MAX_LEN];
        token[0] = Tag::Timestamp as u8;
        let len = 1 + timestamp
            .encode_into(&mut token[1..])
            .map_err(|_| EncodeError::InvalidArgument)?;
        self.add_scalar(&token[..len])
    }

    /// Emit `count` padding bytes. Padding may appear anywhere a tag may
    /// appear and does not affect the grammar.
    pub fn add_padding(&mut self, count: usize) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.ensure_room(count)?;
        self.buf[self.pos..self.pos + count].fill(Tag::Padding as u8);
        self.pos += count;
        Ok(())
    }

    /// Open a list.
    pub fn list_begin(&mut self) -> Result<(), EncodeError> {
        self.container_begin(Tag::List, false)
    }

    /// Open an unordered map.
    pub fn unordered_map_begin(&mut self) -> Result<(), EncodeError> {
        self.container_begin(Tag::MapUnordered, true)
    }

    /// Open an ordered map.
    pub fn ordered_map_begin(&mut self) -> Result<(), EncodeError> {
        self.container_begin(Tag::MapOrdered, true)
    }

    /// Open a metadata map.
    pub fn metadata_map_begin(&mut self) -> Result<(), EncodeError> {
        self.container_begin(Tag::MapMetadata, true)
    }

    /// Close the innermost open container.
    pub fn container_end(&mut self) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_end()?;
        self.ensure_room(1)?;
        self.emit(&[Tag::ContainerEnd as u8]);
        self.containers.end();
        Ok(())
    }

    /// Open a string field of `byte_count` payload bytes.
    pub fn string_begin(&mut self, byte_count: u64) -> Result<(), EncodeError> {
        self.array_begin(ArrayKind::String, byte_count)
    }

    /// Open a bytes field of `byte_count` payload bytes.
    pub fn bytes_begin(&mut self, byte_count: u64) -> Result<(), EncodeError> {
        self.array_begin(ArrayKind::Bytes, byte_count)
    }

    /// Open a URI field of `byte_count` payload bytes.
    pub fn uri_begin(&mut self, byte_count: u64) -> Result<(), EncodeError> {
        self.array_begin(ArrayKind::Uri, byte_count)
    }

    /// Open a comment field of `byte_count` payload bytes.
    pub fn comment_begin(&mut self, byte_count: u64) -> Result<(), EncodeError> {
        self.array_begin(ArrayKind::Comment, byte_count)
    }

    /// Stream payload into the open array field, validating it for the
    /// field's kind. Returns how many bytes were taken; less than
    /// `data.len()` means the buffer filled up — drain it and continue
    /// with the rest. The field closes itself once fully written.
    pub fn add_data(&mut self, data: &[u8]) -> Result<usize, EncodeError> {
        let field = self
            .array
            .as_mut()
            .ok_or(EncodeError::NotInsideArrayField)?;
        let room = (self.buf.len() - self.pos) as u64;
        let take = (field.total - field.written)
            .min(data.len() as u64)
            .min(room) as usize;
        let chunk = &data[..take];
        if !field.check.push(chunk) {
            return Err(EncodeError::InvalidArrayData);
        }
        self.buf[self.pos..self.pos + take].copy_from_slice(chunk);
        self.pos += take;
        field.written += take as u64;
        if field.written == field.total {
            if !field.check.finish() {
                return Err(EncodeError::InvalidArrayData);
            }
            self.array = None;
            self.containers.complete_value();
        }
        Ok(take)
    }

    /// Encode a whole string in one operation, rolling back on failure.
    pub fn add_string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.add_array(ArrayKind::String, value.as_bytes())
    }

    /// Encode a whole bytes field in one operation, rolling back on
    /// failure.
    pub fn add_bytes(&mut self, value: &[u8]) -> Result<(), EncodeError> {
        self.add_array(ArrayKind::Bytes, value)
    }

    /// Encode a whole URI in one operation, rolling back on failure.
    pub fn add_uri(&mut self, value: &str) -> Result<(), EncodeError> {
        self.add_array(ArrayKind::Uri, value.as_bytes())
    }

    /// Encode a whole comment in one operation, rolling back on failure.
    pub fn add_comment(&mut self, value: &str) -> Result<(), EncodeError> {
        self.add_array(ArrayKind::Comment, value.as_bytes())
    }

    fn add_array(&mut self, kind: ArrayKind, data: &[u8]) -> Result<(), EncodeError> {
        let saved = self.pos;
        let result = self.add_array_inner(kind, data);
        if result.is_err() {
            self.pos = saved;
            self.array = None;
        }
        result
    }

    fn add_array_inner(&mut self, kind: ArrayKind, data: &[u8]) -> Result<(), EncodeError> {
        self.array_begin(kind, data.len() as u64)?;
        if data.is_empty() {
            return Ok(());
        }
        if self.add_data(data)? < data.len() {
            return Err(EncodeError::NeedMoreRoom);
        }
        Ok(())
    }

    fn array_begin(&mut self, kind: ArrayKind, byte_count: u64) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_value(true)?;
        let mut header = [0u8; 1 + vlq::MAX_LEN];
        let header_len = if kind == ArrayKind::String && byte_count <= SHORT_STRING_MAX_LEN {
            header[0] = SHORT_STRING_BASE + byte_count as u8;
            1
        } else {
            header[0] = array_tag(kind) as u8;
            1 + vlq::encode_into(byte_count, &mut header[1..])
        };
        self.ensure_room(header_len)?;
        self.emit(&header[..header_len]);
        if byte_count == 0 {
            self.containers.complete_value();
        } else {
            self.array = Some(ArrayField {
                total: byte_count,
                written: 0,
                check: PayloadCheck::for_kind(kind),
            });
        }
        Ok(())
    }

    fn container_begin(&mut self, tag: Tag, is_map: bool) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_value(false)?;
        self.containers.check_depth()?;
        self.ensure_room(1)?;
        self.emit(&[tag as u8]);
        self.containers.begin(is_map);
        Ok(())
    }

    /// Fully preflighted single-token emission for value kinds that may
    /// be map keys.
    fn add_scalar(&mut self, token: &[u8]) -> Result<(), EncodeError> {
        self.check_no_array()?;
        self.containers.check_value(true)?;
        self.ensure_room(token.len())?;
        self.emit(token);
        self.containers.complete_value();
        Ok(())
    }

    fn check_no_array(&self) -> Result<(), EncodeError> {
        if self.array.is_some() {
            return Err(EncodeError::IncompleteArrayField);
        }
        Ok(())
    }

    fn ensure_room(&self, needed: usize) -> Result<(), EncodeError> {
        if self.buf.len() - self.pos < needed {
            trace!(
                needed,
                available = self.buf.len() - self.pos,
                "suspending encode: need more room"
            );
            return Err(EncodeError::NeedMoreRoom);
        }
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

fn array_tag(kind: ArrayKind) -> Tag {
    match kind {
        ArrayKind::String => Tag::String,
        ArrayKind::Bytes => Tag::Bytes,
        ArrayKind::Uri => Tag::Uri,
        ArrayKind::Comment => Tag::Comment,
    }
}

/// Pick the narrowest wire form for an integer: the tag-byte literal up to
/// 100, then the smallest of the fixed widths and the base-128 form
/// (strictly fewer bytes wins; ties go to the fixed width).
fn shrink_integer(sign: Sign, magnitude: u64, out: &mut [u8; 1 + vlq::MAX_LEN]) -> usize {
    let negative = sign == Sign::Negative;
    if magnitude <= SMALL_INT_MAX as u64 {
        let literal = if negative {
            -(magnitude as i8)
        } else {
            magnitude as i8
        };
        out[0] = literal as u8;
        return 1;
    }
    if magnitude <= u64::from(u8::MAX) {
        out[0] = (if negative { Tag::IntNeg8 } else { Tag::IntPos8 }) as u8;
        out[1] = magnitude as u8;
        return 2;
    }
    if magnitude <= u64::from(u16::MAX) {
        out[0] = (if negative { Tag::IntNeg16 } else { Tag::IntPos16 }) as u8;
        (&mut out[1..3]).put_u16_le(magnitude as u16);
        return 3;
    }
    let vlq_len = vlq::encoded_len(magnitude);
    if magnitude <= u64::from(u32::MAX) {
        if vlq_len < 4 {
            out[0] = (if negative { Tag::IntNeg } else { Tag::IntPos }) as u8;
            return 1 + vlq::encode_into(magnitude, &mut out[1..]);
        }
        out[0] = (if negative { Tag::IntNeg32 } else { Tag::IntPos32 }) as u8;
        (&mut out[1..5]).put_u32_le(magnitude as u32);
        return 5;
    }
    if vlq_len < 8 {
        out[0] = (if negative { Tag::IntNeg } else { Tag::IntPos }) as u8;
        return 1 + vlq::encode_into(magnitude, &mut out[1..]);
    }
    out[0] = (if negative { Tag::IntNeg64 } else { Tag::IntPos64 }) as u8;
    (&mut out[1..9]).put_u64_le(magnitude);
    9
}
