//! Shared test harness: an event-capturing handler, chunked feed drivers,
//! and an event replay encoder for round-trip checks.
#![allow(dead_code)]

use cbe::{Date, DecodeError, Decoder, EncodeError, Encoder, Handler, Sign, Time, Timestamp, Timezone};
use ordered_float::OrderedFloat;

/// Owned flavor of [`Timezone`] so captured events outlive the feed
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Zone {
    Utc,
    Named(String),
    Coordinates { latitude: i32, longitude: i32 },
}

impl From<Timezone<'_>> for Zone {
    fn from(timezone: Timezone<'_>) -> Self {
        match timezone {
            Timezone::Utc => Zone::Utc,
            Timezone::Named(name) => Zone::Named(name.to_owned()),
            Timezone::Coordinates {
                latitude,
                longitude,
            } => Zone::Coordinates {
                latitude,
                longitude,
            },
        }
    }
}

impl Zone {
    pub fn as_timezone(&self) -> Timezone<'_> {
        match self {
            Zone::Utc => Timezone::Utc,
            Zone::Named(name) => Timezone::Named(name),
            Zone::Coordinates {
                latitude,
                longitude,
            } => Timezone::Coordinates {
                latitude: *latitude,
                longitude: *longitude,
            },
        }
    }
}

/// One decoded document event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Nil,
    Boolean(bool),
    Integer(Sign, u64),
    Float(OrderedFloat<f64>),
    DecimalFloat(OrderedFloat<f64>),
    Date {
        year: i32,
        month: u8,
        day: u8,
    },
    Time {
        hour: u8,
        minute: u8,
        second: u8,
        nanosecond: u32,
        zone: Zone,
    },
    Timestamp {
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        nanosecond: u32,
        zone: Zone,
    },
    ListBegin,
    UnorderedMapBegin,
    OrderedMapBegin,
    MetadataMapBegin,
    ContainerEnd,
    StringBegin(u64),
    BytesBegin(u64),
    UriBegin(u64),
    CommentBegin(u64),
    ArrayData(Vec<u8>),
}

/// Records every event; optionally returns `false` on the n-th one.
#[derive(Debug, Default)]
pub struct Capture {
    pub events: Vec<Event>,
    stop_at: Option<usize>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_at(index: usize) -> Self {
        Self {
            events: Vec::new(),
            stop_at: Some(index),
        }
    }

    fn push(&mut self, event: Event) -> bool {
        self.events.push(event);
        self.stop_at != Some(self.events.len() - 1)
    }
}

impl Handler for Capture {
    fn on_nil(&mut self) -> bool {
        self.push(Event::Nil)
    }

    fn on_boolean(&mut self, value: bool) -> bool {
        self.push(Event::Boolean(value))
    }

    fn on_integer(&mut self, sign: Sign, magnitude: u64) -> bool {
        self.push(Event::Integer(sign, magnitude))
    }

    fn on_float(&mut self, value: f64) -> bool {
        self.push(Event::Float(OrderedFloat(value)))
    }

    fn on_decimal_float(&mut self, value: f64) -> bool {
        self.push(Event::DecimalFloat(OrderedFloat(value)))
    }

    fn on_date(&mut self, date: Date) -> bool {
        self.push(Event::Date {
            year: date.year,
            month: date.month,
            day: date.day,
        })
    }

    fn on_time(&mut self, time: Time<'_>) -> bool {
        self.push(Event::Time {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            nanosecond: time.nanosecond,
            zone: time.timezone.into(),
        })
    }

    fn on_timestamp(&mut self, timestamp: Timestamp<'_>) -> bool {
        self.push(Event::Timestamp {
            year: timestamp.date.year,
            month: timestamp.date.month,
            day: timestamp.date.day,
            hour: timestamp.time.hour,
            minute: timestamp.time.minute,
            second: timestamp.time.second,
            nanosecond: timestamp.time.nanosecond,
            zone: timestamp.time.timezone.into(),
        })
    }

    fn on_list_begin(&mut self) -> bool {
        self.push(Event::ListBegin)
    }

    fn on_unordered_map_begin(&mut self) -> bool {
        self.push(Event::UnorderedMapBegin)
    }

    fn on_ordered_map_begin(&mut self) -> bool {
        self.push(Event::OrderedMapBegin)
    }

    fn on_metadata_map_begin(&mut self) -> bool {
        self.push(Event::MetadataMapBegin)
    }

    fn on_container_end(&mut self) -> bool {
        self.push(Event::ContainerEnd)
    }

    fn on_string_begin(&mut self, byte_count: u64) -> bool {
        self.push(Event::StringBegin(byte_count))
    }

    fn on_bytes_begin(&mut self, byte_count: u64) -> bool {
        self.push(Event::BytesBegin(byte_count))
    }

    fn on_uri_begin(&mut self, byte_count: u64) -> bool {
        self.push(Event::UriBegin(byte_count))
    }

    fn on_comment_begin(&mut self, byte_count: u64) -> bool {
        self.push(Event::CommentBegin(byte_count))
    }

    fn on_array_data(&mut self, fragment: &[u8]) -> bool {
        self.push(Event::ArrayData(fragment.to_vec()))
    }
}

/// Encode one document into a roomy buffer and validate `end`.
pub fn encode_document(
    build: impl FnOnce(&mut Encoder<'_>) -> Result<(), EncodeError>,
) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = vec![0u8; 4096];
    let mut encoder = Encoder::new(&mut buffer, 9);
    build(&mut encoder)?;
    let bytes = encoder.written().to_vec();
    encoder.end()?;
    Ok(bytes)
}

/// Decode one document in a single feed, returning its events.
pub fn decode_document(document: &[u8]) -> Result<Vec<Event>, DecodeError> {
    let mut decoder = Decoder::new(Capture::new(), 9);
    decoder.feed(document)?;
    decoder.end()?;
    Ok(decoder.into_handler().events)
}

/// Decode expecting success.
pub fn decode_events(document: &[u8]) -> Vec<Event> {
    decode_document(document).unwrap()
}

/// Decode expecting failure, returning the error.
pub fn decode_error(document: &[u8]) -> DecodeError {
    decode_document(document).unwrap_err()
}

/// Decode by feeding windows of at most `chunk` bytes, retaining
/// unconsumed tails exactly as a streaming caller would.
pub fn decode_in_chunks(document: &[u8], chunk: usize) -> Result<Vec<Event>, DecodeError> {
    assert!(chunk > 0);
    let mut decoder = Decoder::new(Capture::new(), 9);
    let mut consumed = 0usize;
    let mut upto = 0usize;
    while consumed < document.len() {
        upto = (upto.max(consumed) + chunk).min(document.len());
        let before = decoder.stream_offset();
        match decoder.feed(&document[consumed..upto]) {
            Ok(()) => {}
            Err(DecodeError::NeedMoreData) if upto < document.len() => {}
            Err(other) => return Err(other),
        }
        consumed += (decoder.stream_offset() - before) as usize;
    }
    decoder.end()?;
    Ok(decoder.into_handler().events)
}

/// Replay captured events through an encoder, reproducing a document.
pub fn encode_events(events: &[Event]) -> Result<Vec<u8>, EncodeError> {
    encode_document(|encoder| {
        for event in events {
            match event {
                Event::Nil => encoder.add_nil()?,
                Event::Boolean(value) => encoder.add_boolean(*value)?,
                Event::Integer(sign, magnitude) => encoder.add_integer(*sign, *magnitude)?,
                Event::Float(value) => encoder.add_float(value.0, 0)?,
                Event::DecimalFloat(value) => encoder.add_decimal_float(value.0, 0)?,
                Event::Date { year, month, day } => {
                    encoder.add_date(Date::new(*year, *month, *day))?
                }
                Event::Time {
                    hour,
                    minute,
                    second,
                    nanosecond,
                    zone,
                } => encoder.add_time(Time::new(
                    *hour,
                    *minute,
                    *second,
                    *nanosecond,
                    zone.as_timezone(),
                ))?,
                Event::Timestamp {
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                    nanosecond,
                    zone,
                } => encoder.add_timestamp(Timestamp::new(
                    Date::new(*year, *month, *day),
                    Time::new(*hour, *minute, *second, *nanosecond, zone.as_timezone()),
                ))?,
                Event::ListBegin => encoder.list_begin()?,
                Event::UnorderedMapBegin => encoder.unordered_map_begin()?,
                Event::OrderedMapBegin => encoder.ordered_map_begin()?,
                Event::MetadataMapBegin => encoder.metadata_map_begin()?,
                Event::ContainerEnd => encoder.container_end()?,
                Event::StringBegin(byte_count) => encoder.string_begin(*byte_count)?,
                Event::BytesBegin(byte_count) => encoder.bytes_begin(*byte_count)?,
                Event::UriBegin(byte_count) => encoder.uri_begin(*byte_count)?,
                Event::CommentBegin(byte_count) => encoder.comment_begin(*byte_count)?,
                Event::ArrayData(data) => {
                    assert_eq!(encoder.add_data(data)?, data.len());
                }
            }
        }
        Ok(())
    })
}

/// Merge adjacent payload fragments so event sequences compare across
/// different feed partitions.
pub fn coalesced(events: &[Event]) -> Vec<Event> {
    let mut merged: Vec<Event> = Vec::new();
    for event in events {
        match (merged.last_mut(), event) {
            (Some(Event::ArrayData(head)), Event::ArrayData(tail)) => {
                head.extend_from_slice(tail);
            }
            _ => merged.push(event.clone()),
        }
    }
    merged
}
