//! Collaborators of the monitor: decoding, parsing and the tracking sink.
//!
//! This module provides:
//! - Records and typed field values
//! - Character decoding to UTF-8
//! - CSV and JSON record parsers behind the `RecordParser` trait
//! - A channel-backed `TrackingSink` with delivery reports

mod csv_parser;
mod decoder;
mod json_parser;
mod parser;
mod record;
mod sink;

pub use csv_parser::CsvParser;
pub use decoder::{skip_utf8_bom, Decoder, Encoding};
pub use json_parser::JsonParser;
pub use parser::{build_parser, ParserConfig, RecordParser, DEFAULT_RECORD_NAME};
pub use record::{FieldValue, Record};
pub use sink::{
    tracking_channel, BatchReceiver, ChannelSink, DeliveryId, DeliveryInfo, DeliveryReceiver,
    TrackedBatch, TrackingSink,
};
