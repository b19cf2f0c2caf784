//! Core types for the CAN monitor decoder library
//!
//! This module defines the types the decoder emits when processing live
//! frames. The decoder is stateless and only produces decoded values - the
//! latest-state bookkeeping lives in the application layer.

use chrono::{DateTime, Utc};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Raw CAN frame as received from the bus
///
/// This represents a single CAN frame as delivered by the frame source,
/// before any signal decoding or message interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame {
    /// Receive timestamp, stamped by the frame source
    pub timestamp: Timestamp,
    /// CAN message ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes for classic CAN)
    pub data: Vec<u8>,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
}

impl CanFrame {
    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Errors that can occur while loading layout resources
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to parse layout file: {0}")]
    LayoutParseError(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Unsupported layout format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The result of decoding one frame
///
/// `name == None` (and an empty signal list) is the "unrecognized" outcome:
/// the frame's id is not in the layout database, or its payload does not
/// structurally match the stored layout. Unrecognized frames are an
/// expected, recoverable result - the monitor still displays them as raw
/// bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// CAN message ID
    pub id: u32,
    /// Message name from the layout database (None if unrecognized)
    pub name: Option<String>,
    /// Raw payload bytes, always carried through
    pub raw: Vec<u8>,
    /// Decoded signals in layout-declared order (empty if unrecognized)
    pub signals: Vec<DecodedSignal>,
    /// Receive timestamp of the underlying frame
    pub timestamp: Timestamp,
}

impl DecodedMessage {
    /// Build the unrecognized result for a frame
    pub fn unrecognized(frame: &CanFrame) -> Self {
        Self {
            id: frame.can_id,
            name: None,
            raw: frame.data.clone(),
            signals: Vec::new(),
            timestamp: frame.timestamp,
        }
    }

    /// True if the frame's id/payload did not match any layout
    pub fn is_unrecognized(&self) -> bool {
        self.name.is_none()
    }
}

/// A decoded signal with its current value
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Signal name from the layout
    pub name: String,
    /// Decoded value (numeric, or the enum label when one matches)
    pub value: SignalValue,
    /// Engineering unit (e.g., "km/h", "mV")
    pub unit: Option<String>,
    /// Raw value before scaling (useful for debugging)
    pub raw: i64,
}

/// Signal value types produced by the decoder
///
/// A signal decodes to an integer when its layout carries no scaling, to a
/// float once factor/offset are applied, and to the enum label when the
/// layout's enum table has an entry for the integer-truncated value.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Signed integer value (unscaled signals)
    Integer(i64),
    /// Floating-point value (after scaling/offset)
    Float(f64),
    /// Enum label substituted from the layout's value table
    Enumerated(String),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.2}", v),
            SignalValue::Enumerated(s) => write!(f, "{}", s),
        }
    }
}

impl SignalValue {
    /// Convert to f64 where the value is numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Integer(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Enumerated(_) => None,
        }
    }
}
