//! JSON layout file parser
//!
//! Parses the monitor's layout resource (a JSON database generated from a
//! CAN definition, keyed by message id) and converts it into the internal
//! layout database format.
//!
//! Top-level shape:
//!
//! ```json
//! {
//!   "messages": {
//!     "256": {
//!       "name": "Engine",
//!       "length": 8,
//!       "signals": [
//!         { "name": "Speed", "start_bit": 0, "length": 8,
//!           "factor": 0.1, "unit": "km/h" }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Message keys are decimal id strings; `0x`-prefixed hex is also accepted.
//! Enum tables are objects keyed by the raw value as a base-10 string.

use crate::layouts::database::{
    ByteOrder, MessageLayout, MultiplexerInfo, SignalLayout, ValueType,
};
use crate::types::{DecoderError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Parse a JSON layout file and return message layouts
pub fn parse_layout_file(path: &Path) -> Result<Vec<MessageLayout>> {
    log::info!("Parsing layout file: {:?}", path);

    let content = std::fs::read_to_string(path).map_err(|e| {
        DecoderError::LayoutParseError(format!("Failed to read file {:?}: {}", path, e))
    })?;

    let raw: RawLayoutFile = serde_json::from_str(&content).map_err(|e| {
        DecoderError::LayoutParseError(format!("Failed to parse layout file {:?}: {}", path, e))
    })?;

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.json")
        .to_string();

    let mut messages = Vec::new();
    for (id_key, raw_msg) in raw.messages {
        let id = parse_id_key(&id_key)?;
        messages.push(convert_message(id, raw_msg, &source)?);
    }

    log::info!("Parsed {} messages from {:?}", messages.len(), path);

    Ok(messages)
}

/// On-disk message entry
#[derive(Debug, Deserialize)]
struct RawLayoutFile {
    messages: HashMap<String, RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    name: String,
    length: usize,
    /// Name of the multiplexer signal, when the message is multiplexed
    #[serde(default)]
    multiplexer: Option<String>,
    #[serde(default)]
    signals: Vec<RawSignal>,
}

#[derive(Debug, Deserialize)]
struct RawSignal {
    name: String,
    start_bit: u16,
    length: u16,
    #[serde(default)]
    byte_order: RawByteOrder,
    #[serde(default)]
    signed: bool,
    #[serde(default = "default_factor")]
    factor: f64,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    unit: Option<String>,
    /// Enum table keyed by the raw value as a base-10 string
    #[serde(default)]
    enums: Option<HashMap<String, String>>,
    /// Multiplexer values for which this signal is active
    #[serde(default)]
    mux_values: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

fn default_factor() -> f64 {
    1.0
}

/// Parse a message id key: decimal, or hex with a `0x` prefix
fn parse_id_key(key: &str) -> Result<u32> {
    let parsed = if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        key.parse::<u32>()
    };
    parsed.map_err(|_| {
        DecoderError::LayoutParseError(format!("Invalid message id key '{}'", key))
    })
}

/// Convert a raw message entry to a MessageLayout
fn convert_message(id: u32, raw: RawMessage, source: &str) -> Result<MessageLayout> {
    let is_multiplexed = raw.multiplexer.is_some();

    let mut signals = Vec::with_capacity(raw.signals.len());
    for raw_sig in raw.signals {
        signals.push(convert_signal(raw_sig, raw.multiplexer.as_deref())?);
    }

    Ok(MessageLayout {
        id,
        name: raw.name,
        length: raw.length,
        signals,
        is_multiplexed,
        multiplexer_signal: raw.multiplexer,
        source: source.to_string(),
    })
}

/// Convert a raw signal entry to a SignalLayout
fn convert_signal(raw: RawSignal, multiplexer_signal: Option<&str>) -> Result<SignalLayout> {
    let byte_order = match raw.byte_order {
        RawByteOrder::LittleEndian => ByteOrder::LittleEndian,
        RawByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = if raw.signed {
        ValueType::Signed
    } else {
        ValueType::Unsigned
    };

    // Enum keys arrive as base-10 strings; reject anything unparseable at
    // load time rather than silently dropping entries during decode.
    let enums = match raw.enums {
        Some(table) => {
            let mut converted = HashMap::with_capacity(table.len());
            for (key, label) in table {
                let value = key.parse::<i64>().map_err(|_| {
                    DecoderError::InvalidSignalDefinition(format!(
                        "Signal '{}': enum key '{}' is not an integer",
                        raw.name, key
                    ))
                })?;
                converted.insert(value, label);
            }
            Some(converted)
        }
        None => None,
    };

    let multiplexer_info = match raw.mux_values {
        Some(values) => Some(MultiplexerInfo {
            multiplexer_signal: multiplexer_signal
                .ok_or_else(|| {
                    DecoderError::InvalidSignalDefinition(format!(
                        "Multiplexed signal '{}' but message declares no multiplexer",
                        raw.name
                    ))
                })?
                .to_string(),
            multiplexer_values: values,
        }),
        None => None,
    };

    Ok(SignalLayout {
        name: raw.name,
        start_bit: raw.start_bit,
        length: raw.length,
        byte_order,
        value_type,
        factor: raw.factor,
        offset: raw.offset,
        unit: raw.unit,
        enums,
        multiplexer_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_layout(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_simple_layout() {
        let file = write_layout(
            r#"{
                "messages": {
                    "256": {
                        "name": "Engine",
                        "length": 8,
                        "signals": [
                            { "name": "Speed", "start_bit": 0, "length": 8,
                              "factor": 0.1, "unit": "km/h" },
                            { "name": "Temp", "start_bit": 8, "length": 8,
                              "signed": true, "offset": -40.0, "unit": "C" }
                        ]
                    }
                }
            }"#,
        );

        let messages = parse_layout_file(file.path()).unwrap();
        assert_eq!(messages.len(), 1);

        let msg = &messages[0];
        assert_eq!(msg.id, 256);
        assert_eq!(msg.name, "Engine");
        assert_eq!(msg.length, 8);
        assert!(!msg.is_multiplexed);
        assert_eq!(msg.signals.len(), 2);

        let speed = &msg.signals[0];
        assert_eq!(speed.name, "Speed");
        assert_eq!(speed.start_bit, 0);
        assert_eq!(speed.length, 8);
        assert_eq!(speed.byte_order, ByteOrder::LittleEndian);
        assert_eq!(speed.value_type, ValueType::Unsigned);
        assert_eq!(speed.factor, 0.1);
        assert_eq!(speed.unit, Some("km/h".to_string()));

        let temp = &msg.signals[1];
        assert_eq!(temp.value_type, ValueType::Signed);
        assert_eq!(temp.offset, -40.0);
    }

    #[test]
    fn test_parse_hex_id_key() {
        let file = write_layout(
            r#"{
                "messages": {
                    "0x100": { "name": "Engine", "length": 8, "signals": [] }
                }
            }"#,
        );

        let messages = parse_layout_file(file.path()).unwrap();
        assert_eq!(messages[0].id, 0x100);
    }

    #[test]
    fn test_parse_enums() {
        let file = write_layout(
            r#"{
                "messages": {
                    "512": {
                        "name": "Status",
                        "length": 1,
                        "signals": [
                            { "name": "Ignition", "start_bit": 0, "length": 2,
                              "enums": { "0": "OFF", "1": "ON" } }
                        ]
                    }
                }
            }"#,
        );

        let messages = parse_layout_file(file.path()).unwrap();
        let enums = messages[0].signals[0].enums.as_ref().unwrap();
        assert_eq!(enums.get(&0), Some(&"OFF".to_string()));
        assert_eq!(enums.get(&1), Some(&"ON".to_string()));
    }

    #[test]
    fn test_parse_multiplexed() {
        let file = write_layout(
            r#"{
                "messages": {
                    "512": {
                        "name": "MuxMsg",
                        "length": 8,
                        "multiplexer": "Mode",
                        "signals": [
                            { "name": "Mode", "start_bit": 0, "length": 8 },
                            { "name": "SignalA", "start_bit": 8, "length": 16,
                              "mux_values": [0] },
                            { "name": "SignalB", "start_bit": 8, "length": 16,
                              "mux_values": [1] }
                        ]
                    }
                }
            }"#,
        );

        let messages = parse_layout_file(file.path()).unwrap();
        let msg = &messages[0];
        assert!(msg.is_multiplexed);
        assert_eq!(msg.multiplexer_signal, Some("Mode".to_string()));

        let sig_a = msg.signals.iter().find(|s| s.name == "SignalA").unwrap();
        let info = sig_a.multiplexer_info.as_ref().unwrap();
        assert_eq!(info.multiplexer_signal, "Mode");
        assert_eq!(info.multiplexer_values, vec![0]);
    }

    #[test]
    fn test_reject_bad_enum_key() {
        let file = write_layout(
            r#"{
                "messages": {
                    "512": {
                        "name": "Status",
                        "length": 1,
                        "signals": [
                            { "name": "Ignition", "start_bit": 0, "length": 2,
                              "enums": { "on": "ON" } }
                        ]
                    }
                }
            }"#,
        );

        let err = parse_layout_file(file.path()).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidSignalDefinition(_)));
    }

    #[test]
    fn test_reject_mux_signal_without_multiplexer() {
        let file = write_layout(
            r#"{
                "messages": {
                    "512": {
                        "name": "MuxMsg",
                        "length": 8,
                        "signals": [
                            { "name": "SignalA", "start_bit": 8, "length": 16,
                              "mux_values": [0] }
                        ]
                    }
                }
            }"#,
        );

        let err = parse_layout_file(file.path()).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidSignalDefinition(_)));
    }

    #[test]
    fn test_reject_bad_id_key() {
        let file = write_layout(
            r#"{ "messages": { "engine": { "name": "E", "length": 8 } } }"#,
        );

        let err = parse_layout_file(file.path()).unwrap_err();
        assert!(matches!(err, DecoderError::LayoutParseError(_)));
    }
}
