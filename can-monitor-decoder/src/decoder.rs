//! Main decoder API
//!
//! The Decoder struct is the entry point for the library: it loads layout
//! resources into the layout database and decodes live frames against it.

use crate::layouts::{DatabaseStats, LayoutDatabase};
use crate::types::{CanFrame, DecodedMessage, DecoderError, Result};
use std::path::Path;

/// The main decoder - owns the layout database, decodes one frame at a time
pub struct Decoder {
    layout_db: LayoutDatabase,
}

impl Decoder {
    /// Create a new decoder instance with an empty layout database
    pub fn new() -> Self {
        Self {
            layout_db: LayoutDatabase::new(),
        }
    }

    /// Load a layout resource and add its definitions to the database
    ///
    /// The format is chosen by file extension: `.json` for the monitor's
    /// JSON layout database, `.dbc` for a Vector DBC file.
    pub fn add_layout_file(&mut self, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let messages = match extension.as_deref() {
            Some("json") => crate::layouts::json::parse_layout_file(path)?,
            Some("dbc") => crate::layouts::dbc::parse_dbc_file(path)?,
            _ => {
                return Err(DecoderError::UnsupportedFormat(format!(
                    "{:?} (expected .json or .dbc)",
                    path
                )))
            }
        };

        for message in messages {
            self.layout_db.add_message(message);
        }

        log::info!("Layout resource loaded: {:?}", path);
        Ok(())
    }

    /// Decode a single frame
    ///
    /// This is a total function: a frame whose id is unknown, whose payload
    /// length does not match the declared layout length, or whose
    /// multiplexer selector resolves to no sub-layout yields the
    /// unrecognized result instead of an error, so the monitor still shows
    /// the raw traffic.
    pub fn decode(&self, frame: &CanFrame) -> DecodedMessage {
        let Some(layout) = self.layout_db.get_message(frame.can_id) else {
            log::trace!("Unknown CAN ID 0x{:X}", frame.can_id);
            return DecodedMessage::unrecognized(frame);
        };

        if frame.data.len() != layout.length {
            log::debug!(
                "Message '{}' (ID 0x{:X}): payload is {} bytes, layout declares {}",
                layout.name,
                frame.can_id,
                frame.data.len(),
                layout.length
            );
            return DecodedMessage::unrecognized(frame);
        }

        match crate::extract::decode_message(&frame.data, layout) {
            Some(signals) => DecodedMessage {
                id: frame.can_id,
                name: Some(layout.name.clone()),
                raw: frame.data.clone(),
                signals,
                timestamp: frame.timestamp,
            },
            None => DecodedMessage::unrecognized(frame),
        }
    }

    /// Get statistics about the loaded layout database
    pub fn database_stats(&self) -> DatabaseStats {
        self.layout_db.stats()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalValue;
    use chrono::Utc;
    use std::io::Write;

    fn frame(can_id: u32, data: &[u8]) -> CanFrame {
        CanFrame {
            timestamp: Utc::now(),
            can_id,
            data: data.to_vec(),
            is_extended: false,
        }
    }

    fn decoder_with_speed_layout() -> Decoder {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        file.write_all(
            br#"{
                "messages": {
                    "256": {
                        "name": "Engine",
                        "length": 8,
                        "signals": [
                            { "name": "Speed", "start_bit": 0, "length": 8,
                              "factor": 0.1, "unit": "km/h" }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        file.flush().unwrap();

        let mut decoder = Decoder::new();
        decoder.add_layout_file(file.path()).unwrap();
        decoder
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::new();
        let stats = decoder.database_stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
    }

    #[test]
    fn test_unsupported_layout_format() {
        let mut decoder = Decoder::new();
        let result = decoder.add_layout_file(Path::new("layout.txt"));
        assert!(matches!(result, Err(DecoderError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_decode_known_frame() {
        let decoder = decoder_with_speed_layout();

        let decoded = decoder.decode(&frame(0x100, &[100, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(decoded.name, Some("Engine".to_string()));
        assert_eq!(decoded.signals.len(), 1);
        assert_eq!(decoded.signals[0].name, "Speed");
        assert_eq!(decoded.signals[0].value, SignalValue::Float(10.0));
        assert_eq!(decoded.signals[0].unit, Some("km/h".to_string()));
    }

    #[test]
    fn test_decode_unknown_id() {
        let decoder = decoder_with_speed_layout();

        let decoded = decoder.decode(&frame(0x7FF, &[1, 2, 3]));
        assert!(decoded.is_unrecognized());
        assert_eq!(decoded.id, 0x7FF);
        assert_eq!(decoded.raw, vec![1, 2, 3]);
        assert!(decoded.signals.is_empty());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let decoder = decoder_with_speed_layout();

        // Layout declares 8 bytes; a 2-byte frame is structurally incompatible
        let decoded = decoder.decode(&frame(0x100, &[100, 0]));
        assert!(decoded.is_unrecognized());
        assert_eq!(decoded.raw, vec![100, 0]);
    }
}
