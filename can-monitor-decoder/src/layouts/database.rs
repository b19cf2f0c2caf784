//! Message layout database
//!
//! Combines layout definitions from JSON layout files and DBC files into a
//! single queryable database. The database is loaded once at startup and is
//! read-only for the process lifetime.

use std::collections::HashMap;

/// A complete CAN message layout
#[derive(Debug, Clone)]
pub struct MessageLayout {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Declared message size in bytes
    pub length: usize,
    /// All signals in this message, in declared order
    pub signals: Vec<SignalLayout>,
    /// True if this message has multiplexed signals
    pub is_multiplexed: bool,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
    /// Source file (layout/DBC filename)
    pub source: String,
}

/// A CAN signal layout
#[derive(Debug, Clone)]
pub struct SignalLayout {
    /// Signal name
    pub name: String,
    /// Start bit in the CAN frame
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    /// Byte order for bit extraction
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Engineering unit (e.g., "km/h", "mV")
    pub unit: Option<String>,
    /// Enum table for labelled values (raw value -> display string)
    pub enums: Option<HashMap<i64, String>>,
    /// Multiplexer info (None if not multiplexed)
    pub multiplexer_info: Option<MultiplexerInfo>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
}

/// Multiplexer information for multiplexed signals
#[derive(Debug, Clone)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that controls this signal
    pub multiplexer_signal: String,
    /// Multiplexer value(s) for which this signal is active
    pub multiplexer_values: Vec<u64>,
}

/// The layout database: message id -> layout
pub struct LayoutDatabase {
    messages: HashMap<u32, MessageLayout>,
}

impl LayoutDatabase {
    /// Create a new empty layout database
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    /// Add a message layout to the database
    ///
    /// Duplicate ids keep the first definition; later ones are dropped with
    /// a warning so the operator can clean up the layout resources.
    pub fn add_message(&mut self, layout: MessageLayout) {
        if let Some(existing) = self.messages.get(&layout.id) {
            log::warn!(
                "Duplicate layout for CAN ID 0x{:X}: keeping '{}' from {}, ignoring '{}' from {}",
                layout.id,
                existing.name,
                existing.source,
                layout.name,
                layout.source
            );
            return;
        }
        self.messages.insert(layout.id, layout);
    }

    /// Look up the layout for a CAN ID
    pub fn get_message(&self, can_id: u32) -> Option<&MessageLayout> {
        self.messages.get(&can_id)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        let num_signals = self.messages.values().map(|m| m.signals.len()).sum();
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals,
        }
    }

    /// Get all known CAN IDs, ascending
    pub fn known_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.messages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for LayoutDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message layouts
    pub num_messages: usize,
    /// Total number of signal layouts
    pub num_signals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed_layout(id: u32, name: &str) -> MessageLayout {
        MessageLayout {
            id,
            name: name.to_string(),
            length: 8,
            signals: vec![SignalLayout {
                name: "Speed".to_string(),
                start_bit: 0,
                length: 16,
                byte_order: ByteOrder::LittleEndian,
                value_type: ValueType::Unsigned,
                factor: 1.0,
                offset: 0.0,
                unit: Some("km/h".to_string()),
                enums: None,
                multiplexer_info: None,
            }],
            is_multiplexed: false,
            multiplexer_signal: None,
            source: "test.json".to_string(),
        }
    }

    #[test]
    fn test_empty_database() {
        let db = LayoutDatabase::new();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
        assert!(db.get_message(0x123).is_none());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut db = LayoutDatabase::new();
        db.add_message(speed_layout(0x123, "VehicleData"));

        let stats = db.stats();
        assert_eq!(stats.num_messages, 1);
        assert_eq!(stats.num_signals, 1);

        let msg = db.get_message(0x123).unwrap();
        assert_eq!(msg.name, "VehicleData");
        assert_eq!(msg.signals[0].name, "Speed");
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let mut db = LayoutDatabase::new();
        db.add_message(speed_layout(0x123, "First"));
        db.add_message(speed_layout(0x123, "Second"));

        assert_eq!(db.stats().num_messages, 1);
        assert_eq!(db.get_message(0x123).unwrap().name, "First");
    }

    #[test]
    fn test_known_ids_sorted() {
        let mut db = LayoutDatabase::new();
        db.add_message(speed_layout(0x300, "C"));
        db.add_message(speed_layout(0x100, "A"));
        db.add_message(speed_layout(0x200, "B"));

        assert_eq!(db.known_ids(), vec![0x100, 0x200, 0x300]);
    }
}
