//! Live state table
//!
//! The shared table mapping each message id to the latest decoded record
//! for that id. The ingestion thread is the only writer; the render loop
//! reads whole-table snapshots. One coarse mutex guards the entire table,
//! so a snapshot is always a consistent cut with no row mid-update.

use can_monitor_decoder::{DecodedMessage, DecodedSignal, Timestamp};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Latest decoded state for one message id
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// CAN message ID
    pub id: u32,
    /// Message name (None if the id is unknown to the layout database)
    pub name: Option<String>,
    /// Latest raw payload bytes
    pub data: Vec<u8>,
    /// Latest decoded signals (empty if unrecognized)
    pub signals: Vec<DecodedSignal>,
    /// When the first frame for this id was seen
    pub first_seen: Timestamp,
    /// When the most recent frame for this id was seen
    pub last_seen: Timestamp,
    /// Milliseconds between the two most recent frames
    pub delta_ms: f64,
    /// How many frames with this id have been seen
    pub count: u64,
}

/// The live state table: id -> latest record, ascending id iteration
///
/// The BTreeMap keeps render order (ascending numeric id) independent of
/// insertion order. Entries are never removed during a run.
pub struct LiveTable {
    inner: Mutex<BTreeMap<u32, MessageRecord>>,
}

impl LiveTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Apply one decoded frame to the table
    ///
    /// First frame for an id inserts a fresh record; subsequent frames
    /// overwrite payload and signals together, recompute the delta from the
    /// previous arrival and bump the count. Runs entirely under the table
    /// lock so readers never observe a partially-updated record.
    pub fn apply(&self, decoded: DecodedMessage) {
        let mut table = self.lock();
        let ts = decoded.timestamp;

        match table.get_mut(&decoded.id) {
            Some(record) => {
                record.name = decoded.name;
                record.data = decoded.raw;
                record.signals = decoded.signals;
                record.delta_ms = delta_ms(record.last_seen, ts);
                record.last_seen = ts;
                record.count += 1;
            }
            None => {
                table.insert(
                    decoded.id,
                    MessageRecord {
                        id: decoded.id,
                        name: decoded.name,
                        data: decoded.raw,
                        signals: decoded.signals,
                        first_seen: ts,
                        last_seen: ts,
                        delta_ms: 0.0,
                        count: 1,
                    },
                );
            }
        }
    }

    /// Clone the whole table, in ascending id order
    ///
    /// Taken under the same lock the writer uses, so the snapshot is a
    /// consistent point-in-time view.
    pub fn snapshot(&self) -> Vec<MessageRecord> {
        self.lock().values().cloned().collect()
    }

    /// Number of distinct ids seen so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, MessageRecord>> {
        // A panicking writer cannot leave a torn record behind (plain data,
        // replaced wholesale), so a poisoned lock is safe to keep using.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LiveTable {
    fn default() -> Self {
        Self::new()
    }
}

fn delta_ms(previous: Timestamp, current: Timestamp) -> f64 {
    let micros = (current - previous).num_microseconds().unwrap_or(0);
    micros as f64 / 1000.0
}

/// The fixed column header above the table body
pub fn header_lines() -> [&'static str; 2] {
    [
        "  ID   |               Name               |                Data / Value                |  Count  |     Time      | Delta (ms)",
        "-------|----------------------------------|--------------------------------------------|---------|---------------|-----------",
    ]
}

impl MessageRecord {
    /// Format the record as one fixed-width table row
    pub fn row(&self) -> String {
        format!(
            "{:<6} | {:<32} | {:<42} | {:>7} | {:.2} | {:>8.2}",
            format!("0x{:x}", self.id),
            self.name.as_deref().unwrap_or(""),
            hex_bytes(&self.data),
            self.count,
            epoch_seconds(self.last_seen),
            self.delta_ms,
        )
    }
}

/// Format one decoded signal as its table line
pub fn signal_row(signal: &DecodedSignal) -> String {
    format!(
        " [sig] | {:<32} | {:<33} {:>8} |",
        signal.name,
        signal.value.to_string(),
        signal.unit.as_deref().unwrap_or(""),
    )
}

/// Upper-case space-separated hex byte pairs, e.g. "DE AD BE EF"
pub fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn epoch_seconds(ts: Timestamp) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}
