//! CAN Monitor Decoder Library
//!
//! A stateless, reusable library for decoding live CAN frames with signal
//! layouts loaded from JSON layout files or Vector DBC files.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Loads message layouts into an in-memory database at startup
//! - Decodes one frame at a time into named, typed signal values
//! - Handles multiplexed signals, enum substitution and byte-order variants
//!
//! The library does NOT:
//! - Open the bus or perform any live I/O
//! - Keep per-message state (latest value, deltas, counts)
//! - Render anything
//!
//! All of that lives in the application layer (can-monitor-tui).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_monitor_decoder::{CanFrame, Decoder};
//! use std::path::Path;
//!
//! let mut decoder = Decoder::new();
//! decoder.add_layout_file(Path::new("vehicle.json")).unwrap();
//!
//! let frame = CanFrame {
//!     timestamp: chrono::Utc::now(),
//!     can_id: 0x100,
//!     data: vec![100, 0, 0, 0, 0, 0, 0, 0],
//!     is_extended: false,
//! };
//!
//! let decoded = decoder.decode(&frame);
//! for signal in &decoded.signals {
//!     println!("{} = {}", signal.name, signal.value);
//! }
//! ```

// Public modules
pub mod decoder;
pub mod types;

// Re-export main types for convenience
pub use decoder::Decoder;
pub use layouts::DatabaseStats;
pub use types::{
    CanFrame, DecodedMessage, DecodedSignal, DecoderError, Result, SignalValue, Timestamp,
};

// Internal modules (not exposed in public API)
mod extract;
mod layouts;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
