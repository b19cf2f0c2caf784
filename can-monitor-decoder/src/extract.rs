//! Signal extraction engine
//!
//! Extracts signal values from raw CAN frames based on signal layouts from
//! the layout database. Handles bit extraction, endianness, multiplexing,
//! physical value conversion and enum substitution.

use crate::layouts::database::{ByteOrder, MessageLayout, SignalLayout, ValueType};
use crate::types::{DecodedSignal, SignalValue};

/// Decode all signals of a frame against its message layout
///
/// Returns the decoded signals in layout-declared order, or `None` when the
/// frame is structurally incompatible with the layout: the message is
/// multiplexed and the selector signal is missing, cannot be extracted, or
/// carries a value no sub-layout matches. Individual signals that do not
/// fit the payload are omitted, not errors.
pub fn decode_message(data: &[u8], layout: &MessageLayout) -> Option<Vec<DecodedSignal>> {
    let mut multiplexer_value: Option<u64> = None;

    // For multiplexed messages, resolve the selector first; an unresolvable
    // selector makes the whole frame undecodable.
    if layout.is_multiplexed {
        let mux_name = layout.multiplexer_signal.as_deref()?;
        let mux_signal = layout.signals.iter().find(|s| s.name == mux_name)?;
        let value = extract_signal_value(data, mux_signal)? as u64;

        let has_matching_group = layout.signals.iter().any(|s| {
            s.multiplexer_info
                .as_ref()
                .is_some_and(|info| info.multiplexer_values.contains(&value))
        });
        if !has_matching_group {
            log::debug!(
                "Message '{}': multiplexer value {} matches no signal group",
                layout.name,
                value
            );
            return None;
        }
        multiplexer_value = Some(value);
    }

    let mut decoded_signals = Vec::new();

    for signal in &layout.signals {
        // Skip multiplexed signals whose group is not selected
        if let Some(ref info) = signal.multiplexer_info {
            match multiplexer_value {
                Some(current) if info.multiplexer_values.contains(&current) => {}
                _ => continue,
            }
        }

        if let Some(decoded) = decode_signal(data, signal) {
            decoded_signals.push(decoded);
        }
    }

    Some(decoded_signals)
}

/// Decode a single signal from CAN frame data
fn decode_signal(data: &[u8], signal: &SignalLayout) -> Option<DecodedSignal> {
    let raw_value = extract_signal_value(data, signal)?;

    // Apply physical value conversion (factor and offset)
    let physical_value = signal.offset + signal.factor * (raw_value as f64);

    // Enum lookup uses the integer-truncated physical value
    let enum_label = signal
        .enums
        .as_ref()
        .and_then(|table| table.get(&(physical_value.trunc() as i64)))
        .cloned();

    let value = if let Some(label) = enum_label {
        SignalValue::Enumerated(label)
    } else if signal.factor != 1.0 || signal.offset != 0.0 {
        // Scaled signal - use float
        SignalValue::Float(physical_value)
    } else {
        // Integer signal (no scaling)
        SignalValue::Integer(raw_value)
    };

    Some(DecodedSignal {
        name: signal.name.clone(),
        value,
        unit: signal.unit.clone(),
        raw: raw_value,
    })
}

/// Extract the raw signal value from CAN frame data
///
/// Handles bit extraction with proper endianness support.
/// This is the core signal extraction algorithm.
fn extract_signal_value(data: &[u8], signal: &SignalLayout) -> Option<i64> {
    let start_bit = signal.start_bit as usize;
    let length = signal.length as usize;

    // Validate signal fits within data
    let required_bytes = (start_bit + length + 7) / 8;
    if length == 0 || required_bytes > data.len() {
        log::debug!(
            "Signal '{}' requires {} bytes but frame only has {} bytes",
            signal.name,
            required_bytes,
            data.len()
        );
        return None;
    }

    // Extract raw bits based on byte order
    let raw_value = match signal.byte_order {
        ByteOrder::LittleEndian => extract_little_endian(data, start_bit, length),
        ByteOrder::BigEndian => extract_big_endian(data, start_bit, length),
    };

    // Apply sign extension if needed
    let signed_value = match signal.value_type {
        ValueType::Unsigned => raw_value as i64,
        ValueType::Signed => sign_extend(raw_value, length),
    };

    Some(signed_value)
}

/// Extract signal with little-endian (Intel) byte order
///
/// Little-endian format:
/// - Start bit points to the LSB (least significant bit)
/// - Bits are numbered from LSB to MSB within each byte
/// - Byte 0 is the first byte in the CAN frame
fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = bit_pos % 8;

        if byte_idx < data.len() {
            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << i;
        }
    }

    result
}

/// Extract signal with big-endian (Motorola) byte order
///
/// Big-endian format in CAN:
/// - Start bit points to the MSB (most significant bit) of the signal
/// - Bit numbering: bit 0 = MSB of byte 0, bit 7 = LSB of byte 0
/// - Signal grows downward (towards higher bit numbers)
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = 7 - (bit_pos % 8); // Bit 0 = MSB, bit 7 = LSB

        if byte_idx < data.len() {
            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << (length - 1 - i);
        }
    }

    result
}

/// Sign-extend a value from N bits to 64 bits
///
/// If the value's MSB is 1, fill the upper bits with 1s.
/// This converts unsigned representation to proper signed value.
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        // Negative value - sign extend
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        // Positive value
        value as i64
    }
}
