//! Bus frame source
//!
//! The monitor treats the bus as an abstract source of frames behind the
//! `FrameSource` trait, so the ingestion pipeline can be driven without
//! hardware. The real implementation opens a SocketCAN interface.

use anyhow::{Context, Result};
use can_monitor_decoder::CanFrame;
use chrono::Utc;
use socketcan::{CanSocket, EmbeddedFrame, Id, Socket};

/// A blocking source of CAN frames
///
/// `receive` blocks until the next frame arrives. An error is
/// transport-fatal: the ingestion loop does not retry.
pub trait FrameSource: Send {
    fn receive(&mut self) -> Result<CanFrame>;
}

/// Frame source backed by a SocketCAN interface (e.g. "can0", "vcan0")
pub struct SocketCanSource {
    socket: CanSocket,
    channel: String,
}

impl SocketCanSource {
    /// Open the named CAN channel
    pub fn open(channel: &str) -> Result<Self> {
        let socket = CanSocket::open(channel)
            .with_context(|| format!("Failed to open CAN channel '{}'", channel))?;
        log::info!("Opened CAN channel '{}'", channel);
        Ok(Self {
            socket,
            channel: channel.to_string(),
        })
    }
}

impl FrameSource for SocketCanSource {
    fn receive(&mut self) -> Result<CanFrame> {
        loop {
            let frame = self.socket.read_frame().with_context(|| {
                format!("Receive failed on CAN channel '{}'", self.channel)
            })?;

            match frame {
                socketcan::CanFrame::Data(data_frame) => {
                    return Ok(CanFrame {
                        timestamp: Utc::now(),
                        can_id: raw_id(data_frame.id()),
                        data: data_frame.data().to_vec(),
                        is_extended: data_frame.is_extended(),
                    });
                }
                // Remote and error frames carry no decodable payload
                socketcan::CanFrame::Remote(_) | socketcan::CanFrame::Error(_) => continue,
            }
        }
    }
}

/// Numeric arbitration id for standard and extended frames
fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}
