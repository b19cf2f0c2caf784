//! Ingestion loop
//!
//! Pulls frames from the bus source forever: receive, decode, apply to the
//! live table. Runs on its own thread so the blocking receive never stalls
//! the render cadence. A transport failure ends the loop and is published
//! to the fault slot for the render loop to pick up; the thread is
//! abandoned at process exit, never joined.

use crate::bus::FrameSource;
use crate::state::LiveTable;
use anyhow::Result;
use can_monitor_decoder::Decoder;
use std::sync::{Arc, OnceLock};
use std::thread;

/// Spawn the ingestion thread
pub fn spawn(
    source: Box<dyn FrameSource>,
    decoder: Decoder,
    table: Arc<LiveTable>,
    fault: Arc<OnceLock<String>>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("can-ingest".to_string())
        .spawn(move || {
            let mut source = source;
            if let Err(e) = run(source.as_mut(), &decoder, &table) {
                log::error!("Ingestion stopped: {:#}", e);
                let _ = fault.set(format!("{:#}", e));
            }
        })
}

/// The loop body: blocking receive, decode, apply - repeated indefinitely
///
/// Decode never fails (unknown frames become unrecognized records); the
/// only way out is a transport error.
fn run(source: &mut dyn FrameSource, decoder: &Decoder, table: &LiveTable) -> Result<()> {
    loop {
        let frame = source.receive()?;
        let decoded = decoder.decode(&frame);
        log::trace!(
            "Frame 0x{:X}: {} signals",
            decoded.id,
            decoded.signals.len()
        );
        table.apply(decoded);
    }
}
