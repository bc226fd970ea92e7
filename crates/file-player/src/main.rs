//! `file-player`: a minimal terminal audio-file player.
//!
//! One window, three buttons:
//! - **Open**: pick a WAV, MP3 or AIFF file; loading always leaves the transport stopped
//!   at the start of the file.
//! - **Play** / **Stop**: drive the transport state machine in `player_engine::state`.
//!
//! Audio runs on a CPAL output stream opened once at start-up; the decode and resample
//! stages feed it through bounded queues.

mod cli;
mod logging;
mod ui;

use anyhow::Result;
use clap::Parser;
use player_engine::device::{self, ChannelLayout, RecordPermission};
use player_engine::{AudioTransport, TransportCommand, TransportController};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let host = cpal::default_host();

    if args.list_devices {
        device::list_devices(&host)?;
        return Ok(());
    }

    let log_rx = logging::init();

    let device = device::pick_device(&host, args.device.as_deref())?;
    // Desktop hosts never gate the output stream behind a record permission.
    let layout = ChannelLayout::for_permission(RecordPermission::NotRequired);
    let (transport, evt_rx) = AudioTransport::open(&device, layout, args.playback_config())?;

    let mut controller = TransportController::new(transport);
    if let Some(path) = args.path.clone() {
        controller.handle(TransportCommand::Load(path));
    }

    ui::run_tui(controller, evt_rx, log_rx, args.dir)
}
