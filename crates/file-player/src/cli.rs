use std::path::PathBuf;

use clap::Parser;
use player_engine::PlaybackConfig;

#[derive(Parser, Debug)]
#[command(name = "file-player", version)]
pub struct Args {
    /// Audio file to load at start-up (WAV, MP3 or AIFF)
    pub path: Option<PathBuf>,

    /// Directory the Open dialog starts in
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Print the available output devices, then exit
    #[arg(long)]
    pub list_devices: bool,

    /// Output device to open (case-insensitive substring of its name)
    #[arg(long)]
    pub device: Option<String>,

    /// Frames fed to the resampler per step when the file rate differs from the device
    #[arg(long, default_value_t = 1024)]
    pub chunk_frames: usize,

    /// Most frames the output callback takes from the queue in one refill
    #[arg(long, default_value_t = 4096)]
    pub refill_max_frames: usize,

    /// Seconds of audio each stage queue holds ahead of the device
    #[arg(long, default_value_t = 2.0)]
    pub buffer_seconds: f32,
}

impl Args {
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            chunk_frames: self.chunk_frames,
            refill_max_frames: self.refill_max_frames,
            buffer_seconds: self.buffer_seconds,
        }
    }
}
