//! Playback engine for `file-player`.
//!
//! - [`state`]: the Stopped/Starting/Stopping/Playing transport state machine
//! - [`transport`]: CPAL output stream plus the installed file source
//! - decode → (resample) → output stages connected by bounded [`queue`]s

pub mod config;
pub mod decode;
pub mod device;
pub mod formats;
mod output;
mod pipeline;
pub mod queue;
pub mod resample;
pub mod state;
pub mod status;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::PlaybackConfig;
pub use state::{ButtonStates, TransportCommand, TransportControl, TransportController, TransportState};
pub use status::TransportStatus;
pub use transport::{AudioTransport, TransportEvent};
