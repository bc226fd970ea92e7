//! Transport state machine.
//!
//! Turns user intents (Play, Stop, Load) and engine status reports into button
//! enablement and start/stop/rewind commands for a [`TransportControl`]. Everything
//! here runs on the UI thread and never blocks.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::status::TransportStatus;

/// Where the transport is, from the UI's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Starting,
    Stopping,
    Playing,
}

impl TransportState {
    pub fn label(self) -> &'static str {
        match self {
            TransportState::Stopped => "Stopped",
            TransportState::Starting => "Starting",
            TransportState::Stopping => "Stopping",
            TransportState::Playing => "Playing",
        }
    }
}

/// Enabled flags of the three transport buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonStates {
    pub open: bool,
    pub play: bool,
    pub stop: bool,
}

impl Default for ButtonStates {
    fn default() -> Self {
        Self {
            open: true,
            play: true,
            stop: false,
        }
    }
}

/// Intents the state machine accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    /// A file was chosen in the Open dialog.
    Load(PathBuf),
    /// Play button clicked.
    Play,
    /// Stop button clicked.
    Stop,
    /// The engine reported whether it is actually playing.
    EngineStatus { playing: bool },
}

/// Engine operations driven by the state machine.
pub trait TransportControl {
    /// Install `path` as the playable source, halted at position 0.
    fn set_source(&mut self, path: &Path) -> Result<()>;
    fn start(&mut self);
    fn stop(&mut self);
    /// Move the play head to `seconds` from the start of the source.
    fn set_position(&mut self, seconds: f64);
    fn status(&self) -> TransportStatus;
}

/// Owns the transport state and the engine it drives.
pub struct TransportController<T> {
    state: TransportState,
    buttons: ButtonStates,
    transport: T,
}

impl<T: TransportControl> TransportController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            state: TransportState::Stopped,
            buttons: ButtonStates::default(),
            transport,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn buttons(&self) -> ButtonStates {
        self.buttons
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn status(&self) -> TransportStatus {
        self.transport.status()
    }

    /// Dispatch one intent. Never fails; a rejected load is only logged.
    pub fn handle(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Load(path) => {
                if let Err(e) = self.load(&path) {
                    tracing::debug!(path = ?path, "load failed: {e:#}");
                }
            }
            TransportCommand::Play => self.request_transition(TransportState::Starting),
            TransportCommand::Stop => self.request_transition(TransportState::Stopping),
            TransportCommand::EngineStatus { playing: true } => {
                self.request_transition(TransportState::Playing)
            }
            TransportCommand::EngineStatus { playing: false } => {
                self.request_transition(TransportState::Stopped)
            }
        }
    }

    /// Install `path` and force the transport back to Stopped.
    ///
    /// On error nothing changes: state, buttons and the previous source are kept.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.transport.set_source(path)?;
        tracing::info!(path = ?path, "file loaded");

        if matches!(
            self.state,
            TransportState::Starting | TransportState::Playing
        ) {
            self.request_transition(TransportState::Stopping);
        }
        self.request_transition(TransportState::Stopped);
        Ok(())
    }

    /// Move to `new_state` and apply its side effects; repeated requests are no-ops.
    pub fn request_transition(&mut self, new_state: TransportState) {
        if new_state == self.state {
            return;
        }
        tracing::debug!(from = self.state.label(), to = new_state.label(), "transport state");
        self.state = new_state;

        match new_state {
            TransportState::Stopped => {
                self.buttons.play = true;
                self.transport.set_position(0.0);
            }
            TransportState::Starting => {
                self.buttons.stop = true;
                self.buttons.play = false;
                self.transport.start();
            }
            TransportState::Stopping => {
                self.buttons.play = true;
                self.buttons.stop = false;
                self.transport.stop();
            }
            TransportState::Playing => {
                self.buttons.stop = true;
                self.buttons.play = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        SetSource(PathBuf),
        Start,
        Stop,
        SetPosition(f64),
    }

    #[derive(Default)]
    struct FakeTransport {
        calls: Vec<Call>,
        fail_loads: bool,
        position: f64,
        loaded: Option<PathBuf>,
    }

    impl TransportControl for FakeTransport {
        fn set_source(&mut self, path: &Path) -> Result<()> {
            if self.fail_loads {
                return Err(anyhow!("unsupported file"));
            }
            self.calls.push(Call::SetSource(path.to_path_buf()));
            self.loaded = Some(path.to_path_buf());
            self.position = 0.0;
            Ok(())
        }

        fn start(&mut self) {
            self.calls.push(Call::Start);
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn set_position(&mut self, seconds: f64) {
            self.calls.push(Call::SetPosition(seconds));
            self.position = seconds;
        }

        fn status(&self) -> TransportStatus {
            TransportStatus {
                path: self.loaded.clone(),
                position_ms: (self.position * 1000.0) as u64,
                ..TransportStatus::default()
            }
        }
    }

    const ALL_STATES: [TransportState; 4] = [
        TransportState::Stopped,
        TransportState::Starting,
        TransportState::Stopping,
        TransportState::Playing,
    ];

    fn controller() -> TransportController<FakeTransport> {
        TransportController::new(FakeTransport::default())
    }

    fn controller_in(state: TransportState) -> TransportController<FakeTransport> {
        let mut c = controller();
        c.state = state;
        c
    }

    fn calls(c: &TransportController<FakeTransport>) -> &[Call] {
        &c.transport().calls
    }

    #[test]
    fn starts_stopped_with_play_enabled() {
        let c = controller();
        assert_eq!(c.state(), TransportState::Stopped);
        assert_eq!(
            c.buttons(),
            ButtonStates {
                open: true,
                play: true,
                stop: false
            }
        );
        assert!(calls(&c).is_empty());
    }

    #[test]
    fn repeated_transition_is_a_no_op() {
        for state in ALL_STATES {
            let mut c = controller_in(state);
            let buttons = c.buttons();
            c.request_transition(state);
            assert_eq!(c.state(), state);
            assert_eq!(c.buttons(), buttons, "buttons changed for {state:?}");
            assert!(calls(&c).is_empty(), "command issued for {state:?}");
        }
    }

    #[test]
    fn starting_from_stopped_issues_one_start() {
        let mut c = controller();
        c.request_transition(TransportState::Starting);

        assert_eq!(calls(&c), &[Call::Start]);
        assert!(!c.buttons().play);
        assert!(c.buttons().stop);
    }

    #[test]
    fn stopping_from_starting_or_playing_issues_one_stop() {
        for from in [TransportState::Starting, TransportState::Playing] {
            let mut c = controller_in(from);
            c.request_transition(TransportState::Stopping);

            assert_eq!(calls(&c), &[Call::Stop], "from {from:?}");
            assert!(c.buttons().play);
            assert!(!c.buttons().stop);
        }
    }

    #[test]
    fn stopped_rewinds_and_enables_play() {
        let mut c = controller_in(TransportState::Playing);
        c.buttons.play = false;
        c.request_transition(TransportState::Stopped);

        assert_eq!(calls(&c), &[Call::SetPosition(0.0)]);
        assert!(c.buttons().play);
    }

    #[test]
    fn playing_only_touches_buttons() {
        let mut c = controller_in(TransportState::Starting);
        c.request_transition(TransportState::Playing);

        assert!(calls(&c).is_empty());
        assert!(c.buttons().stop);
        assert!(!c.buttons().play);
    }

    #[test]
    fn open_button_is_never_disabled() {
        let mut c = controller();
        for state in ALL_STATES.iter().chain(ALL_STATES.iter()) {
            c.request_transition(*state);
            assert!(c.buttons().open);
        }
    }

    #[test]
    fn engine_status_overrides_last_ui_request() {
        let mut c = controller();
        c.handle(TransportCommand::Stop);
        c.handle(TransportCommand::EngineStatus { playing: true });
        assert_eq!(c.state(), TransportState::Playing);

        c.handle(TransportCommand::Play);
        assert_eq!(c.state(), TransportState::Starting);
        c.handle(TransportCommand::EngineStatus { playing: false });
        assert_eq!(c.state(), TransportState::Stopped);
    }

    #[test]
    fn load_while_playing_forces_stopped() {
        let mut c = controller();
        c.handle(TransportCommand::Load(PathBuf::from("a.wav")));
        c.handle(TransportCommand::Play);
        c.handle(TransportCommand::EngineStatus { playing: true });
        c.transport.calls.clear();

        c.handle(TransportCommand::Load(PathBuf::from("b.mp3")));

        assert_eq!(c.state(), TransportState::Stopped);
        assert!(c.buttons().play);
        assert!(!c.buttons().stop);
        assert_eq!(
            calls(&c),
            &[
                Call::SetSource(PathBuf::from("b.mp3")),
                Call::Stop,
                Call::SetPosition(0.0),
            ]
        );
        assert_eq!(c.status().position_ms, 0);
    }

    #[test]
    fn load_from_any_state_ends_stopped_at_zero() {
        for from in ALL_STATES {
            let mut c = controller_in(from);
            c.transport.position = 12.5;
            c.load(Path::new("track.wav")).unwrap();

            assert_eq!(c.state(), TransportState::Stopped, "from {from:?}");
            assert!(c.buttons().play);
            assert_eq!(c.status().position_ms, 0);
        }
    }

    #[test]
    fn failed_load_changes_nothing() {
        let mut c = controller();
        c.handle(TransportCommand::Load(PathBuf::from("a.wav")));
        c.handle(TransportCommand::Play);
        c.handle(TransportCommand::EngineStatus { playing: true });
        c.transport.calls.clear();
        c.transport.fail_loads = true;

        assert!(c.load(Path::new("broken.wav")).is_err());
        c.handle(TransportCommand::Load(PathBuf::from("broken.wav")));

        assert_eq!(c.state(), TransportState::Playing);
        assert!(!c.buttons().play);
        assert!(c.buttons().stop);
        assert!(calls(&c).is_empty());
        assert_eq!(c.status().path, Some(PathBuf::from("a.wav")));
    }

    #[test]
    fn open_play_stop_scenario() {
        let mut c = controller();
        assert_eq!(c.state(), TransportState::Stopped);
        assert!(c.buttons().play && !c.buttons().stop);

        c.handle(TransportCommand::Load(PathBuf::from("track.wav")));
        assert_eq!(c.state(), TransportState::Stopped);
        assert_eq!(c.status().position_ms, 0);

        c.handle(TransportCommand::Play);
        assert_eq!(c.state(), TransportState::Starting);
        c.handle(TransportCommand::EngineStatus { playing: true });
        assert_eq!(c.state(), TransportState::Playing);
        assert!(c.buttons().stop && !c.buttons().play);

        c.handle(TransportCommand::Stop);
        assert_eq!(c.state(), TransportState::Stopping);
        c.handle(TransportCommand::EngineStatus { playing: false });
        assert_eq!(c.state(), TransportState::Stopped);
        assert!(c.buttons().play && !c.buttons().stop);

        assert_eq!(
            calls(&c),
            &[
                Call::SetSource(PathBuf::from("track.wav")),
                Call::Start,
                Call::Stop,
                Call::SetPosition(0.0),
            ]
        );
    }
}
