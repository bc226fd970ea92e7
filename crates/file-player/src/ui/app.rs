use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use player_engine::{TransportCommand, TransportControl, TransportController, TransportEvent};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::chooser::{ChooserOutcome, FileChooser};
use super::render;

const LOG_CAP: usize = 500;

/// The three transport buttons, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Button {
    Open,
    Play,
    Stop,
}

impl Button {
    pub(crate) const ALL: [Button; 3] = [Button::Open, Button::Play, Button::Stop];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Button::Open => "Open",
            Button::Play => "Play",
            Button::Stop => "Stop",
        }
    }

    fn next(self) -> Self {
        match self {
            Button::Open => Button::Play,
            Button::Play => Button::Stop,
            Button::Stop => Button::Open,
        }
    }

    fn prev(self) -> Self {
        match self {
            Button::Open => Button::Stop,
            Button::Play => Button::Open,
            Button::Stop => Button::Play,
        }
    }
}

/// Launch the TUI and drive it until the user quits.
pub(crate) fn run_tui<T: TransportControl>(
    controller: TransportController<T>,
    evt_rx: Receiver<TransportEvent>,
    log_rx: Receiver<String>,
    dir: PathBuf,
) -> Result<()> {
    let mut app = App::new(controller, evt_rx, log_rx, dir);

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);

    restore_terminal(&mut term)?;
    result
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App<T> {
    pub(crate) controller: TransportController<T>,
    pub(crate) focus: Button,
    pub(crate) chooser: Option<FileChooser>,
    /// Where the next Open dialog starts.
    pub(crate) browse_dir: PathBuf,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_open: bool,
    pub(crate) logs_scroll: usize,
    evt_rx: Receiver<TransportEvent>,
    log_rx: Receiver<String>,
}

impl<T: TransportControl> App<T> {
    pub(crate) fn new(
        controller: TransportController<T>,
        evt_rx: Receiver<TransportEvent>,
        log_rx: Receiver<String>,
        dir: PathBuf,
    ) -> Self {
        Self {
            controller,
            focus: Button::Open,
            chooser: None,
            browse_dir: dir,
            logs: VecDeque::new(),
            logs_open: false,
            logs_scroll: 0,
            evt_rx,
            log_rx,
        }
    }

    pub(crate) fn is_enabled(&self, button: Button) -> bool {
        let buttons = self.controller.buttons();
        match button {
            Button::Open => buttons.open,
            Button::Play => buttons.play,
            Button::Stop => buttons.stop,
        }
    }

    /// Click `button`; clicks on disabled buttons are ignored.
    pub(crate) fn press(&mut self, button: Button) {
        if !self.is_enabled(button) {
            return;
        }
        match button {
            Button::Open => self.chooser = Some(FileChooser::open(&self.browse_dir)),
            Button::Play => self.controller.handle(TransportCommand::Play),
            Button::Stop => self.controller.handle(TransportCommand::Stop),
        }
    }

    /// Forward engine notifications to the state machine.
    pub(crate) fn pump_engine_events(&mut self) {
        while let Ok(ev) = self.evt_rx.try_recv() {
            match ev {
                TransportEvent::StatusChanged { playing } => self
                    .controller
                    .handle(TransportCommand::EngineStatus { playing }),
            }
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn close_chooser(&mut self) {
        if let Some(chooser) = self.chooser.take() {
            self.browse_dir = chooser.dir;
        }
    }

    fn handle_chooser_key(&mut self, code: KeyCode) {
        let Some(chooser) = self.chooser.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.close_chooser(),
            KeyCode::Up => chooser.select_prev(),
            KeyCode::Down => chooser.select_next(),
            KeyCode::Left | KeyCode::Backspace => chooser.go_parent(),
            KeyCode::Enter => {
                if let ChooserOutcome::Chosen(path) = chooser.confirm() {
                    self.close_chooser();
                    self.controller.handle(TransportCommand::Load(path));
                }
            }
            _ => {}
        }
    }

    /// Apply one key press. Returns `true` when the user asked to quit.
    pub(crate) fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.chooser.is_some() {
            self.handle_chooser_key(code);
            return false;
        }
        if self.logs_open {
            match code {
                KeyCode::Char('q') => return true,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return false;
        }
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('o') => self.press(Button::Open),
            KeyCode::Char('p') | KeyCode::Char(' ') => self.press(Button::Play),
            KeyCode::Char('s') => self.press(Button::Stop),
            KeyCode::Down | KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::Up | KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter => self.press(self.focus),
            KeyCode::Char('l') => self.toggle_logs(),
            _ => {}
        }
        false
    }
}

fn ui_loop<T: TransportControl>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<T>,
) -> Result<()> {
    let tick = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    loop {
        app.pump_engine_events();
        app.drain_logs();
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                if k.kind == KeyEventKind::Press && app.handle_key(k.code) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
