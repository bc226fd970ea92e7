//! Ratatui UI loop.
//!
//! Keys:
//! - o: Open (file chooser)
//! - p/Space: Play
//! - s: Stop
//! - Up/Down/Tab: move button focus
//! - Enter: click the focused button
//! - l: toggle logs
//! - q: quit
//!
//! In the chooser: Up/Down select, Enter descends or picks, Left/Backspace goes to
//! the parent, Esc cancels.

mod app;
mod chooser;
mod render;
mod widgets;

pub(crate) use app::run_tui;
