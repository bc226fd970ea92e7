use player_engine::{TransportControl, TransportStatus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use super::app::{App, Button};
use super::widgets;

/// Button panel size in terminal cells.
pub(crate) const PANEL_WIDTH: u16 = 30;
pub(crate) const PANEL_HEIGHT: u16 = 15;
const STATUS_HEIGHT: u16 = 6;

pub(crate) fn draw<T: TransportControl>(f: &mut ratatui::Frame, app: &mut App<T>) {
    let area = f.area();
    let panel = panel_rect(area);

    let frame_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", app.controller.state().label()));
    f.render_widget(frame_block, panel);

    for button in Button::ALL {
        let rect = clip(button_rect(panel, button), panel);
        let focused = app.focus == button;
        let enabled = app.is_enabled(button);
        f.render_widget(
            widgets::button(button.label(), button_style(button, enabled), focused),
            rect,
        );
    }

    let status_area = Rect {
        x: panel.x,
        y: panel.bottom(),
        width: area.right().saturating_sub(panel.x),
        height: STATUS_HEIGHT.min(area.bottom().saturating_sub(panel.bottom())),
    };
    let status = app.controller.status();
    let lines: Vec<Line> = status_lines(app.controller.state().label(), &status)
        .into_iter()
        .map(Line::from)
        .collect();
    f.render_widget(Paragraph::new(lines), status_area);

    if let Some(chooser) = app.chooser.as_mut() {
        let area = centered_rect(80, 80, area);
        f.render_widget(Clear, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let items: Vec<ListItem> = if chooser.entries.is_empty() {
            vec![ListItem::new("<empty>")]
        } else {
            chooser
                .entries
                .iter()
                .map(|e| ListItem::new(e.label()))
                .collect()
        };
        let title = chooser.title();
        let list = widgets::list_panel(&title, items);
        f.render_stateful_widget(list, chunks[0], &mut chooser.list_state);

        let footer = match chooser.error.as_deref() {
            Some(err) => format!("error: {err}"),
            None => format!("{}  (Enter open, ← up, Esc cancel)", chooser.dir.display()),
        };
        f.render_widget(Paragraph::new(Line::from(footer)), chunks[1]);
    }

    if app.logs_open {
        let area = centered_rect(90, 80, f.area());
        f.render_widget(Clear, area);
        let block = widgets::modal_block("Logs (Esc to close, ↑/↓ scroll)");
        let inner = block.inner(area);
        let height = inner.height as usize;
        let total = app.logs.len();
        let end = total.saturating_sub(app.logs_scroll);
        let start = end.saturating_sub(height);
        let mut items = Vec::new();
        for line in app.logs.iter().skip(start).take(end.saturating_sub(start)) {
            items.push(ListItem::new(line.clone()));
        }
        if items.is_empty() {
            items.push(ListItem::new("<no logs>"));
        }
        f.render_widget(List::new(items).block(block), area);
    }
}

/// Fixed-size panel centred in `area`, shrunk when the terminal is smaller.
pub(crate) fn panel_rect(area: Rect) -> Rect {
    let width = PANEL_WIDTH.min(area.width);
    let height = PANEL_HEIGHT.min(area.height);
    let below = STATUS_HEIGHT.min(area.height.saturating_sub(height));
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height - below) / 2,
        width,
        height,
    }
}

/// Position of `button` relative to the panel's top-left corner.
pub(crate) fn button_rect(panel: Rect, button: Button) -> Rect {
    let y = match button {
        Button::Open => 1,
        Button::Play => 5,
        Button::Stop => 9,
    };
    Rect {
        x: panel.x + 1,
        y: panel.y + y,
        width: 28,
        height: 3,
    }
}

fn clip(rect: Rect, bounds: Rect) -> Rect {
    rect.intersection(bounds)
}

fn button_style(button: Button, enabled: bool) -> Style {
    if !enabled {
        return Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM);
    }
    match button {
        Button::Open => Style::default(),
        Button::Play => Style::default().fg(Color::Green),
        Button::Stop => Style::default().fg(Color::Red),
    }
}

pub(crate) fn status_lines(state: &str, status: &TransportStatus) -> Vec<String> {
    let file = status.file_name().unwrap_or("-");
    let time = match status.duration_ms() {
        Some(total) if total > 0 => format!(
            "{} / {}",
            format_duration_ms(status.position_ms),
            format_duration_ms(total)
        ),
        _ => format_duration_ms(status.position_ms),
    };
    let out = &status.output;
    let output = if out.sample_rate > 0 {
        format!("{} Hz {}ch {}", out.sample_rate, out.channels, out.sample_format)
    } else {
        "-".to_string()
    };
    let format = match status.source.as_ref() {
        Some(src) => {
            let mut s = src.codec.clone().unwrap_or_else(|| "-".to_string());
            if let Some(bits) = src.bit_depth {
                s.push_str(&format!(" {bits}b"));
            }
            s.push_str(&format!(" {} Hz {}ch -> {output}", src.sample_rate, src.channels));
            if status.resampling() {
                s.push_str(" (rs)");
            }
            s
        }
        None => format!("- -> {output}"),
    };

    let mut lines = vec![
        format!(
            "state: {state} (audio {})",
            if status.playing { "running" } else { "idle" }
        ),
        format!("file: {file}"),
        format!("time: {time}"),
        format!("format: {format}"),
    ];
    if status.underrun_events > 0 {
        lines.push(format!("underruns: {}", status.underrun_events));
    }
    lines.push("keys: o open | p play | s stop | l logs | q quit".to_string());
    lines
}

fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_engine::decode::SourceInfo;
    use player_engine::status::OutputInfo;
    use std::path::PathBuf;

    #[test]
    fn panel_is_centred_above_status_lines() {
        let panel = panel_rect(Rect::new(0, 0, 80, 40));
        assert_eq!((panel.width, panel.height), (PANEL_WIDTH, PANEL_HEIGHT));
        assert_eq!(panel.x, 25);
        assert_eq!(panel.y, (40 - 15 - STATUS_HEIGHT) / 2);
    }

    #[test]
    fn panel_shrinks_in_small_terminals() {
        let panel = panel_rect(Rect::new(0, 0, 20, 10));
        assert_eq!(panel, Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn buttons_are_stacked_with_fixed_margins() {
        let panel = Rect::new(10, 5, PANEL_WIDTH, PANEL_HEIGHT);
        assert_eq!(button_rect(panel, Button::Open), Rect::new(11, 6, 28, 3));
        assert_eq!(button_rect(panel, Button::Play), Rect::new(11, 10, 28, 3));
        assert_eq!(button_rect(panel, Button::Stop), Rect::new(11, 14, 28, 3));
        for b in Button::ALL {
            assert!(panel.contains(button_rect(panel, b).as_position()));
        }
    }

    #[test]
    fn disabled_buttons_are_dimmed() {
        assert_eq!(button_style(Button::Play, true).fg, Some(Color::Green));
        assert_eq!(button_style(Button::Stop, true).fg, Some(Color::Red));
        let dim = button_style(Button::Play, false);
        assert!(dim.add_modifier.contains(Modifier::DIM));
    }

    #[test]
    fn status_lines_without_source() {
        let lines = status_lines("Stopped", &TransportStatus::default());
        assert_eq!(lines[0], "state: Stopped (audio idle)");
        assert_eq!(lines[1], "file: -");
        assert_eq!(lines[2], "time: 0:00");
        assert_eq!(lines[3], "format: - -> -");
    }

    #[test]
    fn status_lines_with_resampled_source() {
        let status = TransportStatus {
            path: Some(PathBuf::from("/music/track.mp3")),
            playing: true,
            position_ms: 75_000,
            source: Some(SourceInfo {
                codec: Some("MP3".to_string()),
                sample_rate: 44_100,
                channels: 2,
                duration_ms: Some(200_000),
                ..SourceInfo::default()
            }),
            output: OutputInfo {
                sample_rate: 48_000,
                channels: 2,
                sample_format: "f32".to_string(),
                ..OutputInfo::default()
            },
            underrun_events: 3,
        };
        let lines = status_lines("Playing", &status);
        assert_eq!(lines[0], "state: Playing (audio running)");
        assert_eq!(lines[1], "file: track.mp3");
        assert_eq!(lines[2], "time: 1:15 / 3:20");
        assert_eq!(lines[3], "format: MP3 44100 Hz 2ch -> 48000 Hz 2ch f32 (rs)");
        assert_eq!(lines[4], "underruns: 3");
    }
}
