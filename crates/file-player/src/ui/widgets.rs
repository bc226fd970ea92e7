use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, Paragraph};

pub(crate) fn modal_block(title: &str) -> Block<'_> {
    Block::default().title(title).borders(Borders::ALL)
}

/// A bordered, centred label; the focused button gets a thick bold border.
pub(crate) fn button(label: &str, style: Style, focused: bool) -> Paragraph<'_> {
    let mut block = Block::default().borders(Borders::ALL).border_style(style);
    if focused {
        block = block
            .border_type(BorderType::Thick)
            .border_style(style.add_modifier(Modifier::BOLD));
    }
    Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(block)
}

pub(crate) fn list_panel<'a>(title: &'a str, items: Vec<ListItem<'a>>) -> List<'a> {
    List::new(items)
        .block(modal_block(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ")
}
