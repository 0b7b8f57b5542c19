use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;

use crate::modules::manage::{FormField, FormKind, FormState, ManageState, Mode, StatusLevel};

pub fn draw(f: &mut Frame, state: &ManageState, store_label: &str) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, state, store_label);
    draw_list_panel(f, areas.list, state);
    draw_detail_panel(f, areas.details, state);
    draw_status_line(f, areas.status_line, state);
    draw_command_line(f, areas.command_line, state);

    match state.mode() {
        Mode::Browse => {}
        Mode::Form(form) => draw_form_popup(f, areas.size, form),
        Mode::ConfirmDelete { key } => draw_confirm_popup(f, areas.size, state, key),
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &ManageState, store_label: &str) {
    let line = Line::from(vec![
        Span::styled(
            "addrlabel ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("store ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{store_label}  ")),
        Span::styled("entries ", Style::default().fg(Color::DarkGray)),
        Span::raw(state.entries().len().to_string()),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_list_panel(f: &mut Frame, area: Rect, state: &ManageState) {
    let items: Vec<ListItem> = if state.entries().is_empty() {
        vec![ListItem::new(Span::styled(
            "No nicknames yet. Press a to add one.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        state
            .entries()
            .iter()
            .map(|entry| {
                let family = entry.family.map(|family| family.title()).unwrap_or("?");
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<24} ", entry.nickname)),
                    Span::styled(entry.short_key(), Style::default().fg(Color::Gray)),
                    Span::styled(format!("  {family}"), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Nicknames")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    let mut list_state = ListState::default();
    if !state.entries().is_empty() {
        list_state.select(Some(state.selected()));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_detail_panel(f: &mut Frame, area: Rect, state: &ManageState) {
    let lines = match state.selected_entry() {
        Some(entry) => vec![
            detail_line("Nickname", &entry.nickname),
            detail_line(
                "Family",
                entry.family.map(|family| family.title()).unwrap_or("unknown"),
            ),
            Line::from(""),
            Line::from(Span::styled("Key", Style::default().fg(Color::DarkGray))),
            Line::from(entry.key.as_str()),
        ],
        None => vec![Line::from(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn detail_line<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn draw_status_line(f: &mut Frame, area: Rect, state: &ManageState) {
    let line = match state.status_text() {
        Some((text, level)) => {
            let color = match level {
                StatusLevel::Info => Color::LightGreen,
                StatusLevel::Warn => Color::LightYellow,
                StatusLevel::Error => Color::LightRed,
            };
            Line::from(vec![
                Span::styled("msg: ", Style::default().fg(Color::DarkGray)),
                Span::styled(text, Style::default().fg(color)),
            ])
        }
        None => Line::from(""),
    };
    let paragraph = Paragraph::new(line)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn draw_command_line(f: &mut Frame, area: Rect, state: &ManageState) {
    let hints = match state.mode() {
        Mode::Browse => "j/k move  a add  e/Enter edit  y copy  d delete  r reload  q quit",
        Mode::Form(_) => "Tab switch field  Enter save  Esc cancel",
        Mode::ConfirmDelete { .. } => "y confirm  n/Esc cancel",
    };
    let paragraph = Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    f.render_widget(paragraph, area);
}

fn draw_form_popup(f: &mut Frame, area: Rect, form: &FormState) {
    let popup_area = centered_rect(64, 30, area);
    f.render_widget(Clear, popup_area);

    let title = match form.kind {
        FormKind::Add => "Add nickname",
        FormKind::Edit { .. } => "Edit nickname",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::LightCyan));
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let editable_address = matches!(form.kind, FormKind::Add);
    draw_field(
        f,
        rows[0],
        "Address",
        &form.address,
        form.field == FormField::Address,
        editable_address,
    );
    draw_field(
        f,
        rows[1],
        "Nickname",
        &form.nickname,
        form.field == FormField::Nickname,
        true,
    );
}

fn draw_field(f: &mut Frame, area: Rect, title: &str, value: &str, focused: bool, editable: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let text_style = if editable {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if focused { "_" } else { "" };
    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(value, text_style),
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style),
    );
    f.render_widget(paragraph, area);
}

fn draw_confirm_popup(f: &mut Frame, area: Rect, state: &ManageState, key: &str) {
    let popup_area = centered_rect(56, 20, area);
    f.render_widget(Clear, popup_area);

    let nickname = state
        .entries()
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| entry.nickname.as_str())
        .unwrap_or("");
    let lines = vec![
        Line::from(format!("Delete \"{nickname}\"?")),
        Line::from(Span::styled(key, Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            "Labels already on open pages stay until reload.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "y = delete, n / Esc = keep",
            Style::default().fg(Color::LightYellow),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm delete")
                .border_style(Style::default().fg(Color::LightRed)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup_area);
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

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::store::NicknameMap;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_list_shows_nicknames_and_short_keys() {
        let mut state = ManageState::new();
        state.load(
            &NicknameMap::from([(
                "0xab5801a7d398351b8be11c439e05c5b3259aec9b".to_string(),
                "Alice".to_string(),
            )]),
            None,
        );

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| draw(f, &state, "memory")).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Alice"));
        assert!(text.contains("0xab58..ec9b"));
        assert!(text.contains("EVM"));
    }

    #[test]
    fn test_confirm_popup_names_the_entry() {
        let mut state = ManageState::new();
        state.load(
            &NicknameMap::from([(
                "0xab5801a7d398351b8be11c439e05c5b3259aec9b".to_string(),
                "Alice".to_string(),
            )]),
            None,
        );
        state.request_delete();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &state, "memory")).unwrap();
        assert!(buffer_text(&terminal).contains("Confirm delete"));
    }

    #[test]
    fn test_centered_rect_is_inside_parent() {
        let parent = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 50, parent);
        assert!(popup.x >= parent.x && popup.right() <= parent.right());
        assert!(popup.y >= parent.y && popup.bottom() <= parent.bottom());
    }
}
