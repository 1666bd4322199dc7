use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::state::{FocusPane, FormState, InputCursor};
use crate::store::NoteStore;

pub const ADD_LABEL: &str = "Add note";
pub const UPDATE_LABEL: &str = "Update note";

pub fn draw_app(
    frame: &mut Frame,
    store: &NoteStore,
    form: &FormState,
    list_state: &mut ListState,
    in_flight: usize,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[0]);

    draw_form(frame, store, form, columns[0]);
    draw_list(frame, store, form, list_state, columns[1]);

    if let Some(error) = store.error() {
        let line = Paragraph::new(Line::from(Span::styled(
            format!("! {error}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        frame.render_widget(line, vertical[1]);
    }

    let status = build_status_line(store, form, in_flight);
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Gray)),
        vertical[2],
    );
}

pub fn submit_label(store: &NoteStore) -> &'static str {
    if store.is_editing() {
        UPDATE_LABEL
    } else {
        ADD_LABEL
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn draw_form(frame: &mut Frame, store: &NoteStore, form: &FormState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    let draft = store.draft();
    let form_title = match store.editing_index() {
        Some(index) => format!("Title (editing #{})", index + 1),
        None => "Title".to_string(),
    };
    let title = Paragraph::new(draft.title.as_str()).block(
        Block::default()
            .title(form_title)
            .borders(Borders::ALL)
            .border_style(focus_style(form.focus == FocusPane::Title)),
    );
    frame.render_widget(title, rows[0]);

    let content = Paragraph::new(draft.content.as_str())
        .block(
            Block::default()
                .title("Content")
                .borders(Borders::ALL)
                .border_style(focus_style(form.focus == FocusPane::Content)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(content, rows[1]);

    let button_style = if form.focus == FocusPane::Submit {
        Style::default()
            .bg(Color::Blue)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let button = Paragraph::new(Line::from(Span::styled(
        format!("[ {} ]", submit_label(store)),
        button_style,
    )))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, rows[2]);

    let caret = match form.focus {
        FocusPane::Title => Some((&form.title, draft.title.as_str(), rows[0])),
        FocusPane::Content => Some((&form.content, draft.content.as_str(), rows[1])),
        _ => None,
    };
    if let Some((cursor, text, rect)) = caret {
        if let Some((x, y)) = caret_position(cursor, text, rect) {
            frame.set_cursor(x, y);
        }
    }
}

fn draw_list(
    frame: &mut Frame,
    store: &NoteStore,
    form: &FormState,
    list_state: &mut ListState,
    area: Rect,
) {
    let mut items = Vec::with_capacity(store.len());
    for (index, note) in store.notes().iter().enumerate() {
        let mut title_spans = Vec::new();
        if store.editing_index() == Some(index) {
            title_spans.push(Span::styled(
                "✎ ",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        title_spans.push(Span::styled(
            note.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        title_spans.push(Span::styled(
            format!("  #{}", note.id),
            Style::default().fg(Color::DarkGray),
        ));
        let mut lines = vec![Line::from(title_spans)];
        for line in note.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        items.push(ListItem::new(lines));
    }
    if items.is_empty() {
        items.push(ListItem::new("No notes yet. Fill in the form to add one."));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title("Notes")
                .borders(Borders::ALL)
                .border_style(focus_style(form.focus == FocusPane::List)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn build_status_line(store: &NoteStore, form: &FormState, in_flight: usize) -> Text<'static> {
    let focus = match form.focus {
        FocusPane::Title => "Title",
        FocusPane::Content => "Content",
        FocusPane::Submit => "Submit",
        FocusPane::List => "List",
    };
    let mode = if store.is_editing() { "edit" } else { "add" };

    let mut spans = vec![
        Span::raw(format!("Notes: {} ", store.len())),
        Span::raw(" | Focus: "),
        Span::styled(focus, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" | Mode: "),
        Span::styled(mode, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if in_flight > 0 {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("syncing ({in_flight})"),
            Style::default().fg(Color::Yellow),
        ));
    }

    let keys = Line::from(vec![
        Span::styled(
            "Keys: ",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "Tab focus • Ctrl-s submit • Esc cancel edit • j/k move • e edit • d delete • Ctrl-r reload • q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    Text::from(vec![Line::from(spans), keys])
}

fn caret_position(cursor: &InputCursor, text: &str, area: Rect) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let (row, col) = cursor.row_col(text);
    let row = (row as u16).min(inner_height - 1);
    let col = (col as u16).min(inner_width - 1);
    Some((area.x + 1 + col, area.y + 1 + row))
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::gateway::{GatewayError, Note};
    use crate::store::Outcome;

    fn render(store: &NoteStore, form: &FormState) -> String {
        let backend = TestBackend::new(100, 20);
        let mut terminal = Terminal::new(backend).expect("terminal");
        let mut list_state = ListState::default();
        terminal
            .draw(|frame| draw_app(frame, store, form, &mut list_state, 0))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn button_label_follows_edit_mode() {
        let mut store = NoteStore::default();
        store.apply(Outcome::Listed(Ok(vec![Note::new(1, "Groceries", "milk")])));
        let form = FormState::default();

        let screen = render(&store, &form);
        assert!(screen.contains(ADD_LABEL));
        assert!(screen.contains("Groceries"));

        store.begin_edit(0);
        let screen = render(&store, &form);
        assert!(screen.contains(UPDATE_LABEL));
        assert!(!screen.contains(ADD_LABEL));
    }

    #[test]
    fn error_line_only_when_error_set() {
        let mut store = NoteStore::default();
        let form = FormState::default();
        assert!(!render(&store, &form).contains("! "));

        store.apply(Outcome::Listed(Err(GatewayError::NotAList)));
        assert!(render(&store, &form).contains("! fetched data is not a list"));
    }

    #[test]
    fn caret_is_clamped_inside_the_box() {
        let area = Rect::new(0, 0, 6, 3);
        let mut cursor = InputCursor::default();
        cursor.jump_to_end("a long title");
        assert_eq!(caret_position(&cursor, "a long title", area), Some((4, 1)));
        assert_eq!(caret_position(&cursor, "x", Rect::new(0, 0, 2, 2)), None);
    }
}
