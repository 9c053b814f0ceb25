use crate::commands::Session;
use crate::controller::{local_today, Controller};
use crate::state::{Action, DayView, NoteRow, Outcome};
use crate::storage::KeyValueStore;
use anyhow::Result;
use chrono::Locale;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::info;

const EMPTY_DAY: &str = "No notes for this day yet.";
const DRAFT_PLACEHOLDER: &str = "Type your note here...";

pub fn run<S: KeyValueStore>(controller: Controller<S>, session: &Session) -> Result<()> {
    let store_label = format!(
        "{} {}",
        session.location.scope.label(),
        session.location.dir.display()
    );
    let mut terminal = setup_terminal()?;
    let mut app = App::new(
        controller,
        session.locale,
        session.config.confirm_delete,
        store_label,
    );
    info!(day = %app.controller.state().selected(), "tui started");
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App<S> {
    controller: Controller<S>,
    locale: Locale,
    confirm_delete: bool,
    store_label: String,
    selected_note: usize,
    list: ListState,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
    draft: InputField,
}

enum Mode {
    Normal,
    Composing,
    Editing(InputField),
    ConfirmDelete { position: usize },
    Alert { message: String, resume: Box<Mode> },
}

/// Multi-line text with a byte-offset cursor kept on a char boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
struct InputField {
    value: String,
    cursor: usize,
}

impl InputField {
    fn new(value: &str) -> Self {
        InputField {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some(ch) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn move_up(&mut self) {
        let start = self.line_start(self.cursor);
        if start == 0 {
            return;
        }
        let col = self.value[start..self.cursor].chars().count();
        let above = self.line_start(start - 1);
        self.cursor = self.index_at_col(above, col);
    }

    fn move_down(&mut self) {
        let start = self.line_start(self.cursor);
        let col = self.value[start..self.cursor].chars().count();
        if let Some(rel) = self.value[self.cursor..].find('\n') {
            self.cursor = self.index_at_col(self.cursor + rel + 1, col);
        }
    }

    fn backspace(&mut self) {
        let end = self.cursor;
        self.move_left();
        self.value.drain(self.cursor..end);
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert(self.cursor, '▌');
        text
    }

    fn line_start(&self, idx: usize) -> usize {
        self.value[..idx].rfind('\n').map_or(0, |i| i + 1)
    }

    fn index_at_col(&self, start: usize, col: usize) -> usize {
        let rest = &self.value[start..];
        let line = rest.find('\n').map_or(rest, |end| &rest[..end]);
        line.char_indices()
            .nth(col)
            .map_or(start + line.len(), |(idx, _)| start + idx)
    }
}

impl<S: KeyValueStore> App<S> {
    fn new(
        controller: Controller<S>,
        locale: Locale,
        confirm_delete: bool,
        store_label: String,
    ) -> Self {
        let draft = InputField::new(controller.state().draft());
        App {
            controller,
            locale,
            confirm_delete,
            status: format!("Notes from {}", store_label),
            store_label,
            selected_note: 0,
            list: ListState::default(),
            last_save: None,
            mode: Mode::Normal,
            draft,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let (next, quit) = match mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Composing => (self.handle_compose_key(key), false),
            Mode::Editing(field) => (self.handle_edit_key(field, key), false),
            Mode::ConfirmDelete { position } => (self.handle_confirm_key(position, key), false),
            Mode::Alert { message, resume } => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => (*resume, false),
                _ => (Mode::Alert { message, resume }, false),
            },
        };
        self.mode = next;
        quit
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> (Mode, bool) {
        let next = match key.code {
            KeyCode::Char('q') => return (Mode::Normal, true),
            KeyCode::Char('t') => self.navigate(Action::SelectDay(local_today())),
            KeyCode::Left | KeyCode::Char('h') => self.navigate(Action::PreviousDay),
            KeyCode::Right | KeyCode::Char('l') => self.navigate(Action::NextDay),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_note = self.selected_note.saturating_sub(1);
                Mode::Normal
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_note + 1 < self.day_len() {
                    self.selected_note += 1;
                }
                Mode::Normal
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.status = "Writing a note (Ctrl+S add, Esc leave)".into();
                Mode::Composing
            }
            KeyCode::Char('e') | KeyCode::Enter => self.start_edit(),
            KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
            _ => Mode::Normal,
        };
        (next, false)
    }

    fn handle_compose_key(&mut self, key: KeyEvent) -> Mode {
        if is_submit(&key) {
            return self.submit_draft();
        }
        if key.code == KeyCode::Esc {
            self.status = "Draft kept".into();
            return Mode::Normal;
        }
        if edit_field(&mut self.draft, key) {
            let text = self.draft.value.clone();
            if let Err(message) = self.apply(Action::SetDraft(text)) {
                return alert(message, Mode::Composing);
            }
        }
        Mode::Composing
    }

    fn handle_edit_key(&mut self, mut field: InputField, key: KeyEvent) -> Mode {
        if is_submit(&key) {
            return self.save_edit(field);
        }
        if key.code == KeyCode::Esc {
            return match self.apply(Action::CancelEdit) {
                Ok(_) => {
                    self.status = "Edit canceled".into();
                    Mode::Normal
                }
                Err(message) => alert(message, Mode::Normal),
            };
        }
        if edit_field(&mut field, key) {
            if let Err(message) = self.apply(Action::SetEditText(field.value.clone())) {
                return alert(message, Mode::Editing(field));
            }
        }
        Mode::Editing(field)
    }

    fn handle_confirm_key(&mut self, position: usize, key: KeyEvent) -> Mode {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.delete(position),
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                Mode::Normal
            }
            _ => Mode::ConfirmDelete { position },
        }
    }

    fn navigate(&mut self, action: Action) -> Mode {
        match self.apply(action) {
            Ok(_) => {
                self.selected_note = 0;
                self.list = ListState::default();
                self.status = format!("Showing {}", self.controller.state().selected());
                Mode::Normal
            }
            Err(message) => alert(message, Mode::Normal),
        }
    }

    fn submit_draft(&mut self) -> Mode {
        match self.apply(Action::AddNote) {
            Ok(_) => {
                self.selected_note = self.day_len().saturating_sub(1);
                self.status = "Note added".into();
                Mode::Normal
            }
            Err(message) => {
                let resume = if self.controller.state().draft().is_empty() {
                    Mode::Normal
                } else {
                    Mode::Composing
                };
                alert(message, resume)
            }
        }
    }

    fn start_edit(&mut self) -> Mode {
        if self.day_len() == 0 {
            self.status = "No note selected to edit".into();
            return Mode::Normal;
        }
        let position = self.selected_note;
        match self.apply(Action::StartEdit(position)) {
            Ok(_) => {
                let field = InputField::new(
                    self.controller
                        .state()
                        .edit_buffer()
                        .map(|edit| edit.text.as_str())
                        .unwrap_or_default(),
                );
                self.status = format!("Editing note {} (Ctrl+S save, Esc cancel)", position + 1);
                Mode::Editing(field)
            }
            Err(message) => alert(message, Mode::Normal),
        }
    }

    fn save_edit(&mut self, field: InputField) -> Mode {
        match self.apply(Action::SaveEdit) {
            Ok(_) => {
                self.status = "Note updated".into();
                Mode::Normal
            }
            Err(message) => {
                let resume = if self.controller.state().edit_buffer().is_some() {
                    Mode::Editing(field)
                } else {
                    Mode::Normal
                };
                alert(message, resume)
            }
        }
    }

    fn request_delete(&mut self) -> Mode {
        if self.day_len() == 0 {
            self.status = "No note selected to delete".into();
            return Mode::Normal;
        }
        let position = self.selected_note;
        if self.confirm_delete {
            self.status = format!("Delete note {}? (y to confirm, n/Esc to cancel)", position + 1);
            return Mode::ConfirmDelete { position };
        }
        self.delete(position)
    }

    fn delete(&mut self, position: usize) -> Mode {
        match self.apply(Action::DeleteNote(position)) {
            Ok(_) => {
                self.status = format!("Deleted note {}", position + 1);
                Mode::Normal
            }
            Err(message) => alert(message, Mode::Normal),
        }
    }

    /// Dispatches and brings the UI-side copies back in line with the state,
    /// whether or not the action went through.
    fn apply(&mut self, action: Action) -> Result<Outcome, String> {
        let result = self.controller.dispatch(action);
        let state = self.controller.state();
        if state.draft() != self.draft.value {
            self.draft = InputField::new(state.draft());
        }
        let len = state.notes_for_selected_day().len();
        self.selected_note = self.selected_note.min(len.saturating_sub(1));
        match result {
            Ok(Outcome::NotesChanged) => {
                self.last_save = Some(Instant::now());
                Ok(Outcome::NotesChanged)
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(err.to_string()),
        }
    }

    fn day_len(&self) -> usize {
        self.controller.state().notes_for_selected_day().len()
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        let view = self.controller.state().view(self.locale);
        let editing = match &self.mode {
            Mode::Editing(field) => Some(field),
            _ => None,
        };
        self.draw_header(f, layout[0], &view);
        draw_notes(
            f,
            layout[1],
            &view,
            editing,
            self.selected_note,
            &mut self.list,
        );
        draw_draft(
            f,
            layout[2],
            &self.draft,
            matches!(self.mode, Mode::Composing),
        );
        self.draw_footer(f, layout[3]);

        match &self.mode {
            Mode::ConfirmDelete { position } => draw_confirm(f, &view, *position),
            Mode::Alert { message, .. } => draw_alert(f, message),
            _ => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, view: &DayView<'_>) {
        let saved = self
            .last_save
            .map(|at| format!("saved {}", format_elapsed(at.elapsed())))
            .unwrap_or_else(|| "no changes yet".into());
        let title = Line::from(vec![
            Span::styled(
                "daynotes ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                view.label.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(view.day_key.clone(), Style::default().fg(Color::Yellow)),
            Span::raw("  •  "),
            Span::styled(self.store_label.clone(), Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(saved, Style::default().fg(Color::Gray)),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let spans = match self.mode {
            Mode::Composing | Mode::Editing(_) => vec![
                Span::styled("Ctrl+S", Style::default().fg(Color::LightGreen)),
                Span::raw(" save  "),
                Span::styled("Enter", Style::default().fg(Color::LightCyan)),
                Span::raw(" newline  "),
                Span::styled("←↑↓→", Style::default().fg(Color::LightCyan)),
                Span::raw(" move cursor  "),
                Span::styled("Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" leave"),
            ],
            _ => vec![
                Span::styled("t", Style::default().fg(Color::LightCyan)),
                Span::raw(" today  "),
                Span::styled("← / h", Style::default().fg(Color::LightCyan)),
                Span::raw(" previous day  "),
                Span::styled("→ / l", Style::default().fg(Color::LightCyan)),
                Span::raw(" next day  "),
                Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
                Span::raw(" select  "),
                Span::styled("a", Style::default().fg(Color::LightMagenta)),
                Span::raw(" add  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" delete  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ],
        };
        Line::from(spans)
    }
}

fn alert(message: String, resume: Mode) -> Mode {
    Mode::Alert {
        message,
        resume: Box::new(resume),
    }
}

fn is_submit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('s') | KeyCode::Enter)
}

/// Applies a text-editing key. Returns false for keys that do not edit.
fn edit_field(field: &mut InputField, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Up => field.move_up(),
        KeyCode::Down => field.move_down(),
        KeyCode::Enter => field.insert_char('\n'),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            field.insert_char(c)
        }
        _ => return false,
    }
    true
}

fn draw_notes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    view: &DayView<'_>,
    editing: Option<&InputField>,
    selected: usize,
    list: &mut ListState,
) {
    let block = Block::default()
        .title(Span::styled(
            format!("Notes ({})", view.notes.len()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if view.is_empty() {
        let empty = Paragraph::new(EMPTY_DAY)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items = view
        .notes
        .iter()
        .map(|row| note_item(row, editing))
        .collect::<Vec<_>>();
    list.select(Some(selected.min(view.notes.len() - 1)));
    let widget = List::new(items)
        .block(block)
        .highlight_symbol("▶ ")
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 44, 56))
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(widget, area, list);
}

fn note_item(row: &NoteRow<'_>, editing: Option<&InputField>) -> ListItem<'static> {
    let number = format!("{:>2}. ", row.position + 1);
    let indent = " ".repeat(number.chars().count());
    let (text, style) = match row.editing {
        Some(scratch) => (
            editing
                .map(InputField::with_caret)
                .unwrap_or_else(|| scratch.to_string()),
            Style::default().fg(Color::Cyan),
        ),
        None => (row.text.to_string(), Style::default().fg(Color::White)),
    };
    let mut lines = text
        .split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        number.clone()
                    } else {
                        indent.clone()
                    },
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(line.to_string(), style),
            ])
        })
        .collect::<Vec<_>>();
    if row.editing.is_some() {
        lines.push(Line::from(Span::styled(
            format!("{}[editing] Ctrl+S save • Esc cancel", indent),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        )));
    }
    ListItem::new(lines)
}

fn draw_draft(f: &mut ratatui::Frame<'_>, area: Rect, draft: &InputField, active: bool) {
    let accent = if active { Color::Cyan } else { Color::DarkGray };
    let body = if active {
        Paragraph::new(draft.with_caret()).style(Style::default().fg(Color::White))
    } else if draft.value.is_empty() {
        Paragraph::new(DRAFT_PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(draft.value.clone()).style(Style::default().fg(Color::Gray))
    };
    let block = Block::default()
        .title(Span::styled(
            "New note (a to write, Ctrl+S to add)",
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent));
    f.render_widget(body.wrap(Wrap { trim: false }).block(block), area);
}

fn draw_confirm(f: &mut ratatui::Frame<'_>, view: &DayView<'_>, position: usize) {
    let area = centered_rect(50, 30, f.size());
    let text = view
        .notes
        .get(position)
        .map(|row| truncate_text(row.text.lines().next().unwrap_or_default(), 40))
        .unwrap_or_default();
    let body = vec![
        Line::from(Span::styled(
            format!("Delete \"{}\"?", text),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(
                "Confirm Delete",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_alert(f: &mut ratatui::Frame<'_>, message: &str) {
    let area = centered_rect(50, 30, f.size());
    let body = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press Enter to continue"),
    ];
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    "Notice",
                    Style::default()
                        .fg(Color::LightYellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightYellow)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut out = stdout();
    if let Err(err) = execute!(out, EnterAlternateScreen) {
        disable_raw_mode()?;
        return Err(err.into());
    }
    Ok(Terminal::new(CrosstermBackend::new(out))?)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// A box `percent_x` by `percent_y` of `area`, centered in it.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let scale =
        |len: u16, percent: u16| (u32::from(len) * u32::from(percent.min(100)) / 100) as u16;
    let width = scale(area.width, percent_x);
    let height = scale(area.height, percent_y);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn format_elapsed(elapsed: Duration) -> String {
    match elapsed.as_secs() {
        0..=4 => "just now".into(),
        secs @ 5..=59 => format!("{}s ago", secs),
        secs @ 60..=3599 => format!("{}m ago", secs / 60),
        secs => format!("{}h ago", secs / 3600),
    }
}
