use crate::chime::chime_for;
use crate::config::Config;
use crate::model::TaskId;
use crate::router::{View, ViewRouter};
use crate::storage::{FileStore, KeyValueStore, StoreLocation};
use crate::tasks::{Reply, TaskListView, TaskStore};
use crate::timer::{parse_minutes, Clock, Countdown, SystemClock, TimerState};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::info;

const FRAME: Duration = Duration::from_millis(16);
const IDLE_POLL: Duration = Duration::from_millis(200);

pub fn run(tasks: TaskStore<FileStore>, location: StoreLocation, config: &Config) -> Result<()> {
    let countdown = Countdown::new(SystemClock, chime_for(config.chime), config.default_minutes);
    let label = format!("{}  •  {}", location.scope.label(), location.dir.display());
    let mut terminal = setup_terminal()?;
    let mut app = App::new(tasks, countdown, config, label);
    info!(view = ?config.start_view, "starting tui");
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

pub struct App<S: KeyValueStore, C: Clock> {
    router: ViewRouter,
    tasks: TaskStore<S>,
    countdown: Countdown<C>,
    default_minutes: u64,
    selected: usize,
    mode: Mode,
    status: String,
    store_label: String,
    last_save: Option<Instant>,
}

enum Mode {
    Normal,
    Adding(FieldValue),
    Editing { id: TaskId, field: FieldValue },
    ConfirmDelete { id: TaskId },
    Minutes(FieldValue),
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn handle(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => {}
        }
    }
}

enum FieldOutcome {
    Pending,
    Submit(String),
    Cancel,
}

impl<S: KeyValueStore, C: Clock> App<S, C> {
    pub fn new(
        tasks: TaskStore<S>,
        countdown: Countdown<C>,
        config: &Config,
        store_label: String,
    ) -> Self {
        App {
            router: ViewRouter::new(config.start_view),
            tasks,
            countdown,
            default_minutes: config.default_minutes,
            selected: 0,
            mode: Mode::Normal,
            status: "Press 1/2/3 or Tab to switch panels".into(),
            store_label,
            last_save: None,
        }
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn tasks(&self) -> &TaskStore<S> {
        &self.tasks
    }

    pub fn countdown(&self) -> &Countdown<C> {
        &self.countdown
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            let timeout = if self.countdown.wants_frame() {
                FRAME
            } else {
                IDLE_POLL
            };
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
            self.tick();
        }
        Ok(())
    }

    /// Runs the timer's frame callback if one is scheduled.
    pub fn tick(&mut self) {
        if !self.countdown.wants_frame() {
            return;
        }
        if self.countdown.on_frame() == TimerState::Expired {
            self.status = "Time is up".into();
        }
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Adding(mut field) => match field_key(&mut field, key) {
                FieldOutcome::Pending => self.mode = Mode::Adding(field),
                FieldOutcome::Submit(text) => self.add_task(&text),
                FieldOutcome::Cancel => self.status = "Canceled".into(),
            },
            Mode::Editing { id, mut field } => match field_key(&mut field, key) {
                FieldOutcome::Pending => self.mode = Mode::Editing { id, field },
                FieldOutcome::Submit(text) => self.edit_task(&id, Reply::text(text)),
                FieldOutcome::Cancel => self.edit_task(&id, Reply::cancel()),
            },
            Mode::Minutes(mut field) => match field_key(&mut field, key) {
                FieldOutcome::Pending => self.mode = Mode::Minutes(field),
                FieldOutcome::Submit(text) => {
                    let minutes = parse_minutes(&text, self.default_minutes);
                    self.configure_timer(i64::try_from(minutes).unwrap_or(i64::MAX));
                }
                FieldOutcome::Cancel => self.status = "Canceled".into(),
            },
            Mode::ConfirmDelete { id } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.delete_task(&id, Reply::yes()),
                KeyCode::Char('n') | KeyCode::Esc => self.delete_task(&id, Reply::cancel()),
                _ => self.mode = Mode::ConfirmDelete { id },
            },
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.show(View::Home),
            KeyCode::Char('2') => self.show(View::Tasks),
            KeyCode::Char('3') => self.show(View::Timer),
            KeyCode::Tab => {
                self.router.next();
                self.show(self.router.active());
            }
            KeyCode::BackTab => {
                self.router.prev();
                self.show(self.router.active());
            }
            _ => match self.router.active() {
                View::Home => {}
                View::Tasks => self.handle_tasks_key(key),
                View::Timer => self.handle_timer_key(key),
            },
        }
        false
    }

    fn handle_tasks_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.mode = Mode::Adding(FieldValue::new(""));
                self.status = "New task (Enter to add, Esc to cancel)".into();
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => {
                if let Some(id) = self.selected_id() {
                    match self.tasks.toggle_done(&id) {
                        Ok(done) => {
                            self.saved(if done { "Marked done" } else { "Marked not done" })
                        }
                        Err(err) => self.status = format!("Toggle failed: {}", err),
                    }
                }
            }
            KeyCode::Char('e') => match self.selected_id() {
                Some(id) => {
                    let current = self
                        .tasks
                        .get(&id)
                        .map(|t| t.text.clone())
                        .unwrap_or_default();
                    self.mode = Mode::Editing {
                        id,
                        field: FieldValue::new(&current),
                    };
                    self.status = "Edit task (Enter to save, Esc to cancel)".into();
                }
                None => self.status = "No task selected to edit".into(),
            },
            KeyCode::Char('d') => match self.selected_id() {
                Some(id) => {
                    self.status = "Delete task? (y to confirm, n/Esc to cancel)".into();
                    self.mode = Mode::ConfirmDelete { id };
                }
                None => self.status = "No task selected to delete".into(),
            },
            _ => {}
        }
    }

    fn handle_timer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                self.countdown.start();
                self.status = "Timer running".into();
            }
            KeyCode::Char('p') => {
                self.countdown.pause();
                if self.countdown.state() == TimerState::Paused {
                    self.status = "Timer paused".into();
                }
            }
            KeyCode::Char('r') => {
                self.countdown.reset();
                self.status = "Timer reset".into();
            }
            KeyCode::Char('m') => {
                let current = self.countdown.configured_minutes().to_string();
                self.mode = Mode::Minutes(FieldValue::new(&current));
                self.status = "Timer minutes (Enter to apply, Esc to cancel)".into();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let minutes = self.configured_minutes().saturating_add(1);
                self.configure_timer(minutes);
            }
            KeyCode::Char('-') => {
                let minutes = self.configured_minutes().saturating_sub(1);
                self.configure_timer(minutes);
            }
            _ => {}
        }
    }

    fn show(&mut self, view: View) {
        self.router.show(view);
        self.status = format!("Switched to {}", view.label());
    }

    fn configured_minutes(&self) -> i64 {
        i64::try_from(self.countdown.configured_minutes()).unwrap_or(i64::MAX)
    }

    fn configure_timer(&mut self, minutes: i64) {
        self.countdown.configure(minutes);
        self.status = if self.countdown.is_running() {
            format!(
                "Duration set to {} min, applies on reset",
                self.countdown.configured_minutes()
            )
        } else {
            format!("Duration set to {} min", self.countdown.configured_minutes())
        };
    }

    fn add_task(&mut self, text: &str) {
        match self.tasks.add(text) {
            Ok(Some(_)) => {
                self.selected = 0;
                self.saved("Added task");
            }
            Ok(None) => self.status = "Nothing to add".into(),
            Err(err) => self.status = format!("Add failed: {}", err),
        }
    }

    fn edit_task(&mut self, id: &str, mut reply: Reply) {
        match self.tasks.edit(id, &mut reply) {
            Ok(true) => self.saved("Updated task"),
            Ok(false) => self.status = "Edit canceled".into(),
            Err(err) => self.status = format!("Edit failed: {}", err),
        }
    }

    fn delete_task(&mut self, id: &str, mut reply: Reply) {
        match self.tasks.remove(id, &mut reply) {
            Ok(true) => {
                self.clamp_selection();
                self.saved("Deleted task");
            }
            Ok(false) => self.status = "Delete canceled".into(),
            Err(err) => self.status = format!("Delete failed: {}", err),
        }
    }

    fn saved(&mut self, message: &str) {
        self.last_save = Some(Instant::now());
        self.status = message.to_string();
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.tasks
            .view()
            .rows()
            .get(self.selected)
            .map(|row| row.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.tasks.view().rows().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_nav(f, layout[0]);
        match self.router.active() {
            View::Home => self.draw_home(f, layout[1]),
            View::Tasks => self.draw_tasks(f, layout[1]),
            View::Timer => self.draw_timer(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Adding(field) => draw_input(f, "New Task", field),
            Mode::Editing { field, .. } => draw_input(f, "Edit Task", field),
            Mode::Minutes(field) => draw_input(f, "Timer Minutes", field),
            Mode::ConfirmDelete { id } => self.draw_confirm(f, id),
            Mode::Normal => {}
        }
    }

    fn draw_nav(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let titles = self
            .router
            .nav()
            .iter()
            .map(|control| {
                Line::from(vec![
                    Span::styled(
                        control.view.hotkey().to_string(),
                        Style::default().fg(Color::LightCyan),
                    ),
                    Span::raw(" "),
                    Span::raw(control.view.label()),
                ])
            })
            .collect::<Vec<_>>();
        let saved = self
            .last_save
            .map(|t| format!("saved {}", format_elapsed(t)))
            .unwrap_or_else(|| "not saved yet".into());
        let tabs = Tabs::new(titles)
            .select(self.router.active_index())
            .divider("|")
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(Span::styled(
                        format!("ticktask  •  {}  •  {}", self.store_label, saved),
                        Style::default().fg(Color::DarkGray),
                    )),
            );
        f.render_widget(tabs, area);
    }

    fn draw_home(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let counts = self.tasks.counts();
        let lines = vec![
            Line::from(Span::styled(
                "ticktask",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "{} tasks, {} done, {} open",
                counts.total,
                counts.done,
                counts.total - counts.done
            )),
            Line::from(format!(
                "Timer {} at {}",
                self.countdown.state().label(),
                self.countdown.display()
            )),
            Line::from(""),
            Line::from(Span::styled(
                "2 for tasks, 3 for the timer",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Home"));
        f.render_widget(paragraph, area);
    }

    fn draw_tasks(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(
                format!("Tasks ({})", self.tasks.counts().total),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        let rows = match self.tasks.view() {
            TaskListView::Placeholder(message) => {
                let paragraph = Paragraph::new(*message)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block);
                f.render_widget(paragraph, area);
                return;
            }
            TaskListView::Rows(rows) => rows,
        };
        let text_width = area.width.saturating_sub(24) as usize;
        let items = rows
            .iter()
            .map(|row| {
                let text_style = if row.checked {
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default().fg(Color::White)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(row.checkbox(), Style::default().fg(Color::LightGreen)),
                    Span::raw(" "),
                    Span::styled(truncate_text(&row.text, text_width), text_style),
                    Span::raw("  "),
                    Span::styled("[e]dit", Style::default().fg(Color::LightYellow)),
                    Span::raw(" "),
                    Span::styled("[d]elete", Style::default().fg(Color::LightRed)),
                ]))
            })
            .collect::<Vec<_>>();
        let mut state = ListState::default();
        state.select(Some(self.selected.min(rows.len().saturating_sub(1))));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_timer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let state = self.countdown.state();
        let accent = match state {
            TimerState::Idle => Color::White,
            TimerState::Running => Color::LightGreen,
            TimerState::Paused => Color::LightYellow,
            TimerState::Expired => Color::LightRed,
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                self.countdown.display(),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                state.label(),
                Style::default().fg(accent),
            )),
            Line::from(Span::styled(
                format!("duration {} min", self.countdown.configured_minutes()),
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent))
                    .title("Timer"),
            );
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
        let mut spans = vec![
            Span::styled("1/2/3 Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" switch  "),
        ];
        match self.router.active() {
            View::Home => {}
            View::Tasks => spans.extend([
                Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
                Span::raw(" select  "),
                Span::styled("a", Style::default().fg(Color::LightMagenta)),
                Span::raw(" add  "),
                Span::styled("space", Style::default().fg(Color::LightGreen)),
                Span::raw(" toggle  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" delete  "),
            ]),
            View::Timer => spans.extend([
                Span::styled("s", Style::default().fg(Color::LightGreen)),
                Span::raw(" start  "),
                Span::styled("p", Style::default().fg(Color::LightYellow)),
                Span::raw(" pause  "),
                Span::styled("r", Style::default().fg(Color::LightRed)),
                Span::raw(" reset  "),
                Span::styled("m +/-", Style::default().fg(Color::LightMagenta)),
                Span::raw(" minutes  "),
            ]),
        }
        spans.extend([
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, id: &str) {
        let area = centered_rect(50, 20, f.size());
        let text = self
            .tasks
            .get(id)
            .map(|t| t.text.clone())
            .unwrap_or_default();
        let lines = vec![
            Line::from(Span::styled(
                "Delete task?",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(truncate_text(&text, area.width.saturating_sub(4) as usize)),
            Line::from(Span::styled("y / n", Style::default().fg(Color::Gray))),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

fn field_key(field: &mut FieldValue, key: KeyEvent) -> FieldOutcome {
    match key.code {
        KeyCode::Esc => FieldOutcome::Cancel,
        KeyCode::Enter => FieldOutcome::Submit(field.value.clone()),
        _ => {
            field.handle(key);
            FieldOutcome::Pending
        }
    }
}

fn draw_input(f: &mut ratatui::Frame<'_>, title: &str, field: &FieldValue) {
    let area = centered_rect(60, 20, f.size());
    let paragraph = Paragraph::new(Line::from(Span::styled(
        field.with_caret(),
        Style::default().fg(Color::Cyan),
    )))
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(
                title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
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

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(cursor)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chime::SilentChime;
    use crate::storage::MemoryStore;
    use crate::timer::{ManualClock, MAX_MINUTES};
    use ratatui::backend::TestBackend;

    fn app() -> (App<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let config = Config {
            default_minutes: 1,
            ..Config::default()
        };
        let countdown = Countdown::new(clock.clone(), Box::new(SilentChime), 1);
        let app = App::new(
            TaskStore::open(MemoryStore::new()),
            countdown,
            &config,
            "test".into(),
        );
        (app, clock)
    }

    fn press(app: &mut App<MemoryStore, ManualClock>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<MemoryStore, ManualClock>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn screen(app: &App<MemoryStore, ManualClock>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).expect("terminal");
        terminal.draw(|f| app.draw(f)).expect("draw");
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn number_keys_switch_panels() {
        let (mut app, _) = app();
        assert_eq!(app.router().active(), View::Home);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.router().active(), View::Timer);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.router().active(), View::Home);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn add_edit_and_delete_through_modals() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('2'));
        assert!(screen(&app).contains("No tasks yet."));

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "buy milk");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.tasks().tasks()[0].text, "buy milk");
        assert!(screen(&app).contains("[ ] buy milk"));

        press(&mut app, KeyCode::Char(' '));
        assert!(app.tasks().tasks()[0].done);

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "oat milk");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.tasks().tasks()[0].text, "buy oat milk");

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.tasks().tasks().len(), 1);
        assert_eq!(app.status(), "Delete canceled");

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.tasks().tasks().is_empty());
    }

    #[test]
    fn blank_task_is_not_added() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(app.tasks().tasks().is_empty());
        assert_eq!(app.status(), "Nothing to add");
    }

    #[test]
    fn escape_cancels_edit() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "keep");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, " me");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.tasks().tasks()[0].text, "keep");
        assert_eq!(app.status(), "Edit canceled");
    }

    #[test]
    fn timer_panel_runs_to_expiry() {
        let (mut app, clock) = app();
        press(&mut app, KeyCode::Char('3'));
        assert!(screen(&app).contains("01:00:000"));

        press(&mut app, KeyCode::Char('s'));
        clock.advance(1_500);
        app.tick();
        assert!(screen(&app).contains("00:58:500"));

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.countdown().state(), TimerState::Paused);
        press(&mut app, KeyCode::Char('s'));
        clock.advance(60_000);
        app.tick();
        assert_eq!(app.countdown().state(), TimerState::Expired);
        assert!(screen(&app).contains("00:00:000"));
        assert_eq!(app.status(), "Time is up");
    }

    #[test]
    fn minutes_input_configures_timer() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "3");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.countdown().remaining_ms(), 180_000);

        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.countdown().configured_minutes(), 2);

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.countdown().configured_minutes(), 1);
    }

    #[test]
    fn stepping_a_huge_duration_stays_in_range() {
        let (mut app, clock) = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "200000000000000");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.countdown().configured_minutes(), MAX_MINUTES);

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.countdown().configured_minutes(), MAX_MINUTES);
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.countdown().configured_minutes(), MAX_MINUTES - 1);

        press(&mut app, KeyCode::Char('s'));
        clock.advance(16);
        app.tick();
        assert_eq!(app.countdown().state(), TimerState::Running);
    }

    #[test]
    fn truncates_long_text() {
        assert_eq!(truncate_text("abcdef", 10), "abcdef");
        assert_eq!(truncate_text("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate_text("abc", 0), "");
    }

    #[test]
    fn cursor_moves_over_multibyte_chars() {
        let mut field = FieldValue::new("né");
        field.move_left();
        assert_eq!(field.cursor, 1);
        field.move_right();
        assert_eq!(field.cursor, 3);
        field.backspace();
        assert_eq!(field.value, "n");
    }
}
