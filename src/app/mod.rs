use std::io::Stdout;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::store::{NoteStore, Request};
use crate::ui;

pub mod actions;
pub mod state;
pub mod worker;

pub use actions::ActionDispatcher;
pub use state::{FocusPane, FormState, InputCursor};
pub use worker::SyncWorker;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    FocusNext,
    FocusPrevious,
    Submit,
    EditSelected,
    DeleteSelected,
    CancelEdit,
    Reload,
}

pub struct App {
    store: NoteStore,
    form: FormState,
    list_state: ListState,
    worker: SyncWorker,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    /// Builds the app and queues the initial load of the collection.
    pub fn new(config: &AppConfig, mut worker: SyncWorker) -> Result<Self> {
        let store = NoteStore::new(&config.behavior);
        worker
            .send(store.load_request())
            .context("queueing initial note load")?;
        Ok(Self {
            tick_rate: config.ui.tick_rate(),
            store,
            form: FormState::default(),
            list_state: ListState::default(),
            worker,
            should_quit: false,
        })
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| {
                    if self.store.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.form.selected));
                    }
                    ui::draw_app(
                        frame,
                        &self.store,
                        &self.form,
                        &mut self.list_state,
                        self.worker.in_flight(),
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            // the tick bounds how long a finished request waits to be applied
            if event::poll(self.tick_rate).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            self.drain_outcomes();
        }
        Ok(())
    }

    /// Folds every completed call into the store, oldest first.
    fn drain_outcomes(&mut self) {
        while let Some(outcome) = self.worker.try_recv() {
            self.store.apply(outcome);
            self.form.sync(self.store.draft(), self.store.len());
        }
    }

    fn dispatch(&mut self, request: Request) {
        if let Err(err) = self.worker.send(request) {
            tracing::error!(?err, "failed to hand request to sync worker");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);

        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Submit)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Reload)
            }
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::BackTab => Some(Action::FocusPrevious),
            KeyCode::Esc if self.store.is_editing() => Some(Action::CancelEdit),
            _ => None,
        };
        if let Some(action) = action {
            self.handle_action(action);
            return;
        }

        match self.form.focus {
            FocusPane::Title | FocusPane::Content => self.handle_input_key(key, plain),
            FocusPane::Submit => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.handle_action(Action::Submit);
                }
            }
            FocusPane::List => {
                let action = match key.code {
                    KeyCode::Char('q') if plain => Some(Action::Quit),
                    KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
                    KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
                    KeyCode::Char('e') | KeyCode::Enter if plain => Some(Action::EditSelected),
                    KeyCode::Char('d') | KeyCode::Delete if plain => {
                        Some(Action::DeleteSelected)
                    }
                    _ => None,
                };
                if let Some(action) = action {
                    self.handle_action(action);
                }
            }
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, plain: bool) {
        if self.form.focus == FocusPane::Title && key.code == KeyCode::Enter {
            self.form.focus_next();
            return;
        }
        let (cursor, text) = match self.form.focus {
            FocusPane::Title => (&mut self.form.title, &mut self.store.draft_mut().title),
            _ => (&mut self.form.content, &mut self.store.draft_mut().content),
        };
        match key.code {
            KeyCode::Enter => cursor.insert_char(text, '\n'),
            KeyCode::Backspace => {
                cursor.backspace(text);
            }
            KeyCode::Delete => {
                cursor.delete(text);
            }
            KeyCode::Left => {
                cursor.move_left(text);
            }
            KeyCode::Right => {
                cursor.move_right(text);
            }
            KeyCode::Home => cursor.move_home(text),
            KeyCode::End => cursor.move_end(text),
            KeyCode::Char(ch) if plain => cursor.insert_char(text, ch),
            _ => {}
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.form.move_selection(1, self.store.len()),
            Action::SelectPrevious => self.form.move_selection(-1, self.store.len()),
            Action::FocusNext => self.form.focus_next(),
            Action::FocusPrevious => self.form.focus_previous(),
            Action::Submit => {
                if let Some(request) = self.store.submit() {
                    self.dispatch(request);
                }
            }
            Action::EditSelected => {
                if self.store.begin_edit(self.form.selected) {
                    self.form.reset_cursors(self.store.draft());
                    self.form.focus = FocusPane::Title;
                }
            }
            Action::DeleteSelected => {
                if let Some(request) = self.store.delete(self.form.selected) {
                    self.dispatch(request);
                }
            }
            Action::CancelEdit => {
                self.store.cancel_edit();
                self.form.sync(self.store.draft(), self.store.len());
            }
            Action::Reload => {
                let request = self.store.load_request();
                self.dispatch(request);
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, Note, NoteDraft, NoteId};
    use crate::testing::{FakeGateway, Reply};

    const WAIT: Duration = Duration::from_secs(5);

    fn app_with(replies: Vec<Reply>) -> App {
        let worker = SyncWorker::spawn(FakeGateway::new(replies)).expect("worker");
        let mut app = App::new(&AppConfig::default(), worker).expect("app");
        settle(&mut app);
        app
    }

    /// Blocks until every queued request has been answered and applied.
    fn settle(app: &mut App) {
        while app.worker.in_flight() > 0 {
            let outcome = app.worker.recv_timeout(WAIT).expect("outcome in time");
            app.store.apply(outcome);
            app.form.sync(app.store.draft(), app.store.len());
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, ch: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn startup_loads_the_collection() {
        let app = app_with(vec![Reply::Notes(vec![Note::new(1, "a", "b")])]);
        assert_eq!(app.store().notes(), &[Note::new(1, "a", "b")]);
    }

    #[test]
    fn typing_and_submitting_creates_a_note() {
        let mut app = app_with(vec![
            Reply::Notes(vec![]),
            Reply::Note(Note::new(7, "Hi", "there")),
        ]);
        type_text(&mut app, "Hi");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.form.focus, FocusPane::Content);
        type_text(&mut app, "there");
        ctrl(&mut app, 's');
        settle(&mut app);

        assert_eq!(app.store().notes(), &[Note::new(7, "Hi", "there")]);
        assert_eq!(app.store().draft(), &NoteDraft::default());
        assert_eq!(app.form.content.position(), 0);
    }

    #[test]
    fn submit_with_empty_content_does_nothing() {
        let mut app = app_with(vec![Reply::Notes(vec![])]);
        type_text(&mut app, "title only");
        ctrl(&mut app, 's');
        assert_eq!(app.worker.in_flight(), 0);
        assert!(app.store().error().is_none());
    }

    #[test]
    fn edit_from_list_then_submit_updates() {
        let gateway_replies = vec![
            Reply::Notes(vec![Note::new(3, "t", "old")]),
            Reply::Ack(200),
        ];
        let mut app = app_with(gateway_replies);
        app.form.focus = FocusPane::List;
        press(&mut app, KeyCode::Char('e'));
        assert!(app.store().is_editing());
        assert_eq!(app.form.focus, FocusPane::Title);

        app.form.focus = FocusPane::Content;
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "new");
        app.form.focus = FocusPane::Submit;
        press(&mut app, KeyCode::Enter);
        settle(&mut app);

        assert_eq!(app.store().notes(), &[Note::new(3, "t", "new")]);
        assert!(!app.store().is_editing());
    }

    #[test]
    fn delete_from_list_removes_selected() {
        let mut app = app_with(vec![
            Reply::Notes(vec![Note::new(1, "a", "a"), Note::new(2, "b", "b")]),
            Reply::Ack(204),
        ]);
        app.form.focus = FocusPane::List;
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('d'));
        settle(&mut app);

        assert_eq!(app.store().notes(), &[Note::new(1, "a", "a")]);
        assert_eq!(app.form.selected, 0);
    }

    #[test]
    fn list_keys_are_text_while_typing() {
        let mut app = app_with(vec![Reply::Notes(vec![Note::new(1, "a", "a")])]);
        type_text(&mut app, "qd");
        assert!(!app.should_quit);
        assert_eq!(app.store().draft().title, "qd");
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn escape_cancels_edit_mode() {
        let mut app = app_with(vec![Reply::Notes(vec![Note::new(1, "a", "alpha")])]);
        app.form.focus = FocusPane::List;
        press(&mut app, KeyCode::Enter);
        assert!(app.store().is_editing());
        press(&mut app, KeyCode::Esc);
        assert!(!app.store().is_editing());
        assert_eq!(app.store().draft(), &NoteDraft::default());
    }

    #[test]
    fn reload_requests_the_list_again() {
        let gateway = FakeGateway::new([
            Reply::Notes(vec![]),
            Reply::Notes(vec![Note::new("n1", "a", "b")]),
        ]);
        let worker = SyncWorker::spawn(gateway).expect("worker");
        let mut app = App::new(&AppConfig::default(), worker).expect("app");
        settle(&mut app);
        ctrl(&mut app, 'r');
        settle(&mut app);
        assert_eq!(app.store().get(0).map(|n| &n.id), Some(&NoteId::from("n1")));
    }

    #[test]
    fn quit_from_list() {
        let mut app = app_with(vec![Reply::Notes(vec![])]);
        app.form.focus = FocusPane::List;
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn construction_takes_tick_rate_and_behavior_from_config() {
        let mut config = AppConfig::default();
        config.ui.tick_rate_ms = 40;
        config.behavior.clear_error_on_success = true;
        let gateway = FakeGateway::new([
            Reply::Fail(GatewayError::NotAList),
            Reply::Notes(vec![Note::new(1, "a", "b")]),
        ]);
        let worker = SyncWorker::spawn(gateway).expect("worker");
        let mut app = App::new(&config, worker).expect("app");
        assert_eq!(app.tick_rate, Duration::from_millis(40));

        settle(&mut app);
        assert_eq!(app.store().error(), Some("fetched data is not a list"));
        ctrl(&mut app, 'r');
        settle(&mut app);
        assert_eq!(app.store().error(), None);
    }
}
