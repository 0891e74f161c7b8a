use crate::board::TaskBoard;
use crate::config::{Config, google_token_path};
use crate::gateway::{GatewayClient, GatewayError};
use crate::integrations::google::{AuthDisplay, AuthPollResult, TasksClient, TasksError};
use crate::models::{
    CalendarEvent, EventType, Idea, InputMode, Priority, Project, Task, TaskListRef, TaskStatus,
    Thought, View,
};
use crate::session::{FileTokenStore, GatewaySession, TokenStore};
use chrono::{DateTime, Duration, Local};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tui_textarea::TextArea;

const TOAST_SECONDS: i64 = 4;

pub const PROJECT_COLORS: [&str; 8] = [
    "#00ff88", "#ff0066", "#0088ff", "#ffaa00", "#8800ff", "#ff8800", "#00ffaa", "#ff4400",
];

/// Outcomes delivered from background workers to the UI loop. Fetch results
/// always carry full collections; nothing is patched optimistically.
pub enum AppEvent {
    SignedIn(Result<GatewaySession, GatewayError>),
    LocalTasks(Result<Vec<Task>, GatewayError>),
    ExternalTasks {
        list_id: String,
        result: Result<Vec<Task>, TasksError>,
    },
    TaskLists(Result<Vec<TaskListRef>, TasksError>),
    Thoughts(Result<Vec<Thought>, GatewayError>),
    Ideas(Result<Vec<Idea>, GatewayError>),
    Projects(Result<Vec<Project>, GatewayError>),
    Events(Result<Vec<CalendarEvent>, GatewayError>),
    /// The external service answered 401; the token is already cleared.
    ExternalAuthLost,
    Notice(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    SignIn,
    Task,
    Thought,
    Idea,
    Project,
    Event,
}

/// One shared form buffer; which fields apply depends on `kind`.
pub struct FormState {
    pub kind: FormKind,
    pub editing: Option<Task>,
    pub field: usize,
    pub title: String,
    pub description: TextArea<'static>,
    pub priority: Priority,
    pub due_date: String,
    pub tags: String,
    pub color_index: usize,
    pub project_index: usize,
    pub event_type: EventType,
    pub event_time: String,
    pub to_google: bool,
    pub email: String,
    pub password: String,
}

impl FormState {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            editing: None,
            field: 0,
            title: String::new(),
            description: TextArea::default(),
            priority: Priority::Medium,
            due_date: String::new(),
            tags: String::new(),
            color_index: 0,
            project_index: 0,
            event_type: EventType::Personal,
            event_time: String::new(),
            to_google: false,
            email: String::new(),
            password: String::new(),
        }
    }

    pub fn field_count(&self) -> usize {
        match self.kind {
            FormKind::SignIn => 2,
            FormKind::Task => 6,
            FormKind::Thought => 3,
            FormKind::Idea => 4,
            FormKind::Project => 3,
            FormKind::Event => 5,
        }
    }

    pub fn next_field(&mut self) {
        self.field = (self.field + 1) % self.field_count();
    }

    pub fn prev_field(&mut self) {
        self.field = (self.field + self.field_count() - 1) % self.field_count();
    }
}

pub struct App {
    pub config: Config,
    pub input_mode: InputMode,
    pub view: View,
    pub should_quit: bool,

    pub board: TaskBoard,
    pub thoughts: Vec<Thought>,
    pub ideas: Vec<Idea>,
    pub projects: Vec<Project>,
    pub events: Vec<CalendarEvent>,

    pub tasks_state: ListState,
    pub thoughts_state: ListState,
    pub ideas_state: ListState,
    pub projects_state: ListState,
    pub events_state: ListState,

    pub form: Option<FormState>,
    pub search_input: String,
    pub search_query: Option<String>,

    pub show_help_popup: bool,
    pub show_lists_popup: bool,
    pub lists_state: ListState,
    pub show_google_auth_popup: bool,
    pub google_auth_display: Option<AuthDisplay>,
    pub google_auth_receiver: Option<Receiver<AuthPollResult>>,

    pub session: Option<GatewaySession>,
    pub gateway: Option<Arc<GatewayClient>>,
    pub token_store: Arc<dyn TokenStore>,
    pub tasks_client: Arc<TasksClient>,
    pub google_connected: bool,

    pub events_tx: Sender<AppEvent>,
    pub events_rx: Receiver<AppEvent>,
    pub in_flight: usize,

    pub toast_message: Option<String>,
    pub toast_expiry: Option<DateTime<Local>>,
}

impl App {
    pub fn new() -> App {
        let config = Config::load();
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> App {
        let token_store: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::new(google_token_path(&config)));
        let tasks_client = Arc::new(TasksClient::new(
            Arc::clone(&token_store),
            config.google.timeout_seconds,
        ));
        // Restored token counts as connected until first use proves otherwise.
        let google_connected = tasks_client.connected();

        let (events_tx, events_rx) = mpsc::channel();

        let mut form = FormState::new(FormKind::SignIn);
        form.email = config.gateway.email.clone();
        if !form.email.is_empty() {
            form.field = 1;
        }

        App {
            config,
            input_mode: InputMode::Editing,
            view: View::Tasks,
            should_quit: false,

            board: TaskBoard::new(),
            thoughts: Vec::new(),
            ideas: Vec::new(),
            projects: Vec::new(),
            events: Vec::new(),

            tasks_state: ListState::default(),
            thoughts_state: ListState::default(),
            ideas_state: ListState::default(),
            projects_state: ListState::default(),
            events_state: ListState::default(),

            form: Some(form),
            search_input: String::new(),
            search_query: None,

            show_help_popup: false,
            show_lists_popup: false,
            lists_state: ListState::default(),
            show_google_auth_popup: false,
            google_auth_display: None,
            google_auth_receiver: None,

            session: None,
            gateway: None,
            token_store,
            tasks_client,
            google_connected,

            events_tx,
            events_rx,
            in_flight: 0,

            toast_message: None,
            toast_expiry: None,
        }
    }

    pub fn toast(&mut self, message: impl Into<String>) {
        self.toast_message = Some(message.into());
        self.toast_expiry = Some(Local::now() + Duration::seconds(TOAST_SECONDS));
    }

    pub fn active_list_len(&self) -> usize {
        match self.view {
            View::Tasks => self.board.visible_tasks().len(),
            View::Thoughts => self.visible_thoughts().len(),
            View::Ideas => self.visible_ideas().len(),
            View::Projects => self.projects.len(),
            View::Calendar => self.events.len(),
        }
    }

    pub fn active_list_state(&mut self) -> &mut ListState {
        match self.view {
            View::Tasks => &mut self.tasks_state,
            View::Thoughts => &mut self.thoughts_state,
            View::Ideas => &mut self.ideas_state,
            View::Projects => &mut self.projects_state,
            View::Calendar => &mut self.events_state,
        }
    }

    pub fn scroll_down(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_list_state();
        let next = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        state.select(Some(next));
    }

    pub fn scroll_up(&mut self) {
        let len = self.active_list_len();
        if len == 0 {
            return;
        }
        let state = self.active_list_state();
        let next = state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        state.select(Some(next));
    }

    pub fn next_view(&mut self) {
        let views = View::all();
        let idx = views.iter().position(|v| *v == self.view).unwrap_or(0);
        self.view = views[(idx + 1) % views.len()];
        self.search_query = None;
    }

    pub fn prev_view(&mut self) {
        let views = View::all();
        let idx = views.iter().position(|v| *v == self.view).unwrap_or(0);
        self.view = views[(idx + views.len() - 1) % views.len()];
        self.search_query = None;
    }

    pub fn selected_task(&self) -> Option<Task> {
        let index = self.tasks_state.selected()?;
        self.board.visible_tasks().get(index).map(|t| (*t).clone())
    }

    /// Thoughts filtered by the active search query (title, body or tags,
    /// case-insensitive), computed on read.
    pub fn visible_thoughts(&self) -> Vec<&Thought> {
        match self.search_query.as_deref() {
            None => self.thoughts.iter().collect(),
            Some(query) => {
                let needle = query.to_lowercase();
                self.thoughts
                    .iter()
                    .filter(|t| {
                        t.title.to_lowercase().contains(&needle)
                            || t.content.to_lowercase().contains(&needle)
                            || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
                    })
                    .collect()
            }
        }
    }

    pub fn visible_ideas(&self) -> Vec<&Idea> {
        match self.search_query.as_deref() {
            None => self.ideas.iter().collect(),
            Some(query) => {
                let needle = query.to_lowercase();
                self.ideas
                    .iter()
                    .filter(|i| {
                        i.title.to_lowercase().contains(&needle)
                            || i.description.to_lowercase().contains(&needle)
                            || i.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
                    })
                    .collect()
            }
        }
    }

    pub fn project_name(&self, project_id: Option<&str>) -> Option<&str> {
        let id = project_id?;
        self.projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    /// Count of tasks due today or earlier and not yet completed.
    pub fn due_now_count(&self) -> usize {
        let today = Local::now().date_naive();
        self.board
            .visible_tasks()
            .iter()
            .filter(|t| t.status != TaskStatus::Completed)
            .filter(|t| t.due_date.is_some_and(|d| d <= today))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;

    fn thought(title: &str, content: &str, tags: &[&str]) -> Thought {
        Thought {
            id: title.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
        }
    }

    fn test_app() -> App {
        App::with_config(Config::default())
    }

    #[test]
    fn app_starts_at_sign_in_form() {
        let app = test_app();
        assert!(matches!(app.input_mode, InputMode::Editing));
        assert!(matches!(
            app.form.as_ref().map(|f| f.kind),
            Some(FormKind::SignIn)
        ));
    }

    #[test]
    fn search_filters_thoughts_by_title_body_and_tags() {
        let mut app = test_app();
        app.thoughts = vec![
            thought("Groceries", "buy milk", &[]),
            thought("Reading", "rust book", &["learning"]),
            thought("Workout", "leg day", &["health"]),
        ];

        app.search_query = Some("milk".to_string());
        assert_eq!(app.visible_thoughts().len(), 1);

        app.search_query = Some("LEARN".to_string());
        assert_eq!(app.visible_thoughts().len(), 1);

        app.search_query = None;
        assert_eq!(app.visible_thoughts().len(), 3);
    }

    #[test]
    fn scroll_is_clamped_to_list_bounds() {
        let mut app = test_app();
        app.view = View::Thoughts;
        app.thoughts = vec![thought("a", "", &[]), thought("b", "", &[])];

        app.scroll_down();
        assert_eq!(app.thoughts_state.selected(), Some(0));
        app.scroll_down();
        app.scroll_down();
        assert_eq!(app.thoughts_state.selected(), Some(1));
        app.scroll_up();
        assert_eq!(app.thoughts_state.selected(), Some(0));
    }

    #[test]
    fn view_cycle_wraps_in_both_directions() {
        let mut app = test_app();
        assert_eq!(app.view, View::Tasks);
        app.prev_view();
        assert_eq!(app.view, View::Calendar);
        app.next_view();
        assert_eq!(app.view, View::Tasks);
    }

    #[test]
    fn due_now_counts_only_open_overdue_tasks() {
        let mut app = test_app();
        let today = Local::now().date_naive();
        let make = |id: &str, status, due| Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            due_date: due,
            created_at: None,
            updated_at: None,
            project_id: None,
            origin: Origin::Local,
        };
        app.board.local_tasks = vec![
            make("overdue", TaskStatus::Pending, Some(today)),
            make("done", TaskStatus::Completed, Some(today)),
            make("later", TaskStatus::Pending, today.succ_opt()),
            make("undated", TaskStatus::Pending, None),
        ];
        assert_eq!(app.due_now_count(), 1);
    }
}
