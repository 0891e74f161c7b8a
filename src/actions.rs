use crate::app::{App, AppEvent, FormKind, FormState, PROJECT_COLORS};
use crate::board::{self, Destination, ExternalOp, GatewayOp, MutationIntent, MutationPlan};
use crate::gateway::{
    self, EventDraft, GatewayClient, IdeaDraft, ProjectDraft, TaskDraft, ThoughtDraft,
};
use crate::integrations::google::{self, TasksError};
use crate::models::{InputMode, View};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::Arc;
use std::thread;
use tui_textarea::TextArea;

// ---------------------------------------------------------------------------
// Fetches
// ---------------------------------------------------------------------------

fn gateway_handle(app: &mut App) -> Option<Arc<GatewayClient>> {
    match app.gateway.as_ref() {
        Some(gateway) => Some(Arc::clone(gateway)),
        None => {
            app.toast("Not signed in to NEXUS.");
            None
        }
    }
}

pub fn refresh_all(app: &mut App) {
    if app.gateway.is_some() {
        refresh_local_tasks(app);
        refresh_thoughts(app);
        refresh_ideas(app);
        refresh_projects(app);
        refresh_events(app);
    }
    if app.google_connected {
        refresh_task_lists(app);
    }
}

pub fn refresh_local_tasks(app: &mut App) {
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::LocalTasks(gateway.list_tasks()));
    });
}

pub fn refresh_thoughts(app: &mut App) {
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::Thoughts(gateway.list_thoughts()));
    });
}

pub fn refresh_ideas(app: &mut App) {
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::Ideas(gateway.list_ideas()));
    });
}

pub fn refresh_projects(app: &mut App) {
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::Projects(gateway.list_projects()));
    });
}

pub fn refresh_events(app: &mut App) {
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::Events(gateway.list_events()));
    });
}

pub fn refresh_task_lists(app: &mut App) {
    if !app.google_connected {
        return;
    }
    let client = Arc::clone(&app.tasks_client);
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let _ = tx.send(AppEvent::TaskLists(client.list_task_lists()));
    });
}

/// Fetches the tasks of one external list. The response is tagged with the
/// list it was requested for so a stale answer can be recognized and dropped.
pub fn refresh_external_list(app: &mut App, list_id: String) {
    let client = Arc::clone(&app.tasks_client);
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        let result = client.list_tasks(&list_id);
        let _ = tx.send(AppEvent::ExternalTasks { list_id, result });
    });
}

pub fn refresh_selected_external(app: &mut App) {
    if !app.google_connected {
        return;
    }
    if let Some(list_id) = app.board.selected_list.clone() {
        refresh_external_list(app, list_id);
    } else {
        refresh_task_lists(app);
    }
}

/// There is no merge or conflict resolution between the two backends; sync
/// refetches both collections so the next render shows server truth.
pub fn sync_tasks(app: &mut App) {
    refresh_local_tasks(app);
    refresh_selected_external(app);
    app.toast("Syncing task collections...");
}

// ---------------------------------------------------------------------------
// Task mutations
// ---------------------------------------------------------------------------

pub fn toggle_selected(app: &mut App) {
    let Some(task) = app.selected_task() else {
        return;
    };
    let planned = board::plan(MutationIntent::Toggle {
        task,
        now: Utc::now(),
    });
    run_plan(app, planned);
}

pub fn delete_selected(app: &mut App) {
    match app.view {
        View::Tasks => {
            let Some(task) = app.selected_task() else {
                return;
            };
            let planned = board::plan(MutationIntent::Delete { task });
            run_plan(app, planned);
        }
        View::Thoughts => delete_selected_thought(app),
        View::Ideas => delete_selected_idea(app),
        View::Projects => delete_selected_project(app),
        View::Calendar => delete_selected_event(app),
    }
}

/// Executes a planned mutation on its backend, then refetches the owning
/// collection. Writes are never applied to local state directly.
fn run_plan(app: &mut App, planned: Option<MutationPlan>) {
    let Some(planned) = planned else {
        return;
    };
    match planned {
        MutationPlan::Gateway(op) => {
            let Some(gateway) = gateway_handle(app) else {
                return;
            };
            let tx = app.events_tx.clone();
            app.in_flight += 1;
            thread::spawn(move || {
                let outcome = match &op {
                    GatewayOp::Create(draft) => gateway.create_task(draft),
                    GatewayOp::Update { id, draft } => gateway.update_task(id, draft),
                    GatewayOp::SetStatus {
                        id,
                        status,
                        completed_at,
                    } => gateway.set_task_status(id, *status, *completed_at),
                    GatewayOp::Delete { id } => gateway.delete_task(id),
                };
                if let Err(err) = outcome {
                    let _ = tx.send(AppEvent::Notice(err.message()));
                }
                let _ = tx.send(AppEvent::LocalTasks(gateway.list_tasks()));
            });
        }
        MutationPlan::External(op) => {
            let client = Arc::clone(&app.tasks_client);
            let tx = app.events_tx.clone();
            app.in_flight += 1;
            thread::spawn(move || {
                let outcome = match &op {
                    ExternalOp::Create { list_id, payload } => {
                        client.create_task(list_id, payload)
                    }
                    ExternalOp::Update { external, payload } => {
                        client.update_task(external, payload)
                    }
                    ExternalOp::SetStatus { external, status } => {
                        client.set_task_status(external, *status)
                    }
                    ExternalOp::Delete { external } => client.delete_task(external),
                };
                match outcome {
                    Err(TasksError::Unauthenticated) => {
                        let _ = tx.send(AppEvent::ExternalAuthLost);
                        return;
                    }
                    Err(err) => {
                        let _ = tx.send(AppEvent::Notice(err.message()));
                    }
                    Ok(()) => {}
                }
                let list_id = op.owning_list().to_string();
                let result = client.list_tasks(&list_id);
                let _ = tx.send(AppEvent::ExternalTasks { list_id, result });
            });
        }
    }
}

fn delete_selected_thought(app: &mut App) {
    let Some(index) = app.thoughts_state.selected() else {
        return;
    };
    let Some(id) = app.visible_thoughts().get(index).map(|t| t.id.clone()) else {
        return;
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.delete_thought(&id) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Thoughts(gateway.list_thoughts()));
    });
}

fn delete_selected_idea(app: &mut App) {
    let Some(index) = app.ideas_state.selected() else {
        return;
    };
    let Some(id) = app.visible_ideas().get(index).map(|i| i.id.clone()) else {
        return;
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.delete_idea(&id) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Ideas(gateway.list_ideas()));
    });
}

fn delete_selected_project(app: &mut App) {
    let Some(index) = app.projects_state.selected() else {
        return;
    };
    let Some(id) = app.projects.get(index).map(|p| p.id.clone()) else {
        return;
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.delete_project(&id) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Projects(gateway.list_projects()));
    });
}

fn delete_selected_event(app: &mut App) {
    let Some(index) = app.events_state.selected() else {
        return;
    };
    let Some(id) = app.events.get(index).map(|e| e.id.clone()) else {
        return;
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.delete_event(&id) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Events(gateway.list_events()));
    });
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

pub fn open_new_form(app: &mut App) {
    let kind = match app.view {
        View::Tasks => FormKind::Task,
        View::Thoughts => FormKind::Thought,
        View::Ideas => FormKind::Idea,
        View::Projects => FormKind::Project,
        View::Calendar => FormKind::Event,
    };
    app.form = Some(FormState::new(kind));
    app.input_mode = InputMode::Editing;
}

pub fn edit_selected(app: &mut App) {
    if app.view != View::Tasks {
        return;
    }
    let Some(task) = app.selected_task() else {
        return;
    };
    let mut form = FormState::new(FormKind::Task);
    form.title = task.title.clone();
    if let Some(description) = task.description.as_deref() {
        form.description = TextArea::from(description.lines());
    }
    form.priority = task.priority;
    form.due_date = task
        .due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    form.project_index = task
        .project_id
        .as_deref()
        .and_then(|id| app.projects.iter().position(|p| p.id == id))
        .map(|i| i + 1)
        .unwrap_or(0);
    form.editing = Some(task);
    app.form = Some(form);
    app.input_mode = InputMode::Editing;
}

pub fn cancel_form(app: &mut App) {
    app.form = None;
    app.input_mode = InputMode::Navigate;
}

pub fn submit_form(app: &mut App) {
    let Some(kind) = app.form.as_ref().map(|f| f.kind) else {
        return;
    };
    match kind {
        FormKind::SignIn => submit_sign_in(app),
        FormKind::Task => submit_task_form(app),
        FormKind::Thought => submit_thought_form(app),
        FormKind::Idea => submit_idea_form(app),
        FormKind::Project => submit_project_form(app),
        FormKind::Event => submit_event_form(app),
    }
}

/// The sign-in form stays open until the gateway answers; the outcome is
/// handled when `SignedIn` arrives.
fn submit_sign_in(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let email = form.email.trim().to_string();
    let password = form.password.clone();
    if email.is_empty() || password.is_empty() {
        app.toast("Email and password are required.");
        return;
    }
    let config = app.config.gateway.clone();
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    app.toast("Signing in...");
    thread::spawn(move || {
        let _ = tx.send(AppEvent::SignedIn(gateway::sign_in(&config, &email, &password)));
    });
}

fn submit_task_form(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let title = form.title.trim().to_string();
    let description = textarea_value(&form.description);
    let priority = form.priority;
    let due_raw = form.due_date.clone();
    let project_index = form.project_index;
    let editing = form.editing.clone();
    let to_google = form.to_google;

    if title.is_empty() {
        app.toast("Title is required.");
        return;
    }
    let due_date = match parse_due_date(&due_raw) {
        Ok(due_date) => due_date,
        Err(message) => {
            app.toast(message);
            return;
        }
    };
    let draft = TaskDraft {
        title,
        description,
        priority,
        due_date,
        project_id: project_index
            .checked_sub(1)
            .and_then(|i| app.projects.get(i))
            .map(|p| p.id.clone()),
    };

    let intent = match editing {
        Some(task) => MutationIntent::Update { task, draft },
        None => {
            let destination = if to_google {
                match app.board.selected_list.clone() {
                    Some(list_id) => Destination::ExternalList(list_id),
                    None => {
                        app.toast("No Google task list selected. Press l to pick one.");
                        return;
                    }
                }
            } else {
                Destination::Local
            };
            MutationIntent::Create { destination, draft }
        }
    };

    app.form = None;
    app.input_mode = InputMode::Navigate;
    run_plan(app, board::plan(intent));
}

fn submit_thought_form(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let title = form.title.trim().to_string();
    let content = textarea_value(&form.description).unwrap_or_default();
    let tags = parse_tags(&form.tags);
    if title.is_empty() {
        app.toast("Title is required.");
        return;
    }
    let draft = ThoughtDraft {
        title,
        content,
        tags,
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    app.form = None;
    app.input_mode = InputMode::Navigate;
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.create_thought(&draft) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Thoughts(gateway.list_thoughts()));
    });
}

fn submit_idea_form(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let title = form.title.trim().to_string();
    let description = textarea_value(&form.description).unwrap_or_default();
    let tags = parse_tags(&form.tags);
    let priority = form.priority;
    if title.is_empty() {
        app.toast("Title is required.");
        return;
    }
    let draft = IdeaDraft {
        title,
        description,
        tags,
        priority,
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    app.form = None;
    app.input_mode = InputMode::Navigate;
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.create_idea(&draft) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Ideas(gateway.list_ideas()));
    });
}

fn submit_project_form(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let name = form.title.trim().to_string();
    let description = textarea_value(&form.description);
    let color = PROJECT_COLORS[form.color_index % PROJECT_COLORS.len()].to_string();
    if name.is_empty() {
        app.toast("Name is required.");
        return;
    }
    let draft = ProjectDraft {
        name,
        description,
        color,
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    app.form = None;
    app.input_mode = InputMode::Navigate;
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.create_project(&draft) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Projects(gateway.list_projects()));
    });
}

fn submit_event_form(app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let title = form.title.trim().to_string();
    let description = textarea_value(&form.description);
    let event_type = form.event_type;
    let date_raw = form.due_date.clone();
    let time_raw = form.event_time.clone();

    if title.is_empty() {
        app.toast("Title is required.");
        return;
    }
    let event_date = match parse_due_date(&date_raw) {
        Ok(Some(date)) => date,
        Ok(None) => {
            app.toast("Event date is required (YYYY-MM-DD).");
            return;
        }
        Err(message) => {
            app.toast(message);
            return;
        }
    };
    let event_time = match parse_event_time(&time_raw) {
        Ok(time) => time,
        Err(message) => {
            app.toast(message);
            return;
        }
    };
    let draft = EventDraft {
        title,
        description,
        event_type,
        event_date,
        // Without a time the event covers the whole day.
        all_day: event_time.is_none(),
        event_time,
    };
    let Some(gateway) = gateway_handle(app) else {
        return;
    };
    app.form = None;
    app.input_mode = InputMode::Navigate;
    let tx = app.events_tx.clone();
    app.in_flight += 1;
    thread::spawn(move || {
        if let Err(err) = gateway.create_event(&draft) {
            let _ = tx.send(AppEvent::Notice(err.message()));
        }
        let _ = tx.send(AppEvent::Events(gateway.list_events()));
    });
}

fn textarea_value(textarea: &TextArea) -> Option<String> {
    let text = textarea.lines().join("\n");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| "Date must be YYYY-MM-DD.".to_string())
}

pub fn parse_event_time(input: &str) -> Result<Option<String>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let pattern = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").map_err(|e| e.to_string())?;
    if pattern.is_match(input) {
        Ok(Some(input.to_string()))
    } else {
        Err("Time must be HH:MM (24h).".to_string())
    }
}

// ---------------------------------------------------------------------------
// Filters, search, external service
// ---------------------------------------------------------------------------

pub fn cycle_filter(app: &mut App) {
    app.board.filter = app.board.filter.cycle();
    app.tasks_state.select(None);
    let label = app.board.filter.label();
    app.toast(format!("Filter: {label}"));
}

pub fn toggle_sort(app: &mut App) {
    app.board.sort_by_date = !app.board.sort_by_date;
    let label = if app.board.sort_by_date {
        "due date"
    } else {
        "priority"
    };
    app.toast(format!("Sorting by {label}"));
}

pub fn start_search(app: &mut App) {
    if !matches!(app.view, View::Thoughts | View::Ideas) {
        return;
    }
    app.search_input = app.search_query.clone().unwrap_or_default();
    app.input_mode = InputMode::Search;
}

pub fn submit_search(app: &mut App) {
    let query = app.search_input.trim().to_string();
    app.search_query = if query.is_empty() { None } else { Some(query) };
    app.input_mode = InputMode::Navigate;
    match app.view {
        View::Thoughts => app.thoughts_state.select(None),
        View::Ideas => app.ideas_state.select(None),
        _ => {}
    }
}

pub fn cancel_search(app: &mut App) {
    app.search_input.clear();
    app.search_query = None;
    app.input_mode = InputMode::Navigate;
}

/// Press g: connected toggles a sign-out, disconnected starts the browser
/// authorization flow and arms the loopback listener.
pub fn connect_google(app: &mut App) {
    if app.google_connected {
        sign_out_google(app);
        return;
    }
    match google::start_auth_flow(&app.config.google) {
        Ok(session) => {
            let display = session.display.clone();
            if open::that(&display.auth_url).is_err() {
                app.toast("Could not open a browser; use the URL shown.");
            }
            app.google_auth_receiver = Some(google::spawn_auth_listener(
                session,
                Arc::clone(&app.token_store),
            ));
            app.google_auth_display = Some(display);
            app.show_google_auth_popup = true;
        }
        Err(err) => app.toast(err.message()),
    }
}

pub fn sign_out_google(app: &mut App) {
    app.tasks_client.sign_out();
    app.google_connected = false;
    app.board.clear_external();
    app.toast("Google Tasks disconnected.");
}

pub fn open_lists_popup(app: &mut App) {
    if !app.google_connected {
        app.toast("Google Tasks is not connected. Press g to sign in.");
        return;
    }
    if app.board.task_lists.is_empty() {
        refresh_task_lists(app);
    }
    let current = app
        .board
        .selected_list
        .as_deref()
        .and_then(|id| app.board.task_lists.iter().position(|l| l.id == id));
    app.lists_state.select(current.or(Some(0)));
    app.show_lists_popup = true;
}

pub fn choose_list(app: &mut App) {
    let Some(index) = app.lists_state.selected() else {
        return;
    };
    let Some(list_id) = app.board.task_lists.get(index).map(|l| l.id.clone()) else {
        return;
    };
    app.show_lists_popup = false;
    app.board.select_list(&list_id);
    refresh_external_list(app, list_id);
}

pub fn task_destination_label(app: &App, form: &FormState) -> String {
    if form.to_google {
        match app.board.selected_list_title() {
            Some(title) => format!("Google Tasks ({title})"),
            None => "Google Tasks (no list selected)".to_string(),
        }
    } else {
        "NEXUS".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_date_parsing_accepts_blank_and_valid_dates() {
        assert_eq!(parse_due_date(""), Ok(None));
        assert_eq!(parse_due_date("  "), Ok(None));
        assert_eq!(
            parse_due_date("2024-02-01"),
            Ok(NaiveDate::from_ymd_opt(2024, 2, 1))
        );
        assert!(parse_due_date("02/01/2024").is_err());
        assert!(parse_due_date("2024-13-01").is_err());
    }

    #[test]
    fn event_time_parsing_enforces_24h_clock() {
        assert_eq!(parse_event_time(""), Ok(None));
        assert_eq!(parse_event_time("09:30"), Ok(Some("09:30".to_string())));
        assert_eq!(parse_event_time("23:59"), Ok(Some("23:59".to_string())));
        assert!(parse_event_time("24:00").is_err());
        assert!(parse_event_time("9:30").is_err());
    }

    #[test]
    fn tags_split_on_commas_and_drop_blanks() {
        assert_eq!(
            parse_tags("rust, tui,,  ideas "),
            vec!["rust", "tui", "ideas"]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn textarea_value_trims_to_none() {
        let empty = TextArea::default();
        assert_eq!(textarea_value(&empty), None);

        let filled = TextArea::from(["first", "second"]);
        assert_eq!(textarea_value(&filled).as_deref(), Some("first\nsecond"));
    }
}
