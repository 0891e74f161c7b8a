use crate::actions;
use crate::app::{App, AppEvent};
use crate::config::config_path;
use crate::gateway::GatewayClient;
use crate::integrations::google::{AuthPollResult, TasksError};
use crate::models::InputMode;
use chrono::Local;
use std::sync::Arc;
use std::sync::mpsc::TryRecvError;

/// One scheduler pass per frame: drain worker outcomes, poll the OAuth
/// listener, expire the toast. Never blocks.
pub fn tick(app: &mut App) {
    drain_events(app);
    poll_google_auth(app);
    expire_toast(app);
}

fn drain_events(app: &mut App) {
    loop {
        let event = match app.events_rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        };
        handle_event(app, event);
    }
}

fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::SignedIn(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(session) => match GatewayClient::new(app.config.gateway.clone(), session.clone())
                {
                    Ok(client) => {
                        remember_email(app, &session.email);
                        app.toast(format!("Signed in as {}", session.email));
                        app.session = Some(session);
                        app.gateway = Some(Arc::new(client));
                        app.form = None;
                        app.input_mode = InputMode::Navigate;
                        actions::refresh_all(app);
                    }
                    Err(err) => app.toast(err.message()),
                },
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::LocalTasks(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(tasks) => app.board.apply_local(tasks),
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::ExternalTasks { list_id, result } => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(tasks) => {
                    // A response for a list that is no longer selected is
                    // stale and dropped.
                    app.board.apply_external(&list_id, tasks);
                }
                Err(TasksError::Unauthenticated) => external_auth_lost(app),
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::TaskLists(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(lists) => {
                    if let Some(list_id) = app.board.apply_task_lists(lists) {
                        actions::refresh_external_list(app, list_id);
                    }
                }
                Err(TasksError::Unauthenticated) => external_auth_lost(app),
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::Thoughts(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(thoughts) => app.thoughts = thoughts,
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::Ideas(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(ideas) => app.ideas = ideas,
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::Projects(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(projects) => app.projects = projects,
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::Events(result) => {
            app.in_flight = app.in_flight.saturating_sub(1);
            match result {
                Ok(events) => app.events = events,
                Err(err) => app.toast(err.message()),
            }
        }
        AppEvent::ExternalAuthLost => {
            app.in_flight = app.in_flight.saturating_sub(1);
            external_auth_lost(app);
        }
        AppEvent::Notice(message) => app.toast(message),
    }
}

/// The implicit-grant token cannot be refreshed; a 401 means the connection
/// is gone until the user signs in again.
fn external_auth_lost(app: &mut App) {
    if app.google_connected {
        app.google_connected = false;
        app.board.clear_external();
        app.toast("Google session expired. Press g to reconnect.");
    }
}

fn poll_google_auth(app: &mut App) {
    let poll = app.google_auth_receiver.as_ref().map(|rx| rx.try_recv());
    match poll {
        Some(Ok(AuthPollResult::Success)) => {
            close_auth_popup(app);
            app.google_connected = true;
            app.toast("Google Tasks connected.");
            actions::refresh_task_lists(app);
        }
        Some(Ok(AuthPollResult::Error(message))) => {
            close_auth_popup(app);
            app.toast(message);
        }
        Some(Err(TryRecvError::Disconnected)) => close_auth_popup(app),
        Some(Err(TryRecvError::Empty)) | None => {}
    }
}

fn close_auth_popup(app: &mut App) {
    app.google_auth_receiver = None;
    app.google_auth_display = None;
    app.show_google_auth_popup = false;
}

fn expire_toast(app: &mut App) {
    if let Some(expiry) = app.toast_expiry {
        if Local::now() >= expiry {
            app.toast_message = None;
            app.toast_expiry = None;
        }
    }
}

fn remember_email(app: &mut App, email: &str) {
    if !email.is_empty() && app.config.gateway.email != email {
        app.config.gateway.email = email.to_string();
        let _ = app.config.save_to_path(&config_path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{ExternalRef, Origin, Priority, Task, TaskListRef, TaskStatus};

    fn test_app() -> App {
        App::with_config(Config::default())
    }

    fn external_task(list_id: &str, task_id: &str) -> Task {
        Task {
            id: task_id.to_string(),
            title: task_id.to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
            created_at: None,
            updated_at: None,
            project_id: None,
            origin: Origin::External(ExternalRef {
                list_id: list_id.to_string(),
                task_id: task_id.to_string(),
            }),
        }
    }

    #[test]
    fn stale_external_fetch_does_not_overwrite_board() {
        let mut app = test_app();
        app.board.task_lists = vec![TaskListRef {
            id: "b".to_string(),
            title: "Errands".to_string(),
        }];
        app.board.selected_list = Some("b".to_string());

        handle_event(
            &mut app,
            AppEvent::ExternalTasks {
                list_id: "a".to_string(),
                result: Ok(vec![external_task("a", "t1")]),
            },
        );
        assert!(app.board.external_tasks.is_empty());

        handle_event(
            &mut app,
            AppEvent::ExternalTasks {
                list_id: "b".to_string(),
                result: Ok(vec![external_task("b", "t2")]),
            },
        );
        assert_eq!(app.board.external_tasks.len(), 1);
    }

    #[test]
    fn external_unauthenticated_disconnects_and_clears_board() {
        let mut app = test_app();
        app.google_connected = true;
        app.board.task_lists = vec![TaskListRef {
            id: "a".to_string(),
            title: "My Tasks".to_string(),
        }];
        app.board.selected_list = Some("a".to_string());
        app.board.external_tasks = vec![external_task("a", "t1")];

        handle_event(
            &mut app,
            AppEvent::ExternalTasks {
                list_id: "a".to_string(),
                result: Err(TasksError::Unauthenticated),
            },
        );
        assert!(!app.google_connected);
        assert!(app.board.external_tasks.is_empty());
        assert!(app.board.selected_list.is_none());
        assert!(app.toast_message.is_some());
    }

    #[test]
    fn notices_surface_as_toasts() {
        let mut app = test_app();
        handle_event(&mut app, AppEvent::Notice("Task create failed".to_string()));
        assert_eq!(app.toast_message.as_deref(), Some("Task create failed"));
    }

    #[test]
    fn failed_sign_in_keeps_the_form_open() {
        let mut app = test_app();
        handle_event(
            &mut app,
            AppEvent::SignedIn(Err(crate::gateway::GatewayError::Unauthenticated)),
        );
        assert!(app.form.is_some());
        assert!(app.gateway.is_none());
        assert!(app.toast_message.is_some());
    }

    #[test]
    fn toast_expires_after_deadline() {
        let mut app = test_app();
        app.toast("hello");
        app.toast_expiry = Some(Local::now() - chrono::Duration::seconds(1));
        expire_toast(&mut app);
        assert!(app.toast_message.is_none());
    }
}
