use crate::{actions, app::App, config::key_match};
use crossterm::event::{KeyCode, KeyEvent};

pub fn handle_popup_events(app: &mut App, key: KeyEvent) -> bool {
    if app.show_google_auth_popup {
        handle_google_auth_popup(app, key);
        return true;
    }
    if app.show_lists_popup {
        handle_lists_popup(app, key);
        return true;
    }
    if app.show_help_popup {
        if key.code == KeyCode::Esc || key_match(&key, &app.config.keybindings.global.help) {
            app.show_help_popup = false;
        }
        return true;
    }
    false
}

/// Enter reopens the browser; Esc hides the popup but leaves the loopback
/// listener armed, so finishing in the browser still connects.
fn handle_google_auth_popup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if let Some(display) = app.google_auth_display.as_ref()
                && open::that(&display.auth_url).is_err()
            {
                app.toast("Could not open a browser; use the URL shown.");
            }
        }
        KeyCode::Esc => {
            app.show_google_auth_popup = false;
        }
        _ => {}
    }
}

fn handle_lists_popup(app: &mut App, key: KeyEvent) {
    let len = app.board.task_lists.len();
    if key.code == KeyCode::Esc {
        app.show_lists_popup = false;
        return;
    }
    if key.code == KeyCode::Enter {
        actions::choose_list(app);
        return;
    }
    if len == 0 {
        return;
    }
    if key_match(&key, &app.config.keybindings.list.up) || key.code == KeyCode::Up {
        let next = match app.lists_state.selected() {
            Some(0) | None => 0,
            Some(i) => i - 1,
        };
        app.lists_state.select(Some(next));
    } else if key_match(&key, &app.config.keybindings.list.down) || key.code == KeyCode::Down {
        let next = match app.lists_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        app.lists_state.select(Some(next));
    }
}
