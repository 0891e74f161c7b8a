use crate::{actions, app::App, config::key_match};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub fn handle_search_mode(app: &mut App, key: KeyEvent) {
    if key_match(&key, &app.config.keybindings.form.cancel) {
        actions::cancel_search(app);
    } else if key.code == KeyCode::Enter {
        actions::submit_search(app);
    } else {
        match key.code {
            KeyCode::Backspace => {
                app.search_input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.search_input.push(c);
            }
            _ => {}
        }
    }
}
