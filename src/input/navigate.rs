use crate::{actions, app::App, config::key_match, models::View};
use crossterm::event::KeyEvent;

pub fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let bindings = app.config.keybindings.clone();

    if key_match(&key, &bindings.global.help) {
        app.show_help_popup = true;
    } else if key_match(&key, &bindings.global.quit) {
        app.should_quit = true;
    } else if key_match(&key, &bindings.global.next_view) {
        app.next_view();
    } else if key_match(&key, &bindings.global.prev_view) {
        app.prev_view();
    } else if key_match(&key, &bindings.global.new_item) {
        actions::open_new_form(app);
    } else if key_match(&key, &bindings.global.refresh) {
        actions::refresh_all(app);
    } else if key_match(&key, &bindings.global.search) {
        actions::start_search(app);
    } else if key_match(&key, &bindings.global.google_connect) {
        actions::connect_google(app);
    } else if key_match(&key, &bindings.global.google_lists) {
        actions::open_lists_popup(app);
    } else if key_match(&key, &bindings.list.up) {
        app.scroll_up();
    } else if key_match(&key, &bindings.list.down) {
        app.scroll_down();
    } else if key_match(&key, &bindings.list.delete) {
        actions::delete_selected(app);
    } else if app.view == View::Tasks {
        // `sync` is shift+s; it must be tried before the plain `s` sort key.
        if key_match(&key, &bindings.list.sync) {
            actions::sync_tasks(app);
        } else if key_match(&key, &bindings.list.toggle) {
            actions::toggle_selected(app);
        } else if key_match(&key, &bindings.list.edit) {
            actions::edit_selected(app);
        } else if key_match(&key, &bindings.list.filter) {
            actions::cycle_filter(app);
        } else if key_match(&key, &bindings.list.sort) {
            actions::toggle_sort(app);
        }
    }
}
