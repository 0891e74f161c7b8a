use crate::app::{App, FormKind, FormState, PROJECT_COLORS};
use crate::models::{EventType, InputMode, Priority};
use crate::{actions, config::key_match};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What the focused form field holds. The indices here define the tab order
/// and must stay in step with the form rendering.
pub(crate) enum Field {
    Title,
    Description,
    Priority,
    DueDate,
    Project,
    Destination,
    Tags,
    Color,
    EventType,
    EventTime,
    Email,
    Password,
}

pub(crate) fn field_for(kind: FormKind, index: usize) -> Field {
    match kind {
        FormKind::SignIn => match index {
            0 => Field::Email,
            _ => Field::Password,
        },
        FormKind::Task => match index {
            0 => Field::Title,
            1 => Field::Description,
            2 => Field::Priority,
            3 => Field::DueDate,
            4 => Field::Project,
            _ => Field::Destination,
        },
        FormKind::Thought => match index {
            0 => Field::Title,
            1 => Field::Description,
            _ => Field::Tags,
        },
        FormKind::Idea => match index {
            0 => Field::Title,
            1 => Field::Description,
            2 => Field::Tags,
            _ => Field::Priority,
        },
        FormKind::Project => match index {
            0 => Field::Title,
            1 => Field::Description,
            _ => Field::Color,
        },
        FormKind::Event => match index {
            0 => Field::Title,
            1 => Field::Description,
            2 => Field::EventType,
            3 => Field::DueDate,
            _ => Field::EventTime,
        },
    }
}

pub fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if app.form.is_none() {
        app.input_mode = InputMode::Navigate;
        return;
    }
    let bindings = app.config.keybindings.form.clone();

    if key_match(&key, &bindings.cancel) {
        actions::cancel_form(app);
        return;
    }
    if key_match(&key, &bindings.submit) {
        actions::submit_form(app);
        return;
    }
    if key_match(&key, &bindings.next_field) {
        if let Some(form) = app.form.as_mut() {
            form.next_field();
        }
        return;
    }
    if key_match(&key, &bindings.prev_field) {
        if let Some(form) = app.form.as_mut() {
            form.prev_field();
        }
        return;
    }

    let projects_len = app.projects.len();
    let Some(form) = app.form.as_mut() else {
        return;
    };

    match field_for(form.kind, form.field) {
        Field::Description => {
            form.description.input(key);
        }
        Field::Title => edit_text_slot(form, key, |f| &mut f.title),
        Field::DueDate => edit_text_slot(form, key, |f| &mut f.due_date),
        Field::Tags => edit_text_slot(form, key, |f| &mut f.tags),
        Field::EventTime => edit_text_slot(form, key, |f| &mut f.event_time),
        Field::Email => edit_text_slot(form, key, |f| &mut f.email),
        Field::Password => edit_text_slot(form, key, |f| &mut f.password),
        Field::Priority => {
            if let Some(step) = cycle_step(&key) {
                form.priority = cycle_priority(form.priority, step);
            } else {
                advance_on_enter(form, key);
            }
        }
        Field::Project => {
            if let Some(step) = cycle_step(&key) {
                form.project_index = cycle_index(form.project_index, projects_len + 1, step);
            } else {
                advance_on_enter(form, key);
            }
        }
        Field::Destination => {
            if cycle_step(&key).is_some() {
                form.to_google = !form.to_google;
            } else {
                advance_on_enter(form, key);
            }
        }
        Field::EventType => {
            if let Some(step) = cycle_step(&key) {
                form.event_type = cycle_event_type(form.event_type, step);
            } else {
                advance_on_enter(form, key);
            }
        }
        Field::Color => {
            if let Some(step) = cycle_step(&key) {
                form.color_index = cycle_index(form.color_index, PROJECT_COLORS.len(), step);
            } else {
                advance_on_enter(form, key);
            }
        }
    }
}

fn edit_text_slot(form: &mut FormState, key: KeyEvent, slot: fn(&mut FormState) -> &mut String) {
    match key.code {
        KeyCode::Enter => form.next_field(),
        KeyCode::Backspace => {
            slot(form).pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            slot(form).push(c);
        }
        _ => {}
    }
}

fn advance_on_enter(form: &mut FormState, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        form.next_field();
    }
}

/// Left steps back, right/space step forward; anything else is not a cycle.
fn cycle_step(key: &KeyEvent) -> Option<i32> {
    match key.code {
        KeyCode::Left => Some(-1),
        KeyCode::Right | KeyCode::Char(' ') => Some(1),
        _ => None,
    }
}

fn cycle_index(current: usize, len: usize, step: i32) -> usize {
    if len == 0 {
        return 0;
    }
    (current as i32 + step).rem_euclid(len as i32) as usize
}

fn cycle_priority(current: Priority, step: i32) -> Priority {
    let order = Priority::all();
    let index = order.iter().position(|p| *p == current).unwrap_or(0);
    order[cycle_index(index, order.len(), step)]
}

fn cycle_event_type(current: EventType, step: i32) -> EventType {
    let order = EventType::all();
    let index = order.iter().position(|t| *t == current).unwrap_or(0);
    order[cycle_index(index, order.len(), step)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_index_wraps_both_ways() {
        assert_eq!(cycle_index(0, 3, -1), 2);
        assert_eq!(cycle_index(2, 3, 1), 0);
        assert_eq!(cycle_index(1, 3, 1), 2);
        assert_eq!(cycle_index(0, 0, 1), 0);
    }

    #[test]
    fn priority_cycles_through_all_levels() {
        let mut priority = Priority::Low;
        for _ in 0..Priority::all().len() {
            priority = cycle_priority(priority, 1);
        }
        assert_eq!(priority, Priority::Low);
    }
}
