use crate::actions;
use crate::app::{App, FormKind, FormState, PROJECT_COLORS};
use crate::input::editing::{Field, field_for};
use crate::ui::components::{ThemeTokens, centered_rect, pad_to_width};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

pub fn render_help_popup(f: &mut Frame, tokens: &ThemeTokens) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);

    let rows = [
        ("tab / shift+tab", "switch view"),
        ("j / k, arrows", "move selection"),
        ("n", "new item in this view"),
        ("e", "edit selected task"),
        ("space", "toggle task done"),
        ("d", "delete selected item"),
        ("f", "cycle status filter"),
        ("s", "toggle sort (priority / due date)"),
        ("S", "re-sync task collections"),
        ("g", "connect or disconnect Google Tasks"),
        ("l", "pick a Google task list"),
        ("/", "search thoughts and ideas"),
        ("r", "refresh everything"),
        ("q / ctrl+q", "quit"),
    ];
    let mut lines: Vec<Line> = rows
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    pad_to_width(key, 18),
                    Style::default().fg(tokens.accent),
                ),
                Span::raw(*action),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Keys are configurable in config.toml.",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .border_style(Style::default().fg(tokens.border_default)),
    );
    f.render_widget(paragraph, area);
}

pub fn render_google_auth_popup(f: &mut Frame, app: &App, tokens: &ThemeTokens) {
    let area = centered_rect(70, 50, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from("Authorize access to Google Tasks in your browser."),
        Line::from(""),
    ];
    if let Some(display) = app.google_auth_display.as_ref() {
        let wrap_width = area.width.saturating_sub(4).max(20) as usize;
        for chunk in textwrap::wrap(&display.auth_url, wrap_width) {
            lines.push(Line::from(Span::styled(
                chunk.to_string(),
                Style::default().fg(tokens.accent),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Waiting on {} until {}.",
                display.listen_addr,
                display.expires_at.format("%H:%M")
            ),
            Style::default().fg(tokens.timestamp),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "enter reopen browser · esc hide",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Connect Google Tasks ")
            .border_style(Style::default().fg(tokens.border_editing)),
    );
    f.render_widget(paragraph, area);
}

pub fn render_lists_popup(f: &mut Frame, app: &mut App, tokens: &ThemeTokens) {
    let area = centered_rect(50, 50, f.area());
    f.render_widget(Clear, area);

    let selected_id = app.board.selected_list.clone();
    let items: Vec<ListItem> = app
        .board
        .task_lists
        .iter()
        .map(|list| {
            let marker = if selected_id.as_deref() == Some(list.id.as_str()) {
                "* "
            } else {
                "  "
            };
            ListItem::new(format!("{marker}{}", list.title))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Google task lists ")
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.lists_state);
}

pub fn render_form_popup(f: &mut Frame, app: &App, tokens: &ThemeTokens) {
    let Some(form) = app.form.as_ref() else {
        return;
    };
    let title = match (form.kind, form.editing.is_some()) {
        (FormKind::SignIn, _) => " Sign in to NEXUS ",
        (FormKind::Task, false) => " New task ",
        (FormKind::Task, true) => " Edit task ",
        (FormKind::Thought, _) => " New thought ",
        (FormKind::Idea, _) => " New idea ",
        (FormKind::Project, _) => " New project ",
        (FormKind::Event, _) => " New event ",
    };

    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(tokens.border_editing));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let field_count = form.field_count();
    let mut constraints: Vec<Constraint> = Vec::new();
    for index in 0..field_count {
        let height = match field_for(form.kind, index) {
            Field::Description => 5,
            _ => 1,
        };
        constraints.push(Constraint::Length(height));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for index in 0..field_count {
        let field = field_for(form.kind, index);
        let focused = form.field == index;
        let label_style = if focused {
            Style::default()
                .fg(tokens.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let row = rows[index];

        if matches!(field, Field::Description) {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(12), Constraint::Min(1)])
                .split(row);
            f.render_widget(
                Paragraph::new(Span::styled(
                    pad_to_width(field_label(&field), 12),
                    label_style,
                )),
                columns[0],
            );
            f.render_widget(&form.description, columns[1]);
            continue;
        }

        let mut value = field_value(app, form, &field);
        if focused && is_text_field(&field) {
            value.push('_');
        }
        let line = Line::from(vec![
            Span::styled(pad_to_width(field_label(&field), 12), label_style),
            Span::raw(value),
        ]);
        f.render_widget(Paragraph::new(line), row);
    }

    let hint = match form.kind {
        FormKind::SignIn => "shift+enter sign in · tab next field · esc cancel",
        _ => "shift+enter save · tab next field · left/right cycle · esc cancel",
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            hint,
            Style::default().add_modifier(Modifier::DIM),
        )),
        rows[field_count + 1],
    );
}

fn field_label(field: &Field) -> &'static str {
    match field {
        Field::Title => "Title",
        Field::Description => "Notes",
        Field::Priority => "Priority",
        Field::DueDate => "Date",
        Field::Project => "Project",
        Field::Destination => "Create in",
        Field::Tags => "Tags",
        Field::Color => "Color",
        Field::EventType => "Type",
        Field::EventTime => "Time",
        Field::Email => "Email",
        Field::Password => "Password",
    }
}

fn is_text_field(field: &Field) -> bool {
    matches!(
        field,
        Field::Title
            | Field::DueDate
            | Field::Tags
            | Field::EventTime
            | Field::Email
            | Field::Password
    )
}

fn field_value(app: &App, form: &FormState, field: &Field) -> String {
    match field {
        Field::Title => form.title.clone(),
        Field::Description => String::new(),
        Field::Priority => form.priority.as_str().to_string(),
        Field::DueDate => form.due_date.clone(),
        Field::Project => form
            .project_index
            .checked_sub(1)
            .and_then(|i| app.projects.get(i))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "(none)".to_string()),
        Field::Destination => actions::task_destination_label(app, form),
        Field::Tags => form.tags.clone(),
        Field::Color => PROJECT_COLORS[form.color_index % PROJECT_COLORS.len()].to_string(),
        Field::EventType => form.event_type.as_str().to_string(),
        Field::EventTime => form.event_time.clone(),
        Field::Email => form.email.clone(),
        Field::Password => "*".repeat(form.password.chars().count()),
    }
}
