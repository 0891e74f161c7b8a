use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
};

use crate::app::App;
use crate::models::{InputMode, Priority, TaskStatus, View};

pub mod color_parser;
pub mod components;
pub mod popups;

use components::{ThemeTokens, priority_tag, status_marker};

pub fn ui(f: &mut Frame, app: &mut App) {
    let tokens = ThemeTokens::from_theme(&app.config.theme);

    let show_search = app.input_mode == InputMode::Search;
    let constraints: Vec<Constraint> = if show_search {
        vec![
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ]
    } else {
        vec![
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ]
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());
    let tabs_area = chunks[0];
    let main_area = chunks[1];
    let (search_area, status_area) = if show_search {
        (Some(chunks[2]), chunks[3])
    } else {
        (None, chunks[2])
    };

    render_tabs(f, app, &tokens, tabs_area);
    match app.view {
        View::Tasks => render_tasks(f, app, &tokens, main_area),
        View::Thoughts => render_thoughts(f, app, &tokens, main_area),
        View::Ideas => render_ideas(f, app, &tokens, main_area),
        View::Projects => render_projects(f, app, &tokens, main_area),
        View::Calendar => render_events(f, app, &tokens, main_area),
    }
    if let Some(area) = search_area {
        render_search_bar(f, app, &tokens, area);
    }
    render_status_bar(f, app, &tokens, status_area);

    if app.form.is_some() && app.input_mode == InputMode::Editing {
        popups::render_form_popup(f, app, &tokens);
    }
    if app.show_lists_popup {
        popups::render_lists_popup(f, app, &tokens);
    }
    if app.show_google_auth_popup {
        popups::render_google_auth_popup(f, app, &tokens);
    }
    if app.show_help_popup {
        popups::render_help_popup(f, &tokens);
    }
}

fn render_tabs(f: &mut Frame, app: &App, tokens: &ThemeTokens, area: Rect) {
    let views = View::all();
    let titles: Vec<Line> = views.iter().map(|v| Line::from(v.title())).collect();
    let selected = views.iter().position(|v| *v == app.view).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(tokens.accent)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");
    f.render_widget(tabs, area);
}

fn render_tasks(f: &mut Frame, app: &mut App, tokens: &ThemeTokens, area: Rect) {
    let today = Local::now().date_naive();
    let mut items: Vec<ListItem> = Vec::new();
    for task in app.board.visible_tasks() {
        let done = task.status == TaskStatus::Completed;
        let marker_style = if done {
            Style::default().fg(tokens.task_done)
        } else {
            Style::default()
        };
        let priority_style = if task.priority == Priority::Urgent {
            Style::default()
                .fg(tokens.task_urgent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(tokens.tag)
        };
        let title_style = if done {
            Style::default()
                .fg(tokens.task_done)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default()
        };

        let mut spans = vec![
            Span::styled(format!("{} ", status_marker(task.status)), marker_style),
            Span::styled(format!("{} ", priority_tag(task.priority)), priority_style),
            Span::styled(task.title.clone(), title_style),
        ];
        if let Some(due) = task.due_date {
            let due_style = if !done && due <= today {
                Style::default().fg(tokens.task_urgent)
            } else {
                Style::default().fg(tokens.timestamp)
            };
            spans.push(Span::styled(format!("  due {due}"), due_style));
        }
        if let Some(name) = app.project_name(task.project_id.as_deref()) {
            spans.push(Span::styled(
                format!("  @{name}"),
                Style::default().fg(tokens.accent),
            ));
        }
        if task.origin.is_external() {
            spans.push(Span::styled("  [G]", Style::default().fg(tokens.tag)));
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    let sort_label = if app.board.sort_by_date {
        "due date"
    } else {
        "priority"
    };
    let google_label = if app.google_connected {
        match app.board.selected_list_title() {
            Some(title) => format!("Google: {title}"),
            None => "Google: connected".to_string(),
        }
    } else {
        "Google: off".to_string()
    };
    let title = format!(
        " Tasks · {} · sort: {} · {} ",
        app.board.filter.label(),
        sort_label,
        google_label
    );

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.tasks_state);
}

fn render_thoughts(f: &mut Frame, app: &mut App, tokens: &ThemeTokens, area: Rect) {
    let wrap_width = area.width.saturating_sub(4).max(20) as usize;
    let mut items: Vec<ListItem> = Vec::new();
    for thought in app.visible_thoughts() {
        let mut spans = vec![Span::styled(
            thought.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for tag in &thought.tags {
            spans.push(Span::styled(
                format!("  #{tag}"),
                Style::default().fg(tokens.tag),
            ));
        }
        if let Some(created) = thought.created_at {
            spans.push(Span::styled(
                format!("  {}", created.format("%Y-%m-%d")),
                Style::default().fg(tokens.timestamp),
            ));
        }
        let mut lines = vec![Line::from(spans)];
        if let Some(first) = textwrap::wrap(&thought.content, wrap_width).first() {
            lines.push(Line::from(Span::styled(
                format!("    {first}"),
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
        items.push(ListItem::new(lines));
    }

    let title = match app.search_query.as_deref() {
        Some(query) => format!(" Thoughts · search: {query} "),
        None => " Thoughts ".to_string(),
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.thoughts_state);
}

fn render_ideas(f: &mut Frame, app: &mut App, tokens: &ThemeTokens, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();
    for idea in app.visible_ideas() {
        let priority_style = if idea.priority == Priority::Urgent {
            Style::default()
                .fg(tokens.task_urgent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(tokens.tag)
        };
        let mut spans = vec![
            Span::styled(format!("[{}] ", idea.priority.as_str()), priority_style),
            Span::styled(
                idea.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        for tag in &idea.tags {
            spans.push(Span::styled(
                format!("  #{tag}"),
                Style::default().fg(tokens.tag),
            ));
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    let title = match app.search_query.as_deref() {
        Some(query) => format!(" Ideas · search: {query} "),
        None => " Ideas ".to_string(),
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.ideas_state);
}

fn render_projects(f: &mut Frame, app: &mut App, tokens: &ThemeTokens, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();
    for project in &app.projects {
        let swatch = Style::default().fg(color_parser::parse_color(&project.color));
        let mut spans = vec![
            Span::styled("■ ", swatch),
            Span::styled(
                project.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        if let Some(description) = project.description.as_deref() {
            spans.push(Span::styled(
                format!("  {description}"),
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Projects ")
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.projects_state);
}

fn render_events(f: &mut Frame, app: &mut App, tokens: &ThemeTokens, area: Rect) {
    let today = Local::now().date_naive();
    let mut items: Vec<ListItem> = Vec::new();
    for event in &app.events {
        let date_style = if event.event_date == today {
            Style::default()
                .fg(tokens.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(tokens.timestamp)
        };
        let time_label = if event.all_day {
            "all day".to_string()
        } else {
            event.event_time.clone().unwrap_or_default()
        };
        let spans = vec![
            Span::styled(format!("{} ", event.event_date), date_style),
            Span::styled(
                format!("{:<7} ", time_label),
                Style::default().fg(tokens.timestamp),
            ),
            Span::styled(
                format!("[{}] ", event.event_type.as_str()),
                Style::default().fg(tokens.tag),
            ),
            Span::raw(event.title.clone()),
        ];
        items.push(ListItem::new(Line::from(spans)));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Calendar ")
                .border_style(Style::default().fg(tokens.border_default)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.events_state);
}

fn render_search_bar(f: &mut Frame, app: &App, tokens: &ThemeTokens, area: Rect) {
    let paragraph = Paragraph::new(format!("{}_", app.search_input)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Search ")
            .border_style(Style::default().fg(tokens.border_search)),
    );
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, app: &App, tokens: &ThemeTokens, area: Rect) {
    let left = match (&app.toast_message, &app.input_mode) {
        (Some(message), _) => Span::styled(message.clone(), Style::default().fg(tokens.accent)),
        (None, InputMode::Editing) => {
            Span::raw("shift+enter save · tab next field · esc cancel")
        }
        (None, InputMode::Search) => Span::raw("enter search · esc clear"),
        (None, InputMode::Navigate) => Span::raw(
            "n new · space toggle · e edit · d delete · f filter · s sort · S sync · g google · l lists · ? help · q quit",
        ),
    };

    let busy = if app.in_flight > 0 { " ~" } else { "" };
    let right_text = format!("{} due{busy}", app.due_now_count());
    let right_width = right_text.len() as u16 + 1;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);

    f.render_widget(Paragraph::new(Line::from(left)), chunks[0]);
    f.render_widget(
        Paragraph::new(Span::styled(
            right_text,
            Style::default().fg(tokens.timestamp),
        )),
        chunks[1],
    );
}
