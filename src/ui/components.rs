use crate::config::Theme;
use crate::models::{Priority, TaskStatus};
use crate::ui::color_parser::parse_color;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use unicode_width::UnicodeWidthStr;

/// Theme strings resolved to colors once per frame.
pub struct ThemeTokens {
    pub border_default: Color,
    pub border_editing: Color,
    pub border_search: Color,
    pub accent: Color,
    pub task_done: Color,
    pub task_urgent: Color,
    pub tag: Color,
    pub timestamp: Color,
}

impl ThemeTokens {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            border_default: parse_color(&theme.border_default),
            border_editing: parse_color(&theme.border_editing),
            border_search: parse_color(&theme.border_search),
            accent: parse_color(&theme.accent),
            task_done: parse_color(&theme.task_done),
            task_urgent: parse_color(&theme.task_urgent),
            tag: parse_color(&theme.tag),
            timestamp: parse_color(&theme.timestamp),
        }
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

pub fn priority_tag(priority: Priority) -> &'static str {
    match priority {
        Priority::Urgent => "!!",
        Priority::High => " !",
        Priority::Medium => "  ",
        Priority::Low => " .",
    }
}

/// Pads with spaces to a display width, wide glyphs included.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    let mut out = text.to_string();
    for _ in current..width {
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_cover_every_status() {
        assert_eq!(status_marker(TaskStatus::Pending), "[ ]");
        assert_eq!(status_marker(TaskStatus::InProgress), "[~]");
        assert_eq!(status_marker(TaskStatus::Completed), "[x]");
    }

    #[test]
    fn padding_accounts_for_wide_glyphs() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        // One CJK glyph occupies two cells.
        assert_eq!(pad_to_width("日", 4), "日  ");
        assert_eq!(pad_to_width("abcd", 2), "abcd");
    }
}
