use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(PartialEq)]
pub enum InputMode {
    Navigate,
    Editing,
    Search,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Tasks,
    Thoughts,
    Ideas,
    Projects,
    Calendar,
}

impl View {
    pub fn all() -> Vec<View> {
        vec![
            View::Tasks,
            View::Thoughts,
            View::Ideas,
            View::Projects,
            View::Calendar,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Tasks => "Tasks",
            View::Thoughts => "Thoughts",
            View::Ideas => "Ideas",
            View::Projects => "Projects",
            View::Calendar => "Calendar",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Status filter for the task list. `All` keeps everything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusFilter {
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn cycle(&self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::Only(TaskStatus::Pending),
            StatusFilter::Only(TaskStatus::Pending) => {
                StatusFilter::Only(TaskStatus::InProgress)
            }
            StatusFilter::Only(TaskStatus::InProgress) => {
                StatusFilter::Only(TaskStatus::Completed)
            }
            StatusFilter::Only(TaskStatus::Completed) => StatusFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.label(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn all() -> Vec<Priority> {
        vec![
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Urgent,
        ]
    }

    /// Sort rank: urgent sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Identifies a task inside the external task service.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExternalRef {
    pub list_id: String,
    pub task_id: String,
}

/// Which backend owns a task. Mutations are routed on this tag alone;
/// an external task without its remote ids is unrepresentable.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Origin {
    Local,
    External(ExternalRef),
}

impl Origin {
    pub fn is_external(&self) -> bool {
        matches!(self, Origin::External(_))
    }
}

#[derive(Clone, Debug)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub project_id: Option<String>,
    pub origin: Origin,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Thought {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Priority,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Birthday,
    Meeting,
    Reminder,
    Personal,
    Work,
}

impl EventType {
    pub fn all() -> Vec<EventType> {
        vec![
            EventType::Personal,
            EventType::Work,
            EventType::Meeting,
            EventType::Reminder,
            EventType::Birthday,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Birthday => "birthday",
            EventType::Meeting => "meeting",
            EventType::Reminder => "reminder",
            EventType::Personal => "personal",
            EventType::Work => "work",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub event_time: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A task list in the external service, as returned by `users/@me/lists`.
#[derive(Clone, Debug, Deserialize)]
pub struct TaskListRef {
    pub id: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_urgent_first() {
        assert!(Priority::Urgent.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ] {
            let json = serde_json::to_string(&status).expect("serialize");
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: TaskStatus = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, status);
        }
    }

    #[test]
    fn filter_cycle_returns_to_all() {
        let mut filter = StatusFilter::All;
        for _ in 0..4 {
            filter = filter.cycle();
        }
        assert_eq!(filter, StatusFilter::All);
    }

    #[test]
    fn origin_tags_external_tasks() {
        assert!(!Origin::Local.is_external());
        assert!(
            Origin::External(ExternalRef {
                list_id: "list".to_string(),
                task_id: "task".to_string(),
            })
            .is_external()
        );
    }
}
