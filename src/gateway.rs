use crate::config::GatewayConfig;
use crate::models::{
    CalendarEvent, EventType, Idea, Origin, Priority, Project, Task, TaskStatus, Thought,
};
use crate::session::GatewaySession;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Missing or expired gateway credentials.
    Unauthenticated,
    /// Non-2xx from the gateway; carries the operation and upstream detail.
    Rejected {
        op: String,
        status: u16,
        detail: String,
    },
    Config(String),
    Request(String),
}

impl GatewayError {
    pub fn message(&self) -> String {
        match self {
            GatewayError::Unauthenticated => {
                "Not signed in to NEXUS. Check gateway credentials.".to_string()
            }
            GatewayError::Rejected { op, status, detail } => {
                format!("{op} failed: HTTP {status}: {detail}")
            }
            GatewayError::Config(msg) => msg.clone(),
            GatewayError::Request(msg) => msg.clone(),
        }
    }
}

#[derive(Deserialize)]
struct SignInResponse {
    access_token: String,
    user: SignInUser,
}

#[derive(Deserialize)]
struct SignInUser {
    id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: Priority,
    due_date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    project_id: Option<String>,
}

impl TaskRow {
    fn into_task(self) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            project_id: self.project_id,
            origin: Origin::Local,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub project_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ThoughtDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub priority: Priority,
}

#[derive(Clone, Debug)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

#[derive(Clone, Debug)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub event_time: Option<String>,
    pub all_day: bool,
}

/// Blocking client over the gateway's auth and table endpoints. All reads are
/// filtered to the signed-in user, all writes set `user_id`.
pub struct GatewayClient {
    config: GatewayConfig,
    session: GatewaySession,
    http: Client,
}

pub fn sign_in(
    config: &GatewayConfig,
    email: &str,
    password: &str,
) -> Result<GatewaySession, GatewayError> {
    if config.base_url.trim().is_empty() || config.anon_key.trim().is_empty() {
        return Err(GatewayError::Config(
            "Set gateway.base_url and gateway.anon_key in config.toml.".to_string(),
        ));
    }

    let url = format!("{}/auth/v1/token?grant_type=password", config.base_url);
    let resp = build_http(config.timeout_seconds)?
        .post(url)
        .header("apikey", config.anon_key.as_str())
        .json(&json!({ "email": email, "password": password }))
        .send()
        .map_err(|e| GatewayError::Request(e.to_string()))?;

    let status = resp.status();
    if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthenticated);
    }
    if !status.is_success() {
        return Err(rejected("Sign-in", status, resp));
    }

    let body: SignInResponse = resp
        .json()
        .map_err(|e| GatewayError::Request(e.to_string()))?;
    Ok(GatewaySession {
        user_id: body.user.id,
        access_token: body.access_token,
        email: body.user.email,
    })
}

fn build_http(timeout_seconds: u64) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.max(5)))
        .build()
        .map_err(|e| GatewayError::Request(format!("Failed to create HTTP client: {e}")))
}

fn rejected(op: &str, status: reqwest::StatusCode, resp: reqwest::blocking::Response) -> GatewayError {
    let detail = resp.text().unwrap_or_default();
    GatewayError::Rejected {
        op: op.to_string(),
        status: status.as_u16(),
        detail: truncate_detail(&detail),
    }
}

fn truncate_detail(message: &str) -> String {
    let mut out = message.replace(['\n', '\r'], " ").trim().to_string();
    if out.len() > 240 {
        out.truncate(240);
        out.push_str("...");
    }
    out
}

/// Writes must carry the caller's own user id; the gateway enforces row
/// ownership server-side but never receives an unscoped payload from us.
fn scoped_body(mut body: Value, user_id: &str) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.insert("user_id".to_string(), Value::String(user_id.to_string()));
    }
    body
}

impl GatewayClient {
    pub fn new(config: GatewayConfig, session: GatewaySession) -> Result<Self, GatewayError> {
        let http = build_http(config.timeout_seconds)?;
        Ok(Self {
            config,
            session,
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn select<T: DeserializeOwned>(
        &self,
        op: &str,
        table: &str,
        order: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let user_filter = format!("eq.{}", self.session.user_id);
        let resp = self
            .http
            .get(self.table_url(table))
            .header("apikey", self.config.anon_key.as_str())
            .bearer_auth(&self.session.access_token)
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", order),
            ])
            .send()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(rejected(op, status, resp));
        }
        resp.json().map_err(|e| GatewayError::Request(e.to_string()))
    }

    fn insert(&self, op: &str, table: &str, body: Value) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(self.table_url(table))
            .header("apikey", self.config.anon_key.as_str())
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.session.access_token)
            .json(&scoped_body(body, &self.session.user_id))
            .send()
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        self.check_write(op, resp)
    }

    fn update(&self, op: &str, table: &str, id: &str, body: Value) -> Result<(), GatewayError> {
        let resp = self
            .http
            .patch(self.table_url(table))
            .header("apikey", self.config.anon_key.as_str())
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.session.access_token)
            .query(&[
                ("id", &format!("eq.{id}")),
                ("user_id", &format!("eq.{}", self.session.user_id)),
            ])
            .json(&scoped_body(body, &self.session.user_id))
            .send()
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        self.check_write(op, resp)
    }

    fn delete(&self, op: &str, table: &str, id: &str) -> Result<(), GatewayError> {
        let resp = self
            .http
            .delete(self.table_url(table))
            .header("apikey", self.config.anon_key.as_str())
            .bearer_auth(&self.session.access_token)
            .query(&[
                ("id", &format!("eq.{id}")),
                ("user_id", &format!("eq.{}", self.session.user_id)),
            ])
            .send()
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        self.check_write(op, resp)
    }

    fn check_write(
        &self,
        op: &str,
        resp: reqwest::blocking::Response,
    ) -> Result<(), GatewayError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(rejected(op, status, resp));
        }
        Ok(())
    }

    // -- tasks --------------------------------------------------------------

    pub fn list_tasks(&self) -> Result<Vec<Task>, GatewayError> {
        let rows: Vec<TaskRow> = self.select("Task list", "tasks", "created_at.desc")?;
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    pub fn create_task(&self, draft: &TaskDraft) -> Result<(), GatewayError> {
        self.insert("Task create", "tasks", task_body(draft))
    }

    pub fn update_task(&self, id: &str, draft: &TaskDraft) -> Result<(), GatewayError> {
        self.update("Task update", "tasks", id, task_body(draft))
    }

    pub fn set_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), GatewayError> {
        let body = json!({
            "status": status,
            "completed_at": completed_at.map(|t| t.to_rfc3339()),
        });
        self.update("Task update", "tasks", id, body)
    }

    pub fn delete_task(&self, id: &str) -> Result<(), GatewayError> {
        self.delete("Task delete", "tasks", id)
    }

    // -- thoughts -----------------------------------------------------------

    pub fn list_thoughts(&self) -> Result<Vec<Thought>, GatewayError> {
        self.select("Thought list", "thoughts", "created_at.desc")
    }

    pub fn create_thought(&self, draft: &ThoughtDraft) -> Result<(), GatewayError> {
        let body = json!({
            "title": draft.title,
            "content": draft.content,
            "tags": draft.tags,
        });
        self.insert("Thought create", "thoughts", body)
    }

    pub fn delete_thought(&self, id: &str) -> Result<(), GatewayError> {
        self.delete("Thought delete", "thoughts", id)
    }

    // -- ideas --------------------------------------------------------------

    pub fn list_ideas(&self) -> Result<Vec<Idea>, GatewayError> {
        self.select("Idea list", "project_ideas", "created_at.desc")
    }

    pub fn create_idea(&self, draft: &IdeaDraft) -> Result<(), GatewayError> {
        let body = json!({
            "title": draft.title,
            "description": draft.description,
            "tags": draft.tags,
            "priority": draft.priority,
        });
        self.insert("Idea create", "project_ideas", body)
    }

    pub fn delete_idea(&self, id: &str) -> Result<(), GatewayError> {
        self.delete("Idea delete", "project_ideas", id)
    }

    // -- projects -----------------------------------------------------------

    pub fn list_projects(&self) -> Result<Vec<Project>, GatewayError> {
        self.select("Project list", "projects", "created_at.desc")
    }

    pub fn create_project(&self, draft: &ProjectDraft) -> Result<(), GatewayError> {
        let body = json!({
            "name": draft.name,
            "description": draft.description,
            "color": draft.color,
        });
        self.insert("Project create", "projects", body)
    }

    pub fn delete_project(&self, id: &str) -> Result<(), GatewayError> {
        self.delete("Project delete", "projects", id)
    }

    // -- calendar events ----------------------------------------------------

    pub fn list_events(&self) -> Result<Vec<CalendarEvent>, GatewayError> {
        self.select("Event list", "calendar_events", "event_date.asc")
    }

    pub fn create_event(&self, draft: &EventDraft) -> Result<(), GatewayError> {
        let body = json!({
            "title": draft.title,
            "description": draft.description,
            "event_type": draft.event_type,
            "event_date": draft.event_date.format("%Y-%m-%d").to_string(),
            "event_time": draft.event_time,
            "all_day": draft.all_day,
        });
        self.insert("Event create", "calendar_events", body)
    }

    pub fn delete_event(&self, id: &str) -> Result<(), GatewayError> {
        self.delete("Event delete", "calendar_events", id)
    }
}

fn task_body(draft: &TaskDraft) -> Value {
    json!({
        "title": draft.title,
        "description": draft.description,
        "priority": draft.priority,
        "due_date": draft.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        "project_id": draft.project_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_body_sets_caller_user_id() {
        let body = scoped_body(json!({ "title": "t" }), "user-1");
        assert_eq!(body["user_id"], "user-1");
        assert_eq!(body["title"], "t");
    }

    #[test]
    fn scoped_body_overwrites_foreign_user_id() {
        let body = scoped_body(json!({ "user_id": "someone-else" }), "user-1");
        assert_eq!(body["user_id"], "user-1");
    }

    #[test]
    fn task_body_formats_due_date_as_calendar_date() {
        let draft = TaskDraft {
            title: "Ship".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            ..TaskDraft::default()
        };
        let body = task_body(&draft);
        assert_eq!(body["due_date"], "2024-01-05");
        assert_eq!(body["priority"], "medium");
    }

    #[test]
    fn rejected_error_carries_operation_and_status() {
        let err = GatewayError::Rejected {
            op: "Task create".to_string(),
            status: 409,
            detail: "duplicate key".to_string(),
        };
        assert_eq!(err.message(), "Task create failed: HTTP 409: duplicate key");
    }

    #[test]
    fn task_row_maps_to_local_origin() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "a",
            "title": "Ship",
            "description": null,
            "status": "pending",
            "priority": "urgent",
            "due_date": "2024-02-01",
            "created_at": "2024-01-01T10:00:00Z",
            "updated_at": null,
            "project_id": null,
            "user_id": "user-1"
        }))
        .expect("row");
        let task = row.into_task();
        assert_eq!(task.origin, Origin::Local);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }
}
