use crate::config::GoogleConfig;
use crate::models::{ExternalRef, Origin, Priority, Task, TaskListRef, TaskStatus};
use crate::session::{StoredToken, TokenStore};
use chrono::{DateTime, Duration, Local, NaiveDate};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration as StdDuration;

const OAUTH_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";
const SCOPE: &str = "https://www.googleapis.com/auth/tasks";

/// Fixed opaque state sent with every authorization request and required back
/// on the callback. A missing or mismatched state is treated exactly like "no
/// token delivered".
const AUTH_STATE: &str = "nexus-gtasks-auth";

/// Google Tasks has no priority field. An urgent task smuggles its priority
/// through this literal prefix on the notes field; every other priority
/// level collapses to medium on the next fetch. Lossy, and kept that way.
pub const URGENT_MARKER: &str = "[URGENT]";

#[derive(Debug, Clone)]
pub enum TasksError {
    /// No stored token, or the service answered 401 and the token was cleared.
    Unauthenticated,
    Rejected {
        op: String,
        status: u16,
        detail: String,
    },
    Config(String),
    Request(String),
}

impl TasksError {
    pub fn message(&self) -> String {
        match self {
            TasksError::Unauthenticated => {
                "Google Tasks is not connected. Press g to sign in.".to_string()
            }
            TasksError::Rejected { op, status, detail } => {
                format!("{op} failed: HTTP {status}: {detail}")
            }
            TasksError::Config(msg) => msg.clone(),
            TasksError::Request(msg) => msg.clone(),
        }
    }
}

impl From<io::Error> for TasksError {
    fn from(err: io::Error) -> Self {
        TasksError::Request(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// OAuth implicit-grant flow
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct AuthDisplay {
    pub auth_url: String,
    pub listen_addr: String,
    pub expires_at: DateTime<Local>,
}

pub struct AuthSession {
    pub display: AuthDisplay,
    listener: TcpListener,
    redirect_uri: String,
    expires_at: DateTime<Local>,
}

#[derive(Clone, Debug)]
pub enum AuthPollResult {
    Success,
    Error(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallbackToken {
    pub access_token: String,
}

/// Parses a redirect URL carrying the implicit-grant response. The token is
/// delivered in the fragment, never the query string, and is only accepted
/// when the echoed state matches the fixed value we sent.
pub fn parse_callback(url: &str) -> Option<CallbackToken> {
    let fragment = url.split_once('#').map(|(_, f)| f)?;
    let params = parse_params(fragment);

    if params.get("state").map(String::as_str) != Some(AUTH_STATE) {
        return None;
    }
    let access_token = params.get("access_token")?;
    if access_token.is_empty() {
        return None;
    }
    Some(CallbackToken {
        access_token: access_token.clone(),
    })
}

pub fn authorize_url(client_id: &str, redirect_uri: &str) -> Result<String, TasksError> {
    let url = Url::parse_with_params(
        OAUTH_AUTH_URL,
        [
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "token"),
            ("scope", SCOPE),
            ("state", AUTH_STATE),
            ("prompt", "select_account"),
        ],
    )
    .map_err(|e| TasksError::Request(e.to_string()))?;
    Ok(url.to_string())
}

pub fn start_auth_flow(config: &GoogleConfig) -> Result<AuthSession, TasksError> {
    if !config.enabled {
        return Err(TasksError::Config(
            "Enable [google] in config.toml to connect Google Tasks.".to_string(),
        ));
    }
    if config.client_id.trim().is_empty() {
        return Err(TasksError::Config(
            "Google client_id required in config.toml".to_string(),
        ));
    }

    let listener = TcpListener::bind(("127.0.0.1", config.redirect_port))
        .map_err(|e| TasksError::Request(e.to_string()))?;
    let addr = listener
        .local_addr()
        .map_err(|e| TasksError::Request(e.to_string()))?;
    let redirect_uri = format!("http://{}", addr);
    let auth_url = authorize_url(&config.client_id, &redirect_uri)?;
    let expires_at = Local::now() + Duration::minutes(10);

    Ok(AuthSession {
        display: AuthDisplay {
            auth_url,
            listen_addr: addr.to_string(),
            expires_at,
        },
        listener,
        redirect_uri,
        expires_at,
    })
}

/// Waits for the browser redirect on a background thread and stores the token
/// on success. The implicit grant puts the token in the URL fragment, which
/// never reaches an HTTP server, so the first request is answered with a tiny
/// page that re-submits the fragment as a query to `/capture`; the handler
/// rebuilds the fragment form before handing it to `parse_callback`.
pub fn spawn_auth_listener(
    session: AuthSession,
    store: Arc<dyn TokenStore>,
) -> Receiver<AuthPollResult> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        if let Err(err) = session.listener.set_nonblocking(true) {
            let _ = tx.send(AuthPollResult::Error(err.to_string()));
            return;
        }

        loop {
            if Local::now() >= session.expires_at {
                let _ = tx.send(AuthPollResult::Error(
                    "Google auth expired. Please retry.".to_string(),
                ));
                return;
            }

            match session.listener.accept() {
                Ok((mut stream, _addr)) => {
                    match handle_redirect_request(&session, &mut stream, store.as_ref()) {
                        RedirectOutcome::Pending => {}
                        RedirectOutcome::Done => {
                            let _ = tx.send(AuthPollResult::Success);
                            return;
                        }
                        RedirectOutcome::Failed(message) => {
                            let _ = tx.send(AuthPollResult::Error(message));
                            return;
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(StdDuration::from_millis(200));
                }
                Err(err) => {
                    let _ = tx.send(AuthPollResult::Error(err.to_string()));
                    return;
                }
            }
        }
    });

    rx
}

enum RedirectOutcome {
    /// Served the fragment-forwarding shim; the capture request is still coming.
    Pending,
    Done,
    Failed(String),
}

fn handle_redirect_request(
    session: &AuthSession,
    stream: &mut TcpStream,
    store: &dyn TokenStore,
) -> RedirectOutcome {
    let request = match read_request(stream) {
        Ok(request) => request,
        Err(err) => return RedirectOutcome::Failed(err.to_string()),
    };
    let request_line = request.lines().next().unwrap_or("");
    let path = request_line.split_whitespace().nth(1).unwrap_or("/");

    if let Some((_, query)) = path.split_once("/capture?") {
        let params = parse_params(query);
        if let Some(error) = params.get("error") {
            let _ = respond_with_message(stream, &format!("Authorization failed: {error}"));
            return RedirectOutcome::Failed(format!("Google auth failed: {error}"));
        }

        // Rebuild the original fragment-carrying redirect URL.
        let callback_url = format!("{}#{}", session.redirect_uri, query);
        match parse_callback(&callback_url) {
            Some(token) => {
                store.set(&StoredToken::new(token.access_token));
                let _ = respond_with_message(
                    stream,
                    "Google Tasks connected. You can close this window.",
                );
                RedirectOutcome::Done
            }
            None => {
                let _ = respond_with_message(stream, "Missing or invalid token. Please retry.");
                RedirectOutcome::Failed(
                    "No token in redirect (missing or mismatched state).".to_string(),
                )
            }
        }
    } else {
        let _ = respond_with_html(stream, CAPTURE_SHIM);
        RedirectOutcome::Pending
    }
}

const CAPTURE_SHIM: &str = "<!doctype html><html><body><script>\
var h = location.hash ? location.hash.substring(1) : \"\";\
location.replace(\"/capture?\" + h);\
</script>Connecting to NEXUS...</body></html>";

fn read_request(stream: &mut TcpStream) -> io::Result<String> {
    stream.set_read_timeout(Some(StdDuration::from_secs(2)))?;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                // Headers are enough; browsers hold the connection open.
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn respond_with_message(stream: &mut TcpStream, message: &str) -> io::Result<()> {
    let body = format!("{message}\n");
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())
}

fn respond_with_html(stream: &mut TcpStream, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())
}

fn parse_params(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    // Percent escapes encode raw bytes; decode them all before interpreting
    // the result as UTF-8, or multi-byte sequences come out garbled.
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
                {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// Urgency marker convention
// ---------------------------------------------------------------------------

/// Splits a remote notes field into (description, priority). A notes value
/// starting with the urgency marker decodes as urgent, with the marker plus
/// exactly one following newline stripped; everything else is medium.
pub fn decode_notes(notes: Option<&str>) -> (Option<String>, Priority) {
    let Some(notes) = notes else {
        return (None, Priority::Medium);
    };
    if let Some(rest) = notes.strip_prefix(URGENT_MARKER) {
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        let description = if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        };
        (description, Priority::Urgent)
    } else if notes.is_empty() {
        (None, Priority::Medium)
    } else {
        (Some(notes.to_string()), Priority::Medium)
    }
}

/// Inverse of `decode_notes`: prepends the marker and a newline iff the
/// priority being written is urgent. High and low have no encoding and are
/// silently lost on the next fetch.
pub fn encode_notes(description: Option<&str>, priority: Priority) -> Option<String> {
    let description = description.filter(|d| !d.is_empty());
    if priority == Priority::Urgent {
        match description {
            Some(d) => Some(format!("{URGENT_MARKER}\n{d}")),
            None => Some(URGENT_MARKER.to_string()),
        }
    } else {
        description.map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Tasks API client
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListsResponse {
    items: Option<Vec<TaskListRef>>,
}

#[derive(Deserialize)]
struct TasksResponse {
    items: Option<Vec<RemoteTask>>,
}

#[derive(Deserialize, Clone)]
struct RemoteTask {
    id: String,
    title: Option<String>,
    notes: Option<String>,
    status: Option<String>,
    due: Option<String>,
    updated: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TaskPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    pub status: String,
}

impl TaskPayload {
    pub fn new(
        title: &str,
        description: Option<&str>,
        priority: Priority,
        due_date: Option<NaiveDate>,
        status: TaskStatus,
    ) -> Self {
        Self {
            title: title.to_string(),
            notes: encode_notes(description, priority),
            due: due_date.map(|d| format!("{}T00:00:00.000Z", d.format("%Y-%m-%d"))),
            status: remote_status(status).to_string(),
        }
    }
}

pub fn remote_status(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "completed",
        // The remote service only knows needsAction/completed.
        TaskStatus::Pending | TaskStatus::InProgress => "needsAction",
    }
}

pub struct TasksClient {
    http: Client,
    store: Arc<dyn TokenStore>,
    base_url: String,
}

impl TasksClient {
    pub fn new(store: Arc<dyn TokenStore>, timeout_seconds: u64) -> Self {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(timeout_seconds.max(5)))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            store,
            base_url: TASKS_API.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(store: Arc<dyn TokenStore>, base_url: String) -> Self {
        let mut client = Self::new(store, 5);
        client.base_url = base_url;
        client
    }

    pub fn connected(&self) -> bool {
        self.store.get().is_some()
    }

    pub fn sign_out(&self) {
        self.store.clear();
    }

    /// Fails fast without touching the network when no token is stored.
    fn token(&self) -> Result<String, TasksError> {
        self.store
            .get()
            .map(|t| t.access_token)
            .ok_or(TasksError::Unauthenticated)
    }

    /// A 401 means the implicit-grant token is gone for good (there is no
    /// refresh token); drop it so every following call fails fast.
    fn check_status(
        &self,
        op: &str,
        resp: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, TasksError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.store.clear();
            return Err(TasksError::Unauthenticated);
        }
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(TasksError::Rejected {
                op: op.to_string(),
                status: status.as_u16(),
                detail: truncate_detail(&detail),
            });
        }
        Ok(resp)
    }

    pub fn list_task_lists(&self) -> Result<Vec<TaskListRef>, TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .get(format!("{}/users/@me/lists", self.base_url))
            .bearer_auth(token)
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        let resp = self.check_status("Task list fetch", resp)?;
        let body: ListsResponse = resp
            .json()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        Ok(body.items.unwrap_or_default())
    }

    pub fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>, TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .get(format!("{}/lists/{list_id}/tasks", self.base_url))
            .bearer_auth(token)
            // Without both flags the service silently drops completed and
            // hidden items.
            .query(&[
                ("showCompleted", "true"),
                ("showHidden", "true"),
                ("maxResults", "100"),
            ])
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        let resp = self.check_status("Task fetch", resp)?;
        let body: TasksResponse = resp
            .json()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        Ok(body
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|remote| unified_task(list_id, remote))
            .collect())
    }

    pub fn create_task(&self, list_id: &str, payload: &TaskPayload) -> Result<(), TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .post(format!("{}/lists/{list_id}/tasks", self.base_url))
            .bearer_auth(token)
            .json(payload)
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        self.check_status("Task create", resp)?;
        Ok(())
    }

    pub fn update_task(
        &self,
        external: &ExternalRef,
        payload: &TaskPayload,
    ) -> Result<(), TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .patch(format!(
                "{}/lists/{}/tasks/{}",
                self.base_url, external.list_id, external.task_id
            ))
            .bearer_auth(token)
            .json(payload)
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        self.check_status("Task update", resp)?;
        Ok(())
    }

    pub fn set_task_status(
        &self,
        external: &ExternalRef,
        status: TaskStatus,
    ) -> Result<(), TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .patch(format!(
                "{}/lists/{}/tasks/{}",
                self.base_url, external.list_id, external.task_id
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({ "status": remote_status(status) }))
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        self.check_status("Task update", resp)?;
        Ok(())
    }

    pub fn delete_task(&self, external: &ExternalRef) -> Result<(), TasksError> {
        let token = self.token()?;
        let resp = self
            .http
            .delete(format!(
                "{}/lists/{}/tasks/{}",
                self.base_url, external.list_id, external.task_id
            ))
            .bearer_auth(token)
            .send()
            .map_err(|e| TasksError::Request(e.to_string()))?;
        self.check_status("Task delete", resp)?;
        Ok(())
    }
}

fn unified_task(list_id: &str, remote: RemoteTask) -> Task {
    let (description, priority) = decode_notes(remote.notes.as_deref());
    let updated = remote
        .updated
        .as_deref()
        .and_then(|u| DateTime::parse_from_rfc3339(u).ok())
        .map(|dt| dt.to_utc());
    Task {
        title: remote.title.unwrap_or_else(|| "Untitled task".to_string()),
        description,
        status: if remote.status.as_deref() == Some("completed") {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        },
        priority,
        due_date: remote
            .due
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.date_naive()),
        // The service only reports last-modified, not true creation time.
        created_at: updated,
        updated_at: updated,
        project_id: None,
        origin: Origin::External(ExternalRef {
            list_id: list_id.to_string(),
            task_id: remote.id.clone(),
        }),
        id: remote.id,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;

    #[test]
    fn parse_callback_accepts_fragment_token_with_matching_state() {
        let url = format!(
            "http://127.0.0.1:7878#access_token=ya29.abc&token_type=Bearer&state={AUTH_STATE}"
        );
        let token = parse_callback(&url).expect("token");
        assert_eq!(token.access_token, "ya29.abc");
    }

    #[test]
    fn parse_callback_rejects_mismatched_state() {
        let url = "http://127.0.0.1:7878#access_token=ya29.abc&state=forged";
        assert_eq!(parse_callback(url), None);
    }

    #[test]
    fn parse_callback_rejects_missing_state() {
        let url = "http://127.0.0.1:7878#access_token=ya29.abc";
        assert_eq!(parse_callback(url), None);
    }

    #[test]
    fn parse_callback_ignores_query_string_token() {
        // Token in the query, not the fragment: must not be trusted.
        let url = format!("http://127.0.0.1:7878?access_token=ya29.abc&state={AUTH_STATE}");
        assert_eq!(parse_callback(&url), None);
    }

    #[test]
    fn authorize_url_requests_implicit_grant() {
        let url = authorize_url("client-1", "http://127.0.0.1:7878").expect("url");
        assert!(url.contains("response_type=token"));
        assert!(url.contains(&format!("state={AUTH_STATE}")));
        assert!(url.contains("prompt=select_account"));
    }

    #[test]
    fn urgent_notes_round_trip_cleanly() {
        let encoded = encode_notes(Some("buy milk"), Priority::Urgent).expect("notes");
        assert_eq!(encoded, "[URGENT]\nbuy milk");
        let (description, priority) = decode_notes(Some(&encoded));
        assert_eq!(description.as_deref(), Some("buy milk"));
        assert_eq!(priority, Priority::Urgent);
    }

    #[test]
    fn urgent_marker_without_description_round_trips_to_none() {
        let encoded = encode_notes(None, Priority::Urgent).expect("notes");
        assert_eq!(encoded, "[URGENT]");
        let (description, priority) = decode_notes(Some(&encoded));
        assert_eq!(description, None);
        assert_eq!(priority, Priority::Urgent);
    }

    #[test]
    fn non_urgent_priorities_have_no_encoding() {
        // High is silently downgraded: the notes carry no marker, so the next
        // decode yields medium.
        let encoded = encode_notes(Some("plain"), Priority::High);
        assert_eq!(encoded.as_deref(), Some("plain"));
        let (_, priority) = decode_notes(encoded.as_deref());
        assert_eq!(priority, Priority::Medium);
    }

    #[test]
    fn decode_strips_exactly_one_newline_after_marker() {
        let (description, _) = decode_notes(Some("[URGENT]\n\nspaced"));
        assert_eq!(description.as_deref(), Some("\nspaced"));
    }

    #[test]
    fn remote_status_mapping_never_yields_in_progress() {
        assert_eq!(remote_status(TaskStatus::InProgress), "needsAction");
        assert_eq!(remote_status(TaskStatus::Pending), "needsAction");
        assert_eq!(remote_status(TaskStatus::Completed), "completed");
    }

    #[test]
    fn percent_decoding_handles_multibyte_utf8() {
        assert_eq!(decode_component("caf%C3%A9"), "café");
        assert_eq!(decode_component("a+b"), "a b");
        assert_eq!(decode_component("100%"), "100%");
    }

    #[test]
    fn remote_401_clears_token_and_later_calls_fail_fast() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n",
            );
        });

        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let client = TasksClient::with_base_url(
            Arc::clone(&store) as Arc<dyn TokenStore>,
            format!("http://{addr}"),
        );

        assert!(matches!(
            client.list_task_lists(),
            Err(TasksError::Unauthenticated)
        ));
        server.join().expect("server thread");
        assert!(store.get().is_none());

        // The server is gone; only a fail-fast path avoids a Request error.
        assert!(matches!(
            client.list_task_lists(),
            Err(TasksError::Unauthenticated)
        ));
    }

    #[test]
    fn calls_without_token_fail_before_any_network_io() {
        let store = Arc::new(MemoryTokenStore::default());
        let client = TasksClient::new(store, 5);
        // No server anywhere; an attempted request would surface as a
        // Request error, not Unauthenticated.
        assert!(matches!(
            client.list_task_lists(),
            Err(TasksError::Unauthenticated)
        ));
        assert!(matches!(
            client.list_tasks("list-1"),
            Err(TasksError::Unauthenticated)
        ));
    }

    #[test]
    fn sign_out_clears_the_shared_store() {
        let store = Arc::new(MemoryTokenStore::with_token("tok"));
        let client = TasksClient::new(Arc::clone(&store) as Arc<dyn TokenStore>, 5);
        assert!(client.connected());
        client.sign_out();
        assert!(!client.connected());
        assert!(store.get().is_none());
    }

    #[test]
    fn unified_task_maps_remote_fields() {
        let remote = RemoteTask {
            id: "t1".to_string(),
            title: Some("Call dentist".to_string()),
            notes: Some("[URGENT]\nbefore friday".to_string()),
            status: Some("needsAction".to_string()),
            due: Some("2024-02-01T00:00:00.000Z".to_string()),
            updated: Some("2024-01-20T08:30:00.000Z".to_string()),
        };
        let task = unified_task("list-1", remote);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.description.as_deref(), Some("before friday"));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        match task.origin {
            Origin::External(ref external) => {
                assert_eq!(external.list_id, "list-1");
                assert_eq!(external.task_id, "t1");
            }
            Origin::Local => panic!("remote task mapped to local origin"),
        }
    }

    #[test]
    fn payload_reapplies_marker_on_update() {
        let payload = TaskPayload::new(
            "Call dentist",
            Some("before friday"),
            Priority::Urgent,
            NaiveDate::from_ymd_opt(2024, 2, 1),
            TaskStatus::Pending,
        );
        assert_eq!(payload.notes.as_deref(), Some("[URGENT]\nbefore friday"));
        assert_eq!(payload.due.as_deref(), Some("2024-02-01T00:00:00.000Z"));
        assert_eq!(payload.status, "needsAction");
    }
}
