use crate::gateway::TaskDraft;
use crate::integrations::google::TaskPayload;
use crate::models::{ExternalRef, Origin, StatusFilter, Task, TaskListRef, TaskStatus};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Name of the external list selected when none was chosen yet.
const DEFAULT_LIST_TITLE: &str = "My Tasks";

/// Where a new task should be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Local,
    ExternalList(String),
}

/// A user intent against the unified task list. Each intent carries enough
/// to decide provenance; `plan` turns it into exactly one backend operation.
#[derive(Clone, Debug)]
pub enum MutationIntent {
    Create {
        destination: Destination,
        draft: TaskDraft,
    },
    Update {
        task: Task,
        draft: TaskDraft,
    },
    Toggle {
        task: Task,
        now: DateTime<Utc>,
    },
    Delete {
        task: Task,
    },
}

#[derive(Clone, Debug)]
pub enum GatewayOp {
    Create(TaskDraft),
    Update { id: String, draft: TaskDraft },
    SetStatus {
        id: String,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    },
    Delete { id: String },
}

#[derive(Clone, Debug)]
pub enum ExternalOp {
    Create {
        list_id: String,
        payload: TaskPayload,
    },
    Update {
        external: ExternalRef,
        payload: TaskPayload,
    },
    SetStatus {
        external: ExternalRef,
        status: TaskStatus,
    },
    Delete { external: ExternalRef },
}

impl ExternalOp {
    /// The list whose tasks must be re-fetched once this op lands.
    pub fn owning_list(&self) -> &str {
        match self {
            ExternalOp::Create { list_id, .. } => list_id,
            ExternalOp::Update { external, .. }
            | ExternalOp::SetStatus { external, .. }
            | ExternalOp::Delete { external } => &external.list_id,
        }
    }
}

#[derive(Clone, Debug)]
pub enum MutationPlan {
    Gateway(GatewayOp),
    External(ExternalOp),
}

/// Routes a mutation intent to exactly one backend, never both. Returns
/// `None` when the intent is a no-op (toggling an in-progress task).
pub fn plan(intent: MutationIntent) -> Option<MutationPlan> {
    match intent {
        MutationIntent::Create { destination, draft } => Some(match destination {
            Destination::Local => MutationPlan::Gateway(GatewayOp::Create(draft)),
            Destination::ExternalList(list_id) => {
                let payload = TaskPayload::new(
                    &draft.title,
                    draft.description.as_deref(),
                    draft.priority,
                    draft.due_date,
                    TaskStatus::Pending,
                );
                MutationPlan::External(ExternalOp::Create { list_id, payload })
            }
        }),
        MutationIntent::Update { task, draft } => Some(match task.origin {
            Origin::Local => MutationPlan::Gateway(GatewayOp::Update { id: task.id, draft }),
            Origin::External(external) => {
                // Re-derive the remote notes so the urgency marker is applied
                // or dropped according to the new priority.
                let payload = TaskPayload::new(
                    &draft.title,
                    draft.description.as_deref(),
                    draft.priority,
                    draft.due_date,
                    task.status,
                );
                MutationPlan::External(ExternalOp::Update { external, payload })
            }
        }),
        MutationIntent::Toggle { task, now } => match task.origin {
            Origin::Local => {
                // Toggle only flips pending <-> completed; an in-progress task
                // is left untouched.
                let (status, completed_at) = match task.status {
                    TaskStatus::Pending => (TaskStatus::Completed, Some(now)),
                    TaskStatus::Completed => (TaskStatus::Pending, None),
                    TaskStatus::InProgress => return None,
                };
                Some(MutationPlan::Gateway(GatewayOp::SetStatus {
                    id: task.id,
                    status,
                    completed_at,
                }))
            }
            Origin::External(external) => {
                let status = match task.status {
                    TaskStatus::Completed => TaskStatus::Pending,
                    _ => TaskStatus::Completed,
                };
                Some(MutationPlan::External(ExternalOp::SetStatus {
                    external,
                    status,
                }))
            }
        },
        MutationIntent::Delete { task } => Some(match task.origin {
            Origin::Local => MutationPlan::Gateway(GatewayOp::Delete { id: task.id }),
            Origin::External(external) => {
                MutationPlan::External(ExternalOp::Delete { external })
            }
        }),
    }
}

/// The two task collections and the derived unified view over them. The
/// collections are never merged in place; `visible_tasks` computes the view
/// on every read.
pub struct TaskBoard {
    pub local_tasks: Vec<Task>,
    pub external_tasks: Vec<Task>,
    pub task_lists: Vec<TaskListRef>,
    pub selected_list: Option<String>,
    pub filter: StatusFilter,
    pub sort_by_date: bool,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            local_tasks: Vec::new(),
            external_tasks: Vec::new(),
            task_lists: Vec::new(),
            selected_list: None,
            filter: StatusFilter::All,
            sort_by_date: false,
        }
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        visible_tasks(
            &self.local_tasks,
            &self.external_tasks,
            self.filter,
            self.sort_by_date,
        )
    }

    pub fn apply_local(&mut self, tasks: Vec<Task>) {
        self.local_tasks = tasks;
    }

    /// Applies a fetched external collection, discarding it when the list it
    /// was requested for is no longer the selected one (a late response from
    /// a fast list switch must not overwrite fresher state).
    pub fn apply_external(&mut self, list_id: &str, tasks: Vec<Task>) -> bool {
        if self.selected_list.as_deref() != Some(list_id) {
            return false;
        }
        self.external_tasks = tasks;
        true
    }

    /// Stores the fetched task lists and picks a selection if none is active:
    /// the list titled "My Tasks" when present, else the first list returned.
    /// Returns the list whose tasks should now be fetched.
    pub fn apply_task_lists(&mut self, lists: Vec<TaskListRef>) -> Option<String> {
        self.task_lists = lists;

        let still_valid = self
            .selected_list
            .as_deref()
            .is_some_and(|id| self.task_lists.iter().any(|l| l.id == id));
        if !still_valid {
            self.selected_list = self
                .task_lists
                .iter()
                .find(|l| l.title == DEFAULT_LIST_TITLE)
                .or_else(|| self.task_lists.first())
                .map(|l| l.id.clone());
            self.external_tasks.clear();
        }
        self.selected_list.clone()
    }

    pub fn select_list(&mut self, list_id: &str) {
        if self.selected_list.as_deref() != Some(list_id) {
            self.selected_list = Some(list_id.to_string());
            self.external_tasks.clear();
        }
    }

    /// Sign-out: drops the external lists, selection and cached tasks.
    pub fn clear_external(&mut self) {
        self.external_tasks.clear();
        self.task_lists.clear();
        self.selected_list = None;
    }

    pub fn selected_list_title(&self) -> Option<&str> {
        let id = self.selected_list.as_deref()?;
        self.task_lists
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.title.as_str())
    }
}

/// The unified read: concatenate local then external, filter by status, then
/// a stable two-level sort. Completed tasks always sort last; the secondary
/// key is either due date (dated first, ascending, undated falling back to
/// priority) or pure priority.
pub fn visible_tasks<'a>(
    local: &'a [Task],
    external: &'a [Task],
    filter: StatusFilter,
    sort_by_date: bool,
) -> Vec<&'a Task> {
    let mut tasks: Vec<&Task> = local
        .iter()
        .chain(external.iter())
        .filter(|task| match filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => task.status == status,
        })
        .collect();
    tasks.sort_by(|a, b| compare_tasks(a, b, sort_by_date));
    tasks
}

fn compare_tasks(a: &Task, b: &Task, sort_by_date: bool) -> Ordering {
    let a_done = a.status == TaskStatus::Completed;
    let b_done = b.status == TaskStatus::Completed;
    if a_done != b_done {
        return a_done.cmp(&b_done);
    }

    if sort_by_date {
        match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.priority.rank().cmp(&b.priority.rank()),
        }
    } else {
        a.priority.rank().cmp(&b.priority.rank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::NaiveDate;

    fn task(id: &str, status: TaskStatus, priority: Priority, due: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status,
            priority,
            due_date: due.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            created_at: None,
            updated_at: None,
            project_id: None,
            origin: Origin::Local,
        }
    }

    fn external_task(id: &str, status: TaskStatus, priority: Priority) -> Task {
        Task {
            origin: Origin::External(ExternalRef {
                list_id: "list-1".to_string(),
                task_id: id.to_string(),
            }),
            ..task(id, status, priority, None)
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn all_filter_returns_every_task_from_both_origins() {
        let local = vec![
            task("l1", TaskStatus::Pending, Priority::Medium, None),
            task("l2", TaskStatus::Completed, Priority::Low, None),
        ];
        let external = vec![external_task("e1", TaskStatus::Pending, Priority::Medium)];
        let visible = visible_tasks(&local, &external, StatusFilter::All, false);
        assert_eq!(visible.len(), local.len() + external.len());
    }

    #[test]
    fn status_filter_keeps_only_matching_tasks() {
        let local = vec![
            task("l1", TaskStatus::Pending, Priority::Medium, None),
            task("l2", TaskStatus::InProgress, Priority::Medium, None),
            task("l3", TaskStatus::Completed, Priority::Medium, None),
        ];
        let external = vec![external_task("e1", TaskStatus::Completed, Priority::Medium)];
        let visible = visible_tasks(
            &local,
            &external,
            StatusFilter::Only(TaskStatus::Completed),
            false,
        );
        assert_eq!(ids(&visible), vec!["l3", "e1"]);
        assert!(visible.iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[test]
    fn completed_tasks_always_sort_last() {
        let local = vec![
            task("done", TaskStatus::Completed, Priority::Urgent, Some("2024-01-01")),
            task("open", TaskStatus::Pending, Priority::Low, None),
        ];
        for sort_by_date in [false, true] {
            let visible = visible_tasks(&local, &[], StatusFilter::All, sort_by_date);
            assert_eq!(ids(&visible), vec!["open", "done"]);
        }
    }

    #[test]
    fn date_sort_orders_due_dates_ascending() {
        let local = vec![
            task("feb", TaskStatus::Pending, Priority::Medium, Some("2024-02-01")),
            task("jan", TaskStatus::Pending, Priority::Medium, Some("2024-01-01")),
        ];
        let visible = visible_tasks(&local, &[], StatusFilter::All, true);
        assert_eq!(ids(&visible), vec!["jan", "feb"]);
    }

    #[test]
    fn date_sort_puts_dated_tasks_before_undated() {
        let local = vec![
            task("undated", TaskStatus::Pending, Priority::Urgent, None),
            task("dated", TaskStatus::Pending, Priority::Low, Some("2024-06-01")),
        ];
        let visible = visible_tasks(&local, &[], StatusFilter::All, true);
        assert_eq!(ids(&visible), vec!["dated", "undated"]);
    }

    #[test]
    fn priority_sort_orders_urgent_before_low() {
        let local = vec![
            task("low", TaskStatus::Pending, Priority::Low, None),
            task("urgent", TaskStatus::Pending, Priority::Urgent, None),
        ];
        let visible = visible_tasks(&local, &[], StatusFilter::All, false);
        assert_eq!(ids(&visible), vec!["urgent", "low"]);
    }

    #[test]
    fn priority_sort_ignores_due_dates() {
        let local = vec![
            task("low-early", TaskStatus::Pending, Priority::Low, Some("2024-01-01")),
            task("urgent-late", TaskStatus::Pending, Priority::Urgent, Some("2024-12-01")),
        ];
        let visible = visible_tasks(&local, &[], StatusFilter::All, false);
        assert_eq!(ids(&visible), vec!["urgent-late", "low-early"]);
    }

    #[test]
    fn equal_keys_retain_input_order() {
        let local = vec![
            task("a", TaskStatus::Pending, Priority::Medium, None),
            task("b", TaskStatus::Pending, Priority::Medium, None),
        ];
        let external = vec![external_task("c", TaskStatus::Pending, Priority::Medium)];
        let visible = visible_tasks(&local, &external, StatusFilter::All, false);
        assert_eq!(ids(&visible), vec!["a", "b", "c"]);
    }

    #[test]
    fn toggle_pending_local_task_records_completion_time() {
        let now = Utc::now();
        let intent = MutationIntent::Toggle {
            task: task("l1", TaskStatus::Pending, Priority::Medium, None),
            now,
        };
        match plan(intent) {
            Some(MutationPlan::Gateway(GatewayOp::SetStatus {
                id,
                status,
                completed_at,
            })) => {
                assert_eq!(id, "l1");
                assert_eq!(status, TaskStatus::Completed);
                assert_eq!(completed_at, Some(now));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn toggle_back_clears_completion_time() {
        let intent = MutationIntent::Toggle {
            task: task("l1", TaskStatus::Completed, Priority::Medium, None),
            now: Utc::now(),
        };
        match plan(intent) {
            Some(MutationPlan::Gateway(GatewayOp::SetStatus {
                status,
                completed_at,
                ..
            })) => {
                assert_eq!(status, TaskStatus::Pending);
                assert_eq!(completed_at, None);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn toggle_leaves_in_progress_tasks_alone() {
        let intent = MutationIntent::Toggle {
            task: task("l1", TaskStatus::InProgress, Priority::Medium, None),
            now: Utc::now(),
        };
        assert!(plan(intent).is_none());
    }

    #[test]
    fn toggle_external_task_maps_to_remote_statuses() {
        let intent = MutationIntent::Toggle {
            task: external_task("e1", TaskStatus::Pending, Priority::Medium),
            now: Utc::now(),
        };
        match plan(intent) {
            Some(MutationPlan::External(ExternalOp::SetStatus { external, status })) => {
                assert_eq!(external.task_id, "e1");
                assert_eq!(status, TaskStatus::Completed);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn update_routes_by_origin_never_both() {
        let draft = TaskDraft {
            title: "new title".to_string(),
            ..TaskDraft::default()
        };
        let local_plan = plan(MutationIntent::Update {
            task: task("l1", TaskStatus::Pending, Priority::Medium, None),
            draft: draft.clone(),
        });
        assert!(matches!(
            local_plan,
            Some(MutationPlan::Gateway(GatewayOp::Update { .. }))
        ));

        let external_plan = plan(MutationIntent::Update {
            task: external_task("e1", TaskStatus::Pending, Priority::Medium),
            draft,
        });
        assert!(matches!(
            external_plan,
            Some(MutationPlan::External(ExternalOp::Update { .. }))
        ));
    }

    #[test]
    fn external_update_reencodes_urgency_marker() {
        let draft = TaskDraft {
            title: "Call dentist".to_string(),
            description: Some("before friday".to_string()),
            priority: Priority::Urgent,
            ..TaskDraft::default()
        };
        let planned = plan(MutationIntent::Update {
            task: external_task("e1", TaskStatus::Pending, Priority::Medium),
            draft,
        });
        match planned {
            Some(MutationPlan::External(ExternalOp::Update { payload, .. })) => {
                assert_eq!(payload.notes.as_deref(), Some("[URGENT]\nbefore friday"));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn create_destination_decides_backend() {
        let draft = TaskDraft {
            title: "t".to_string(),
            ..TaskDraft::default()
        };
        assert!(matches!(
            plan(MutationIntent::Create {
                destination: Destination::Local,
                draft: draft.clone(),
            }),
            Some(MutationPlan::Gateway(GatewayOp::Create(_)))
        ));
        match plan(MutationIntent::Create {
            destination: Destination::ExternalList("list-9".to_string()),
            draft,
        }) {
            Some(MutationPlan::External(op @ ExternalOp::Create { .. })) => {
                assert_eq!(op.owning_list(), "list-9");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn stale_external_response_is_discarded() {
        let mut board = TaskBoard::new();
        board.task_lists = vec![
            TaskListRef {
                id: "a".to_string(),
                title: "My Tasks".to_string(),
            },
            TaskListRef {
                id: "b".to_string(),
                title: "Errands".to_string(),
            },
        ];
        board.selected_list = Some("b".to_string());

        let applied = board.apply_external(
            "a",
            vec![external_task("e1", TaskStatus::Pending, Priority::Medium)],
        );
        assert!(!applied);
        assert!(board.external_tasks.is_empty());

        let applied = board.apply_external(
            "b",
            vec![external_task("e2", TaskStatus::Pending, Priority::Medium)],
        );
        assert!(applied);
        assert_eq!(board.external_tasks.len(), 1);
    }

    #[test]
    fn default_list_selection_prefers_my_tasks() {
        let mut board = TaskBoard::new();
        let selected = board.apply_task_lists(vec![
            TaskListRef {
                id: "x".to_string(),
                title: "Errands".to_string(),
            },
            TaskListRef {
                id: "y".to_string(),
                title: "My Tasks".to_string(),
            },
        ]);
        assert_eq!(selected.as_deref(), Some("y"));
    }

    #[test]
    fn default_list_selection_falls_back_to_first() {
        let mut board = TaskBoard::new();
        let selected = board.apply_task_lists(vec![TaskListRef {
            id: "x".to_string(),
            title: "Errands".to_string(),
        }]);
        assert_eq!(selected.as_deref(), Some("x"));

        let mut empty_board = TaskBoard::new();
        assert_eq!(empty_board.apply_task_lists(Vec::new()), None);
    }

    #[test]
    fn clear_external_drops_lists_selection_and_tasks() {
        let mut board = TaskBoard::new();
        board.apply_task_lists(vec![TaskListRef {
            id: "x".to_string(),
            title: "My Tasks".to_string(),
        }]);
        board.external_tasks = vec![external_task("e1", TaskStatus::Pending, Priority::Medium)];

        board.clear_external();
        assert!(board.external_tasks.is_empty());
        assert!(board.task_lists.is_empty());
        assert!(board.selected_list.is_none());
    }
}
