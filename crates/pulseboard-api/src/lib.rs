//! Operation facade over the three dashboard stores. The service and CLI
//! both call through [`DashboardApi`]; request and result structs here are
//! the shared JSON contract.

use std::path::PathBuf;

use pulseboard_core::{
    derive_preview, fts_match_expression, now_epoch_ms, require_non_empty, Activity, ActivityId,
    ActivityMetadata, ActivityPage, ActivityStatus, ContentId, ContentPatch, DashboardError,
    IndexedContent, ScheduledTask, TaskId, TaskMetadata, TaskPatch, TaskStatus,
    DEFAULT_PAGE_LIMIT, SEARCH_RESULT_CAP,
};
use pulseboard_store_sqlite::{ActivityFilters, ClearCounts, SchemaStatus, SqliteStore};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, Time};

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityListRequest {
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub status: Option<ActivityStatus>,
    #[serde(default)]
    pub cursor: Option<ActivityId>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivitySearchRequest {
    pub query: String,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub status: Option<ActivityStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddActivityRequest {
    pub action_type: String,
    pub description: String,
    pub status: ActivityStatus,
    #[serde(default)]
    pub metadata: Option<ActivityMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetActivityStatusRequest {
    pub id: ActivityId,
    pub status: ActivityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekTasksRequest {
    pub week_start: i64,
    pub week_end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub task_type: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    pub id: TaskId,
    #[serde(default)]
    pub patch: TaskPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveTaskRequest {
    pub id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSearchRequest {
    pub query: String,
    #[serde(default)]
    pub task_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexContentRequest {
    pub title: String,
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateContentRequest {
    pub id: ContentId,
    #[serde(default)]
    pub patch: ContentPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveContentRequest {
    pub id: ContentId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalSearchRequest {
    pub query: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// The three per-store result sets of a global search, unmerged and unranked
/// across stores. `total_matches` is the sum of the three lengths.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalSearchResults {
    pub documents: Vec<IndexedContent>,
    pub activities: Vec<Activity>,
    pub tasks: Vec<ScheduledTask>,
    pub total_matches: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveResult {
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedResult {
    pub already_seeded: bool,
    pub activities: usize,
    pub tasks: usize,
    pub documents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrateResult {
    pub dry_run: bool,
    pub current_version: i64,
    pub target_version: i64,
    pub would_apply_versions: Vec<i64>,
    pub after_version: Option<i64>,
    pub up_to_date: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct DashboardApi {
    db_path: PathBuf,
}

impl DashboardApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_migrated(&self) -> Result<SqliteStore, DashboardError> {
        let mut store = SqliteStore::open(&self.db_path)?;
        store.migrate()?;
        Ok(store)
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or queried.
    pub fn schema_status(&self) -> Result<SchemaStatus, DashboardError> {
        let store = SqliteStore::open(&self.db_path)?;
        store.schema_status()
    }

    /// Apply pending migrations, or return planned versions for dry-run mode.
    ///
    /// # Errors
    /// Returns an error when migration planning or execution fails.
    pub fn migrate(&self, dry_run: bool) -> Result<MigrateResult, DashboardError> {
        let mut store = SqliteStore::open(&self.db_path)?;
        let before = store.schema_status()?;
        if dry_run {
            return Ok(MigrateResult {
                dry_run: true,
                current_version: before.current_version,
                target_version: before.target_version,
                would_apply_versions: before.pending_versions,
                after_version: None,
                up_to_date: None,
            });
        }

        let planned_versions = before.pending_versions;
        store.migrate()?;
        let after = store.schema_status()?;
        Ok(MigrateResult {
            dry_run: false,
            current_version: before.current_version,
            target_version: before.target_version,
            would_apply_versions: planned_versions,
            after_version: Some(after.current_version),
            up_to_date: Some(after.current_version == after.target_version),
        })
    }

    // --- activities ---

    /// Newest-first activity page with combined filters and cursor paging.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for a zero limit or unknown
    /// cursor, and a storage error kind otherwise.
    pub fn activity_list(&self, request: &ActivityListRequest) -> Result<ActivityPage, DashboardError> {
        let store = self.open_migrated()?;
        let filters = ActivityFilters {
            action_type: request.action_type.clone(),
            status: request.status,
        };
        store.list_activities(&filters, request.cursor.as_ref(), request.limit)
    }

    /// Full-text search over activity descriptions, capped at 50 results.
    /// An empty or whitespace-only query yields an empty result without
    /// touching the store.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn activity_search(&self, request: &ActivitySearchRequest) -> Result<Vec<Activity>, DashboardError> {
        let Some(match_expr) = fts_match_expression(&request.query) else {
            return Ok(Vec::new());
        };
        let store = self.open_migrated()?;
        let filters = ActivityFilters {
            action_type: request.action_type.clone(),
            status: request.status,
        };
        store.search_activities(&match_expr, &filters, SEARCH_RESULT_CAP)
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn action_types(&self) -> Result<Vec<String>, DashboardError> {
        self.open_migrated()?.distinct_action_types()
    }

    /// Log a new activity, stamped with the current wall-clock time.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for an empty `action_type`
    /// or `description`.
    pub fn activity_add(&self, request: AddActivityRequest) -> Result<Activity, DashboardError> {
        require_non_empty("action_type", &request.action_type)?;
        require_non_empty("description", &request.description)?;

        let activity = Activity {
            id: ActivityId::new(),
            timestamp: now_epoch_ms(),
            action_type: request.action_type,
            description: request.description,
            status: request.status,
            metadata: request.metadata,
        };
        let store = self.open_migrated()?;
        store.insert_activity(&activity)?;
        Ok(activity)
    }

    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn activity_set_status(&self, request: &SetActivityStatusRequest) -> Result<Activity, DashboardError> {
        let store = self.open_migrated()?;
        store.update_activity_status(&request.id, request.status)
    }

    // --- scheduled tasks ---

    /// All tasks starting within the inclusive range, earliest first.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn week_tasks(&self, request: &WeekTasksRequest) -> Result<Vec<ScheduledTask>, DashboardError> {
        let store = self.open_migrated()?;
        store.tasks_in_range(request.week_start, request.week_end)
    }

    /// Point lookup; absence is not an error.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn task_get(&self, id: &TaskId) -> Result<Option<ScheduledTask>, DashboardError> {
        self.open_migrated()?.get_task(id)
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn task_types(&self) -> Result<Vec<String>, DashboardError> {
        self.open_migrated()?.distinct_task_types()
    }

    /// Full-text search over task titles, capped at 50 results. An empty
    /// query yields an empty result without touching the store.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn task_search(&self, request: &TaskSearchRequest) -> Result<Vec<ScheduledTask>, DashboardError> {
        let Some(match_expr) = fts_match_expression(&request.query) else {
            return Ok(Vec::new());
        };
        let store = self.open_migrated()?;
        store.search_tasks(&match_expr, request.task_type.as_deref(), SEARCH_RESULT_CAP)
    }

    /// Create a task. `status` defaults to `scheduled`; `end_time` is not
    /// validated against `start_time`.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for an empty `title` or
    /// `task_type`.
    pub fn task_add(&self, request: AddTaskRequest) -> Result<ScheduledTask, DashboardError> {
        require_non_empty("title", &request.title)?;
        require_non_empty("task_type", &request.task_type)?;

        let task = ScheduledTask {
            id: TaskId::new(),
            title: request.title,
            description: request.description,
            start_time: request.start_time,
            end_time: request.end_time,
            task_type: request.task_type,
            status: request.status.unwrap_or(TaskStatus::Scheduled),
            color: request.color,
            metadata: request.metadata,
        };
        let store = self.open_migrated()?;
        store.insert_task(&task)?;
        Ok(task)
    }

    /// Patch the provided fields and return the updated task. An all-empty
    /// patch still verifies the id exists.
    ///
    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn task_update(&self, request: &UpdateTaskRequest) -> Result<ScheduledTask, DashboardError> {
        let store = self.open_migrated()?;
        store.update_task(&request.id, &request.patch)
    }

    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn task_remove(&self, id: &TaskId) -> Result<RemoveResult, DashboardError> {
        let store = self.open_migrated()?;
        store.delete_task(id)?;
        Ok(RemoveResult { removed: true })
    }

    // --- content index ---

    /// Index a document. When no preview is supplied one is derived from the
    /// first 200 characters of the content.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for an empty `title`,
    /// `content`, or `content_type`.
    pub fn content_index(&self, request: IndexContentRequest) -> Result<IndexedContent, DashboardError> {
        require_non_empty("title", &request.title)?;
        require_non_empty("content", &request.content)?;
        require_non_empty("content_type", &request.content_type)?;

        let preview = request.preview.unwrap_or_else(|| derive_preview(&request.content));
        let content = IndexedContent {
            id: ContentId::new(),
            title: request.title,
            content: request.content,
            content_type: request.content_type,
            source_path: request.source_path,
            timestamp: now_epoch_ms(),
            preview,
        };
        let store = self.open_migrated()?;
        store.insert_content(&content)?;
        Ok(content)
    }

    /// Patch the provided fields and refresh the document timestamp. An
    /// all-empty patch is a pure no-op: no store access, no timestamp bump,
    /// and `None` is returned.
    ///
    /// # Errors
    /// Returns [`DashboardError::NotFound`] when a non-empty patch names a
    /// missing id.
    pub fn content_update(&self, request: &UpdateContentRequest) -> Result<Option<IndexedContent>, DashboardError> {
        if request.patch.is_empty() {
            return Ok(None);
        }
        let store = self.open_migrated()?;
        store.update_content(&request.id, &request.patch).map(Some)
    }

    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn content_remove(&self, id: &ContentId) -> Result<RemoveResult, DashboardError> {
        let store = self.open_migrated()?;
        store.delete_content(id)?;
        Ok(RemoveResult { removed: true })
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn content_types(&self) -> Result<Vec<String>, DashboardError> {
        self.open_migrated()?.distinct_content_types()
    }

    // --- cross-store search ---

    /// Fan a query out to the three stores: document bodies (optionally
    /// filtered by content type), activity descriptions, and task titles.
    /// Each branch is capped at `limit`; results stay per-store, with no
    /// cross-store ranking or deduplication. The aggregation is
    /// all-or-nothing, so the first branch failure fails the request.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for a zero limit and a
    /// storage error kind when any branch fails.
    pub fn global_search(&self, request: &GlobalSearchRequest) -> Result<GlobalSearchResults, DashboardError> {
        let limit = request.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 {
            return Err(DashboardError::InvalidArgument("limit must be at least 1".to_string()));
        }
        let Some(match_expr) = fts_match_expression(&request.query) else {
            return Ok(GlobalSearchResults::default());
        };

        let store = self.open_migrated()?;
        let documents = store.search_content(&match_expr, request.content_type.as_deref(), limit)?;
        let activities = store.search_activities(&match_expr, &ActivityFilters::default(), limit)?;
        let tasks = store.search_tasks(&match_expr, None, limit)?;
        let total_matches = documents.len() + activities.len() + tasks.len();
        tracing::debug!(total_matches, "global search completed");

        Ok(GlobalSearchResults { documents, activities, tasks, total_matches })
    }

    // --- fixtures ---

    /// Populate the stores with the demo corpus: 12 activities, 7 tasks
    /// anchored to the current Monday-based week, and 5 documents. Refuses to
    /// double-seed: if any activity exists the call is a no-op.
    ///
    /// # Errors
    /// Returns a storage error kind when any insert fails.
    pub fn seed(&self) -> Result<SeedResult, DashboardError> {
        let store = self.open_migrated()?;
        if store.count_activities()? > 0 {
            return Ok(SeedResult { already_seeded: true, activities: 0, tasks: 0, documents: 0 });
        }

        let activities = seed_activities(now_epoch_ms());
        for activity in &activities {
            store.insert_activity(activity)?;
        }
        let tasks = seed_tasks(current_week_start_ms());
        for task in &tasks {
            store.insert_task(task)?;
        }
        let documents = seed_documents(now_epoch_ms());
        for document in &documents {
            store.insert_content(document)?;
        }
        tracing::info!(
            activities = activities.len(),
            tasks = tasks.len(),
            documents = documents.len(),
            "stores seeded"
        );

        Ok(SeedResult {
            already_seeded: false,
            activities: activities.len(),
            tasks: tasks.len(),
            documents: documents.len(),
        })
    }

    /// Delete every row in all three stores and report removed counts.
    ///
    /// # Errors
    /// Returns a storage error kind when any delete fails.
    pub fn reset(&self) -> Result<ClearCounts, DashboardError> {
        let mut store = self.open_migrated()?;
        store.clear_all()
    }
}

/// Midnight UTC of the Monday of the current week, in epoch milliseconds.
fn current_week_start_ms() -> i64 {
    let now = OffsetDateTime::now_utc();
    let days_from_monday = i64::from(now.weekday().number_days_from_monday());
    let monday_midnight = now.replace_time(Time::MIDNIGHT) - Duration::days(days_from_monday);
    monday_midnight.unix_timestamp().saturating_mul(1_000)
}

const HOUR_MS: i64 = 60 * 60 * 1_000;
const DAY_MS: i64 = 24 * HOUR_MS;

fn seed_activities(now: i64) -> Vec<Activity> {
    let entry = |offset_ms: i64, action_type: &str, description: &str, status, metadata| Activity {
        id: ActivityId::new(),
        timestamp: now - offset_ms,
        action_type: action_type.to_string(),
        description: description.to_string(),
        status,
        metadata: Some(metadata),
    };
    let tags = |values: &[&str]| values.iter().map(ToString::to_string).collect::<Vec<_>>();

    vec![
        entry(
            10 * 60 * 1_000,
            "email_sent",
            "Sent weekly status report to team@company.com",
            ActivityStatus::Success,
            ActivityMetadata {
                target: Some("team@company.com".to_string()),
                tags: tags(&["report", "weekly"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            30 * 60 * 1_000,
            "file_created",
            "Created meeting notes for Q1 planning session",
            ActivityStatus::Success,
            ActivityMetadata {
                source: Some("voice-transcription".to_string()),
                tags: tags(&["meeting", "planning"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            HOUR_MS,
            "search_performed",
            "Searched for project roadmap documents",
            ActivityStatus::Success,
            ActivityMetadata {
                duration_ms: Some(1_200),
                tags: tags(&["search"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            2 * HOUR_MS,
            "calendar_sync",
            "Synced calendar with Google Calendar",
            ActivityStatus::Success,
            ActivityMetadata {
                source: Some("google-calendar".to_string()),
                duration_ms: Some(3_500),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            3 * HOUR_MS,
            "task_completed",
            "Completed: Review pull request #142",
            ActivityStatus::Success,
            ActivityMetadata { tags: tags(&["github", "review"]), ..ActivityMetadata::default() },
        ),
        entry(
            4 * HOUR_MS,
            "api_call",
            "Failed to fetch weather data - API timeout",
            ActivityStatus::Failed,
            ActivityMetadata {
                error: Some("ETIMEDOUT".to_string()),
                duration_ms: Some(30_000),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            5 * HOUR_MS,
            "notification_sent",
            "Sent reminder: Team standup in 15 minutes",
            ActivityStatus::Success,
            ActivityMetadata {
                target: Some("slack".to_string()),
                tags: tags(&["reminder"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            6 * HOUR_MS,
            "file_uploaded",
            "Uploaded presentation.pdf to shared drive",
            ActivityStatus::Success,
            ActivityMetadata {
                target: Some("google-drive".to_string()),
                tags: tags(&["upload", "presentation"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            DAY_MS,
            "backup_created",
            "Created daily backup of workspace files",
            ActivityStatus::Success,
            ActivityMetadata {
                duration_ms: Some(45_000),
                tags: tags(&["backup", "daily"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            DAY_MS + 2 * HOUR_MS,
            "email_sent",
            "Sent project proposal to client@external.com",
            ActivityStatus::Success,
            ActivityMetadata {
                target: Some("client@external.com".to_string()),
                tags: tags(&["proposal", "client"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            DAY_MS + 4 * HOUR_MS,
            "code_review",
            "Reviewed and approved PR #138 - Add user authentication",
            ActivityStatus::Success,
            ActivityMetadata {
                source: Some("github".to_string()),
                tags: tags(&["review", "auth"]),
                ..ActivityMetadata::default()
            },
        ),
        entry(
            2 * DAY_MS,
            "search_performed",
            "Searched internal docs for API documentation",
            ActivityStatus::Success,
            ActivityMetadata {
                duration_ms: Some(800),
                tags: tags(&["search", "docs"]),
                ..ActivityMetadata::default()
            },
        ),
    ]
}

fn seed_tasks(week_start: i64) -> Vec<ScheduledTask> {
    let entry = |title: &str, description: &str, start: i64, end: Option<i64>, task_type: &str, color: &str, metadata| {
        ScheduledTask {
            id: TaskId::new(),
            title: title.to_string(),
            description: Some(description.to_string()),
            start_time: start,
            end_time: end,
            task_type: task_type.to_string(),
            status: TaskStatus::Scheduled,
            color: Some(color.to_string()),
            metadata,
        }
    };
    let attendees = |values: &[&str]| values.iter().map(ToString::to_string).collect::<Vec<_>>();

    vec![
        entry(
            "Team Standup",
            "Daily sync with the development team",
            week_start + DAY_MS + 9 * HOUR_MS,
            Some(week_start + DAY_MS + 9 * HOUR_MS + HOUR_MS / 2),
            "meeting",
            "#3b82f6",
            Some(TaskMetadata {
                recurring: Some(true),
                attendees: attendees(&["team"]),
                ..TaskMetadata::default()
            }),
        ),
        entry(
            "Code Review Session",
            "Review pending pull requests",
            week_start + DAY_MS + 14 * HOUR_MS,
            Some(week_start + DAY_MS + 15 * HOUR_MS),
            "review",
            "#8b5cf6",
            None,
        ),
        entry(
            "Client Call",
            "Weekly check-in with Acme Corp",
            week_start + 2 * DAY_MS + 10 * HOUR_MS,
            Some(week_start + 2 * DAY_MS + 11 * HOUR_MS),
            "meeting",
            "#10b981",
            Some(TaskMetadata {
                location: Some("Zoom".to_string()),
                attendees: attendees(&["client@acme.com"]),
                ..TaskMetadata::default()
            }),
        ),
        entry(
            "Project Deadline",
            "Submit Q1 deliverables",
            week_start + 3 * DAY_MS + 17 * HOUR_MS,
            None,
            "deadline",
            "#ef4444",
            Some(TaskMetadata { priority: Some("high".to_string()), ..TaskMetadata::default() }),
        ),
        entry(
            "1:1 with Manager",
            "Weekly one-on-one meeting",
            week_start + 4 * DAY_MS + 11 * HOUR_MS,
            Some(week_start + 4 * DAY_MS + 12 * HOUR_MS),
            "meeting",
            "#f59e0b",
            None,
        ),
        entry(
            "Sprint Planning",
            "Plan next sprint stories",
            week_start + 4 * DAY_MS + 14 * HOUR_MS,
            Some(week_start + 4 * DAY_MS + 16 * HOUR_MS),
            "meeting",
            "#3b82f6",
            Some(TaskMetadata { attendees: attendees(&["dev-team"]), ..TaskMetadata::default() }),
        ),
        entry(
            "Deploy to Production",
            "Release v2.3.0",
            week_start + 5 * DAY_MS + 10 * HOUR_MS,
            None,
            "reminder",
            "#ec4899",
            Some(TaskMetadata { priority: Some("high".to_string()), ..TaskMetadata::default() }),
        ),
    ]
}

fn seed_documents(now: i64) -> Vec<IndexedContent> {
    let entry = |title: &str, content: &str, content_type: &str, source_path: &str, age_ms: i64, preview: &str| {
        IndexedContent {
            id: ContentId::new(),
            title: title.to_string(),
            content: content.to_string(),
            content_type: content_type.to_string(),
            source_path: Some(source_path.to_string()),
            timestamp: now - age_ms,
            preview: preview.to_string(),
        }
    };

    vec![
        entry(
            "Project Roadmap Q1 2025",
            "The Q1 roadmap focuses on three main objectives: improving user onboarding, \
             enhancing API performance, and launching the new dashboard. Key milestones \
             include the beta release in February and GA in March.",
            "document",
            "/docs/roadmap-q1.md",
            7 * DAY_MS,
            "The Q1 roadmap focuses on three main objectives: improving user onboarding...",
        ),
        entry(
            "Meeting Notes - Client Kickoff",
            "Attendees: John, Sarah, Mike from Acme Corp. Discussed project scope, timeline, \
             and deliverables. Client wants MVP by end of February. Budget approved for phase 1.",
            "memory",
            "/memory/2025-01-15.md",
            14 * DAY_MS,
            "Attendees: John, Sarah, Mike from Acme Corp. Discussed project scope...",
        ),
        entry(
            "API Documentation",
            "REST API endpoints for the dashboard service. Authentication uses JWT tokens. \
             Rate limiting is set to 100 requests per minute. All endpoints return JSON.",
            "document",
            "/docs/api.md",
            3 * DAY_MS,
            "REST API endpoints for the dashboard service. Authentication uses JWT...",
        ),
        entry(
            "Weekly Review Notes",
            "This week: completed authentication module, fixed 12 bugs, reviewed 8 PRs. Team \
             velocity is on track. Need to discuss scaling strategy next week.",
            "memory",
            "/memory/2025-02-01.md",
            DAY_MS,
            "This week: completed authentication module, fixed 12 bugs, reviewed 8 PRs...",
        ),
        entry(
            "Architecture Decision Record - Storage",
            "Decided to use SQLite with FTS5 for the storage layer. Reasons: zero operational \
             overhead, strong full-text search, single-file backups. Alternative considered: \
             an external search service.",
            "document",
            "/docs/adr-001.md",
            10 * DAY_MS,
            "Decided to use SQLite with FTS5 for the storage layer. Reasons: zero operational...",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn unique_temp_db_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pulseboard-api-{label}-{}.sqlite3", ActivityId::new()))
    }

    fn api(label: &str) -> DashboardApi {
        DashboardApi::new(unique_temp_db_path(label))
    }

    fn seeded_api(label: &str) -> DashboardApi {
        let api = api(label);
        let result = api.seed().unwrap_or_else(|err| panic!("seed failed: {err}"));
        assert!(!result.already_seeded);
        api
    }

    #[test]
    fn seed_populates_all_three_stores_once() {
        let api = seeded_api("seed-once");

        let page = api
            .activity_list(&ActivityListRequest { limit: Some(50), ..ActivityListRequest::default() })
            .unwrap_or_else(|err| panic!("list failed: {err}"));
        assert_eq!(page.activities.len(), 12);
        assert!(!page.has_more);
        assert_eq!(page.activities[0].action_type, "email_sent");
        assert!(page.activities[0].description.contains("weekly status report"));

        let again = api.seed().unwrap_or_else(|err| panic!("second seed failed: {err}"));
        assert!(again.already_seeded);
        assert_eq!(again.activities, 0);
    }

    #[test]
    fn action_types_are_distinct_and_sorted() {
        let api = seeded_api("action-types");
        let types = api.action_types().unwrap_or_else(|err| panic!("action types failed: {err}"));

        let mut sorted = types.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(types, sorted);
        assert!(types.contains(&"email_sent".to_string()));
        assert_eq!(types.iter().filter(|value| value.as_str() == "email_sent").count(), 1);
    }

    #[test]
    fn empty_queries_return_empty_without_error() {
        let api = seeded_api("empty-queries");

        let activities = api
            .activity_search(&ActivitySearchRequest {
                query: "   ".to_string(),
                action_type: None,
                status: None,
            })
            .unwrap_or_else(|err| panic!("activity search failed: {err}"));
        assert!(activities.is_empty());

        let tasks = api
            .task_search(&TaskSearchRequest { query: String::new(), task_type: None })
            .unwrap_or_else(|err| panic!("task search failed: {err}"));
        assert!(tasks.is_empty());

        let global = api
            .global_search(&GlobalSearchRequest { query: "\t".to_string(), content_type: None, limit: None })
            .unwrap_or_else(|err| panic!("global search failed: {err}"));
        assert_eq!(global, GlobalSearchResults::default());
    }

    #[test]
    fn global_search_for_roadmap_hits_documents_and_activities() {
        let api = seeded_api("roadmap");
        let results = api
            .global_search(&GlobalSearchRequest {
                query: "roadmap".to_string(),
                content_type: None,
                limit: None,
            })
            .unwrap_or_else(|err| panic!("global search failed: {err}"));

        assert_eq!(results.documents.len(), 1);
        assert_eq!(results.documents[0].title, "Project Roadmap Q1 2025");
        assert_eq!(results.activities.len(), 1);
        assert_eq!(results.activities[0].action_type, "search_performed");
        assert!(results.tasks.is_empty());
        assert_eq!(results.total_matches, 2);
    }

    #[test]
    fn global_search_content_type_filter_only_narrows_documents() {
        let api = seeded_api("content-filter");
        let results = api
            .global_search(&GlobalSearchRequest {
                query: "authentication".to_string(),
                content_type: Some("memory".to_string()),
                limit: None,
            })
            .unwrap_or_else(|err| panic!("global search failed: {err}"));

        assert_eq!(results.documents.len(), 1);
        assert_eq!(results.documents[0].content_type, "memory");
        // the code_review activity still matches; the filter never touches it
        assert_eq!(results.activities.len(), 1);
    }

    #[test]
    fn index_derives_preview_only_when_content_is_long() {
        let api = api("preview");
        let long_content = "a".repeat(250);
        let indexed = api
            .content_index(IndexContentRequest {
                title: "long doc".to_string(),
                content: long_content,
                content_type: "document".to_string(),
                source_path: None,
                preview: None,
            })
            .unwrap_or_else(|err| panic!("index failed: {err}"));
        assert_eq!(indexed.preview.chars().count(), 203);
        assert!(indexed.preview.ends_with("..."));

        let short = api
            .content_index(IndexContentRequest {
                title: "short doc".to_string(),
                content: "tiny body".to_string(),
                content_type: "document".to_string(),
                source_path: None,
                preview: None,
            })
            .unwrap_or_else(|err| panic!("index failed: {err}"));
        assert_eq!(short.preview, "tiny body");
    }

    #[test]
    fn empty_content_patch_is_a_pure_no_op() {
        let db_path = unique_temp_db_path("noop-patch");
        let api = DashboardApi::new(db_path.clone());
        let indexed = api
            .content_index(IndexContentRequest {
                title: "doc".to_string(),
                content: "stable body".to_string(),
                content_type: "document".to_string(),
                source_path: None,
                preview: None,
            })
            .unwrap_or_else(|err| panic!("index failed: {err}"));

        let updated = api
            .content_update(&UpdateContentRequest { id: indexed.id, patch: ContentPatch::default() })
            .unwrap_or_else(|err| panic!("update failed: {err}"));
        assert_eq!(updated, None);

        // even an unknown id is accepted when the patch is empty
        let missing = api
            .content_update(&UpdateContentRequest { id: ContentId::new(), patch: ContentPatch::default() })
            .unwrap_or_else(|err| panic!("update failed: {err}"));
        assert_eq!(missing, None);

        let store = SqliteStore::open(&db_path)
            .unwrap_or_else(|err| panic!("failed to reopen store: {err}"));
        let stored = store
            .get_content(&indexed.id)
            .unwrap_or_else(|err| panic!("get content failed: {err}"));
        assert_eq!(stored.map(|doc| doc.timestamp), Some(indexed.timestamp));
    }

    #[test]
    fn task_add_defaults_status_to_scheduled() {
        let api = api("task-defaults");
        let task = api
            .task_add(AddTaskRequest {
                title: "ad-hoc review".to_string(),
                description: None,
                start_time: 1_700_000_000_000,
                end_time: None,
                task_type: "review".to_string(),
                status: None,
                color: None,
                metadata: None,
            })
            .unwrap_or_else(|err| panic!("task add failed: {err}"));
        assert_eq!(task.status, TaskStatus::Scheduled);

        let fetched = api
            .task_get(&task.id)
            .unwrap_or_else(|err| panic!("task get failed: {err}"));
        assert_eq!(fetched, Some(task));
    }

    #[test]
    fn week_boundary_is_inclusive_but_one_millisecond_past_is_not() {
        let api = api("week-boundary");
        let week_start = 1_700_000_000_000;
        let week_end = week_start + 7 * DAY_MS - 1;

        for (title, start) in [("inside", week_end), ("outside", week_end + 1)] {
            api.task_add(AddTaskRequest {
                title: title.to_string(),
                description: None,
                start_time: start,
                end_time: None,
                task_type: "meeting".to_string(),
                status: None,
                color: None,
                metadata: None,
            })
            .unwrap_or_else(|err| panic!("task add failed: {err}"));
        }

        let tasks = api
            .week_tasks(&WeekTasksRequest { week_start, week_end })
            .unwrap_or_else(|err| panic!("week tasks failed: {err}"));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "inside");
    }

    #[test]
    fn add_rejects_empty_required_fields() {
        let api = api("validation");
        let err = match api.activity_add(AddActivityRequest {
            action_type: "email_sent".to_string(),
            description: "  ".to_string(),
            status: ActivityStatus::Success,
            metadata: None,
        }) {
            Ok(activity) => panic!("expected validation failure, got {}", activity.id),
            Err(err) => err,
        };
        assert!(matches!(err, DashboardError::InvalidArgument(_)));
    }

    #[test]
    fn removing_a_missing_task_is_not_found() {
        let api = api("remove-missing");
        let err = match api.task_remove(&TaskId::new()) {
            Ok(result) => panic!("expected missing-id failure, got removed={}", result.removed),
            Err(err) => err,
        };
        assert!(matches!(err, DashboardError::NotFound(_)));
    }

    #[test]
    fn empty_global_search_results_serialize_with_zero_counts() {
        let value = serde_json::to_value(GlobalSearchResults::default())
            .unwrap_or_else(|err| panic!("serialize failed: {err}"));
        assert_eq!(value.get("total_matches").and_then(serde_json::Value::as_u64), Some(0));
        assert_eq!(
            value.get("documents").and_then(serde_json::Value::as_array).map(Vec::len),
            Some(0)
        );
    }

    #[test]
    fn dry_run_migrate_plans_without_applying() {
        let api = api("migrate-dry-run");

        let planned = api.migrate(true).unwrap_or_else(|err| panic!("dry-run migrate failed: {err}"));
        assert!(planned.dry_run);
        assert_eq!(planned.current_version, 0);
        assert_eq!(planned.target_version, 1);
        assert_eq!(planned.would_apply_versions, vec![1]);
        assert_eq!(planned.after_version, None);
        assert_eq!(planned.up_to_date, None);

        // nothing was applied: the database still reports version 0
        let status = api.schema_status().unwrap_or_else(|err| panic!("status failed: {err}"));
        assert_eq!(status.current_version, 0);
        assert_eq!(status.pending_versions, vec![1]);

        let applied = api.migrate(false).unwrap_or_else(|err| panic!("migrate failed: {err}"));
        assert_eq!(applied.after_version, Some(1));
        assert_eq!(applied.up_to_date, Some(true));
    }

    #[test]
    fn reset_clears_everything_and_allows_reseeding() {
        let api = seeded_api("reset");
        let counts = api.reset().unwrap_or_else(|err| panic!("reset failed: {err}"));
        assert_eq!(counts.activities, 12);
        assert_eq!(counts.tasks, 7);
        assert_eq!(counts.documents, 5);

        let reseeded = api.seed().unwrap_or_else(|err| panic!("reseed failed: {err}"));
        assert!(!reseeded.already_seeded);
        assert_eq!(reseeded.activities, 12);
    }
}
