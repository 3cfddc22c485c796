use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

/// Default page size for cursor-paginated listings.
pub const DEFAULT_PAGE_LIMIT: usize = 20;
/// Hard cap on full-text search results within one store.
pub const SEARCH_RESULT_CAP: usize = 50;
/// Maximum preview length in characters, before the truncation marker.
pub const PREVIEW_MAX_CHARS: usize = 200;
/// Marker appended to previews derived from truncated content.
pub const PREVIEW_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DashboardError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ActivityId(pub Ulid);

impl ActivityId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse an activity id from its canonical ULID string form.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] when the value is not a ULID.
    pub fn parse(value: &str) -> Result<Self, DashboardError> {
        Ulid::from_string(value)
            .map(Self)
            .map_err(|err| DashboardError::InvalidArgument(format!("invalid activity id {value}: {err}")))
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ActivityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(pub Ulid);

impl TaskId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a task id from its canonical ULID string form.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] when the value is not a ULID.
    pub fn parse(value: &str) -> Result<Self, DashboardError> {
        Ulid::from_string(value)
            .map(Self)
            .map_err(|err| DashboardError::InvalidArgument(format!("invalid task id {value}: {err}")))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContentId(pub Ulid);

impl ContentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a content id from its canonical ULID string form.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] when the value is not a ULID.
    pub fn parse(value: &str) -> Result<Self, DashboardError> {
        Ulid::from_string(value)
            .map(Self)
            .map_err(|err| DashboardError::InvalidArgument(format!("invalid content id {value}: {err}")))
    }
}

impl Default for ContentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ContentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Failed,
    Pending,
}

impl ActivityStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ActivityMetadata {
    pub source: Option<String>,
    pub target: Option<String>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One logged record of an assistant-performed action. Immutable after
/// insert except `status`, which may move between its values freely.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Activity {
    pub id: ActivityId,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub action_type: String,
    pub description: String,
    pub status: ActivityStatus,
    pub metadata: Option<ActivityMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskMetadata {
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub priority: Option<String>,
    pub recurring: Option<bool>,
}

/// A calendar entry. `end_time` is unconstrained relative to `start_time`;
/// no ordering invariant is enforced between the two.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Epoch milliseconds.
    pub end_time: Option<i64>,
    pub task_type: String,
    pub status: TaskStatus,
    pub color: Option<String>,
    pub metadata: Option<TaskMetadata>,
}

/// A searchable document in the content index. Patching any field bumps
/// `timestamp` to the write time.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct IndexedContent {
    pub id: ContentId,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub source_path: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub preview: String,
}

/// One page of a cursor-style activity listing. `next_cursor` is the id of
/// the last returned item and is only present when more rows matched.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    pub has_more: bool,
    pub next_cursor: Option<ActivityId>,
}

/// Partial update for a scheduled task. `None` fields are left untouched;
/// absent fields never clear stored data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub task_type: Option<String>,
    pub status: Option<TaskStatus>,
    pub color: Option<String>,
    pub metadata: Option<TaskMetadata>,
}

impl TaskPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.task_type.is_none()
            && self.status.is_none()
            && self.color.is_none()
            && self.metadata.is_none()
    }
}

/// Partial update for indexed content. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub preview: Option<String>,
}

impl ContentPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.preview.is_none()
    }
}

#[must_use]
pub fn now_epoch_ms() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

/// Derive the short preview excerpt for indexed content: the first
/// [`PREVIEW_MAX_CHARS`] characters, with [`PREVIEW_ELLIPSIS`] appended only
/// when the content was actually truncated.
#[must_use]
pub fn derive_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    if content.chars().count() > PREVIEW_MAX_CHARS {
        preview.push_str(PREVIEW_ELLIPSIS);
    }
    preview
}

/// Normalize raw user search text into an FTS5 MATCH expression.
///
/// Tokens are whitespace-split, double-quoted (embedded quotes doubled so
/// user text can never escape into FTS syntax), and joined with `OR` for
/// any-term matching. Returns `None` for empty or whitespace-only input so
/// callers can skip the store entirely.
#[must_use]
pub fn fts_match_expression(raw: &str) -> Option<String> {
    let quoted = raw
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if quoted.is_empty() {
        None
    } else {
        Some(quoted.join(" OR "))
    }
}

/// Reject empty or whitespace-only required string arguments.
///
/// # Errors
/// Returns [`DashboardError::InvalidArgument`] naming the offending field.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), DashboardError> {
    if value.trim().is_empty() {
        return Err(DashboardError::InvalidArgument(format!("{field} must be non-empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn preview_of_short_content_is_the_full_content() {
        let content = "Weekly sync notes";
        assert_eq!(derive_preview(content), content);
    }

    #[test]
    fn preview_of_exactly_200_chars_has_no_marker() {
        let content = "x".repeat(200);
        assert_eq!(derive_preview(&content), content);
    }

    #[test]
    fn preview_of_long_content_is_200_chars_plus_marker() {
        let content = "a".repeat(201);
        let preview = derive_preview(&content);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with(PREVIEW_ELLIPSIS));
        assert_eq!(&preview[..200], &content[..200]);
    }

    #[test]
    fn preview_truncates_on_character_boundaries() {
        let content = "é".repeat(250);
        let preview = derive_preview(&content);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.starts_with('é'));
    }

    #[test]
    fn match_expression_is_none_for_empty_and_whitespace() {
        assert_eq!(fts_match_expression(""), None);
        assert_eq!(fts_match_expression("   \t  "), None);
    }

    #[test]
    fn match_expression_quotes_tokens_and_joins_with_or() {
        assert_eq!(
            fts_match_expression("project roadmap"),
            Some("\"project\" OR \"roadmap\"".to_string())
        );
    }

    #[test]
    fn match_expression_doubles_embedded_quotes() {
        assert_eq!(fts_match_expression("say\"this"), Some("\"say\"\"this\"".to_string()));
    }

    #[test]
    fn activity_status_round_trips_through_strings() {
        for status in [ActivityStatus::Success, ActivityStatus::Failed, ActivityStatus::Pending] {
            assert_eq!(ActivityStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ActivityStatus::parse("unknown"), None);
    }

    #[test]
    fn task_status_round_trips_through_strings() {
        for status in [TaskStatus::Scheduled, TaskStatus::Completed, TaskStatus::Cancelled] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse(""), None);
    }

    #[test]
    fn statuses_serialize_as_snake_case_strings() {
        let json = serde_json::to_string(&ActivityStatus::Success)
            .unwrap_or_else(|err| panic!("serialize failed: {err}"));
        assert_eq!(json, "\"success\"");

        let parsed: TaskStatus = serde_json::from_str("\"cancelled\"")
            .unwrap_or_else(|err| panic!("deserialize failed: {err}"));
        assert_eq!(parsed, TaskStatus::Cancelled);
    }

    #[test]
    fn metadata_collections_default_to_empty_on_deserialize() {
        let metadata: ActivityMetadata = serde_json::from_str(r#"{"source":"github"}"#)
            .unwrap_or_else(|err| panic!("deserialize failed: {err}"));
        assert_eq!(metadata.source.as_deref(), Some("github"));
        assert!(metadata.tags.is_empty());

        let metadata: TaskMetadata = serde_json::from_str(r#"{"priority":"high"}"#)
            .unwrap_or_else(|err| panic!("deserialize failed: {err}"));
        assert!(metadata.attendees.is_empty());
        assert_eq!(metadata.recurring, None);
    }

    #[test]
    fn id_parse_rejects_non_ulid_input() {
        let err = match ActivityId::parse("not-a-ulid") {
            Ok(id) => panic!("expected parse failure, got {id}"),
            Err(err) => err,
        };
        assert!(matches!(err, DashboardError::InvalidArgument(_)));
    }

    #[test]
    fn require_non_empty_names_the_field() {
        let err = match require_non_empty("title", "  ") {
            Ok(()) => panic!("expected validation failure"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("title"));
    }

    proptest! {
        #[test]
        fn property_preview_never_exceeds_budget(content in ".{0,400}") {
            let preview = derive_preview(&content);
            prop_assert!(preview.chars().count() <= PREVIEW_MAX_CHARS + PREVIEW_ELLIPSIS.len());
            if content.chars().count() <= PREVIEW_MAX_CHARS {
                prop_assert_eq!(preview, content);
            } else {
                prop_assert!(preview.ends_with(PREVIEW_ELLIPSIS));
            }
        }
    }

    proptest! {
        #[test]
        fn property_match_expression_balances_quotes(raw in "[a-z\" ]{0,40}") {
            if let Some(expr) = fts_match_expression(&raw) {
                let quote_count = expr.chars().filter(|ch| *ch == '"').count();
                prop_assert_eq!(quote_count % 2, 0);
            }
        }
    }
}
