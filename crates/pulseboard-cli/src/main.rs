use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pulseboard_api::{
    ActivityListRequest, ActivitySearchRequest, AddActivityRequest, AddTaskRequest, DashboardApi,
    GlobalSearchRequest, IndexContentRequest, SetActivityStatusRequest, TaskSearchRequest,
    UpdateContentRequest, UpdateTaskRequest, WeekTasksRequest,
};
use pulseboard_core::{
    ActivityId, ActivityMetadata, ActivityStatus, ContentId, ContentPatch, TaskId, TaskMetadata,
    TaskPatch, TaskStatus,
};
use serde_json::Value;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "pb")]
#[command(about = "Pulseboard dashboard CLI")]
struct Cli {
    #[arg(long, default_value = "./pulseboard.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Activity {
        #[command(subcommand)]
        command: Box<ActivityCommand>,
    },
    Task {
        #[command(subcommand)]
        command: Box<TaskCommand>,
    },
    Content {
        #[command(subcommand)]
        command: Box<ContentCommand>,
    },
    Search(GlobalSearchArgs),
    Db {
        #[command(subcommand)]
        command: Box<DbCommand>,
    },
    Seed,
    Reset,
}

#[derive(Debug, Subcommand)]
enum ActivityCommand {
    Add(AddActivityArgs),
    List(ListActivityArgs),
    Search(SearchActivityArgs),
    Types,
    SetStatus(SetStatusArgs),
}

#[derive(Debug, Args)]
struct AddActivityArgs {
    #[arg(long)]
    action_type: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    status: ActivityStatusArg,
    #[command(flatten)]
    metadata: ActivityMetadataArgs,
}

#[derive(Debug, Args)]
struct ActivityMetadataArgs {
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    duration_ms: Option<i64>,
    #[arg(long)]
    error: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Debug, Args)]
struct ListActivityArgs {
    #[arg(long)]
    action_type: Option<String>,
    #[arg(long)]
    status: Option<ActivityStatusArg>,
    #[arg(long)]
    cursor: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct SearchActivityArgs {
    #[arg(long)]
    query: String,
    #[arg(long)]
    action_type: Option<String>,
    #[arg(long)]
    status: Option<ActivityStatusArg>,
}

#[derive(Debug, Args)]
struct SetStatusArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    status: ActivityStatusArg,
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    Add(AddTaskArgs),
    Week(WeekArgs),
    Show(ShowTaskArgs),
    Update(UpdateTaskArgs),
    Remove(RemoveTaskArgs),
    Search(SearchTaskArgs),
    Types,
}

#[derive(Debug, Args)]
struct AddTaskArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    start_time: i64,
    #[arg(long)]
    end_time: Option<i64>,
    #[arg(long)]
    task_type: String,
    #[arg(long)]
    status: Option<TaskStatusArg>,
    #[arg(long)]
    color: Option<String>,
    #[command(flatten)]
    metadata: TaskMetadataArgs,
}

#[derive(Debug, Args)]
struct TaskMetadataArgs {
    #[arg(long)]
    location: Option<String>,
    #[arg(long = "attendee")]
    attendees: Vec<String>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long)]
    recurring: Option<bool>,
}

#[derive(Debug, Args)]
struct WeekArgs {
    #[arg(long)]
    week_start: i64,
    #[arg(long)]
    week_end: i64,
}

#[derive(Debug, Args)]
struct ShowTaskArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct UpdateTaskArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    start_time: Option<i64>,
    #[arg(long)]
    end_time: Option<i64>,
    #[arg(long)]
    task_type: Option<String>,
    #[arg(long)]
    status: Option<TaskStatusArg>,
    #[arg(long)]
    color: Option<String>,
    #[command(flatten)]
    metadata: TaskMetadataArgs,
}

#[derive(Debug, Args)]
struct RemoveTaskArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct SearchTaskArgs {
    #[arg(long)]
    query: String,
    #[arg(long)]
    task_type: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ContentCommand {
    Index(IndexContentArgs),
    Update(UpdateContentArgs),
    Remove(RemoveContentArgs),
    Types,
}

#[derive(Debug, Args)]
struct IndexContentArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    content_type: String,
    #[arg(long)]
    source_path: Option<String>,
    #[arg(long)]
    preview: Option<String>,
}

#[derive(Debug, Args)]
struct UpdateContentArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    preview: Option<String>,
}

#[derive(Debug, Args)]
struct RemoveContentArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct GlobalSearchArgs {
    #[arg(long)]
    query: String,
    #[arg(long)]
    content_type: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    SchemaVersion,
    Migrate(DbMigrateArgs),
}

#[derive(Debug, Args)]
struct DbMigrateArgs {
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActivityStatusArg {
    Success,
    Failed,
    Pending,
}

impl ActivityStatusArg {
    fn to_status(self) -> ActivityStatus {
        match self {
            Self::Success => ActivityStatus::Success,
            Self::Failed => ActivityStatus::Failed,
            Self::Pending => ActivityStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TaskStatusArg {
    Scheduled,
    Completed,
    Cancelled,
}

impl TaskStatusArg {
    fn to_status(self) -> TaskStatus {
        match self {
            Self::Scheduled => TaskStatus::Scheduled,
            Self::Completed => TaskStatus::Completed,
            Self::Cancelled => TaskStatus::Cancelled,
        }
    }
}

impl ActivityMetadataArgs {
    fn into_metadata(self) -> Option<ActivityMetadata> {
        if self.source.is_none()
            && self.target.is_none()
            && self.duration_ms.is_none()
            && self.error.is_none()
            && self.tags.is_empty()
        {
            return None;
        }
        Some(ActivityMetadata {
            source: self.source,
            target: self.target,
            duration_ms: self.duration_ms,
            error: self.error,
            tags: self.tags,
        })
    }
}

impl TaskMetadataArgs {
    fn into_metadata(self) -> Option<TaskMetadata> {
        if self.location.is_none()
            && self.attendees.is_empty()
            && self.priority.is_none()
            && self.recurring.is_none()
        {
            return None;
        }
        Some(TaskMetadata {
            location: self.location,
            attendees: self.attendees,
            priority: self.priority,
            recurring: self.recurring,
        })
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = DashboardApi::new(cli.db);
    match cli.command {
        Command::Activity { command } => run_activity(*command, &api),
        Command::Task { command } => run_task(*command, &api),
        Command::Content { command } => run_content(*command, &api),
        Command::Search(args) => run_search(args, &api),
        Command::Db { command } => run_db(*command, &api),
        Command::Seed => emit_json(serde_json::to_value(api.seed()?)?),
        Command::Reset => emit_json(serde_json::to_value(api.reset()?)?),
    }
}

fn run_activity(command: ActivityCommand, api: &DashboardApi) -> Result<()> {
    match command {
        ActivityCommand::Add(args) => {
            let activity = api.activity_add(AddActivityRequest {
                action_type: args.action_type,
                description: args.description,
                status: args.status.to_status(),
                metadata: args.metadata.into_metadata(),
            })?;
            emit_json(serde_json::to_value(activity)?)
        }
        ActivityCommand::List(args) => {
            let cursor = args.cursor.as_deref().map(ActivityId::parse).transpose()?;
            let page = api.activity_list(&ActivityListRequest {
                action_type: args.action_type,
                status: args.status.map(ActivityStatusArg::to_status),
                cursor,
                limit: args.limit,
            })?;
            emit_json(serde_json::to_value(page)?)
        }
        ActivityCommand::Search(args) => {
            let activities = api.activity_search(&ActivitySearchRequest {
                query: args.query,
                action_type: args.action_type,
                status: args.status.map(ActivityStatusArg::to_status),
            })?;
            emit_json(serde_json::json!({ "activities": activities }))
        }
        ActivityCommand::Types => {
            let types = api.action_types()?;
            emit_json(serde_json::json!({ "action_types": types }))
        }
        ActivityCommand::SetStatus(args) => {
            let activity = api.activity_set_status(&SetActivityStatusRequest {
                id: ActivityId::parse(&args.id)?,
                status: args.status.to_status(),
            })?;
            emit_json(serde_json::to_value(activity)?)
        }
    }
}

fn run_task(command: TaskCommand, api: &DashboardApi) -> Result<()> {
    match command {
        TaskCommand::Add(args) => {
            let task = api.task_add(AddTaskRequest {
                title: args.title,
                description: args.description,
                start_time: args.start_time,
                end_time: args.end_time,
                task_type: args.task_type,
                status: args.status.map(TaskStatusArg::to_status),
                color: args.color,
                metadata: args.metadata.into_metadata(),
            })?;
            emit_json(serde_json::to_value(task)?)
        }
        TaskCommand::Week(args) => {
            let tasks = api.week_tasks(&WeekTasksRequest {
                week_start: args.week_start,
                week_end: args.week_end,
            })?;
            emit_json(serde_json::json!({ "tasks": tasks }))
        }
        TaskCommand::Show(args) => {
            let task = api.task_get(&TaskId::parse(&args.id)?)?;
            emit_json(serde_json::json!({ "task": task }))
        }
        TaskCommand::Update(args) => {
            let patch = TaskPatch {
                title: args.title,
                description: args.description,
                start_time: args.start_time,
                end_time: args.end_time,
                task_type: args.task_type,
                status: args.status.map(TaskStatusArg::to_status),
                color: args.color,
                metadata: args.metadata.into_metadata(),
            };
            let task = api.task_update(&UpdateTaskRequest { id: TaskId::parse(&args.id)?, patch })?;
            emit_json(serde_json::to_value(task)?)
        }
        TaskCommand::Remove(args) => {
            let result = api.task_remove(&TaskId::parse(&args.id)?)?;
            emit_json(serde_json::to_value(result)?)
        }
        TaskCommand::Search(args) => {
            let tasks = api.task_search(&TaskSearchRequest {
                query: args.query,
                task_type: args.task_type,
            })?;
            emit_json(serde_json::json!({ "tasks": tasks }))
        }
        TaskCommand::Types => {
            let types = api.task_types()?;
            emit_json(serde_json::json!({ "task_types": types }))
        }
    }
}

fn run_content(command: ContentCommand, api: &DashboardApi) -> Result<()> {
    match command {
        ContentCommand::Index(args) => {
            let content = api.content_index(IndexContentRequest {
                title: args.title,
                content: args.content,
                content_type: args.content_type,
                source_path: args.source_path,
                preview: args.preview,
            })?;
            emit_json(serde_json::to_value(content)?)
        }
        ContentCommand::Update(args) => {
            let patch = ContentPatch {
                title: args.title,
                content: args.content,
                preview: args.preview,
            };
            let updated = api.content_update(&UpdateContentRequest {
                id: ContentId::parse(&args.id)?,
                patch,
            })?;
            emit_json(serde_json::json!({ "updated": updated }))
        }
        ContentCommand::Remove(args) => {
            let result = api.content_remove(&ContentId::parse(&args.id)?)?;
            emit_json(serde_json::to_value(result)?)
        }
        ContentCommand::Types => {
            let types = api.content_types()?;
            emit_json(serde_json::json!({ "content_types": types }))
        }
    }
}

fn run_search(args: GlobalSearchArgs, api: &DashboardApi) -> Result<()> {
    let results = api.global_search(&GlobalSearchRequest {
        query: args.query,
        content_type: args.content_type,
        limit: args.limit,
    })?;
    emit_json(serde_json::to_value(results)?)
}

fn run_db(command: DbCommand, api: &DashboardApi) -> Result<()> {
    match command {
        DbCommand::SchemaVersion => {
            let status = api.schema_status()?;
            emit_json(serde_json::json!({
                "current_version": status.current_version,
                "target_version": status.target_version,
                "pending_versions": status.pending_versions
            }))
        }
        DbCommand::Migrate(args) => {
            let result = api.migrate(args.dry_run)?;
            emit_json(serde_json::to_value(result)?)
        }
    }
}
