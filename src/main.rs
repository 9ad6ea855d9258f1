use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use workgate::db::Database;
use workgate::error::HasAdvisories;
use workgate::models::*;
use workgate::rules::Preset;
use workgate::{Engine, EngineConfig, OperationOutcome};

#[derive(Parser)]
#[command(name = "wg")]
#[command(about = "Workflow state and rule-gate engine")]
struct Cli {
    /// Database file (overrides config and WORKGATE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project and seed its rules from a preset
    Init {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// minimal, standard, professional or enterprise
        #[arg(short, long, value_parser = parse_preset)]
        preset: Option<Preset>,
    },
    /// List projects
    Projects,
    /// Work item commands
    #[command(subcommand)]
    Item(ItemCommands),
    /// Task commands
    #[command(subcommand)]
    Task(TaskCommands),
    /// Request a status transition
    Status {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        id: Uuid,
        #[arg(value_parser = parse_status)]
        status: Status,
        /// Recorded as the blocked reason when moving a task to blocked
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Evaluate a transition without applying it
    Check {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        id: Uuid,
        #[arg(value_parser = parse_status)]
        status: Status,
    },
    /// Advance a work item's phase
    Phase {
        id: Uuid,
        #[arg(value_parser = parse_phase)]
        phase: Phase,
    },
    /// Add (or remove) a dependency: FROM depends on TO
    Depend {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        from: Uuid,
        to: Uuid,
        #[arg(long)]
        remove: bool,
    },
    /// Mark ENTITY as blocked by BLOCKER
    Block {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        entity: Uuid,
        blocker: Uuid,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Resolve a blocker
    Unblock {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        entity: Uuid,
        blocker: Uuid,
    },
    /// Show pending dependencies and open blockers
    CanStart {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        id: Uuid,
    },
    /// Show the orchestrator for a work item's phase
    Route { id: Uuid },
    /// Rule commands
    #[command(subcommand)]
    Rules(RuleCommands),
}

#[derive(Subcommand)]
enum ItemCommands {
    Create {
        #[arg(long)]
        project: Uuid,
        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: WorkItemType,
        #[arg(long)]
        title: String,
        #[arg(long)]
        parent: Option<Uuid>,
        #[command(flatten)]
        fields: ItemFields,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: ItemFields,
    },
    Show { id: Uuid },
    List {
        #[arg(long)]
        project: Uuid,
    },
}

#[derive(Args)]
struct ItemFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Effort estimate in hours
    #[arg(long)]
    estimate: Option<f64>,
    /// JSON object
    #[arg(long, value_parser = parse_json)]
    metadata: Option<serde_json::Value>,
}

#[derive(Subcommand)]
enum TaskCommands {
    Create {
        #[arg(long)]
        item: Uuid,
        #[arg(long = "type", value_parser = parse_task_type)]
        task_type: TaskType,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    List {
        #[arg(long)]
        item: Uuid,
    },
}

#[derive(Args)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Effort in hours
    #[arg(long)]
    hours: Option<f64>,
    /// Worker role; defaults to the role mapped to the task type
    #[arg(long)]
    role: Option<String>,
}

#[derive(Subcommand)]
enum RuleCommands {
    List { project: Uuid },
    Enable { project: Uuid, code: String },
    Disable { project: Uuid, code: String },
    /// Set how a rule's violations are treated
    Enforce {
        project: Uuid,
        code: String,
        /// block, limit, guide or enhance
        #[arg(value_parser = parse_enforcement)]
        level: Enforcement,
    },
    /// Merge a JSON object into a rule's config; null removes a key
    Configure {
        project: Uuid,
        code: String,
        #[arg(value_parser = parse_json)]
        config: serde_json::Value,
    },
}

fn parse_with<T>(s: &str, what: &str, parse: fn(&str) -> Option<T>) -> Result<T, String> {
    parse(&s.to_ascii_lowercase()).ok_or_else(|| format!("unknown {}: {}", what, s))
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    parse_with(&s.replace('-', "_"), "entity kind", EntityKind::from_str)
}

fn parse_status(s: &str) -> Result<Status, String> {
    parse_with(s, "status", Status::from_str)
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    parse_with(s, "priority", Priority::from_str)
}

fn parse_item_type(s: &str) -> Result<WorkItemType, String> {
    parse_with(&s.replace('-', "_"), "work item type", WorkItemType::from_str)
}

fn parse_task_type(s: &str) -> Result<TaskType, String> {
    parse_with(s, "task type", TaskType::from_str)
}

fn parse_enforcement(s: &str) -> Result<Enforcement, String> {
    parse_with(s, "enforcement level", Enforcement::from_str)
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    parse_with(s, "preset", Preset::from_str)
}

fn parse_phase(s: &str) -> Result<Phase, String> {
    let upper = s.to_ascii_uppercase();
    Phase::from_str(&upper)
        .or_else(|| Phase::ALL.into_iter().find(|p| p.as_str().starts_with(&upper)))
        .ok_or_else(|| format!("unknown phase: {}", s))
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}

/// Initialize tracing to stderr so stdout carries only JSON
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "workgate=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[derive(Serialize)]
struct Output<T> {
    #[serde(flatten)]
    outcome: OperationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// Print the outcome as JSON and map failure to a non-zero exit code.
fn report<T: Serialize + HasAdvisories>(result: workgate::Result<T>) -> anyhow::Result<ExitCode> {
    let outcome = OperationOutcome::from_result(&result);
    let success = outcome.success;
    let output = Output {
        outcome,
        data: result.ok(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn open_database(config: &EngineConfig) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = EngineConfig::load();
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    let db = open_database(&config)?;
    let engine = Engine::new(db, config);

    match cli.command {
        Commands::Init {
            name,
            description,
            preset,
        } => report(engine.init_project(&name, description, preset)),
        Commands::Projects => report(engine.database().get_all_projects().map(Listing)),
        Commands::Item(cmd) => match cmd {
            ItemCommands::Create {
                project,
                item_type,
                title,
                parent,
                fields,
            } => report(engine.create_work_item(
                project,
                CreateWorkItemInput {
                    parent_id: parent,
                    title,
                    description: fields.description,
                    item_type,
                    priority: fields.priority,
                    effort_estimate: fields.estimate,
                    metadata: fields.metadata,
                },
            )),
            ItemCommands::Update { id, title, fields } => report(engine.update_work_item(
                id,
                UpdateWorkItemInput {
                    title,
                    description: fields.description,
                    priority: fields.priority,
                    effort_estimate: fields.estimate,
                    metadata: fields.metadata,
                },
            )),
            ItemCommands::Show { id } => report(
                engine
                    .database()
                    .get_work_item(id)
                    .and_then(|item| item.ok_or_else(|| workgate::Error::NotFound(format!("work_item {}", id)))),
            ),
            ItemCommands::List { project } => {
                report(engine.database().get_work_items_by_project(project).map(Listing))
            }
        },
        Commands::Task(cmd) => match cmd {
            TaskCommands::Create {
                item,
                task_type,
                title,
                fields,
            } => report(engine.create_task(
                item,
                CreateTaskInput {
                    title,
                    description: fields.description,
                    task_type,
                    effort_hours: fields.hours,
                    priority: fields.priority,
                    assigned_role: fields.role,
                },
            )),
            TaskCommands::Update { id, title, fields } => report(engine.update_task(
                id,
                UpdateTaskInput {
                    title,
                    description: fields.description,
                    effort_hours: fields.hours,
                    priority: fields.priority,
                    assigned_role: fields.role,
                },
            )),
            TaskCommands::List { item } => {
                report(engine.database().get_tasks_by_work_item(item).map(Listing))
            }
        },
        Commands::Status {
            kind,
            id,
            status,
            reason,
        } => report(engine.request_status_transition(kind, id, status, reason)),
        Commands::Check { kind, id, status } => {
            report(engine.check_transition(kind, id, status).map(Preview))
        }
        Commands::Phase { id, phase } => report(engine.request_phase_advance(id, phase)),
        Commands::Depend {
            kind,
            from,
            to,
            remove,
        } => {
            if remove {
                report(engine.remove_dependency(kind, from, to))
            } else {
                report(engine.add_dependency(kind, from, to))
            }
        }
        Commands::Block {
            kind,
            entity,
            blocker,
            reason,
        } => report(engine.add_blocker(kind, entity, blocker, reason)),
        Commands::Unblock {
            kind,
            entity,
            blocker,
        } => report(engine.resolve_blocker(kind, entity, blocker)),
        Commands::CanStart { kind, id } => report(engine.readiness(kind, id)),
        Commands::Route { id } => report(engine.route(id)),
        Commands::Rules(cmd) => match cmd {
            RuleCommands::List { project } => report(engine.rules(project).map(Listing)),
            RuleCommands::Enable { project, code } => {
                report(engine.set_rule_enabled(project, &code, true))
            }
            RuleCommands::Disable { project, code } => {
                report(engine.set_rule_enabled(project, &code, false))
            }
            RuleCommands::Enforce {
                project,
                code,
                level,
            } => report(engine.set_rule_enforcement(project, &code, level)),
            RuleCommands::Configure {
                project,
                code,
                config,
            } => report(engine.set_rule_config(project, &code, config)),
        },
    }
}

/// A list of records with no advisories of its own.
#[derive(Serialize)]
#[serde(transparent)]
struct Listing<T>(Vec<T>);

impl<T> HasAdvisories for Listing<T> {}

/// A dry-run gate result. Its violations are reported as data, not advisories.
#[derive(Serialize)]
#[serde(transparent)]
struct Preview(workgate::engine::GateResult);

impl HasAdvisories for Preview {}
