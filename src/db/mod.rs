mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::rules::{preset_rules, Preset, RuleLogic};

const WORK_ITEM_COLUMNS: &str = "id, project_id, parent_id, title, description, type, status, phase,
     priority, effort_estimate, metadata, version, created_at, updated_at";

const TASK_COLUMNS: &str = "id, work_item_id, title, description, type, status, effort_hours,
     priority, assigned_role, blocked_reason, version, created_at, updated_at";

const RULE_COLUMNS: &str = "id, project_id, code, name, description, category, enforcement_level,
     enabled, validation_logic, config, created_at, updated_at";

/// Handle to the relational store.
///
/// Cloning is cheap and shares the underlying connection. All reads and writes
/// that belong to one engine operation go through [`Database::transaction`],
/// which hands out a [`Store`] bound to a single SQLite transaction.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_millis(250))?;
        Self::configure(conn)
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "workgate")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("workgate.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> anyhow::Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls back
    /// every write made through the store.
    pub fn transaction<T>(&self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_busy)?;

        let value = f(&Store { conn: &tx })?;
        tx.commit().map_err(map_busy)?;
        Ok(value)
    }

    /// Run read-only queries against the store without opening a write transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&Store { conn: &conn })
    }

    // ============================================================
    // Convenience reads
    // ============================================================

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        self.read(|s| s.get_project(id))
    }

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        self.read(|s| s.get_all_projects())
    }

    pub fn get_work_item(&self, id: Uuid) -> Result<Option<WorkItem>> {
        self.read(|s| s.get_work_item(id))
    }

    pub fn get_work_items_by_project(&self, project_id: Uuid) -> Result<Vec<WorkItem>> {
        self.read(|s| s.get_work_items_by_project(project_id))
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        self.read(|s| s.get_task(id))
    }

    pub fn get_tasks_by_work_item(&self, work_item_id: Uuid) -> Result<Vec<Task>> {
        self.read(|s| s.get_tasks_by_work_item(work_item_id))
    }

    pub fn get_rules(&self, project_id: Uuid) -> Result<Vec<Rule>> {
        self.read(|s| s.get_rules(project_id))
    }

    pub fn get_dependencies(&self, kind: EntityKind, id: Uuid) -> Result<Vec<Uuid>> {
        self.read(|s| s.get_dependencies(kind, id))
    }

    pub fn get_blockers(&self, kind: EntityKind, id: Uuid) -> Result<Vec<Blocker>> {
        self.read(|s| s.get_blockers(kind, id))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Queries and writes scoped to one connection or transaction.
pub struct Store<'a> {
    conn: &'a Connection,
}

impl Store<'_> {
    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, rule_preset, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, description, rule_preset, created_at, updated_at
                 FROM projects WHERE id = ?",
                [id.to_string()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Insert a project and seed its rules from the chosen preset.
    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        if input.name.trim().is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let preset = input.rule_preset.unwrap_or_default();

        self.conn.execute(
            "INSERT INTO projects (id, name, description, rule_preset, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                preset.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        let seeded = self.seed_rules(id, preset)?;
        tracing::debug!("Seeded {} {} rules for project {}", seeded, preset, id);

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            rule_preset: preset,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        self.conn.execute(
            "UPDATE projects SET name = ?, description = ?, updated_at = ? WHERE id = ?",
            (&name, &description, now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Some(Project {
            id,
            name,
            description,
            rule_preset: existing.rule_preset,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Rule operations
    // ============================================================

    fn seed_rules(&self, project_id: Uuid, preset: Preset) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare(
            "INSERT INTO rules (id, project_id, code, name, description, category,
                 enforcement_level, enabled, validation_logic, config, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )?;

        let definitions = preset_rules(preset);
        for def in &definitions {
            stmt.execute((
                Uuid::new_v4().to_string(),
                project_id.to_string(),
                &def.code,
                &def.name,
                &def.description,
                def.category,
                def.enforcement.as_str(),
                serde_json::to_string(&def.logic)?,
                serde_json::to_string(&def.config)?,
                &now,
                &now,
            ))?;
        }

        Ok(definitions.len())
    }

    pub fn get_rules(&self, project_id: Uuid) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE project_id = ? ORDER BY code",
            RULE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rules = stmt
            .query_map([project_id.to_string()], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    pub fn get_enabled_rules(&self, project_id: Uuid) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE project_id = ? AND enabled = 1 ORDER BY code",
            RULE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rules = stmt
            .query_map([project_id.to_string()], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    pub fn get_rule(&self, project_id: Uuid, code: &str) -> Result<Option<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE project_id = ? AND code = ?",
            RULE_COLUMNS
        );
        let rule = self
            .conn
            .query_row(&sql, (project_id.to_string(), code), rule_from_row)
            .optional()?;
        Ok(rule)
    }

    /// Persist a rule's mutable fields (enabled flag, enforcement level, config).
    pub fn update_rule(&self, rule: &Rule) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE rules SET enabled = ?, enforcement_level = ?, config = ?, updated_at = ?
             WHERE project_id = ? AND code = ?",
            (
                rule.enabled,
                rule.enforcement.as_str(),
                serde_json::to_string(&rule.config)?,
                Utc::now().to_rfc3339(),
                rule.project_id.to_string(),
                &rule.code,
            ),
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("rule {}", rule.code)));
        }
        Ok(())
    }

    // ============================================================
    // Work item operations
    // ============================================================

    pub fn get_work_item(&self, id: Uuid) -> Result<Option<WorkItem>> {
        let sql = format!("SELECT {} FROM work_items WHERE id = ?", WORK_ITEM_COLUMNS);
        let item = self
            .conn
            .query_row(&sql, [id.to_string()], work_item_from_row)
            .optional()?;
        Ok(item)
    }

    pub fn get_work_items_by_project(&self, project_id: Uuid) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT {} FROM work_items WHERE project_id = ? ORDER BY created_at, title",
            WORK_ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([project_id.to_string()], work_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn get_child_work_items(&self, parent_id: Uuid) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT {} FROM work_items WHERE parent_id = ? ORDER BY created_at, title",
            WORK_ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([parent_id.to_string()], work_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO work_items (id, project_id, parent_id, title, description, type, status,
                 phase, priority, effort_estimate, metadata, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                item.id.to_string(),
                item.project_id.to_string(),
                item.parent_id.map(|u| u.to_string()),
                &item.title,
                &item.description,
                item.item_type.as_str(),
                item.status.as_str(),
                item.phase.map(|p| p.as_str()),
                item.priority.as_str(),
                item.effort_estimate,
                serde_json::to_string(&item.metadata)?,
                item.version,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Write every mutable column of `item`, guarded by its current version.
    ///
    /// On success the stored version becomes `item.version + 1`.
    pub fn update_work_item(&self, item: &WorkItem) -> Result<i64> {
        let rows = self.conn.execute(
            "UPDATE work_items
             SET title = ?, description = ?, status = ?, phase = ?, priority = ?,
                 effort_estimate = ?, metadata = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
            rusqlite::params![
                &item.title,
                &item.description,
                item.status.as_str(),
                item.phase.map(|p| p.as_str()),
                item.priority.as_str(),
                item.effort_estimate,
                serde_json::to_string(&item.metadata)?,
                item.updated_at.to_rfc3339(),
                item.id.to_string(),
                item.version,
            ],
        )?;

        if rows == 0 {
            return Err(Error::conflict(EntityKind::WorkItem, item.id));
        }
        Ok(item.version + 1)
    }

    pub fn delete_work_item(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM work_items WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, [id.to_string()], task_from_row)
            .optional()?;
        Ok(task)
    }

    pub fn get_tasks_by_work_item(&self, work_item_id: Uuid) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE work_item_id = ? ORDER BY created_at, title",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([work_item_id.to_string()], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn insert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, work_item_id, title, description, type, status, effort_hours,
                 priority, assigned_role, blocked_reason, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                task.id.to_string(),
                task.work_item_id.to_string(),
                &task.title,
                &task.description,
                task.task_type.as_str(),
                task.status.as_str(),
                task.effort_hours,
                task.priority.as_str(),
                &task.assigned_role,
                &task.blocked_reason,
                task.version,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Write every mutable column of `task`, guarded by its current version.
    pub fn update_task(&self, task: &Task) -> Result<i64> {
        let rows = self.conn.execute(
            "UPDATE tasks
             SET title = ?, description = ?, status = ?, effort_hours = ?, priority = ?,
                 assigned_role = ?, blocked_reason = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
            rusqlite::params![
                &task.title,
                &task.description,
                task.status.as_str(),
                task.effort_hours,
                task.priority.as_str(),
                &task.assigned_role,
                &task.blocked_reason,
                task.updated_at.to_rfc3339(),
                task.id.to_string(),
                task.version,
            ],
        )?;

        if rows == 0 {
            return Err(Error::conflict(EntityKind::Task, task.id));
        }
        Ok(task.version + 1)
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Current status of a task or work item, if it exists.
    pub fn get_status(&self, kind: EntityKind, id: Uuid) -> Result<Option<Status>> {
        let sql = match kind {
            EntityKind::WorkItem => "SELECT status FROM work_items WHERE id = ?",
            EntityKind::Task => "SELECT status FROM tasks WHERE id = ?",
        };
        let status = self
            .conn
            .query_row(sql, [id.to_string()], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(status.map(|s| Status::from_str(&s).unwrap_or(Status::Draft)))
    }

    // ============================================================
    // Dependency and blocker edges
    // ============================================================

    pub fn insert_dependency(&self, edge: &Dependency) -> Result<()> {
        self.conn.execute(
            "INSERT INTO dependencies (entity_kind, entity_id, depends_on_id, created_at)
             VALUES (?, ?, ?, ?)",
            (
                edge.entity_kind.as_str(),
                edge.entity_id.to_string(),
                edge.depends_on_id.to_string(),
                edge.created_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn delete_dependency(&self, kind: EntityKind, entity_id: Uuid, depends_on_id: Uuid) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM dependencies WHERE entity_kind = ? AND entity_id = ? AND depends_on_id = ?",
            (kind.as_str(), entity_id.to_string(), depends_on_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    pub fn dependency_exists(&self, kind: EntityKind, entity_id: Uuid, depends_on_id: Uuid) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM dependencies
                 WHERE entity_kind = ? AND entity_id = ? AND depends_on_id = ?)",
            (kind.as_str(), entity_id.to_string(), depends_on_id.to_string()),
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// What `entity_id` depends on.
    pub fn get_dependencies(&self, kind: EntityKind, entity_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT depends_on_id FROM dependencies
             WHERE entity_kind = ? AND entity_id = ? ORDER BY created_at",
        )?;
        let ids = stmt
            .query_map((kind.as_str(), entity_id.to_string()), |row| {
                Ok(parse_uuid(row.get::<_, String>(0)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Every dependency edge of one kind as `(entity, depends_on)` pairs.
    pub fn get_dependency_edges(&self, kind: EntityKind) -> Result<Vec<(Uuid, Uuid)>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, depends_on_id FROM dependencies WHERE entity_kind = ?",
        )?;
        let edges = stmt
            .query_map([kind.as_str()], |row| {
                Ok((
                    parse_uuid(row.get::<_, String>(0)?),
                    parse_uuid(row.get::<_, String>(1)?),
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn insert_blocker(&self, blocker: &Blocker) -> Result<()> {
        self.conn.execute(
            "INSERT INTO blockers (entity_kind, entity_id, blocker_id, reason, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                blocker.entity_kind.as_str(),
                blocker.entity_id.to_string(),
                blocker.blocker_id.to_string(),
                &blocker.reason,
                blocker.created_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn delete_blocker(&self, kind: EntityKind, entity_id: Uuid, blocker_id: Uuid) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM blockers WHERE entity_kind = ? AND entity_id = ? AND blocker_id = ?",
            (kind.as_str(), entity_id.to_string(), blocker_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    pub fn get_blockers(&self, kind: EntityKind, entity_id: Uuid) -> Result<Vec<Blocker>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_kind, entity_id, blocker_id, reason, created_at FROM blockers
             WHERE entity_kind = ? AND entity_id = ? ORDER BY created_at",
        )?;
        let blockers = stmt
            .query_map((kind.as_str(), entity_id.to_string()), |row| {
                Ok(Blocker {
                    entity_kind: EntityKind::from_str(&row.get::<_, String>(0)?)
                        .unwrap_or(kind),
                    entity_id: parse_uuid(row.get::<_, String>(1)?),
                    blocker_id: parse_uuid(row.get::<_, String>(2)?),
                    reason: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(blockers)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        rule_preset: Preset::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn work_item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        parent_id: row.get::<_, Option<String>>(2)?.map(parse_uuid),
        title: row.get(3)?,
        description: row.get(4)?,
        item_type: WorkItemType::from_str(&row.get::<_, String>(5)?)
            .unwrap_or(WorkItemType::Feature),
        status: Status::from_str(&row.get::<_, String>(6)?).unwrap_or(Status::Draft),
        phase: row
            .get::<_, Option<String>>(7)?
            .and_then(|p| Phase::from_str(&p)),
        priority: Priority::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
        effort_estimate: row.get(9)?,
        metadata: parse_json(row.get::<_, String>(10)?),
        version: row.get(11)?,
        created_at: parse_datetime(row.get::<_, String>(12)?),
        updated_at: parse_datetime(row.get::<_, String>(13)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        work_item_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        task_type: TaskType::from_str(&row.get::<_, String>(4)?).unwrap_or(TaskType::Simple),
        status: Status::from_str(&row.get::<_, String>(5)?).unwrap_or(Status::Draft),
        effort_hours: row.get(6)?,
        priority: Priority::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
        assigned_role: row.get(8)?,
        blocked_reason: row.get(9)?,
        version: row.get(10)?,
        created_at: parse_datetime(row.get::<_, String>(11)?),
        updated_at: parse_datetime(row.get::<_, String>(12)?),
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let logic_json: String = row.get(8)?;
    let validation_logic: RuleLogic = serde_json::from_str(&logic_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Rule {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        enforcement: Enforcement::from_str(&row.get::<_, String>(6)?)
            .unwrap_or(Enforcement::Guide),
        enabled: row.get(7)?,
        validation_logic,
        config: parse_json(row.get::<_, String>(9)?),
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

/// Busy or locked databases mean another writer got there first.
fn map_busy(e: rusqlite::Error) -> Error {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            Error::ConcurrentModification("database held by another writer".to_string())
        }
        _ => Error::Database(e),
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json(s: String) -> Value {
    serde_json::from_str(&s).unwrap_or_else(|_| Value::Object(Default::default()))
}
