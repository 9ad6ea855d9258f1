use chrono::Utc;
use serde_json::json;
use speculate2::speculate;
use uuid::Uuid;
use workgate::db::Database;
use workgate::models::*;
use workgate::rules::Preset;

fn create_test_project(db: &Database, preset: Preset) -> Project {
    db.transaction(|store| {
        store.create_project(CreateProjectInput {
            name: "Test Project".to_string(),
            description: None,
            rule_preset: Some(preset),
        })
    })
    .expect("Failed to create project")
}

fn new_work_item(project_id: Uuid) -> WorkItem {
    let now = Utc::now();
    WorkItem {
        id: Uuid::new_v4(),
        project_id,
        parent_id: None,
        title: "Item".to_string(),
        description: None,
        item_type: WorkItemType::Feature,
        status: Status::Draft,
        phase: None,
        priority: Priority::Medium,
        effort_estimate: None,
        metadata: json!({ "owner": "ops" }),
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

fn new_task(work_item_id: Uuid, task_type: TaskType) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        work_item_id,
        title: "Task".to_string(),
        description: None,
        task_type,
        status: Status::Draft,
        effort_hours: Some(1.5),
        priority: Priority::High,
        assigned_role: None,
        blocked_reason: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        it "seeds the preset's rules on creation" {
            let project = create_test_project(&db, Preset::Minimal);
            let rules = db.get_rules(project.id).expect("Query failed");

            assert_eq!(project.rule_preset, Preset::Minimal);
            assert_eq!(rules.len(), workgate::rules::preset_rules(Preset::Minimal).len());
            assert!(rules.iter().all(|r| r.enabled));
            assert!(rules.iter().any(|r| r.code == "TIME-001"));
        }

        it "rejects an empty name" {
            let result = db.transaction(|store| {
                store.create_project(CreateProjectInput {
                    name: "  ".to_string(),
                    description: None,
                    rule_preset: None,
                })
            });
            assert!(result.is_err());
            assert!(db.get_all_projects().expect("Query failed").is_empty());
        }

        it "returns all projects ordered by name" {
            for name in ["Zebra", "Alpha"] {
                db.transaction(|store| {
                    store.create_project(CreateProjectInput {
                        name: name.to_string(),
                        description: None,
                        rule_preset: None,
                    })
                }).expect("Failed to create");
            }

            let projects = db.get_all_projects().expect("Query failed");
            assert_eq!(projects.len(), 2);
            assert_eq!(projects[0].name, "Alpha");
            assert_eq!(projects[1].name, "Zebra");
        }

        it "updates name and description" {
            let project = create_test_project(&db, Preset::Standard);
            let updated = db.transaction(|store| {
                store.update_project(project.id, UpdateProjectInput {
                    name: Some("Renamed".to_string()),
                    description: Some("Now described".to_string()),
                })
            }).expect("Update failed").expect("Project missing");

            assert_eq!(updated.name, "Renamed");
            assert_eq!(updated.rule_preset, Preset::Standard);
        }

        it "cascades deletes to work items, tasks, rules and edges" {
            let project = create_test_project(&db, Preset::Minimal);
            let item = new_work_item(project.id);
            let a = new_task(item.id, TaskType::Design);
            let b = new_task(item.id, TaskType::Testing);

            db.transaction(|store| {
                store.insert_work_item(&item)?;
                store.insert_task(&a)?;
                store.insert_task(&b)?;
                store.insert_dependency(&Dependency {
                    entity_kind: EntityKind::Task,
                    entity_id: a.id,
                    depends_on_id: b.id,
                    created_at: Utc::now(),
                })
            }).expect("Setup failed");

            let deleted = db.transaction(|store| store.delete_project(project.id)).expect("Delete failed");
            assert!(deleted);

            assert!(db.get_work_item(item.id).expect("Query failed").is_none());
            assert!(db.get_task(a.id).expect("Query failed").is_none());
            assert!(db.get_rules(project.id).expect("Query failed").is_empty());
            assert!(db.read(|s| s.get_dependency_edges(EntityKind::Task)).expect("Query failed").is_empty());
        }
    }

    describe "rules" {
        it "round-trips validation logic and config" {
            let project = create_test_project(&db, Preset::Minimal);
            let rule = db.read(|s| s.get_rule(project.id, "WF-001")).expect("Query failed").expect("Rule missing");

            assert_eq!(rule.enforcement, Enforcement::Block);
            assert!(rule.validation_logic.detail.is_some());
            assert_eq!(rule.config["required"]["bugfix"], json!(["analysis", "implementation", "testing"]));
        }

        it "excludes disabled rules from the enabled set" {
            let project = create_test_project(&db, Preset::Minimal);
            let total = db.get_rules(project.id).expect("Query failed").len();

            db.transaction(|store| {
                let mut rule = store.get_rule(project.id, "TIME-002")?.expect("Rule missing");
                rule.enabled = false;
                store.update_rule(&rule)
            }).expect("Update failed");

            let enabled = db.read(|s| s.get_enabled_rules(project.id)).expect("Query failed");
            assert_eq!(enabled.len(), total - 1);
            assert!(enabled.iter().all(|r| r.code != "TIME-002"));
        }
    }

    describe "work_items" {
        it "stores and loads every column" {
            let project = create_test_project(&db, Preset::Minimal);
            let item = new_work_item(project.id);
            db.transaction(|store| store.insert_work_item(&item)).expect("Insert failed");

            let loaded = db.get_work_item(item.id).expect("Query failed").expect("Item missing");
            assert_eq!(loaded.title, "Item");
            assert_eq!(loaded.item_type, WorkItemType::Feature);
            assert_eq!(loaded.status, Status::Draft);
            assert!(loaded.phase.is_none());
            assert_eq!(loaded.metadata, json!({ "owner": "ops" }));
            assert_eq!(loaded.version, 1);
        }

        it "lists children of a parent" {
            let project = create_test_project(&db, Preset::Minimal);
            let parent = new_work_item(project.id);
            let mut child = new_work_item(project.id);
            child.parent_id = Some(parent.id);

            db.transaction(|store| {
                store.insert_work_item(&parent)?;
                store.insert_work_item(&child)
            }).expect("Insert failed");

            let children = db.read(|s| s.get_child_work_items(parent.id)).expect("Query failed");
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].id, child.id);
        }

        it "rejects a stale version" {
            let project = create_test_project(&db, Preset::Minimal);
            let mut item = new_work_item(project.id);
            db.transaction(|store| store.insert_work_item(&item)).expect("Insert failed");

            item.title = "First".to_string();
            let version = db.transaction(|store| store.update_work_item(&item)).expect("Update failed");
            assert_eq!(version, 2);

            // Still holding version 1
            item.title = "Second".to_string();
            let err = db.transaction(|store| store.update_work_item(&item)).unwrap_err();
            assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
            assert!(err.is_retryable());

            let stored = db.get_work_item(item.id).expect("Query failed").expect("Item missing");
            assert_eq!(stored.title, "First");
        }
    }

    describe "tasks" {
        it "orders tasks by creation within a work item" {
            let project = create_test_project(&db, Preset::Minimal);
            let item = new_work_item(project.id);
            let first = new_task(item.id, TaskType::Design);
            let second = new_task(item.id, TaskType::Implementation);

            db.transaction(|store| {
                store.insert_work_item(&item)?;
                store.insert_task(&first)?;
                store.insert_task(&second)
            }).expect("Insert failed");

            let tasks = db.get_tasks_by_work_item(item.id).expect("Query failed");
            assert_eq!(tasks.len(), 2);
            assert_eq!(tasks[0].task_type, TaskType::Design);
            assert_eq!(tasks[1].effort_hours, Some(1.5));
        }

        it "removes a deleted task's edges" {
            let project = create_test_project(&db, Preset::Minimal);
            let item = new_work_item(project.id);
            let a = new_task(item.id, TaskType::Design);
            let b = new_task(item.id, TaskType::Testing);

            db.transaction(|store| {
                store.insert_work_item(&item)?;
                store.insert_task(&a)?;
                store.insert_task(&b)?;
                store.insert_blocker(&Blocker {
                    entity_kind: EntityKind::Task,
                    entity_id: a.id,
                    blocker_id: b.id,
                    reason: Some("waiting".to_string()),
                    created_at: Utc::now(),
                })
            }).expect("Setup failed");

            db.transaction(|store| store.delete_task(b.id)).expect("Delete failed");
            assert!(db.get_blockers(EntityKind::Task, a.id).expect("Query failed").is_empty());
        }
    }

    describe "transactions" {
        it "rolls back every write when the closure fails" {
            let project = create_test_project(&db, Preset::Minimal);
            let item = new_work_item(project.id);

            let result: workgate::Result<()> = db.transaction(|store| {
                store.insert_work_item(&item)?;
                Err(workgate::Error::InvalidInput("abort".to_string()))
            });

            assert!(result.is_err());
            assert!(db.get_work_item(item.id).expect("Query failed").is_none());
        }
    }
}
