//! End-to-end migration planning scenarios.

use migrate_plan::schema::builder::{DatabaseBuilder, TableBuilder};
use migrate_plan::schema::{Database, IndexKind, ReferentialAction};
use migrate_plan::{plan, Operation};

fn accounts_tasks_db() -> Database {
    DatabaseBuilder::new()
        .table("accounts", |t| {
            t.column("id", "int", false).pk(&["id"]);
        })
        .table("tasks", |t| {
            t.column("id", "int", false)
                .column("account_id", "int", false)
                .column("repeating_task_id", "int", true)
                .column("name", "varchar", false)
                .pk(&["id"])
                .index("account_id_tasks", &["account_id"], IndexKind::Regular)
                .fk("account_id_tasks_fk", &["account_id"], "accounts", &["id"]);
        })
        .build()
}

#[test]
fn s4_adding_a_column_unblocks_a_deferred_fk() {
    let db_from = accounts_tasks_db();

    let mut db_to = db_from.clone();
    db_to
        .get_table_mut("tasks")
        .unwrap()
        .columns
        .insert(
            "subject".to_string(),
            migrate_plan::Column {
                name: "subject".to_string(),
                type_name: "TEXT".to_string(),
                length: None,
                unsigned: false,
                nullable: true,
                default: None,
                auto_increment: false,
                character_set: None,
                collation: None,
            },
        );
    db_to.get_table_mut("tasks").unwrap().constraints.insert(
        "repeating_task_id_tasks_fk".to_string(),
        migrate_plan::Constraint {
            name: "repeating_task_id_tasks_fk".to_string(),
            local_columns: vec!["repeating_task_id".to_string()],
            foreign_table: "repeating_tasks".to_string(),
            foreign_columns: vec!["id".to_string()],
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::Cascade,
        },
    );
    db_to.add_table(
        TableBuilder::new("repeating_tasks")
            .column("id", "int", false)
            .column("task_id", "int", false)
            .pk(&["id"])
            .index("task_id_rts", &["task_id"], IndexKind::Regular)
            .fk("task_id_rts_fk", &["task_id"], "tasks", &["id"])
            .build(),
    );

    let result = plan(&db_to, Some(&db_from));
    assert!(result.errors_1215.is_empty(), "{:?}", result.errors_1215);
    assert_eq!(result.len(), 3);

    match &result.operations[0] {
        Operation::CreateTable(t) => assert_eq!(t.name, "repeating_tasks"),
        other => panic!("expected CreateTable(repeating_tasks) first, got {other:?}"),
    }

    let alter_subject = result.operations[1].to_string();
    assert!(
        alter_subject.contains("ADD `subject`"),
        "unexpected second op: {alter_subject}"
    );

    let deferred_fk = result.operations[2].to_string();
    assert!(
        deferred_fk.contains("ADD CONSTRAINT `repeating_task_id_tasks_fk`"),
        "unexpected third op: {deferred_fk}"
    );
}

#[test]
fn s5_constraint_change_drops_fk_before_the_combined_alter() {
    let db_from = DatabaseBuilder::new()
        .table("accounts", |t| {
            t.column("id", "int", false).pk(&["id"]);
        })
        .table("tasks", |t| {
            t.column("id", "int", false)
                .column("account_id", "int", false)
                .pk(&["id"])
                .index("account_id_tasks", &["account_id"], IndexKind::Regular)
                .fk_with_actions(
                    "task_id_fk",
                    &["account_id"],
                    "accounts",
                    &["id"],
                    ReferentialAction::Cascade,
                    ReferentialAction::Cascade,
                );
        })
        .build();

    let mut db_to = db_from.clone();
    {
        let tasks = db_to.get_table_mut("tasks").unwrap();
        tasks.constraints.shift_remove("task_id_fk");
        tasks.constraints.insert(
            "task_id_fk_renamed".to_string(),
            migrate_plan::Constraint {
                name: "task_id_fk_renamed".to_string(),
                local_columns: vec!["account_id".to_string()],
                foreign_table: "accounts".to_string(),
                foreign_columns: vec!["id".to_string()],
                on_delete: ReferentialAction::Restrict,
                on_update: ReferentialAction::Cascade,
            },
        );
    }

    let result = plan(&db_to, Some(&db_from));
    assert!(result.errors_1215.is_empty());
    assert_eq!(result.len(), 2);
    assert_eq!(
        result.operations[0].to_string(),
        "ALTER TABLE `tasks` DROP FOREIGN KEY `task_id_fk`"
    );
    let second = result.operations[1].to_string();
    assert!(second.starts_with("ALTER TABLE `tasks` "));
    assert!(second.contains("ADD CONSTRAINT `task_id_fk_renamed`"));
}
