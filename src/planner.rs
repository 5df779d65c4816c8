//! The migration planner: orders DDL operations across tables so that
//! no intermediate state violates a foreign key (MySQL error 1215).
//!
//! The algorithm runs in eight phases against a mutable tracking
//! schema: pre-validate the target in isolation, diff at table
//! granularity, fixed-point-add new tables as their foreign keys
//! become satisfiable, apply table updates (deferring foreign key
//! work), re-run the add pass, break any remaining mutual foreign-key
//! cycles by creating tables without their cyclic constraints and
//! restoring them afterward, drop removed tables, then flush every
//! deferred foreign-key operation.

use std::fmt;

use crate::differ::{self, Diff};
use crate::operation::{AlterAction, Operation};
use crate::schema::{Database, Table};

/// The result of [`plan`]: the ordered operation stream plus any
/// unsatisfiable foreign keys found along the way.
///
/// When `errors_1215` is non-empty, `operations` is always empty —
/// callers must treat a non-empty `errors_1215` as "do not apply any of
/// this".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanResult {
    pub operations: Vec<Operation>,
    pub errors_1215: Vec<String>,
    pub warnings: Vec<String>,
}

impl PlanResult {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Display for PlanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .operations
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        f.write_str(&rendered)
    }
}

impl IntoIterator for PlanResult {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

/// Compute the ordered DDL operation stream that transforms `db_from`
/// (or an empty schema, if `None`) into `db_to`.
pub fn plan(db_to: &Database, db_from: Option<&Database>) -> PlanResult {
    // Phase 0 — pre-validation: prove db_to is internally consistent
    // before any destructive planning against a real db_from. A schema
    // that can't even migrate from nothing can't migrate from anything.
    if let Some(_from) = db_from {
        let check = plan(db_to, None);
        if !check.errors_1215.is_empty() {
            return PlanResult {
                operations: Vec::new(),
                errors_1215: check.errors_1215,
                warnings: check.warnings,
            };
        }
    }

    let mut tracking = db_from.cloned().unwrap_or_default();
    let mut warnings = Vec::new();

    // Tables with parser-reported errors are excluded from migration
    // entirely, as if they did not exist in the target schema.
    let usable_tables: Vec<&Table> = db_to
        .tables
        .values()
        .filter(|t| {
            if t.has_errors() {
                warnings.push(format!(
                    "table `{}` has parse errors and was excluded from the plan",
                    t.name
                ));
                false
            } else {
                true
            }
        })
        .collect();

    // Phase 1 — diff at table granularity, preserving db_to's insertion
    // order for adds/updates and the tracking schema's order for drops.
    let mut tables_to_add: Vec<String> = usable_tables
        .iter()
        .filter(|t| !tracking.has_table(&t.name))
        .map(|t| t.name.clone())
        .collect();
    let tables_to_update: Vec<String> = usable_tables
        .iter()
        .filter(|t| tracking.has_table(&t.name))
        .map(|t| t.name.clone())
        .collect();
    let tables_to_remove: Vec<String> = tracking
        .tables
        .keys()
        .filter(|name| !db_to.has_table(name))
        .cloned()
        .collect();

    let mut operations = Vec::new();

    // Phase 2 — first fixed-point add pass.
    let (mut errors_1215, adds) = process_adds(db_to, &mut tracking, &mut tables_to_add);
    operations.extend(adds);

    // Phase 3 — unsatisfiable detection within remaining adds is folded
    // into `process_adds` itself (it re-checks against `db_to` once the
    // fixed point is reached); a non-empty `errors_1215` here with no
    // `db_from` means we're done.
    if !errors_1215.is_empty() && db_from.is_none() {
        return PlanResult {
            operations: Vec::new(),
            errors_1215,
            warnings,
        };
    }

    // Phase 4 — table updates, split so FK work can be deferred past
    // table creation. Non-FK sub-operations are applied immediately to
    // the tracking schema; FK sub-operations are queued.
    let mut fk_operations: Vec<Operation> = Vec::new();
    for name in &tables_to_update {
        let source = tracking
            .get_table(name)
            .expect("tables_to_update implies present in tracking")
            .clone();
        let target = db_to
            .get_table(name)
            .expect("tables_to_update implies present in db_to");

        match differ::diff(&source, target, true) {
            Diff::Split {
                removed_fks,
                kitchen_sink,
                fks,
            } => {
                if let Some(op) = kitchen_sink {
                    op.apply_to(&mut tracking)
                        .expect("diff only emits actions valid against the source table");
                    operations.push(op);
                }
                if let Some(op) = removed_fks {
                    fk_operations.push(op);
                }
                if let Some(op) = fks {
                    fk_operations.push(op);
                }
            }
            Diff::Flat(_) => unreachable!("diff called with split=true"),
        }
    }

    // Phase 5 — second add pass: a column added in phase 4 may unlock a
    // previously blocked FK.
    if !tables_to_add.is_empty() {
        let (more_errors, more_adds) = process_adds(db_to, &mut tracking, &mut tables_to_add);
        operations.extend(more_adds);
        if !more_errors.is_empty() {
            errors_1215 = more_errors;
            if db_from.is_none() {
                return PlanResult {
                    operations: Vec::new(),
                    errors_1215,
                    warnings,
                };
            }
        }
    }

    // Phase 6 — cycle break: anything still in `tables_to_add` is part
    // of a mutual FK cycle. Create it without the cyclic constraints,
    // then queue an ALTER TABLE to restore them.
    //
    // `bad` is computed against a snapshot of the tracking schema taken
    // before this phase starts, not the real `tracking` as it's
    // incrementally updated below. Two mutually-dependent tables must
    // both come out stripped regardless of which one is processed
    // first — if `bad` were computed against the live `tracking`, the
    // first table added would already satisfy the second's FK, leaving
    // the cycle asymmetrically broken.
    let tracking_before_cycle_break = tracking.clone();
    for name in tables_to_add.drain(..) {
        let target = db_to
            .get_table(&name)
            .expect("remaining tables_to_add implies present in db_to");
        let bad = tracking_before_cycle_break.unfulfilled_fks(target);

        let mut stripped = target.clone();
        let mut restore = Operation::alter_table(&name);
        for constraint_name in bad.keys() {
            let constraint = stripped
                .remove_constraint(constraint_name)
                .expect("bad fk is present in the stripped clone");
            restore.push_action(AlterAction::AddConstraint { constraint });
        }

        operations.push(Operation::CreateTable(stripped.clone()));
        tracking.add_table(stripped);
        if !restore.is_empty_alter() {
            fk_operations.push(restore);
        }
    }

    // Phase 7 — drops, in the tracking schema's (== db_from's)
    // insertion order.
    for name in &tables_to_remove {
        operations.push(Operation::DropTable { name: name.clone() });
        tracking.remove_table(name);
    }

    // Phase 8 — flush deferred FK operations: updates first, then
    // cycle-breaking adds, in enqueue order.
    operations.extend(fk_operations);

    PlanResult {
        operations,
        errors_1215,
        warnings,
    }
}

/// Phase 2 (and its phase-5 re-run): iterate a snapshot of
/// `tables_to_add` until a full sweep makes no progress. Tables that
/// become satisfiable are created and removed from `tables_to_add`;
/// tables whose FKs are broken even against the full target schema are
/// removed with an error. Anything left after the fixed point is part
/// of a mutual cycle and stays in `tables_to_add` for phase 6.
fn process_adds(
    db_to: &Database,
    tracking: &mut Database,
    tables_to_add: &mut Vec<String>,
) -> (Vec<String>, Vec<Operation>) {
    let mut errors_1215 = Vec::new();
    let mut operations = Vec::new();

    loop {
        let snapshot = tables_to_add.clone();
        let mut progressed = false;

        for name in &snapshot {
            if !tables_to_add.contains(name) {
                // Already resolved earlier in this sweep.
                continue;
            }
            let target = db_to
                .get_table(name)
                .expect("tables_to_add entries always reference db_to tables");

            if tracking.unfulfilled_fks(target).is_empty() {
                operations.push(Operation::CreateTable(target.clone()));
                tracking.add_table(target.clone());
                tables_to_add.retain(|n| n != name);
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    // Anything left is either a genuine 1215 error or part of a mutual
    // cycle; the two are told apart by re-checking against the FULL
    // target schema rather than the partially-built tracking schema.
    let snapshot = tables_to_add.clone();
    for name in &snapshot {
        let target = db_to
            .get_table(name)
            .expect("tables_to_add entries always reference db_to tables");
        let broken = db_to.unfulfilled_fks(target);
        if !broken.is_empty() {
            for bad in broken.values() {
                errors_1215.push(bad.error.clone());
            }
            tables_to_add.retain(|n| n != name);
        }
        // else: fulfillable against db_to as a whole, so it's a cycle —
        // leave it in tables_to_add for phase 6.
    }

    (errors_1215, operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builder::DatabaseBuilder;
    use crate::schema::IndexKind;

    #[test]
    fn test_identity_plan_is_empty() {
        let db = DatabaseBuilder::new()
            .table("accounts", |t| {
                t.column("id", "int", false).pk(&["id"]);
            })
            .build();

        let result = plan(&db, Some(&db));
        assert!(result.is_empty());
        assert!(result.errors_1215.is_empty());
    }

    #[test]
    fn test_simple_add_scenario_s1() {
        let db_from = DatabaseBuilder::new()
            .table("accounts", |t| {
                t.column("id", "int", false).pk(&["id"]);
            })
            .table("tasks", |t| {
                t.column("id", "int", false).pk(&["id"]);
            })
            .build();

        let mut db_to = db_from.clone();
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("histories")
                .column("id", "int", false)
                .pk(&["id"])
                .build(),
        );

        let result = plan(&db_to, Some(&db_from));
        assert_eq!(result.operations.len(), 1);
        match &result.operations[0] {
            Operation::CreateTable(table) => assert_eq!(table.name, "histories"),
            _ => panic!("expected a CreateTable operation"),
        }
    }

    #[test]
    fn test_column_add_with_after_scenario_s2() {
        let db_from = DatabaseBuilder::new()
            .table("tasks", |t| {
                t.column("id", "int", false)
                    .column("account_id", "int", false)
                    .column("name", "varchar", false)
                    .pk(&["id"]);
            })
            .build();

        let mut db_to = db_from.clone();
        db_to
            .get_table_mut("tasks")
            .unwrap()
            .columns
            .insert(
                "subject".to_string(),
                crate::schema::Column {
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
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("histories")
                .column("id", "int", false)
                .pk(&["id"])
                .build(),
        );

        let result = plan(&db_to, Some(&db_from));
        assert_eq!(result.operations.len(), 2);
        match &result.operations[0] {
            Operation::CreateTable(table) => assert_eq!(table.name, "histories"),
            _ => panic!("expected histories CreateTable first"),
        }
        assert_eq!(
            result.operations[1].to_string(),
            "ALTER TABLE `tasks` ADD `subject` TEXT AFTER `name`"
        );
    }

    #[test]
    fn test_mutual_fk_cycle_scenario_s3() {
        let mut db_to = Database::new();
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("accounts")
                .column("id", "int", false)
                .pk(&["id"])
                .build(),
        );
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("tasks")
                .column("id", "int", false)
                .column("repeating_task_id", "int", false)
                .pk(&["id"])
                .index("repeating_task_id_tasks", &["repeating_task_id"], IndexKind::Regular)
                .fk(
                    "repeating_task_id_tasks_fk",
                    &["repeating_task_id"],
                    "repeating_tasks",
                    &["id"],
                )
                .build(),
        );
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("repeating_tasks")
                .column("id", "int", false)
                .column("task_id", "int", false)
                .pk(&["id"])
                .index("task_id_rts", &["task_id"], IndexKind::Regular)
                .fk("task_id_rts_fk", &["task_id"], "tasks", &["id"])
                .build(),
        );

        let result = plan(&db_to, None);
        assert!(result.errors_1215.is_empty(), "{:?}", result.errors_1215);
        assert_eq!(result.operations.len(), 5);

        match &result.operations[0] {
            Operation::CreateTable(table) => assert_eq!(table.name, "accounts"),
            _ => panic!("expected accounts first"),
        }

        let create_names: Vec<&str> = result.operations[1..3]
            .iter()
            .filter_map(|op| match op {
                Operation::CreateTable(t) => Some(t.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(create_names.len(), 2);
        assert!(create_names.contains(&"tasks"));
        assert!(create_names.contains(&"repeating_tasks"));

        for op in &result.operations[1..3] {
            if let Operation::CreateTable(t) = op {
                assert!(t.constraints.is_empty(), "cyclic FK should be stripped");
            }
        }

        let alter_rendered: Vec<String> = result.operations[3..]
            .iter()
            .map(|op| op.to_string())
            .collect();
        assert!(
            alter_rendered
                .iter()
                .any(|s| s.contains("ADD CONSTRAINT `repeating_task_id_tasks_fk`"))
        );
        assert!(
            alter_rendered
                .iter()
                .any(|s| s.contains("ADD CONSTRAINT `task_id_rts_fk`"))
        );
    }

    #[test]
    fn test_broken_fk_scenario_s6() {
        let mut db_to = Database::new();
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("tasks")
                .column("id", "int", false)
                .column("ghost_id", "int", false)
                .pk(&["id"])
                .fk("ghost_fk", &["ghost_id"], "ghosts", &["id"])
                .build(),
        );

        let result = plan(&db_to, None);
        assert!(!result.errors_1215.is_empty());
        assert!(result.operations.is_empty());
    }

    #[test]
    fn test_pre_validation_gate_propagates_same_errors() {
        let mut db_to = Database::new();
        db_to.add_table(
            crate::schema::builder::TableBuilder::new("tasks")
                .column("id", "int", false)
                .column("ghost_id", "int", false)
                .pk(&["id"])
                .fk("ghost_fk", &["ghost_id"], "ghosts", &["id"])
                .build(),
        );
        let db_from = Database::new();

        let direct = plan(&db_to, None);
        let via_from = plan(&db_to, Some(&db_from));
        assert_eq!(direct.errors_1215, via_from.errors_1215);
        assert!(via_from.operations.is_empty());
    }

    #[test]
    fn test_empty_db_from_same_as_none() {
        let db_to = DatabaseBuilder::new()
            .table("accounts", |t| {
                t.column("id", "int", false).pk(&["id"]);
            })
            .build();
        let empty = Database::new();

        let with_none = plan(&db_to, None);
        let with_empty = plan(&db_to, Some(&empty));
        assert_eq!(with_none.operations, with_empty.operations);
    }
}
