//! Per-table diff: compares two [`Table`]s and produces [`Operation`]s
//! that bring the first in line with the second.

use crate::operation::{AlterAction, Operation};
use crate::schema::Table;

/// The result of [`diff`]. `Flat` bundles everything into one
/// `AlterTable`; `Split` partitions it so the planner can defer foreign
/// key work independently of column/key changes.
pub enum Diff {
    Flat(Option<Operation>),
    Split {
        removed_fks: Option<Operation>,
        kitchen_sink: Option<Operation>,
        fks: Option<Operation>,
    },
}

/// Three-way split over an ordered key space: `added` (in `target` but
/// not `source`, target order), `removed` (in `source` but not
/// `target`, source order), `overlap` (in both, source order).
fn differences<'a, T>(
    source: &'a indexmap::IndexMap<String, T>,
    target: &'a indexmap::IndexMap<String, T>,
) -> (Vec<&'a str>, Vec<&'a str>, Vec<&'a str>) {
    let added = target
        .keys()
        .filter(|k| !source.contains_key(*k))
        .map(String::as_str)
        .collect();
    let removed = source
        .keys()
        .filter(|k| !target.contains_key(*k))
        .map(String::as_str)
        .collect();
    let overlap = source
        .keys()
        .filter(|k| target.contains_key(*k))
        .map(String::as_str)
        .collect();
    (added, removed, overlap)
}

/// Compare `source` to `target`, producing the operations that would
/// transform `source`'s structure into `target`'s. When `split` is
/// `false`, everything is folded into one `AlterTable` in the order
/// `kitchen_sink + fks + removed_fks`. When `true`, FK drops, FK
/// adds/changes, and everything else are returned as three independent
/// groups so the planner can defer FK work across table-creation phases.
pub fn diff(source: &Table, target: &Table, split: bool) -> Diff {
    let (added_columns, removed_columns, overlap_columns) =
        differences(&source.columns, &target.columns);
    let (added_keys, removed_keys, overlap_keys) = differences(&source.indexes, &target.indexes);
    let (added_constraints, removed_constraints, overlap_constraints) =
        differences(&source.constraints, &target.constraints);

    let mut kitchen_sink = Operation::alter_table(&source.name);

    for name in &added_columns {
        let column = target.columns.get(*name).expect("added implies present");
        let position = target
            .column_before(name)
            .expect("added implies present in target");
        kitchen_sink.push_action(AlterAction::AddColumn {
            column: column.clone(),
            position,
        });
    }
    for name in &overlap_columns {
        let before = source.columns.get(*name).expect("overlap implies present");
        let after = target.columns.get(*name).expect("overlap implies present");
        if before.rendered() != after.rendered() {
            kitchen_sink.push_action(AlterAction::ChangeColumn {
                column: after.clone(),
            });
        }
    }
    for name in &removed_columns {
        kitchen_sink.push_action(AlterAction::DropColumn {
            name: name.to_string(),
        });
    }
    for name in &added_keys {
        let index = target.indexes.get(*name).expect("added implies present");
        kitchen_sink.push_action(AlterAction::AddKey {
            index: index.clone(),
        });
    }
    for name in &removed_keys {
        kitchen_sink.push_action(AlterAction::DropKey {
            name: name.to_string(),
        });
    }
    for name in &overlap_keys {
        let before = source.indexes.get(*name).expect("overlap implies present");
        let after = target.indexes.get(*name).expect("overlap implies present");
        if before.rendered() != after.rendered() {
            kitchen_sink.push_action(AlterAction::ChangeKey {
                index: after.clone(),
            });
        }
    }

    let mut removed_fks_alter = Operation::alter_table(&source.name);
    for name in &removed_constraints {
        removed_fks_alter.push_action(AlterAction::DropConstraint {
            name: name.to_string(),
        });
    }

    let mut fks_alter = Operation::alter_table(&source.name);
    for name in &added_constraints {
        let constraint = target
            .constraints
            .get(*name)
            .expect("added implies present");
        fks_alter.push_action(AlterAction::AddConstraint {
            constraint: constraint.clone(),
        });
    }
    for name in &overlap_constraints {
        let before = source
            .constraints
            .get(*name)
            .expect("overlap implies present");
        let after = target
            .constraints
            .get(*name)
            .expect("overlap implies present");
        if before.rendered() != after.rendered() {
            fks_alter.push_action(AlterAction::ChangeConstraint {
                constraint: after.clone(),
            });
        }
    }

    if split {
        Diff::Split {
            removed_fks: (!removed_fks_alter.is_empty_alter()).then_some(removed_fks_alter),
            kitchen_sink: (!kitchen_sink.is_empty_alter()).then_some(kitchen_sink),
            fks: (!fks_alter.is_empty_alter()).then_some(fks_alter),
        }
    } else {
        kitchen_sink.extend_actions(extract_actions(fks_alter));
        kitchen_sink.extend_actions(extract_actions(removed_fks_alter));
        Diff::Flat((!kitchen_sink.is_empty_alter()).then_some(kitchen_sink))
    }
}

fn extract_actions(op: Operation) -> Vec<AlterAction> {
    match op {
        Operation::AlterTable { actions, .. } => actions,
        _ => Vec::new(),
    }
}
