//! DDL operations: each variant knows how to render itself to SQL and
//! how to apply itself to a [`Database`]/[`Table`] to keep a tracking
//! schema in sync with the operations already emitted for it.

use std::fmt;

use crate::error::SchemaError;
use crate::schema::{Column, ColumnPosition, Constraint, Database, Index, Table};

/// A single column/key/constraint change inside an `ALTER TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn { column: Column, position: ColumnPosition },
    ChangeColumn { column: Column },
    DropColumn { name: String },
    AddKey { index: Index },
    DropKey { name: String },
    ChangeKey { index: Index },
    AddConstraint { constraint: Constraint },
    ChangeConstraint { constraint: Constraint },
    DropConstraint { name: String },
}

impl AlterAction {
    fn apply_to(&self, table: &mut Table) -> Result<(), SchemaError> {
        match self {
            AlterAction::AddColumn { column, position } => {
                table.add_column(column.clone(), position.clone())
            }
            AlterAction::ChangeColumn { column } => table.change_column(column.clone()),
            AlterAction::DropColumn { name } => table.remove_column(name),
            AlterAction::AddKey { index } => table.add_index(index.clone()),
            AlterAction::DropKey { name } => table.remove_index(name),
            AlterAction::ChangeKey { index } => table.change_index(index.clone()),
            AlterAction::AddConstraint { constraint } => table.add_constraint(constraint.clone()),
            AlterAction::ChangeConstraint { constraint } => {
                table.change_constraint(constraint.clone())
            }
            AlterAction::DropConstraint { name } => table.remove_constraint(name),
        }
    }
}

impl fmt::Display for AlterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterAction::AddColumn { column, position } => {
                write!(f, "ADD {}", column.rendered())?;
                match position {
                    ColumnPosition::End => Ok(()),
                    other => write!(f, " {other}"),
                }
            }
            AlterAction::ChangeColumn { column } => {
                write!(f, "CHANGE `{}` {}", column.name, column.rendered())
            }
            AlterAction::DropColumn { name } => write!(f, "DROP {name}"),
            AlterAction::AddKey { index } => write!(f, "ADD {}", index.rendered()),
            AlterAction::DropKey { name } => write!(f, "DROP KEY `{name}`"),
            AlterAction::ChangeKey { index } => {
                write!(f, "DROP KEY `{}`, ADD {}", index.name, index.rendered())
            }
            AlterAction::AddConstraint { constraint } => {
                write!(f, "ADD {}", constraint.rendered())
            }
            AlterAction::ChangeConstraint { constraint } => write!(
                f,
                "DROP FOREIGN KEY `{}`, ADD {}",
                constraint.name,
                constraint.rendered()
            ),
            AlterAction::DropConstraint { name } => write!(f, "DROP FOREIGN KEY `{name}`"),
        }
    }
}

/// A top-level DDL operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateTable(Table),
    DropTable { name: String },
    AlterTable { name: String, actions: Vec<AlterAction> },
}

impl Operation {
    /// An `ALTER TABLE` with no sub-operations renders nothing useful
    /// and the planner must never emit it.
    pub fn is_empty_alter(&self) -> bool {
        matches!(self, Operation::AlterTable { actions, .. } if actions.is_empty())
    }

    pub fn alter_table(name: impl Into<String>) -> Self {
        Operation::AlterTable {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn push_action(&mut self, action: AlterAction) {
        if let Operation::AlterTable { actions, .. } = self {
            actions.push(action);
        }
    }

    pub fn extend_actions(&mut self, more: impl IntoIterator<Item = AlterAction>) {
        if let Operation::AlterTable { actions, .. } = self {
            actions.extend(more);
        }
    }

    /// Apply this operation to `db`, mutating it in place. Used to keep
    /// the planner's tracking schema in sync with emitted operations.
    pub fn apply_to(&self, db: &mut Database) -> Result<(), SchemaError> {
        match self {
            Operation::CreateTable(table) => {
                db.add_table(table.clone());
                Ok(())
            }
            Operation::DropTable { name } => {
                db.remove_table(name);
                Ok(())
            }
            Operation::AlterTable { name, actions } => {
                let table = db.get_table_mut(name).ok_or_else(|| SchemaError::NotFound {
                    kind: "table",
                    name: name.clone(),
                    table: name.clone(),
                })?;
                for action in actions {
                    action.apply_to(table)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateTable(table) => {
                write!(f, "CREATE TABLE `{}` (", table.name)?;
                let mut first = true;
                for column in table.columns.values() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", column.rendered())?;
                }
                for index in table.indexes.values() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", index.rendered())?;
                }
                for constraint in table.constraints.values() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", constraint.rendered())?;
                }
                write!(f, ")")?;
                if !table.options.is_empty() {
                    write!(f, " {}", table.options.join(" "))?;
                }
                write!(f, ";")
            }
            Operation::DropTable { name } => write!(f, "DROP TABLE `{name}`;"),
            Operation::AlterTable { name, actions } => {
                write!(f, "ALTER TABLE `{name}` ")?;
                let rendered = actions
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{rendered}")
            }
        }
    }
}
