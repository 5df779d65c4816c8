//! The schema model: `Database`, `Table`, `Column`, `Index`, `Constraint`.
//!
//! This is a passive data structure plus the handful of behaviors the
//! planner depends on: positional queries for `AFTER <col>` placement,
//! leftmost-index lookups, and foreign-key satisfiability checks.
//! Nothing here touches SQL text — schemas are built programmatically
//! (see [`crate::schema::builder`]) or loaded from the crate's own TOML
//! representation (see [`crate::schema_file`]).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Where a new column should be inserted relative to existing columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
    End,
}

impl fmt::Display for ColumnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnPosition::First => write!(f, "FIRST"),
            ColumnPosition::After(prev) => write!(f, "AFTER `{prev}`"),
            ColumnPosition::End => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Restrict,
    Cascade,
    SetNull,
    NoAction,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::NoAction => "NO ACTION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Primary,
    Unique,
    Regular,
    Fulltext,
}

/// A column definition.
///
/// Two columns are considered unchanged by the differ iff their
/// [`Column::rendered`] forms are byte-equal; that string is the
/// single source of truth for "did this column change" rather than a
/// field-by-field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub type_name: String,
    pub length: Option<u32>,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub character_set: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Column {
    /// Canonical rendered SQL fragment, e.g. `` `id` INT(10) UNSIGNED NOT NULL AUTO_INCREMENT ``.
    pub fn rendered(&self) -> String {
        let mut out = format!("`{}` {}", self.name, self.type_name);
        if let Some(len) = self.length {
            out.push_str(&format!("({len})"));
        }
        if self.unsigned {
            out.push_str(" UNSIGNED");
        }
        if let Some(cs) = &self.character_set {
            out.push_str(&format!(" CHARACTER SET {cs}"));
        }
        if let Some(col) = &self.collation {
            out.push_str(&format!(" COLLATE {col}"));
        }
        // NULL is the implicit default for a column, so it's only ever
        // spelled out when the column is NOT NULL.
        if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            out.push_str(&format!(" DEFAULT {default}"));
        }
        if self.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
        out
    }

    /// True iff `other` describes the same MySQL type for foreign-key
    /// compatibility purposes: same base type, same signedness, and
    /// (for fixed-width types) the same length.
    pub fn type_compatible_with(&self, other: &Column) -> bool {
        self.type_name.eq_ignore_ascii_case(&other.type_name)
            && self.unsigned == other.unsigned
            && self.length == other.length
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// An index (including the primary key, which is modeled as an index
/// of kind [`IndexKind::Primary`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

impl Index {
    pub fn rendered(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        match self.kind {
            IndexKind::Primary => format!("PRIMARY KEY ({cols})"),
            IndexKind::Unique => format!("UNIQUE KEY `{}` ({cols})", self.name),
            IndexKind::Regular => format!("KEY `{}` ({cols})", self.name),
            IndexKind::Fulltext => format!("FULLTEXT KEY `{}` ({cols})", self.name),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// A foreign-key constraint. Non-FK constraints (CHECK, plain UNIQUE as
/// a table constraint rather than an index) are out of scope — MySQL
/// models uniqueness entirely through indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub local_columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

impl Constraint {
    pub fn rendered(&self) -> String {
        let local = self
            .local_columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let foreign = self
            .foreign_columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CONSTRAINT `{}` FOREIGN KEY ({local}) REFERENCES `{}` ({foreign}) ON DELETE {} ON UPDATE {}",
            self.name, self.foreign_table, self.on_delete, self.on_update
        )
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Describes why a foreign key could not be satisfied, mirroring MySQL
/// error 1215 ("Cannot add foreign key constraint").
#[derive(Debug, Clone, PartialEq)]
pub struct UnfulfilledFk {
    pub error: String,
    pub foreign_key: Constraint,
}

/// A table: its columns, indexes, and (foreign key) constraints, plus
/// whatever seed-row and parser-surfaced state an upstream loader
/// attached to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
    #[serde(default)]
    pub constraints: IndexMap<String, Constraint>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub rows: IndexMap<i64, IndexMap<String, String>>,
    #[serde(default = "default_auto_increment")]
    pub auto_increment: i64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

fn default_auto_increment() -> i64 {
    1
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_increment: 1,
            ..Default::default()
        }
    }

    /// True iff this table carries parser-reported errors and should be
    /// excluded from migration.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the column preceding `name` in insertion order, or
    /// [`ColumnPosition::First`] if `name` is the first column.
    pub fn column_before(&self, name: &str) -> Result<ColumnPosition, SchemaError> {
        let idx = self
            .columns
            .get_index_of(name)
            .ok_or_else(|| SchemaError::NotFound {
                kind: "column",
                name: name.to_string(),
                table: self.name.clone(),
            })?;
        if idx == 0 {
            Ok(ColumnPosition::First)
        } else {
            let (prev_name, _) = self.columns.get_index(idx - 1).expect("idx - 1 in range");
            Ok(ColumnPosition::After(prev_name.clone()))
        }
    }

    /// True iff `column` is the leftmost column of at least one index.
    /// MySQL uses leftmost-prefix matching, so only that position makes
    /// an index usable to satisfy a foreign key referencing `column`.
    pub fn column_is_indexed(&self, column: &str) -> bool {
        self.indexes
            .values()
            .any(|idx| idx.columns.first().map(String::as_str) == Some(column))
    }

    /// Returns `true` iff some index's leftmost columns are exactly
    /// `cols`, in order. This is the rule that governs whether a
    /// referenced column set can back a foreign key. The single-column
    /// case is exactly [`Table::column_is_indexed`].
    pub fn has_covering_index(&self, cols: &[String]) -> bool {
        if let [only] = cols {
            return self.column_is_indexed(only);
        }
        self.indexes
            .values()
            .any(|idx| idx.columns.len() >= cols.len() && idx.columns[..cols.len()] == cols[..])
    }

    pub fn add_column(
        &mut self,
        column: Column,
        position: ColumnPosition,
    ) -> Result<(), SchemaError> {
        if self.columns.contains_key(&column.name) {
            return Err(SchemaError::AlreadyExists {
                kind: "column",
                name: column.name,
                table: self.name.clone(),
            });
        }
        match position {
            ColumnPosition::End => {
                self.columns.insert(column.name.clone(), column);
            }
            ColumnPosition::First => {
                self.columns.insert(column.name.clone(), column);
                self.columns.move_index(self.columns.len() - 1, 0);
            }
            ColumnPosition::After(prev) => {
                let prev_idx =
                    self.columns
                        .get_index_of(&prev)
                        .ok_or_else(|| SchemaError::NotFound {
                            kind: "column",
                            name: prev.clone(),
                            table: self.name.clone(),
                        })?;
                self.columns.insert(column.name.clone(), column);
                let last = self.columns.len() - 1;
                self.columns.move_index(last, prev_idx + 1);
            }
        }
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<(), SchemaError> {
        self.columns
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| SchemaError::NotFound {
                kind: "column",
                name: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn change_column(&mut self, column: Column) -> Result<(), SchemaError> {
        if !self.columns.contains_key(&column.name) {
            return Err(SchemaError::NotFound {
                kind: "column",
                name: column.name,
                table: self.name.clone(),
            });
        }
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    pub fn add_index(&mut self, index: Index) -> Result<(), SchemaError> {
        if self.indexes.contains_key(&index.name) {
            return Err(SchemaError::AlreadyExists {
                kind: "index",
                name: index.name,
                table: self.name.clone(),
            });
        }
        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    pub fn remove_index(&mut self, name: &str) -> Result<(), SchemaError> {
        self.indexes
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| SchemaError::NotFound {
                kind: "index",
                name: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn change_index(&mut self, index: Index) -> Result<(), SchemaError> {
        if !self.indexes.contains_key(&index.name) {
            return Err(SchemaError::NotFound {
                kind: "index",
                name: index.name,
                table: self.name.clone(),
            });
        }
        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SchemaError> {
        if self.constraints.contains_key(&constraint.name) {
            return Err(SchemaError::AlreadyExists {
                kind: "constraint",
                name: constraint.name,
                table: self.name.clone(),
            });
        }
        self.constraints.insert(constraint.name.clone(), constraint);
        Ok(())
    }

    pub fn remove_constraint(&mut self, name: &str) -> Result<(), SchemaError> {
        self.constraints
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| SchemaError::NotFound {
                kind: "constraint",
                name: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn change_constraint(&mut self, constraint: Constraint) -> Result<(), SchemaError> {
        if !self.constraints.contains_key(&constraint.name) {
            return Err(SchemaError::NotFound {
                kind: "constraint",
                name: constraint.name,
                table: self.name.clone(),
            });
        }
        self.constraints
            .insert(constraint.name.clone(), constraint);
        Ok(())
    }
}

/// An ordered mapping `name -> Table`. Table insertion order is
/// preserved and governs output order when no foreign key dictates
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tables: IndexMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    /// For each foreign key on `table`, determine whether it can be
    /// satisfied against the current state of `self`. Returns only the
    /// unsatisfiable subset, keyed by constraint name. `table` need not
    /// already be present in `self` — the planner calls this both for
    /// tables already in the tracking schema and for candidate tables
    /// not yet added.
    pub fn unfulfilled_fks(&self, table: &Table) -> IndexMap<String, UnfulfilledFk> {
        let mut bad = IndexMap::new();
        for constraint in table.constraints.values() {
            if let Some(reason) = self.why_constraint_unfulfilled(table, constraint) {
                bad.insert(
                    constraint.name.clone(),
                    UnfulfilledFk {
                        error: reason,
                        foreign_key: constraint.clone(),
                    },
                );
            }
        }
        bad
    }

    fn why_constraint_unfulfilled(&self, owner: &Table, constraint: &Constraint) -> Option<String> {
        let Some(foreign_table) = self.tables.get(&constraint.foreign_table) else {
            return Some(format!(
                "Cannot add foreign key constraint `{}`: referenced table `{}` does not exist",
                constraint.name, constraint.foreign_table
            ));
        };

        for col in &constraint.foreign_columns {
            if !foreign_table.columns.contains_key(col) {
                return Some(format!(
                    "Cannot add foreign key constraint `{}`: column `{}` does not exist on `{}`",
                    constraint.name, col, constraint.foreign_table
                ));
            }
        }

        if !foreign_table.has_covering_index(&constraint.foreign_columns) {
            return Some(format!(
                "Cannot add foreign key constraint `{}`: referenced columns on `{}` are not covered by a usable index",
                constraint.name, constraint.foreign_table
            ));
        }

        for (local_name, foreign_name) in constraint
            .local_columns
            .iter()
            .zip(&constraint.foreign_columns)
        {
            let (Some(local), Some(foreign)) = (
                owner.columns.get(local_name),
                foreign_table.columns.get(foreign_name),
            ) else {
                continue;
            };
            if !local.type_compatible_with(foreign) {
                return Some(format!(
                    "Cannot add foreign key constraint `{}`: column `{}` type is incompatible with `{}`.`{}`",
                    constraint.name, local_name, constraint.foreign_table, foreign_name
                ));
            }
        }

        None
    }
}
