//! Fluent test harness for building [`Database`]/[`Table`] state.
//!
//! Not `cfg(test)`-gated: the planner's own integration tests (in
//! `tests/`) live in a separate crate and need to construct schemas
//! without round-tripping through TOML, so this module ships in the
//! library proper.
//!
//! # Example
//!
//! ```rust
//! use migrate_plan::schema::builder::DatabaseBuilder;
//!
//! let db = DatabaseBuilder::new()
//!     .table("accounts", |t| {
//!         t.column("id", "int", false).pk(&["id"]);
//!     })
//!     .build();
//! ```

use crate::schema::types::{
    Column, Constraint, Database, Index, IndexKind, ReferentialAction, Table,
};

pub struct DatabaseBuilder {
    database: Database,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            database: Database::new(),
        }
    }

    pub fn table(mut self, name: &str, f: impl FnOnce(&mut TableBuilder)) -> Self {
        let mut builder = TableBuilder::new(name);
        f(&mut builder);
        self.database.add_table(builder.build());
        self
    }

    pub fn build(self) -> Database {
        self.database
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TableBuilder {
    table: Table,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            table: Table::new(name),
        }
    }

    pub fn column(&mut self, name: &str, type_name: &str, nullable: bool) -> &mut Self {
        self.table.columns.insert(
            name.to_string(),
            Column {
                name: name.to_string(),
                type_name: type_name.to_string(),
                length: None,
                unsigned: false,
                nullable,
                default: None,
                auto_increment: false,
                character_set: None,
                collation: None,
            },
        );
        self
    }

    pub fn column_full(
        &mut self,
        name: &str,
        type_name: &str,
        length: Option<u32>,
        unsigned: bool,
        nullable: bool,
        auto_increment: bool,
    ) -> &mut Self {
        self.table.columns.insert(
            name.to_string(),
            Column {
                name: name.to_string(),
                type_name: type_name.to_string(),
                length,
                unsigned,
                nullable,
                default: None,
                auto_increment,
                character_set: None,
                collation: None,
            },
        );
        self
    }

    pub fn index(&mut self, name: &str, columns: &[&str], kind: IndexKind) -> &mut Self {
        self.table.indexes.insert(
            name.to_string(),
            Index {
                name: name.to_string(),
                columns: columns.iter().map(|s| s.to_string()).collect(),
                kind,
            },
        );
        self
    }

    /// Adds a primary key index named `PRIMARY` over `columns`.
    pub fn pk(&mut self, columns: &[&str]) -> &mut Self {
        self.index("PRIMARY", columns, IndexKind::Primary)
    }

    pub fn fk(
        &mut self,
        name: &str,
        local_columns: &[&str],
        foreign_table: &str,
        foreign_columns: &[&str],
    ) -> &mut Self {
        self.table.constraints.insert(
            name.to_string(),
            Constraint {
                name: name.to_string(),
                local_columns: local_columns.iter().map(|s| s.to_string()).collect(),
                foreign_table: foreign_table.to_string(),
                foreign_columns: foreign_columns.iter().map(|s| s.to_string()).collect(),
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::Cascade,
            },
        );
        self
    }

    pub fn fk_with_actions(
        &mut self,
        name: &str,
        local_columns: &[&str],
        foreign_table: &str,
        foreign_columns: &[&str],
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    ) -> &mut Self {
        self.table.constraints.insert(
            name.to_string(),
            Constraint {
                name: name.to_string(),
                local_columns: local_columns.iter().map(|s| s.to_string()).collect(),
                foreign_table: foreign_table.to_string(),
                foreign_columns: foreign_columns.iter().map(|s| s.to_string()).collect(),
                on_delete,
                on_update,
            },
        );
        self
    }

    pub fn options(&mut self, options: &[&str]) -> &mut Self {
        self.table.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Table {
        self.table
    }
}
