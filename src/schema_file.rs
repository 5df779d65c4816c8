//! Loading and saving [`Database`] schemas as TOML files.
//!
//! Schemas are authored directly in this structured format rather than
//! parsed from `CREATE TABLE` SQL text; the planner never touches SQL
//! text directly, so this is the entry point CLI users and tests load
//! schemas through.

use std::path::Path;

use thiserror::Error;

use crate::schema::Database;

#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("IO error reading schema file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML render error: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Load a [`Database`] from a TOML file.
pub fn load(path: &Path) -> Result<Database, SchemaFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SchemaFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| SchemaFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a [`Database`] to a TOML file.
pub fn save(db: &Database, path: &Path) -> Result<(), SchemaFileError> {
    let rendered = toml::to_string_pretty(db)?;
    std::fs::write(path, rendered).map_err(|source| SchemaFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builder::DatabaseBuilder;

    #[test]
    fn test_round_trip_through_toml() {
        let db = DatabaseBuilder::new()
            .table("accounts", |t| {
                t.column("id", "int", false).pk(&["id"]);
            })
            .build();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");

        save(&db, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(db, loaded);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load(Path::new("/nonexistent/path/schema.toml"));
        assert!(matches!(result, Err(SchemaFileError::Io { .. })));
    }
}
