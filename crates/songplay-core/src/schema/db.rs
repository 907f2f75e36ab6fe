use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{SongPlay, User};

use super::migrations::MIGRATIONS;
use super::tables::{TableSchema, ALL_TABLES};

/// A connection to the star-schema store.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Foreign key enforcement is per connection, not per database file
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction. Dropping it without committing rolls back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let known = MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0);
        if let Some(&newest) = applied.iter().max().filter(|&&v| v > known) {
            return Err(Error::InvalidData(format!(
                "database schema version {newest} is newer than the supported version {known}"
            )));
        }

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Inspection
impl Database {
    /// Number of rows currently in `table`.
    pub fn count_rows(&self, table: &TableSchema) -> Result<i64> {
        Ok(self.conn.query_row(&table.count_sql(), [], |row| row.get(0))?)
    }

    /// Row counts for every star-schema table, dimensions first.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        ALL_TABLES
            .iter()
            .map(|table| Ok((table.name, self.count_rows(table)?)))
            .collect()
    }

    /// Fetch one user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, first_name, last_name, gender, level
                 FROM users WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        gender: row.get(3)?,
                        level: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// All facts, in surrogate id order.
    pub fn list_songplays(&self) -> Result<Vec<SongPlay>> {
        let mut stmt = self.conn.prepare(
            "SELECT songplay_id, start_time, user_id, level, song_id, artist_id,
                    session_id, location, user_agent
             FROM songplays
             ORDER BY songplay_id",
        )?;

        let plays = stmt
            .query_map([], |row| {
                Ok(SongPlay {
                    songplay_id: row.get(0)?,
                    start_time: row.get(1)?,
                    user_id: row.get(2)?,
                    level: row.get(3)?,
                    song_id: row.get(4)?,
                    artist_id: row.get(5)?,
                    session_id: row.get(6)?,
                    location: row.get(7)?,
                    user_agent: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(plays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{SONGPLAYS, USERS};
    use tempfile::TempDir;

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_does_not_reapply_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songplay.db");

        drop(Database::open(&db_path).unwrap());
        let db = Database::open(&db_path).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_version_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songplay.db");

        let db = Database::open(&db_path).unwrap();
        db.conn()
            .execute(
                "INSERT INTO schema_migrations (version, name) VALUES (99, 'future')",
                [],
            )
            .unwrap();
        drop(db);

        match Database::open(&db_path).unwrap_err() {
            Error::InvalidData(message) => assert!(message.contains("99")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schema_columns_match_table_descriptions() {
        let db = Database::open_in_memory().unwrap();
        for table in ALL_TABLES {
            let mut stmt = db
                .conn()
                .prepare(&format!("PRAGMA table_info({})", table.name))
                .unwrap();
            let columns: Vec<(String, String, bool)> = stmt
                .query_map([], |row| {
                    Ok((row.get(1)?, row.get(2)?, row.get::<_, i64>(3)? == 1))
                })
                .unwrap()
                .collect::<rusqlite::Result<Vec<_>>>()
                .unwrap();

            assert_eq!(columns.len(), table.columns.len(), "{}", table.name);
            for (actual, declared) in columns.iter().zip(table.columns) {
                assert_eq!(actual.0, declared.name);
                assert_eq!(actual.1, declared.ty.sql_name());
                // Primary keys are NOT NULL in practice even without the flag
                if declared.name != table.key {
                    assert_eq!(actual.2, !declared.nullable, "{}.{}", table.name, declared.name);
                }
            }
        }
    }

    #[test]
    fn test_table_counts_on_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let counts = db.table_counts().unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn().execute(
            "INSERT INTO songs (song_id, title, artist_id) VALUES ('SO1', 'Test', 'AR404')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rolled_back_transaction_leaves_no_rows() {
        let mut db = Database::open_in_memory().unwrap();
        {
            let tx = db.transaction().unwrap();
            tx.execute(
                "INSERT INTO users VALUES ('7', 'Ann', 'Lee', 'F', 'free')",
                [],
            )
            .unwrap();
        }
        assert_eq!(db.count_rows(&USERS).unwrap(), 0);
        assert_eq!(db.count_rows(&SONGPLAYS).unwrap(), 0);
        assert!(db.get_user("7").unwrap().is_none());
    }
}
