mod credentials;
mod grades;

use std::path::Path;
use std::time::Duration;
use log::debug;
use rusqlite::Connection;
use crate::error::Result;

pub use credentials::{CredentialSource, EnvCredentials};

// Column layout of `grades` matches the tables written by earlier deployments.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        username TEXT NOT NULL,
        password TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS grades (
        username   TEXT NOT NULL,
        unid       TEXT NOT NULL,
        course     TEXT NOT NULL,
        type       TEXT NOT NULL,
        lecturer   TEXT NOT NULL,
        assessment TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS grades_username ON grades (username);
";

// SQLite-backed record of the last observed grade listing per user.
pub struct GradeStore {
    conn: Connection,
}

impl GradeStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!("Opened {} (journal mode {})", path.display(), journal);
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(GradeStore { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
