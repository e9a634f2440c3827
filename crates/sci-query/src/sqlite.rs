//! SQLite-backed [`Executor`].

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{params_from_iter, Connection};
use tracing::trace;

use crate::{
    compile::CompiledQuery,
    error::{QueryError, Result},
    executor::Executor,
    row::Row,
    value::SqlValue,
};

/// Executes queries on a shared SQLite connection.
///
/// SQLite reads LIMIT as a signed 64-bit integer, so larger limits are
/// clamped to `i64::MAX` whatever dialect the query was built with.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Runs one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QueryError::Execution("SQLite connection lock poisoned".to_string()))
    }
}

impl Executor for SqliteExecutor {
    fn fetch(&self, query: &CompiledQuery) -> Result<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query.sql())?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let rows = stmt.query_map(params_from_iter(query.params()), |row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| Ok((name.clone(), SqlValue::from(row.get_ref(i)?))))
                .collect::<rusqlite::Result<Row>>()
        })?;

        let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        trace!("fetched {} row(s)", rows.len());
        Ok(rows)
    }

    fn count(&self, query: &CompiledQuery) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(query.sql(), params_from_iter(query.params()), |row| {
            row.get(0)
        })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn max_limit(&self) -> Option<u64> {
        Some(i64::MAX as u64)
    }
}
