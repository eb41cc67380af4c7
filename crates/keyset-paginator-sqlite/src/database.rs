//! SQLite database with a read pool for page queries and a single writer.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use keyset_paginator::{Paginator, Record, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Pool, Sqlite};
use tracing::debug;

use crate::bind::to_arguments;
use crate::builders::FetchPageBuilder;
use crate::{Error, Result, SqliteDatabaseConfig};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted ROWID.
   pub last_insert_id: i64,
}

#[derive(Debug)]
struct Pools {
   /// Read-only connections; page queries run here
   read_pool: Pool<Sqlite>,
   /// Single read-write connection so writes are serialized
   write_pool: Pool<Sqlite>,
   closed: AtomicBool,
   path: PathBuf,
}

/// A SQLite database file opened for paginated reads.
///
/// Cloning is cheap; clones share the same pools.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
   inner: Arc<Pools>,
}

impl SqliteDatabase {
   /// Open (creating if missing) the database at `path`.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Self> {
      let config = custom_config.unwrap_or_default();
      let path = path.as_ref().to_path_buf();
      let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);

      // The writer creates the file before read-only connections open it
      let write_pool = SqlitePoolOptions::new()
         .max_connections(1)
         .idle_timeout(config.idle_timeout)
         .connect_with(options.clone())
         .await?;
      let read_pool = SqlitePoolOptions::new()
         .max_connections(config.max_read_connections)
         .idle_timeout(config.idle_timeout)
         .connect_with(options.read_only(true))
         .await?;

      debug!(path = %path.display(), "connected to database");

      Ok(Self {
         inner: Arc::new(Pools {
            read_pool,
            write_pool,
            closed: AtomicBool::new(false),
            path,
         }),
      })
   }

   pub fn path(&self) -> &Path {
      &self.inner.path
   }

   pub(crate) fn read_pool(&self) -> Result<&Pool<Sqlite>> {
      if self.inner.closed.load(Ordering::Acquire) {
         return Err(Error::DatabaseClosed);
      }
      Ok(&self.inner.read_pool)
   }

   fn write_pool(&self) -> Result<&Pool<Sqlite>> {
      if self.inner.closed.load(Ordering::Acquire) {
         return Err(Error::DatabaseClosed);
      }
      Ok(&self.inner.write_pool)
   }

   /// Execute a write query (INSERT/UPDATE/DELETE, or DDL).
   pub async fn execute(&self, query: &str, values: Vec<Value>) -> Result<WriteQueryResult> {
      let arguments = to_arguments(values)?;
      let result = sqlx::query_with(query, arguments)
         .execute(self.write_pool()?)
         .await?;

      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }

   /// Fetch one page of `base_query`.
   ///
   /// `values` bind the base query's own parameters; cursor arguments are
   /// numbered after them. The base query must not contain a top-level
   /// ORDER BY or LIMIT.
   pub fn fetch_page<R>(
      &self,
      base_query: impl Into<String>,
      values: Vec<Value>,
      paginator: Paginator,
   ) -> FetchPageBuilder<R>
   where
      R: Record + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
   {
      FetchPageBuilder {
         db: self.clone(),
         query: base_query.into(),
         values,
         paginator,
         record: PhantomData,
      }
   }

   /// Close both pools. Later operations fail with `DatabaseClosed`.
   pub async fn close(&self) -> Result<()> {
      self.inner.closed.store(true, Ordering::Release);
      self.inner.read_pool.close().await;
      self.inner.write_pool.close().await;
      Ok(())
   }

   /// Close the database and delete its files, including the WAL and
   /// shared-memory files.
   pub async fn remove(self) -> Result<()> {
      self.close().await?;

      let path = self.inner.path.as_os_str().to_owned();
      for suffix in ["", "-wal", "-shm"] {
         let mut file = path.clone();
         file.push(suffix);
         match tokio::fs::remove_file(&file).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
         }
      }
      Ok(())
   }
}
