//! Page query builder

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;

use keyset_paginator::{Cursor, Page, Paginator, Record, Value};
use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

use crate::Error;
use crate::bind::to_arguments;
use crate::database::SqliteDatabase;
use crate::sql::{TIME_EXPR, build_page_sql};

/// Builder for one keyset-paginated SELECT, decoding rows into `R`.
///
/// Await it directly or call [`execute`](Self::execute).
pub struct FetchPageBuilder<R> {
   pub(crate) db: SqliteDatabase,
   pub(crate) query: String,
   pub(crate) values: Vec<Value>,
   pub(crate) paginator: Paginator,
   pub(crate) record: PhantomData<fn() -> R>,
}

impl<R> FetchPageBuilder<R>
where
   R: Record + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
   /// Fetch the page following the row `cursor` was taken from.
   pub fn after(mut self, cursor: impl Into<String>) -> Self {
      self.paginator = self.paginator.after(cursor);
      self
   }

   /// Fetch the page preceding the row `cursor` was taken from. Rows still
   /// come back in the rules' order.
   pub fn before(mut self, cursor: impl Into<String>) -> Self {
      self.paginator = self.paginator.before(cursor);
      self
   }

   /// Continue from a cursor pair a client sent back; `after` wins when both
   /// are set.
   pub fn cursor(mut self, cursor: Cursor) -> Self {
      self.paginator = self.paginator.cursor(cursor);
      self
   }

   /// Execute the paginated query and return a page of records
   ///
   /// Timestamp keys are compared at millisecond precision unless the
   /// paginator carries its own time template.
   pub async fn execute(self) -> Result<Page<R>, Error> {
      let mut paginator = self.paginator;
      if paginator.time_expr_template().is_none() {
         paginator = paginator.time_expr(TIME_EXPR);
      }
      let page_query = paginator.prepare::<R>()?;
      let (sql, values) = build_page_sql(&self.query, self.values, &page_query)?;

      debug!(
         %sql,
         arguments = values.len(),
         direction = ?page_query.direction(),
         "fetching page"
      );

      let arguments = to_arguments(values)?;
      let rows = sqlx::query_as_with::<_, R, _>(&sql, arguments)
         .fetch_all(self.db.read_pool()?)
         .await?;

      Ok(page_query.finish(rows)?)
   }
}

impl<R> IntoFuture for FetchPageBuilder<R>
where
   R: Record + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
   type Output = Result<Page<R>, Error>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}
