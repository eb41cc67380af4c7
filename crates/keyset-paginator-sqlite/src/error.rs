/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from running page queries against SQLite.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// The paginator rejected the request or could not build cursors.
   #[error(transparent)]
   Pagination(#[from] keyset_paginator::Error),

   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// I/O error when removing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// Base query must not contain top-level ORDER BY or LIMIT clauses.
   #[error("pagination base query must not contain top-level ORDER BY or LIMIT clauses")]
   InvalidPaginationQuery,

   /// Database has been closed and cannot be used.
   #[error("database has been closed")]
   DatabaseClosed,

   /// Unsigned value above `i64::MAX`, which SQLite INTEGER cannot hold.
   #[error("unsigned value {0} does not fit in a SQLite INTEGER")]
   UnsignedOutOfRange(u64),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Pagination errors keep the paginator's own codes.
   pub fn error_code(&self) -> String {
      match self {
         Error::Pagination(e) => e.error_code(),
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::InvalidPaginationQuery => "INVALID_PAGINATION_QUERY".to_string(),
         Error::DatabaseClosed => "DATABASE_CLOSED".to_string(),
         Error::UnsignedOutOfRange(_) => "UNSIGNED_OUT_OF_RANGE".to_string(),
      }
   }
}
