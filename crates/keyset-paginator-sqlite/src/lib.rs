//! SQLite execution for keyset-paginator page queries.
//!
//! [`SqliteDatabase::fetch_page`] splices the cursor predicate, ORDER BY and
//! fetch limit of a [`Paginator`](keyset_paginator::Paginator) into a base
//! SELECT, runs it on the read pool and decodes the rows into records.
//!
//! ```no_run
//! use keyset_paginator::{Paginator, Rule, impl_record};
//! use keyset_paginator_sqlite::SqliteDatabase;
//!
//! #[derive(Debug, Clone, Default, sqlx::FromRow)]
//! struct Post {
//!    id: i64,
//!    score: i64,
//! }
//!
//! impl_record!(Post { id, score });
//!
//! # async fn run() -> keyset_paginator_sqlite::Result<()> {
//! let db = SqliteDatabase::connect("posts.db", None).await?;
//! let paginator = Paginator::new().rules([Rule::desc("score"), Rule::asc("id")]).limit(20);
//!
//! let page = db
//!    .fetch_page::<Post>("SELECT id, score FROM posts", vec![], paginator)
//!    .await?;
//!
//! // hand these back to the client
//! let (_after, _before) = (page.cursor.after, page.cursor.before);
//! # Ok(())
//! # }
//! ```

mod bind;
mod builders;
mod config;
mod database;
mod error;
mod sql;

pub use builders::FetchPageBuilder;
pub use config::SqliteDatabaseConfig;
pub use database::{SqliteDatabase, WriteQueryResult};
pub use error::{Error, Result};
