//! Keyset (cursor-based) pagination.
//!
//! Given an ordered list of sort [`Rule`]s and an optional anchor cursor, the
//! [`Paginator`] produces the WHERE predicate, ORDER BY clause and fetch limit
//! that select the page next to the anchor, and turns the fetched rows into a
//! [`Page`] carrying opaque `after`/`before` cursors. Paging stays correct for
//! any mix of ASC/DESC columns, in both directions, with NULLs pinned first or
//! last.
//!
//! Statement execution is left to the caller; see the
//! `keyset-paginator-sqlite` crate for a SQLite adapter.

pub mod cursor;
mod error;
mod legacy;
pub mod page;
pub mod paginator;
pub mod predicate;
pub mod record;
pub mod rule;
pub mod value;

pub use cursor::{Cursor, CursorCodec, CursorField, Decoder, Encoder, JsonCursorCodec};
pub use error::{Error, Result};
pub use page::Page;
pub use paginator::{DEFAULT_LIMIT, PageQuery, Paginator, PaginatorConfig};
pub use predicate::{
   NullOrderStyle, OrderTerm, PlaceholderStyle, Predicate, ResolvedRule, comparison_operator,
};
pub use record::{CustomType, Record};
pub use rule::{CustomTypeSpec, NullOrder, PageDirection, Rule, SortDirection};
pub use value::{FieldKind, FieldType, FieldValue, FromValue, Value};
