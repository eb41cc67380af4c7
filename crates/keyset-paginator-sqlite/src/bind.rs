//! Binding paginator values as SQLite arguments.

use keyset_paginator::Value;
use serde_json::Value as JsonValue;
use sqlx::Arguments;
use sqlx::sqlite::SqliteArguments;

use crate::{Error, Result};

/// Collect `values` into SQLite arguments, in order.
pub(crate) fn to_arguments<'q>(values: Vec<Value>) -> Result<SqliteArguments<'q>> {
   let mut arguments = SqliteArguments::default();
   for value in values {
      bind_value(&mut arguments, value)?;
   }
   Ok(arguments)
}

fn bind_value(arguments: &mut SqliteArguments<'_>, value: Value) -> Result<()> {
   let bound = match value {
      Value::Null => arguments.add(None::<JsonValue>),
      Value::Bool(b) => arguments.add(b),
      Value::Int(i) => arguments.add(i),
      Value::Uint(u) => {
         let i = i64::try_from(u).map_err(|_| Error::UnsignedOutOfRange(u))?;
         arguments.add(i)
      }
      Value::Float(f) => arguments.add(f),
      Value::Text(s) => arguments.add(s),
      Value::Time(t) => arguments.add(t),
      Value::Json(j) => arguments.add(j),
   };

   bound.map_err(sqlx::Error::Encode)?;
   Ok(())
}
