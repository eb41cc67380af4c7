//! Splicing a page query into a caller's base SELECT.
//!
//! The base query must leave ORDER BY and LIMIT to the paginator. The cursor
//! predicate is appended as `WHERE (…)`, or as `AND (…)` when the query
//! already filters at the top level.

use keyset_paginator::{PageQuery, Value};

use crate::{Error, Result};

/// Timestamps compare through this so that SQLite's `datetime()` text and the
/// RFC 3339 text sqlx binds agree, to the millisecond.
pub(crate) const TIME_EXPR: &str = "strftime('%Y-%m-%d %H:%M:%f', {})";

/// Byte positions of a query that sit at parenthesis depth 0, outside string
/// literals, quoted identifiers and comments.
struct TopLevel<'a> {
   bytes: &'a [u8],
   pos: usize,
   depth: i32,
}

impl<'a> TopLevel<'a> {
   fn new(bytes: &'a [u8]) -> Self {
      Self {
         bytes,
         pos: 0,
         depth: 0,
      }
   }
}

impl Iterator for TopLevel<'_> {
   type Item = usize;

   fn next(&mut self) -> Option<usize> {
      while self.pos < self.bytes.len() {
         let i = self.pos;
         self.pos += 1;
         match self.bytes[i] {
            b'(' => self.depth += 1,
            b')' => self.depth -= 1,
            quote @ (b'\'' | b'"' | b'`') => self.pos = skip_quoted(self.bytes, i, quote),
            b'-' if self.bytes.get(i + 1) == Some(&b'-') => {
               self.pos = skip_past(self.bytes, i + 2, b"\n");
            }
            b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
               self.pos = skip_past(self.bytes, i + 2, b"*/");
            }
            _ if self.depth == 0 => return Some(i),
            _ => {}
         }
      }
      None
   }
}

/// Index just past the quote closing the section opened at `start`. A
/// doubled quote is an escaped quote.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
   let mut j = start + 1;
   while j < bytes.len() {
      if bytes[j] == quote {
         if bytes.get(j + 1) == Some(&quote) {
            j += 2;
            continue;
         }
         return j + 1;
      }
      j += 1;
   }
   bytes.len()
}

/// Index just past the next `terminator` at or after `from`, or the end.
fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
   let from = from.min(bytes.len());
   bytes[from..]
      .windows(terminator.len())
      .position(|window| window == terminator)
      .map_or(bytes.len(), |offset| from + offset + terminator.len())
}

fn is_ident_byte(b: u8) -> bool {
   b.is_ascii_alphanumeric() || b == b'_'
}

/// `keyword` (uppercase) starts at `i` as a whole word.
fn keyword_at(upper: &[u8], i: usize, keyword: &[u8]) -> bool {
   upper[i..].starts_with(keyword)
      && (i == 0 || !is_ident_byte(upper[i - 1]))
      && upper.get(i + keyword.len()).is_none_or(|b| !is_ident_byte(*b))
}

/// Byte offset of the first top-level occurrence of any of `keywords`.
fn find_top_level_keyword(query: &str, keywords: &[&[u8]]) -> Option<usize> {
   let upper = query.to_ascii_uppercase();
   let bytes = upper.as_bytes();
   TopLevel::new(bytes).find(|&i| keywords.iter().any(|keyword| keyword_at(bytes, i, keyword)))
}

/// Reject base queries that already order or limit their top-level result.
pub(crate) fn validate_base_query(query: &str) -> Result<()> {
   if find_top_level_keyword(query, &[b"ORDER", b"LIMIT"]).is_some() {
      return Err(Error::InvalidPaginationQuery);
   }
   Ok(())
}

/// Add `condition` to the top-level filter of `query`.
///
/// An existing WHERE condition is parenthesized before the conjunction so
/// its own `OR`s cannot absorb the cursor predicate. The filter goes before
/// any GROUP BY, HAVING or WINDOW clause.
fn add_condition(query: &str, condition: &str) -> String {
   let clause_end =
      find_top_level_keyword(query, &[b"GROUP", b"HAVING", b"WINDOW"]).unwrap_or(query.len());
   let (head, tail) = query.split_at(clause_end);
   let head = head.trim_end();

   let filtered = match find_top_level_keyword(head, &[b"WHERE"]) {
      Some(at) => {
         let existing = head[at + "WHERE".len()..].trim();
         format!("{} WHERE ({existing}) AND ({condition})", head[..at].trim_end())
      }
      None => format!("{head} WHERE ({condition})"),
   };

   match tail.trim() {
      "" => filtered,
      tail => format!("{filtered} {tail}"),
   }
}

/// Build the final SQL for one page and the full argument list: the caller's
/// values followed by the cursor arguments.
pub(crate) fn build_page_sql(
   base_query: &str,
   values: Vec<Value>,
   query: &PageQuery,
) -> Result<(String, Vec<Value>)> {
   validate_base_query(base_query)?;

   let mut sql = base_query.trim_end().trim_end_matches(';').trim_end().to_string();
   let mut arguments = values;

   if let Some(predicate) = query.cursor_condition(arguments.len()) {
      sql = add_condition(&sql, &predicate.sql);
      arguments.extend(predicate.args);
   }

   sql = format!("{sql} {} LIMIT {}", query.order_by_sql(), query.fetch_limit());
   Ok((sql, arguments))
}
