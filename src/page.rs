//! Page post-processing: lookahead trimming, backward reversal, next cursors.

use serde::Serialize;

use crate::Result;
use crate::cursor::Cursor;
use crate::rule::PageDirection;

/// A page of results from keyset pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<R> {
   /// The rows in this page, in logical order
   pub rows: Vec<R>,
   /// `after` continues past the last row, `before` goes back past the first
   /// row; each is `None` when there is nothing to fetch that way
   pub cursor: Cursor,
   /// Whether more rows exist in the direction this page was fetched
   pub has_more: bool,
}

impl<R> Page<R> {
   pub fn is_empty(&self) -> bool {
      self.rows.is_empty()
   }
}

/// Turn the `limit + 1` rows fetched in physical order into a page.
///
/// `anchored` tells whether the request carried a cursor. A forward page
/// from an anchor always gets a `before` cursor, since the anchor row itself
/// precedes it; a backward page always gets an `after` cursor for the same
/// reason.
pub(crate) fn post_process<R>(
   mut rows: Vec<R>,
   limit: usize,
   direction: PageDirection,
   anchored: bool,
   mut encode: impl FnMut(&R) -> Result<String>,
) -> Result<Page<R>> {
   let has_more = rows.len() > limit;
   rows.truncate(limit);

   let backward = direction == PageDirection::Backward;
   if backward {
      rows.reverse();
   }

   let mut cursor = Cursor::default();
   if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
      if backward || has_more {
         cursor.after = Some(encode(last)?);
      }
      if (anchored && !backward) || (backward && has_more) {
         cursor.before = Some(encode(first)?);
      }
   }

   Ok(Page {
      rows,
      cursor,
      has_more,
   })
}
