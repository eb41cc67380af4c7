//! Reader for the pre-JSON cursor format.
//!
//! Old cursors are base64 of comma-joined `<value>?<TAG>` tokens, where TAG
//! is `STRING` or `TIME`. They are only read, never produced.

use crate::value::{FieldKind, FieldType, Value, parse_time};
use crate::{Error, Result};

const TAG_SEPARATOR: char = '?';
const TOKEN_SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
   String,
   Time,
}

impl Tag {
   fn parse(tag: &str) -> Result<Self> {
      match tag {
         "STRING" => Ok(Tag::String),
         "TIME" => Ok(Tag::Time),
         _ => Err(Error::InvalidCursor),
      }
   }
}

/// Decode a legacy payload (already base64-decoded) into one value per type.
pub(crate) fn decode(payload: &[u8], types: &[FieldType]) -> Result<Vec<Value>> {
   let text = std::str::from_utf8(payload).map_err(|_| Error::InvalidCursor)?;
   let tokens: Vec<&str> = text.split(TOKEN_SEPARATOR).collect();
   if tokens.len() != types.len() {
      return Err(Error::InvalidCursor);
   }

   tokens
      .into_iter()
      .zip(types)
      .map(|(token, ty)| decode_token(token, *ty))
      .collect()
}

fn decode_token(token: &str, ty: FieldType) -> Result<Value> {
   let (text, tag) = token.rsplit_once(TAG_SEPARATOR).ok_or(Error::InvalidCursor)?;
   match Tag::parse(tag)? {
      Tag::Time if ty.kind == FieldKind::Time => parse_time(text).map(Value::Time),
      Tag::Time => Err(Error::InvalidCursor),
      Tag::String => Value::coerce_text(text, ty),
   }
}
