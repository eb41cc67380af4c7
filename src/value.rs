//! Typed values carried by cursors and bound as predicate arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{Error, Result};

/// A single sort-key value extracted from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
   /// Absent value of a nullable field
   Null,
   Bool(bool),
   Int(i64),
   Uint(u64),
   Float(f64),
   Text(String),
   Time(OffsetDateTime),
   /// Nested structured value, compared by whatever the engine does with it
   Json(JsonValue),
}

/// The kind of value a record field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
   Bool,
   Int,
   Uint,
   Float,
   Text,
   Time,
   Json,
}

/// Declared type of a record field: its kind and whether it may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
   pub kind: FieldKind,
   #[serde(default)]
   pub nullable: bool,
}

impl FieldType {
   /// A field that always holds a value.
   pub const fn required(kind: FieldKind) -> Self {
      Self {
         kind,
         nullable: false,
      }
   }

   /// A field that may be absent.
   pub const fn nullable(kind: FieldKind) -> Self {
      Self {
         kind,
         nullable: true,
      }
   }
}

impl Value {
   pub fn is_null(&self) -> bool {
      matches!(self, Value::Null)
   }

   /// Convert an untyped JSON value, picking the narrowest matching variant.
   pub fn from_json(json: &JsonValue) -> Self {
      match json {
         JsonValue::Null => Value::Null,
         JsonValue::Bool(b) => Value::Bool(*b),
         JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
               Value::Int(i)
            } else if let Some(u) = n.as_u64() {
               Value::Uint(u)
            } else {
               Value::Float(n.as_f64().unwrap_or_default())
            }
         }
         JsonValue::String(s) => Value::Text(s.clone()),
         other => Value::Json(other.clone()),
      }
   }

   /// Render the value as the JSON element stored in a cursor.
   ///
   /// Fails with `InvalidModel` for values JSON cannot represent (NaN and
   /// infinities, timestamps outside the RFC 3339 range).
   pub fn to_json(&self) -> Result<JsonValue> {
      Ok(match self {
         Value::Null => JsonValue::Null,
         Value::Bool(b) => JsonValue::Bool(*b),
         Value::Int(i) => JsonValue::from(*i),
         Value::Uint(u) => JsonValue::from(*u),
         Value::Float(f) => JsonValue::Number(Number::from_f64(*f).ok_or(Error::InvalidModel)?),
         Value::Text(s) => JsonValue::String(s.clone()),
         Value::Time(t) => JsonValue::String(format_time(t)?),
         Value::Json(j) => j.clone(),
      })
   }

   /// Coerce a decoded cursor element to the expected field type.
   pub fn coerce_json(json: JsonValue, ty: FieldType) -> Result<Self> {
      if json.is_null() {
         return match (ty.nullable, ty.kind) {
            (true, _) => Ok(Value::Null),
            // null is a legitimate nested value
            (false, FieldKind::Json) => Ok(Value::Json(JsonValue::Null)),
            (false, _) => Err(Error::InvalidCursor),
         };
      }

      match (ty.kind, json) {
         (FieldKind::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(b)),
         (FieldKind::Int, JsonValue::Number(n)) => {
            n.as_i64().map(Value::Int).ok_or(Error::InvalidCursor)
         }
         (FieldKind::Uint, JsonValue::Number(n)) => {
            n.as_u64().map(Value::Uint).ok_or(Error::InvalidCursor)
         }
         (FieldKind::Float, JsonValue::Number(n)) => {
            n.as_f64().map(Value::Float).ok_or(Error::InvalidCursor)
         }
         (FieldKind::Text, JsonValue::String(s)) => Ok(Value::Text(s)),
         (FieldKind::Time, JsonValue::String(s)) => parse_time(&s).map(Value::Time),
         (FieldKind::Json, other) => Ok(Value::Json(other)),
         _ => Err(Error::InvalidCursor),
      }
   }

   /// Coerce a textual scalar (as found in legacy cursors) to the expected
   /// field type.
   pub fn coerce_text(text: &str, ty: FieldType) -> Result<Self> {
      let value = match ty.kind {
         FieldKind::Bool => Value::Bool(text.parse().map_err(|_| Error::InvalidCursor)?),
         FieldKind::Int => Value::Int(text.parse().map_err(|_| Error::InvalidCursor)?),
         FieldKind::Uint => Value::Uint(text.parse().map_err(|_| Error::InvalidCursor)?),
         FieldKind::Float => Value::Float(text.parse().map_err(|_| Error::InvalidCursor)?),
         FieldKind::Text => Value::Text(text.to_string()),
         FieldKind::Time => Value::Time(parse_time(text)?),
         FieldKind::Json => {
            Value::Json(serde_json::from_str(text).map_err(|_| Error::InvalidCursor)?)
         }
      };
      Ok(value)
   }

   /// Render the value as an inline SQL literal.
   ///
   /// Only used for configured NULL replacements, never for cursor values,
   /// which are always bound as arguments.
   pub(crate) fn to_sql_literal(&self) -> Result<String> {
      Ok(match self {
         Value::Null => "NULL".to_string(),
         Value::Bool(true) => "TRUE".to_string(),
         Value::Bool(false) => "FALSE".to_string(),
         Value::Int(i) => i.to_string(),
         Value::Uint(u) => u.to_string(),
         Value::Float(f) if f.is_finite() => f.to_string(),
         Value::Float(_) => return Err(Error::InvalidModel),
         Value::Text(s) => quote_literal(s),
         Value::Time(t) => quote_literal(&format_time(t)?),
         Value::Json(j) => quote_literal(&j.to_string()),
      })
   }
}

impl Serialize for Value {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: serde::Serializer,
   {
      self.to_json().map_err(serde::ser::Error::custom)?.serialize(serializer)
   }
}

impl<'de> Deserialize<'de> for Value {
   fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
   where
      D: serde::Deserializer<'de>,
   {
      JsonValue::deserialize(deserializer).map(|json| Value::from_json(&json))
   }
}

fn quote_literal(s: &str) -> String {
   format!("'{}'", s.replace('\'', "''"))
}

pub(crate) fn format_time(t: &OffsetDateTime) -> Result<String> {
   t.format(&Rfc3339).map_err(|_| Error::InvalidModel)
}

pub(crate) fn parse_time(s: &str) -> Result<OffsetDateTime> {
   OffsetDateTime::parse(s, &Rfc3339).map_err(|_| Error::InvalidCursor)
}

/// Conversion from a decoded [`Value`] back into a concrete field type.
pub trait FromValue: Sized {
   fn from_value(value: Value) -> Result<Self>;
}

/// A Rust type usable as a record field in pagination rules.
pub trait FieldValue: Clone + Into<Value> + FromValue {
   const FIELD_TYPE: FieldType;
}

macro_rules! signed_field {
   ($($ty:ty),*) => {$(
      impl From<$ty> for Value {
         fn from(v: $ty) -> Self {
            Value::Int(v.into())
         }
      }

      impl FromValue for $ty {
         fn from_value(value: Value) -> Result<Self> {
            match value {
               Value::Int(i) => <$ty>::try_from(i).map_err(|_| Error::InvalidCursor),
               Value::Uint(u) => <$ty>::try_from(u).map_err(|_| Error::InvalidCursor),
               _ => Err(Error::InvalidCursor),
            }
         }
      }

      impl FieldValue for $ty {
         const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Int);
      }
   )*};
}

macro_rules! unsigned_field {
   ($($ty:ty),*) => {$(
      impl From<$ty> for Value {
         fn from(v: $ty) -> Self {
            Value::Uint(v.into())
         }
      }

      impl FromValue for $ty {
         fn from_value(value: Value) -> Result<Self> {
            match value {
               Value::Uint(u) => <$ty>::try_from(u).map_err(|_| Error::InvalidCursor),
               Value::Int(i) => <$ty>::try_from(i).map_err(|_| Error::InvalidCursor),
               _ => Err(Error::InvalidCursor),
            }
         }
      }

      impl FieldValue for $ty {
         const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Uint);
      }
   )*};
}

signed_field!(i8, i16, i32, i64);
unsigned_field!(u8, u16, u32, u64);

impl From<bool> for Value {
   fn from(v: bool) -> Self {
      Value::Bool(v)
   }
}

impl FromValue for bool {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Bool(b) => Ok(b),
         _ => Err(Error::InvalidCursor),
      }
   }
}

impl FieldValue for bool {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Bool);
}

impl From<f64> for Value {
   fn from(v: f64) -> Self {
      Value::Float(v)
   }
}

impl From<f32> for Value {
   fn from(v: f32) -> Self {
      Value::Float(v.into())
   }
}

impl FromValue for f64 {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Float(f) => Ok(f),
         Value::Int(i) => Ok(i as f64),
         Value::Uint(u) => Ok(u as f64),
         _ => Err(Error::InvalidCursor),
      }
   }
}

impl FromValue for f32 {
   fn from_value(value: Value) -> Result<Self> {
      f64::from_value(value).map(|f| f as f32)
   }
}

impl FieldValue for f64 {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Float);
}

impl FieldValue for f32 {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Float);
}

impl From<String> for Value {
   fn from(v: String) -> Self {
      Value::Text(v)
   }
}

impl From<&str> for Value {
   fn from(v: &str) -> Self {
      Value::Text(v.to_string())
   }
}

impl FromValue for String {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Text(s) => Ok(s),
         _ => Err(Error::InvalidCursor),
      }
   }
}

impl FieldValue for String {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Text);
}

impl From<OffsetDateTime> for Value {
   fn from(v: OffsetDateTime) -> Self {
      Value::Time(v)
   }
}

impl FromValue for OffsetDateTime {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Time(t) => Ok(t),
         _ => Err(Error::InvalidCursor),
      }
   }
}

impl FieldValue for OffsetDateTime {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Time);
}

impl From<JsonValue> for Value {
   fn from(v: JsonValue) -> Self {
      Value::Json(v)
   }
}

impl FromValue for JsonValue {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Json(j) => Ok(j),
         other => other.to_json().map_err(|_| Error::InvalidCursor),
      }
   }
}

impl FieldValue for JsonValue {
   const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Json);
}

impl<T: Into<Value>> From<Option<T>> for Value {
   fn from(v: Option<T>) -> Self {
      v.map_or(Value::Null, Into::into)
   }
}

impl<T: FromValue> FromValue for Option<T> {
   fn from_value(value: Value) -> Result<Self> {
      match value {
         Value::Null => Ok(None),
         other => T::from_value(other).map(Some),
      }
   }
}

/// A cursor cannot tell an absent value from a present JSON `null`: for
/// `Option<JsonValue>`, `Some(JsonValue::Null)` encodes as `null` and decodes
/// as `None`. A plain `JsonValue` field keeps the `null`.
impl<T: FieldValue> FieldValue for Option<T> {
   const FIELD_TYPE: FieldType = FieldType::nullable(T::FIELD_TYPE.kind);
}
