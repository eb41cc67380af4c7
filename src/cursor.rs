//! Opaque cursors.
//!
//! A cursor is the base64 (standard alphabet) encoding of a JSON array holding
//! one value per sort rule, in rule order. Cursors are not signed or
//! encrypted; they only have to round-trip.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::legacy;
use crate::record::Record;
use crate::value::{FieldType, Value};
use crate::{Error, Result};

/// The pair of cursors surrounding a page.
///
/// As a request, `after` asks for the rows following its anchor and `before`
/// for the rows preceding it; `after` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub after: Option<String>,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub before: Option<String>,
}

impl Cursor {
   pub fn after(cursor: impl Into<String>) -> Self {
      Self {
         after: Some(cursor.into()),
         before: None,
      }
   }

   pub fn before(cursor: impl Into<String>) -> Self {
      Self {
         after: None,
         before: Some(cursor.into()),
      }
   }
}

/// Serialization of sort-key tuples to cursor strings.
pub trait CursorCodec: Send + Sync + fmt::Debug {
   fn encode(&self, values: &[Value]) -> Result<String>;

   /// Decode `cursor`, checking it against one expected type per value.
   fn decode(&self, cursor: &str, types: &[FieldType]) -> Result<Vec<Value>>;
}

/// Default codec: base64 of a JSON array, with a fallback reader for legacy
/// `value?TAG` cursors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCursorCodec;

impl CursorCodec for JsonCursorCodec {
   fn encode(&self, values: &[Value]) -> Result<String> {
      let items = values.iter().map(Value::to_json).collect::<Result<Vec<_>>>()?;
      let payload = serde_json::to_vec(&items).map_err(|_| Error::InvalidModel)?;
      Ok(STANDARD.encode(payload))
   }

   fn decode(&self, cursor: &str, types: &[FieldType]) -> Result<Vec<Value>> {
      let payload = STANDARD.decode(cursor).map_err(|_| Error::InvalidCursor)?;

      let json: JsonValue = match serde_json::from_slice(&payload) {
         Ok(json) => json,
         Err(_) => {
            debug!("cursor payload is not JSON, reading legacy format");
            return legacy::decode(&payload, types);
         }
      };

      let JsonValue::Array(items) = json else {
         return Err(Error::InvalidCursor);
      };
      if items.len() != types.len() {
         return Err(Error::InvalidCursor);
      }

      items
         .into_iter()
         .zip(types)
         .map(|(item, ty)| Value::coerce_json(item, *ty))
         .collect()
   }
}

/// One cursor position: which record field it comes from, its declared
/// type, and the custom-type metadata when the value is projected.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorField {
   pub key: String,
   pub field_type: FieldType,
   pub meta: Option<JsonValue>,
}

impl CursorField {
   /// A plain field of `R`.
   pub fn of<R: Record>(key: impl Into<String>) -> Result<Self> {
      let key = key.into();
      let field_type = R::field_type(&key).ok_or(Error::InvalidModel)?;
      Ok(Self {
         key,
         field_type,
         meta: None,
      })
   }

   /// A value projected out of a [`CustomType`](crate::CustomType) field.
   pub fn custom(key: impl Into<String>, meta: JsonValue, field_type: FieldType) -> Self {
      Self {
         key: key.into(),
         field_type,
         meta: Some(meta),
      }
   }

   fn extract<R: Record>(&self, record: &R) -> Result<Value> {
      match &self.meta {
         Some(meta) => record
            .custom_field(&self.key)
            .ok_or(Error::InvalidModel)?
            .custom_type_value(meta),
         None => record.field_value(&self.key).ok_or(Error::InvalidModel),
      }
   }
}

/// Builds cursors from records.
#[derive(Debug, Clone)]
pub struct Encoder<'a> {
   fields: &'a [CursorField],
   codec: &'a dyn CursorCodec,
}

impl<'a> Encoder<'a> {
   pub fn new(fields: &'a [CursorField], codec: &'a dyn CursorCodec) -> Self {
      Self { fields, codec }
   }

   /// Sort-key values of `record`, in field order.
   pub fn values<R: Record>(&self, record: &R) -> Result<Vec<Value>> {
      self.fields.iter().map(|field| field.extract(record)).collect()
   }

   pub fn encode<R: Record>(&self, record: &R) -> Result<String> {
      self.codec.encode(&self.values(record)?)
   }
}

/// Reads cursors back into values or records.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
   fields: &'a [CursorField],
   codec: &'a dyn CursorCodec,
}

impl<'a> Decoder<'a> {
   pub fn new(fields: &'a [CursorField], codec: &'a dyn CursorCodec) -> Self {
      Self { fields, codec }
   }

   pub fn decode(&self, cursor: &str) -> Result<Vec<Value>> {
      let types: Vec<FieldType> = self.fields.iter().map(|field| field.field_type).collect();
      self.codec.decode(cursor, &types)
   }

   /// Decode `cursor` and write each value into the matching field of
   /// `record`.
   ///
   /// Projected fields cannot be written back and fail with `InvalidModel`.
   pub fn decode_into<R: Record>(&self, cursor: &str, record: &mut R) -> Result<()> {
      let values = self.decode(cursor)?;
      for (field, value) in self.fields.iter().zip(values) {
         if field.meta.is_some() {
            return Err(Error::InvalidModel);
         }
         record.set_field(&field.key, value)?;
      }
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::value::FieldKind;
   use serde_json::json;
   use time::OffsetDateTime;
   use time::macros::datetime;

   #[derive(Debug, Clone, Default, PartialEq)]
   struct Row {
      id: u32,
      name: String,
      remark: Option<String>,
      score: f64,
      active: bool,
      created_at: Option<OffsetDateTime>,
      data: JsonValue,
   }

   crate::impl_record!(Row {
      id, name, remark, score, active, created_at, data;
      custom: data
   });

   #[derive(Debug, Clone, Default, PartialEq)]
   struct Nullables {
      flag: Option<bool>,
      signed: Option<i64>,
      unsigned: Option<u64>,
      ratio: Option<f64>,
      label: Option<String>,
      at: Option<OffsetDateTime>,
      doc: Option<JsonValue>,
   }

   crate::impl_record!(Nullables { flag, signed, unsigned, ratio, label, at, doc });

   const NULLABLE_KEYS: [&str; 7] = ["flag", "signed", "unsigned", "ratio", "label", "at", "doc"];

   fn fields(keys: &[&str]) -> Vec<CursorField> {
      keys.iter().map(|key| CursorField::of::<Row>(*key).unwrap()).collect()
   }

   fn encode_b64(payload: &str) -> String {
      STANDARD.encode(payload)
   }

   // ─── JsonCursorCodec ───

   #[test]
   fn encodes_base64_json_array() {
      let cursor = JsonCursorCodec.encode(&[Value::Int(5), Value::Text("a".into())]).unwrap();
      assert_eq!(cursor, encode_b64(r#"[5,"a"]"#));
   }

   #[test]
   fn decode_rejects_bad_base64() {
      let types = [FieldType::required(FieldKind::Int)];
      assert!(matches!(
         JsonCursorCodec.decode("not base64!", &types),
         Err(Error::InvalidCursor)
      ));
   }

   #[test]
   fn decode_rejects_non_array_and_wrong_length() {
      let types = [FieldType::required(FieldKind::Int)];
      assert!(JsonCursorCodec.decode(&encode_b64(r#"{"id":1}"#), &types).is_err());
      assert!(JsonCursorCodec.decode(&encode_b64("[1,2]"), &types).is_err());
      assert!(JsonCursorCodec.decode(&encode_b64("[]"), &types).is_err());
   }

   #[test]
   fn decode_rejects_malformed_json() {
      let types = [FieldType::required(FieldKind::Text)];
      assert!(matches!(
         JsonCursorCodec.decode(&encode_b64(r#"["123"}"#), &types),
         Err(Error::InvalidCursor)
      ));
   }

   #[test]
   fn decode_falls_back_to_legacy_tokens() {
      let types = [FieldType::required(FieldKind::Uint), FieldType::required(FieldKind::Text)];
      let values = JsonCursorCodec.decode(&encode_b64("12?STRING,abc?STRING"), &types).unwrap();
      assert_eq!(values, vec![Value::Uint(12), Value::Text("abc".into())]);
   }

   // ─── Encoder / Decoder ───

   #[test]
   fn round_trips_every_field_kind() {
      let row = Row {
         id: 42,
         name: "x\"y".into(),
         remark: Some("r".into()),
         score: 1.25,
         active: true,
         created_at: Some(datetime!(2023-05-06 07:08:09.000000123 +02:00)),
         data: json!({ "k": [1, 2] }),
      };
      let fields = fields(&["id", "name", "remark", "score", "active", "created_at", "data"]);
      let encoder = Encoder::new(&fields, &JsonCursorCodec);
      let decoder = Decoder::new(&fields, &JsonCursorCodec);

      let cursor = encoder.encode(&row).unwrap();
      assert_eq!(decoder.decode(&cursor).unwrap(), encoder.values(&row).unwrap());

      let mut decoded = Row::default();
      decoder.decode_into(&cursor, &mut decoded).unwrap();
      assert_eq!(decoded, row);
   }

   #[test]
   fn round_trips_absent_nullable_values() {
      let row = Row {
         id: 1,
         ..Row::default()
      };
      let fields = fields(&["remark", "created_at", "id"]);
      let encoder = Encoder::new(&fields, &JsonCursorCodec);

      let cursor = encoder.encode(&row).unwrap();
      assert_eq!(cursor, encode_b64("[null,null,1]"));

      let mut decoded = Row {
         remark: Some("stale".into()),
         ..Row::default()
      };
      Decoder::new(&fields, &JsonCursorCodec)
         .decode_into(&cursor, &mut decoded)
         .unwrap();
      assert_eq!(decoded.remark, None);
      assert_eq!(decoded.id, 1);
   }

   #[test]
   fn round_trips_every_nullable_kind() {
      let fields: Vec<CursorField> = NULLABLE_KEYS
         .iter()
         .map(|key| CursorField::of::<Nullables>(*key).unwrap())
         .collect();
      let encoder = Encoder::new(&fields, &JsonCursorCodec);
      let decoder = Decoder::new(&fields, &JsonCursorCodec);

      let present = Nullables {
         flag: Some(false),
         signed: Some(-7),
         unsigned: Some(u64::MAX),
         ratio: Some(-0.5),
         label: Some(String::new()),
         at: Some(datetime!(2024-02-29 23:59:59.999 UTC)),
         doc: Some(json!({ "a": null })),
      };

      for row in [present, Nullables::default()] {
         let cursor = encoder.encode(&row).unwrap();
         let mut decoded = Nullables::default();
         decoder.decode_into(&cursor, &mut decoded).unwrap();
         assert_eq!(decoded, row);
      }
   }

   #[test]
   fn json_null_in_optional_json_field_decodes_as_absent() {
      let fields = vec![CursorField::of::<Nullables>("doc").unwrap()];
      let row = Nullables {
         doc: Some(JsonValue::Null),
         ..Nullables::default()
      };

      let cursor = Encoder::new(&fields, &JsonCursorCodec).encode(&row).unwrap();
      assert_eq!(cursor, encode_b64("[null]"));

      let mut decoded = Nullables::default();
      Decoder::new(&fields, &JsonCursorCodec)
         .decode_into(&cursor, &mut decoded)
         .unwrap();
      assert_eq!(decoded.doc, None);
   }

   #[test]
   fn decode_rejects_null_for_required_field() {
      let fields = fields(&["id"]);
      let decoder = Decoder::new(&fields, &JsonCursorCodec);
      assert!(matches!(decoder.decode(&encode_b64("[null]")), Err(Error::InvalidCursor)));
   }

   #[test]
   fn legacy_and_json_cursors_decode_to_same_values() {
      let row = Row {
         id: 7,
         name: "seven".into(),
         created_at: Some(datetime!(2020-01-05 17:51:12.5 UTC)),
         ..Row::default()
      };
      let fields = fields(&["name", "created_at", "id"]);
      let decoder = Decoder::new(&fields, &JsonCursorCodec);

      let json_cursor = Encoder::new(&fields, &JsonCursorCodec).encode(&row).unwrap();
      let legacy_cursor = encode_b64("seven?STRING,2020-01-05T17:51:12.5Z?TIME,7?STRING");

      assert_eq!(decoder.decode(&legacy_cursor).unwrap(), decoder.decode(&json_cursor).unwrap());
   }

   #[test]
   fn custom_field_projects_into_cursor() {
      let row = Row {
         id: 3,
         data: json!({ "keyInt": 30 }),
         ..Row::default()
      };
      let fields = vec![
         CursorField::custom("data", json!("keyInt"), FieldType::required(FieldKind::Int)),
         CursorField::of::<Row>("id").unwrap(),
      ];
      let encoder = Encoder::new(&fields, &JsonCursorCodec);
      let cursor = encoder.encode(&row).unwrap();
      assert_eq!(cursor, encode_b64("[30,3]"));
      assert_eq!(
         Decoder::new(&fields, &JsonCursorCodec).decode(&cursor).unwrap(),
         vec![Value::Int(30), Value::Uint(3)]
      );
   }

   #[test]
   fn decode_into_refuses_projected_fields() {
      let fields = vec![CursorField::custom(
         "data",
         json!("keyInt"),
         FieldType::required(FieldKind::Int),
      )];
      let mut row = Row::default();
      assert!(matches!(
         Decoder::new(&fields, &JsonCursorCodec).decode_into(&encode_b64("[1]"), &mut row),
         Err(Error::InvalidModel)
      ));
   }

   #[test]
   fn unknown_field_is_invalid_model() {
      assert!(matches!(CursorField::of::<Row>("missing"), Err(Error::InvalidModel)));
   }

   #[test]
   fn cursor_serde_uses_camel_case_and_skips_absent() {
      let cursor = Cursor::after("abc");
      assert_eq!(serde_json::to_value(&cursor).unwrap(), json!({ "after": "abc" }));
      let parsed: Cursor = serde_json::from_value(json!({ "before": "xyz" })).unwrap();
      assert_eq!(parsed, Cursor::before("xyz"));
   }
}
