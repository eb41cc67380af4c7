//! Sort rules and the order algebra used to page in both directions.
//!
//! A backward page is fetched in the opposite physical order so that the rows
//! nearest to the anchor come first, then reversed to restore the logical
//! order. [`SortDirection::flip`] and [`NullOrder::flip`] produce that
//! physical order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value::{FieldType, Value};
use crate::{Error, Result};

/// Sort direction for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   /// Return the opposite sort direction.
   pub fn flip(self) -> Self {
      match self {
         SortDirection::Asc => SortDirection::Desc,
         SortDirection::Desc => SortDirection::Asc,
      }
   }

   pub fn as_sql(self) -> &'static str {
      match self {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      }
   }
}

impl fmt::Display for SortDirection {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_sql())
   }
}

impl FromStr for SortDirection {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      if s.eq_ignore_ascii_case("asc") {
         Ok(SortDirection::Asc)
      } else if s.eq_ignore_ascii_case("desc") {
         Ok(SortDirection::Desc)
      } else {
         Err(Error::InvalidOrder {
            value: s.to_string(),
         })
      }
   }
}

impl TryFrom<String> for SortDirection {
   type Error = Error;

   fn try_from(s: String) -> Result<Self> {
      s.parse()
   }
}

/// Placement of NULL values relative to non-NULL values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum NullOrder {
   First,
   Last,
}

impl NullOrder {
   pub fn flip(self) -> Self {
      match self {
         NullOrder::First => NullOrder::Last,
         NullOrder::Last => NullOrder::First,
      }
   }

   pub fn as_sql(self) -> &'static str {
      match self {
         NullOrder::First => "FIRST",
         NullOrder::Last => "LAST",
      }
   }
}

impl fmt::Display for NullOrder {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_sql())
   }
}

impl FromStr for NullOrder {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      if s.eq_ignore_ascii_case("first") {
         Ok(NullOrder::First)
      } else if s.eq_ignore_ascii_case("last") {
         Ok(NullOrder::Last)
      } else {
         Err(Error::InvalidOrder {
            value: s.to_string(),
         })
      }
   }
}

impl TryFrom<String> for NullOrder {
   type Error = Error;

   fn try_from(s: String) -> Result<Self> {
      s.parse()
   }
}

/// Which way a page walks away from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageDirection {
   /// Rows after the anchor (or from the start when there is no anchor)
   Forward,
   /// Rows before the anchor
   Backward,
}

impl PageDirection {
   /// The order rows are physically fetched in for a rule with `order`.
   pub fn physical(self, order: SortDirection) -> SortDirection {
      match self {
         PageDirection::Forward => order,
         PageDirection::Backward => order.flip(),
      }
   }
}

/// Metadata for a field whose comparable scalar is projected out of a
/// structured value (see [`CustomType`](crate::CustomType)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTypeSpec {
   /// Passed verbatim to [`CustomType::custom_type_value`](crate::CustomType::custom_type_value)
   pub meta: JsonValue,
   /// Type of the projected scalar, used to decode cursors
   pub field_type: FieldType,
}

/// A sort rule for one record field.
///
/// Rules are ordered: the first is the primary sort key. The sequence must
/// form a total order over the rows, which usually means the primary key is
/// the last rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
   /// Record field the rule sorts by
   pub key: String,
   /// Sort direction; `None` inherits the paginator's default order
   #[serde(default)]
   pub order: Option<SortDirection>,
   /// SQL expression for the column. Defaults to the quoted key.
   #[serde(default)]
   pub sql_repr: Option<String>,
   /// SQL type the column and its arguments are cast to before comparison
   #[serde(default)]
   pub sql_type: Option<String>,
   /// Explicit NULL placement, independent of the sort direction
   #[serde(default)]
   pub null_order: Option<NullOrder>,
   /// Value NULLs are compared and sorted as
   #[serde(default)]
   pub null_replacement: Option<Value>,
   #[serde(default)]
   pub custom_type: Option<CustomTypeSpec>,
}

impl Rule {
   /// Create a rule for `key` that inherits the paginator's default order.
   pub fn new(key: impl Into<String>) -> Self {
      Self {
         key: key.into(),
         order: None,
         sql_repr: None,
         sql_type: None,
         null_order: None,
         null_replacement: None,
         custom_type: None,
      }
   }

   /// Create a rule with ascending sort direction.
   pub fn asc(key: impl Into<String>) -> Self {
      Self::new(key).order(SortDirection::Asc)
   }

   /// Create a rule with descending sort direction.
   pub fn desc(key: impl Into<String>) -> Self {
      Self::new(key).order(SortDirection::Desc)
   }

   pub fn order(mut self, order: SortDirection) -> Self {
      self.order = Some(order);
      self
   }

   pub fn sql_repr(mut self, sql_repr: impl Into<String>) -> Self {
      self.sql_repr = Some(sql_repr.into());
      self
   }

   pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
      self.sql_type = Some(sql_type.into());
      self
   }

   pub fn nulls_first(mut self) -> Self {
      self.null_order = Some(NullOrder::First);
      self
   }

   pub fn nulls_last(mut self) -> Self {
      self.null_order = Some(NullOrder::Last);
      self
   }

   pub fn null_replacement(mut self, value: impl Into<Value>) -> Self {
      self.null_replacement = Some(value.into());
      self
   }

   pub fn custom_type(mut self, meta: impl Into<JsonValue>, field_type: FieldType) -> Self {
      self.custom_type = Some(CustomTypeSpec {
         meta: meta.into(),
         field_type,
      });
      self
   }

   /// The rule's own order, or `default` when it has none.
   pub fn effective_order(&self, default: SortDirection) -> SortDirection {
      self.order.unwrap_or(default)
   }
}

/// Check that a rule set can drive pagination.
///
/// Orders are typed, so an invalid order can only enter through parsing,
/// which reports [`Error::InvalidOrder`] itself.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
   if rules.is_empty() {
      return Err(Error::NoRule);
   }
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::value::FieldKind;

   // ─── SortDirection ───

   #[test]
   fn sort_direction_flip() {
      assert_eq!(SortDirection::Asc.flip(), SortDirection::Desc);
      assert_eq!(SortDirection::Desc.flip(), SortDirection::Asc);
   }

   #[test]
   fn sort_direction_parses_any_case() {
      assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
      assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
   }

   #[test]
   fn sort_direction_rejects_unknown_value() {
      let err = "123".parse::<SortDirection>().unwrap_err();
      assert!(matches!(err, Error::InvalidOrder { ref value } if value == "123"));
   }

   #[test]
   fn sort_direction_serde() {
      assert_eq!(serde_json::to_string(&SortDirection::Asc).unwrap(), "\"asc\"");
      let desc: SortDirection = serde_json::from_str("\"DESC\"").unwrap();
      assert_eq!(desc, SortDirection::Desc);
      assert!(serde_json::from_str::<SortDirection>("\"up\"").is_err());
   }

   // ─── NullOrder ───

   #[test]
   fn null_order_flip() {
      assert_eq!(NullOrder::First.flip(), NullOrder::Last);
      assert_eq!(NullOrder::Last.flip(), NullOrder::First);
   }

   #[test]
   fn null_order_rejects_unknown_value() {
      assert!(matches!(
         "middle".parse::<NullOrder>(),
         Err(Error::InvalidOrder { .. })
      ));
   }

   // ─── PageDirection ───

   #[test]
   fn backward_pages_fetch_in_flipped_order() {
      assert_eq!(PageDirection::Forward.physical(SortDirection::Asc), SortDirection::Asc);
      assert_eq!(PageDirection::Backward.physical(SortDirection::Asc), SortDirection::Desc);
      assert_eq!(PageDirection::Backward.physical(SortDirection::Desc), SortDirection::Asc);
   }

   // ─── Rule ───

   #[test]
   fn effective_order_inherits_default() {
      assert_eq!(Rule::new("id").effective_order(SortDirection::Desc), SortDirection::Desc);
      assert_eq!(Rule::asc("id").effective_order(SortDirection::Desc), SortDirection::Asc);
   }

   #[test]
   fn validate_rejects_empty_rule_set() {
      assert!(matches!(validate_rules(&[]), Err(Error::NoRule)));
      assert!(validate_rules(&[Rule::new("id")]).is_ok());
   }

   #[test]
   fn rule_deserializes_from_declarative_config() {
      let rule: Rule = serde_json::from_str(
         r#"{
            "key": "data",
            "order": "DESC",
            "sqlRepr": "data #>> '{keyInt}'",
            "sqlType": "numeric",
            "nullOrder": "last",
            "customType": { "meta": "keyInt", "fieldType": { "kind": "int" } }
         }"#,
      )
      .unwrap();

      assert_eq!(rule.order, Some(SortDirection::Desc));
      assert_eq!(rule.null_order, Some(NullOrder::Last));
      assert_eq!(
         rule.custom_type.unwrap().field_type,
         FieldType::required(FieldKind::Int)
      );
   }

   #[test]
   fn rule_with_invalid_order_fails_to_deserialize() {
      let err = serde_json::from_str::<Rule>(r#"{ "key": "id", "order": "123" }"#).unwrap_err();
      assert!(err.to_string().contains("ASC or DESC"));
   }
}
