//! Record accessor capability.
//!
//! The paginator reads sort-key values out of fetched rows and, when a cursor
//! is decoded into a record, writes them back. Row types expose their fields
//! through [`Record`], usually by invoking [`impl_record!`](crate::impl_record).

use serde_json::{Map, Value as JsonValue};

use crate::value::{FieldType, FieldValue, Value};
use crate::{Error, Result};

/// Field access for a row type that can be paginated.
///
/// Keys are the names used in [`Rule::key`](crate::Rule::key).
pub trait Record {
   /// Declared type of `key`, or `None` when the record has no such field.
   fn field_type(key: &str) -> Option<FieldType>;

   /// Current value of `key`.
   fn field_value(&self, key: &str) -> Option<Value>;

   /// Overwrite `key` with a decoded value.
   fn set_field(&mut self, key: &str, value: Value) -> Result<()>;

   /// Structured field that projects its comparable scalar through
   /// [`CustomType`].
   fn custom_field(&self, key: &str) -> Option<&dyn CustomType> {
      let _ = key;
      None
   }

   /// Whether `key` is served by [`custom_field`](Self::custom_field).
   fn is_custom_field(key: &str) -> bool {
      let _ = key;
      false
   }
}

/// A field whose sortable value is derived from metadata, such as one key of
/// a JSON column.
pub trait CustomType {
   fn custom_type_value(&self, meta: &JsonValue) -> Result<Value>;
}

/// `meta` names an object key; a missing key projects to NULL.
impl CustomType for Map<String, JsonValue> {
   fn custom_type_value(&self, meta: &JsonValue) -> Result<Value> {
      let key = meta.as_str().ok_or(Error::InvalidModel)?;
      Ok(self.get(key).map_or(Value::Null, Value::from_json))
   }
}

impl CustomType for JsonValue {
   fn custom_type_value(&self, meta: &JsonValue) -> Result<Value> {
      match self {
         JsonValue::Object(map) => map.custom_type_value(meta),
         JsonValue::Null => Ok(Value::Null),
         _ => Err(Error::InvalidModel),
      }
   }
}

#[doc(hidden)]
pub fn field_type_of<R, T: FieldValue>(_accessor: impl Fn(&R) -> &T) -> FieldType {
   T::FIELD_TYPE
}

/// Implement [`Record`] for a struct by listing the fields that may be used
/// as sort keys.
///
/// Each listed field must implement [`FieldValue`](crate::FieldValue). Keys
/// are the field names.
///
/// ```
/// use keyset_paginator::impl_record;
///
/// #[derive(Clone, Default)]
/// struct Order {
///    id: i64,
///    remark: Option<String>,
/// }
///
/// impl_record!(Order { id, remark });
/// ```
///
/// Fields listed after `custom:` are exposed through
/// [`Record::custom_field`] instead and must implement
/// [`CustomType`](crate::CustomType).
#[macro_export]
macro_rules! impl_record {
   ($record:ty { $($field:ident),+ $(,)? }) => {
      $crate::impl_record!($record { $($field),+ ; custom: });
   };
   ($record:ty { $($field:ident),+ ; custom: $($custom:ident),* $(,)? }) => {
      impl $crate::Record for $record {
         fn field_type(key: &str) -> ::core::option::Option<$crate::FieldType> {
            match key {
               $(
                  ::core::stringify!($field) => ::core::option::Option::Some(
                     $crate::record::field_type_of(|record: &$record| &record.$field),
                  ),
               )+
               _ => ::core::option::Option::None,
            }
         }

         fn field_value(&self, key: &str) -> ::core::option::Option<$crate::Value> {
            match key {
               $(
                  ::core::stringify!($field) => ::core::option::Option::Some(
                     ::core::convert::Into::into(::core::clone::Clone::clone(&self.$field)),
                  ),
               )+
               _ => ::core::option::Option::None,
            }
         }

         fn set_field(&mut self, key: &str, value: $crate::Value) -> $crate::Result<()> {
            match key {
               $(
                  ::core::stringify!($field) => {
                     self.$field = $crate::FromValue::from_value(value)?;
                     ::core::result::Result::Ok(())
                  }
               )+
               _ => ::core::result::Result::Err($crate::Error::InvalidModel),
            }
         }

         fn custom_field(
            &self,
            key: &str,
         ) -> ::core::option::Option<&dyn $crate::CustomType> {
            match key {
               $(
                  ::core::stringify!($custom) => ::core::option::Option::Some(&self.$custom),
               )*
               _ => ::core::option::Option::None,
            }
         }

         fn is_custom_field(key: &str) -> bool {
            match key {
               $(
                  ::core::stringify!($custom) => true,
               )*
               _ => false,
            }
         }
      }
   };
}
