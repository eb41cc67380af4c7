/// Result type alias for pagination operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the paginator.
///
/// Configuration errors (`NoRule`, `InvalidLimit`, `InvalidOrder`,
/// `InvalidModel`, `InvalidColumnName`) are reported before the anchor cursor
/// is touched, so a malformed request always fails with exactly one kind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// The cursor is not valid base64, not a JSON array (or legacy token list),
   /// has the wrong number of values, or a value does not fit its field type.
   #[error("invalid cursor")]
   InvalidCursor,

   /// A rule key does not exist on the record type, or a record could not
   /// produce a value for one of the rule keys.
   #[error("record fields should match the rules or keys configured for the paginator")]
   InvalidModel,

   /// Limit must be greater than zero.
   #[error("limit should be greater than 0")]
   InvalidLimit,

   /// An order value is neither ASC nor DESC (or a null order neither FIRST
   /// nor LAST).
   #[error("order should be ASC or DESC, got '{value}'")]
   InvalidOrder { value: String },

   /// The paginator has no rules to sort by.
   #[error("rule cannot be empty")]
   NoRule,

   /// A rule key used as a column reference contains characters that are not
   /// safe to interpolate into SQL.
   ///
   /// Keys without an explicit SQL representation must match
   /// `[a-zA-Z_][a-zA-Z0-9_.]*`.
   #[error("invalid column name '{name}': must match [a-zA-Z_][a-zA-Z0-9_.]*")]
   InvalidColumnName { name: String },

   /// The fetch collaborator failed.
   #[error("fetch failed: {0}")]
   Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::InvalidCursor => "INVALID_CURSOR".to_string(),
         Error::InvalidModel => "INVALID_MODEL".to_string(),
         Error::InvalidLimit => "INVALID_LIMIT".to_string(),
         Error::InvalidOrder { .. } => "INVALID_ORDER".to_string(),
         Error::NoRule => "NO_RULE".to_string(),
         Error::InvalidColumnName { .. } => "INVALID_COLUMN_NAME".to_string(),
         Error::Fetch(_) => "FETCH_ERROR".to_string(),
      }
   }

   /// Wrap any error raised while fetching rows.
   pub fn fetch(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
      Error::Fetch(err.into())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_invalid_cursor() {
      assert_eq!(Error::InvalidCursor.error_code(), "INVALID_CURSOR");
   }

   #[test]
   fn test_error_code_invalid_model() {
      let err = Error::InvalidModel;
      assert_eq!(err.error_code(), "INVALID_MODEL");
      assert!(err.to_string().contains("record fields"));
   }

   #[test]
   fn test_error_code_invalid_limit() {
      let err = Error::InvalidLimit;
      assert_eq!(err.error_code(), "INVALID_LIMIT");
      assert!(err.to_string().contains("greater than 0"));
   }

   #[test]
   fn test_error_code_invalid_order() {
      let err = Error::InvalidOrder {
         value: "sideways".into(),
      };
      assert_eq!(err.error_code(), "INVALID_ORDER");
      assert!(err.to_string().contains("sideways"));
   }

   #[test]
   fn test_error_code_no_rule() {
      assert_eq!(Error::NoRule.error_code(), "NO_RULE");
   }

   #[test]
   fn test_error_code_invalid_column_name() {
      let err = Error::InvalidColumnName {
         name: "bad;name".into(),
      };
      assert_eq!(err.error_code(), "INVALID_COLUMN_NAME");
      assert!(err.to_string().contains("bad;name"));
   }

   #[test]
   fn test_error_code_fetch() {
      let err = Error::fetch("connection reset");
      assert_eq!(err.error_code(), "FETCH_ERROR");
      assert!(err.to_string().contains("connection reset"));
   }
}
