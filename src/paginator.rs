//! The paginator: configuration, request preparation and page assembly.
//!
//! A request goes through three steps:
//!
//! 1. [`Paginator::prepare`] validates the rules against a record type and
//!    decodes the anchor cursor into a [`PageQuery`].
//! 2. The caller runs its query with the predicate, ORDER BY and limit the
//!    [`PageQuery`] emits.
//! 3. [`PageQuery::finish`] trims, reverses and encodes the next cursors.
//!
//! [`Paginator::paginate`] runs all three with a fetch closure.
//!
//! # Example
//!
//! ```
//! use keyset_paginator::{Paginator, Rule, impl_record};
//!
//! #[derive(Clone, Default)]
//! struct Order {
//!    id: i64,
//!    created_at: String,
//! }
//!
//! impl_record!(Order { id, created_at });
//!
//! let query = Paginator::new()
//!    .rules([Rule::desc("created_at"), Rule::desc("id")])
//!    .limit(20)
//!    .prepare::<Order>()
//!    .unwrap();
//!
//! assert!(query.cursor_condition(0).is_none());
//! assert_eq!(query.order_by_sql(), r#"ORDER BY "created_at" DESC, "id" DESC"#);
//! assert_eq!(query.fetch_limit(), 21);
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::cursor::{Cursor, CursorCodec, CursorField, Decoder, Encoder, JsonCursorCodec};
use crate::page::{Page, post_process};
use crate::predicate::{
   NullOrderStyle, OrderTerm, PlaceholderStyle, Predicate, ResolvedRule, build_cursor_condition,
   build_order_by, render_order_by,
};
use crate::record::Record;
use crate::rule::{PageDirection, Rule, SortDirection, validate_rules};
use crate::value::Value;
use crate::{Error, Result};

/// Default page size.
pub const DEFAULT_LIMIT: usize = 10;

/// Declarative paginator settings.
///
/// Every field has a default, so a config can be loaded from a partial
/// document:
///
/// ```
/// use keyset_paginator::{PaginatorConfig, SortDirection};
///
/// let config: PaginatorConfig =
///    serde_json::from_str(r#"{ "limit": 25, "order": "ASC" }"#).unwrap();
/// assert_eq!(config.limit, 25);
/// assert_eq!(config.order, SortDirection::Asc);
/// assert_eq!(config.keys, vec!["id".to_string()]);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginatorConfig {
   /// Sort rules. When absent, one rule per entry of `keys` is used.
   pub rules: Option<Vec<Rule>>,

   /// Record fields to sort by when no rules are given
   ///
   /// Default: `["id"]`
   pub keys: Vec<String>,

   /// Maximum number of rows per page
   ///
   /// Default: 10
   pub limit: usize,

   /// Order for rules that do not set their own
   ///
   /// Default: DESC
   pub order: SortDirection,

   /// Cursor of the row to continue after
   pub after: Option<String>,

   /// Cursor of the row to continue before
   pub before: Option<String>,

   /// Use the row-value form `(a, b) > ($1, $2)` when every rule sorts the
   /// same way. Not every engine supports it.
   ///
   /// Default: false
   pub allow_tuple_cmp: bool,

   /// Default: numbered `$N`
   pub placeholders: PlaceholderStyle,

   /// Default: `NULLS FIRST|LAST`
   pub null_order_style: NullOrderStyle,

   /// SQL template applied to timestamp columns and their arguments, `{}`
   /// standing for the operand, e.g. `datetime({})`
   pub time_expr: Option<String>,
}

impl Default for PaginatorConfig {
   fn default() -> Self {
      Self {
         rules: None,
         keys: vec!["id".to_string()],
         limit: DEFAULT_LIMIT,
         order: SortDirection::Desc,
         after: None,
         before: None,
         allow_tuple_cmp: false,
         placeholders: PlaceholderStyle::default(),
         null_order_style: NullOrderStyle::default(),
         time_expr: None,
      }
   }
}

/// Keyset paginator for one request.
///
/// Built from [`PaginatorConfig`] or the builder methods; later calls
/// override earlier ones.
#[derive(Debug, Clone)]
pub struct Paginator {
   rules: Option<Vec<Rule>>,
   keys: Vec<String>,
   limit: usize,
   order: SortDirection,
   cursor: Cursor,
   allow_tuple_cmp: bool,
   placeholders: PlaceholderStyle,
   null_order_style: NullOrderStyle,
   time_expr: Option<String>,
   codec: Arc<dyn CursorCodec>,
}

impl Default for Paginator {
   fn default() -> Self {
      Self::from_config(PaginatorConfig::default())
   }
}

impl Paginator {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn from_config(config: PaginatorConfig) -> Self {
      Self {
         rules: config.rules,
         keys: config.keys,
         limit: config.limit,
         order: config.order,
         cursor: Cursor {
            after: config.after,
            before: config.before,
         },
         allow_tuple_cmp: config.allow_tuple_cmp,
         placeholders: config.placeholders,
         null_order_style: config.null_order_style,
         time_expr: config.time_expr,
         codec: Arc::new(JsonCursorCodec),
      }
   }

   /// Sort by these rules, in priority order.
   pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
      self.rules = Some(rules.into_iter().collect());
      self
   }

   /// Sort by these record fields with the default order. Ignored when rules
   /// are set.
   pub fn keys<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
      self.keys = keys.into_iter().map(Into::into).collect();
      self
   }

   pub fn limit(mut self, limit: usize) -> Self {
      self.limit = limit;
      self
   }

   /// Default order for rules that do not set one.
   pub fn order(mut self, order: SortDirection) -> Self {
      self.order = order;
      self
   }

   pub fn after(mut self, cursor: impl Into<String>) -> Self {
      self.cursor.after = Some(cursor.into());
      self
   }

   pub fn before(mut self, cursor: impl Into<String>) -> Self {
      self.cursor.before = Some(cursor.into());
      self
   }

   /// Replace both anchors, typically with the cursor a client sent back.
   pub fn cursor(mut self, cursor: Cursor) -> Self {
      self.cursor = cursor;
      self
   }

   pub fn allow_tuple_cmp(mut self, allow: bool) -> Self {
      self.allow_tuple_cmp = allow;
      self
   }

   pub fn placeholders(mut self, placeholders: PlaceholderStyle) -> Self {
      self.placeholders = placeholders;
      self
   }

   pub fn null_order_style(mut self, style: NullOrderStyle) -> Self {
      self.null_order_style = style;
      self
   }

   /// Compare timestamp keys through `template`, where `{}` stands for the
   /// column or the bound argument.
   pub fn time_expr(mut self, template: impl Into<String>) -> Self {
      self.time_expr = Some(template.into());
      self
   }

   /// The timestamp template, if one is set.
   pub fn time_expr_template(&self) -> Option<&str> {
      self.time_expr.as_deref()
   }

   pub fn codec(mut self, codec: impl CursorCodec + 'static) -> Self {
      self.codec = Arc::new(codec);
      self
   }

   /// Direction of the requested page. `after` wins over `before`.
   pub fn direction(&self) -> PageDirection {
      match (&self.cursor.after, &self.cursor.before) {
         (None, Some(_)) => PageDirection::Backward,
         _ => PageDirection::Forward,
      }
   }

   fn effective_rules(&self) -> Vec<Rule> {
      match &self.rules {
         Some(rules) => rules.clone(),
         None => self.keys.iter().map(Rule::new).collect(),
      }
   }

   /// Validate the request against `R` and decode its anchor.
   ///
   /// Checks run in a fixed order: rules, limit, record fields, then the
   /// cursor.
   pub fn prepare<R: Record>(&self) -> Result<PageQuery> {
      let rules = self.effective_rules();
      validate_rules(&rules)?;
      if self.limit == 0 {
         return Err(Error::InvalidLimit);
      }
      let fetch_limit = self.limit.checked_add(1).ok_or(Error::InvalidLimit)?;

      let rules = rules
         .iter()
         .map(|rule| {
            let resolved = ResolvedRule::resolve::<R>(rule, self.order)?;
            Ok(match &self.time_expr {
               Some(template) => resolved.with_time_expr(template),
               None => resolved,
            })
         })
         .collect::<Result<Vec<_>>>()?;
      let fields: Vec<CursorField> = rules.iter().map(|rule| rule.field.clone()).collect();

      let direction = self.direction();
      let anchor_cursor = match direction {
         PageDirection::Forward => self.cursor.after.as_deref(),
         PageDirection::Backward => self.cursor.before.as_deref(),
      };
      let anchor = anchor_cursor
         .map(|cursor| Decoder::new(&fields, self.codec.as_ref()).decode(cursor))
         .transpose()?;

      debug!(
         ?direction,
         rules = rules.len(),
         anchored = anchor.is_some(),
         limit = self.limit,
         "prepared page query"
      );

      Ok(PageQuery {
         direction,
         anchor,
         rules,
         fields,
         limit: self.limit,
         fetch_limit,
         allow_tuple_cmp: self.allow_tuple_cmp,
         placeholders: self.placeholders,
         null_order_style: self.null_order_style,
         codec: Arc::clone(&self.codec),
      })
   }

   /// Prepare, fetch with `fetch`, and assemble the page.
   pub fn paginate<R, F, E>(&self, fetch: F) -> Result<Page<R>>
   where
      R: Record,
      F: FnOnce(&PageQuery) -> std::result::Result<Vec<R>, E>,
      E: Into<Box<dyn std::error::Error + Send + Sync>>,
   {
      let query = self.prepare::<R>()?;
      let rows = fetch(&query).map_err(Error::fetch)?;
      query.finish(rows)
   }
}

/// A validated page request: everything needed to query one page and to
/// turn the fetched rows into a [`Page`].
#[derive(Debug, Clone)]
pub struct PageQuery {
   direction: PageDirection,
   anchor: Option<Vec<Value>>,
   rules: Vec<ResolvedRule>,
   fields: Vec<CursorField>,
   limit: usize,
   fetch_limit: usize,
   allow_tuple_cmp: bool,
   placeholders: PlaceholderStyle,
   null_order_style: NullOrderStyle,
   codec: Arc<dyn CursorCodec>,
}

impl PageQuery {
   pub fn direction(&self) -> PageDirection {
      self.direction
   }

   /// Decoded anchor values, one per rule.
   pub fn anchor(&self) -> Option<&[Value]> {
      self.anchor.as_deref()
   }

   pub fn rules(&self) -> &[ResolvedRule] {
      &self.rules
   }

   /// Page size requested by the caller.
   pub fn limit(&self) -> usize {
      self.limit
   }

   /// Number of rows to fetch: one more than the page size, to detect
   /// whether another page exists.
   pub fn fetch_limit(&self) -> usize {
      self.fetch_limit
   }

   pub fn placeholders(&self) -> PlaceholderStyle {
      self.placeholders
   }

   /// The condition selecting rows past the anchor, or `None` for a page that
   /// starts at the natural boundary.
   ///
   /// `param_offset` is the number of bind values preceding the cursor
   /// arguments.
   pub fn cursor_condition(&self, param_offset: usize) -> Option<Predicate> {
      self.anchor.as_deref().map(|anchor| {
         build_cursor_condition(
            &self.rules,
            anchor,
            self.direction,
            self.allow_tuple_cmp,
            self.placeholders,
            param_offset,
         )
      })
   }

   /// ORDER BY terms in physical fetch order.
   pub fn order_by(&self) -> Vec<OrderTerm> {
      build_order_by(&self.rules, self.direction)
   }

   pub fn order_by_sql(&self) -> String {
      render_order_by(&self.order_by(), self.null_order_style)
   }

   /// Sort-key values of `record`, in rule order.
   pub fn values<R: Record>(&self, record: &R) -> Result<Vec<Value>> {
      Encoder::new(&self.fields, self.codec.as_ref()).values(record)
   }

   /// Assemble a page from the rows fetched for this query, in the order the
   /// database returned them.
   pub fn finish<R: Record>(&self, rows: Vec<R>) -> Result<Page<R>> {
      let encoder = Encoder::new(&self.fields, self.codec.as_ref());
      let page = post_process(
         rows,
         self.limit,
         self.direction,
         self.anchor.is_some(),
         |row| encoder.encode(row),
      )?;

      debug!(
         rows = page.rows.len(),
         has_more = page.has_more,
         "assembled page"
      );

      Ok(page)
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::predicate::comparison_operator;
   use crate::value::{FieldKind, FieldType};
   use serde_json::json;

   #[derive(Debug, Clone, Default, PartialEq)]
   struct Order {
      id: i64,
      name: String,
   }

   crate::impl_record!(Order { id, name });

   fn orders(n: i64) -> Vec<Order> {
      (1..=n)
         .map(|id| Order {
            id,
            name: format!("order {id}"),
         })
         .collect()
   }

   /// Serve a page from memory, sorted and filtered by `id` the way the
   /// emitted SQL would be.
   fn fetch_by_id(all: &[Order], query: &PageQuery) -> std::result::Result<Vec<Order>, Error> {
      let term = &query.order_by()[0];
      let mut rows = all.to_vec();
      rows.sort_by_key(|order| order.id);
      if term.direction == SortDirection::Desc {
         rows.reverse();
      }

      if let Some(anchor) = query.anchor() {
         let Value::Int(anchor_id) = anchor[0].clone() else {
            return Err(Error::InvalidCursor);
         };
         let op = comparison_operator(query.direction(), query.rules()[0].order);
         rows.retain(|order| if op == ">" { order.id > anchor_id } else { order.id < anchor_id });
      }

      rows.truncate(query.fetch_limit());
      Ok(rows)
   }

   fn ids(page: &Page<Order>) -> Vec<i64> {
      page.rows.iter().map(|order| order.id).collect()
   }

   // ─── configuration ───

   #[test]
   fn defaults() {
      let paginator = Paginator::new();
      let query = paginator.prepare::<Order>().unwrap();
      assert_eq!(query.limit(), 10);
      assert_eq!(query.fetch_limit(), 11);
      assert_eq!(query.order_by_sql(), "ORDER BY \"id\" DESC");
      assert_eq!(query.direction(), PageDirection::Forward);
      assert!(query.cursor_condition(0).is_none());
   }

   #[test]
   fn keys_become_rules_with_default_order() {
      let query = Paginator::new()
         .keys(["name", "id"])
         .order(SortDirection::Asc)
         .prepare::<Order>()
         .unwrap();
      assert_eq!(query.order_by_sql(), "ORDER BY \"name\" ASC, \"id\" ASC");
   }

   #[test]
   fn config_deserializes_rules() {
      let config: PaginatorConfig = serde_json::from_value(json!({
         "rules": [{ "key": "name", "order": "asc" }, { "key": "id" }],
         "limit": 2,
         "allowTupleCmp": true,
         "placeholders": "positional"
      }))
      .unwrap();
      let query = Paginator::from_config(config).prepare::<Order>().unwrap();
      assert_eq!(query.order_by_sql(), "ORDER BY \"name\" ASC, \"id\" DESC");
      assert_eq!(query.placeholders(), PlaceholderStyle::Positional);
      assert_eq!(query.fetch_limit(), 3);
   }

   // ─── validation ───

   #[test]
   fn empty_rules_fail_before_limit() {
      let err = Paginator::new().rules(Vec::new()).limit(0).prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::NoRule));
   }

   #[test]
   fn empty_keys_are_no_rule() {
      let err = Paginator::new().keys(Vec::<String>::new()).prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::NoRule));
   }

   #[test]
   fn zero_limit_is_invalid() {
      let err = Paginator::new().limit(0).prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::InvalidLimit));
   }

   #[test]
   fn overflowing_limit_is_invalid() {
      let err = Paginator::new().limit(usize::MAX).prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::InvalidLimit));
   }

   #[test]
   fn unknown_key_fails_before_cursor() {
      let err = Paginator::new()
         .rules([Rule::new("missing")])
         .after("%%%")
         .prepare::<Order>()
         .unwrap_err();
      assert!(matches!(err, Error::InvalidModel));
   }

   #[test]
   fn malformed_cursor_is_invalid() {
      let err = Paginator::new().after("%%%").prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::InvalidCursor));
   }

   #[test]
   fn cursor_of_wrong_type_is_invalid() {
      let cursor = JsonCursorCodec.encode(&[Value::Text("x".into())]).unwrap();
      let err = Paginator::new().after(cursor).prepare::<Order>().unwrap_err();
      assert!(matches!(err, Error::InvalidCursor));
   }

   // ─── paging ───

   #[test]
   fn walks_forward_backward_and_forward_again() {
      let all = orders(12);
      let fetch = |query: &PageQuery| fetch_by_id(&all, query);

      let first = Paginator::new().paginate(fetch).unwrap();
      assert_eq!(ids(&first), (3..=12).rev().collect::<Vec<_>>());
      assert!(first.cursor.before.is_none());
      let after = first.cursor.after.clone().unwrap();

      let second = Paginator::new().after(after).paginate(fetch).unwrap();
      assert_eq!(ids(&second), vec![2, 1]);
      assert!(second.cursor.after.is_none());
      let before = second.cursor.before.clone().unwrap();

      let third = Paginator::new().before(before).paginate(fetch).unwrap();
      assert_eq!(ids(&third), (3..=12).rev().collect::<Vec<_>>());
      assert!(third.cursor.before.is_none());
      assert_eq!(third.cursor.after, first.cursor.after);
   }

   #[test]
   fn after_wins_over_before() {
      let all = orders(30);
      let fetch = |query: &PageQuery| fetch_by_id(&all, query);
      let codec = JsonCursorCodec;
      let after = codec.encode(&[Value::Int(20)]).unwrap();
      let before = codec.encode(&[Value::Int(10)]).unwrap();

      let page = Paginator::new().after(after).before(before).paginate(fetch).unwrap();
      assert_eq!(ids(&page), (10..=19).rev().collect::<Vec<_>>());
   }

   #[test]
   fn custom_type_on_plain_field_fails_before_fetch() {
      let mut fetched = false;
      let err = Paginator::new()
         .rules([Rule::asc("name").custom_type(json!("x"), FieldType::required(FieldKind::Int))])
         .paginate(|query: &PageQuery| {
            fetched = true;
            fetch_by_id(&orders(3), query)
         })
         .unwrap_err();

      assert_eq!(err.error_code(), "INVALID_MODEL");
      assert!(!fetched);
   }

   #[test]
   fn time_expr_applies_to_timestamp_rules_only() {
      #[derive(Debug, Clone)]
      struct Event {
         id: i64,
         at: time::OffsetDateTime,
      }

      crate::impl_record!(Event { id, at });

      let query = Paginator::new()
         .rules([Rule::asc("at"), Rule::asc("id")])
         .time_expr("datetime({})")
         .prepare::<Event>()
         .unwrap();
      assert_eq!(query.order_by_sql(), "ORDER BY datetime(\"at\") ASC, \"id\" ASC");
   }

   #[test]
   fn fetch_error_is_wrapped() {
      let result = Paginator::new()
         .paginate(|_: &PageQuery| -> std::result::Result<Vec<Order>, String> {
            Err("database is locked".to_string())
         });
      let err = result.unwrap_err();
      assert_eq!(err.error_code(), "FETCH_ERROR");
      assert!(err.to_string().contains("database is locked"));
   }

   #[test]
   fn cursor_condition_uses_param_offset() {
      let cursor = JsonCursorCodec.encode(&[Value::Int(5)]).unwrap();
      let query = Paginator::new().before(cursor).prepare::<Order>().unwrap();
      let predicate = query.cursor_condition(3).unwrap();
      assert_eq!(predicate.sql, "(\"id\" > $4)");
      assert_eq!(predicate.args, vec![Value::Int(5)]);
      assert_eq!(query.order_by_sql(), "ORDER BY \"id\" ASC");
   }
}
