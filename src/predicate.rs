//! Paging predicate and ORDER BY construction.
//!
//! Given resolved rules, the page direction and the anchor values decoded
//! from a cursor, this module emits a WHERE fragment with its ordered bind
//! arguments and the ORDER BY terms that make the database return rows
//! starting right next to the anchor.
//!
//! # Predicate forms
//!
//! The standard form is an OR-chain, one clause per rule:
//!
//! `("a" > $1) OR ("a" = $2 AND "b" < $3) OR ("a" = $4 AND "b" = $5 AND "c" > $6)`
//!
//! When tuple comparison is allowed and every rule sorts the same way, the
//! row-value form is used instead: `("a", "b", "c") > ($1, $2, $3)`.
//!
//! # NULLs
//!
//! A rule with a NULL replacement compares and sorts `COALESCE(col, repl)`, and
//! NULL anchors are replaced by the same value. A rule with an explicit NULL
//! order and no replacement gets null-aware comparisons that agree with the
//! emitted `NULLS FIRST|LAST` placement.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cursor::CursorField;
use crate::record::Record;
use crate::rule::{NullOrder, PageDirection, Rule, SortDirection};
use crate::value::{FieldKind, Value};
use crate::{Error, Result};

/// How bind placeholders are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderStyle {
   /// `$1`, `$2`, … numbered after the caller's own parameters
   #[default]
   Numbered,
   /// Positional `?`
   Positional,
}

/// How an explicit NULL placement is written in ORDER BY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NullOrderStyle {
   /// `expr ASC NULLS LAST` (PostgreSQL, SQLite, Oracle)
   #[default]
   NullsClause,
   /// A leading `expr IS NULL` sort key (MySQL and engines without `NULLS`)
   IsNullKey,
}

/// Comparison operator that selects rows past the anchor.
///
/// `>` when walking forward over an ascending key or backward over a
/// descending one, `<` otherwise.
pub fn comparison_operator(direction: PageDirection, order: SortDirection) -> &'static str {
   match direction.physical(order) {
      SortDirection::Asc => ">",
      SortDirection::Desc => "<",
   }
}

/// Validate that a column name is safe for SQL interpolation.
///
/// Accepts names matching `[a-zA-Z_][a-zA-Z0-9_.]*`, which covers plain column
/// names and qualified names such as `orders.created_at`.
pub(crate) fn validate_column_name(name: &str) -> Result<()> {
   let invalid = || Error::InvalidColumnName {
      name: name.to_string(),
   };

   let mut chars = name.chars();
   let first = chars.next().ok_or_else(invalid)?;
   if !first.is_ascii_alphabetic() && first != '_' {
      return Err(invalid());
   }
   if chars.any(|ch| !ch.is_ascii_alphanumeric() && ch != '_' && ch != '.') {
      return Err(invalid());
   }

   Ok(())
}

/// Quote a (possibly qualified) column name, one identifier per dotted
/// segment.
pub(crate) fn quote_identifier(name: &str) -> String {
   name
      .split('.')
      .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
      .collect::<Vec<_>>()
      .join(".")
}

/// A rule bound to a record type, with its effective order and the SQL
/// expression it compares.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
   /// Where the rule's cursor value comes from
   pub field: CursorField,
   pub order: SortDirection,
   /// Column expression, already wrapped in `COALESCE` and `CAST` as needed
   pub expr: String,
   pub sql_type: Option<String>,
   pub null_order: Option<NullOrder>,
   pub null_replacement: Option<Value>,
   /// Template, `{}` standing for the operand, that both the column and its
   /// arguments pass through before comparison
   pub time_expr: Option<String>,
}

impl ResolvedRule {
   /// Resolve `rule` against the fields of `R`.
   pub fn resolve<R: Record>(rule: &Rule, default_order: SortDirection) -> Result<Self> {
      let field = match &rule.custom_type {
         Some(custom) => {
            if !R::is_custom_field(&rule.key) {
               return Err(Error::InvalidModel);
            }
            CursorField::custom(&rule.key, custom.meta.clone(), custom.field_type)
         }
         None => CursorField::of::<R>(&rule.key)?,
      };

      let null_replacement = rule.null_replacement.clone().filter(|value| !value.is_null());

      let mut expr = match &rule.sql_repr {
         Some(repr) => repr.clone(),
         None => {
            validate_column_name(&rule.key)?;
            quote_identifier(&rule.key)
         }
      };
      if let Some(replacement) = &null_replacement {
         expr = format!("COALESCE({expr}, {})", replacement.to_sql_literal()?);
      }
      if let Some(sql_type) = &rule.sql_type {
         expr = format!("CAST({expr} AS {sql_type})");
      }

      Ok(Self {
         field,
         order: rule.effective_order(default_order),
         expr,
         sql_type: rule.sql_type.clone(),
         null_order: rule.null_order,
         null_replacement,
         time_expr: None,
      })
   }

   /// Pass a timestamp rule's column and arguments through `template`, so
   /// that values stored in different textual forms compare by instant.
   ///
   /// Rules over other kinds are returned unchanged.
   pub fn with_time_expr(mut self, template: &str) -> Self {
      if self.field.field_type.kind != FieldKind::Time {
         return self;
      }
      self.expr = template.replace("{}", &self.expr);
      self.time_expr = Some(template.to_string());
      self
   }

   /// NULLs are pinned by the NULL order rather than folded into a
   /// replacement value.
   fn null_aware(&self) -> bool {
      self.null_order.is_some() && self.null_replacement.is_none()
   }

   /// NULL placement in the order rows are physically fetched.
   fn physical_nulls(&self, direction: PageDirection) -> Option<NullOrder> {
      self.null_order.map(|nulls| match direction {
         PageDirection::Forward => nulls,
         PageDirection::Backward => nulls.flip(),
      })
   }

   /// The value compared against the column for an anchor value.
   fn anchor_value<'v>(&'v self, value: &'v Value) -> &'v Value {
      match &self.null_replacement {
         Some(replacement) if value.is_null() => replacement,
         _ => value,
      }
   }

   fn seek(&self, value: &Value, direction: PageDirection) -> Seek {
      let nulls = if self.null_aware() {
         self.physical_nulls(direction)
      } else {
         None
      };

      match (nulls, value.is_null()) {
         (None, _) => Seek::Compare,
         (Some(NullOrder::First), false) => Seek::Compare,
         (Some(NullOrder::Last), false) => Seek::CompareOrNull,
         (Some(NullOrder::First), true) => Seek::NotNull,
         (Some(NullOrder::Last), true) => Seek::Never,
      }
   }

   fn equal_condition(&self, value: &Value, binder: &mut Binder) -> String {
      if value.is_null() {
         format!("{} IS NULL", self.expr)
      } else {
         format!("{} = {}", self.expr, binder.bind(self, value))
      }
   }

   fn seek_condition(
      &self,
      seek: Seek,
      value: &Value,
      direction: PageDirection,
      binder: &mut Binder,
   ) -> String {
      let op = comparison_operator(direction, self.order);
      match seek {
         Seek::Compare => format!("{} {op} {}", self.expr, binder.bind(self, value)),
         Seek::CompareOrNull => format!(
            "({expr} {op} {} OR {expr} IS NULL)",
            binder.bind(self, value),
            expr = self.expr
         ),
         Seek::NotNull => format!("{} IS NOT NULL", self.expr),
         Seek::Never => "1 = 0".to_string(),
      }
   }
}

/// How one rule's column is compared with its anchor value to move past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
   /// Plain `col op value`
   Compare,
   /// NULLs follow every non-NULL value
   CompareOrNull,
   /// Anchor is NULL and NULLs come first, so every non-NULL value follows
   NotNull,
   /// Anchor is NULL and NULLs come last: nothing follows on this column
   Never,
}

/// Assigns placeholders and collects arguments in the order they appear.
struct Binder {
   style: PlaceholderStyle,
   next: usize,
   args: Vec<Value>,
}

impl Binder {
   fn new(style: PlaceholderStyle, param_offset: usize) -> Self {
      Self {
         style,
         next: param_offset,
         args: Vec::new(),
      }
   }

   fn bind(&mut self, rule: &ResolvedRule, value: &Value) -> String {
      self.args.push(value.clone());
      let placeholder = match self.style {
         PlaceholderStyle::Numbered => {
            self.next += 1;
            format!("${}", self.next)
         }
         PlaceholderStyle::Positional => "?".to_string(),
      };
      let operand = match &rule.sql_type {
         Some(sql_type) => format!("CAST({placeholder} AS {sql_type})"),
         None => placeholder,
      };
      match &rule.time_expr {
         Some(template) => template.replace("{}", &operand),
         None => operand,
      }
   }
}

/// A WHERE fragment and its bind arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
   pub sql: String,
   pub args: Vec<Value>,
}

/// Build the condition selecting the rows past `anchor`.
///
/// `param_offset` is the number of bind values the caller places before the
/// cursor arguments; numbered placeholders start at `param_offset + 1`.
pub fn build_cursor_condition(
   rules: &[ResolvedRule],
   anchor: &[Value],
   direction: PageDirection,
   allow_tuple_cmp: bool,
   placeholders: PlaceholderStyle,
   param_offset: usize,
) -> Predicate {
   let values: Vec<&Value> = rules
      .iter()
      .zip(anchor)
      .map(|(rule, value)| {
         let value = rule.anchor_value(value);
         if value.is_null() && !rule.null_aware() {
            warn!(
               key = %rule.field.key,
               "cursor holds NULL for a rule without NULL handling; no row can follow it"
            );
         }
         value
      })
      .collect();

   let mut binder = Binder::new(placeholders, param_offset);

   let uniform = rules.windows(2).all(|pair| pair[0].order == pair[1].order);
   if allow_tuple_cmp
      && uniform
      && !rules.is_empty()
      && !rules.iter().any(ResolvedRule::null_aware)
   {
      let op = comparison_operator(direction, rules[0].order);
      let exprs: Vec<&str> = rules.iter().map(|rule| rule.expr.as_str()).collect();
      let params: Vec<String> = rules
         .iter()
         .zip(&values)
         .map(|(rule, value)| binder.bind(rule, value))
         .collect();

      return Predicate {
         sql: format!("({}) {op} ({})", exprs.join(", "), params.join(", ")),
         args: binder.args,
      };
   }

   let mut clauses = Vec::new();
   for level in 0..rules.len() {
      let seek = rules[level].seek(values[level], direction);
      if seek == Seek::Never {
         continue;
      }

      let mut parts: Vec<String> = (0..level)
         .map(|eq_idx| rules[eq_idx].equal_condition(values[eq_idx], &mut binder))
         .collect();
      parts.push(rules[level].seek_condition(seek, values[level], direction, &mut binder));

      clauses.push(format!("({})", parts.join(" AND ")));
   }

   if clauses.is_empty() {
      return Predicate {
         sql: "1 = 0".to_string(),
         args: Vec::new(),
      };
   }

   Predicate {
      sql: clauses.join(" OR "),
      args: binder.args,
   }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTerm {
   pub expr: String,
   pub direction: SortDirection,
   pub nulls: Option<NullOrder>,
}

impl OrderTerm {
   pub fn to_sql(&self, style: NullOrderStyle) -> String {
      let term = format!("{} {}", self.expr, self.direction);
      match (self.nulls, style) {
         (None, _) => term,
         (Some(nulls), NullOrderStyle::NullsClause) => format!("{term} NULLS {nulls}"),
         (Some(NullOrder::First), NullOrderStyle::IsNullKey) => {
            format!("{} IS NOT NULL, {term}", self.expr)
         }
         (Some(NullOrder::Last), NullOrderStyle::IsNullKey) => {
            format!("{} IS NULL, {term}", self.expr)
         }
      }
   }
}

/// ORDER BY terms in the physical fetch order for `direction`.
pub fn build_order_by(rules: &[ResolvedRule], direction: PageDirection) -> Vec<OrderTerm> {
   rules
      .iter()
      .map(|rule| OrderTerm {
         expr: rule.expr.clone(),
         direction: direction.physical(rule.order),
         nulls: rule.physical_nulls(direction),
      })
      .collect()
}

/// Render a full `ORDER BY …` clause.
pub fn render_order_by(terms: &[OrderTerm], style: NullOrderStyle) -> String {
   let parts: Vec<String> = terms.iter().map(|term| term.to_sql(style)).collect();
   format!("ORDER BY {}", parts.join(", "))
}
