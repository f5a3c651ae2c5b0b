//! Parameterized SQL for the property search.
//!
//! Filters are first collected into an ordered list of [`Predicate`]s and then
//! rendered in a single pass. Placeholder numbers come from each value's
//! position in the parameter list, so the Nth `$N` in the text always binds the
//! Nth element of [`QueryPlan::params`].

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{ResultLimit, SearchOptions};

const BASE_QUERY: &str = "SELECT properties.*, avg(property_reviews.rating) as average_rating
FROM properties
JOIN property_reviews ON properties.id = property_id";

const GROUP_BY: &str = "GROUP BY properties.id";

const AVERAGE_RATING: &str = "avg(property_reviews.rating)";

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Integer(i) => write!(f, "{i}"),
            SqlParam::Decimal(d) => write!(f, "{d}"),
            SqlParam::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Integer(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Integer(value.into())
    }
}

impl From<Decimal> for SqlParam {
    fn from(value: Decimal) -> Self {
        SqlParam::Decimal(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    AtLeast,
    AtMost,
    Like,
}

impl Comparison {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Like => "LIKE",
        }
    }
}

/// One `column <op> $N` condition of the WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: &'static str,
    pub comparison: Comparison,
    pub value: SqlParam,
}

impl Predicate {
    fn new(column: &'static str, comparison: Comparison, value: impl Into<SqlParam>) -> Self {
        Self {
            column,
            comparison,
            value: value.into(),
        }
    }

    fn render(&self, placeholder: usize) -> String {
        format!("{} {} ${}", self.column, self.comparison.as_sql(), placeholder)
    }
}

/// Collects the row-level filters in their fixed order:
/// owner, minimum price, maximum price, city.
pub fn predicates(options: &SearchOptions) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(owner_id) = options.owner_id {
        predicates.push(Predicate::new("owner_id", Comparison::Eq, owner_id));
    }
    if let Some(min) = options.minimum_price_per_night {
        predicates.push(Predicate::new(
            "cost_per_night",
            Comparison::AtLeast,
            minor_units(min),
        ));
    }
    if let Some(max) = options.maximum_price_per_night {
        predicates.push(Predicate::new(
            "cost_per_night",
            Comparison::AtMost,
            minor_units(max),
        ));
    }
    if let Some(city) = options.city_filter() {
        predicates.push(Predicate::new("city", Comparison::Like, contains_pattern(city)));
    }

    predicates
}

/// Converts a major-unit price to the stored minor units (x100), rounded to the
/// nearest whole unit.
pub fn minor_units(price: Decimal) -> SqlParam {
    let cents = price
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(if price.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        })
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    match cents.to_i64() {
        Some(cents) => SqlParam::Integer(cents),
        None => SqlParam::Decimal(cents),
    }
}

/// `%value%` with LIKE metacharacters in `value` escaped, so user input only
/// ever matches literally.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Query text plus its positional parameters, built fresh for every search
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryPlan {
    pub fn build(options: &SearchOptions, limit: ResultLimit) -> Self {
        let mut sql = String::from(BASE_QUERY);
        let mut params = Vec::new();

        for (i, predicate) in predicates(options).into_iter().enumerate() {
            let keyword = if i == 0 { "\nWHERE " } else { " AND " };
            sql.push_str(keyword);
            sql.push_str(&predicate.render(params.len() + 1));
            params.push(predicate.value);
        }

        sql.push('\n');
        sql.push_str(GROUP_BY);

        if let Some(rating) = options.minimum_rating {
            params.push(SqlParam::Decimal(rating));
            sql.push_str(&format!("\nHAVING {AVERAGE_RATING} >= ${}", params.len()));
        }

        params.push(SqlParam::Integer(limit.get().into()));
        sql.push_str(&format!(
            "\nORDER BY cost_per_night ASC\nLIMIT ${}",
            params.len()
        ));

        Self { sql, params }
    }

    /// Highest placeholder number used in the query text
    pub fn placeholder_count(&self) -> usize {
        self.params.len()
    }
}
