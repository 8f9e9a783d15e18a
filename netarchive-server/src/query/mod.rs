//! Query engine
//!
//! A [`NetworkQuery`] selects archived networks by tag and by metadata
//! constraint. Both filters are conjunctive: a network must carry every
//! requested tag and satisfy every constraint. Each filter is resolved to a
//! set of network ids on its own and the sets are intersected, rather than
//! joining everything in one statement.
//!
//! Equality operators compare the stored string exactly; ordering operators
//! read the stored string as a number and skip rows that do not parse. All
//! of that reading goes through [`StoredValue`].

pub mod sampling;

use crate::value::{MetadataValue, StoredValue};
use netarchive_common::db::{metadata, networks, tags, Network};
use netarchive_common::normalize_tags;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub use sampling::{SampleOutcome, Sampling};

/// A query or sampling request that can never be satisfied as written
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unrecognised comparison operator '{0}'")]
    UnknownOperator(String),

    #[error("Operator {operator} on '{key}' needs a numeric value, got '{value}'")]
    NonNumericOperand {
        key: String,
        operator: &'static str,
        value: String,
    },

    #[error("Pool ({pool}) cannot be smaller than the number of networks requested ({n})")]
    PoolSmallerThanSample { n: i64, pool: i64 },
}

/// Comparison applied by a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Operator {
    /// Parse an operator from its symbol or its name
    ///
    /// Accepts `==`, `!=`, `<`, `<=`, `>`, `>=` and the spelled-out forms
    /// `equal`, `notequal`, `lessthan`, `lessthanorequal`, `greaterthan`,
    /// `greaterthanorequal` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "==" | "=" | "equal" => Some(Operator::Equal),
            "!=" | "notequal" => Some(Operator::NotEqual),
            "<" | "lessthan" => Some(Operator::LessThan),
            "<=" | "lessthanorequal" => Some(Operator::LessThanOrEqual),
            ">" | "greaterthan" => Some(Operator::GreaterThan),
            ">=" | "greaterthanorequal" => Some(Operator::GreaterThanOrEqual),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }

    /// Whether the operator compares numerically
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Operator::Equal | Operator::NotEqual)
    }

    /// Compare a stored value against a constraint operand
    pub fn evaluate(&self, stored: StoredValue<'_>, operand: &Operand) -> bool {
        match self {
            Operator::Equal => stored.as_text() == operand.text,
            Operator::NotEqual => stored.as_text() != operand.text,
            Operator::LessThan => compare_numbers(stored, operand, |a, b| a < b),
            Operator::LessThanOrEqual => compare_numbers(stored, operand, |a, b| a <= b),
            Operator::GreaterThan => compare_numbers(stored, operand, |a, b| a > b),
            Operator::GreaterThanOrEqual => compare_numbers(stored, operand, |a, b| a >= b),
        }
    }
}

/// Rows whose stored value is not a number never match
fn compare_numbers(stored: StoredValue<'_>, operand: &Operand, cmp: fn(f64, f64) -> bool) -> bool {
    match (stored.as_number(), operand.number) {
        (Some(lhs), Some(rhs)) => cmp(lhs, rhs),
        _ => false,
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Constraint value prepared for comparison against stored strings
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    /// Stored string form, for equality
    text: String,
    /// Numeric reading, for ordering
    number: Option<f64>,
}

impl Operand {
    pub fn new(value: &MetadataValue) -> Self {
        Self {
            text: value.to_string(),
            number: value.as_number(),
        }
    }
}

/// A `(key, operator, value)` filter over metadata rows
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    key: String,
    operator: Operator,
    value: MetadataValue,
    operand: Operand,
}

impl Constraint {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        value: impl Into<MetadataValue>,
    ) -> Result<Self, ConfigurationError> {
        let key = key.into();
        let value = value.into();
        let operand = Operand::new(&value);

        if operator.is_numeric() && operand.number.is_none() {
            return Err(ConfigurationError::NonNumericOperand {
                key,
                operator: operator.symbol(),
                value: value.to_string(),
            });
        }

        Ok(Self {
            key,
            operator,
            value,
            operand,
        })
    }

    /// Build a constraint from an operator given as text
    pub fn parse(
        key: impl Into<String>,
        operator: &str,
        value: impl Into<MetadataValue>,
    ) -> Result<Self, ConfigurationError> {
        let op = Operator::parse(operator)
            .ok_or_else(|| ConfigurationError::UnknownOperator(operator.to_string()))?;
        Self::new(key, op, value)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &MetadataValue {
        &self.value
    }

    /// Whether one stored value for this constraint's key satisfies it
    pub fn matches(&self, stored: &str) -> bool {
        self.operator.evaluate(StoredValue::new(stored), &self.operand)
    }

    /// Request form of the constraint
    pub fn to_spec(&self) -> ConstraintSpec {
        ConstraintSpec {
            key: self.key.clone(),
            operator: self.operator.symbol().to_string(),
            value: self.value.clone(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.operator, self.value)
    }
}

/// A constraint as it appears in a search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub key: String,
    pub operator: String,
    pub value: MetadataValue,
}

impl TryFrom<ConstraintSpec> for Constraint {
    type Error = ConfigurationError;

    fn try_from(spec: ConstraintSpec) -> Result<Self, Self::Error> {
        Constraint::parse(spec.key, &spec.operator, spec.value)
    }
}

/// Tag and metadata filter over the available networks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkQuery {
    tags: Vec<String>,
    constraints: Vec<Constraint>,
}

impl NetworkQuery {
    /// Tags are normalised the way stored tags are
    pub fn new<I, S>(tags: I, constraints: Vec<Constraint>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: normalize_tags(tags),
            constraints,
        }
    }

    /// Build a query from request-shaped constraints
    pub fn from_specs<I, S>(tags: I, specs: Vec<ConstraintSpec>) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let constraints = specs
            .into_iter()
            .map(Constraint::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(tags, constraints))
    }

    /// Required tags
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Applied constraints rendered as `key op value`
    pub fn describe(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.to_string()).collect()
    }

    /// Whether the query filters anything at all
    pub fn is_unfiltered(&self) -> bool {
        self.tags.is_empty() && self.constraints.is_empty()
    }

    /// Networks matching the query, oldest upload first
    ///
    /// Only networks marked available are searched.
    pub async fn evaluate(&self, pool: &SqlitePool) -> netarchive_common::Result<Vec<Network>> {
        let mut selected: Option<HashSet<Uuid>> = None;

        for tag in &self.tags {
            let ids: HashSet<Uuid> = tags::network_ids_with_tag(pool, tag)
                .await?
                .into_iter()
                .collect();
            debug!(tag = %tag, matches = ids.len(), "Tag filter");
            if narrow(&mut selected, ids) {
                return Ok(Vec::new());
            }
        }

        for constraint in &self.constraints {
            let ids: HashSet<Uuid> = metadata::rows_with_key(pool, &constraint.key)
                .await?
                .into_iter()
                .filter(|(_, value)| constraint.matches(value))
                .map(|(id, _)| id)
                .collect();
            debug!(constraint = %constraint, matches = ids.len(), "Metadata filter");
            if narrow(&mut selected, ids) {
                return Ok(Vec::new());
            }
        }

        let available = networks::list_available_networks(pool).await?;
        Ok(match selected {
            None => available,
            Some(ids) => available
                .into_iter()
                .filter(|n| ids.contains(&n.id))
                .collect(),
        })
    }
}

/// Intersect the running selection with `ids`; true once nothing is left
fn narrow(selected: &mut Option<HashSet<Uuid>>, ids: HashSet<Uuid>) -> bool {
    let next = match selected.take() {
        None => ids,
        Some(current) => current.intersection(&ids).copied().collect(),
    };
    let empty = next.is_empty();
    *selected = Some(next);
    empty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_spellings() {
        assert_eq!(Operator::parse("=="), Some(Operator::Equal));
        assert_eq!(Operator::parse("equal"), Some(Operator::Equal));
        assert_eq!(Operator::parse("NotEqual"), Some(Operator::NotEqual));
        assert_eq!(Operator::parse("<="), Some(Operator::LessThanOrEqual));
        assert_eq!(Operator::parse("greaterthanorequal"), Some(Operator::GreaterThanOrEqual));
        assert_eq!(Operator::parse("~="), None);
        assert_eq!(Operator::parse("like"), None);
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = Constraint::parse("N", "between", 3).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownOperator("between".to_string()));
    }

    #[test]
    fn test_numeric_operator_needs_numeric_value() {
        assert!(matches!(
            Constraint::parse("N", ">", "lots"),
            Err(ConfigurationError::NonNumericOperand { .. })
        ));
        assert!(matches!(
            Constraint::parse("N", "<", true),
            Err(ConfigurationError::NonNumericOperand { .. })
        ));
        // Numeric text is fine
        assert!(Constraint::parse("N", ">", "250").is_ok());
        // Equality never needs a number
        assert!(Constraint::parse("name", "==", "lots").is_ok());
    }

    #[test]
    fn test_numeric_comparison_coerces_stored_value() {
        let c = Constraint::parse("N", ">", 250).unwrap();
        assert!(c.matches("300"));
        assert!(c.matches("500.0"));
        assert!(!c.matches("100"));
        // Lexically "1000" < "250", numerically it is not
        assert!(c.matches("1000"));
        // Unparseable rows never match
        assert!(!c.matches("many"));
    }

    #[test]
    fn test_boundaries() {
        assert!(Constraint::parse("k", "<=", 2.5).unwrap().matches("2.5"));
        assert!(!Constraint::parse("k", "<", 2.5).unwrap().matches("2.5"));
        assert!(Constraint::parse("k", ">=", 2).unwrap().matches("2.0"));
        assert!(!Constraint::parse("k", ">", 2).unwrap().matches("2.0"));
    }

    #[test]
    fn test_equality_is_exact_string_comparison() {
        let c = Constraint::parse("N", "==", 100).unwrap();
        assert!(c.matches("100"));
        // No numeric coercion for equality
        assert!(!c.matches("100.0"));

        let er = Constraint::parse("degree-distribution", "==", "ER").unwrap();
        assert!(er.matches("ER"));
        assert!(!er.matches("er"));

        let ne = Constraint::parse("degree-distribution", "!=", "ER").unwrap();
        assert!(ne.matches("BA"));
        assert!(!ne.matches("ER"));
    }

    #[test]
    fn test_float_operand_uses_stored_form() {
        let c = Constraint::parse("kmean", "==", 10.0).unwrap();
        assert!(c.matches("10.0"));
        assert!(!c.matches("10"));
    }

    #[test]
    fn test_boolean_operand_uses_stored_form() {
        let c = Constraint::parse("connected", "==", true).unwrap();
        assert!(c.matches("True"));
        assert!(!c.matches("true"));
        assert!(Constraint::parse("connected", "!=", false).unwrap().matches("True"));
    }

    #[test]
    fn test_describe_round_trips() {
        let query = NetworkQuery::new(
            ["Random", "random", "ER"],
            vec![
                Constraint::parse("N", "greaterthan", 250).unwrap(),
                Constraint::parse("kmean", "<=", 9.5).unwrap(),
            ],
        );
        assert_eq!(query.tags(), ["random", "er"]);
        assert_eq!(query.describe(), vec!["N > 250", "kmean <= 9.5"]);

        let specs: Vec<ConstraintSpec> = query.constraints().iter().map(|c| c.to_spec()).collect();
        let again = NetworkQuery::from_specs(query.tags(), specs).unwrap();
        assert_eq!(again, query);
    }

    #[test]
    fn test_spec_deserialization() {
        let spec: ConstraintSpec =
            serde_json::from_str(r#"{"key": "N", "operator": ">", "value": 250}"#).unwrap();
        let c = Constraint::try_from(spec).unwrap();
        assert_eq!(c.key(), "N");
        assert_eq!(c.operator(), Operator::GreaterThan);
        assert_eq!(c.value(), &MetadataValue::Integer(250));
    }

    #[test]
    fn test_narrow_intersects() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut selected = None;
        assert!(!narrow(&mut selected, HashSet::from([a, b])));
        assert!(!narrow(&mut selected, HashSet::from([b])));
        assert_eq!(selected, Some(HashSet::from([b])));
        assert!(narrow(&mut selected, HashSet::from([a])));
    }
}
