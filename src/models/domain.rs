//! Search domains, call contexts and raw records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record returned by `search`, keyed by field name.
pub type Record = Map<String, Value>;

/// Call context passed alongside `create` (e.g. `account_id`,
/// `wizard_id` when a ledger is opened from another report).
pub type Context = Map<String, Value>;

/// One `(field, operator, value)` condition of a search domain.
///
/// Serializes as the three-element array the server expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTerm(String, String, Value);

impl DomainTerm {
    /// Creates a condition on `field`.
    #[inline]
    #[must_use]
    pub fn new<F, O, V>(field: F, operator: O, value: V) -> Self
    where
        F: Into<String>,
        O: Into<String>,
        V: Into<Value>,
    {
        Self(field.into(), operator.into(), value.into())
    }

    /// Field the condition applies to.
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.0
    }

    /// Comparison operator.
    #[inline]
    #[must_use]
    pub fn operator(&self) -> &str {
        &self.1
    }

    /// Right-hand value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.2
    }

    /// Evaluates the condition against a record.
    ///
    /// Supports `=`, `!=`, `in` and `not in`; any other operator
    /// matches nothing.
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let null = Value::Null;
        let actual = record.get(self.field()).unwrap_or(&null);
        match self.operator() {
            "=" => actual == self.value(),
            "!=" => actual != self.value(),
            "in" => self
                .value()
                .as_array()
                .is_some_and(|values| values.contains(actual)),
            "not in" => self
                .value()
                .as_array()
                .is_none_or(|values| !values.contains(actual)),
            other => {
                tracing::debug!(operator = %other, "unsupported domain operator");
                false
            }
        }
    }
}

/// A conjunction of [`DomainTerm`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    /// Creates an empty domain (matches every record).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    #[inline]
    #[must_use]
    pub fn and(mut self, term: DomainTerm) -> Self {
        self.0.push(term);
        self
    }

    /// Iterates over the conditions.
    #[inline]
    pub fn terms(&self) -> impl Iterator<Item = &DomainTerm> {
        self.0.iter()
    }

    /// Whether every condition holds for `record`.
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.0.iter().all(|term| term.matches(record))
    }
}
