//! Filter selection written to a report wizard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DebitCredit, NaiveDate, TargetMove};

/// Name of a wizard filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    /// Ledger accounts.
    AccountIds,
    /// Journals.
    JournalIds,
    /// Account tags.
    AccountTagIds,
    /// Analytic accounts.
    AnalyticIds,
    /// Analytic tags.
    AnalyticTagIds,
    /// Operating units.
    OperatingUnitIds,
    /// Start of the date range (inclusive).
    DateFrom,
    /// End of the date range (inclusive).
    DateTo,
    /// Posted-only or all entries.
    TargetMove,
    /// Debit/credit column visibility.
    DebitCredit,
}

impl FilterKey {
    /// Field name on the wizard.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountIds => "account_ids",
            Self::JournalIds => "journal_ids",
            Self::AccountTagIds => "account_tag_ids",
            Self::AnalyticIds => "analytic_ids",
            Self::AnalyticTagIds => "analytic_tag_ids",
            Self::OperatingUnitIds => "operating_unit_ids",
            Self::DateFrom => "date_from",
            Self::DateTo => "date_to",
            Self::TargetMove => "target_move",
            Self::DebitCredit => "debit_credit",
        }
    }
}

/// Value of a single wizard filter field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Record ids of a many-to-many filter.
    Ids(Vec<i64>),
    /// A date bound.
    Date(NaiveDate),
    /// Posting status.
    TargetMove(TargetMove),
    /// Debit/credit visibility.
    DebitCredit(DebitCredit),
}

/// Mapping from filter name to value, written to the wizard as-is.
///
/// Keys absent from the selection fall back to the server default, so
/// a selection built from widget state only carries constrained keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection(BTreeMap<FilterKey, FilterValue>);

impl FilterSelection {
    /// Creates an empty selection (every filter at its server default).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    #[inline]
    pub fn set(&mut self, key: FilterKey, value: FilterValue) {
        let _previous = self.0.insert(key, value);
    }

    /// Removes `key`, restoring its server default.
    #[inline]
    pub fn clear(&mut self, key: FilterKey) {
        let _previous = self.0.remove(&key);
    }

    /// Returns the value for `key`, if constrained.
    #[inline]
    #[must_use]
    pub fn get(&self, key: FilterKey) -> Option<&FilterValue> {
        self.0.get(&key)
    }

    /// Returns the ids stored under `key`, if it holds an id list.
    #[inline]
    #[must_use]
    pub fn ids(&self, key: FilterKey) -> Option<&[i64]> {
        match self.0.get(&key) {
            Some(&FilterValue::Ids(ref ids)) => Some(ids),
            _ => None,
        }
    }

    /// Whether `key` is constrained.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: FilterKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Number of constrained keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no key is constrained.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over constrained keys in a stable order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &FilterValue)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }

    /// Converts the selection into the JSON object sent to `write`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ReportError::Serialization`] if a value
    /// cannot be encoded.
    #[inline]
    pub fn to_values(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_serializes_to_empty_object() {
        let selection = FilterSelection::new();
        assert_eq!(serde_json::to_string(&selection).unwrap(), "{}");
        assert!(selection.is_empty());
    }

    #[test]
    fn selection_serializes_flat_with_wire_names() {
        let mut selection = FilterSelection::new();
        selection.set(FilterKey::AccountIds, FilterValue::Ids(vec![5, 7]));
        selection.set(
            FilterKey::DateFrom,
            FilterValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        );
        selection.set(FilterKey::TargetMove, FilterValue::TargetMove(TargetMove::All));
        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "account_ids": [5, 7],
                "date_from": "2024-01-01",
                "target_move": "all",
            })
        );
    }

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let selection: FilterSelection = serde_json::from_str(
            r#"{"journal_ids":[1],"date_to":"2024-12-31","target_move":"posted","debit_credit":"hide"}"#,
        )
        .unwrap();
        assert_eq!(selection.ids(FilterKey::JournalIds), Some(&[1_i64][..]));
        assert_eq!(
            selection.get(FilterKey::DateTo),
            Some(&FilterValue::Date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()))
        );
        assert_eq!(
            selection.get(FilterKey::TargetMove),
            Some(&FilterValue::TargetMove(TargetMove::Posted))
        );
        assert_eq!(
            selection.get(FilterKey::DebitCredit),
            Some(&FilterValue::DebitCredit(DebitCredit::Hide))
        );
    }

    #[test]
    fn clear_removes_key() {
        let mut selection = FilterSelection::new();
        selection.set(FilterKey::JournalIds, FilterValue::Ids(vec![3]));
        assert!(selection.contains(FilterKey::JournalIds));
        selection.clear(FilterKey::JournalIds);
        assert!(!selection.contains(FilterKey::JournalIds));
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn key_names_match_serde() {
        for key in [
            FilterKey::AccountIds,
            FilterKey::OperatingUnitIds,
            FilterKey::DebitCredit,
        ] {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }
}
