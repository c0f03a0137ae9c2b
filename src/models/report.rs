//! Report payload returned by a wizard's `view_report` call.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{AccountId, CurrencyPosition, MoveId, ReportLineId};
use crate::filter_panel::FilterCategory;

/// Deserializes an optional field the server may encode as `null`,
/// `false` or an empty string.
fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(ref text) if text.is_empty() => Ok(None),
        other => T::deserialize(other).map(Some).map_err(D::Error::custom),
    }
}

/// Deserializes a label list, mapping `false`/`null` entries to `""`.
fn labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|value| match value {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => String::new(),
        })
        .collect())
}

/// Deserializes a value, falling back to its default when the server
/// sends a shape this client does not understand.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "unrecognized value, using default");
        T::default()
    }))
}

/// Full report data for one render cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Report title.
    #[serde(default)]
    pub name: String,
    /// Echo of the wizard's stored filters with display labels.
    #[serde(default)]
    pub filters: FilterEcho,
    /// Per-account lines (ledger rows, or the accounts behind the
    /// balance sheet).
    #[serde(default)]
    pub report_lines: Vec<LedgerLine>,
    /// Hierarchical balance-sheet lines (empty for the ledger).
    #[serde(default)]
    pub bs_lines: Vec<BalanceSheetLine>,
    /// Sum of credits over all accounts.
    #[serde(default)]
    pub credit_total: f64,
    /// Sum of debits over all accounts.
    #[serde(default)]
    pub debit_total: f64,
    /// Debit total minus credit total.
    #[serde(default)]
    pub debit_balance: f64,
    /// Display currency.
    #[serde(default, deserialize_with = "or_default")]
    pub currency: Currency,
}

impl ReportPayload {
    /// Finds the top-level ledger line for `account`.
    #[inline]
    #[must_use]
    pub fn ledger_line(&self, account: AccountId) -> Option<&LedgerLine> {
        self.report_lines.iter().find(|line| line.id == account)
    }
}

/// Display currency: symbol, its position and the number locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CurrencyRepr")]
pub struct Currency {
    /// Currency symbol, e.g. `$`.
    pub symbol: String,
    /// Symbol placement.
    pub position: CurrencyPosition,
    /// BCP 47 locale used for digit grouping, e.g. `en-US`.
    pub locale: String,
}

impl Currency {
    /// Formats `amount` in this currency, e.g. `$ 1,000.00`.
    #[inline]
    #[must_use]
    pub fn display(&self, amount: f64) -> String {
        crate::money::format_money(amount, self)
    }
}

impl Default for Currency {
    #[inline]
    fn default() -> Self {
        Self {
            symbol: "$".to_owned(),
            position: CurrencyPosition::Before,
            locale: "en-US".to_owned(),
        }
    }
}

/// Accepted encodings of [`Currency`].
#[derive(Deserialize)]
#[serde(untagged)]
enum CurrencyRepr {
    /// `[symbol, position, locale]` as sent by the wizard.
    Triple(String, CurrencyPosition, String),
    /// Named fields.
    Fields {
        /// Currency symbol.
        symbol: String,
        /// Symbol placement.
        #[serde(default)]
        position: CurrencyPosition,
        /// Number locale.
        #[serde(default = "default_locale")]
        locale: String,
    },
}

/// Locale assumed when the server omits one.
fn default_locale() -> String {
    "en-US".to_owned()
}

impl From<CurrencyRepr> for Currency {
    #[inline]
    fn from(repr: CurrencyRepr) -> Self {
        match repr {
            CurrencyRepr::Triple(symbol, position, locale)
            | CurrencyRepr::Fields {
                symbol,
                position,
                locale,
            } => Self {
                symbol,
                position,
                locale,
            },
        }
    }
}

/// Echo of the wizard's filters, as shown in the filter panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEcho {
    /// Selected journal codes, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub journals: Vec<String>,
    /// Selected account codes, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub accounts: Vec<String>,
    /// Selected account tag names, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub account_tags: Vec<String>,
    /// Selected analytic account names, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub analytics: Vec<String>,
    /// Selected analytic tag names, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub analytic_tags: Vec<String>,
    /// Selected operating unit codes, or `["All"]`.
    #[serde(default, deserialize_with = "labels")]
    pub operating_units: Vec<String>,
    /// Posting status label (`Posted` / `All`).
    #[serde(default, deserialize_with = "optional")]
    pub target_move: Option<String>,
    /// Debit/credit visibility, when the report has it.
    #[serde(default, deserialize_with = "optional")]
    pub debit_credit: Option<String>,
    /// Start of the date range.
    #[serde(default, deserialize_with = "optional")]
    pub date_from: Option<String>,
    /// End of the date range.
    #[serde(default, deserialize_with = "optional")]
    pub date_to: Option<String>,
    /// Company the report runs for.
    #[serde(default, deserialize_with = "optional")]
    pub company_name: Option<String>,
    /// Selectable accounts.
    #[serde(default)]
    pub accounts_list: Vec<FilterOption>,
    /// Selectable journals.
    #[serde(default)]
    pub journals_list: Vec<FilterOption>,
    /// Selectable account tags.
    #[serde(default)]
    pub account_tag_list: Vec<FilterOption>,
    /// Selectable analytic accounts.
    #[serde(default)]
    pub analytic_list: Vec<FilterOption>,
    /// Selectable analytic tags.
    #[serde(default)]
    pub analytic_tag_list: Vec<FilterOption>,
    /// Selectable operating units.
    #[serde(default)]
    pub operating_unit_list: Vec<FilterOption>,
}

impl FilterEcho {
    /// Options offered for `category`.
    #[inline]
    #[must_use]
    pub fn options(&self, category: FilterCategory) -> &[FilterOption] {
        match category {
            FilterCategory::Accounts => &self.accounts_list,
            FilterCategory::Journals => &self.journals_list,
            FilterCategory::AccountTags => &self.account_tag_list,
            FilterCategory::AnalyticAccounts => &self.analytic_list,
            FilterCategory::AnalyticTags => &self.analytic_tag_list,
            FilterCategory::OperatingUnits => &self.operating_unit_list,
        }
    }

    /// Labels of the committed selection for `category`.
    #[inline]
    #[must_use]
    pub fn labels(&self, category: FilterCategory) -> &[String] {
        match category {
            FilterCategory::Accounts => &self.accounts,
            FilterCategory::Journals => &self.journals,
            FilterCategory::AccountTags => &self.account_tags,
            FilterCategory::AnalyticAccounts => &self.analytics,
            FilterCategory::AnalyticTags => &self.analytic_tags,
            FilterCategory::OperatingUnits => &self.operating_units,
        }
    }
}

/// One selectable option, sent by the server as `[id, name, code?]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct FilterOption {
    /// Record id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Short code (journals, operating units).
    pub code: Option<String>,
}

impl FilterOption {
    /// Label shown in the widget: the code when present, else the name.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.name)
    }
}

impl TryFrom<Vec<Value>> for FilterOption {
    type Error = String;

    #[inline]
    fn try_from(items: Vec<Value>) -> Result<Self, Self::Error> {
        let mut items = items.into_iter();
        let id = items
            .next()
            .and_then(|value| value.as_i64())
            .ok_or_else(|| "filter option without a numeric id".to_owned())?;
        let name = match items.next() {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        let code = match items.next() {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        };
        Ok(Self { id, name, code })
    }
}

impl From<FilterOption> for Vec<Value> {
    #[inline]
    fn from(option: FilterOption) -> Self {
        let mut items = vec![Value::from(option.id), Value::from(option.name)];
        if let Some(code) = option.code {
            items.push(Value::from(code));
        }
        items
    }
}

/// One account row of a ledger report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// Account id.
    pub id: AccountId,
    /// Account code.
    #[serde(default)]
    pub code: String,
    /// Account name.
    #[serde(default)]
    pub name: String,
    /// Total debit.
    #[serde(default)]
    pub debit: f64,
    /// Total credit.
    #[serde(default)]
    pub credit: f64,
    /// Closing balance.
    #[serde(default)]
    pub balance: f64,
    /// Journal items behind the row, starting with the initial balance.
    #[serde(default)]
    pub move_lines: Vec<MoveLine>,
}

/// One journal item under a ledger account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    /// Journal item id (`0` for the initial-balance row).
    #[serde(default, deserialize_with = "optional")]
    pub lid: Option<i64>,
    /// Journal entry the item belongs to.
    #[serde(default, deserialize_with = "optional")]
    pub move_id: Option<MoveId>,
    /// Accounting date.
    #[serde(default, deserialize_with = "optional")]
    pub ldate: Option<String>,
    /// Journal code.
    #[serde(default, deserialize_with = "optional")]
    pub lcode: Option<String>,
    /// Reference.
    #[serde(default, deserialize_with = "optional")]
    pub lref: Option<String>,
    /// Label.
    #[serde(default, deserialize_with = "optional")]
    pub lname: Option<String>,
    /// Debit amount.
    #[serde(default)]
    pub debit: f64,
    /// Credit amount.
    #[serde(default)]
    pub credit: f64,
    /// Running balance.
    #[serde(default)]
    pub balance: f64,
    /// Journal entry name.
    #[serde(default, deserialize_with = "optional")]
    pub move_name: Option<String>,
    /// Currency symbol of the item.
    #[serde(default, deserialize_with = "optional")]
    pub currency_code: Option<String>,
    /// Partner name.
    #[serde(default, deserialize_with = "optional")]
    pub partner_name: Option<String>,
}

/// One row of the balance-sheet hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetLine {
    /// Row id.
    pub r_id: ReportLineId,
    /// Parent row id (`None` for roots).
    #[serde(default, deserialize_with = "optional")]
    pub p_id: Option<ReportLineId>,
    /// Child report ids.
    #[serde(default)]
    pub c_ids: Vec<ReportLineId>,
    /// Row label.
    #[serde(default)]
    pub name: String,
    /// Account code, for account rows.
    #[serde(default, deserialize_with = "optional")]
    pub code: Option<String>,
    /// Depth in the hierarchy, starting at 1.
    #[serde(default)]
    pub level: u32,
    /// Server row kind (`account_report`, `accounts`, `account_type`).
    #[serde(default)]
    pub report_type: String,
    /// Debit amount.
    #[serde(default)]
    pub debit: f64,
    /// Credit amount.
    #[serde(default)]
    pub credit: f64,
    /// Balance.
    #[serde(default)]
    pub balance: f64,
    /// Server-formatted debit.
    #[serde(default, deserialize_with = "optional")]
    pub m_debit: Option<String>,
    /// Server-formatted credit.
    #[serde(default, deserialize_with = "optional")]
    pub m_credit: Option<String>,
    /// Server-formatted balance.
    #[serde(default, deserialize_with = "optional")]
    pub m_balance: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_ledger_payload() {
        let json = r#"{
            "name": "General Ledger",
            "type": "ir.actions.client",
            "tag": "g_l",
            "filters": {
                "journals": ["All"],
                "accounts": ["101000", false],
                "target_move": "Posted",
                "date_from": false,
                "date_to": "2024-12-31",
                "company_name": "YourCompany",
                "journals_list": [[1, "Customer Invoices", "INV"], [2, "Bank", false]],
                "accounts_list": [[5, "Cash"], [7, "Bank"]]
            },
            "report_lines": [{
                "id": 5,
                "code": "101000",
                "name": "Cash",
                "debit": 1234.99,
                "credit": 0.0,
                "balance": 1234.99,
                "move_lines": [
                    {"lid": 0, "ldate": "", "lcode": "", "lname": "Initial Balance",
                     "debit": 10.0, "credit": 0.0, "balance": 10.0, "mmove_id": ""},
                    {"lid": 31, "move_id": 12, "ldate": "2024-03-01", "lcode": "BNK",
                     "lref": null, "lname": "Payment", "debit": 1224.99, "credit": 0.0,
                     "balance": 1234.99, "move_name": "BNK/2024/0001",
                     "currency_code": "$", "partner_name": "Azure Interior"}
                ]
            }],
            "debit_total": 1234.99,
            "credit_total": 0.0,
            "debit_balance": 1234.99,
            "currency": ["$", "before", "en-US"]
        }"#;
        let payload: ReportPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.name, "General Ledger");
        assert_eq!(payload.filters.accounts, vec!["101000".to_owned(), String::new()]);
        assert_eq!(payload.filters.date_from, None);
        assert_eq!(payload.filters.date_to.as_deref(), Some("2024-12-31"));
        assert_eq!(payload.filters.journals_list.len(), 2);
        assert_eq!(payload.filters.journals_list[0].label(), "INV");
        assert_eq!(payload.filters.journals_list[1].label(), "Bank");
        assert_eq!(payload.currency, Currency::default());

        let line = payload.ledger_line(AccountId::new(5)).unwrap();
        assert_eq!(line.move_lines.len(), 2);
        assert_eq!(line.move_lines[0].move_id, None);
        assert_eq!(line.move_lines[0].ldate, None);
        assert_eq!(line.move_lines[1].move_id, Some(MoveId::new(12)));
        assert_eq!(line.move_lines[1].lref, None);
        assert!(payload.ledger_line(AccountId::new(6)).is_none());
    }

    #[test]
    fn deserialize_balance_sheet_lines() {
        let json = r#"{
            "bs_lines": [
                {"r_id": 1, "p_id": false, "c_ids": [2], "name": "Balance Sheet",
                 "level": 1, "report_type": "account_report", "debit": 0, "credit": 0,
                 "balance": 0, "m_debit": "$ 0.00"},
                {"r_id": 2, "p_id": 1, "name": "Assets", "level": 2,
                 "report_type": "accounts", "code": "101000",
                 "debit": 5.5, "credit": 1.0, "balance": 4.5}
            ]
        }"#;
        let payload: ReportPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.bs_lines.len(), 2);
        assert_eq!(payload.bs_lines[0].p_id, None);
        assert_eq!(payload.bs_lines[0].c_ids, vec![ReportLineId::new(2)]);
        assert_eq!(payload.bs_lines[1].p_id, Some(ReportLineId::new(1)));
        assert_eq!(payload.bs_lines[1].code.as_deref(), Some("101000"));
        assert!(payload.report_lines.is_empty());
    }

    #[test]
    fn currency_from_object_and_unknown_shape() {
        let object: Currency =
            serde_json::from_str(r#"{"symbol": "€", "position": "after", "locale": "de-DE"}"#)
                .unwrap();
        assert_eq!(object.position, CurrencyPosition::After);
        assert_eq!(object.locale, "de-DE");

        let payload: ReportPayload = serde_json::from_str(r#"{"currency": 3}"#).unwrap();
        assert_eq!(payload.currency, Currency::default());
    }

    #[test]
    fn filter_option_roundtrip_keeps_array_shape() {
        let option: FilterOption = serde_json::from_str(r#"[3, "Operations", "OPS"]"#).unwrap();
        assert_eq!(option.code.as_deref(), Some("OPS"));
        let json = serde_json::to_string(&option).unwrap();
        assert_eq!(json, r#"[3,"Operations","OPS"]"#);
    }

    #[test]
    fn filter_option_requires_numeric_id() {
        let result = serde_json::from_str::<FilterOption>(r#"["x", "Cash"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn echo_maps_categories() {
        let echo = FilterEcho {
            analytics: vec!["Marketing".to_owned()],
            analytic_list: vec![FilterOption {
                id: 4,
                name: "Marketing".to_owned(),
                code: None,
            }],
            ..FilterEcho::default()
        };
        assert_eq!(echo.labels(FilterCategory::AnalyticAccounts), ["Marketing"]);
        assert_eq!(echo.options(FilterCategory::AnalyticAccounts)[0].id, 4);
        assert!(echo.options(FilterCategory::Journals).is_empty());
    }
}
