//! Enumeration types for constrained report values.

use serde::{Deserialize, Serialize};

use crate::filter_panel::FilterCategory;

/// Which report a view drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Profit & Loss / Balance Sheet with a collapsible line hierarchy.
    ProfitAndLoss,
    /// General Ledger with per-account move-line sub-sections.
    GeneralLedger,
}

impl ReportKind {
    /// Server model backing the report wizard.
    #[inline]
    #[must_use]
    pub const fn model(self) -> &'static str {
        match self {
            Self::ProfitAndLoss => "dynamic.balance.sheet.report",
            Self::GeneralLedger => "account.general.ledger",
        }
    }

    /// Client action tag the host registers the view under.
    #[inline]
    #[must_use]
    pub const fn action_tag(self) -> &'static str {
        match self {
            Self::ProfitAndLoss => "dfr_n",
            Self::GeneralLedger => "g_l",
        }
    }

    /// Server report used for PDF export.
    #[inline]
    #[must_use]
    pub const fn pdf_report(self) -> &'static str {
        match self {
            Self::ProfitAndLoss => "dynamic_accounts_report.balance_sheet",
            Self::GeneralLedger => "dynamic_accounts_report.general_ledger",
        }
    }

    /// Multi-select filter categories shown in this report's panel.
    #[inline]
    #[must_use]
    pub const fn categories(self) -> &'static [FilterCategory] {
        &FilterCategory::ALL
    }

    /// Whether the panel offers the debit/credit column toggle.
    #[inline]
    #[must_use]
    pub const fn has_debit_credit(self) -> bool {
        matches!(self, Self::ProfitAndLoss)
    }
}

/// Which journal entries a report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMove {
    /// Only posted entries.
    #[default]
    Posted,
    /// Draft and posted entries.
    All,
}

impl TargetMove {
    /// Wire value of the option.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::All => "all",
        }
    }

    /// Parses a widget or server value, ignoring ASCII case.
    #[inline]
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("posted") {
            Some(Self::Posted)
        } else if value.eq_ignore_ascii_case("all") {
            Some(Self::All)
        } else {
            None
        }
    }
}

/// Whether the debit and credit columns are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebitCredit {
    /// Show debit and credit next to the balance.
    #[default]
    Show,
    /// Show the balance only.
    Hide,
}

impl DebitCredit {
    /// Wire value of the option.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Hide => "hide",
        }
    }

    /// Parses a widget or server value, ignoring ASCII case.
    #[inline]
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("show") {
            Some(Self::Show)
        } else if value.eq_ignore_ascii_case("hide") {
            Some(Self::Hide)
        } else {
            None
        }
    }
}

/// Where the currency symbol goes relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyPosition {
    /// `$ 1,000.00`
    #[default]
    Before,
    /// `1.000,00 €`
    After,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_kind_models() {
        assert_eq!(ReportKind::ProfitAndLoss.model(), "dynamic.balance.sheet.report");
        assert_eq!(ReportKind::GeneralLedger.model(), "account.general.ledger");
        assert_eq!(ReportKind::GeneralLedger.action_tag(), "g_l");
    }

    #[test]
    fn only_profit_and_loss_has_debit_credit() {
        assert!(ReportKind::ProfitAndLoss.has_debit_credit());
        assert!(!ReportKind::GeneralLedger.has_debit_credit());
        assert_eq!(ReportKind::GeneralLedger.categories().len(), 6);
    }

    #[test]
    fn target_move_serde() {
        let json = serde_json::to_string(&TargetMove::Posted).unwrap();
        assert_eq!(json, r#""posted""#);
        let deserialized: TargetMove = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(deserialized, TargetMove::All);
    }

    #[test]
    fn target_move_from_value_ignores_case() {
        assert_eq!(TargetMove::from_value("Posted"), Some(TargetMove::Posted));
        assert_eq!(TargetMove::from_value("ALL"), Some(TargetMove::All));
        assert_eq!(TargetMove::from_value(""), None);
        assert_eq!(TargetMove::from_value("draft"), None);
    }

    #[test]
    fn debit_credit_from_value() {
        assert_eq!(DebitCredit::from_value("hide"), Some(DebitCredit::Hide));
        assert_eq!(DebitCredit::from_value("Show"), Some(DebitCredit::Show));
        assert_eq!(DebitCredit::from_value("both"), None);
        assert_eq!(DebitCredit::Hide.as_str(), "hide");
    }

    #[test]
    fn currency_position_serde() {
        let deserialized: CurrencyPosition = serde_json::from_str(r#""after""#).unwrap();
        assert_eq!(deserialized, CurrencyPosition::After);
    }
}
