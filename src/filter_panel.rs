//! Filter panel widget state and its conversion into a wizard write.
//!
//! The panel mirrors what a user sees: one multi-select per filter
//! category, two date inputs, and single-choice inputs for the posting
//! status and (Profit & Loss only) the debit/credit columns. Each control
//! has a summary label that [`FilterPanel::collect`] refreshes while
//! building the [`FilterSelection`] sent to the wizard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    DebitCredit, FilterEcho, FilterKey, FilterSelection, FilterValue, NaiveDate, ReportKind,
    TargetMove,
};

/// Date format accepted by the date inputs.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Summary element of the posting-status control.
pub const TARGET_MOVE_SUMMARY: &str = "post_res";

/// Summary element of the debit/credit control.
pub const DEBIT_CREDIT_SUMMARY: &str = "debit_credit_res";

/// A multi-select filter category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    /// Ledger accounts.
    Accounts,
    /// Journals.
    Journals,
    /// Account tags.
    AccountTags,
    /// Analytic accounts.
    AnalyticAccounts,
    /// Analytic tags.
    AnalyticTags,
    /// Operating units.
    OperatingUnits,
}

impl FilterCategory {
    /// Every category, in panel order.
    pub const ALL: [Self; 6] = [
        Self::Accounts,
        Self::Journals,
        Self::AccountTags,
        Self::AnalyticAccounts,
        Self::AnalyticTags,
        Self::OperatingUnits,
    ];

    /// Wizard field the selected ids are written to.
    #[inline]
    #[must_use]
    pub const fn key(self) -> FilterKey {
        match self {
            Self::Accounts => FilterKey::AccountIds,
            Self::Journals => FilterKey::JournalIds,
            Self::AccountTags => FilterKey::AccountTagIds,
            Self::AnalyticAccounts => FilterKey::AnalyticIds,
            Self::AnalyticTags => FilterKey::AnalyticTagIds,
            Self::OperatingUnits => FilterKey::OperatingUnitIds,
        }
    }

    /// Element that shows the committed labels of this category.
    #[inline]
    #[must_use]
    pub const fn summary_id(self) -> &'static str {
        match self {
            Self::Accounts => "acc_res",
            Self::Journals => "journal_res",
            Self::AccountTags => "acc_tag_res",
            Self::AnalyticAccounts => "analytic_res",
            Self::AnalyticTags => "analic_tag_res",
            Self::OperatingUnits => "operating_unit_res",
        }
    }

    /// Caption shown above the control.
    #[inline]
    #[must_use]
    pub const fn caption(self) -> &'static str {
        match self {
            Self::Accounts => "Accounts",
            Self::Journals => "Journals",
            Self::AccountTags => "Account Tags",
            Self::AnalyticAccounts => "Analytic Accounts",
            Self::AnalyticTags => "Analytic Tags",
            Self::OperatingUnits => "Operating Units",
        }
    }
}

/// One entry of a multi-select.
///
/// The id is kept as the raw widget string; it is parsed when the panel
/// is collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option value (a record id as text).
    pub id: String,
    /// Visible label.
    pub text: String,
    /// Whether the option is currently selected.
    pub selected: bool,
}

impl SelectOption {
    /// Creates an unselected option.
    #[inline]
    #[must_use]
    pub fn new<I: Into<String>, T: Into<String>>(id: I, text: T) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            selected: false,
        }
    }
}

/// A multi-select widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSelect {
    /// Options in display order. Duplicates are allowed.
    pub options: Vec<SelectOption>,
}

impl MultiSelect {
    /// Creates a widget offering `options`.
    #[inline]
    #[must_use]
    pub const fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }

    /// Selects every option whose id is `id`. Returns `false` if none
    /// matched.
    #[inline]
    pub fn select(&mut self, id: &str) -> bool {
        self.set_selected(id, true)
    }

    /// Deselects every option whose id is `id`. Returns `false` if none
    /// matched.
    #[inline]
    pub fn deselect(&mut self, id: &str) -> bool {
        self.set_selected(id, false)
    }

    /// Deselects all options.
    #[inline]
    pub fn clear(&mut self) {
        for option in &mut self.options {
            option.selected = false;
        }
    }

    /// Iterates over the selected options in display order.
    #[inline]
    pub fn selected(&self) -> impl Iterator<Item = &SelectOption> {
        self.options.iter().filter(|option| option.selected)
    }

    /// Flips the selection flag of matching options.
    fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        let mut found = false;
        for option in self.options.iter_mut().filter(|option| option.id == id) {
            option.selected = selected;
            found = true;
        }
        found
    }
}

/// A date input; blank means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInput {
    /// Raw input text, expected as `YYYY-MM-DD`.
    pub value: String,
}

/// A single-choice input holding the explicitly selected value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceInput {
    /// Selected value; empty when the user picked nothing.
    pub value: String,
}

/// State of the whole filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPanel {
    /// Report the panel belongs to.
    kind: ReportKind,
    /// Multi-select per category.
    selects: BTreeMap<FilterCategory, MultiSelect>,
    /// Summary label per summary element id.
    summaries: BTreeMap<&'static str, String>,
    /// Start of the date range.
    date_from: DateInput,
    /// End of the date range.
    date_to: DateInput,
    /// Posting status.
    target_move: ChoiceInput,
    /// Debit/credit visibility, present for Profit & Loss only.
    debit_credit: Option<ChoiceInput>,
    /// Posting status the wizard holds after the last collect.
    committed_target_move: Option<TargetMove>,
    /// Debit/credit visibility the wizard holds after the last collect.
    committed_debit_credit: Option<DebitCredit>,
    /// Company name shown in the header.
    company_name: Option<String>,
}

impl FilterPanel {
    /// Creates an empty panel for `kind`: no options, nothing selected.
    #[inline]
    #[must_use]
    pub fn new(kind: ReportKind) -> Self {
        let selects = kind
            .categories()
            .iter()
            .map(|&category| (category, MultiSelect::default()))
            .collect();
        Self {
            kind,
            selects,
            summaries: BTreeMap::new(),
            date_from: DateInput::default(),
            date_to: DateInput::default(),
            target_move: ChoiceInput::default(),
            debit_credit: kind.has_debit_credit().then(ChoiceInput::default),
            committed_target_move: None,
            committed_debit_credit: None,
            company_name: None,
        }
    }

    /// Builds the panel shown on first render from the wizard's echo:
    /// option lists come from the server, summaries from its labels.
    #[inline]
    #[must_use]
    pub fn from_echo(kind: ReportKind, echo: &FilterEcho) -> Self {
        let mut panel = Self::new(kind);
        for &category in kind.categories() {
            let options = echo
                .options(category)
                .iter()
                .map(|option| SelectOption::new(option.id.to_string(), option.label()))
                .collect();
            let _previous = panel.selects.insert(category, MultiSelect::new(options));
            let labels = echo.labels(category);
            if !labels.is_empty() {
                panel.set_summary(category.summary_id(), labels.join(","));
            }
        }
        if let Some(target_move) = echo.target_move.as_deref() {
            panel.set_summary(TARGET_MOVE_SUMMARY, target_move.to_owned());
            panel.committed_target_move = TargetMove::from_value(target_move);
        }
        if kind.has_debit_credit() {
            if let Some(debit_credit) = echo.debit_credit.as_deref() {
                panel.set_summary(DEBIT_CREDIT_SUMMARY, debit_credit.to_owned());
                panel.committed_debit_credit = DebitCredit::from_value(debit_credit);
            }
        }
        panel.company_name.clone_from(&echo.company_name);
        panel
    }

    /// Report the panel belongs to.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Company name from the echo, if any.
    #[inline]
    #[must_use]
    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    /// Widget of `category`, if the report offers it.
    #[inline]
    #[must_use]
    pub fn multi_select(&self, category: FilterCategory) -> Option<&MultiSelect> {
        self.selects.get(&category)
    }

    /// Mutable widget of `category`, if the report offers it.
    #[inline]
    pub fn multi_select_mut(&mut self, category: FilterCategory) -> Option<&mut MultiSelect> {
        self.selects.get_mut(&category)
    }

    /// Selects option `id` of `category`. Returns `false` if the
    /// category or option does not exist.
    #[inline]
    pub fn select(&mut self, category: FilterCategory, id: &str) -> bool {
        self.selects
            .get_mut(&category)
            .is_some_and(|widget| widget.select(id))
    }

    /// Sets the raw start date.
    #[inline]
    pub fn set_date_from<S: Into<String>>(&mut self, value: S) {
        self.date_from.value = value.into();
    }

    /// Sets the raw end date.
    #[inline]
    pub fn set_date_to<S: Into<String>>(&mut self, value: S) {
        self.date_to.value = value.into();
    }

    /// Sets the selected posting status value.
    #[inline]
    pub fn set_target_move<S: Into<String>>(&mut self, value: S) {
        self.target_move.value = value.into();
    }

    /// Sets the selected debit/credit value. Ignored for reports
    /// without the control.
    #[inline]
    pub fn set_debit_credit<S: Into<String>>(&mut self, value: S) {
        if let Some(ref mut input) = self.debit_credit {
            input.value = value.into();
        }
    }

    /// Raw start date.
    #[inline]
    #[must_use]
    pub fn date_from(&self) -> &str {
        &self.date_from.value
    }

    /// Raw end date.
    #[inline]
    #[must_use]
    pub fn date_to(&self) -> &str {
        &self.date_to.value
    }

    /// Selected posting status value.
    #[inline]
    #[must_use]
    pub fn target_move(&self) -> &str {
        &self.target_move.value
    }

    /// Selected debit/credit value, when the report has the control.
    #[inline]
    #[must_use]
    pub fn debit_credit(&self) -> Option<&str> {
        self.debit_credit.as_ref().map(|input| input.value.as_str())
    }

    /// Summary label of element `id`; empty when cleared.
    #[inline]
    #[must_use]
    pub fn summary(&self, id: &str) -> &str {
        self.summaries.get(id).map_or("", String::as_str)
    }

    /// Reads the widget state into a selection and refreshes every
    /// summary label in the same pass.
    ///
    /// Only constrained keys are present in the result: empty
    /// categories, blank dates and unset choices are left out so the
    /// server default applies. A choice cleared after a non-default
    /// value was committed writes the default explicitly, since the
    /// wizard keeps its last value.
    #[inline]
    #[tracing::instrument(skip_all, fields(kind = ?self.kind))]
    pub fn collect(&mut self) -> FilterSelection {
        let mut selection = FilterSelection::new();
        for &category in self.kind.categories() {
            self.collect_category(category, &mut selection);
        }
        collect_date(FilterKey::DateFrom, &self.date_from, &mut selection);
        collect_date(FilterKey::DateTo, &self.date_to, &mut selection);
        self.collect_target_move(&mut selection);
        self.collect_debit_credit(&mut selection);
        tracing::debug!(keys = selection.len(), "collected filter selection");
        selection
    }

    /// Collects one multi-select category.
    ///
    /// Every selected element contributes its id, so duplicated options
    /// yield duplicated ids; only the summary labels are de-duplicated.
    fn collect_category(&mut self, category: FilterCategory, selection: &mut FilterSelection) {
        let mut ids = Vec::new();
        let mut labels: Vec<&str> = Vec::new();
        if let Some(widget) = self.selects.get(&category) {
            for option in widget.selected() {
                match option.id.trim().parse::<i64>() {
                    Ok(id) => ids.push(id),
                    Err(err) => {
                        tracing::warn!(
                            category = ?category,
                            id = %option.id,
                            error = %err,
                            "skipping option with a non-numeric id"
                        );
                        continue;
                    }
                }
                if !labels.contains(&option.text.as_str()) {
                    labels.push(&option.text);
                }
            }
        }
        let summary = labels.join(",");
        self.set_summary(category.summary_id(), summary);
        if ids.is_empty() {
            selection.clear(category.key());
        } else {
            selection.set(category.key(), FilterValue::Ids(ids));
        }
    }

    /// Collects the posting status from its explicit value.
    fn collect_target_move(&mut self, selection: &mut FilterSelection) {
        let raw = self.target_move.value.trim().to_owned();
        let chosen = if raw.is_empty() {
            let fallback = TargetMove::default();
            self.set_summary(TARGET_MOVE_SUMMARY, fallback.as_str().to_owned());
            match self.committed_target_move {
                Some(committed) if committed != fallback => Some(fallback),
                _ => return,
            }
        } else {
            TargetMove::from_value(&raw)
        };
        match chosen {
            Some(target_move) => {
                self.set_summary(TARGET_MOVE_SUMMARY, target_move.as_str().to_owned());
                self.committed_target_move = Some(target_move);
                selection.set(FilterKey::TargetMove, FilterValue::TargetMove(target_move));
            }
            None => tracing::warn!(value = %raw, "ignoring unknown target move"),
        }
    }

    /// Collects the debit/credit visibility, when the report has it.
    fn collect_debit_credit(&mut self, selection: &mut FilterSelection) {
        let Some(raw) = self
            .debit_credit
            .as_ref()
            .map(|input| input.value.trim().to_owned())
        else {
            return;
        };
        let chosen = if raw.is_empty() {
            let fallback = DebitCredit::default();
            self.set_summary(DEBIT_CREDIT_SUMMARY, fallback.as_str().to_owned());
            match self.committed_debit_credit {
                Some(committed) if committed != fallback => Some(fallback),
                _ => return,
            }
        } else {
            DebitCredit::from_value(&raw)
        };
        match chosen {
            Some(debit_credit) => {
                self.set_summary(DEBIT_CREDIT_SUMMARY, debit_credit.as_str().to_owned());
                self.committed_debit_credit = Some(debit_credit);
                selection.set(FilterKey::DebitCredit, FilterValue::DebitCredit(debit_credit));
            }
            None => tracing::warn!(value = %raw, "ignoring unknown debit/credit value"),
        }
    }

    /// Writes a summary label; an empty label clears it.
    fn set_summary(&mut self, id: &'static str, label: String) {
        if label.is_empty() {
            let _previous = self.summaries.remove(id);
        } else {
            let _previous = self.summaries.insert(id, label);
        }
    }
}

/// Adds `key` when `input` holds a valid date.
fn collect_date(key: FilterKey, input: &DateInput, selection: &mut FilterSelection) {
    let raw = input.value.trim();
    if raw.is_empty() {
        selection.clear(key);
        return;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => selection.set(key, FilterValue::Date(date)),
        Err(err) => {
            tracing::warn!(key = key.as_str(), value = %raw, error = %err, "ignoring malformed date");
            selection.clear(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterOption;

    fn accounts_panel() -> FilterPanel {
        let echo = FilterEcho {
            accounts_list: vec![
                FilterOption {
                    id: 5,
                    name: "Cash".to_owned(),
                    code: None,
                },
                FilterOption {
                    id: 7,
                    name: "Bank".to_owned(),
                    code: None,
                },
            ],
            ..FilterEcho::default()
        };
        FilterPanel::from_echo(ReportKind::ProfitAndLoss, &echo)
    }

    #[test]
    fn untouched_panel_collects_nothing() {
        let mut panel = FilterPanel::new(ReportKind::ProfitAndLoss);
        let selection = panel.collect();
        assert!(selection.is_empty());
        assert_eq!(panel.summary("acc_res"), "");
        assert_eq!(panel.summary(TARGET_MOVE_SUMMARY), "posted");
        assert_eq!(panel.summary(DEBIT_CREDIT_SUMMARY), "show");
    }

    #[test]
    fn empty_category_clears_summary_and_omits_key() {
        let mut panel = accounts_panel();
        assert!(panel.select(FilterCategory::Accounts, "5"));
        let _first = panel.collect();
        assert_eq!(panel.summary("acc_res"), "Cash");

        panel
            .multi_select_mut(FilterCategory::Accounts)
            .unwrap()
            .clear();
        let selection = panel.collect();
        assert!(!selection.contains(FilterKey::AccountIds));
        assert_eq!(panel.summary("acc_res"), "");
    }

    #[test]
    fn every_emptied_category_clears_its_summary() {
        let mut panel = FilterPanel::new(ReportKind::ProfitAndLoss);
        for category in FilterCategory::ALL {
            let widget = panel.multi_select_mut(category).unwrap();
            widget.options = vec![SelectOption::new("1", "One")];
            assert!(widget.select("1"));
        }
        let _first = panel.collect();
        for category in FilterCategory::ALL {
            assert_eq!(panel.summary(category.summary_id()), "One");
            panel.multi_select_mut(category).unwrap().clear();
        }

        let selection = panel.collect();
        for category in FilterCategory::ALL {
            assert!(!selection.contains(category.key()), "{category:?}");
            assert_eq!(panel.summary(category.summary_id()), "", "{category:?}");
        }
    }

    #[test]
    fn clearing_committed_choices_writes_defaults() {
        let mut panel = FilterPanel::new(ReportKind::ProfitAndLoss);
        panel.set_target_move("all");
        panel.set_debit_credit("hide");
        let first = panel.collect();
        assert_eq!(
            first.get(FilterKey::TargetMove),
            Some(&FilterValue::TargetMove(TargetMove::All))
        );

        panel.set_target_move("");
        panel.set_debit_credit("");
        let cleared = panel.collect();
        assert_eq!(
            cleared.get(FilterKey::TargetMove),
            Some(&FilterValue::TargetMove(TargetMove::Posted))
        );
        assert_eq!(
            cleared.get(FilterKey::DebitCredit),
            Some(&FilterValue::DebitCredit(DebitCredit::Show))
        );
        assert_eq!(panel.summary(TARGET_MOVE_SUMMARY), "posted");

        let again = panel.collect();
        assert!(again.is_empty());
    }

    #[test]
    fn default_echo_choices_are_not_rewritten() {
        let echo = FilterEcho {
            target_move: Some("Posted".to_owned()),
            debit_credit: Some("Show".to_owned()),
            ..FilterEcho::default()
        };
        let mut panel = FilterPanel::from_echo(ReportKind::ProfitAndLoss, &echo);
        assert!(panel.collect().is_empty());

        let hidden = FilterEcho {
            debit_credit: Some("Hide".to_owned()),
            ..FilterEcho::default()
        };
        let mut panel = FilterPanel::from_echo(ReportKind::ProfitAndLoss, &hidden);
        let selection = panel.collect();
        assert_eq!(
            selection.get(FilterKey::DebitCredit),
            Some(&FilterValue::DebitCredit(DebitCredit::Show))
        );
    }

    #[test]
    fn duplicate_options_keep_ids_and_dedupe_labels() {
        let mut panel = FilterPanel::new(ReportKind::GeneralLedger);
        let widget = panel.multi_select_mut(FilterCategory::Journals).unwrap();
        widget.options = vec![
            SelectOption::new("1", "A"),
            SelectOption::new("2", "B"),
            SelectOption::new("1", "A"),
        ];
        for option in &mut widget.options {
            option.selected = true;
        }
        let selection = panel.collect();
        assert_eq!(panel.summary("journal_res"), "A,B");
        assert_eq!(selection.ids(FilterKey::JournalIds), Some(&[1_i64, 2, 1][..]));
    }

    #[test]
    fn selected_accounts_only() {
        let mut panel = accounts_panel();
        assert!(panel.select(FilterCategory::Accounts, "5"));
        assert!(panel.select(FilterCategory::Accounts, "7"));
        let selection = panel.collect();
        assert_eq!(
            selection.to_values().unwrap(),
            serde_json::json!({"account_ids": [5, 7]})
        );
        assert_eq!(panel.summary("acc_res"), "Cash,Bank");
    }

    #[test]
    fn non_numeric_ids_are_skipped() {
        let mut panel = FilterPanel::new(ReportKind::GeneralLedger);
        let widget = panel.multi_select_mut(FilterCategory::AnalyticTags).unwrap();
        widget.options = vec![SelectOption::new("x", "Broken"), SelectOption::new("4", "Ok")];
        assert!(widget.select("x"));
        assert!(widget.select("4"));
        let selection = panel.collect();
        assert_eq!(selection.ids(FilterKey::AnalyticTagIds), Some(&[4_i64][..]));
        assert_eq!(panel.summary("analic_tag_res"), "Ok");
    }

    #[test]
    fn dates_only_when_present_and_valid() {
        let mut panel = FilterPanel::new(ReportKind::GeneralLedger);
        panel.set_date_from("2024-01-01");
        panel.set_date_to("   ");
        let selection = panel.collect();
        assert_eq!(
            selection.get(FilterKey::DateFrom),
            Some(&FilterValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
        assert!(!selection.contains(FilterKey::DateTo));

        panel.set_date_from("31/12/2024");
        let selection = panel.collect();
        assert!(!selection.contains(FilterKey::DateFrom));
    }

    #[test]
    fn explicit_enum_values_are_sent() {
        let mut panel = FilterPanel::new(ReportKind::ProfitAndLoss);
        panel.set_target_move("All");
        panel.set_debit_credit("hide");
        let selection = panel.collect();
        assert_eq!(
            selection.get(FilterKey::TargetMove),
            Some(&FilterValue::TargetMove(TargetMove::All))
        );
        assert_eq!(
            selection.get(FilterKey::DebitCredit),
            Some(&FilterValue::DebitCredit(DebitCredit::Hide))
        );
        assert_eq!(panel.summary(TARGET_MOVE_SUMMARY), "all");
        assert_eq!(panel.summary(DEBIT_CREDIT_SUMMARY), "hide");
    }

    #[test]
    fn unknown_enum_value_is_ignored() {
        let mut panel = FilterPanel::new(ReportKind::ProfitAndLoss);
        panel.set_target_move("draft");
        let selection = panel.collect();
        assert!(!selection.contains(FilterKey::TargetMove));
    }

    #[test]
    fn ledger_has_no_debit_credit_control() {
        let mut panel = FilterPanel::new(ReportKind::GeneralLedger);
        panel.set_debit_credit("hide");
        assert_eq!(panel.debit_credit(), None);
        let selection = panel.collect();
        assert!(!selection.contains(FilterKey::DebitCredit));
        assert_eq!(panel.summary(DEBIT_CREDIT_SUMMARY), "");
    }

    #[test]
    fn from_echo_uses_codes_and_labels() {
        let echo = FilterEcho {
            journals: vec!["All".to_owned()],
            journals_list: vec![FilterOption {
                id: 1,
                name: "Customer Invoices".to_owned(),
                code: Some("INV".to_owned()),
            }],
            target_move: Some("Posted".to_owned()),
            company_name: Some("YourCompany".to_owned()),
            ..FilterEcho::default()
        };
        let panel = FilterPanel::from_echo(ReportKind::GeneralLedger, &echo);
        let journals = panel.multi_select(FilterCategory::Journals).unwrap();
        assert_eq!(journals.options, vec![SelectOption::new("1", "INV")]);
        assert_eq!(panel.summary("journal_res"), "All");
        assert_eq!(panel.summary(TARGET_MOVE_SUMMARY), "Posted");
        assert_eq!(panel.company_name(), Some("YourCompany"));
    }

    #[test]
    fn category_keys_are_distinct() {
        let keys: std::collections::BTreeSet<_> =
            FilterCategory::ALL.iter().map(|category| category.key()).collect();
        assert_eq!(keys.len(), FilterCategory::ALL.len());
    }
}
