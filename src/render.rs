//! Pure rendering of report data into template view models.
//!
//! Every function here depends only on a [`ReportPayload`] and, for the
//! balance sheet, the set of expanded line ids. Nothing reads back from
//! previously rendered output, so export filtering and re-rendering
//! after a toggle use the same visibility rule.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::filter_panel::{
    DEBIT_CREDIT_SUMMARY, FilterCategory, FilterPanel, SelectOption, TARGET_MOVE_SUMMARY,
};
use crate::models::{
    AccountId, BalanceSheetLine, Currency, DebitCredit, LedgerLine, MoveId, ReportKind,
    ReportLineId, ReportPayload,
};

/// Template of the filter panel.
pub const FILTER_PANEL_TEMPLATE: &str = "report.filter_panel";
/// Template of the balance-sheet table.
pub const BALANCE_SHEET_TEMPLATE: &str = "report.balance_sheet_table";
/// Template of the ledger table.
pub const LEDGER_TABLE_TEMPLATE: &str = "report.ledger_table";
/// Template of a ledger row's journal items.
pub const LEDGER_SUBSECTION_TEMPLATE: &str = "report.ledger_subsection";

/// Expand/collapse state of a line with children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    /// Children are shown.
    Expanded,
    /// Children are hidden.
    Collapsed,
}

impl Toggle {
    /// Caret icon class for the state.
    #[inline]
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Expanded => "fa-caret-down",
            Self::Collapsed => "fa-caret-right",
        }
    }
}

/// One row of the rendered balance sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSheetRow {
    /// Line id.
    pub id: ReportLineId,
    /// Parent line id.
    pub parent: Option<ReportLineId>,
    /// Label.
    pub name: String,
    /// Account code, for account rows.
    pub code: Option<String>,
    /// Depth, starting at 1.
    pub level: u32,
    /// Formatted debit.
    pub debit: String,
    /// Formatted credit.
    pub credit: String,
    /// Formatted balance.
    pub balance: String,
    /// Toggle for lines with children.
    pub toggle: Option<Toggle>,
    /// Whether every ancestor is expanded.
    pub visible: bool,
}

/// Rendered balance-sheet table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSheetTable {
    /// Report title.
    pub title: String,
    /// Rows in payload order, hidden ones included.
    pub rows: Vec<BalanceSheetRow>,
    /// Whether debit and credit columns are shown.
    pub show_debit_credit: bool,
    /// Formatted debit total.
    pub debit_total: String,
    /// Formatted credit total.
    pub credit_total: String,
    /// Formatted balance total.
    pub balance_total: String,
}

impl BalanceSheetTable {
    /// Iterates over the rows a reader can see.
    #[inline]
    pub fn visible_rows(&self) -> impl Iterator<Item = &BalanceSheetRow> {
        self.rows.iter().filter(|row| row.visible)
    }
}

/// One account row of the rendered ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    /// Account id, used to expand the row.
    pub account: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Formatted debit.
    pub debit: String,
    /// Formatted credit.
    pub credit: String,
    /// Formatted balance.
    pub balance: String,
}

/// Rendered ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerTable {
    /// Report title.
    pub title: String,
    /// Account rows.
    pub rows: Vec<LedgerRow>,
    /// Formatted debit total.
    pub debit_total: String,
    /// Formatted credit total.
    pub credit_total: String,
    /// Formatted balance total.
    pub balance_total: String,
}

/// One journal item under an expanded ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Journal entry to open, absent for the initial balance.
    pub move_id: Option<MoveId>,
    /// Accounting date.
    pub date: String,
    /// Journal code.
    pub journal: String,
    /// Partner.
    pub partner: String,
    /// Reference.
    pub reference: String,
    /// Label.
    pub label: String,
    /// Journal entry name.
    pub move_name: String,
    /// Formatted debit.
    pub debit: String,
    /// Formatted credit.
    pub credit: String,
    /// Formatted running balance.
    pub balance: String,
}

/// Journal items of one ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSubsection {
    /// Account the items belong to.
    pub account: AccountId,
    /// Items, starting with the initial balance.
    pub entries: Vec<LedgerEntry>,
}

/// One multi-select as shown in the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    /// Category.
    pub category: FilterCategory,
    /// Caption.
    pub caption: String,
    /// Summary element id.
    pub summary_id: String,
    /// Committed labels.
    pub summary: String,
    /// Options offered.
    pub options: Vec<SelectOption>,
}

/// Rendered filter panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPanelView {
    /// Report the panel drives.
    pub kind: ReportKind,
    /// Company header.
    pub company_name: Option<String>,
    /// Multi-selects in panel order.
    pub categories: Vec<CategoryView>,
    /// Raw start date.
    pub date_from: String,
    /// Raw end date.
    pub date_to: String,
    /// Posting status summary.
    pub target_move: String,
    /// Debit/credit summary, for reports with the control.
    pub debit_credit: Option<String>,
}

/// A template name plus its view model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Template {
    /// Filter panel.
    FilterPanel(FilterPanelView),
    /// Balance-sheet table.
    BalanceSheet(BalanceSheetTable),
    /// Ledger table.
    Ledger(LedgerTable),
    /// Journal items of one ledger row.
    LedgerSubsection(LedgerSubsection),
}

impl Template {
    /// Name the host looks the template up by.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match *self {
            Self::FilterPanel(_) => FILTER_PANEL_TEMPLATE,
            Self::BalanceSheet(_) => BALANCE_SHEET_TEMPLATE,
            Self::Ledger(_) => LEDGER_TABLE_TEMPLATE,
            Self::LedgerSubsection(_) => LEDGER_SUBSECTION_TEMPLATE,
        }
    }

    /// View model as a JSON context.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ReportError::Serialization`] if the view
    /// model cannot be encoded.
    #[inline]
    pub fn context(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Parent links of the balance-sheet hierarchy.
fn parents(payload: &ReportPayload) -> BTreeMap<ReportLineId, ReportLineId> {
    payload
        .bs_lines
        .iter()
        .filter_map(|line| line.p_id.map(|parent| (line.r_id, parent)))
        .collect()
}

/// Ids of lines that have at least one child.
#[inline]
#[must_use]
pub fn branch_ids(payload: &ReportPayload) -> BTreeSet<ReportLineId> {
    let known: BTreeSet<ReportLineId> = payload.bs_lines.iter().map(|line| line.r_id).collect();
    payload
        .bs_lines
        .iter()
        .filter_map(|line| line.p_id)
        .filter(|parent| known.contains(parent))
        .collect()
}

/// Whether every ancestor of `line` is expanded.
fn ancestors_expanded(
    line: &BalanceSheetLine,
    parents: &BTreeMap<ReportLineId, ReportLineId>,
    expanded: &BTreeSet<ReportLineId>,
) -> bool {
    let mut current = line.p_id;
    // Bounded walk; a malformed payload may contain cycles.
    for _ in 0..=parents.len() {
        let Some(parent) = current else {
            return true;
        };
        if !expanded.contains(&parent) {
            return false;
        }
        current = parents.get(&parent).copied();
    }
    tracing::warn!(line = %line.r_id, "cycle in balance-sheet hierarchy");
    false
}

/// Balance-sheet lines a reader can see, in payload order.
///
/// This is the line set used for exports: a line under any collapsed
/// ancestor is left out.
#[inline]
#[must_use]
pub fn visible_lines(
    payload: &ReportPayload,
    expanded: &BTreeSet<ReportLineId>,
) -> Vec<BalanceSheetLine> {
    let parents = parents(payload);
    payload
        .bs_lines
        .iter()
        .filter(|line| ancestors_expanded(line, &parents, expanded))
        .cloned()
        .collect()
}

/// Whether the payload asks for the debit/credit columns.
fn shows_debit_credit(payload: &ReportPayload) -> bool {
    payload
        .filters
        .debit_credit
        .as_deref()
        .and_then(DebitCredit::from_value)
        != Some(DebitCredit::Hide)
}

/// Renders the balance-sheet table.
#[inline]
#[must_use]
pub fn balance_sheet_table(
    payload: &ReportPayload,
    expanded: &BTreeSet<ReportLineId>,
) -> BalanceSheetTable {
    let parents = parents(payload);
    let branches = branch_ids(payload);
    let currency = &payload.currency;
    let rows = payload
        .bs_lines
        .iter()
        .map(|line| BalanceSheetRow {
            id: line.r_id,
            parent: line.p_id,
            name: line.name.clone(),
            code: line.code.clone(),
            level: line.level,
            debit: line
                .m_debit
                .clone()
                .unwrap_or_else(|| currency.display(line.debit)),
            credit: line
                .m_credit
                .clone()
                .unwrap_or_else(|| currency.display(line.credit)),
            balance: line
                .m_balance
                .clone()
                .unwrap_or_else(|| currency.display(line.balance)),
            toggle: branches.contains(&line.r_id).then(|| {
                if expanded.contains(&line.r_id) {
                    Toggle::Expanded
                } else {
                    Toggle::Collapsed
                }
            }),
            visible: ancestors_expanded(line, &parents, expanded),
        })
        .collect();
    BalanceSheetTable {
        title: payload.name.clone(),
        rows,
        show_debit_credit: shows_debit_credit(payload),
        debit_total: currency.display(payload.debit_total),
        credit_total: currency.display(payload.credit_total),
        balance_total: currency.display(payload.debit_balance),
    }
}

/// Renders the ledger table.
#[inline]
#[must_use]
pub fn ledger_table(payload: &ReportPayload) -> LedgerTable {
    let currency = &payload.currency;
    LedgerTable {
        title: payload.name.clone(),
        rows: payload
            .report_lines
            .iter()
            .map(|line| LedgerRow {
                account: line.id,
                code: line.code.clone(),
                name: line.name.clone(),
                debit: currency.display(line.debit),
                credit: currency.display(line.credit),
                balance: currency.display(line.balance),
            })
            .collect(),
        debit_total: currency.display(payload.debit_total),
        credit_total: currency.display(payload.credit_total),
        balance_total: currency.display(payload.debit_balance),
    }
}

/// Renders the journal items of one ledger line.
#[inline]
#[must_use]
pub fn ledger_subsection(line: &LedgerLine, currency: &Currency) -> LedgerSubsection {
    let entries = line
        .move_lines
        .iter()
        .map(|item| LedgerEntry {
            move_id: item.move_id,
            date: item.ldate.clone().unwrap_or_default(),
            journal: item.lcode.clone().unwrap_or_default(),
            partner: item.partner_name.clone().unwrap_or_default(),
            reference: item.lref.clone().unwrap_or_default(),
            label: item.lname.clone().unwrap_or_default(),
            move_name: item.move_name.clone().unwrap_or_default(),
            debit: currency.display(item.debit),
            credit: currency.display(item.credit),
            balance: currency.display(item.balance),
        })
        .collect();
    LedgerSubsection {
        account: line.id,
        entries,
    }
}

/// Renders the table template for `kind`.
#[inline]
#[must_use]
pub fn table(
    kind: ReportKind,
    payload: &ReportPayload,
    expanded: &BTreeSet<ReportLineId>,
) -> Template {
    match kind {
        ReportKind::ProfitAndLoss => Template::BalanceSheet(balance_sheet_table(payload, expanded)),
        ReportKind::GeneralLedger => Template::Ledger(ledger_table(payload)),
    }
}

/// Renders the filter panel.
#[inline]
#[must_use]
pub fn filter_panel(panel: &FilterPanel) -> FilterPanelView {
    let kind = panel.kind();
    let categories = kind
        .categories()
        .iter()
        .map(|&category| CategoryView {
            category,
            caption: category.caption().to_owned(),
            summary_id: category.summary_id().to_owned(),
            summary: panel.summary(category.summary_id()).to_owned(),
            options: panel
                .multi_select(category)
                .map(|widget| widget.options.clone())
                .unwrap_or_default(),
        })
        .collect();
    FilterPanelView {
        kind,
        company_name: panel.company_name().map(str::to_owned),
        categories,
        date_from: panel.date_from().to_owned(),
        date_to: panel.date_to().to_owned(),
        target_move: panel.summary(TARGET_MOVE_SUMMARY).to_owned(),
        debit_credit: kind
            .has_debit_credit()
            .then(|| panel.summary(DEBIT_CREDIT_SUMMARY).to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoveLine;

    fn line(id: i64, parent: Option<i64>, name: &str) -> BalanceSheetLine {
        BalanceSheetLine {
            r_id: ReportLineId::new(id),
            p_id: parent.map(ReportLineId::new),
            c_ids: Vec::new(),
            name: name.to_owned(),
            code: None,
            level: if parent.is_some() { 2 } else { 1 },
            report_type: "accounts".to_owned(),
            debit: 10.0,
            credit: 0.0,
            balance: 10.0,
            m_debit: None,
            m_credit: None,
            m_balance: None,
        }
    }

    fn tree() -> ReportPayload {
        ReportPayload {
            name: "Balance Sheet".to_owned(),
            bs_lines: vec![
                line(1, None, "Balance Sheet"),
                line(2, Some(1), "Assets"),
                line(3, Some(2), "Cash"),
                line(4, Some(1), "Liabilities"),
            ],
            ..ReportPayload::default()
        }
    }

    #[test]
    fn branches_are_lines_with_children() {
        let ids = branch_ids(&tree());
        let expected: BTreeSet<ReportLineId> = [1, 2].into_iter().map(ReportLineId::new).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn fully_expanded_shows_everything() {
        let payload = tree();
        let table = balance_sheet_table(&payload, &branch_ids(&payload));
        assert_eq!(table.visible_rows().count(), 4);
        assert_eq!(table.rows[0].toggle, Some(Toggle::Expanded));
        assert_eq!(table.rows[2].toggle, None);
    }

    #[test]
    fn hidden_iff_some_ancestor_collapsed() {
        let payload = tree();
        let mut expanded = branch_ids(&payload);
        let _removed = expanded.remove(&ReportLineId::new(2));
        let table = balance_sheet_table(&payload, &expanded);
        let visible: Vec<i64> = table.visible_rows().map(|row| row.id.into_inner()).collect();
        assert_eq!(visible, vec![1, 2, 4]);
        assert_eq!(table.rows[1].toggle, Some(Toggle::Collapsed));
        assert_eq!(Toggle::Collapsed.icon(), "fa-caret-right");

        let _removed = expanded.remove(&ReportLineId::new(1));
        let lines = visible_lines(&payload, &expanded);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].r_id, ReportLineId::new(1));
    }

    #[test]
    fn cycles_do_not_hang() {
        let payload = ReportPayload {
            bs_lines: vec![line(1, Some(2), "A"), line(2, Some(1), "B")],
            ..ReportPayload::default()
        };
        let expanded = branch_ids(&payload);
        assert!(visible_lines(&payload, &expanded).is_empty());
    }

    #[test]
    fn empty_report_renders_zero_totals() {
        let table = balance_sheet_table(&ReportPayload::default(), &BTreeSet::new());
        assert!(table.rows.is_empty());
        assert_eq!(table.debit_total, "$ 0.00");
        assert_eq!(table.credit_total, "$ 0.00");
        assert_eq!(table.balance_total, "$ 0.00");
        assert!(table.show_debit_credit);
    }

    #[test]
    fn server_formatted_amounts_win() {
        let mut payload = tree();
        payload.bs_lines[0].m_balance = Some("$ 9.99".to_owned());
        let table = balance_sheet_table(&payload, &BTreeSet::new());
        assert_eq!(table.rows[0].balance, "$ 9.99");
        assert_eq!(table.rows[0].debit, "$ 10.00");
    }

    #[test]
    fn subsection_formats_items() {
        let line = LedgerLine {
            id: AccountId::new(5),
            code: "101000".to_owned(),
            name: "Cash".to_owned(),
            debit: 1234.99,
            credit: 0.0,
            balance: 1234.99,
            move_lines: vec![MoveLine {
                move_id: Some(MoveId::new(12)),
                lname: Some("Payment".to_owned()),
                debit: 1234.99,
                balance: 1234.99,
                ..MoveLine::default()
            }],
        };
        let section = ledger_subsection(&line, &Currency::default());
        assert_eq!(section.account, AccountId::new(5));
        assert_eq!(section.entries[0].debit, "$ 1,234.00");
        assert_eq!(section.entries[0].label, "Payment");
        assert_eq!(section.entries[0].date, "");
    }

    #[test]
    fn template_names_and_context() {
        let template = table(ReportKind::GeneralLedger, &ReportPayload::default(), &BTreeSet::new());
        assert_eq!(template.name(), LEDGER_TABLE_TEMPLATE);
        let context = template.context().unwrap();
        assert_eq!(context["debit_total"], "$ 0.00");
        assert!(context["rows"].as_array().unwrap().is_empty());
    }

    #[test]
    fn filter_panel_view_lists_categories() {
        let panel = FilterPanel::new(ReportKind::GeneralLedger);
        let view = filter_panel(&panel);
        assert_eq!(view.categories.len(), 6);
        assert_eq!(view.categories[0].summary_id, "acc_res");
        assert_eq!(view.debit_credit, None);
    }
}
