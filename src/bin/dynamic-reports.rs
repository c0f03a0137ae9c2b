//! CLI binary for browsing dynamic financial reports.

use std::io::{self, Write as _};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use dynamic_reports::client::OdooBlockingClient;
use dynamic_reports::error::{ReportError, Result};
use dynamic_reports::filter_panel::{FilterCategory, FilterPanel};
use dynamic_reports::host::Host;
use dynamic_reports::models::{
    AccountId, ActionDescriptor, DebitCredit, NaiveDate, ReportKind, ReportLineId, TargetMove,
};
use dynamic_reports::render::{
    BalanceSheetTable, FilterPanelView, LedgerSubsection, LedgerTable, Template, Toggle,
};
use dynamic_reports::view::{BlockingReportView, OpenContext, ViewSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Environment variable with the server URL.
const URL_ENV: &str = "ODOO_URL";
/// Environment variable with the database name.
const DB_ENV: &str = "ODOO_DB";
/// Environment variable with the login.
const LOGIN_ENV: &str = "ODOO_LOGIN";
/// Environment variable with the password.
const PASSWORD_ENV: &str = "ODOO_PASSWORD";

/// Dynamic financial reports from the command line.
#[derive(Debug, Parser)]
#[command(name = "dynamic-reports", version, about)]
struct Cli {
    /// Server URL (overrides `ODOO_URL`).
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,
    /// Database name (overrides `ODOO_DB`).
    #[arg(long, global = true, value_name = "NAME")]
    db: Option<String>,
    /// Login (overrides `ODOO_LOGIN`).
    #[arg(long, global = true)]
    login: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available reports.
#[derive(Debug, Subcommand)]
enum Command {
    /// Profit and loss / balance sheet report.
    ProfitAndLoss {
        /// Shared report flags.
        #[command(flatten)]
        report: ReportArgs,
        /// Show or hide the debit and credit columns.
        #[arg(long, value_parser = parse_debit_credit)]
        debit_credit: Option<DebitCredit>,
        /// Collapse a report line (repeatable).
        #[arg(long, value_name = "LINE")]
        collapse: Vec<i64>,
    },
    /// General ledger report.
    GeneralLedger {
        /// Shared report flags.
        #[command(flatten)]
        report: ReportArgs,
        /// Show the journal items of an account (repeatable).
        #[arg(long, value_name = "ACCOUNT")]
        expand: Vec<i64>,
    },
}

/// Filters and export flags shared by both reports.
#[derive(Debug, Default, Args)]
struct ReportArgs {
    /// Report title passed to the server.
    #[arg(long)]
    title: Option<String>,
    /// Account ids to include (repeatable).
    #[arg(long = "account", value_name = "ID")]
    accounts: Vec<String>,
    /// Journal ids to include (repeatable).
    #[arg(long = "journal", value_name = "ID")]
    journals: Vec<String>,
    /// Account tag ids to include (repeatable).
    #[arg(long = "account-tag", value_name = "ID")]
    account_tags: Vec<String>,
    /// Analytic account ids to include (repeatable).
    #[arg(long = "analytic", value_name = "ID")]
    analytics: Vec<String>,
    /// Analytic tag ids to include (repeatable).
    #[arg(long = "analytic-tag", value_name = "ID")]
    analytic_tags: Vec<String>,
    /// Operating unit ids to include (repeatable).
    #[arg(long = "operating-unit", value_name = "ID")]
    operating_units: Vec<String>,
    /// Start date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Posted entries only, or all entries.
    #[arg(long, value_parser = parse_target_move)]
    target_move: Option<TargetMove>,
    /// Export the report after rendering.
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,
}

impl ReportArgs {
    /// Selected ids per category.
    fn categories(&self) -> [(FilterCategory, &[String]); 6] {
        [
            (FilterCategory::Accounts, self.accounts.as_slice()),
            (FilterCategory::Journals, self.journals.as_slice()),
            (FilterCategory::AccountTags, self.account_tags.as_slice()),
            (FilterCategory::AnalyticAccounts, self.analytics.as_slice()),
            (FilterCategory::AnalyticTags, self.analytic_tags.as_slice()),
            (FilterCategory::OperatingUnits, self.operating_units.as_slice()),
        ]
    }

    /// Whether any filter flag was given.
    fn has_filters(&self) -> bool {
        self.categories().iter().any(|&(_, ids)| !ids.is_empty())
            || self.from.is_some()
            || self.to.is_some()
            || self.target_move.is_some()
    }
}

/// Export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    /// PDF report action.
    Pdf,
    /// Spreadsheet download action.
    Xlsx,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> core::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses `posted` or `all` for clap.
fn parse_target_move(s: &str) -> core::result::Result<TargetMove, String> {
    TargetMove::from_value(s).ok_or_else(|| format!("expected `posted` or `all`, got `{s}`"))
}

/// Parses `show` or `hide` for clap.
fn parse_debit_credit(s: &str) -> core::result::Result<DebitCredit, String> {
    DebitCredit::from_value(s).ok_or_else(|| format!("expected `show` or `hide`, got `{s}`"))
}

/// Host rendering templates as terminal tables.
#[derive(Debug)]
struct TerminalHost;

impl Host for TerminalHost {
    fn render(&self, template: &Template) -> Result<String> {
        Ok(match *template {
            Template::FilterPanel(ref view) => render_filter_panel(view),
            Template::BalanceSheet(ref table) => render_balance_sheet(table),
            Template::Ledger(ref table) => render_ledger(table),
            Template::LedgerSubsection(ref section) => render_subsection(section),
        })
    }

    fn dispatch(&self, action: ActionDescriptor) {
        let mut out = io::stdout().lock();
        let written = serde_json::to_string_pretty(&action)
            .map_err(io::Error::other)
            .and_then(|json| writeln!(out, "{}\n{json}", "Action".green().bold()));
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to print action");
        }
    }

    fn notify(&self, error: &ReportError) {
        // Nothing left to report to if stderr itself failed.
        let _ignored = writeln!(io::stderr().lock(), "{} {error}", "error:".red().bold());
    }
}

/// Cell with a right-aligned amount.
fn amount(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Header cell.
fn header(text: &str) -> Cell {
    Cell::new(text).fg(Color::Cyan)
}

/// Renders the active filters.
fn render_filter_panel(view: &FilterPanelView) -> String {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![header("Filter"), header("Value")]);
    for category in &view.categories {
        let summary = if category.summary.is_empty() {
            "All"
        } else {
            &category.summary
        };
        _ = table.add_row(vec![Cell::new(&category.caption), Cell::new(summary)]);
    }
    if !view.date_from.is_empty() {
        _ = table.add_row(vec![Cell::new("Start Date"), Cell::new(&view.date_from)]);
    }
    if !view.date_to.is_empty() {
        _ = table.add_row(vec![Cell::new("End Date"), Cell::new(&view.date_to)]);
    }
    _ = table.add_row(vec![Cell::new("Target Move"), Cell::new(&view.target_move)]);
    if let Some(ref debit_credit) = view.debit_credit {
        _ = table.add_row(vec![Cell::new("Debit/Credit"), Cell::new(debit_credit)]);
    }
    let company = view.company_name.as_deref().unwrap_or("\u{2014}");
    format!("{} {}\n{table}", "Company".bold(), company)
}

/// Renders the visible balance-sheet rows, indented by level.
fn render_balance_sheet(view: &BalanceSheetTable) -> String {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    let mut headers = vec![header("Line"), header("Name")];
    if view.show_debit_credit {
        headers.extend([header("Debit"), header("Credit")]);
    }
    headers.push(header("Balance"));
    _ = table.set_header(headers);

    for row in view.visible_rows() {
        let marker = match row.toggle {
            Some(Toggle::Expanded) => "\u{25be} ",
            Some(Toggle::Collapsed) => "\u{25b8} ",
            None => "  ",
        };
        let indent = "  ".repeat(usize::try_from(row.level.saturating_sub(1)).unwrap_or(0));
        let name = match row.code {
            Some(ref code) => format!("{indent}{marker}{code} {}", row.name),
            None => format!("{indent}{marker}{}", row.name),
        };
        let mut cells = vec![Cell::new(row.id).fg(Color::DarkGrey), Cell::new(name)];
        if view.show_debit_credit {
            cells.extend([amount(&row.debit), amount(&row.credit)]);
        }
        cells.push(amount(&row.balance));
        _ = table.add_row(cells);
    }

    let mut totals = vec![Cell::new(""), Cell::new("Total")];
    if view.show_debit_credit {
        totals.extend([amount(&view.debit_total), amount(&view.credit_total)]);
    }
    totals.push(amount(&view.balance_total));
    _ = table.add_row(totals);
    format!("{}\n{table}", view.title.green().bold())
}

/// Renders the ledger's account rows.
fn render_ledger(view: &LedgerTable) -> String {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        header("Account"),
        header("Code"),
        header("Name"),
        header("Debit"),
        header("Credit"),
        header("Balance"),
    ]);
    for row in &view.rows {
        _ = table.add_row(vec![
            Cell::new(row.account).fg(Color::DarkGrey),
            Cell::new(&row.code),
            Cell::new(&row.name),
            amount(&row.debit),
            amount(&row.credit),
            amount(&row.balance),
        ]);
    }
    _ = table.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new("Total"),
        amount(&view.debit_total),
        amount(&view.credit_total),
        amount(&view.balance_total),
    ]);
    format!(
        "{} {}\n{table}",
        view.title.green().bold(),
        format_args!("({} accounts)", view.rows.len()).dimmed()
    )
}

/// Renders the journal items of one ledger account.
fn render_subsection(section: &LedgerSubsection) -> String {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        header("Date"),
        header("Journal"),
        header("Partner"),
        header("Ref"),
        header("Move"),
        header("Label"),
        header("Debit"),
        header("Credit"),
        header("Balance"),
    ]);
    for entry in &section.entries {
        _ = table.add_row(vec![
            Cell::new(&entry.date),
            Cell::new(&entry.journal),
            Cell::new(&entry.partner),
            Cell::new(&entry.reference),
            Cell::new(&entry.move_name),
            Cell::new(&entry.label),
            amount(&entry.debit),
            amount(&entry.credit),
            amount(&entry.balance),
        ]);
    }
    format!(
        "{} {}\n{table}",
        "Journal items".green().bold(),
        format_args!("(account {})", section.account).dimmed()
    )
}

/// Reads a setting from `flag`, falling back to the environment.
fn setting(flag: Option<String>, env: &'static str) -> io::Result<Option<String>> {
    if let Some(value) = flag.filter(|value| !value.is_empty()) {
        return Ok(Some(value));
    }
    match std::env::var(env) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => {
            let mut err = io::stderr().lock();
            writeln!(
                err,
                "{} {} environment variable is not set",
                "error:".red().bold(),
                env.bold()
            )?;
            writeln!(
                err,
                "  {} create a .env file with {}=<value>",
                "hint:".cyan(),
                env
            )?;
            Ok(None)
        }
    }
}

/// Builds the blocking client from flags and environment.
fn build_client(cli: &mut Cli) -> io::Result<Option<OdooBlockingClient>> {
    let Some(url) = setting(cli.url.take(), URL_ENV)? else {
        return Ok(None);
    };
    let Some(db) = setting(cli.db.take(), DB_ENV)? else {
        return Ok(None);
    };
    let Some(login) = setting(cli.login.take(), LOGIN_ENV)? else {
        return Ok(None);
    };
    let Some(password) = setting(None, PASSWORD_ENV)? else {
        return Ok(None);
    };
    match OdooBlockingClient::builder()
        .base_url(url)
        .database(db)
        .login(login)
        .password(password)
        .build()
    {
        Ok(client) => Ok(Some(client)),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build client: {err}",
                "error:".red().bold()
            )?;
            Ok(None)
        }
    }
}

/// Fills `panel` from the CLI flags.
fn fill_panel(panel: &mut FilterPanel, args: &ReportArgs, debit_credit: Option<DebitCredit>) {
    for (category, ids) in args.categories() {
        for id in ids {
            if !panel.select(category, id) {
                tracing::warn!(category = ?category, id = %id, "no such filter option");
            }
        }
    }
    if let Some(from) = args.from {
        panel.set_date_from(from.to_string());
    }
    if let Some(to) = args.to {
        panel.set_date_to(to.to_string());
    }
    if let Some(target_move) = args.target_move {
        panel.set_target_move(target_move.as_str());
    }
    if let Some(debit_credit) = debit_credit {
        panel.set_debit_credit(debit_credit.as_str());
    }
}

/// Opens a view, applies the filters and runs the requested
/// interactions.
fn run_report(client: OdooBlockingClient, command: Command) -> Result<ViewSnapshot> {
    let (kind, args, debit_credit, collapse, expand) = match command {
        Command::ProfitAndLoss {
            report,
            debit_credit,
            collapse,
        } => (ReportKind::ProfitAndLoss, report, debit_credit, collapse, Vec::new()),
        Command::GeneralLedger { report, expand } => {
            (ReportKind::GeneralLedger, report, None, Vec::new(), expand)
        }
    };
    let title = args.title.clone().unwrap_or_else(|| match kind {
        ReportKind::ProfitAndLoss => "Profit and Loss".to_owned(),
        ReportKind::GeneralLedger => "General Ledger".to_owned(),
    });

    let spinner = make_spinner("Loading report...");
    let opened = BlockingReportView::open(client, TerminalHost, kind, &title, OpenContext::default());
    spinner.finish_and_clear();
    let view = opened?;

    if args.has_filters() || debit_credit.is_some() {
        let echo = view.payload()?.map(|payload| payload.filters).unwrap_or_default();
        let mut panel = FilterPanel::from_echo(kind, &echo);
        fill_panel(&mut panel, &args, debit_credit);
        let _applied = view.apply_filters(&mut panel)?;
    }
    for line in collapse {
        if view.toggle(ReportLineId::new(line))?.is_none() {
            tracing::warn!(line, "line has no children");
        }
    }
    for account in expand {
        let _applied = view.expand_ledger_row(AccountId::new(account))?;
    }
    match args.export {
        Some(ExportFormat::Pdf) => view.export_pdf()?,
        Some(ExportFormat::Xlsx) => view.export_xlsx()?,
        None => {}
    }
    view.snapshot()
}

/// Prints the rendered regions of a view.
fn print_snapshot(snapshot: &ViewSnapshot) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for region in [&snapshot.filter_panel, &snapshot.table].into_iter().flatten() {
        writeln!(out, "{region}")?;
        writeln!(out)?;
    }
    for section in snapshot.subsections.values() {
        writeln!(out, "{section}")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let mut cli = Cli::parse();
    let Some(client) = build_client(&mut cli)? else {
        return Ok(ExitCode::FAILURE);
    };

    // Failures were already shown through `TerminalHost::notify`.
    match run_report(client, cli.command) {
        Ok(snapshot) => {
            print_snapshot(&snapshot)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = %err, "report failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dynamic_reports::models::{
        BalanceSheetLine, FilterEcho, FilterOption, LedgerLine, MoveLine, ReportPayload,
    };
    use dynamic_reports::render;
    use std::collections::BTreeSet;

    fn payload() -> ReportPayload {
        ReportPayload {
            name: "Profit and Loss".to_owned(),
            bs_lines: vec![
                BalanceSheetLine {
                    r_id: ReportLineId::new(1),
                    p_id: None,
                    c_ids: Vec::new(),
                    name: "Income".to_owned(),
                    code: None,
                    level: 1,
                    report_type: "account_report".to_owned(),
                    debit: 0.0,
                    credit: 250.0,
                    balance: -250.0,
                    m_debit: None,
                    m_credit: None,
                    m_balance: None,
                },
                BalanceSheetLine {
                    r_id: ReportLineId::new(2),
                    p_id: Some(ReportLineId::new(1)),
                    c_ids: Vec::new(),
                    name: "Sales".to_owned(),
                    code: Some("400000".to_owned()),
                    level: 2,
                    report_type: "accounts".to_owned(),
                    debit: 0.0,
                    credit: 250.0,
                    balance: -250.0,
                    m_debit: None,
                    m_credit: None,
                    m_balance: None,
                },
            ],
            ..ReportPayload::default()
        }
    }

    #[test]
    fn parses_profit_and_loss_flags() {
        let cli = Cli::try_parse_from([
            "dynamic-reports",
            "profit-and-loss",
            "--account",
            "5",
            "--account",
            "7",
            "--from",
            "2024-01-01",
            "--target-move",
            "all",
            "--debit-credit",
            "hide",
            "--collapse",
            "2",
            "--export",
            "pdf",
        ])
        .unwrap();
        let Command::ProfitAndLoss {
            report,
            debit_credit,
            collapse,
        } = cli.command
        else {
            panic!("expected profit-and-loss");
        };
        assert_eq!(report.accounts, vec!["5", "7"]);
        assert_eq!(report.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(report.target_move, Some(TargetMove::All));
        assert_eq!(debit_credit, Some(DebitCredit::Hide));
        assert_eq!(collapse, vec![2]);
        assert_eq!(report.export, Some(ExportFormat::Pdf));
        assert!(report.has_filters());
    }

    #[test]
    fn rejects_unknown_target_move() {
        let parsed = Cli::try_parse_from([
            "dynamic-reports",
            "general-ledger",
            "--target-move",
            "draft",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_connection_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "dynamic-reports",
            "general-ledger",
            "--expand",
            "5",
            "--url",
            "http://localhost:8069",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://localhost:8069"));
        let Command::GeneralLedger { report, expand } = cli.command else {
            panic!("expected general-ledger");
        };
        assert_eq!(expand, vec![5]);
        assert!(!report.has_filters());
    }

    #[test]
    fn fill_panel_selects_known_options() {
        let echo = FilterEcho {
            accounts_list: vec![FilterOption {
                id: 5,
                name: "Cash".to_owned(),
                code: None,
            }],
            ..FilterEcho::default()
        };
        let mut panel = FilterPanel::from_echo(ReportKind::ProfitAndLoss, &echo);
        let args = ReportArgs {
            accounts: vec!["5".to_owned(), "9".to_owned()],
            ..ReportArgs::default()
        };
        fill_panel(&mut panel, &args, Some(DebitCredit::Hide));
        let selection = panel.collect();
        let values = selection.to_values().unwrap();
        assert_eq!(
            values,
            serde_json::json!({"account_ids": [5], "debit_credit": "hide"})
        );
    }

    #[test]
    fn balance_sheet_hides_collapsed_children() {
        let payload = payload();
        let expanded = BTreeSet::new();
        let table = render::balance_sheet_table(&payload, &expanded);
        let text = render_balance_sheet(&table);
        assert!(text.contains("Income"));
        assert!(!text.contains("Sales"));
        assert!(text.contains("Total"));
    }

    #[test]
    fn subsection_lists_items() {
        let line = LedgerLine {
            id: AccountId::new(5),
            code: "101000".to_owned(),
            name: "Cash".to_owned(),
            debit: 10.0,
            credit: 0.0,
            balance: 10.0,
            move_lines: vec![MoveLine {
                lid: Some(31),
                lname: Some("Payment".to_owned()),
                debit: 10.0,
                balance: 10.0,
                ..MoveLine::default()
            }],
        };
        let section = render::ledger_subsection(&line, &payload().currency);
        let text = render_subsection(&section);
        assert!(text.contains("Payment"));
        assert!(text.contains("$ 10.00"));
    }
}
