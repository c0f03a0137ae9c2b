//! Declarative action descriptors handed to the host's action runner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AccountId, Context, ReportKind, ReportPayload, WizardId};

/// An action the host should run: a document download, a window, or a
/// client view. The core never performs these itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionDescriptor {
    /// Render a server-side report as PDF.
    #[serde(rename = "ir.actions.report")]
    Report {
        /// Output format (`qweb-pdf`).
        report_type: String,
        /// Server report identifier.
        report_name: String,
        /// Server report template file.
        report_file: String,
        /// Report data with collapsed branches removed.
        data: PdfExportData,
        /// Rendering context.
        context: Context,
        /// Title shown by the host.
        display_name: String,
    },
    /// Stream a spreadsheet built by the wizard.
    #[serde(rename = "ir_actions_dynamic_xlsx_download")]
    XlsxDownload {
        /// Export request.
        data: XlsxExportData,
    },
    /// Open a record in a form view.
    #[serde(rename = "ir.actions.act_window")]
    Window {
        /// Model of the record.
        res_model: String,
        /// Record id.
        res_id: i64,
        /// View mode (`form`).
        view_mode: String,
        /// `[view_id, view_type]` pairs; `false` picks the default view.
        views: Vec<(Value, String)>,
        /// Where to open (`current`).
        target: String,
        /// Window context.
        context: Context,
    },
    /// Open a client-side view registered under `tag`.
    #[serde(rename = "ir.actions.client")]
    Client {
        /// Window title.
        name: String,
        /// Registered client action tag.
        tag: String,
        /// Where to open (`new` for a dialog).
        target: String,
        /// Context handed to the new view.
        context: Context,
    },
}

/// Payload of a PDF export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfExportData {
    /// Report data as fetched, minus collapsed branches.
    pub report_data: ReportPayload,
    /// Report title.
    pub report_name: String,
}

/// Payload of a spreadsheet export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XlsxExportData {
    /// Wizard model that builds the file.
    pub model: String,
    /// JSON-encoded filter echo.
    pub options: String,
    /// Output format (`xlsx`).
    pub output_format: String,
    /// Report title.
    pub report_data: String,
    /// Report title used for the file name.
    pub report_name: String,
    /// JSON-encoded exported lines.
    pub dfr_data: String,
}

impl ActionDescriptor {
    /// Builds the PDF export action for `kind`.
    #[inline]
    #[must_use]
    pub fn pdf(kind: ReportKind, title: &str, report_data: ReportPayload) -> Self {
        let mut context = Context::new();
        let _active = context.insert("active_model".to_owned(), Value::from(kind.model()));
        let _landscape = context.insert("landscape".to_owned(), Value::from(1_i32));
        let _bs = context.insert(
            "bs_report".to_owned(),
            Value::from(kind == ReportKind::ProfitAndLoss),
        );
        Self::Report {
            report_type: "qweb-pdf".to_owned(),
            report_name: kind.pdf_report().to_owned(),
            report_file: kind.pdf_report().to_owned(),
            data: PdfExportData {
                report_data,
                report_name: title.to_owned(),
            },
            context,
            display_name: title.to_owned(),
        }
    }

    /// Builds the spreadsheet export action for `kind`.
    #[inline]
    #[must_use]
    pub fn xlsx(kind: ReportKind, title: &str, options: String, dfr_data: String) -> Self {
        Self::XlsxDownload {
            data: XlsxExportData {
                model: kind.model().to_owned(),
                options,
                output_format: "xlsx".to_owned(),
                report_data: title.to_owned(),
                report_name: title.to_owned(),
                dfr_data,
            },
        }
    }

    /// Builds an action opening `res_id` of `model` in its form view.
    #[inline]
    #[must_use]
    pub fn form(model: &str, res_id: i64) -> Self {
        Self::Window {
            res_model: model.to_owned(),
            res_id,
            view_mode: "form".to_owned(),
            views: vec![(Value::Bool(false), "form".to_owned())],
            target: "current".to_owned(),
            context: Context::new(),
        }
    }

    /// Builds the action opening the general ledger for one account,
    /// inheriting the filters of `wizard`.
    #[inline]
    #[must_use]
    pub fn ledger_for_account(account: AccountId, wizard: WizardId) -> Self {
        let mut context = Context::new();
        let _account = context.insert(AccountId::KEY.to_owned(), Value::from(account));
        let _wizard = context.insert(WizardId::KEY.to_owned(), Value::from(wizard));
        Self::Client {
            name: "GL View".to_owned(),
            tag: ReportKind::GeneralLedger.action_tag().to_owned(),
            target: "new".to_owned(),
            context,
        }
    }
}
