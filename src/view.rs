//! Report view controllers.
//!
//! A view owns one server-side wizard and drives the cycle
//! create → fetch → render → (change filters → write → fetch → render).
//! [`ReportView`] (async) and [`BlockingReportView`] (blocking) are
//! generated from one macro and share their state handling.
//!
//! Methods take `&self`, so several interactions may be in flight at
//! once. Table requests carry a sequence ticket and only the most recent
//! outstanding one renders; older resolutions come back as
//! [`Applied::Discarded`]. A failed request stops being outstanding.

mod sequence;
mod state;

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AccountId, Context, ReportLineId, WizardId};

/// Method returning the report data of a wizard.
const VIEW_REPORT: &str = "view_report";

/// Model of journal entries, opened from ledger items.
const MOVE_MODEL: &str = "account.move";

/// Outcome of a request that may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Applied {
    /// The response was rendered.
    Rendered,
    /// A newer request superseded this one; nothing was rendered.
    Discarded,
    /// There was nothing to render.
    Unchanged,
}

/// Context a view is opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenContext {
    /// Account to focus, when a ledger is opened from another report.
    pub account_id: Option<AccountId>,
    /// Wizard whose filters the new view inherits.
    pub wizard_id: Option<WizardId>,
}

impl OpenContext {
    /// Context for a ledger opened from a report row.
    #[inline]
    #[must_use]
    pub const fn for_account(account_id: AccountId, wizard_id: WizardId) -> Self {
        Self {
            account_id: Some(account_id),
            wizard_id: Some(wizard_id),
        }
    }

    /// Converts into the `create` call context.
    #[inline]
    #[must_use]
    pub fn to_context(self) -> Context {
        let mut context = Context::new();
        if let Some(account) = self.account_id {
            let _previous = context.insert(AccountId::KEY.to_owned(), account.into());
        }
        if let Some(wizard) = self.wizard_id {
            let _previous = context.insert(WizardId::KEY.to_owned(), wizard.into());
        }
        context
    }
}

/// Read-only copy of a view's rendered regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// Filter panel markup.
    pub filter_panel: Option<String>,
    /// Table markup.
    pub table: Option<String>,
    /// Ledger sub-section markup by account.
    pub subsections: BTreeMap<AccountId, String>,
    /// Expanded balance-sheet branches.
    pub expanded: BTreeSet<ReportLineId>,
}

/// Generates a report view (async or blocking) over an RPC trait.
macro_rules! define_report_view {
    (
        view_name: $view:ident,
        rpc_trait: $rpc_trait:path,
        view_doc: $view_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $view_doc]
        #[derive(Debug)]
        pub struct $view<R, H> {
            /// Server access.
            rpc: R,
            /// Host, identity and state.
            session: Session<H>,
        }

        impl<R: $rpc_trait, H: Host> $view<R, H> {
            /// Creates the wizard, fetches the report and renders the
            /// filter panel and table.
            ///
            /// # Errors
            ///
            /// Returns the failure of wizard creation, the initial fetch or
            /// the initial render, after notifying the host.
            #[inline]
            #[tracing::instrument(skip_all, fields(kind = ?kind, title = %title))]
            pub $($async_kw)? fn open(
                rpc: R,
                host: H,
                kind: ReportKind,
                title: &str,
                context: OpenContext,
            ) -> Result<Self> {
                let created = rpc
                    .create(kind.model(), Value::Object(Map::new()), context.to_context())
                    $( .$await_ext )?;
                let wizard = created.map_err(|err| report_failure(&host, err))?;
                tracing::debug!(wizard = %wizard, "wizard created");
                let view = Self {
                    rpc,
                    session: Session::new(host, kind, title.to_owned(), wizard),
                };
                let ticket = view.session.begin_table()?;
                let payload = view
                    .fetch_report()
                    $( .$await_ext )?
                    .map_err(|err| view.session.abandon(ticket, err))?;
                let _applied = view.session.install_initial(ticket, payload)?;
                Ok(view)
            }

            /// Report the view drives.
            #[inline]
            #[must_use]
            pub fn kind(&self) -> ReportKind {
                self.session.kind()
            }

            /// Wizard backing the view.
            #[inline]
            #[must_use]
            pub fn wizard(&self) -> WizardId {
                self.session.wizard()
            }

            /// Report title.
            #[inline]
            #[must_use]
            pub fn title(&self) -> &str {
                self.session.title()
            }

            /// Embedding host.
            #[inline]
            #[must_use]
            pub fn host(&self) -> &H {
                self.session.host()
            }

            /// Server access.
            #[inline]
            #[must_use]
            pub const fn rpc(&self) -> &R {
                &self.rpc
            }

            /// Fetches the report data for the wizard's current filters.
            /// Safe to repeat; nothing is rendered.
            ///
            /// # Errors
            ///
            /// Returns the remote failure, after logging it and notifying
            /// the host. Rendered content is left as it was.
            #[inline]
            #[tracing::instrument(skip_all, fields(wizard = %self.wizard()))]
            pub $($async_kw)? fn fetch_report(&self) -> Result<ReportPayload> {
                let fetched = self
                    .rpc
                    .invoke(
                        self.kind().model(),
                        self.wizard().into_inner(),
                        VIEW_REPORT,
                        vec![Value::from(self.title())],
                    )
                    $( .$await_ext )?;
                let raw = fetched.map_err(|err| self.session.fail(err))?;
                let payload: ReportPayload = serde_json::from_value(raw)
                    .map_err(|err| self.session.fail(err.into()))?;
                tracing::trace!(
                    report_lines = payload.report_lines.len(),
                    bs_lines = payload.bs_lines.len(),
                    "report fetched"
                );
                Ok(payload)
            }

            /// Writes the panel's selection to the wizard, then fetches and
            /// re-renders the table. The filter panel is not re-rendered.
            ///
            /// Not transactional: if the fetch fails after the write, the
            /// wizard keeps the new filters and the table stays stale until
            /// the next successful apply or reload.
            ///
            /// # Errors
            ///
            /// Returns the failure of the write, fetch or render.
            #[inline]
            #[tracing::instrument(skip_all, fields(wizard = %self.wizard()))]
            pub $($async_kw)? fn apply_filters(&self, panel: &mut FilterPanel) -> Result<Applied> {
                let selection = panel.collect();
                let values = selection.to_values()?;
                let ticket = self.session.begin_table()?;
                tracing::debug!(keys = selection.len(), "writing filters");
                let written = self
                    .rpc
                    .write(self.kind().model(), self.wizard().into_inner(), values)
                    $( .$await_ext )?;
                written.map_err(|err| self.session.abandon(ticket, self.session.fail(err)))?;
                let payload = self
                    .fetch_report()
                    $( .$await_ext )?
                    .map_err(|err| self.session.abandon(ticket, err))?;
                self.session.install_table(ticket, payload)
            }

            /// Fetches and re-renders the table without changing filters.
            ///
            /// # Errors
            ///
            /// Returns the failure of the fetch or render.
            #[inline]
            #[tracing::instrument(skip_all, fields(wizard = %self.wizard()))]
            pub $($async_kw)? fn reload(&self) -> Result<Applied> {
                let ticket = self.session.begin_table()?;
                let payload = self
                    .fetch_report()
                    $( .$await_ext )?
                    .map_err(|err| self.session.abandon(ticket, err))?;
                self.session.install_table(ticket, payload)
            }

            /// Expands or collapses a balance-sheet line and re-renders
            /// the table from the cached data. Returns the line's new
            /// state, or `None` if it has no children.
            ///
            /// # Errors
            ///
            /// Returns a render failure.
            #[inline]
            pub fn toggle(&self, line: ReportLineId) -> Result<Option<Toggle>> {
                self.session.toggle(line)
            }

            /// Fetches the report and dispatches a PDF export of the lines
            /// currently visible.
            ///
            /// # Errors
            ///
            /// Returns the failure of the fetch.
            #[inline]
            #[tracing::instrument(skip_all, fields(wizard = %self.wizard()))]
            pub $($async_kw)? fn export_pdf(&self) -> Result<()> {
                let mut payload = self.fetch_report() $( .$await_ext )? ?;
                payload.bs_lines = self.session.visible_lines(&payload)?;
                tracing::debug!(lines = payload.bs_lines.len(), "exporting PDF");
                self.host()
                    .dispatch(ActionDescriptor::pdf(self.kind(), self.title(), payload));
                Ok(())
            }

            /// Fetches the report and dispatches a spreadsheet export of the
            /// lines currently visible.
            ///
            /// # Errors
            ///
            /// Returns the failure of the fetch or of encoding the export.
            #[inline]
            #[tracing::instrument(skip_all, fields(wizard = %self.wizard()))]
            pub $($async_kw)? fn export_xlsx(&self) -> Result<()> {
                let payload = self.fetch_report() $( .$await_ext )? ?;
                let options = serde_json::to_string(&payload.filters)?;
                let lines = match self.kind() {
                    ReportKind::ProfitAndLoss => {
                        serde_json::to_string(&self.session.visible_lines(&payload)?)?
                    }
                    ReportKind::GeneralLedger => serde_json::to_string(&payload.report_lines)?,
                };
                tracing::debug!(bytes = lines.len(), "exporting spreadsheet");
                self.host()
                    .dispatch(ActionDescriptor::xlsx(self.kind(), self.title(), options, lines));
                Ok(())
            }

            /// Opens the general ledger of `account` with this view's
            /// filters.
            #[inline]
            pub fn show_ledger(&self, account: AccountId) {
                tracing::debug!(account = %account, "opening ledger");
                self.host()
                    .dispatch(ActionDescriptor::ledger_for_account(account, self.wizard()));
            }

            /// Renders the journal items under a ledger row.
            ///
            /// Does nothing if the row is already expanded. A response
            /// arriving after the table was re-rendered is discarded, and
            /// concurrent expansions of the same row leave one sub-section.
            ///
            /// # Errors
            ///
            /// Returns the failure of the fetch or render.
            #[inline]
            #[tracing::instrument(skip_all, fields(account = %account))]
            pub $($async_kw)? fn expand_ledger_row(&self, account: AccountId) -> Result<Applied> {
                if self.session.has_subsection(account)? {
                    tracing::debug!("row already expanded");
                    return Ok(Applied::Unchanged);
                }
                let generation = self.session.generation()?;
                let payload = self.fetch_report() $( .$await_ext )? ?;
                self.session.install_subsection(generation, account, &payload)
            }

            /// Opens the journal entry `move_id` in a form view.
            ///
            /// # Errors
            ///
            /// Returns the failure of the lookup.
            #[inline]
            #[tracing::instrument(skip_all, fields(move_id = %move_id))]
            pub $($async_kw)? fn open_move(&self, move_id: MoveId) -> Result<()> {
                let domain = Domain::new().and(DomainTerm::new("id", "=", move_id.into_inner()));
                let found = self
                    .rpc
                    .search(MOVE_MODEL, domain, vec!["id".to_owned()], Some(1))
                    $( .$await_ext )?;
                let records = found.map_err(|err| self.session.fail(err))?;
                let res_id = records
                    .first()
                    .and_then(|record| record.get("id"))
                    .and_then(Value::as_i64)
                    .unwrap_or_else(|| move_id.into_inner());
                self.host().dispatch(ActionDescriptor::form(MOVE_MODEL, res_id));
                Ok(())
            }

            /// Payload behind the current table.
            ///
            /// # Errors
            ///
            /// Returns [`crate::error::ReportError::Backend`] if the state
            /// lock is poisoned.
            #[inline]
            pub fn payload(&self) -> Result<Option<ReportPayload>> {
                self.session.payload()
            }

            /// Copy of the rendered regions.
            ///
            /// # Errors
            ///
            /// Returns [`crate::error::ReportError::Backend`] if the state
            /// lock is poisoned.
            #[inline]
            pub fn snapshot(&self) -> Result<ViewSnapshot> {
                self.session.snapshot()
            }
        }
    };
}

#[cfg(feature = "async")]
mod async_view {
    //! Async report view.

    use serde_json::{Map, Value};

    use super::state::{Session, report_failure};
    use super::{Applied, MOVE_MODEL, OpenContext, VIEW_REPORT, ViewSnapshot};
    use crate::error::Result;
    use crate::filter_panel::FilterPanel;
    use crate::host::Host;
    use crate::models::{
        AccountId, ActionDescriptor, Domain, DomainTerm, MoveId, ReportKind, ReportLineId,
        ReportPayload, WizardId,
    };
    use crate::render::Toggle;

    define_report_view! {
        view_name: ReportView,
        rpc_trait: crate::rpc::Rpc,
        view_doc: "Async controller of one report view.\n\nUse [`ReportView::open`] to create the wizard and render the first load.",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_view {
    //! Blocking report view.

    use serde_json::{Map, Value};

    use super::state::{Session, report_failure};
    use super::{Applied, MOVE_MODEL, OpenContext, VIEW_REPORT, ViewSnapshot};
    use crate::error::Result;
    use crate::filter_panel::FilterPanel;
    use crate::host::Host;
    use crate::models::{
        AccountId, ActionDescriptor, Domain, DomainTerm, MoveId, ReportKind, ReportLineId,
        ReportPayload, WizardId,
    };
    use crate::render::Toggle;

    define_report_view! {
        view_name: BlockingReportView,
        rpc_trait: crate::rpc::BlockingRpc,
        view_doc: "Blocking controller of one report view.\n\nUse [`BlockingReportView::open`] to create the wizard and render the first load.",
    }
}

#[cfg(feature = "async")]
pub use async_view::ReportView;
#[cfg(feature = "blocking")]
pub use blocking_view::BlockingReportView;


#[cfg(all(test, feature = "blocking"))]
mod blocking_tests {
    use serde_json::json;

    use super::*;
    use crate::filter_panel::{FilterCategory, FilterPanel};
    use crate::host::RecordingHost;
    use crate::models::{FilterEcho, FilterOption, ReportKind, ReportPayload};
    use crate::rpc::InMemoryRpc;

    #[test]
    fn blocking_view_opens_and_applies() {
        let payload = ReportPayload {
            filters: FilterEcho {
                journals_list: vec![FilterOption {
                    id: 2,
                    name: "Bank".to_owned(),
                    code: Some("BNK".to_owned()),
                }],
                ..FilterEcho::default()
            },
            ..ReportPayload::default()
        };
        let host = RecordingHost::new();
        let view = BlockingReportView::open(
            InMemoryRpc::new().with_report(ReportKind::GeneralLedger, payload.clone()),
            &host,
            ReportKind::GeneralLedger,
            "General Ledger",
            OpenContext::default(),
        )
        .unwrap();

        let mut panel = FilterPanel::from_echo(ReportKind::GeneralLedger, &payload.filters);
        assert!(panel.select(FilterCategory::Journals, "2"));
        panel.set_date_from("2024-01-01");
        assert_eq!(view.apply_filters(&mut panel).unwrap(), Applied::Rendered);
        assert_eq!(
            view.rpc().wizard_values(view.wizard()),
            Some(json!({"journal_ids": [2], "date_from": "2024-01-01"}))
        );
        assert_eq!(panel.summary("journal_res"), "BNK");
    }
}
