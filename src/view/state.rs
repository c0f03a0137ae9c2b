//! Controller state shared by the async and blocking views.
//!
//! Everything here is synchronous: the views await remote calls first and
//! only then take the lock, so a guard is never held across an await.
//! Templates are rendered with the lock released, so a host may read the
//! view while rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::sequence::{RequestSequence, Ticket};
use super::{Applied, ViewSnapshot};
use crate::error::{ReportError, Result};
use crate::filter_panel::FilterPanel;
use crate::host::Host;
use crate::models::{AccountId, BalanceSheetLine, ReportKind, ReportLineId, ReportPayload, WizardId};
use crate::render::{self, Template, Toggle};

/// Logs a failure, shows it to the user and hands it back.
pub(crate) fn report_failure<H: Host>(host: &H, err: ReportError) -> ReportError {
    tracing::warn!(error = %err, remote = err.is_remote_call(), "report operation failed");
    host.notify(&err);
    err
}

/// Rendered markup per region.
#[derive(Debug, Default)]
struct Regions {
    /// Filter panel.
    filter_panel: Option<String>,
    /// Report table.
    table: Option<String>,
    /// Ledger sub-sections by account.
    subsections: BTreeMap<AccountId, String>,
}

/// Mutable controller state.
#[derive(Debug, Default)]
struct ViewState {
    /// Table request tickets.
    sequence: RequestSequence,
    /// Bumped on every table render; sub-sections of an older generation
    /// are stale.
    generation: u64,
    /// Payload behind the current table.
    payload: Option<Arc<ReportPayload>>,
    /// Expanded balance-sheet branches.
    expanded: BTreeSet<ReportLineId>,
    /// Rendered regions.
    regions: Regions,
}

impl ViewState {
    /// Replaces the table and resets everything derived from it.
    fn install_table(
        &mut self,
        payload: ReportPayload,
        expanded: BTreeSet<ReportLineId>,
        markup: String,
    ) {
        self.generation = self.generation.saturating_add(1);
        self.expanded = expanded;
        self.payload = Some(Arc::new(payload));
        self.regions.table = Some(markup);
        self.regions.subsections.clear();
    }
}

/// Host, identity and state of one report view.
#[derive(Debug)]
pub(crate) struct Session<H> {
    /// Embedding host.
    host: H,
    /// Report the view drives.
    kind: ReportKind,
    /// Report title passed to `view_report`.
    title: String,
    /// Wizard backing the view.
    wizard: WizardId,
    /// Mutable state.
    state: Mutex<ViewState>,
}

impl<H: Host> Session<H> {
    /// Creates a session with nothing rendered.
    pub(crate) fn new(host: H, kind: ReportKind, title: String, wizard: WizardId) -> Self {
        Self {
            host,
            kind,
            title,
            wizard,
            state: Mutex::new(ViewState::default()),
        }
    }

    /// Embedding host.
    pub(crate) const fn host(&self) -> &H {
        &self.host
    }

    /// Report the view drives.
    pub(crate) const fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Report title.
    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    /// Wizard backing the view.
    pub(crate) const fn wizard(&self) -> WizardId {
        self.wizard
    }

    /// Logs, notifies and returns `err`.
    pub(crate) fn fail(&self, err: ReportError) -> ReportError {
        report_failure(&self.host, err)
    }

    /// Acquires the state lock.
    fn lock(&self) -> Result<MutexGuard<'_, ViewState>> {
        self.state
            .lock()
            .map_err(|err| ReportError::Backend(err.to_string().into()))
    }

    /// Renders through the host, reporting failures.
    fn render(&self, template: &Template) -> Result<String> {
        self.host.render(template).map_err(|err| self.fail(err))
    }

    /// Issues the ticket of a new table request.
    pub(crate) fn begin_table(&self) -> Result<Ticket> {
        Ok(self.lock()?.sequence.issue())
    }

    /// Retires the ticket of a failed table request and hands `err` back,
    /// so an older request still in flight may render.
    pub(crate) fn abandon(&self, ticket: Ticket, err: ReportError) -> ReportError {
        match self.lock() {
            Ok(mut state) => state.sequence.retire(ticket),
            Err(lock_err) => tracing::warn!(error = %lock_err, "cannot retire table request"),
        }
        err
    }

    /// Current table generation.
    pub(crate) fn generation(&self) -> Result<u64> {
        Ok(self.lock()?.generation)
    }

    /// Renders the filter panel and the table of the first load.
    pub(crate) fn install_initial(&self, ticket: Ticket, payload: ReportPayload) -> Result<Applied> {
        let panel = FilterPanel::from_echo(self.kind, &payload.filters);
        let markup = self
            .render(&Template::FilterPanel(render::filter_panel(&panel)))
            .map_err(|err| self.abandon(ticket, err))?;
        self.lock()?.regions.filter_panel = Some(markup);
        self.install_table(ticket, payload)
    }

    /// Renders `payload` as the table if `ticket` is still the latest.
    pub(crate) fn install_table(&self, ticket: Ticket, payload: ReportPayload) -> Result<Applied> {
        {
            let mut state = self.lock()?;
            if !state.sequence.is_latest(ticket) {
                state.sequence.retire(ticket);
                tracing::debug!(ticket = ?ticket, "discarding stale table response");
                return Ok(Applied::Discarded);
            }
        }
        let expanded = render::branch_ids(&payload);
        let markup = self
            .render(&render::table(self.kind, &payload, &expanded))
            .map_err(|err| self.abandon(ticket, err))?;
        let mut state = self.lock()?;
        if !state.sequence.complete(ticket) {
            tracing::debug!(ticket = ?ticket, "table response superseded while rendering");
            return Ok(Applied::Discarded);
        }
        tracing::debug!(
            lines = payload.report_lines.len(),
            bs_lines = payload.bs_lines.len(),
            "table rendered"
        );
        state.install_table(payload, expanded, markup);
        Ok(Applied::Rendered)
    }

    /// Flips `line` between expanded and collapsed and re-renders the
    /// table from the cached payload. Returns the new state, or `None`
    /// when the line has no children, nothing is rendered yet, or the
    /// table changed while rendering.
    pub(crate) fn toggle(&self, line: ReportLineId) -> Result<Option<Toggle>> {
        let (payload, previous, generation) = {
            let state = self.lock()?;
            let Some(payload) = state.payload.as_ref() else {
                tracing::debug!(line = %line, "toggle before first render");
                return Ok(None);
            };
            (Arc::clone(payload), state.expanded.clone(), state.generation)
        };
        if !render::branch_ids(&payload).contains(&line) {
            tracing::debug!(line = %line, "toggle on a line without children");
            return Ok(None);
        }
        let mut expanded = previous.clone();
        let toggle = if expanded.remove(&line) {
            Toggle::Collapsed
        } else {
            let _inserted = expanded.insert(line);
            Toggle::Expanded
        };
        let markup = self.render(&render::table(self.kind, &payload, &expanded))?;
        let mut state = self.lock()?;
        if state.generation != generation || state.expanded != previous {
            tracing::debug!(line = %line, "table changed while toggling");
            return Ok(None);
        }
        state.expanded = expanded;
        state.regions.table = Some(markup);
        Ok(Some(toggle))
    }

    /// Balance-sheet lines of `payload` visible under the current
    /// expanded set.
    pub(crate) fn visible_lines(&self, payload: &ReportPayload) -> Result<Vec<BalanceSheetLine>> {
        let state = self.lock()?;
        Ok(render::visible_lines(payload, &state.expanded))
    }

    /// Whether a sub-section for `account` is rendered.
    pub(crate) fn has_subsection(&self, account: AccountId) -> Result<bool> {
        Ok(self.lock()?.regions.subsections.contains_key(&account))
    }

    /// Renders the journal items of `account` from `payload`, unless the
    /// table was re-rendered since `generation`.
    pub(crate) fn install_subsection(
        &self,
        generation: u64,
        account: AccountId,
        payload: &ReportPayload,
    ) -> Result<Applied> {
        let Some(line) = payload.ledger_line(account) else {
            tracing::warn!(account = %account, "no ledger line for account");
            return Ok(Applied::Unchanged);
        };
        if self.generation()? != generation {
            tracing::debug!(account = %account, "discarding sub-section of a replaced table");
            return Ok(Applied::Discarded);
        }
        let template = Template::LedgerSubsection(render::ledger_subsection(line, &payload.currency));
        let markup = self.render(&template)?;
        let mut state = self.lock()?;
        if state.generation != generation {
            tracing::debug!(account = %account, "table replaced while rendering sub-section");
            return Ok(Applied::Discarded);
        }
        let _previous = state.regions.subsections.insert(account, markup);
        Ok(Applied::Rendered)
    }

    /// Payload behind the current table.
    pub(crate) fn payload(&self) -> Result<Option<ReportPayload>> {
        Ok(self.lock()?.payload.as_deref().cloned())
    }

    /// Copy of the rendered regions.
    pub(crate) fn snapshot(&self) -> Result<ViewSnapshot> {
        let state = self.lock()?;
        Ok(ViewSnapshot {
            filter_panel: state.regions.filter_panel.clone(),
            table: state.regions.table.clone(),
            subsections: state.regions.subsections.clone(),
            expanded: state.expanded.clone(),
        })
    }
}
