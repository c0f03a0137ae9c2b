//! In-memory ERP server for testing.
//!
//! Provides [`InMemoryRpc`], a thread-safe fake implementing both RPC
//! traits. It keeps wizards and the values written to them, answers
//! `view_report` with configured payloads, evaluates search domains
//! against configured records, and logs every call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use serde_json::{Map, Value};

use crate::error::{ReportError, Result};
use crate::models::{Context, Domain, Record, ReportKind, ReportPayload, WizardId};

/// JSON-RPC error code the server uses for application errors.
const SERVER_ERROR_CODE: i64 = 200;

/// Method answering with the report data.
const VIEW_REPORT: &str = "view_report";

/// One call received by [`InMemoryRpc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    /// Model method (`create`, `write`, `search_read`, or the invoked
    /// method name).
    pub method: String,
    /// Target model.
    pub model: String,
    /// Record id, for calls on an existing record.
    pub id: Option<i64>,
    /// Values, arguments, or domain of the call.
    pub payload: Value,
}

/// A wizard record.
#[derive(Debug, Clone)]
struct Wizard {
    /// Model it was created on.
    model: String,
    /// Stored field values.
    values: Map<String, Value>,
    /// Context it was created with.
    context: Context,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Last assigned record id.
    last_id: i64,
    /// Wizards by id.
    wizards: BTreeMap<i64, Wizard>,
    /// `view_report` answers by model.
    reports: HashMap<String, ReportPayload>,
    /// Searchable records by model.
    records: HashMap<String, Vec<Record>>,
    /// Methods that fail, with their error message.
    rejections: HashMap<String, String>,
    /// Call log.
    calls: Vec<RpcCall>,
}

impl Inner {
    /// Logs a call and fails it if `method` is rejected.
    fn admit(&mut self, method: &str, model: &str, id: Option<i64>, payload: Value) -> Result<()> {
        self.calls.push(RpcCall {
            method: method.to_owned(),
            model: model.to_owned(),
            id,
            payload,
        });
        match self.rejections.get(method) {
            Some(message) => Err(remote(method, message.clone())),
            None => Ok(()),
        }
    }

    /// Finds wizard `id` of `model`.
    fn wizard_mut(&mut self, method: &str, model: &str, id: i64) -> Result<&mut Wizard> {
        self.wizards
            .get_mut(&id)
            .filter(|wizard| wizard.model == model)
            .ok_or_else(|| remote(method, format!("record {model}({id}) does not exist")))
    }

    /// Creates a wizard.
    fn create(&mut self, model: &str, values: Value, context: Context) -> Result<WizardId> {
        self.admit("create", model, None, values.clone())?;
        let Value::Object(values) = values else {
            return Err(remote("create", "values must be an object".to_owned()));
        };
        self.last_id += 1;
        let id = self.last_id;
        let _previous = self.wizards.insert(
            id,
            Wizard {
                model: model.to_owned(),
                values,
                context,
            },
        );
        Ok(WizardId::new(id))
    }

    /// Calls a model method on a wizard.
    fn invoke(&mut self, model: &str, id: i64, method: &str, args: Vec<Value>) -> Result<Value> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(Value::from(vec![id]));
        full_args.extend(args);
        self.admit(method, model, Some(id), Value::Array(full_args))?;
        let _wizard = self.wizard_mut(method, model, id)?;
        if method != VIEW_REPORT {
            return Err(remote(method, format!("{model} has no method {method}")));
        }
        let payload = self.reports.get(model).cloned().unwrap_or_default();
        Ok(serde_json::to_value(payload)?)
    }

    /// Merges values into a wizard.
    fn write(&mut self, model: &str, id: i64, values: Value) -> Result<()> {
        self.admit("write", model, Some(id), values.clone())?;
        let Value::Object(values) = values else {
            return Err(remote("write", "values must be an object".to_owned()));
        };
        let wizard = self.wizard_mut("write", model, id)?;
        wizard.values.extend(values);
        Ok(())
    }

    /// Searches configured records.
    fn search(
        &mut self,
        model: &str,
        domain: &Domain,
        fields: &[String],
        limit: Option<u32>,
    ) -> Result<Vec<Record>> {
        self.admit("search_read", model, None, serde_json::to_value(domain)?)?;
        let limit = limit.map_or(usize::MAX, |limit| {
            usize::try_from(limit).unwrap_or(usize::MAX)
        });
        Ok(self
            .records
            .get(model)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| domain.matches(record))
                    .take(limit)
                    .map(|record| project(record, fields))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Keeps only `fields` of `record`; an empty list keeps everything.
fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    record
        .iter()
        .filter(|&(name, _)| fields.contains(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Builds the error the server returns for a rejected call.
fn remote(method: &str, message: String) -> ReportError {
    ReportError::Remote {
        method: method.to_owned(),
        code: SERVER_ERROR_CODE,
        message,
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> ReportError {
    ReportError::Backend(err.to_string().into())
}

/// Thread-safe in-memory ERP server.
///
/// Implements both [`super::Rpc`] (async) and [`super::BlockingRpc`]
/// (blocking).
///
/// # Example
///
/// ```rust
/// use dynamic_reports::models::{ReportKind, ReportPayload};
/// use dynamic_reports::rpc::InMemoryRpc;
///
/// let rpc = InMemoryRpc::new().with_report(ReportKind::GeneralLedger, ReportPayload::default());
/// rpc.reject("write", "Access Denied");
/// assert!(rpc.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRpc {
    /// All state behind a single mutex.
    inner: Mutex<Inner>,
}

impl InMemoryRpc {
    /// Creates a server with no wizards, reports or records.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `payload` from `view_report` on wizards of `kind`.
    #[inline]
    #[must_use]
    pub fn with_report(self, kind: ReportKind, payload: ReportPayload) -> Self {
        self.set_report(kind, payload);
        self
    }

    /// Makes `records` searchable under `model`.
    #[inline]
    #[must_use]
    pub fn with_records(self, model: &str, records: Vec<Record>) -> Self {
        self.with_inner(|inner| {
            let _previous = inner.records.insert(model.to_owned(), records);
        });
        self
    }

    /// Replaces the payload served for `kind`.
    #[inline]
    pub fn set_report(&self, kind: ReportKind, payload: ReportPayload) {
        self.with_inner(|inner| {
            let _previous = inner.reports.insert(kind.model().to_owned(), payload);
        });
    }

    /// Makes every call of `method` fail with a remote error carrying
    /// `message`.
    #[inline]
    pub fn reject(&self, method: &str, message: &str) {
        self.with_inner(|inner| {
            let _previous = inner
                .rejections
                .insert(method.to_owned(), message.to_owned());
        });
    }

    /// Lets `method` succeed again.
    #[inline]
    pub fn accept(&self, method: &str) {
        self.with_inner(|inner| {
            let _previous = inner.rejections.remove(method);
        });
    }

    /// All calls received so far, in order.
    #[inline]
    #[must_use]
    pub fn calls(&self) -> Vec<RpcCall> {
        self.with_inner(|inner| inner.calls.clone())
    }

    /// Calls of `method`, in order.
    #[inline]
    #[must_use]
    pub fn calls_to(&self, method: &str) -> Vec<RpcCall> {
        self.with_inner(|inner| {
            inner
                .calls
                .iter()
                .filter(|call| call.method == method)
                .cloned()
                .collect()
        })
    }

    /// Stored values of wizard `id`.
    #[inline]
    #[must_use]
    pub fn wizard_values(&self, id: WizardId) -> Option<Value> {
        self.with_inner(|inner| {
            inner
                .wizards
                .get(&id.into_inner())
                .map(|wizard| Value::Object(wizard.values.clone()))
        })
    }

    /// Context wizard `id` was created with.
    #[inline]
    #[must_use]
    pub fn wizard_context(&self, id: WizardId) -> Option<Context> {
        self.with_inner(|inner| {
            inner
                .wizards
                .get(&id.into_inner())
                .map(|wizard| wizard.context.clone())
        })
    }

    /// Applies a closure to the state, recovering from poisoning. Used
    /// by configuration and inspection helpers, which cannot fail.
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut inner)
    }

    /// Acquires the lock and applies a fallible closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        f(&mut inner)
    }
}

// ── BlockingRpc implementation ──────────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingRpc for InMemoryRpc {
    #[inline]
    fn create(&self, model: &str, values: Value, context: Context) -> Result<WizardId> {
        self.with_lock(|inner| inner.create(model, values, context))
    }

    #[inline]
    fn invoke(&self, model: &str, id: i64, method: &str, args: Vec<Value>) -> Result<Value> {
        self.with_lock(|inner| inner.invoke(model, id, method, args))
    }

    #[inline]
    fn write(&self, model: &str, id: i64, values: Value) -> Result<()> {
        self.with_lock(|inner| inner.write(model, id, values))
    }

    #[inline]
    fn search(
        &self,
        model: &str,
        domain: Domain,
        fields: Vec<String>,
        limit: Option<u32>,
    ) -> Result<Vec<Record>> {
        self.with_lock(|inner| inner.search(model, &domain, &fields, limit))
    }
}

// ── Rpc implementation ──────────────────────────────────────────────────

#[cfg(feature = "async")]
impl super::Rpc for InMemoryRpc {
    #[inline]
    fn create(
        &self,
        model: &str,
        values: Value,
        context: Context,
    ) -> impl Future<Output = Result<WizardId>> + Send {
        future::ready(self.with_lock(|inner| inner.create(model, values, context)))
    }

    #[inline]
    fn invoke(
        &self,
        model: &str,
        id: i64,
        method: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value>> + Send {
        future::ready(self.with_lock(|inner| inner.invoke(model, id, method, args)))
    }

    #[inline]
    fn write(&self, model: &str, id: i64, values: Value) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| inner.write(model, id, values)))
    }

    #[inline]
    fn search(
        &self,
        model: &str,
        domain: Domain,
        fields: Vec<String>,
        limit: Option<u32>,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send {
        future::ready(self.with_lock(|inner| inner.search(model, &domain, &fields, limit)))
    }
}

#[cfg(all(test, feature = "blocking"))]
mod tests {
    use super::*;
    use crate::models::DomainTerm;
    use crate::rpc::BlockingRpc;
    use serde_json::json;

    const MODEL: &str = "account.general.ledger";

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let rpc = InMemoryRpc::new();
        let first = rpc.create(MODEL, json!({}), Context::new()).unwrap();
        let second = rpc.create(MODEL, json!({}), Context::new()).unwrap();
        assert!(second > first);
        assert_eq!(rpc.wizard_values(first), Some(json!({})));
    }

    #[test]
    fn write_merges_values_and_logs_payload() {
        let rpc = InMemoryRpc::new();
        let id = rpc.create(MODEL, json!({"target_move": "posted"}), Context::new()).unwrap();
        rpc.write(MODEL, id.into_inner(), json!({"account_ids": [5, 7]}))
            .unwrap();
        assert_eq!(
            rpc.wizard_values(id),
            Some(json!({"target_move": "posted", "account_ids": [5, 7]}))
        );
        let writes = rpc.calls_to("write");
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].payload, json!({"account_ids": [5, 7]}));
    }

    #[test]
    fn invoke_prepends_record_id_and_serves_report() {
        let payload = ReportPayload {
            name: "General Ledger".to_owned(),
            ..ReportPayload::default()
        };
        let rpc = InMemoryRpc::new().with_report(ReportKind::GeneralLedger, payload);
        let id = rpc.create(MODEL, json!({}), Context::new()).unwrap();
        let result = rpc
            .invoke(MODEL, id.into_inner(), VIEW_REPORT, vec![json!(["General Ledger"])])
            .unwrap();
        assert_eq!(result["name"], "General Ledger");
        let call = &rpc.calls_to(VIEW_REPORT)[0];
        assert_eq!(call.payload, json!([[1], ["General Ledger"]]));
    }

    #[test]
    fn unknown_wizard_and_method_fail_remotely() {
        let rpc = InMemoryRpc::new();
        let err = rpc.invoke(MODEL, 99, VIEW_REPORT, Vec::new()).unwrap_err();
        assert!(err.is_remote_call());
        let id = rpc.create(MODEL, json!({}), Context::new()).unwrap();
        let err = rpc
            .invoke(MODEL, id.into_inner(), "unlink", Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("unlink"));
    }

    #[test]
    fn rejected_method_fails_until_accepted() {
        let rpc = InMemoryRpc::new();
        rpc.reject("create", "Access Denied");
        let err = rpc.create(MODEL, json!({}), Context::new()).unwrap_err();
        assert!(matches!(err, ReportError::Remote { ref method, .. } if method == "create"));
        rpc.accept("create");
        assert!(rpc.create(MODEL, json!({}), Context::new()).is_ok());
    }

    #[test]
    fn search_filters_projects_and_limits() {
        let rpc = InMemoryRpc::new().with_records(
            "account.move",
            vec![
                record(json!({"id": 1, "name": "INV/1", "state": "posted"})),
                record(json!({"id": 2, "name": "INV/2", "state": "posted"})),
                record(json!({"id": 3, "name": "INV/3", "state": "draft"})),
            ],
        );
        let domain = Domain::new().and(DomainTerm::new("state", "=", "posted"));
        let found = rpc
            .search("account.move", domain, vec!["id".to_owned()], Some(1))
            .unwrap();
        assert_eq!(found, vec![record(json!({"id": 1}))]);
        let none = rpc
            .search("res.partner", Domain::new(), Vec::new(), None)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn create_keeps_context() {
        let rpc = InMemoryRpc::new();
        let mut context = Context::new();
        let _previous = context.insert("account_id".to_owned(), json!(5));
        let id = rpc.create(MODEL, json!({}), context.clone()).unwrap();
        assert_eq!(rpc.wizard_context(id), Some(context));
    }
}
