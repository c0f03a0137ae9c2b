//! JSON-RPC client for the ERP server.
//!
//! Provides both async and blocking client variants behind feature flags.
//! Both speak JSON-RPC 2.0 against `{base}/jsonrpc`: they authenticate
//! once through the `common` service, cache the user id, and send model
//! calls through `object.execute_kw`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReportError, Result};
use crate::models::WizardId;

/// JSON-RPC endpoint, relative to the server base URL.
const JSONRPC_PATH: &str = "jsonrpc";

/// Service exposing authentication.
const COMMON_SERVICE: &str = "common";

/// Service exposing model methods.
const OBJECT_SERVICE: &str = "object";

/// Request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest<'req> {
    /// Protocol version, always `2.0`.
    jsonrpc: &'static str,
    /// Always `call`.
    method: &'static str,
    /// Request id.
    id: u64,
    /// Service call.
    params: RpcParams<'req>,
}

/// Service call inside a request.
#[derive(Debug, Serialize)]
struct RpcParams<'req> {
    /// Target service.
    service: &'req str,
    /// Service method.
    method: &'req str,
    /// Positional arguments.
    args: Vec<Value>,
}

/// Response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    /// Call result.
    #[serde(default)]
    result: Option<Value>,
    /// Call failure.
    #[serde(default)]
    error: Option<RpcFault>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcFault {
    /// Error code.
    #[serde(default)]
    code: i64,
    /// Generic message (`Odoo Server Error`).
    #[serde(default)]
    message: String,
    /// Server exception details.
    #[serde(default)]
    data: Option<RpcFaultData>,
}

/// Exception details of a [`RpcFault`].
#[derive(Debug, Deserialize)]
struct RpcFaultData {
    /// Exception message shown to users.
    #[serde(default)]
    message: String,
}

/// Unwraps a response envelope; `label` names the failed call.
fn into_result(response: RpcResponse, label: &str) -> Result<Value> {
    if let Some(fault) = response.error {
        let message = fault
            .data
            .map(|data| data.message)
            .filter(|message| !message.is_empty())
            .unwrap_or(fault.message);
        tracing::debug!(method = %label, code = fault.code, message = %message, "remote call rejected");
        return Err(ReportError::Remote {
            method: label.to_owned(),
            code: fault.code,
            message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// Reads the id returned by `create`, which is a number or a one-element
/// list depending on the server version.
fn wizard_id(value: Value) -> Result<WizardId> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Created {
        /// Single record.
        One(i64),
        /// Batch of one.
        Many(Vec<i64>),
    }
    match serde_json::from_value(value)? {
        Created::One(id) => Ok(WizardId::new(id)),
        Created::Many(ids) => ids.first().copied().map(WizardId::new).ok_or_else(|| {
            ReportError::Remote {
                method: "create".to_owned(),
                code: 0,
                message: "server created no record".to_owned(),
            }
        }),
    }
}

/// Generates a JSON-RPC client (async or blocking) with builder, RPC trait
/// implementation, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        rpc_trait: $rpc_trait:path,
        http_type: $http_type:ty,
        response_type: $resp_type:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug, Default)]
        pub struct $builder {
            /// Server base URL.
            base_url: Option<String>,
            /// Database name.
            database: Option<String>,
            /// User login.
            login: Option<String>,
            /// User password or API key.
            password: Option<SecretString>,
            /// Context sent with every call.
            context: Context,
        }

        impl $builder {
            /// Sets the server base URL, e.g. `https://erp.example.com`.
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Sets the database name.
            #[inline]
            #[must_use]
            pub fn database<T: Into<String>>(mut self, database: T) -> Self {
                self.database = Some(database.into());
                self
            }

            /// Sets the user login.
            #[inline]
            #[must_use]
            pub fn login<T: Into<String>>(mut self, login: T) -> Self {
                self.login = Some(login.into());
                self
            }

            /// Sets the password or API key.
            #[inline]
            #[must_use]
            pub fn password<T: Into<String>>(mut self, password: T) -> Self {
                self.password = Some(SecretString::from(password.into()));
                self
            }

            /// Sets the context sent with every call (language, timezone,
            /// company).
            #[inline]
            #[must_use]
            pub fn context(mut self, context: Context) -> Self {
                self.context = context;
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`ReportError::MissingConfig`] if a required field
            /// was not provided, [`ReportError::Url`] if the base URL is
            /// invalid, and [`ReportError::Http`] if the HTTP client fails
            /// to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let raw = self.base_url.ok_or(ReportError::MissingConfig("base_url"))?;
                let database = self.database.ok_or(ReportError::MissingConfig("database"))?;
                let login = self.login.ok_or(ReportError::MissingConfig("login"))?;
                let password = self.password.ok_or(ReportError::MissingConfig("password"))?;

                let mut base = Url::parse(&raw)?;
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                let endpoint = base.join(JSONRPC_PATH)?;
                tracing::debug!(endpoint = %endpoint, database = %database, "building client");
                let http = <$http_type>::builder().build()?;

                Ok($client {
                    http,
                    endpoint,
                    database,
                    login,
                    password,
                    context: self.context,
                    uid: OnceLock::new(),
                    next_id: AtomicU64::new(1),
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// JSON-RPC endpoint.
            endpoint: Url,
            /// Database name.
            database: String,
            /// User login.
            login: String,
            /// User password or API key.
            password: SecretString,
            /// Context merged into every call.
            context: Context,
            /// User id, once authenticated.
            uid: OnceLock<i64>,
            /// Next JSON-RPC request id.
            next_id: AtomicU64,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub fn builder() -> $builder {
                $builder::default()
            }

            /// JSON-RPC endpoint the client posts to.
            #[inline]
            #[must_use]
            pub const fn endpoint(&self) -> &Url {
                &self.endpoint
            }

            /// Authenticates on first use and returns the user id.
            ///
            /// # Errors
            ///
            /// Returns [`ReportError::Authentication`] if the server
            /// rejects the credentials, or a transport error.
            #[inline]
            #[tracing::instrument(skip_all, fields(login = %self.login))]
            pub $($async_kw)? fn authenticate(&self) -> Result<i64> {
                if let Some(&uid) = self.uid.get() {
                    return Ok(uid);
                }
                let args = vec![
                    Value::from(self.database.as_str()),
                    Value::from(self.login.as_str()),
                    Value::from(self.password.expose_secret()),
                    Value::Object(Map::new()),
                ];
                let result = self
                    .call(COMMON_SERVICE, "authenticate", args, "authenticate")
                    $( .$await_ext )?
                    ?;
                let uid = result.as_i64().ok_or_else(|| ReportError::Authentication {
                    login: self.login.clone(),
                })?;
                tracing::debug!(uid, "authenticated");
                Ok(*self.uid.get_or_init(|| uid))
            }

            /// Calls `method` of `model` through `execute_kw`.
            ///
            /// # Errors
            ///
            /// Returns an error if authentication or the call fails.
            #[inline]
            #[tracing::instrument(skip_all, fields(model = %model, method = %method))]
            pub $($async_kw)? fn execute_kw(
                &self,
                model: &str,
                method: &str,
                args: Vec<Value>,
                kwargs: Map<String, Value>,
            ) -> Result<Value> {
                let uid = self.authenticate() $( .$await_ext )? ?;
                let call_args = vec![
                    Value::from(self.database.as_str()),
                    Value::from(uid),
                    Value::from(self.password.expose_secret()),
                    Value::from(model),
                    Value::from(method),
                    Value::Array(args),
                    Value::Object(kwargs),
                ];
                self.call(OBJECT_SERVICE, "execute_kw", call_args, method)
                    $( .$await_ext )?
            }

            /// Keyword arguments carrying the client context.
            fn context_kwargs(&self, extra: Context) -> Map<String, Value> {
                let mut context = self.context.clone();
                context.extend(extra);
                let mut kwargs = Map::new();
                let _previous = kwargs.insert("context".to_owned(), Value::Object(context));
                kwargs
            }

            /// Posts one JSON-RPC request and unwraps the envelope.
            #[tracing::instrument(skip_all, fields(service = %service, label = %label))]
            $($async_kw)? fn call(
                &self,
                service: &str,
                method: &str,
                args: Vec<Value>,
                label: &str,
            ) -> Result<Value> {
                let request = RpcRequest {
                    jsonrpc: "2.0",
                    method: "call",
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    params: RpcParams {
                        service,
                        method,
                        args,
                    },
                };
                tracing::trace!(id = request.id, "sending JSON-RPC request");
                let response: $resp_type = self
                    .http
                    .post(self.endpoint.clone())
                    .json(&request)
                    .send()
                    $( .$await_ext )?
                    ?;

                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if !status.is_success() {
                    let message = response
                        .text()
                        $( .$await_ext )?
                        .unwrap_or_else(|_| "unknown error".to_owned());
                    tracing::debug!(status = status.as_u16(), message = %message, "API error");
                    return Err(ReportError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                let body = response.text() $( .$await_ext )? ?;
                tracing::trace!(body_len = body.len(), "parsing response body");
                let envelope: RpcResponse = serde_json::from_str(&body)?;
                into_result(envelope, label)
            }
        }

        impl $rpc_trait for $client {
            #[inline]
            #[tracing::instrument(skip_all, fields(model = %model))]
            $($async_kw)? fn create(
                &self,
                model: &str,
                values: Value,
                context: Context,
            ) -> Result<WizardId> {
                let kwargs = self.context_kwargs(context);
                let result = self
                    .execute_kw(model, "create", vec![values], kwargs)
                    $( .$await_ext )?
                    ?;
                wizard_id(result)
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(model = %model, id = id, method = %method))]
            $($async_kw)? fn invoke(
                &self,
                model: &str,
                id: i64,
                method: &str,
                args: Vec<Value>,
            ) -> Result<Value> {
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push(Value::from(vec![id]));
                full_args.extend(args);
                let kwargs = self.context_kwargs(Context::new());
                self.execute_kw(model, method, full_args, kwargs) $( .$await_ext )?
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(model = %model, id = id))]
            $($async_kw)? fn write(&self, model: &str, id: i64, values: Value) -> Result<()> {
                let args = vec![Value::from(vec![id]), values];
                let kwargs = self.context_kwargs(Context::new());
                let _written = self
                    .execute_kw(model, "write", args, kwargs)
                    $( .$await_ext )?
                    ?;
                Ok(())
            }

            #[inline]
            #[tracing::instrument(skip_all, fields(model = %model))]
            $($async_kw)? fn search(
                &self,
                model: &str,
                domain: Domain,
                fields: Vec<String>,
                limit: Option<u32>,
            ) -> Result<Vec<Record>> {
                let mut kwargs = self.context_kwargs(Context::new());
                let _fields = kwargs.insert("fields".to_owned(), Value::from(fields));
                if let Some(limit) = limit {
                    let _limit = kwargs.insert("limit".to_owned(), Value::from(limit));
                }
                let args = vec![serde_json::to_value(&domain)?];
                let result = self
                    .execute_kw(model, "search_read", args, kwargs)
                    $( .$await_ext )?
                    ?;
                Ok(serde_json::from_value(result)?)
            }
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            fn configured() -> $builder {
                $client::builder()
                    .base_url("http://localhost:8069")
                    .database("demo")
                    .login("admin")
                    .password("admin")
            }

            #[test]
            fn builder_requires_every_field() {
                let missing = $client::builder()
                    .base_url("http://localhost:8069")
                    .database("demo")
                    .login("admin")
                    .build()
                    .unwrap_err();
                assert!(matches!(missing, ReportError::MissingConfig("password")));
                let missing = $client::builder().build().unwrap_err();
                assert!(matches!(missing, ReportError::MissingConfig("base_url")));
            }

            #[test]
            fn builder_joins_endpoint() {
                let client = configured().build().unwrap();
                assert_eq!(client.endpoint().as_str(), "http://localhost:8069/jsonrpc");
                let client = configured()
                    .base_url("http://localhost:8069/erp")
                    .build()
                    .unwrap();
                assert_eq!(client.endpoint().as_str(), "http://localhost:8069/erp/jsonrpc");
            }

            #[test]
            fn builder_rejects_invalid_url() {
                let err = configured().base_url("not a url").build().unwrap_err();
                assert!(matches!(err, ReportError::Url(_)));
            }

            #[test]
            fn debug_redacts_password() {
                let client = configured().password("hunter2").build().unwrap();
                let debug = format!("{client:?}");
                assert!(!debug.contains("hunter2"));
            }
        }
    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async JSON-RPC client.

    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::OnceLock;

    use secrecy::{ExposeSecret, SecretString};
    use serde_json::{Map, Value};
    use url::Url;

    use super::{
        COMMON_SERVICE, JSONRPC_PATH, OBJECT_SERVICE, RpcParams, RpcRequest, RpcResponse,
        into_result, wizard_id,
    };
    use crate::error::{ReportError, Result};
    use crate::models::{Context, Domain, Record, WizardId};

    define_client! {
        client_name: OdooClient,
        builder_name: OdooClientBuilder,
        rpc_trait: crate::rpc::Rpc,
        http_type: reqwest::Client,
        response_type: reqwest::Response,
        client_doc: "Async JSON-RPC client for the ERP server.\n\nUse [`OdooClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing an [`OdooClient`].",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) JSON-RPC client.

    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::OnceLock;

    use secrecy::{ExposeSecret, SecretString};
    use serde_json::{Map, Value};
    use url::Url;

    use super::{
        COMMON_SERVICE, JSONRPC_PATH, OBJECT_SERVICE, RpcParams, RpcRequest, RpcResponse,
        into_result, wizard_id,
    };
    use crate::error::{ReportError, Result};
    use crate::models::{Context, Domain, Record, WizardId};

    define_client! {
        client_name: OdooBlockingClient,
        builder_name: OdooBlockingClientBuilder,
        rpc_trait: crate::rpc::BlockingRpc,
        http_type: reqwest::blocking::Client,
        response_type: reqwest::blocking::Response,
        client_doc: "Blocking (synchronous) JSON-RPC client for the ERP server.\n\nUse [`OdooBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing an [`OdooBlockingClient`].",
    }
}

#[cfg(feature = "async")]
pub use async_client::{OdooClient, OdooClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{OdooBlockingClient, OdooBlockingClientBuilder};
