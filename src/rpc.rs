//! Remote procedure surface of the ERP server.
//!
//! This module defines the [`Rpc`] (async) and [`BlockingRpc`]
//! (blocking) traits via a shared macro, so both variants expose the
//! same four operations a report view needs.

mod memory;

pub use memory::{InMemoryRpc, RpcCall};

/// Generates an RPC trait (async or blocking) from one method list.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_rpc {
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_rpc!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_rpc!(@methods blocking);
        }
    };

    (@methods $mode:ident) => {
        define_rpc!(@method $mode, create,
            "Creates a record of `model` (a report wizard) and returns its id.\n\n# Errors\n\nReturns an error if the call fails or the server rejects it.",
            model: &str, values: Value, context: Context, -> Result<WizardId>);
        define_rpc!(@method $mode, invoke,
            "Calls `method` on record `id` of `model`; `[id]` is prepended to `args`.\n\n# Errors\n\nReturns an error if the call fails or the server rejects it.",
            model: &str, id: i64, method: &str, args: Vec<Value>, -> Result<Value>);
        define_rpc!(@method $mode, write,
            "Writes `values` to record `id` of `model`.\n\n# Errors\n\nReturns an error if the call fails or the server rejects it.",
            model: &str, id: i64, values: Value, -> Result<()>);
        define_rpc!(@method $mode, search,
            "Reads `fields` of the records of `model` matching `domain`.\n\n# Errors\n\nReturns an error if the call fails or the server rejects it.",
            model: &str, domain: Domain, fields: Vec<String>, limit: Option<u32>, -> Result<Vec<Record>>);
    };

    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_rpc {
    //! Async RPC trait definition.

    use serde_json::Value;

    use crate::error::Result;
    use crate::models::{Context, Domain, Record, WizardId};

    define_rpc! {
        trait_name: Rpc,
        trait_doc: "Async access to the ERP server's model methods.\n\nAll methods take `&self`; implementations use interior mutability\nwhere they keep state.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_rpc {
    //! Blocking RPC trait definition.

    use serde_json::Value;

    use crate::error::Result;
    use crate::models::{Context, Domain, Record, WizardId};

    define_rpc! {
        trait_name: BlockingRpc,
        trait_doc: "Blocking access to the ERP server's model methods.\n\nAll methods take `&self`; implementations use interior mutability\nwhere they keep state.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_rpc::Rpc;
#[cfg(feature = "blocking")]
pub use blocking_rpc::BlockingRpc;
