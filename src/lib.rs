//! Typed client and view controllers for dynamic ERP financial reports.
//!
//! The crate drives the Profit & Loss / Balance Sheet and General Ledger
//! report views of an ERP server: it keeps a server-side report wizard
//! per view, collects filter selections from widget state, re-fetches
//! report data over JSON-RPC and re-renders report tables through a
//! pluggable [`host::Host`].

#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod error;
pub mod filter_panel;
pub mod host;
pub mod models;
pub mod money;
pub mod render;
pub mod rpc;
pub mod view;
