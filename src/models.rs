//! Data models exchanged with the report wizards.
//!
//! This module contains strongly-typed representations of filter
//! selections, report payloads, host action descriptors and search
//! domains, plus newtype ID wrappers and enumerations for constrained
//! values.

mod action;
mod domain;
mod enums;
mod filter;
mod ids;
mod report;

pub use action::{ActionDescriptor, PdfExportData, XlsxExportData};
pub use chrono::NaiveDate;
pub use domain::{Context, Domain, DomainTerm, Record};
pub use enums::{CurrencyPosition, DebitCredit, ReportKind, TargetMove};
pub use filter::{FilterKey, FilterSelection, FilterValue};
pub use ids::{AccountId, MoveId, ReportLineId, WizardId};
pub use report::{
    BalanceSheetLine, Currency, FilterEcho, FilterOption, LedgerLine, MoveLine, ReportPayload,
};
