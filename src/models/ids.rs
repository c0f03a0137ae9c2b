//! Typed server record ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Defines a record id: an `i64` newtype with the key it travels under
/// in action contexts and report rows.
macro_rules! define_record_id {
    (
        $(#[$meta:meta])*
        $name:ident => $key:literal
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Key of the id in contexts and report rows.
            pub const KEY: &'static str = $key;

            /// Wraps a server record id.
            #[inline]
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Server record id.
            #[inline]
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Value {
            #[inline]
            fn from(id: $name) -> Self {
                Self::from(id.0)
            }
        }
    };
}

define_record_id! {
    /// Identifier of a server-side report wizard.
    WizardId => "wizard_id"
}

define_record_id! {
    /// Identifier of a ledger account (`account.account`).
    AccountId => "account_id"
}

define_record_id! {
    /// Identifier of a journal entry (`account.move`).
    MoveId => "move_id"
}

define_record_id! {
    /// Identifier of a balance-sheet report line.
    ReportLineId => "r_id"
}
