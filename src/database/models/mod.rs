use serde::{de::DeserializeOwned, Serialize};

/// A row type stored in one table
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Human label used in not-found messages
    const NAME: &'static str;
}

/// Declares a string-valued status enum stored as text
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for crate::filter::FilterValue {
            fn from(value: $name) -> Self {
                crate::filter::FilterValue::Text(value.as_str().to_string())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod associate;
pub mod associate_profile;
pub mod contract;
pub mod entity;
pub mod expense;
pub mod invite;
pub mod invoice;
pub mod milestone;
pub mod payment;
pub mod project;
pub mod settlement;
pub mod task;
pub mod user;

pub use associate::{Associate, AssociateStatus};
pub use associate_profile::AssociateProfile;
pub use contract::Contract;
pub use entity::Entity;
pub use expense::{Expense, ExpenseCategory};
pub use invite::{Invite, InviteStatus};
pub use invoice::{Invoice, InvoiceStatus};
pub use milestone::{Milestone, MilestoneStatus};
pub use payment::{Payment, PaymentStatus};
pub use project::{Priority, Project, ProjectPhase, ProjectStatus};
pub use settlement::{Settlement, SettlementStatus};
pub use task::{Task, TaskStatus};
pub use user::{User, UserView};
