pub mod invite_service;
pub mod metrics;
pub mod progress_service;
pub mod settlement_service;
pub mod stats_service;

pub use invite_service::{InviteResponse, InviteService, InviteView};
pub use progress_service::ProgressService;
pub use settlement_service::{PaymentUpdate, SettlementError, SettlementService};
pub use stats_service::StatsService;
