pub mod backfill;
pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod workflow;

pub use backfill::{AbsenceBackfill, BackfillOptions, BackfillReport};
pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use repositories::RepositoryError;
pub use workflow::{AppliedTransition, WorkflowService};
