/*!
# FLRT - query URL generator for IBM Power inventories

Builds FLRT (Fix Level Recommendation Tool) query URLs from:
- saved FLRT inventory files (`key=value` lines)
- directories of compressed AIX/VIOS snap archives

Both inputs produce [`MachineRecord`]s, rendered by [`QueryBuilder`].
*/

pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod query;
pub mod snapshot;

pub use config::FlrtConfig;
pub use models::{FieldValue, MachineRecord, PartitionKey, PartitionRecord, ReportsCollection};
pub use query::{QueryBuilder, ReportFormat};
pub use snapshot::{ScanOutcome, SnapScanner};
