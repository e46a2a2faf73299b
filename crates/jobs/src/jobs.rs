//! Job persistence.
//!
//! [`JobStore`] keeps one text file of captured output per job id;
//! [`EventLog`] is the append-only NDJSON audit trail. Neither is read back
//! by the dispatcher.

mod events;
mod store;

pub use events::EventLog;
pub use store::{is_valid_job_id, JobStore, StoreError};
