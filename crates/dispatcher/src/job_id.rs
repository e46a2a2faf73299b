//! Job identifiers.
//!
//! Callers may pin an id (idempotent resubmit); otherwise one is derived from
//! the command text and the submission time, so identical commands submitted
//! twice still get distinct ids.

use chrono::{DateTime, SecondsFormat, Utc};
use settings::constants::jobs::DERIVED_ID_LENGTH;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Disambiguates submissions that land on the same clock reading.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Derive an id for `text` submitted now.
pub fn derive_job_id(text: &str) -> String {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    derive_job_id_at(text, Utc::now(), sequence)
}

/// Deterministic form of [`derive_job_id`]: first 12 hex chars of
/// SHA-256 over the text, an RFC 3339 nanosecond timestamp and a sequence
/// number.
pub fn derive_job_id_at(text: &str, at: DateTime<Utc>, sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    hasher.update(sequence.to_le_bytes());
    let digest = hasher.finalize();

    let mut id: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    id.truncate(DERIVED_ID_LENGTH);
    id
}
