//! Short job identifiers derived from a seed and a nanosecond timestamp.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length, in hex characters, of every generated job id.
pub const JOB_ID_LEN: usize = 16;

/// Generate a job id for `seed` using the current wall-clock time.
pub fn generate_job_id(seed: &str) -> String {
    let timestamp_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    job_id_at(seed, timestamp_nanos)
}

/// Deterministic core of [`generate_job_id`]: sha256 of seed and timestamp,
/// truncated to [`JOB_ID_LEN`] hex characters.
pub fn job_id_at(seed: &str, timestamp_nanos: u128) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b"\0");
    hasher.update(timestamp_nanos.to_le_bytes());
    let digest = hasher.finalize();

    digest
        .iter()
        .take(JOB_ID_LEN / 2)
        .map(|b| format!("{:02x}", b))
        .collect()
}
