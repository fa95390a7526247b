//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for a spawned server to answer `GET /`.
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness probes.
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Per-request timeout of the test client.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long a test waits for a job to reach a terminal status.
pub const JOB_COMPLETION_TIMEOUT_MS: u64 = 10_000;

/// Delay between status polls.
pub const JOB_POLL_INTERVAL_MS: u64 = 20;

/// Fetch timeout used by the test servers; hanging downloads hit it quickly.
pub const TEST_FETCH_TIMEOUT_MS: u64 = 300;

// ============================================================================
// Search fixtures
// ============================================================================

/// Query the fake search backend answers with zero results.
pub const NO_MATCH_QUERY: &str = "asdfgh";

/// Query the fake search backend fails on, as if the tool could not be run.
pub const UNAVAILABLE_QUERY: &str = "search-is-down";

/// Requester identity used in tests.
pub const TEST_REQUESTER: &str = "U0123456789";
