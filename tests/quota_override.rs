//! The ignore-quotas override disables every gate.
//!
//! Lives in its own test binary: the override is process-wide, so it must
//! not share a process with tests that assert quota enforcement.

use reachbot::ratelimit::{QuotaTracker, IGNORE_QUOTAS_ENV};
use tempfile::TempDir;

#[test]
fn override_disables_all_quota_gates() {
    // SAFETY: single-threaded at this point; this binary holds no other tests.
    unsafe { std::env::set_var(IGNORE_QUOTAS_ENV, "1") };

    let dir = TempDir::new().unwrap();
    let quotas = QuotaTracker::new(dir.path().join("quotas.json"));

    for _ in 0..50 {
        quotas.check("connect", 1).unwrap();
        quotas.check_and_increment("connect", 1).unwrap();
        quotas.increment("message").unwrap();
    }

    // The override short-circuits before storage I/O: nothing was written.
    assert!(!dir.path().join("quotas.json").exists());
}
