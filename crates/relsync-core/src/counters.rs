//! Per-category outcome tallies for a reconciliation run.

use serde::Serialize;

/// Outcome counters, zeroed at process start and incremented exactly once per
/// row per record type. Read once at the end for the summary report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub links_created: u64,
    pub links_skipped: u64,
    pub links_failed: u64,

    pub deps_created: u64,
    pub deps_updated: u64,
    pub deps_skipped: u64,
    pub deps_failed: u64,
    pub deps_update_failed: u64,

    pub imps_created: u64,
    pub imps_updated: u64,
    pub imps_skipped: u64,
    pub imps_failed: u64,
    pub imps_update_failed: u64,

    pub remove_links_success: u64,
    pub remove_links_skipped: u64,
    pub remove_links_failed: u64,

    pub remove_deps_success: u64,
    pub remove_deps_skipped: u64,
    pub remove_deps_failed: u64,

    pub remove_imps_success: u64,
    pub remove_imps_skipped: u64,
    pub remove_imps_failed: u64,
}

impl Counters {
    /// Total number of remote mutations that succeeded.
    pub fn total_changes(&self) -> u64 {
        self.links_created
            + self.deps_created
            + self.deps_updated
            + self.imps_created
            + self.imps_updated
            + self.remove_links_success
            + self.remove_deps_success
            + self.remove_imps_success
    }

    /// Returns whether the run completed without any failed mutation.
    pub fn is_clean(&self) -> bool {
        self.links_failed
            + self.deps_failed
            + self.deps_update_failed
            + self.imps_failed
            + self.imps_update_failed
            + self.remove_links_failed
            + self.remove_deps_failed
            + self.remove_imps_failed
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_zeroed() {
        let counters = Counters::default();
        assert_eq!(counters.total_changes(), 0);
        assert!(counters.is_clean());
    }

    #[test]
    fn test_total_changes_counts_successes_only() {
        let counters = Counters {
            links_created: 3,
            links_skipped: 10,
            deps_updated: 2,
            remove_imps_success: 1,
            ..Default::default()
        };
        assert_eq!(counters.total_changes(), 6);
    }

    #[test]
    fn test_is_clean_flags_any_failure() {
        let counters = Counters {
            links_created: 5,
            imps_update_failed: 1,
            ..Default::default()
        };
        assert!(!counters.is_clean());
    }
}
