//! Progress signal and quick-win computation

use crate::types::{DuplicateGroup, Event, ScanStatistics};
use std::collections::HashMap;

/// Build a [`Event::Progress`] snapshot from current scan state
pub fn progress_event(scan_id: &str, processed_issues: i64, total_issues: i64, stats: &ScanStatistics) -> Event {
    Event::Progress {
        scan_id: scan_id.to_string(),
        processed_issues,
        total_issues,
        total_files: stats.total_files,
        total_size: stats.total_size,
        duplicate_size: stats.duplicate_size,
    }
}

/// The top-3 groups by wasted bytes among those with `duplicate_count > 0`
pub fn quick_wins(catalog: &HashMap<String, DuplicateGroup>) -> Vec<DuplicateGroup> {
    let mut candidates: Vec<&DuplicateGroup> = catalog.values().filter(|g| g.duplicate_count > 0).collect();
    candidates.sort_by(|a, b| b.total_wasted_space.cmp(&a.total_wasted_space));
    candidates.into_iter().take(3).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;
    use chrono::Utc;

    fn group(fingerprint: &str, wasted: u64, duplicate_count: u64) -> DuplicateGroup {
        DuplicateGroup {
            fingerprint: fingerprint.into(),
            file_name: "a.bin".into(),
            file_size: 100,
            mime_type: "application/octet-stream".into(),
            canonical_issue_key: "P-1".into(),
            canonical_attachment_id: "1".into(),
            duplicate_count,
            total_wasted_space: wasted,
            author_name: "alice".into(),
            author_id: "alice".into(),
            created_at: Utc::now(),
            issue_status: "Open".into(),
            issue_status_category: "new".into(),
            issue_last_updated: Utc::now(),
            locations: vec![Location {
                issue_key: "P-1".into(),
                project_key: "P".into(),
                attachment_id: "1".into(),
                is_canonical: true,
                date_added: Utc::now(),
                author: "alice".into(),
            }],
        }
    }

    #[test]
    fn quick_wins_excludes_groups_with_no_duplicates_and_sorts_by_waste() {
        let mut catalog = HashMap::new();
        catalog.insert("fp1".to_string(), group("fp1", 500, 5));
        catalog.insert("fp2".to_string(), group("fp2", 0, 0));
        catalog.insert("fp3".to_string(), group("fp3", 1000, 10));
        catalog.insert("fp4".to_string(), group("fp4", 200, 2));

        let wins = quick_wins(&catalog);

        assert_eq!(wins.len(), 3);
        assert_eq!(wins[0].fingerprint, "fp3");
        assert_eq!(wins[1].fingerprint, "fp1");
        assert_eq!(wins[2].fingerprint, "fp4");
    }

    #[test]
    fn quick_wins_caps_at_three() {
        let mut catalog = HashMap::new();
        for i in 0..10 {
            catalog.insert(format!("fp{i}"), group(&format!("fp{i}"), 100 + i, 1));
        }
        assert_eq!(quick_wins(&catalog).len(), 3);
    }
}
