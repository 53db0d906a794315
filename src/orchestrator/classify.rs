//! The canonical-vs-duplicate classification rule
//!
//! One call site per incoming `(fingerprint, metadata)` tuple increments
//! both the global counters and the per-project/per-extension sub-aggregates
//! — by construction, not by a runtime check, so the two can never drift
//! apart.

use crate::remote::AttachmentMeta;
use crate::types::{DimensionStats, DuplicateGroup, Location, MAX_LOCATIONS_PER_GROUP, ScanStatistics, extension_of};
use std::collections::HashMap;

/// Apply the classification rule for one fingerprinted attachment
///
/// Returns `true` if this attachment became the canonical (first-seen)
/// location for its fingerprint.
pub fn classify_attachment(
    catalog: &mut HashMap<String, DuplicateGroup>,
    stats: &mut ScanStatistics,
    meta: &AttachmentMeta,
    fingerprint: &str,
) -> bool {
    let extension = extension_of(&meta.attachment.filename);
    let size = meta.attachment.size;

    stats.total_files += 1;
    stats.total_size += size;

    let project_stats = stats
        .by_project
        .entry(meta.project_key.clone())
        .or_insert_with(|| DimensionStats {
            display_name: meta.project_name.clone(),
            ..Default::default()
        });
    project_stats.files += 1;
    project_stats.bytes += size;

    let ext_stats = stats.by_extension.entry(extension.clone()).or_insert_with(|| DimensionStats {
        display_name: extension.clone(),
        ..Default::default()
    });
    ext_stats.files += 1;
    ext_stats.bytes += size;

    let is_new = !catalog.contains_key(fingerprint);

    if is_new {
        stats.canonical_files += 1;
        catalog.insert(
            fingerprint.to_string(),
            DuplicateGroup {
                fingerprint: fingerprint.to_string(),
                file_name: meta.attachment.filename.clone(),
                file_size: size,
                mime_type: meta.attachment.mime_type.clone(),
                canonical_issue_key: meta.issue_key.clone(),
                canonical_attachment_id: meta.attachment.id.clone(),
                duplicate_count: 0,
                total_wasted_space: 0,
                author_name: meta.attachment.author.display_name.clone(),
                author_id: meta.attachment.author.id.clone(),
                created_at: meta.attachment.created,
                issue_status: meta.issue_status.clone(),
                issue_status_category: meta.issue_status_category.clone(),
                issue_last_updated: meta.issue_last_updated,
                locations: vec![Location {
                    issue_key: meta.issue_key.clone(),
                    project_key: meta.project_key.clone(),
                    attachment_id: meta.attachment.id.clone(),
                    is_canonical: true,
                    date_added: meta.attachment.created,
                    author: meta.attachment.author.display_name.clone(),
                }],
            },
        );
    } else {
        stats.duplicate_files += 1;
        stats.duplicate_size += size;

        let project_stats = stats.by_project.get_mut(&meta.project_key).expect("entry inserted above");
        project_stats.duplicate_files += 1;
        project_stats.duplicate_bytes += size;

        let ext_stats = stats.by_extension.get_mut(&extension).expect("entry inserted above");
        ext_stats.duplicate_files += 1;
        ext_stats.duplicate_bytes += size;

        let group = catalog.get_mut(fingerprint).expect("checked contains_key above");
        group.duplicate_count += 1;
        group.total_wasted_space += size;
        if group.locations.len() < MAX_LOCATIONS_PER_GROUP {
            group.locations.push(Location {
                issue_key: meta.issue_key.clone(),
                project_key: meta.project_key.clone(),
                attachment_id: meta.attachment.id.clone(),
                is_canonical: false,
                date_added: meta.attachment.created,
                author: meta.attachment.author.display_name.clone(),
            });
        }
    }

    is_new
}
