//! Merging remote entries into a journal section.
//!
//! Untimed blocks come first, unchanged and in their original order. Timed
//! blocks follow, ascending by sort key. When a remote entry and a local
//! block share a sort key, the remote text replaces the local block; any
//! further local blocks at that key are kept after it.

use std::collections::{BTreeMap, BTreeSet};

use crate::sync::section::{DocumentSection, LocalEntries};

/// Remote entries for one day: sort key to rendered block.
pub type DayBucket = BTreeMap<i64, String>;

/// Build the new section body.
#[must_use]
pub fn merge(bucket: &DayBucket, local: &LocalEntries) -> String {
    let keys: BTreeSet<i64> = bucket.keys().chain(local.timed.keys()).copied().collect();

    let mut blocks: Vec<&str> = local.untimed.iter().map(String::as_str).collect();

    for key in keys {
        let local_blocks = local.timed.get(&key).map_or(&[][..], Vec::as_slice);
        match bucket.get(&key) {
            Some(remote) => {
                blocks.push(remote);
                blocks.extend(local_blocks.iter().skip(1).map(String::as_str));
            }
            None => blocks.extend(local_blocks.iter().map(String::as_str)),
        }
    }

    blocks.join("\n")
}

/// Reassemble the document around a new section body.
///
/// Always `{prefix}\n{body}\n\n{suffix}\n` with prefix and suffix trimmed,
/// even when the body or the suffix is empty. Re-reading the result yields
/// the same body, so a second merge writes identical bytes.
#[must_use]
pub fn render_document(section: &DocumentSection<'_>, body: &str) -> String {
    format!("{}\n{body}\n\n{}\n", section.prefix.trim(), section.suffix.trim())
}
