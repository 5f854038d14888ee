//! Groups coding blocks under their owning transcript.

use std::collections::BTreeMap;

use crate::feature::{FeatureId, FeatureTree};

/// Feature types treated as transcripts.
pub const TRANSCRIPT_FEATURE_NAMES: [&str; 2] = ["mrna", "transcript"];

/// Feature types treated as coding blocks.
pub const CDS_FEATURE_NAMES: [&str; 2] = ["cds", "stop_codon"];

/// Transcript id → its coding blocks in child order.
pub type TranscriptCdsMap = BTreeMap<FeatureId, Vec<FeatureId>>;

/// Walk `tree` depth-first and collect, for every transcript, its direct
/// children whose type is in `cds_names`.
///
/// Structurally identical siblings are kept once. Transcripts without any
/// coding child are left out.
#[must_use]
pub fn group_cds(
    tree: &FeatureTree,
    transcript_names: &[&str],
    cds_names: &[&str],
) -> TranscriptCdsMap {
    let mut map = TranscriptCdsMap::new();
    let mut stack: Vec<FeatureId> = tree.roots().iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let feature = tree.feature(id);
        if feature.kind.is_one_of(transcript_names) {
            let mut cds_list: Vec<FeatureId> = Vec::new();
            for &child in &feature.children {
                let candidate = tree.feature(child);
                if !candidate.kind.is_one_of(cds_names) {
                    continue;
                }
                let duplicate = cds_list
                    .iter()
                    .any(|&kept| tree.feature(kept).same_structure(candidate));
                if !duplicate {
                    cds_list.push(child);
                }
            }
            if !cds_list.is_empty() {
                map.insert(id, cds_list);
            }
        }
        stack.extend(feature.children.iter().rev());
    }

    map
}

/// [`group_cds`] with the default transcript and CDS type names.
#[must_use]
pub fn group_default(tree: &FeatureTree) -> TranscriptCdsMap {
    group_cds(tree, &TRANSCRIPT_FEATURE_NAMES, &CDS_FEATURE_NAMES)
}
