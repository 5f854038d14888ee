//! Turns assembled codons into window-clipped amino-acid entries.

use std::time::Instant;

use crate::assembler::{self, AssembledCodon, CdsBases};
use crate::codon::CodonTable;
use crate::feature::{FeatureId, GeneFeature};
use crate::protein::ProteinSequenceEntry;
use crate::window::TrackWindow;

/// Per-CDS translation result in transcript order.
pub type CdsProteins = Vec<(FeatureId, Vec<ProteinSequenceEntry>)>;

/// Translate one transcript's CDS blocks.
///
/// `blocks` are in annotation order with bases in transcript orientation
/// (see [`crate::fetcher::fetch_for_cds`]). Entries whose triple span does
/// not overlap `window` are dropped, but ordinals are assigned before
/// clipping so they are identical for any window.
#[must_use]
pub fn translate(
    blocks: &[CdsBases<'_>],
    table: &CodonTable,
    window: &TrackWindow,
    extend_across_boundary: bool,
) -> CdsProteins {
    let started = Instant::now();
    let features: Vec<&GeneFeature> = blocks.iter().map(|b| b.feature).collect();

    let result: CdsProteins = assembler::assemble(blocks, extend_across_boundary)
        .into_iter()
        .map(|(cds_id, codons)| {
            let cds = features
                .iter()
                .find(|f| f.id == cds_id)
                .copied();
            let entries = match cds {
                Some(cds) => codons
                    .iter()
                    .map(|codon| to_entry(codon, cds, table, &window.track_id))
                    .filter(|entry| in_window(entry, window))
                    .collect(),
                None => Vec::new(),
            };
            (cds_id, entries)
        })
        .collect();

    tracing::debug!(
        "Translated {} CDS blocks in {} ms",
        result.len(),
        started.elapsed().as_millis()
    );
    result
}

/// Flatten per-CDS results into one ordered entry list.
#[must_use]
pub fn flatten(proteins: CdsProteins) -> Vec<ProteinSequenceEntry> {
    proteins.into_iter().flat_map(|(_, entries)| entries).collect()
}

/// Genuine overlap of the triple span with the window; adjacency is not enough.
#[must_use]
pub fn in_window(entry: &ProteinSequenceEntry, window: &TrackWindow) -> bool {
    entry.overlaps(window.start, window.end)
}

fn to_entry(
    codon: &AssembledCodon,
    cds: &GeneFeature,
    table: &CodonTable,
    track_id: &str,
) -> ProteinSequenceEntry {
    ProteinSequenceEntry {
        amino_acid: table.translate_codon(&codon.codon()) as char,
        track_id: track_id.to_string(),
        cds: cds.id,
        cds_start: cds.start,
        cds_end: cds.end,
        triple_start: codon.triple_start,
        triple_end: codon.triple_end,
        index: codon.index,
    }
}
