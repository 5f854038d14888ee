//! Translated amino acids and protein strings built from them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codon::{self, STOP};
use crate::feature::FeatureId;
use crate::window::TrackWindow;

/// One translated amino acid with its genomic provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinSequenceEntry {
    /// One-letter amino-acid code; `*` marks a stop codon.
    pub amino_acid: char,
    pub track_id: String,
    /// CDS the entry was emitted under.
    pub cds: FeatureId,
    pub cds_start: i32,
    pub cds_end: i32,
    pub triple_start: i32,
    pub triple_end: i32,
    /// 0-based position of the residue within the protein.
    pub index: usize,
}

impl ProteinSequenceEntry {
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.amino_acid == STOP as char
    }

    /// Three-letter residue name, e.g. `Met`.
    #[must_use]
    pub fn three_letter_code(&self) -> &'static str {
        codon::three_letter_code(self.amino_acid as u8)
    }

    /// True if the triple span overlaps `[start, end]`.
    #[must_use]
    pub fn overlaps(&self, start: i32, end: i32) -> bool {
        self.triple_start <= end && self.triple_end >= start
    }
}

/// Concatenated protein string for one transcript or feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinSequence {
    pub start: i32,
    pub end: i32,
    pub sequence: String,
    /// Ordinal of the first residue in `sequence`.
    pub index: usize,
}

impl ProteinSequence {
    /// Join `entries` into a single N→C protein string.
    ///
    /// Entries are ordered by triple start; stop symbols are dropped. The
    /// span runs from the first entry's CDS start to the last entry's CDS
    /// end. For a minus-strand feature the joined residues are reversed.
    #[must_use]
    pub fn from_entries(entries: &[ProteinSequenceEntry], minus_strand: bool) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let mut sorted: Vec<&ProteinSequenceEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.triple_start);

        let residues = sorted.iter().filter(|e| !e.is_stop()).map(|e| e.amino_acid);
        let sequence: String = if minus_strand {
            residues.rev().collect()
        } else {
            residues.collect()
        };

        Self {
            start: sorted[0].cds_start,
            end: sorted[sorted.len() - 1].cds_end,
            sequence,
            index: sorted.iter().map(|e| e.index).min().unwrap_or(0),
        }
    }

    /// A protein string supplied verbatim by an annotation attribute.
    #[must_use]
    pub fn from_translation(translation: &str, start: i32, end: i32) -> Self {
        Self {
            start,
            end,
            sequence: translation.to_string(),
            index: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Entries of one transcript, keyed by its `transcript_id` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptProtein {
    pub transcript_id: String,
    pub entries: Vec<ProteinSequenceEntry>,
}

/// Plain reconstruction result for a track window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinTrack {
    pub window: TrackWindow,
    pub transcripts: Vec<TranscriptProtein>,
}

/// Variant-aware result: per transcript id, one entry list per candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinVariantsTrack {
    pub window: TrackWindow,
    pub transcripts: BTreeMap<String, Vec<Vec<ProteinSequenceEntry>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(aa: char, triple_start: i32, index: usize) -> ProteinSequenceEntry {
        ProteinSequenceEntry {
            amino_acid: aa,
            track_id: "genes".to_string(),
            cds: FeatureId(1),
            cds_start: 100,
            cds_end: 120,
            triple_start,
            triple_end: triple_start + 2,
            index,
        }
    }

    #[test]
    fn joins_in_coordinate_order_without_stops() {
        let entries = vec![entry('K', 103, 1), entry('M', 100, 0), entry('*', 106, 2)];
        let protein = ProteinSequence::from_entries(&entries, false);
        assert_eq!(protein.sequence, "MK");
        assert_eq!(protein.start, 100);
        assert_eq!(protein.end, 120);
        assert_eq!(protein.index, 0);
    }

    #[test]
    fn minus_strand_reads_n_to_c() {
        // minus strand: higher coordinates come first in the protein
        let entries = vec![entry('M', 106, 0), entry('K', 103, 1), entry('P', 100, 2)];
        let protein = ProteinSequence::from_entries(&entries, true);
        assert_eq!(protein.sequence, "MKP");
    }

    #[test]
    fn empty_entries() {
        let protein = ProteinSequence::from_entries(&[], false);
        assert!(protein.is_empty());
        assert_eq!(protein, ProteinSequence::default());
    }

    #[test]
    fn overlap_and_names() {
        let e = entry('M', 100, 0);
        assert!(e.overlaps(102, 200));
        assert!(!e.overlaps(103, 200));
        assert_eq!(e.three_letter_code(), "Met");
        assert!(!e.is_stop());
    }
}
