//! Position-tagged nucleotides.

use crate::codon;
use crate::error::Error;

/// One reference base tagged with its 1-based genomic position.
///
/// On the minus strand `base` is already complemented while `position`
/// still refers to the forward-strand coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NucleotideBase {
    pub position: i32,
    pub base: u8,
}

impl NucleotideBase {
    #[must_use]
    pub fn new(position: i32, base: u8) -> Self {
        Self { position, base }
    }
}

/// Tag each base of `seq` with its genomic position.
///
/// `offset` is the genomic start of the interval. For a minus-strand
/// sequence (already reverse-complemented) the first base belongs to the
/// highest coordinate.
#[must_use]
pub fn break_sequence(seq: &[u8], offset: i32, minus_strand: bool) -> Vec<NucleotideBase> {
    let len = seq.len() as i32;
    seq.iter()
        .enumerate()
        .map(|(i, &base)| {
            let i = i as i32;
            let position = if minus_strand {
                offset + len - i - 1
            } else {
                offset + i
            };
            NucleotideBase::new(position, base)
        })
        .collect()
}

/// Reverse the list and complement every base; positions travel with their base.
pub fn reverse_complement(bases: &[NucleotideBase]) -> Result<Vec<NucleotideBase>, Error> {
    bases
        .iter()
        .rev()
        .map(|n| Ok(NucleotideBase::new(n.position, codon::complement(n.base)?)))
        .collect()
}

/// Concatenate the bases into a string.
#[must_use]
pub fn to_sequence_string(bases: &[NucleotideBase]) -> String {
    bases.iter().map(|n| n.base as char).collect()
}
