//! Loads reference nucleotides for coding blocks.

use std::time::Instant;

use crate::codon;
use crate::error::Error;
use crate::feature::{FeatureId, FeatureTree, GeneFeature};
use crate::nucleotide::{self, NucleotideBase};
use crate::source::ReferenceSource;

/// Fetch the bases of every CDS in `cds_list`, index-aligned with the input.
///
/// All blocks must belong to one transcript. The spanning interval is
/// requested from `reference` once and sliced per block. Minus-strand blocks
/// come back reverse-complemented (transcript orientation) with genomic
/// positions attached to each base.
pub fn fetch_for_cds<R: ReferenceSource + ?Sized>(
    reference: &R,
    chromosome: &str,
    reference_id: u64,
    tree: &FeatureTree,
    cds_list: &[FeatureId],
) -> Result<Vec<Vec<NucleotideBase>>, Error> {
    let Some(&first) = cds_list.first() else {
        return Ok(Vec::new());
    };
    let started = Instant::now();
    let minus = tree.feature(first).strand.is_minus();

    let features: Vec<&GeneFeature> = cds_list.iter().map(|&id| tree.feature(id)).collect();
    let span_start = features.iter().map(|f| f.start).min().unwrap_or(1);
    let span_end = features.iter().map(|f| f.end).max().unwrap_or(span_start);

    let spanning = reference.sequence_string(span_start, span_end, reference_id, chromosome)?;
    let spanning = spanning.as_bytes();

    let mut result = Vec::with_capacity(features.len());
    for cds in features {
        let from = (cds.start - span_start) as usize;
        let to = from + cds.len();
        let available = spanning.len().saturating_sub(from).min(cds.len());
        if to > spanning.len() {
            return Err(insufficient(cds, available));
        }
        result.push(tag_bases(&spanning[from..to], cds.start, minus)?);
    }

    tracing::debug!(
        "Loaded nucleotides for {} CDS on {chromosome}:{span_start}-{span_end} in {} ms",
        result.len(),
        started.elapsed().as_millis()
    );
    Ok(result)
}

/// Fetch the bases of a single CDS in genomic (forward-strand) orientation.
///
/// Variant branching splices alleles into these lists before any strand
/// normalization, so no reverse-complement is applied here.
pub fn fetch_for_variant_cds<R: ReferenceSource + ?Sized>(
    reference: &R,
    chromosome: &str,
    reference_id: u64,
    cds: &GeneFeature,
) -> Result<Vec<NucleotideBase>, Error> {
    tracing::debug!("Reading reference for {}", cds.describe());
    let seq = reference.sequence_string(cds.start, cds.end, reference_id, chromosome)?;
    if seq.len() < cds.len() {
        return Err(insufficient(cds, seq.len()));
    }
    Ok(nucleotide::break_sequence(
        &seq.as_bytes()[..cds.len()],
        cds.start,
        false,
    ))
}

fn tag_bases(seq: &[u8], offset: i32, minus: bool) -> Result<Vec<NucleotideBase>, Error> {
    if minus {
        let rc = codon::reverse_complement(seq)?;
        Ok(nucleotide::break_sequence(&rc, offset, true))
    } else {
        Ok(nucleotide::break_sequence(seq, offset, false))
    }
}

fn insufficient(cds: &GeneFeature, actual: usize) -> Error {
    Error::InsufficientNucleotides {
        cds: cds.describe(),
        expected: cds.len(),
        actual,
    }
}
