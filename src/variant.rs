//! Variant-aware nucleotide candidates.
//!
//! Each variation touching a CDS multiplies that block's candidate
//! sequences by its number of alternative alleles. Whole-transcript
//! candidates are the Cartesian product of the per-block candidates,
//! bounded by a configurable limit.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::codon;
use crate::error::Error;
use crate::feature::{FeatureId, FeatureTree};
use crate::fetcher;
use crate::nucleotide::{self, NucleotideBase};
use crate::source::ReferenceSource;

/// A sequence variant: a genomic range and its alternative alleles.
///
/// Alleles are written on the forward strand. The reference allele is
/// implicit in the range and is not itself a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(alias = "alternativeAlleles")]
    pub alternatives: Vec<String>,
}

impl Variation {
    pub fn new(start: i32, end: i32, alternatives: &[&str]) -> Self {
        Self {
            start,
            end,
            reference: None,
            alternatives: alternatives.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Check the range and that every allele is made of nucleotides.
    pub fn validate(&self) -> Result<(), Error> {
        if self.start > self.end {
            return Err(Error::Validation(format!(
                "variation {}-{} has start after end",
                self.start, self.end
            )));
        }
        for allele in &self.alternatives {
            for base in allele.bytes() {
                codon::complement(base)?;
            }
        }
        Ok(())
    }

    /// True if the variation starts inside `[start, end]`.
    #[must_use]
    pub fn starts_within(&self, start: i32, end: i32) -> bool {
        self.start >= start && self.start <= end
    }
}

/// CDS blocks touched by one variation.
#[derive(Debug, Clone)]
pub struct VariantHit<'a> {
    pub variation: &'a Variation,
    pub cds: Vec<FeatureId>,
}

/// Per-CDS candidate sequences in transcript orientation.
pub type CdsCandidates = BTreeMap<FeatureId, Vec<Vec<NucleotideBase>>>;

/// Pair each variation with the CDS blocks its start falls in.
///
/// Variations touching no block are left out; order follows `variations`.
#[must_use]
pub fn find_intersections<'a>(
    variations: &'a [Variation],
    tree: &FeatureTree,
    cds_ids: &[FeatureId],
) -> Vec<VariantHit<'a>> {
    variations
        .iter()
        .filter_map(|variation| {
            let cds: Vec<FeatureId> = cds_ids
                .iter()
                .copied()
                .filter(|&id| {
                    let feature = tree.feature(id);
                    variation.starts_within(feature.start, feature.end)
                })
                .collect();
            (!cds.is_empty()).then_some(VariantHit { variation, cds })
        })
        .collect()
}

/// Replace the reference range of `variation` in `bases` with `allele`.
///
/// `bases` must be in genomic orientation. Inserted bases are numbered
/// from `variation.start`. Returns `None` when the range cannot be located.
#[must_use]
pub fn substitute(
    bases: &[NucleotideBase],
    variation: &Variation,
    allele: &str,
) -> Option<Vec<NucleotideBase>> {
    let from = bases.iter().position(|n| n.position == variation.start)?;
    let to = from
        + bases[from..]
            .iter()
            .rposition(|n| n.position == variation.end)?;

    let mut result = Vec::with_capacity(bases.len() - (to - from + 1) + allele.len());
    result.extend_from_slice(&bases[..from]);
    result.extend(
        allele
            .bytes()
            .enumerate()
            .map(|(m, base)| NucleotideBase::new(variation.start + m as i32, base.to_ascii_uppercase())),
    );
    result.extend_from_slice(&bases[to + 1..]);
    Some(result)
}

/// Build the candidate sequences of every CDS touched by `hits`.
///
/// A block is fetched from `reference` the first time a variation touches
/// it; later variations apply to every candidate produced so far, so the
/// effects compound. When a variation cannot be located in any candidate
/// the block keeps its previous candidates. Minus-strand candidates are
/// reverse-complemented once all substitutions are done.
pub fn branch<R: ReferenceSource + ?Sized>(
    reference: &R,
    chromosome: &str,
    reference_id: u64,
    tree: &FeatureTree,
    hits: &[VariantHit<'_>],
) -> Result<CdsCandidates, Error> {
    let started = Instant::now();
    let mut candidates: CdsCandidates = BTreeMap::new();

    for hit in hits {
        for &cds_id in &hit.cds {
            let current = match candidates.remove(&cds_id) {
                Some(existing) => existing,
                None => {
                    let cds = tree.feature(cds_id);
                    vec![fetcher::fetch_for_variant_cds(
                        reference,
                        chromosome,
                        reference_id,
                        cds,
                    )?]
                }
            };

            let mut branched = Vec::with_capacity(current.len() * hit.variation.alternatives.len());
            for candidate in &current {
                for allele in &hit.variation.alternatives {
                    if let Some(changed) = substitute(candidate, hit.variation, allele) {
                        branched.push(changed);
                    }
                }
            }

            if branched.is_empty() {
                tracing::warn!(
                    "Variation {}-{} could not be located in {}; substitution skipped",
                    hit.variation.start,
                    hit.variation.end,
                    tree.feature(cds_id).describe()
                );
                candidates.insert(cds_id, current);
            } else {
                candidates.insert(cds_id, branched);
            }
        }
    }

    for (cds_id, lists) in &mut candidates {
        if tree.feature(*cds_id).strand.is_minus() {
            for list in lists.iter_mut() {
                *list = nucleotide::reverse_complement(list)?;
            }
        }
    }

    tracing::debug!(
        "Branched {} CDS blocks for {} variations in {} ms",
        candidates.len(),
        hits.len(),
        started.elapsed().as_millis()
    );
    Ok(candidates)
}

/// Cartesian product of `choices`, in order, with at most `limit` results.
///
/// The count is accumulated block by block; as soon as it exceeds `limit`
/// the product fails with [`Error::TooManyVariantCombinations`] before any
/// combination is allocated.
pub fn cartesian<T>(choices: &[Vec<T>], limit: usize) -> Result<Vec<Vec<&T>>, Error> {
    let required = choices.iter().try_fold(1usize, |acc, options| {
        let next = acc.saturating_mul(options.len());
        if next > limit {
            Err(Error::TooManyVariantCombinations {
                limit,
                required: choices
                    .iter()
                    .fold(1usize, |total, o| total.saturating_mul(o.len())),
            })
        } else {
            Ok(next)
        }
    })?;

    let mut combinations: Vec<Vec<&T>> = Vec::with_capacity(required);
    combinations.push(Vec::with_capacity(choices.len()));
    for options in choices {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                options.iter().map(move |option| {
                    let mut next = prefix.clone();
                    next.push(option);
                    next
                })
            })
            .collect();
    }
    Ok(combinations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureKind, GeneFeature};
    use crate::nucleotide::{break_sequence, to_sequence_string};
    use crate::source::InMemoryReference;
    use crate::strand::Strand;

    fn tree_with(blocks: &[(i32, i32, Strand, u8)]) -> (FeatureTree, Vec<FeatureId>) {
        let mut tree = FeatureTree::new();
        let ids = blocks
            .iter()
            .map(|&(start, end, strand, frame)| {
                tree.add_root(
                    GeneFeature::new(FeatureKind::Cds, "chr1", start, end, strand).with_frame(frame),
                )
            })
            .collect();
        (tree, ids)
    }

    #[test]
    fn substitution_handles_deletion_and_insertion() {
        let bases = break_sequence(b"ATGCTGA", 1, false);
        let deleted = substitute(&bases, &Variation::new(3, 4, &["G"]), "G").unwrap();
        assert_eq!(to_sequence_string(&deleted), "ATGTGA");
        let inserted = substitute(&bases, &Variation::new(3, 3, &["GAA"]), "GAA").unwrap();
        assert_eq!(to_sequence_string(&inserted), "ATGAACTGA");
        assert_eq!(inserted[4].position, 5);
    }

    #[test]
    fn single_base_substitution() {
        let bases = break_sequence(b"ATGCTGA", 1, false);
        let snv = substitute(&bases, &Variation::new(2, 2, &["C"]), "C").unwrap();
        assert_eq!(to_sequence_string(&snv), "ACGCTGA");
    }

    #[test]
    fn substitution_outside_sequence() {
        let bases = break_sequence(b"ATG", 1, false);
        assert!(substitute(&bases, &Variation::new(10, 10, &["A"]), "A").is_none());
    }

    #[test]
    fn intersections_use_variation_start() {
        let (tree, ids) = tree_with(&[(1, 7, Strand::Plus, 0), (20, 27, Strand::Plus, 0)]);
        let variations = vec![
            Variation::new(7, 9, &["A"]),
            Variation::new(10, 12, &["A"]),
            Variation::new(19, 21, &["A"]),
        ];
        let hits = find_intersections(&variations, &tree, &ids);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].variation.start, 7);
        assert_eq!(hits[0].cds, vec![ids[0]]);
    }

    #[test]
    fn branch_compounds_variations_and_normalizes_strand() {
        let mut reference = InMemoryReference::new();
        // positions 1..=27
        reference.insert(1, "chr1", b"ATGCTGATGGAAATCAAAAGCGCTATC");
        let (tree, ids) = tree_with(&[
            (1, 7, Strand::Plus, 0),
            (8, 15, Strand::Minus, 0),
            (20, 27, Strand::Plus, 2),
        ]);
        let variations = vec![
            Variation::new(3, 4, &["G"]),
            Variation::new(8, 9, &["T"]),
            Variation::new(11, 13, &["ATA"]),
            Variation::new(22, 23, &["GCA", "GCT"]),
        ];
        let hits = find_intersections(&variations, &tree, &ids);
        let candidates = branch(&reference, "chr1", 1, &tree, &hits).unwrap();

        let sequences = |id: FeatureId| -> Vec<String> {
            candidates[&id]
                .iter()
                .map(|c| to_sequence_string(c))
                .collect()
        };
        assert_eq!(sequences(ids[0]), vec!["ATGTGA"]);
        assert_eq!(sequences(ids[1]), vec!["GATATCA"]);
        assert_eq!(sequences(ids[2]), vec!["GCGCATATC", "GCGCTTATC"]);
        // one fetch per touched block
        assert_eq!(reference.fetch_count(), 3);
    }

    #[test]
    fn unlocatable_variation_keeps_reference() {
        let mut reference = InMemoryReference::new();
        reference.insert(1, "chr1", b"ATGCTGA");
        let (tree, ids) = tree_with(&[(1, 7, Strand::Plus, 0)]);
        let variations = vec![Variation::new(6, 9, &["A"])];
        let hits = find_intersections(&variations, &tree, &ids);
        let candidates = branch(&reference, "chr1", 1, &tree, &hits).unwrap();
        assert_eq!(to_sequence_string(&candidates[&ids[0]][0]), "ATGCTGA");
    }

    #[test]
    fn cartesian_product_counts() {
        let choices = vec![vec!['a', 'b'], vec!['x'], vec!['1', '2', '3']];
        let combos = cartesian(&choices, 10).unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], vec![&'a', &'x', &'1']);
        assert_eq!(combos[5], vec![&'b', &'x', &'3']);
    }

    #[test]
    fn cartesian_product_is_bounded() {
        let choices = vec![vec![0; 10], vec![0; 10], vec![0; 10]];
        assert!(matches!(
            cartesian(&choices, 99),
            Err(Error::TooManyVariantCombinations { limit: 99, required: 1000 })
        ));
    }

    #[test]
    fn cartesian_of_nothing_is_one_empty_combination() {
        let choices: Vec<Vec<u8>> = Vec::new();
        assert_eq!(cartesian(&choices, 1).unwrap(), vec![Vec::<&u8>::new()]);
    }

    #[test]
    fn validate_rejects_non_nucleotides() {
        assert!(Variation::new(1, 1, &["AZ"]).validate().is_err());
        assert!(Variation::new(5, 1, &["A"]).validate().is_err());
        assert!(Variation::new(1, 2, &["acgt", ""]).validate().is_ok());
    }

    #[test]
    fn variation_json() {
        let json = r#"{ "start": 22, "end": 23, "alternativeAlleles": ["GCA", "GCT"] }"#;
        let variation: Variation = serde_json::from_str(json).unwrap();
        assert_eq!(variation.alternatives.len(), 2);
        assert!(variation.reference.is_none());
    }
}
