//! Codon assembly across CDS boundaries.
//!
//! A transcript's CDS blocks are folded in transcript (5'→3') order. The
//! only value carried from one block to the next is the amino-acid ordinal
//! in [`AssemblyState`]; boundary codons are stitched by reading the
//! neighbouring block's bases directly, so every step is a pure function of
//! its inputs.
//!
//! A block with a non-zero frame borrows `3 - frame` trailing bases of the
//! previous block (a *backward* extension). When extension across
//! boundaries is enabled, a short final triple borrows leading bases of
//! the following block (a *forward* extension). A stitched codon keeps the
//! ordinal of the codon it completes. When both sides of a boundary could
//! stitch, the forward extension under the earlier block is kept and the
//! backward one is skipped, so every ordinal appears once per transcript.

use std::cmp::Ordering;

use crate::feature::{FeatureId, GeneFeature};
use crate::nucleotide::NucleotideBase;
use crate::strand::Strand;

/// Bases per codon.
pub const TRIPLE_LENGTH: usize = 3;

/// How a triple was completed with bases from a neighbouring block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extension {
    /// All three bases come from the owning block.
    #[default]
    None,
    /// The leading `n` bases were borrowed from the previous block.
    Backward(usize),
    /// The trailing `n` bases were borrowed from the following block(s).
    Forward(usize),
}

impl Extension {
    /// Interpret a signed borrow count: negative looked backward, positive forward.
    #[must_use]
    pub fn from_offset(offset: i32) -> Self {
        match offset.cmp(&0) {
            Ordering::Less => Self::Backward(offset.unsigned_abs() as usize),
            Ordering::Greater => Self::Forward(offset.unsigned_abs() as usize),
            Ordering::Equal => Self::None,
        }
    }

    /// Number of bases taken from outside the owning block.
    #[must_use]
    pub fn borrowed(self) -> usize {
        match self {
            Self::None => 0,
            Self::Backward(n) | Self::Forward(n) => n,
        }
    }
}

/// One CDS block paired with its bases in transcript orientation.
#[derive(Debug, Clone, Copy)]
pub struct CdsBases<'a> {
    pub feature: &'a GeneFeature,
    pub bases: &'a [NucleotideBase],
}

impl<'a> CdsBases<'a> {
    pub fn new(feature: &'a GeneFeature, bases: &'a [NucleotideBase]) -> Self {
        Self { feature, bases }
    }
}

/// A complete codon attributed to one CDS block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCodon {
    pub cds: FeatureId,
    pub bases: [NucleotideBase; TRIPLE_LENGTH],
    pub index: usize,
    pub triple_start: i32,
    pub triple_end: i32,
    pub extension: Extension,
}

impl AssembledCodon {
    #[must_use]
    pub fn codon(&self) -> [u8; TRIPLE_LENGTH] {
        [self.bases[0].base, self.bases[1].base, self.bases[2].base]
    }
}

/// Accumulator threaded through the fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyState {
    /// Number of codons started so far, including skipped partial ones.
    pub codons_started: usize,
    /// The previous block ended with a forward-extended codon.
    pub stitched_forward: bool,
}

/// Drop the leading `frame` bases that belong to an earlier codon.
#[must_use]
pub fn coding_bases(bases: &[NucleotideBase], frame: usize) -> &[NucleotideBase] {
    &bases[frame.min(bases.len())..]
}

/// Genomic start reported for a triple.
///
/// Normally this is the lowest coordinate of the triple: the first base on
/// the plus strand, the third base on the minus strand. When the borrowed
/// bases sit on the side of that coordinate, it is replaced with the
/// owning block's start so the span stays inside the block:
///
/// | strand | extension  | start                |
/// |--------|------------|----------------------|
/// | `+`    | none       | `triple[0]`          |
/// | `+`    | forward    | `triple[0]`          |
/// | `+`    | backward   | `cds.start`          |
/// | `-`    | none       | `triple[2]`          |
/// | `-`    | backward   | `triple[2]`          |
/// | `-`    | forward    | `cds.start`          |
#[must_use]
pub fn triple_genomic_start(
    triple: &[NucleotideBase; TRIPLE_LENGTH],
    cds: &GeneFeature,
    strand: Strand,
    extension: Extension,
) -> i32 {
    match (strand, extension) {
        (Strand::Plus, Extension::Backward(_)) | (Strand::Minus, Extension::Forward(_)) => cds.start,
        (Strand::Plus, _) => triple[0].position,
        (Strand::Minus, _) => triple[2].position,
    }
}

/// Genomic end reported for a triple: the part owned by `cds`, clipped to its end.
#[must_use]
pub fn triple_genomic_end(start: i32, cds: &GeneFeature, extension: Extension) -> i32 {
    let owned = (TRIPLE_LENGTH - extension.borrowed()) as i32;
    (start + owned - 1).min(cds.end)
}

/// Assemble the codons of the block at `position`.
///
/// `blocks` must be in transcript order. Neighbouring blocks are read for
/// stitching only; the returned state is the input state advanced by the
/// codons this block started.
#[must_use]
pub fn assemble_step(
    state: AssemblyState,
    blocks: &[CdsBases<'_>],
    position: usize,
    extend_across_boundary: bool,
) -> (AssemblyState, Vec<AssembledCodon>) {
    let block = blocks[position];
    let cds = block.feature;
    let frame = cds.frame_offset();

    let mut extended_start: i32 = 0;
    let working: Vec<NucleotideBase> = if frame > 0 && position > 0 {
        let prev = blocks[position - 1].bases;
        let needed = TRIPLE_LENGTH - frame;
        if prev.len() >= needed {
            extended_start = -(needed as i32);
            prev[prev.len() - needed..]
                .iter()
                .chain(block.bases)
                .copied()
                .collect()
        } else {
            tracing::warn!(
                "CDS {} {} has frame {frame} but the previous block holds only {} bases; \
                 translating the block untrimmed",
                cds.id,
                cds.describe(),
                prev.len()
            );
            block.bases.to_vec()
        }
    } else {
        coding_bases(block.bases, frame).to_vec()
    };

    let mut counter = state.codons_started;
    let mut stitched_forward = false;
    let mut codons = Vec::with_capacity(working.len() / TRIPLE_LENGTH + 1);

    for chunk in working.chunks(TRIPLE_LENGTH) {
        let mut triple = chunk.to_vec();
        if extended_start < 0 && state.stitched_forward {
            tracing::debug!("Boundary codon of CDS {} already emitted by the previous block", cds.id);
            extended_start = 0;
            continue;
        }
        if extended_start == 0 {
            counter += 1;
        }
        if triple.len() < TRIPLE_LENGTH && !extend_across_boundary {
            continue;
        }

        let mut next = position;
        while triple.len() < TRIPLE_LENGTH {
            next += 1;
            let Some(following) = blocks.get(next) else {
                break;
            };
            let take = following.bases.len().min(TRIPLE_LENGTH - triple.len());
            tracing::debug!("Borrowing {take} bases from CDS {}", following.feature.id);
            triple.extend_from_slice(&following.bases[..take]);
            extended_start += take as i32;
        }
        if triple.len() < TRIPLE_LENGTH {
            continue;
        }

        let bases = [triple[0], triple[1], triple[2]];
        let extension = Extension::from_offset(extended_start);
        let triple_start = triple_genomic_start(&bases, cds, cds.strand, extension);
        codons.push(AssembledCodon {
            cds: cds.id,
            bases,
            index: counter.saturating_sub(1),
            triple_start,
            triple_end: triple_genomic_end(triple_start, cds, extension),
            extension,
        });
        stitched_forward = matches!(extension, Extension::Forward(_));
        extended_start = 0;
    }

    (
        AssemblyState {
            codons_started: counter,
            stitched_forward,
        },
        codons,
    )
}

/// Assemble a whole transcript.
///
/// `blocks` are given in annotation order; a minus-strand transcript is
/// reversed here so the fold runs 5'→3'. The result holds one entry per
/// block in transcript order.
#[must_use]
pub fn assemble(
    blocks: &[CdsBases<'_>],
    extend_across_boundary: bool,
) -> Vec<(FeatureId, Vec<AssembledCodon>)> {
    let mut ordered = blocks.to_vec();
    if ordered.first().is_some_and(|b| b.feature.strand.is_minus()) {
        ordered.reverse();
    }

    let (_, assembled) = (0..ordered.len()).fold(
        (AssemblyState::default(), Vec::with_capacity(ordered.len())),
        |(state, mut acc), position| {
            let (state, codons) =
                assemble_step(state, &ordered, position, extend_across_boundary);
            acc.push((ordered[position].feature.id, codons));
            (state, acc)
        },
    );
    assembled
}
