//! Reconstruction entry points.
//!
//! [`ProteinSequenceManager`] wires grouping, nucleotide loading, codon
//! assembly and translation together over an [`AnnotationSource`] and a
//! [`ReferenceSource`]. Each transcript is reconstructed independently and
//! the manager holds no mutable state, so a shared manager can serve
//! concurrent callers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Deserialize;

use crate::assembler::CdsBases;
use crate::config::ReconstructionConfig;
use crate::error::Error;
use crate::feature::{FeatureId, FeatureKind, FeatureTree, GeneFeature};
use crate::fetcher;
use crate::grouper::{self, TranscriptCdsMap};
use crate::nucleotide::NucleotideBase;
use crate::protein::{
    ProteinSequence, ProteinSequenceEntry, ProteinTrack, ProteinVariantsTrack, TranscriptProtein,
};
use crate::source::{AnnotationSource, ReferenceSource};
use crate::translator;
use crate::variant::{self, Variation};
use crate::window::TrackWindow;

/// Plain reconstruction: entries per transcript, in transcript id order.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub tree: FeatureTree,
    pub transcripts: BTreeMap<FeatureId, Vec<ProteinSequenceEntry>>,
}

/// Variant-aware reconstruction: one entry list per candidate per transcript.
#[derive(Debug, Clone)]
pub struct VariantReconstruction {
    pub tree: FeatureTree,
    pub transcripts: BTreeMap<FeatureId, Vec<Vec<ProteinSequenceEntry>>>,
}

/// Translation request for a single named feature.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinSequenceRequest {
    pub window: TrackWindow,
    pub feature_id: String,
    pub feature_type: FeatureKind,
}

pub struct ProteinSequenceManager<A, R> {
    annotations: A,
    reference: R,
    config: ReconstructionConfig,
}

impl<A: AnnotationSource, R: ReferenceSource> ProteinSequenceManager<A, R> {
    pub fn new(annotations: A, reference: R) -> Self {
        Self {
            annotations,
            reference,
            config: ReconstructionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ReconstructionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct every transcript overlapping `window`.
    pub fn reconstruct(
        &self,
        window: &TrackWindow,
        extend_across_boundary: bool,
    ) -> Result<Reconstruction, Error> {
        let reference_id = Self::check_window(window)?;
        let tree = self.load_tree(window)?;
        let transcripts =
            self.reconstruct_tree(&tree, window, reference_id, extend_across_boundary)?;
        Ok(Reconstruction { tree, transcripts })
    }

    /// Reconstruct the transcripts of an already loaded tree.
    pub fn reconstruct_tree(
        &self,
        tree: &FeatureTree,
        window: &TrackWindow,
        reference_id: u64,
        extend_across_boundary: bool,
    ) -> Result<BTreeMap<FeatureId, Vec<ProteinSequenceEntry>>, Error> {
        let groups = self.group(tree);

        let started = Instant::now();
        let table = self.config.codon_table_for(&window.chromosome);
        let mut transcripts = BTreeMap::new();
        for (&transcript, cds_ids) in &groups {
            let lists = self.fetch(window, reference_id, tree, cds_ids)?;
            let blocks = pair_blocks(tree, cds_ids, lists.iter().map(Vec::as_slice));
            let entries = translator::flatten(translator::translate(
                &blocks,
                &table,
                window,
                extend_across_boundary,
            ));
            transcripts.insert(transcript, entries);
        }
        tracing::debug!(
            "Protein reconstruction for {} transcripts took {} ms",
            transcripts.len(),
            started.elapsed().as_millis()
        );
        Ok(transcripts)
    }

    /// Translate a single CDS on its own, without stitching to neighbours.
    pub fn reconstruct_for_single_cds(
        &self,
        window: &TrackWindow,
        tree: &FeatureTree,
        cds: FeatureId,
    ) -> Result<Vec<ProteinSequenceEntry>, Error> {
        let reference_id = Self::check_window(window)?;
        let cds_ids = [cds];
        let lists = self.fetch(window, reference_id, tree, &cds_ids)?;
        let blocks = pair_blocks(tree, &cds_ids, lists.iter().map(Vec::as_slice));
        let table = self.config.codon_table_for(&window.chromosome);
        Ok(translator::flatten(translator::translate(
            &blocks, &table, window, false,
        )))
    }

    /// Reconstruct every candidate protein produced by `variations`.
    ///
    /// A variation applies to each CDS its start falls in. Every transcript
    /// in the window gets at least one candidate; transcripts untouched by
    /// any variation get exactly their reference translation.
    pub fn reconstruct_with_variants(
        &self,
        window: &TrackWindow,
        variations: &[Variation],
    ) -> Result<VariantReconstruction, Error> {
        let reference_id = Self::check_window(window)?;
        for variation in variations {
            variation.validate()?;
        }
        let tree = self.load_tree(window)?;
        let groups = self.group(&tree);

        let all_cds: Vec<FeatureId> = groups
            .values()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let hits = variant::find_intersections(variations, &tree, &all_cds);
        let candidates = variant::branch(
            &self.reference,
            &window.chromosome,
            reference_id,
            &tree,
            &hits,
        )
        .map_err(|e| wrap_io(window, e))?;

        let table = self.config.codon_table_for(&window.chromosome);
        let mut transcripts = BTreeMap::new();
        for (&transcript, cds_ids) in &groups {
            let unaffected: Vec<FeatureId> = cds_ids
                .iter()
                .copied()
                .filter(|id| !candidates.contains_key(id))
                .collect();
            let fetched = self.fetch(window, reference_id, &tree, &unaffected)?;
            let reference_bases: BTreeMap<FeatureId, Vec<NucleotideBase>> =
                unaffected.into_iter().zip(fetched).collect();

            let choices: Vec<Vec<&[NucleotideBase]>> = cds_ids
                .iter()
                .map(|id| match candidates.get(id) {
                    Some(lists) => lists.iter().map(Vec::as_slice).collect(),
                    None => reference_bases
                        .get(id)
                        .map(|bases| vec![bases.as_slice()])
                        .unwrap_or_default(),
                })
                .collect();

            let combinations = variant::cartesian(&choices, self.config.max_variant_combinations)?;
            tracing::debug!(
                "Transcript {transcript} has {} variant candidates",
                combinations.len()
            );

            let proteins = combinations
                .into_iter()
                .map(|combination| {
                    let blocks = pair_blocks(&tree, cds_ids, combination.into_iter().copied());
                    translator::flatten(translator::translate(
                        &blocks,
                        &table,
                        window,
                        self.config.extend_across_boundary,
                    ))
                })
                .collect();
            transcripts.insert(transcript, proteins);
        }

        Ok(VariantReconstruction { tree, transcripts })
    }

    /// Plain reconstruction keyed by transcript accession.
    ///
    /// Transcripts without a `transcript_id` attribute are left out.
    pub fn load_protein_track(&self, window: &TrackWindow) -> Result<ProteinTrack, Error> {
        let reconstruction = self.reconstruct(window, self.config.extend_across_boundary)?;
        let transcripts = reconstruction
            .transcripts
            .into_iter()
            .filter_map(|(id, entries)| {
                let transcript_id = reconstruction.tree.feature(id).transcript_id()?;
                (!transcript_id.is_empty()).then(|| TranscriptProtein {
                    transcript_id: transcript_id.to_string(),
                    entries,
                })
            })
            .collect();
        Ok(ProteinTrack {
            window: window.clone(),
            transcripts,
        })
    }

    /// Variant-aware reconstruction keyed by transcript accession.
    pub fn load_protein_variants_track(
        &self,
        window: &TrackWindow,
        variations: &[Variation],
    ) -> Result<ProteinVariantsTrack, Error> {
        let reconstruction = self.reconstruct_with_variants(window, variations)?;
        let transcripts = reconstruction
            .transcripts
            .into_iter()
            .filter_map(|(id, candidates)| {
                let transcript_id = reconstruction.tree.feature(id).transcript_id()?;
                (!transcript_id.is_empty()).then(|| (transcript_id.to_string(), candidates))
            })
            .collect();
        Ok(ProteinVariantsTrack {
            window: window.clone(),
            transcripts,
        })
    }

    /// Protein string for one named gene, transcript or CDS.
    ///
    /// A feature carrying one of the configured translation attributes is
    /// answered from that attribute. A CDS is translated on its own; a gene
    /// resolves to its canonical transcript; an mRNA is looked up by name.
    pub fn load_protein_sequence(
        &self,
        request: &ProteinSequenceRequest,
    ) -> Result<ProteinSequence, Error> {
        let window = &request.window;
        let reference_id = Self::check_window(window)?;
        let tree = self.load_tree(window)?;
        let not_found = || Error::NoSuchFeature {
            kind: request.feature_type.clone(),
            id: request.feature_id.clone(),
        };

        let requested = tree.find(&request.feature_type, &request.feature_id);
        if let Some(id) = requested {
            if let Some(protein) = self.self_translation(tree.feature(id)) {
                return Ok(protein);
            }
        }

        let transcript_name = match request.feature_type {
            FeatureKind::Cds => {
                let cds = requested.ok_or_else(not_found)?;
                let entries = self.reconstruct_for_single_cds(window, &tree, cds)?;
                return to_protein(&entries, tree.feature(cds), &request.feature_id);
            }
            FeatureKind::Gene => self.canonical_transcript_name(window, &request.feature_id)?,
            FeatureKind::Mrna => request.feature_id.clone(),
            ref other => return Err(Error::UnsupportedFeatureType(other.clone())),
        };

        let transcripts = self.reconstruct_tree(&tree, window, reference_id, false)?;
        let (transcript, entries) = transcripts
            .iter()
            .find(|(id, _)| {
                tree.feature(**id)
                    .name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&transcript_name))
            })
            .ok_or_else(not_found)?;
        to_protein(entries, tree.feature(*transcript), &request.feature_id)
    }

    fn self_translation(&self, feature: &GeneFeature) -> Option<ProteinSequence> {
        let translation = self
            .config
            .translation_attribute_tags
            .iter()
            .find_map(|tag| feature.attribute(tag))?;
        let end = translation.len() as i32 - 1;
        Some(ProteinSequence::from_translation(translation, 0, end))
    }

    fn canonical_transcript_name(&self, window: &TrackWindow, gene_name: &str) -> Result<String, Error> {
        let canonical = self
            .annotations
            .load_genes_transcript(window)
            .map_err(|e| Error::gene_reading(&window.track_id, e))?;
        canonical
            .roots()
            .iter()
            .map(|&id| canonical.feature(id))
            .find(|gene| {
                gene.kind == FeatureKind::Gene
                    && gene
                        .name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(gene_name))
            })
            .and_then(|gene| canonical.children(gene.id).first())
            .and_then(|&transcript| canonical.feature(transcript).name.clone())
            .ok_or_else(|| Error::NoSuchFeature {
                kind: FeatureKind::Gene,
                id: gene_name.to_string(),
            })
    }

    fn check_window(window: &TrackWindow) -> Result<u64, Error> {
        let reference_id = window.require_reference_id()?;
        window.validate()?;
        Ok(reference_id)
    }

    fn load_tree(&self, window: &TrackWindow) -> Result<FeatureTree, Error> {
        self.annotations
            .load_gene_features(window)
            .map_err(|e| Error::gene_reading(&window.track_id, e))
    }

    fn group(&self, tree: &FeatureTree) -> TranscriptCdsMap {
        let started = Instant::now();
        let groups = grouper::group_default(tree);
        tracing::debug!(
            "Grouping CDS for {} transcripts took {} ms",
            groups.len(),
            started.elapsed().as_millis()
        );
        groups
    }

    fn fetch(
        &self,
        window: &TrackWindow,
        reference_id: u64,
        tree: &FeatureTree,
        cds_ids: &[FeatureId],
    ) -> Result<Vec<Vec<NucleotideBase>>, Error> {
        fetcher::fetch_for_cds(
            &self.reference,
            &window.chromosome,
            reference_id,
            tree,
            cds_ids,
        )
        .map_err(|e| wrap_io(window, e))
    }
}

/// Wrap reference I/O failures with the track; data errors pass through.
fn wrap_io(window: &TrackWindow, error: Error) -> Error {
    match error {
        Error::Io(_) => Error::gene_reading(&window.track_id, error),
        other => other,
    }
}

fn pair_blocks<'a>(
    tree: &'a FeatureTree,
    cds_ids: &[FeatureId],
    bases: impl IntoIterator<Item = &'a [NucleotideBase]>,
) -> Vec<CdsBases<'a>> {
    cds_ids
        .iter()
        .zip(bases)
        .map(|(&id, bases)| CdsBases::new(tree.feature(id), bases))
        .collect()
}

fn to_protein(
    entries: &[ProteinSequenceEntry],
    feature: &GeneFeature,
    requested: &str,
) -> Result<ProteinSequence, Error> {
    if entries.is_empty() {
        return Err(Error::NoAminoAcids {
            id: requested.to_string(),
        });
    }
    Ok(ProteinSequence::from_entries(
        entries,
        feature.strand.is_minus(),
    ))
}
