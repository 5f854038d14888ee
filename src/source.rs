//! Collaborator interfaces for annotation and reference access.
//!
//! Reconstruction never touches files directly; it asks an
//! [`AnnotationSource`] for gene trees and a [`ReferenceSource`] for bases.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::feature::FeatureTree;
use crate::window::TrackWindow;

/// Provides gene-feature trees for a genomic window.
pub trait AnnotationSource {
    /// Gene tree whose roots overlap the window.
    fn load_gene_features(&self, window: &TrackWindow) -> Result<FeatureTree, Error>;

    /// Gene tree keeping one canonical transcript per gene.
    ///
    /// The default implementation filters [`load_gene_features`] with
    /// [`FeatureTree::with_canonical_transcripts`].
    ///
    /// [`load_gene_features`]: AnnotationSource::load_gene_features
    fn load_genes_transcript(&self, window: &TrackWindow) -> Result<FeatureTree, Error> {
        Ok(self.load_gene_features(window)?.with_canonical_transcripts())
    }
}

/// Provides raw reference nucleotides.
pub trait ReferenceSource {
    /// Bases of `chromosome` in the 1-based inclusive range `[start, end]`.
    fn sequence_string(
        &self,
        start: i32,
        end: i32,
        reference_id: u64,
        chromosome: &str,
    ) -> Result<String, Error>;
}

impl<T: AnnotationSource + ?Sized> AnnotationSource for &T {
    fn load_gene_features(&self, window: &TrackWindow) -> Result<FeatureTree, Error> {
        (**self).load_gene_features(window)
    }

    fn load_genes_transcript(&self, window: &TrackWindow) -> Result<FeatureTree, Error> {
        (**self).load_genes_transcript(window)
    }
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for &T {
    fn sequence_string(
        &self,
        start: i32,
        end: i32,
        reference_id: u64,
        chromosome: &str,
    ) -> Result<String, Error> {
        (**self).sequence_string(start, end, reference_id, chromosome)
    }
}

/// Annotation source backed by a tree held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotations {
    tree: FeatureTree,
}

impl InMemoryAnnotations {
    pub fn new(tree: FeatureTree) -> Self {
        Self { tree }
    }

    #[must_use]
    pub fn tree(&self) -> &FeatureTree {
        &self.tree
    }
}

impl AnnotationSource for InMemoryAnnotations {
    fn load_gene_features(&self, window: &TrackWindow) -> Result<FeatureTree, Error> {
        Ok(self
            .tree
            .restricted_to(&window.chromosome, window.start, window.end))
    }
}

/// Reference source backed by whole-chromosome sequences held in memory.
#[derive(Debug, Default)]
pub struct InMemoryReference {
    sequences: HashMap<(u64, String), Vec<u8>>,
    fetches: AtomicUsize,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chromosome sequence; position 1 is `sequence[0]`.
    pub fn insert(&mut self, reference_id: u64, chromosome: impl Into<String>, sequence: &[u8]) {
        self.sequences
            .insert((reference_id, chromosome.into()), sequence.to_vec());
    }

    /// Number of `sequence_string` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl ReferenceSource for InMemoryReference {
    fn sequence_string(
        &self,
        start: i32,
        end: i32,
        reference_id: u64,
        chromosome: &str,
    ) -> Result<String, Error> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let sequence = self
            .sequences
            .get(&(reference_id, chromosome.to_string()))
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("reference {reference_id} has no chromosome '{chromosome}'"),
                ))
            })?;
        Ok(slice_sequence(sequence, start, end))
    }
}

/// Extract the 1-based inclusive range, clipped to the sequence bounds.
pub(crate) fn slice_sequence(sequence: &[u8], start: i32, end: i32) -> String {
    let from = (start.max(1) - 1) as usize;
    let to = (end.max(0) as usize).min(sequence.len());
    if from >= to {
        return String::new();
    }
    String::from_utf8_lossy(&sequence[from..to]).into_owned()
}
