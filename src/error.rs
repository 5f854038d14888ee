//! Error types for the cdsprot library.

use thiserror::Error;

use crate::feature::FeatureKind;

/// Errors that can occur while reconstructing protein sequences.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// No reference genome id was supplied with the request.
    #[error("reference genome id is required")]
    MissingReferenceId,

    /// The requested genomic window is empty or inverted.
    #[error("invalid track window [{start}, {end}]")]
    InvalidWindow { start: i32, end: i32 },

    /// An annotation or reference collaborator failed while serving a track.
    #[error("failed to read genes for track {track}: {source}")]
    GeneReading {
        track: String,
        #[source]
        source: Box<Error>,
    },

    /// A feature lookup by name and kind found nothing.
    #[error("cannot find {kind} feature '{id}'")]
    NoSuchFeature { kind: FeatureKind, id: String },

    /// Protein translation was requested for a feature kind that has none.
    #[error("protein sequence cannot be built for feature type {0}")]
    UnsupportedFeatureType(FeatureKind),

    /// The reference returned fewer bases than the CDS spans.
    #[error("CDS {cds}: expected {expected} nucleotides, reference returned {actual}")]
    InsufficientNucleotides {
        cds: String,
        expected: usize,
        actual: usize,
    },

    /// A single-feature translation produced no amino acids.
    #[error("no amino acids could be produced for '{id}'")]
    NoAminoAcids { id: String },

    /// Variant branching would exceed the configured candidate bound.
    #[error("variant combinations exceed limit: {required} candidates required, limit is {limit}")]
    TooManyVariantCombinations { limit: usize, required: usize },

    /// A character that is not a nucleotide was found where one was required.
    #[error("invalid nucleotide '{0}'")]
    InvalidNucleotide(char),
}

impl Error {
    /// Wrap a collaborator failure with the track it was serving.
    pub fn gene_reading(track: impl Into<String>, source: Error) -> Self {
        Self::GeneReading {
            track: track.into(),
            source: Box::new(source),
        }
    }
}
