//! cdsprot: reconstruct protein sequences from CDS annotations, a reference
//! genome and optional sequence variants.

pub mod error;

pub mod assembler;
pub mod cli;
pub mod codon;
pub mod config;
pub mod fasta;
pub mod feature;
pub mod fetcher;
pub mod grouper;
pub mod manager;
pub mod nucleotide;
pub mod protein;
pub mod source;
pub mod strand;
pub mod translator;
pub mod variant;
pub mod window;
