//! Codon translation tables and nucleotide complement helpers.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Symbol emitted for stop codons.
pub const STOP: u8 = b'*';

/// Symbol emitted for codons containing ambiguous bases.
pub const UNKNOWN: u8 = b'X';

/// Which genetic code a [`CodonTable`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationTable {
    #[default]
    Standard,
    Mitochondrial,
}

/// Lookup table for translating codons to amino acids.
///
/// Indexed by 6-bit codon encoding: A=0, C=1, G=2, T/U=3.
/// Index = first*16 + second*4 + third.
#[derive(Debug, Clone)]
pub struct CodonTable {
    table: [u8; 64],
}

fn base_to_index(b: u8) -> Option<usize> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

impl CodonTable {
    /// Standard genetic code (NCBI translation table 1).
    #[must_use]
    pub fn standard() -> Self {
        #[rustfmt::skip]
        let table: [u8; 64] = [
            b'K', b'N', b'K', b'N',  // AA*
            b'T', b'T', b'T', b'T',  // AC*
            b'R', b'S', b'R', b'S',  // AG*
            b'I', b'I', b'M', b'I',  // AT*
            b'Q', b'H', b'Q', b'H',  // CA*
            b'P', b'P', b'P', b'P',  // CC*
            b'R', b'R', b'R', b'R',  // CG*
            b'L', b'L', b'L', b'L',  // CT*
            b'E', b'D', b'E', b'D',  // GA*
            b'A', b'A', b'A', b'A',  // GC*
            b'G', b'G', b'G', b'G',  // GG*
            b'V', b'V', b'V', b'V',  // GT*
            b'*', b'Y', b'*', b'Y',  // TA*
            b'S', b'S', b'S', b'S',  // TC*
            b'*', b'C', b'W', b'C',  // TG*
            b'L', b'F', b'L', b'F',  // TT*
        ];
        Self { table }
    }

    /// Vertebrate mitochondrial genetic code (NCBI translation table 2).
    /// Differs from standard at TGA→W, AGA→*, AGG→*, ATA→M.
    #[must_use]
    pub fn mitochondrial() -> Self {
        let mut codons = Self::standard();
        codons.table[56] = b'W';
        codons.table[8] = STOP;
        codons.table[10] = STOP;
        codons.table[12] = b'M';
        codons
    }

    #[must_use]
    pub fn for_table(table: TranslationTable) -> Self {
        match table {
            TranslationTable::Standard => Self::standard(),
            TranslationTable::Mitochondrial => Self::mitochondrial(),
        }
    }

    /// Translate a single codon to a one-letter amino acid code.
    ///
    /// Codons that are short or contain non-ACGTU bases translate to `X`.
    #[must_use]
    pub fn translate_codon(&self, codon: &[u8]) -> u8 {
        if codon.len() < 3 {
            return UNKNOWN;
        }
        match (
            base_to_index(codon[0]),
            base_to_index(codon[1]),
            base_to_index(codon[2]),
        ) {
            (Some(a), Some(b), Some(c)) => self.table[a * 16 + b * 4 + c],
            _ => UNKNOWN,
        }
    }
}

/// Complement of a single nucleotide. `N` maps to itself, `U` pairs with `A`.
pub fn complement(base: u8) -> Result<u8, Error> {
    match base.to_ascii_uppercase() {
        b'A' => Ok(b'T'),
        b'T' | b'U' => Ok(b'A'),
        b'C' => Ok(b'G'),
        b'G' => Ok(b'C'),
        b'N' => Ok(b'N'),
        other => Err(Error::InvalidNucleotide(other as char)),
    }
}

/// Reverse complement of a nucleotide string.
pub fn reverse_complement(seq: &[u8]) -> Result<Vec<u8>, Error> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Three-letter name for a one-letter amino acid code.
#[must_use]
pub fn three_letter_code(amino_acid: u8) -> &'static str {
    match amino_acid {
        b'A' => "Ala",
        b'R' => "Arg",
        b'N' => "Asn",
        b'D' => "Asp",
        b'C' => "Cys",
        b'Q' => "Gln",
        b'E' => "Glu",
        b'G' => "Gly",
        b'H' => "His",
        b'I' => "Ile",
        b'L' => "Leu",
        b'K' => "Lys",
        b'M' => "Met",
        b'F' => "Phe",
        b'P' => "Pro",
        b'S' => "Ser",
        b'T' => "Thr",
        b'W' => "Trp",
        b'Y' => "Tyr",
        b'V' => "Val",
        STOP => "Ter",
        _ => "Xaa",
    }
}
