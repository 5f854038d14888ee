//! FASTA-backed reference source.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Error;
use crate::source::{ReferenceSource, slice_sequence};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads gzip-compressed FASTA and yields (accession, sequence) pairs.
///
/// The accession is extracted from the header line: the first whitespace-delimited
/// token after `>`. Sequence bases are uppercased.
pub fn parse_fasta_gz<R: Read>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    parse_fasta(BufReader::new(MultiGzDecoder::new(reader)))
}

/// Reads FASTA from a buffered reader and yields (accession, sequence) pairs.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut results: Vec<(String, Vec<u8>)> = Vec::new();
    let mut current_accession: Option<String> = None;
    let mut current_sequence: Vec<u8> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            if let Some(acc) = current_accession.take() {
                results.push((acc, current_sequence));
                current_sequence = Vec::new();
            }
            current_accession = Some(extract_accession(&line)?);
        } else if current_accession.is_some() {
            let trimmed = line.trim();
            let start = current_sequence.len();
            current_sequence.extend_from_slice(trimmed.as_bytes());
            current_sequence[start..].make_ascii_uppercase();
        }
    }

    if let Some(acc) = current_accession {
        results.push((acc, current_sequence));
    }

    Ok(results)
}

/// Extracts the accession from a FASTA header line.
///
/// Tries, in order, `>gi|<digits>|ref|<accession>|`, `>ref|<accession>|`
/// and finally the first whitespace-delimited token.
fn extract_accession(header: &str) -> Result<String, Error> {
    let header = header.trim_start_matches('>');

    if header.starts_with("gi|") {
        let parts: Vec<&str> = header.split('|').collect();
        if parts.len() >= 4 && parts[2] == "ref" {
            let acc = parts[3].trim();
            if !acc.is_empty() {
                return Ok(acc.to_string());
            }
        }
    }

    if header.starts_with("ref|") {
        let parts: Vec<&str> = header.split('|').collect();
        if parts.len() >= 2 {
            let acc = parts[1].trim();
            if !acc.is_empty() {
                return Ok(acc.to_string());
            }
        }
    }

    let first_token = header.split_whitespace().next().unwrap_or("");
    if first_token.is_empty() {
        return Err(Error::Parse(format!("empty FASTA header: >{header}")));
    }
    Ok(first_token.to_string())
}

/// Whole-genome reference loaded from a FASTA file into memory.
#[derive(Debug)]
pub struct FastaReference {
    reference_id: u64,
    sequences: HashMap<String, Vec<u8>>,
}

impl FastaReference {
    pub fn new(reference_id: u64, records: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            reference_id,
            sequences: records.into_iter().collect(),
        }
    }

    /// Load a plain or gzip-compressed FASTA file; compression is detected
    /// from the magic bytes.
    pub fn from_path(path: &Path, reference_id: u64) -> Result<Self, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let records = if compressed {
            parse_fasta_gz(reader)?
        } else {
            parse_fasta(reader)?
        };
        tracing::info!(
            "Loaded {} reference sequences from {}",
            records.len(),
            path.display()
        );
        Ok(Self::new(reference_id, records))
    }

    #[must_use]
    pub fn reference_id(&self) -> u64 {
        self.reference_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence for `chromosome`, accepting names with or without a `chr` prefix.
    fn lookup(&self, chromosome: &str) -> Option<&[u8]> {
        if let Some(seq) = self.sequences.get(chromosome) {
            return Some(seq.as_slice());
        }
        let alternate = match chromosome.strip_prefix("chr") {
            Some(bare) => bare.to_string(),
            None => format!("chr{chromosome}"),
        };
        self.sequences.get(&alternate).map(Vec::as_slice)
    }
}

impl ReferenceSource for FastaReference {
    fn sequence_string(
        &self,
        start: i32,
        end: i32,
        reference_id: u64,
        chromosome: &str,
    ) -> Result<String, Error> {
        if reference_id != self.reference_id {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "reference {reference_id} is not loaded (have {})",
                    self.reference_id
                ),
            )));
        }
        let sequence = self.lookup(chromosome).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("chromosome '{chromosome}' not found in reference"),
            ))
        })?;
        Ok(slice_sequence(sequence, start, end))
    }
}
