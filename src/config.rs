use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::codon::{CodonTable, TranslationTable};

const DEFAULT_MAX_VARIANT_COMBINATIONS: usize = 4096;

/// Tunables for protein reconstruction, read from camelCase JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconstructionConfig {
    /// Upper bound on whole-transcript variant candidates.
    pub max_variant_combinations: usize,
    /// Stitch a short final codon with bases from the following CDS.
    pub extend_across_boundary: bool,
    pub translation_table: TranslationTable,
    /// Chromosomes translated with the mitochondrial code regardless of `translation_table`.
    pub mitochondrial_chromosomes: Vec<String>,
    /// Attributes carrying a precomputed protein translation.
    pub translation_attribute_tags: Vec<String>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            max_variant_combinations: DEFAULT_MAX_VARIANT_COMBINATIONS,
            extend_across_boundary: true,
            translation_table: TranslationTable::Standard,
            mitochondrial_chromosomes: vec!["MT".to_string(), "chrM".to_string(), "M".to_string()],
            translation_attribute_tags: vec!["translation_seq".to_string()],
        }
    }
}

impl ReconstructionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_variant_combinations == 0 {
            bail!("maxVariantCombinations must be at least 1");
        }
        if let Some(tag) = self.translation_attribute_tags.iter().find(|t| t.trim().is_empty()) {
            bail!("invalid translation attribute tag: '{tag}'");
        }
        Ok(())
    }

    /// Codon table for `chromosome`.
    #[must_use]
    pub fn codon_table_for(&self, chromosome: &str) -> CodonTable {
        let mitochondrial = self
            .mitochondrial_chromosomes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(chromosome));
        if mitochondrial {
            CodonTable::mitochondrial()
        } else {
            CodonTable::for_table(self.translation_table)
        }
    }
}
