//! Gene annotation tree stored as an arena of features.
//!
//! Every feature receives a stable [`FeatureId`] when it is added to a
//! [`FeatureTree`]. Grouping and variant bookkeeping key on that id, so two
//! CDS blocks with identical coordinates in different transcripts never
//! collide.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::strand::Strand;

/// Attribute holding the transcript accession.
pub const TRANSCRIPT_ID_ATTRIBUTE: &str = "transcript_id";

/// Attributes consulted when ranking transcripts for canonical selection.
const BIOTYPE_ATTRIBUTES: [&str; 3] = ["gene_biotype", "transcript_biotype", "biotype"];
const PROTEIN_CODING: &str = "protein_coding";

/// Stable index of a feature inside its [`FeatureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u32);

impl FeatureId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Feature type from GFF/GTF column 3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureKind {
    Gene,
    Mrna,
    Transcript,
    Cds,
    StopCodon,
    Exon,
    Other(String),
}

impl FeatureKind {
    /// Parse a feature type name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "gene" => Self::Gene,
            "mrna" => Self::Mrna,
            "transcript" => Self::Transcript,
            "cds" => Self::Cds,
            "stop_codon" => Self::StopCodon,
            "exon" => Self::Exon,
            _ => Self::Other(name.to_string()),
        }
    }

    /// Lowercase type name as used for name-set matching.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Gene => "gene".to_string(),
            Self::Mrna => "mrna".to_string(),
            Self::Transcript => "transcript".to_string(),
            Self::Cds => "cds".to_string(),
            Self::StopCodon => "stop_codon".to_string(),
            Self::Exon => "exon".to_string(),
            Self::Other(name) => name.to_ascii_lowercase(),
        }
    }

    /// True if the kind's name is in `names` (compared case-insensitively).
    #[must_use]
    pub fn is_one_of(&self, names: &[&str]) -> bool {
        let name = self.name();
        names.iter().any(|n| n.eq_ignore_ascii_case(&name))
    }
}

impl From<String> for FeatureKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FeatureKind> for String {
    fn from(value: FeatureKind) -> Self {
        match value {
            FeatureKind::Gene => "gene".to_string(),
            FeatureKind::Mrna => "mRNA".to_string(),
            FeatureKind::Transcript => "transcript".to_string(),
            FeatureKind::Cds => "CDS".to_string(),
            FeatureKind::StopCodon => "stop_codon".to_string(),
            FeatureKind::Exon => "exon".to_string(),
            FeatureKind::Other(name) => name,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(name) => write!(f, "{name}"),
            known => write!(f, "{}", known.name().to_ascii_uppercase()),
        }
    }
}

/// One annotated feature (gene, transcript, CDS, exon, ...).
#[derive(Debug, Clone)]
pub struct GeneFeature {
    pub id: FeatureId,
    pub parent: Option<FeatureId>,
    pub chromosome: String,
    /// 1-based inclusive start.
    pub start: i32,
    /// 1-based inclusive end.
    pub end: i32,
    pub strand: Strand,
    pub kind: FeatureKind,
    /// Reading-frame offset (0-2); only meaningful for CDS and stop codons.
    pub frame: Option<u8>,
    pub name: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<FeatureId>,
}

impl GeneFeature {
    /// Create a detached feature; its id is assigned when added to a tree.
    #[must_use]
    pub fn new(
        kind: FeatureKind,
        chromosome: impl Into<String>,
        start: i32,
        end: i32,
        strand: Strand,
    ) -> Self {
        Self {
            id: FeatureId(u32::MAX),
            parent: None,
            chromosome: chromosome.into(),
            start,
            end,
            strand,
            kind,
            frame: None,
            name: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: u8) -> Self {
        self.frame = Some(frame);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Number of bases covered by the feature.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame offset as a base count, treating a missing frame as 0.
    #[must_use]
    pub fn frame_offset(&self) -> usize {
        self.frame.map_or(0, |f| usize::from(f.min(2)))
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn transcript_id(&self) -> Option<&str> {
        self.attribute(TRANSCRIPT_ID_ATTRIBUTE)
    }

    #[must_use]
    pub fn overlaps(&self, chromosome: &str, start: i32, end: i32) -> bool {
        self.chromosome == chromosome && self.start <= end && self.end >= start
    }

    /// Short human-readable label, e.g. `CDS chr1:100-109(+)`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{} {}:{}-{}({})",
            self.kind, self.chromosome, self.start, self.end, self.strand
        )
    }

    /// True if `other` has the same type, coordinates, frame and attributes.
    #[must_use]
    pub fn same_structure(&self, other: &GeneFeature) -> bool {
        self.kind == other.kind
            && self.start == other.start
            && self.end == other.end
            && self.frame == other.frame
            && self.attributes == other.attributes
    }

    fn is_protein_coding(&self) -> bool {
        BIOTYPE_ATTRIBUTES
            .iter()
            .any(|key| self.attribute(key) == Some(PROTEIN_CODING))
    }
}

/// Arena holding a forest of gene features.
#[derive(Debug, Clone, Default)]
pub struct FeatureTree {
    features: Vec<GeneFeature>,
    roots: Vec<FeatureId>,
}

impl FeatureTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level feature and return its id.
    pub fn add_root(&mut self, feature: GeneFeature) -> FeatureId {
        let id = self.push(feature, None);
        self.roots.push(id);
        id
    }

    /// Add `feature` as the last child of `parent`.
    pub fn add_child(&mut self, parent: FeatureId, feature: GeneFeature) -> Result<FeatureId, Error> {
        if parent.index() >= self.features.len() {
            return Err(Error::Validation(format!(
                "parent feature {parent} does not exist (tree holds {} features)",
                self.features.len()
            )));
        }
        Ok(self.push_child(parent, feature))
    }

    fn push(&mut self, mut feature: GeneFeature, parent: Option<FeatureId>) -> FeatureId {
        let id = FeatureId(self.features.len() as u32);
        feature.id = id;
        feature.parent = parent;
        feature.children.clear();
        self.features.push(feature);
        id
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&GeneFeature> {
        self.features.get(id.index())
    }

    /// Feature by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> &GeneFeature {
        &self.features[id.index()]
    }

    #[must_use]
    pub fn roots(&self) -> &[FeatureId] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, id: FeatureId) -> &[FeatureId] {
        self.get(id).map_or(&[], |f| f.children.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneFeature> {
        self.features.iter()
    }

    /// Same arena (ids unchanged) but only roots overlapping the window remain visible.
    #[must_use]
    pub fn restricted_to(&self, chromosome: &str, start: i32, end: i32) -> Self {
        let roots = self
            .roots
            .iter()
            .copied()
            .filter(|&id| self.feature(id).overlaps(chromosome, start, end))
            .collect();
        Self {
            features: self.features.clone(),
            roots,
        }
    }

    /// Depth-first search from the roots for a feature of `kind` named `name`.
    #[must_use]
    pub fn find(&self, kind: &FeatureKind, name: &str) -> Option<FeatureId> {
        self.find_in(&self.roots, kind, name)
    }

    fn find_in(&self, ids: &[FeatureId], kind: &FeatureKind, name: &str) -> Option<FeatureId> {
        for &id in ids {
            let feature = self.feature(id);
            if feature.kind.name() == kind.name() && feature.name.as_deref() == Some(name) {
                return Some(id);
            }
            if let Some(found) = self.find_in(&feature.children, kind, name) {
                return Some(found);
            }
        }
        None
    }

    /// Canonical transcript of a gene: protein-coding first, then the largest
    /// summed exon length. The first transcript wins ties.
    #[must_use]
    pub fn canonical_transcript(&self, gene: FeatureId) -> Option<FeatureId> {
        let mut best: Option<(bool, i64, FeatureId)> = None;
        for &child in self.children(gene) {
            let transcript = self.feature(child);
            if !transcript.kind.is_one_of(&["mrna", "transcript"]) {
                continue;
            }
            let exon_length: i64 = self
                .children(child)
                .iter()
                .map(|&e| self.feature(e))
                .filter(|e| e.kind == FeatureKind::Exon)
                .map(|e| i64::from((e.end - e.start).abs()))
                .sum();
            let rank = (transcript.is_protein_coding(), exon_length);
            match best {
                Some((coding, length, _)) if (coding, length) >= rank => {}
                _ => best = Some((rank.0, rank.1, child)),
            }
        }
        best.map(|(_, _, id)| id)
    }

    /// New tree in which every gene keeps only its canonical transcript.
    /// Ids are reassigned.
    #[must_use]
    pub fn with_canonical_transcripts(&self) -> Self {
        let mut out = Self::new();
        for &root in &self.roots {
            let feature = self.feature(root);
            if feature.kind != FeatureKind::Gene {
                self.copy_subtree(root, &mut out, None);
                continue;
            }
            let gene = out.add_root(feature.clone());
            if let Some(transcript) = self.canonical_transcript(root) {
                self.copy_subtree(transcript, &mut out, Some(gene));
            }
        }
        out
    }

    fn copy_subtree(&self, src: FeatureId, dest: &mut Self, parent: Option<FeatureId>) {
        let feature = self.feature(src).clone();
        let id = match parent {
            Some(parent) => dest.push_child(parent, feature),
            None => dest.add_root(feature),
        };
        for &child in self.children(src) {
            self.copy_subtree(child, dest, Some(id));
        }
    }

    fn push_child(&mut self, parent: FeatureId, feature: GeneFeature) -> FeatureId {
        let id = self.push(feature, Some(parent));
        self.features[parent.index()].children.push(id);
        id
    }

    /// Build a tree from nested records.
    pub fn from_records(records: Vec<FeatureRecord>) -> Result<Self, Error> {
        let mut tree = Self::new();
        for record in records {
            let (feature, children) = record.into_parts()?;
            let id = tree.add_root(feature);
            tree.add_records(id, children)?;
        }
        Ok(tree)
    }

    fn add_records(&mut self, parent: FeatureId, records: Vec<FeatureRecord>) -> Result<(), Error> {
        for record in records {
            let (feature, children) = record.into_parts()?;
            let id = self.add_child(parent, feature)?;
            self.add_records(id, children)?;
        }
        Ok(())
    }

    /// Read a JSON array of nested [`FeatureRecord`]s.
    pub fn from_json<R: Read>(reader: R) -> Result<Self, Error> {
        let records: Vec<FeatureRecord> = serde_json::from_reader(reader)
            .map_err(|e| Error::Parse(format!("invalid feature tree JSON: {e}")))?;
        Self::from_records(records)
    }
}

/// Serialized form of a feature and its descendants.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRecord {
    pub feature: FeatureKind,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub strand: Strand,
    #[serde(default)]
    pub frame: Option<u8>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<FeatureRecord>,
}

impl FeatureRecord {
    fn into_parts(self) -> Result<(GeneFeature, Vec<FeatureRecord>), Error> {
        if self.start > self.end {
            return Err(Error::Validation(format!(
                "feature {} {}:{}-{} has start after end",
                self.feature, self.chromosome, self.start, self.end
            )));
        }
        if let Some(frame) = self.frame {
            if frame > 2 {
                return Err(Error::Validation(format!(
                    "feature {} {}:{}-{} has frame {frame}, expected 0-2",
                    self.feature, self.chromosome, self.start, self.end
                )));
            }
        }
        let mut feature =
            GeneFeature::new(self.feature, self.chromosome, self.start, self.end, self.strand);
        feature.frame = self.frame;
        feature.name = self.name;
        feature.attributes = self.attributes;
        Ok((feature, self.children))
    }
}
