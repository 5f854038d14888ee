//! Genomic track window a reconstruction request is scoped to.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A chromosome interval on one gene track, 1-based inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackWindow {
    pub track_id: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub reference_id: Option<u64>,
}

impl TrackWindow {
    pub fn new(track_id: impl Into<String>, chromosome: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            track_id: track_id.into(),
            chromosome: chromosome.into(),
            start,
            end,
            reference_id: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference_id: u64) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    /// Check the window is non-empty and names a chromosome.
    pub fn validate(&self) -> Result<(), Error> {
        if self.chromosome.is_empty() {
            return Err(Error::Validation(format!(
                "track {} has no chromosome",
                self.track_id
            )));
        }
        if self.start < 1 || self.start > self.end {
            return Err(Error::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// The reference genome id, or [`Error::MissingReferenceId`].
    pub fn require_reference_id(&self) -> Result<u64, Error> {
        self.reference_id.ok_or(Error::MissingReferenceId)
    }

    /// Copy of the window with different bounds.
    #[must_use]
    pub fn with_bounds(&self, start: i32, end: i32) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }
}
