//! Shared value types for occupation annotation.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! invariants (ratings are in `1..=5`, industries come from a closed set) and
//! the row types define the column layout of every table the jobs read and
//! write.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OccupationTitle, TaskDescription};

// ---------------------------------------------------------------------------
// Industry classification
// ---------------------------------------------------------------------------

/// The closed set of industry categories an occupation can be classified into.
///
/// Serialised using the human-readable label, which is also the exact string
/// the LLM is constrained to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndustryCategory {
    #[serde(rename = "Aerospace and Defense")]
    AerospaceAndDefense,
    #[serde(rename = "Artificial Intelligence")]
    ArtificialIntelligence,
    #[serde(rename = "Bio-tech")]
    BioTech,
    #[serde(rename = "Clean Energy")]
    CleanEnergy,
    #[serde(rename = "Life Sciences")]
    LifeSciences,
    #[serde(rename = "Quantum Computing")]
    QuantumComputing,
    #[serde(rename = "Information Technology")]
    InformationTechnology,
    /// Fallback when the occupation does not closely fit any other category.
    #[serde(rename = "None of the above")]
    NoneOfTheAbove,
}

impl IndustryCategory {
    /// Every category, in the order presented to the model.
    pub const ALL: [IndustryCategory; 8] = [
        IndustryCategory::AerospaceAndDefense,
        IndustryCategory::ArtificialIntelligence,
        IndustryCategory::BioTech,
        IndustryCategory::CleanEnergy,
        IndustryCategory::LifeSciences,
        IndustryCategory::QuantumComputing,
        IndustryCategory::InformationTechnology,
        IndustryCategory::NoneOfTheAbove,
    ];

    /// Returns the label used in prompts, schemas, and output tables.
    pub fn label(self) -> &'static str {
        match self {
            IndustryCategory::AerospaceAndDefense => "Aerospace and Defense",
            IndustryCategory::ArtificialIntelligence => "Artificial Intelligence",
            IndustryCategory::BioTech => "Bio-tech",
            IndustryCategory::CleanEnergy => "Clean Energy",
            IndustryCategory::LifeSciences => "Life Sciences",
            IndustryCategory::QuantumComputing => "Quantum Computing",
            IndustryCategory::InformationTechnology => "Information Technology",
            IndustryCategory::NoneOfTheAbove => "None of the above",
        }
    }

    /// Looks up a category by its exact label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for IndustryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Exposure rating
// ---------------------------------------------------------------------------

/// Returned when an integer outside `1..=5` is offered as an [`ExposureRating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("exposure rating must be between 1 and 5, got {0}")]
pub struct RatingOutOfRange(pub i64);

/// How replaceable a task is by AI, from 1 (not at all) to 5 (better than an
/// expert human).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ExposureRating(u8);

impl ExposureRating {
    /// Lowest permitted rating.
    pub const MIN: i64 = 1;
    /// Highest permitted rating.
    pub const MAX: i64 = 5;

    /// Creates a rating, returning `None` if `value` is outside `1..=5`.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    /// Returns the rating as an integer.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for ExposureRating {
    type Error = RatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(RatingOutOfRange(value))
    }
}

impl From<ExposureRating> for i64 {
    fn from(rating: ExposureRating) -> Self {
        i64::from(rating.0)
    }
}

impl std::fmt::Display for ExposureRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// A row type stored as one line of a CSV table.
pub trait TableRow {
    /// Header names in serialisation order.
    const COLUMNS: &'static [&'static str];
}

/// One row of the occupation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupationRow {
    /// The occupation to annotate.
    pub occupation_title: OccupationTitle,
}

impl TableRow for OccupationRow {
    const COLUMNS: &'static [&'static str] = &["occupation_title"];
}

/// Output of the classification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedOccupationRow {
    /// The classified occupation.
    pub occupation_title: OccupationTitle,
    /// Industry the model assigned.
    pub industry_classification: IndustryCategory,
}

impl TableRow for ClassifiedOccupationRow {
    const COLUMNS: &'static [&'static str] = &["occupation_title", "industry_classification"];
}

/// Output of the task generation job, and input of the rating job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupationTaskRow {
    /// The occupation the task belongs to.
    pub occupation_title: OccupationTitle,
    /// One task performed in the occupation.
    pub task: TaskDescription,
}

impl TableRow for OccupationTaskRow {
    const COLUMNS: &'static [&'static str] = &["occupation_title", "task"];
}

/// Output of the rating job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedTaskRow {
    /// The occupation the task belongs to.
    pub occupation_title: OccupationTitle,
    /// The rated task.
    pub task: TaskDescription,
    /// AI exposure of the task, 1 to 5.
    pub rating: ExposureRating,
}

impl TableRow for RatedTaskRow {
    const COLUMNS: &'static [&'static str] = &["occupation_title", "task", "rating"];
}
