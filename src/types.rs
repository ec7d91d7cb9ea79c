use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One fetched product page, consumed exactly once by the extractor.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub identifier: String,
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub percentage: Option<String>,
}

/// Structured product data extracted from one page. Every field except the
/// barcode is optional; an absent field means the page did not carry the
/// marker, which is a legitimate terminal state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductRecord {
    pub barcode: String,
    pub name: Option<String>,
    pub brands: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    pub countries: Option<String>,
    pub nutri_score: Option<String>,
    pub green_score: Option<String>,
    pub green_score_final: Option<String>,
    pub carbon_impact_per_100g: Option<String>,
    pub carbon_equiv_distance: Option<String>,
    pub serving_size: Option<String>,
    pub quantity: Option<String>,
    pub packaging: Option<String>,
    pub labels: Option<String>,
    pub origin: Option<String>,
    pub manufacturing_places: Option<String>,
    pub stores: Option<String>,
    pub allergens: Option<String>,
    pub ingredients_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<Ingredient>,
    pub conservation_conditions: Option<String>,
    pub customer_service: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nutrients_100g: BTreeMap<String, f64>,
}

/// The aggregate of all successfully extracted records for a run, in input
/// identifier order. Never holds two records for the same identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<ProductRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    #[serde(rename = "FETCH_FAILED")]
    FetchFailed,
    #[serde(rename = "EXTRACT_FAILED")]
    ExtractFailed,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::FetchFailed => write!(f, "FETCH_FAILED"),
            FailureCause::ExtractFailed => write!(f, "EXTRACT_FAILED"),
        }
    }
}

/// One failed identifier in the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub identifier: String,
    pub cause: FailureCause,
    pub detail: String,
}

/// Everything a batch run produces: the dataset, the failure manifest and the
/// run summary. `dataset.len() + manifest.len()` equals the number of distinct
/// input identifiers for an uninterrupted run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub dataset: Dataset,
    pub manifest: Vec<Failure>,
}

impl BatchOutcome {
    pub fn summary(&self) -> RunSummary {
        let fetch_failed = self
            .manifest
            .iter()
            .filter(|f| f.cause == FailureCause::FetchFailed)
            .count();
        RunSummary {
            succeeded: self.dataset.len(),
            fetch_failed,
            extract_failed: self.manifest.len() - fetch_failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub fetch_failed: usize,
    pub extract_failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scraped, {} failed ({} fetch, {} extract)",
            self.succeeded,
            self.fetch_failed + self.extract_failed,
            self.fetch_failed,
            self.extract_failed
        )
    }
}

/// Outcome of persisting a dataset to object storage.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub dataset_key: String,
    pub manifest_key: Option<String>,
    pub bytes: usize,
}
