use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::AppError;

/// One record from the upstream normalizer's `items.json`.
///
/// Items carry many descriptive fields (titles, creators, dates); the
/// pipeline only reads the transcription reference, the manifest
/// reference(s), and the identifiers used to name output files. Everything
/// else is ignored on input.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// URL of the TEI transcription.
    #[serde(default)]
    pub xml: Option<String>,
    /// IIIF manifest URL(s). The normalizer emits both a bare string and an
    /// array depending on the source row, so both shapes are accepted.
    #[serde(default)]
    pub manifest_url: ManifestRefs,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(untagged)]
pub enum ManifestRefs {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl ManifestRefs {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::One(url) => std::slice::from_ref(url),
            Self::Many(urls) => urls,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// How annotation bodies render chunk text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Inline TEI markup kept verbatim (viewers may render it).
    #[default]
    Markup,
    /// Tags stripped, whitespace runs collapsed.
    Plain,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

/// Serializable error surface for report embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorDetail {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one (item, manifest) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOutcome {
    pub manifest_url: String,
    pub status: OutcomeStatus,
    /// Stage reached when the outcome was recorded ("written" on success).
    pub stage: String,
    pub output_path: Option<String>,
    pub matched_pages: usize,
    pub unmatched_chunks: usize,
    pub unmatched_canvases: usize,
    /// SHA-256 of the fetched manifest payload.
    pub manifest_checksum: Option<String>,
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub slug: String,
    pub status: OutcomeStatus,
    pub skip_reason: Option<String>,
    /// SHA-256 of the fetched TEI payload.
    pub tei_checksum: Option<String>,
    pub outcomes: Vec<ManifestOutcome>,
}

/// Two outputs resolving to the same destination file. The second write
/// overwrites the first; surfaced so operators can fix the upstream slugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionWarning {
    pub path: String,
    pub slugs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub items: Vec<ItemReport>,
    pub collisions: Vec<CollisionWarning>,
}

impl BatchReport {
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for item in &self.items {
            match item.status {
                OutcomeStatus::Success => succeeded += 1,
                OutcomeStatus::Failed => failed += 1,
                OutcomeStatus::Skipped => skipped += 1,
            }
        }
        (succeeded, failed, skipped)
    }
}
