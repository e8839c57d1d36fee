//! Drives the alignment pipeline over a collection of items.
//!
//! Every failure is scoped to one (item, manifest) pair: it becomes a
//! recorded outcome and the batch keeps going. The TEI for an item is
//! fetched and segmented once, then shared across that item's manifests.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::align::{align, Alignment};
use crate::core::errors::{AppError, AppResult};
use crate::core::types::{
    BatchReport, CollisionWarning, Item, ItemReport, ManifestOutcome, OutcomeStatus, TextMode,
};
use crate::iiif::annotation::build_annotations;
use crate::iiif::canvas_index::index_canvases;
use crate::iiif::manifest::Manifest;
use crate::iiif::merge::merge_annotations;
use crate::loader::{checksum, MarkupLoader};
use crate::tei::segmenter::{segment, Segmentation};
use crate::tei::TeiDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Segmenting,
    Indexing,
    Matching,
    Merging,
    Writing,
    Written,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Segmenting => "segmenting",
            Self::Indexing => "indexing",
            Self::Matching => "matching",
            Self::Merging => "merging",
            Self::Writing => "writing",
            Self::Written => "written",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    /// Max items in flight at once. Manifests within an item run
    /// sequentially; items are independent.
    pub concurrency: usize,
    pub text_mode: TextMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("public/manifests"),
            concurrency: 4,
            text_mode: TextMode::Markup,
        }
    }
}

pub struct Pipeline {
    loader: MarkupLoader,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> AppResult<Self> {
        Ok(Self {
            loader: MarkupLoader::new()?,
            config,
        })
    }

    /// Process every item and return the batch report. Nothing in here is
    /// fatal to the batch: per-item and per-manifest failures are recorded
    /// outcomes.
    pub async fn run(&self, items: &[Item]) -> AppResult<BatchReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|err| AppError::Io(err.to_string()))?;

        info!(%run_id, items = items.len(), "starting alignment batch");

        let reports: Vec<ItemReport> = stream::iter(items.iter().map(|item| self.process_item(item)))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let collisions = detect_collisions(&reports);
        for collision in &collisions {
            warn!(
                path = %collision.path,
                slugs = ?collision.slugs,
                "output path collision; last write wins"
            );
        }

        Ok(BatchReport {
            run_id,
            started_at,
            ended_at: Utc::now(),
            items: reports,
            collisions,
        })
    }

    async fn process_item(&self, item: &Item) -> ItemReport {
        let slug = resolve_slug(item);
        let manifests = item.manifest_url.as_slice();

        // Items without both references cannot be aligned; skipping them is
        // expected, not an error.
        let Some(tei_url) = item.xml.as_deref().filter(|url| !url.trim().is_empty()) else {
            return skipped(slug, "item has no transcription reference");
        };
        if manifests.is_empty() {
            return skipped(slug, "item has no manifest references");
        }

        let tei_raw = match self.loader.fetch_tei(tei_url).await {
            Ok(raw) => raw,
            Err(err) => return self.item_failed(slug, manifests, Stage::Loading, err),
        };
        let tei_checksum = checksum(tei_raw.as_bytes());
        let document = match TeiDocument::parse(tei_raw) {
            Ok(document) => document,
            Err(err) => return self.item_failed(slug, manifests, Stage::Segmenting, err),
        };
        let segmentation = segment(document.body());

        let mut outcomes = Vec::with_capacity(manifests.len());
        for (index, url) in manifests.iter().enumerate() {
            let out_name = output_name(&slug, index);
            outcomes.push(self.process_manifest(url, &segmentation, &out_name).await);
        }

        let status = if outcomes
            .iter()
            .any(|outcome| outcome.status == OutcomeStatus::Success)
        {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::Failed
        };

        ItemReport {
            slug,
            status,
            skip_reason: None,
            tei_checksum: Some(tei_checksum),
            outcomes,
        }
    }

    async fn process_manifest(
        &self,
        url: &str,
        segmentation: &Segmentation,
        out_name: &str,
    ) -> ManifestOutcome {
        match self.align_and_write(url, segmentation, out_name).await {
            Ok(outcome) => outcome,
            Err((stage, err)) => {
                error!(
                    manifest = url,
                    stage = stage.as_str(),
                    code = err.code(),
                    "manifest processing failed: {err}"
                );
                ManifestOutcome {
                    manifest_url: url.to_string(),
                    status: OutcomeStatus::Failed,
                    stage: stage.as_str().to_string(),
                    output_path: None,
                    matched_pages: 0,
                    unmatched_chunks: 0,
                    unmatched_canvases: 0,
                    manifest_checksum: None,
                    error: Some((&err).into()),
                }
            }
        }
    }

    async fn align_and_write(
        &self,
        url: &str,
        segmentation: &Segmentation,
        out_name: &str,
    ) -> Result<ManifestOutcome, (Stage, AppError)> {
        let raw = self
            .loader
            .fetch_text(url)
            .await
            .map_err(|err| (Stage::Loading, err))?;
        let manifest_checksum = checksum(raw.as_bytes());
        let mut manifest = Manifest::from_json(&raw).map_err(|err| (Stage::Indexing, err))?;

        let index = index_canvases(&manifest);
        let alignment = align(segmentation, &index);
        report_gaps(url, segmentation, &alignment);

        let annotations = build_annotations(&manifest.id, &alignment, self.config.text_mode);
        merge_annotations(&mut manifest, &annotations).map_err(|err| (Stage::Merging, err))?;

        let json = manifest
            .to_pretty_json()
            .map_err(|err| (Stage::Merging, err))?;
        let path = self.config.output_dir.join(out_name);
        tokio::fs::write(&path, json)
            .await
            .map_err(|err| (Stage::Writing, AppError::Io(err.to_string())))?;

        info!(
            manifest = url,
            output = %path.display(),
            matched = alignment.matched.len(),
            "manifest written"
        );

        Ok(ManifestOutcome {
            manifest_url: url.to_string(),
            status: OutcomeStatus::Success,
            stage: Stage::Written.as_str().to_string(),
            output_path: Some(path.to_string_lossy().into_owned()),
            matched_pages: alignment.matched.len(),
            unmatched_chunks: alignment.unmatched_chunks.len(),
            unmatched_canvases: alignment.unmatched_canvases.len(),
            manifest_checksum: Some(manifest_checksum),
            error: None,
        })
    }

    fn item_failed(
        &self,
        slug: String,
        manifests: &[String],
        stage: Stage,
        err: AppError,
    ) -> ItemReport {
        error!(
            slug = %slug,
            stage = stage.as_str(),
            code = err.code(),
            "item failed before manifest processing: {err}"
        );
        let outcomes = manifests
            .iter()
            .map(|url| ManifestOutcome {
                manifest_url: url.clone(),
                status: OutcomeStatus::Failed,
                stage: stage.as_str().to_string(),
                output_path: None,
                matched_pages: 0,
                unmatched_chunks: 0,
                unmatched_canvases: 0,
                manifest_checksum: None,
                error: Some((&err).into()),
            })
            .collect();
        ItemReport {
            slug,
            status: OutcomeStatus::Failed,
            skip_reason: None,
            tei_checksum: None,
            outcomes,
        }
    }
}

fn skipped(slug: String, reason: &str) -> ItemReport {
    info!(slug = %slug, reason, "item skipped");
    ItemReport {
        slug,
        status: OutcomeStatus::Skipped,
        skip_reason: Some(reason.to_string()),
        tei_checksum: None,
        outcomes: Vec::new(),
    }
}

/// Alignment gaps are operator-facing: they mean a page of transcription
/// has no image, or an image has no transcription.
fn report_gaps(url: &str, segmentation: &Segmentation, alignment: &Alignment) {
    for chunk in &alignment.unmatched_chunks {
        warn!(
            manifest = url,
            page = %chunk.page_key,
            "transcribed page has no matching canvas"
        );
    }
    for canvas in &alignment.unmatched_canvases {
        match &canvas.page_key {
            Some(key) => warn!(
                manifest = url,
                canvas = %canvas.canvas_id,
                page = %key,
                "canvas has no matching transcription"
            ),
            None => warn!(
                manifest = url,
                canvas = %canvas.canvas_id,
                "canvas label yields no page number"
            ),
        }
    }
    if matches!(segmentation, Segmentation::Whole(_)) && alignment.matched.is_empty() {
        warn!(manifest = url, "no canvases found to attach full-text fallback");
    }
}

pub fn resolve_slug(item: &Item) -> String {
    let base = item
        .slug
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| item.id.as_deref().filter(|value| !value.trim().is_empty()));
    match base {
        Some(value) => slug::slugify(value),
        None => Uuid::new_v4().to_string(),
    }
}

/// First manifest keeps the bare slug; later manifests of the same item
/// get a 1-based index suffix so they cannot overwrite it.
pub fn output_name(slug: &str, manifest_index: usize) -> String {
    if manifest_index == 0 {
        format!("{slug}.json")
    } else {
        format!("{slug}-{}.json", manifest_index + 1)
    }
}

fn detect_collisions(items: &[ItemReport]) -> Vec<CollisionWarning> {
    let mut by_path: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in items {
        for outcome in &item.outcomes {
            if let Some(path) = outcome.output_path.as_deref() {
                by_path.entry(path).or_default().push(item.slug.as_str());
            }
        }
    }
    let mut collisions: Vec<CollisionWarning> = by_path
        .into_iter()
        .filter(|(_, slugs)| slugs.len() > 1)
        .map(|(path, slugs)| CollisionWarning {
            path: path.to_string(),
            slugs: slugs.into_iter().map(str::to_string).collect(),
        })
        .collect();
    collisions.sort_by(|a, b| a.path.cmp(&b.path));
    collisions
}
