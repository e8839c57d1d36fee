//! Attaches built annotations to their target canvases.

use std::collections::HashMap;

use crate::core::errors::{AppError, AppResult};
use crate::iiif::annotation::{Annotation, AnnotationPage};
use crate::iiif::manifest::Manifest;

/// Merge annotations into the manifest, grouped per target canvas.
///
/// A canvas with matches gets its `annotations` set to exactly one fresh
/// [`AnnotationPage`] (full replace, so reruns stay idempotent). A canvas
/// without matches keeps its existing `annotations` value, whatever wrote
/// it. Canvas order is never changed.
pub fn merge_annotations(manifest: &mut Manifest, annotations: &[Annotation]) -> AppResult<()> {
    let mut by_target: HashMap<&str, Vec<&Annotation>> = HashMap::new();
    for annotation in annotations {
        by_target
            .entry(annotation.target.as_str())
            .or_default()
            .push(annotation);
    }

    let Some(canvases) = manifest.canvases_mut() else {
        return Ok(());
    };
    for canvas in canvases.iter_mut() {
        let Some(matching) = by_target.get(canvas.id.as_str()) else {
            continue;
        };
        let page = AnnotationPage {
            id: format!("{}/annopage", canvas.id),
            kind: "AnnotationPage".to_string(),
            items: matching.iter().map(|annotation| (*annotation).clone()).collect(),
        };
        canvas.annotations = Some(
            serde_json::to_value(vec![page])
                .map_err(|err| AppError::Internal(err.to_string()))?,
        );
    }
    Ok(())
}
