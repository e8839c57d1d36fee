//! Text annotation objects attached to canvases.
//!
//! Annotation ids derive from the manifest id and the page key, so
//! re-running the pipeline over the same inputs reproduces identical ids
//! and the merger can replace instead of accumulate.

use serde::{Deserialize, Serialize};

use crate::align::Alignment;
use crate::core::types::TextMode;
use crate::tei::strip_markup;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextualBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub body: TextualBody,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<Annotation>,
}

/// One annotation per matched page. Fallback (whole-body) matches take the
/// `fulltext` id so they can never collide with a genuine page annotation.
pub fn build_annotations(
    manifest_id: &str,
    alignment: &Alignment,
    mode: TextMode,
) -> Vec<Annotation> {
    alignment
        .matched
        .iter()
        .map(|page| {
            let id = match &page.page_key {
                Some(key) => format!("{manifest_id}/annotation/p{key}"),
                None => format!("{manifest_id}/annotation/fulltext"),
            };
            Annotation {
                id,
                kind: "Annotation".to_string(),
                motivation: "commenting".to_string(),
                body: TextualBody {
                    kind: "TextualBody".to_string(),
                    value: render_body(&page.text, mode),
                },
                target: page.canvas_id.clone(),
            }
        })
        .collect()
}

fn render_body(text: &str, mode: TextMode) -> String {
    match mode {
        TextMode::Markup => text.trim().to_string(),
        TextMode::Plain => strip_markup(text),
    }
}
