//! Lookup keys for a manifest's canvases.
//!
//! Canvas labels carry the page number in whatever form the digitization
//! lab chose ("p. 12", "12r", plain `12`). The matching key is the first
//! maximal run of ASCII digits in the label; a label with no digits yields
//! no key, and such canvases are indexed anyway so they can be reported
//! rather than silently dropped.

use crate::iiif::manifest::Manifest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasKey {
    /// Position in the manifest's canvas order.
    pub position: usize,
    pub canvas_id: String,
    /// Keys are compared as exact strings; zero-padded labels ("p.01") do
    /// not match an unpadded marker ("1") and surface as alignment gaps.
    pub page_key: Option<String>,
}

pub fn index_canvases(manifest: &Manifest) -> Vec<CanvasKey> {
    manifest
        .canvases()
        .iter()
        .enumerate()
        .map(|(position, canvas)| CanvasKey {
            position,
            canvas_id: canvas.id.clone(),
            page_key: canvas
                .label_text()
                .as_deref()
                .and_then(extract_page_key),
        })
        .collect()
}

/// First maximal digit run anywhere in the label.
pub fn extract_page_key(label: &str) -> Option<String> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let run: String = label[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some(run)
}
