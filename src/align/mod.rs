//! Pairs page chunks with canvases by page key.
//!
//! Pure over its inputs: fetching and merging happen elsewhere. Unmatched
//! chunks and canvases are first-class outputs so alignment gaps are
//! visible to the orchestrator instead of vanishing.

use std::collections::HashSet;

use crate::iiif::canvas_index::CanvasKey;
use crate::tei::segmenter::{PageChunk, Segmentation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPage {
    pub canvas_id: String,
    /// `None` for the whole-document fallback chunk.
    pub page_key: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub matched: Vec<MatchedPage>,
    pub unmatched_chunks: Vec<PageChunk>,
    pub unmatched_canvases: Vec<CanvasKey>,
}

/// Match a segmentation against a canvas index.
///
/// Keys compare by exact string equality. When several canvases share a
/// key, each receives the chunk (broadcast). The whole-body fallback pairs
/// with the first canvas, if any.
pub fn align(segmentation: &Segmentation, canvases: &[CanvasKey]) -> Alignment {
    match segmentation {
        Segmentation::Whole(text) => match canvases.split_first() {
            Some((first, rest)) => Alignment {
                matched: vec![MatchedPage {
                    canvas_id: first.canvas_id.clone(),
                    page_key: None,
                    text: text.clone(),
                }],
                unmatched_chunks: Vec::new(),
                unmatched_canvases: rest.to_vec(),
            },
            None => Alignment::default(),
        },
        Segmentation::Pages(chunks) => align_pages(chunks, canvases),
    }
}

fn align_pages(chunks: &[PageChunk], canvases: &[CanvasKey]) -> Alignment {
    let mut matched = Vec::new();
    let mut unmatched_chunks = Vec::new();

    for chunk in chunks {
        let targets: Vec<&CanvasKey> = canvases
            .iter()
            .filter(|canvas| canvas.page_key.as_deref() == Some(chunk.page_key.as_str()))
            .collect();
        if targets.is_empty() {
            unmatched_chunks.push(chunk.clone());
            continue;
        }
        for target in targets {
            matched.push(MatchedPage {
                canvas_id: target.canvas_id.clone(),
                page_key: Some(chunk.page_key.clone()),
                text: chunk.text.clone(),
            });
        }
    }

    let chunk_keys: HashSet<&str> = chunks.iter().map(|chunk| chunk.page_key.as_str()).collect();
    let unmatched_canvases = canvases
        .iter()
        .filter(|canvas| {
            canvas
                .page_key
                .as_deref()
                .map_or(true, |key| !chunk_keys.contains(key))
        })
        .cloned()
        .collect();

    Alignment {
        matched,
        unmatched_chunks,
        unmatched_canvases,
    }
}
