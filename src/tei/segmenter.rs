//! Splits TEI body text into per-page chunks on `<pb n="..."/>` markers.
//!
//! Pattern-based on purpose: page breaks are milestone elements, so slicing
//! the raw text between marker occurrences preserves inline markup exactly.
//! Everything downstream depends only on [`Segmentation`], so a tree-walk
//! segmenter could replace this without touching the matcher or merger.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// Text of one transcribed page, keyed by the page-break marker's `n`
/// value exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub page_key: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// No numbered page-break marker found; the whole body is one chunk.
    Whole(String),
    /// Ordered page chunks, one per distinct marker value.
    Pages(Vec<PageChunk>),
}

fn pb_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<pb[^>]*\sn="(\d+)"[^>]*>"#).expect("pb marker pattern"))
}

/// Segment a TEI body into page chunks.
///
/// Text before the first marker is discarded (front matter is not attached
/// to any page); a `<pb>` without a numeric `n` attribute does not count as
/// a marker. Chunks keep document order and the final chunk absorbs all
/// trailing content.
pub fn segment(body: &str) -> Segmentation {
    let mut chunks: Vec<PageChunk> = Vec::new();
    let mut open: Option<(String, usize)> = None;

    for caps in pb_marker().captures_iter(body) {
        let marker = caps.get(0).expect("whole match");
        match open.take() {
            Some((page_key, start)) => {
                push_chunk(&mut chunks, page_key, &body[start..marker.start()]);
            }
            None => {
                let front = body[..marker.start()].trim();
                if !front.is_empty() {
                    warn!(
                        discarded_bytes = front.len(),
                        "front matter before first page break discarded"
                    );
                }
            }
        }
        open = Some((caps[1].to_string(), marker.end()));
    }

    match open {
        Some((page_key, start)) => {
            push_chunk(&mut chunks, page_key, &body[start..]);
            Segmentation::Pages(chunks)
        }
        None => Segmentation::Whole(body.trim().to_string()),
    }
}

/// Duplicate `n` values extend the earlier chunk in document order rather
/// than shadowing it, so no transcribed text is dropped.
fn push_chunk(chunks: &mut Vec<PageChunk>, page_key: String, text: &str) {
    let text = text.trim();
    if let Some(existing) = chunks.iter_mut().find(|chunk| chunk.page_key == page_key) {
        if !text.is_empty() {
            if !existing.text.is_empty() {
                existing.text.push('\n');
            }
            existing.text.push_str(text);
        }
    } else {
        chunks.push(PageChunk {
            page_key,
            text: text.to_string(),
        });
    }
}
