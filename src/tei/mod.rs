//! TEI transcription handling.
//!
//! A fetched TEI payload is validated for well-formedness and its `<body>`
//! element located by tree walk; segmentation then runs over the raw body
//! slice so inline markup survives verbatim. Tag-name matching ignores
//! namespace prefixes because exports vary between `<body>` and `<tei:body>`.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::{AppError, AppResult};

pub mod segmenter;

/// A loaded TEI document: the raw markup plus the byte range of the body
/// element's inner content. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct TeiDocument {
    raw: String,
    body: Range<usize>,
}

impl TeiDocument {
    /// Parse a preamble-stripped TEI payload. Malformed XML is a parse
    /// error; a well-formed document without a `<body>` element degrades to
    /// treating the whole document as the body.
    pub fn parse(raw: String) -> AppResult<Self> {
        let body = {
            let doc = roxmltree::Document::parse(&raw)
                .map_err(|err| AppError::Parse(format!("tei document: {err}")))?;
            body_inner_range(&doc).unwrap_or(0..raw.len())
        };
        Ok(Self { raw, body })
    }

    /// Raw inner content of the TEI body.
    pub fn body(&self) -> &str {
        &self.raw[self.body.clone()]
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn body_inner_range(doc: &roxmltree::Document) -> Option<Range<usize>> {
    let body = doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "body")?;
    let first = body.first_child()?;
    let last = body.last_child()?;
    Some(first.range().start..last.range().end)
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"))
}

/// Strip markup tags and collapse whitespace runs, for plain-text
/// annotation bodies.
pub fn strip_markup(text: &str) -> String {
    let without_tags = tag_pattern().replace_all(text, "");
    whitespace_run()
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}
