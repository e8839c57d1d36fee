use folio_lib::tei::segmenter::{segment, PageChunk, Segmentation};
use folio_lib::tei::{strip_markup, TeiDocument};

// ── Test Helpers ──────────────────────────────────────────────────────────────

fn pages(segmentation: Segmentation) -> Vec<PageChunk> {
    match segmentation {
        Segmentation::Pages(chunks) => chunks,
        Segmentation::Whole(_) => panic!("expected paged segmentation"),
    }
}

fn whole(segmentation: Segmentation) -> String {
    match segmentation {
        Segmentation::Whole(text) => text,
        Segmentation::Pages(_) => panic!("expected whole-body fallback"),
    }
}

// ── Page splitting ────────────────────────────────────────────────────────────

#[test]
fn splits_on_page_break_markers_in_document_order() {
    let body = r#"<pb n="1"/>Dear sir,<pb n="2"/>Yours truly"#;
    let chunks = pages(segment(body));

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].page_key, "1");
    assert_eq!(chunks[0].text, "Dear sir,");
    assert_eq!(chunks[1].page_key, "2");
    assert_eq!(chunks[1].text, "Yours truly");
}

#[test]
fn discards_front_matter_before_first_marker() {
    let body = r#"front matter<pb n="1"/>Dear sir,<pb n="2"/>Yours truly"#;
    let chunks = pages(segment(body));

    assert_eq!(chunks.len(), 2);
    assert!(
        chunks.iter().all(|chunk| !chunk.text.contains("front matter")),
        "front matter must not be attached to any page"
    );
}

#[test]
fn final_chunk_absorbs_trailing_content() {
    let body = "<pb n=\"1\"/>first\nline\n<pb n=\"2\"/>second\nwith trailing\n\n";
    let chunks = pages(segment(body));

    assert_eq!(chunks[1].text, "second\nwith trailing");
}

#[test]
fn markers_with_extra_attributes_are_recognized() {
    let body = r##"<pb xml:id="pb4" n="4" facs="#f4"/>page four<pb n="5" break="no"/>page five"##;
    let chunks = pages(segment(body));

    assert_eq!(chunks[0].page_key, "4");
    assert_eq!(chunks[1].page_key, "5");
}

#[test]
fn duplicate_page_numbers_extend_in_document_order() {
    let body = r#"<pb n="1"/>first part<pb n="2"/>interlude<pb n="1"/>second part"#;
    let chunks = pages(segment(body));

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].page_key, "1");
    assert_eq!(chunks[0].text, "first part\nsecond part");
    assert_eq!(chunks[1].text, "interlude");
}

#[test]
fn inline_markup_survives_in_chunk_text() {
    let body = r#"<pb n="1"/>Dear <persName>Mr. Leeser</persName>,"#;
    let chunks = pages(segment(body));

    assert_eq!(chunks[0].text, "Dear <persName>Mr. Leeser</persName>,");
}

// ── Fallback path ─────────────────────────────────────────────────────────────

#[test]
fn no_markers_yields_whole_body_fallback() {
    let body = "  A letter with no page breaks at all.  ";
    assert_eq!(whole(segment(body)), "A letter with no page breaks at all.");
}

#[test]
fn marker_without_numeric_n_is_not_a_marker() {
    let body = r##"<pb/>text continues<pb facs="#f1"/>more text"##;
    let text = whole(segment(body));
    assert!(text.contains("text continues"));
    assert!(text.contains("more text"));
}

// ── TEI document parsing ──────────────────────────────────────────────────────

#[test]
fn body_extraction_excludes_the_header() {
    let raw = concat!(
        r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">"#,
        "<teiHeader><fileDesc>catalog noise</fileDesc></teiHeader>",
        r#"<text><body><pb n="1"/>Dear sir,</body></text></TEI>"#,
    )
    .to_string();

    let document = TeiDocument::parse(raw).expect("well-formed TEI");
    assert!(!document.body().contains("catalog noise"));
    assert!(document.body().contains("Dear sir,"));
}

#[test]
fn document_without_body_falls_back_to_whole_text() {
    let raw = "<TEI><text>no body element here</text></TEI>".to_string();
    let document = TeiDocument::parse(raw).expect("well-formed TEI");
    assert!(document.body().contains("no body element here"));
}

#[test]
fn malformed_xml_is_a_parse_error() {
    let err = TeiDocument::parse("<TEI><unclosed>".to_string()).expect_err("expected parse error");
    assert_eq!(err.code(), "PARSE_ERROR");
}

// ── Plain-text rendering ──────────────────────────────────────────────────────

#[test]
fn strip_markup_removes_tags_and_collapses_whitespace() {
    let text = "Dear <persName>Mr.   Leeser</persName>,\n  yours";
    assert_eq!(strip_markup(text), "Dear Mr. Leeser, yours");
}

#[test]
fn strip_markup_of_plain_text_is_identity_modulo_trim() {
    assert_eq!(strip_markup("  already plain  "), "already plain");
}
