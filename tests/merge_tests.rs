use serde_json::Value;

use folio_lib::align::{align, Alignment};
use folio_lib::core::types::TextMode;
use folio_lib::iiif::annotation::build_annotations;
use folio_lib::iiif::canvas_index::index_canvases;
use folio_lib::iiif::manifest::Manifest;
use folio_lib::iiif::merge::merge_annotations;
use folio_lib::tei::segmenter::segment;

// ── Test Helpers ──────────────────────────────────────────────────────────────

fn two_page_manifest() -> Value {
    serde_json::json!({
        "@id": "https://example.org/manifest/leeser-1",
        "@type": "sc:Manifest",
        "attribution": "Library at the Herbert D. Katz Center",
        "sequences": [{
            "@type": "sc:Sequence",
            "canvases": [
                {"@id": "https://example.org/canvas/1", "label": "p. 1", "height": 2000},
                {"@id": "https://example.org/canvas/2", "label": "p. 2", "height": 2000}
            ]
        }]
    })
}

/// Segment, index, match, build, and merge over in-memory fixtures:
/// everything between the loader and the file write.
fn align_into_manifest(tei_body: &str, manifest_json: &Value, mode: TextMode) -> (Manifest, Alignment) {
    let mut manifest =
        Manifest::from_json(&manifest_json.to_string()).expect("manifest should parse");
    let segmentation = segment(tei_body);
    let index = index_canvases(&manifest);
    let alignment = align(&segmentation, &index);
    let annotations = build_annotations(&manifest.id, &alignment, mode);
    merge_annotations(&mut manifest, &annotations).expect("merge should succeed");
    (manifest, alignment)
}

fn annotation_bodies(manifest: &Manifest) -> Vec<(String, String)> {
    let mut bodies = Vec::new();
    for canvas in manifest.canvases() {
        let Some(annotations) = &canvas.annotations else {
            continue;
        };
        let items = annotations
            .pointer("/0/items")
            .and_then(Value::as_array)
            .expect("annotation page items");
        for item in items {
            bodies.push((
                canvas.id.clone(),
                item.pointer("/body/value")
                    .and_then(Value::as_str)
                    .expect("textual body")
                    .to_string(),
            ));
        }
    }
    bodies
}

// ── Example scenario ──────────────────────────────────────────────────────────

#[test]
fn letter_pages_land_on_their_canvases() {
    let body = r#"front matter<pb n="1"/>Dear sir,<pb n="2"/>Yours truly"#;
    let (manifest, alignment) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);

    assert_eq!(alignment.matched.len(), 2);
    assert_eq!(
        annotation_bodies(&manifest),
        vec![
            ("https://example.org/canvas/1".to_string(), "Dear sir,".to_string()),
            ("https://example.org/canvas/2".to_string(), "Yours truly".to_string()),
        ]
    );

    let serialized = manifest.to_pretty_json().expect("serialize");
    assert!(
        !serialized.contains("front matter"),
        "front matter must not appear in any annotation"
    );
}

#[test]
fn annotation_ids_derive_from_manifest_and_page() {
    let body = r#"<pb n="1"/>Dear sir,"#;
    let (manifest, _) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);

    let first = &manifest.canvases()[0];
    let page = first.annotations.as_ref().expect("annotation page");
    assert_eq!(
        page.pointer("/0/id").and_then(Value::as_str),
        Some("https://example.org/canvas/1/annopage")
    );
    assert_eq!(
        page.pointer("/0/items/0/id").and_then(Value::as_str),
        Some("https://example.org/manifest/leeser-1/annotation/p1")
    );
    assert_eq!(
        page.pointer("/0/items/0/motivation").and_then(Value::as_str),
        Some("commenting")
    );
    assert_eq!(
        page.pointer("/0/items/0/target").and_then(Value::as_str),
        Some("https://example.org/canvas/1")
    );
}

// ── Idempotence ───────────────────────────────────────────────────────────────

#[test]
fn rerunning_the_merge_is_byte_identical() {
    let body = r#"<pb n="1"/>Dear sir,<pb n="2"/>Yours truly"#;
    let (first_pass, _) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);
    let first_json = first_pass.to_pretty_json().expect("serialize");

    // Second run takes the first run's output as its manifest input.
    let reparsed: Value = serde_json::from_str(&first_json).expect("round trip");
    let (second_pass, _) = align_into_manifest(body, &reparsed, TextMode::Markup);
    let second_json = second_pass.to_pretty_json().expect("serialize");

    assert_eq!(first_json, second_json);

    let page = second_pass.canvases()[0]
        .annotations
        .as_ref()
        .expect("annotation page");
    let items = page.pointer("/0/items").and_then(Value::as_array).expect("items");
    assert_eq!(items.len(), 1, "rerun must replace, not accumulate");
}

// ── Order and passthrough preservation ────────────────────────────────────────

#[test]
fn canvas_order_is_preserved_exactly() {
    let body = r#"<pb n="2"/>second page only"#;
    let (manifest, _) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);

    let ids: Vec<&str> = manifest
        .canvases()
        .iter()
        .map(|canvas| canvas.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["https://example.org/canvas/1", "https://example.org/canvas/2"]
    );
}

#[test]
fn unmatched_canvases_keep_pre_existing_annotations() {
    let foreign = serde_json::json!([{
        "id": "https://example.org/canvas/2/foreign-annopage",
        "type": "AnnotationPage",
        "items": [{"id": "curator-note-1", "body": "added by a curator"}]
    }]);
    let mut manifest_json = two_page_manifest();
    manifest_json["sequences"][0]["canvases"][1]["annotations"] = foreign.clone();

    // Only page 1 is transcribed; canvas 2 must be untouched.
    let body = r#"<pb n="1"/>Dear sir,"#;
    let (manifest, _) = align_into_manifest(body, &manifest_json, TextMode::Markup);

    assert_eq!(manifest.canvases()[1].annotations.as_ref(), Some(&foreign));
}

#[test]
fn unknown_manifest_fields_pass_through() {
    let body = r#"<pb n="1"/>Dear sir,"#;
    let (manifest, _) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);
    let serialized: Value =
        serde_json::from_str(&manifest.to_pretty_json().expect("serialize")).expect("json");

    assert_eq!(
        serialized.pointer("/attribution").and_then(Value::as_str),
        Some("Library at the Herbert D. Katz Center")
    );
    assert_eq!(
        serialized.pointer("/@type").and_then(Value::as_str),
        Some("sc:Manifest")
    );
    assert_eq!(
        serialized
            .pointer("/sequences/0/canvases/0/height")
            .and_then(Value::as_i64),
        Some(2000)
    );
}

// ── Fallback ──────────────────────────────────────────────────────────────────

#[test]
fn fallback_attaches_whole_body_to_first_canvas() {
    let body = "A short letter with no page breaks.";
    let (manifest, alignment) = align_into_manifest(body, &two_page_manifest(), TextMode::Markup);

    assert_eq!(alignment.matched.len(), 1);
    let page = manifest.canvases()[0]
        .annotations
        .as_ref()
        .expect("annotation page");
    assert_eq!(
        page.pointer("/0/items/0/id").and_then(Value::as_str),
        Some("https://example.org/manifest/leeser-1/annotation/fulltext")
    );
    assert!(manifest.canvases()[1].annotations.is_none());
}

// ── Plain-text mode ───────────────────────────────────────────────────────────

#[test]
fn plain_text_mode_strips_inline_markup_from_bodies() {
    let body = r#"<pb n="1"/>Dear <persName>Mr. Leeser</persName>,"#;
    let (manifest, _) = align_into_manifest(body, &two_page_manifest(), TextMode::Plain);

    assert_eq!(
        annotation_bodies(&manifest),
        vec![(
            "https://example.org/canvas/1".to_string(),
            "Dear Mr. Leeser,".to_string()
        )]
    );
}
