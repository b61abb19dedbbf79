use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use report_capture::capture::{crop, prepare_clone, CaptureOptions, CropPolicy, Sanitizer};
use report_capture::dom::Document;
use report_capture::readiness::DiagramCache;
use report_capture::rendering::BlockRasterizer;
use report_capture::DimensionScores;

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

/// Digest over dimensions and raw RGBA pixels of a cropped capture of the
/// fixture page.
fn capture_digest() -> (String, (u32, u32)) {
    let page = fs::read_to_string("tests/goldens/pages/report.html").expect("read fixture");
    let doc = Document::parse(&page);
    let root = doc.get_element_by_id("report-page").expect("fixture root");
    let scores = DimensionScores::new(8, 7, 5).unwrap();

    let sanitizer = Sanitizer::new(scores, DiagramCache::new());
    let options = CaptureOptions {
        scale: 1.0,
        ..CaptureOptions::default()
    }
    .with_on_clone(sanitizer.into_hook());
    let raw = BlockRasterizer::new().render(&doc, root, &options).expect("rasterize");
    let cropped = crop(&raw, &CropPolicy::default()).expect("crop");

    let mut hasher = Sha256::new();
    hasher.update(cropped.width().to_le_bytes());
    hasher.update(cropped.height().to_le_bytes());
    hasher.update(cropped.as_raw());
    (hex::encode(hasher.finalize()), cropped.dimensions())
}

#[test]
fn capture_is_deterministic() {
    assert_eq!(capture_digest(), capture_digest());
}

#[test]
fn clone_preparation_leaves_fixture_untouched() {
    let page = fs::read_to_string("tests/goldens/pages/report.html").expect("read fixture");
    let doc = Document::parse(&page);
    let root = doc.get_element_by_id("report-page").unwrap();
    let before = doc.to_html();
    let sanitizer = Sanitizer::new(DimensionScores::new(8, 7, 5).unwrap(), DiagramCache::new());
    let options = CaptureOptions::default().with_on_clone(sanitizer.into_hook());
    let clone = prepare_clone(&doc, root, &options).unwrap();
    assert_eq!(doc.to_html(), before);
    assert!(clone.elements_by_class("header-buttons").is_empty());
}

#[test]
fn golden_capture_matches_fixture() {
    let (digest, (w, h)) = capture_digest();
    assert!(w > 0 && h > 0);

    let expected_path = golden_path("report_capture.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, &digest).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let expected = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(digest, expected.trim());
}
