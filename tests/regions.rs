use std::fs;

use dashboard_report::capture::{capture, ImageRegions, RegionProvider};
use dashboard_report::CaptureUnavailable;
use image::{Rgba, RgbaImage};
use tempfile::tempdir;

fn write_png(path: &std::path::Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]))
        .save(path)
        .expect("write png");
}

#[test]
fn loads_visible_and_hidden_regions_by_file_stem() {
    let dir = tempdir().expect("temp dir");
    write_png(&dir.path().join("trend.png"), 40, 20);
    fs::create_dir(dir.path().join("hidden")).expect("hidden dir");
    write_png(&dir.path().join("hidden").join("mix.png"), 10, 10);
    fs::write(dir.path().join("notes.txt"), "not an image").expect("write notes");

    let mut regions = ImageRegions::from_directory(dir.path()).expect("load regions");

    assert_eq!(regions.len(), 2);
    assert_eq!(regions.visibility("trend"), Some(true));
    assert_eq!(regions.visibility("mix"), Some(false));
    assert_eq!(regions.visibility("notes"), None);

    let snapshot = capture(&mut regions, "mix").expect("hidden region is revealed for capture");
    assert_eq!((snapshot.pixel_width(), snapshot.pixel_height()), (10, 10));
    assert_eq!(regions.visibility("mix"), Some(false));
}

#[test]
fn undecodable_images_are_skipped() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("broken.png"), b"definitely not a png").expect("write");
    write_png(&dir.path().join("kpi.png"), 8, 4);

    let mut regions = ImageRegions::from_directory(dir.path()).expect("load regions");

    assert_eq!(regions.len(), 1);
    assert!(matches!(
        capture(&mut regions, "broken"),
        Err(CaptureUnavailable::NotFound(_))
    ));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().expect("temp dir");
    assert!(ImageRegions::from_directory(dir.path().join("absent")).is_err());
}
