use chrono::NaiveDate;
use dashboard_report::capture::ImageRegions;
use dashboard_report::fonts;
use dashboard_report::model::{Dataset, Record, Section};
use dashboard_report::writer::PdfWriter;
use dashboard_report::{ComposerConfig, ReportArtifact, ReportComposer, ReportRequest};
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};

const SKIP_HINT: &str =
    "bundled fonts missing. Set DASHBOARD_REPORT_FONTS_DIR or copy assets/fonts next to the binary.";

fn panel(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    })
}

fn render_sample_report() -> Option<ReportArtifact> {
    if !fonts::default_fonts_available() {
        return None;
    }

    let config = ComposerConfig::default().with_report_title(Some("Weekly Sales".to_owned()));
    let regions = ImageRegions::new()
        .with_region("trend", panel(400, 200), true)
        .with_region("mix", panel(300, 300), false);
    let dataset = Dataset::new(vec![
        Record::new().with("id", 1.0).with("revenue", 120.0).with("units", "4"),
        Record::new().with("id", 2.0).with("revenue", 80.5).with("units", "6"),
    ]);
    let sections = vec![
        Section::new("trend", "Revenue Trend", "trend"),
        Section::new("mix", "Product Mix", "mix"),
        Section::new("map", "Store Map", "map"),
    ];
    let request = ReportRequest::new(dataset, sections, "Sales")
        .with_date(NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid date"));

    let writer = PdfWriter::new("Weekly Sales", &config.page)
        .expect("pdf writer")
        .with_font_size(config.font_size)
        .with_dpi(config.image_dpi);
    let artifact = ReportComposer::new(regions, config)
        .compose(&request, writer)
        .expect("compose sample report");

    Some(artifact)
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_pdf_report() {
    let Some(artifact) = render_sample_report() else {
        eprintln!("Skipping renders_pdf_report: {SKIP_HINT}");
        return;
    };
    assert!(artifact.bytes.starts_with(b"%PDF"), "output should be a PDF");
    assert_eq!(artifact.name, "Sales_dashboard_2024-01-05.pdf");
    assert_eq!(artifact.image_count, 2);
    assert_eq!(artifact.skipped.len(), 1);
    assert_eq!(artifact.skipped[0].id, "map");
}

#[test]
fn rendering_is_deterministic() {
    let Some(report_a) = render_sample_report() else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };
    let Some(report_b) = render_sample_report() else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };

    assert_eq!(
        report_a.bytes.len(),
        report_b.bytes.len(),
        "PDF sizes should match"
    );
    assert_eq!(
        normalized_hash(&report_a.bytes),
        normalized_hash(&report_b.bytes),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[cfg(feature = "bookmarks")]
#[test]
fn bookmarks_point_at_section_pages() {
    use dashboard_report::bookmarks::apply_section_bookmarks;

    let Some(artifact) = render_sample_report() else {
        eprintln!("Skipping bookmarks_point_at_section_pages: {SKIP_HINT}");
        return;
    };
    let bytes = apply_section_bookmarks(&artifact.bytes, &artifact.section_pages)
        .expect("apply bookmarks");
    let document = lopdf::Document::load_mem(&bytes).expect("reload");
    assert_eq!(document.get_pages().len(), artifact.page_count);
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(lopdf::Object::as_reference)
        .expect("root");
    let catalog = document.get_dictionary(catalog_id).expect("catalog");
    assert!(catalog.get(b"Outlines").is_ok());
}
