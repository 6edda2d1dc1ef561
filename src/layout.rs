//! Page layout for captured panels and text lines.
//!
//! All coordinates are millimetres measured from the top-left corner of the
//! page. The engine decides every position, scale and page break; the
//! [`crate::writer::DocumentWriter`] only draws what it is told.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::model::RasterSnapshot;

/// Tolerance used when comparing positions against the bottom margin.
const EPSILON: f64 = 1e-9;

/// Fixed page dimensions and spacing, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    /// Page width.
    pub width: f64,
    /// Page height.
    pub height: f64,
    /// Margin applied on every side.
    pub margin: f64,
    /// Vertical advance per text line.
    pub line_height: f64,
    /// Gap left below each placed image.
    pub block_spacing: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait with a 10 mm margin.
    pub fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 10.0,
            line_height: 7.0,
            block_spacing: 5.0,
        }
    }

    /// Sets the margin and returns the updated geometry.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the line height and returns the updated geometry.
    pub fn with_line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height;
        self
    }

    /// Sets the spacing below images and returns the updated geometry.
    pub fn with_block_spacing(mut self, block_spacing: f64) -> Self {
        self.block_spacing = block_spacing;
        self
    }

    /// Width between the left and right margins.
    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    /// Height between the top and bottom margins.
    pub fn usable_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }

    /// Lowest y position content may reach.
    pub fn bottom(&self) -> f64 {
        self.height - self.margin
    }
}

/// Ratio that fits an image into the given area while keeping its aspect ratio.
///
/// The smaller of the width and height ratios wins; the result may exceed 1.0
/// when the image is smaller than the area.
pub fn fit_ratio(
    image_width: f64,
    image_height: f64,
    available_width: f64,
    available_height: f64,
) -> f64 {
    (available_width / image_width).min(available_height / image_height)
}

/// Content to be placed on a page.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// One or more lines of text separated by `\n`.
    Text(String),
    /// A captured raster image.
    Image(RasterSnapshot),
}

impl Block {
    /// Convenience helper for building a text block.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// An element with its final position on a page.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacedElement {
    /// A single line of text whose top edge sits at `y`.
    Text {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Line content.
        content: String,
    },
    /// A scaled image.
    Image {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Placed width.
        width: f64,
        /// Placed height.
        height: f64,
        /// Source pixels.
        snapshot: RasterSnapshot,
    },
}

/// A page under construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    elements: Vec<PlacedElement>,
    y_offset: f64,
}

impl Page {
    fn new(geometry: &PageGeometry) -> Self {
        Self {
            elements: Vec::new(),
            y_offset: geometry.margin,
        }
    }

    /// Elements in placement order.
    pub fn elements(&self) -> &[PlacedElement] {
        &self.elements
    }

    /// Next free vertical position.
    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    /// Number of images on the page.
    pub fn image_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|element| matches!(element, PlacedElement::Image { .. }))
            .count()
    }
}

/// Append-only sequence of pages.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    geometry: PageGeometry,
    pages: Vec<Page>,
}

impl Document {
    /// Creates a document holding one empty page.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            pages: vec![Page::new(&geometry)],
            geometry,
        }
    }

    /// Page geometry shared by every page.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Zero-based index of the page currently being filled.
    pub fn current_page_index(&self) -> usize {
        self.pages.len() - 1
    }

    /// Cursor on the current page.
    pub fn cursor(&self) -> f64 {
        self.current_page().y_offset
    }

    /// Height left between the cursor and the bottom margin.
    pub fn remaining_height(&self) -> f64 {
        self.geometry.bottom() - self.cursor()
    }

    /// Total number of images across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(Page::image_count).sum()
    }

    /// Starts a fresh page with the cursor at the top margin.
    pub fn break_page(&mut self) {
        debug!("Starting page {}", self.pages.len() + 1);
        self.pages.push(Page::new(&self.geometry));
    }

    fn current_page(&self) -> &Page {
        // A document is created with one page and pages are never removed.
        &self.pages[self.pages.len() - 1]
    }

    fn current_page_mut(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Returns `true` when nothing has been placed on the current page.
    pub fn current_page_is_empty(&self) -> bool {
        self.current_page().elements.is_empty()
    }
}

/// Places blocks onto pages.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    /// Creates a layout engine.
    pub fn new() -> Self {
        Self
    }

    /// Places `block` at the document cursor and returns the updated document.
    pub fn place(&self, mut document: Document, block: Block) -> Document {
        match block {
            Block::Text(content) => {
                for line in content.split('\n') {
                    self.place_line(&mut document, line);
                }
            }
            Block::Image(snapshot) => self.place_image(&mut document, snapshot),
        }
        document
    }

    fn place_line(&self, document: &mut Document, line: &str) {
        let geometry = document.geometry;
        if document.cursor() + geometry.line_height > geometry.bottom() + EPSILON {
            document.break_page();
        }

        let page = document.current_page_mut();
        page.elements.push(PlacedElement::Text {
            x: geometry.margin,
            y: page.y_offset,
            content: line.to_owned(),
        });
        page.y_offset += geometry.line_height;
    }

    fn place_image(&self, document: &mut Document, snapshot: RasterSnapshot) {
        let geometry = document.geometry;
        let image_width = f64::from(snapshot.pixel_width());
        let image_height = f64::from(snapshot.pixel_height());
        if image_width <= 0.0 || image_height <= 0.0 {
            warn!("Ignoring image with empty extent");
            return;
        }

        let exhausted = document.remaining_height() <= EPSILON;
        let (mut width, mut height) = scaled_size(document, image_width, image_height);
        let overflows = exhausted || document.cursor() + height > geometry.bottom() + EPSILON;
        if overflows && !document.current_page_is_empty() {
            document.break_page();
            (width, height) = scaled_size(document, image_width, image_height);
        }

        let x = geometry.margin + (geometry.usable_width() - width).max(0.0) / 2.0;
        let page = document.current_page_mut();
        debug!(
            "Placing {}x{} px image as {:.2}x{:.2} mm at y={:.2}",
            image_width, image_height, width, height, page.y_offset
        );
        page.elements.push(PlacedElement::Image {
            x,
            y: page.y_offset,
            width,
            height,
            snapshot,
        });
        page.y_offset += height + geometry.block_spacing;
    }
}

fn scaled_size(document: &Document, image_width: f64, image_height: f64) -> (f64, f64) {
    let geometry = document.geometry();
    let ratio = fit_ratio(
        image_width,
        image_height,
        geometry.usable_width(),
        document.remaining_height(),
    );
    (image_width * ratio, image_height * ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry_100() -> PageGeometry {
        // 100 units of usable height and width with a 20 unit margin.
        PageGeometry {
            width: 140.0,
            height: 140.0,
            margin: 20.0,
            line_height: 10.0,
            block_spacing: 0.0,
        }
    }

    fn image(width: u32, height: u32) -> Block {
        Block::Image(RasterSnapshot::filled(width, height, [0, 0, 0, 255]))
    }

    fn image_sizes(page: &Page) -> Vec<(f64, f64)> {
        page.elements()
            .iter()
            .filter_map(|element| match element {
                PlacedElement::Image { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fit_ratio_takes_smaller_ratio() {
        assert_eq!(fit_ratio(200.0, 50.0, 100.0, 100.0), 0.5);
        assert_eq!(fit_ratio(50.0, 200.0, 100.0, 100.0), 0.5);
        assert_eq!(fit_ratio(25.0, 10.0, 100.0, 100.0), 4.0);
    }

    #[test]
    fn scaling_preserves_aspect_ratio() {
        let engine = LayoutEngine::new();
        let document = engine.place(Document::new(PageGeometry::a4()), image(1600, 900));
        let (width, height) = image_sizes(&document.pages()[0])[0];
        assert!((width / height - 1600.0 / 900.0).abs() < 1e-9);
        assert!((width - 190.0).abs() < 1e-9);
    }

    #[test]
    fn scaling_is_idempotent() {
        let engine = LayoutEngine::new();
        let first = engine.place(Document::new(geometry_100()), image(300, 120));
        let second = engine.place(Document::new(geometry_100()), image(300, 120));
        assert_eq!(image_sizes(&first.pages()[0]), image_sizes(&second.pages()[0]));
    }

    #[test]
    fn image_pagination_is_deterministic() {
        let run = || {
            let engine = LayoutEngine::new();
            [50, 60, 40]
                .into_iter()
                .fold(Document::new(geometry_100()), |document, height| {
                    engine.place(document, image(100, height))
                })
        };

        let document = run();
        assert_eq!(document.page_count(), 2);
        let first = image_sizes(&document.pages()[0]);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0], (100.0, 50.0));
        assert!((first[1].1 - 50.0).abs() < 1e-9);
        assert_eq!(image_sizes(&document.pages()[1]), [(100.0, 40.0)]);
        assert_eq!(document, run());
    }

    #[test]
    fn image_is_rescaled_against_fresh_page_after_break() {
        let geometry = geometry_100();
        let engine = LayoutEngine::new();
        let mut document = Document::new(geometry);
        for _ in 0..10 {
            document = engine.place(document, Block::text("line"));
        }
        assert_eq!(document.remaining_height(), 0.0);

        let document = engine.place(document, image(100, 100));
        assert_eq!(document.page_count(), 2);
        assert_eq!(image_sizes(&document.pages()[1]), [(100.0, 100.0)]);
        match &document.pages()[1].elements()[0] {
            PlacedElement::Image { y, .. } => assert_eq!(*y, geometry.margin),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn text_breaks_before_crossing_bottom_margin() {
        let engine = LayoutEngine::new();
        let document = engine.place(
            Document::new(geometry_100()),
            Block::text((0..12).map(|i| format!("row {i}")).collect::<Vec<_>>().join("\n")),
        );
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.pages()[0].elements().len(), 10);
        assert_eq!(document.pages()[1].elements().len(), 2);
        assert_eq!(document.pages()[1].y_offset(), 40.0);
    }

    #[test]
    fn narrow_image_is_centred() {
        let engine = LayoutEngine::new();
        let document = engine.place(Document::new(geometry_100()), image(50, 100));
        match &document.pages()[0].elements()[0] {
            PlacedElement::Image { x, width, .. } => {
                assert_eq!(*width, 50.0);
                assert_eq!(*x, 45.0);
            }
            other => panic!("unexpected element {other:?}"),
        }
    }
}
