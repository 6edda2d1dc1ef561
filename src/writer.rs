//! Drawing surfaces that turn laid-out pages into bytes.
//!
//! A [`DocumentWriter`] draws exactly what it is given: it never scales,
//! wraps or paginates. Two implementations ship with the crate:
//! [`PdfWriter`], which renders through `genpdf`'s low-level renderer, and
//! [`MemoryWriter`], which records operations for previews and tests.

use std::fmt::Write as _;

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::FontCache;
use genpdf::render::Renderer;
use genpdf::style::Style;
use genpdf::{Mm, Position, Rotation, Scale, Size};

use crate::fonts;
use crate::layout::PageGeometry;
use crate::model::RasterSnapshot;
use crate::stats::ColumnStatistic;

/// Default resolution used to map snapshot pixels onto the page.
pub const DEFAULT_IMAGE_DPI: f64 = 300.0;

/// Default font size in points.
pub const DEFAULT_FONT_SIZE: u8 = 10;

const MM_PER_INCH: f64 = 25.4;

/// Primitive drawing operations used by the composer.
///
/// Coordinates are millimetres from the top-left corner of the current page.
/// A writer starts with one empty page.
pub trait DocumentWriter {
    /// Draws a single line of text whose top edge is at `y`.
    fn add_text(&mut self, x: f64, y: f64, content: &str) -> Result<(), Error>;

    /// Draws `snapshot` stretched to `width` × `height` with its top-left corner at (`x`, `y`).
    fn add_image(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        snapshot: &RasterSnapshot,
    ) -> Result<(), Error>;

    /// Appends a page and makes it current.
    fn new_page(&mut self) -> Result<(), Error>;

    /// Finishes the document and returns its bytes.
    fn serialize(self) -> Result<Vec<u8>, Error>
    where
        Self: Sized;
}

/// Formats one summary line, rounding every aggregate to two decimals.
pub fn format_statistic_line(statistic: &ColumnStatistic) -> String {
    format!(
        "{}: Avg: {:.2}, Min: {:.2}, Max: {:.2}",
        statistic.column, statistic.average, statistic.min, statistic.max
    )
}

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// PDF writer backed by `genpdf`'s renderer.
pub struct PdfWriter {
    renderer: Renderer,
    font_cache: FontCache,
    style: Style,
    page_size: Size,
    dpi: f64,
}

impl PdfWriter {
    /// Creates a writer using the default report fonts.
    pub fn new(title: &str, geometry: &PageGeometry) -> Result<Self, Error> {
        let family = fonts::default_font_family()?;
        let page_size = Size::new(mm_from_f64(geometry.width), mm_from_f64(geometry.height));
        let renderer = Renderer::new(page_size, title)?;
        let mut font_cache = FontCache::new(family);
        font_cache.load_pdf_fonts(&renderer)?;

        Ok(Self {
            renderer,
            font_cache,
            style: Style::new().with_font_size(DEFAULT_FONT_SIZE),
            page_size,
            dpi: DEFAULT_IMAGE_DPI,
        })
    }

    /// Sets the font size used for text and returns the updated writer.
    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.style = self.style.with_font_size(font_size);
        self
    }

    /// Sets the resolution used when embedding images and returns the updated writer.
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    /// Number of pages started so far.
    pub fn page_count(&self) -> usize {
        self.renderer.page_count()
    }

    fn natural_size_mm(&self, snapshot: &RasterSnapshot) -> (f64, f64) {
        (
            MM_PER_INCH * f64::from(snapshot.pixel_width()) / self.dpi,
            MM_PER_INCH * f64::from(snapshot.pixel_height()) / self.dpi,
        )
    }
}

impl DocumentWriter for PdfWriter {
    fn add_text(&mut self, x: f64, y: f64, content: &str) -> Result<(), Error> {
        let layer = self.renderer.last_page().first_layer();
        let area = layer.area();
        area.print_str(
            &self.font_cache,
            Position::new(mm_from_f64(x), mm_from_f64(y)),
            self.style,
            content,
        )?;
        Ok(())
    }

    fn add_image(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        snapshot: &RasterSnapshot,
    ) -> Result<(), Error> {
        let (natural_width, natural_height) = self.natural_size_mm(snapshot);
        if natural_width <= f64::EPSILON || natural_height <= f64::EPSILON {
            return Err(Error::new(
                "Cannot draw an image with an empty extent",
                ErrorKind::InvalidData,
            ));
        }

        // printpdf embeds RGB data; the alpha channel is dropped.
        let image = image::DynamicImage::ImageRgba8(snapshot.pixels().clone());
        let image = image::DynamicImage::ImageRgb8(image.to_rgb8());

        let layer = self.renderer.last_page().first_layer();
        let area = layer.area();
        // Images are anchored at their bottom-left corner.
        area.add_image(
            &image,
            Position::new(mm_from_f64(x), mm_from_f64(y + height)),
            Scale::new(width / natural_width, height / natural_height),
            Rotation::default(),
            Some(self.dpi),
        );
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), Error> {
        self.renderer.add_page(self.page_size);
        Ok(())
    }

    fn serialize(self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.renderer.write(&mut bytes)?;
        Ok(bytes)
    }
}

/// A drawing operation recorded by [`MemoryWriter`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// A text line.
    Text {
        /// Page index, zero-based.
        page: usize,
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Line content.
        content: String,
    },
    /// An image.
    Image {
        /// Page index, zero-based.
        page: usize,
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Placed width.
        width: f64,
        /// Placed height.
        height: f64,
        /// Source width in pixels.
        pixel_width: u32,
        /// Source height in pixels.
        pixel_height: u32,
    },
}

/// Writer that records every operation instead of rendering.
///
/// [`DocumentWriter::serialize`] produces a line-oriented text listing of the
/// recorded operations. A writer built with [`MemoryWriter::failing`] returns
/// an error from `serialize`, which is useful for exercising failure paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryWriter {
    ops: Vec<DrawOp>,
    page: usize,
    fail_on_serialize: bool,
}

impl MemoryWriter {
    /// Creates an empty writer with one page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer whose serialization always fails.
    pub fn failing() -> Self {
        Self {
            fail_on_serialize: true,
            ..Self::default()
        }
    }

    /// Recorded operations in order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page + 1
    }
}

impl DocumentWriter for MemoryWriter {
    fn add_text(&mut self, x: f64, y: f64, content: &str) -> Result<(), Error> {
        self.ops.push(DrawOp::Text {
            page: self.page,
            x,
            y,
            content: content.to_owned(),
        });
        Ok(())
    }

    fn add_image(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        snapshot: &RasterSnapshot,
    ) -> Result<(), Error> {
        self.ops.push(DrawOp::Image {
            page: self.page,
            x,
            y,
            width,
            height,
            pixel_width: snapshot.pixel_width(),
            pixel_height: snapshot.pixel_height(),
        });
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), Error> {
        self.page += 1;
        Ok(())
    }

    fn serialize(self) -> Result<Vec<u8>, Error> {
        if self.fail_on_serialize {
            return Err(Error::new(
                "Memory writer configured to fail",
                ErrorKind::Internal,
            ));
        }

        let mut listing = String::new();
        for op in &self.ops {
            // Writing into a String cannot fail.
            let _ = match op {
                DrawOp::Text { page, x, y, content } => {
                    writeln!(listing, "{page} text {x:.2} {y:.2} {content}")
                }
                DrawOp::Image {
                    page,
                    x,
                    y,
                    width,
                    height,
                    pixel_width,
                    pixel_height,
                } => writeln!(
                    listing,
                    "{page} image {x:.2} {y:.2} {width:.2} {height:.2} {pixel_width}x{pixel_height}"
                ),
            };
        }
        Ok(listing.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistic_line_rounds_to_two_decimals() {
        let line = format_statistic_line(&ColumnStatistic {
            column: "revenue".into(),
            average: 10.0 / 3.0,
            min: 1.0,
            max: 7.456,
            sample_count: 3,
        });
        assert_eq!(line, "revenue: Avg: 3.33, Min: 1.00, Max: 7.46");
    }

    #[test]
    fn memory_writer_tracks_pages() {
        let mut writer = MemoryWriter::new();
        writer.add_text(10.0, 10.0, "first").expect("text");
        writer.new_page().expect("page");
        writer
            .add_image(10.0, 10.0, 50.0, 25.0, &RasterSnapshot::filled(2, 1, [0; 4]))
            .expect("image");

        assert_eq!(writer.page_count(), 2);
        assert!(matches!(writer.ops()[1], DrawOp::Image { page: 1, .. }));

        let listing = String::from_utf8(writer.serialize().expect("serialize")).expect("utf8");
        assert_eq!(
            listing,
            "0 text 10.00 10.00 first\n1 image 10.00 10.00 50.00 25.00 2x1\n"
        );
    }

    #[test]
    fn failing_memory_writer_errors_on_serialize() {
        assert!(MemoryWriter::failing().serialize().is_err());
    }
}
