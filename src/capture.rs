//! Turning rendered dashboard regions into raster snapshots.
//!
//! The composer never talks to a renderer directly. It goes through a
//! [`RegionProvider`], which can report and change a region's visibility and
//! snapshot its full content. [`capture`] wraps that contract: hidden regions
//! are shown for the duration of the snapshot and hidden again afterwards,
//! whatever the outcome.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::CaptureUnavailable;
use crate::model::RasterSnapshot;

/// Subdirectory whose images are registered as initially hidden regions.
pub const HIDDEN_SUBDIRECTORY: &str = "hidden";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Access to the rendered visual regions of a dashboard.
pub trait RegionProvider {
    /// Returns the current visibility of a region, or `None` when no region is
    /// registered under `locator`.
    fn visibility(&self, locator: &str) -> Option<bool>;

    /// Shows or hides a region.
    fn set_visibility(&mut self, locator: &str, visible: bool);

    /// Renders the full content extent of a region.
    fn snapshot(&mut self, locator: &str) -> Result<RasterSnapshot, CaptureUnavailable>;
}

impl<P: RegionProvider + ?Sized> RegionProvider for &mut P {
    fn visibility(&self, locator: &str) -> Option<bool> {
        (**self).visibility(locator)
    }

    fn set_visibility(&mut self, locator: &str, visible: bool) {
        (**self).set_visibility(locator, visible)
    }

    fn snapshot(&mut self, locator: &str) -> Result<RasterSnapshot, CaptureUnavailable> {
        (**self).snapshot(locator)
    }
}

/// Forces a region visible and restores the prior state when dropped.
struct VisibilityGuard<'a, P: RegionProvider + ?Sized> {
    provider: &'a mut P,
    locator: &'a str,
    restore_hidden: bool,
}

impl<'a, P: RegionProvider + ?Sized> VisibilityGuard<'a, P> {
    fn acquire(provider: &'a mut P, locator: &'a str, visible: bool) -> Self {
        if !visible {
            debug!("Temporarily revealing hidden region `{}`", locator);
            provider.set_visibility(locator, true);
        }
        Self {
            provider,
            locator,
            restore_hidden: !visible,
        }
    }

    fn provider(&mut self) -> &mut P {
        &mut *self.provider
    }
}

impl<P: RegionProvider + ?Sized> Drop for VisibilityGuard<'_, P> {
    fn drop(&mut self) {
        if self.restore_hidden {
            self.provider.set_visibility(self.locator, false);
        }
    }
}

/// Captures the region registered under `locator`.
///
/// Fails with [`CaptureUnavailable`] when the region is unknown, cannot be
/// rendered, or renders to an empty raster. The region's visibility is the
/// same after the call as before it.
pub fn capture<P: RegionProvider + ?Sized>(
    provider: &mut P,
    locator: &str,
) -> Result<RasterSnapshot, CaptureUnavailable> {
    let visible = provider
        .visibility(locator)
        .ok_or_else(|| CaptureUnavailable::NotFound(locator.to_owned()))?;

    let mut guard = VisibilityGuard::acquire(provider, locator, visible);
    let snapshot = guard.provider().snapshot(locator)?;

    if snapshot.pixel_width() == 0 || snapshot.pixel_height() == 0 {
        return Err(CaptureUnavailable::EmptyExtent(locator.to_owned()));
    }

    debug!(
        "Captured region `{}` at {}x{} px",
        locator,
        snapshot.pixel_width(),
        snapshot.pixel_height()
    );
    Ok(snapshot)
}

struct ImageRegion {
    pixels: image::RgbaImage,
    visible: bool,
}

/// Region provider backed by pre-rendered images.
///
/// A hidden region has nothing on screen to snapshot, so [`RegionProvider::snapshot`]
/// refuses it; [`capture`] reveals it first.
#[derive(Default)]
pub struct ImageRegions {
    regions: HashMap<String, ImageRegion>,
}

impl ImageRegions {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a region and returns the updated provider.
    pub fn with_region(
        mut self,
        locator: impl Into<String>,
        pixels: image::RgbaImage,
        visible: bool,
    ) -> Self {
        self.insert(locator, pixels, visible);
        self
    }

    /// Registers or replaces a region.
    pub fn insert(&mut self, locator: impl Into<String>, pixels: image::RgbaImage, visible: bool) {
        self.regions
            .insert(locator.into(), ImageRegion { pixels, visible });
    }

    /// Returns the number of registered regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` when no regions are registered.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Loads one region per image file in `directory`, keyed by file stem.
    ///
    /// Images under the [`HIDDEN_SUBDIRECTORY`] start out hidden. Files that fail
    /// to decode are logged and skipped; the matching sections will then be
    /// reported as unavailable during composition.
    pub fn from_directory(directory: impl AsRef<Path>) -> std::io::Result<Self> {
        let directory = directory.as_ref();
        let mut regions = Self::new();
        regions.load_directory(directory, true)?;

        let hidden = directory.join(HIDDEN_SUBDIRECTORY);
        if hidden.is_dir() {
            regions.load_directory(&hidden, false)?;
        }

        debug!(
            "Loaded {} region image(s) from {}",
            regions.len(),
            directory.display()
        );
        Ok(regions)
    }

    fn load_directory(&mut self, directory: &Path, visible: bool) -> std::io::Result<()> {
        let mut paths: Vec<_> = fs::read_dir(directory)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        paths.sort();

        for path in paths {
            let Some(locator) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match decode_image_from_path(&path) {
                Ok(image) => self.insert(locator, image.to_rgba8(), visible),
                Err(err) => warn!("Skipping region image {}: {}", path.display(), err),
            }
        }
        Ok(())
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn decode_image_from_path(path: &Path) -> image::ImageResult<image::DynamicImage> {
    image::io::Reader::open(path)?.with_guessed_format()?.decode()
}

impl RegionProvider for ImageRegions {
    fn visibility(&self, locator: &str) -> Option<bool> {
        self.regions.get(locator).map(|region| region.visible)
    }

    fn set_visibility(&mut self, locator: &str, visible: bool) {
        if let Some(region) = self.regions.get_mut(locator) {
            region.visible = visible;
        }
    }

    fn snapshot(&mut self, locator: &str) -> Result<RasterSnapshot, CaptureUnavailable> {
        let region = self
            .regions
            .get(locator)
            .ok_or_else(|| CaptureUnavailable::NotFound(locator.to_owned()))?;
        if !region.visible {
            return Err(CaptureUnavailable::Snapshot {
                locator: locator.to_owned(),
                message: "region is hidden and has no rendered content".to_owned(),
            });
        }
        Ok(RasterSnapshot::new(region.pixels.clone()))
    }
}
