//! Font discovery for the PDF writer.
//!
//! `genpdf` embeds TrueType fonts, so a regular/bold/italic/bold-italic family
//! has to be found on disk before a [`crate::writer::PdfWriter`] can be built.
//! The bundled family is searched for in, in order:
//!
//! 1. the directory named by `DASHBOARD_REPORT_FONTS_DIR`,
//! 2. `assets/fonts` next to the running executable,
//! 3. `assets/fonts` inside this crate.
//!
//! When none of them holds the bundled files, the system Liberation Sans family
//! is tried before giving up.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{self, FontData, FontFamily};
use log::warn;

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable overriding the bundled font directory.
pub const FONTS_DIR_ENV: &str = "DASHBOARD_REPORT_FONTS_DIR";

const SYSTEM_FALLBACK_FAMILY_NAME: &str = "LiberationSans";

const SYSTEM_FALLBACK_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/TTF",
];

const STYLE_SUFFIXES: &[&str] = &["Regular", "Bold", "Italic", "BoldItalic"];

fn family_files(directory: &Path, family: &str) -> Vec<PathBuf> {
    STYLE_SUFFIXES
        .iter()
        .map(|suffix| directory.join(format!("{family}-{suffix}.ttf")))
        .collect()
}

fn bundled_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env::var_os(FONTS_DIR_ENV).filter(|value| !value.is_empty()) {
        candidates.push(PathBuf::from(path));
    }

    if let Some(bin_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(bin_dir.join("assets/fonts"));
    }

    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    candidates.dedup();
    candidates
}

fn locate_family(candidates: &[PathBuf], family: &str) -> Result<PathBuf, Vec<String>> {
    let mut attempts = Vec::new();

    for candidate in candidates {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }

        let missing: Vec<String> = family_files(candidate, family)
            .iter()
            .filter(|path| !path.is_file())
            .map(|path| {
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        if missing.is_empty() {
            return Ok(candidate.clone());
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(attempts)
}

fn load_family(directory: &Path, family: &str) -> Result<FontFamily<FontData>, Error> {
    fonts::from_files(directory, family, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                family,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

fn not_found(message: String) -> Error {
    Error::new(
        message,
        io::Error::new(io::ErrorKind::NotFound, "report fonts not found"),
    )
}

fn system_fallback_directories() -> Vec<PathBuf> {
    SYSTEM_FALLBACK_DIRECTORIES
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Loads the bundled Roboto family, falling back to system Liberation Sans.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let bundled_attempts = match locate_family(&bundled_directory_candidates(), DEFAULT_FONT_FAMILY_NAME) {
        Ok(directory) => return load_family(&directory, DEFAULT_FONT_FAMILY_NAME),
        Err(attempts) => attempts,
    };

    match locate_family(&system_fallback_directories(), SYSTEM_FALLBACK_FAMILY_NAME) {
        Ok(directory) => {
            warn!(
                "Bundled fonts unavailable ({}); falling back to system '{}' family",
                bundled_attempts.join(", "),
                SYSTEM_FALLBACK_FAMILY_NAME
            );
            load_family(&directory, SYSTEM_FALLBACK_FAMILY_NAME)
        }
        Err(fallback_attempts) => Err(not_found(format!(
            "Unable to locate report fonts. Checked: {}; system fallback: {}. Set {}.",
            bundled_attempts.join(", "),
            fallback_attempts.join(", "),
            FONTS_DIR_ENV
        ))),
    }
}

/// Indicates whether [`default_font_family`] can find a font family on disk.
pub fn default_fonts_available() -> bool {
    locate_family(&bundled_directory_candidates(), DEFAULT_FONT_FAMILY_NAME).is_ok()
        || locate_family(&system_fallback_directories(), SYSTEM_FALLBACK_FAMILY_NAME).is_ok()
}

/// Returns `true` when `err` reports missing font files rather than corrupt ones.
pub fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err) if io_err.kind() == io::ErrorKind::NotFound
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_files_cover_all_styles() {
        let files = family_files(Path::new("/fonts"), "Roboto");
        assert_eq!(files[0], Path::new("/fonts/Roboto-Regular.ttf"));
        assert_eq!(files[3], Path::new("/fonts/Roboto-BoldItalic.ttf"));
    }

    #[test]
    fn locate_family_reports_every_attempt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing_dir = dir.path().join("nope");
        let attempts =
            locate_family(&[missing_dir, dir.path().to_path_buf()], "Roboto").unwrap_err();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].contains("directory missing"));
        assert!(attempts[1].contains("Roboto-Regular.ttf"));
    }

    #[test]
    fn missing_fonts_error_is_recognised() {
        assert!(fonts_missing(&not_found("gone".into())));
    }
}
