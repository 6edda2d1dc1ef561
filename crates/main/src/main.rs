use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dashboard_report::capture::ImageRegions;
use dashboard_report::fonts;
use dashboard_report::model::{Dataset, Section};
use dashboard_report::writer::PdfWriter;
use dashboard_report::{ComposeError, ComposerConfig, ReportComposer, ReportRequest};
use log::{error, warn};

/// Composes dashboard panel images and dataset statistics into a PDF report.
///
/// Fonts must be present under `assets/fonts` relative to the `dashboard_report`
/// crate or provided via the `DASHBOARD_REPORT_FONTS_DIR` environment variable.
#[derive(Parser)]
#[command(author, version, about = "Dashboard PDF report composer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a report from a dataset, a section list and a directory of panel images.
    Compose(ComposeArgs),
}

#[derive(Args)]
struct ComposeArgs {
    /// JSON array of records.
    #[arg(long)]
    data: PathBuf,

    /// JSON array of `{id, title, regionLocator}` sections, in output order.
    #[arg(long)]
    sections: PathBuf,

    /// Directory of rendered panel images named after their region locator.
    /// Images in a `hidden/` subdirectory start out hidden.
    #[arg(long)]
    regions: PathBuf,

    /// Base name of the output file.
    #[arg(long, default_value = "report")]
    base_name: String,

    /// Directory the PDF is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Optional JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Add a PDF outline entry per section (requires the `bookmarks` feature).
    #[arg(long)]
    bookmarks: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compose(args) => compose(args),
    };

    match result {
        Ok(path) => {
            println!("Report exported: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            let message = match err.downcast_ref::<ComposeError>() {
                Some(compose_err) => compose_err.user_message(),
                None => "Report export failed.",
            };
            eprintln!("{}", message);
            error!("{}", err);
            print_error_sources(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn compose(args: ComposeArgs) -> Result<PathBuf, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => ComposerConfig::from_json_file(path)?,
        None => ComposerConfig::default(),
    };
    let dataset = Dataset::from_json_file(&args.data)?;
    let sections = Section::list_from_json_file(&args.sections)?;
    let regions = ImageRegions::from_directory(&args.regions)?;

    let mut request = ReportRequest::new(dataset, sections, args.base_name);
    if let Some(date) = args.date {
        request = request.with_date(date);
    }
    // Report "no data" before font loading can fail.
    request.ensure_data()?;

    let title = config
        .report_title
        .clone()
        .unwrap_or_else(|| request.base_name().to_owned());
    let writer = PdfWriter::new(&title, &config.page)
        .map_err(|err| {
            if fonts::fonts_missing(&err) {
                warn!(
                    "Set {} to a directory containing the report fonts",
                    fonts::FONTS_DIR_ENV
                );
            }
            err
        })?
        .with_font_size(config.font_size)
        .with_dpi(config.image_dpi);

    let mut composer = ReportComposer::new(regions, config);
    let artifact = composer.compose(&request, writer)?;
    for skipped in &artifact.skipped {
        warn!("Section `{}` was left out: {}", skipped.id, skipped.reason);
    }

    let bytes = if args.bookmarks {
        with_bookmarks(artifact.bytes, &artifact.section_pages)?
    } else {
        artifact.bytes
    };

    fs::create_dir_all(&args.out_dir)?;
    let path = args.out_dir.join(&artifact.name);
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(feature = "bookmarks")]
fn with_bookmarks(
    bytes: Vec<u8>,
    sections: &[dashboard_report::composer::SectionPage],
) -> Result<Vec<u8>, Box<dyn Error>> {
    Ok(dashboard_report::bookmarks::apply_section_bookmarks(
        &bytes, sections,
    )?)
}

#[cfg(not(feature = "bookmarks"))]
fn with_bookmarks(
    _bytes: Vec<u8>,
    _sections: &[dashboard_report::composer::SectionPage],
) -> Result<Vec<u8>, Box<dyn Error>> {
    Err("Enable the `bookmarks` feature to add section bookmarks".into())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
