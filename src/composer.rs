//! Report composition.
//!
//! [`ReportComposer::compose`] walks a fixed sequence of states:
//!
//! ```text
//! Idle -> Aggregating -> CapturingSections -> ComposingSummary -> Serializing -> Done
//!   \__________________________ Failed _____________________________/
//! ```
//!
//! Each captured section becomes a [`SectionOutcome`]. Sections whose region
//! is unavailable are skipped with a warning and never fail the export; only an
//! empty dataset, a timeout or a writer failure do.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};

use crate::capture::{capture, RegionProvider};
use crate::config::ComposerConfig;
use crate::error::{CaptureUnavailable, ComposeError, Result};
use crate::layout::{Block, Document, LayoutEngine, PlacedElement};
use crate::model::{Dataset, RasterSnapshot, Section};
use crate::stats::ColumnStatistic;
use crate::writer::{format_statistic_line, DocumentWriter};

/// Progress of a composition run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ComposeState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Computing column statistics.
    Aggregating,
    /// Capturing and placing sections.
    CapturingSections,
    /// Appending the statistics summary.
    ComposingSummary,
    /// Handing the pages to the writer.
    Serializing,
    /// Finished successfully.
    Done,
    /// Stopped by a fatal error.
    Failed,
}

/// Result of capturing one section.
#[derive(Debug)]
pub enum SectionOutcome {
    /// The region was captured.
    Captured {
        /// The section descriptor.
        section: Section,
        /// Captured pixels.
        snapshot: RasterSnapshot,
    },
    /// The region was unavailable and the section is left out.
    Skipped {
        /// The section descriptor.
        section: Section,
        /// Why the capture failed.
        reason: CaptureUnavailable,
    },
}

/// A section left out of the report.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedSection {
    /// Identifier of the section.
    pub id: String,
    /// Why the capture failed.
    pub reason: CaptureUnavailable,
}

/// Page holding the panel of a captured section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionPage {
    /// Identifier of the section.
    pub id: String,
    /// Title of the section.
    pub title: String,
    /// One-based page number.
    pub page: usize,
}

/// Inputs of one export.
#[derive(Clone, Debug)]
pub struct ReportRequest {
    dataset: Dataset,
    sections: Vec<Section>,
    base_name: String,
    date: NaiveDate,
}

impl ReportRequest {
    /// Creates a request dated today in local time.
    pub fn new(dataset: Dataset, sections: Vec<Section>, base_name: impl Into<String>) -> Self {
        Self {
            dataset,
            sections,
            base_name: base_name.into(),
            date: Local::now().date_naive(),
        }
    }

    /// Overrides the export date and returns the updated request.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Returns the dataset.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Returns the sections in output order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the base name used for the output file.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Returns the export date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Output file name for this request.
    pub fn output_name(&self) -> String {
        output_name(&self.base_name, self.date)
    }

    /// Fails with [`ComposeError::EmptyDataset`] when there is nothing to export.
    ///
    /// Callers can run this before acquiring a writer so that "no data" is
    /// reported ahead of any other failure.
    pub fn ensure_data(&self) -> Result<()> {
        if self.dataset.is_empty() {
            return Err(ComposeError::EmptyDataset);
        }
        Ok(())
    }
}

/// The finished report.
#[derive(Clone, Debug)]
pub struct ReportArtifact {
    /// File name, `<base>_dashboard_<YYYY-MM-DD>.pdf`.
    pub name: String,
    /// Serialized document.
    pub bytes: Vec<u8>,
    /// Number of pages written.
    pub page_count: usize,
    /// Number of captured panels placed in the document.
    pub image_count: usize,
    /// Page of every captured panel, in section order.
    pub section_pages: Vec<SectionPage>,
    /// Sections left out because their region was unavailable.
    pub skipped: Vec<SkippedSection>,
    /// Statistics listed in the summary.
    pub statistics: Vec<ColumnStatistic>,
}

/// Builds `<base_name>_dashboard_<YYYY-MM-DD>.pdf`.
pub fn output_name(base_name: &str, date: NaiveDate) -> String {
    format!("{}_dashboard_{}.pdf", base_name, date.format("%Y-%m-%d"))
}

/// Orchestrates statistics, capture, layout and serialization.
pub struct ReportComposer<P> {
    provider: P,
    config: ComposerConfig,
    layout: LayoutEngine,
    state: ComposeState,
}

impl<P: RegionProvider> ReportComposer<P> {
    /// Creates a composer drawing regions from `provider`.
    pub fn new(provider: P, config: ComposerConfig) -> Self {
        Self {
            provider,
            config,
            layout: LayoutEngine::new(),
            state: ComposeState::Idle,
        }
    }

    /// Current state; `Done` or `Failed` after [`Self::compose`] returns.
    pub fn state(&self) -> ComposeState {
        self.state
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Returns the region provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Consumes the composer, returning the region provider.
    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Composes the report described by `request` and serializes it with `writer`.
    ///
    /// Nothing is captured when the dataset is empty or the configuration is
    /// invalid. No partial output is returned on failure.
    pub fn compose<W: DocumentWriter>(
        &mut self,
        request: &ReportRequest,
        writer: W,
    ) -> Result<ReportArtifact> {
        self.state = ComposeState::Idle;
        let result = self.run(request, writer);
        if let Err(err) = &result {
            warn!("Report export failed: {}", err);
            self.transition(ComposeState::Failed);
        }
        result
    }

    fn run<W: DocumentWriter>(
        &mut self,
        request: &ReportRequest,
        writer: W,
    ) -> Result<ReportArtifact> {
        let started = Instant::now();
        request.ensure_data()?;
        self.config.validate()?;
        let deadline = Deadline::new(started, self.config.timeout());

        self.transition(ComposeState::Aggregating);
        let statistics = self.config.aggregator().aggregate(request.dataset());

        self.transition(ComposeState::CapturingSections);
        let outcomes = self.capture_sections(request.sections(), deadline)?;
        deadline.check()?;
        let document = self.open_document(request);
        let (document, section_pages, skipped) = self.place_sections(document, outcomes);

        self.transition(ComposeState::ComposingSummary);
        let document = self.place_summary(document, &statistics);

        deadline.check()?;
        self.transition(ComposeState::Serializing);
        let bytes = write_document(&document, writer).map_err(ComposeError::SerializationFailure)?;

        self.transition(ComposeState::Done);
        let artifact = ReportArtifact {
            name: request.output_name(),
            bytes,
            page_count: document.page_count(),
            image_count: document.image_count(),
            section_pages,
            skipped,
            statistics,
        };
        info!(
            "Exported {} ({} page(s), {} panel(s), {} skipped)",
            artifact.name,
            artifact.page_count,
            artifact.image_count,
            artifact.skipped.len()
        );
        Ok(artifact)
    }

    fn transition(&mut self, next: ComposeState) {
        debug!("Compose state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn capture_sections(
        &mut self,
        sections: &[Section],
        deadline: Deadline,
    ) -> Result<Vec<SectionOutcome>> {
        let mut outcomes = Vec::with_capacity(sections.len());

        for section in sections {
            deadline.check()?;

            let outcome = match capture(&mut self.provider, section.region_locator()) {
                Ok(snapshot) => SectionOutcome::Captured {
                    section: section.clone(),
                    snapshot,
                },
                Err(reason) => SectionOutcome::Skipped {
                    section: section.clone(),
                    reason,
                },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn open_document(&self, request: &ReportRequest) -> Document {
        let document = Document::new(self.config.page);
        match &self.config.report_title {
            Some(title) => self.layout.place(
                document,
                Block::text(format!(
                    "{}\nGenerated {}",
                    title,
                    request.date().format("%Y-%m-%d")
                )),
            ),
            None => document,
        }
    }

    fn place_sections(
        &self,
        document: Document,
        outcomes: Vec<SectionOutcome>,
    ) -> (Document, Vec<SectionPage>, Vec<SkippedSection>) {
        let mut section_pages = Vec::new();
        let mut skipped = Vec::new();

        let document = outcomes
            .into_iter()
            .fold(document, |document, outcome| match outcome {
                SectionOutcome::Captured { section, snapshot } => {
                    let document = self.keep_title_with_panel(document);
                    let document = self.layout.place(document, Block::text(section.title()));
                    let document = self.layout.place(document, Block::Image(snapshot));
                    section_pages.push(SectionPage {
                        id: section.id().to_owned(),
                        title: section.title().to_owned(),
                        page: document.current_page_index() + 1,
                    });
                    document
                }
                SectionOutcome::Skipped { section, reason } => {
                    warn!("Skipping section `{}`: {}", section.id(), reason);
                    skipped.push(SkippedSection {
                        id: section.id().to_owned(),
                        reason,
                    });
                    document
                }
            });

        (document, section_pages, skipped)
    }

    // Starts a new page when the title would leave less than the minimum panel
    // height below it.
    fn keep_title_with_panel(&self, mut document: Document) -> Document {
        let required = document.geometry().line_height + self.config.min_panel_height;
        if document.remaining_height() < required && !document.current_page_is_empty() {
            debug!(
                "Moving section to a new page: {:.2} mm left, {:.2} mm required",
                document.remaining_height(),
                required
            );
            document.break_page();
        }
        document
    }

    fn place_summary(&self, mut document: Document, statistics: &[ColumnStatistic]) -> Document {
        let lines: Vec<String> = if statistics.is_empty() {
            vec!["No numeric columns to summarise.".to_owned()]
        } else {
            statistics.iter().map(format_statistic_line).collect()
        };

        let required = (lines.len() + 1) as f64 * document.geometry().line_height;
        if document.remaining_height() < required && !document.current_page_is_empty() {
            document.break_page();
        }

        let document = self.layout.place(document, Block::text(self.config.summary_title.clone()));
        self.layout.place(document, Block::text(lines.join("\n")))
    }
}

/// Caller-level time budget for one composition.
#[derive(Clone, Copy, Debug)]
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(started: Instant, limit: Option<Duration>) -> Self {
        Self { started, limit }
    }

    fn check(&self) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(ComposeError::TimedOut(limit)),
            _ => Ok(()),
        }
    }
}

fn write_document<W: DocumentWriter>(
    document: &Document,
    mut writer: W,
) -> std::result::Result<Vec<u8>, genpdf::error::Error> {
    for (index, page) in document.pages().iter().enumerate() {
        if index > 0 {
            writer.new_page()?;
        }
        for element in page.elements() {
            match element {
                PlacedElement::Text { x, y, content } => writer.add_text(*x, *y, content)?,
                PlacedElement::Image {
                    x,
                    y,
                    width,
                    height,
                    snapshot,
                } => writer.add_image(*x, *y, *width, *height, snapshot)?,
            }
        }
    }
    writer.serialize()
}
