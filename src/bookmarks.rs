//! PDF outline entries for captured sections, written with `lopdf`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

use crate::composer::SectionPage;

/// Errors that can occur while embedding bookmarks into a rendered report.
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    #[error("Failed to process PDF bytes: {0}")]
    Pdf(#[from] lopdf::Error),
    /// The document trailer has no catalog reference.
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    /// The catalog object is not a dictionary.
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    /// A section points at a page the document does not have.
    #[error("Section `{section_id}` refers to missing page {page}")]
    MissingPage {
        /// Identifier of the section.
        section_id: String,
        /// The requested (1-indexed) page number.
        page: usize,
    },
}

impl From<std::io::Error> for BookmarkError {
    fn from(err: std::io::Error) -> Self {
        Self::Pdf(err.into())
    }
}

/// Adds a flat outline with one `/Dest [page /Fit]` entry per section.
///
/// Returns the input unchanged when `sections` is empty.
pub fn apply_section_bookmarks(
    pdf_bytes: &[u8],
    sections: &[SectionPage],
) -> Result<Vec<u8>, BookmarkError> {
    if sections.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();
    let entries = outline_entries(&mut document, sections, &pages)?;

    let outlines_id = document.new_object_id();
    link_entries(outlines_id, &mut document, &entries);
    insert_outlines_root(outlines_id, &mut document, &entries)?;

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
    section_id: String,
}

fn outline_entries(
    document: &mut Document,
    sections: &[SectionPage],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry>, BookmarkError> {
    sections
        .iter()
        .map(|section| {
            let page_ref = u32::try_from(section.page)
                .ok()
                .and_then(|page| pages.get(&page).copied())
                .ok_or_else(|| BookmarkError::MissingPage {
                    section_id: section.id.clone(),
                    page: section.page,
                })?;
            Ok(OutlineEntry {
                object_id: document.new_object_id(),
                page_ref,
                title: section.title.clone(),
                section_id: section.id.clone(),
            })
        })
        .collect()
}

fn link_entries(outlines_id: ObjectId, document: &mut Document, entries: &[OutlineEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", Object::string_literal(entry.title.as_str()));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));
        dictionary.set("NM", Object::string_literal(entry.section_id.as_str()));

        if let Some(previous) = index.checked_sub(1).and_then(|prev| entries.get(prev)) {
            dictionary.set("Prev", Object::Reference(previous.object_id));
        }
        if let Some(next) = entries.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.object_id));
        }

        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }
}

fn insert_outlines_root(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry],
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name("Outlines".into()));
    outlines.set("Count", Object::Integer(entries.len() as i64));
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        outlines.set("First", Object::Reference(first.object_id));
        outlines.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(outlines));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("PageMode", Object::Name("UseOutlines".into()));

    Ok(())
}
