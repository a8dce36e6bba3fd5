//! Builds the final book from the cover, contents and section PDFs.

use crate::config::BookConfig;
use crate::error::{Error, Result};
use crate::geometry::{PageBox, css_to_pdf};
use crate::pdf::{self, PdfMerger};
use crate::results::{Artifact, ContentsPage, RenderedSection, SectionLayout, TocLinkRect};
use lopdf::Document;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Subdirectory the individual PDFs are moved into after a merge
pub const INDIVIDUAL_DIR: &str = "individual_pdfs";

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub output_dir: PathBuf,
    pub merged_filename: String,
    pub keep_separate: bool,
    pub organize: bool,
}

impl AssembleOptions {
    pub fn from_config(config: &BookConfig) -> Result<Self> {
        Ok(Self {
            output_dir: PathBuf::from(config.resolved_output_dir()?),
            merged_filename: config.resolved_merged_filename()?,
            keep_separate: config.keep_separate,
            organize: config.organize,
        })
    }
}

pub struct Assembler {
    options: AssembleOptions,
}

impl Assembler {
    pub fn new(options: AssembleOptions) -> Self {
        Self { options }
    }

    pub fn merged_path(&self) -> PathBuf {
        self.options.output_dir.join(&self.options.merged_filename)
    }

    /// Merges everything into one PDF with an outline entry per section and a
    /// link per contents row, and returns its path.
    ///
    /// The merged file is written first, then rewritten with the links; both
    /// writes replace the file atomically.
    pub fn merge(
        &self,
        cover: &Artifact,
        contents: &ContentsPage,
        sections: &[RenderedSection],
        layouts: &[SectionLayout],
    ) -> Result<PathBuf> {
        self.merge_with(cover, contents, sections, layouts, |document, mut out| {
            document.save_to(&mut out)?;
            Ok(())
        })
    }

    fn merge_with<W>(
        &self,
        cover: &Artifact,
        contents: &ContentsPage,
        sections: &[RenderedSection],
        layouts: &[SectionLayout],
        write_linked: W,
    ) -> Result<PathBuf>
    where
        W: FnOnce(&mut Document, &mut dyn Write) -> Result<()>,
    {
        if sections.is_empty() {
            return Err(Error::NothingToMerge);
        }

        let path = self.merged_path();
        ::log::info!("Merging {} sections into {}", sections.len(), path.display());

        let (mut document, cover_pages, first_pages) =
            self.concatenate(cover, contents, sections, layouts)?;
        pdf::save_atomically(&mut document, &path)?;
        ::log::debug!("Wrote merged document without links: {}", path.display());

        let mut document = pdf::open(&path)?;
        let added = add_contents_links(&mut document, cover_pages, &contents.link_rects, &first_pages);
        pdf::replace_atomically(&path, |out| write_linked(&mut document, out))?;

        ::log::info!(
            "Created {} ({} sections, {} contents links)",
            path.display(),
            sections.len(),
            added
        );
        Ok(path)
    }

    fn concatenate(
        &self,
        cover: &Artifact,
        contents: &ContentsPage,
        sections: &[RenderedSection],
        layouts: &[SectionLayout],
    ) -> Result<(Document, usize, HashMap<usize, usize>)> {
        let layouts: HashMap<usize, &SectionLayout> =
            layouts.iter().map(|l| (l.sequence, l)).collect();
        let mut merger = PdfMerger::new();

        merger.append(pdf::open(&cover.path)?, None)?;
        let cover_pages = merger.page_count();
        merger.append(pdf::open(&contents.artifact.path)?, None)?;
        let contents_pages = merger.page_count() - cover_pages;

        // sequence -> absolute 0-based page each section starts on
        let mut first_pages = HashMap::with_capacity(sections.len());
        for section in sections {
            let layout = layouts
                .get(&section.sequence)
                .ok_or_else(|| Error::MissingSection(section.url.clone()))?;
            let target = layout.base_page - 1 + contents_pages;
            let dest_name = format!("section_{:04}", section.sequence);

            let document = pdf::open(&section.artifact.path).map_err(|e| {
                ::log::error!("Could not read {}: {}", section.artifact.path.display(), e);
                e
            })?;
            let first_page = merger.append(document, Some((section.title.as_str(), dest_name.as_str())))?;
            if first_page != target {
                ::log::warn!(
                    "{} starts on page {} but was numbered for page {}",
                    section.title,
                    first_page,
                    target
                );
            }

            first_pages.insert(section.sequence, first_page);
        }

        Ok((merger.finish()?, cover_pages, first_pages))
    }

    /// Moves the individual PDFs into `individual_pdfs/`, or deletes them
    /// when they are not to be kept. Failures are logged and skipped.
    pub fn organize(
        &self,
        cover: &Artifact,
        contents: &ContentsPage,
        sections: &[RenderedSection],
    ) -> usize {
        let files: Vec<&Path> = std::iter::once(cover.path.as_path())
            .chain(std::iter::once(contents.artifact.path.as_path()))
            .chain(sections.iter().map(|s| s.artifact.path.as_path()))
            .collect();

        if !self.options.keep_separate {
            let removed = files
                .iter()
                .filter(|path| match std::fs::remove_file(path) {
                    Ok(()) => true,
                    Err(e) => {
                        ::log::warn!("Could not remove {}: {}", path.display(), e);
                        false
                    }
                })
                .count();
            ::log::info!("Removed {} individual PDFs", removed);
            return removed;
        }

        if !self.options.organize {
            return 0;
        }

        let target_dir = self.options.output_dir.join(INDIVIDUAL_DIR);
        if let Err(e) = std::fs::create_dir_all(&target_dir) {
            ::log::warn!("Could not create {}: {}", target_dir.display(), e);
            return 0;
        }

        let moved = files
            .iter()
            .filter(|path| {
                let Some(name) = path.file_name() else {
                    return false;
                };
                match std::fs::rename(path, target_dir.join(name)) {
                    Ok(()) => true,
                    Err(e) => {
                        ::log::warn!("Could not move {}: {}", path.display(), e);
                        false
                    }
                }
            })
            .count();
        ::log::info!("Moved {} individual PDFs to {}", moved, target_dir.display());
        moved
    }
}

/// Adds one link per contents row; rows that cannot be placed are skipped
fn add_contents_links(
    document: &mut Document,
    cover_pages: usize,
    rects: &[TocLinkRect],
    first_pages: &HashMap<usize, usize>,
) -> usize {
    let mut added = 0;
    for rect in rects {
        let Some(&target) = first_pages.get(&rect.sequence) else {
            ::log::warn!("Contents row {} has no section; skipping link", rect.sequence);
            continue;
        };

        let source = cover_pages + rect.contents_page;
        let area = css_to_pdf(rect.rect, PageBox::A4);
        match pdf::add_internal_link(document, source, area, target) {
            Ok(()) => added += 1,
            Err(e) => ::log::warn!(
                "Could not link contents row {} on page {}: {}",
                rect.sequence,
                source,
                e
            ),
        }
    }
    added
}
