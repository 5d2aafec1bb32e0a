//! Placement of images and single-page PDFs in the folder layout the
//! production system picks up after the import:
//!
//! ```text
//! {temp}/{volume}/images/{process}_{media}/00000001.jpg
//! {temp}/{volume}/ocr/{process}_pdf/00000001.pdf
//! ```

use lopdf::Document;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::record::PageRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    pub unit_folder: PathBuf,
    pub image_folder: PathBuf,
    pub pdf_folder: PathBuf,
}

impl AssetLayout {
    pub fn new(
        temp_folder: &Path,
        volume_identifier: &str,
        process_title: &str,
        media_folder_suffix: &str,
    ) -> Self {
        let unit_folder = temp_folder.join(volume_identifier);
        AssetLayout {
            image_folder: unit_folder
                .join("images")
                .join(format!("{process_title}{media_folder_suffix}")),
            pdf_folder: unit_folder.join("ocr").join(format!("{process_title}_pdf")),
            unit_folder,
        }
    }
}

pub fn image_file_name(physical_page_number: u32, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    format!("{physical_page_number:08}.{extension}")
}

/// `file://` location of a relocated file as stored in the METS file section.
pub fn content_location(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        format!("file:/{path}")
    } else {
        format!("file://{path}")
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

// pdf, xml and txt files as well as the Windows thumbnail cache sit next to
// the scans without following their naming convention
fn skipped_by_name_check(name: &str) -> bool {
    name.ends_with("pdf") || name.ends_with("xml") || name.ends_with(".txt") || name == "Thumbs.db"
}

/// Checks an image folder against a file naming convention. Returns one
/// message per problem, sorted by file name; an empty list means the folder
/// is fine.
pub fn validate_image_folder(folder: &Path, names: &Regex) -> Vec<String> {
    if !folder.exists() {
        return vec![format!("Folder {} does not exist", folder.display())];
    }
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => return vec![format!("{} is no readable directory: {e}", folder.display())],
    };
    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    if files.is_empty() {
        return vec![format!("{} is empty", folder.display())];
    }
    files.sort();
    files
        .into_iter()
        .filter(|name| !skipped_by_name_check(name) && !names.is_match(name))
        .map(|name| format!("{name} does not match naming conventions"))
        .collect()
}

/// Places the image of a page and returns where it ended up.
pub trait Relocate {
    fn relocate(&self, record: &PageRecord, physical_page_number: u32) -> Result<PathBuf>;
}

impl<F> Relocate for F
where
    F: Fn(&PageRecord, u32) -> Result<PathBuf>,
{
    fn relocate(&self, record: &PageRecord, physical_page_number: u32) -> Result<PathBuf> {
        self(record, physical_page_number)
    }
}

#[derive(Debug, Clone)]
pub struct AssetRelocator {
    import_folder: PathBuf,
    image_path_prefix: String,
    image_extension: String,
    pdf_segments: Vec<String>,
    pdf_year_filter: bool,
    layout: AssetLayout,
}

impl AssetRelocator {
    pub fn new(config: &ImportConfig, layout: AssetLayout) -> Self {
        AssetRelocator {
            import_folder: config.import_folder(),
            image_path_prefix: config.image_path_prefix(),
            image_extension: config.image_extension.clone(),
            pdf_segments: config.pdf_segments.clone(),
            pdf_year_filter: config.pdf_year_filter,
            layout,
        }
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Creates the destination folders; existing folders are fine.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.layout.image_folder)?;
        fs::create_dir_all(&self.layout.pdf_folder)?;
        Ok(())
    }

    /// Local file for a manifest image path: the web server prefix is
    /// replaced by the import folder.
    pub fn source_path(&self, record: &PageRecord) -> PathBuf {
        let relative = match record.image_path.strip_prefix(&self.image_path_prefix) {
            Some(rest) => rest,
            None => {
                warn!(
                    "Image path {} does not start with {}",
                    record.image_path, self.image_path_prefix
                );
                record.image_path.as_str()
            }
        };
        self.import_folder.join(relative.trim_start_matches('/'))
    }

    pub fn destination_path(&self, physical_page_number: u32) -> PathBuf {
        self.layout
            .image_folder
            .join(image_file_name(physical_page_number, &self.image_extension))
    }

    /// Copies the page image to its numbered destination.
    pub fn copy_image(&self, record: &PageRecord, physical_page_number: u32) -> Result<PathBuf> {
        let source = self.source_path(record);
        let destination = self.destination_path(physical_page_number);
        debug!("copy image from {} to {}", source.display(), destination.display());
        fs::copy(&source, &destination).map_err(|e| ImportError::AssetCopy {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(destination)
    }

    fn pdf_allowed(&self, path: &Path, year: &str) -> bool {
        let full = path.to_string_lossy();
        let in_collection = self
            .pdf_segments
            .iter()
            .any(|segment| full.contains(&format!("/{segment}/")));
        let name_matches = !self.pdf_year_filter
            || path
                .file_name()
                .map(|n| n.to_string_lossy().contains(&format!("_j{year}_")))
                .unwrap_or(false);
        in_collection && name_matches
    }

    /// Folder holding the first image of the unit.
    pub fn unit_image_folder(&self, records: &[PageRecord]) -> Option<PathBuf> {
        let first = records.first()?;
        self.source_path(first).parent().map(Path::to_path_buf)
    }

    /// PDFs lying next to the first image of the unit, restricted to the
    /// configured sub-collections.
    pub fn find_unit_pdfs(&self, records: &[PageRecord], year: &str) -> Result<Vec<PathBuf>> {
        let Some(folder) = self.unit_image_folder(records) else {
            return Ok(Vec::new());
        };
        if !folder.is_dir() {
            warn!("No image folder {} to look for pdf files", folder.display());
            return Ok(Vec::new());
        }
        let mut pdfs = Vec::new();
        for entry in fs::read_dir(&folder)? {
            let path = entry?.path();
            if path.is_file() && is_pdf(&path) && self.pdf_allowed(&path, year) {
                pdfs.push(path);
            }
        }
        pdfs.sort();
        Ok(pdfs)
    }

    /// Splits every PDF of the unit into numbered single pages. The counter
    /// runs across all PDFs of the unit. PDFs that cannot be read are logged
    /// and skipped.
    pub fn extract_pdfs(&self, records: &[PageRecord], year: &str) -> Result<u32> {
        let mut counter = 1;
        for pdf in self.find_unit_pdfs(records, year)? {
            match split_pdf(&pdf, &self.layout.pdf_folder, counter) {
                Ok(written) => {
                    info!("Split {} into {} pages", pdf.display(), written);
                    counter += written;
                }
                Err(e) => warn!("Skipping pdf {}: {}", pdf.display(), e),
            }
        }
        Ok(counter - 1)
    }
}

impl Relocate for AssetRelocator {
    fn relocate(&self, record: &PageRecord, physical_page_number: u32) -> Result<PathBuf> {
        self.copy_image(record, physical_page_number)
    }
}

/// Writes every page of `source` as its own PDF named `{n:08}.pdf`, starting
/// at `start`. Returns the number of pages written.
pub fn split_pdf(source: &Path, destination: &Path, start: u32) -> Result<u32> {
    fs::create_dir_all(destination)?;
    let document = Document::load(source)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    for (offset, page) in pages.iter().enumerate() {
        let others: Vec<u32> = pages.iter().copied().filter(|p| p != page).collect();
        let mut single = document.clone();
        single.delete_pages(&others);
        single.prune_objects();
        let target = destination.join(format!("{:08}.pdf", start + offset as u32));
        single
            .save(&target)
            .map_err(|e| ImportError::Pdf(format!("{}: {e}", target.display())))?;
    }
    Ok(pages.len() as u32)
}
