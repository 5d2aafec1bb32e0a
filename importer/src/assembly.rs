//! Builds the document tree of one unit: logical structure from the
//! catalogue, one `BoundBook` with a page per record, and the references
//! between them.

use catalogue::{BibRecord, MetadataField};
use tracing::{debug, warn};

use crate::assets::{Relocate, content_location};
use crate::error::Result;
use crate::grouping::unit_year;
use crate::identifier::normalize_identifier;
use crate::issue::{IssueNumbering, is_numeric, usable_issue_number};
use crate::record::PageRecord;
use crate::tree::{DocKind, DocumentTree, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// One `PeriodicalIssue` per booklet directly below the top node instead
    /// of one flat volume.
    pub create_issues: bool,
    pub title_prefix: String,
    pub volume_identifier: String,
    pub numbering: IssueNumbering,
    pub viewer_sub_theme: String,
    pub collection: String,
    pub identifier_prefix: String,
}

fn issue_title(config: &AssemblyConfig, year: &str, nr: Option<&str>) -> String {
    match (config.numbering, nr) {
        (IssueNumbering::Legacy, Some(nr)) => format!("Heft {nr} / {year}"),
        (IssueNumbering::Numeric, Some(nr)) if is_numeric(nr) => {
            format!("{} {year}-{nr}", config.title_prefix)
        }
        _ => format!("{} {year}", config.title_prefix),
    }
}

fn describe_volume(
    tree: &mut DocumentTree,
    volume: NodeId,
    year: &str,
    config: &AssemblyConfig,
) -> Result<()> {
    let title = format!("{} {year}", config.title_prefix);
    tree.add_metadata(volume, MetadataField::TitleDocMain, &title)?;
    tree.add_metadata(volume, MetadataField::CurrentNo, year)?;
    tree.add_metadata(volume, MetadataField::CurrentNoSorting, year)?;
    // the top node already carries theme and collection
    if volume != tree.logical_root() {
        tree.add_metadata(volume, MetadataField::ViewerSubTheme, &config.viewer_sub_theme)?;
        tree.add_metadata(volume, MetadataField::SingleDigCollection, &config.collection)?;
    }
    tree.add_metadata(volume, MetadataField::PublicationYear, year)?;
    Ok(())
}

fn create_issue(
    tree: &mut DocumentTree,
    record: &PageRecord,
    config: &AssemblyConfig,
) -> Result<NodeId> {
    let nr = usable_issue_number(record, config.numbering);
    let year = record.year.as_str();
    let issue = tree.create_node(DocKind::PeriodicalIssue);
    let title = issue_title(config, year, nr.as_deref());
    tree.add_metadata(issue, MetadataField::TitleDocMain, &title)?;
    tree.add_metadata(issue, MetadataField::PublicationYear, year)?;
    let month = nr.as_deref().unwrap_or("01");
    tree.add_metadata(issue, MetadataField::DateOfPublication, &format!("{year}-{month}-01"))?;
    tree.add_metadata(issue, MetadataField::SingleDigCollection, &config.collection)?;
    tree.add_metadata(issue, MetadataField::ViewerSubTheme, &config.viewer_sub_theme)?;
    let top = tree.logical_root();
    tree.add_child(top, issue)?;
    normalize_identifier(
        tree,
        issue,
        MetadataField::CatalogIdDigital,
        &config.volume_identifier,
        &config.identifier_prefix,
    )?;
    debug!("new issue for booklet {}", record.booklet_id);
    Ok(issue)
}

/// Assembles the tree for `records`, which must already be in physical order.
pub fn assemble<R: Relocate + ?Sized>(
    skeleton: &BibRecord,
    records: &[PageRecord],
    unit: &str,
    config: &AssemblyConfig,
    relocator: &R,
) -> Result<DocumentTree> {
    assemble_tree(DocumentTree::from_bib_record(skeleton)?, records, unit, config, relocator)
}

/// Adds physical structure, issues and pages to a tree holding the catalogue
/// structure.
///
/// Pages are numbered from 1 across the whole unit. An image that cannot be
/// placed is logged; its page is kept without a content file.
pub fn assemble_tree<R: Relocate + ?Sized>(
    mut tree: DocumentTree,
    records: &[PageRecord],
    unit: &str,
    config: &AssemblyConfig,
    relocator: &R,
) -> Result<DocumentTree> {
    let top = tree.logical_root();

    let book = tree.create_node(DocKind::BoundBook);
    tree.set_physical_root(book)?;
    tree.add_metadata(book, MetadataField::PathImageFiles, &config.volume_identifier)?;

    let volume = if tree.kind(top).is_anchor() {
        match tree.first_child(top) {
            Some(child) => child,
            None => {
                let child = tree.create_node(DocKind::PeriodicalVolume);
                tree.add_child(top, child)?;
                child
            }
        }
    } else {
        top
    };

    if config.create_issues {
        if volume != top {
            tree.remove_child(top, volume)?;
        }
    } else {
        describe_volume(&mut tree, volume, unit_year(unit), config)?;
    }

    let mut last_booklet = "";
    let mut issue: Option<NodeId> = None;
    for (offset, record) in records.iter().enumerate() {
        let physical_page_number = offset as u32 + 1;
        if config.create_issues && record.booklet_id != last_booklet {
            last_booklet = record.booklet_id.as_str();
            issue = Some(create_issue(&mut tree, record, config)?);
        }

        let page = tree.create_node(DocKind::Page);
        tree.add_child(book, page)?;
        tree.add_metadata(page, MetadataField::PhysPageNumber, &physical_page_number.to_string())?;
        tree.add_metadata(page, MetadataField::LogicalPageNumber, &record.label)?;
        tree.add_reference(volume, page)?;
        if let Some(issue) = issue {
            tree.add_reference(issue, page)?;
        }

        match relocator.relocate(record, physical_page_number) {
            Ok(path) => tree.set_content_file(page, &content_location(&path)),
            Err(e) => warn!("Page {} without image: {}", physical_page_number, e),
        }
    }
    Ok(tree)
}
