//! METS serialization of a document tree.
//!
//! Only nodes reachable from the logical or physical root are written. The
//! logical and physical structure maps are linked through `smLink` entries
//! derived from the `logical_physical` references.

use catalogue::MetadataField;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::tree::{DocKind, DocumentTree, NodeId};

const METS_NS: &str = "http://www.loc.gov/METS/";
const MODS_NS: &str = "http://www.loc.gov/mods/v3";
const GOOBI_NS: &str = "http://meta.goobi.org/v1.5.1/";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serializes a finished tree to its target file.
pub trait MetadataWriter {
    fn write(&self, tree: &DocumentTree, target: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MetsWriter {
    agent: String,
}

impl Default for MetsWriter {
    fn default() -> Self {
        MetsWriter {
            agent: String::from("bsz-import"),
        }
    }
}

fn write_error(e: impl Display) -> ImportError {
    ImportError::Write(e.to_string())
}

fn mime_type(location: &str) -> &'static str {
    let lower = location.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".tif") || lower.ends_with(".tiff") {
        "image/tiff"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        XmlOut {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(write_error)
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut el = BytesStart::new(name);
        for attr in attrs {
            el.push_attribute(*attr);
        }
        self.event(Event::Start(el))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut el = BytesStart::new(name);
        for attr in attrs {
            el.push_attribute(*attr);
        }
        self.event(Event::Empty(el))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(write_error)
    }
}

// METS ids of the attached nodes
struct Ids {
    logical: BTreeMap<NodeId, String>,
    logical_order: Vec<NodeId>,
    physical: BTreeMap<NodeId, String>,
    files: BTreeMap<NodeId, String>,
}

impl Ids {
    fn new(tree: &DocumentTree, book: NodeId) -> Self {
        let mut logical_order = Vec::new();
        let mut stack = vec![tree.logical_root()];
        while let Some(node) = stack.pop() {
            logical_order.push(node);
            stack.extend(tree.children(node).iter().rev());
        }
        let logical = logical_order
            .iter()
            .enumerate()
            .map(|(n, node)| (*node, format!("LOG_{n:04}")))
            .collect();

        let mut physical = BTreeMap::new();
        physical.insert(book, String::from("PHYS_0000"));
        let mut files = BTreeMap::new();
        for (n, page) in tree.children(book).iter().enumerate() {
            physical.insert(*page, format!("PHYS_{:04}", n + 1));
            if tree.content_file(*page).is_some() {
                let id = format!("FILE_{:04}", files.len());
                files.insert(*page, id);
            }
        }
        Ids {
            logical,
            logical_order,
            physical,
            files,
        }
    }
}

impl MetsWriter {
    pub fn new(agent: &str) -> Self {
        MetsWriter {
            agent: agent.to_string(),
        }
    }

    fn check(&self, tree: &DocumentTree) -> Result<NodeId> {
        let book = tree.physical_root().ok_or_else(|| {
            ImportError::Preferences(String::from("document has no physical structure"))
        })?;
        for page in tree.children(book) {
            if tree.first_value(*page, MetadataField::PhysPageNumber).is_none() {
                return Err(ImportError::Preferences(format!(
                    "page {} has no physPageNumber",
                    page.index()
                )));
            }
        }
        Ok(book)
    }

    fn write_dmd_sec(
        &self,
        out: &mut XmlOut,
        id: &str,
        tree: &DocumentTree,
        node: NodeId,
    ) -> Result<()> {
        out.start("mets:dmdSec", &[("ID", id)])?;
        out.start("mets:mdWrap", &[("MDTYPE", "MODS")])?;
        out.start("mets:xmlData", &[])?;
        out.start("mods:mods", &[])?;
        out.start("mods:extension", &[])?;
        out.start("goobi:goobi", &[])?;
        for md in tree.metadata(node) {
            out.text_element("goobi:metadata", &[("name", md.field.name())], &md.value)?;
        }
        out.end("goobi:goobi")?;
        out.end("mods:extension")?;
        out.end("mods:mods")?;
        out.end("mets:xmlData")?;
        out.end("mets:mdWrap")?;
        out.end("mets:dmdSec")
    }

    fn write_logical_div(
        &self,
        out: &mut XmlOut,
        tree: &DocumentTree,
        ids: &Ids,
        node: NodeId,
    ) -> Result<()> {
        let id = &ids.logical[&node];
        let dmd_id = format!("DMD{id}");
        let mut attrs = vec![("ID", id.as_str()), ("TYPE", tree.kind(node).name())];
        if !tree.metadata(node).is_empty() {
            attrs.push(("DMDID", dmd_id.as_str()));
        }
        let label = tree.first_value(node, MetadataField::TitleDocMain);
        if let Some(label) = label {
            attrs.push(("LABEL", label));
        }
        if tree.children(node).is_empty() {
            return out.empty("mets:div", &attrs);
        }
        out.start("mets:div", &attrs)?;
        for child in tree.children(node) {
            self.write_logical_div(out, tree, ids, *child)?;
        }
        out.end("mets:div")
    }

    fn write_physical(
        &self,
        out: &mut XmlOut,
        tree: &DocumentTree,
        ids: &Ids,
        book: NodeId,
    ) -> Result<()> {
        out.start("mets:structMap", &[("TYPE", "PHYSICAL")])?;
        out.start(
            "mets:div",
            &[
                ("ID", ids.physical[&book].as_str()),
                ("TYPE", DocKind::BoundBook.name()),
                ("DMDID", "DMDPHYS_0000"),
            ],
        )?;
        for page in tree.children(book) {
            let order = tree.first_value(*page, MetadataField::PhysPageNumber).unwrap_or_default();
            let mut attrs = vec![
                ("ID", ids.physical[page].as_str()),
                ("TYPE", DocKind::Page.name()),
                ("ORDER", order),
            ];
            if let Some(label) = tree.first_value(*page, MetadataField::LogicalPageNumber) {
                attrs.push(("ORDERLABEL", label));
            }
            match ids.files.get(page) {
                Some(file_id) => {
                    out.start("mets:div", &attrs)?;
                    out.empty("mets:fptr", &[("FILEID", file_id.as_str())])?;
                    out.end("mets:div")?;
                }
                None => out.empty("mets:div", &attrs)?,
            }
        }
        out.end("mets:div")?;
        out.end("mets:structMap")
    }

    /// The METS document for `tree`, created at `created`.
    pub fn to_xml(&self, tree: &DocumentTree, created: DateTime<Utc>) -> Result<String> {
        let book = self.check(tree)?;
        let ids = Ids::new(tree, book);
        let mut out = XmlOut::new();

        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        out.start(
            "mets:mets",
            &[
                ("xmlns:mets", METS_NS),
                ("xmlns:mods", MODS_NS),
                ("xmlns:goobi", GOOBI_NS),
                ("xmlns:xlink", XLINK_NS),
            ],
        )?;

        let created = created.format("%Y-%m-%dT%H:%M:%S").to_string();
        out.start("mets:metsHdr", &[("CREATEDATE", created.as_str())])?;
        out.start(
            "mets:agent",
            &[("OTHERTYPE", "SOFTWARE"), ("ROLE", "CREATOR"), ("TYPE", "OTHER")],
        )?;
        out.text_element("mets:name", &[], &self.agent)?;
        out.end("mets:agent")?;
        out.end("mets:metsHdr")?;

        for node in &ids.logical_order {
            if !tree.metadata(*node).is_empty() {
                self.write_dmd_sec(&mut out, &format!("DMD{}", ids.logical[node]), tree, *node)?;
            }
        }
        self.write_dmd_sec(&mut out, "DMDPHYS_0000", tree, book)?;

        out.start("mets:fileSec", &[])?;
        out.start("mets:fileGrp", &[("USE", "LOCAL")])?;
        for (page, file_id) in &ids.files {
            let location = tree.content_file(*page).unwrap_or_default();
            out.start("mets:file", &[("ID", file_id.as_str()), ("MIMETYPE", mime_type(location))])?;
            out.empty("mets:FLocat", &[("LOCTYPE", "URL"), ("xlink:href", location)])?;
            out.end("mets:file")?;
        }
        out.end("mets:fileGrp")?;
        out.end("mets:fileSec")?;

        out.start("mets:structMap", &[("TYPE", "LOGICAL")])?;
        self.write_logical_div(&mut out, tree, &ids, tree.logical_root())?;
        out.end("mets:structMap")?;

        self.write_physical(&mut out, tree, &ids, book)?;

        out.start("mets:structLink", &[])?;
        for page in tree.children(book) {
            let to = ids.physical[page].as_str();
            for from in tree.referrers(*page) {
                // references of detached nodes are not part of the document
                if let Some(from) = ids.logical.get(&from) {
                    out.empty("mets:smLink", &[("xlink:from", from.as_str()), ("xlink:to", to)])?;
                }
            }
        }
        out.end("mets:structLink")?;

        out.end("mets:mets")?;
        out.finish()
    }
}

impl MetadataWriter for MetsWriter {
    fn write(&self, tree: &DocumentTree, target: &Path) -> Result<()> {
        let xml = self.to_xml(tree, Utc::now())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(target, xml)
            .map_err(|e| write_error(format!("{}: {e}", target.display())))?;
        info!("Wrote {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DocumentTree {
        let mut tree = DocumentTree::new(DocKind::Periodical).unwrap();
        let top = tree.logical_root();
        tree.add_metadata(top, MetadataField::TitleDocMain, "Jahrbuch & Chronik").unwrap();
        let volume = tree.create_node(DocKind::PeriodicalVolume);
        tree.add_child(top, volume).unwrap();
        tree.add_metadata(volume, MetadataField::CurrentNo, "1999").unwrap();
        let book = tree.create_node(DocKind::BoundBook);
        tree.set_physical_root(book).unwrap();
        tree.add_metadata(book, MetadataField::PathImageFiles, "408063912_1999").unwrap();
        for n in 1..=2 {
            let page = tree.create_node(DocKind::Page);
            tree.add_child(book, page).unwrap();
            tree.add_metadata(page, MetadataField::PhysPageNumber, &n.to_string()).unwrap();
            tree.add_metadata(page, MetadataField::LogicalPageNumber, "-").unwrap();
            tree.add_reference(volume, page).unwrap();
            tree.set_content_file(page, &format!("file:///tmp/{n:08}.jpg"));
        }
        tree
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn writes_structure() {
        let xml = MetsWriter::default().to_xml(&sample(), created()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("CREATEDATE=\"2024-05-01T12:00:00\""));
        assert!(xml.contains(
            "<goobi:metadata name=\"TitleDocMain\">Jahrbuch &amp; Chronik</goobi:metadata>"
        ));
        assert!(xml.contains(
            "<goobi:metadata name=\"pathimagefiles\">408063912_1999</goobi:metadata>"
        ));
        assert!(xml.contains("TYPE=\"Periodical\""));
        assert!(xml.contains("ID=\"LOG_0001\" TYPE=\"PeriodicalVolume\""));
        assert!(xml.contains("ID=\"PHYS_0002\" TYPE=\"page\" ORDER=\"2\""));
        assert!(xml.contains(
            "<mets:FLocat LOCTYPE=\"URL\" xlink:href=\"file:///tmp/00000001.jpg\"/>"
        ));
        assert!(xml.contains("MIMETYPE=\"image/jpeg\""));
        assert!(xml.contains("<mets:smLink xlink:from=\"LOG_0001\" xlink:to=\"PHYS_0001\"/>"));
        assert_eq!(xml.matches("<mets:smLink").count(), 2);
    }

    #[test]
    fn detached_nodes_are_skipped() {
        let mut tree = sample();
        let top = tree.logical_root();
        let volume = tree.first_child(top).unwrap();
        tree.remove_child(top, volume).unwrap();
        let xml = MetsWriter::default().to_xml(&tree, created()).unwrap();
        assert!(!xml.contains("PeriodicalVolume"));
        assert!(!xml.contains("<mets:smLink"));
    }

    #[test]
    fn missing_physical_structure() {
        let tree = DocumentTree::new(DocKind::Monograph).unwrap();
        assert!(matches!(
            MetsWriter::default().to_xml(&tree, created()),
            Err(ImportError::Preferences(_))
        ));
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("408063912_1999.xml");
        MetsWriter::new("test").write(&sample(), &target).unwrap();
        let xml = fs::read_to_string(&target).unwrap();
        assert!(xml.contains("<mets:name>test</mets:name>"));
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type("file:///a/00000001.JPG"), "image/jpeg");
        assert_eq!(mime_type("file:///a/00000001.tif"), "image/tiff");
        assert_eq!(mime_type("file:///a/x"), "application/octet-stream");
    }
}
