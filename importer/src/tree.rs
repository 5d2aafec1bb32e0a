//! Document description built for one unit of work.
//!
//! Nodes live in an arena and have at most one owning parent. Logical nodes
//! additionally point at pages through `logical_physical` references, which
//! are kept in a separate index and never imply ownership.

use catalogue::{BibRecord, MetadataField, RecordKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Periodical,
    PeriodicalVolume,
    PeriodicalIssue,
    Monograph,
    BoundBook,
    Page,
}

const DESCRIPTIVE: [MetadataField; 10] = [
    MetadataField::TitleDocMain,
    MetadataField::CatalogIdDigital,
    MetadataField::CatalogIdSource,
    MetadataField::PublicationYear,
    MetadataField::PlaceOfPublication,
    MetadataField::PublisherName,
    MetadataField::DocLanguage,
    MetadataField::ShelfmarkSource,
    MetadataField::ViewerSubTheme,
    MetadataField::SingleDigCollection,
];

const NUMBERING: [MetadataField; 3] = [
    MetadataField::CurrentNo,
    MetadataField::CurrentNoSorting,
    MetadataField::DateOfPublication,
];

impl DocKind {
    pub fn name(&self) -> &'static str {
        match self {
            DocKind::Periodical => "Periodical",
            DocKind::PeriodicalVolume => "PeriodicalVolume",
            DocKind::PeriodicalIssue => "PeriodicalIssue",
            DocKind::Monograph => "Monograph",
            DocKind::BoundBook => "BoundBook",
            DocKind::Page => "page",
        }
    }

    pub fn is_anchor(&self) -> bool {
        *self == DocKind::Periodical
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, DocKind::BoundBook | DocKind::Page)
    }

    pub fn allows(&self, field: MetadataField) -> bool {
        match self {
            DocKind::Periodical => DESCRIPTIVE.contains(&field),
            DocKind::PeriodicalVolume | DocKind::Monograph | DocKind::PeriodicalIssue => {
                DESCRIPTIVE.contains(&field) || NUMBERING.contains(&field)
            }
            DocKind::BoundBook => field == MetadataField::PathImageFiles,
            DocKind::Page => matches!(
                field,
                MetadataField::PhysPageNumber | MetadataField::LogicalPageNumber
            ),
        }
    }

    pub fn allows_child(&self, child: DocKind) -> bool {
        match self {
            DocKind::Periodical => {
                matches!(child, DocKind::PeriodicalVolume | DocKind::PeriodicalIssue)
            }
            DocKind::PeriodicalVolume | DocKind::Monograph => child == DocKind::PeriodicalIssue,
            DocKind::PeriodicalIssue | DocKind::Page => false,
            DocKind::BoundBook => child == DocKind::Page,
        }
    }
}

impl From<RecordKind> for DocKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Anchor => DocKind::Periodical,
            RecordKind::Volume => DocKind::PeriodicalVolume,
            RecordKind::Monograph => DocKind::Monograph,
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub field: MetadataField,
    pub value: String,
}

#[derive(Debug)]
struct Node {
    kind: DocKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    metadata: Vec<Metadata>,
    content_file: Option<String>,
}

#[derive(Debug)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    logical_root: NodeId,
    physical_root: Option<NodeId>,
    // page -> logical nodes referencing it
    references: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl DocumentTree {
    pub fn new(root: DocKind) -> Result<Self> {
        if root.is_physical() || root == DocKind::PeriodicalIssue {
            return Err(ImportError::Preferences(format!("{root} cannot be a logical root")));
        }
        let mut tree = DocumentTree {
            nodes: Vec::new(),
            logical_root: NodeId(0),
            physical_root: None,
            references: BTreeMap::new(),
        };
        tree.logical_root = tree.create_node(root);
        Ok(tree)
    }

    /// Logical structure from a catalogue record, metadata checked against
    /// the node kinds.
    pub fn from_bib_record(record: &BibRecord) -> Result<Self> {
        let mut tree = DocumentTree::new(record.kind.into())?;
        let root = tree.logical_root;
        tree.copy_bib_record(root, record)?;
        Ok(tree)
    }

    fn copy_bib_record(&mut self, node: NodeId, record: &BibRecord) -> Result<()> {
        for (field, value) in &record.metadata {
            self.add_metadata(node, *field, value)?;
        }
        for child_record in &record.children {
            let child = self.create_node(child_record.kind.into());
            self.add_child(node, child)?;
            self.copy_bib_record(child, child_record)?;
        }
        Ok(())
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, kind: DocKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            metadata: Vec::new(),
            content_file: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_kind = self.kind(parent);
        let child_kind = self.kind(child);
        if !parent_kind.allows_child(child_kind) {
            return Err(ImportError::Preferences(format!(
                "{child_kind} is not allowed as child of {parent_kind}"
            )));
        }
        if let Some(owner) = self.nodes[child.0].parent {
            return Err(ImportError::Preferences(format!(
                "{child_kind} {} already belongs to {} {}",
                child.0,
                self.kind(owner),
                owner.0
            )));
        }
        if child == self.logical_root || Some(child) == self.physical_root {
            return Err(ImportError::Preferences(String::from("a root cannot become a child")));
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Detaches `child` from `parent`; the node stays in the arena but is no
    /// longer reachable from a root.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.nodes[child.0].parent != Some(parent) {
            return Err(ImportError::Preferences(format!(
                "node {} is not a child of node {}",
                child.0, parent.0
            )));
        }
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.nodes[child.0].parent = None;
        Ok(())
    }

    pub fn set_physical_root(&mut self, node: NodeId) -> Result<()> {
        if self.kind(node) != DocKind::BoundBook {
            return Err(ImportError::Preferences(format!(
                "{} cannot be the physical root",
                self.kind(node)
            )));
        }
        self.physical_root = Some(node);
        Ok(())
    }

    pub fn add_metadata(&mut self, node: NodeId, field: MetadataField, value: &str) -> Result<()> {
        let kind = self.kind(node);
        if !kind.allows(field) {
            return Err(ImportError::MetadataNotAllowed { field, kind });
        }
        self.nodes[node.0].metadata.push(Metadata {
            field,
            value: value.to_string(),
        });
        Ok(())
    }

    /// Removes every value of `field` from `node`, returns how many were removed.
    pub fn remove_metadata(&mut self, node: NodeId, field: MetadataField) -> usize {
        let metadata = &mut self.nodes[node.0].metadata;
        let before = metadata.len();
        metadata.retain(|m| m.field != field);
        before - metadata.len()
    }

    pub fn metadata(&self, node: NodeId) -> &[Metadata] {
        &self.nodes[node.0].metadata
    }

    pub fn values(&self, node: NodeId, field: MetadataField) -> Vec<&str> {
        self.nodes[node.0]
            .metadata
            .iter()
            .filter(|m| m.field == field)
            .map(|m| m.value.as_str())
            .collect()
    }

    pub fn first_value(&self, node: NodeId, field: MetadataField) -> Option<&str> {
        self.values(node, field).into_iter().next()
    }

    pub fn first_metadata_mut(
        &mut self,
        node: NodeId,
        field: MetadataField,
    ) -> Option<&mut Metadata> {
        self.nodes[node.0].metadata.iter_mut().find(|m| m.field == field)
    }

    /// Adds a `logical_physical` reference from a logical node to a page.
    pub fn add_reference(&mut self, from: NodeId, page: NodeId) -> Result<()> {
        if self.kind(from).is_physical() || self.kind(page) != DocKind::Page {
            return Err(ImportError::Preferences(format!(
                "logical_physical reference from {} to {} not allowed",
                self.kind(from),
                self.kind(page)
            )));
        }
        self.references.entry(page).or_default().insert(from);
        Ok(())
    }

    /// Logical nodes referencing `page`.
    pub fn referrers(&self, page: NodeId) -> Vec<NodeId> {
        self.references
            .get(&page)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Pages referenced from `node`, in creation order.
    pub fn references_from(&self, node: NodeId) -> Vec<NodeId> {
        self.references
            .iter()
            .filter(|(_, from)| from.contains(&node))
            .map(|(page, _)| *page)
            .collect()
    }

    pub fn set_content_file(&mut self, page: NodeId, location: &str) {
        self.nodes[page.0].content_file = Some(location.to_string());
    }

    pub fn content_file(&self, page: NodeId) -> Option<&str> {
        self.nodes[page.0].content_file.as_deref()
    }

    pub fn kind(&self, node: NodeId) -> DocKind {
        self.nodes[node.0].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    pub fn logical_root(&self) -> NodeId {
        self.logical_root
    }

    pub fn physical_root(&self) -> Option<NodeId> {
        self.physical_root
    }

    /// Attached nodes of the given kind, depth first from the roots.
    pub fn nodes_of_kind(&self, kind: DocKind) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.physical_root.into_iter().collect();
        stack.push(self.logical_root);
        while let Some(node) = stack.pop() {
            if self.kind(node) == kind {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        out.sort();
        out
    }
}
