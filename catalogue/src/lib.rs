//! Catalogue access for the import: the record model handed to the
//! importer, the lookup seam and a MARCXML-backed implementation.

pub mod directory;
pub mod field;
pub mod marc;

use thiserror::Error;

pub use directory::DirectoryCatalogue;
pub use field::MetadataField;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no record for {identifier} in catalogue {catalogue}")]
    NotFound { catalogue: String, identifier: String },
    #[error("invalid MARCXML: {0}")]
    InvalidXml(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A serial or multi-volume work; its children are the volumes.
    Anchor,
    Volume,
    Monograph,
}

/// Bibliographic record as returned by a catalogue lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibRecord {
    pub kind: RecordKind,
    pub metadata: Vec<(MetadataField, String)>,
    pub children: Vec<BibRecord>,
}

impl BibRecord {
    pub fn new(kind: RecordKind) -> Self {
        BibRecord {
            kind,
            metadata: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with(mut self, field: MetadataField, value: &str) -> Self {
        self.metadata.push((field, value.to_string()));
        self
    }

    pub fn with_child(mut self, child: BibRecord) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == RecordKind::Anchor
    }

    pub fn values(&self, field: MetadataField) -> Vec<&str> {
        self.metadata
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn first(&self, field: MetadataField) -> Option<&str> {
        self.values(field).into_iter().next()
    }
}

pub trait Catalogue {
    fn lookup(&self, catalogue: &str, identifier: &str) -> Result<BibRecord, LookupError>;
}

impl<F> Catalogue for F
where
    F: Fn(&str, &str) -> Result<BibRecord, LookupError>,
{
    fn lookup(&self, catalogue: &str, identifier: &str) -> Result<BibRecord, LookupError> {
        self(catalogue, identifier)
    }
}
