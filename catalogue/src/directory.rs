use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::{BibRecord, Catalogue, LookupError, marc};

/// Catalogue exported to disk as `{root}/{catalogue}/{identifier}.xml`, one
/// MARCXML file per record.
#[derive(Debug, Clone)]
pub struct DirectoryCatalogue {
    root: PathBuf,
}

impl DirectoryCatalogue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryCatalogue { root: root.into() }
    }

    fn record_path(&self, catalogue: &str, identifier: &str) -> Option<PathBuf> {
        let safe = |s: &str| !s.is_empty() && !s.contains(['/', '\\']) && s != "." && s != "..";
        if safe(catalogue) && safe(identifier) {
            Some(self.root.join(catalogue).join(format!("{identifier}.xml")))
        } else {
            None
        }
    }
}

impl Catalogue for DirectoryCatalogue {
    fn lookup(&self, catalogue: &str, identifier: &str) -> Result<BibRecord, LookupError> {
        let not_found = || LookupError::NotFound {
            catalogue: catalogue.to_string(),
            identifier: identifier.to_string(),
        };
        let path = self.record_path(catalogue, identifier).ok_or_else(not_found)?;
        if !path.is_file() {
            return Err(not_found());
        }
        debug!("Reading catalogue record {}", path.display());
        let xml = fs::read_to_string(&path)?;
        marc::bib_record_from_marcxml(&xml)
    }
}
