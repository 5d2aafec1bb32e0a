//! Units of work: which page records end up in which imported volume.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::issue::{IssueNumbering, usable_issue_number};
use crate::record::PageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// `{year}`
    Year,
    /// `{year}_{issue}` when the derived issue number is usable, else `{year}`
    #[default]
    Issue,
    /// like `Issue`, further split by the raw booklet id
    Booklet,
}

pub fn unit_key(
    record: &PageRecord,
    granularity: Granularity,
    numbering: IssueNumbering,
) -> String {
    let mut key = record.year.clone();
    if granularity == Granularity::Year {
        return key;
    }
    if let Some(nr) = usable_issue_number(record, numbering) {
        key.push('_');
        key.push_str(&nr);
    }
    if granularity == Granularity::Booklet {
        key.push('_');
        key.push_str(&record.booklet_id);
    }
    key
}

/// The year part of a unit key.
pub fn unit_year(unit: &str) -> &str {
    match unit.find('_') {
        Some(pos) => &unit[..pos],
        None => unit,
    }
}

/// Records of one unit in physical order (by image path, ties keep input order).
pub fn select(
    records: &[PageRecord],
    unit: &str,
    granularity: Granularity,
    numbering: IssueNumbering,
) -> Vec<PageRecord> {
    let mut selected: Vec<PageRecord> = records
        .iter()
        .filter(|r| unit_key(r, granularity, numbering) == unit)
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.image_path.cmp(&b.image_path));
    selected
}

pub fn list_available_units(
    records: &[PageRecord],
    granularity: Granularity,
    numbering: IssueNumbering,
) -> Vec<String> {
    let units: BTreeSet<String> = records
        .iter()
        .map(|r| unit_key(r, granularity, numbering))
        .collect();
    units.into_iter().collect()
}
