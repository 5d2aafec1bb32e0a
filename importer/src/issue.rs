use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::record::PageRecord;

/// Page ids starting with this marker carry no issue information; the issue
/// is then the last dot-separated part of the booklet id.
pub const BOOKLET_ID_MARKER: &str = "aaaaaaaaa";

static LETTER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-[a-z]").expect("valid regex"));

/// How derived issue numbers are turned into titles and unit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueNumbering {
    /// The number is used only when it is purely numeric; otherwise the unit
    /// is treated as a plain year.
    #[default]
    Numeric,
    /// The number is used verbatim, issues are titled `Heft {nr} / {year}`.
    Legacy,
}

pub fn derive_issue_number(record: &PageRecord) -> String {
    if record.page_id.starts_with(BOOKLET_ID_MARKER) {
        return match record.booklet_id.rfind('.') {
            Some(pos) => record.booklet_id[pos + 1..].to_string(),
            None => record.booklet_id.clone(),
        };
    }
    let id = record.page_id.replace('_', "-");
    let Some(pos) = id.find("-h") else {
        return String::new();
    };
    let mut nr = &id[pos + 2..];
    if let Some(m) = LETTER_SUFFIX.find(nr) {
        nr = &nr[..m.start()];
    }
    if nr.len() < 2 {
        format!("0{nr}")
    } else {
        nr.to_string()
    }
}

pub fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// The issue number if it can be used for titles and dates.
pub fn usable_issue_number(record: &PageRecord, numbering: IssueNumbering) -> Option<String> {
    let nr = derive_issue_number(record);
    match numbering {
        IssueNumbering::Numeric if is_numeric(&nr) => Some(nr),
        IssueNumbering::Numeric => None,
        IssueNumbering::Legacy if nr.is_empty() => None,
        IssueNumbering::Legacy => Some(nr),
    }
}
