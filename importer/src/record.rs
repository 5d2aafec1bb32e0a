//! Page manifests: one entry per scanned page, exported either as a JSON
//! array or as a dump of single-line SQL `INSERT` statements.

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::InputFormat;
use crate::error::{ImportError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRecord {
    #[serde(rename = "pageid", deserialize_with = "lenient_string")]
    pub page_id: String,
    #[serde(rename = "bookletid", deserialize_with = "lenient_string")]
    pub booklet_id: String,
    #[serde(rename = "journalid", default, deserialize_with = "lenient_string")]
    pub journal_id: String,
    #[serde(rename = "lfnr", default, deserialize_with = "lenient_string")]
    pub sequence_number: String,
    #[serde(rename = "jahr", deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(rename = "jpg", deserialize_with = "lenient_string")]
    pub image_path: String,
}

/// Manifest exports are not consistent about quoting: numbers and booleans
/// are taken as their text, `null` as an empty string.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected a string, found {other}"))),
    }
}

const SQL_FIELDS: usize = 7;

fn clean_sql_value(raw: &str) -> String {
    raw.trim().replace('\'', "")
}

/// Parses one `INSERT INTO ... VALUES (...)` line. Values are split on every
/// comma, so string literals containing commas are not supported.
pub fn parse_sql_line(line: &str) -> Result<PageRecord> {
    let start = line
        .find("VALUES (")
        .ok_or_else(|| ImportError::Parse(format!("no VALUES tuple in: {line}")))?
        + "VALUES (".len();
    let end = line
        .rfind(')')
        .filter(|end| *end >= start)
        .ok_or_else(|| ImportError::Parse(format!("unterminated VALUES tuple in: {line}")))?;
    let parts: Vec<String> = line[start..end].split(',').map(clean_sql_value).collect();
    if parts.len() < SQL_FIELDS {
        return Err(ImportError::Parse(format!(
            "expected {SQL_FIELDS} values, found {} in: {line}",
            parts.len()
        )));
    }
    let mut parts = parts.into_iter();
    let mut next = || parts.next().unwrap_or_default();
    Ok(PageRecord {
        page_id: next(),
        booklet_id: next(),
        journal_id: next(),
        sequence_number: next(),
        year: next(),
        label: next(),
        image_path: next(),
    })
}

pub fn is_insert_line(line: &str) -> bool {
    line.trim_start().starts_with("INSERT INTO")
}

/// Parses every `INSERT` line of an SQL dump; malformed lines are logged and
/// skipped.
pub fn parse_sql_dump(content: &str) -> Vec<PageRecord> {
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if !is_insert_line(line) {
            continue;
        }
        match parse_sql_line(line.trim()) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping line {}: {}", number + 1, e),
        }
    }
    records
}

/// Parses a JSON array of page objects; elements that do not match the
/// expected shape are logged and skipped.
pub fn parse_json_array(content: &str) -> Result<Vec<PageRecord>> {
    let values: Vec<Value> =
        serde_json::from_str(content).map_err(|e| ImportError::Parse(e.to_string()))?;
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<PageRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping JSON element {}: {}", index, e),
        }
    }
    Ok(records)
}

pub fn read_records(path: &Path, format: InputFormat) -> Result<Vec<PageRecord>> {
    let content = fs::read_to_string(path)?;
    let records = match format {
        InputFormat::Sql => parse_sql_dump(&content),
        InputFormat::Json => parse_json_array(&content)?,
    };
    debug!("Read {} page records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = concat!(
        "INSERT INTO `seiten` (`pageid`, `bookletid`, `journalid`, `lfnr`, `jahr`, `label`, `jpg`) ",
        "VALUES ('jall1999-h1_s001', 'jall.1999.1', 'jall', 1, '1999', '[Titel]', ",
        "'/data/kebweb/jall/1999/jall1999_001.jpg');"
    );

    #[test]
    fn sql_line() {
        let record = parse_sql_line(LINE).unwrap();
        assert_eq!(record.page_id, "jall1999-h1_s001");
        assert_eq!(record.booklet_id, "jall.1999.1");
        assert_eq!(record.journal_id, "jall");
        assert_eq!(record.sequence_number, "1");
        assert_eq!(record.year, "1999");
        assert_eq!(record.label, "[Titel]");
        assert_eq!(record.image_path, "/data/kebweb/jall/1999/jall1999_001.jpg");
    }

    #[test]
    fn sql_line_too_few_values() {
        let err = parse_sql_line("INSERT INTO t VALUES ('a', 'b', 'c')").unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn sql_line_without_tuple() {
        assert!(parse_sql_line("INSERT INTO t SELECT * FROM u").is_err());
        assert!(parse_sql_line("INSERT INTO t VALUES (").is_err());
    }

    #[test]
    fn sql_dump_skips_other_lines() {
        let dump = format!(
            "-- dump\nCREATE TABLE seiten (pageid text);\n{LINE}\n  INSERT INTO t VALUES ('x');\n{}\n",
            LINE.replace("s001", "s002")
        );
        let records = parse_sql_dump(&dump);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].page_id, "jall1999-h1_s002");
    }

    #[test]
    fn json_array() {
        let json = r#"[
  {"pageid": "p1", "bookletid": "b1", "journalid": "j", "lfnr": "1", "jahr": "1999", "label": "1", "jpg": "/data/kebweb/jall/a.jpg"},
  {"pageid": "p2", "jahr": "1999"},
  {"pageid": "p3", "bookletid": "b1", "jahr": "1999", "label": "3", "jpg": "/data/kebweb/jall/c.jpg"}
]"#;
        let records = parse_json_array(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_number, "1");
        assert_eq!(records[1].page_id, "p3");
        assert_eq!(records[1].journal_id, "");
    }

    #[test]
    fn json_numbers_as_text() {
        let json = r#"[
  {"pageid": "p1", "bookletid": "b1", "journalid": "j", "lfnr": 1, "jahr": 1999, "label": 12, "jpg": "/data/kebweb/jall/a.jpg"},
  {"pageid": "p2", "bookletid": "b1", "lfnr": null, "jahr": "1999", "jpg": "/data/kebweb/jall/b.jpg"},
  {"pageid": "p3", "bookletid": ["b1"], "jahr": 1999, "jpg": "/data/kebweb/jall/c.jpg"}
]"#;
        let records = parse_json_array(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_number, "1");
        assert_eq!(records[0].year, "1999");
        assert_eq!(records[0].label, "12");
        assert_eq!(records[1].sequence_number, "");
    }

    #[test]
    fn sql_line_extra_values() {
        let line = concat!(
            "INSERT INTO t VALUES ('p1', 'b1', 'j', 3, '1999', 'IV', '/data/kebweb/j/a.jpg', ",
            "'extra', 42);"
        );
        let record = parse_sql_line(line).unwrap();
        assert_eq!(record.page_id, "p1");
        assert_eq!(record.booklet_id, "b1");
        assert_eq!(record.journal_id, "j");
        assert_eq!(record.sequence_number, "3");
        assert_eq!(record.year, "1999");
        assert_eq!(record.label, "IV");
        assert_eq!(record.image_path, "/data/kebweb/j/a.jpg");
    }

    #[test]
    fn json_not_an_array() {
        assert!(matches!(parse_json_array("{}"), Err(ImportError::Parse(_))));
    }
}
