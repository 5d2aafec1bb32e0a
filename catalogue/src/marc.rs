use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::{BibRecord, LookupError, MetadataField, RecordKind};

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("valid regex"));
static ISIL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([^)]*\)").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct MarcCollection {
    #[serde(rename = "record", default)]
    records: Vec<MarcRecord>,
}

#[derive(Debug, Deserialize)]
struct MarcControlField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct MarcDataField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "subfield", default)]
    subfields: Vec<MarcSubField>,
}

#[derive(Debug, Deserialize)]
struct MarcSubField {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct MarcRecord {
    #[serde(default)]
    leader: String,
    #[serde(rename = "controlfield", default)]
    controlfields: Vec<MarcControlField>,
    #[serde(rename = "datafield", default)]
    datafields: Vec<MarcDataField>,
}

impl MarcRecord {
    /// Leader position 07 `s`: serial, which the ruleset models as an anchor.
    pub fn is_serial(&self) -> bool {
        self.leader.chars().nth(7) == Some('s')
    }

    fn control_field(&self, tag: &str) -> Option<&str> {
        self.controlfields
            .iter()
            .find(|cf| cf.tag == tag)
            .map(|cf| cf.text.trim())
            .filter(|t| !t.is_empty())
    }

    fn get_fields(&self, field: &str) -> Vec<&MarcDataField> {
        self.datafields.iter().filter(|df| df.tag == field).collect()
    }

    fn extract_fields(&self, field: &str, codes: &[&str]) -> Vec<&str> {
        let mut out = Vec::new();
        for df in self.get_fields(field) {
            for sf in &df.subfields {
                if codes.contains(&sf.code.as_str()) {
                    out.push(sf.text.trim());
                }
            }
        }
        out
    }

    // RDA records carry 264, older ones 260
    fn publication_fields(&self, codes: &[&str]) -> Vec<&str> {
        let mut out = self.extract_fields("264", codes);
        out.extend(self.extract_fields("260", codes));
        out
    }

    fn title(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .extract_fields("245", &["a", "b"])
            .into_iter()
            .map(trim_isbd)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" : "))
        }
    }

    fn publication_year(&self) -> Option<String> {
        let dates = self.publication_fields(&["c"]).join(" ");
        YEAR.find(&dates).map(|m| m.as_str().to_string())
    }

    pub fn to_bib_record(&self, kind: RecordKind) -> BibRecord {
        let mut record = BibRecord::new(kind);
        if let Some(title) = self.title() {
            record.metadata.push((MetadataField::TitleDocMain, title));
        }
        if let Some(id) = self.control_field("001") {
            record.metadata.push((MetadataField::CatalogIdDigital, id.to_string()));
        }
        for source in self.extract_fields("776", &["w"]) {
            let id = ISIL_PREFIX.replace(source, "");
            if !id.is_empty() {
                record.metadata.push((MetadataField::CatalogIdSource, id.into_owned()));
            }
        }
        if let Some(year) = self.publication_year() {
            record.metadata.push((MetadataField::PublicationYear, year));
        }
        for place in self.publication_fields(&["a"]) {
            record.metadata.push((MetadataField::PlaceOfPublication, trim_isbd(place).to_string()));
        }
        for publisher in self.publication_fields(&["b"]) {
            record.metadata.push((MetadataField::PublisherName, trim_isbd(publisher).to_string()));
        }
        for lang in self.extract_fields("041", &["a"]) {
            record.metadata.push((MetadataField::DocLanguage, lang.to_string()));
        }
        for shelfmark in self.extract_fields("852", &["h"]) {
            record.metadata.push((MetadataField::ShelfmarkSource, shelfmark.to_string()));
        }
        record
    }
}

fn trim_isbd(s: &str) -> &str {
    s.trim().trim_end_matches([' ', '/', ':', ';', ',', '=']).trim()
}

/// Reads either a `<collection>` of records or a single `<record>`.
pub fn parse_records(xml: &str) -> Result<Vec<MarcRecord>, LookupError> {
    let collection: MarcCollection =
        from_str(xml).map_err(|e| LookupError::InvalidXml(e.to_string()))?;
    if !collection.records.is_empty() {
        return Ok(collection.records);
    }
    let single: MarcRecord = from_str(xml).map_err(|e| LookupError::InvalidXml(e.to_string()))?;
    if single.leader.is_empty() && single.controlfields.is_empty() && single.datafields.is_empty() {
        return Err(LookupError::InvalidXml(String::from("no MARC record found")));
    }
    Ok(vec![single])
}

/// Builds the catalogue record for a lookup result. The first MARC record is
/// the top node; for serials the following records are its volumes and an
/// empty volume is created when the catalogue delivered none.
pub fn bib_record_from_marcxml(xml: &str) -> Result<BibRecord, LookupError> {
    let records = parse_records(xml)?;
    let Some((top, rest)) = records.split_first() else {
        return Err(LookupError::InvalidXml(String::from("no MARC record found")));
    };
    if top.is_serial() {
        let mut anchor = top.to_bib_record(RecordKind::Anchor);
        anchor.children = rest.iter().map(|r| r.to_bib_record(RecordKind::Volume)).collect();
        if anchor.children.is_empty() {
            anchor.children.push(BibRecord::new(RecordKind::Volume));
        }
        Ok(anchor)
    } else {
        Ok(top.to_bib_record(RecordKind::Monograph))
    }
}
