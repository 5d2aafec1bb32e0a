//! Per-journal import configuration.
//!
//! Every journal of the collection shares the same pipeline; what differs
//! (catalogue PPN, series title, folder names, issue policy) lives in one TOML
//! file per journal.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};
use crate::grouping::Granularity;
use crate::issue::IssueNumbering;

/// Sub-collections whose folders carry per-volume PDFs next to the images.
pub const DEFAULT_PDF_SEGMENTS: [&str; 26] = [
    "aglv", "alem", "alst", "bgvh", "bgwh", "blgb", "dosc", "fmgv", "heim", "jffv", "jvlm",
    "klwa", "kult", "kumm", "mojb", "mosr", "rhet", "tivo", "vona", "vool", "vora", "vovo",
    "wahb", "wahe", "jall", "vgeb",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    Sql,
    Json,
}

impl InputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            InputFormat::Sql => "sql",
            InputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTitleSource {
    #[default]
    BasicName,
    /// Short title slug derived from the catalogue title.
    TitleSlug,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    pub basic_name: String,
    pub ppn: String,
    pub title: String,
    pub temp_folder: PathBuf,
    #[serde(default = "default_catalogue")]
    pub catalogue: String,
    #[serde(default)]
    pub catalogue_folder: Option<PathBuf>,
    #[serde(default = "default_basic_folder")]
    pub basic_folder: PathBuf,
    #[serde(default)]
    pub image_path_prefix: Option<String>,
    #[serde(default)]
    pub input_format: InputFormat,
    #[serde(default = "default_media_suffix")]
    pub media_suffix: String,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default = "default_true")]
    pub create_issues: bool,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub numbering: IssueNumbering,
    #[serde(default = "default_viewer_sub_theme")]
    pub viewer_sub_theme: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_identifier_prefix")]
    pub identifier_prefix: String,
    #[serde(default = "default_process_title_regex")]
    pub process_title_regex: String,
    #[serde(default)]
    pub process_title_source: ProcessTitleSource,
    #[serde(default = "default_pdf_segments")]
    pub pdf_segments: Vec<String>,
    #[serde(default)]
    pub pdf_year_filter: bool,
    /// Catalogue PPN of the printed edition mapped to the PPN of its digital
    /// edition. When set, a PPN missing from the table cannot be imported.
    #[serde(default)]
    pub ppn_map: BTreeMap<String, String>,
    /// Naming convention for the files in a unit's image folder.
    #[serde(default)]
    pub image_name_pattern: Option<String>,
    /// Drop `shelfmarksource` from the catalogue structure.
    #[serde(default)]
    pub strip_shelfmarks: bool,
}

fn default_catalogue() -> String {
    String::from("BSZ-BW")
}

fn default_basic_folder() -> PathBuf {
    PathBuf::from("/opt/digiverso/BSZ/Bodensee/")
}

fn default_media_suffix() -> String {
    String::from("tif")
}

fn default_image_extension() -> String {
    String::from(".jpg")
}

fn default_true() -> bool {
    true
}

fn default_viewer_sub_theme() -> String {
    String::from("bsz-st-bodenseebibliotheken")
}

fn default_collection() -> String {
    String::from("ZS_RegioBodensee")
}

fn default_identifier_prefix() -> String {
    String::from("bsz")
}

fn default_process_title_regex() -> String {
    String::from(r"[\W]")
}

fn default_pdf_segments() -> Vec<String> {
    DEFAULT_PDF_SEGMENTS.iter().map(|s| s.to_string()).collect()
}

impl ImportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ImportConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ImportError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.basic_name.trim().is_empty() {
            return Err(ImportError::Config(String::from("basic_name must not be empty")));
        }
        if self.ppn.trim().is_empty() {
            return Err(ImportError::Config(String::from("ppn must not be empty")));
        }
        Regex::new(&self.process_title_regex)?;
        self.image_name_regex()?;
        Ok(())
    }

    /// PPN the imported volumes are named and identified by.
    pub fn digital_ppn(&self) -> Result<String> {
        if self.ppn_map.is_empty() {
            return Ok(self.ppn.clone());
        }
        self.ppn_map.get(&self.ppn).cloned().ok_or_else(|| {
            ImportError::Config(format!("no digital PPN for analog PPN {}", self.ppn))
        })
    }

    /// `image_name_pattern` anchored to the whole file name.
    pub fn image_name_regex(&self) -> Result<Option<Regex>> {
        match &self.image_name_pattern {
            Some(pattern) => Ok(Some(Regex::new(&format!("^(?:{pattern})$"))?)),
            None => Ok(None),
        }
    }

    /// Prefix of every `jpg` path in the manifest, as exported from the web
    /// server the scans were published on.
    pub fn image_path_prefix(&self) -> String {
        match &self.image_path_prefix {
            Some(prefix) => prefix.clone(),
            None => format!("/data/kebweb/{}/", self.basic_name),
        }
    }

    pub fn input_file(&self) -> PathBuf {
        self.basic_folder
            .join(format!("{}.{}", self.basic_name, self.input_format.extension()))
    }

    pub fn import_folder(&self) -> PathBuf {
        self.basic_folder.join(&self.basic_name)
    }

    pub fn media_folder_suffix(&self) -> String {
        format!("_{}", self.media_suffix)
    }
}
