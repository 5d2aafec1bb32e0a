//! One import run: every requested unit is converted on its own and yields
//! exactly one [`ImportResult`], whatever happens to the others.

use catalogue::{Catalogue, MetadataField};
use regex::Regex;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::assembly::{AssemblyConfig, assemble_tree};
use crate::assets::{AssetLayout, AssetRelocator, validate_image_folder};
use crate::config::{ImportConfig, ProcessTitleSource};
use crate::error::{ImportError, Result};
use crate::grouping::{list_available_units, select, unit_year};
use crate::identifier::normalize_identifier;
use crate::mets::MetadataWriter;
use crate::record::{PageRecord, read_records};
use crate::slug::atstsl_or_empty;
use crate::tree::DocumentTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    ExportFinished,
    InvalidData,
    WriteError,
}

impl From<&ImportError> for ImportStatus {
    fn from(e: &ImportError) -> Self {
        match e {
            ImportError::Write(_) => ImportStatus::WriteError,
            _ => ImportStatus::InvalidData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub unit: String,
    pub process_title: String,
    pub mets_file: PathBuf,
    pub status: ImportStatus,
    pub error_message: Option<String>,
}

/// `{ppn}_{unit}` with `+` and `.` replaced, safe as folder and file name.
pub fn volume_identifier(ppn: &str, unit: &str) -> String {
    format!("{ppn}_{unit}").replace(['+', '.'], "_")
}

pub struct Importer<C, W> {
    config: ImportConfig,
    catalogue: C,
    writer: W,
    records: Vec<PageRecord>,
    title_filter: Regex,
    image_names: Option<Regex>,
}

impl<C: Catalogue, W: MetadataWriter> Importer<C, W> {
    pub fn new(
        config: ImportConfig,
        catalogue: C,
        writer: W,
        records: Vec<PageRecord>,
    ) -> Result<Self> {
        let title_filter = Regex::new(&config.process_title_regex)?;
        let image_names = config.image_name_regex()?;
        Ok(Importer {
            config,
            catalogue,
            writer,
            records,
            title_filter,
            image_names,
        })
    }

    /// Reads the manifest named by the configuration.
    pub fn from_input(config: ImportConfig, catalogue: C, writer: W) -> Result<Self> {
        let input = config.input_file();
        let records = read_records(&input, config.input_format)?;
        info!("Read {} page records from {}", records.len(), input.display());
        Self::new(config, catalogue, writer, records)
    }

    pub fn available_units(&self) -> Vec<String> {
        list_available_units(&self.records, self.config.granularity, self.config.numbering)
    }

    fn clean_title(&self, title: &str) -> String {
        self.title_filter.replace_all(title, "").into_owned()
    }

    pub fn process_title(&self, volume_identifier: &str) -> String {
        self.clean_title(&format!("{}_{volume_identifier}", self.config.basic_name))
    }

    fn assembly_config(&self, volume_identifier: &str) -> AssemblyConfig {
        AssemblyConfig {
            create_issues: self.config.create_issues,
            title_prefix: self.config.title.clone(),
            volume_identifier: volume_identifier.to_string(),
            numbering: self.config.numbering,
            viewer_sub_theme: self.config.viewer_sub_theme.clone(),
            collection: self.config.collection.clone(),
            identifier_prefix: self.config.identifier_prefix.clone(),
        }
    }

    /// Prefixed identifiers, viewer theme and collection on the catalogue
    /// structure. The first volume of an anchor is identified by the unit.
    fn enrich(&self, tree: &mut DocumentTree, volume_identifier: &str) -> Result<()> {
        let prefix = &self.config.identifier_prefix;
        let digital_ppn = self.config.digital_ppn()?;
        let top = tree.logical_root();
        normalize_identifier(
            tree,
            top,
            MetadataField::CatalogIdDigital,
            &digital_ppn,
            prefix,
        )?;
        normalize_identifier(
            tree,
            top,
            MetadataField::CatalogIdSource,
            &self.config.ppn,
            prefix,
        )?;
        tree.add_metadata(
            top,
            MetadataField::ViewerSubTheme,
            &self.config.viewer_sub_theme,
        )?;
        tree.add_metadata(
            top,
            MetadataField::SingleDigCollection,
            &self.config.collection,
        )?;
        let child = tree.first_child(top).filter(|_| tree.kind(top).is_anchor());
        if let Some(child) = child {
            for field in [MetadataField::CatalogIdDigital, MetadataField::CatalogIdSource] {
                normalize_identifier(tree, child, field, volume_identifier, prefix)?;
            }
        }
        if self.config.strip_shelfmarks {
            for node in [Some(top), child].into_iter().flatten() {
                tree.remove_metadata(node, MetadataField::ShelfmarkSource);
            }
        }
        Ok(())
    }

    /// Fails the unit when its image folder breaks the naming convention.
    fn check_image_folder(
        &self,
        relocator: &AssetRelocator,
        records: &[PageRecord],
    ) -> Result<()> {
        let Some(names) = &self.image_names else {
            return Ok(());
        };
        let Some(folder) = relocator.unit_image_folder(records) else {
            return Ok(());
        };
        let problems = validate_image_folder(&folder, names);
        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            warn!("{}", problem);
        }
        Err(ImportError::InvalidFolder {
            folder: folder.display().to_string(),
            problems: problems.join("; "),
        })
    }

    fn run_unit(
        &self,
        unit: &str,
        volume_identifier: &str,
        result: &mut ImportResult,
    ) -> Result<()> {
        self.config.digital_ppn()?;
        let records = select(
            &self.records,
            unit,
            self.config.granularity,
            self.config.numbering,
        );
        if records.is_empty() {
            return Err(ImportError::Parse(format!("no page records for unit {unit}")));
        }

        let bib = self
            .catalogue
            .lookup(&self.config.catalogue, &self.config.ppn)
            .map_err(|e| ImportError::lookup(&self.config.ppn, e))?;

        if self.config.process_title_source == ProcessTitleSource::TitleSlug {
            let ats = atstsl_or_empty(bib.first(MetadataField::TitleDocMain).unwrap_or_default());
            if ats.is_empty() {
                warn!("No title slug for {}, keeping {}", unit, result.process_title);
            } else {
                result.process_title = self.clean_title(&format!("{ats}_{volume_identifier}"));
            }
        }

        let mut tree = DocumentTree::from_bib_record(&bib)?;
        self.enrich(&mut tree, volume_identifier)?;

        let layout = AssetLayout::new(
            &self.config.temp_folder,
            volume_identifier,
            &result.process_title,
            &self.config.media_folder_suffix(),
        );
        let relocator = AssetRelocator::new(&self.config, layout);
        self.check_image_folder(&relocator, &records)?;
        relocator.prepare()?;
        relocator.extract_pdfs(&records, unit_year(unit))?;

        let tree = assemble_tree(
            tree,
            &records,
            unit,
            &self.assembly_config(volume_identifier),
            &relocator,
        )?;
        self.writer.write(&tree, &result.mets_file)
    }

    pub fn import_unit(&self, unit: &str) -> ImportResult {
        // an unmapped PPN fails in run_unit, the result is still named
        let ppn = self
            .config
            .digital_ppn()
            .unwrap_or_else(|_| self.config.ppn.clone());
        let volume_identifier = volume_identifier(&ppn, unit);
        let mut result = ImportResult {
            unit: unit.to_string(),
            process_title: self.process_title(&volume_identifier),
            mets_file: self.config.temp_folder.join(format!("{volume_identifier}.xml")),
            status: ImportStatus::ExportFinished,
            error_message: None,
        };
        info!("Importing unit {} as {}", unit, result.process_title);
        if let Err(e) = self.run_unit(unit, &volume_identifier, &mut result) {
            error!("Import of unit {} failed: {}", unit, e);
            result.status = ImportStatus::from(&e);
            result.error_message = Some(e.to_string());
        }
        result
    }

    pub fn import_units(&self, units: &[String]) -> Vec<ImportResult> {
        units.iter().map(|unit| self.import_unit(unit)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::assemble_tree;
    use catalogue::{BibRecord, LookupError, RecordKind};
    use std::fs;
    use std::path::Path;

    struct NullWriter;

    impl MetadataWriter for NullWriter {
        fn write(&self, _: &DocumentTree, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl MetadataWriter for FailingWriter {
        fn write(&self, _: &DocumentTree, target: &Path) -> Result<()> {
            Err(ImportError::Write(format!("{} is read-only", target.display())))
        }
    }

    fn lookup(catalogue: &str, identifier: &str) -> std::result::Result<BibRecord, LookupError> {
        match identifier {
            "408063912" => Ok(BibRecord::new(RecordKind::Anchor)
                .with(MetadataField::TitleDocMain, "Jahrbuch des Landkreises Lindau")
                .with(MetadataField::CatalogIdDigital, "408063912")
                .with(MetadataField::ShelfmarkSource, "ZA 1234")
                .with_child(BibRecord::new(RecordKind::Volume))),
            "00030879X" => Ok(BibRecord::new(RecordKind::Monograph)
                .with(MetadataField::TitleDocMain, "Montfort")),
            _ => Err(LookupError::NotFound {
                catalogue: catalogue.to_string(),
                identifier: identifier.to_string(),
            }),
        }
    }

    fn config(temp: &Path, ppn: &str) -> ImportConfig {
        ImportConfig::from_toml_str(&format!(
            r#"
basic_name = "jall"
ppn = "{ppn}"
title = "Jahrbuch"
temp_folder = "{}"
basic_folder = "{}"
"#,
            temp.display(),
            temp.join("source").display()
        ))
        .unwrap()
    }

    fn records() -> Vec<PageRecord> {
        ["1998", "1999"]
            .iter()
            .map(|year| PageRecord {
                page_id: format!("jall{year}_s1"),
                booklet_id: format!("jall.{year}"),
                journal_id: String::from("jall"),
                sequence_number: String::from("1"),
                year: year.to_string(),
                label: String::from("1"),
                image_path: format!("/data/kebweb/jall/{year}/0001.jpg"),
            })
            .collect()
    }

    type Lookup = fn(&str, &str) -> std::result::Result<BibRecord, LookupError>;

    fn importer(config: ImportConfig) -> Importer<Lookup, NullWriter> {
        Importer::new(config, lookup as Lookup, NullWriter, records()).unwrap()
    }

    #[test]
    fn identifiers() {
        assert_eq!(volume_identifier("408063912", "1999"), "408063912_1999");
        assert_eq!(
            volume_identifier("4080+63912", "1999_02_a.b"),
            "4080_63912_1999_02_a_b"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ImportStatus::from(&ImportError::Write(String::new())),
            ImportStatus::WriteError
        );
        assert_eq!(
            ImportStatus::from(&ImportError::Preferences(String::new())),
            ImportStatus::InvalidData
        );
        assert_eq!(
            ImportStatus::from(&ImportError::lookup("1", LookupError::InvalidXml(String::new()))),
            ImportStatus::InvalidData
        );
        let folder = ImportError::InvalidFolder {
            folder: String::from("/a"),
            problems: String::from("/a is empty."),
        };
        assert_eq!(ImportStatus::from(&folder), ImportStatus::InvalidData);
    }

    #[test]
    fn process_title_filter() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(config(dir.path(), "408063912"));
        assert_eq!(importer.process_title("408063912_1999"), "jall_408063912_1999");
        assert_eq!(importer.clean_title("a-b c.d_e"), "abcd_e");
        assert_eq!(importer.available_units(), vec!["1998", "1999"]);
    }

    #[test]
    fn failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(config(dir.path(), "408063912"));
        let results = importer.import_units(&[String::from("1999"), String::from("2005")]);
        assert_eq!(results.len(), 2);
        // missing images are only logged
        assert_eq!(results[0].status, ImportStatus::ExportFinished);
        assert_eq!(results[0].mets_file, dir.path().join("408063912_1999.xml"));
        assert!(
            dir.path()
                .join("408063912_1999/images/jall_408063912_1999_tif")
                .is_dir()
        );
        assert_eq!(results[1].status, ImportStatus::InvalidData);
        assert!(results[1].error_message.is_some());
    }

    #[test]
    fn catalogue_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = importer(config(dir.path(), "1")).import_unit("1999");
        assert_eq!(result.status, ImportStatus::InvalidData);
        assert!(result.error_message.unwrap().contains("catalogue lookup failed"));
    }

    #[test]
    fn write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "408063912");
        let importer = Importer::new(config, lookup, FailingWriter, records()).unwrap();
        let result = importer.import_unit("1998");
        assert_eq!(result.status, ImportStatus::WriteError);
    }

    #[test]
    fn enrichment() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(config(dir.path(), "408063912"));
        let bib = lookup("BSZ-BW", "408063912").unwrap();
        let mut tree = DocumentTree::from_bib_record(&bib).unwrap();
        importer.enrich(&mut tree, "408063912_1999").unwrap();
        let top = tree.logical_root();
        assert_eq!(
            tree.values(top, MetadataField::CatalogIdDigital),
            vec!["bsz408063912"]
        );
        assert_eq!(
            tree.values(top, MetadataField::CatalogIdSource),
            vec!["bsz408063912"]
        );
        assert_eq!(
            tree.first_value(top, MetadataField::ViewerSubTheme),
            Some("bsz-st-bodenseebibliotheken")
        );
        assert_eq!(tree.values(top, MetadataField::ShelfmarkSource), vec!["ZA 1234"]);
        let volume = tree.first_child(top).unwrap();
        assert_eq!(
            tree.values(volume, MetadataField::CatalogIdDigital),
            vec!["bsz408063912_1999"]
        );
    }

    #[test]
    fn shelfmarks_can_be_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "408063912");
        config.strip_shelfmarks = true;
        let importer = importer(config);
        let bib = lookup("BSZ-BW", "408063912").unwrap();
        let mut tree = DocumentTree::from_bib_record(&bib).unwrap();
        importer.enrich(&mut tree, "408063912_1999").unwrap();
        assert!(
            tree.values(tree.logical_root(), MetadataField::ShelfmarkSource)
                .is_empty()
        );
    }

    #[test]
    fn monograph_gets_theme_and_collection_once() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(config(dir.path(), "00030879X"));
        let bib = lookup("BSZ-BW", "00030879X").unwrap();
        let mut tree = DocumentTree::from_bib_record(&bib).unwrap();
        importer.enrich(&mut tree, "00030879X_1999").unwrap();
        let to_tmp = |_: &PageRecord, n: u32| -> Result<PathBuf> {
            Ok(PathBuf::from(format!("/tmp/{n:08}.jpg")))
        };
        let config = &importer.config;
        let records = select(&importer.records, "1999", config.granularity, config.numbering);
        let tree = assemble_tree(
            tree,
            &records,
            "1999",
            &importer.assembly_config("00030879X_1999"),
            &to_tmp,
        )
        .unwrap();
        let top = tree.logical_root();
        assert_eq!(tree.values(top, MetadataField::ViewerSubTheme).len(), 1);
        assert_eq!(tree.values(top, MetadataField::SingleDigCollection).len(), 1);
        assert_eq!(tree.values(top, MetadataField::PublicationYear), vec!["1999"]);
    }

    #[test]
    fn analog_ppn_is_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "408063912");
        config
            .ppn_map
            .insert(String::from("408063912"), String::from("435423762"));
        let result = importer(config).import_unit("1999");
        assert_eq!(result.status, ImportStatus::ExportFinished);
        assert_eq!(result.process_title, "jall_435423762_1999");
        assert_eq!(result.mets_file, dir.path().join("435423762_1999.xml"));
    }

    #[test]
    fn unmapped_ppn_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "408063912");
        config
            .ppn_map
            .insert(String::from("00030879X"), String::from("435423762"));
        let result = importer(config).import_unit("1999");
        assert_eq!(result.status, ImportStatus::InvalidData);
        assert!(result.error_message.unwrap().contains("no digital PPN"));
    }

    #[test]
    fn badly_named_images_fail_the_unit() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("source/jall/1999");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("0001.jpg"), b"jpg").unwrap();
        fs::write(folder.join("Thumbs.db"), b"").unwrap();
        let mut config = config(dir.path(), "408063912");
        config.image_name_pattern = Some(String::from(r"\w{9}-S\d{4}-text-\w\d{4}\.tif"));
        let result = importer(config).import_unit("1999");
        assert_eq!(result.status, ImportStatus::InvalidData);
        let message = result.error_message.unwrap();
        assert!(message.contains("0001.jpg does not match naming conventions"));
        assert!(!message.contains("Thumbs.db"));
        // rejected before anything is copied
        assert!(!dir.path().join("408063912_1999").exists());
    }

    #[test]
    fn title_slug_process_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "408063912");
        config.process_title_source = ProcessTitleSource::TitleSlug;
        let result = importer(config).import_unit("1999");
        assert_eq!(result.process_title, "jahrdelal_408063912_1999");
    }
}
