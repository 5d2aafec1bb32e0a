use bsz_import::{ImportConfig, ImportStatus, Importer, MetsWriter};
use catalogue::DirectoryCatalogue;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = env::var("BSZ_IMPORT_CONFIG")
        .map_err(|_| "BSZ_IMPORT_CONFIG env variable should be set")?;
    let config = ImportConfig::load(&PathBuf::from(config_path))?;
    let catalogue_root = config
        .catalogue_folder
        .clone()
        .unwrap_or_else(|| config.basic_folder.join("catalogue"));
    let importer = Importer::from_input(
        config,
        DirectoryCatalogue::new(catalogue_root),
        MetsWriter::default(),
    )?;

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] == "list" {
        for unit in importer.available_units() {
            println!("{unit}");
        }
        return Ok(ExitCode::SUCCESS);
    }
    let units = if args[0] == "all" {
        importer.available_units()
    } else {
        args
    };

    let results = importer.import_units(&units);
    let mut failed = 0;
    for res in &results {
        match res.status {
            ImportStatus::ExportFinished => {
                println!("{} {} {}", res.unit, res.process_title, res.mets_file.display())
            }
            status => {
                failed += 1;
                eprintln!(
                    "{} {:?}: {}",
                    res.unit,
                    status,
                    res.error_message.as_deref().unwrap_or_default()
                );
            }
        }
    }
    tracing::info!("{} of {} units imported", results.len() - failed, results.len());
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
