use crate::cli::AnalyzeArgs;
use crate::config::{AppConfig, PartialAnalysisConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};
use trajkit::core::models::molecule::MemoryMolecule;
use trajkit::engine::dataset::DataSet;
use trajkit::engine::host::Molecule;
use trajkit::engine::progress::ProgressReporter;
use trajkit::workflows;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let partial_config = PartialAnalysisConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;
    execute(&config)
}

fn load_molecule(path: &Path) -> Result<MemoryMolecule> {
    MemoryMolecule::from_xyz_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub fn execute(config: &AppConfig) -> Result<()> {
    info!("Loading topology from {:?}", &config.topology);
    let mut molecule = load_molecule(&config.topology)?;
    let reference = match &config.reference {
        Some(path) => {
            info!("Loading RMSD reference from {:?}", path);
            Some(load_molecule(path)?)
        }
        None => None,
    };

    if config.plan.trajectories.is_empty() {
        warn!("No trajectory files were given; the table will only contain a header.");
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let mut dataset = workflows::analyze::prepare(
        &molecule,
        reference.as_ref().map(|m| m as &dyn Molecule),
        &config.plan,
        &reporter,
    )?;
    eprintln!(
        "Analyzing {} trajectory file(s)...",
        config.plan.trajectories.len()
    );
    let outcome = workflows::analyze::run(&mut molecule, &config.plan, &mut dataset, &reporter);
    info!(
        "Workflow finished with {} row(s) in {} column(s).",
        dataset.len(),
        dataset.num_columns()
    );

    // Rows collected before a failure are still written out.
    let written = match &config.output {
        Some(path) => File::create(path)
            .map_err(CliError::from)
            .and_then(|file| write_table(&dataset, BufWriter::new(file), config.csv)),
        None => write_table(&dataset, io::stdout().lock(), config.csv),
    };
    if let Err(e) = outcome {
        if let Err(write_error) = written {
            warn!("Partial results could not be written: {}", write_error);
        } else {
            eprintln!("✗ Analysis stopped after {} row(s).", dataset.len());
        }
        return Err(e.into());
    }
    written?;
    if let Some(path) = &config.output {
        eprintln!("✓ {} row(s) written to: {}", dataset.len(), path.display());
    }
    Ok(())
}

fn write_table<W: Write>(dataset: &DataSet, mut writer: W, csv: bool) -> Result<()> {
    if csv {
        dataset.write_csv(&mut writer)?;
    } else {
        dataset.write(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}
