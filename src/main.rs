//! VM Manager - Main Entry Point
//!
//! Usage: vm-manager [OPTIONS] <INIT_FILE> <INPUT_FILE>
//!
//! Translated addresses are written to `output-dp.txt` (or
//! `output-no-dp.txt` with `--withoutdp`) unless `--output` is given.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use vm_manager::io::{read_virtual_addresses, write_results, InitData};
use vm_manager::{logger, FrameAllocator, MemoryStore, PagingMode, Result, Translator};

#[derive(Parser)]
#[command(name = "vm-manager")]
#[command(about = "Translates segmented virtual addresses to physical addresses")]
#[command(version)]
struct Cli {
    /// Initialization file with segment table and page table records
    init_file: PathBuf,

    /// File containing virtual addresses (whitespace separated)
    input_file: PathBuf,

    /// Run without demand paging; everything must be resident
    #[arg(long)]
    withoutdp: bool,

    /// Output file for physical addresses
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Settings for one simulation run
struct RunConfig {
    init_file: PathBuf,
    input_file: PathBuf,
    output_file: PathBuf,
    mode: PagingMode,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        let mode = if cli.withoutdp {
            PagingMode::Resident
        } else {
            PagingMode::Demand
        };
        RunConfig {
            output_file: cli
                .output
                .unwrap_or_else(|| PathBuf::from(mode.default_output())),
            init_file: cli.init_file,
            input_file: cli.input_file,
            mode,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose, cli.quiet));

    match run(&RunConfig::from(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    info!("Running {}", config.mode);

    let init = InitData::from_file(&config.init_file)?;
    let mut store = MemoryStore::new();
    let mut frames = FrameAllocator::new();
    init.apply(&mut store, &mut frames)?;
    info!(
        "{} segments, {} pages initialized, {} frames free",
        init.segments.len(),
        init.pages.len(),
        frames.free_count()
    );

    let vas = read_virtual_addresses(&config.input_file)?;
    info!("Virtual addresses to translate: {}", vas.len());

    let mut translator = Translator::new(store, frames, config.mode);
    let results = translator.translate_all(&vas)?;

    let stats = translator.stats();
    info!(
        "Translated {}, segmentation faults {}, unmapped {}",
        stats.translated, stats.segmentation_faults, stats.unmapped
    );
    info!(
        "Page table faults {}, page faults {}, frames free {}",
        stats.page_table_faults,
        stats.page_faults,
        translator.frames().free_count()
    );

    write_results(&config.output_file, &results)?;
    info!("Results written to: {}", config.output_file.display());

    Ok(())
}
