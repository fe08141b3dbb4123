//! CLI driver for the annotation core.
//!
//! Opens an image folder and either reports label coverage or runs batch
//! detection over every image, saving results as it goes.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use apexlabel::{AppConfig, Session};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image folder to annotate
    folder: PathBuf,

    /// Class listing file (one name per line)
    #[arg(long)]
    classes: Option<PathBuf>,

    /// ONNX model for detection-assisted labeling
    #[arg(long)]
    model: Option<PathBuf>,

    /// Work-mode preset name (see the config's work-mode table)
    #[arg(long, default_value = "general")]
    work_mode: String,

    /// Configuration file (JSON); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run detection over every image in the folder and save the results
    #[arg(long)]
    detect_all: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {:?}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    env_logger::Builder::from_default_env()
        .filter_level(config.log_level.to_level_filter())
        .init();

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, config: AppConfig) -> Result<(), apexlabel::SessionError> {
    let work_mode_index = config
        .work_modes
        .iter()
        .position(|m| m.name == args.work_mode);

    let mut session = Session::new(config);
    match work_mode_index {
        Some(index) => {
            session.set_work_mode(index);
        }
        None => {
            eprintln!("Unknown work-mode '{}', using the default", args.work_mode);
        }
    }

    let count = session.open_folder(&args.folder)?;
    println!("{} images in {:?}", count, args.folder);

    if let Some(classes) = &args.classes {
        session.load_taxonomy(classes)?;
        println!("{} classes loaded", session.taxonomy().len());
    }

    if let Some(model) = &args.model {
        session.load_model(model)?;
    }

    if args.detect_all {
        session.start_batch();
        let mut written = 0usize;
        let mut failed = 0usize;
        while let Some(progress) = session.batch_step() {
            match progress.result {
                Ok(labels) => {
                    written += labels;
                    println!(
                        "[{}/{}] {} labels",
                        progress.index + 1,
                        progress.total,
                        labels
                    );
                }
                Err(e) => {
                    failed += 1;
                    eprintln!("[{}/{}] failed: {}", progress.index + 1, progress.total, e);
                }
            }
        }
        println!("Batch done: {} labels written, {} images failed", written, failed);
        return Ok(());
    }

    // Default action: report per-image label coverage.
    for index in 0..session.images().len() {
        session.load_image(index)?;
        let path = session.current_image().map(PathBuf::from).unwrap_or_default();
        println!("{}: {} labels", path.display(), session.labels().len());
    }
    Ok(())
}
