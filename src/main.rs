//! twinmark - headless driver
//!
//! Renders a Markdown file and prints the HTML, or with `--roundtrip`
//! prints the Markdown obtained by rendering and serializing it back.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use twinmark::files::FsDocumentStore;
use twinmark::{load_config, EditMode, SyncCoordinator};

#[derive(Parser, Debug)]
#[command(name = "twinmark", version, about, long_about = None)]
struct Cli {
    /// Markdown file to open
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Print the Markdown after a WYSIWYG round trip instead of HTML
    #[arg(long)]
    roundtrip: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting twinmark");

    let settings = load_config();
    let mut coordinator = SyncCoordinator::new(settings);
    if let Err(e) = coordinator.open_file(&FsDocumentStore, &cli.path, Instant::now()) {
        error!("{}", e);
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    if cli.roundtrip {
        coordinator.set_mode(EditMode::Wysiwyg);
        coordinator.set_mode(EditMode::Source);
        println!("{}", coordinator.source());
    } else {
        println!("{}", coordinator.html());
    }

    info!("{}", coordinator.stats().format_compact());
    ExitCode::SUCCESS
}
