use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

use ofxflow::errors::Error;
use ofxflow::io;
use ofxflow::ofx::Mapping;

/// Convert a ubank CSV export into one OFX file per account
#[derive(Debug, Parser)]
#[command(name = "ofxflow", version, about)]
struct Args {
    /// Input CSV file exported from ubank
    #[arg(short = 'f', long = "file-in", default_value = "_data/ubank_data.csv")]
    file_in: PathBuf,
    /// Directory the OFX files are written into
    #[arg(short = 'o', long = "folder-out", default_value = "_out")]
    folder_out: PathBuf,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let rows = io::read_rows_from_path(&args.file_in)?;
    let written = io::export(
        rows,
        &args.folder_out,
        &Mapping::ubank(),
        Utc::now().naive_utc(),
    )?;
    println!("{} file(s) written to {}", written.len(), args.folder_out.display());
    Ok(())
}
