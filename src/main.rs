use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use mcabber_hist_merge::logger::init_logger;
use mcabber_hist_merge::store::merge_stores;

/// Merge two mcabber history stores into one.
///
/// Both stores must be of the same kind: two history files, or two flat
/// directories of history files. Overlapping files are merged in
/// chronological order with duplicate entries collapsed; files present on
/// only one side are copied through unchanged.
#[derive(Parser, Debug)]
#[command(name = "mcabber-hist-merge", version, about)]
struct Cli {
    /// First input store (file or directory); wins ties on identical
    /// timestamps and is the destination in --in-place mode
    store1: PathBuf,

    /// Second input store (same kind as the first)
    store2: PathBuf,

    /// Output store; required unless --in-place is given
    output: Option<PathBuf>,

    /// Write the merged result back into the first store
    #[arg(short, long)]
    in_place: bool,
}

impl Cli {
    fn destination(&self) -> Result<PathBuf> {
        match (&self.output, self.in_place) {
            (Some(_), true) => bail!("--in-place cannot be combined with an output path"),
            (Some(out), false) => Ok(out.clone()),
            (None, true) => Ok(self.store1.clone()),
            (None, false) => bail!("either an output path or --in-place is required"),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let dest = cli.destination()?;
    let summary = merge_stores(&cli.store1, &cli.store2, &dest)?;

    println!(
        "{} {} file pair(s) merged, {} file(s) copied, {} duplicate(s) dropped -> {}",
        "✓".green(),
        summary.merged_files,
        summary.copied_files,
        summary.duplicates_dropped,
        dest.display()
    );

    Ok(())
}

fn main() -> ExitCode {
    init_logger();

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{} {:#}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}
