//! Code implementing the "report" sub command.

pub mod grouping;
pub mod inference;

use std::fs::File;
use std::time::Instant;

use clap::Parser;

use crate::report::grouping::{build_report, CandidateVariant};
use crate::store::CaseStore;

/// Command line arguments for `report` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble a candidate variant report", long_about = None)]
pub struct Args {
    /// Path to the case store JSON file.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Name of the family to report on.
    #[arg(long, required = true)]
    pub family: String,
    /// Path to the candidate variants JSON file.
    #[arg(long, required = true)]
    pub path_candidates: String,
    /// Path to the output JSON file.
    #[arg(long, required = true)]
    pub path_output: String,
}

/// Main entry point for the `report` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("Loading case store...");
    let before_loading = Instant::now();
    let store = CaseStore::load(&args.path_db)?;
    tracing::info!(
        "... done loading case store in {:?}",
        before_loading.elapsed()
    );

    let family = store
        .families
        .get(&args.family)
        .ok_or_else(|| anyhow::anyhow!("unknown family {}", &args.family))?;

    tracing::info!("Loading candidates...");
    let candidates: Vec<CandidateVariant> =
        serde_json::from_reader(File::open(&args.path_candidates)?)?;
    tracing::info!("... done loading {} candidates", candidates.len());

    tracing::info!("Assembling report...");
    let before_report = Instant::now();
    let report = build_report(family, &candidates, &store.annotations);
    tracing::info!(
        "... done assembling {} report rows in {:?}",
        report.len(),
        before_report.elapsed()
    );

    let file = File::create(&args.path_output)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &report)?;

    tracing::info!(
        "All of `report` took {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
