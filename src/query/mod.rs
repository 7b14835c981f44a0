//! Code implementing the "query" sub command.

pub mod filters;
pub mod modes;

use std::fs::File;
use std::time::Instant;

use clap::Parser;

use crate::query::filters::CaseQuery;
use crate::query::modes::InheritanceMode;
use crate::store::CaseStore;

/// Command line arguments for `query` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run query for sequence variants", long_about = None)]
pub struct Args {
    /// Path to the case store JSON file.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Name of the family to query.
    #[arg(long, required = true)]
    pub family: String,
    /// Path to query JSON file.
    #[arg(long)]
    pub path_query_json: Option<String>,
    /// Inheritance mode to derive the genotype filter from.
    #[arg(long, value_enum)]
    pub mode: Option<InheritanceMode>,
    /// Path to the output JSON file.
    #[arg(long, required = true)]
    pub path_output: String,
}

/// Build the effective query from the optional query JSON and the
/// optional inheritance mode.
fn build_query(args: &Args, store: &CaseStore) -> Result<CaseQuery, anyhow::Error> {
    let mut query: CaseQuery = match &args.path_query_json {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => CaseQuery::default(),
    };
    if let Some(mode) = args.mode {
        let family = store
            .families
            .get(&args.family)
            .ok_or_else(|| anyhow::anyhow!("unknown family {}", &args.family))?;
        if !modes::is_feasible(family, mode) {
            anyhow::bail!(
                "inheritance mode {} is not feasible for family {}",
                mode,
                &args.family
            );
        }
        // mode-derived categories override any per-sample entries
        query.genotype.extend(modes::genotype_filter(family, mode));
    }
    if query.genotype.is_empty() && args.path_query_json.is_none() {
        anyhow::bail!("neither --path-query-json nor --mode was given");
    }
    Ok(query)
}

/// Main entry point for the `query` sub command.
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

    let query = build_query(args, &store)?;
    tracing::info!("query = {}", &serde_json::to_string(&query)?);

    tracing::info!("Building family index...");
    let before_building = Instant::now();
    let family_store = store
        .family_store(&args.family)
        .ok_or_else(|| anyhow::anyhow!("unknown family {}", &args.family))?;
    tracing::info!(
        "... done building family index over {} documents in {:?}",
        family_store.len(),
        before_building.elapsed()
    );

    tracing::info!("Running query...");
    let before_query = Instant::now();
    let result = family_store.query(&query, &store.annotations)?;
    tracing::info!(
        "... done running query with {} results in {:?}",
        result.len(),
        before_query.elapsed()
    );
    if store.annotations.miss_count() > 0 {
        tracing::warn!(
            "{} annotation lookups missed during the query",
            store.annotations.miss_count()
        );
    }

    let file = File::create(&args.path_output)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &result)?;

    tracing::info!(
        "All of `query` took {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
