//! Code implementing the "ingest" sub command.

use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use indexmap::IndexMap;

use crate::annos::AnnoDb;
use crate::common::worker_version;
use crate::ped::{read_ped, LoadStatus};
use crate::seqvars::freqs::{
    open_maybe_gzip, read_count_table, read_per_chrom_dir, read_vcf_like, FrequencyRecord,
};
use crate::seqvars::parse::{self, RecordSchema};
use crate::seqvars::Genotype;
use crate::store::writer::BulkWriter;
use crate::store::{CaseStore, FamilyVariantDocument};

/// Command line arguments for `ingest` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Ingest annotated variants into a case store", long_about = None)]
pub struct Args {
    /// Path to the PED file describing the families.
    #[arg(long, required = true)]
    pub path_ped: String,
    /// Path to the annotated variant file (plain or gzip).
    #[arg(long, required = true)]
    pub path_in: String,
    /// Path to the output case store JSON file.
    #[arg(long, required = true)]
    pub path_out: String,
    /// Population frequency sources as `POPULATION=PATH` pairs; `PATH`
    /// may be a VCF-like file, a count table, or a per-chromosome
    /// directory of count tables.
    #[arg(long)]
    pub path_freqs: Vec<String>,
    /// Skip malformed rows instead of aborting.
    #[arg(long, default_value_t = false)]
    pub skip_malformed: bool,
    /// Optional maximal number of variants to ingest.
    #[arg(long)]
    pub max_var_count: Option<usize>,
}

/// Read one frequency source, dispatching on its shape.
fn read_freq_source(population: &str, path: &str) -> Result<Vec<FrequencyRecord>, anyhow::Error> {
    let records = if Path::new(path).is_dir() {
        read_per_chrom_dir(path, population)?
    } else if path.ends_with(".vcf") || path.ends_with(".vcf.gz") {
        read_vcf_like(open_maybe_gzip(path)?, population)?
    } else {
        read_count_table(open_maybe_gzip(path)?, population)?
    };
    Ok(records)
}

/// Load all frequency sources into the annotation database.
fn load_frequencies(args: &Args, annotations: &mut AnnoDb) -> Result<(), anyhow::Error> {
    for source in &args.path_freqs {
        let (population, path) = source
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid frequency source {:?}", source))?;
        tracing::info!("Loading {} frequencies from {}...", population, path);
        let records = read_freq_source(population, path)?;
        tracing::info!("... done loading {} frequency records", records.len());
        for record in records {
            annotations.upsert_frequency(record.key, &record.population, record.frequency);
        }
    }
    Ok(())
}

/// Main entry point for the `ingest` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("Loading pedigree...");
    let mut families = read_ped(open_maybe_gzip(&args.path_ped)?)?;
    tracing::info!("... done loading {} families", families.len());

    let mut annotations = AnnoDb::default();
    load_frequencies(args, &mut annotations)?;

    tracing::info!("Ingesting variants from {}...", &args.path_in);
    let before_ingest = Instant::now();
    let mut schema = RecordSchema::new();
    let mut writer = BulkWriter::new();
    let mut var_count = 0;
    let mut skipped = 0;
    let mut doc_count = 0;

    'lines: for line in open_maybe_gzip(&args.path_in)?.lines() {
        let line = line?;
        if line.starts_with('#') {
            schema.digest_header_line(&line);
            continue;
        }
        if line.is_empty() {
            continue;
        }
        let variants = match parse::parse_record(&line, &schema) {
            Ok(variants) => variants,
            Err(err) if args.skip_malformed => {
                tracing::warn!("skipping malformed row: {}", err);
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        for variant in variants {
            annotations.upsert_transcripts(variant.key.clone(), variant.transcripts.clone());
            for family in families.values() {
                let names = family.sample_names();
                if !parse::is_relevant(&variant.genotypes, &names) {
                    continue;
                }
                let genotypes: IndexMap<String, Genotype> = names
                    .iter()
                    .filter_map(|name| {
                        variant
                            .genotypes
                            .get(name)
                            .map(|genotype| (name.clone(), genotype.clone()))
                    })
                    .collect();
                writer.push(FamilyVariantDocument::new(
                    &family.name,
                    variant.key.clone(),
                    genotypes,
                    annotations.get(&variant.key),
                ));
                doc_count += 1;
            }
            var_count += 1;
            if let Some(max_var_count) = args.max_var_count {
                if var_count >= max_var_count {
                    tracing::warn!("stopping after {} variants", var_count);
                    break 'lines;
                }
            }
        }
    }
    let stores = writer.finish();
    tracing::info!(
        "... done ingesting {} variants ({} skipped) into {} documents in {:?}",
        var_count,
        skipped,
        doc_count,
        before_ingest.elapsed()
    );

    for family in families.values_mut() {
        family.status = LoadStatus::Loaded;
    }
    let store = CaseStore {
        version: worker_version().to_string(),
        families,
        annotations,
        documents: stores
            .values()
            .flat_map(|store| store.documents().cloned())
            .collect(),
    };

    tracing::info!("Writing case store to {}...", &args.path_out);
    store.save(&args.path_out)?;

    tracing::info!(
        "All of `ingest` took {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
