//! Population frequency producers.
//!
//! Several flat-file shapes are accepted; the only contract with the rest
//! of the system is the resulting `(variant, population, frequency)`
//! triple. Files may be gzip-compressed.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::seqvars::norm;
use crate::seqvars::parse::{self, InfoNumber, RecordSchema};
use crate::seqvars::VariantKey;

/// One frequency observation for one variant in one population.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrequencyRecord {
    /// Variant identity.
    pub key: VariantKey,
    /// Population slug.
    pub population: String,
    /// Allele frequency in `0.0..=1.0`.
    pub frequency: f32,
}

/// Error type for frequency file reading.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Problem reading frequency file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Problem parsing frequency row: {0}")]
    Csv(#[from] csv::Error),
    #[error("Problem parsing frequency record: {0}")]
    Record(#[from] parse::Error),
    #[error("Frequency row has {0} columns, expected 6")]
    ColumnCount(usize),
}

/// Open a file, transparently decompressing gzip based on the extension.
pub fn open_maybe_gzip<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, Error> {
    let file = std::fs::File::open(path.as_ref())?;
    let reader: Box<dyn Read> = if path
        .as_ref()
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false)
    {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Read frequencies from a row-per-variant VCF-like file carrying a
/// `Number=A` `AF` INFO field.
pub fn read_vcf_like<R: BufRead>(
    reader: R,
    population: &str,
) -> Result<Vec<FrequencyRecord>, Error> {
    let mut schema = RecordSchema::new();
    schema
        .info_numbers
        .insert("AF".to_string(), InfoNumber::PerAlt);

    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            schema.digest_header_line(&line);
            // Frequency sources are consumed sites-only.
            schema.samples.clear();
            continue;
        }
        if line.is_empty() {
            continue;
        }
        let sites_only = line.split('\t').take(8).collect::<Vec<_>>().join("\t");
        for variant in parse::parse_record(&sites_only, &schema)? {
            if let Some(Some(af)) = variant.info.get("AF") {
                if let Ok(frequency) = af.parse::<f32>() {
                    result.push(FrequencyRecord {
                        key: variant.key,
                        population: population.to_string(),
                        frequency,
                    });
                }
            }
        }
    }
    Ok(result)
}

/// Read frequencies from a tab-separated count table with columns
/// `chrom pos ref alt ac an`.
pub fn read_count_table<R: BufRead>(
    reader: R,
    population: &str,
) -> Result<Vec<FrequencyRecord>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut result = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.len() != 6 {
            return Err(Error::ColumnCount(record.len()));
        }
        let pos: u64 = record[1]
            .parse()
            .map_err(|_| csv_parse_error(&record, "position"))?;
        let ac: u64 = record[4]
            .parse()
            .map_err(|_| csv_parse_error(&record, "allele count"))?;
        let an: u64 = record[5]
            .parse()
            .map_err(|_| csv_parse_error(&record, "allele number"))?;
        let (pos, reference, alternative) = norm::minimal_representation(pos, &record[2], &record[3]);
        let key = VariantKey::new(&record[0], pos, &reference, &alternative)
            .map_err(parse::Error::Coordinate)?;
        let frequency = if an == 0 { 0.0 } else { ac as f32 / an as f32 };
        result.push(FrequencyRecord {
            key,
            population: population.to_string(),
            frequency,
        });
    }
    Ok(result)
}

fn csv_parse_error(record: &csv::StringRecord, what: &str) -> parse::Error {
    parse::Error::MalformedRecord {
        reason: format!("unparseable {}", what),
        row: record.iter().collect::<Vec<_>>().join("\t"),
    }
}

/// Read frequencies from a directory of per-chromosome files, each in the
/// count-table shape.
pub fn read_per_chrom_dir<P: AsRef<Path>>(
    dir: P,
    population: &str,
) -> Result<Vec<FrequencyRecord>, Error> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut result = Vec::new();
    for path in paths {
        tracing::debug!("reading frequency file {}", path.display());
        result.extend(read_count_table(open_maybe_gzip(&path)?, population)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn vcf_like_with_per_alt_af() {
        let data = "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
                    #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
                    1\t100\t.\tG\tA,T\t.\tPASS\tAF=0.01,0.002\n";
        let records = read_vcf_like(data.as_bytes(), "gnomad").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.to_string(), "1-100-G-A");
        assert!(float_cmp::approx_eq!(f32, records[0].frequency, 0.01, ulps = 2));
        assert_eq!(records[1].key.to_string(), "1-100-G-T");
        assert!(float_cmp::approx_eq!(f32, records[1].frequency, 0.002, ulps = 2));
        assert_eq!(records[0].population, "gnomad");
    }

    #[test]
    fn count_table() {
        let data = "# comment\n\
                    1\t100\tG\tA\t5\t1000\n\
                    X\t200\tAT\tA\t1\t500\n";
        let records = read_count_table(data.as_bytes(), "topmed").unwrap();
        assert_eq!(records.len(), 2);
        assert!(float_cmp::approx_eq!(f32, records[0].frequency, 0.005, ulps = 2));
        assert_eq!(records[1].key.to_string(), "X-200-AT-A");
    }

    #[test]
    fn count_table_rejects_bad_shape() {
        let data = "1\t100\tG\tA\t5\n";
        assert!(matches!(
            read_count_table(data.as_bytes(), "topmed"),
            Err(Error::ColumnCount(5))
        ));
    }

    #[test]
    fn per_chrom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chr1.tsv"), "1\t100\tG\tA\t5\t1000\n").unwrap();
        std::fs::write(dir.path().join("chr2.tsv"), "2\t200\tG\tC\t2\t1000\n").unwrap();
        let records = read_per_chrom_dir(dir.path(), "inhouse").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.chrom(), "1");
        assert_eq!(records[1].key.chrom(), "2");
    }
}
