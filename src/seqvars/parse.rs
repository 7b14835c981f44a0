//! Parsing of tabular variant records into variants and genotypes.
//!
//! One physical row is split into one variant per alternate allele, each
//! with the allele's own normalized coordinates, the per-allele slice of
//! the INFO fields, the transcript consequences attributed to it, and one
//! genotype per declared sample.

use indexmap::IndexMap;

use crate::annos::TranscriptConsequence;
use crate::common::xpos;
use crate::seqvars::{norm, Genotype, VariantKey};

/// Error type for record parsing.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The row shape or one of its sub-fields cannot be interpreted. The
    /// caller decides whether to skip the row or abort the batch.
    #[error("Malformed record ({reason}): {row}")]
    MalformedRecord { reason: String, row: String },
    #[error("Invalid coordinate: {0}")]
    Coordinate(#[from] xpos::Error),
}

fn malformed(reason: impl Into<String>, row: &str) -> Error {
    Error::MalformedRecord {
        reason: reason.into(),
        row: row.to_string(),
    }
}

/// Cardinality of an INFO field, from the `Number` header attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InfoNumber {
    /// One value per alternate allele (`Number=A`).
    PerAlt,
    /// One value per allele including the reference (`Number=R`).
    PerAllele,
    /// Presence-only flag (`Number=0`).
    Flag,
    /// Anything else; passed through unsplit.
    #[default]
    Other,
}

/// Declared layout of the tabular records: sample order, INFO
/// cardinalities, and the per-transcript sub-annotation format.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordSchema {
    /// Sample names in column order.
    pub samples: Vec<String>,
    /// INFO field cardinalities by key.
    pub info_numbers: IndexMap<String, InfoNumber>,
    /// INFO key carrying the per-transcript consequence records.
    pub csq_key: String,
    /// Declared pipe-delimited field names of the consequence records.
    pub csq_fields: Vec<String>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self {
            csq_key: "CSQ".to_string(),
            ..Default::default()
        }
    }

    /// Digest one header line (`##INFO=<...>` or the `#CHROM` column line).
    ///
    /// Returns `true` once the column line has been seen, i.e., the schema
    /// is complete and data rows follow.
    pub fn digest_header_line(&mut self, line: &str) -> bool {
        if let Some(body) = line
            .strip_prefix("##INFO=<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let id = header_attribute(body, "ID");
            let number = header_attribute(body, "Number");
            if let Some(id) = id {
                let info_number = match number.as_deref() {
                    Some("A") => InfoNumber::PerAlt,
                    Some("R") => InfoNumber::PerAllele,
                    Some("0") => InfoNumber::Flag,
                    _ => InfoNumber::Other,
                };
                if id == self.csq_key {
                    if let Some(description) = header_attribute(body, "Description") {
                        if let Some(format) = description.split("Format: ").nth(1) {
                            self.csq_fields =
                                format.split('|').map(|s| s.trim().to_string()).collect();
                        }
                    }
                }
                self.info_numbers.insert(id, info_number);
            }
            false
        } else if let Some(body) = line.strip_prefix("#CHROM") {
            // Columns after FORMAT are the sample names.
            self.samples = body
                .split('\t')
                .skip(1)
                .skip_while(|col| *col != "FORMAT")
                .skip(1)
                .map(|s| s.to_string())
                .collect();
            true
        } else {
            false
        }
    }
}

/// Extract one `key=value` attribute from a structured header line body,
/// honoring double quotes around the value.
fn header_attribute(body: &str, key: &str) -> Option<String> {
    let start = body.find(&format!("{}=", key))? + key.len() + 1;
    let rest = &body[start..];
    if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next().map(|s| s.to_string())
    } else {
        rest.split(',').next().map(|s| s.to_string())
    }
}

/// One variant split out of a tabular row, with attributed annotation and
/// per-sample genotypes.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedVariant {
    /// Normalized variant identity.
    pub key: VariantKey,
    /// Per-allele resolved INFO values; `Some("")` for present flags.
    pub info: IndexMap<String, Option<String>>,
    /// Transcript consequences attributed to this allele.
    pub transcripts: Vec<TranscriptConsequence>,
    /// Genotypes by sample name.
    pub genotypes: IndexMap<String, Genotype>,
}

/// One transcript consequence record together with the allele it belongs to.
#[derive(Debug, Clone, Default)]
struct CsqRecord {
    allele_num: Option<usize>,
    transcript: TranscriptConsequence,
}

/// Parse one tabular record into one variant per alternate allele.
///
/// A literal `"*"` alternate allele (spanning-deletion placeholder) is
/// skipped. Each emitted variant carries its own normalized coordinates.
pub fn parse_record(line: &str, schema: &RecordSchema) -> Result<Vec<ParsedVariant>, Error> {
    let row = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = row.split('\t').collect();
    let expected = if schema.samples.is_empty() {
        8
    } else {
        9 + schema.samples.len()
    };
    if fields.len() != expected {
        return Err(malformed(
            format!("expected {} columns, got {}", expected, fields.len()),
            row,
        ));
    }

    let chrom = fields[0];
    let pos = fields[1]
        .parse::<u64>()
        .map_err(|_| malformed("unparseable position", row))?;
    let reference = fields[3];
    let alternatives: Vec<&str> = fields[4].split(',').collect();
    let filter = fields[6];
    let info_pairs = parse_info(fields[7]);
    let format_keys: Vec<&str> = if schema.samples.is_empty() {
        vec![]
    } else {
        fields[8].split(':').collect()
    };

    let csq_records = info_pairs
        .get(schema.csq_key.as_str())
        .and_then(|value| value.as_deref())
        .map(|raw| parse_csq(raw, &schema.csq_fields))
        .unwrap_or_default();

    let mut result = Vec::new();
    for (alt_index, alternative) in alternatives.iter().enumerate() {
        if *alternative == "*" {
            continue;
        }
        let allele_no = alt_index + 1;

        let mut info = IndexMap::new();
        for (key, value) in info_pairs.iter() {
            if *key == schema.csq_key {
                continue;
            }
            let number = schema
                .info_numbers
                .get(*key)
                .copied()
                .unwrap_or(InfoNumber::Other);
            let resolved = match (number, value) {
                (InfoNumber::Flag, _) => Some(String::new()),
                (InfoNumber::PerAlt, Some(value)) => {
                    value.split(',').nth(alt_index).map(|s| s.to_string())
                }
                (InfoNumber::PerAllele, Some(value)) => {
                    value.split(',').nth(allele_no).map(|s| s.to_string())
                }
                (_, value) => value.as_ref().map(|s| s.to_string()),
            };
            info.insert(key.to_string(), resolved);
        }

        let transcripts = csq_records
            .iter()
            .filter(|record| record.allele_num.map(|n| n == allele_no).unwrap_or(false))
            .map(|record| record.transcript.clone())
            .collect::<Vec<_>>();

        let (norm_pos, norm_ref, norm_alt) =
            norm::minimal_representation(pos, reference, alternative);
        let key = VariantKey::new(chrom, norm_pos, &norm_ref, &norm_alt)?;

        let mut genotypes = IndexMap::new();
        for (sample_index, sample) in schema.samples.iter().enumerate() {
            let genotype = parse_genotype(
                sample,
                fields[9 + sample_index],
                &format_keys,
                allele_no,
                reference,
                &alternatives,
                filter,
                row,
            )?;
            genotypes.insert(sample.clone(), genotype);
        }

        result.push(ParsedVariant {
            key,
            info,
            transcripts,
            genotypes,
        });
    }
    Ok(result)
}

/// Split the INFO column into `key -> Option<value>` pairs (bare flags map
/// to `None`).
fn parse_info(column: &str) -> IndexMap<&str, Option<String>> {
    let mut result = IndexMap::new();
    if column == "." || column.is_empty() {
        return result;
    }
    for entry in column.split(';') {
        match entry.split_once('=') {
            Some((key, value)) => result.insert(key, Some(value.to_string())),
            None => result.insert(entry, None),
        };
    }
    result
}

/// Parse the pipe-delimited per-transcript consequence records.
fn parse_csq(raw: &str, csq_fields: &[String]) -> Vec<CsqRecord> {
    let field_index = |name: &str| csq_fields.iter().position(|f| f == name);
    let idx_gene = field_index("Gene");
    let idx_feature = field_index("Feature");
    let idx_consequence = field_index("Consequence");
    let idx_biotype = field_index("BIOTYPE");
    let idx_canonical = field_index("CANONICAL");
    let idx_allele_num = field_index("ALLELE_NUM");

    raw.split(',')
        .map(|entry| {
            let values: Vec<&str> = entry.split('|').collect();
            let get = |idx: Option<usize>| idx.and_then(|i| values.get(i)).copied().unwrap_or("");
            CsqRecord {
                allele_num: get(idx_allele_num).parse::<usize>().ok(),
                transcript: TranscriptConsequence {
                    gene_id: get(idx_gene).to_string(),
                    transcript_id: get(idx_feature).to_string(),
                    consequences: get(idx_consequence)
                        .split('&')
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect(),
                    is_coding: get(idx_biotype) == "protein_coding",
                    canonical: get(idx_canonical) == "YES",
                },
            }
        })
        .collect()
}

/// Parse one per-sample column into a `Genotype` for the given allele.
#[allow(clippy::too_many_arguments)]
fn parse_genotype(
    sample: &str,
    column: &str,
    format_keys: &[&str],
    allele_no: usize,
    reference: &str,
    alternatives: &[&str],
    filter: &str,
    row: &str,
) -> Result<Genotype, Error> {
    if format_keys.first() != Some(&"GT") {
        return Err(malformed("FORMAT does not start with GT", row));
    }
    let subfields: Vec<&str> = column.split(':').collect();
    let call = subfields.first().copied().unwrap_or(".");

    let mut indices = Vec::new();
    let mut any_missing = false;
    for token in call.split(['/', '|']) {
        if token == "." {
            any_missing = true;
        } else {
            let index = token
                .parse::<usize>()
                .map_err(|_| malformed(format!("unparseable allele index {:?}", token), row))?;
            if index > alternatives.len() {
                return Err(malformed(
                    format!("allele index {} out of range", index),
                    row,
                ));
            }
            indices.push(index);
        }
    }

    let (alleles, num_alt) = if any_missing {
        (vec![], None)
    } else {
        let alleles = indices
            .iter()
            .map(|&index| {
                if index == 0 {
                    reference.to_string()
                } else {
                    alternatives[index - 1].to_string()
                }
            })
            .collect();
        let num_alt = indices.iter().filter(|&&index| index == allele_no).count() as i32;
        (alleles, Some(num_alt))
    };

    let subfield = |key: &str| {
        format_keys
            .iter()
            .position(|k| *k == key)
            .and_then(|i| subfields.get(i))
            .copied()
            .filter(|value| *value != ".")
    };

    let gq = subfield("GQ").and_then(|value| value.parse::<f32>().ok());
    let ab = subfield("AD").and_then(|value| {
        let depths: Vec<i64> = value
            .split(',')
            .filter_map(|token| token.parse::<i64>().ok())
            .collect();
        let total: i64 = depths.iter().sum();
        let alt_reads = depths.get(allele_no).copied()?;
        (total > 0).then(|| alt_reads as f32 / total as f32)
    });

    let mut extras = IndexMap::new();
    for (key, value) in format_keys.iter().zip(subfields.iter()) {
        if !matches!(*key, "GT" | "GQ" | "AD") {
            extras.insert(key.to_string(), value.to_string());
        }
    }

    Ok(Genotype {
        sample: sample.to_string(),
        alleles,
        num_alt,
        gq,
        filter: filter.to_string(),
        ab,
        extras,
    })
}

/// Whether a parsed variant row is relevant to the given individuals.
///
/// A row is relevant if any of the individuals shows an alternate allele.
/// A row mixing missing and homozygous-reference calls is ambiguous and
/// deliberately kept rather than dropped.
pub fn is_relevant(genotypes: &IndexMap<String, Genotype>, individuals: &[String]) -> bool {
    let mut has_missing = false;
    let mut has_hom_ref = false;
    for name in individuals {
        match genotypes.get(name).and_then(|genotype| genotype.num_alt) {
            Some(num_alt) if num_alt > 0 => return true,
            Some(_) => has_hom_ref = true,
            None => has_missing = true,
        }
    }
    has_missing && has_hom_ref
}
