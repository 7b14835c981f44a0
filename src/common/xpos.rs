//! Encoding of (chromosome, 1-based position) pairs into single ordered
//! integer keys.
//!
//! The encoding assigns each canonical chromosome a code (1..=22 for the
//! autosomes, 23 for X, 24 for Y, 25 for MT) and packs code and position
//! into one `u64` so that keys sort by genome coordinate.

use crate::common::CHROMS;

/// Multiplier separating the chromosome code from the position.
pub const CHROM_OFFSET: u64 = 1_000_000_000;

/// Error type for encoding/decoding.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid chromosome: {0}")]
    InvalidChromosome(String),
    #[error("Invalid position: {0}")]
    InvalidPosition(u64),
}

/// Return the numeric code for a chromosome name.
///
/// Accepts names with or without a `"chr"` prefix, case-insensitively, and
/// both `"M"` and `"MT"` for the mitochondrial chromosome.
pub fn chrom_code(chrom: &str) -> Result<u64, Error> {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    match stripped.to_ascii_uppercase().as_str() {
        "X" => Ok(23),
        "Y" => Ok(24),
        "M" | "MT" => Ok(25),
        other => other
            .parse::<u64>()
            .ok()
            .filter(|code| (1..=22).contains(code))
            .ok_or_else(|| Error::InvalidChromosome(chrom.to_string())),
    }
}

/// Return the canonical chromosome name for a numeric code.
pub fn chrom_name(code: u64) -> Result<&'static str, Error> {
    if (1..=25).contains(&code) {
        Ok(CHROMS[(code - 1) as usize])
    } else {
        Err(Error::InvalidChromosome(format!("code {}", code)))
    }
}

/// Encode a (chromosome, 1-based position) pair into an ordered integer key.
pub fn encode(chrom: &str, pos: u64) -> Result<u64, Error> {
    if pos == 0 || pos >= CHROM_OFFSET {
        return Err(Error::InvalidPosition(pos));
    }
    Ok(chrom_code(chrom)? * CHROM_OFFSET + pos)
}

/// Decode an integer key back into (chromosome, 1-based position).
pub fn decode(xpos: u64) -> Result<(&'static str, u64), Error> {
    let pos = xpos % CHROM_OFFSET;
    let chrom = chrom_name(xpos / CHROM_OFFSET)?;
    if pos == 0 {
        return Err(Error::InvalidPosition(pos));
    }
    Ok((chrom, pos))
}
