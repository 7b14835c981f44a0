//! Sequence variant representation and parsing.

pub mod freqs;
pub mod norm;
pub mod parse;

use indexmap::IndexMap;

use crate::common::{self, xpos};

/// Identity of one sequence variant: encoded position plus allele pair.
///
/// Orders by `(xpos, ref, alt)`, i.e., by genome coordinate first.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct VariantKey {
    /// Encoded (chromosome, position).
    pub xpos: u64,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
}

impl VariantKey {
    /// Construct from chromosome name and 1-based position.
    pub fn new(
        chrom: &str,
        pos: u64,
        reference: &str,
        alternative: &str,
    ) -> Result<Self, xpos::Error> {
        Ok(Self {
            xpos: xpos::encode(chrom, pos)?,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
        })
    }

    /// Chromosome name.
    pub fn chrom(&self) -> &'static str {
        xpos::decode(self.xpos)
            .map(|(chrom, _)| chrom)
            .unwrap_or("?")
    }

    /// 1-based start position.
    pub fn pos(&self) -> u64 {
        self.xpos % xpos::CHROM_OFFSET
    }

    /// 1-based end position, adjusted for the reference allele length.
    pub fn end(&self) -> u64 {
        self.pos() + self.reference.len() as u64 - 1
    }

    /// Whether the variant lies on the non-pseudoautosomal region of X.
    pub fn is_x_nonpar(&self) -> bool {
        self.chrom() == "X" && common::is_x_nonpar(self.pos())
    }

    /// Smallest possible key, usable as a range bound.
    pub fn smallest() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.chrom(),
            self.pos(),
            self.reference,
            self.alternative
        )
    }
}

/// One sample's call at one variant.
///
/// Only meaningful paired with an individual and a variant.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Genotype {
    /// The sample name.
    pub sample: String,
    /// The called allele strings; empty if uncalled.
    pub alleles: Vec<String>,
    /// Number of alternate alleles in the call (0, 1, 2), `None` if missing.
    pub num_alt: Option<i32>,
    /// Genotype quality, if present.
    pub gq: Option<f32>,
    /// FILTER tag from the source row.
    pub filter: String,
    /// Allele balance (alt-supporting reads over total), if computable.
    pub ab: Option<f32>,
    /// Auxiliary per-sample fields (DP, PL, and similar), raw strings.
    pub extras: IndexMap<String, String>,
}

impl Eq for Genotype {}

impl Genotype {
    /// Whether the call shows at least one alternate allele.
    pub fn has_alt(&self) -> bool {
        self.num_alt.map(|n| n > 0).unwrap_or(false)
    }
}
