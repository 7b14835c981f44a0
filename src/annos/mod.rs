//! Per-variant annotation storage: population frequencies, transcript
//! consequences, gene membership, and the convenience fields derived from
//! them.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::seqvars::VariantKey;

/// Consequence terms ordered most severe first.
pub const CONSEQUENCE_SEVERITY: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "transcript_amplification",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    "splice_region_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
    "coding_sequence_variant",
    "mature_miRNA_variant",
    "5_prime_UTR_variant",
    "3_prime_UTR_variant",
    "non_coding_transcript_exon_variant",
    "intron_variant",
    "NMD_transcript_variant",
    "non_coding_transcript_variant",
    "upstream_gene_variant",
    "downstream_gene_variant",
    "TFBS_ablation",
    "TFBS_amplification",
    "TF_binding_site_variant",
    "regulatory_region_ablation",
    "regulatory_region_amplification",
    "feature_elongation",
    "regulatory_region_variant",
    "feature_truncation",
    "intergenic_variant",
];

/// Consequence terms that touch the coding sequence.
pub const CODING_CONSEQUENCES: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
    "coding_sequence_variant",
];

/// Index of the given term in the severity table (0 = most severe).
pub fn severity_index(term: &str) -> Option<usize> {
    CONSEQUENCE_SEVERITY.iter().position(|t| *t == term)
}

/// One transcript's consequence prediction for a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptConsequence {
    /// Gene identifier.
    pub gene_id: String,
    /// Transcript identifier.
    pub transcript_id: String,
    /// Consequence terms predicted on this transcript.
    pub consequences: Vec<String>,
    /// Whether the transcript is protein coding.
    pub is_coding: bool,
    /// Whether this is the canonical transcript of the gene.
    pub canonical: bool,
}

/// Frozen annotation of one variant, with derived convenience fields.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    /// Transcript consequence predictions.
    pub transcripts: Vec<TranscriptConsequence>,
    /// Population slug to allele frequency.
    pub frequencies: IndexMap<String, f32>,
    /// Derived: gene ids touched by any transcript consequence.
    #[serde(default)]
    pub gene_ids: Vec<String>,
    /// Derived: subset of `gene_ids` touched by coding consequences.
    #[serde(default)]
    pub coding_gene_ids: Vec<String>,
    /// Derived: severity index of the most severe consequence overall.
    #[serde(default)]
    pub worst_consequence: Option<usize>,
    /// Derived: severity index of the most severe consequence per gene.
    #[serde(default)]
    pub worst_by_gene: IndexMap<String, usize>,
    /// Derived: distinct consequence tags present, sorted.
    #[serde(default)]
    pub consequence_tags: Vec<String>,
}

impl Eq for Annotation {}

impl Annotation {
    /// Construct from transcripts and frequencies, computing the derived
    /// fields.
    pub fn new(
        transcripts: Vec<TranscriptConsequence>,
        frequencies: IndexMap<String, f32>,
    ) -> Self {
        let mut result = Self {
            transcripts,
            frequencies,
            ..Default::default()
        };
        result.derive();
        result
    }

    /// Recompute the derived convenience fields.
    pub fn derive(&mut self) {
        let mut gene_ids = std::collections::BTreeSet::new();
        let mut coding_gene_ids = std::collections::BTreeSet::new();
        let mut tags = std::collections::BTreeSet::new();
        let mut worst: Option<usize> = None;
        let mut worst_by_gene: IndexMap<String, usize> = IndexMap::new();

        for transcript in &self.transcripts {
            if transcript.gene_id.is_empty() {
                continue;
            }
            gene_ids.insert(transcript.gene_id.clone());
            for term in &transcript.consequences {
                tags.insert(term.clone());
                if CODING_CONSEQUENCES.contains(&term.as_str()) {
                    coding_gene_ids.insert(transcript.gene_id.clone());
                }
                if let Some(index) = severity_index(term) {
                    worst = Some(worst.map(|w| w.min(index)).unwrap_or(index));
                    worst_by_gene
                        .entry(transcript.gene_id.clone())
                        .and_modify(|w| *w = (*w).min(index))
                        .or_insert(index);
                }
            }
        }

        self.gene_ids = gene_ids.into_iter().collect();
        self.coding_gene_ids = coding_gene_ids.into_iter().collect();
        self.consequence_tags = tags.into_iter().collect();
        self.worst_consequence = worst;
        self.worst_by_gene = worst_by_gene;
    }

    /// Frequency of the variant in the given population; `0.0` for any
    /// population absent from the record, so that downstream cutoff
    /// filters are total functions.
    pub fn freq(&self, population: &str) -> f32 {
        self.frequencies.get(population).copied().unwrap_or(0.0)
    }

    /// Gene of the primary transcript: the canonical transcript if one is
    /// marked, otherwise the first transcript.
    pub fn main_gene(&self) -> Option<&str> {
        self.transcripts
            .iter()
            .find(|t| t.canonical)
            .or_else(|| self.transcripts.first())
            .map(|t| t.gene_id.as_str())
            .filter(|g| !g.is_empty())
    }
}

/// Keyed lookup/upsert store of per-variant annotation.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AnnoDb {
    /// Annotation records by variant identity.
    #[serde(with = "indexmap::map::serde_seq")]
    records: IndexMap<VariantKey, Annotation>,
    /// Number of lookup misses, surfaced for operators.
    #[serde(skip)]
    misses: AtomicU64,
}

impl Clone for AnnoDb {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            misses: AtomicU64::new(self.misses.load(Ordering::Relaxed)),
        }
    }
}

impl AnnoDb {
    /// Look up the annotation of a variant; counts misses.
    pub fn get(&self, key: &VariantKey) -> Option<&Annotation> {
        let result = self.records.get(key);
        if result.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Insert or replace the annotation of a variant, recomputing its
    /// derived fields.
    pub fn upsert(&mut self, key: VariantKey, mut annotation: Annotation) {
        annotation.derive();
        self.records.insert(key, annotation);
    }

    /// Replace the transcript consequences of a variant, keeping any
    /// frequencies already merged in, and recompute the derived fields.
    pub fn upsert_transcripts(&mut self, key: VariantKey, transcripts: Vec<TranscriptConsequence>) {
        let record = self.records.entry(key).or_default();
        record.transcripts = transcripts;
        record.derive();
    }

    /// Merge one population frequency observation into the record of the
    /// given variant, creating an empty record if none exists yet.
    pub fn upsert_frequency(&mut self, key: VariantKey, population: &str, frequency: f32) {
        self.records
            .entry(key)
            .or_default()
            .frequencies
            .insert(population.to_string(), frequency);
    }

    /// Number of lookup misses so far.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of annotation records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::*;

    fn transcript(
        gene_id: &str,
        consequences: &[&str],
        is_coding: bool,
        canonical: bool,
    ) -> TranscriptConsequence {
        TranscriptConsequence {
            gene_id: gene_id.to_string(),
            transcript_id: format!("TX-{}", gene_id),
            consequences: consequences.iter().map(|s| s.to_string()).collect(),
            is_coding,
            canonical,
        }
    }

    #[test]
    fn severity_table_is_ordered() {
        assert_eq!(severity_index("transcript_ablation"), Some(0));
        assert!(
            severity_index("missense_variant").unwrap()
                < severity_index("synonymous_variant").unwrap()
        );
        assert_eq!(severity_index("made_up_term"), None);
    }

    #[test]
    fn derive_computes_convenience_fields() {
        let annotation = Annotation::new(
            vec![
                transcript("GENE1", &["missense_variant"], true, true),
                transcript("GENE1", &["intron_variant"], true, false),
                transcript("GENE2", &["upstream_gene_variant"], false, false),
            ],
            IndexMap::new(),
        );
        assert_eq!(annotation.gene_ids, vec!["GENE1", "GENE2"]);
        assert_eq!(annotation.coding_gene_ids, vec!["GENE1"]);
        assert_eq!(
            annotation.worst_consequence,
            severity_index("missense_variant")
        );
        assert_eq!(
            annotation.worst_by_gene.get("GENE2").copied(),
            severity_index("upstream_gene_variant")
        );
        assert_eq!(
            annotation.consequence_tags,
            vec!["intron_variant", "missense_variant", "upstream_gene_variant"]
        );
        assert_eq!(annotation.main_gene(), Some("GENE1"));
    }

    #[test]
    fn freq_is_total() {
        let mut frequencies = IndexMap::new();
        frequencies.insert("gnomad".to_string(), 0.01f32);
        let annotation = Annotation::new(vec![], frequencies);
        assert_eq!(annotation.freq("gnomad"), 0.01);
        assert_eq!(annotation.freq("topmed"), 0.0);
    }

    #[test]
    fn get_counts_misses() {
        let mut db = AnnoDb::default();
        let key = crate::seqvars::VariantKey::new("1", 100, "A", "T").unwrap();
        let other = crate::seqvars::VariantKey::new("1", 200, "A", "T").unwrap();
        db.upsert(key.clone(), Annotation::default());
        assert!(db.get(&key).is_some());
        assert!(db.get(&other).is_none());
        assert!(db.get(&other).is_none());
        assert_eq!(db.miss_count(), 2);
    }

    #[test]
    fn upsert_refreshes_in_place() {
        let mut db = AnnoDb::default();
        let key = crate::seqvars::VariantKey::new("1", 100, "A", "T").unwrap();
        db.upsert(
            key.clone(),
            Annotation::new(
                vec![transcript("GENE1", &["missense_variant"], true, true)],
                IndexMap::new(),
            ),
        );
        db.upsert(
            key.clone(),
            Annotation::new(
                vec![transcript("GENE2", &["stop_gained"], true, true)],
                IndexMap::new(),
            ),
        );
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(&key).unwrap().gene_ids, vec!["GENE2"]);
    }
}
