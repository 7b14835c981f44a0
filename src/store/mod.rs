//! Per-family indexed variant collections.
//!
//! Each family owns one `FamilyStore`: an arena of variant documents keyed
//! by variant identity, with explicit secondary index structures maintained
//! alongside. Queries plan against the most selective index, then re-check
//! candidates exactly against the full annotation data.

pub mod writer;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::annos::{AnnoDb, Annotation};
use crate::ped::{Family, LoadStatus};
use crate::query::filters::{self, CaseQuery, VariantFilter};
use crate::seqvars::{Genotype, VariantKey};

/// Hard cap on the number of documents one query may return.
pub const MAX_RESULTS: usize = 6_000;

/// Error type for store queries.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The query matched more documents than the cap allows. This is fatal
    /// and user-actionable: the query must be narrowed, results are never
    /// silently truncated.
    #[error("Query matched more than {max} documents; narrow the query")]
    ResultCapExceeded { max: usize },
}

/// One family's view of one variant: the family's genotypes plus
/// denormalized, index-friendly copies of annotation fields.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FamilyVariantDocument {
    /// Owning family.
    pub family: String,
    /// Variant identity.
    pub key: VariantKey,
    /// This family's genotypes only, by sample name.
    pub genotypes: IndexMap<String, Genotype>,
    /// Denormalized frequency by population.
    pub frequencies: IndexMap<String, f32>,
    /// Denormalized consequence tag set.
    pub consequence_tags: Vec<String>,
    /// Denormalized gene id set.
    pub gene_ids: Vec<String>,
}

impl FamilyVariantDocument {
    /// Construct a document, denormalizing the given annotation.
    pub fn new(
        family: &str,
        key: VariantKey,
        genotypes: IndexMap<String, Genotype>,
        annotation: Option<&Annotation>,
    ) -> Self {
        Self {
            family: family.to_string(),
            key,
            genotypes,
            frequencies: annotation
                .map(|a| a.frequencies.clone())
                .unwrap_or_default(),
            consequence_tags: annotation
                .map(|a| a.consequence_tags.clone())
                .unwrap_or_default(),
            gene_ids: annotation.map(|a| a.gene_ids.clone()).unwrap_or_default(),
        }
    }
}

/// Sort key preserving the order of non-negative `f32` frequencies.
fn freq_sort_key(frequency: f32) -> u32 {
    frequency.max(0.0).to_bits()
}

/// Upper range bound for an index keyed by strings: the successor of the
/// given string, paired with the smallest variant key.
fn string_successor(s: &str) -> String {
    format!("{}\0", s)
}

/// Index scan plan chosen for one query.
#[derive(Debug, Clone, PartialEq)]
enum Plan {
    /// Scan the gene id index for each required gene.
    ByGene(Vec<String>),
    /// Scan the consequence tag index for each required tag.
    ByTag(Vec<String>),
    /// Scan one population's frequency index up to the ceiling.
    ByFreq(String, f32),
    /// Scan the primary position index.
    Primary,
}

/// An indexed, per-family collection of variant documents.
#[derive(Debug, Clone, Default)]
pub struct FamilyStore {
    /// Owning family.
    pub family: String,
    /// Load status; query results are not guaranteed complete while
    /// `Loading`.
    pub status: LoadStatus,
    /// Arena of documents; key order is position order.
    docs: BTreeMap<VariantKey, FamilyVariantDocument>,
    /// Secondary index on (gene id, position).
    by_gene: BTreeSet<(String, VariantKey)>,
    /// Secondary index on (consequence tag, position).
    by_tag: BTreeSet<(String, VariantKey)>,
    /// Secondary indexes on (frequency, position), one per population.
    by_freq: IndexMap<String, BTreeSet<(u32, VariantKey)>>,
}

impl FamilyStore {
    pub fn new(family: &str) -> Self {
        Self {
            family: family.to_string(),
            status: LoadStatus::Loading,
            ..Default::default()
        }
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Look up one document by variant identity.
    pub fn get(&self, key: &VariantKey) -> Option<&FamilyVariantDocument> {
        self.docs.get(key)
    }

    /// Iterate over all documents in position order.
    pub fn documents(&self) -> impl Iterator<Item = &FamilyVariantDocument> {
        self.docs.values()
    }

    /// Insert or replace one document, maintaining all indexes.
    ///
    /// Every population seen by the store indexes every document; documents
    /// without a recorded frequency are indexed at `0.0` so that ceiling
    /// scans are supersets of the exact matches.
    pub fn insert(&mut self, doc: FamilyVariantDocument) {
        if let Some(old) = self.docs.remove(&doc.key) {
            self.unindex(&old);
        }
        for population in doc.frequencies.keys() {
            self.ensure_population(population);
        }
        for (population, index) in self.by_freq.iter_mut() {
            let frequency = doc.frequencies.get(population).copied().unwrap_or(0.0);
            index.insert((freq_sort_key(frequency), doc.key.clone()));
        }
        for gene in &doc.gene_ids {
            self.by_gene.insert((gene.clone(), doc.key.clone()));
        }
        for tag in &doc.consequence_tags {
            self.by_tag.insert((tag.clone(), doc.key.clone()));
        }
        self.docs.insert(doc.key.clone(), doc);
    }

    /// Remove a document's entries from all secondary indexes.
    fn unindex(&mut self, doc: &FamilyVariantDocument) {
        for (population, index) in self.by_freq.iter_mut() {
            let frequency = doc.frequencies.get(population).copied().unwrap_or(0.0);
            index.remove(&(freq_sort_key(frequency), doc.key.clone()));
        }
        for gene in &doc.gene_ids {
            self.by_gene.remove(&(gene.clone(), doc.key.clone()));
        }
        for tag in &doc.consequence_tags {
            self.by_tag.remove(&(tag.clone(), doc.key.clone()));
        }
    }

    /// Create the frequency index for a population, backfilling all
    /// existing documents at their recorded (or zero) frequency.
    fn ensure_population(&mut self, population: &str) {
        if self.by_freq.contains_key(population) {
            return;
        }
        let mut index = BTreeSet::new();
        for (key, doc) in self.docs.iter() {
            let frequency = doc.frequencies.get(population).copied().unwrap_or(0.0);
            index.insert((freq_sort_key(frequency), key.clone()));
        }
        self.by_freq.insert(population.to_string(), index);
    }

    /// Choose the most selective index for the given variant filter.
    fn plan(&self, filter: &VariantFilter) -> Plan {
        if !filter.required_genes.is_empty() {
            return Plan::ByGene(filter.required_genes.clone());
        }
        if !filter.required_tags.is_empty() {
            return Plan::ByTag(filter.required_tags.clone());
        }
        let cheapest = filter
            .population_cutoffs
            .iter()
            .filter(|cutoff| self.by_freq.contains_key(&cutoff.population))
            .min_by(|a, b| {
                a.max_frequency
                    .partial_cmp(&b.max_frequency)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        if let Some(cutoff) = cheapest {
            return Plan::ByFreq(cutoff.population.clone(), cutoff.max_frequency);
        }
        Plan::Primary
    }

    /// Candidate variant keys for the given plan, in position order.
    fn candidates(&self, plan: &Plan) -> Vec<VariantKey> {
        match plan {
            Plan::ByGene(genes) => self.string_index_candidates(&self.by_gene, genes),
            Plan::ByTag(tags) => self.string_index_candidates(&self.by_tag, tags),
            Plan::ByFreq(population, max_frequency) => {
                let index = &self.by_freq[population.as_str()];
                let upper = (freq_sort_key(*max_frequency) + 1, VariantKey::smallest());
                let mut keys: Vec<VariantKey> =
                    index.range(..upper).map(|(_, key)| key.clone()).collect();
                // frequency index order is not position order
                keys.sort();
                keys.dedup();
                keys
            }
            Plan::Primary => self.docs.keys().cloned().collect(),
        }
    }

    /// Union of the per-value ranges of a string-keyed compound index,
    /// re-sorted by position in application memory: the store cannot
    /// guarantee position order across more than one index range.
    fn string_index_candidates(
        &self,
        index: &BTreeSet<(String, VariantKey)>,
        values: &[String],
    ) -> Vec<VariantKey> {
        let mut keys = Vec::new();
        for value in values {
            let lower = (value.clone(), VariantKey::smallest());
            let upper = (string_successor(value), VariantKey::smallest());
            keys.extend(index.range(lower..upper).map(|(_, key)| key.clone()));
        }
        keys.sort();
        keys.dedup();
        keys
    }

    /// Run one query: indexed candidate scan in position order, exact
    /// re-check against genotypes and full annotation, hard result cap.
    pub fn query(
        &self,
        query: &CaseQuery,
        annotations: &AnnoDb,
    ) -> Result<Vec<&FamilyVariantDocument>, Error> {
        if self.status == LoadStatus::Loading {
            tracing::warn!(
                "family {} is still loading; query results may be incomplete",
                self.family
            );
        }

        let plan = self.plan(&query.variant);
        tracing::debug!("query plan for family {}: {:?}", self.family, plan);

        let mut result = Vec::new();
        for key in self.candidates(&plan) {
            let doc = &self.docs[&key];
            if !filters::passes_genotype(query, &doc.genotypes) {
                continue;
            }
            // The index-level match is a superset; re-check against the
            // full annotation record.
            if !filters::passes_variant(&query.variant, annotations.get(&key)) {
                continue;
            }
            result.push(doc);
            if result.len() > MAX_RESULTS {
                return Err(Error::ResultCapExceeded { max: MAX_RESULTS });
            }
        }
        Ok(result)
    }
}

/// Serializable bundle of families, annotation, and variant documents, as
/// written by `ingest` and read by `query`/`report`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CaseStore {
    /// Version of the writing worker.
    pub version: String,
    /// Families by name.
    pub families: IndexMap<String, Family>,
    /// Shared annotation database.
    pub annotations: AnnoDb,
    /// All family variant documents.
    pub documents: Vec<FamilyVariantDocument>,
}

impl CaseStore {
    /// Rebuild the indexed store of one family from the flat documents.
    pub fn family_store(&self, family: &str) -> Option<FamilyStore> {
        let family_record = self.families.get(family)?;
        let mut store = FamilyStore::new(family);
        for doc in self.documents.iter().filter(|doc| doc.family == family) {
            store.insert(doc.clone());
        }
        store.status = family_record.status;
        Some(store)
    }

    /// Write the store as JSON.
    pub fn save(&self, path: &str) -> Result<(), anyhow::Error> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read a store back from JSON.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
