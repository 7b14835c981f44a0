//! Genotype and variant filter contract for family store queries.

use indexmap::IndexMap;

use crate::annos::Annotation;
use crate::seqvars::Genotype;

/// Coarse call category one sample's genotype is matched against.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GenotypeChoice {
    /// Homozygous reference.
    #[default]
    Ref,
    /// Heterozygous.
    Het,
    /// Homozygous alternate.
    Hom,
    /// At least one alternate allele.
    HasAlt,
    /// At least one reference allele.
    HasRef,
    /// Missing call.
    Missing,
    /// Any non-missing call.
    NotMissing,
}

impl GenotypeChoice {
    /// Whether the given genotype matches this category.
    pub fn matches(&self, genotype: &Genotype) -> bool {
        match (self, genotype.num_alt) {
            (GenotypeChoice::Ref, Some(num_alt)) => num_alt == 0,
            (GenotypeChoice::Het, Some(num_alt)) => num_alt == 1,
            (GenotypeChoice::Hom, Some(num_alt)) => num_alt == 2,
            (GenotypeChoice::HasAlt, Some(num_alt)) => num_alt > 0,
            (GenotypeChoice::HasRef, Some(num_alt)) => num_alt < 2,
            (GenotypeChoice::Missing, None) => true,
            (GenotypeChoice::NotMissing, Some(_)) => true,
            (GenotypeChoice::Missing, Some(_)) => false,
            (_, None) => false,
        }
    }
}

/// Per-population frequency ceiling.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PopulationCutoff {
    /// Population slug.
    pub population: String,
    /// Maximum allowed frequency (inclusive).
    pub max_frequency: f32,
}

/// Annotation-level constraints of a query.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantFilter {
    /// Consequence tags the variant must carry at least one of.
    #[serde(default)]
    pub required_tags: Vec<String>,
    /// Gene ids the variant must touch at least one of.
    #[serde(default)]
    pub required_genes: Vec<String>,
    /// Gene ids the variant must not touch.
    #[serde(default)]
    pub forbidden_genes: Vec<String>,
    /// Per-population frequency ceilings.
    #[serde(default)]
    pub population_cutoffs: Vec<PopulationCutoff>,
}

/// One query against a family's variant store.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseQuery {
    /// Required call category per individual.
    #[serde(default)]
    pub genotype: IndexMap<String, GenotypeChoice>,
    /// Annotation-level constraints.
    #[serde(default)]
    pub variant: VariantFilter,
}

/// Whether all per-individual genotype constraints hold for the given
/// genotypes. Individuals without a call in the document count as missing.
pub fn passes_genotype(query: &CaseQuery, genotypes: &IndexMap<String, Genotype>) -> bool {
    for (sample, choice) in query.genotype.iter() {
        let matched = match genotypes.get(sample) {
            Some(genotype) => choice.matches(genotype),
            None => *choice == GenotypeChoice::Missing,
        };
        if !matched {
            tracing::trace!("genotype filter fails on sample {}", sample);
            return false;
        }
    }
    true
}

/// Exact re-check of the variant filter against the full (non-denormalized)
/// annotation record.
///
/// A variant without annotation passes only if the filter requires no tags
/// or genes (frequency ceilings are total: absent frequency counts as 0.0).
pub fn passes_variant(filter: &VariantFilter, annotation: Option<&Annotation>) -> bool {
    let empty = Annotation::default();
    let annotation = annotation.unwrap_or(&empty);

    if !filter.required_tags.is_empty()
        && !filter
            .required_tags
            .iter()
            .any(|tag| annotation.consequence_tags.contains(tag))
    {
        return false;
    }
    if !filter.required_genes.is_empty()
        && !filter
            .required_genes
            .iter()
            .any(|gene| annotation.gene_ids.contains(gene))
    {
        return false;
    }
    if filter
        .forbidden_genes
        .iter()
        .any(|gene| annotation.gene_ids.contains(gene))
    {
        return false;
    }
    for cutoff in &filter.population_cutoffs {
        if annotation.freq(&cutoff.population) > cutoff.max_frequency {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::annos::TranscriptConsequence;

    fn genotype(num_alt: Option<i32>) -> Genotype {
        Genotype {
            sample: "s1".to_string(),
            num_alt,
            ..Default::default()
        }
    }

    #[rstest::rstest]
    // num_alt = 0
    #[case(GenotypeChoice::Ref, Some(0), true)]
    #[case(GenotypeChoice::Het, Some(0), false)]
    #[case(GenotypeChoice::HasAlt, Some(0), false)]
    #[case(GenotypeChoice::HasRef, Some(0), true)]
    #[case(GenotypeChoice::NotMissing, Some(0), true)]
    // num_alt = 1
    #[case(GenotypeChoice::Het, Some(1), true)]
    #[case(GenotypeChoice::Hom, Some(1), false)]
    #[case(GenotypeChoice::HasAlt, Some(1), true)]
    #[case(GenotypeChoice::HasRef, Some(1), true)]
    // num_alt = 2
    #[case(GenotypeChoice::Hom, Some(2), true)]
    #[case(GenotypeChoice::HasAlt, Some(2), true)]
    #[case(GenotypeChoice::HasRef, Some(2), false)]
    // missing call
    #[case(GenotypeChoice::Missing, None, true)]
    #[case(GenotypeChoice::NotMissing, None, false)]
    #[case(GenotypeChoice::Ref, None, false)]
    #[case(GenotypeChoice::HasAlt, None, false)]
    fn genotype_choice_matches(
        #[case] choice: GenotypeChoice,
        #[case] num_alt: Option<i32>,
        #[case] expected: bool,
    ) {
        assert_eq!(choice.matches(&genotype(num_alt)), expected);
    }

    #[test]
    fn passes_genotype_treats_absent_sample_as_missing() {
        let mut query = CaseQuery::default();
        query
            .genotype
            .insert("absent".to_string(), GenotypeChoice::Missing);
        assert!(passes_genotype(&query, &IndexMap::new()));

        query
            .genotype
            .insert("absent".to_string(), GenotypeChoice::Ref);
        assert!(!passes_genotype(&query, &IndexMap::new()));
    }

    fn annotation() -> Annotation {
        let mut frequencies = IndexMap::new();
        frequencies.insert("gnomad".to_string(), 0.01f32);
        Annotation::new(
            vec![TranscriptConsequence {
                gene_id: "GENE1".to_string(),
                transcript_id: "TX1".to_string(),
                consequences: vec!["missense_variant".to_string()],
                is_coding: true,
                canonical: true,
            }],
            frequencies,
        )
    }

    #[test]
    fn passes_variant_required_tags() {
        let filter = VariantFilter {
            required_tags: vec!["missense_variant".to_string()],
            ..Default::default()
        };
        assert!(passes_variant(&filter, Some(&annotation())));
        let filter = VariantFilter {
            required_tags: vec!["stop_gained".to_string()],
            ..Default::default()
        };
        assert!(!passes_variant(&filter, Some(&annotation())));
    }

    #[test]
    fn passes_variant_gene_constraints() {
        let filter = VariantFilter {
            required_genes: vec!["GENE1".to_string()],
            ..Default::default()
        };
        assert!(passes_variant(&filter, Some(&annotation())));
        let filter = VariantFilter {
            forbidden_genes: vec!["GENE1".to_string()],
            ..Default::default()
        };
        assert!(!passes_variant(&filter, Some(&annotation())));
    }

    #[rstest::rstest]
    // ceiling above the record value: pass
    #[case(0.02, true)]
    // ceiling below: fail
    #[case(0.001, false)]
    fn passes_variant_frequency_ceiling(#[case] max_frequency: f32, #[case] expected: bool) {
        let filter = VariantFilter {
            population_cutoffs: vec![PopulationCutoff {
                population: "gnomad".to_string(),
                max_frequency,
            }],
            ..Default::default()
        };
        assert_eq!(passes_variant(&filter, Some(&annotation())), expected);
    }

    #[test]
    fn passes_variant_missing_annotation() {
        // frequency ceilings are total: no annotation counts as 0.0
        let filter = VariantFilter {
            population_cutoffs: vec![PopulationCutoff {
                population: "gnomad".to_string(),
                max_frequency: 0.0,
            }],
            ..Default::default()
        };
        assert!(passes_variant(&filter, None));
        // but required tags cannot be satisfied without annotation
        let filter = VariantFilter {
            required_tags: vec!["missense_variant".to_string()],
            ..Default::default()
        };
        assert!(!passes_variant(&filter, None));
    }
}
