//! Report assembly over a family's candidate variants.
//!
//! Groups candidates into multi-nucleotide events, pools potential
//! compound hets per gene, and resolves a representative gene for each
//! pooled group.

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::annos::AnnoDb;
use crate::ped::Family;
use crate::report::inference::{infer, InheritanceLabel};
use crate::seqvars::{Genotype, VariantKey};

/// One candidate variant going into a report, with its discovery tags
/// and the family's genotypes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateVariant {
    /// Variant identity.
    pub key: VariantKey,
    /// Discovery tag identifiers attached to the variant.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Genotypes by sample name.
    #[serde(default)]
    pub genotypes: IndexMap<String, Genotype>,
}

/// One row of the assembled report.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportVariant {
    /// Variant identity.
    pub key: VariantKey,
    /// Human-readable variant name.
    pub name: String,
    /// Rendered inheritance label; empty when no valid mode was found.
    pub inheritance: String,
    /// Whether the variant qualifies as a potential compound-het member.
    pub potential_compound_het: bool,
    /// Representative gene, if one could be resolved unambiguously.
    pub gene_id: Option<String>,
    /// For the representative of a multi-nucleotide event, the names of
    /// the absorbed fragments.
    pub mnv_note: Option<String>,
    /// Whether the variant was absorbed into a multi-nucleotide event.
    pub mnv_fragment: bool,
}

fn gene_ids_of<'a>(annotations: &'a AnnoDb, key: &VariantKey) -> &'a [String] {
    annotations
        .get(key)
        .map(|a| a.gene_ids.as_slice())
        .unwrap_or(&[])
}

/// Assemble the report rows for one family.
pub fn build_report(
    family: &Family,
    candidates: &[CandidateVariant],
    annotations: &AnnoDb,
) -> Vec<ReportVariant> {
    let mut report: Vec<ReportVariant> = Vec::with_capacity(candidates.len());
    let mut flagged: Vec<bool> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let inference = infer(family, &candidate.key, &candidate.genotypes);
        flagged.push(inference.potential_compound_het);
        report.push(ReportVariant {
            key: candidate.key.clone(),
            name: candidate.key.to_string(),
            inheritance: inference.label.to_string(),
            potential_compound_het: inference.potential_compound_het,
            gene_id: annotations
                .get(&candidate.key)
                .and_then(|a| a.main_gene())
                .map(|g| g.to_string()),
            mnv_note: None,
            mnv_fragment: false,
        });
    }

    // Multi-nucleotide events: a tag shared by more than two candidates
    // marks its fragments. The representative is the fragment without
    // population frequency annotation (the combined allele), falling
    // back to the first fragment.
    let mut by_tag: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        for tag in &candidate.tags {
            by_tag.entry(tag.as_str()).or_default().push(index);
        }
    }
    let mut mnv_representative: Vec<bool> = vec![false; candidates.len()];
    for members in by_tag.values().filter(|members| members.len() > 2) {
        let representative = members
            .iter()
            .copied()
            .find(|&index| {
                annotations
                    .get(&candidates[index].key)
                    .map(|a| a.frequencies.is_empty())
                    .unwrap_or(true)
            })
            .unwrap_or(members[0]);
        mnv_representative[representative] = true;
        let note = members
            .iter()
            .copied()
            .filter(|&index| index != representative)
            .map(|index| report[index].name.as_str())
            .join(", ");
        report[representative].mnv_note = Some(note);
        for &index in members {
            if index != representative {
                report[index].mnv_fragment = true;
            }
        }
    }

    // Compound-het pooling: per gene, collect the flagged candidates
    // that were not absorbed into a multi-nucleotide event.
    let mut pools: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        if !flagged[index] || report[index].mnv_fragment || mnv_representative[index] {
            continue;
        }
        for gene in gene_ids_of(annotations, &candidate.key) {
            pools.entry(gene.as_str()).or_default().push(index);
        }
    }
    let mut pooled: Vec<bool> = vec![false; candidates.len()];
    for (pool_gene, members) in &pools {
        if members.len() < 2 {
            continue;
        }
        let resolved = resolve_gene(pool_gene, members, candidates, annotations);
        for &index in members {
            report[index].inheritance = InheritanceLabel::CompoundHet.to_string();
            // first pool to resolve a member also decides its gene
            if !pooled[index] {
                report[index].gene_id = resolved.clone();
                pooled[index] = true;
            }
        }
    }

    report
}

/// Resolve the representative gene of one compound-het pool.
///
/// When every member's primary transcript names the same gene, that gene
/// wins. Otherwise a main gene of any member is acceptable only if every
/// member independently overlaps it; failing that the pool gene itself is
/// used when all members overlap it, and the assignment stays ambiguous
/// otherwise.
fn resolve_gene(
    pool_gene: &str,
    members: &[usize],
    candidates: &[CandidateVariant],
    annotations: &AnnoDb,
) -> Option<String> {
    let mains: IndexSet<&str> = members
        .iter()
        .filter_map(|&index| annotations.get(&candidates[index].key))
        .filter_map(|a| a.main_gene())
        .collect();
    if mains.len() == 1 {
        let main = *mains.first().expect("non-empty");
        let all_overlap_main = members.iter().all(|&index| {
            gene_ids_of(annotations, &candidates[index].key)
                .iter()
                .any(|g| g == main)
        });
        if all_overlap_main {
            return Some(main.to_string());
        }
    }
    let all_overlap_pool = members.iter().all(|&index| {
        gene_ids_of(annotations, &candidates[index].key)
            .iter()
            .any(|g| g == pool_gene)
    });
    all_overlap_pool.then(|| pool_gene.to_string())
}
