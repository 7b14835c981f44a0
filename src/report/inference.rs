//! Zygosity classification and inheritance inference for candidate
//! variants.

use indexmap::IndexMap;

use crate::ped::{Family, Sex};
use crate::seqvars::{Genotype, VariantKey};

/// Zygosity of one sample's call at one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    /// Both copies alternate (or a copy-number state of 0 or more than 3).
    HomozygousAlt,
    /// One copy alternate.
    Heterozygous,
    /// One copy alternate on the non-pseudoautosomal X in a male sample.
    Hemizygous,
}

/// Classify one sample's call.
///
/// A copy-number field in the extras takes part: 0 or more than 3 copies
/// count as homozygous-alt, 1 or 3 copies as a single-copy call.
pub fn classify(genotype: &Genotype, key: &VariantKey, sex: Sex) -> Option<Zygosity> {
    let copy_number = genotype
        .extras
        .get("CN")
        .and_then(|value| value.parse::<i32>().ok());

    if genotype.num_alt == Some(2) || matches!(copy_number, Some(cn) if cn == 0 || cn > 3) {
        return Some(Zygosity::HomozygousAlt);
    }
    if genotype.num_alt == Some(1) || matches!(copy_number, Some(1) | Some(3)) {
        if key.is_x_nonpar() && sex == Sex::Male {
            return Some(Zygosity::Hemizygous);
        }
        return Some(Zygosity::Heterozygous);
    }
    None
}

/// Inferred inheritance label of one variant.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum_macros::Display,
)]
pub enum InheritanceLabel {
    /// No valid mode.
    #[default]
    #[strum(serialize = "")]
    #[serde(rename = "")]
    Unknown,
    #[strum(serialize = "de novo")]
    #[serde(rename = "de novo")]
    DeNovo,
    #[strum(serialize = "autosomal dominant")]
    #[serde(rename = "autosomal dominant")]
    Dominant,
    #[strum(serialize = "autosomal recessive (homozygous)")]
    #[serde(rename = "autosomal recessive (homozygous)")]
    RecessiveHomozygous,
    #[strum(serialize = "X-linked")]
    #[serde(rename = "X-linked")]
    XLinked,
    #[strum(serialize = "autosomal recessive (compound heterozygous)")]
    #[serde(rename = "autosomal recessive (compound heterozygous)")]
    CompoundHet,
}

/// Result of inference for one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Inference {
    /// The inferred inheritance label.
    pub label: InheritanceLabel,
    /// Whether the variant qualifies as a potential compound-het member.
    pub potential_compound_het: bool,
}

fn is_hom_like(zygosity: Option<Zygosity>) -> bool {
    matches!(
        zygosity,
        Some(Zygosity::HomozygousAlt) | Some(Zygosity::Hemizygous)
    )
}

/// Infer the inheritance label of one variant from the family's pedigree
/// and the per-individual genotypes.
pub fn infer(
    family: &Family,
    key: &VariantKey,
    genotypes: &IndexMap<String, Genotype>,
) -> Inference {
    let zygosity: IndexMap<&str, Option<Zygosity>> = family
        .individuals
        .values()
        .map(|individual| {
            (
                individual.name.as_str(),
                genotypes
                    .get(&individual.name)
                    .and_then(|genotype| classify(genotype, key, individual.sex)),
            )
        })
        .collect();
    let zygosity_of = |name: &str| zygosity.get(name).copied().flatten();

    let affected: Vec<_> = family.affected().collect();
    let unaffected: Vec<_> = family.unaffected().collect();

    let any_affected_het = affected
        .iter()
        .any(|i| zygosity_of(&i.name) == Some(Zygosity::Heterozygous));
    let any_unaffected_het = unaffected
        .iter()
        .any(|i| zygosity_of(&i.name) == Some(Zygosity::Heterozygous));
    let any_unaffected_called = unaffected.iter().any(|i| {
        genotypes
            .get(&i.name)
            .map(|genotype| genotype.num_alt.is_some())
            .unwrap_or(false)
    });

    // Potential compound-het membership: an affected het with the
    // unaffected side either uncalled or carrying at least one het.
    let potential_compound_het =
        any_affected_het && (!any_unaffected_called || any_unaffected_het);

    let label = if unaffected.iter().any(|i| is_hom_like(zygosity_of(&i.name))) {
        // an unaffected homozygous-alt/hemizygous call invalidates all modes
        InheritanceLabel::Unknown
    } else if affected.iter().any(|i| is_hom_like(zygosity_of(&i.name))) {
        if key.chrom() == "X" {
            InheritanceLabel::XLinked
        } else {
            InheritanceLabel::RecessiveHomozygous
        }
    } else if any_affected_het && !any_unaffected_het {
        let inherited_from_het_parent = affected
            .iter()
            .filter(|i| zygosity_of(&i.name) == Some(Zygosity::Heterozygous))
            .any(|i| {
                family
                    .parents_of(i)
                    .iter()
                    .any(|parent| zygosity_of(&parent.name) == Some(Zygosity::Heterozygous))
            });
        if inherited_from_het_parent {
            InheritanceLabel::Dominant
        } else {
            InheritanceLabel::DeNovo
        }
    } else {
        InheritanceLabel::Unknown
    };

    Inference {
        label,
        potential_compound_het,
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ped::{tests::trio, AffectedStatus};

    fn genotype(num_alt: Option<i32>) -> Genotype {
        Genotype {
            num_alt,
            ..Default::default()
        }
    }

    fn autosomal_key() -> VariantKey {
        VariantKey::new("1", 100, "A", "T").unwrap()
    }

    fn x_key() -> VariantKey {
        // between the two pseudoautosomal regions
        VariantKey::new("X", 100_000_000, "A", "T").unwrap()
    }

    #[rstest::rstest]
    // hom-alt from num_alt
    #[case(Some(2), None, Sex::Female, false, Some(Zygosity::HomozygousAlt))]
    // hom-alt from copy number 0 and > 3
    #[case(None, Some("0"), Sex::Female, false, Some(Zygosity::HomozygousAlt))]
    #[case(None, Some("4"), Sex::Female, false, Some(Zygosity::HomozygousAlt))]
    // het elsewhere
    #[case(Some(1), None, Sex::Female, false, Some(Zygosity::Heterozygous))]
    #[case(None, Some("3"), Sex::Female, false, Some(Zygosity::Heterozygous))]
    // hemizygous on non-PAR X in a male
    #[case(Some(1), None, Sex::Male, true, Some(Zygosity::Hemizygous))]
    // female on X stays het
    #[case(Some(1), None, Sex::Female, true, Some(Zygosity::Heterozygous))]
    // hom-ref and missing are null
    #[case(Some(0), None, Sex::Female, false, None)]
    #[case(None, None, Sex::Female, false, None)]
    fn classify_zygosity(
        #[case] num_alt: Option<i32>,
        #[case] copy_number: Option<&str>,
        #[case] sex: Sex,
        #[case] on_x: bool,
        #[case] expected: Option<Zygosity>,
    ) {
        let mut gt = genotype(num_alt);
        if let Some(cn) = copy_number {
            gt.extras.insert("CN".to_string(), cn.to_string());
        }
        let key = if on_x { x_key() } else { autosomal_key() };
        assert_eq!(classify(&gt, &key, sex), expected);
    }

    fn genotypes(entries: &[(&str, Option<i32>)]) -> IndexMap<String, Genotype> {
        entries
            .iter()
            .map(|&(name, num_alt)| (name.to_string(), genotype(num_alt)))
            .collect()
    }

    #[test]
    fn no_genotypes_yields_empty_label() {
        let family = trio();
        let inference = infer(&family, &autosomal_key(), &IndexMap::new());
        assert_eq!(inference.label, InheritanceLabel::Unknown);
        assert!(!inference.potential_compound_het);
    }

    #[test]
    fn unaffected_hom_alt_invalidates() {
        let family = trio();
        let genotypes = genotypes(&[("proband", Some(2)), ("father", Some(2)), ("mother", Some(1))]);
        let inference = infer(&family, &autosomal_key(), &genotypes);
        assert_eq!(inference.label, InheritanceLabel::Unknown);
    }

    #[test]
    fn affected_hom_alt_is_recessive_homozygous() {
        let family = trio();
        let genotypes = genotypes(&[("proband", Some(2)), ("mother", Some(1))]);
        let inference = infer(&family, &autosomal_key(), &genotypes);
        assert_eq!(inference.label, InheritanceLabel::RecessiveHomozygous);
    }

    #[test]
    fn affected_hom_alt_on_x_is_x_linked() {
        let family = trio();
        let genotypes = genotypes(&[("proband", Some(2)), ("mother", Some(1))]);
        let inference = infer(&family, &x_key(), &genotypes);
        assert_eq!(inference.label, InheritanceLabel::XLinked);
    }

    #[test]
    fn het_with_affected_het_mother_is_dominant_and_flagged() {
        let mut family = trio();
        family.individuals.get_mut("mother").unwrap().affected = AffectedStatus::Affected;
        let genotypes = genotypes(&[("proband", Some(1)), ("mother", Some(1))]);
        let inference = infer(&family, &autosomal_key(), &genotypes);
        assert_eq!(inference.label, InheritanceLabel::Dominant);
        assert!(inference.potential_compound_het);
    }

    #[test]
    fn het_with_non_carrier_parents_is_de_novo() {
        let family = trio();
        let genotypes = genotypes(&[
            ("proband", Some(1)),
            ("father", Some(0)),
            ("mother", Some(0)),
        ]);
        let inference = infer(&family, &autosomal_key(), &genotypes);
        assert_eq!(inference.label, InheritanceLabel::DeNovo);
        // both parents called hom-ref: cannot be a compound-het member
        assert!(!inference.potential_compound_het);
    }

    #[test]
    fn het_with_unaffected_carrier_parent_is_flagged() {
        let family = trio();
        let genotypes = genotypes(&[
            ("proband", Some(1)),
            ("father", Some(0)),
            ("mother", Some(1)),
        ]);
        let inference = infer(&family, &autosomal_key(), &genotypes);
        // an unaffected het carrier blocks both de novo and dominant
        assert_eq!(inference.label, InheritanceLabel::Unknown);
        assert!(inference.potential_compound_het);
    }

    #[test]
    fn labels_render_as_expected() {
        assert_eq!(InheritanceLabel::Unknown.to_string(), "");
        assert_eq!(InheritanceLabel::DeNovo.to_string(), "de novo");
        assert_eq!(
            InheritanceLabel::CompoundHet.to_string(),
            "autosomal recessive (compound heterozygous)"
        );
    }
}
