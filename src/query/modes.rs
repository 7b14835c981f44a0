//! Inheritance mode filter building.
//!
//! Pure, stateless mapping from a family's pedigree to per-individual
//! genotype categories, one map per named inheritance mode, plus the
//! feasibility predicates used to decide whether a mode is worth
//! evaluating for a family at all.

use indexmap::IndexMap;

use crate::ped::{AffectedStatus, Family};
use crate::query::filters::GenotypeChoice;

/// Named inheritance modes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum InheritanceMode {
    HomozygousRecessive,
    DeNovo,
    Dominant,
    XLinkedRecessive,
    CompoundHet,
}

/// Build the genotype-category map for one inheritance mode over the
/// given pedigree.
pub fn genotype_filter(
    family: &Family,
    mode: InheritanceMode,
) -> IndexMap<String, GenotypeChoice> {
    let mut result = IndexMap::new();
    match mode {
        InheritanceMode::HomozygousRecessive => {
            for affected in family.affected() {
                result.insert(affected.name.clone(), GenotypeChoice::Hom);
                for parent in family.parents_of(affected) {
                    if parent.affected == AffectedStatus::Unaffected {
                        result.insert(parent.name.clone(), GenotypeChoice::HasRef);
                    }
                }
            }
        }
        InheritanceMode::DeNovo | InheritanceMode::Dominant => {
            for individual in family.individuals.values() {
                match individual.affected {
                    AffectedStatus::Affected => {
                        result.insert(individual.name.clone(), GenotypeChoice::HasAlt);
                    }
                    AffectedStatus::Unaffected => {
                        result.insert(individual.name.clone(), GenotypeChoice::Ref);
                    }
                    AffectedStatus::Unknown => {}
                }
            }
        }
        InheritanceMode::XLinkedRecessive => {
            for affected in family.affected() {
                result.insert(affected.name.clone(), GenotypeChoice::Hom);
                for parent in family.parents_of(affected) {
                    if parent.affected != AffectedStatus::Unaffected {
                        continue;
                    }
                    if Some(&parent.name) == affected.mother.as_ref() {
                        // carrier mother
                        result.insert(parent.name.clone(), GenotypeChoice::Het);
                    } else {
                        // hemizygous absence in the father
                        result.insert(parent.name.clone(), GenotypeChoice::Ref);
                    }
                }
            }
        }
        InheritanceMode::CompoundHet => {
            for affected in family.affected() {
                result.insert(affected.name.clone(), GenotypeChoice::Het);
                for parent in family.parents_of(affected) {
                    if parent.affected == AffectedStatus::Unaffected {
                        result.insert(parent.name.clone(), GenotypeChoice::HasRef);
                    }
                }
            }
        }
    }
    result
}

/// Whether the family has at least one affected individual with both
/// parents present in the pedigree and both unaffected.
fn has_de_novo_shape(family: &Family) -> bool {
    family.affected().any(|affected| {
        let parents = family.parents_of(affected);
        parents.len() == 2
            && parents
                .iter()
                .all(|parent| parent.affected == AffectedStatus::Unaffected)
    })
}

/// Whether the given mode is worth evaluating for the family.
pub fn is_feasible(family: &Family, mode: InheritanceMode) -> bool {
    let n = family.individuals.len();
    let all_affected = family
        .individuals
        .values()
        .all(|i| i.affected == AffectedStatus::Affected);
    match mode {
        InheritanceMode::DeNovo => has_de_novo_shape(family),
        InheritanceMode::Dominant => n >= 2 && !has_de_novo_shape(family),
        InheritanceMode::HomozygousRecessive
        | InheritanceMode::XLinkedRecessive
        | InheritanceMode::CompoundHet => n > 1 && !all_affected,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ped::{tests::trio, Individual, Sex};

    #[test]
    fn homozygous_recessive_filter() {
        let family = trio();
        let filter = genotype_filter(&family, InheritanceMode::HomozygousRecessive);
        assert_eq!(filter["proband"], GenotypeChoice::Hom);
        assert_eq!(filter["father"], GenotypeChoice::HasRef);
        assert_eq!(filter["mother"], GenotypeChoice::HasRef);
    }

    #[rstest::rstest]
    #[case(InheritanceMode::DeNovo)]
    #[case(InheritanceMode::Dominant)]
    fn de_novo_and_dominant_filter(#[case] mode: InheritanceMode) {
        let family = trio();
        let filter = genotype_filter(&family, mode);
        assert_eq!(filter["proband"], GenotypeChoice::HasAlt);
        assert_eq!(filter["father"], GenotypeChoice::Ref);
        assert_eq!(filter["mother"], GenotypeChoice::Ref);
    }

    #[test]
    fn x_linked_recessive_filter() {
        let family = trio();
        let filter = genotype_filter(&family, InheritanceMode::XLinkedRecessive);
        assert_eq!(filter["proband"], GenotypeChoice::Hom);
        assert_eq!(filter["mother"], GenotypeChoice::Het);
        assert_eq!(filter["father"], GenotypeChoice::Ref);
    }

    #[test]
    fn compound_het_filter() {
        let family = trio();
        let filter = genotype_filter(&family, InheritanceMode::CompoundHet);
        assert_eq!(filter["proband"], GenotypeChoice::Het);
        assert_eq!(filter["father"], GenotypeChoice::HasRef);
        assert_eq!(filter["mother"], GenotypeChoice::HasRef);
    }

    fn singleton_affected() -> Family {
        let mut family = Family {
            name: "FAM2".to_string(),
            ..Default::default()
        };
        family.individuals.insert(
            "only".to_string(),
            Individual {
                name: "only".to_string(),
                sex: Sex::Female,
                affected: AffectedStatus::Affected,
                ..Default::default()
            },
        );
        family
    }

    #[test]
    fn feasibility_trio() {
        let family = trio();
        assert!(is_feasible(&family, InheritanceMode::DeNovo));
        // the trio already satisfies the de-novo shape
        assert!(!is_feasible(&family, InheritanceMode::Dominant));
        assert!(is_feasible(&family, InheritanceMode::HomozygousRecessive));
        assert!(is_feasible(&family, InheritanceMode::XLinkedRecessive));
        assert!(is_feasible(&family, InheritanceMode::CompoundHet));
    }

    #[test]
    fn feasibility_singleton() {
        let family = singleton_affected();
        assert!(!is_feasible(&family, InheritanceMode::DeNovo));
        assert!(!is_feasible(&family, InheritanceMode::Dominant));
        assert!(!is_feasible(&family, InheritanceMode::HomozygousRecessive));
        assert!(!is_feasible(&family, InheritanceMode::CompoundHet));
    }

    #[test]
    fn feasibility_all_affected_pair() {
        let mut family = singleton_affected();
        family.individuals.insert(
            "sibling".to_string(),
            Individual {
                name: "sibling".to_string(),
                affected: AffectedStatus::Affected,
                ..Default::default()
            },
        );
        // recessive modes need at least one individual who is not affected
        assert!(!is_feasible(&family, InheritanceMode::HomozygousRecessive));
        assert!(!is_feasible(&family, InheritanceMode::XLinkedRecessive));
        // dominant only needs two individuals without the de-novo shape
        assert!(is_feasible(&family, InheritanceMode::Dominant));
    }
}
