//! Pedigree representation and PLINK PED file reading.

use std::io::BufRead;

use indexmap::IndexMap;

/// Biological sex of an individual.
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
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Affected status of an individual.
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
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AffectedStatus {
    Affected,
    Unaffected,
    #[default]
    Unknown,
}

/// One individual in a family.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Individual {
    /// Sample name, unique within the family.
    pub name: String,
    /// Name of the father, if known.
    pub father: Option<String>,
    /// Name of the mother, if known.
    pub mother: Option<String>,
    /// Biological sex.
    pub sex: Sex,
    /// Affected status.
    pub affected: AffectedStatus,
}

/// Load status of a family's variant collection.
///
/// While a family is `Loading`, query results over its store are not
/// guaranteed to be complete.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Loading,
    Loaded,
}

/// One family, an ordered set of individuals.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Family {
    /// Family name.
    pub name: String,
    /// Individuals by sample name.
    pub individuals: IndexMap<String, Individual>,
    /// Load status of the family's variant collection.
    pub status: LoadStatus,
}

impl Family {
    /// Iterate over the affected individuals.
    pub fn affected(&self) -> impl Iterator<Item = &Individual> {
        self.individuals
            .values()
            .filter(|i| i.affected == AffectedStatus::Affected)
    }

    /// Iterate over the unaffected individuals.
    pub fn unaffected(&self) -> impl Iterator<Item = &Individual> {
        self.individuals
            .values()
            .filter(|i| i.affected == AffectedStatus::Unaffected)
    }

    /// Return the parents of the given individual that are present in the
    /// pedigree themselves.
    pub fn parents_of<'a>(&'a self, individual: &Individual) -> Vec<&'a Individual> {
        [&individual.father, &individual.mother]
            .into_iter()
            .flatten()
            .filter_map(|name| self.individuals.get(name))
            .collect()
    }

    /// Sample names of the family's individuals.
    pub fn sample_names(&self) -> Vec<String> {
        self.individuals.keys().cloned().collect()
    }
}

/// Supporting code for PED file reading.
pub(crate) mod ped_file {
    /// Error type for `read_ped()`.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("Problem reading PED file: {0}")]
        Io(#[from] std::io::Error),
        #[error("Problem parsing PED row: {0}")]
        Csv(#[from] csv::Error),
        #[error("PED row has {0} columns, expected 6")]
        ColumnCount(usize),
        #[error("Duplicate individual {individual} in family {family}")]
        DuplicateIndividual { family: String, individual: String },
    }
}

fn parse_sex(token: &str) -> Sex {
    match token {
        "1" => Sex::Male,
        "2" => Sex::Female,
        _ => Sex::Unknown,
    }
}

fn parse_affected(token: &str) -> AffectedStatus {
    match token {
        "2" => AffectedStatus::Affected,
        "1" => AffectedStatus::Unaffected,
        _ => AffectedStatus::Unknown,
    }
}

/// Read families from a 6-column PED file (family, individual, father,
/// mother, sex, affected status; `"0"` encodes an unknown parent).
pub fn read_ped<R: BufRead>(reader: R) -> Result<IndexMap<String, Family>, ped_file::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut families: IndexMap<String, Family> = IndexMap::new();
    for result in csv_reader.records() {
        let record = result?;
        if record.len() != 6 {
            return Err(ped_file::Error::ColumnCount(record.len()));
        }
        let family_name = record[0].to_string();
        let name = record[1].to_string();
        let individual = Individual {
            name: name.clone(),
            father: (&record[2] != "0").then(|| record[2].to_string()),
            mother: (&record[3] != "0").then(|| record[3].to_string()),
            sex: parse_sex(&record[4]),
            affected: parse_affected(&record[5]),
        };
        let family = families.entry(family_name.clone()).or_insert_with(|| Family {
            name: family_name.clone(),
            ..Default::default()
        });
        if family.individuals.insert(name.clone(), individual).is_some() {
            return Err(ped_file::Error::DuplicateIndividual {
                family: family_name,
                individual: name,
            });
        }
    }
    Ok(families)
}

#[cfg(test)]
pub mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Trio fixture shared across test modules.
    pub fn trio() -> Family {
        let mut individuals = IndexMap::new();
        individuals.insert(
            "proband".to_string(),
            Individual {
                name: "proband".to_string(),
                father: Some("father".to_string()),
                mother: Some("mother".to_string()),
                sex: Sex::Male,
                affected: AffectedStatus::Affected,
            },
        );
        individuals.insert(
            "father".to_string(),
            Individual {
                name: "father".to_string(),
                father: None,
                mother: None,
                sex: Sex::Male,
                affected: AffectedStatus::Unaffected,
            },
        );
        individuals.insert(
            "mother".to_string(),
            Individual {
                name: "mother".to_string(),
                father: None,
                mother: None,
                sex: Sex::Female,
                affected: AffectedStatus::Unaffected,
            },
        );
        Family {
            name: "FAM1".to_string(),
            individuals,
            status: LoadStatus::Loaded,
        }
    }

    #[test]
    fn family_affected_partition() {
        let family = trio();
        assert_eq!(
            family.affected().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["proband"]
        );
        assert_eq!(
            family
                .unaffected()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>(),
            vec!["father", "mother"]
        );
    }

    #[test]
    fn family_parents_of() {
        let family = trio();
        let proband = family.individuals.get("proband").unwrap();
        let parents = family.parents_of(proband);
        assert_eq!(
            parents.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["father", "mother"]
        );
    }

    #[test]
    fn read_ped_trio() {
        let ped = "FAM1\tproband\tfather\tmother\t1\t2\n\
                   FAM1\tfather\t0\t0\t1\t1\n\
                   FAM1\tmother\t0\t0\t2\t1\n";
        let families = read_ped(ped.as_bytes()).unwrap();
        assert_eq!(families.len(), 1);
        let family = families.get("FAM1").unwrap();
        assert_eq!(family.individuals.len(), 3);
        assert_eq!(family.status, LoadStatus::Loading);
        let proband = family.individuals.get("proband").unwrap();
        assert_eq!(proband.father.as_deref(), Some("father"));
        assert_eq!(proband.sex, Sex::Male);
        assert_eq!(proband.affected, AffectedStatus::Affected);
        let father = family.individuals.get("father").unwrap();
        assert_eq!(father.father, None);
    }

    #[test]
    fn read_ped_rejects_duplicates() {
        let ped = "FAM1\tproband\t0\t0\t1\t2\n\
                   FAM1\tproband\t0\t0\t1\t2\n";
        assert!(matches!(
            read_ped(ped.as_bytes()),
            Err(ped_file::Error::DuplicateIndividual { .. })
        ));
    }
}
