//! Tables the importers write to

use std::fmt;

/// Every table an import run can insert into
///
/// Ordering follows declaration order; [`Table::dependency_rank`] is what
/// rollback sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Countries,
    Experiments,
    Taxonomies,
    Attributes,
    Units,
    Treatments,
    PedigreeNotations,
    PedigreeDescriptions,
    MarkerTypes,
    MapFeatureTypes,
    Maps,
    Institutions,
    Locations,
    Compounds,
    Phenotypes,
    Markers,
    Collaborators,
    Datasets,
    Accessions,
    DatasetCollaborators,
    Synonyms,
    AttributeData,
    CompoundData,
    PhenotypeData,
    Pedigrees,
    PedigreeDefinitions,
    MapDefinitions,
}

impl Table {
    pub const ALL: [Table; 27] = [
        Table::Countries,
        Table::Experiments,
        Table::Taxonomies,
        Table::Attributes,
        Table::Units,
        Table::Treatments,
        Table::PedigreeNotations,
        Table::PedigreeDescriptions,
        Table::MarkerTypes,
        Table::MapFeatureTypes,
        Table::Maps,
        Table::Institutions,
        Table::Locations,
        Table::Compounds,
        Table::Phenotypes,
        Table::Markers,
        Table::Collaborators,
        Table::Datasets,
        Table::Accessions,
        Table::DatasetCollaborators,
        Table::Synonyms,
        Table::AttributeData,
        Table::CompoundData,
        Table::PhenotypeData,
        Table::Pedigrees,
        Table::PedigreeDefinitions,
        Table::MapDefinitions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Countries => "countries",
            Table::Experiments => "experiments",
            Table::Taxonomies => "taxonomies",
            Table::Attributes => "attributes",
            Table::Units => "units",
            Table::Treatments => "treatments",
            Table::PedigreeNotations => "pedigree_notations",
            Table::PedigreeDescriptions => "pedigree_descriptions",
            Table::MarkerTypes => "marker_types",
            Table::MapFeatureTypes => "map_feature_types",
            Table::Maps => "maps",
            Table::Institutions => "institutions",
            Table::Locations => "locations",
            Table::Compounds => "compounds",
            Table::Phenotypes => "phenotypes",
            Table::Markers => "markers",
            Table::Collaborators => "collaborators",
            Table::Datasets => "datasets",
            Table::Accessions => "accessions",
            Table::DatasetCollaborators => "dataset_collaborators",
            Table::Synonyms => "synonyms",
            Table::AttributeData => "attribute_data",
            Table::CompoundData => "compound_data",
            Table::PhenotypeData => "phenotype_data",
            Table::Pedigrees => "pedigrees",
            Table::PedigreeDefinitions => "pedigree_definitions",
            Table::MapDefinitions => "map_definitions",
        }
    }

    /// Depth in the foreign-key graph
    ///
    /// A row only references rows of strictly lower rank, except accessions,
    /// which may reference a parent accession created earlier in the same
    /// run. Rows are deleted highest rank first.
    pub fn dependency_rank(self) -> u8 {
        match self {
            Table::Countries
            | Table::Experiments
            | Table::Taxonomies
            | Table::Attributes
            | Table::Units
            | Table::Treatments
            | Table::PedigreeNotations
            | Table::PedigreeDescriptions
            | Table::MarkerTypes
            | Table::MapFeatureTypes
            | Table::Maps => 0,

            Table::Institutions
            | Table::Locations
            | Table::Compounds
            | Table::Phenotypes
            | Table::Markers => 1,

            Table::Collaborators | Table::Datasets | Table::Accessions => 2,

            Table::DatasetCollaborators
            | Table::Synonyms
            | Table::AttributeData
            | Table::CompoundData
            | Table::PhenotypeData
            | Table::Pedigrees
            | Table::PedigreeDefinitions
            | Table::MapDefinitions => 3,
        }
    }

    /// Fact tables receive their rows through a batch writer
    pub fn is_fact(self) -> bool {
        matches!(
            self,
            Table::AttributeData
                | Table::CompoundData
                | Table::PhenotypeData
                | Table::Pedigrees
                | Table::PedigreeDefinitions
                | Table::MapDefinitions
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::migrations::apply_migrations;

    #[test]
    fn test_every_table_exists_in_schema() {
        let mut conn = open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        for table in Table::ALL {
            let found: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table.name()],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_foreign_keys_point_to_lower_ranks() {
        let mut conn = open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        for table in Table::ALL {
            let sql = format!("SELECT \"table\" FROM pragma_foreign_key_list('{}')", table.name());
            let mut stmt = conn.prepare(&sql).unwrap();
            let targets: Vec<String> = stmt
                .query_map([], |r| r.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect();

            for target in targets {
                let target = Table::ALL.iter().find(|t| t.name() == target).unwrap();
                if *target == table {
                    continue;
                }
                assert!(
                    target.dependency_rank() < table.dependency_rank(),
                    "{} references {} of equal or higher rank",
                    table,
                    target
                );
            }
        }
    }
}
