//! Natural keys of the reference and fact tables
//!
//! Keys hold ids for the references they contain, so they can only be
//! built once those references are resolved. Dates are kept as the ISO
//! text the store holds.

use chrono::NaiveDate;

use crate::cache::{KeyF64, NaturalKey};

/// ISO rendering used for every date column
pub fn iso_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstitutionKey {
    pub code: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub country_id: i64,
}

impl NaturalKey for InstitutionKey {
    fn describe(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollaboratorKey {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub institution_id: Option<i64>,
}

impl NaturalKey for CollaboratorKey {
    fn describe(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub site_name: String,
    pub site_name_short: Option<String>,
    pub elevation: Option<KeyF64>,
    pub latitude: Option<KeyF64>,
    pub longitude: Option<KeyF64>,
    pub country_id: i64,
}

impl NaturalKey for LocationKey {
    fn describe(&self) -> String {
        self.site_name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    pub name: String,
    pub location_id: Option<i64>,
    pub experiment_id: i64,
    pub dublin_core: Option<String>,
    pub version: Option<String>,
}

impl NaturalKey for DatasetKey {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetCollaboratorKey {
    pub dataset_id: i64,
    pub collaborator_id: i64,
}

impl NaturalKey for DatasetCollaboratorKey {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaxonomyKey {
    pub genus: Option<String>,
    pub species: Option<String>,
    pub species_author: Option<String>,
    pub crop_name: Option<String>,
}

impl NaturalKey for TaxonomyKey {
    fn describe(&self) -> String {
        [self.genus.as_deref(), self.species.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub name: String,
    pub abbreviation: Option<String>,
}

impl NaturalKey for UnitKey {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// One synonyms row per accession
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynonymKey {
    pub accession_id: i64,
}

impl NaturalKey for SynonymKey {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeDataKey {
    pub attribute_id: i64,
    pub accession_id: i64,
    pub value: String,
}

impl NaturalKey for AttributeDataKey {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompoundDataKey {
    pub accession_id: i64,
    pub compound_id: i64,
    pub dataset_id: i64,
}

impl NaturalKey for CompoundDataKey {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhenotypeDataKey {
    pub phenotype_id: i64,
    pub accession_id: i64,
    pub dataset_id: i64,
    pub value: String,
    pub recording_date: Option<String>,
    pub treatment_id: Option<i64>,
}

impl NaturalKey for PhenotypeDataKey {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PedigreeKey {
    pub accession_id: i64,
    pub parent_id: i64,
    pub description_id: Option<i64>,
    pub relationship: Option<String>,
}

impl NaturalKey for PedigreeKey {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PedigreeDefinitionKey {
    pub accession_id: i64,
    pub notation_id: i64,
    pub description_id: Option<i64>,
    pub definition: String,
}

impl NaturalKey for PedigreeDefinitionKey {}

/// Markers of the same name are distinct per marker type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    pub name: String,
    pub marker_type_id: Option<i64>,
}

impl NaturalKey for MarkerKey {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapDefinitionKey {
    pub map_feature_type_id: Option<i64>,
    pub marker_id: i64,
    pub map_id: i64,
    pub start: KeyF64,
    pub end: KeyF64,
    pub chromosome: String,
}

impl NaturalKey for MapDefinitionKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_date() {
        assert_eq!(
            iso_date(NaiveDate::from_ymd_opt(2015, 6, 3)),
            Some("2015-06-03".to_string())
        );
        assert_eq!(iso_date(None), None);
    }

    #[test]
    fn test_collaborator_describe_joins_names() {
        let key = CollaboratorKey {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: None,
            phone: None,
            institution_id: None,
        };
        assert_eq!(key.describe(), "Jane Doe");
    }
}
