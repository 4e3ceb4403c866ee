use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dataset::{Institution, Location};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[default]
    Accession,
    PlantPlot,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Accession => "accession",
            EntityType::PlantPlot => "plant_plot",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub genus: Option<String>,
    pub species: Option<String>,
    pub species_author: Option<String>,
    pub crop_name: Option<String>,
}

impl Taxonomy {
    pub fn is_empty(&self) -> bool {
        self.genus.is_none()
            && self.species.is_none()
            && self.species_author.is_none()
            && self.crop_name.is_none()
    }
}

/// Accession described by the MCPD passport fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accession {
    pub general_identifier: String,
    pub name: String,
    pub number: Option<String>,
    pub puid: Option<String>,
    pub collector_number: Option<String>,
    pub collector_code: Option<String>,
    pub collector_name: Option<String>,
    pub collecting_mission: Option<String>,
    pub acquisition_date: Option<String>,
    pub collecting_date: Option<NaiveDate>,
    pub breeders_code: Option<String>,
    pub breeders_name: Option<String>,
    pub biological_status: Option<i64>,
    pub donor_code: Option<String>,
    pub donor_name: Option<String>,
    pub donor_number: Option<String>,
    pub other_numbers: Option<String>,
    pub duplicate_site: Option<String>,
    pub duplicate_institution: Option<String>,
    pub institution: Option<Institution>,
    pub taxonomy: Taxonomy,
    pub location: Option<Location>,
    pub entity_type: EntityType,
}

impl Accession {
    /// An accession known only by its identifier, which is also its name
    pub fn named(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            general_identifier: identifier,
            ..Self::default()
        }
    }
}

/// One passport row: the accession plus the fields stored beside it
#[derive(Debug, Clone, PartialEq)]
pub struct PassportEntry {
    pub accession: Accession,
    /// `OTHERNUMB` split on `;`
    pub synonyms: Vec<String>,
    pub remarks: Option<String>,
    /// `ANCEST`, stored as an MCPD pedigree definition
    pub ancestry: Option<String>,
}

/// One non-empty cell of an `ADDITIONAL_ATTRIBUTES` matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDatum {
    pub accession: String,
    pub attribute: String,
    pub value: String,
}
