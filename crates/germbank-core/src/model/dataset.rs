use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ISO 3166-1 country reference as written in a template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CountryCode {
    /// Two-letter code (collaborator and dataset location sheets)
    Alpha2(String),
    /// Three-letter code (MCPD `ORIGCTY`)
    Alpha3(String),
}

impl CountryCode {
    pub fn as_str(&self) -> &str {
        match self {
            CountryCode::Alpha2(code) | CountryCode::Alpha3(code) => code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Institution {
    pub code: Option<String>,
    pub name: Option<String>,
    pub acronym: Option<String>,
    pub address: Option<String>,
    pub country: Option<CountryCode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collaborator {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub institution: Option<Institution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    CollectingSites,
    Datasets,
    TrialSite,
}

impl LocationType {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::CollectingSites => "collectingsites",
            LocationType::Datasets => "datasets",
            LocationType::TrialSite => "trialsite",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub site_name: Option<String>,
    pub site_name_short: Option<String>,
    pub elevation: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<CountryCode>,
    pub location_type: LocationType,
}

impl Location {
    /// A location without a site name carries no identity and is ignored
    pub fn is_named(&self) -> bool {
        self.site_name.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentType {
    Genotype,
    Trials,
    Allelefreq,
    Climate,
    Compound,
    Unknown,
}

impl ExperimentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentType::Genotype => "genotype",
            ExperimentType::Trials => "trials",
            ExperimentType::Allelefreq => "allelefreq",
            ExperimentType::Climate => "climate",
            ExperimentType::Compound => "compound",
            ExperimentType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub description: Option<String>,
    pub experiment_type: ExperimentType,
}

/// Dataset described by a `METADATA` sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub description: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub contact: Option<String>,
    /// Compact JSON object of the Dublin-Core fields
    pub dublin_core: Option<String>,
    pub version: Option<String>,
    pub experiment: Experiment,
    pub location: Option<Location>,
}
