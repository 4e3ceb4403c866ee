use chrono::NaiveDate;

use super::compound::Unit;

#[derive(Debug, Clone, PartialEq)]
pub struct Phenotype {
    pub name: String,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<String>,
    pub unit: Option<Unit>,
}

/// One non-empty cell of a trials `DATA` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeDatum {
    pub accession: String,
    pub rep: Option<String>,
    pub treatment: Option<String>,
    pub phenotype: String,
    /// Phenotype values are free text (numeric, categorical or dates)
    pub value: String,
    pub recording_date: Option<NaiveDate>,
}
