use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub name: String,
    pub description: Option<String>,
    pub molecular_formula: Option<String>,
    pub monoisotopic_mass: Option<f64>,
    pub average_mass: Option<f64>,
    pub compound_class: Option<String>,
    pub unit: Option<Unit>,
}

/// One non-empty cell of a compound `DATA` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundDatum {
    pub accession: String,
    pub compound: String,
    pub value: f64,
    pub recording_date: Option<NaiveDate>,
}
