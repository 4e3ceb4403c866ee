/// Genetic map a marker file places its markers on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticMap {
    pub name: String,
    pub description: Option<String>,
    /// Feature type of every definition on the map, e.g. `SNP`
    pub feature_type: Option<String>,
}

/// One marker row of a `MARKERS` sheet
#[derive(Debug, Clone, PartialEq)]
pub struct MapDefinition {
    pub marker: String,
    pub marker_type: Option<String>,
    pub chromosome: String,
    pub start: f64,
    pub end: f64,
}
