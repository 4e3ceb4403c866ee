#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PedigreeDescription {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// One parent link of an accession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pedigree {
    pub accession: String,
    pub parent: String,
    pub relationship_description: Option<String>,
    pub description: Option<PedigreeDescription>,
}

/// A pedigree string in some notation, e.g. Purdy or the MCPD ancestry field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PedigreeDefinition {
    pub accession: String,
    pub definition: String,
    pub notation: String,
    pub description: Option<PedigreeDescription>,
}
