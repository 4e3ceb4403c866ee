//! Typed records produced by the template readers
//!
//! Records carry names and codes as written in the template. Foreign keys
//! are resolved later by the importers, so nothing here holds a store id.

pub mod accession;
pub mod compound;
pub mod dataset;
pub mod marker;
pub mod pedigree;
pub mod phenotype;

pub use accession::{Accession, AttributeDatum, EntityType, PassportEntry, Taxonomy};
pub use compound::{Compound, CompoundDatum, Unit};
pub use dataset::{
    Collaborator, CountryCode, Dataset, Experiment, ExperimentType, Institution, Location,
    LocationType,
};
pub use marker::{GeneticMap, MapDefinition};
pub use pedigree::{Pedigree, PedigreeDefinition, PedigreeDescription};
pub use phenotype::{Phenotype, PhenotypeDatum};
