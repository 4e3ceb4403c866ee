//! Row-level access to the import schema
//!
//! `reference` creates reference rows one at a time while records are
//! resolved; `facts` defines the batched fact rows.

pub mod facts;
pub mod keys;
pub mod reference;

pub use facts::{
    AttributeDataRow, CompoundDataRow, MapDefinitionRow, PedigreeDefinitionRow, PedigreeRow,
    PhenotypeDataRow,
};
pub use reference::{AccessionLinks, Countries};
