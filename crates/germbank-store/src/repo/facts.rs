//! Fact rows written through [`BatchWriter`]

#![allow(clippy::result_large_err)]

use rusqlite::{params, CachedStatement, Connection};

use crate::batch::{BatchRow, BatchWriter};
use crate::cache::KeyF64;
use crate::errors::Result;
use crate::repo::keys::{
    AttributeDataKey, CompoundDataKey, MapDefinitionKey, PedigreeDefinitionKey, PedigreeKey,
    PhenotypeDataKey,
};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDataRow {
    pub attribute_id: i64,
    pub accession_id: i64,
    pub value: String,
}

impl BatchRow for AttributeDataRow {
    type Key = AttributeDataKey;
    const TABLE: Table = Table::AttributeData;
    const INSERT_SQL: &'static str =
        "INSERT INTO attribute_data (attribute_id, accession_id, value) VALUES (?1, ?2, ?3)";

    fn key(&self) -> AttributeDataKey {
        AttributeDataKey {
            attribute_id: self.attribute_id,
            accession_id: self.accession_id,
            value: self.value.clone(),
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.attribute_id, self.accession_id, self.value])
    }
}

pub fn preload_attribute_data(
    writer: &mut BatchWriter<AttributeDataRow>,
    conn: &Connection,
) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT attribute_id, accession_id, value, id FROM attribute_data",
        [],
        |r| {
            Ok((
                AttributeDataKey {
                    attribute_id: r.get(0)?,
                    accession_id: r.get(1)?,
                    value: r.get(2)?,
                },
                r.get(3)?,
            ))
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundDataRow {
    pub compound_id: i64,
    pub accession_id: i64,
    pub dataset_id: i64,
    pub value: f64,
    pub recording_date: Option<String>,
}

impl BatchRow for CompoundDataRow {
    type Key = CompoundDataKey;
    const TABLE: Table = Table::CompoundData;
    const INSERT_SQL: &'static str = "INSERT INTO compound_data
        (compound_id, accession_id, dataset_id, compound_value, recording_date)
        VALUES (?1, ?2, ?3, ?4, ?5)";

    fn key(&self) -> CompoundDataKey {
        CompoundDataKey {
            accession_id: self.accession_id,
            compound_id: self.compound_id,
            dataset_id: self.dataset_id,
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.compound_id,
            self.accession_id,
            self.dataset_id,
            self.value,
            self.recording_date,
        ])
    }
}

/// Existing compound data of one dataset
pub fn preload_compound_data(
    writer: &mut BatchWriter<CompoundDataRow>,
    conn: &Connection,
    dataset_id: i64,
) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT accession_id, compound_id, dataset_id, id FROM compound_data
         WHERE dataset_id IS ?1",
        [dataset_id],
        |r| {
            Ok((
                CompoundDataKey {
                    accession_id: r.get(0)?,
                    compound_id: r.get(1)?,
                    dataset_id: r.get(2)?,
                },
                r.get(3)?,
            ))
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeDataRow {
    pub phenotype_id: i64,
    pub accession_id: i64,
    pub dataset_id: i64,
    pub treatment_id: Option<i64>,
    pub value: String,
    pub recording_date: Option<String>,
}

impl BatchRow for PhenotypeDataRow {
    type Key = PhenotypeDataKey;
    const TABLE: Table = Table::PhenotypeData;
    const INSERT_SQL: &'static str = "INSERT INTO phenotype_data
        (phenotype_id, accession_id, dataset_id, treatment_id, phenotype_value, recording_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

    fn key(&self) -> PhenotypeDataKey {
        PhenotypeDataKey {
            phenotype_id: self.phenotype_id,
            accession_id: self.accession_id,
            dataset_id: self.dataset_id,
            value: self.value.clone(),
            recording_date: self.recording_date.clone(),
            treatment_id: self.treatment_id,
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.phenotype_id,
            self.accession_id,
            self.dataset_id,
            self.treatment_id,
            self.value,
            self.recording_date,
        ])
    }
}

/// Existing phenotype data of one dataset
pub fn preload_phenotype_data(
    writer: &mut BatchWriter<PhenotypeDataRow>,
    conn: &Connection,
    dataset_id: i64,
) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT phenotype_id, accession_id, dataset_id, phenotype_value, recording_date,
                treatment_id, id
         FROM phenotype_data WHERE dataset_id IS ?1",
        [dataset_id],
        |r| {
            Ok((
                PhenotypeDataKey {
                    phenotype_id: r.get(0)?,
                    accession_id: r.get(1)?,
                    dataset_id: r.get(2)?,
                    value: r.get(3)?,
                    recording_date: r.get(4)?,
                    treatment_id: r.get(5)?,
                },
                r.get(6)?,
            ))
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PedigreeRow {
    pub accession_id: i64,
    pub parent_id: i64,
    pub description_id: Option<i64>,
    pub relationship: Option<String>,
}

impl BatchRow for PedigreeRow {
    type Key = PedigreeKey;
    const TABLE: Table = Table::Pedigrees;
    const INSERT_SQL: &'static str = "INSERT INTO pedigrees
        (accession_id, parent_id, pedigree_description_id, relationship_description)
        VALUES (?1, ?2, ?3, ?4)";

    fn key(&self) -> PedigreeKey {
        PedigreeKey {
            accession_id: self.accession_id,
            parent_id: self.parent_id,
            description_id: self.description_id,
            relationship: self.relationship.clone(),
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.accession_id,
            self.parent_id,
            self.description_id,
            self.relationship,
        ])
    }
}

pub fn preload_pedigrees(writer: &mut BatchWriter<PedigreeRow>, conn: &Connection) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT accession_id, parent_id, pedigree_description_id, relationship_description, id
         FROM pedigrees",
        [],
        |r| {
            Ok((
                PedigreeKey {
                    accession_id: r.get(0)?,
                    parent_id: r.get(1)?,
                    description_id: r.get(2)?,
                    relationship: r.get(3)?,
                },
                r.get(4)?,
            ))
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PedigreeDefinitionRow {
    pub accession_id: i64,
    pub notation_id: i64,
    pub description_id: Option<i64>,
    pub definition: String,
}

impl BatchRow for PedigreeDefinitionRow {
    type Key = PedigreeDefinitionKey;
    const TABLE: Table = Table::PedigreeDefinitions;
    const INSERT_SQL: &'static str = "INSERT INTO pedigree_definitions
        (accession_id, pedigree_notation_id, pedigree_description_id, definition)
        VALUES (?1, ?2, ?3, ?4)";

    fn key(&self) -> PedigreeDefinitionKey {
        PedigreeDefinitionKey {
            accession_id: self.accession_id,
            notation_id: self.notation_id,
            description_id: self.description_id,
            definition: self.definition.clone(),
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.accession_id,
            self.notation_id,
            self.description_id,
            self.definition,
        ])
    }
}

pub fn preload_pedigree_definitions(
    writer: &mut BatchWriter<PedigreeDefinitionRow>,
    conn: &Connection,
) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT accession_id, pedigree_notation_id, pedigree_description_id, definition, id
         FROM pedigree_definitions",
        [],
        |r| {
            Ok((
                PedigreeDefinitionKey {
                    accession_id: r.get(0)?,
                    notation_id: r.get(1)?,
                    description_id: r.get(2)?,
                    definition: r.get(3)?,
                },
                r.get(4)?,
            ))
        },
    )
}

/// Position of a marker on a map
#[derive(Debug, Clone, PartialEq)]
pub struct MapDefinitionRow {
    pub map_feature_type_id: Option<i64>,
    pub marker_id: i64,
    pub map_id: i64,
    pub start: f64,
    pub end: f64,
    pub chromosome: String,
}

impl BatchRow for MapDefinitionRow {
    type Key = MapDefinitionKey;
    const TABLE: Table = Table::MapDefinitions;
    const INSERT_SQL: &'static str = "INSERT INTO map_definitions
        (map_feature_type_id, marker_id, map_id, definition_start, definition_end, chromosome)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

    fn key(&self) -> MapDefinitionKey {
        MapDefinitionKey {
            map_feature_type_id: self.map_feature_type_id,
            marker_id: self.marker_id,
            map_id: self.map_id,
            start: KeyF64::new(self.start),
            end: KeyF64::new(self.end),
            chromosome: self.chromosome.clone(),
        }
    }

    fn insert(&self, stmt: &mut CachedStatement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.map_feature_type_id,
            self.marker_id,
            self.map_id,
            self.start,
            self.end,
            self.chromosome,
        ])
    }
}

/// Existing definitions on one map
pub fn preload_map_definitions(
    writer: &mut BatchWriter<MapDefinitionRow>,
    conn: &Connection,
    map_id: i64,
) -> Result<usize> {
    writer.preload(
        conn,
        "SELECT map_feature_type_id, marker_id, map_id, definition_start, definition_end,
                chromosome, id
         FROM map_definitions WHERE map_id = ?1",
        [map_id],
        |r| {
            Ok((
                MapDefinitionKey {
                    map_feature_type_id: r.get(0)?,
                    marker_id: r.get(1)?,
                    map_id: r.get(2)?,
                    start: KeyF64::new(r.get(3)?),
                    end: KeyF64::new(r.get(4)?),
                    chromosome: r.get(5)?,
                },
                r.get(6)?,
            ))
        },
    )
}
