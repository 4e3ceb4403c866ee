//! Reference rows: preload queries and single-row inserts
//!
//! Reference rows are created one at a time while records are resolved, so
//! each insert returns the id the resolver caches.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use germbank_core::model::{
    Accession, Compound, CountryCode, Dataset, Experiment, GeneticMap, Institution, Location,
    LocationType, PedigreeDescription, Phenotype, Taxonomy, Unit,
};
use rusqlite::{params, Connection};

use crate::cache::KeyF64;
use crate::errors::{from_rusqlite, internal_error, Result};
use crate::repo::keys::{
    iso_date, CollaboratorKey, DatasetCollaboratorKey, DatasetKey, InstitutionKey, LocationKey,
    MarkerKey, SynonymKey, TaxonomyKey, UnitKey,
};
use crate::resolver::Resolver;
use crate::table::Table;

/// Seeded country for rows naming no recognised country
pub const UNKNOWN_COUNTRY_CODE2: &str = "UN";

/// Country ids by ISO code, read once per run
#[derive(Debug, Clone)]
pub struct Countries {
    alpha2: HashMap<String, i64>,
    alpha3: HashMap<String, i64>,
    unknown: i64,
}

impl Countries {
    /// # Errors
    ///
    /// `ERR_INTERNAL` when the seeded unknown country is missing, which
    /// means migrations have not run.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn
            .prepare("SELECT country_code2, country_code3, id FROM countries")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?))
            })
            .map_err(from_rusqlite)?;

        let mut alpha2 = HashMap::new();
        let mut alpha3 = HashMap::new();
        for row in rows {
            let (code2, code3, id) = row.map_err(from_rusqlite)?;
            alpha2.insert(code2.to_ascii_uppercase(), id);
            alpha3.insert(code3.to_ascii_uppercase(), id);
        }

        let unknown = alpha2
            .get(UNKNOWN_COUNTRY_CODE2)
            .copied()
            .ok_or_else(|| internal_error("load_countries", "Country reference data missing"))?;

        Ok(Self {
            alpha2,
            alpha3,
            unknown,
        })
    }

    pub fn lookup(&self, code: &CountryCode) -> Option<i64> {
        match code {
            CountryCode::Alpha2(c) => self.alpha2.get(&c.trim().to_ascii_uppercase()),
            CountryCode::Alpha3(c) => self.alpha3.get(&c.trim().to_ascii_uppercase()),
        }
        .copied()
    }

    pub fn unknown(&self) -> i64 {
        self.unknown
    }
}

fn name_column(table: Table) -> Option<&'static str> {
    match table {
        Table::Experiments => Some("experiment_name"),
        Table::Accessions => Some("general_identifier"),
        Table::Attributes
        | Table::Compounds
        | Table::Phenotypes
        | Table::Treatments
        | Table::PedigreeNotations
        | Table::PedigreeDescriptions
        | Table::Maps => Some("name"),
        Table::MarkerTypes | Table::MapFeatureTypes => Some("description"),
        _ => None,
    }
}

/// Preload a table whose natural key is a single name column
///
/// # Errors
///
/// `ERR_INTERNAL` when the resolver's table has no name key.
pub fn preload_by_name(resolver: &mut Resolver<String>, conn: &Connection) -> Result<usize> {
    let table = resolver.table();
    let column = name_column(table).ok_or_else(|| {
        internal_error(
            "preload_by_name",
            format!("{} is not keyed by a name", table),
        )
    })?;
    let sql = format!("SELECT {}, id FROM {}", column, table.name());
    resolver.preload(conn, &sql, [], |r| Ok((r.get(0)?, r.get(1)?)))
}

fn key_f64(value: Option<f64>) -> Option<KeyF64> {
    value.map(KeyF64::new)
}

// ---- institutions ----

pub fn institution_key(institution: &Institution, country_id: i64) -> InstitutionKey {
    InstitutionKey {
        code: institution.code.clone(),
        name: institution.name.clone(),
        address: institution.address.clone(),
        country_id,
    }
}

pub fn preload_institutions(
    resolver: &mut Resolver<InstitutionKey>,
    conn: &Connection,
) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT code, name, address, country_id, id FROM institutions",
        [],
        |r| {
            Ok((
                InstitutionKey {
                    code: r.get(0)?,
                    name: r.get(1)?,
                    address: r.get(2)?,
                    country_id: r.get(3)?,
                },
                r.get(4)?,
            ))
        },
    )
}

pub fn insert_institution(
    conn: &Connection,
    key: &InstitutionKey,
    acronym: Option<&str>,
) -> Result<i64> {
    // the name column is mandatory; passport institutions are named by code
    let name = key.name.as_deref().or(key.code.as_deref()).unwrap_or_default();
    conn.execute(
        "INSERT INTO institutions (code, name, acronym, address, country_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![key.code, name, acronym, key.address, key.country_id],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- collaborators ----

pub fn preload_collaborators(
    resolver: &mut Resolver<CollaboratorKey>,
    conn: &Connection,
) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT first_name, last_name, email, phone, institution_id, id FROM collaborators",
        [],
        |r| {
            Ok((
                CollaboratorKey {
                    first_name: r.get(0)?,
                    last_name: r.get(1)?,
                    email: r.get(2)?,
                    phone: r.get(3)?,
                    institution_id: r.get(4)?,
                },
                r.get(5)?,
            ))
        },
    )
}

pub fn insert_collaborator(conn: &Connection, key: &CollaboratorKey) -> Result<i64> {
    conn.execute(
        "INSERT INTO collaborators (first_name, last_name, email, phone, institution_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            key.first_name,
            key.last_name,
            key.email,
            key.phone,
            key.institution_id
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- locations ----

/// Key of a named location; unnamed locations are never stored
pub fn location_key(location: &Location, country_id: i64) -> Option<LocationKey> {
    Some(LocationKey {
        site_name: location.site_name.clone()?,
        site_name_short: location.site_name_short.clone(),
        elevation: key_f64(location.elevation),
        latitude: key_f64(location.latitude),
        longitude: key_f64(location.longitude),
        country_id,
    })
}

pub fn preload_locations(resolver: &mut Resolver<LocationKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT site_name, site_name_short, elevation, latitude, longitude, country_id, id
         FROM locations",
        [],
        |r| {
            Ok((
                LocationKey {
                    site_name: r.get(0)?,
                    site_name_short: r.get(1)?,
                    elevation: key_f64(r.get(2)?),
                    latitude: key_f64(r.get(3)?),
                    longitude: key_f64(r.get(4)?),
                    country_id: r.get(5)?,
                },
                r.get(6)?,
            ))
        },
    )
}

pub fn insert_location(
    conn: &Connection,
    key: &LocationKey,
    location_type: LocationType,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO locations
            (site_name, site_name_short, elevation, latitude, longitude, country_id, location_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            key.site_name,
            key.site_name_short,
            key.elevation.map(KeyF64::value),
            key.latitude.map(KeyF64::value),
            key.longitude.map(KeyF64::value),
            key.country_id,
            location_type.as_str(),
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- experiments and datasets ----

pub fn insert_experiment(conn: &Connection, experiment: &Experiment) -> Result<i64> {
    conn.execute(
        "INSERT INTO experiments (experiment_name, description, experiment_type)
         VALUES (?1, ?2, ?3)",
        params![
            experiment.name,
            experiment.description,
            experiment.experiment_type.as_str()
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn dataset_key(dataset: &Dataset, experiment_id: i64, location_id: Option<i64>) -> DatasetKey {
    DatasetKey {
        name: dataset.name.clone(),
        location_id,
        experiment_id,
        dublin_core: dataset.dublin_core.clone(),
        version: dataset.version.clone(),
    }
}

pub fn preload_datasets(resolver: &mut Resolver<DatasetKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT name, location_id, experiment_id, dublin_core, version, id FROM datasets",
        [],
        |r| {
            Ok((
                DatasetKey {
                    name: r.get(0)?,
                    location_id: r.get(1)?,
                    experiment_id: r.get(2)?,
                    dublin_core: r.get(3)?,
                    version: r.get(4)?,
                },
                r.get(5)?,
            ))
        },
    )
}

pub fn insert_dataset(conn: &Connection, key: &DatasetKey, dataset: &Dataset) -> Result<i64> {
    conn.execute(
        "INSERT INTO datasets
            (experiment_id, location_id, name, description, date_start, contact, dublin_core, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            key.experiment_id,
            key.location_id,
            key.name,
            dataset.description,
            iso_date(dataset.date_start),
            dataset.contact,
            key.dublin_core,
            key.version,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn preload_dataset_collaborators(
    resolver: &mut Resolver<DatasetCollaboratorKey>,
    conn: &Connection,
) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT dataset_id, collaborator_id, id FROM dataset_collaborators",
        [],
        |r| {
            Ok((
                DatasetCollaboratorKey {
                    dataset_id: r.get(0)?,
                    collaborator_id: r.get(1)?,
                },
                r.get(2)?,
            ))
        },
    )
}

pub fn insert_dataset_collaborator(conn: &Connection, key: &DatasetCollaboratorKey) -> Result<i64> {
    conn.execute(
        "INSERT INTO dataset_collaborators (dataset_id, collaborator_id) VALUES (?1, ?2)",
        params![key.dataset_id, key.collaborator_id],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- taxonomies, accessions, synonyms ----

pub fn taxonomy_key(taxonomy: &Taxonomy) -> TaxonomyKey {
    TaxonomyKey {
        genus: taxonomy.genus.clone(),
        species: taxonomy.species.clone(),
        species_author: taxonomy.species_author.clone(),
        crop_name: taxonomy.crop_name.clone(),
    }
}

pub fn preload_taxonomies(resolver: &mut Resolver<TaxonomyKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT genus, species, species_author, cropname, id FROM taxonomies",
        [],
        |r| {
            Ok((
                TaxonomyKey {
                    genus: r.get(0)?,
                    species: r.get(1)?,
                    species_author: r.get(2)?,
                    crop_name: r.get(3)?,
                },
                r.get(4)?,
            ))
        },
    )
}

pub fn insert_taxonomy(conn: &Connection, key: &TaxonomyKey) -> Result<i64> {
    conn.execute(
        "INSERT INTO taxonomies (genus, species, species_author, cropname) VALUES (?1, ?2, ?3, ?4)",
        params![key.genus, key.species, key.species_author, key.crop_name],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Foreign keys of an accession row
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessionLinks {
    pub institution_id: Option<i64>,
    pub taxonomy_id: Option<i64>,
    pub location_id: Option<i64>,
    pub parent_id: Option<i64>,
}

pub fn insert_accession(
    conn: &Connection,
    accession: &Accession,
    links: AccessionLinks,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO accessions (
            general_identifier, name, number, puid, collnumb, collcode, collname, collmissid,
            acqdate, colldate, breeders_code, breeders_name, biological_status, donor_code,
            donor_name, donor_number, othernumb, duplsite, duplinstname, institution_id,
            taxonomy_id, location_id, entity_type, entity_parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
        params![
            accession.general_identifier,
            accession.name,
            accession.number,
            accession.puid,
            accession.collector_number,
            accession.collector_code,
            accession.collector_name,
            accession.collecting_mission,
            accession.acquisition_date,
            iso_date(accession.collecting_date),
            accession.breeders_code,
            accession.breeders_name,
            accession.biological_status,
            accession.donor_code,
            accession.donor_name,
            accession.donor_number,
            accession.other_numbers,
            accession.duplicate_site,
            accession.duplicate_institution,
            links.institution_id,
            links.taxonomy_id,
            links.location_id,
            accession.entity_type.as_str(),
            links.parent_id,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Display name of a stored accession
///
/// # Errors
///
/// `ERR_PERSISTENCE` when the id does not exist.
pub fn accession_name(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row("SELECT name FROM accessions WHERE id = ?1", [id], |r| r.get(0))
        .map_err(from_rusqlite)
}

pub fn preload_synonyms(resolver: &mut Resolver<SynonymKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(conn, "SELECT accession_id, id FROM synonyms", [], |r| {
        Ok((
            SynonymKey {
                accession_id: r.get(0)?,
            },
            r.get(1)?,
        ))
    })
}

/// Store the synonyms of an accession as a JSON array
///
/// # Errors
///
/// `ERR_SERIALIZATION` if the list cannot be encoded, otherwise `ERR_PERSISTENCE`.
pub fn insert_synonyms(conn: &Connection, key: &SynonymKey, synonyms: &[String]) -> Result<i64> {
    let json = serde_json::to_string(synonyms)?;
    conn.execute(
        "INSERT INTO synonyms (accession_id, synonyms) VALUES (?1, ?2)",
        params![key.accession_id, json],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- attributes ----

pub fn insert_attribute(conn: &Connection, name: &str, data_type: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO attributes (name, data_type, target_table) VALUES (?1, ?2, 'accessions')",
        params![name, data_type],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- units, compounds, phenotypes, treatments ----

pub fn unit_key(unit: &Unit) -> UnitKey {
    UnitKey {
        name: unit.name.clone(),
        abbreviation: unit.abbreviation.clone(),
    }
}

pub fn preload_units(resolver: &mut Resolver<UnitKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT unit_name, unit_abbreviation, id FROM units",
        [],
        |r| {
            Ok((
                UnitKey {
                    name: r.get(0)?,
                    abbreviation: r.get(1)?,
                },
                r.get(2)?,
            ))
        },
    )
}

pub fn insert_unit(conn: &Connection, unit: &Unit) -> Result<i64> {
    conn.execute(
        "INSERT INTO units (unit_name, unit_abbreviation, unit_description) VALUES (?1, ?2, ?3)",
        params![unit.name, unit.abbreviation, unit.description],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_compound(conn: &Connection, compound: &Compound, unit_id: Option<i64>) -> Result<i64> {
    conn.execute(
        "INSERT INTO compounds
            (name, description, molecular_formula, monoisotopic_mass, average_mass,
             compound_class, unit_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            compound.name,
            compound.description,
            compound.molecular_formula,
            compound.monoisotopic_mass,
            compound.average_mass,
            compound.compound_class,
            unit_id,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_phenotype(
    conn: &Connection,
    phenotype: &Phenotype,
    unit_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO phenotypes (name, short_name, description, datatype, unit_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            phenotype.name,
            phenotype.short_name,
            phenotype.description,
            phenotype.data_type,
            unit_id,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_treatment(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO treatments (name) VALUES (?1)", [name])
        .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- pedigree reference rows ----

pub fn insert_pedigree_notation(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO pedigree_notations (name, description) VALUES (?1, ?2)",
        params![name, description],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_pedigree_description(
    conn: &Connection,
    description: &PedigreeDescription,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO pedigree_descriptions (name, description, author) VALUES (?1, ?2, ?3)",
        params![description.name, description.description, description.author],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

// ---- maps and markers ----

pub fn insert_marker_type(conn: &Connection, description: &str) -> Result<i64> {
    conn.execute("INSERT INTO marker_types (description) VALUES (?1)", [description])
        .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_map_feature_type(conn: &Connection, description: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO map_feature_types (description) VALUES (?1)",
        [description],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_map(conn: &Connection, map: &GeneticMap) -> Result<i64> {
    conn.execute(
        "INSERT INTO maps (name, description) VALUES (?1, ?2)",
        params![map.name, map.description],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn preload_markers(resolver: &mut Resolver<MarkerKey>, conn: &Connection) -> Result<usize> {
    resolver.preload(
        conn,
        "SELECT marker_name, marker_type_id, id FROM markers",
        [],
        |r| {
            Ok((
                MarkerKey {
                    name: r.get(0)?,
                    marker_type_id: r.get(1)?,
                },
                r.get(2)?,
            ))
        },
    )
}

pub fn insert_marker(conn: &Connection, key: &MarkerKey) -> Result<i64> {
    conn.execute(
        "INSERT INTO markers (marker_name, marker_type_id) VALUES (?1, ?2)",
        params![key.name, key.marker_type_id],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}
