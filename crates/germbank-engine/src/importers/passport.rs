//! MCPD passport data
//!
//! Each passport row yields an accession with its holding institution,
//! taxonomy and collecting site, plus the rows stored beside it: the
//! synonym list, a `Remarks` attribute value and the ancestry as an `MCPD`
//! pedigree definition. Accessions already in the store are left as they
//! are.

#![allow(clippy::result_large_err)]

use germbank_core::model::{Location, PassportEntry};
use germbank_core::template::PassportReader;
use germbank_core::Workbook;
use germbank_store::errors::{invalid_input, Result};
use germbank_store::repo::facts::{preload_attribute_data, preload_pedigree_definitions};
use germbank_store::repo::keys::{InstitutionKey, LocationKey, SynonymKey, TaxonomyKey};
use germbank_store::repo::reference::{
    insert_accession, insert_attribute, insert_institution, insert_location,
    insert_pedigree_notation, insert_synonyms, insert_taxonomy, institution_key, location_key,
    preload_by_name, preload_institutions, preload_locations, preload_synonyms,
    preload_taxonomies, taxonomy_key,
};
use germbank_store::repo::{AccessionLinks, AttributeDataRow, Countries, PedigreeDefinitionRow};
use germbank_store::{BatchWriter, Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{flush_rows, logged, tracked, write_row, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

/// Attribute holding the MCPD `REMARKS` field
pub const REMARKS_ATTRIBUTE: &str = "Remarks";

/// Pedigree notation of the MCPD `ANCEST` field
pub const MCPD_NOTATION: &str = "MCPD";

#[derive(Debug, Default)]
pub struct PassportImporter {
    tracker: RollbackTracker,
}

impl PassportImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct PassportSink<'a> {
    countries: Countries,
    institutions: Resolver<InstitutionKey>,
    taxonomies: Resolver<TaxonomyKey>,
    locations: Resolver<LocationKey>,
    accessions: Resolver<String>,
    synonyms: Resolver<SynonymKey>,
    attributes: Resolver<String>,
    notations: Resolver<String>,
    attribute_data: BatchWriter<AttributeDataRow>,
    definitions: BatchWriter<PedigreeDefinitionRow>,
    tracker: &'a mut RollbackTracker,
}

impl PassportSink<'_> {
    /// Collecting site; `ORIGCTY` must be a known ISO 3166 alpha-3 code
    fn location(
        &mut self,
        conn: &Connection,
        location: &Location,
        accession: &str,
    ) -> Result<Option<i64>> {
        let country_id = match &location.country {
            Some(code) => self.countries.lookup(code).ok_or_else(|| {
                invalid_input(
                    "import_passport",
                    format!("Unknown ORIGCTY country code '{}'", code.as_str()),
                )
                .with_table(Table::Accessions.name())
                .with_natural_key(accession)
            })?,
            None => self.countries.unknown(),
        };
        let Some(key) = location_key(location, country_id) else {
            return Ok(None);
        };
        let resolution = self
            .locations
            .resolve_or_create(key, |k| insert_location(conn, k, location.location_type))?;
        Ok(Some(tracked(self.tracker, Table::Locations, resolution)))
    }

    fn links(&mut self, conn: &Connection, entry: &PassportEntry) -> Result<AccessionLinks> {
        let accession = &entry.accession;
        let mut links = AccessionLinks::default();

        if let Some(institution) = &accession.institution {
            // passport rows name institutions by code only; their country is unknown
            let key = institution_key(institution, self.countries.unknown());
            let acronym = institution.acronym.as_deref();
            let resolution = self
                .institutions
                .resolve_or_create(key, |k| insert_institution(conn, k, acronym))?;
            links.institution_id = Some(tracked(self.tracker, Table::Institutions, resolution));
        }

        if !accession.taxonomy.is_empty() {
            let resolution = self
                .taxonomies
                .resolve_or_create(taxonomy_key(&accession.taxonomy), |k| insert_taxonomy(conn, k))?;
            links.taxonomy_id = Some(tracked(self.tracker, Table::Taxonomies, resolution));
        }

        if let Some(location) = &accession.location {
            links.location_id = self.location(conn, location, &accession.general_identifier)?;
        }

        Ok(links)
    }
}

impl RecordSink for PassportSink<'_> {
    type Record = PassportEntry;

    fn accept(&mut self, conn: &mut Connection, entry: PassportEntry) -> Result<()> {
        let identifier = entry.accession.general_identifier.clone();

        let accession_id = match self.accessions.lookup(&identifier) {
            Some(id) => id,
            None => {
                let links = self.links(conn, &entry)?;
                let id = insert_accession(conn, &entry.accession, links)?;
                self.accessions.remember(identifier, id);
                self.tracker.track(Table::Accessions, id);
                id
            }
        };

        if !entry.synonyms.is_empty() {
            let resolution = self
                .synonyms
                .resolve_or_create(SynonymKey { accession_id }, |k| {
                    insert_synonyms(conn, k, &entry.synonyms)
                })?;
            tracked(self.tracker, Table::Synonyms, resolution);
        }

        if let Some(remarks) = entry.remarks {
            let attribute = self
                .attributes
                .resolve_or_create(REMARKS_ATTRIBUTE.to_string(), |name| {
                    insert_attribute(conn, name, "char")
                })?;
            let attribute_id = tracked(self.tracker, Table::Attributes, attribute);
            let row = AttributeDataRow {
                attribute_id,
                accession_id,
                value: remarks,
            };
            write_row(&mut self.attribute_data, self.tracker, conn, row)?;
        }

        if let Some(ancestry) = entry.ancestry {
            let notation = self
                .notations
                .resolve_or_create(MCPD_NOTATION.to_string(), |name| {
                    insert_pedigree_notation(conn, name, Some("MCPD ancestral data"))
                })?;
            let notation_id = tracked(self.tracker, Table::PedigreeNotations, notation);
            let row = PedigreeDefinitionRow {
                accession_id,
                notation_id,
                description_id: None,
                definition: ancestry,
            };
            write_row(&mut self.definitions, self.tracker, conn, row)?;
        }

        Ok(())
    }

    fn finish(&mut self, conn: &mut Connection) -> Result<()> {
        flush_rows(&mut self.attribute_data, self.tracker, conn)?;
        flush_rows(&mut self.definitions, self.tracker, conn)
    }
}

impl Importer for PassportImporter {
    fn name(&self) -> &'static str {
        "passport"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_passport", &run_id, || {
            self.tracker.reset();
            let records = PassportReader::open(workbook)?;

            let mut institutions = Resolver::new(Table::Institutions);
            preload_institutions(&mut institutions, conn)?;
            let mut taxonomies = Resolver::new(Table::Taxonomies);
            preload_taxonomies(&mut taxonomies, conn)?;
            let mut locations = Resolver::new(Table::Locations);
            preload_locations(&mut locations, conn)?;
            let mut accessions = Resolver::new(Table::Accessions);
            preload_by_name(&mut accessions, conn)?;
            let mut synonyms = Resolver::new(Table::Synonyms);
            preload_synonyms(&mut synonyms, conn)?;
            let mut attributes = Resolver::new(Table::Attributes);
            preload_by_name(&mut attributes, conn)?;
            let mut notations = Resolver::new(Table::PedigreeNotations);
            preload_by_name(&mut notations, conn)?;
            let mut attribute_data = BatchWriter::new(ctx.config.batch_size);
            preload_attribute_data(&mut attribute_data, conn)?;
            let mut definitions = BatchWriter::new(ctx.config.batch_size);
            preload_pedigree_definitions(&mut definitions, conn)?;

            let mut sink = PassportSink {
                countries: Countries::load(conn)?,
                institutions,
                taxonomies,
                locations,
                accessions,
                synonyms,
                attributes,
                notations,
                attribute_data,
                definitions,
                tracker: &mut self.tracker,
            };
            let run = run_import(conn, records, &mut sink, ctx.policy())?;

            Ok(ImportSummary::new(self.name(), run, &self.tracker))
        })
    }

    fn tracker(&self) -> &RollbackTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut RollbackTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::test_support::{count, setup_test_db};
    use germbank_core::ExErrorKind;
    use germbank_store::ImportConfig;

    const HEADER: &str = "ACCENUMB\tINSTCODE\tGENUS\tSPECIES\tACCENAME\tORIGCTY\tCOLLSITE\tOTHERNUMB\tREMARKS\tANCEST";

    fn passport_file(dir: &std::path::Path, rows: &[&str]) -> Workbook {
        let path = dir.join("passport.txt");
        let mut content = format!("{}\n", HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        Workbook::open(&path).unwrap()
    }

    #[test]
    fn test_imports_accession_with_side_rows() {
        let dir = tempfile::tempdir().unwrap();
        let wb = passport_file(
            dir.path(),
            &[
                "ACC-1\tGBR001\tHordeum\tvulgare\tGolden Promise\tGBR\tInvergowrie\tCGN 1; PI 22\tsix-row\tBowman/Proctor",
                "ACC-2\tGBR001\tHordeum\tvulgare\t\t\t\t\t\t",
            ],
        );
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let summary = PassportImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap();

        assert_eq!(summary.created_in(Table::Accessions), 2);
        assert_eq!(summary.created_in(Table::Institutions), 1);
        assert_eq!(summary.created_in(Table::Taxonomies), 1);
        assert_eq!(summary.created_in(Table::Locations), 1);
        assert_eq!(summary.created_in(Table::Synonyms), 1);
        assert_eq!(summary.created_in(Table::AttributeData), 1);
        assert_eq!(summary.created_in(Table::PedigreeDefinitions), 1);

        let notation: String = conn
            .query_row(
                "SELECT n.name FROM pedigree_definitions d
                 JOIN pedigree_notations n ON n.id = d.pedigree_notation_id",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(notation, MCPD_NOTATION);
    }

    #[test]
    fn test_existing_accessions_are_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let wb = passport_file(dir.path(), &["ACC-1\t\t\t\tRenamed\t\t\t\t\t"]);
        let mut conn = setup_test_db();
        conn.execute(
            "INSERT INTO accessions (general_identifier, name) VALUES ('ACC-1', 'Original')",
            [],
        )
        .unwrap();
        let mut ctx = StageContext::new(ImportConfig::default());

        let summary = PassportImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap();

        assert_eq!(summary.total_created(), 0);
        let name: String = conn
            .query_row("SELECT name FROM accessions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Original");
    }

    #[test]
    fn test_unknown_origin_country_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let wb = passport_file(dir.path(), &["ACC-1\t\t\t\t\tXYZ\tSomewhere\t\t\t"]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let err = PassportImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.natural_key(), Some("ACC-1"));
        assert_eq!(count(&conn, "accessions"), 0);
    }

    #[test]
    fn test_empty_accenumb_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let wb = passport_file(dir.path(), &["\tGBR001\tHordeum\t\t\t\t\t\t\t"]);
        let mut conn = setup_test_db();
        let mut ctx = StageContext::new(ImportConfig::default());

        let err = PassportImporter::new()
            .import(&mut conn, &wb, &mut ctx)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
