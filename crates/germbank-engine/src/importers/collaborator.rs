//! Collaborators and their institutions

#![allow(clippy::result_large_err)]

use germbank_core::model::{Collaborator, Institution};
use germbank_core::template::CollaboratorReader;
use germbank_core::{BatchReader, Workbook};
use germbank_core_types::RunId;
use germbank_store::errors::{invalid_input, Result};
use germbank_store::repo::keys::{CollaboratorKey, InstitutionKey};
use germbank_store::repo::reference::{
    institution_key, insert_collaborator, insert_institution, preload_collaborators,
    preload_institutions,
};
use germbank_store::repo::Countries;
use germbank_store::{Resolver, RollbackTracker, Table};
use rusqlite::Connection;

use super::{logged, tracked, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug, Default)]
pub struct CollaboratorImporter {
    tracker: RollbackTracker,
    collaborator_ids: Vec<i64>,
}

impl CollaboratorImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every collaborator named by the last import, created or found
    pub fn collaborator_ids(&self) -> &[i64] {
        &self.collaborator_ids
    }
}

struct CollaboratorSink<'a> {
    countries: Countries,
    institutions: Resolver<InstitutionKey>,
    collaborators: Resolver<CollaboratorKey>,
    tracker: &'a mut RollbackTracker,
    ids: &'a mut Vec<i64>,
}

impl CollaboratorSink<'_> {
    fn institution(&mut self, conn: &Connection, institution: &Institution) -> Result<i64> {
        let country_id = match &institution.country {
            Some(code) => self.countries.lookup(code).ok_or_else(|| {
                invalid_input(
                    "import_collaborators",
                    format!("Unknown country code '{}'", code.as_str()),
                )
                .with_table(Table::Institutions.name())
                .with_natural_key(institution.name.clone().unwrap_or_default())
            })?,
            None => self.countries.unknown(),
        };

        let key = institution_key(institution, country_id);
        let acronym = institution.acronym.as_deref();
        let resolution = self
            .institutions
            .resolve_or_create(key, |k| insert_institution(conn, k, acronym))?;
        Ok(tracked(self.tracker, Table::Institutions, resolution))
    }
}

impl RecordSink for CollaboratorSink<'_> {
    type Record = Collaborator;

    fn accept(&mut self, conn: &mut Connection, collaborator: Collaborator) -> Result<()> {
        let institution_id = match &collaborator.institution {
            Some(institution) => Some(self.institution(conn, institution)?),
            None => None,
        };

        let key = CollaboratorKey {
            first_name: collaborator.first_name,
            last_name: collaborator.last_name,
            email: collaborator.email,
            phone: collaborator.phone,
            institution_id,
        };
        let resolution = self
            .collaborators
            .resolve_or_create(key, |k| insert_collaborator(conn, k))?;
        let id = tracked(self.tracker, Table::Collaborators, resolution);

        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        Ok(())
    }

    fn finish(&mut self, _conn: &mut Connection) -> Result<()> {
        Ok(())
    }
}

impl Importer for CollaboratorImporter {
    fn name(&self) -> &'static str {
        "collaborators"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id: RunId = ctx.run_id.clone();
        let policy = ctx.policy();

        logged("import_collaborators", &run_id, || {
            self.tracker.reset();
            self.collaborator_ids.clear();

            let records = CollaboratorReader.read_all(workbook)?;

            let mut institutions = Resolver::new(Table::Institutions);
            preload_institutions(&mut institutions, conn)?;
            let mut collaborators = Resolver::new(Table::Collaborators);
            preload_collaborators(&mut collaborators, conn)?;

            let mut sink = CollaboratorSink {
                countries: Countries::load(conn)?,
                institutions,
                collaborators,
                tracker: &mut self.tracker,
                ids: &mut self.collaborator_ids,
            };
            let run = run_import(conn, records.into_iter().map(Ok), &mut sink, policy)?;

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
