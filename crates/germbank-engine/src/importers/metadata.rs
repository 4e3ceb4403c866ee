//! The dataset a template describes
//!
//! Resolves the experiment, the dataset location and the dataset itself,
//! then links the template's collaborators to the dataset. The dataset id
//! is handed to later stages through [`StageContext::dataset_id`].

#![allow(clippy::result_large_err)]

use std::iter;

use germbank_core::model::{Dataset, ExperimentType, LocationType};
use germbank_core::template::{sheets, MetadataReader};
use germbank_core::Workbook;
use germbank_store::errors::Result;
use germbank_store::repo::keys::{DatasetCollaboratorKey, DatasetKey, LocationKey};
use germbank_store::repo::reference::{
    dataset_key, insert_dataset, insert_dataset_collaborator, insert_experiment, insert_location,
    location_key, preload_by_name, preload_dataset_collaborators, preload_datasets,
    preload_locations,
};
use germbank_store::repo::Countries;
use germbank_store::{Resolver, RollbackReport, RollbackTracker, Table};
use rusqlite::Connection;

use super::{logged, tracked, CollaboratorImporter, Importer, StageContext};
use crate::run::{run_import, ImportSummary, RecordSink};

#[derive(Debug)]
pub struct MetadataImporter {
    experiment_type: ExperimentType,
    tracker: RollbackTracker,
    collaborators: CollaboratorImporter,
    dataset_id: Option<i64>,
}

impl MetadataImporter {
    pub fn new(experiment_type: ExperimentType) -> Self {
        Self {
            experiment_type,
            tracker: RollbackTracker::new(),
            collaborators: CollaboratorImporter::new(),
            dataset_id: None,
        }
    }

    /// Dataset resolved by the last import
    pub fn dataset_id(&self) -> Option<i64> {
        self.dataset_id
    }
}

struct MetadataSink<'a> {
    countries: Countries,
    experiments: Resolver<String>,
    locations: Resolver<LocationKey>,
    datasets: Resolver<DatasetKey>,
    links: Resolver<DatasetCollaboratorKey>,
    collaborator_ids: Vec<i64>,
    tracker: &'a mut RollbackTracker,
    dataset_id: Option<i64>,
}

impl MetadataSink<'_> {
    fn location(&mut self, conn: &Connection, dataset: &Dataset) -> Result<Option<i64>> {
        let Some(location) = &dataset.location else {
            return Ok(None);
        };
        // an unrecognised dataset country is stored as unknown
        let country_id = location
            .country
            .as_ref()
            .and_then(|code| self.countries.lookup(code))
            .unwrap_or_else(|| self.countries.unknown());
        let Some(key) = location_key(location, country_id) else {
            return Ok(None);
        };

        let resolution = self
            .locations
            .resolve_or_create(key, |k| insert_location(conn, k, LocationType::Datasets))?;
        Ok(Some(tracked(self.tracker, Table::Locations, resolution)))
    }
}

impl RecordSink for MetadataSink<'_> {
    type Record = Dataset;

    fn accept(&mut self, conn: &mut Connection, dataset: Dataset) -> Result<()> {
        let experiment = self
            .experiments
            .resolve_or_create(dataset.experiment.name.clone(), |_| {
                insert_experiment(conn, &dataset.experiment)
            })?;
        let experiment_id = tracked(self.tracker, Table::Experiments, experiment);

        let location_id = self.location(conn, &dataset)?;

        let key = dataset_key(&dataset, experiment_id, location_id);
        let resolution = self
            .datasets
            .resolve_or_create(key, |k| insert_dataset(conn, k, &dataset))?;
        let dataset_id = tracked(self.tracker, Table::Datasets, resolution);

        for &collaborator_id in &self.collaborator_ids {
            let key = DatasetCollaboratorKey {
                dataset_id,
                collaborator_id,
            };
            let resolution = self
                .links
                .resolve_or_create(key, |k| insert_dataset_collaborator(conn, k))?;
            tracked(self.tracker, Table::DatasetCollaborators, resolution);
        }

        self.dataset_id = Some(dataset_id);
        Ok(())
    }

    fn finish(&mut self, _conn: &mut Connection) -> Result<()> {
        Ok(())
    }
}

impl Importer for MetadataImporter {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn import(
        &mut self,
        conn: &mut Connection,
        workbook: &Workbook,
        ctx: &mut StageContext,
    ) -> Result<ImportSummary> {
        let run_id = ctx.run_id.clone();

        logged("import_metadata", &run_id, || {
            self.tracker.reset();
            self.dataset_id = None;

            let dataset = MetadataReader::new(self.experiment_type).read(workbook)?;

            // collaborators are optional; a template without the sheet links none
            let collaborator_ids = if workbook.has_sheet(sheets::COLLABORATORS) {
                self.collaborators.import(conn, workbook, ctx)?;
                self.collaborators.collaborator_ids().to_vec()
            } else {
                self.collaborators.tracker_mut().reset();
                Vec::new()
            };

            let mut experiments = Resolver::new(Table::Experiments);
            preload_by_name(&mut experiments, conn)?;
            let mut locations = Resolver::new(Table::Locations);
            preload_locations(&mut locations, conn)?;
            let mut datasets = Resolver::new(Table::Datasets);
            preload_datasets(&mut datasets, conn)?;
            let mut links = Resolver::new(Table::DatasetCollaborators);
            preload_dataset_collaborators(&mut links, conn)?;

            let mut sink = MetadataSink {
                countries: Countries::load(conn)?,
                experiments,
                locations,
                datasets,
                links,
                collaborator_ids,
                tracker: &mut self.tracker,
                dataset_id: None,
            };
            let run = run_import(conn, iter::once(Ok(dataset)), &mut sink, ctx.policy())?;

            self.dataset_id = sink.dataset_id;
            ctx.dataset_id = self.dataset_id;

            let mut summary = ImportSummary::new(self.name(), run, &self.tracker);
            summary.add_created(self.collaborators.tracker());
            Ok(summary)
        })
    }

    fn tracker(&self) -> &RollbackTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut RollbackTracker {
        &mut self.tracker
    }

    /// Dataset rows first, then the collaborators imported alongside them
    fn rollback(&mut self, conn: &Connection) -> RollbackReport {
        let mut report = self.tracker.delete_created(conn);
        report.merge(self.collaborators.rollback(conn));
        report
    }
}
