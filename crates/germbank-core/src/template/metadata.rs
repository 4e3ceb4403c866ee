//! `METADATA` and `LOCATION` sheets

use serde_json::{Map, Value};

use super::sheets::{LOCATION, METADATA};
use super::values;
use super::{BatchReader, Sheet, Workbook};
use crate::errors::TemplateError;
use crate::model::{CountryCode, Dataset, Experiment, ExperimentType, Location, LocationType};

const VALUE_COL: usize = 2;
const TITLE_ROW: usize = 1;
const DESCRIPTION_ROW: usize = 2;
const DATE_ROW: usize = 4;
const CONTACT_ROW: usize = 11;

/// Dublin-Core field names in sheet order, starting at row 1
const DUBLIN_CORE: [&str; 10] = [
    "title",
    "description",
    "rights",
    "date",
    "publisher",
    "format",
    "language",
    "source",
    "type",
    "subject",
];

/// Reads the single dataset a template describes
#[derive(Debug, Clone, Copy)]
pub struct MetadataReader {
    experiment_type: ExperimentType,
}

impl MetadataReader {
    pub fn new(experiment_type: ExperimentType) -> Self {
        Self { experiment_type }
    }

    pub fn read(&self, workbook: &Workbook) -> Result<Dataset, TemplateError> {
        let sheet = workbook.sheet(METADATA)?;
        let value = |row: usize| sheet.cell(row, VALUE_COL);

        let name = value(TITLE_ROW)
            .map(str::to_string)
            .ok_or_else(|| TemplateError::MissingValue {
                sheet: METADATA.to_string(),
                row: TITLE_ROW,
                field: "title".to_string(),
            })?;
        let description = values::text(value(DESCRIPTION_ROW));

        let location = match workbook.optional_sheet(LOCATION)? {
            Some(location_sheet) => parse_location(&location_sheet),
            None => None,
        };

        Ok(Dataset {
            name: name.clone(),
            description: description.clone(),
            date_start: values::date(value(DATE_ROW)),
            contact: values::text(value(CONTACT_ROW)),
            dublin_core: dublin_core(&sheet),
            version: Some("1".to_string()),
            experiment: Experiment {
                name,
                description,
                experiment_type: self.experiment_type,
            },
            location,
        })
    }
}

impl BatchReader for MetadataReader {
    type Record = Dataset;

    fn read_all(&self, workbook: &Workbook) -> Result<Vec<Dataset>, TemplateError> {
        self.read(workbook).map(|d| vec![d])
    }
}

/// Compact JSON of the non-empty Dublin-Core fields, each a one-element array
fn dublin_core(sheet: &Sheet) -> Option<String> {
    let fields: Map<String, Value> = DUBLIN_CORE
        .iter()
        .enumerate()
        .filter_map(|(i, key)| {
            sheet
                .cell(TITLE_ROW + i, VALUE_COL)
                .map(|v| (key.to_string(), Value::Array(vec![Value::String(v.to_string())])))
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields).to_string())
    }
}

fn parse_location(sheet: &Sheet) -> Option<Location> {
    let row = sheet.data_rows().next()?;
    let location = Location {
        site_name: values::text(row.get(0)),
        site_name_short: values::text(row.get(1)),
        country: values::text(row.get(2)).map(CountryCode::Alpha2),
        elevation: values::float(row.get(3)),
        latitude: values::float(row.get(4)),
        longitude: values::float(row.get(5)),
        location_type: LocationType::Datasets,
    };
    location.is_named().then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const METADATA_SHEET: &str = "Label\tDescription\tValue\n\
        Title\t\tTrials dataset\n\
        Description\t\tField trial\n\
        Rights\t\tCC-BY-SA\n\
        Date\t\t2015-06-23\n\
        Publisher\t\t\n\
        Format\t\t\n\
        Language\t\ten\n\
        Source\t\t\n\
        Type\t\t\n\
        Subject\t\t\n\
        Contact\t\tjane@example.org\n";

    fn workbook(with_location: bool) -> (tempfile::TempDir, Workbook) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("METADATA.tsv"), METADATA_SHEET).unwrap();
        if with_location {
            std::fs::write(
                dir.path().join("LOCATION.tsv"),
                "Site\tShort\tCountry\tElevation\tLat\tLon\nBalruddery Farm\tBal\tGB\t40\t56.48\t-3.13\n",
            )
            .unwrap();
        }
        let wb = Workbook::open(dir.path()).unwrap();
        (dir, wb)
    }

    #[test]
    fn test_reads_dataset_fields() {
        let (_dir, wb) = workbook(true);
        let dataset = MetadataReader::new(ExperimentType::Trials).read(&wb).unwrap();

        assert_eq!(dataset.name, "Trials dataset");
        assert_eq!(dataset.experiment.name, "Trials dataset");
        assert_eq!(dataset.experiment.experiment_type, ExperimentType::Trials);
        assert_eq!(dataset.description.as_deref(), Some("Field trial"));
        assert_eq!(dataset.date_start, NaiveDate::from_ymd_opt(2015, 6, 23));
        assert_eq!(dataset.contact.as_deref(), Some("jane@example.org"));
        assert_eq!(dataset.version.as_deref(), Some("1"));

        let location = dataset.location.unwrap();
        assert_eq!(location.site_name.as_deref(), Some("Balruddery Farm"));
        assert_eq!(location.country, Some(CountryCode::Alpha2("GB".to_string())));
        assert_eq!(location.latitude, Some(56.48));
    }

    #[test]
    fn test_dublin_core_is_compact_json() {
        let (_dir, wb) = workbook(false);
        let dataset = MetadataReader::new(ExperimentType::Compound).read(&wb).unwrap();
        let blob = dataset.dublin_core.unwrap();

        assert!(blob.contains("\"rights\":[\"CC-BY-SA\"]"));
        assert!(!blob.contains("publisher"));
        let parsed: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(parsed["title"][0], "Trials dataset");
        assert_eq!(parsed["language"], serde_json::json!(["en"]));
        assert!(dataset.location.is_none());
    }

    #[test]
    fn test_missing_title_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("METADATA.tsv"), "Label\tDescription\tValue\nTitle\t\t\n").unwrap();
        let wb = Workbook::open(dir.path()).unwrap();

        let err = MetadataReader::new(ExperimentType::Trials).read(&wb).unwrap_err();
        assert!(matches!(err, TemplateError::MissingValue { row: 1, .. }));
    }

    #[test]
    fn test_missing_metadata_sheet() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DATA.tsv"), "x\n").unwrap();
        let wb = Workbook::open(dir.path()).unwrap();

        let err = MetadataReader::new(ExperimentType::Trials).read_all(&wb).unwrap_err();
        assert!(matches!(err, TemplateError::MissingSheet { .. }));
    }
}
