//! MCPD passport sheet
//!
//! The header row names the MCPD descriptors; column order is free and
//! unknown columns are ignored. Works on a workbook `DATA` sheet and on a
//! plain tab-delimited file alike.

use csv::StringRecord;

use super::sheets::DATA;
use super::values;
use super::workbook::{cell, Columns, SheetStream};
use super::Workbook;
use crate::errors::TemplateError;
use crate::model::{
    Accession, CountryCode, EntityType, Institution, Location, LocationType, PassportEntry,
    Taxonomy,
};

/// MCPD descriptor names
pub mod mcpd {
    pub const PUID: &str = "PUID";
    pub const INSTCODE: &str = "INSTCODE";
    pub const ACCENUMB: &str = "ACCENUMB";
    pub const COLLNUMB: &str = "COLLNUMB";
    pub const COLLCODE: &str = "COLLCODE";
    pub const COLLNAME: &str = "COLLNAME";
    pub const COLLINSTADDRESS: &str = "COLLINSTADDRESS";
    pub const COLLMISSID: &str = "COLLMISSID";
    pub const GENUS: &str = "GENUS";
    pub const SPECIES: &str = "SPECIES";
    pub const SPAUTHOR: &str = "SPAUTHOR";
    pub const CROPNAME: &str = "CROPNAME";
    pub const ACCENAME: &str = "ACCENAME";
    pub const ACQDATE: &str = "ACQDATE";
    pub const ORIGCTY: &str = "ORIGCTY";
    pub const COLLSITE: &str = "COLLSITE";
    pub const DECLATITUDE: &str = "DECLATITUDE";
    pub const LATITUDE: &str = "LATITUDE";
    pub const DECLONGITUDE: &str = "DECLONGITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const ELEVATION: &str = "ELEVATION";
    pub const COLLDATE: &str = "COLLDATE";
    pub const BREDCODE: &str = "BREDCODE";
    pub const BREDNAME: &str = "BREDNAME";
    pub const SAMPSTAT: &str = "SAMPSTAT";
    pub const ANCEST: &str = "ANCEST";
    pub const DONORCODE: &str = "DONORCODE";
    pub const DONORNAME: &str = "DONORNAME";
    pub const DONORNUMB: &str = "DONORNUMB";
    pub const OTHERNUMB: &str = "OTHERNUMB";
    pub const DUPLSITE: &str = "DUPLSITE";
    pub const DUPLINSTNAME: &str = "DUPLINSTNAME";
    pub const REMARKS: &str = "REMARKS";
}

/// Streams one [`PassportEntry`] per non-blank row
pub struct PassportReader {
    rows: SheetStream,
    columns: Columns,
}

impl PassportReader {
    pub fn open(workbook: &Workbook) -> Result<Self, TemplateError> {
        let mut rows = workbook.stream(DATA)?;
        let columns = match rows.next().transpose()? {
            Some((_, header)) => Columns::from_cells(header.iter()),
            None => Columns::default(),
        };
        if !columns.contains(mcpd::ACCENUMB) {
            return Err(TemplateError::MissingColumn {
                sheet: DATA.to_string(),
                column: mcpd::ACCENUMB.to_string(),
            });
        }
        Ok(Self { rows, columns })
    }

    fn parse(&self, row: usize, record: &StringRecord) -> Result<PassportEntry, TemplateError> {
        let field = |name: &str| self.columns.index(name).and_then(|c| cell(record, c));
        let text = |name: &str| field(name).map(str::to_string);

        let general_identifier = text(mcpd::ACCENUMB).ok_or_else(|| TemplateError::MissingValue {
            sheet: DATA.to_string(),
            row,
            field: mcpd::ACCENUMB.to_string(),
        })?;

        let institution = text(mcpd::INSTCODE).map(|code| Institution {
            name: Some(code.clone()),
            code: Some(code),
            acronym: None,
            address: text(mcpd::COLLINSTADDRESS),
            country: None,
        });

        let location = text(mcpd::COLLSITE).map(|site| Location {
            site_name: Some(site),
            site_name_short: None,
            elevation: values::float(field(mcpd::ELEVATION)),
            latitude: values::coordinate(field(mcpd::DECLATITUDE), field(mcpd::LATITUDE)),
            longitude: values::coordinate(field(mcpd::DECLONGITUDE), field(mcpd::LONGITUDE)),
            country: text(mcpd::ORIGCTY).map(CountryCode::Alpha3),
            location_type: LocationType::CollectingSites,
        });

        let accession = Accession {
            name: text(mcpd::ACCENAME).unwrap_or_else(|| general_identifier.clone()),
            number: Some(general_identifier.clone()),
            general_identifier,
            puid: text(mcpd::PUID),
            collector_number: text(mcpd::COLLNUMB),
            collector_code: text(mcpd::COLLCODE),
            collector_name: text(mcpd::COLLNAME),
            collecting_mission: text(mcpd::COLLMISSID),
            acquisition_date: text(mcpd::ACQDATE),
            collecting_date: values::date(field(mcpd::COLLDATE)),
            breeders_code: text(mcpd::BREDCODE),
            breeders_name: text(mcpd::BREDNAME),
            biological_status: values::integer(field(mcpd::SAMPSTAT)),
            donor_code: text(mcpd::DONORCODE),
            donor_name: text(mcpd::DONORNAME),
            donor_number: text(mcpd::DONORNUMB),
            other_numbers: text(mcpd::OTHERNUMB),
            duplicate_site: text(mcpd::DUPLSITE),
            duplicate_institution: text(mcpd::DUPLINSTNAME),
            institution,
            taxonomy: Taxonomy {
                genus: text(mcpd::GENUS),
                species: text(mcpd::SPECIES),
                species_author: text(mcpd::SPAUTHOR),
                crop_name: text(mcpd::CROPNAME),
            },
            location,
            entity_type: EntityType::Accession,
        };

        Ok(PassportEntry {
            synonyms: values::split_list(field(mcpd::OTHERNUMB)),
            remarks: text(mcpd::REMARKS),
            ancestry: text(mcpd::ANCEST),
            accession,
        })
    }
}

impl Iterator for PassportReader {
    type Item = Result<PassportEntry, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (row, record) = match self.rows.next()? {
                Ok(next) => next,
                Err(e) => return Some(Err(e)),
            };
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            return Some(self.parse(row, &record));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ACCENUMB\tINSTCODE\tGENUS\tSPECIES\tACCENAME\tORIGCTY\tCOLLSITE\tLATITUDE\tDECLONGITUDE\tOTHERNUMB\tREMARKS\tANCEST\tCOLLDATE\tSAMPSTAT";

    fn passport_file(rows: &[&str]) -> (tempfile::TempDir, Workbook) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.txt");
        let mut content = format!("# MCPD\n{}\n", HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        let wb = Workbook::open(&path).unwrap();
        (dir, wb)
    }

    #[test]
    fn test_parses_mcpd_row() {
        let (_dir, wb) = passport_file(&[
            "ACC-1\tGBR001\tHordeum\tvulgare\tGolden Promise\tGBR\tInvergowrie\t562900N\t-3.1\tCGN 1; PI 22\tsix-row\tBowman/Proctor\t19980512\t500",
        ]);

        let entries: Vec<_> = PassportReader::open(&wb)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        let accession = &entry.accession;
        assert_eq!(accession.general_identifier, "ACC-1");
        assert_eq!(accession.name, "Golden Promise");
        assert_eq!(accession.biological_status, Some(500));
        assert_eq!(accession.taxonomy.genus.as_deref(), Some("Hordeum"));
        assert_eq!(
            accession.institution.as_ref().and_then(|i| i.code.as_deref()),
            Some("GBR001")
        );

        let location = accession.location.as_ref().unwrap();
        assert_eq!(location.country, Some(CountryCode::Alpha3("GBR".to_string())));
        assert!((location.latitude.unwrap() - (56.0 + 29.0 / 60.0)).abs() < 1e-9);
        assert_eq!(location.longitude, Some(-3.1));

        assert_eq!(entry.synonyms, vec!["CGN 1".to_string(), "PI 22".to_string()]);
        assert_eq!(entry.remarks.as_deref(), Some("six-row"));
        assert_eq!(entry.ancestry.as_deref(), Some("Bowman/Proctor"));
    }

    #[test]
    fn test_sparse_row_has_no_location_or_institution() {
        let (_dir, wb) = passport_file(&["ACC-2"]);
        let entry = PassportReader::open(&wb).unwrap().next().unwrap().unwrap();

        assert!(entry.accession.location.is_none());
        assert!(entry.accession.institution.is_none());
        assert!(entry.accession.taxonomy.is_empty());
        assert_eq!(entry.accession.name, "ACC-2");
        assert!(entry.synonyms.is_empty());
    }

    #[test]
    fn test_empty_accenumb_is_reported() {
        let (_dir, wb) = passport_file(&["\tGBR001"]);
        let first = PassportReader::open(&wb).unwrap().next().unwrap();
        assert!(
            matches!(first, Err(TemplateError::MissingValue { ref field, .. }) if field == "ACCENUMB")
        );
    }

    #[test]
    fn test_header_without_accenumb() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DATA.tsv"), "PUID\tGENUS\n").unwrap();
        let wb = Workbook::open(dir.path()).unwrap();

        assert!(matches!(
            PassportReader::open(&wb),
            Err(TemplateError::MissingColumn { .. })
        ));
    }
}
