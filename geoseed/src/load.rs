//! Bulk address loading from CSV.
//!
//! Files follow the OpenAddresses column layout:
//! `LON,LAT,NUMBER,STREET,UNIT,CITY,DISTRICT,REGION,POSTCODE`.

use anyhow::Context;
use geoseed_core::{Address, GeoPoint};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct AddressRecord {
    lon: f64,
    lat: f64,
    #[serde(default)]
    number: String,
    #[serde(default)]
    street: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    postcode: String,
}

/// Reads addresses from CSV, one row at a time.
pub struct AddressReader<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, AddressRecord>,
    postal: Option<String>,
    row: u64,
}

impl<R: Read> AddressReader<R> {
    /// The header row is required. With `postal` set, every postcode is
    /// written as `{postal}-{postcode}`.
    pub fn new(reader: R, postal: Option<String>) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_deserialize();
        Self {
            records,
            postal,
            row: 0,
        }
    }

    /// Data rows read so far, not counting the header.
    pub fn rows_read(&self) -> u64 {
        self.row
    }

    fn to_address(&self, record: AddressRecord) -> anyhow::Result<Address> {
        let point = GeoPoint::new(record.lon, record.lat)
            .with_context(|| format!("row {}: bad coordinates", self.row))?;
        let postcode = match &self.postal {
            Some(prefix) => format!("{prefix}-{}", record.postcode),
            None => record.postcode,
        };
        Ok(Address {
            id: 0,
            point,
            number: record.number,
            street: record.street,
            unit: record.unit,
            city: record.city,
            district: record.district,
            region: record.region,
            postcode,
        })
    }
}

impl<R: Read> Iterator for AddressReader<R> {
    type Item = anyhow::Result<Address>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.row += 1;
        Some(
            record
                .with_context(|| format!("row {}: unreadable record", self.row))
                .and_then(|record| self.to_address(record)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
LON,LAT,NUMBER,STREET,UNIT,CITY,DISTRICT,REGION,POSTCODE
11.4004554,47.2369399,12,Maria-Theresien-Strasse,,Innsbruck,,Tirol,6020
11.8686483,47.2261598,3a,Dorfstrasse,2,Fuegen,Schwaz,Tirol,6263
";

    #[test]
    fn test_reads_rows_in_order() {
        let addresses: Vec<Address> = AddressReader::new(SAMPLE.as_bytes(), None)
            .collect::<anyhow::Result<_>>()
            .unwrap();

        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].point, GeoPoint { lon: 11.4004554, lat: 47.2369399 });
        assert_eq!(addresses[0].street, "Maria-Theresien-Strasse");
        assert_eq!(addresses[0].unit, "");
        assert_eq!(addresses[0].postcode, "6020");
        assert_eq!(addresses[1].number, "3a");
        assert_eq!(addresses[1].district, "Schwaz");
    }

    #[test]
    fn test_postal_prefix() {
        let addresses: Vec<Address> = AddressReader::new(SAMPLE.as_bytes(), Some("AT".into()))
            .collect::<anyhow::Result<_>>()
            .unwrap();
        assert_eq!(addresses[0].postcode, "AT-6020");
        assert_eq!(addresses[1].postcode, "AT-6263");
    }

    #[test]
    fn test_bad_row_reports_row_number() {
        let csv = "\
LON,LAT,NUMBER,STREET,UNIT,CITY,DISTRICT,REGION,POSTCODE
11.4,47.2,1,A,,B,,C,1
north,47.2,2,A,,B,,C,1
";
        let mut reader = AddressReader::new(csv.as_bytes(), None);
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
        assert!(reader.next().is_none());
        assert_eq!(reader.rows_read(), 2);
    }

    #[test]
    fn test_out_of_range_latitude() {
        let csv = "\
LON,LAT,NUMBER,STREET,UNIT,CITY,DISTRICT,REGION,POSTCODE
11.4,97.2,1,A,,B,,C,1
";
        let err = AddressReader::new(csv.as_bytes(), None)
            .next()
            .unwrap()
            .unwrap_err();
        assert!(format!("{err:#}").contains("Latitude 97.2"));
    }
}
