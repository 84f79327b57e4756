//! ING Netherlands CSV export. Nine columns, one transaction per row:
//!
//! ```text
//! "Datum","Naam / Omschrijving","Rekening","Tegenrekening","Code","Af Bij","Bedrag (EUR)","MutatieSoort","Mededelingen"
//! "20200213","Kosten OranjePakket met korting","NL42INGB0001085276","","DV","Af","1,25","Diversen","1 jan t/m 31 jan 2020 ING BANK N.V. Valutadatum: 13-02-2020"
//! ```
//!
//! The export carries no balances, so the statement only gets date bounds.

use std::io::BufRead;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, trace};

use crate::{
    amount::{parse_marker, signed_amount},
    error::{Error, RecordError},
    metadata::Metadata,
    model::{BankAccount, Transaction},
    reconcile::Strategy,
    traits::{FormatAdapter, Positioned, Records},
};

pub const BANK_ID: &str = "INGBNL2AXXX";
const CURRENCY: &str = "EUR";
const DATE_FORMAT: &str = "%Y%m%d";

/// Header row and debit/credit marker pair of one export language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub header: [&'static str; 9],
    pub markers: (&'static str, &'static str),
}

pub const DUTCH: CsvDialect = CsvDialect {
    header: [
        "Datum",
        "Naam / Omschrijving",
        "Rekening",
        "Tegenrekening",
        "Code",
        "Af Bij",
        "Bedrag (EUR)",
        "MutatieSoort",
        "Mededelingen",
    ],
    markers: ("Af", "Bij"),
};

pub const ENGLISH: CsvDialect = CsvDialect {
    header: [
        "Date",
        "Name / Description",
        "Account",
        "Counterparty",
        "Code",
        "Debit/credit",
        "Amount (EUR)",
        "Transaction type",
        "Notifications",
    ],
    markers: ("Debit", "Credit"),
};

/// Column positions, 0-based.
struct Columns {
    date: usize,
    name: usize,
    account: usize,
    counterparty: usize,
    marker: usize,
    amount: usize,
    notes: usize,
}

const COLUMNS: Columns = Columns {
    date: 0,
    name: 1,
    account: 2,
    counterparty: 3,
    marker: 5,
    amount: 6,
    notes: 8,
};

/// One data row plus the marker pair in force when it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct IngRow {
    pub fields: StringRecord,
    pub markers: (&'static str, &'static str),
}

#[derive(Debug, Clone, Default)]
pub struct IngCsv;

impl IngCsv {
    pub fn new() -> Self {
        IngCsv
    }
}

fn header_dialect(rec: &StringRecord) -> Option<CsvDialect> {
    [DUTCH, ENGLISH]
        .into_iter()
        .find(|d| rec.len() == 9 && rec.iter().zip(d.header).all(|(a, b)| a.trim() == b))
}

fn is_blank(rec: &StringRecord) -> bool {
    rec.iter().all(|f| f.trim().is_empty())
}

impl FormatAdapter for IngCsv {
    type Record = IngRow;

    fn initial_metadata(&self) -> Metadata {
        Metadata {
            bank_id: Some(BANK_ID.to_string()),
            currency: Some(CURRENCY.to_string()),
            ..Metadata::default()
        }
    }

    fn split<'a, R: BufRead + 'a>(&'a self, r: R, meta: &'a mut Metadata) -> Records<'a, IngRow> {
        let rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(r);
        let mut dialect = DUTCH;

        Box::new(rdr.into_records().filter_map(move |rec| {
            let rec = match rec {
                Ok(rec) => rec,
                Err(e) => return Some(Err(Error::from(e))),
            };
            let position = rec.position().map_or(0, |p| p.line() as usize);

            if is_blank(&rec) {
                return None;
            }
            if let Some(d) = header_dialect(&rec) {
                trace!(position, markers = ?d.markers, "header row");
                dialect = d;
                return None;
            }
            if rec.len() != COLUMNS.notes + 1 {
                return Some(Err(Error::at(
                    position,
                    RecordError::Format(format!("expected 9 columns, found {}", rec.len())),
                )));
            }
            if let Err(e) = meta.declare_account_id(rec[COLUMNS.account].trim()) {
                return Some(Err(Error::at(position, e)));
            }

            debug!(position, row = ?rec, "csv record");
            Some(Ok(Positioned::new(
                position,
                IngRow {
                    fields: rec,
                    markers: dialect.markers,
                },
            )))
        }))
    }

    fn normalize(&self, row: IngRow) -> Result<Option<Transaction>, RecordError> {
        let f = &row.fields;
        let marker = parse_marker(f[COLUMNS.marker].trim(), row.markers)?;
        let amount = signed_amount(&f[COLUMNS.amount], marker)?;
        if amount.is_zero() {
            return Ok(None);
        }

        let raw_date = f[COLUMNS.date].trim();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|_| RecordError::Date(raw_date.to_string()))?;

        let name = &f[COLUMNS.name];
        let notes = &f[COLUMNS.notes];
        let counterparty = f[COLUMNS.counterparty].trim();

        let t = if counterparty.is_empty() {
            Transaction::new(date, amount, format!("{name}, {notes}"))
        } else {
            let mut t = Transaction::new(date, amount, notes);
            t.payee = Some(format!("{name} ({counterparty})"));
            t.counterparty_account = Some(BankAccount::counterparty(counterparty));
            t
        };
        Ok(Some(t))
    }

    fn strategy(&self) -> Strategy {
        Strategy::Unanchored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DebitCredit;
    use rust_decimal::Decimal;

    fn row(fields: &[&str]) -> IngRow {
        IngRow {
            fields: StringRecord::from(fields.to_vec()),
            markers: DUTCH.markers,
        }
    }

    #[test]
    fn debit_without_counterparty_prepends_name_to_memo() {
        let t = IngCsv
            .normalize(row(&[
                "20200213", "Kosten", "NL99INGB9999999999", "", "DV", "Af", "1,25", "Diversen",
                "jan 2020",
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(t.amount, Decimal::from_str_exact("-1.25").unwrap());
        assert_eq!(t.trntype, DebitCredit::Debit);
        assert_eq!(t.memo, "Kosten, jan 2020");
        assert_eq!(t.payee, None);
        assert_eq!(t.counterparty_account, None);
    }

    #[test]
    fn unknown_marker_is_rejected() {
        let err = IngCsv
            .normalize(row(&[
                "20200213", "Kosten", "NL99INGB9999999999", "", "DV", "Debit", "1,25", "", "",
            ]))
            .unwrap_err();
        assert!(matches!(err, RecordError::Format(_)));
    }

    #[test]
    fn zero_amount_is_dropped() {
        let out = IngCsv
            .normalize(row(&[
                "20200213", "Kwijtschelding", "NL99INGB9999999999", "", "VZ", "Bij", "0,00", "", "",
            ]))
            .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn english_header_is_recognized() {
        let rec = StringRecord::from(ENGLISH.header.to_vec());
        assert_eq!(header_dialect(&rec), Some(ENGLISH));
    }
}
