//! ICS Cards credit-card statements, read from `pdftotext -layout` output.
//!
//! Columns in the layout text are separated by runs of two or more blanks.
//! Besides transaction rows, the text carries three kinds of declaring rows:
//! the issuer's BIC, a page header followed by the statement date and
//! account number, and a balance header followed by the opening and
//! closing balances with their Af/Bij markers.

use std::io::BufRead;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::{
    amount::{parse_marker, signed_amount},
    dates::{on_or_before, MonthNames},
    error::{Error, RecordError, Result},
    metadata::Metadata,
    model::{Balance, Transaction},
    reconcile::Strategy,
    traits::{FormatAdapter, Positioned, Records},
};

const CURRENCY: &str = "EUR";
const MARKERS: (&str, &str) = ("Af", "Bij");
const BIC_PREFIX: &str = "BIC: ";
const PAGE_HEADER: [&str; 4] = ["Datum", "ICS-klantnummer", "Volgnummer", "Bladnummer"];
const BALANCE_HEADER: [&str; 4] = [
    "Vorig openstaand saldo",
    "Totaal ontvangen betalingen",
    "Totaal nieuwe uitgaven",
    "Nieuw openstaand saldo",
];
/// Width at which pdftotext glues a long merchant name onto the city.
const PAYEE_WIDTH: usize = 25;

/// A transaction row split into columns, with the date of the page it sits on.
#[derive(Debug, Clone, PartialEq)]
pub struct IcsRow {
    pub columns: Vec<String>,
    pub statement_date: NaiveDate,
}

#[derive(Debug)]
pub struct IcsCards {
    months: MonthNames,
    separator: Regex,
    transaction: Regex,
}

impl IcsCards {
    pub fn new(months: MonthNames) -> Result<Self> {
        let separator =
            Regex::new(r"\s\s+|\t|\n").map_err(|e| Error::Pattern(e.to_string()))?;
        let transaction = Regex::new(r"^\d\d [a-z]{3}\s+\d\d [a-z]{3}.+[0-9,.]+\s+(Af|Bij)$")
            .map_err(|e| Error::Pattern(e.to_string()))?;
        Ok(IcsCards {
            months,
            separator,
            transaction,
        })
    }

    /// Dutch month names, as printed on the statements.
    pub fn dutch() -> Result<Self> {
        Self::new(MonthNames::dutch())
    }

    fn columns(&self, line: &str) -> Vec<String> {
        self.separator.split(line).map(str::to_string).collect()
    }
}

/// Which declaring row the next line is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Anything,
    PageFacts,
    Balances,
}

/// Splits `04 sep | 05 sep | NEWREST WAGONS LITS FRANCPARIS | FR | ...`
/// into payee `NEWREST WAGONS LITS FRANC` and place `PARIS`.
fn resplit_glued_payee(row: &mut Vec<String>) {
    if (6..=7).contains(&row.len()) && row[2].chars().count() > PAYEE_WIDTH {
        let cut = row[2]
            .char_indices()
            .nth(PAYEE_WIDTH)
            .map_or(row[2].len(), |(i, _)| i);
        let place = row[2].split_off(cut);
        row.insert(3, place);
    }
}

fn balance(amount: &str, marker: &str) -> std::result::Result<Decimal, RecordError> {
    signed_amount(amount, parse_marker(marker, MARKERS)?)
}

impl FormatAdapter for IcsCards {
    type Record = IcsRow;

    fn initial_metadata(&self) -> Metadata {
        Metadata {
            currency: Some(CURRENCY.to_string()),
            ..Metadata::default()
        }
    }

    fn split<'a, R: BufRead + 'a>(&'a self, r: R, meta: &'a mut Metadata) -> Records<'a, IcsRow> {
        let mut expect = Expect::Anything;
        let mut statement_date: Option<NaiveDate> = None;

        Box::new(r.lines().enumerate().filter_map(move |(i, line)| {
            let position = i + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::from(e))),
            };
            let line = line.trim();
            let mut row = self.columns(line);

            let declared = match expect {
                Expect::PageFacts => {
                    expect = Expect::Anything;
                    self.page_facts(&row, meta).map(|date| {
                        trace!(position, %date, "statement page");
                        statement_date = Some(date);
                    })
                }
                Expect::Balances => {
                    expect = Expect::Anything;
                    self.balances(&row, statement_date, meta)
                }
                Expect::Anything if row == PAGE_HEADER => {
                    expect = Expect::PageFacts;
                    Ok(())
                }
                Expect::Anything if row == BALANCE_HEADER => {
                    expect = Expect::Balances;
                    Ok(())
                }
                Expect::Anything if row.len() == 2 && row[1].starts_with(BIC_PREFIX) => {
                    meta.declare_bank_id(&row[1][BIC_PREFIX.len()..])
                }
                Expect::Anything if self.transaction.is_match(line) => {
                    if !(5..=8).contains(&row.len()) {
                        return Some(Err(Error::at(
                            position,
                            RecordError::Format(format!(
                                "transaction row has {} columns, expected 5 to 8",
                                row.len()
                            )),
                        )));
                    }
                    let Some(statement_date) = statement_date else {
                        return Some(Err(Error::at(
                            position,
                            RecordError::Format("transaction row before the statement date".into()),
                        )));
                    };
                    resplit_glued_payee(&mut row);
                    debug!(position, ?row, "transaction row");
                    return Some(Ok(Positioned::new(
                        position,
                        IcsRow {
                            columns: row,
                            statement_date,
                        },
                    )));
                }
                Expect::Anything => Ok(()),
            };

            declared.err().map(|e| Err(Error::at(position, e)))
        }))
    }

    fn normalize(&self, row: IcsRow) -> std::result::Result<Option<Transaction>, RecordError> {
        let c = &row.columns;
        let n = c.len();
        if ![5, 7, 8].contains(&n) {
            return Err(RecordError::Format(format!(
                "transaction row has {n} columns, expected 5, 7 or 8"
            )));
        }

        let amount = balance(&c[n - 2], &c[n - 1])?;
        if amount.is_zero() {
            return Ok(None);
        }

        // booking date; the transaction date in column 0 does not balance
        let (day, month) = self.months.parse_day_month(&c[1])?;
        let date = on_or_before(row.statement_date, month, day)?;

        let t = if n >= 7 {
            let mut t = Transaction::new(date, amount, format!("{} ({})", c[3], c[4]));
            t.payee = Some(c[2].clone());
            t
        } else {
            Transaction::new(date, amount, c[2].clone())
        };
        Ok(Some(t))
    }

    fn strategy(&self) -> Strategy {
        Strategy::DualAnchor
    }
}

impl IcsCards {
    /// `17 september 2019 | 99999999999 | 9 | 1 van 2`
    fn page_facts(
        &self,
        row: &[String],
        meta: &mut Metadata,
    ) -> std::result::Result<NaiveDate, RecordError> {
        let [date, account, ..] = row else {
            return Err(RecordError::Format(
                "page header not followed by date and account".into(),
            ));
        };
        let date = self.months.parse_long_date(date)?;
        meta.declare_account_id(account)?;
        Ok(date)
    }

    /// `€ 1.311,73 | Af | € 1.311,73 | Bij | € 1.320,55 | Af | € 1.320,55 | Af`
    fn balances(
        &self,
        row: &[String],
        statement_date: Option<NaiveDate>,
        meta: &mut Metadata,
    ) -> std::result::Result<(), RecordError> {
        let (Some(date), [open, open_mark, .., close, close_mark]) = (statement_date, row) else {
            return Err(RecordError::Format(
                "balance header not followed by opening and closing balances".into(),
            ));
        };
        meta.declare_opening_balance(balance(open, open_mark)?)?;
        meta.declare_closing_balance(Balance {
            date,
            amount: balance(close, close_mark)?,
            currency: CURRENCY.to_string(),
        })
    }
}
