//! Public error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("record {position}: {source}")]
    Record {
        /// 1-based line of the offending record in the source.
        position: usize,
        #[source]
        source: RecordError,
    },

    #[error("invalid pattern: {0}")]
    Pattern(String),

    #[error("unknown institution code '{0}' and no institution identifier given")]
    UnknownInstitution(String),

    #[error("invalid statement: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn at(position: usize, source: RecordError) -> Self {
        Error::Record { position, source }
    }

    /// The record error behind this error, if any.
    pub fn record_error(&self) -> Option<&RecordError> {
        match self {
            Error::Record { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failures of a single source record, before its position is known.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("format violation: {0}")]
    Format(String),

    #[error("conflicting {field}: previous '{previous}', this record '{current}'")]
    MetadataConflict {
        field: &'static str,
        previous: String,
        current: String,
    },

    #[error("invalid amount '{0}'")]
    Amount(String),

    #[error("invalid date '{0}'")]
    Date(String),
}

/// The first statement invariant that does not hold, with the values involved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the statement start date should be set")]
    MissingStartDate,

    #[error("the statement end date should be set")]
    MissingEndDate,

    #[error("the source declares no {0}")]
    MissingAnchor(&'static str),

    #[error("the statement amounts overflow the decimal range")]
    AmountOverflow,

    #[error("the statement start date ({start_date}) should be at most the smallest statement line date ({min_date})")]
    StartDateAfterFirstLine {
        start_date: NaiveDate,
        min_date: NaiveDate,
    },

    #[error("the statement end date ({end_date}) should be greater than the largest statement line date ({max_date})")]
    EndDateNotAfterLastLine {
        end_date: NaiveDate,
        max_date: NaiveDate,
    },

    #[error("start balance ({start_balance}) plus the total amount ({total}) should be equal to the end balance ({end_balance})")]
    Unbalanced {
        start_balance: Decimal,
        total: Decimal,
        end_balance: Decimal,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
