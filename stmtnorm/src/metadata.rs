//! Statement-level facts discovered by a format adapter while it splits records.

use std::fmt::Display;

use rust_decimal::Decimal;
use tracing::trace;

use crate::{error::RecordError, model::Balance};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub bank_id: Option<String>,
    pub account_id: Option<String>,
    pub currency: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Balance>,
}

impl Metadata {
    pub fn declare_bank_id(&mut self, value: &str) -> Result<(), RecordError> {
        declare(&mut self.bank_id, "institution identifier", value.to_string())
    }

    pub fn declare_account_id(&mut self, value: &str) -> Result<(), RecordError> {
        declare(&mut self.account_id, "account identifier", value.to_string())
    }

    pub fn declare_currency(&mut self, value: &str) -> Result<(), RecordError> {
        declare(&mut self.currency, "currency", value.to_string())
    }

    pub fn declare_opening_balance(&mut self, value: Decimal) -> Result<(), RecordError> {
        declare(&mut self.opening_balance, "opening balance", value)
    }

    pub fn declare_closing_balance(&mut self, value: Balance) -> Result<(), RecordError> {
        match &self.closing_balance {
            Some(previous) if *previous != value => Err(RecordError::MetadataConflict {
                field: "closing balance",
                previous: describe(previous),
                current: describe(&value),
            }),
            Some(_) => Ok(()),
            None => {
                self.closing_balance = Some(value);
                Ok(())
            }
        }
    }

    /// Later closing balances supersede earlier ones (one per message in MT940 files).
    pub fn supersede_closing_balance(&mut self, value: Balance) {
        trace!(date = %value.date, amount = %value.amount, "closing balance");
        self.closing_balance = Some(value);
    }
}

fn describe(b: &Balance) -> String {
    format!("{} {} on {}", b.currency, b.amount, b.date)
}

/// First sighting wins; an equal second sighting is fine, a different one is a conflict.
fn declare<T: PartialEq + Display>(
    slot: &mut Option<T>,
    field: &'static str,
    value: T,
) -> Result<(), RecordError> {
    match slot {
        Some(previous) if *previous != value => Err(RecordError::MetadataConflict {
            field,
            previous: previous.to_string(),
            current: value.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            trace!(field, %value, "declared");
            *slot = Some(value);
            Ok(())
        }
    }
}
