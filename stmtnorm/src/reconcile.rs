//! Balance Reconciler: fills in the statement's date and balance bounds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::ValidationError, metadata::Metadata, model::Statement};

/// How an adapter's metadata ties the lines to statement balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No balances in the source; only the date bounds are derived from the lines.
    Unanchored,
    /// A declared closing balance; the opening balance is derived from it.
    AnchorForward,
    /// Declared opening and closing balances.
    DualAnchor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Push the declared closing date out to the last line date when it lags behind.
    pub widen_end_date: bool,
}

pub fn reconcile(
    st: &mut Statement,
    meta: &Metadata,
    strategy: Strategy,
    policy: ReconcilePolicy,
) -> Result<(), ValidationError> {
    let min_date = st.min_line_date();
    let max_date = st.max_line_date();

    match strategy {
        Strategy::Unanchored => {
            st.start_date = min_date;
            st.end_date = max_date.map(day_after);
            st.start_balance = None;
            st.end_balance = None;
        }
        Strategy::AnchorForward | Strategy::DualAnchor => {
            let closing = meta
                .closing_balance
                .as_ref()
                .ok_or(ValidationError::MissingAnchor("closing balance"))?;

            let mut last_day = closing.date;
            if policy.widen_end_date {
                if let Some(max) = max_date.filter(|max| *max > last_day) {
                    warn!(
                        declared = %last_day,
                        last_line = %max,
                        "closing date lags the statement lines; widening"
                    );
                    last_day = max;
                }
            }
            st.end_date = Some(day_after(last_day));
            st.end_balance = Some(closing.amount);
            st.start_date = Some(min_date.unwrap_or(closing.date));
            st.start_balance = Some(match strategy {
                Strategy::DualAnchor => meta
                    .opening_balance
                    .ok_or(ValidationError::MissingAnchor("opening balance"))?,
                _ => st
                    .total_amount()
                    .and_then(|total| closing.amount.checked_sub(total))
                    .ok_or(ValidationError::AmountOverflow)?,
            });
        }
    }

    st.lenient_end_date = policy.widen_end_date;
    Ok(())
}

fn day_after(d: NaiveDate) -> NaiveDate {
    d.succ_opt().unwrap_or(NaiveDate::MAX)
}
