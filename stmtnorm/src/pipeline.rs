//! Drives one parse: split, normalize, identify, reconcile, validate.

use std::io::BufRead;

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    formats::{icscards::IcsCards, ing_csv::IngCsv, mt940::Mt940},
    identity::IdentityAssigner,
    model::{AccountType, Statement},
    reconcile::reconcile,
    traits::{FormatAdapter, Positioned, ReadFormat},
    validate::validate,
};

/// The supported source formats, one variant per family.
#[derive(Debug)]
pub enum Format {
    /// Delimited-text bank export.
    Delimited(IngCsv),
    /// Table text from a layout-preserving PDF conversion.
    Table(IcsCards),
    /// SWIFT MT940 message text.
    Message(Mt940),
}

impl ReadFormat for Format {
    fn read<R: BufRead>(&self, r: R) -> Result<Statement> {
        match self {
            Format::Delimited(a) => run(a, r),
            Format::Table(a) => run(a, r),
            Format::Message(a) => run(a, r),
        }
    }
}

pub fn run<A: FormatAdapter, R: BufRead>(adapter: &A, r: R) -> Result<Statement> {
    let mut meta = adapter.initial_metadata();
    let mut ids = IdentityAssigner::new();
    let mut lines = Vec::new();

    for item in adapter.split(r, &mut meta) {
        let Positioned { position, record } = item?;
        match adapter
            .normalize(record)
            .map_err(|e| Error::at(position, e))?
        {
            Some(t) => lines.push(ids.assign(t)),
            None => debug!(position, "zero-amount record dropped"),
        }
    }

    let mut st = Statement {
        bank_id: meta.bank_id.clone(),
        account_id: meta.account_id.clone(),
        account_type: AccountType::Checking,
        currency: meta.currency.clone().unwrap_or_default(),
        start_date: None,
        start_balance: None,
        end_date: None,
        end_balance: None,
        lenient_end_date: false,
        lines,
    };
    reconcile(&mut st, &meta, adapter.strategy(), adapter.policy())?;
    validate(&st)?;

    info!(
        account = st.account_id.as_deref().unwrap_or("?"),
        lines = st.lines.len(),
        start_date = ?st.start_date,
        end_date = ?st.end_date,
        start_balance = ?st.start_balance,
        end_balance = ?st.end_balance,
        "statement parsed"
    );
    Ok(st)
}
