//! stmtnorm: turns bank statement exports (ING CSV, ICS Cards PDF text, MT940)
//! into one reconciled, validated statement with stable transaction ids.

pub mod amount;
pub mod config;
pub mod dates;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod traits;
pub mod validate;

pub mod formats {
    pub mod icscards;
    pub mod ing_csv;
    pub mod mt940;
}
