//! Reading capability shared by all formats, built on `std::io::BufRead`.

use std::io::BufRead;

use crate::{
    error::{RecordError, Result},
    metadata::Metadata,
    model::{Statement, Transaction},
    reconcile::{ReconcilePolicy, Strategy},
};

/// A raw record tagged with its 1-based line in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Positioned<T> {
    pub position: usize,
    pub record: T,
}

impl<T> Positioned<T> {
    pub fn new(position: usize, record: T) -> Self {
        Positioned { position, record }
    }
}

pub type Records<'a, T> = Box<dyn Iterator<Item = Result<Positioned<T>>> + 'a>;

/// One source format: a tokenizer plus a record-to-transaction mapping.
pub trait FormatAdapter {
    type Record;

    /// Metadata known before reading any input (fixed institution, currency, ...).
    fn initial_metadata(&self) -> Metadata {
        Metadata::default()
    }

    /// Lazily splits the input into raw records, filling in `meta` as
    /// declaring lines go by. Errors already carry their position.
    fn split<'a, R: BufRead + 'a>(
        &'a self,
        r: R,
        meta: &'a mut Metadata,
    ) -> Records<'a, Self::Record>;

    /// Maps one raw record; `Ok(None)` means the record carries no money.
    fn normalize(
        &self,
        record: Self::Record,
    ) -> std::result::Result<Option<Transaction>, RecordError>;

    fn strategy(&self) -> Strategy;

    fn policy(&self) -> ReconcilePolicy {
        ReconcilePolicy::default()
    }
}

pub trait ReadFormat {
    fn read<R: BufRead>(&self, r: R) -> Result<Statement>;
}

impl<A: FormatAdapter> ReadFormat for A {
    fn read<R: BufRead>(&self, r: R) -> Result<Statement> {
        crate::pipeline::run(self, r)
    }
}
