//! Deterministic transaction identifiers, unique within one statement.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::Transaction;

/// Content fingerprint over date, memo, amount and payee.
///
/// Every field is length-prefixed, so no two distinct field tuples feed the
/// hasher the same bytes.
pub fn fingerprint(t: &Transaction) -> String {
    let mut hasher = Sha256::new();
    field(&mut hasher, t.date.to_string().as_bytes());
    field(&mut hasher, t.memo.as_bytes());
    field(&mut hasher, t.amount.to_string().as_bytes());
    match t.payee.as_deref() {
        Some(payee) => {
            hasher.update([1u8]);
            field(&mut hasher, payee.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    hex::encode(hasher.finalize())
}

fn field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Assigns identifiers in source order. The n-th repeat of a fingerprint
/// (n >= 1) gets the id `<fingerprint>-n` and ` #<n + 1>` appended to its memo.
#[derive(Debug, Default)]
pub struct IdentityAssigner {
    seen: HashMap<String, u32>,
}

impl IdentityAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, mut t: Transaction) -> Transaction {
        let fp = fingerprint(&t);
        let repeats = self.seen.entry(fp.clone()).or_insert(0);
        if *repeats == 0 {
            t.id = fp;
        } else {
            t.id = format!("{fp}-{repeats}");
            t.memo = format!("{} #{}", t.memo, *repeats + 1);
            debug!(id = %t.id, memo = %t.memo, "disambiguated duplicate transaction");
        }
        *repeats += 1;
        t
    }
}
