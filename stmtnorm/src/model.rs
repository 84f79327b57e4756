//! Canonical domain model shared by every source format.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder memo for records whose source offers no narrative.
pub const UNKNOWN_MEMO: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DebitCredit {
    Debit,
    Credit,
}

impl DebitCredit {
    pub fn of(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            DebitCredit::Debit
        } else {
            DebitCredit::Credit
        }
    }

    /// Applies the sign this marker stands for to an unsigned amount.
    pub fn apply(self, amount: Decimal) -> Decimal {
        match self {
            DebitCredit::Debit => -amount,
            DebitCredit::Credit => amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountType {
    #[default]
    Checking,
}

/// An account reference; only the account's own identifier is ever known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankAccount {
    pub bank_id: Option<String>,
    pub account_id: String,
}

impl BankAccount {
    pub fn counterparty(account_id: impl Into<String>) -> Self {
        BankAccount {
            bank_id: None,
            account_id: account_id.into(),
        }
    }
}

/// One dated, signed movement. `date` is the booking date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    /// Negative for debits, positive for credits, never zero.
    pub amount: Decimal,
    pub trntype: DebitCredit,
    pub memo: String,
    pub payee: Option<String>,
    pub counterparty_account: Option<BankAccount>,
    pub refnum: Option<String>,
}

impl Transaction {
    /// A transaction without an identifier yet. Empty memos become [`UNKNOWN_MEMO`].
    pub fn new(date: NaiveDate, amount: Decimal, memo: impl Into<String>) -> Self {
        let memo = memo.into();
        Transaction {
            id: String::new(),
            date,
            amount,
            trntype: DebitCredit::of(amount),
            memo: if memo.is_empty() {
                UNKNOWN_MEMO.to_string()
            } else {
                memo
            },
            payee: None,
            counterparty_account: None,
            refnum: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    pub bank_id: Option<String>,
    pub account_id: Option<String>,
    pub account_type: AccountType,
    pub currency: String,
    pub start_date: Option<NaiveDate>,
    pub start_balance: Option<Decimal>,
    /// Exclusive: the day after the last balance-effective day.
    pub end_date: Option<NaiveDate>,
    pub end_balance: Option<Decimal>,
    /// Skip the "end date after every line" check for this statement.
    pub lenient_end_date: bool,
    pub lines: Vec<Transaction>,
}

impl Statement {
    /// Sum of the line amounts; `None` when it leaves the decimal range.
    pub fn total_amount(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.amount))
    }

    pub fn min_line_date(&self) -> Option<NaiveDate> {
        self.lines.iter().map(|l| l.date).min()
    }

    pub fn max_line_date(&self) -> Option<NaiveDate> {
        self.lines.iter().map(|l| l.date).max()
    }
}
