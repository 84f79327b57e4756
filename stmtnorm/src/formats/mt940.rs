//! SWIFT MT940 customer statement messages.
//!
//! A file holds one or more messages, optionally wrapped in `{1:..}{2:..}{4:`
//! envelopes and separated by `-` lines. Each message is a sequence of tags:
//! `:25:` account, `:60F:` opening, `:61:`/`:86:` pairs per transaction and
//! `:62F:` closing. Only the closing balance of the last message anchors the
//! statement; opening balances are derived from it.

use std::collections::VecDeque;
use std::io::{BufRead, Lines};
use std::iter::Enumerate;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::{
    config::{institution_bic, Mt940Settings},
    dates::month_day_near,
    error::{Error, RecordError, Result},
    metadata::Metadata,
    model::{Balance, BankAccount, DebitCredit, Transaction},
    reconcile::{ReconcilePolicy, Strategy},
    traits::{FormatAdapter, Positioned, Records},
};

/// Tag layout variations between institutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Generic,
    /// 34-character customer reference, no bank reference.
    Asn,
    /// Generic `:61:` layout; `TNR:` reference in the details.
    MBank,
}

impl Dialect {
    /// Picks the dialect from the institution code, or from the BIC when the code is unknown.
    pub fn select(bank_code: &str, bank_id: &str) -> Self {
        let is = |code: &str| {
            bank_code.eq_ignore_ascii_case(code) || institution_bic(code) == Some(bank_id)
        };
        if is("ASN") {
            Dialect::Asn
        } else if is("MBANK") {
            Dialect::MBank
        } else {
            Dialect::Generic
        }
    }

    fn statement_line_pattern(self) -> &'static str {
        match self {
            Dialect::Asn => concat!(
                r"^(?P<value>\d{6})(?P<entry>\d{4})?(?P<mark>R?[DC])(?P<funds>[A-Z])?",
                r"(?P<amount>\d[\d,]{0,14})(?P<code>[A-Z][A-Z0-9 ]{3})?",
                r"(?P<customer>.{0,34})$",
            ),
            Dialect::Generic | Dialect::MBank => concat!(
                r"^(?P<value>\d{6})(?P<entry>\d{4})?(?P<mark>R?[DC])(?P<funds>[A-Z])?",
                r"(?P<amount>\d[\d,]{0,14})(?P<code>[A-Z][A-Z0-9 ]{3})?",
                r"(?P<customer>.{0,16}?)(?://(?P<bank>.{0,23}))?$",
            ),
        }
    }
}

/// One `:61:` statement line with its `:86:` details, fields still as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mt940Record {
    pub value_date: String,
    pub entry_date: Option<String>,
    pub mark: String,
    pub amount: String,
    pub customer_reference: String,
    pub bank_reference: String,
    pub supplementary: String,
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct Mt940 {
    bank_id: String,
    dialect: Dialect,
    policy: ReconcilePolicy,
    tag: Regex,
    statement_line: Regex,
    tnr: Regex,
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| Error::Pattern(e.to_string()))
}

impl Mt940 {
    pub fn new(settings: &Mt940Settings) -> Result<Self> {
        let bank_id = settings.resolve_bank_id()?;
        let dialect = Dialect::select(&settings.bank_code, &bank_id);
        debug!(bank_code = %settings.bank_code, %bank_id, ?dialect, "mt940 reader");
        Ok(Mt940 {
            bank_id,
            dialect,
            policy: ReconcilePolicy {
                widen_end_date: settings.end_date_derived_from_statements,
            },
            tag: pattern(r"^:(\d\d[A-Z]?):(.*)$")?,
            statement_line: pattern(dialect.statement_line_pattern())?,
            tnr: pattern(r"TNR:\s*(\d+\.\d+)")?,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn statement_line(&self, content: &str) -> std::result::Result<Mt940Record, RecordError> {
        let mut lines = content.lines();
        let first = lines.next().unwrap_or_default().trim_end();
        let caps = self
            .statement_line
            .captures(first)
            .ok_or_else(|| RecordError::Format(format!("bad :61: line '{first}'")))?;
        let text = |name: &str| caps.name(name).map_or("", |m| m.as_str()).trim().to_string();

        let customer = text("customer");
        Ok(Mt940Record {
            value_date: text("value"),
            entry_date: caps.name("entry").map(|m| m.as_str().to_string()),
            mark: text("mark"),
            amount: text("amount"),
            customer_reference: if customer == "NONREF" { String::new() } else { customer },
            bank_reference: text("bank"),
            supplementary: lines.next().unwrap_or_default().trim().to_string(),
            details: None,
        })
    }
}

/// `C200131EUR501,23`
fn parse_balance(content: &str) -> std::result::Result<Balance, RecordError> {
    let s = content.lines().next().unwrap_or_default().trim();
    let bad = || RecordError::Format(format!("bad balance '{s}'"));
    let (Some(mark), Some(date), Some(currency), Some(amount)) =
        (s.get(0..1), s.get(1..7), s.get(7..10), s.get(10..))
    else {
        return Err(bad());
    };
    let date = parse_mt_date(date)?;
    let amount = parse_mt_amount(amount)?;
    let amount = match mark {
        "D" => -amount,
        "C" => amount,
        _ => return Err(bad()),
    };
    Ok(Balance {
        date,
        amount,
        currency: currency.to_string(),
    })
}

fn parse_mt_date(yymmdd: &str) -> std::result::Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(yymmdd, "%y%m%d").map_err(|_| RecordError::Date(yymmdd.to_string()))
}

/// `1000,18`, `65,` and `0,5` use a comma as the decimal separator.
fn parse_mt_amount(raw: &str) -> std::result::Result<Decimal, RecordError> {
    let s = raw.replace(',', ".");
    let s = s.trim_end_matches('.');
    let s = if s.starts_with('.') { format!("0{s}") } else { s.to_string() };
    Decimal::from_str_exact(&s).map_err(|_| RecordError::Amount(raw.to_string()))
}

fn is_boundary(line: &str) -> bool {
    line == "-" || line == "}" || line.starts_with("-}") || line.starts_with('{')
}

struct Tokenizer<'a, R> {
    adapter: &'a Mt940,
    meta: &'a mut Metadata,
    lines: Enumerate<Lines<R>>,
    /// Tag name, content so far and the line it started on.
    current: Option<(String, String, usize)>,
    pending: Option<Positioned<Mt940Record>>,
    ready: VecDeque<Result<Positioned<Mt940Record>>>,
    done: bool,
}

impl<'a, R: BufRead> Tokenizer<'a, R> {
    fn feed(&mut self, position: usize, line: &str) {
        let line = line.trim_end_matches('\r');
        // envelope header, body starts after `{4:`
        let line = match line.find("{4:") {
            Some(i) => &line[i + 3..],
            None => line,
        };
        if line.trim().is_empty() {
            return;
        }

        if let Some(caps) = self.adapter.tag.captures(line) {
            self.finish_tag();
            let name = caps[1].to_string();
            let content = caps[2].to_string();
            trace!(position, tag = %name, "tag");
            self.current = Some((name, content, position));
        } else if is_boundary(line.trim()) {
            self.finish_tag();
            trace!(position, "message boundary");
        } else if let Some((_, content, _)) = self.current.as_mut() {
            content.push('\n');
            content.push_str(line);
        } else {
            debug!(position, line, "skipping line outside any tag");
        }
    }

    fn finish_tag(&mut self) {
        let Some((name, content, position)) = self.current.take() else {
            return;
        };
        if let Err(e) = self.handle_tag(&name, &content, position) {
            self.ready.push_back(Err(Error::at(position, e)));
        }
    }

    fn handle_tag(
        &mut self,
        name: &str,
        content: &str,
        position: usize,
    ) -> std::result::Result<(), RecordError> {
        match name {
            "25" => self.meta.declare_account_id(content.trim()),
            "60F" | "60M" => {
                let opening = parse_balance(content)?;
                trace!(position, date = %opening.date, amount = %opening.amount, "opening balance");
                self.meta.declare_currency(&opening.currency)
            }
            "61" => {
                self.flush();
                let record = self.adapter.statement_line(content)?;
                debug!(position, ?record, "statement line");
                self.pending = Some(Positioned::new(position, record));
                Ok(())
            }
            "86" => {
                match self.pending.as_mut() {
                    Some(p) if p.record.details.is_none() => {
                        p.record.details = Some(content.to_string());
                    }
                    _ => debug!(position, "details without a statement line"),
                }
                Ok(())
            }
            "62F" | "62M" => {
                self.flush();
                let closing = parse_balance(content)?;
                self.meta.declare_currency(&closing.currency)?;
                self.meta.supersede_closing_balance(closing);
                Ok(())
            }
            _ => {
                self.flush();
                trace!(position, tag = name, "ignored tag");
                Ok(())
            }
        }
    }

    fn flush(&mut self) {
        if let Some(p) = self.pending.take() {
            self.ready.push_back(Ok(p));
        }
    }
}

impl<'a, R: BufRead> Iterator for Tokenizer<'a, R> {
    type Item = Result<Positioned<Mt940Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.lines.next() {
                Some((i, Ok(line))) => self.feed(i + 1, &line),
                Some((_, Err(e))) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.finish_tag();
                    self.flush();
                    self.done = true;
                }
            }
        }
    }
}

impl FormatAdapter for Mt940 {
    type Record = Mt940Record;

    fn initial_metadata(&self) -> Metadata {
        Metadata {
            bank_id: Some(self.bank_id.clone()),
            ..Metadata::default()
        }
    }

    fn split<'a, R: BufRead + 'a>(
        &'a self,
        r: R,
        meta: &'a mut Metadata,
    ) -> Records<'a, Mt940Record> {
        Box::new(Tokenizer {
            adapter: self,
            meta,
            lines: r.lines().enumerate(),
            current: None,
            pending: None,
            ready: VecDeque::new(),
            done: false,
        })
    }

    fn normalize(&self, rec: Mt940Record) -> std::result::Result<Option<Transaction>, RecordError> {
        let direction = match rec.mark.as_str() {
            "D" | "RC" => DebitCredit::Debit,
            "C" | "RD" => DebitCredit::Credit,
            other => return Err(RecordError::Format(format!("debit/credit mark '{other}'"))),
        };
        let amount = direction.apply(parse_mt_amount(&rec.amount)?);
        if amount.is_zero() {
            return Ok(None);
        }

        let value_date = parse_mt_date(&rec.value_date)?;
        let date = match &rec.entry_date {
            Some(mmdd) => month_day_near(value_date, mmdd)?,
            None => value_date,
        };

        let custref = rec.customer_reference.as_str();
        let extra = rec.supplementary.as_str();
        let mut memo = rec.details.as_deref().unwrap_or_default().replace('\n', "");
        for part in [custref, extra] {
            if !part.is_empty() {
                memo = memo.replacen(part, "", 1);
            }
        }

        let mut t = Transaction::new(date, amount, memo.trim());
        if !custref.is_empty() && !extra.is_empty() {
            t.payee = Some(format!("{extra} ({custref})"));
        }
        if !custref.is_empty() {
            t.counterparty_account = Some(BankAccount::counterparty(custref));
        }
        t.refnum = if !rec.bank_reference.is_empty() {
            Some(rec.bank_reference.clone())
        } else if self.dialect == Dialect::MBank {
            rec.details
                .as_deref()
                .and_then(|d| self.tnr.captures(d))
                .map(|c| c[1].to_string())
        } else {
            None
        };
        Ok(Some(t))
    }

    fn strategy(&self) -> Strategy {
        Strategy::AnchorForward
    }

    fn policy(&self) -> ReconcilePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asn() -> Mt940 {
        Mt940::new(&Mt940Settings::default()).unwrap()
    }

    fn generic() -> Mt940 {
        Mt940::new(&Mt940Settings::for_bank("ING")).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn dialect_follows_code_or_bic() {
        assert_eq!(Dialect::select("asn", "whatever"), Dialect::Asn);
        assert_eq!(Dialect::select("XYZ", "ASNBNL21"), Dialect::Asn);
        assert_eq!(Dialect::select("MBANK", "BREXPLPW"), Dialect::MBank);
        assert_eq!(Dialect::select("RABO", "RABONL2U"), Dialect::Generic);
    }

    #[test]
    fn asn_statement_line_keeps_long_customer_reference() {
        let rec = asn()
            .statement_line("2001010101D65,00NOVBNL47INGB9999999999\nhr gjlm paulissen")
            .unwrap();
        assert_eq!(rec.value_date, "200101");
        assert_eq!(rec.entry_date.as_deref(), Some("0101"));
        assert_eq!(rec.mark, "D");
        assert_eq!(rec.amount, "65,00");
        assert_eq!(rec.customer_reference, "NL47INGB9999999999");
        assert_eq!(rec.supplementary, "hr gjlm paulissen");
    }

    #[test]
    fn generic_statement_line_splits_bank_reference() {
        let rec = generic()
            .statement_line("200102C10,00NTRFNONREF//B0A02XYZ")
            .unwrap();
        assert_eq!(rec.entry_date, None);
        assert_eq!(rec.customer_reference, "");
        assert_eq!(rec.bank_reference, "B0A02XYZ");
    }

    #[test]
    fn memo_drops_reference_and_supplementary_text() {
        let t = asn()
            .normalize(Mt940Record {
                value_date: "200101".into(),
                entry_date: Some("0101".into()),
                mark: "D".into(),
                amount: "65,00".into(),
                customer_reference: "NL47INGB9999999999".into(),
                supplementary: "hr gjlm paulissen".into(),
                details: Some("NL47INGB9999999999 hr gjlm paulissen\nBetaling sieraden".into()),
                ..Mt940Record::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(t.amount, dec("-65.00"));
        assert_eq!(t.memo, "Betaling sieraden");
        assert_eq!(t.payee.as_deref(), Some("hr gjlm paulissen (NL47INGB9999999999)"));
        assert_eq!(
            t.counterparty_account,
            Some(BankAccount::counterparty("NL47INGB9999999999"))
        );
    }

    #[test]
    fn reversal_marks_invert_direction() {
        let rec = |mark: &str| Mt940Record {
            value_date: "200105".into(),
            mark: mark.into(),
            amount: "12,5".into(),
            ..Mt940Record::default()
        };
        let m = generic();
        assert_eq!(m.normalize(rec("RC")).unwrap().unwrap().amount, dec("-12.5"));
        assert_eq!(m.normalize(rec("RD")).unwrap().unwrap().amount, dec("12.5"));
        assert_eq!(m.normalize(rec("D")).unwrap().unwrap().memo, "UNKNOWN");
    }

    #[test]
    fn balances_and_amounts() {
        let b = parse_balance("D170119PLN1000,").unwrap();
        assert_eq!(b.amount, dec("-1000"));
        assert_eq!(b.currency, "PLN");
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2017, 1, 19).unwrap());
        assert_eq!(parse_mt_amount(",40").unwrap(), dec("0.40"));
        assert!(parse_balance("X200101").is_err());
    }
}
