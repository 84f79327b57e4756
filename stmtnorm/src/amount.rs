//! Amount parsing for locale-ambiguous sources.

use rust_decimal::Decimal;

use crate::{error::RecordError, model::DebitCredit};

/// Most digits accepted in the whole-units part of an amount.
pub const MAX_INTEGER_DIGITS: usize = 15;

/// Parses an unsigned amount such as `1,25`, `€ 1.827,97` or `1,827.97`.
///
/// An optional leading currency token is dropped. The last `.` or `,` is the
/// decimal separator when at most two digits follow it; every other separator
/// groups thousands.
pub fn parse_amount(raw: &str) -> Result<Decimal, RecordError> {
    let bad = || RecordError::Amount(raw.to_string());

    let mut tokens = raw.split_whitespace();
    let digits = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(amount), None, None) => amount,
        (Some(_currency), Some(amount), None) => amount,
        _ => return Err(bad()),
    };
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
        || !digits.chars().any(|c| c.is_ascii_digit())
    {
        return Err(bad());
    }

    let normalized = match digits.rfind([',', '.']) {
        Some(pos) if (1..=2).contains(&(digits.len() - pos - 1)) => {
            let (int_part, frac_part) = digits.split_at(pos);
            format!("{}.{}", int_part.replace([',', '.'], ""), &frac_part[1..])
        }
        _ => digits.replace([',', '.'], ""),
    };
    let integer_digits = normalized.split('.').next().unwrap_or_default();
    if integer_digits.len() > MAX_INTEGER_DIGITS {
        return Err(bad());
    }
    let normalized = if normalized.starts_with('.') {
        format!("0{normalized}")
    } else {
        normalized
    };

    Decimal::from_str_exact(&normalized).map_err(|_| bad())
}

/// Parses an amount and signs it with the record's debit/credit marker.
pub fn signed_amount(raw: &str, marker: DebitCredit) -> Result<Decimal, RecordError> {
    parse_amount(raw).map(|a| marker.apply(a))
}

/// Maps a marker token onto its direction; `tokens` is the format's (debit, credit) pair.
pub fn parse_marker(token: &str, tokens: (&str, &str)) -> Result<DebitCredit, RecordError> {
    if token == tokens.0 {
        Ok(DebitCredit::Debit)
    } else if token == tokens.1 {
        Ok(DebitCredit::Credit)
    } else {
        Err(RecordError::Format(format!(
            "debit/credit marker '{token}' is neither '{}' nor '{}'",
            tokens.0, tokens.1
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn dutch_and_english_grouping() {
        assert_eq!(parse_amount("1,25").unwrap(), dec("1.25"));
        assert_eq!(parse_amount("1.311,73").unwrap(), dec("1311.73"));
        assert_eq!(parse_amount("€ 1.827,97").unwrap(), dec("1827.97"));
        assert_eq!(parse_amount("1,827.97").unwrap(), dec("1827.97"));
        assert_eq!(parse_amount("2.500").unwrap(), dec("2500"));
        assert_eq!(parse_amount("1000,5").unwrap(), dec("1000.5"));
        assert_eq!(parse_amount("0,00").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn trailing_separator_means_whole_units() {
        assert_eq!(parse_amount("100,").unwrap(), dec("100"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("€ 1,00 EUR").is_err());
        assert!(parse_amount("-1,00").is_err());
        assert!(parse_amount(",").is_err());
    }

    #[test]
    fn whole_units_are_capped() {
        assert_eq!(
            parse_amount("999.999.999.999.999,99").unwrap(),
            dec("999999999999999.99")
        );
        assert!(parse_amount("1.000.000.000.000.000,00").is_err());
        assert!(parse_amount("70000000000000000000000000000").is_err());
    }

    #[test]
    fn marker_outside_legal_pair_is_a_format_violation() {
        assert_eq!(parse_marker("Af", ("Af", "Bij")).unwrap(), DebitCredit::Debit);
        assert_eq!(parse_marker("Bij", ("Af", "Bij")).unwrap(), DebitCredit::Credit);
        assert!(matches!(
            parse_marker("af", ("Af", "Bij")),
            Err(RecordError::Format(_))
        ));
    }

    #[test]
    fn debit_marker_negates() {
        assert_eq!(signed_amount("7,99", DebitCredit::Debit).unwrap(), dec("-7.99"));
        assert_eq!(signed_amount("7,99", DebitCredit::Credit).unwrap(), dec("7.99"));
    }
}
