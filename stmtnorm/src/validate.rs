//! Statement Validator: date bounds, then balance closure; stops at the first violation.

use crate::{error::ValidationError, model::Statement};

pub fn validate(st: &Statement) -> Result<(), ValidationError> {
    if let (Some(min_date), Some(max_date)) = (st.min_line_date(), st.max_line_date()) {
        let start_date = st.start_date.ok_or(ValidationError::MissingStartDate)?;
        if start_date > min_date {
            return Err(ValidationError::StartDateAfterFirstLine {
                start_date,
                min_date,
            });
        }

        let end_date = st.end_date.ok_or(ValidationError::MissingEndDate)?;
        if !st.lenient_end_date && end_date <= max_date {
            return Err(ValidationError::EndDateNotAfterLastLine { end_date, max_date });
        }
    }

    if let (Some(start_balance), Some(end_balance)) = (st.start_balance, st.end_balance) {
        let total = st.total_amount().ok_or(ValidationError::AmountOverflow)?;
        if start_balance.checked_add(total) != Some(end_balance) {
            return Err(ValidationError::Unbalanced {
                start_balance,
                total,
                end_balance,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountType, Transaction};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn statement() -> Statement {
        Statement {
            bank_id: Some("ABNANL2A".into()),
            account_id: Some("99999999999".into()),
            account_type: AccountType::Checking,
            currency: "EUR".into(),
            start_date: Some(ymd(2019, 8, 21)),
            start_balance: Some(dec("-10.00")),
            end_date: Some(ymd(2019, 9, 18)),
            end_balance: Some(dec("-18.99")),
            lenient_end_date: false,
            lines: vec![
                Transaction::new(ymd(2019, 8, 21), dec("-7.99"), "NETFLIX"),
                Transaction::new(ymd(2019, 9, 13), dec("-1.00"), "SNCF"),
            ],
        }
    }

    #[test]
    fn accepts_closed_statement() {
        assert_eq!(validate(&statement()), Ok(()));
    }

    #[test]
    fn start_date_after_first_line() {
        let mut st = statement();
        st.start_date = Some(ymd(2019, 8, 22));
        assert_eq!(
            validate(&st),
            Err(ValidationError::StartDateAfterFirstLine {
                start_date: ymd(2019, 8, 22),
                min_date: ymd(2019, 8, 21),
            })
        );
    }

    #[test]
    fn end_date_is_exclusive() {
        let mut st = statement();
        st.end_date = Some(ymd(2019, 9, 13));
        assert_eq!(
            validate(&st),
            Err(ValidationError::EndDateNotAfterLastLine {
                end_date: ymd(2019, 9, 13),
                max_date: ymd(2019, 9, 13),
            })
        );
        st.lenient_end_date = true;
        assert_eq!(validate(&st), Ok(()));
    }

    #[test]
    fn closure_is_exact() {
        let mut st = statement();
        st.end_balance = Some(dec("-18.98"));
        assert_eq!(
            validate(&st),
            Err(ValidationError::Unbalanced {
                start_balance: dec("-10.00"),
                total: dec("-8.99"),
                end_balance: dec("-18.98"),
            })
        );
    }

    #[test]
    fn overflowing_total_is_reported() {
        let mut st = statement();
        st.lines[0].amount = Decimal::MIN;
        st.lines[1].amount = Decimal::MIN;
        assert_eq!(validate(&st), Err(ValidationError::AmountOverflow));
    }

    #[test]
    fn date_checks_run_before_closure() {
        let mut st = statement();
        st.start_date = None;
        st.end_balance = Some(dec("0"));
        assert_eq!(validate(&st), Err(ValidationError::MissingStartDate));
    }

    #[test]
    fn missing_balances_skip_closure() {
        let mut st = statement();
        st.start_balance = None;
        st.end_balance = Some(dec("123"));
        assert_eq!(validate(&st), Ok(()));
    }
}
