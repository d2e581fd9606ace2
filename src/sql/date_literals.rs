//! SOQL date literal expansion to SQL expressions
//!
//! Literals are resolved against a fixed `today` rather than the database
//! clock, so a query means the same thing for the whole unit of work.

use chrono::{Datelike, Days, Months, NaiveDate};

use super::error::{ConversionError, ConversionResult};
use crate::ast::{ComparisonOp, DateLiteral};

/// Inclusive first and last day covered by a date literal
pub fn date_range(literal: DateLiteral, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match literal {
        DateLiteral::Today => (today, today),
        DateLiteral::Yesterday => {
            let day = today.pred_opt().unwrap_or(today);
            (day, day)
        }
        DateLiteral::Tomorrow => {
            let day = today.succ_opt().unwrap_or(today);
            (day, day)
        }
        DateLiteral::LastNDays(n) => (
            today
                .checked_sub_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MIN),
            today,
        ),
        DateLiteral::NextNDays(n) => (
            today,
            today
                .checked_add_days(Days::new(u64::from(n)))
                .unwrap_or(NaiveDate::MAX),
        ),
        DateLiteral::ThisMonth => {
            let first = today.with_day(1).unwrap_or(today);
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(today);
            (first, last)
        }
        DateLiteral::ThisYear => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
        ),
    }
}

/// Expand `field op literal` into a SQL condition.
///
/// `bind` registers a parameter and returns its placeholder.
pub fn expand_date_comparison(
    field_expr: &str,
    op: ComparisonOp,
    literal: DateLiteral,
    today: NaiveDate,
    mut bind: impl FnMut(NaiveDate) -> String,
) -> ConversionResult<String> {
    let (start, end) = date_range(literal, today);

    Ok(match op {
        ComparisonOp::Equal => format!(
            "({f} >= {} AND {f} <= {})",
            bind(start),
            bind(end),
            f = field_expr
        ),
        ComparisonOp::NotEqual => format!(
            "({f} < {} OR {f} > {})",
            bind(start),
            bind(end),
            f = field_expr
        ),
        ComparisonOp::LessThan => format!("{} < {}", field_expr, bind(start)),
        ComparisonOp::GreaterOrEqual => format!("{} >= {}", field_expr, bind(start)),
        ComparisonOp::LessOrEqual => format!("{} <= {}", field_expr, bind(end)),
        ComparisonOp::GreaterThan => format!("{} > {}", field_expr, bind(end)),
        ComparisonOp::Like => {
            return Err(ConversionError::InvalidExpression(
                "LIKE cannot be used with a date literal".to_string(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_day_literals() {
        let today = date(2026, 3, 1);
        assert_eq!(date_range(DateLiteral::Today, today), (today, today));
        assert_eq!(
            date_range(DateLiteral::Yesterday, today),
            (date(2026, 2, 28), date(2026, 2, 28))
        );
        assert_eq!(
            date_range(DateLiteral::Tomorrow, today),
            (date(2026, 3, 2), date(2026, 3, 2))
        );
    }

    #[test]
    fn test_n_day_ranges_include_today() {
        let today = date(2026, 1, 10);
        assert_eq!(
            date_range(DateLiteral::LastNDays(30), today),
            (date(2025, 12, 11), today)
        );
        assert_eq!(
            date_range(DateLiteral::NextNDays(5), today),
            (today, date(2026, 1, 15))
        );
    }

    #[test]
    fn test_this_month_handles_short_months() {
        assert_eq!(
            date_range(DateLiteral::ThisMonth, date(2028, 2, 14)),
            (date(2028, 2, 1), date(2028, 2, 29))
        );
        assert_eq!(
            date_range(DateLiteral::ThisYear, date(2026, 6, 1)),
            (date(2026, 1, 1), date(2026, 12, 31))
        );
    }

    #[test]
    fn test_equal_expands_to_range() {
        let mut params = Vec::new();
        let sql = expand_date_comparison(
            "t0.\"close_date\"",
            ComparisonOp::Equal,
            DateLiteral::ThisMonth,
            date(2026, 4, 20),
            |d| {
                params.push(d);
                format!("?{}", params.len())
            },
        )
        .unwrap();

        assert_eq!(sql, "(t0.\"close_date\" >= ?1 AND t0.\"close_date\" <= ?2)");
        assert_eq!(params, vec![date(2026, 4, 1), date(2026, 4, 30)]);
    }

    #[test]
    fn test_bounds_pick_range_edge() {
        let today = date(2026, 4, 20);
        let mut seen = Vec::new();
        expand_date_comparison("d", ComparisonOp::GreaterThan, DateLiteral::ThisMonth, today, |d| {
            seen.push(d);
            String::from("?")
        })
        .unwrap();
        expand_date_comparison("d", ComparisonOp::LessThan, DateLiteral::ThisMonth, today, |d| {
            seen.push(d);
            String::from("?")
        })
        .unwrap();
        assert_eq!(seen, vec![date(2026, 4, 30), date(2026, 4, 1)]);
    }

    #[test]
    fn test_like_rejected() {
        let result = expand_date_comparison(
            "d",
            ComparisonOp::Like,
            DateLiteral::Today,
            date(2026, 1, 1),
            |_| String::new(),
        );
        assert!(matches!(result, Err(ConversionError::InvalidExpression(_))));
    }
}
