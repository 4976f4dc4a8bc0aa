// Date Helpers - ISO dates on the element tree
//
// Absent or unparsable dates are data, not errors: every helper returns an
// Option and the caller treats None as "no date".

use chrono::{Datelike, NaiveDate};

use crate::record::Element;

/// Parse an ISO `YYYY-MM-DD` date, tolerating a trailing `Z`.
pub fn iso_date_str(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// Date carried in an element's `iso-date` attribute.
pub fn iso_date(element: &Element) -> Option<NaiveDate> {
    element.attr("iso-date").and_then(iso_date_str)
}

/// Date carried in an element's `value-date` attribute.
pub fn value_date(element: &Element) -> Option<NaiveDate> {
    element.attr("value-date").and_then(iso_date_str)
}

/// Date of a transaction, from its `transaction-date` element.
pub fn transaction_date(transaction: &Element) -> Option<NaiveDate> {
    transaction.find("transaction-date").and_then(iso_date)
}

/// Year a budget belongs to, taken from its period end.
pub fn budget_year(budget: &Element) -> Option<i32> {
    budget.find("period-end").and_then(iso_date).map(|d| d.year())
}

/// Year a planned disbursement belongs to, taken from its period start.
pub fn planned_disbursement_year(pd: &Element) -> Option<i32> {
    pd.find("period-start").and_then(iso_date).map(|d| d.year())
}

/// Same calendar date `years` years away; February 29 maps to March 1 when
/// the destination year is not a leap year.
pub fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(date)
}
