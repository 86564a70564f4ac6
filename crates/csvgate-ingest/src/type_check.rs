//! Field type predicates
//!
//! Each predicate takes the raw field text and answers whether it conforms
//! to a [`ColumnType`]. Empty values never reach these checks; the record
//! validator handles emptiness before dispatching here.

use chrono::{NaiveDate, NaiveDateTime};
use csvgate_common::types::ColumnType;
use regex::Regex;
use std::sync::LazyLock;

/// `DD/MM/YYYY`
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// `DD/MM/YYYY HH:MM:SS`, 24-hour clock
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

// chrono accepts single-digit days and years of any width; the shape is
// pinned down separately.
#[allow(clippy::expect_used)]
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date pattern"));

#[allow(clippy::expect_used)]
static DATE_TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}$").expect("valid date-time pattern")
});

/// Whether `value` is a valid instance of `column_type`
pub fn conforms(column_type: ColumnType, value: &str) -> bool {
    match column_type {
        ColumnType::String => is_string(value),
        ColumnType::Int => is_int(value),
        ColumnType::Float => is_float(value),
        ColumnType::Date => is_date(value),
        ColumnType::DateTime => is_date_time(value),
    }
}

/// Any text is a string.
pub fn is_string(_value: &str) -> bool {
    true
}

/// Base-10 integer with an optional sign
pub fn is_int(value: &str) -> bool {
    value.parse::<i64>().is_ok()
}

/// Decimal number; integers qualify, `inf` and `NaN` do not
pub fn is_float(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Real calendar date written `DD/MM/YYYY`
pub fn is_date(value: &str) -> bool {
    DATE_SHAPE.is_match(value) && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// Real calendar date and time written `DD/MM/YYYY HH:MM:SS`
pub fn is_date_time(value: &str) -> bool {
    DATE_TIME_SHAPE.is_match(value)
        && NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).is_ok()
}
