use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;

use erpflow_core::domain::lifecycle::Lifecycle;
use erpflow_core::workflow::states::WorkflowState;

use super::RepositoryError;

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_optional_time(
    column: &str,
    value: Option<String>,
) -> Result<Option<NaiveTime>, RepositoryError> {
    value
        .map(|raw| {
            NaiveTime::parse_from_str(&raw, "%H:%M:%S").map_err(|error| {
                RepositoryError::Decode(format!("invalid time in `{column}`: `{raw}` ({error})"))
            })
        })
        .transpose()
}

pub(crate) fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

/// Unknown stored status text is a decode failure, never a silent default.
pub(crate) fn parse_state<S: WorkflowState>(column: &str, value: String) -> Result<S, RepositoryError> {
    S::parse(&value)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status in `{column}`: `{value}`")))
}

pub(crate) fn lifecycle(row: &SqliteRow) -> Result<Lifecycle, RepositoryError> {
    let deleted_at = parse_optional_timestamp("deleted_at", row.try_get("deleted_at")?)?;
    Ok(Lifecycle::from_deleted_at(deleted_at))
}

pub(crate) fn format_time(value: Option<NaiveTime>) -> Option<String> {
    value.map(|time| time.format("%H:%M:%S").to_string())
}
