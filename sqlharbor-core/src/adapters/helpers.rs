//! Helper utilities shared by the engine adapters.
//!
//! The central piece is [`with_session`]: every connector operation opens one
//! engine session, hands it to the operation and closes it exactly once,
//! whether the operation succeeded or failed.

use crate::{Result, error::HarborError, models::Record};
use async_trait::async_trait;
#[cfg(any(feature = "postgresql", feature = "mysql"))]
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;

/// A live engine connection that must be closed explicitly.
///
/// Implementations consume the session on close so it cannot be used or
/// closed again. Close failures are reported as connection errors.
#[async_trait]
pub trait Session: Send + Sized {
    /// Gracefully terminates the session.
    async fn close(self) -> Result<()>;
}

/// Runs `op` against `session`, then closes the session.
///
/// The session is closed exactly once on every path. When the operation
/// fails its error is returned and a close failure is only logged; when the
/// operation succeeds a close failure becomes the result.
///
/// # Example
/// ```rust,ignore
/// let count = with_session(conn, |conn| {
///     Box::pin(async move { sqlx::query_scalar("SELECT 1").fetch_one(&mut *conn).await })
/// })
/// .await?;
/// ```
pub async fn with_session<S, T, F>(mut session: S, op: F) -> Result<T>
where
    S: Session,
    F: for<'s> FnOnce(&'s mut S) -> BoxFuture<'s, Result<T>>,
{
    let outcome = op(&mut session).await;
    let closed = session.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_error)) => Err(close_error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(close_error)) => {
            tracing::warn!(
                "Failed to close session after error ({}): {}",
                error,
                close_error
            );
            Err(error)
        }
    }
}

/// Bounds a connect attempt by `limit`.
pub async fn connect_within<S, F>(limit: Duration, target: &str, connect: F) -> Result<S>
where
    F: Future<Output = Result<S>>,
{
    tokio::time::timeout(limit, connect)
        .await
        .map_err(|_| HarborError::connection_timeout(target, limit))?
}

/// Bounds one statement round-trip by `limit`.
pub async fn query_within<T, F>(limit: Duration, context: &str, query: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, query).await.map_err(|_| {
        HarborError::query(format!(
            "{} timed out after {}s",
            context,
            limit.as_secs_f64()
        ))
    })?
}

/// Drops system databases, empty names and repeats, keeping first-seen order.
pub fn filter_system_databases<I>(names: I, system: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut visible: Vec<String> = Vec::new();
    for name in names {
        if name.is_empty()
            || system.iter().any(|s| s.eq_ignore_ascii_case(&name))
            || visible.contains(&name)
        {
            continue;
        }
        visible.push(name);
    }
    visible
}

/// Renders constant names as a SQL string-literal list: `'a', 'b'`.
pub fn sql_string_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quotes an identifier with double quotes (PostgreSQL).
pub fn quote_double(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quotes an identifier with backticks (MySQL).
pub fn quote_backtick(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Quotes an identifier with square brackets (SQL Server).
pub fn quote_bracket(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

/// Cardinality guard of table introspection.
///
/// # Errors
/// Returns [`HarborError::Integrity`] unless `rows` holds exactly one element.
pub fn expect_single_row<T>(table: &str, rows: Vec<T>) -> Result<T> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Ok(row),
        _ => Err(HarborError::integrity(table, count)),
    }
}

/// Builds a `CREATE TABLE` text from a qualified name and a column list.
pub fn render_create_table(qualified_name: &str, columns: &str) -> String {
    format!("CREATE TABLE {} (\n  {}\n);", qualified_name, columns)
}

/// Keeps the first occurrence of every name.
pub fn unique_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// A float as a JSON number; NaN and infinities become `null`.
pub fn float_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// An exact decimal rendered by the driver, as a JSON number when it parses.
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub fn decimal_json(text: &str) -> JsonValue {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => float_json(value),
        _ => JsonValue::String(text.to_string()),
    }
}

/// A zoned timestamp as RFC 3339 text in UTC.
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub fn timestamp_json(value: DateTime<Utc>) -> JsonValue {
    JsonValue::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Converts a sqlx row into an ordered record, decoding each column with
/// `decode`.
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub fn sqlx_row_to_record<R, F>(row: &R, decode: F) -> Record
where
    R: sqlx::Row,
    F: Fn(&R, usize) -> JsonValue,
{
    use sqlx::Column;

    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), decode(row, index));
    }
    record
}

/// Decodes one column of a sqlx row into JSON.
///
/// Text, integers, floats and booleans map to their JSON counterparts.
/// Decimals become numbers, dates and times become their text form, UUIDs
/// become strings and JSON columns are passed through. A value whose type
/// none of these accept becomes `null`.
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub fn sqlx_column_value<R>(row: &R, index: usize) -> JsonValue
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> i32: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> i16: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> f64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> f32: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> bool: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> sqlx::types::BigDecimal: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> DateTime<Utc>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> NaiveDateTime: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> NaiveDate: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> NaiveTime: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> uuid::Uuid: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> JsonValue: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn or_null<T>(value: Option<T>, to_json: impl FnOnce(T) -> JsonValue) -> JsonValue {
        value.map(to_json).unwrap_or(JsonValue::Null)
    }

    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        or_null(v, JsonValue::String)
    } else if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        or_null(v, JsonValue::from)
    } else if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        or_null(v, JsonValue::from)
    } else if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        or_null(v, JsonValue::from)
    } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        or_null(v, float_json)
    } else if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        or_null(v, |n| float_json(f64::from(n)))
    } else if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        or_null(v, JsonValue::Bool)
    } else if let Ok(v) = row.try_get::<Option<sqlx::types::BigDecimal>, _>(index) {
        or_null(v, |d| decimal_json(&d.to_string()))
    } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        or_null(v, |t| JsonValue::String(t.to_string()))
    } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
        or_null(v, timestamp_json)
    } else if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        or_null(v, |d| JsonValue::String(d.to_string()))
    } else if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(index) {
        or_null(v, |t| JsonValue::String(t.to_string()))
    } else if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(index) {
        or_null(v, |u| JsonValue::String(u.to_string()))
    } else if let Ok(v) = row.try_get::<Option<JsonValue>, _>(index) {
        v.unwrap_or(JsonValue::Null)
    } else {
        JsonValue::Null
    }
}
