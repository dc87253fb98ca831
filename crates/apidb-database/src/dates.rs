//! Temporal column decoding.
//!
//! With `date_strings` enabled, DATE, DATETIME, TIMESTAMP and TIME values
//! reach callers in MySQL's own textual form instead of as parsed values.
//!
//! Rows fetched through [`ApiPool::query`](crate::ApiPool::query) use the text
//! protocol, so the server's string is returned byte for byte: zero dates,
//! negative or >24h times and declared fractional precision included. Rows
//! fetched with prepared statements arrive in the binary layout, which is
//! rendered here without chrono. That layout carries neither the declared
//! precision (fractions print as six digits when non-zero) nor zero dates,
//! which the driver reports as NULL.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, ColumnIndex, Row, TypeInfo};

/// A temporal column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Temporal {
    /// Raw MySQL text, e.g. `2024-03-01 08:15:00`.
    Text(String),
    /// A parsed DATE.
    Date(NaiveDate),
    /// A parsed DATETIME or TIMESTAMP.
    DateTime(NaiveDateTime),
    /// A parsed TIME within `00:00:00..24:00:00`.
    Time(NaiveTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Date,
    DateTime,
    Time,
}

impl Kind {
    fn of(type_name: &str) -> Option<Self> {
        match type_name {
            "DATE" => Some(Self::Date),
            "DATETIME" | "TIMESTAMP" => Some(Self::DateTime),
            "TIME" => Some(Self::Time),
            _ => None,
        }
    }
}

/// Decode a temporal column, as text when `as_text` is set.
///
/// Non-temporal columns are a decode error. So are values with no chrono
/// equivalent (zero dates, negative times) when `as_text` is off.
pub fn decode<I>(row: &MySqlRow, index: I, as_text: bool) -> Result<Option<Temporal>, sqlx::Error>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    let kind = column_kind(row, index)?;
    let Some(text) = raw_text(row, index, kind)? else {
        return Ok(None);
    };

    if as_text {
        return Ok(Some(Temporal::Text(text)));
    }

    let parsed = match kind {
        Kind::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d").map(Temporal::Date),
        Kind::DateTime => {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").map(Temporal::DateTime)
        }
        Kind::Time => NaiveTime::parse_from_str(&text, "%H:%M:%S%.f").map(Temporal::Time),
    };

    parsed
        .map(Some)
        .map_err(|e| sqlx::Error::Decode(format!("cannot parse {:?}: {}", text, e).into()))
}

/// Decode a temporal column as its MySQL string.
pub fn as_string<I>(row: &MySqlRow, index: I) -> Result<Option<String>, sqlx::Error>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    let kind = column_kind(row, index)?;
    raw_text(row, index, kind)
}

fn column_kind<I>(row: &MySqlRow, index: I) -> Result<Kind, sqlx::Error>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    let type_name = row.try_column(index)?.type_info().name();
    Kind::of(type_name).ok_or_else(|| {
        sqlx::Error::Decode(format!("column of type {} is not a date or time", type_name).into())
    })
}

fn raw_text<I>(row: &MySqlRow, index: I, kind: Kind) -> Result<Option<String>, sqlx::Error>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    // Byte access skips the driver's chrono decoding entirely
    let raw: Option<&[u8]> = row.try_get_unchecked(index)?;
    raw.map(|bytes| render(bytes, kind))
        .transpose()
        .map_err(|e| sqlx::Error::Decode(e.into()))
}

/// Render a wire value. Text-protocol values start with a digit or a sign;
/// binary ones start with a length byte (0, 4, 7, 8, 11 or 12).
fn render(bytes: &[u8], kind: Kind) -> Result<String, String> {
    match bytes.first() {
        Some(b) if b.is_ascii_digit() || *b == b'-' => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| e.to_string()),
        _ => match kind {
            Kind::Date | Kind::DateTime => render_binary_datetime(bytes, kind == Kind::Date),
            Kind::Time => render_binary_time(bytes),
        },
    }
}

fn render_binary_datetime(bytes: &[u8], date_only: bool) -> Result<String, String> {
    let len = usize::from(*bytes.first().ok_or("empty date value")?);
    if !matches!(len, 0 | 4 | 7 | 11) {
        return Err(format!("unexpected date value length {}", len));
    }
    let body = bytes.get(1..1 + len).ok_or("truncated date value")?;

    let (year, month, day) = match len {
        0 => (0, 0, 0),
        _ => (u16::from_le_bytes([body[0], body[1]]), body[2], body[3]),
    };
    let date = format!("{:04}-{:02}-{:02}", year, month, day);
    if date_only {
        return Ok(date);
    }

    let (hour, minute, second) = match len {
        7 | 11 => (body[4], body[5], body[6]),
        _ => (0, 0, 0),
    };
    let micros = match len {
        11 => u32::from_le_bytes([body[7], body[8], body[9], body[10]]),
        _ => 0,
    };

    Ok(format!(
        "{} {:02}:{:02}:{:02}{}",
        date,
        hour,
        minute,
        second,
        fraction(micros)
    ))
}

fn render_binary_time(bytes: &[u8]) -> Result<String, String> {
    let len = usize::from(*bytes.first().ok_or("empty time value")?);
    if len == 0 {
        return Ok("00:00:00".to_string());
    }
    if len != 8 && len != 12 {
        return Err(format!("unexpected time value length {}", len));
    }
    let body = bytes.get(1..1 + len).ok_or("truncated time value")?;

    let sign = if body[0] == 1 { "-" } else { "" };
    let days = u32::from_le_bytes([body[1], body[2], body[3], body[4]]);
    let hours = days * 24 + u32::from(body[5]);
    let micros = match len {
        12 => u32::from_le_bytes([body[8], body[9], body[10], body[11]]),
        _ => 0,
    };

    Ok(format!(
        "{}{:02}:{:02}:{:02}{}",
        sign,
        hours,
        body[6],
        body[7],
        fraction(micros)
    ))
}

fn fraction(micros: u32) -> String {
    if micros == 0 {
        String::new()
    } else {
        format!(".{:06}", micros)
    }
}
