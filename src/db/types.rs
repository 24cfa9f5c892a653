//! MySQL value to JSON cell conversion.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Category decoders handle the actual value extraction
//!
//! A decoder that cannot read a value falls back to the raw text of the cell,
//! then to a binary placeholder, so every cell ends up transport-safe.

use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Bit,
    Date,
    Time,
    DateTime,
    Binary,
    Json,
    Text,
}

/// Classify a MySQL type name (as reported by sqlx) into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal - check first, "DECIMAL" values must stay exact
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower == "year" {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "bit" {
        return TypeCategory::Bit;
    }

    match lower.as_str() {
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        "datetime" | "timestamp" => return TypeCategory::DateTime,
        "json" => return TypeCategory::Json,
        _ => {}
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "geometry" {
        return TypeCategory::Binary;
    }

    // varchar, char, text, enum, set and anything unrecognised
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Placeholder
// =============================================================================

/// Describe a binary value by its size instead of shipping the bytes.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::db::types::binary_placeholder;
///
/// assert_eq!(binary_placeholder(16), "<binary 16 B>");
/// assert_eq!(binary_placeholder(2048), "<binary 2 KiB>");
/// ```
pub fn binary_placeholder(len: usize) -> String {
    format!("<binary {}>", humansize::format_size(len, humansize::BINARY))
}

// =============================================================================
// Row Conversion
// =============================================================================

/// Column names of a row, in select-list order.
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Convert every cell of a row into a transport-safe JSON value.
pub fn row_to_cells(row: &MySqlRow) -> Vec<JsonValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let type_name = column.type_info().name();
            decode_cell(row, idx, categorize_type(type_name))
        })
        .collect()
}

fn decode_cell(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to read cell");
            return JsonValue::Null;
        }
    }

    let decoded = match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Bit => decode_bit(row, idx),
        TypeCategory::Date => decode_date(row, idx),
        TypeCategory::Time => decode_time(row, idx),
        TypeCategory::DateTime => decode_datetime(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Binary => decode_binary(row, idx),
        TypeCategory::Text => decode_text(row, idx),
    };

    decoded.unwrap_or_else(|| decode_fallback(row, idx))
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<RawDecimal, _>(idx) {
        Ok(v) => Some(JsonValue::String(v.0)),
        Err(e) => {
            tracing::debug!("Failed to decode DECIMAL: {:?}", e);
            None
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    // YEAR and friends come back as text on the text protocol
    row.try_get_unchecked::<&str, _>(idx)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|v| JsonValue::Number(v.into()))
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool)
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    let v = row
        .try_get::<f64, _>(idx)
        .ok()
        .or_else(|| row.try_get::<f32, _>(idx).ok().map(f64::from))?;
    Some(
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
    )
}

fn decode_bit(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<u64, _>(idx)
        .ok()
        .map(|v| JsonValue::Number(v.into()))
}

fn decode_date(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<chrono::NaiveDate, _>(idx)
        .ok()
        .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
}

fn decode_time(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    // TIME spans -838:59:59..838:59:59; out-of-day values use the text fallback
    row.try_get::<chrono::NaiveTime, _>(idx)
        .ok()
        .map(|t| JsonValue::String(t.format("%H:%M:%S%.f").to_string()))
}

fn decode_datetime(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<chrono::NaiveDateTime, _>(idx)
        .ok()
        .map(|dt| JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
}

fn decode_json(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<JsonValue, _>(idx).ok()
}

fn decode_binary(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Vec<u8>, _>(idx)
        .ok()
        .map(|bytes| JsonValue::String(binary_placeholder(bytes.len())))
}

fn decode_text(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<String, _>(idx).ok().map(JsonValue::String)
}

/// Last resort: the cell's text when it is valid UTF-8, a placeholder otherwise.
fn decode_fallback(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(s) = row.try_get_unchecked::<String, _>(idx) {
        return JsonValue::String(s);
    }
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        Ok(bytes) => JsonValue::String(binary_placeholder(bytes.len())),
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to decode cell");
            JsonValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_decimal_before_integer() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
    }

    #[test]
    fn test_categorize_type_boolean() {
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
    }

    #[test]
    fn test_categorize_type_float() {
        assert_eq!(categorize_type("FLOAT"), TypeCategory::Float);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::DateTime);
    }

    #[test]
    fn test_categorize_type_binary() {
        assert_eq!(categorize_type("BLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("GEOMETRY"), TypeCategory::Binary);
        assert_eq!(categorize_type("BIT"), TypeCategory::Bit);
    }

    #[test]
    fn test_categorize_type_text() {
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
    }

    #[test]
    fn test_binary_placeholder_units() {
        assert_eq!(binary_placeholder(0), "<binary 0 B>");
        assert_eq!(binary_placeholder(1024 * 1024), "<binary 1 MiB>");
    }
}
