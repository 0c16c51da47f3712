//! Schema type-token mapping

use arrow_schema::DataType;

/// Map a schema type token to its Arrow type.
///
/// Case and surrounding whitespace are ignored. Unknown tokens map to
/// [`DataType::Utf8`].
pub fn to_arrow_type(token: &str) -> DataType {
    match token.trim().to_ascii_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => DataType::Boolean,
        "TINYINT" => DataType::Int8,
        "SMALLINT" => DataType::Int16,
        "INT" | "INT32" | "INTEGER" => DataType::Int32,
        "LONG" | "BIGINT" | "INT64" => DataType::Int64,
        "FLOAT" => DataType::Float32,
        "DOUBLE" | "DECIMAL" => DataType::Float64,
        "DATE" => DataType::Date32,
        "TIMESTAMP" => DataType::Date64,
        _ => DataType::Utf8,
    }
}
