//! Conversions between records and caller-supplied types.
//!
//! Both directions go through `serde_json::Value`, so any type whose serde
//! representation matches the table's columns works, including structs with
//! `#[serde(rename = "...")]` on fields whose column names are not valid
//! Rust identifiers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Record;

/// Decode a record into `T`.
pub fn decode_record<T: DeserializeOwned>(record: &Record) -> Result<T> {
    serde_json::from_value(Value::Object(record.clone())).map_err(Error::Deserialization)
}

/// Decode a list of records into `Vec<T>`, failing on the first bad record.
pub fn decode_records<T: DeserializeOwned>(records: &[Record]) -> Result<Vec<T>> {
    records.iter().map(decode_record).collect()
}

/// Serialize `data` into a record. Fails with `InvalidPayload` when `data`
/// is not represented as a JSON object (for example a bare string or array).
pub fn to_record<T: Serialize + ?Sized>(data: &T) -> Result<Record> {
    match serde_json::to_value(data).map_err(Error::Serialization)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidPayload(json_kind(&other))),
    }
}

pub fn to_records<T: Serialize>(data: &[T]) -> Result<Vec<Record>> {
    data.iter().map(to_record).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The numeric `Id` column of a record, if present.
///
/// NocoDB sends IDs as JSON numbers; some proxies stringify them, so numeric
/// strings are accepted too.
pub fn record_id(record: &Record) -> Option<u64> {
    match record.get("Id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
