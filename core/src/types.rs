//! Response DTOs for the NocoDB v2 records API.
//!
//! # Design
//! Records stay untyped (`serde_json::Map`) because column sets are defined
//! by the remote table, not by this crate. Callers who want typed rows use
//! `decode_into`, which runs a serde round-trip into their own structs.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::decode::{decode_record, decode_records};
use crate::error::Result;

/// One table row: column name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Pagination metadata returned alongside a list of records. Missing and
/// `null` fields decode as zero or `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub total_rows: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub page: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub page_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_first_page: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_last_page: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Records returned by a list query.
///
/// An object with a `list` key is the usual `{"list": [...], "pageInfo":
/// {...}}` envelope, and a malformed envelope is an error. Any other object
/// is a bare record and becomes a one-element page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub list: Vec<Record>,
    pub page_info: PageInfo,
}

impl ListResponse {
    /// Decode every record into `T`.
    pub fn decode_into<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        decode_records(&self.list)
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }
}

#[derive(Deserialize)]
struct Envelope {
    list: Vec<Record>,
    #[serde(rename = "pageInfo", default, deserialize_with = "null_as_default")]
    page_info: PageInfo,
}

impl<'de> Deserialize<'de> for ListResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let object = Record::deserialize(deserializer)?;
        if !object.contains_key("list") {
            return Ok(Self {
                list: vec![object],
                page_info: PageInfo {
                    total_rows: 1,
                    page: 1,
                    page_size: 1,
                    is_first_page: true,
                    is_last_page: true,
                },
            });
        }
        let envelope: Envelope = serde_json::from_value(Value::Object(object)).map_err(de::Error::custom)?;
        Ok(Self {
            list: envelope.list,
            page_info: envelope.page_info,
        })
    }
}

/// A single record returned by a read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadResponse {
    pub data: Record,
}

impl ReadResponse {
    /// Decode the record into `T`.
    pub fn decode_into<T: DeserializeOwned>(&self) -> Result<T> {
        decode_record(&self.data)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_standard_envelope() {
        let raw = r#"{
            "list": [{"Id": 1, "Title": "Record 1"}, {"Id": 2, "Title": "Record 2"}],
            "pageInfo": {"totalRows": 2, "page": 1, "pageSize": 10, "isFirstPage": true, "isLastPage": true}
        }"#;
        let resp: ListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.len(), 2);
        assert_eq!(resp.page_info.total_rows, 2);
        assert_eq!(resp.page_info.page_size, 10);
        assert!(resp.page_info.is_last_page);
    }

    #[test]
    fn list_response_single_object() {
        let resp: ListResponse = serde_json::from_str(r#"{"Id": 3, "Title": "Single Record"}"#).unwrap();
        assert_eq!(resp.len(), 1);
        assert_eq!(resp.list[0]["Id"], 3);
        assert_eq!(resp.list[0]["Title"], "Single Record");
        assert_eq!(resp.page_info.total_rows, 1);
        assert_eq!(resp.page_info.page, 1);
        assert!(resp.page_info.is_first_page && resp.page_info.is_last_page);
    }

    #[test]
    fn list_response_empty_page() {
        let raw = r#"{"list": [], "pageInfo": {"totalRows": 0, "page": 1, "pageSize": 10, "isFirstPage": true, "isLastPage": true}}"#;
        let resp: ListResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.is_empty());
        assert_eq!(resp.page_info.total_rows, 0);
    }

    #[test]
    fn list_response_partial_page_info() {
        let resp: ListResponse = serde_json::from_str(r#"{"list": [], "pageInfo": {"totalRows": 4}}"#).unwrap();
        assert_eq!(resp.page_info.total_rows, 4);
        assert_eq!(resp.page_info.page, 0);
    }

    #[test]
    fn list_response_tolerates_null_page_info_fields() {
        let raw = r#"{"list": [{"Id": 1}, {"Id": 2}], "pageInfo": {"totalRows": null, "page": 1, "isLastPage": null}}"#;
        let resp: ListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.len(), 2);
        assert_eq!(resp.list[1]["Id"], 2);
        assert_eq!(resp.page_info.total_rows, 0);
        assert_eq!(resp.page_info.page, 1);
        assert!(!resp.page_info.is_last_page);

        let resp: ListResponse = serde_json::from_str(r#"{"list": [], "pageInfo": null}"#).unwrap();
        assert_eq!(resp.page_info, PageInfo::default());
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(serde_json::from_str::<ListResponse>(r#"{"list": [null], "pageInfo": {}}"#).is_err());
        assert!(serde_json::from_str::<ListResponse>(r#"{"list": [{"Id": 1}], "pageInfo": {"page": "two"}}"#).is_err());
        assert!(serde_json::from_str::<ListResponse>(r#"{"list": 3}"#).is_err());
    }

    #[test]
    fn list_response_serializes_camel_case() {
        let resp = ListResponse::default();
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("pageInfo").is_some());
        assert!(value["pageInfo"].get("totalRows").is_some());
    }

    #[test]
    fn read_response_is_the_bare_record() {
        let resp: ReadResponse = serde_json::from_str(r#"{"Id": 5, "Name": "x"}"#).unwrap();
        assert_eq!(resp.data["Name"], "x");
    }
}
