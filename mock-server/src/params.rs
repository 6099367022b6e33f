//! Query-string options for list endpoints.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::filter::{self, Node};

type Record = Map<String, Value>;

/// Page size used when the request has no `limit`.
pub const DEFAULT_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub is_first_page: bool,
    pub is_last_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub list: Vec<Record>,
    pub page_info: PageInfo,
}

/// Parsed `where`, `sort`, `limit`, `offset` and `fields` parameters.
/// `shuffle` and `viewId` are accepted and ignored.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    filter: Option<Node>,
    sort: Vec<(String, bool)>,
    limit: Option<usize>,
    offset: usize,
    fields: Option<Vec<String>>,
}

impl ListParams {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let filter = match query.get("where").map(String::as_str) {
            Some("") | None => None,
            Some(raw) => Some(filter::parse(raw)?),
        };
        let sort = query
            .get("sort")
            .map(|raw| {
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| match s.strip_prefix('-') {
                        Some(column) => (column.to_string(), true),
                        None => (s.to_string(), false),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            filter,
            sort,
            limit: parse_number(query, "limit")?.filter(|n| *n > 0),
            offset: parse_number(query, "offset")?.unwrap_or(0),
            fields: query
                .get("fields")
                .map(|raw| raw.split(',').map(str::to_string).collect()),
        })
    }

    /// Whether `record` passes the `where` clause.
    pub fn accepts(&self, record: &Record) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(record))
    }

    pub fn project(&self, record: &Record) -> Record {
        match &self.fields {
            Some(fields) => record
                .iter()
                .filter(|(k, _)| fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => record.clone(),
        }
    }

    /// Filter, sort, paginate and project `records`.
    pub fn page<'a>(&self, records: impl Iterator<Item = &'a Record>) -> ListPage {
        let mut matched: Vec<&Record> = records.filter(|r| self.accepts(r)).collect();
        if !self.sort.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }

        let total_rows = matched.len();
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        let list = matched
            .into_iter()
            .skip(self.offset)
            .take(limit)
            .map(|r| self.project(r))
            .collect();

        ListPage {
            list,
            page_info: PageInfo {
                total_rows,
                page: self.offset / limit + 1,
                page_size: limit,
                is_first_page: self.offset == 0,
                is_last_page: self.offset + limit >= total_rows,
            },
        }
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for (column, descending) in &self.sort {
            let ord = compare_values(
                a.get(column).unwrap_or(&Value::Null),
                b.get(column).unwrap_or(&Value::Null),
            );
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn parse_number(query: &HashMap<String, String>, key: &str) -> Result<Option<usize>, ApiError> {
    query
        .get(key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| ApiError::bad_request(format!("'{key}' must be a non-negative integer")))
        })
        .transpose()
}

/// Nulls first, then numbers, booleans and text by value.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
