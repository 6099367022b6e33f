//! Record builders: list, count, read, create, update and delete.
//!
//! # Design
//! Every operation starts from a `Table` method, accumulates options through
//! the fluent traits in `query`, and finishes with `execute`, which performs
//! exactly one HTTP round-trip (or none, when validation fails or a bulk
//! operation has nothing to do). Payload serialization errors are captured
//! when the builder is created and surface from `execute`, so chains never
//! have to be broken up to handle them.
//!
//! Single-record writes are sent through the bulk endpoints, as NocoDB's v2
//! API only exposes array bodies for create, update and delete.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::client::Table;
use crate::decode::{record_id, to_record, to_records};
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::query::{
    impl_query_options, ApplyQuery, FieldProvider, FilterProvider, PaginationProvider, QueryParams,
    ShuffleProvider, SortProvider, ViewProvider,
};
use crate::types::{CountResponse, ListResponse, ReadResponse, Record};

impl Table {
    /// List records, optionally filtered, sorted and paginated.
    ///
    /// ```ignore
    /// let page = table.list_records()
    ///     .where_is_not_null("Email")
    ///     .sort_desc_by("CreatedAt")
    ///     .page(2, 25)
    ///     .execute()?;
    /// ```
    pub fn list_records(&self) -> ListRecords<'_> {
        ListRecords {
            table: self,
            filters: FilterProvider::default(),
            sorts: SortProvider::default(),
            pagination: PaginationProvider::default(),
            fields: FieldProvider::default(),
            shuffle: ShuffleProvider::default(),
            view: ViewProvider::default(),
            timeout: None,
        }
    }

    /// Count the records matching the accumulated filters.
    pub fn count_records(&self) -> CountRecords<'_> {
        CountRecords {
            table: self,
            filters: FilterProvider::default(),
            view: ViewProvider::default(),
            timeout: None,
        }
    }

    /// Fetch one record by ID.
    pub fn read_record(&self, record_id: u64) -> ReadRecord<'_> {
        ReadRecord {
            table: self,
            record_id,
            fields: FieldProvider::default(),
            timeout: None,
        }
    }

    /// Create one record from any value that serializes to a JSON object.
    pub fn create_record<T: Serialize + ?Sized>(&self, data: &T) -> CreateRecord<'_> {
        CreateRecord {
            table: self,
            payload: to_record(data),
            timeout: None,
        }
    }

    pub fn create_records<T: Serialize>(&self, data: &[T]) -> CreateRecords<'_> {
        CreateRecords {
            table: self,
            payload: to_records(data),
            timeout: None,
        }
    }

    /// Update the columns present in `data` on record `record_id`. Any `Id`
    /// in `data` is overwritten by `record_id`.
    pub fn update_record<T: Serialize + ?Sized>(&self, record_id: u64, data: &T) -> UpdateRecord<'_> {
        UpdateRecord {
            table: self,
            record_id,
            payload: to_record(data),
            timeout: None,
        }
    }

    /// Update several records; each item must carry its own non-zero `Id`.
    pub fn update_records<T: Serialize>(&self, data: &[T]) -> UpdateRecords<'_> {
        UpdateRecords {
            table: self,
            payload: to_records(data),
            timeout: None,
        }
    }

    pub fn delete_record(&self, record_id: u64) -> DeleteRecord<'_> {
        DeleteRecord {
            table: self,
            record_id,
            timeout: None,
        }
    }

    pub fn delete_records(&self, record_ids: impl IntoIterator<Item = u64>) -> DeleteRecords<'_> {
        DeleteRecords {
            table: self,
            record_ids: record_ids.into_iter().collect(),
            timeout: None,
        }
    }
}

/// `[{"Id": id}, ...]`, the body NocoDB expects for bulk deletes and links.
pub(crate) fn id_objects(ids: &[u64]) -> Value {
    Value::Array(ids.iter().map(|id| serde_json::json!({ "Id": id })).collect())
}

/// IDs of the records in a write response, skipping entries without one.
fn response_ids(records: &[Record]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|record| {
            let id = record_id(record);
            if id.is_none() {
                warn!("write response entry has no numeric Id; skipping");
            }
            id
        })
        .collect()
}

// --- list ---

#[derive(Debug)]
pub struct ListRecords<'a> {
    table: &'a Table,
    filters: FilterProvider,
    sorts: SortProvider,
    pagination: PaginationProvider,
    fields: FieldProvider,
    shuffle: ShuffleProvider,
    view: ViewProvider,
    timeout: Option<Duration>,
}

impl_query_options!(ListRecords {
    Filterable => filter_provider(filters: FilterProvider),
    Sortable => sort_provider(sorts: SortProvider),
    Paginated => pagination_provider(pagination: PaginationProvider),
    FieldSelectable => field_provider(fields: FieldProvider),
    Shuffleable => shuffle_provider(shuffle: ShuffleProvider),
    ViewSelectable => view_provider(view: ViewProvider),
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl ListRecords<'_> {
    /// The query string this builder would send.
    pub fn query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.filters.apply(&mut query);
        self.sorts.apply(&mut query);
        self.pagination.apply(&mut query);
        self.fields.apply(&mut query);
        self.shuffle.apply(&mut query);
        self.view.apply(&mut query);
        query
    }

    pub fn execute(self) -> Result<ListResponse> {
        let path = self.table.records_path()?;
        self.table
            .client()
            .request_json(HttpMethod::Get, &path, &self.query(), None, self.timeout)
    }
}

// --- count ---

#[derive(Debug)]
pub struct CountRecords<'a> {
    table: &'a Table,
    filters: FilterProvider,
    view: ViewProvider,
    timeout: Option<Duration>,
}

impl_query_options!(CountRecords {
    Filterable => filter_provider(filters: FilterProvider),
    ViewSelectable => view_provider(view: ViewProvider),
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl CountRecords<'_> {
    pub fn query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.filters.apply(&mut query);
        self.view.apply(&mut query);
        query
    }

    pub fn execute(self) -> Result<u64> {
        let path = format!("{}/count", self.table.records_path()?);
        let response: CountResponse =
            self.table
                .client()
                .request_json(HttpMethod::Get, &path, &self.query(), None, self.timeout)?;
        Ok(response.count)
    }
}

// --- read ---

#[derive(Debug)]
pub struct ReadRecord<'a> {
    table: &'a Table,
    record_id: u64,
    fields: FieldProvider,
    timeout: Option<Duration>,
}

impl_query_options!(ReadRecord {
    FieldSelectable => field_provider(fields: FieldProvider),
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl ReadRecord<'_> {
    pub fn execute(self) -> Result<ReadResponse> {
        if self.record_id == 0 {
            return Err(Error::RecordIdRequired);
        }
        let path = format!("{}/{}", self.table.records_path()?, self.record_id);
        let mut query = QueryParams::new();
        self.fields.apply(&mut query);
        self.table
            .client()
            .request_json(HttpMethod::Get, &path, &query, None, self.timeout)
    }
}

// --- create ---

#[derive(Debug)]
pub struct CreateRecord<'a> {
    table: &'a Table,
    payload: Result<Record>,
    timeout: Option<Duration>,
}

impl_query_options!(CreateRecord {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl CreateRecord<'_> {
    /// Returns the ID assigned to the new record.
    pub fn execute(self) -> Result<u64> {
        let record = self.payload?;
        let ids = create(self.table, vec![record], self.timeout)?;
        ids.first().copied().ok_or(Error::NoRecordCreated)
    }
}

#[derive(Debug)]
pub struct CreateRecords<'a> {
    table: &'a Table,
    payload: Result<Vec<Record>>,
    timeout: Option<Duration>,
}

impl_query_options!(CreateRecords {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl CreateRecords<'_> {
    /// Returns the IDs of the created records in response order. An empty
    /// input sends nothing, but the table ID is still checked.
    pub fn execute(self) -> Result<Vec<u64>> {
        self.table.records_path()?;
        let records = self.payload?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        create(self.table, records, self.timeout)
    }
}

fn create(table: &Table, records: Vec<Record>, timeout: Option<Duration>) -> Result<Vec<u64>> {
    let path = table.records_path()?;
    let body = Value::Array(records.into_iter().map(Value::Object).collect());
    let created: Vec<Record> =
        table
            .client()
            .request_json(HttpMethod::Post, &path, &QueryParams::new(), Some(&body), timeout)?;
    Ok(response_ids(&created))
}

// --- update ---

#[derive(Debug)]
pub struct UpdateRecord<'a> {
    table: &'a Table,
    record_id: u64,
    payload: Result<Record>,
    timeout: Option<Duration>,
}

impl_query_options!(UpdateRecord {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl UpdateRecord<'_> {
    pub fn execute(self) -> Result<()> {
        if self.record_id == 0 {
            return Err(Error::RecordIdRequired);
        }
        let mut record = self.payload?;
        record.insert("Id".to_string(), Value::from(self.record_id));
        update(self.table, vec![record], self.timeout)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct UpdateRecords<'a> {
    table: &'a Table,
    payload: Result<Vec<Record>>,
    timeout: Option<Duration>,
}

impl_query_options!(UpdateRecords {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl UpdateRecords<'_> {
    /// Returns the IDs the server reports as updated. An empty input sends
    /// nothing, but the table ID is still checked.
    pub fn execute(self) -> Result<Vec<u64>> {
        self.table.records_path()?;
        let records = self.payload?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        if records.iter().any(|record| !matches!(record_id(record), Some(id) if id > 0)) {
            return Err(Error::RecordIdRequired);
        }
        update(self.table, records, self.timeout)
    }
}

fn update(table: &Table, records: Vec<Record>, timeout: Option<Duration>) -> Result<Vec<u64>> {
    let path = table.records_path()?;
    let body = Value::Array(records.into_iter().map(Value::Object).collect());
    let updated: Vec<Record> =
        table
            .client()
            .request_json(HttpMethod::Patch, &path, &QueryParams::new(), Some(&body), timeout)?;
    Ok(response_ids(&updated))
}

// --- delete ---

#[derive(Debug)]
pub struct DeleteRecord<'a> {
    table: &'a Table,
    record_id: u64,
    timeout: Option<Duration>,
}

impl_query_options!(DeleteRecord {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl DeleteRecord<'_> {
    pub fn execute(self) -> Result<()> {
        if self.record_id == 0 {
            return Err(Error::RecordIdRequired);
        }
        delete(self.table, &[self.record_id], self.timeout)
    }
}

#[derive(Debug)]
pub struct DeleteRecords<'a> {
    table: &'a Table,
    record_ids: Vec<u64>,
    timeout: Option<Duration>,
}

impl_query_options!(DeleteRecords {
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl DeleteRecords<'_> {
    /// An empty ID list sends nothing, but the table ID is still checked.
    pub fn execute(self) -> Result<()> {
        self.table.records_path()?;
        if self.record_ids.is_empty() {
            return Ok(());
        }
        if self.record_ids.contains(&0) {
            return Err(Error::RecordIdRequired);
        }
        delete(self.table, &self.record_ids, self.timeout)
    }
}

fn delete(table: &Table, ids: &[u64], timeout: Option<Duration>) -> Result<()> {
    let path = table.records_path()?;
    table.client().request(
        HttpMethod::Delete,
        &path,
        &QueryParams::new(),
        Some(&id_objects(ids)),
        timeout,
    )?;
    Ok(())
}
