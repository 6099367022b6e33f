//! Builders for the records linked to a row through a link field.
//!
//! All operations address
//! `api/v2/tables/{table_id}/links/{link_field_id}/records/{record_id}`;
//! creating and deleting links send the target IDs as `[{"Id": t}, ...]`.

use std::time::Duration;

use crate::client::Table;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::query::{
    impl_query_options, ApplyQuery, FieldProvider, FilterProvider, PaginationProvider, QueryParams,
    SortProvider,
};
use crate::records::id_objects;
use crate::types::ListResponse;

impl Table {
    /// List the records linked to `record_id` through `link_field_id`.
    pub fn list_links(&self, link_field_id: impl Into<String>, record_id: u64) -> ListLinks<'_> {
        ListLinks {
            table: self,
            link_field_id: link_field_id.into(),
            record_id,
            filters: FilterProvider::default(),
            sorts: SortProvider::default(),
            pagination: PaginationProvider::default(),
            fields: FieldProvider::default(),
            timeout: None,
        }
    }

    /// Link `target_id` to `record_id`. A zero target is a no-op.
    pub fn create_link(&self, link_field_id: impl Into<String>, record_id: u64, target_id: u64) -> CreateLinks<'_> {
        self.create_links(link_field_id, record_id, [target_id])
    }

    /// Link several targets at once. Zero IDs are dropped; with none left
    /// the call is a no-op.
    pub fn create_links(
        &self,
        link_field_id: impl Into<String>,
        record_id: u64,
        target_ids: impl IntoIterator<Item = u64>,
    ) -> CreateLinks<'_> {
        CreateLinks(LinkChange::new(self, link_field_id, record_id, target_ids))
    }

    /// Unlink `target_id` from `record_id`. A zero target is a no-op.
    pub fn delete_link(&self, link_field_id: impl Into<String>, record_id: u64, target_id: u64) -> DeleteLinks<'_> {
        self.delete_links(link_field_id, record_id, [target_id])
    }

    pub fn delete_links(
        &self,
        link_field_id: impl Into<String>,
        record_id: u64,
        target_ids: impl IntoIterator<Item = u64>,
    ) -> DeleteLinks<'_> {
        DeleteLinks(LinkChange::new(self, link_field_id, record_id, target_ids))
    }
}

#[derive(Debug)]
pub struct ListLinks<'a> {
    table: &'a Table,
    link_field_id: String,
    record_id: u64,
    filters: FilterProvider,
    sorts: SortProvider,
    pagination: PaginationProvider,
    fields: FieldProvider,
    timeout: Option<Duration>,
}

impl_query_options!(ListLinks {
    Filterable => filter_provider(filters: FilterProvider),
    Sortable => sort_provider(sorts: SortProvider),
    Paginated => pagination_provider(pagination: PaginationProvider),
    FieldSelectable => field_provider(fields: FieldProvider),
    RequestTimeout => timeout_slot(timeout: Option<Duration>),
});

impl ListLinks<'_> {
    pub fn query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.filters.apply(&mut query);
        self.sorts.apply(&mut query);
        self.pagination.apply(&mut query);
        self.fields.apply(&mut query);
        query
    }

    pub fn execute(self) -> Result<ListResponse> {
        let path = self.table.links_path(&self.link_field_id, self.record_id)?;
        self.table
            .client()
            .request_json(HttpMethod::Get, &path, &self.query(), None, self.timeout)
    }
}

/// State shared by the link create and delete builders.
#[derive(Debug)]
struct LinkChange<'a> {
    table: &'a Table,
    link_field_id: String,
    record_id: u64,
    target_ids: Vec<u64>,
    timeout: Option<Duration>,
}

impl<'a> LinkChange<'a> {
    fn new(
        table: &'a Table,
        link_field_id: impl Into<String>,
        record_id: u64,
        target_ids: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            table,
            link_field_id: link_field_id.into(),
            record_id,
            target_ids: target_ids.into_iter().filter(|id| *id != 0).collect(),
            timeout: None,
        }
    }

    fn send(self, method: HttpMethod) -> Result<()> {
        let path = self.table.links_path(&self.link_field_id, self.record_id)?;
        if self.target_ids.is_empty() {
            return Ok(());
        }
        self.table.client().request(
            method,
            &path,
            &QueryParams::new(),
            Some(&id_objects(&self.target_ids)),
            self.timeout,
        )?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct CreateLinks<'a>(LinkChange<'a>);

impl crate::query::RequestTimeout for CreateLinks<'_> {
    fn timeout_slot(&mut self) -> &mut Option<Duration> {
        &mut self.0.timeout
    }
}

impl CreateLinks<'_> {
    pub fn execute(self) -> Result<()> {
        self.0.send(HttpMethod::Post)
    }
}

#[derive(Debug)]
pub struct DeleteLinks<'a>(LinkChange<'a>);

impl crate::query::RequestTimeout for DeleteLinks<'_> {
    fn timeout_slot(&mut self) -> &mut Option<Duration> {
        &mut self.0.timeout
    }
}

impl DeleteLinks<'_> {
    pub fn execute(self) -> Result<()> {
        self.0.send(HttpMethod::Delete)
    }
}
