//! Blocking client for the NocoDB v2 REST API.
//!
//! # Overview
//! A `Client` is configured once through `ClientBuilder` and hands out
//! `Table` handles. Each table operation is a fluent builder that collects
//! filters, sorting, pagination and the like, then performs one HTTP
//! round-trip in `execute`.
//!
//! ```ignore
//! use nocodb_client::prelude::*;
//!
//! let client = Client::builder()
//!     .base_url("https://app.nocodb.com")
//!     .api_token(token)
//!     .build()?;
//! let users = client.table("m3x9abc");
//!
//! let adults = users
//!     .list_records()
//!     .where_greater_than_or_equal("Age", 18)
//!     .sort_asc_by("Name")
//!     .limit(50)
//!     .execute()?;
//!
//! let id = users.create_record(&json!({"Name": "Ada", "Age": 36})).execute()?;
//! users.update_record(id, &json!({"Age": 37})).execute()?;
//! ```
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`/`HttpResponse`)
//!   exchanged with a `Transport`; `UreqTransport` is the default and tests
//!   swap in an in-process fake.
//! - Query options live in small providers (`query`) shared by every
//!   builder that supports them, exposed through traits re-exported from
//!   `prelude`.
//! - Records are untyped JSON maps; `decode_into` converts them into caller
//!   types through serde.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod filter;
pub mod http;
pub mod links;
pub mod query;
pub mod records;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{Client, Table};
pub use config::ClientBuilder;
pub use error::{Error, Result};
pub use filter::{
    ComparisonOperator, DateSubOperator, DateWithinSubOperator, Filter, FilterExpr, FilterGroup,
    LogicalOperator, UnknownOperator,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use links::{CreateLinks, DeleteLinks, ListLinks};
pub use query::{QueryParams, Sort, SortDirection};
pub use records::{
    CountRecords, CreateRecord, CreateRecords, DeleteRecord, DeleteRecords, ListRecords, ReadRecord,
    UpdateRecord, UpdateRecords,
};
pub use types::{ListResponse, PageInfo, ReadResponse, Record};

/// Everything needed to build and run queries, including the fluent option
/// traits that must be in scope for their methods to resolve.
pub mod prelude {
    pub use crate::client::{Client, Table};
    pub use crate::error::{Error, Result};
    pub use crate::filter::{DateSubOperator, DateWithinSubOperator, Filter, FilterGroup};
    pub use crate::query::{
        FieldSelectable, Filterable, Paginated, RequestTimeout, Shuffleable, Sort, Sortable,
        ViewSelectable,
    };
    pub use crate::types::{ListResponse, Record};
}
