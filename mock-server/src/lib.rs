//! In-memory emulation of the NocoDB v2 record and link endpoints.
//!
//! Every request must carry the configured token in `xc-token`. Errors use
//! NocoDB's `{"msg": "..."}` body.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub mod error;
pub mod filter;
pub mod params;
pub mod store;

pub use error::ApiError;
pub use params::{ListPage, PageInfo};
pub use store::Record;

use params::ListParams;
use store::Store;

/// Token accepted when none is configured.
pub const DEFAULT_TOKEN: &str = "test-token";

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    token: Arc<str>,
}

type QueryMap = Query<HashMap<String, String>>;

/// Router accepting `DEFAULT_TOKEN`.
pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        token: Arc::from(token),
    };
    Router::new()
        .route(
            "/api/v2/tables/{table_id}/records",
            get(list_records)
                .post(create_records)
                .patch(update_records)
                .delete(delete_records),
        )
        .route("/api/v2/tables/{table_id}/records/count", get(count_records))
        .route("/api/v2/tables/{table_id}/records/{record_id}", get(read_record))
        .route(
            "/api/v2/tables/{table_id}/links/{link_field_id}/records/{record_id}",
            get(list_links).post(create_links).delete(delete_links),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    debug!(method = %request.method(), uri = %request.uri(), "request");
    let token = request
        .headers()
        .get("xc-token")
        .and_then(|v| v.to_str().ok());
    if token != Some(&*state.token) {
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(request).await)
}

/// Accept either a JSON array of objects or a single object.
fn records_from_body(body: Value) -> Result<Vec<Record>, ApiError> {
    let items = match body {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Err(ApiError::bad_request("body must be an object or an array of objects")),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(ApiError::bad_request("array items must be objects")),
        })
        .collect()
}

fn id_list(ids: &[u64]) -> Json<Value> {
    Json(Value::Array(ids.iter().map(|id| json!({ "Id": id })).collect()))
}

async fn list_records(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Query(query): QueryMap,
) -> Result<Json<ListPage>, ApiError> {
    let params = ListParams::from_query(&query)?;
    let mut store = state.store.write().await;
    Ok(Json(store.table(&table_id).list(&params)))
}

async fn count_records(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Query(query): QueryMap,
) -> Result<Json<Value>, ApiError> {
    let params = ListParams::from_query(&query)?;
    let mut store = state.store.write().await;
    let count = store.table(&table_id).count(&params);
    Ok(Json(json!({ "count": count })))
}

async fn read_record(
    State(state): State<AppState>,
    Path((table_id, record_id)): Path<(String, u64)>,
    Query(query): QueryMap,
) -> Result<Json<Record>, ApiError> {
    let params = ListParams::from_query(&query)?;
    let mut store = state.store.write().await;
    store.table(&table_id).read(record_id, &params).map(Json)
}

async fn create_records(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let rows = records_from_body(body)?;
    let mut store = state.store.write().await;
    let ids = store.table(&table_id).create(rows);
    debug!(%table_id, created = ids.len(), "records created");
    Ok(id_list(&ids))
}

async fn update_records(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let patches = records_from_body(body)?;
    let mut store = state.store.write().await;
    let ids = store.table(&table_id).update(patches)?;
    Ok(id_list(&ids))
}

async fn delete_records(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let targets = records_from_body(body)?;
    let mut store = state.store.write().await;
    let ids = store.table(&table_id).delete(&targets)?;
    Ok(id_list(&ids))
}

async fn list_links(
    State(state): State<AppState>,
    Path((table_id, link_field_id, record_id)): Path<(String, String, u64)>,
    Query(query): QueryMap,
) -> Result<Json<ListPage>, ApiError> {
    let params = ListParams::from_query(&query)?;
    let mut store = state.store.write().await;
    store
        .table(&table_id)
        .list_links(&link_field_id, record_id, &params)
        .map(Json)
}

async fn create_links(
    State(state): State<AppState>,
    Path((table_id, link_field_id, record_id)): Path<(String, String, u64)>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let targets = records_from_body(body)?;
    let mut store = state.store.write().await;
    store.table(&table_id).link(&link_field_id, record_id, &targets)?;
    Ok((StatusCode::CREATED, Json(Value::Bool(true))))
}

async fn delete_links(
    State(state): State<AppState>,
    Path((table_id, link_field_id, record_id)): Path<(String, String, u64)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let targets = records_from_body(body)?;
    let mut store = state.store.write().await;
    store.table(&table_id).unlink(&link_field_id, record_id, &targets)?;
    Ok(Json(Value::Bool(true)))
}
