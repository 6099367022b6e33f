//! In-memory tables.
//!
//! Tables spring into existence on first use. Each keeps its rows by ID,
//! an auto-increment counter, and the links of every `(link field, row)`
//! pair. Link targets are resolved against the same table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::params::{ListPage, ListParams};

pub type Record = Map<String, Value>;

#[derive(Debug, Default)]
pub struct Store {
    tables: HashMap<String, TableData>,
}

impl Store {
    pub fn table(&mut self, table_id: &str) -> &mut TableData {
        self.tables.entry(table_id.to_string()).or_default()
    }
}

#[derive(Debug, Default)]
pub struct TableData {
    rows: BTreeMap<u64, Record>,
    last_id: u64,
    links: HashMap<(String, u64), BTreeSet<u64>>,
}

impl TableData {
    pub fn list(&self, params: &ListParams) -> ListPage {
        params.page(self.rows.values())
    }

    pub fn count(&self, params: &ListParams) -> usize {
        self.rows.values().filter(|r| params.accepts(r)).count()
    }

    pub fn read(&self, id: u64, params: &ListParams) -> Result<Record, ApiError> {
        self.rows
            .get(&id)
            .map(|r| params.project(r))
            .ok_or_else(|| ApiError::record_not_found(id))
    }

    /// Insert rows, ignoring any `Id` they carry, and return the new IDs.
    pub fn create(&mut self, rows: Vec<Record>) -> Vec<u64> {
        rows.into_iter()
            .map(|mut row| {
                self.last_id += 1;
                let id = self.last_id;
                row.insert("Id".to_string(), Value::from(id));
                self.rows.insert(id, row);
                id
            })
            .collect()
    }

    /// Merge each patch into the row named by its `Id`. All rows are
    /// checked before any is changed.
    pub fn update(&mut self, patches: Vec<Record>) -> Result<Vec<u64>, ApiError> {
        let ids = patches.iter().map(row_id).collect::<Result<Vec<_>, _>>()?;
        if let Some(missing) = ids.iter().find(|id| !self.rows.contains_key(*id)) {
            return Err(ApiError::record_not_found(*missing));
        }
        for (id, patch) in ids.iter().zip(patches) {
            if let Some(row) = self.rows.get_mut(id) {
                for (column, value) in patch {
                    if column != "Id" {
                        row.insert(column, value);
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Remove the rows named in `[{"Id": n}, ...]` along with their links.
    pub fn delete(&mut self, targets: &[Record]) -> Result<Vec<u64>, ApiError> {
        let ids = targets.iter().map(row_id).collect::<Result<Vec<_>, _>>()?;
        if let Some(missing) = ids.iter().find(|id| !self.rows.contains_key(*id)) {
            return Err(ApiError::record_not_found(*missing));
        }
        for id in &ids {
            self.rows.remove(id);
            self.links.retain(|(_, owner), _| owner != id);
            for targets in self.links.values_mut() {
                targets.remove(id);
            }
        }
        Ok(ids)
    }

    pub fn list_links(&self, field: &str, id: u64, params: &ListParams) -> Result<ListPage, ApiError> {
        self.ensure_row(id)?;
        let linked = self
            .links
            .get(&(field.to_string(), id))
            .into_iter()
            .flatten()
            .filter_map(|target| self.rows.get(target));
        Ok(params.page(linked))
    }

    pub fn link(&mut self, field: &str, id: u64, targets: &[Record]) -> Result<(), ApiError> {
        let target_ids = self.existing_targets(id, targets)?;
        self.links
            .entry((field.to_string(), id))
            .or_default()
            .extend(target_ids);
        Ok(())
    }

    pub fn unlink(&mut self, field: &str, id: u64, targets: &[Record]) -> Result<(), ApiError> {
        let target_ids = self.existing_targets(id, targets)?;
        if let Some(linked) = self.links.get_mut(&(field.to_string(), id)) {
            for target in target_ids {
                linked.remove(&target);
            }
        }
        Ok(())
    }

    fn existing_targets(&self, id: u64, targets: &[Record]) -> Result<Vec<u64>, ApiError> {
        self.ensure_row(id)?;
        let ids = targets.iter().map(row_id).collect::<Result<Vec<_>, _>>()?;
        match ids.iter().find(|t| !self.rows.contains_key(*t)) {
            Some(missing) => Err(ApiError::record_not_found(*missing)),
            None => Ok(ids),
        }
    }

    fn ensure_row(&self, id: u64) -> Result<(), ApiError> {
        if self.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(ApiError::record_not_found(id))
        }
    }
}

/// The `Id` of a request item; numbers and numeric strings are accepted.
fn row_id(record: &Record) -> Result<u64, ApiError> {
    let id = match record.get("Id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("each item must have a valid 'Id'"))
}
