//! In-memory tabular store
//!
//! Holds named collections. A collection created from a JSON array is a
//! table: an ordered sequence of records (JSON objects) supporting
//! insert/update/delete/search. Anything else is kept verbatim and can only
//! be read back with [`Store::get`].

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// A single record: an object with arbitrary fields
pub type Record = Map<String, Value>;

/// In-memory store of named collections
///
/// Predicates passed to table operations run while the store lock is held
/// and must not call back into the same store.
pub struct Store {
    collections: RwLock<HashMap<String, Value>>,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self, op: &'static str) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Value>>> {
        self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned(op))
    }

    fn write(&self, op: &'static str) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Value>>> {
        self
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned(op))
    }

    /// Register (or replace) the collection `name`.
    ///
    /// `None` creates an empty table. An array becomes a table; any other
    /// value is stored as is and table operations on it will fail with
    /// [`StoreError::EntityNotArray`].
    pub fn create(&self, name: impl Into<String>, initial_state: Option<Value>) -> StoreResult<()> {
        let name = name.into();
        let state = initial_state.unwrap_or_else(|| Value::Array(Vec::new()));
        debug!(collection = %name, table = state.is_array(), "create collection");

        let mut collections = self.write("create")?;
        collections.insert(name, state);
        Ok(())
    }

    /// Create every collection listed in `fixtures`, an object mapping
    /// collection name to initial state. Returns how many were created.
    pub fn seed(&self, fixtures: Value) -> StoreResult<usize> {
        let Value::Object(fixtures) = fixtures else {
            warn!("seed fixtures are not an object");
            return Err(StoreError::InvalidEntry);
        };

        let mut collections = self.write("seed")?;
        let count = fixtures.len();
        for (name, state) in fixtures {
            debug!(collection = %name, table = state.is_array(), "seed collection");
            collections.insert(name, state);
        }
        Ok(count)
    }

    /// Append `record` to the table `name`.
    ///
    /// With `primary_key_field`, the field is set to one more than the
    /// largest value currently held in that field (missing or non-numeric
    /// values count as 0), overwriting whatever the record carried. The
    /// computed key is returned. An empty field name is treated as no field.
    pub fn insert(
        &self,
        name: &str,
        record: Value,
        primary_key_field: Option<&str>,
    ) -> StoreResult<Option<i64>> {
        let Value::Object(mut entry) = record else {
            warn!(collection = name, "insert rejected: record is not an object");
            return Err(StoreError::InvalidEntry);
        };

        let mut collections = self.write("insert")?;
        let rows = table_mut(&mut collections, name)?;

        let key = match primary_key_field.filter(|field| !field.is_empty()) {
            Some(field) => {
                let Some(next) = next_key(rows, field) else {
                    warn!(collection = name, field, "insert rejected: key space exhausted");
                    return Err(StoreError::KeyOverflow {
                        collection: name.to_string(),
                        field: field.to_string(),
                    });
                };
                entry.insert(field.to_string(), Value::from(next));
                Some(next)
            }
            None => None,
        };
        rows.push(Value::Object(entry));

        debug!(collection = name, ?key, len = rows.len(), "inserted record");
        Ok(key)
    }

    /// Merge `patch` into every record matching `matches`. Fields of the
    /// patch win; a patch that is not an object contributes no fields.
    /// Returns the number of matched records.
    pub fn update<F>(&self, name: &str, patch: Value, matches: F) -> StoreResult<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let patch = match patch {
            Value::Object(fields) => fields,
            _ => Record::new(),
        };

        let mut collections = self.write("update")?;
        let rows = table_mut(&mut collections, name)?;

        let mut updated = 0;
        let next: Vec<Value> = std::mem::take(rows)
            .into_iter()
            .map(|row| {
                if matches(&row) {
                    updated += 1;
                    merge(row, &patch)
                } else {
                    row
                }
            })
            .collect();
        *rows = next;

        debug!(collection = name, updated, "updated records");
        Ok(updated)
    }

    /// Remove every record matching `matches`, keeping the order of the
    /// rest. Returns the number of removed records.
    pub fn delete<F>(&self, name: &str, matches: F) -> StoreResult<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let mut collections = self.write("delete")?;
        let rows = table_mut(&mut collections, name)?;

        let before = rows.len();
        rows.retain(|row| !matches(row));
        let removed = before - rows.len();

        debug!(collection = name, removed, "deleted records");
        Ok(removed)
    }

    /// Copies of the records matching `filter`, in table order
    pub fn search<F>(&self, name: &str, filter: F) -> StoreResult<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let collections = self.read("search")?;
        let rows = table(&collections, name)?;
        let found: Vec<Value> = rows.iter().filter(|row| filter(*row)).cloned().collect();

        debug!(collection = name, found = found.len(), "search");
        Ok(found)
    }

    /// Copy of the whole table
    pub fn search_all(&self, name: &str) -> StoreResult<Vec<Value>> {
        let collections = self.read("search")?;
        Ok(table(&collections, name)?.clone())
    }

    /// Whether any record of the table matches `filter`
    pub fn test_some<F>(&self, name: &str, filter: F) -> StoreResult<bool>
    where
        F: Fn(&Value) -> bool,
    {
        let collections = self.read("test_some")?;
        let rows = table(&collections, name)?;
        Ok(rows.iter().any(filter))
    }

    /// Copy of the raw value stored under `name`, table or not
    pub fn get(&self, name: &str) -> StoreResult<Value> {
        let collections = self.read("get")?;
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::EntityNotFound(name.to_string()))
    }

    /// Whether a collection is registered under `name`
    pub fn contains(&self, name: &str) -> StoreResult<bool> {
        Ok(self.read("contains")?.contains_key(name))
    }

    /// Registered collection names, sorted
    pub fn collections(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self.read("collections")?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn table<'a>(collections: &'a HashMap<String, Value>, name: &str) -> StoreResult<&'a Vec<Value>> {
    match collections.get(name) {
        Some(Value::Array(rows)) => Ok(rows),
        Some(_) => Err(not_array(name)),
        None => Err(not_found(name)),
    }
}

fn table_mut<'a>(
    collections: &'a mut HashMap<String, Value>,
    name: &str,
) -> StoreResult<&'a mut Vec<Value>> {
    match collections.get_mut(name) {
        Some(Value::Array(rows)) => Ok(rows),
        Some(_) => Err(not_array(name)),
        None => Err(not_found(name)),
    }
}

fn not_found(name: &str) -> StoreError {
    warn!(collection = name, "entity does not exist");
    StoreError::EntityNotFound(name.to_string())
}

fn not_array(name: &str) -> StoreError {
    warn!(collection = name, "entity is not an array");
    StoreError::EntityNotArray(name.to_string())
}

/// `1 + max` over the current values of `field`; missing or non-numeric
/// values count as 0 and fractional ones are floored. Keys freed by
/// deletes are handed out again. `None` once `i64::MAX` is taken.
fn next_key(rows: &[Value], field: &str) -> Option<i64> {
    rows.iter()
        .map(|row| row.get(field).and_then(key_value).unwrap_or(0))
        .fold(0, i64::max)
        .checked_add(1)
}

fn key_value(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

fn merge(row: Value, patch: &Record) -> Value {
    if patch.is_empty() {
        return row;
    }
    match row {
        Value::Object(mut fields) => {
            fields.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(fields)
        }
        // a non-object element has no fields to keep
        _ => Value::Object(patch.clone()),
    }
}
