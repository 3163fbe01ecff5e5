//! Process-local record store keyed by collection and record id.
//!
//! Cloning a `MemoryStore` is cheap and yields a handle onto the same
//! collections. `MemoryStore::global()` is the process-wide registry used by
//! `query_all`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use lazyq_core::config::EngineConfig;
use lazyq_core::error::{Error, Result};
use lazyq_core::Value;

/// Identity of a record inside a collection.
///
/// Ordering puts all integer ids before string ids; this is the iteration
/// order of every collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Ids are integers or strings. Anything else (floats, null, lists)
    /// cannot identify a record.
    pub fn from_value(v: &Value) -> Option<RecordId> {
        match v {
            Value::Int(i) => Some(RecordId::Int(*i)),
            Value::Str(s) => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::Int(*i),
            RecordId::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<i64> for RecordId {
    fn from(i: i64) -> Self {
        RecordId::Int(i)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadQuery {
    pub collection: String,
    /// `None` reads the whole collection; `Some` reads these ids in order.
    pub roots: Option<Vec<RecordId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteQuery {
    pub collection: String,
    pub op: WriteOp,
    pub records: Vec<Value>,
}

/// A request against the store, as a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreQuery {
    Read(ReadQuery),
    Write(WriteQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreResponse {
    Records(Vec<Value>),
    /// Number of records the write touched.
    Written(usize),
}

type Collection = BTreeMap<RecordId, Value>;

static GLOBAL: Lazy<MemoryStore> =
    Lazy::new(|| MemoryStore::with_id_field(EngineConfig::from_env().id_field));

#[derive(Clone)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    id_field: Arc<str>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("id_field", &self.id_field)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_id_field("id")
    }

    /// Store whose records carry their identity in `id_field`.
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        let id_field: String = id_field.into();
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            id_field: Arc::from(id_field),
        }
    }

    /// Process-wide store, created on first use.
    ///
    /// Its id field comes from `LAZYQ_ID_FIELD` (default `id`).
    pub fn global() -> &'static MemoryStore {
        &GLOBAL
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// True when both handles point at the same collections.
    pub fn same_store(&self, other: &MemoryStore) -> bool {
        Arc::ptr_eq(&self.collections, &other.collections)
    }

    /// The identity of `record`, if it has a usable one.
    pub fn record_id(&self, record: &Value) -> Option<RecordId> {
        record.field(&self.id_field).and_then(RecordId::from_value)
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| Error::Store("store lock poisoned".into()))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| Error::Store("store lock poisoned".into()))
    }

    /// Snapshot read.
    ///
    /// With `ids`, records come back in the order the ids are listed; ids
    /// with no record are skipped. An unknown collection reads as empty.
    pub fn read(&self, collection: &str, ids: Option<&[RecordId]>) -> Result<Vec<Value>> {
        let guard = self.read_guard()?;
        let Some(records) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let out: Vec<Value> = match ids {
            None => records.values().cloned().collect(),
            Some(ids) => ids.iter().filter_map(|id| records.get(id).cloned()).collect(),
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(
            collection,
            by_id = ids.is_some(),
            records = out.len(),
            "store read"
        );

        Ok(out)
    }

    /// Upsert or delete `records`, keyed by each record's id field.
    ///
    /// Every record is checked before anything is applied, so a batch with
    /// one id-less record changes nothing.
    pub fn write(&self, collection: &str, op: WriteOp, records: Vec<Value>) -> Result<usize> {
        if collection.is_empty() {
            return Err(Error::Misuse("collection name must not be empty".into()));
        }
        let keyed = records
            .into_iter()
            .enumerate()
            .map(|(pos, record)| match self.record_id(&record) {
                Some(id) => Ok((id, record)),
                None => Err(Error::Misuse(format!(
                    "record {} written to '{}' has no usable '{}' field",
                    pos, collection, self.id_field
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut guard = self.write_guard()?;
        let touched = match op {
            WriteOp::Upsert => {
                let target = guard.entry(collection.to_string()).or_default();
                let n = keyed.len();
                for (id, record) in keyed {
                    target.insert(id, record);
                }
                n
            }
            WriteOp::Delete => match guard.get_mut(collection) {
                Some(target) => keyed
                    .iter()
                    .filter(|(id, _)| target.remove(id).is_some())
                    .count(),
                None => 0,
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(collection, ?op, touched, "store write");

        Ok(touched)
    }

    pub fn upsert(&self, collection: &str, records: Vec<Value>) -> Result<usize> {
        self.write(collection, WriteOp::Upsert, records)
    }

    pub fn delete(&self, collection: &str, records: Vec<Value>) -> Result<usize> {
        self.write(collection, WriteOp::Delete, records)
    }

    /// Run a read or write described as a value.
    pub fn query(&self, query: StoreQuery) -> Result<StoreResponse> {
        match query {
            StoreQuery::Read(q) => self
                .read(&q.collection, q.roots.as_deref())
                .map(StoreResponse::Records),
            StoreQuery::Write(q) => self
                .write(&q.collection, q.op, q.records)
                .map(StoreResponse::Written),
        }
    }

    /// Number of records in `collection` (0 when it does not exist).
    pub fn len(&self, collection: &str) -> Result<usize> {
        Ok(self.read_guard()?.get(collection).map_or(0, BTreeMap::len))
    }

    /// Sorted collection names.
    pub fn collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read_guard()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Drop every collection.
    pub fn dispose(&self) -> Result<()> {
        self.write_guard()?.clear();
        Ok(())
    }
}
