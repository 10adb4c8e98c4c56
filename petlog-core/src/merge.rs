//! Merging extracted pets into an existing pets.json dataset.
//!
//! A dataset is either an object keyed by pet name or an array of objects
//! that each carry a `name`. The output always keeps the input's shape, and
//! only the recognized pet fields are ever written; anything else already in
//! the dataset is left alone.

use crate::error::{PetlogError, Result};
use crate::file_utils::read_json_file;
use crate::models::{PetIndex, PetRecord};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Fields the merger reads from a patch and writes into the dataset.
pub const MERGE_FIELDS: [&str; 5] = ["grade", "s0", "sg", "attr", "route"];

/// A loaded pets.json in one of its two shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// `{"이름": {...}, ...}`
    Keyed(Map<String, Value>),
    /// `[{"name": "이름", ...}, ...]`
    Listed(Vec<Value>),
}

/// Counts from a single merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// Existing entries that received fields.
    pub updated: usize,
    /// Entries created for pets the dataset did not have.
    pub added: usize,
    /// Keyed entries left untouched because they are not objects.
    pub skipped: usize,
}

impl Dataset {
    /// Classify a parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Dataset::Keyed(map)),
            Value::Array(items) => Ok(Dataset::Listed(items)),
            other => Err(PetlogError::InvalidDataset(format!(
                "expected an object or an array, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Load a dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PetlogError::NotFound(format!(
                "Dataset not found: {}",
                path.display()
            )));
        }
        let dataset = Self::from_value(read_json_file(path)?)?;
        debug!("Loaded {} dataset with {} entries from {:?}", dataset.shape(), dataset.len(), path);
        Ok(dataset)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Dataset::Keyed(_) => "keyed",
            Dataset::Listed(_) => "listed",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Keyed(map) => map.len(),
            Dataset::Listed(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a patch in place.
    pub fn merge(&mut self, patch: &PetIndex) -> Result<MergeSummary> {
        match self {
            Dataset::Keyed(map) => apply_patch(map, patch),
            Dataset::Listed(items) => apply_patch(&mut ListedStore::new(items), patch),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Dataset::Keyed(map) => Value::Object(map),
            Dataset::Listed(items) => Value::Array(items),
        }
    }
}

/// Load a dataset, merge the patch into it and return the merged JSON.
pub fn merge_into_dataset(path: &Path, patch: &PetIndex) -> Result<(Value, MergeSummary)> {
    let mut dataset = Dataset::load(path)?;
    let summary = dataset.merge(patch)?;
    info!(
        "Merged {} pets into {:?}: {} updated, {} added, {} skipped",
        patch.len(),
        path,
        summary.updated,
        summary.added,
        summary.skipped
    );
    Ok((dataset.into_value(), summary))
}

/// Where a patch entry lands in the dataset.
enum Slot<'a> {
    Existing(&'a mut Map<String, Value>),
    Created(&'a mut Map<String, Value>),
    Unusable,
}

trait EntryStore {
    fn find_or_create(&mut self, name: &str) -> Slot<'_>;
}

impl EntryStore for Map<String, Value> {
    fn find_or_create(&mut self, name: &str) -> Slot<'_> {
        let entry = self.entry(name).or_insert(Value::Null);
        let created = entry.is_null();
        if created {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(target) => {
                if created {
                    Slot::Created(target)
                } else {
                    Slot::Existing(target)
                }
            }
            _ => Slot::Unusable,
        }
    }
}

/// Array dataset with a name index built once up front.
struct ListedStore<'a> {
    items: &'a mut Vec<Value>,
    by_name: HashMap<String, usize>,
}

impl<'a> ListedStore<'a> {
    fn new(items: &'a mut Vec<Value>) -> Self {
        // Entries without a string name are never matched; the last duplicate wins.
        let by_name = items
            .iter()
            .enumerate()
            .filter_map(|(pos, item)| {
                let name = item.as_object()?.get("name")?.as_str()?;
                Some((name.to_string(), pos))
            })
            .collect();
        Self { items, by_name }
    }
}

impl EntryStore for ListedStore<'_> {
    fn find_or_create(&mut self, name: &str) -> Slot<'_> {
        if let Some(pos) = self.by_name.get(name).copied() {
            return match self.items[pos].as_object_mut() {
                Some(target) => Slot::Existing(target),
                None => Slot::Unusable,
            };
        }

        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(name.to_string()));
        self.items.push(Value::Object(obj));
        self.by_name.insert(name.to_string(), self.items.len() - 1);

        match self.items.last_mut() {
            Some(Value::Object(target)) => Slot::Created(target),
            _ => Slot::Unusable,
        }
    }
}

fn apply_patch<S: EntryStore>(store: &mut S, patch: &PetIndex) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();

    for record in patch.iter() {
        let extra = patch_fields(record)?;
        match store.find_or_create(&record.name) {
            Slot::Existing(target) => {
                merge_fields(target, &extra);
                summary.updated += 1;
            }
            Slot::Created(target) => {
                merge_fields(target, &extra);
                summary.added += 1;
            }
            Slot::Unusable => {
                warn!("Dataset entry for {} is not an object, skipping", record.name);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Present fields of a record as JSON, keyed by field name.
fn patch_fields(record: &PetRecord) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(PetlogError::Parse(format!(
            "Pet {} serialized to {} instead of an object",
            record.name,
            json_kind(&other)
        ))),
    }
}

/// Copy the recognized fields of `extra` into `target`.
///
/// Nested objects present on both sides are updated key by key; everything
/// else replaces the existing value.
fn merge_fields(target: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for key in MERGE_FIELDS {
        let Some(value) = extra.get(key) else {
            continue;
        };

        if let (Value::Object(incoming), Some(Value::Object(existing))) = (value, target.get_mut(key)) {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
            continue;
        }

        target.insert(key.to_string(), value.clone());
    }
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
