//! Resource kinds, identities and flattened field sets

use crate::client::ListOptions;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Opaque backend-assigned key naming one remote object instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ResourceIdentity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A kind of remote object managed through a [`ResourceReconciler`].
///
/// Each kind pairs a typed desired state (what the caller declares) with a
/// typed observed state (what the backend reports). The two are never
/// compared directly: the observed state is first projected back onto the
/// desired shape with [`ResourceKind::import`], then both are flattened into
/// [`FieldSet`]s and compared field by field.
///
/// [`ResourceReconciler`]: crate::reconciler::ResourceReconciler
pub trait ResourceKind: Send + Sync + 'static {
    /// Kind name used as the rule registry key (e.g. "target", "route")
    const KIND: &'static str;

    type Desired: Serialize + Clone + Debug + Send + Sync;
    type Observed: Clone + Debug + Send + Sync;
    type ListOptions: ListOptions + Default + Clone + Send + Sync;

    /// Identity the backend assigned to an observed object
    fn identity(observed: &Self::Observed) -> ResourceIdentity;

    /// Rebuild a desired state from an observed one.
    ///
    /// Server-assigned metadata is dropped.
    fn import(observed: &Self::Observed) -> Self::Desired;

    /// Key that must be unique among live objects of this kind, if any
    fn natural_key(_desired: &Self::Desired) -> Option<String> {
        None
    }

    /// Fields that can only be set at creation time
    fn immutable_fields() -> &'static [&'static str] {
        &[]
    }

    fn validate(_desired: &Self::Desired) -> Result<()> {
        Ok(())
    }
}

/// Flattened view of a serializable state.
///
/// Nested objects become dotted paths (`cos_endpoint.target_crn`); arrays are
/// kept whole. `null` values are treated as unset and omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<String, Value>,
}

impl FieldSet {
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        let mut fields = BTreeMap::new();
        flatten_into(&mut fields, None, value);
        Ok(Self { fields })
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sorted union of the paths present in either set
    pub fn union_paths<'a>(&'a self, other: &'a FieldSet) -> Vec<&'a str> {
        let mut paths: Vec<&str> = self
            .fields
            .keys()
            .chain(other.fields.keys())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }
}

fn flatten_into(fields: &mut BTreeMap<String, Value>, prefix: Option<&str>, value: Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let path = match prefix {
                    Some(p) => format!("{}.{}", p, key),
                    None => key,
                };
                flatten_into(fields, Some(&path), child);
            }
        }
        leaf => {
            if let Some(path) = prefix {
                fields.insert(path.to_string(), leaf);
            }
        }
    }
}
