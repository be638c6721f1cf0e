//! Set-valued state and its governing schema.
//!
//! A [`StateSet`] is the single composite record this crate persists: a
//! mapping from category name to a deduplicated set of strings. A [`Schema`]
//! declares which keys are valid and what each key defaults to when raw
//! input omits it.
//!
//! Reconstruction ([`StateSet::from_raw`]) is total: it either produces a
//! fully valid state or an error, never a partially applied one. Keys present
//! in raw input but absent from the schema are rejected so a stale meta file
//! cannot silently reintroduce an obsolete category.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Caller-supplied declaration of valid keys and their default values.
///
/// Schemas are not persisted; the same schema must be provided on every load
/// for reconstruction to be consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    defaults: BTreeMap<String, BTreeSet<String>>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema declaring `keys`, each defaulting to the empty set.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = keys
            .into_iter()
            .map(|k| (k.into(), BTreeSet::new()))
            .collect();
        Self { defaults }
    }

    /// Declare `key` with the empty set as its default. Builder-style.
    #[must_use]
    pub fn declare(mut self, key: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), BTreeSet::new());
        self
    }

    /// Declare `key` with an explicit default value set. Builder-style.
    #[must_use]
    pub fn declare_with_default<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `key` is declared.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// The declared default for `key`, if any.
    #[must_use]
    pub fn default_for(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.defaults.get(key)
    }

    /// Iterator over declared keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }

    /// Declared keys as owned strings, for error reporting.
    #[must_use]
    pub fn declared(&self) -> Vec<String> {
        self.defaults.keys().cloned().collect()
    }

    /// Number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    /// Whether no keys are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

/// The in-memory state: schema keys mapped to deduplicated string sets.
///
/// Values dedup automatically by set semantics; insertion order is not
/// significant. Serialization materializes each set into a sorted sequence,
/// so repeated exports of an unchanged state happen to be stable here, but
/// callers must not rely on any particular ordering contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateSet {
    sets: BTreeMap<String, BTreeSet<String>>,
}

impl StateSet {
    /// Create a state holding every schema key at its declared default.
    #[must_use]
    pub fn with_defaults(schema: &Schema) -> Self {
        let sets = schema
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { sets }
    }

    /// Reconstruct a state from a raw decoded mapping.
    ///
    /// For each schema-declared key: a present raw value is coerced into a
    /// set of strings; an absent one is filled with the schema default when
    /// `fill_defaults` is true, and rejected otherwise. Raw keys the schema
    /// does not declare are always rejected.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAnObject`] if `raw` is not a JSON object
    /// - [`Error::UnknownKey`] for undeclared raw keys
    /// - [`Error::MissingKey`] for absent keys with `fill_defaults = false`
    /// - [`Error::InvalidValue`] if a raw value is not an array of strings
    pub fn from_raw(raw: &JsonValue, schema: &Schema, fill_defaults: bool) -> Result<Self> {
        let object = raw.as_object().ok_or_else(|| Error::NotAnObject {
            path: std::path::PathBuf::new(),
        })?;

        // Reject undeclared keys before building anything, so an error can
        // never leave a partially applied state behind.
        for key in object.keys() {
            if !schema.contains(key) {
                return Err(Error::UnknownKey {
                    key: key.clone(),
                    declared: schema.declared(),
                });
            }
        }

        let mut sets = BTreeMap::new();
        for (key, default) in &schema.defaults {
            match object.get(key) {
                Some(value) => {
                    sets.insert(key.clone(), coerce_string_set(key, value)?);
                }
                None if fill_defaults => {
                    sets.insert(key.clone(), default.clone());
                }
                None => {
                    return Err(Error::MissingKey { key: key.clone() });
                }
            }
        }

        Ok(Self { sets })
    }

    /// The set stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKey`] if `key` is not part of this state.
    pub fn get(&self, key: &str) -> Result<&BTreeSet<String>> {
        self.sets.get(key).ok_or_else(|| self.unknown_key(key))
    }

    /// Insert a single value under `key`. Returns whether the value was new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKey`] if `key` is not part of this state.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<bool> {
        match self.sets.get_mut(key) {
            Some(set) => Ok(set.insert(value.into())),
            None => Err(self.unknown_key(key)),
        }
    }

    /// Set-union `values` into `key`, never replacing existing content.
    ///
    /// Returns the number of values that were actually new, so repeated
    /// merges of overlapping data report zero and leave the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKey`] if `key` is not part of this state.
    pub fn merge<I, S>(&mut self, key: &str, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(set) = self.sets.get_mut(key) else {
            return Err(self.unknown_key(key));
        };
        let mut added = 0;
        for value in values {
            if set.insert(value.into()) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Replace the set under `key` wholesale (direct key assignment).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKey`] if `key` is not part of this state.
    pub fn assign<I, S>(&mut self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(set) = self.sets.get_mut(key) else {
            return Err(self.unknown_key(key));
        };
        *set = values.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Whether `key` is part of this state.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }

    /// Iterator over keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Iterator over `(key, set)` pairs, in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.sets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys (not values) in this state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether this state holds no keys at all.
    ///
    /// Note the distinction from "every set is empty": a freshly
    /// default-filled state is non-empty by this measure.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total number of values across all keys.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }

    /// Serialization form: a JSON object mapping each key to a sorted array.
    #[must_use]
    pub fn to_value(&self) -> JsonValue {
        let map = self
            .sets
            .iter()
            .map(|(k, set)| {
                let values: Vec<JsonValue> = set
                    .iter()
                    .map(|v| JsonValue::String(v.clone()))
                    .collect();
                (k.clone(), JsonValue::Array(values))
            })
            .collect();
        JsonValue::Object(map)
    }

    /// Materialize as a plain map of value lists, for the binary codec.
    #[must_use]
    pub fn to_lists(&self) -> BTreeMap<String, Vec<String>> {
        self.sets
            .iter()
            .map(|(k, set)| (k.clone(), set.iter().cloned().collect()))
            .collect()
    }

    fn unknown_key(&self, key: &str) -> Error {
        Error::UnknownKey {
            key: key.to_string(),
            declared: self.sets.keys().cloned().collect(),
        }
    }
}

/// Coerce a raw JSON value into a set of strings.
fn coerce_string_set(key: &str, value: &JsonValue) -> Result<BTreeSet<String>> {
    let JsonValue::Array(items) = value else {
        return Err(Error::InvalidValue {
            key: key.to_string(),
            message: format!("expected an array of strings, got {value}"),
        });
    };

    let mut set = BTreeSet::new();
    for item in items {
        match item {
            JsonValue::String(s) => {
                set.insert(s.clone());
            }
            other => {
                return Err(Error::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected a string element, got {other}"),
                });
            }
        }
    }
    Ok(set)
}
