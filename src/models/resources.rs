//! # Resource Requirements
//!
//! A resource vector maps resource names to non-negative quantities. Tasks
//! carry two of them: the resources needed to execute and the resources that
//! must be free on a node before the task is placed there.

use crate::error::{ControlPlaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `(name, quantity)` entry as it appears in records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePair {
    pub key: String,
    pub value: f64,
}

impl ResourcePair {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Validated resource vector with unique keys and non-negative quantities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResourcePair>", into = "Vec<ResourcePair>")]
pub struct ResourceSet {
    quantities: BTreeMap<String, f64>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from pairs, rejecting duplicate keys and negative or
    /// non-finite quantities.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut quantities = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if !value.is_finite() || value < 0.0 {
                return Err(ControlPlaneError::NegativeResourceQuantity { key, value });
            }
            if quantities.contains_key(&key) {
                return Err(ControlPlaneError::DuplicateResourceKey { key });
            }
            quantities.insert(key, value);
        }
        Ok(Self { quantities })
    }

    pub fn get(&self, key: &str) -> f64 {
        self.quantities.get(key).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.quantities.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True iff every requested quantity is available; keys absent from
    /// `available` count as zero.
    pub fn matches(&self, available: &ResourceSet) -> bool {
        self.quantities
            .iter()
            .all(|(key, required)| available.get(key) >= *required)
    }

    pub fn to_pairs(&self) -> Vec<ResourcePair> {
        self.quantities
            .iter()
            .map(|(key, value)| ResourcePair::new(key.clone(), *value))
            .collect()
    }
}

impl TryFrom<Vec<ResourcePair>> for ResourceSet {
    type Error = ControlPlaneError;

    fn try_from(pairs: Vec<ResourcePair>) -> Result<Self> {
        Self::from_pairs(pairs.into_iter().map(|p| (p.key, p.value)))
    }
}

impl From<ResourceSet> for Vec<ResourcePair> {
    fn from(set: ResourceSet) -> Self {
        set.to_pairs()
    }
}
