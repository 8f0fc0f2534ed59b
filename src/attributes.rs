//! Flat attribute maps for connectors, pools and valves
//!
//! Every descriptor rendered into `server.xml` is a map of XML attribute
//! names to values, built from defaults and then overlaid with whatever the
//! operator supplied.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Attribute name -> value, ordered by name for deterministic rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Set an attribute, replacing any previous value
    pub fn set(&mut self, name: &str, value: impl ToString) {
        self.0.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Shallow overlay: each key in `overlay` replaces the same key here,
    /// unknown keys are added as-is. Nothing is validated.
    pub fn overlay(mut self, overlay: &Attributes) -> Self {
        for (name, value) in &overlay.0 {
            self.0.insert(name.clone(), value.clone());
        }
        self
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Attributes {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Scalars accepted as attribute values in configuration files
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s,
        }
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter().map(|(k, v)| (k, String::from(v))).collect(),
        ))
    }
}
