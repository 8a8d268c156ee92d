use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The closed set of entity classes the receipt-extraction model emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityLabel {
    Store,
    Date,
    Item,
    Price,
    Total,
}

impl EntityLabel {
    pub const ALL: [EntityLabel; 5] = [
        EntityLabel::Store,
        EntityLabel::Date,
        EntityLabel::Item,
        EntityLabel::Price,
        EntityLabel::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Store => "STORE",
            EntityLabel::Date => "DATE",
            EntityLabel::Item => "ITEM",
            EntityLabel::Price => "PRICE",
            EntityLabel::Total => "TOTAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STORE" => Some(EntityLabel::Store),
            "DATE" => Some(EntityLabel::Date),
            "ITEM" => Some(EntityLabel::Item),
            "PRICE" => Some(EntityLabel::Price),
            "TOTAL" => Some(EntityLabel::Total),
            _ => None,
        }
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label to extracted-values map. Every label is always present; an entity
/// the model did not find maps to an empty list, never a missing key.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMap {
    values: BTreeMap<EntityLabel, Vec<String>>,
}

impl EntityMap {
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        for label in EntityLabel::ALL {
            values.insert(label, Vec::new());
        }
        Self { values }
    }

    pub fn get(&self, label: EntityLabel) -> &[String] {
        self.values.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, label: EntityLabel, value: impl Into<String>) {
        self.values.entry(label).or_default().push(value.into());
    }

    /// True when no entity of any label was extracted.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityLabel, &[String])> {
        self.values.iter().map(|(label, values)| (*label, values.as_slice()))
    }
}

impl Default for EntityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for EntityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (label, values) in &self.values {
            map.serialize_entry(label.as_str(), values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityMap {
    /// Accepts any string-keyed map; values under labels outside the fixed
    /// set (the CORD model has many) are dropped.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, Vec<String>> = BTreeMap::deserialize(deserializer)?;
        let mut map = EntityMap::new();
        for (key, values) in raw {
            if let Some(label) = EntityLabel::parse(&key) {
                map.values.entry(label).or_default().extend(values);
            }
        }
        Ok(map)
    }
}

/// Immutable outcome of one pipeline invocation: the entity map plus the
/// model's human-readable rendering of the receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResult {
    pub entities: EntityMap,
    pub formatted_text: String,
}
