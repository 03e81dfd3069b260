use log::debug;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Category marker carried by leaf nodes that hold a value.
pub const DATAPOINT_CATEGORY: &str = "datapoint";

/// Result of looking a key up in a [`FlatTable`] or a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> Lookup<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match *self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

/// Flat `schema_id -> value` table built from one annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    fields: HashMap<String, Value>,
}

impl FlatTable {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Insert a value, replacing any earlier value for the same schema id
    pub fn insert(&mut self, schema_id: impl Into<String>, value: Value) {
        self.fields.insert(schema_id.into(), value);
    }

    pub fn lookup(&self, schema_id: &str) -> Lookup<'_> {
        match self.fields.get(schema_id) {
            Some(value) => Lookup::Found(value),
            None => Lookup::Missing,
        }
    }

    pub fn contains(&self, schema_id: &str) -> bool {
        self.fields.contains_key(schema_id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FlatTable {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut table = FlatTable::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

/// Flattener walks an annotation tree depth-first and publishes every datapoint
/// under its `schema_id`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flattener;

impl Flattener {
    pub fn new() -> Self {
        Flattener
    }

    pub fn flatten(&self, annotation: &Value) -> FlatTable {
        let mut table = FlatTable::new();
        let mut visited: HashSet<String> = HashSet::new();

        self.visit(annotation, &mut table, &mut visited);

        debug!("Flattened annotation into {} datapoints", table.len());
        table
    }

    fn visit(&self, node: &Value, table: &mut FlatTable, visited: &mut HashSet<String>) {
        match node {
            Value::Object(map) => {
                self.record_datapoint(map, table, visited);

                // Containers may also be datapoints, so always descend
                for child in map.values() {
                    self.visit(child, table, visited);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, table, visited);
                }
            }
            _ => {}
        }
    }

    fn record_datapoint(
        &self,
        node: &serde_json::Map<String, Value>,
        table: &mut FlatTable,
        visited: &mut HashSet<String>,
    ) {
        if node.get("category").and_then(Value::as_str) != Some(DATAPOINT_CATEGORY) {
            return;
        }

        let schema_id = match node.get("schema_id").and_then(Value::as_str) {
            Some(schema_id) if !schema_id.is_empty() => schema_id,
            _ => return,
        };

        // JSON text keeps `1` and `"1"` apart
        let node_id = node.get("id").filter(|id| !id.is_null()).map(Value::to_string);
        if let Some(node_id) = &node_id {
            if visited.contains(node_id) {
                return;
            }
        }

        let value = match node.get("content") {
            Some(Value::Object(content)) => match content.get("value") {
                Some(value) => value,
                None => return,
            },
            _ => return,
        };

        table.insert(schema_id, value.clone());
        if let Some(node_id) = node_id {
            visited.insert(node_id);
        }
    }
}
