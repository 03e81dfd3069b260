use crate::core::flatten::{FlatTable, Lookup};
use crate::core::structure::{GroupField, GroupTemplate, StructureConfig};
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt::Write;

/// Field reference whose string value is always upper-cased.
pub const CURRENCY_FIELD: &str = "currency";

/// Input layouts recognised when date normalization is enabled.
const DATE_INPUT_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Mapped output tree, shaped like the structure config that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Map(Vec<(String, OutputValue)>),
    List(Vec<OutputValue>),
    Scalar(Value),
    /// No value available. Rendered as empty text.
    Missing,
}

impl OutputValue {
    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        match self {
            OutputValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// JSON view of the tree with missing values collapsed to `""`
    pub fn to_json(&self) -> Value {
        match self {
            OutputValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            OutputValue::List(items) => Value::Array(items.iter().map(OutputValue::to_json).collect()),
            OutputValue::Scalar(value) => value.clone(),
            OutputValue::Missing => Value::String(String::new()),
        }
    }
}

/// Data a structure is resolved against.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Table(&'a FlatTable),
    /// One input record while repeating a list template
    Record(&'a Value),
    Empty,
}

impl<'a> Scope<'a> {
    pub fn lookup(&self, key: &str) -> Lookup<'a> {
        match *self {
            Scope::Table(table) => table.lookup(key),
            Scope::Record(Value::Object(map)) => match map.get(key) {
                Some(value) => Lookup::Found(value),
                None => Lookup::Missing,
            },
            _ => Lookup::Missing,
        }
    }

    fn records(&self) -> Option<&'a [Value]> {
        match *self {
            Scope::Record(Value::Array(items)) if !items.is_empty() => Some(items.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapperOptions {
    /// chrono format that recognised dates are re-rendered with
    pub date_format: Option<String>,
}

/// StructureMapper resolves a [`StructureConfig`] against flattened annotation data.
#[derive(Debug, Clone, Default)]
pub struct StructureMapper {
    options: MapperOptions,
}

impl StructureMapper {
    pub fn new() -> Self {
        Self {
            options: MapperOptions::default(),
        }
    }

    pub fn with_options(options: MapperOptions) -> Self {
        Self { options }
    }

    pub fn map(&self, config: &StructureConfig, table: &FlatTable) -> OutputValue {
        self.map_value(config, Scope::Table(table))
    }

    pub fn map_value(&self, config: &StructureConfig, scope: Scope<'_>) -> OutputValue {
        match config {
            StructureConfig::Mapping(entries) => OutputValue::Map(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), self.map_value(child, scope)))
                    .collect(),
            ),
            StructureConfig::Group(template) => self.map_group(template, scope),
            StructureConfig::List(template) => self.map_list(template, scope),
            StructureConfig::Field(name) => self.map_field(name, scope),
            StructureConfig::Unsupported => OutputValue::Missing,
        }
    }

    /// A repeatable group yields exactly one item: the resolved fields, or a
    /// placeholder when nothing resolved.
    // TODO: repeat per input record once line items are published as records
    // rather than flattened into single schema ids.
    fn map_group(&self, template: &GroupTemplate, scope: Scope<'_>) -> OutputValue {
        let mut resolved = Vec::new();

        for (key, field) in &template.fields {
            match field {
                GroupField::Field(source) => {
                    if let Lookup::Found(value) = scope.lookup(source) {
                        resolved.push((key.clone(), OutputValue::Scalar(self.normalize_date(value))));
                    }
                }
                GroupField::Nested(entries) => {
                    let nested: Vec<(String, OutputValue)> = entries
                        .iter()
                        .filter_map(|(name, source)| {
                            let value = scope.lookup(source.as_deref()?).value()?;
                            Some((name.clone(), OutputValue::Scalar(self.normalize_date(value))))
                        })
                        .collect();
                    if !nested.is_empty() {
                        resolved.push((key.clone(), OutputValue::Map(nested)));
                    }
                }
                GroupField::Opaque => {}
            }
        }

        if resolved.is_empty() {
            return OutputValue::List(vec![Self::group_placeholder(template)]);
        }
        OutputValue::List(vec![OutputValue::Map(resolved)])
    }

    fn group_placeholder(template: &GroupTemplate) -> OutputValue {
        OutputValue::Map(
            template
                .fields
                .iter()
                .map(|(key, field)| {
                    let value = match field {
                        GroupField::Nested(entries) => OutputValue::Map(
                            entries
                                .iter()
                                .map(|(name, _)| (name.clone(), OutputValue::Missing))
                                .collect(),
                        ),
                        _ => OutputValue::Missing,
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }

    fn map_list(&self, template: &StructureConfig, scope: Scope<'_>) -> OutputValue {
        match scope.records() {
            Some(records) => OutputValue::List(
                records
                    .iter()
                    .map(|record| self.map_value(template, Scope::Record(record)))
                    .collect(),
            ),
            // Never emit an empty list
            None => OutputValue::List(vec![self.map_value(template, Scope::Empty)]),
        }
    }

    fn map_field(&self, name: &str, scope: Scope<'_>) -> OutputValue {
        let value = match scope.lookup(name) {
            Lookup::Found(value) => value,
            Lookup::Missing => return OutputValue::Missing,
        };

        if name == CURRENCY_FIELD {
            if let Value::String(code) = value {
                return OutputValue::Scalar(Value::String(code.to_uppercase()));
            }
        }
        OutputValue::Scalar(self.normalize_date(value))
    }

    fn normalize_date(&self, value: &Value) -> Value {
        let (Some(format), Value::String(text)) = (&self.options.date_format, value) else {
            return value.clone();
        };

        let trimmed = text.trim();
        DATE_INPUT_FORMATS
            .iter()
            .find_map(|input| NaiveDate::parse_from_str(trimmed, input).ok())
            .and_then(|date| {
                // An unrenderable format leaves the value as it was
                let mut rendered = String::new();
                write!(rendered, "{}", date.format(format)).ok()?;
                Some(Value::String(rendered))
            })
            .unwrap_or_else(|| value.clone())
    }
}
