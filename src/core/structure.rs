use serde_json::Value;

/// Normalized output-shape description.
///
/// Built once from the raw declarative structure by [`StructureConfig::from_value`]
/// and then matched exhaustively by the mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureConfig {
    /// Named output fields, in declaration order
    Mapping(Vec<(String, StructureConfig)>),
    /// `[ { .. } ]` written as the value of a mapping entry
    Group(GroupTemplate),
    /// Template applied once per input record
    List(Box<StructureConfig>),
    /// Direct reference to a flat-table key
    Field(String),
    /// Any shape the mapper does not understand; resolves to a missing value
    Unsupported,
}

/// Item template of a repeatable group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTemplate {
    pub fields: Vec<(String, GroupField)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupField {
    Field(String),
    /// Output field -> source key. `None` when the source is not a string.
    Nested(Vec<(String, Option<String>)>),
    Opaque,
}

impl StructureConfig {
    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => StructureConfig::Mapping(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::mapping_child(value)))
                    .collect(),
            ),
            Value::Array(items) => match items.first() {
                Some(template) => StructureConfig::List(Box::new(Self::from_value(template))),
                None => StructureConfig::Unsupported,
            },
            Value::String(name) => StructureConfig::Field(name.clone()),
            _ => StructureConfig::Unsupported,
        }
    }

    fn mapping_child(raw: &Value) -> Self {
        match raw {
            Value::Array(items) => match items.first() {
                Some(Value::Object(template)) => {
                    StructureConfig::Group(GroupTemplate::from_map(template))
                }
                _ => Self::from_value(raw),
            },
            _ => Self::from_value(raw),
        }
    }

    /// Every flat-table key this structure can read, in declaration order
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            StructureConfig::Mapping(entries) => {
                for (_, child) in entries {
                    child.collect_fields(out);
                }
            }
            StructureConfig::Group(template) => {
                for (_, field) in &template.fields {
                    match field {
                        GroupField::Field(name) => out.push(name),
                        GroupField::Nested(entries) => {
                            out.extend(entries.iter().filter_map(|(_, source)| source.as_deref()))
                        }
                        GroupField::Opaque => {}
                    }
                }
            }
            StructureConfig::List(template) => template.collect_fields(out),
            StructureConfig::Field(name) => out.push(name),
            StructureConfig::Unsupported => {}
        }
    }
}

impl GroupTemplate {
    fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        let fields = map
            .iter()
            .map(|(key, value)| {
                let field = match value {
                    Value::String(source) => GroupField::Field(source.clone()),
                    Value::Object(nested) => GroupField::Nested(
                        nested
                            .iter()
                            .map(|(name, source)| (name.clone(), source.as_str().map(str::to_string)))
                            .collect(),
                    ),
                    _ => GroupField::Opaque,
                };
                (key.clone(), field)
            })
            .collect();

        Self { fields }
    }
}
