//! Schema declarations for emitted records.
//!
//! Schemas are declared with a small typed builder and rendered as JSON
//! Schema documents for SCHEMA messages and the catalog. The same
//! declaration is used to conform records before emission: fields outside
//! the schema are dropped and declared fields missing from the payload are
//! filled with `null`.

use crate::Record;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Type of a declared property.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// RFC 3339 timestamp, carried as a string.
    DateTime,
    /// Whole number.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Nested object with its own properties (empty means free-form).
    Object(Vec<Property>),
    /// Array of a single item type.
    Array(Box<FieldType>),
    /// Unconstrained value.
    Any,
}

impl FieldType {
    /// Array of `item`.
    pub fn array_of(item: FieldType) -> Self {
        Self::Array(Box::new(item))
    }

    /// Object with the given nested properties.
    pub fn object(properties: impl IntoIterator<Item = Property>) -> Self {
        Self::Object(properties.into_iter().collect())
    }

    fn to_json_schema(&self, nullable: bool) -> Value {
        let with_null = |ty: &str| {
            if nullable {
                json!([ty, "null"])
            } else {
                json!(ty)
            }
        };

        match self {
            FieldType::String => json!({ "type": with_null("string") }),
            FieldType::DateTime => json!({ "type": with_null("string"), "format": "date-time" }),
            FieldType::Integer => json!({ "type": with_null("integer") }),
            FieldType::Number => json!({ "type": with_null("number") }),
            FieldType::Boolean => json!({ "type": with_null("boolean") }),
            FieldType::Object(props) => {
                let mut schema = json!({
                    "type": with_null("object"),
                    "properties": properties_json(props),
                });
                let required = required_names(props);
                if !required.is_empty() {
                    schema["required"] = json!(required);
                }
                schema
            }
            FieldType::Array(item) => json!({
                "type": with_null("array"),
                "items": item.to_json_schema(false),
            }),
            FieldType::Any => json!({}),
        }
    }
}

/// A named, typed property of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Whether the property must be present and non-null.
    pub required: bool,
    /// Optional human-readable description.
    pub description: Option<String>,
}

impl Property {
    /// Creates an optional property.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Marks the property as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An ordered list of top-level properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    properties: Vec<Property>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property. A property with the same name replaces the earlier one.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.properties.retain(|p| p.name != property.name);
        self.properties.push(property);
        self
    }

    /// Shorthand for adding an optional property.
    #[must_use]
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.property(Property::new(name, field_type))
    }

    /// Shorthand for adding a required property.
    #[must_use]
    pub fn required_field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.property(Property::new(name, field_type).required())
    }

    /// Declared properties in declaration order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns true if `name` is a declared property.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set of declared property names.
    pub fn property_names(&self) -> BTreeSet<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    /// Renders the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": properties_json(&self.properties),
        });
        let required = required_names(&self.properties);
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Conforms `record` to the schema.
    ///
    /// Returns the conformed record and the names of the dropped fields.
    /// Only top-level fields are conformed; nested values pass through.
    pub fn conform(&self, mut record: Record) -> (Record, Vec<String>) {
        let mut conformed = Record::new();
        for property in &self.properties {
            let value = record.remove(&property.name).unwrap_or(Value::Null);
            conformed.insert(property.name.clone(), value);
        }
        let dropped = record.into_iter().map(|(k, _)| k).collect();
        (conformed, dropped)
    }
}

fn properties_json(properties: &[Property]) -> Value {
    let mut map = Map::new();
    for property in properties {
        let mut value = property.field_type.to_json_schema(!property.required);
        if let (Some(description), Value::Object(obj)) = (&property.description, &mut value) {
            obj.insert("description".into(), json!(description));
        }
        map.insert(property.name.clone(), value);
    }
    Value::Object(map)
}

fn required_names(properties: &[Property]) -> Vec<&str> {
    properties
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect()
}
