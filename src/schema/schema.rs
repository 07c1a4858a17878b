//! Schema management for field definitions.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VecQueryError};
use crate::schema::field::{FieldDefinition, FieldType};

/// A schema defines the fields known to an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FieldDefinition>", into = "Vec<FieldDefinition>")]
pub struct Schema {
    /// Map of field names to their position in `fields`.
    index: AHashMap<String, usize>,
    /// Field definitions in the order they were added.
    fields: Vec<FieldDefinition>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Add a field to the schema.
    pub fn add_field<S: Into<String>>(&mut self, name: S, field_type: FieldType) -> Result<()> {
        let name = name.into();

        if name.is_empty() {
            return Err(VecQueryError::schema("Field name cannot be empty"));
        }

        if self.index.contains_key(&name) {
            return Err(VecQueryError::schema(format!(
                "Field '{name}' already exists"
            )));
        }

        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(FieldDefinition::new(name, field_type));

        Ok(())
    }

    /// Get a field definition by name, failing for undeclared fields.
    pub fn field(&self, name: &str) -> Result<&FieldDefinition> {
        self.get_field(name)
            .ok_or_else(|| VecQueryError::undefined_field(name))
    }

    /// Get a field definition by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&position| &self.fields[position])
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get all field names in the order they were added.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Get all field definitions in the order they were added.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<FieldDefinition>> for Schema {
    fn from(fields: Vec<FieldDefinition>) -> Self {
        let mut schema = Schema::new();
        for field in fields {
            // Later duplicates are dropped.
            let _ = schema.add_field(field.name, field.field_type);
        }
        schema
    }
}

impl From<Schema> for Vec<FieldDefinition> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

/// Builder for creating schemas.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDefinition>,
}

impl SchemaBuilder {
    /// Add a field.
    pub fn field<S: Into<String>>(mut self, name: S, field_type: FieldType) -> Self {
        self.fields.push(FieldDefinition::new(name, field_type));
        self
    }

    /// Build the schema, rejecting empty or duplicate names.
    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema::new();
        for field in self.fields {
            schema.add_field(field.name, field.field_type)?;
        }
        Ok(schema)
    }
}
