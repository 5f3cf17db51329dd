//! Schema types and builders
//!
//! A schema describes the configurable fields of a resource: their types, the
//! required/optional/computed flags, defaults, validators and nested blocks.
//! Plan-time behaviour driven by the schema lives in [`crate::plan`].

use crate::types::Dynamic;
use crate::validate;
use crate::validator::{FuncValidator, StringNotEmptyValidator, Validator};
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
}

/// Schema is returned for every resource type.
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value destroys and recreates the resource
    pub force_new: bool,
    pub default: Option<Dynamic>,
    /// Paths (dotted, from the root) that must not be set together with this one
    pub conflicts_with: Vec<String>,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("default", &self.default)
            .field("conflicts_with", &self.conflicts_with)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: usize,
    /// Zero means unbounded
    pub max_items: usize,
    pub force_new: bool,
    pub computed: bool,
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    List,
    Set,
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                default: None,
                conflicts_with: Vec::new(),
                validators: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    /// Value used when the attribute is absent from configuration
    pub fn default(mut self, value: Dynamic) -> Self {
        self.attribute.default = Some(value);
        self
    }

    pub fn conflicts_with(mut self, path: &str) -> Self {
        self.attribute.conflicts_with.push(path.to_string());
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder provides fluent API for building nested blocks
pub struct NestedBlockBuilder {
    block: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            block: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::default(),
                nesting,
                min_items: 0,
                max_items: 0,
                force_new: false,
                computed: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block.block.block_types.push(block);
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.block.min_items = min;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.block.max_items = max;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.block.force_new = true;
        self
    }

    /// Block is filled in by the provider rather than configured
    pub fn computed(mut self) -> Self {
        self.block.computed = true;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.block
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for the computed `id` attribute every resource carries
pub fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The ARM resource ID")
        .computed()
        .build()
}

/// Azure region, stored normalized. Changing it recreates the resource.
pub fn location_attribute() -> Attribute {
    AttributeBuilder::new("location", AttributeType::String)
        .description("The Azure region where the resource exists")
        .required()
        .force_new()
        .validator(Box::new(StringNotEmptyValidator))
        .build()
}

pub fn resource_group_name_attribute() -> Attribute {
    AttributeBuilder::new("resource_group_name", AttributeType::String)
        .description("The name of the resource group the resource belongs to")
        .required()
        .force_new()
        .validator(Box::new(FuncValidator::new(
            validate::resource_group_name,
            "resource group name",
        )))
        .build()
}

/// Shorthand for the `tags` map every tracked resource carries
pub fn tags_attribute() -> Attribute {
    AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
        .description("A mapping of tags to assign to the resource")
        .optional()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::StringLengthValidator;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .force_new()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert!(attr.force_new);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn cloned_attribute_keeps_validators() {
        let attr = AttributeBuilder::new("title", AttributeType::String)
            .optional()
            .validator(Box::new(StringLengthValidator {
                min: Some(1),
                max: Some(120),
            }))
            .build();

        assert_eq!(attr.clone().validators.len(), 1);
    }

    #[test]
    fn schema_builder_creates_schema_with_blocks() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(id_attribute())
            .block(
                NestedBlockBuilder::new("dns", NestingMode::List)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("search_domain", AttributeType::String)
                            .optional()
                            .build(),
                    )
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 1);
        let dns = schema.block.block_type("dns").unwrap();
        assert_eq!(dns.max_items, 1);
        assert!(dns.block.attribute("search_domain").is_some());
    }
}
