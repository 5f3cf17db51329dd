//! Schema-driven planning
//!
//! These helpers do the work the framework boundary needs before a resource's
//! own plan modification runs: validating configuration, filling defaults,
//! carrying computed values forward from state and working out which changes
//! force a replacement.

use crate::schema::{Block, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Validate configuration against a schema
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(
        &schema.block,
        &config.value,
        &AttributePath::root(),
        config,
        &mut diagnostics,
    );
    diagnostics
}

fn validate_block(
    block: &Block,
    value: &Dynamic,
    prefix: &AttributePath,
    root: &DynamicValue,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let empty = HashMap::new();
    let object = value.as_map().unwrap_or(&empty);

    for attr in &block.attributes {
        let path = prefix.clone().attribute(&attr.name);
        let current = object.get(&attr.name).unwrap_or(&Dynamic::Null);

        if current.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!(
                            "The argument \"{}\" is required, but no definition was found.",
                            path
                        ),
                    )
                    .with_attribute(path),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!(
                        "Can't configure a value for \"{}\": its value will be decided automatically.",
                        path
                    ),
                )
                .with_attribute(path),
            );
            continue;
        }

        for validator in &attr.validators {
            validator.validate(current, &path, diagnostics);
        }

        for other in &attr.conflicts_with {
            let other_path = AttributePath::parse(other);
            let is_set = root.get(&other_path).is_some_and(|v| !v.is_null());
            if is_set {
                diagnostics.push(
                    Diagnostic::error(
                        "Conflicting configuration arguments",
                        format!("\"{}\": conflicts with {}", path, other),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }

    for nested in &block.block_types {
        let path = prefix.clone().attribute(&nested.type_name);
        let items = match object.get(&nested.type_name) {
            Some(Dynamic::List(items)) => items.as_slice(),
            _ => &[],
        };

        // optional+computed blocks left out of configuration come from state
        if nested.computed && items.is_empty() {
            continue;
        }

        if items.len() < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", nested.type_name),
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        if nested.max_items > 0 && items.len() > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Too many {} blocks", nested.type_name),
                    format!(
                        "No more than {} \"{}\" blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }

        for (idx, item) in items.iter().enumerate() {
            validate_block(
                &nested.block,
                item,
                &path.clone().index(idx as i64),
                root,
                diagnostics,
            );
        }
    }
}

/// Fill in schema defaults for attributes absent from configuration
pub fn apply_defaults(schema: &Schema, config: &DynamicValue) -> DynamicValue {
    let mut value = config.value.clone();
    if value.is_null() {
        value = Dynamic::Map(HashMap::new());
    }
    defaults_for_block(&schema.block, &mut value);
    DynamicValue::new(value)
}

fn defaults_for_block(block: &Block, value: &mut Dynamic) {
    let Dynamic::Map(object) = value else {
        return;
    };

    for attr in &block.attributes {
        if let Some(default) = &attr.default {
            let entry = object.entry(attr.name.clone()).or_insert(Dynamic::Null);
            if entry.is_null() {
                *entry = default.clone();
            }
        }
    }

    for nested in &block.block_types {
        if let Some(Dynamic::List(items)) = object.get_mut(&nested.type_name) {
            for item in items.iter_mut() {
                defaults_for_block(&nested.block, item);
            }
        }
    }
}

/// Carry computed values that configuration leaves unset over from prior state
pub fn use_state_for_computed(schema: &Schema, prior: &DynamicValue, planned: &mut DynamicValue) {
    if prior.is_null() {
        return;
    }
    computed_for_block(&schema.block, &prior.value, &mut planned.value);
}

fn computed_for_block(block: &Block, prior: &Dynamic, planned: &mut Dynamic) {
    let (Some(prior_object), Dynamic::Map(planned_object)) = (prior.as_map(), planned) else {
        return;
    };

    for attr in block.attributes.iter().filter(|a| a.computed) {
        let entry = planned_object
            .entry(attr.name.clone())
            .or_insert(Dynamic::Null);
        if entry.is_null() {
            if let Some(previous) = prior_object.get(&attr.name) {
                *entry = previous.clone();
            }
        }
    }

    for nested in &block.block_types {
        let prior_items = prior_object
            .get(&nested.type_name)
            .and_then(Dynamic::as_list);
        let planned_empty = match planned_object.get(&nested.type_name) {
            Some(Dynamic::List(items)) => items.is_empty(),
            Some(other) => other.is_null(),
            None => true,
        };
        if nested.computed && planned_empty {
            if let Some(items) = prior_items {
                planned_object.insert(nested.type_name.clone(), Dynamic::List(items.clone()));
            }
            continue;
        }
        if let (Some(prior_items), Some(Dynamic::List(planned_items))) =
            (prior_items, planned_object.get_mut(&nested.type_name))
        {
            for (prior_item, planned_item) in prior_items.iter().zip(planned_items.iter_mut()) {
                computed_for_block(&nested.block, prior_item, planned_item);
            }
        }
    }
}

/// Paths of force-new attributes and blocks whose value differs between prior
/// state and the plan. A null prior state (create) never requires replacement.
pub fn requires_replace(
    schema: &Schema,
    prior: &DynamicValue,
    planned: &DynamicValue,
) -> Vec<AttributePath> {
    let mut paths = Vec::new();
    if prior.is_null() {
        return paths;
    }
    replace_for_block(
        &schema.block,
        &prior.value,
        &planned.value,
        &AttributePath::root(),
        &mut paths,
    );
    paths
}

fn replace_for_block(
    block: &Block,
    prior: &Dynamic,
    planned: &Dynamic,
    prefix: &AttributePath,
    paths: &mut Vec<AttributePath>,
) {
    let empty = HashMap::new();
    let prior_object = prior.as_map().unwrap_or(&empty);
    let planned_object = planned.as_map().unwrap_or(&empty);

    for attr in block.attributes.iter().filter(|a| a.force_new) {
        let before = prior_object.get(&attr.name).unwrap_or(&Dynamic::Null);
        let after = planned_object.get(&attr.name).unwrap_or(&Dynamic::Null);
        if !before.semantically_equal(after) {
            paths.push(prefix.clone().attribute(&attr.name));
        }
    }

    for nested in &block.block_types {
        let path = prefix.clone().attribute(&nested.type_name);
        let before = prior_object.get(&nested.type_name).unwrap_or(&Dynamic::Null);
        let after = planned_object
            .get(&nested.type_name)
            .unwrap_or(&Dynamic::Null);

        if nested.force_new {
            if !before.semantically_equal(after) {
                paths.push(path);
            }
            continue;
        }

        let before_items = before.as_list().map(Vec::as_slice).unwrap_or(&[]);
        let after_items = after.as_list().map(Vec::as_slice).unwrap_or(&[]);
        for (idx, (b, a)) in before_items.iter().zip(after_items.iter()).enumerate() {
            replace_for_block(&nested.block, b, a, &path.clone().index(idx as i64), paths);
        }
    }
}
