//! Component definitions and the constructor-argument mapping tree.
//!
//! A [`ComponentDefinition`] is a typed view layered on top of a raw
//! [`Resource`](crate::resource::ResourceData), the same way the teacher
//! layers `PostProcessingMiddleware`/`PrebuiltType` typed views on top of a
//! raw `Callable`/`ResolvedType` — construction validates the shape once, up
//! front, so every later consumer works with a narrow, already-checked type.

use crate::error::{EngineError, EngineResult};
use crate::resource::{Iri, ResourceGraph, ResourceId};

/// A parameter declared on a component definition.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub id: ResourceId,
    pub default: Option<ResourceId>,
    pub range: Option<Iri>,
    pub unique: bool,
}

/// One entry of an [`ObjectMapping`]'s `fields`: a key paired with either an
/// inline value or a nested mapping object.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub key: ResourceId,
    pub value: Option<Box<ObjectMapping>>,
}

/// A single node of the constructor-argument mapping tree that a component
/// declares via `constructorArguments`.
///
/// Mirrors Components.js's `ObjectMapping` concept: a node either pulls its
/// value straight from a named parameter (`on_parameter`), carries an inline
/// value (`simple_value`), fans out into keyword fields (`fields`), or fans
/// out into a positional/element array (`elements`). `inherit_values` names
/// other mapping objects this one inherits missing `fields` from.
#[derive(Debug, Clone, Default)]
pub struct ObjectMapping {
    pub id: Option<ResourceId>,
    pub on_parameter: Option<Iri>,
    pub simple_value: Option<ResourceId>,
    pub fields: Option<Vec<FieldEntry>>,
    pub elements: Option<Vec<ObjectMapping>>,
    pub inherit_values: Vec<ResourceId>,
}

impl ObjectMapping {
    fn has_recognised_shape(&self) -> bool {
        self.fields.is_some() || self.on_parameter.is_some() || !self.inherit_values.is_empty()
    }
}

/// The declarative description of a class or factory: parameters, how they
/// map onto a constructor's arguments, and how the strategy reaches the
/// underlying constructor.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub id: ResourceId,
    pub module: ResourceId,
    pub parameters: Vec<Parameter>,
    pub constructor_arguments: Option<Vec<ObjectMapping>>,
    pub inherit_values: Vec<ResourceId>,
    pub require_name: Option<String>,
    pub require_element: Option<String>,
    pub require_no_constructor: Option<bool>,
    /// Generic type parameters declared on the component, if any. A
    /// non-empty list routes configs resolving to this component through the
    /// Generics preprocessor instead of Component-mapped/Component-unmapped.
    pub generic_parameters: Vec<ResourceId>,
}

pub const TYPE_ABSTRACT_CLASS: &str = "http://w3id.org/core#AbstractClass";
pub const TYPE_CLASS: &str = "http://w3id.org/core#Class";
pub const TYPE_INSTANCE: &str = "http://w3id.org/core#ComponentInstance";
pub const TYPE_OBJECT_MAPPING: &str = "http://w3id.org/core#ObjectMapping";
pub const TYPE_VARIABLE: &str = "http://w3id.org/core#Variable";

pub const P_PARAMETERS: &str = "http://w3id.org/core#parameters";
pub const P_DEFAULT: &str = "http://w3id.org/core#default";
pub const P_RANGE: &str = "http://w3id.org/core#range";
pub const P_UNIQUE: &str = "http://w3id.org/core#unique";
pub const P_CONSTRUCTOR_ARGUMENTS: &str = "http://w3id.org/core#constructorArguments";
pub const P_INHERIT_VALUES: &str = "http://w3id.org/core#inheritValues";
pub const P_REQUIRE_NAME: &str = "http://w3id.org/core#requireName";
pub const P_REQUIRE_ELEMENT: &str = "http://w3id.org/core#requireElement";
pub const P_REQUIRE_NO_CONSTRUCTOR: &str = "http://w3id.org/core#requireNoConstructor";
pub const P_FIELDS: &str = "http://w3id.org/core#fields";
pub const P_ELEMENTS: &str = "http://w3id.org/core#elements";
pub const P_KEY: &str = "http://w3id.org/core#key";
pub const P_VALUE: &str = "http://w3id.org/core#value";
pub const P_ON_PARAMETER: &str = "http://w3id.org/core#onParameter";
pub const P_GENERIC_TYPE_PARAMETERS: &str = "http://w3id.org/core#genericTypeParameters";
pub const P_GENERIC_TYPE_INSTANCES: &str = "http://w3id.org/core#genericTypeInstances";
pub const P_ARGUMENTS: &str = "http://w3id.org/core#arguments";
pub const TYPE_UNDEFINED: &str = "http://w3id.org/core#Undefined";

/// Parse the raw resource `id` into a [`ComponentDefinition`], failing with
/// `InvalidComponent` if it isn't one of the three recognised kinds.
pub fn parse_component(
    graph: &ResourceGraph,
    id: ResourceId,
    module: ResourceId,
) -> EngineResult<ComponentDefinition> {
    let is_recognised = graph.is_a(id, TYPE_ABSTRACT_CLASS)
        || graph.is_a(id, TYPE_CLASS)
        || graph.is_a(id, TYPE_INSTANCE);
    if !is_recognised {
        return Err(EngineError::InvalidComponent {
            iri: Iri::from(graph.value(id).as_str()),
        });
    }

    let parameters = graph.with(id, |r| {
        r.get(P_PARAMETERS)
            .iter()
            .map(|&param_id| parse_parameter(graph, param_id))
            .collect()
    });

    let constructor_arguments = graph.with(id, |r| r.get_one(P_CONSTRUCTOR_ARGUMENTS));
    let constructor_arguments = match constructor_arguments {
        Some(list_id) => {
            let items = graph
                .with(list_id, |r| r.list().map(<[_]>::to_vec))
                .ok_or_else(|| EngineError::InvalidConstructorArguments {
                    component: iri_or(graph, id),
                })?;
            let mut mappings = Vec::with_capacity(items.len());
            for item in items {
                mappings.push(parse_object_mapping(graph, id, item)?);
            }
            Some(mappings)
        }
        None => None,
    };

    let inherit_values = graph.with(id, |r| r.get(P_INHERIT_VALUES).to_vec());
    let require_name = graph.with(id, |r| r.get_one(P_REQUIRE_NAME)).map(|v| graph.value(v));
    let require_element = graph
        .with(id, |r| r.get_one(P_REQUIRE_ELEMENT))
        .map(|v| graph.value(v));
    let require_no_constructor = graph
        .with(id, |r| r.get_one(P_REQUIRE_NO_CONSTRUCTOR))
        .map(|v| graph.value(v) == "true");
    let generic_parameters = graph.with(id, |r| r.get(P_GENERIC_TYPE_PARAMETERS).to_vec());

    Ok(ComponentDefinition {
        id,
        module,
        parameters,
        constructor_arguments,
        inherit_values,
        require_name,
        require_element,
        require_no_constructor,
        generic_parameters,
    })
}

// A small helper so `InvalidConstructorArguments`'s field reads like an IRI
// even when built from a `ResourceId` rather than a string already in hand.
fn iri_or(graph: &ResourceGraph, id: ResourceId) -> Iri {
    Iri::from(graph.value(id).as_str())
}

fn parse_parameter(graph: &ResourceGraph, id: ResourceId) -> Parameter {
    let default = graph.with(id, |r| r.get_one(P_DEFAULT));
    let range = graph
        .with(id, |r| r.get_one(P_RANGE))
        .map(|v| Iri::from(graph.value(v).as_str()));
    let unique = graph
        .with(id, |r| r.get_one(P_UNIQUE))
        .map(|v| graph.value(v) == "true")
        .unwrap_or(false);
    Parameter {
        id,
        default,
        range,
        unique,
    }
}

/// `component` is the owning component's id, carried through purely so a
/// malformed node deep in the tree can still be reported against the
/// component whose `constructorArguments` it came from.
fn parse_object_mapping(graph: &ResourceGraph, component: ResourceId, id: ResourceId) -> EngineResult<ObjectMapping> {
    let on_parameter = graph
        .with(id, |r| r.get_one(P_ON_PARAMETER))
        .map(|v| Iri::from(graph.value(v).as_str()));
    let fields = match graph.with(id, |r| r.get_one(P_FIELDS)) {
        Some(fields_id) => {
            let entries = graph
                .with(fields_id, |r| r.list().map(<[_]>::to_vec))
                .unwrap_or_default();
            let mut parsed = Vec::with_capacity(entries.len());
            for entry_id in entries {
                parsed.push(parse_field_entry(graph, component, entry_id)?);
            }
            Some(parsed)
        }
        None => None,
    };
    let elements = match graph.with(id, |r| r.get_one(P_ELEMENTS)) {
        Some(elements_id) => {
            let items = graph
                .with(elements_id, |r| r.list().map(<[_]>::to_vec))
                .unwrap_or_default();
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                parsed.push(parse_object_mapping(graph, component, item)?);
            }
            Some(parsed)
        }
        None => None,
    };
    let simple_value = graph.with(id, |r| r.get_one(P_VALUE));
    let inherit_values = graph.with(id, |r| r.get(P_INHERIT_VALUES).to_vec());

    Ok(ObjectMapping {
        id: Some(id),
        on_parameter,
        simple_value,
        fields,
        elements,
        inherit_values,
    })
}

fn parse_field_entry(graph: &ResourceGraph, component: ResourceId, id: ResourceId) -> EngineResult<FieldEntry> {
    let key = graph.with(id, |r| r.get_one(P_KEY)).ok_or_else(|| EngineError::InvalidConstructorArguments {
        component: iri_or(graph, component),
    })?;
    let value = match graph.with(id, |r| r.get_one(P_VALUE)) {
        Some(value_id) => Some(Box::new(parse_object_mapping(graph, component, value_id)?)),
        None => None,
    };
    Ok(FieldEntry { key, value })
}

/// Constructor-argument inheritance (specification §4.1): fill in any
/// `ObjectMapping` missing `fields` from the `fields` of its
/// `inherit_values` targets, which must themselves be `ObjectMapping`
/// resources (or, transitively, inheriting objects).
pub fn inherit_object_mapping_fields(
    graph: &ResourceGraph,
    component: ResourceId,
    mapping: &mut ObjectMapping,
) -> EngineResult<()> {
    if mapping.fields.is_none() {
        for &target_id in &mapping.inherit_values {
            let is_object_mapping = graph.is_a(target_id, TYPE_OBJECT_MAPPING);
            let target = parse_object_mapping(graph, component, target_id)?;
            if !is_object_mapping && !target.has_recognised_shape() {
                return Err(EngineError::MalformedObjectMapping {
                    target: Iri::from(graph.value(target_id).as_str()),
                });
            }
            if let Some(fields) = target.fields {
                mapping.fields.get_or_insert_with(Vec::new).extend(fields);
                break;
            }
        }
    }
    if let Some(fields) = mapping.fields.as_mut() {
        for field in fields {
            if let Some(nested) = field.value.as_mut() {
                inherit_object_mapping_fields(graph, component, nested)?;
            }
        }
    }
    if let Some(elements) = mapping.elements.as_mut() {
        for element in elements {
            inherit_object_mapping_fields(graph, component, element)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceBuilder, TermKind};

    /// A field entry missing its `key` is plausible malformed module data
    /// (not something the type system rules out), so registration must
    /// report it as an `InvalidConstructorArguments` error, not panic.
    #[test]
    fn a_field_entry_without_a_key_is_reported_not_panicked_on() {
        let graph = ResourceGraph::new();
        let value = graph.alloc(ResourceBuilder::new(TermKind::Literal, "x"));
        let keyless_entry = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:fe").push(P_VALUE, value));
        let fields_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:fl").list(vec![keyless_entry]));
        let fields_obj = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:f").push(P_FIELDS, fields_list));
        let args_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:args").list(vec![fields_obj]));
        let component = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/C")
                .with_type(Iri::from(TYPE_CLASS))
                .push(P_CONSTRUCTOR_ARGUMENTS, args_list),
        );

        let module = graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/mod"));
        let err = parse_component(&graph, component, module).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConstructorArguments { .. }));
    }
}
