//! The config preprocessor chain (specification §4.2).
//!
//! Each built-in preprocessor lives in its own submodule; this module owns
//! the shared `Preprocessor` trait, the `Handle` tagged union the design
//! note in specification §9 calls for ("model as tagged variants or
//! trait-object vectors"), the ordered chain itself, and the argument
//! materialisation helpers every mapping-style preprocessor shares.

mod component_mapped;
mod component_unmapped;
mod generics;
pub mod overrides;
mod parameter_default;

pub use component_mapped::ComponentMapped;
pub use component_unmapped::ComponentUnmapped;
pub use generics::Generics;
pub use overrides::{OverrideStep, StepKind};
pub use parameter_default::ParameterDefault;

use crate::component::{
    ComponentDefinition, ObjectMapping, Parameter, P_ARGUMENTS, P_ELEMENTS, P_FIELDS, P_KEY,
    P_REQUIRE_ELEMENT, P_REQUIRE_NAME, P_REQUIRE_NO_CONSTRUCTOR, P_VALUE, TYPE_UNDEFINED,
};
use crate::error::{EngineError, EngineResult};
use crate::registry::Registry;
use crate::resource::{Iri, ResourceBuilder, ResourceId, TermKind};

/// A handler-specific token threaded from `can_handle` into `transform`.
///
/// Tagged union rather than `Box<dyn Any>`: every preprocessor's outcome is
/// one of a small, closed set of shapes, so there is no need to pay for
/// dynamic downcasting.
#[derive(Debug, Clone)]
pub enum Handle {
    ComponentMapped { component: ResourceId },
    ComponentUnmapped { component: ResourceId },
    Override { steps: Vec<overrides::OverrideStep> },
    Generics { component: ResourceId },
    ParameterDefault { component: ResourceId },
}

/// One stage of the chain.
pub trait Preprocessor {
    /// A short, stable name used in tracing spans and error messages.
    fn name(&self) -> &'static str;

    /// Pure: does this preprocessor apply to `config`? Never mutates the
    /// graph.
    fn can_handle(&self, registry: &Registry, config: ResourceId) -> Option<Handle>;

    /// Rewrite `config` toward canonical form. May mutate it in place;
    /// returns the id of the canonicalised resource (usually `config`
    /// itself).
    fn transform(
        &self,
        registry: &Registry,
        config: ResourceId,
        handle: Handle,
    ) -> EngineResult<ResourceId>;
}

/// The ordered preprocessor chain. Construction order follows specification
/// §2's table: Component-mapped, Component-unmapped, Override, Generics,
/// Parameter-default.
pub struct Chain {
    stages: Vec<Box<dyn Preprocessor>>,
}

impl Chain {
    pub fn new(stages: Vec<Box<dyn Preprocessor>>) -> Self {
        Self { stages }
    }

    /// The built-in chain, in the order specification §2 lists them.
    pub fn default_chain() -> Self {
        Self::new(vec![
            Box::new(ComponentMapped),
            Box::new(ComponentUnmapped),
            Box::new(overrides::Override),
            Box::new(Generics),
            Box::new(ParameterDefault),
        ])
    }

    /// Run the chain against `config`: first-match-wins (specification §4.2,
    /// resolved Open Question (a)), then `validate_raw_config`.
    ///
    /// A config whose shape no stage recognises (not already named via
    /// `requireName`, not an `OverrideInstance`, etc.) is only rejected as
    /// `AmbiguousComponentTypes` when its declared types resolve to *more
    /// than one* registered component — zero matches just means nothing
    /// type-driven claimed it, which `validate_raw_config` below reports on
    /// its own terms (typically a missing `requireName`).
    #[tracing::instrument(skip(self, registry))]
    pub fn run(&self, registry: &Registry, config: ResourceId) -> EngineResult<ResourceId> {
        let mut raw = config;
        let mut handled = false;
        for stage in &self.stages {
            if let Some(handle) = stage.can_handle(registry, raw) {
                tracing::debug!(stage = stage.name(), "preprocessor matched");
                raw = stage.transform(registry, raw, handle)?;
                handled = true;
                break;
            }
        }

        if !handled {
            let has_explicit_require_name = registry
                .graph()
                .with(raw, |r| r.get_one(P_REQUIRE_NAME))
                .is_some();
            if !has_explicit_require_name {
                let matches = registry.matching(raw);
                if matches.len() > 1 {
                    return Err(EngineError::AmbiguousComponentTypes {
                        config: config_iri(registry, raw),
                        count: matches.len(),
                        candidates: matches
                            .iter()
                            .map(|&id| registry.graph().value(id))
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
        }

        validate_raw_config(registry, raw)?;
        Ok(raw)
    }
}

fn config_iri(registry: &Registry, config: ResourceId) -> Iri {
    Iri::from(registry.graph().value(config).as_str())
}

/// Specification §4.2's `validate_raw_config`.
fn validate_raw_config(registry: &Registry, config: ResourceId) -> EngineResult<()> {
    let graph = registry.graph();
    match graph.with(config, |r| r.get_one(P_REQUIRE_NAME)) {
        None => {
            return Err(EngineError::InvalidConfig {
                config: config_iri(registry, config),
                field: "requireName",
                reason: "is required".into(),
            })
        }
        Some(id) if graph.kind(id) != TermKind::Literal => {
            return Err(EngineError::InvalidConfig {
                config: config_iri(registry, config),
                field: "requireName",
                reason: "must be a Literal".into(),
            })
        }
        Some(_) => {}
    }
    check_optional_literal(registry, config, P_REQUIRE_ELEMENT, "requireElement")?;
    check_optional_literal(
        registry,
        config,
        P_REQUIRE_NO_CONSTRUCTOR,
        "requireNoConstructor",
    )?;
    Ok(())
}

fn check_optional_literal(
    registry: &Registry,
    config: ResourceId,
    predicate: &str,
    field: &'static str,
) -> EngineResult<()> {
    let graph = registry.graph();
    if let Some(id) = graph.with(config, |r| r.get_one(predicate)) {
        if graph.kind(id) != TermKind::Literal {
            return Err(EngineError::InvalidConfig {
                config: config_iri(registry, config),
                field,
                reason: "must be a Literal when present".into(),
            });
        }
    }
    Ok(())
}

/// Build (or find) the `Undefined` marker resource used for a missing,
/// default-less parameter value. The constructor maps this straight onto
/// `strategy.create_undefined()`.
pub(crate) fn undefined_marker(registry: &Registry) -> ResourceId {
    registry
        .graph()
        .alloc(ResourceBuilder::new(TermKind::BlankNode, "_:undefined").with_type(TYPE_UNDEFINED))
}

/// Resolve one parameter's value off `config`: the raw value(s) the config
/// carries under the parameter's own IRI used as predicate, falling back to
/// the parameter's `default`, falling back to the undefined marker.
///
/// A single value passes through unchanged (whatever shape it already is:
/// Literal, reference to another config, nested mapping object, RDF list).
/// More than one value is wrapped into an `elements` object so the
/// constructor (specification §4.3) builds a sequence from it.
pub(crate) fn resolve_parameter_value(registry: &Registry, config: ResourceId, parameter: &Parameter) -> ResourceId {
    let graph = registry.graph();
    let predicate = graph.value(parameter.id);
    let values = graph.with(config, |r| r.get(&predicate).to_vec());
    match values.len() {
        0 => parameter.default.unwrap_or_else(|| undefined_marker(registry)),
        1 => values[0],
        _ => wrap_as_elements(registry, &values),
    }
}

fn wrap_as_elements(registry: &Registry, items: &[ResourceId]) -> ResourceId {
    let graph = registry.graph();
    let list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:list").list(items.to_vec()));
    graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:elements").push(P_ELEMENTS, list))
}

/// Materialise one `ObjectMapping` node of a component's `constructorArguments`
/// tree against `config`, producing the Resource-shaped argument value the
/// constructor (specification §4.3) will later walk.
fn materialize_mapping(
    registry: &Registry,
    config: ResourceId,
    mapping: &ObjectMapping,
) -> EngineResult<ResourceId> {
    let graph = registry.graph();
    if let Some(on_parameter) = &mapping.on_parameter {
        let values = graph.with(config, |r| r.get(on_parameter.as_str()).to_vec());
        return Ok(match values.len() {
            0 => undefined_marker(registry),
            1 => values[0],
            _ => wrap_as_elements(registry, &values),
        });
    }
    if let Some(fields) = &mapping.fields {
        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            let Some(value_mapping) = &field.value else {
                continue;
            };
            let value_id = materialize_mapping(registry, config, value_mapping)?;
            entries.push(graph.alloc(
                ResourceBuilder::new(TermKind::BlankNode, "_:entry")
                    .push(P_KEY, field.key)
                    .push(P_VALUE, value_id),
            ));
        }
        let list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:fieldlist").list(entries));
        return Ok(graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:fields").push(P_FIELDS, list)));
    }
    if let Some(elements) = &mapping.elements {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(materialize_mapping(registry, config, element)?);
        }
        return Ok(wrap_as_elements(registry, &items));
    }
    if let Some(value) = mapping.simple_value {
        return Ok(value);
    }
    Ok(undefined_marker(registry))
}

/// Build the canonical argument list for a component that declares
/// `constructorArguments`, writing it onto `config` under `P_ARGUMENTS`.
pub(crate) fn apply_mapped_arguments(
    registry: &Registry,
    config: ResourceId,
    def: &ComponentDefinition,
) -> EngineResult<ResourceId> {
    let mappings = def
        .constructor_arguments
        .as_ref()
        .expect("caller guarantees constructorArguments is Some");
    let mut args = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        args.push(materialize_mapping(registry, config, mapping)?);
    }
    write_arguments(registry, config, def, args)
}

/// Build the canonical argument list for a component with no
/// `constructorArguments`: the parameter list in declaration order
/// (specification §4.2, Component-unmapped).
pub(crate) fn apply_unmapped_arguments(
    registry: &Registry,
    config: ResourceId,
    def: &ComponentDefinition,
) -> EngineResult<ResourceId> {
    let args = def
        .parameters
        .iter()
        .map(|p| resolve_parameter_value(registry, config, p))
        .collect();
    write_arguments(registry, config, def, args)
}

fn write_arguments(
    registry: &Registry,
    config: ResourceId,
    def: &ComponentDefinition,
    args: Vec<ResourceId>,
) -> EngineResult<ResourceId> {
    let graph = registry.graph();
    copy_require_fields_if_absent(registry, config, def);
    let list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:args").list(args));
    graph.set_property(config, P_ARGUMENTS, vec![list]);
    Ok(config)
}

/// Copy `requireName`/`requireElement`/`requireNoConstructor` down from the
/// component definition onto `config` wherever the config doesn't already
/// declare its own — component-level defaults, config-level override.
fn copy_require_fields_if_absent(registry: &Registry, config: ResourceId, def: &ComponentDefinition) {
    let graph = registry.graph();
    let already_has = |predicate: &str| graph.with(config, |r| r.get_one(predicate)).is_some();

    if !already_has(P_REQUIRE_NAME) {
        if let Some(name) = &def.require_name {
            let lit = graph.alloc(ResourceBuilder::new(TermKind::Literal, name.clone()));
            graph.set_property(config, P_REQUIRE_NAME, vec![lit]);
        }
    }
    if !already_has(P_REQUIRE_ELEMENT) {
        if let Some(element) = &def.require_element {
            let lit = graph.alloc(ResourceBuilder::new(TermKind::Literal, element.clone()));
            graph.set_property(config, P_REQUIRE_ELEMENT, vec![lit]);
        }
    }
    if !already_has(P_REQUIRE_NO_CONSTRUCTOR) {
        if let Some(flag) = def.require_no_constructor {
            let lit = graph.alloc(ResourceBuilder::new(
                TermKind::Literal,
                if flag { "true" } else { "false" },
            ));
            graph.set_property(config, P_REQUIRE_NO_CONSTRUCTOR, vec![lit]);
        }
    }
}
