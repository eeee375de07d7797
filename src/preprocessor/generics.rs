//! Generics preprocessor.
//!
//! Specification §2 names "Generics" as one of the five built-in
//! preprocessors but its behaviour isn't spelled out beyond the label (§4.2
//! only details Component-mapped, Component-unmapped, Override and
//! Parameter-default). This implementation takes the narrowest reading
//! consistent with the rest of the family: a component may declare
//! `genericTypeParameters`; a config resolving to such a component must bind
//! one `genericTypeInstances` value per declared parameter, or fail
//! `InvalidConfig`. Once bound, argument materialisation delegates to the
//! same mapped/unmapped logic every other component-resolving config goes
//! through — generics is a validating wrapper around that, not a separate
//! argument shape.

use crate::component::P_GENERIC_TYPE_INSTANCES;
use crate::error::{EngineError, EngineResult};
use crate::registry::Registry;
use crate::resource::{Iri, ResourceId};

use super::{apply_mapped_arguments, apply_unmapped_arguments, Handle, Preprocessor};

pub struct Generics;

impl Preprocessor for Generics {
    fn name(&self) -> &'static str {
        "generics"
    }

    fn can_handle(&self, registry: &Registry, config: ResourceId) -> Option<Handle> {
        if registry
            .graph()
            .with(config, |r| r.get_one(crate::component::P_REQUIRE_NAME))
            .is_some()
        {
            return None;
        }
        let matches = registry.matching(config);
        let &[component] = matches.as_slice() else {
            return None;
        };
        let def = registry.get(component)?;
        if def.generic_parameters.is_empty() {
            None
        } else {
            Some(Handle::Generics { component })
        }
    }

    #[tracing::instrument(skip(self, registry, handle))]
    fn transform(&self, registry: &Registry, config: ResourceId, handle: Handle) -> EngineResult<ResourceId> {
        let Handle::Generics { component } = handle else {
            unreachable!("Generics::transform always receives its own Handle variant")
        };
        let graph = registry.graph();
        let def = registry
            .get(component)
            .expect("can_handle only returns a handle for a resolvable component")
            .clone();

        let bound = graph
            .with(config, |r| r.get_one(P_GENERIC_TYPE_INSTANCES))
            .and_then(|list_id| graph.with(list_id, |r| r.list().map(<[_]>::to_vec)))
            .unwrap_or_default();
        if bound.len() != def.generic_parameters.len() {
            tracing::debug!(
                component = ?component,
                expected = def.generic_parameters.len(),
                found = bound.len(),
                "generic type instance count mismatch"
            );
            return Err(EngineError::InvalidConfig {
                config: Iri::from(graph.value(config).as_str()),
                field: "genericTypeInstances",
                reason: format!(
                    "expected {} binding(s) for `{}`'s generic type parameters, found {}",
                    def.generic_parameters.len(),
                    graph.value(component),
                    bound.len()
                ),
            });
        }

        if def.constructor_arguments.is_some() {
            apply_mapped_arguments(registry, config, &def)
        } else {
            apply_unmapped_arguments(registry, config, &def)
        }
    }
}
