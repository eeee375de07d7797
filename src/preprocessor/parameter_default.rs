//! Parameter-default preprocessor (specification §4.2): "for any parameter
//! with a `default` whose value is missing on the config, copy the
//! default."
//!
//! Component-mapped/Component-unmapped/Generics already fold default-copying
//! into their own argument materialisation for the common case of a config
//! that is purely type-driven (no explicit `requireName` of its own — see
//! their `can_handle`). This preprocessor covers the complementary case: a
//! config that already names its own `requireName` directly (the "Leaf
//! literal" shape in specification §8, scenario 1) but still resolves via
//! `rdf:type` to exactly one registered component, and wants that
//! component's parameter defaults filled in without going through the
//! mapped/unmapped argument-list restructuring.

use crate::error::EngineResult;
use crate::registry::Registry;
use crate::resource::ResourceId;

use super::{Handle, Preprocessor};

pub struct ParameterDefault;

impl Preprocessor for ParameterDefault {
    fn name(&self) -> &'static str {
        "parameter-default"
    }

    fn can_handle(&self, registry: &Registry, config: ResourceId) -> Option<Handle> {
        registry
            .graph()
            .with(config, |r| r.get_one(crate::component::P_REQUIRE_NAME))?;
        let matches = registry.matching(config);
        let &[component] = matches.as_slice() else {
            return None;
        };
        Some(Handle::ParameterDefault { component })
    }

    #[tracing::instrument(skip(self, registry, handle))]
    fn transform(&self, registry: &Registry, config: ResourceId, handle: Handle) -> EngineResult<ResourceId> {
        let Handle::ParameterDefault { component } = handle else {
            unreachable!("ParameterDefault::transform always receives its own Handle variant")
        };
        let graph = registry.graph();
        let def = registry
            .get(component)
            .expect("can_handle only returns a handle for a resolvable component")
            .clone();
        let mut filled = 0;
        for parameter in &def.parameters {
            let Some(default) = parameter.default else {
                continue;
            };
            let predicate = graph.value(parameter.id);
            let has_value = graph.with(config, |r| !r.get(&predicate).is_empty());
            if !has_value {
                graph.set_property(config, predicate, vec![default]);
                filled += 1;
            }
        }
        tracing::debug!(component = ?component, defaults_filled = filled, "applied parameter defaults");
        Ok(config)
    }
}
