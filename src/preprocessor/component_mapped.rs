//! Component-mapped preprocessor (specification §4.2): triggers when a
//! config's types resolve to exactly one registered component that declares
//! `constructorArguments`.

use crate::error::EngineResult;
use crate::registry::Registry;
use crate::resource::ResourceId;

use super::{apply_mapped_arguments, Handle, Preprocessor};

pub struct ComponentMapped;

impl Preprocessor for ComponentMapped {
    fn name(&self) -> &'static str {
        "component-mapped"
    }

    fn can_handle(&self, registry: &Registry, config: ResourceId) -> Option<Handle> {
        if registry
            .graph()
            .with(config, |r| r.get_one(crate::component::P_REQUIRE_NAME))
            .is_some()
        {
            // Already explicitly named — treated as a direct config, not a
            // component-mapped instance. Parameter-default handles this case.
            return None;
        }
        let matches = registry.matching(config);
        let &[component] = matches.as_slice() else {
            return None;
        };
        let def = registry.get(component)?;
        if def.constructor_arguments.is_some() && def.generic_parameters.is_empty() {
            Some(Handle::ComponentMapped { component })
        } else {
            None
        }
    }

    #[tracing::instrument(skip(self, registry, handle))]
    fn transform(&self, registry: &Registry, config: ResourceId, handle: Handle) -> EngineResult<ResourceId> {
        let Handle::ComponentMapped { component } = handle else {
            unreachable!("ComponentMapped::transform always receives its own Handle variant")
        };
        let def = registry
            .get(component)
            .expect("can_handle only returns a handle for a resolvable component")
            .clone();
        tracing::debug!(component = ?component, "materialising mapped constructor arguments");
        apply_mapped_arguments(registry, config, &def)
    }
}
