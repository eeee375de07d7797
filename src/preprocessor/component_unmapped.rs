//! Component-unmapped preprocessor (specification §4.2): triggers when the
//! resolved component has no `constructorArguments`; the raw config's
//! argument list becomes the component's parameter list in declaration
//! order.

use crate::error::EngineResult;
use crate::registry::Registry;
use crate::resource::ResourceId;

use super::{apply_unmapped_arguments, Handle, Preprocessor};

pub struct ComponentUnmapped;

impl Preprocessor for ComponentUnmapped {
    fn name(&self) -> &'static str {
        "component-unmapped"
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
        if def.constructor_arguments.is_none() && def.generic_parameters.is_empty() {
            Some(Handle::ComponentUnmapped { component })
        } else {
            None
        }
    }

    #[tracing::instrument(skip(self, registry, handle))]
    fn transform(&self, registry: &Registry, config: ResourceId, handle: Handle) -> EngineResult<ResourceId> {
        let Handle::ComponentUnmapped { component } = handle else {
            unreachable!("ComponentUnmapped::transform always receives its own Handle variant")
        };
        let def = registry
            .get(component)
            .expect("can_handle only returns a handle for a resolvable component")
            .clone();
        tracing::debug!(component = ?component, "materialising unmapped constructor arguments");
        apply_unmapped_arguments(registry, config, &def)
    }
}
