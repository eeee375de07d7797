//! The Config Constructor (specification §4.3): walks a canonical config,
//! resolves every parameter value into a strategy-neutral argument, and
//! invokes the strategy's terminal `create_instance`.
//!
//! Recursion into another config (the "NamedNode/BlankNode that is another
//! config" row of §4.3's table) goes back through the [`Pool`], which is
//! what keeps memoisation, blacklist tracking and cycle short-circuiting
//! uniform regardless of nesting depth — the constructor itself holds no
//! cache of its own.

use crate::component::{
    P_ARGUMENTS, P_ELEMENTS, P_FIELDS, P_KEY, P_REQUIRE_ELEMENT, P_REQUIRE_NAME,
    P_REQUIRE_NO_CONSTRUCTOR, P_VALUE, TYPE_UNDEFINED, TYPE_VARIABLE,
};
use crate::error::{EngineError, EngineResult};
use crate::pool::Pool;
use crate::preprocessor::resolve_parameter_value;
use crate::registry::Registry;
use crate::resource::{Iri, ResourceId, TermKind};
use crate::settings::Settings;
use crate::strategy::{CreateInstanceRequest, Instance};

/// Build the final artifact for an already-canonicalised config
/// (specification §4.4, step 7). `settings` is the sub-settings the pool
/// already extended with this config's own id on the blacklist.
pub async fn create_instance(
    pool: &Pool,
    raw_config: ResourceId,
    settings: Settings,
) -> EngineResult<Instance> {
    let registry = pool.registry();
    let graph = registry.graph();

    let require_name = graph
        .with(raw_config, |r| r.get_one(P_REQUIRE_NAME))
        .map(|id| graph.value(id))
        .expect("validate_raw_config guarantees requireName is present");
    let require_element = graph
        .with(raw_config, |r| r.get_one(P_REQUIRE_ELEMENT))
        .map(|id| graph.value(id));
    let require_no_constructor = graph
        .with(raw_config, |r| r.get_one(P_REQUIRE_NO_CONSTRUCTOR))
        .map(|id| graph.value(id) == "true")
        .unwrap_or(false);

    let argument_ids = argument_list(registry, raw_config);
    let mut args = Vec::with_capacity(argument_ids.len());
    for arg_id in argument_ids {
        args.push(resolve_value(pool, arg_id, &settings).await?);
    }

    let request = CreateInstanceRequest {
        require_name,
        require_element,
        require_no_constructor,
        args,
        iri: Iri::from(graph.value(raw_config).as_str()),
        settings,
    };
    pool.strategy().create_instance(request).await
}

/// The config's resolved argument list: the `P_ARGUMENTS` list the
/// preprocessor chain wrote (Component-mapped/Component-unmapped/Generics),
/// or — for a directly-authored config with its own `requireName` that
/// still resolves to exactly one registered component (Parameter-default's
/// territory) — the matched component's own parameter list in declaration
/// order.
fn argument_list(registry: &Registry, raw_config: ResourceId) -> Vec<ResourceId> {
    let graph = registry.graph();
    if let Some(list_id) = graph.with(raw_config, |r| r.get_one(P_ARGUMENTS)) {
        return graph
            .with(list_id, |r| r.list().map(<[_]>::to_vec))
            .unwrap_or_default();
    }
    let matches = registry.matching(raw_config);
    let [component] = matches.as_slice() else {
        return Vec::new();
    };
    let Some(def) = registry.get(*component) else {
        return Vec::new();
    };
    def.parameters
        .iter()
        .map(|p| resolve_parameter_value(registry, raw_config, p))
        .collect()
}

/// Resolve one argument value per the value-shape table in specification
/// §4.3.
fn resolve_value<'a>(
    pool: &'a Pool,
    value: ResourceId,
    settings: &'a Settings,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<Instance>> + 'a>> {
    Box::pin(async move {
        let registry = pool.registry();
        let graph = registry.graph();

        if graph.kind(value) == TermKind::Literal {
            let lexical = graph.value(value);
            let datatype = graph.with(value, |r| r.datatype().cloned());
            return Ok(pool.strategy().create_primitive(&lexical, datatype.as_ref()));
        }

        if graph.is_a(value, TYPE_VARIABLE) {
            let name = graph.value(value);
            return pool.strategy().resolve_variable(&name, settings);
        }

        if graph.is_a(value, TYPE_UNDEFINED) {
            return Ok(pool.strategy().create_undefined());
        }

        if let Some(fields_id) = graph.with(value, |r| r.get_one(P_FIELDS)) {
            let entries = graph
                .with(fields_id, |r| r.list().map(<[_]>::to_vec))
                .unwrap_or_default();
            let mut resolved = Vec::with_capacity(entries.len());
            for entry_id in entries {
                let Some(key_id) = graph.with(entry_id, |r| r.get_one(P_KEY)) else {
                    continue;
                };
                if graph.kind(key_id) != TermKind::Literal {
                    return Err(EngineError::MalformedMappingKey {
                        config: Iri::from(graph.value(value).as_str()),
                    });
                }
                let key = graph.value(key_id);
                let Some(entry_value) = graph.with(entry_id, |r| r.get_one(P_VALUE)) else {
                    continue;
                };
                let resolved_value = resolve_value(pool, entry_value, settings).await?;
                resolved.push((key, resolved_value));
            }
            return Ok(pool.strategy().create_hash(resolved));
        }

        if let Some(elements_id) = graph.with(value, |r| r.get_one(P_ELEMENTS)) {
            let items = graph
                .with(elements_id, |r| r.list().map(<[_]>::to_vec))
                .unwrap_or_default();
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(pool, item, settings).await?);
            }
            return Ok(pool.strategy().create_array(resolved));
        }

        if let Some(list) = graph.with(value, |r| r.list().map(<[_]>::to_vec)) {
            let mut resolved = Vec::with_capacity(list.len());
            for item in list {
                resolved.push(resolve_value(pool, item, settings).await?);
            }
            return Ok(pool.strategy().create_array(resolved));
        }

        // Anything left is a reference to another config: recurse back into
        // the pool so memoisation/blacklist/cycle handling stay uniform.
        pool.instantiate(value, settings.clone()).await
    })
}
