//! The Constructor Pool (specification §4.4) — "the heart" of the engine:
//! instance memoisation, blacklist-based cycle short-circuiting, variable
//! resolution, and orchestration of the preprocessor chain + constructor.
//!
//! Per specification §9's design note on async semantics, the invariant to
//! preserve is "for each config id, at most one construction runs" — this
//! implementation gets that for free from `HashMap::entry`'s synchronous
//! atomicity plus `futures_util::future::Shared` over a lazily-polled boxed
//! future, rather than hand-rolling the source's GC-language sentinel
//! pattern.

use std::collections::HashMap as StdHashMap;
use std::rc::Rc;

use ahash::{HashMap, HashMapExt};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use crate::component::TYPE_VARIABLE;
use crate::constructor;
use crate::error::{EngineError, EngineResult};
use crate::preprocessor::Chain;
use crate::registry::Registry;
use crate::resource::{Iri, ResourceBuilder, ResourceId, TermKind};
use crate::settings::Settings;
use crate::strategy::{ConstructionStrategy, Instance};

type CacheFuture = Shared<LocalBoxFuture<'static, EngineResult<Instance>>>;

struct Inner {
    registry: Registry,
    strategy: Rc<dyn ConstructionStrategy>,
    chain: Chain,
    cache: std::cell::RefCell<HashMap<ResourceId, CacheFuture>>,
}

/// Cheap, `Clone`-able handle — every clone shares the same registry,
/// strategy and instance cache through an `Rc`, the same sharing model
/// [`crate::resource::ResourceGraph`] uses.
#[derive(Clone)]
pub struct Pool(Rc<Inner>);

impl Pool {
    pub fn new(registry: Registry, strategy: Rc<dyn ConstructionStrategy>, chain: Chain) -> Self {
        Self(Rc::new(Inner {
            registry,
            strategy,
            chain,
            cache: std::cell::RefCell::new(HashMap::new()),
        }))
    }

    /// Builds the pool with the built-in preprocessor chain
    /// (specification §2's ordering).
    pub fn with_default_chain(registry: Registry, strategy: Rc<dyn ConstructionStrategy>) -> Self {
        Self::new(registry, strategy, Chain::default_chain())
    }

    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }

    pub fn strategy(&self) -> &dyn ConstructionStrategy {
        self.0.strategy.as_ref()
    }

    /// `instantiate(config, settings) → Future<Instance>` (specification
    /// §4.4's public contract).
    #[tracing::instrument(skip(self, settings))]
    pub async fn instantiate(&self, config: ResourceId, settings: Settings) -> EngineResult<Instance> {
        // 1. Blacklist check.
        if settings.blacklist.contains(&config) {
            return Ok(self.strategy().create_undefined());
        }
        // 2. Variable check.
        if self.registry().graph().is_a(config, TYPE_VARIABLE) {
            let name = self.registry().graph().value(config);
            return self.strategy().resolve_variable(&name, &settings);
        }
        // 3 + 4. Memo check / synchronous single-flight install. The entry
        // API's atomicity at the statement level is what the source's
        // "install sentinel" step bought by hand.
        let shared = {
            let mut cache = self.0.cache.borrow_mut();
            cache
                .entry(config)
                .or_insert_with(|| {
                    let pool = self.clone();
                    let sub_settings = settings.extend_blacklist(config);
                    let fut: LocalBoxFuture<'static, EngineResult<Instance>> = Box::pin(async move {
                        // 5. Canonicalise.
                        let raw = pool.0.chain.run(pool.registry(), config)?;
                        // 6 happened above (sub_settings); 7. Construct.
                        constructor::create_instance(&pool, raw, sub_settings).await
                    });
                    fut.shared()
                })
                .clone()
        };
        shared.await
    }

    /// `instantiate_manually(component_iri, params_map, settings)`
    /// (specification §6): synthesises a blank-node config whose `rdf:type`
    /// is the requested component and whose properties are Literal
    /// resources built from `params`' values, keyed by the same predicate
    /// each parameter is addressed by elsewhere on a config, then runs it
    /// through the normal path.
    pub async fn instantiate_manually(
        &self,
        component_iri: &str,
        params: StdHashMap<String, String>,
        settings: Settings,
    ) -> EngineResult<Instance> {
        let graph = self.registry().graph();
        let component_id = graph
            .resolve(component_iri)
            .filter(|&id| self.registry().get(id).is_some())
            .ok_or_else(|| EngineError::UnknownComponent {
                iri: Iri::from(component_iri),
            })?;
        let _ = component_id;

        let config = graph.alloc(
            ResourceBuilder::new(TermKind::BlankNode, format!("_:manual-{component_iri}"))
                .with_type(Iri::from(component_iri)),
        );
        for (predicate, value) in params {
            let literal = graph.alloc(ResourceBuilder::new(TermKind::Literal, value));
            graph.set_property(config, predicate, vec![literal]);
        }
        self.instantiate(config, settings).await
    }
}
