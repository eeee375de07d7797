//! The override family: list-insert, list-remove, replace and clear steps
//! applied to a parameter's value list.
//!
//! Per the resolution of specification §9 Open Question (a), the whole
//! family is exposed to the chain as a single composite preprocessor that
//! iterates its step sub-kinds internally, in list order — so from the
//! chain's perspective "Override" is one handler, keeping first-match-wins
//! unambiguous.

use crate::error::{EngineError, EngineResult};
use crate::resource::{Iri, ResourceGraph, ResourceId, TermKind};

pub const TYPE_OVERRIDE_INSTANCE: &str = "http://w3id.org/core#OverrideInstance";
pub const TYPE_LIST_INSERT_BEFORE: &str = "http://w3id.org/core#ListInsertBefore";
pub const TYPE_LIST_INSERT_AFTER: &str = "http://w3id.org/core#ListInsertAfter";
pub const TYPE_LIST_INSERT_AT: &str = "http://w3id.org/core#ListInsertAt";
pub const TYPE_LIST_REMOVE: &str = "http://w3id.org/core#ListRemove";
pub const TYPE_REPLACE: &str = "http://w3id.org/core#Replace";
pub const TYPE_CLEAR: &str = "http://w3id.org/core#Clear";

pub const P_OVERRIDE_INSTANCE: &str = "http://w3id.org/core#overrideInstance";
pub const P_OVERRIDES: &str = "http://w3id.org/core#overrides";
pub const P_OVERRIDE_PARAMETER: &str = "http://w3id.org/core#overrideParameter";
pub const P_OVERRIDE_TARGET: &str = "http://w3id.org/core#overrideTarget";
pub const P_OVERRIDE_VALUE: &str = "http://w3id.org/core#overrideValue";
pub const P_OVERRIDE_INDEX: &str = "http://w3id.org/core#overrideIndex";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StepKind {
    ListInsertBefore,
    ListInsertAfter,
    ListInsertAt,
    ListRemove,
    Replace,
    Clear,
}

#[derive(Debug, Clone)]
pub struct OverrideStep {
    pub parameter: Iri,
    pub target: Option<ResourceId>,
    /// The values to splice in. A single override value and a list override
    /// value are both normalised to this `Vec` before reaching
    /// [`apply_step`] — "Override-value may itself be a list, in which case
    /// its items are spliced in order" (specification §4.2).
    pub value: Vec<ResourceId>,
    pub index: Option<i64>,
    pub kind: StepKind,
}

/// Apply one override step to `list`, the current value list of
/// `step.parameter`. This is the pure core the specification's scenarios 2
/// and 3 describe directly, independent of how the step was parsed off a
/// config resource.
pub fn apply_step(
    graph: &ResourceGraph,
    list: &mut Vec<ResourceId>,
    step: &OverrideStep,
) -> EngineResult<()> {
    match step.kind {
        StepKind::ListInsertBefore => {
            let pos = find_target(graph, list, step)?;
            list.splice(pos..pos, step.value.iter().copied());
        }
        StepKind::ListInsertAfter => {
            let pos = find_target(graph, list, step)?;
            list.splice(pos + 1..pos + 1, step.value.iter().copied());
        }
        StepKind::ListInsertAt => {
            let index = step.index.unwrap_or(0);
            if index < 0 || index as usize > list.len() {
                return Err(EngineError::OverrideIndexOutOfRange {
                    parameter: step.parameter.clone(),
                    index,
                    len: list.len(),
                });
            }
            let pos = index as usize;
            list.splice(pos..pos, step.value.iter().copied());
        }
        StepKind::ListRemove => {
            let pos = find_target(graph, list, step)?;
            list.remove(pos);
        }
        StepKind::Replace => {
            *list = step.value.clone();
        }
        StepKind::Clear => {
            list.clear();
        }
    }
    Ok(())
}

fn find_target(
    graph: &ResourceGraph,
    list: &[ResourceId],
    step: &OverrideStep,
) -> EngineResult<usize> {
    let target = step.target.ok_or_else(|| EngineError::InvalidConfig {
        config: step.parameter.clone(),
        field: "overrideTarget",
        reason: "is required for insert-before/insert-after/remove steps".into(),
    })?;
    list.iter()
        .position(|&id| id == target)
        .ok_or_else(|| EngineError::OverrideTargetNotFound {
            parameter: step.parameter.clone(),
            target: Iri::from(graph.value(target).as_str()),
        })
}

fn step_kind(graph: &ResourceGraph, id: ResourceId) -> Option<StepKind> {
    if graph.is_a(id, TYPE_LIST_INSERT_BEFORE) {
        Some(StepKind::ListInsertBefore)
    } else if graph.is_a(id, TYPE_LIST_INSERT_AFTER) {
        Some(StepKind::ListInsertAfter)
    } else if graph.is_a(id, TYPE_LIST_INSERT_AT) {
        Some(StepKind::ListInsertAt)
    } else if graph.is_a(id, TYPE_LIST_REMOVE) {
        Some(StepKind::ListRemove)
    } else if graph.is_a(id, TYPE_REPLACE) {
        Some(StepKind::Replace)
    } else if graph.is_a(id, TYPE_CLEAR) {
        Some(StepKind::Clear)
    } else {
        None
    }
}

/// Parse an override-step resource off the graph.
pub(crate) fn parse_step(graph: &ResourceGraph, id: ResourceId) -> EngineResult<OverrideStep> {
    let kind = step_kind(graph, id).ok_or_else(|| EngineError::InvalidConfig {
        config: Iri::from(graph.value(id).as_str()),
        field: "rdf:type",
        reason: "is not a recognised override step kind".into(),
    })?;
    let parameter = graph
        .with(id, |r| r.get_one(P_OVERRIDE_PARAMETER))
        .map(|v| Iri::from(graph.value(v).as_str()))
        .ok_or_else(|| EngineError::InvalidConfig {
            config: Iri::from(graph.value(id).as_str()),
            field: "overrideParameter",
            reason: "is required".into(),
        })?;
    let target = graph.with(id, |r| r.get_one(P_OVERRIDE_TARGET));
    let index = graph
        .with(id, |r| r.get_one(P_OVERRIDE_INDEX))
        .map(|v| graph.value(v))
        .and_then(|v| v.parse::<i64>().ok());
    let value = match graph.with(id, |r| r.get_one(P_OVERRIDE_VALUE)) {
        Some(value_id) => {
            let is_list = graph.with(value_id, |r| r.list().is_some());
            if is_list {
                graph.with(value_id, |r| r.list().unwrap().to_vec())
            } else {
                vec![value_id]
            }
        }
        None => Vec::new(),
    };
    Ok(OverrideStep {
        parameter,
        target,
        value,
        index,
        kind,
    })
}

/// The composite Override preprocessor: triggers on a distinct
/// `OverrideInstance` config shape (pointing at a base instance plus a list
/// of override steps), never competing with Component-mapped/unmapped for
/// first-match, since ordinary component-instance configs are never typed
/// `OverrideInstance`.
pub(crate) struct Override;

impl super::Preprocessor for Override {
    fn name(&self) -> &'static str {
        "override"
    }

    fn can_handle(&self, registry: &crate::registry::Registry, config: ResourceId) -> Option<super::Handle> {
        let graph = registry.graph();
        if !graph.is_a(config, TYPE_OVERRIDE_INSTANCE) {
            return None;
        }
        let step_ids = graph.with(config, |r| r.get_one(P_OVERRIDES))
            .and_then(|list_id| graph.with(list_id, |r| r.list().map(<[_]>::to_vec)))
            .unwrap_or_default();
        let steps = step_ids
            .into_iter()
            .map(|id| parse_step(graph, id))
            .collect::<EngineResult<Vec<_>>>()
            .ok()?;
        Some(super::Handle::Override { steps })
    }

    #[tracing::instrument(skip(self, registry, handle))]
    fn transform(
        &self,
        registry: &crate::registry::Registry,
        config: ResourceId,
        handle: super::Handle,
    ) -> EngineResult<ResourceId> {
        let super::Handle::Override { steps } = handle else {
            unreachable!("Override::transform always receives its own Handle variant")
        };
        let graph = registry.graph();
        let base = graph
            .with(config, |r| r.get_one(P_OVERRIDE_INSTANCE))
            .ok_or_else(|| EngineError::InvalidConfig {
                config: Iri::from(graph.value(config).as_str()),
                field: "overrideInstance",
                reason: "is required".into(),
            })?;
        tracing::debug!(base = ?base, steps = steps.len(), "applying overrides onto base instance");

        let base_props = graph.with(base, |r| r.properties().clone());
        for (predicate, values) in base_props {
            let already_set = graph.with(config, |r| !r.get(predicate.as_str()).is_empty());
            if !already_set {
                graph.set_property(config, predicate, values);
            }
        }

        for step in &steps {
            tracing::debug!(parameter = %step.parameter, kind = ?step.kind, "applying override step");
            let mut list = graph.with(config, |r| r.get(step.parameter.as_str()).to_vec());
            apply_step(graph, &mut list, step)?;
            graph.set_property(config, step.parameter.clone(), list);
        }

        Ok(config)
    }
}
