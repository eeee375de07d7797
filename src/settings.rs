//! The two layers of configuration the engine recognises: the per-call
//! `Settings` threaded through every `instantiate` call (specification §6),
//! and the ambient, rarely-changed `EngineSettings` that pick between the
//! behaviours left open by the specification's own open questions (§9).

use std::collections::HashSet;

use ahash::HashMap;

use crate::resource::ResourceId;

/// Per-call settings, extended on each recursive descent into the
/// constructor pool.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Config ids currently on the active call path — used to short-circuit
    /// self-referential cycles (specification §4.4, step 1).
    pub blacklist: HashSet<ResourceId>,
    /// Name → concrete value bindings used to resolve `Variable` resources.
    pub variables: HashMap<String, String>,
    /// When present, instructs the strategy to emit source instead of
    /// building live objects.
    pub serializations: Option<SerializationTarget>,
    /// Requests that emitted source be wrapped in a function accepting
    /// runtime variables.
    pub as_function: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Returns a copy of `self` with `config` added to the blacklist, as
    /// required before recursing into a child constructor call.
    pub fn extend_blacklist(&self, config: ResourceId) -> Self {
        let mut blacklist = self.blacklist.clone();
        blacklist.insert(config);
        Self {
            blacklist,
            variables: self.variables.clone(),
            serializations: self.serializations.clone(),
            as_function: self.as_function,
        }
    }
}

/// The destination format a serializing construction strategy should target.
/// Opaque to the core engine — it is only ever forwarded to the strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationTarget(pub String);

/// How the engine resolves the open question from the specification's
/// design notes that is actually left as a tunable. Loaded once, at engine
/// construction time; unlike `Settings`, this never varies per-call.
///
/// §9 Open Question (c) (whether a value-resolution error inside a
/// non-required parameter is elevated to `InvalidConfig` or swallowed) has
/// no field here: it is resolved unconditionally in favour of elevation —
/// `constructor::resolve_value` always propagates via `?` — so there is
/// nothing to toggle.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineSettings {
    /// §9 Open Question (b): whether an `inheritValues` cycle among
    /// component definitions is a hard error (`true`, the recommended and
    /// default behaviour) or silently terminated.
    pub detect_inheritance_cycles: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            detect_inheritance_cycles: true,
        }
    }
}
