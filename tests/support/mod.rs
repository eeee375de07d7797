//! Shared construction-strategy test doubles used by the scenario and
//! invariant integration tests: "the identity/JS-style direct constructor"
//! specification §8 asks for, plus a call-counting variant for assertions
//! that need to observe *how many times* something was built, not just what
//! it built into.

use std::cell::RefCell;
use std::collections::HashMap as StdHashMap;

use async_trait::async_trait;
use componentry::resource::Iri;
use componentry::strategy::{ConstructionStrategy, CreateInstanceRequest, Instance};
use componentry::{EngineError, EngineResult, Settings};

/// What a strategy built, laid bare for assertions instead of hidden behind
/// `dyn Any`.
#[derive(Debug, Clone, PartialEq)]
pub enum Built {
    Undefined,
    Primitive(String),
    Array(Vec<Built>),
    Hash(Vec<(String, Built)>),
    Named { require_name: String, args: Vec<Built> },
}

fn unwrap(instance: &Instance) -> Built {
    instance.downcast_ref::<Built>().cloned().unwrap_or(Built::Undefined)
}

pub struct DirectStrategy;

#[async_trait(?Send)]
impl ConstructionStrategy for DirectStrategy {
    fn create_undefined(&self) -> Instance {
        Instance::new(Built::Undefined)
    }

    fn resolve_variable(&self, name: &str, settings: &Settings) -> EngineResult<Instance> {
        settings
            .variables
            .get(name)
            .map(|v| Instance::new(Built::Primitive(v.clone())))
            .ok_or_else(|| EngineError::UndefinedVariable { name: name.to_string() })
    }

    fn create_primitive(&self, value: &str, _datatype: Option<&Iri>) -> Instance {
        Instance::new(Built::Primitive(value.to_string()))
    }

    fn create_array(&self, items: Vec<Instance>) -> Instance {
        Instance::new(Built::Array(items.iter().map(unwrap).collect()))
    }

    fn create_hash(&self, entries: Vec<(String, Instance)>) -> Instance {
        let entries = entries.into_iter().map(|(k, v)| (k, unwrap(&v))).collect();
        Instance::new(Built::Hash(entries))
    }

    async fn create_instance(&self, request: CreateInstanceRequest) -> EngineResult<Instance> {
        let args = request.args.iter().map(unwrap).collect();
        Ok(Instance::new(Built::Named {
            require_name: request.require_name,
            args,
        }))
    }
}

/// Same construction behaviour as [`DirectStrategy`], but tallies how many
/// times `create_instance` was called per `requireName` — used to assert
/// memoisation didn't merely return an equal instance, but genuinely ran the
/// constructor only once (specification §8, scenario 4 / invariant 1).
#[derive(Default)]
pub struct CountingStrategy {
    counts: RefCell<StdHashMap<String, u32>>,
}

impl CountingStrategy {
    pub fn count(&self, require_name: &str) -> u32 {
        self.counts.borrow().get(require_name).copied().unwrap_or(0)
    }
}

#[async_trait(?Send)]
impl ConstructionStrategy for CountingStrategy {
    fn create_undefined(&self) -> Instance {
        Instance::new(Built::Undefined)
    }

    fn resolve_variable(&self, name: &str, settings: &Settings) -> EngineResult<Instance> {
        settings
            .variables
            .get(name)
            .map(|v| Instance::new(Built::Primitive(v.clone())))
            .ok_or_else(|| EngineError::UndefinedVariable { name: name.to_string() })
    }

    fn create_primitive(&self, value: &str, _datatype: Option<&Iri>) -> Instance {
        Instance::new(Built::Primitive(value.to_string()))
    }

    fn create_array(&self, items: Vec<Instance>) -> Instance {
        Instance::new(Built::Array(items.iter().map(unwrap).collect()))
    }

    fn create_hash(&self, entries: Vec<(String, Instance)>) -> Instance {
        let entries = entries.into_iter().map(|(k, v)| (k, unwrap(&v))).collect();
        Instance::new(Built::Hash(entries))
    }

    async fn create_instance(&self, request: CreateInstanceRequest) -> EngineResult<Instance> {
        *self.counts.borrow_mut().entry(request.require_name.clone()).or_insert(0) += 1;
        let args = request.args.iter().map(unwrap).collect();
        Ok(Instance::new(Built::Named {
            require_name: request.require_name,
            args,
        }))
    }
}
