//! Construction Strategy (specification §4.5): the pluggable back end that
//! turns a resolved argument tree into a concrete artifact.
//!
//! The trait is `?Send` — this crate is built around `Rc`/`RefCell`
//! (specification §5's single-logical-executor model), so strategies are
//! thread-affine to the pool that drives them, exactly as §5 states.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::resource::Iri;
use crate::settings::Settings;

/// An opaque artifact produced by a strategy: a live object, a source-code
/// string, whatever a concrete strategy chooses to build. The core engine
/// only ever moves these around and clones them into argument trees; it
/// never inspects their contents.
///
/// Backed by `Rc<dyn Any>` rather than a generic parameter threaded through
/// the whole crate — the pool's cache, the constructor's argument trees and
/// the strategy interface all need to hold a strategy-chosen type without
/// knowing it concretely, and an `Rc` clone is exactly the cheap, shared
/// handle the memoisation model (specification §4.4) requires.
#[derive(Clone)]
pub struct Instance(Rc<dyn Any>);

impl Instance {
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Identity comparison — two `Instance`s are the "same instance" iff they
    /// share the same underlying allocation. Used by invariant tests that
    /// assert memoisation returns an identical instance, not merely an equal
    /// one (specification §8, invariant 1).
    pub fn is_same(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&Rc::as_ptr(&self.0)).finish()
    }
}

/// Everything `create_instance` (specification §4.5's terminal step) needs:
/// the component's strategy-facing identity plus its fully resolved
/// arguments.
#[derive(Debug, Clone)]
pub struct CreateInstanceRequest {
    pub require_name: String,
    pub require_element: Option<String>,
    pub require_no_constructor: bool,
    pub args: Vec<Instance>,
    pub iri: Iri,
    pub settings: Settings,
}

/// The five operations specification §4.5 names. All are total on
/// well-typed inputs except `create_instance`, whose errors surface through
/// its `Result`.
#[async_trait(?Send)]
pub trait ConstructionStrategy {
    /// Placeholder for blacklisted cycle points (specification §4.4, step 1).
    fn create_undefined(&self) -> Instance;

    /// Variable lookup against `settings.variables`.
    fn resolve_variable(&self, name: &str, settings: &Settings) -> EngineResult<Instance>;

    /// Literal materialisation.
    fn create_primitive(&self, value: &str, datatype: Option<&Iri>) -> Instance;

    /// Sequence builder for `Object with elements` / RDF-list argument
    /// shapes.
    fn create_array(&self, items: Vec<Instance>) -> Instance;

    /// Map builder for `Object with fields` argument shapes.
    fn create_hash(&self, entries: Vec<(String, Instance)>) -> Instance;

    /// The terminal step: build the artifact itself.
    async fn create_instance(&self, request: CreateInstanceRequest) -> EngineResult<Instance>;
}
