//! `componentry`: a semantic dependency-injection engine.
//!
//! Given a graph of RDF-described components and configs — parsed upstream
//! of this crate (specification §1's explicit Non-goal) and handed in as a
//! [`resource::ResourceGraph`] — `componentry` resolves a config into a live
//! instance: it canonicalises the config through a chain of preprocessors,
//! walks its resolved argument tree, and hands the result to a pluggable
//! [`strategy::ConstructionStrategy`] that actually builds the artifact.
//!
//! The crate is organised the way the teacher splits "module state" from
//! "per-request logic": [`registry`] owns the frozen, many-reader component
//! graph; [`pool`] owns per-call memoisation and cycle tracking; everything
//! else is a stateless pass over those two.
//!
//! ```text
//! resource::ResourceGraph   — arena-backed RDF projection
//!        │
//!        ▼
//! registry::RegistryBuilder → registry::Registry   — parsed & frozen components
//!        │
//!        ▼
//! pool::Pool::instantiate(config, settings)
//!        │
//!        ├─ preprocessor::Chain::run    — canonicalise the raw config
//!        └─ constructor::create_instance — resolve arguments, call the strategy
//! ```

pub mod component;
pub mod constructor;
pub mod error;
pub mod pool;
pub mod preprocessor;
pub mod registry;
pub mod resource;
pub mod settings;
pub mod strategy;

pub use error::{EngineError, EngineResult};
pub use pool::Pool;
pub use preprocessor::Chain;
pub use registry::{Registry, RegistryBuilder};
pub use resource::{Iri, ResourceGraph, ResourceId};
pub use settings::{EngineSettings, Settings};
pub use strategy::{ConstructionStrategy, CreateInstanceRequest, Instance};
