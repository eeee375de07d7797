//! The engine's single error surface.
//!
//! Every error kind named in the specification's error table is a variant
//! here, following the teacher's convention of composing several
//! concern-specific validation errors into one reporting surface (cf.
//! `pavexc`'s `ComponentDb` diagnostics module, which folds
//! `ConstructorValidationError`, `ErrorHandlerValidationError` and friends
//! into a single stream of diagnostics).

use thiserror::Error;

use crate::resource::Iri;

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("`{iri}` is not a recognised component type (expected AbstractClass, Class or Instance)")]
    InvalidComponent { iri: Iri },

    #[error("the registry is frozen: `{operation}` can't be called after `finalize()`")]
    RegistryFrozen { operation: &'static str },

    #[error("component `{component}` declares a malformed `constructorArguments` tree")]
    InvalidConstructorArguments { component: Iri },

    #[error(
        "`{target}` is not a usable inheritance target for constructor arguments: it isn't an \
        ObjectMapping and has none of `fields`, `inheritValues`, or `onParameter`"
    )]
    MalformedObjectMapping { target: Iri },

    #[error("inheritance cycle among components: {}", cycle.iter().map(Iri::to_string).collect::<Vec<_>>().join(" -> "))]
    InheritanceCycle { cycle: Vec<Iri> },

    #[error("invalid config `{config}`: {field} {reason}")]
    InvalidConfig {
        config: Iri,
        field: &'static str,
        reason: String,
    },

    #[error(
        "config `{config}` resolves to {count} registered component types ({candidates}); \
        provide an explicit `requireName`/`requireElement` to disambiguate"
    )]
    AmbiguousComponentTypes {
        config: Iri,
        count: usize,
        candidates: String,
    },

    #[error("`{iri}` is not a registered component")]
    UnknownComponent { iri: Iri },

    #[error("variable `{name}` has no binding in `settings.variables`")]
    UndefinedVariable { name: String },

    #[error(
        "override `{parameter}` can't insert at index {index}: the target list has {len} elements"
    )]
    OverrideIndexOutOfRange {
        parameter: Iri,
        index: i64,
        len: usize,
    },

    #[error("override target `{target}` was not found in parameter `{parameter}`'s value list")]
    OverrideTargetNotFound { parameter: Iri, target: Iri },

    #[error("mapping key on config `{config}` is not a Literal")]
    MalformedMappingKey { config: Iri },

    #[error("strategy failed while constructing `{config}`: {message}")]
    StrategyFailure { config: Iri, message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
