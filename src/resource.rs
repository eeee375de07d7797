//! The Resource Graph View: a read-only-from-the-outside projection of the
//! parsed RDF graph that the rest of the engine operates on.
//!
//! Per the arena design note this module implements, a [`Resource`] is never
//! an owning pointer into another resource: every property value is a
//! [`ResourceId`], a `Copy` index into a [`ResourceGraph`]'s arena. Mutation
//! (canonicalisation during preprocessing) becomes arena-bounded instead of
//! requiring shared, garbage-collected references.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::{HashMap, HashMapExt};
use indexmap::IndexMap;
use la_arena::{Arena, Idx};

/// A cheap, `Clone`-able IRI handle.
///
/// Backed by `Rc<str>` rather than `String` so that the many property lists
/// referencing the same predicate or type IRI don't each pay for an owned
/// copy of the string.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Iri(Rc<str>);

impl Iri {
    pub fn new(value: impl Into<Rc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Iri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self(Rc::from(value))
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(Rc::from(value.as_str()))
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// Well-known term kinds a [`Resource`] can take.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TermKind {
    NamedNode,
    BlankNode,
    Literal,
    Variable,
}

/// The unique handle of a resource inside a [`ResourceGraph`]'s arena.
///
/// Cheap, `Copy`, and comparable by identity: this is the "dense integer id"
/// the rewrite uses in place of shared GC'd references. Configs, component
/// definitions and their parameter values are all addressed this way; the
/// cache in the constructor pool is keyed on this type rather than a raw IRI
/// string so that blank-node configs (anonymous, inline components) can be
/// memoised just as well as named ones.
pub type ResourceId = Idx<ResourceData>;

/// The data owned by one arena slot.
#[derive(Debug, Clone)]
pub struct ResourceData {
    kind: TermKind,
    /// The lexical value: the IRI string for `NamedNode`, the blank-node
    /// label for `BlankNode`, the lexical form for `Literal`, the variable
    /// name for `Variable`.
    value: String,
    /// The literal's datatype IRI, if this resource is a `Literal` and a
    /// datatype was declared.
    datatype: Option<Iri>,
    /// The union of this resource's declared `rdf:type` values.
    types: Vec<Iri>,
    /// Ordered, non-empty property value lists, keyed by predicate IRI.
    properties: IndexMap<Iri, Vec<ResourceId>>,
    /// The RDF-list projection, present only for resources that are list
    /// nodes (`rdf:first`/`rdf:rest` chains collapsed by the external RDF
    /// loader into a flat `Vec`).
    list: Option<Vec<ResourceId>>,
}

impl ResourceData {
    pub fn kind(&self) -> TermKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    /// `true` if the union of declared `rdf:type` values contains `type_iri`.
    pub fn is_a(&self, type_iri: &str) -> bool {
        self.types.iter().any(|t| t.as_str() == type_iri)
    }

    pub fn types(&self) -> &[Iri] {
        &self.types
    }

    /// The (possibly empty) ordered value list for `predicate`.
    pub fn get(&self, predicate: &str) -> &[ResourceId] {
        self.properties
            .get(predicate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first value for `predicate`, if any.
    pub fn get_one(&self, predicate: &str) -> Option<ResourceId> {
        self.get(predicate).first().copied()
    }

    pub fn properties(&self) -> &IndexMap<Iri, Vec<ResourceId>> {
        &self.properties
    }

    pub fn list(&self) -> Option<&[ResourceId]> {
        self.list.as_deref()
    }
}

/// A builder for a single [`ResourceData`], used both by the external RDF
/// loader's adapter and by the engine itself when synthesising configs (see
/// `instantiate_manually`).
pub struct ResourceBuilder {
    kind: TermKind,
    value: String,
    datatype: Option<Iri>,
    types: Vec<Iri>,
    properties: IndexMap<Iri, Vec<ResourceId>>,
    list: Option<Vec<ResourceId>>,
}

impl ResourceBuilder {
    pub fn new(kind: TermKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            datatype: None,
            types: Vec::new(),
            properties: IndexMap::new(),
            list: None,
        }
    }

    pub fn datatype(mut self, datatype: impl Into<Iri>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_type(mut self, type_iri: impl Into<Iri>) -> Self {
        self.types.push(type_iri.into());
        self
    }

    /// Append `value` to the (possibly freshly created) property list for
    /// `predicate`, preserving order. Per the data model, property lists are
    /// ordered and non-empty once present.
    pub fn push(mut self, predicate: impl Into<Iri>, value: ResourceId) -> Self {
        self.properties
            .entry(predicate.into())
            .or_default()
            .push(value);
        self
    }

    pub fn list(mut self, items: Vec<ResourceId>) -> Self {
        self.list = Some(items);
        self
    }

    fn build(self) -> ResourceData {
        ResourceData {
            kind: self.kind,
            value: self.value,
            datatype: self.datatype,
            types: self.types,
            properties: self.properties,
            list: self.list,
        }
    }
}

/// The shared, many-reader projection of the RDF graph.
///
/// `ResourceGraph` is cheap to clone: every clone shares the same underlying
/// arena and IRI index through an `Rc`. This mirrors the "single logical
/// executor, no parallel mutation" concurrency model in the specification —
/// interior mutability via `RefCell` is safe here precisely because nothing
/// in this crate ever hands resources across threads.
#[derive(Clone)]
pub struct ResourceGraph(Rc<Inner>);

struct Inner {
    arena: RefCell<Arena<ResourceData>>,
    by_iri: RefCell<HashMap<Iri, ResourceId>>,
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self(Rc::new(Inner {
            arena: RefCell::new(Arena::new()),
            by_iri: RefCell::new(HashMap::new()),
        }))
    }

    /// Allocate a new, unreferenced resource.
    pub fn alloc(&self, builder: ResourceBuilder) -> ResourceId {
        let is_named = matches!(builder.kind, TermKind::NamedNode);
        let iri = is_named.then(|| Iri::from(builder.value.as_str()));
        let id = self.0.arena.borrow_mut().alloc(builder.build());
        if let Some(iri) = iri {
            self.0.by_iri.borrow_mut().insert(iri, id);
        }
        id
    }

    /// Look up a previously-allocated `NamedNode` by its IRI.
    pub fn resolve(&self, iri: &str) -> Option<ResourceId> {
        self.0.by_iri.borrow().get(iri).copied()
    }

    /// Run `f` against the resource's data without holding the borrow past
    /// the call — the standard way to read a resource given only its id.
    pub fn with<R>(&self, id: ResourceId, f: impl FnOnce(&ResourceData) -> R) -> R {
        f(&self.0.arena.borrow()[id])
    }

    pub fn clone_data(&self, id: ResourceId) -> ResourceData {
        self.0.arena.borrow()[id].clone()
    }

    /// Overwrite a resource's data in place. Used exclusively by
    /// preprocessors to canonicalise a config on its first visit; the data
    /// model's lifecycle rules forbid calling this on anything else.
    pub fn replace(&self, id: ResourceId, data: ResourceData) {
        self.0.arena.borrow_mut()[id] = data;
    }

    /// Set (overwriting) the value list for `predicate` on `id` in place.
    /// The narrow mutation preprocessors need to canonicalise a config
    /// without reconstructing its whole `ResourceData`.
    pub fn set_property(&self, id: ResourceId, predicate: impl Into<Iri>, values: Vec<ResourceId>) {
        self.0.arena.borrow_mut()[id]
            .properties
            .insert(predicate.into(), values);
    }

    pub fn is_a(&self, id: ResourceId, type_iri: &str) -> bool {
        self.with(id, |r| r.is_a(type_iri))
    }

    pub fn kind(&self, id: ResourceId) -> TermKind {
        self.with(id, |r| r.kind())
    }

    pub fn value(&self, id: ResourceId) -> String {
        self.with(id, |r| r.value().to_owned())
    }
}
