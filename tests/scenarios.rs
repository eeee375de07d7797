//! The end-to-end scenarios from the engine's testable-properties section,
//! run against the real preprocessor chain and pool rather than any single
//! module in isolation.

mod support;

use std::rc::Rc;

use componentry::component;
use componentry::preprocessor::Chain;
use componentry::registry::RegistryBuilder;
use componentry::resource::{ResourceBuilder, ResourceGraph, TermKind};
use componentry::settings::EngineSettings;
use componentry::{EngineError, Iri, Pool, Settings};

use support::{Built, CountingStrategy, DirectStrategy};

fn lit(graph: &ResourceGraph, v: &str) -> componentry::ResourceId {
    graph.alloc(ResourceBuilder::new(TermKind::Literal, v))
}

/// Scenario 1: leaf literal. A directly-authored config naming its own
/// component and carrying a pre-built `arguments` list — the shape
/// `Parameter-default`'s sibling preprocessors never touch.
#[tokio::test]
async fn leaf_literal_builds_with_its_literal_field_argument() {
    let graph = ResourceGraph::new();

    let comments_key = lit(&graph, "comments");
    let comments_value = lit(&graph, "true");
    let field_entry = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:fe")
            .push(component::P_KEY, comments_key)
            .push(component::P_VALUE, comments_value),
    );
    let fields_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:fl").list(vec![field_entry]));
    let fields_obj = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:f").push(component::P_FIELDS, fields_list));
    let args_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:args").list(vec![fields_obj]));

    let require_name = lit(&graph, "n3");
    let require_element = lit(&graph, "Lexer");
    let config = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:c1")
            .push(component::P_REQUIRE_NAME, require_name)
            .push(component::P_REQUIRE_ELEMENT, require_element)
            .push(component::P_ARGUMENTS, args_list),
    );

    let registry = RegistryBuilder::new(graph, EngineSettings::default()).finalize().unwrap();
    let pool = Pool::with_default_chain(registry, Rc::new(DirectStrategy));

    let instance = pool.instantiate(config, Settings::new()).await.unwrap();
    let built = instance.downcast_ref::<Built>().unwrap();
    match built {
        Built::Named { require_name, args } => {
            assert_eq!(require_name, "n3");
            assert_eq!(
                args.as_slice(),
                &[Built::Hash(vec![("comments".to_string(), Built::Primitive("true".to_string()))])]
            );
        }
        other => panic!("expected a Named instance, got {other:?}"),
    }
}

fn override_base_and_steps(
    graph: &ResourceGraph,
    items: &[&str],
    steps: Vec<componentry::ResourceId>,
) -> (componentry::ResourceId, componentry::ResourceId) {
    let p_list = "https://ex.org/pList";
    let values: Vec<_> = items.iter().map(|v| lit(graph, v)).collect();
    let require_name = lit(graph, "Widget");
    let mut base = ResourceBuilder::new(TermKind::BlankNode, "_:base").push(component::P_REQUIRE_NAME, require_name);
    for v in &values {
        base = base.push(p_list, *v);
    }
    let base = graph.alloc(base);

    let steps_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:steps").list(steps));
    let config = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:override")
            .with_type(Iri::from("http://w3id.org/core#OverrideInstance"))
            .push("http://w3id.org/core#overrideInstance", base)
            .push("http://w3id.org/core#overrides", steps_list),
    );
    (config, base)
}

fn read_p_list(registry: &componentry::Registry, config: componentry::ResourceId) -> Vec<String> {
    let graph = registry.graph();
    graph
        .with(config, |r| r.get("https://ex.org/pList").to_vec())
        .into_iter()
        .map(|id| graph.value(id))
        .collect()
}

/// Scenario 2: list override insert-after, a single new value.
#[tokio::test]
async fn list_override_insert_after_splices_one_value() {
    let graph = ResourceGraph::new();
    let l2 = lit(&graph, "l2");
    let new = lit(&graph, "new");
    let step = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:step")
            .with_type(Iri::from("http://w3id.org/core#ListInsertAfter"))
            .push("http://w3id.org/core#overrideParameter", {
                // overrideParameter is read as an IRI off a resource's own value,
                // so it must itself be a resource whose value is the predicate.
                graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/pList"))
            })
            .push("http://w3id.org/core#overrideTarget", l2)
            .push("http://w3id.org/core#overrideValue", new),
    );
    let (config, _base) = override_base_and_steps(&graph, &["l1", "l2", "l3", "l4"], vec![step]);

    let registry = RegistryBuilder::new(graph, EngineSettings::default()).finalize().unwrap();
    let raw = Chain::default_chain().run(&registry, config).unwrap();
    assert_eq!(read_p_list(&registry, raw), vec!["l1", "l2", "new", "l3", "l4"]);
}

/// Scenario 3: list override insert-after with a multi-value (list) override.
#[tokio::test]
async fn list_override_insert_after_splices_a_multi_value_list() {
    let graph = ResourceGraph::new();
    let l4 = lit(&graph, "l4");
    let new_a = lit(&graph, "newA");
    let new_b = lit(&graph, "newB");
    let value_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:nv").list(vec![new_a, new_b]));
    let step = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:step")
            .with_type(Iri::from("http://w3id.org/core#ListInsertAfter"))
            .push("http://w3id.org/core#overrideParameter", {
                graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/pList"))
            })
            .push("http://w3id.org/core#overrideTarget", l4)
            .push("http://w3id.org/core#overrideValue", value_list),
    );
    let (config, _base) = override_base_and_steps(&graph, &["l1", "l2", "l3", "l4"], vec![step]);

    let registry = RegistryBuilder::new(graph, EngineSettings::default()).finalize().unwrap();
    let raw = Chain::default_chain().run(&registry, config).unwrap();
    assert_eq!(read_p_list(&registry, raw), vec!["l1", "l2", "l3", "l4", "newA", "newB"]);
}

/// Scenario 4: a config referencing another config by id; a second
/// `instantiate` on the outer config returns the identical instance and
/// never re-runs the inner construction.
#[tokio::test]
async fn nested_config_is_constructed_once_and_memoised() {
    let graph = ResourceGraph::new();
    let lexer_name = lit(&graph, "Lexer");
    let lexer_config = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:lexer").push(component::P_REQUIRE_NAME, lexer_name));

    let args_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:pargs").list(vec![lexer_config]));
    let parser_name = lit(&graph, "Parser");
    let parser_config = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:parser")
            .push(component::P_REQUIRE_NAME, parser_name)
            .push(component::P_ARGUMENTS, args_list),
    );

    let registry = RegistryBuilder::new(graph, EngineSettings::default()).finalize().unwrap();
    let strategy = Rc::new(CountingStrategy::default());
    let pool = Pool::with_default_chain(registry, strategy.clone());

    let first = pool.instantiate(parser_config, Settings::new()).await.unwrap();
    let second = pool.instantiate(parser_config, Settings::new()).await.unwrap();
    assert!(first.is_same(&second));
    assert_eq!(strategy.count("Parser"), 1);
    assert_eq!(strategy.count("Lexer"), 1);
}

/// Scenario 5: a config whose own argument list references itself resolves
/// to the undefined placeholder instead of recursing forever.
#[tokio::test]
async fn self_referential_config_resolves_to_undefined() {
    let graph = ResourceGraph::new();
    let name = lit(&graph, "A");
    let config = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:a").push(component::P_REQUIRE_NAME, name));
    let args_list = graph.alloc(ResourceBuilder::new(TermKind::BlankNode, "_:aargs").list(vec![config]));
    graph.set_property(config, component::P_ARGUMENTS, vec![args_list]);

    let registry = RegistryBuilder::new(graph, EngineSettings::default()).finalize().unwrap();
    let pool = Pool::with_default_chain(registry, Rc::new(DirectStrategy));

    let instance = pool.instantiate(config, Settings::new()).await.unwrap();
    match instance.downcast_ref::<Built>().unwrap() {
        Built::Named { require_name, args } => {
            assert_eq!(require_name, "A");
            assert_eq!(args.as_slice(), &[Built::Undefined]);
        }
        other => panic!("expected a Named instance, got {other:?}"),
    }
}

/// Scenario 6: a config resolving to two registered component types with no
/// disambiguating `requireName` fails with `AmbiguousComponentTypes`.
#[tokio::test]
async fn ambiguous_component_types_are_rejected() {
    let graph = ResourceGraph::new();
    let type_a = graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/TypeA").with_type(Iri::from(component::TYPE_CLASS)));
    let type_b = graph.alloc(ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/TypeB").with_type(Iri::from(component::TYPE_CLASS)));
    let module = graph.alloc(
        ResourceBuilder::new(TermKind::NamedNode, "https://ex.org/mod")
            .with_type(Iri::from("http://w3id.org/core#Module"))
            .push("http://w3id.org/core#components", type_a)
            .push("http://w3id.org/core#components", type_b),
    );
    let mut builder = RegistryBuilder::new(graph.clone(), EngineSettings::default());
    builder.register_module(module).unwrap();
    let registry = builder.finalize().unwrap();

    let config = graph.alloc(
        ResourceBuilder::new(TermKind::BlankNode, "_:ambiguous")
            .with_type(Iri::from("https://ex.org/TypeA"))
            .with_type(Iri::from("https://ex.org/TypeB")),
    );
    let pool = Pool::with_default_chain(registry, Rc::new(DirectStrategy));

    let err = pool.instantiate(config, Settings::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::AmbiguousComponentTypes { count: 2, .. }));
}
