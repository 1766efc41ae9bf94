//! Units that declare the same entities end up sharing one node per entity.

use crate::common::{UnitRecords, build_graph};
use declgraph::{DeclGraph, DeclKind, ExternalId, GraphBuilder, Matcher, NodeRef, UnitId};

/// `namespace n { class A { <member>(); }; }` with `<member>` returning `ret`.
fn unit_defining_a(member: &str, ret: &str) -> UnitRecords {
    let mut unit = UnitRecords::new();
    let ret = unit.fundamental(ret);
    let n = unit.namespace("n", UnitRecords::GLOBAL);
    let a = unit.class("A", &n);
    unit.method(member, &a, &ret, &[]);
    unit
}

fn member_names(graph: &DeclGraph, id: declgraph::DeclId) -> Vec<String> {
    graph
        .decl(id)
        .members()
        .iter()
        .map(|m| graph.decl(*m).name.to_string())
        .collect()
}

#[test]
fn class_defined_in_two_units_collects_both_members() {
    let graph = build_graph(vec![unit_defining_a("f", "void"), unit_defining_a("g", "int")]);

    let a = graph.query().find_one(&Matcher::name("n::A")).unwrap();
    assert_eq!(a.kind, DeclKind::Class);
    assert_eq!(member_names(&graph, a.id), ["f", "g"]);

    let namespaces = graph.query().find_all(&Matcher::kind(DeclKind::Namespace));
    assert_eq!(namespaces.len(), 1);
}

#[test]
fn merging_a_unit_twice_adds_no_declarations() {
    let mut builder = GraphBuilder::default();
    builder.add_unit(unit_defining_a("f", "void").into_stream()).unwrap();
    let decls = builder.decl_count();

    builder.add_unit(unit_defining_a("f", "void").into_stream()).unwrap();
    assert_eq!(builder.decl_count(), decls);
    assert_eq!(builder.unit_count(), 2);

    let graph = builder.freeze();
    assert_eq!(graph.query().count(&Matcher::name("f")), 1);
}

#[test]
fn forward_declaration_joins_later_definition() {
    let mut forward = UnitRecords::new();
    let n = forward.namespace("n", UnitRecords::GLOBAL);
    forward.forward_class("A", &n);

    let graph = build_graph(vec![forward, unit_defining_a("f", "void")]);
    let a = graph.query().class("n::A").unwrap();
    assert!(a.as_class().unwrap().is_complete);
    assert_eq!(member_names(&graph, a.id), ["f"]);
}

#[test]
fn every_unit_resolves_its_own_ids_to_shared_nodes() {
    let graph = build_graph(vec![unit_defining_a("f", "void"), unit_defining_a("g", "int")]);

    let first = UnitId::new(1).unwrap();
    let second = UnitId::new(2).unwrap();
    // both units numbered the class `_4`
    let id = ExternalId::new("_4");
    let from_first = graph.resolve(first, &id).unwrap();
    let from_second = graph.resolve(second, &id).unwrap();
    assert_eq!(from_first, from_second);
    assert!(matches!(from_first, NodeRef::Decl(_)));

    // ids bound by the first unit round-trip exactly
    for decl in graph.decls() {
        if decl.unit == first && decl.id != graph.global_namespace() {
            let node = graph.resolve(first, &decl.external_id).unwrap();
            assert_eq!(node, NodeRef::Decl(decl.id));
        }
    }
}

#[test]
fn frozen_graph_reopens_for_more_units() {
    let graph = build_graph(vec![unit_defining_a("f", "void")]);
    let mut builder = graph.into_builder();
    assert_eq!(builder.next_unit_id(), UnitId::new(2).unwrap());

    builder.add_unit(unit_defining_a("g", "int").into_stream()).unwrap();
    let graph = builder.freeze();
    let a = graph.query().class("n::A").unwrap();
    assert_eq!(member_names(&graph, a.id), ["f", "g"]);
}

#[test]
fn parallel_build_matches_sequential_build() {
    let units = || {
        vec![
            unit_defining_a("f", "void"),
            unit_defining_a("g", "int"),
            unit_defining_a("h", "char"),
        ]
    };
    let sequential = build_graph(units());

    let mut builder = GraphBuilder::default();
    builder
        .add_units(units().into_iter().map(UnitRecords::into_stream).collect())
        .unwrap();
    let parallel = builder.freeze();

    let names = |graph: &DeclGraph| -> Vec<String> {
        graph
            .preorder()
            .iter()
            .map(|id| graph.qualified_name(*id).to_string())
            .collect()
    };
    assert_eq!(names(&sequential), names(&parallel));
}
