//! Alias transparency, template arguments and decl strings on built graphs.

use crate::common::{UnitRecords, build_graph};
use declgraph::ty::{self, Layer, Qualifiers, Type};
use declgraph::{DeclGraph, Matcher, TypeId, TypeMatcher};

fn value_type(graph: &DeclGraph, name: &str) -> TypeId {
    let decl = graph.query().find_one(&Matcher::name(name)).unwrap();
    decl.value_type().unwrap()
}

/// ```text
/// typedef int Int;
/// namespace std { template<class T> class vector; class vector<Int>; }
/// typedef std::vector<int> IntVec;
/// IntVec v;
/// ```
fn vector_unit() -> UnitRecords {
    let mut unit = UnitRecords::new();
    let int = unit.fundamental("int");
    let alias = unit.typedef("Int", UnitRecords::GLOBAL, &int);
    let std = unit.namespace("std", UnitRecords::GLOBAL);
    let vector = unit.forward_class("vector", &std);
    let specialization = unit.specialization("vector<Int>", &std, &vector, &[alias.as_str()]);
    let int_vec = unit.typedef("IntVec", UnitRecords::GLOBAL, &specialization);
    unit.variable("v", UnitRecords::GLOBAL, &int_vec);
    unit
}

/// `namespace std { template<class T> class vector; class vector<int>; }`
/// and `std::vector<int> w;`
fn direct_vector_unit() -> UnitRecords {
    let mut unit = UnitRecords::new();
    let int = unit.fundamental("int");
    let std = unit.namespace("std", UnitRecords::GLOBAL);
    let vector = unit.forward_class("vector", &std);
    let specialization = unit.specialization("vector<int>", &std, &vector, &[int.as_str()]);
    unit.variable("w", UnitRecords::GLOBAL, &specialization);
    unit
}

#[test]
fn template_arguments_render_canonically() {
    let graph = build_graph(vec![vector_unit()]);
    let v = value_type(&graph, "v");

    assert_eq!(graph.render_type(v).unwrap(), "IntVec");
    assert_eq!(graph.decl_string(v).unwrap(), "std::vector<int>");

    let class = graph.query().class("std::vector<int>").unwrap();
    assert_eq!(&*graph.qualified_name(class.id), "std::vector<int>");
    assert_eq!(graph.display_name(class.id), "vector<int>");
}

#[test]
fn alias_spelled_and_direct_specializations_are_equal() {
    let graph = build_graph(vec![vector_unit(), direct_vector_unit()]);
    let v = value_type(&graph, "v");
    let w = value_type(&graph, "w");

    assert!(graph.types_equal(v, w).unwrap());
    assert!(ty::structural_equals(&graph, w, v).unwrap());
    assert!(Matcher::of_type(TypeMatcher::EqualTo(v)).matches(
        &graph,
        graph.query().find_one(&Matcher::name("w")).unwrap().id
    ));
}

#[test]
fn alias_spelled_and_direct_specializations_merge_into_one_class() {
    let graph = build_graph(vec![vector_unit(), direct_vector_unit()]);

    let class = graph.query().class("std::vector<int>").unwrap();
    assert_eq!(graph.display_name(class.id), "vector<int>");
    assert_eq!(graph.query().count(&Matcher::name("std::vector<int>")), 1);

    let indexed = graph.query().find_all(&Matcher::name("std::vector<int>"));
    let scanned = graph
        .query()
        .traversal()
        .use_name_index(false)
        .find_all(&Matcher::name("std::vector<int>"));
    assert_eq!(indexed.iter().map(|d| d.id).collect::<Vec<_>>(), scanned);
}

#[test]
fn declared_matcher_sees_through_typedefs() {
    let graph = build_graph(vec![vector_unit()]);
    let v = graph.query().find_one(&Matcher::name("v")).unwrap();

    let of_vector = TypeMatcher::declared(Matcher::name("std::vector<int>"));
    assert!(Matcher::of_type(of_vector).matches(&graph, v.id));
    assert!(!Matcher::of_type(TypeMatcher::pointer_to(TypeMatcher::Any)).matches(&graph, v.id));
}

#[test]
fn decompose_peels_wrappers_outermost_first() {
    let mut unit = UnitRecords::new();
    let foo = unit.struct_("Foo", UnitRecords::GLOBAL);
    let constant = unit.constant(&foo);
    let pointer = unit.pointer(&constant);
    let reference = unit.reference(&pointer);
    unit.variable("r", UnitRecords::GLOBAL, &reference);
    let graph = build_graph(vec![unit]);

    let r = value_type(&graph, "r");
    let decomposition = ty::decompose(&graph, r);
    assert_eq!(decomposition.layers, [Layer::Reference, Layer::Pointer, Layer::Const]);
    assert!(decomposition.is_reference());

    let foo = graph.query().class("Foo").unwrap().id;
    assert_eq!(graph.ty(decomposition.base), &Type::Declared(foo));
    assert_eq!(ty::base_declaration(&graph, r).unwrap(), Some(foo));
    assert_eq!(graph.decl_string(r).unwrap(), "Foo const * &");
}

#[test]
fn qualifiers_strip_only_at_the_top() {
    let mut unit = UnitRecords::new();
    let int = unit.fundamental("int");
    let constant = unit.constant(&int);
    let pointer = unit.pointer(&constant);
    let const_pointer = unit.constant(&pointer);
    unit.variable("p", UnitRecords::GLOBAL, &const_pointer);
    let graph = build_graph(vec![unit]);

    let p = value_type(&graph, "p");
    let (inner, qualifiers) = ty::strip_qualifiers(&graph, p);
    assert_eq!(qualifiers, Qualifiers::CONST);
    assert!(matches!(graph.ty(inner), Type::Pointer(_)));
    assert_eq!(graph.decl_string(p).unwrap(), "int const * const");
}
