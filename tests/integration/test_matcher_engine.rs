//! Matchers and traversals over a graph built from several units.

use crate::common::{UnitRecords, build_graph};
use declgraph::{Access, DeclGraph, DeclKind, Matcher, QueryError, Traversal, TypeMatcher};

/// ```text
/// struct Base { virtual void draw(); };
/// struct Left : virtual Base {};   struct Right : virtual Base {};
/// struct Leaf : Left, Right { void draw(); Base *parent(); };
/// ```
fn diamond() -> DeclGraph {
    let mut unit = UnitRecords::new();
    let void = unit.fundamental("void");
    let base = unit.struct_("Base", UnitRecords::GLOBAL);
    unit.virtual_method("draw", &base, &void, &[]);
    let left = unit.derived("Left", UnitRecords::GLOBAL, &[(base.as_str(), true)]);
    let right = unit.derived("Right", UnitRecords::GLOBAL, &[(base.as_str(), true)]);
    let leaf = unit.derived("Leaf", UnitRecords::GLOBAL, &[(left.as_str(), false), (right.as_str(), false)]);
    unit.method("draw", &leaf, &void, &[]);
    let base_ptr = unit.pointer(&base);
    unit.method("parent", &leaf, &base_ptr, &[]);
    build_graph(vec![unit])
}

fn names(graph: &DeclGraph, ids: &[declgraph::DeclId]) -> Vec<String> {
    ids.iter().map(|id| graph.qualified_name(*id).to_string()).collect()
}

#[test]
fn has_base_class_visits_a_diamond_once() {
    let graph = diamond();
    let traversal = Traversal::new(&graph);

    let derived = traversal.find_all(&Matcher::has_base(Matcher::name("Base")));
    assert_eq!(names(&graph, &derived), ["Left", "Right", "Leaf"]);

    let via_left = traversal.find_all(&Matcher::has_base(Matcher::name("Left")));
    assert_eq!(names(&graph, &via_left), ["Leaf"]);
}

#[test]
fn results_follow_declaration_order() {
    let graph = diamond();
    let draws = Traversal::new(&graph).find_all(&Matcher::name("draw"));
    assert_eq!(names(&graph, &draws), ["Base::draw", "Leaf::draw"]);

    let err = Traversal::new(&graph)
        .find_one(&Matcher::name("draw"))
        .unwrap_err();
    assert!(matches!(err, QueryError::AmbiguousMatch { count: 2, .. }));
}

#[test]
fn composition_laws_hold_over_the_whole_graph() {
    let graph = diamond();
    let traversal = Traversal::new(&graph);
    let samples = [
        Matcher::name("draw"),
        Matcher::kind(DeclKind::Class),
        Matcher::IsVirtual,
        Matcher::access(Access::Public),
    ];

    let everything = traversal.find_all(&Matcher::Anything);
    for m in samples {
        assert!(traversal.find_all(&(!m.clone() & m.clone())).is_empty(), "{m}");
        assert_eq!(traversal.find_all(&(m.clone() | !m.clone())), everything, "{m}");
    }
}

#[test]
fn member_function_shapes() {
    let graph = diamond();
    let query = graph.query();

    let virtuals = query.member_functions(Matcher::IsVirtual);
    assert_eq!(virtuals.len(), 1);
    assert_eq!(&*graph.qualified_name(virtuals[0].id), "Base::draw");

    let returns_base = Matcher::ReturnType(TypeMatcher::pointer_to(TypeMatcher::declared(
        Matcher::name("Base"),
    )));
    let parent = query.find_one(&returns_base).unwrap();
    assert_eq!(&*parent.name, "parent");
    assert!(Matcher::parent(Matcher::name("Leaf")).matches(&graph, parent.id));
}

#[test]
fn matchers_survive_serialization() {
    let graph = diamond();
    let matcher = Matcher::kind(DeclKind::MemberFunction)
        & Matcher::pattern("^dr").unwrap()
        & Matcher::parent(Matcher::has_base(Matcher::name("Right")));

    let json = serde_json::to_string(&matcher).unwrap();
    let restored: Matcher = serde_json::from_str(&json).unwrap();

    let query = graph.query();
    let before = query.find_one(&matcher).unwrap().id;
    let after = query.find_one(&restored).unwrap().id;
    assert_eq!(before, after);
    assert_eq!(&*graph.qualified_name(after), "Leaf::draw");
}
