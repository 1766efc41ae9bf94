//! Malformed input fails the unit with a typed error and leaves the graph intact.

use crate::common::UnitRecords;
use declgraph::record::fields;
use declgraph::{GraphBuilder, GraphError, Record, RecordKind, RecordStream};

#[test]
fn duplicate_ids_are_reported() {
    let mut unit = UnitRecords::new();
    let int = unit.fundamental("int");
    unit.push(Record::new(RecordKind::FundamentalType, int.as_str()).with_literal(fields::NAME, "char"));

    let err = GraphBuilder::default().add_unit(unit.into_stream()).unwrap_err();
    assert!(matches!(&err, GraphError::DuplicateId { id, .. } if id.as_str() == int));
    assert_eq!(err.status_code(), "DUPLICATE_ID");
    assert!(!err.recovery_suggestions().is_empty());
}

#[test]
fn dangling_references_name_both_ends() {
    let mut unit = UnitRecords::new();
    let var = unit.variable("x", UnitRecords::GLOBAL, "_99");

    let err = GraphBuilder::default().add_unit(unit.into_stream()).unwrap_err();
    match err {
        GraphError::UnresolvedReference { id, referenced_by, .. } => {
            assert_eq!(id.as_str(), "_99");
            assert_eq!(referenced_by.as_str(), var);
        }
        other => panic!("expected an unresolved reference, got {other:?}"),
    }
}

#[test]
fn typedef_cycles_are_rejected() {
    let mut unit = UnitRecords::new();
    // A aliases B, B aliases A; ids are predictable
    let a = unit.typedef("A", UnitRecords::GLOBAL, "_3");
    unit.typedef("B", UnitRecords::GLOBAL, &a);

    let err = GraphBuilder::default().add_unit(unit.into_stream()).unwrap_err();
    assert!(matches!(err, GraphError::CyclicAlias { .. }));
    assert_eq!(err.external_id().map(|id| id.as_str().starts_with('_')), Some(true));
}

#[test]
fn failed_unit_does_not_consume_an_id() {
    let mut builder = GraphBuilder::default();
    builder.add_unit(UnitRecords::new().into_stream()).unwrap();

    let mut broken = UnitRecords::new();
    broken.variable("x", UnitRecords::GLOBAL, "_42");
    assert!(builder.add_unit(broken.into_stream()).is_err());

    let mut good = UnitRecords::new();
    let int = good.fundamental("int");
    good.variable("x", UnitRecords::GLOBAL, &int);
    let unit = builder.add_unit(good.into_stream()).unwrap();
    assert_eq!(unit.value(), 2);

    let graph = builder.freeze();
    assert_eq!(graph.query().count(&declgraph::Matcher::name("x")), 1);
}

#[test]
fn json_streams_build_like_constructed_ones() {
    let json = r#"[
        {"kind": "Namespace", "id": "_1", "attrs": {"name": {"literal": "::"}}},
        {"kind": "File", "id": "f1", "attrs": {"name": {"literal": "shapes.hpp"}}},
        {"kind": "FundamentalType", "id": "_2", "attrs": {"name": {"literal": "double"}}},
        {"kind": "Struct", "id": "_3", "attrs": {
            "name": {"literal": "Circle"},
            "context": {"ref": "_1"},
            "file": {"ref": "f1"},
            "line": {"literal": "12"}
        }},
        {"kind": "Field", "id": "_4", "attrs": {
            "name": {"literal": "radius"},
            "context": {"ref": "_3"},
            "type": {"ref": "_2"}
        }}
    ]"#;

    let mut builder = GraphBuilder::default();
    builder.add_unit(RecordStream::from_json(json).unwrap()).unwrap();
    let graph = builder.freeze();

    let circle = graph.query().class("Circle").unwrap();
    let location = circle.location.unwrap();
    assert_eq!(graph.file_path(location.file), Some("shapes.hpp"));
    assert_eq!(location.line, 12);
    assert_eq!(circle.members().len(), 1);

    let err = RecordStream::from_json(r#"[{"kind": "Lambda", "id": "_1"}]"#).unwrap_err();
    assert_eq!(err.status_code(), "RECORD_STREAM");
}
