//! Settings loaded from disk drive the builder and the query layer.

use crate::common::UnitRecords;
use declgraph::{DeclKind, GraphBuilder, Matcher, Settings};
use std::fs;
use tempfile::TempDir;

fn unit_with_namespace(name: &str) -> UnitRecords {
    let mut unit = UnitRecords::new();
    unit.namespace(name, UnitRecords::GLOBAL);
    unit
}

#[test]
fn join_can_be_switched_off_from_the_settings_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".declgraph").join("settings.toml");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        "[builder]\njoin_declarations = false\nparallel_threads = 2\n\n[query]\nname_index = false\n",
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert!(!settings.builder.join_declarations);
    assert_eq!(settings.builder.parallel_threads, 2);

    let mut builder = GraphBuilder::from_settings(&settings);
    builder
        .add_units(vec![
            unit_with_namespace("n").into_stream(),
            unit_with_namespace("n").into_stream(),
        ])
        .unwrap();
    let graph = builder.freeze();

    let query = graph.query().with_config(&settings.query);
    let namespaces = query.find_all(&(Matcher::kind(DeclKind::Namespace) & Matcher::name("n")));
    assert_eq!(namespaces.len(), 2);
    assert_ne!(namespaces[0].unit, namespaces[1].unit);
}

#[test]
fn saved_settings_load_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.toml");

    let mut settings = Settings::default();
    settings.builder.anonymous_prefix = "__unnamed".to_string();
    settings.logging.debug = true;
    settings.save(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded.builder.anonymous_prefix, "__unnamed");
    assert_eq!(loaded.log_level(), "debug");
}
