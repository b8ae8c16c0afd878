//! Integration tests for the complete Talk pipeline
//!
//! These tests drive whole corpora through the public API:
//! - sources on disk → parser → finalized tree
//! - tree → generator-facing JSON
//! - registry state across files
//!
//! Run with: cargo test --test integration_tests

use std::fs;

use serde_json::json;
use talk_dsl::{
    parse_files, ErrorKind, Grammar, Key, Namespace, Parser, Registry, SchemaId, TalkError,
};
use tempfile::tempdir;

const GEOMETRY: &str = "\
# Geometry primitives shared by every protocol.
@class geo.Shape base of all shapes
@implement no
@end

@class geo.Circle
@description a circle
@inherits Shape
@field Point center
@field real radius must be positive
@caveat zero is allowed
@deprecated use diameter
@field real[] samples
@extra units metric
@end
";

const POINT: &str = "\
@class geo.Point
@field real x
@field real y
@see glossary Terms
@end
";

const PROTOCOL: &str = "\
@glossary Terms
@term API Application Programming Interface
@end

@protocol Drawing
@description draw shapes remotely
@scheme tcp
@scheme ws
@source upstream
@method draw
@description render one shape
@request geo.Circle
@response none
@origin client
@needs connection
@extra priority high
@end
@method ping
@origin server
@end
@end
";

// ============================================================================
// Corpus on disk
// ============================================================================

#[test]
fn test_multi_file_corpus_to_json() {
    let dir = tempdir().unwrap();
    let files = [
        ("a_geometry.talk", GEOMETRY),
        ("b_point.talk", POINT),
        ("c_protocol.talk", PROTOCOL),
    ];
    let paths: Vec<_> = files
        .iter()
        .map(|(name, text)| {
            let path = dir.path().join(name);
            fs::write(&path, text).unwrap();
            path
        })
        .collect();

    let output = parse_files(&paths).expect("corpus should parse");
    let results = output.results();

    let circle = &results["class"][1];
    assert_eq!(circle["name"], "geo.Circle");
    assert_eq!(circle["inherits"], "Shape");
    assert_eq!(circle["version"], "0");
    assert_eq!(circle["extra"], json!([{ "name": "units", "value": "metric" }]));
    assert_eq!(circle["field"][1]["description"], "must be positive");
    assert_eq!(circle["field"][1]["deprecated"], "use diameter");
    assert_eq!(circle["field"][2]["type"], json!(["real", "[]"]));

    assert_eq!(results["class"][0]["implement"], false);

    let protocol = &results["protocol"][0];
    assert_eq!(protocol["scheme"], json!(["tcp", "ws"]));
    assert_eq!(protocol["source"], "upstream");
    assert_eq!(protocol["method"][0]["needs"], "connection");
    assert_eq!(protocol["method"][0]["extra"][0]["value"], "high");
    assert_eq!(protocol["method"][1]["origin"], "server");
    assert!(protocol["method"][1].get("request").is_none());

    assert_eq!(results["glossary"][0]["term"][0]["value"], "Application Programming Interface");
}

#[test]
fn test_registry_covers_every_namespace() {
    let mut parser = Parser::standard().unwrap();
    parser.parse("geometry.talk", GEOMETRY).unwrap();
    parser.parse("point.talk", POINT).unwrap();
    parser.parse("protocol.talk", PROTOCOL).unwrap();
    let output = parser.finish().unwrap();
    let registry = output.registry();

    for (name, namespace) in [
        ("geo.Point", Namespace::Classes),
        ("Circle", Namespace::Classes),
        ("Terms", Namespace::Glossaries),
        ("Drawing", Namespace::Protocols),
    ] {
        assert!(registry.is_registered(name, namespace), "{name} in {namespace}");
    }
    assert!(!registry.is_registered("Drawing", Namespace::Classes));

    let names: Vec<_> = registry
        .symbols(Namespace::Classes)
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["geo.Circle", "geo.Point", "geo.Shape"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = parse_files(&[dir.path().join("absent.talk")]).unwrap_err();
    assert!(matches!(err, TalkError::Io { .. }));
    assert!(err.to_string().contains("absent.talk"));
}

#[test]
fn test_first_error_wins() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.talk");
    fs::write(&path, "@class A\n@field real\n@end\n@class A\n@end\n").unwrap();

    match parse_files(&[&path]) {
        Err(TalkError::Parse(err)) => {
            assert_eq!(err.kind, ErrorKind::PropertyArity);
            assert_eq!(err.line, 2);
        }
        other => panic!("expected arity error, got {other:?}"),
    }
}

// ============================================================================
// Grammar and registry as standalone pieces
// ============================================================================

#[test]
fn test_standard_grammar_shapes() {
    let grammar = Grammar::standard().unwrap();
    let class = grammar.get(SchemaId::Class).unwrap();
    assert_eq!(class.registrations()[0].namespace, Namespace::Classes);
    assert!(class.tag(Key::Field).unwrap().multi);
    assert_eq!(class.tag(Key::Field).unwrap().unique, Some(Key::Name));

    let root = grammar.root().unwrap();
    let keys: Vec<_> = root.tags().iter().map(|t| t.key).collect();
    assert_eq!(keys, vec![Key::Class, Key::Enumeration, Key::Glossary, Key::Protocol]);
}

#[test]
fn test_registry_reset_between_runs() {
    let mut registry = Registry::new();
    registry
        .register("Once", Namespace::Classes, talk_dsl::Location::new("a.talk", 1), Some('.'))
        .unwrap();
    registry.reset();
    registry
        .register("Once", Namespace::Classes, talk_dsl::Location::new("a.talk", 1), Some('.'))
        .unwrap();
    assert_eq!(registry.symbols(Namespace::Classes).len(), 1);
}
