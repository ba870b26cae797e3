//! Integration tests for document resolution and lowering.

use std::fs;
use std::path::Path;

use decl_schema::{
    load_document, resolve, resolve_str, Arity, DeclarationKind, Document, JsonFrontEnd,
    MemorySources, Reference, ResolveOptions, SchemaError, Subtype, TypeKind, Value,
};
use tempfile::TempDir;

fn resolve_json(text: &str) -> Result<Document, SchemaError> {
    resolve_str("main.json", text, &JsonFrontEnd, &ResolveOptions::new())
}

fn subtype(doc: &Document, key: &str) -> Subtype {
    let id = doc.find(key).unwrap_or_else(|| panic!("no declaration {key}"));
    doc[id].subtype().unwrap()
}

// === Classification ===

mod classification {
    use super::*;

    #[test]
    fn every_subtype_is_assigned() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Age", "type": "int", "metadata": {"min": 0}},
                {"name": "Years", "type": "Age", "metadata": {"description": "age in years"}},
                {"name": "Adult", "type": "Age", "metadata": {"min": 18}},
                {"object": "Person", "members": [
                    {"name": "age", "type": "Years"}
                ]},
                {"object": "Label", "base": "string", "members": [
                    {"name": "lang", "type": "string", "kind": "attribute"}
                ]},
                {"config": "limit", "type": "int"},
                {"extension": "Custom", "args": ["x"]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(subtype(&doc, "Age"), Subtype::Fundamental);
        assert_eq!(subtype(&doc, "Years"), Subtype::Alias);
        assert_eq!(subtype(&doc, "Adult"), Subtype::Augmented);
        assert_eq!(subtype(&doc, "Person"), Subtype::Compound);
        assert_eq!(subtype(&doc, "Person.age"), Subtype::Alias);
        assert_eq!(subtype(&doc, "Label"), Subtype::Simple);
        assert_eq!(subtype(&doc, "limit"), Subtype::Config);
    }

    #[test]
    fn explicit_arity_makes_an_augmentation() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Tag", "type": "string"},
                {"name": "Tags", "type": "Tag", "arity": "*"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(subtype(&doc, "Tags"), Subtype::Augmented);
        assert_eq!(doc[doc.find("Tags").unwrap()].arity(), Arity::zero_or_more());
    }

    #[test]
    fn new_type_excludes_aliases_and_config() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Name", "type": "string"},
                {"name": "Alias", "type": "Name"},
                {"config": "verbose", "type": "bool"}
            ]}"#,
        )
        .unwrap();
        assert!(doc[doc.find("Name").unwrap()].is_new_type());
        assert!(!doc[doc.find("Alias").unwrap()].is_new_type());
        assert!(!doc[doc.find("verbose").unwrap()].is_new_type());
    }

    #[test]
    fn objects_over_simple_objects_are_simple() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Label", "base": "string", "members": [
                    {"name": "lang", "type": "string", "kind": "attribute"}
                ]},
                {"object": "Title", "base": "Label"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(subtype(&doc, "Title"), Subtype::Simple);
    }

    #[test]
    fn simple_reaches_indirect_referrers_in_any_order() {
        let base = r#"{"object": "B", "base": "string", "members": [
                {"name": "lang", "type": "string", "kind": "attribute"}
            ]}"#;
        let a = r#"{"object": "A", "base": "B"}"#;
        let c = r#"{"object": "C", "base": "A"}"#;

        for order in [[c, a, base], [base, a, c]] {
            let doc = resolve_json(&format!(r#"{{"declarations": [{}]}}"#, order.join(",")))
                .unwrap();
            for key in ["A", "B", "C"] {
                assert_eq!(subtype(&doc, key), Subtype::Simple, "{key}");
            }
            let ti = doc.type_info_for("C").unwrap();
            let TypeKind::Class(class) = ti.kind() else {
                panic!("expected a class, got {}", ti.kind_name());
            };
            assert!(class.member("lang").is_some());
        }
    }

    #[test]
    fn objects_over_nested_objects_are_simple() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Outer", "members": [
                    {"object": "Inner", "members": [
                        {"name": "x", "type": "int", "kind": "attribute"}
                    ]}
                ]},
                {"object": "Derived", "base": "Outer.Inner"},
                {"object": "Top", "base": "Outer"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(subtype(&doc, "Outer.Inner"), Subtype::Compound);
        assert_eq!(subtype(&doc, "Derived"), Subtype::Simple);
        assert_eq!(subtype(&doc, "Top"), Subtype::Compound);

        let ti = doc.type_info_for("Derived").unwrap();
        let TypeKind::Class(class) = ti.kind() else {
            panic!("expected a class, got {}", ti.kind_name());
        };
        assert!(class.member("x").is_some());
    }

    #[test]
    fn simple_objects_reject_element_members() {
        let err = resolve_json(
            r#"{"declarations": [
                {"object": "Label", "base": "string", "members": [
                    {"name": "text", "type": "string"}
                ]}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedConstruct { .. }));
    }
}

// === Reference Resolution ===

mod references {
    use super::*;

    #[test]
    fn members_see_enclosing_scopes() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Id", "type": "guid"},
                {"object": "Order", "members": [
                    {"name": "Id", "type": "int"},
                    {"object": "Line", "members": [
                        {"name": "order", "type": "Id"}
                    ]}
                ]}
            ]}"#,
        )
        .unwrap();

        let inner = doc.find("Order.Id").unwrap();
        let member = &doc[doc.find("Order.Line.order").unwrap()];
        assert_eq!(member.reference(), &Reference::Declaration(inner));
    }

    #[test]
    fn dotted_references_descend() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Geo", "members": [
                    {"name": "Lat", "type": "number", "metadata": {"min": -90, "max": 90}}
                ]},
                {"name": "latitude", "type": "Geo.Lat"}
            ]}"#,
        )
        .unwrap();

        let ti = doc.type_info_for("latitude").unwrap();
        assert!(ti.validate(&Value::Float(45.5)).is_ok());
        assert!(ti.validate(&Value::Float(91.0)).is_err());
    }

    #[test]
    fn placeholders_stay_in_lenient_mode() {
        let doc = resolve_json(r#"{"declarations": [{"name": "x", "type": "Unknown"}]}"#).unwrap();
        let node = &doc[doc.find("x").unwrap()];
        assert_eq!(node.reference(), &Reference::Placeholder("Unknown".into()));
        assert_eq!(node.subtype(), Some(Subtype::Alias));

        let err = doc.type_info_for("x").unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
    }

    #[test]
    fn strict_mode_reports_location() {
        let err = resolve_str(
            "main.json",
            r#"{"declarations": [{"name": "x", "type": "Unknown"}]}"#,
            &JsonFrontEnd,
            &ResolveOptions::new().strict(true),
        )
        .unwrap_err();

        match err {
            SchemaError::UnresolvedReference { reference, location } => {
                assert_eq!(reference, "Unknown");
                assert_eq!(location.to_string(), "main.json:1:19");
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }
    }

    #[test]
    fn referrers_are_recorded() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Code", "type": "string", "kind": "definition"},
                {"name": "a", "type": "Code"},
                {"name": "b", "type": "Code"}
            ]}"#,
        )
        .unwrap();
        let code = &doc[doc.find("Code").unwrap()];
        assert_eq!(code.kind(), DeclarationKind::Definition);
        assert_eq!(code.referenced_by().len(), 2);
    }

    #[test]
    fn reference_cycles_fail() {
        let err = resolve_json(
            r#"{"declarations": [
                {"name": "A", "type": "B"},
                {"name": "B", "type": "A"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference { .. }));
    }

    #[test]
    fn keys_are_unique() {
        let err = resolve_json(
            r#"{"declarations": [
                {"name": "A", "type": "int"},
                {"name": "A", "type": "string"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { ref key, .. } if key == "A"));
    }

    #[test]
    fn extensions_can_be_restricted() {
        let text = r#"{"declarations": [{"extension": "Custom"}]}"#;
        let options = ResolveOptions::new().allow_extensions(["Other"]);
        let err = resolve_str("main.json", text, &JsonFrontEnd, &options).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedConstruct { .. }));

        let options = ResolveOptions::new().allow_extensions(["Custom"]);
        assert!(resolve_str("main.json", text, &JsonFrontEnd, &options).is_ok());
    }
}

// === Includes ===

mod includes {
    use super::*;

    #[test]
    fn included_declarations_resolve_from_memory() {
        let sources = MemorySources::new()
            .with(
                "schemas/main.json",
                r#"{"include": ["common/types.json"], "declarations": [
                    {"name": "owner", "type": "Email"}
                ]}"#,
            )
            .with(
                "schemas/common/types.json",
                r#"{"declarations": [
                    {"name": "Email", "type": "string", "metadata": {"max_length": 254}}
                ]}"#,
            );

        let doc = resolve(
            Path::new("schemas/main.json"),
            &JsonFrontEnd,
            &sources,
            &ResolveOptions::new().strict(true),
        )
        .unwrap();

        assert_eq!(doc.sources().len(), 2);
        assert!(!doc.sources()[0].is_external);
        assert!(doc.sources()[1].is_external);
        assert!(doc[doc.find("Email").unwrap()].is_external());
        assert!(!doc[doc.find("owner").unwrap()].is_external());
    }

    #[test]
    fn each_include_loads_once() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("main.json"),
            r#"{"include": ["a.json", "b.json"], "declarations": [
                {"name": "x", "type": "A"},
                {"name": "y", "type": "B"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"include": ["b.json"], "declarations": [{"name": "A", "type": "int"}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"include": ["./a.json"], "declarations": [{"name": "B", "type": "bool"}]}"#,
        )
        .unwrap();

        let doc = load_document(
            &dir.path().join("main.json"),
            &ResolveOptions::new().strict(true),
        )
        .unwrap();
        assert_eq!(doc.sources().len(), 3);
        assert!(matches!(
            doc.type_info_for("y").unwrap().kind(),
            TypeKind::Bool
        ));
    }

    #[test]
    fn missing_include_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.json");
        fs::write(&main, r#"{"include": ["missing.json"]}"#).unwrap();

        let err = load_document(&main, &ResolveOptions::new()).unwrap_err();
        assert!(matches!(err, SchemaError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn committed_documents_are_frozen() {
        let doc = resolve_json(r#"{"declarations": [{"name": "A", "type": "int"}]}"#).unwrap();
        let mut graph = doc.graph().clone();
        let id = doc.find("A").unwrap();
        let err = graph.get_mut(id).set_name("B").unwrap_err();
        assert!(matches!(err, SchemaError::ImmutableViolation { .. }));
    }
}

// === Lowering ===

mod lowering {
    use super::*;

    #[test]
    fn compound_objects_become_classes() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Person", "metadata": {"require_exact_match": true}, "members": [
                    {"name": "name", "type": "string", "metadata": {"max_length": 40}},
                    {"name": "nicknames", "type": "string", "arity": "*"},
                    {"name": "born", "type": "date", "arity": "?"}
                ]}
            ]}"#,
        )
        .unwrap();

        let ti = doc.type_info_for("Person").unwrap();
        let TypeKind::Class(class) = ti.kind() else {
            panic!("expected class, got {}", ti.kind_name());
        };
        assert!(class.require_exact_match);
        assert_eq!(class.members.len(), 3);
        assert!(class.member("nicknames").unwrap().type_info.arity().is_collection());
        assert!(class.member("born").unwrap().type_info.arity().is_optional());
    }

    #[test]
    fn augmentations_overlay_metadata() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"name": "Score", "type": "int", "metadata": {"min": 0, "max": 100}},
                {"name": "Passing", "type": "Score", "metadata": {"min": 50}}
            ]}"#,
        )
        .unwrap();

        let ti = doc.type_info_for("Passing").unwrap();
        assert!(ti.validate(&Value::Int(75)).is_ok());
        assert!(ti.validate(&Value::Int(40)).is_err());
        assert!(ti.validate(&Value::Int(101)).is_err());
    }

    #[test]
    fn simple_objects_carry_attributes_and_value() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Label", "base": "string", "members": [
                    {"name": "lang", "type": "string", "kind": "attribute"}
                ]}
            ]}"#,
        )
        .unwrap();

        let ti = doc.type_info_for("Label").unwrap();
        let TypeKind::Class(class) = ti.kind() else {
            panic!("expected class, got {}", ti.kind_name());
        };
        assert_eq!(class.members.len(), 2);
        assert!(class.member("lang").is_some());
    }

    #[test]
    fn recursive_objects_resolve_but_do_not_lower() {
        let doc = resolve_json(
            r#"{"declarations": [
                {"object": "Node", "members": [
                    {"name": "next", "type": "Node", "arity": "?"}
                ]}
            ]}"#,
        )
        .unwrap();
        let err = doc.type_info_for("Node").unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference { .. }));
    }

    #[test]
    fn misplaced_metadata_is_rejected() {
        let err = resolve_json(
            r#"{"declarations": [{"name": "flag", "type": "bool", "metadata": {"max_length": 3}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::MetadataConstraint { .. }));
    }
}
