//! CLI integration tests for decl-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("decl-schema"))
}

// Helper to create a temp file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PERSON_DESCRIPTOR: &str = r#"{
    "kind": "class",
    "require_exact_match": true,
    "members": [
        { "name": "name", "kind": "string", "max_length": 40 },
        { "name": "age", "kind": "int", "min": 0, "max": 150, "arity": "?" }
    ]
}"#;

const PERSON_DOCUMENT: &str = r#"{"declarations": [
    {"name": "Age", "type": "int", "metadata": {"min": 0, "max": 150}},
    {"object": "Person", "members": [
        {"name": "name", "type": "string"},
        {"name": "age", "type": "Age", "arity": "?"}
    ]}
]}"#;

mod convert_command {
    use super::*;

    #[test]
    fn descriptor_to_json_schema() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "int.json", r#"{"kind": "int", "min": 2, "max": 10}"#);

        cmd()
            .args(["convert", ti.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""type": "integer""#))
            .stdout(predicate::str::contains(r#""minimum": 2"#))
            .stdout(predicate::str::contains(r#""maximum": 10"#));
    }

    #[test]
    fn collection_arity_wraps_in_array() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(
            &dir,
            "ints.json",
            r#"{"kind": "int", "min": 2, "max": 10, "arity": "{1,10}"}"#,
        );

        cmd()
            .args(["convert", ti.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""type": "array""#))
            .stdout(predicate::str::contains(r#""maxItems": 10"#))
            .stdout(predicate::str::contains("minItems").not());
    }

    #[test]
    fn dsl_format() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(
            &dir,
            "int.json",
            r#"{"kind": "int", "min": 2, "max": 10, "arity": "+"}"#,
        );

        cmd()
            .args(["convert", ti.to_str().unwrap(), "--format", "dsl"])
            .assert()
            .success()
            .stdout("<int min=2 max=10 +>\n");
    }

    #[test]
    fn xml_format() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "person.json", PERSON_DESCRIPTOR);

        cmd()
            .args(["convert", ti.to_str().unwrap(), "-f", "xml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<xs:complexType><xs:sequence>"))
            .stdout(predicate::str::contains(r#"minOccurs="0""#))
            .stdout(predicate::str::contains(r#"<xs:maxLength value="40"/>"#));
    }

    #[test]
    fn declaration_by_key() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "people.json", PERSON_DOCUMENT);

        cmd()
            .args([
                "convert",
                doc.to_str().unwrap(),
                "--key",
                "Person.age",
                "--format",
                "dsl",
            ])
            .assert()
            .success()
            .stdout("<int min=0 max=150 ?>\n");
    }

    #[test]
    fn unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "people.json", PERSON_DOCUMENT);

        cmd()
            .args(["convert", doc.to_str().unwrap(), "--key", "Nobody"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Nobody"));
    }

    #[test]
    fn output_file() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "guid.json", r#"{"kind": "guid"}"#);
        let output = dir.path().join("out.json");

        cmd()
            .args([
                "convert",
                ti.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout("");

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains(r#""format": "uuid""#));
    }

    #[test]
    fn unknown_format_rejected() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "bool.json", r#"{"kind": "bool"}"#);

        cmd()
            .args(["convert", ti.to_str().unwrap(), "--format", "yaml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown format"));
    }

    #[test]
    fn missing_file_is_io_error() {
        cmd()
            .args(["convert", "/nonexistent/type.json"])
            .assert()
            .failure()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }
}

mod parse_command {
    use super::*;

    #[test]
    fn prints_canonical_date() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "date.json", r#"{"kind": "date"}"#);

        cmd()
            .args(["parse", ti.to_str().unwrap(), "01-02-2016"])
            .assert()
            .success()
            .stdout("2016-01-02\n");
    }

    #[test]
    fn bool_words() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "bool.json", r#"{"kind": "bool"}"#);

        cmd()
            .args(["parse", ti.to_str().unwrap(), "YES"])
            .assert()
            .success()
            .stdout("true\n");
    }

    #[test]
    fn out_of_range_text_fails() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "int.json", r#"{"kind": "int", "min": 0, "max": 10}"#);

        cmd()
            .args(["parse", ti.to_str().unwrap(), "42"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("42"));
    }
}

mod regex_command {
    use super::*;

    #[test]
    fn lists_alternatives_in_order() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "bool.json", r#"{"kind": "bool"}"#);

        cmd()
            .args(["regex", ti.to_str().unwrap()])
            .assert()
            .success()
            .stdout(
                "true|t|yes|y|on|1 (case-insensitive)\n\
                 false|f|no|n|off|0 (case-insensitive)\n",
            );
    }

    #[test]
    fn bounded_int() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "int.json", r#"{"kind": "int", "min": 0, "max": 99}"#);

        cmd()
            .args(["regex", ti.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::diff("\\+?\\d{1,2}\n"));
    }

    #[test]
    fn classes_have_no_string_form() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "person.json", PERSON_DESCRIPTOR);

        cmd()
            .args(["regex", ti.to_str().unwrap()])
            .assert()
            .failure()
            .code(2);
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_payload() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "person.json", PERSON_DESCRIPTOR);
        let payload = write_temp_file(&dir, "ada.json", r#"{"name": "Ada", "age": 36}"#);

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                ti.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn invalid_payload() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "person.json", PERSON_DESCRIPTOR);
        let payload = write_temp_file(&dir, "bad.json", r#"{"name": "Ada", "age": 200}"#);

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                ti.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("/age"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "people.json", PERSON_DOCUMENT);
        let payload = write_temp_file(&dir, "bad.json", r#"{"age": 3}"#);

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                doc.to_str().unwrap(),
                "--key",
                "Person",
                "--json",
            ])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""errors""#));
    }

    #[test]
    fn json_output_valid() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "guid.json", r#"{"kind": "guid", "arity": "*"}"#);
        let payload = write_temp_file(
            &dir,
            "ids.json",
            r#"["6f1c2a3e-9b1d-4c8a-a1f0-2b3c4d5e6f70"]"#,
        );

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                ti.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff("{\"valid\":true}\n"));
    }

    #[test]
    fn malformed_payload() {
        let dir = TempDir::new().unwrap();
        let ti = write_temp_file(&dir, "bool.json", r#"{"kind": "bool"}"#);
        let payload = write_temp_file(&dir, "bad.json", "{ not json");

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                ti.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("loading payload"));
    }
}

mod resolve_command {
    use super::*;

    #[test]
    fn lists_declarations() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "people.json", PERSON_DOCUMENT);

        cmd()
            .args(["resolve", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""key":"Person.age""#))
            .stdout(predicate::str::contains(r#""subtype":"fundamental""#))
            .stdout(predicate::str::contains(r#""subtype":"compound""#));
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "people.json", PERSON_DOCUMENT);

        cmd()
            .args(["resolve", doc.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn strict_fails_on_unknown_reference() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "loose.json",
            r#"{"declarations": [{"name": "x", "type": "Elsewhere"}]}"#,
        );

        cmd()
            .args(["resolve", doc.to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["resolve", doc.to_str().unwrap(), "--strict"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Elsewhere"));
    }

    #[test]
    fn includes_are_listed_as_sources() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "common.json",
            r#"{"declarations": [{"name": "Email", "type": "string"}]}"#,
        );
        let doc = write_temp_file(
            &dir,
            "main.json",
            r#"{"include": ["common.json"], "declarations": [{"name": "owner", "type": "Email"}]}"#,
        );

        cmd()
            .args(["resolve", doc.to_str().unwrap(), "--strict"])
            .assert()
            .success()
            .stdout(predicate::str::contains("common.json"))
            .stdout(predicate::str::contains(r#""external":true"#));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn clean_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "people.json", PERSON_DOCUMENT);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn reports_placeholders() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "loose.json",
            r#"{"declarations": [{"name": "x", "type": "Elsewhere"}]}"#,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains("E001"));
    }

    #[test]
    fn strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "unused.json",
            r#"{"declarations": [{"name": "Unused", "type": "int", "kind": "definition"}]}"#,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("W001"));

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .failure()
            .code(1);
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "bad.json", "{ not json");

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""code": "E002""#))
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "/nonexistent/schemas"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}
