//! Integration tests for document encoders.

use rstest::rstest;
use serde_json::json;

use cdkflow::application::stacks::main_stack;
use cdkflow::domain::{
    data_from_json, synthesize, Address, App, Data, DomainError, Encoder, Format, JsonEncoder,
    Value, YamlEncoder,
};

fn main_app() -> App {
    let mut app = App::new();
    let root = app.root();
    main_stack(&mut app, root, "cdk").unwrap();
    app
}

#[test]
fn given_main_stack_when_yaml_encoded_then_parses_back_to_same_structure() {
    // Arrange
    let document = synthesize(&main_app()).unwrap();

    // Act
    let text = YamlEncoder::new().encode(&document).unwrap();

    // Assert
    let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(parsed["main"]["name"].as_str(), Some("main"));
    assert_eq!(
        parsed["main"]["jobs"]["ci"]["runs-on"].as_str(),
        Some("ubuntu-latest")
    );
    assert_eq!(
        parsed["main"]["jobs"]["ci"]["timeout-minutes"].as_i64(),
        Some(60)
    );
    assert_eq!(
        parsed["main"]["jobs"]["ci"]["steps"][2]["env"]["TOKEN"].as_str(),
        Some("${{ secrets.TOKEN }}")
    );
}

#[test]
fn given_header_when_yaml_encoded_then_each_line_commented() {
    let document = synthesize(&main_app()).unwrap();

    let text = YamlEncoder::with_header("Generated.\nDo not edit.")
        .encode(&document)
        .unwrap();

    assert!(text.starts_with("# Generated.\n# Do not edit.\n"));
    let body_start = text.lines().position(|l| !l.starts_with('#')).unwrap();
    assert_eq!(text.lines().nth(body_start), Some("main:"));
}

#[test]
fn given_insertion_order_when_json_encoded_then_keys_not_sorted() {
    // Arrange: "name" < "on" < "jobs" in insertion order, not alphabetically
    let document = synthesize(&main_app()).unwrap();

    // Act
    let text = JsonEncoder::default().encode(&document).unwrap();

    // Assert
    let name = text.find("\"name\"").unwrap();
    let on = text.find("\"on\"").unwrap();
    let jobs = text.find("\"jobs\"").unwrap();
    assert!(name < on && on < jobs, "keys out of order:\n{text}");
    assert!(text.ends_with("}\n"));
}

#[test]
fn given_compact_json_when_encoded_then_single_line() {
    let mut app = App::new();
    let root = app.root();
    app.add_node(root, "n", data_from_json(json!({"a": [1, 2.5, true]})).unwrap())
        .unwrap();
    let document = synthesize(&app).unwrap();

    let text = JsonEncoder::compact().encode(&document).unwrap();

    assert_eq!(text, "{\"n\":{\"a\":[1,2.5,true]}}\n");
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
#[case(f64::NEG_INFINITY)]
fn given_non_finite_float_when_encoded_then_encoding_error_names_node(#[case] number: f64) {
    // Arrange
    let mut app = App::new();
    let root = app.root();
    let workflow = app.add_workflow(root, "main", Data::new()).unwrap();
    let mut data = Data::new();
    data.insert("timeoutMinutes".into(), Value::Float(number));
    app.add_job(workflow, "ci", data).unwrap();
    let document = synthesize(&app).unwrap();

    for encoder in [Format::Yaml.encoder(None), Format::Json.encoder(None)] {
        // Act
        let result = encoder.encode(&document);

        // Assert
        match result {
            Err(DomainError::Encoding {
                address, pointer, ..
            }) => {
                assert_eq!(address, Address::root().child("main").child("ci"));
                assert_eq!(pointer, "/main/jobs/ci/timeout-minutes");
            }
            other => panic!("expected encoding error, got {other:?}"),
        }
    }
}

#[rstest]
#[case(Format::Yaml, "yml")]
#[case(Format::Json, "json")]
fn given_format_when_encoder_then_extension_matches(#[case] format: Format, #[case] ext: &str) {
    assert_eq!(format.encoder(None).extension(), ext);
}

#[rstest]
#[case("yaml", Format::Yaml)]
#[case("YML", Format::Yaml)]
#[case("json", Format::Json)]
fn given_format_name_when_parsed_then_format(#[case] input: &str, #[case] expected: Format) {
    assert_eq!(input.parse::<Format>(), Ok(expected));
}

#[test]
fn given_unknown_format_name_when_parsed_then_error() {
    assert!("toml".parse::<Format>().is_err());
}

#[test]
fn given_null_in_json_data_when_converted_then_unsupported_value_with_pointer() {
    let result = data_from_json(json!({"steps": [{"uses": null}]}));

    assert!(matches!(
        result,
        Err(DomainError::UnsupportedValue { ref pointer, .. }) if pointer == "/steps/0/uses"
    ));
}

#[test]
fn given_non_object_json_when_converted_then_unsupported_value() {
    assert!(matches!(
        data_from_json(json!(["a"])),
        Err(DomainError::UnsupportedValue { .. })
    ));
}
