use std::collections::BTreeMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::test_support::{Detached, Mode, Node, Settings, Tag};
use crate::{
    EnumLiteral, FromNative, IntoNative, Native, Reflect, TypeDescriptor, TypeRef, TypeRegistry,
};

#[fixture]
fn registry() -> TypeRegistry {
    TypeRegistry::new()
}

fn describe(registry: &TypeRegistry, type_ref: TypeRef) -> Arc<TypeDescriptor> {
    registry.describe(type_ref).expect("describe")
}

#[rstest]
fn default_instances_encode_as_empty_objects(registry: TypeRegistry) {
    let settings = describe(&registry, Settings::type_ref());
    assert_eq!(encode(&Settings::default().into_native(), &settings), "{}");
}

#[rstest]
fn composites_carry_only_changed_properties(registry: TypeRegistry) {
    let settings = describe(&registry, Settings::type_ref());
    let value = Settings {
        port: 4002,
        mode: Mode::Live,
        tags: vec![Tag {
            name: "venue".to_owned(),
            value: String::new(),
        }],
        ..Settings::default()
    };
    assert_eq!(
        encode(&value.into_native(), &settings),
        r#"{"mode":"Live","port":4002,"tags":[{"name":"venue"}]}"#
    );
}

#[rstest]
fn composites_survive_a_round_trip(registry: TypeRegistry) {
    let settings = describe(&registry, Settings::type_ref());
    let mut limits = BTreeMap::new();
    limits.insert("orders".to_owned(), 12.5);
    let original = Settings {
        fallback: Some(Box::new(Settings {
            read_only: true,
            ..Settings::default()
        })),
        limits,
        mode: Mode::Live,
        timeout_ms: Some(2_500),
        ..Settings::default()
    };

    let text = encode(&original.clone().into_native(), &settings);
    let decoded = decode(&text, &settings).expect("decode");
    assert_eq!(Settings::from_native(decoded).expect("settings"), original);
}

#[rstest]
fn self_referential_values_encode_recursively(registry: TypeRegistry) {
    let node = describe(&registry, Node::type_ref());
    let value = Node {
        name: "root".to_owned(),
        next: Some(Box::new(Node {
            name: "leaf".to_owned(),
            ..Node::default()
        })),
        children: Vec::new(),
    };
    assert_eq!(
        encode(&value.into_native(), &node),
        r#"{"name":"root","next":{"name":"leaf"}}"#
    );
}

#[rstest]
#[case("5", vec![Native::Integer(5)])]
#[case("[1,2]", vec![Native::Integer(1), Native::Integer(2)])]
#[case("\"7\"", vec![Native::Integer(7)])]
fn lone_values_are_wrapped_into_lists(
    registry: TypeRegistry,
    #[case] text: &str,
    #[case] expected: Vec<Native>,
) {
    let list = describe(&registry, <Vec<i32>>::type_ref());
    assert_eq!(decode(text, &list).expect("decode"), Native::Sequence(expected));
}

#[rstest]
fn null_containers_follow_the_null_policy(registry: TypeRegistry) {
    let list = describe(&registry, <Vec<String>>::type_ref());
    let decoded = decode("null", &list).expect("decode");
    assert_eq!(decoded, Native::Null);
    assert_eq!(Vec::<String>::from_native(decoded), Ok(Vec::new()));
}

#[rstest]
fn sets_drop_duplicates(registry: TypeRegistry) {
    let set = describe(&registry, <std::collections::BTreeSet<String>>::type_ref());
    assert_eq!(
        decode(r#"["a","b","a"]"#, &set).expect("decode"),
        Native::Sequence(vec![
            Native::String("a".to_owned()),
            Native::String("b".to_owned())
        ])
    );
}

#[rstest]
#[case("null", false)]
#[case("false", false)]
#[case("\"\"", false)]
#[case("\"no\"", true)]
#[case("0", true)]
#[case("{}", true)]
fn booleans_coerce_from_any_shape(
    registry: TypeRegistry,
    #[case] text: &str,
    #[case] expected: bool,
) {
    let boolean = describe(&registry, bool::type_ref());
    assert_eq!(decode(text, &boolean).expect("decode"), Native::Boolean(expected));
}

#[rstest]
#[case("null", 0)]
#[case("true", 1)]
#[case("\" 42 \"", 42)]
#[case("-7", -7)]
fn integers_coerce_from_json_scalars(
    registry: TypeRegistry,
    #[case] text: &str,
    #[case] expected: i32,
) {
    let integer = describe(&registry, i32::type_ref());
    assert_eq!(decode(text, &integer).expect("decode"), Native::Integer(expected));
}

#[rstest]
fn integers_reject_fractions(registry: TypeRegistry) {
    let integer = describe(&registry, i32::type_ref());
    assert!(matches!(
        decode("1.5", &integer),
        Err(CodecError::Number { expected: "int", .. })
    ));
}

#[rstest]
fn big_decimals_keep_full_precision(registry: TypeRegistry) {
    let decimal = describe(&registry, BigDecimal::type_ref());
    let text = "12345678901234567890.123456789012345678901";
    let decoded = decode(text, &decimal).expect("decode");
    assert_eq!(encode(&decoded, &decimal), text);
}

#[rstest]
fn characters_take_the_first_character(registry: TypeRegistry) {
    let character = describe(&registry, char::type_ref());
    assert_eq!(decode("\"xyz\"", &character).expect("decode"), Native::Character('x'));
    assert!(matches!(
        decode("\"\"", &character),
        Err(CodecError::EmptyCharacter)
    ));
}

#[rstest]
fn enums_decode_by_literal_name(registry: TypeRegistry) {
    let mode = describe(&registry, Mode::type_ref());
    assert_eq!(
        decode("\"Live\"", &mode).expect("decode"),
        Native::Enum(EnumLiteral::new("Live", 0))
    );
    assert!(matches!(
        decode("\"Demo\"", &mode),
        Err(CodecError::UnknownLiteral { .. })
    ));
}

#[rstest]
fn ordinal_mutators_receive_the_literal_position(registry: TypeRegistry) {
    let settings = describe(&registry, Settings::type_ref());
    let decoded = decode(r#"{"mode":"Live"}"#, &settings).expect("decode");
    assert_eq!(Settings::from_native(decoded).expect("settings").mode, Mode::Live);
}

#[rstest]
fn composites_require_objects(registry: TypeRegistry) {
    let tag = describe(&registry, Tag::type_ref());
    let error = decode("[1]", &tag).expect_err("should fail");
    assert_eq!(error.to_string(), "Expected [1] to be an object");
}

#[rstest]
fn unknown_properties_are_ignored(registry: TypeRegistry) {
    let tag = describe(&registry, Tag::type_ref());
    let decoded = decode(r#"{"name":"a","colour":"red"}"#, &tag).expect("decode");
    assert_eq!(
        Tag::from_native(decoded).expect("tag"),
        Tag {
            name: "a".to_owned(),
            value: String::new()
        }
    );
}

#[rstest]
fn composites_without_constructor_cannot_be_decoded(registry: TypeRegistry) {
    let detached = describe(&registry, Detached::type_ref());
    assert!(matches!(
        decode(r#"{"name":"x"}"#, &detached),
        Err(CodecError::MissingConstructor { .. })
    ));
}

#[rstest]
fn map_keys_decode_through_the_key_type(registry: TypeRegistry) {
    let map = describe(&registry, <BTreeMap<i32, String>>::type_ref());
    let decoded = decode(r#"{"3":"three"}"#, &map).expect("decode");
    assert_eq!(
        decoded,
        Native::Map(vec![(Native::Integer(3), Native::String("three".to_owned()))])
    );
    assert_eq!(encode(&decoded, &map), r#"{"3":"three"}"#);
}

#[rstest]
fn entries_use_key_and_value_members(registry: TypeRegistry) {
    let entry = describe(&registry, <(String, i64)>::type_ref());
    let decoded = decode(r#"{"key":"qty","value":"9"}"#, &entry).expect("decode");
    assert_eq!(
        <(String, i64)>::from_native(decoded.clone()).expect("entry"),
        ("qty".to_owned(), 9)
    );
    assert_eq!(encode(&decoded, &entry), r#"{"key":"qty","value":9}"#);
}

#[rstest]
fn opaque_slots_keep_natural_shapes(registry: TypeRegistry) {
    let opaque = describe(&registry, serde_json::Value::type_ref());
    let decoded = decode(r#"[1, "a", {"b": null}]"#, &opaque).expect("decode");
    assert_eq!(
        decoded,
        Native::Sequence(vec![
            Native::Long(1),
            Native::String("a".to_owned()),
            Native::Opaque(json!({"b": null})),
        ])
    );
}

#[rstest]
fn bare_words_decode_as_strings(registry: TypeRegistry) {
    let text = describe(&registry, String::type_ref());
    assert_eq!(
        decode("hello", &text).expect("decode"),
        Native::String("hello".to_owned())
    );
    assert!(matches!(
        decode("{\"open", &text),
        Err(CodecError::Malformed { .. })
    ));
}

#[rstest]
fn strings_escape_control_characters(registry: TypeRegistry) {
    let text = describe(&registry, String::type_ref());
    assert_eq!(
        encode(&Native::String("tab\there \"q\"".to_owned()), &text),
        r#""tab\there \"q\"""#
    );
}

#[test]
fn untyped_encoding_follows_the_value_shape() {
    let value = Native::Sequence(vec![Native::Null, Native::Double(0.5), Native::Boolean(true)]);
    assert_eq!(encode_untyped(&value), "[null,0.5,true]");
}

#[test]
fn non_finite_doubles_encode_as_null() {
    assert_eq!(encode_untyped(&Native::Double(f64::NAN)), "null");
}

#[test]
fn argument_errors_report_their_position() {
    let error = CodecError::EmptyCharacter.at_argument(2);
    assert_eq!(
        error.to_string(),
        "argument 2: cannot convert an empty string to char"
    );
}
