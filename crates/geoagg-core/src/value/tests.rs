use crate::{
    feature::Feature,
    geometry::Geometry,
    pipeline::{GroupKey, GroupTable, stable_hash_from_digest},
    value::{
        Value, ValueTag, canonical_cmp, hash_value, strict_order_cmp, with_test_hash_override,
    },
};
use std::cmp::Ordering;

fn point(x: f64, y: f64) -> Value {
    Value::Geometry(Geometry::from_wkt(&format!("POINT({x} {y})")).expect("point should parse"))
}

///
/// CANONICAL ORDER
///

#[test]
fn canonical_order_ranks_variants_before_payloads() {
    let ordered = [
        Value::Null,
        Value::Bool(false),
        Value::Bool(true),
        Value::Int(-3),
        Value::Float(0.5),
        Value::Int(1),
        Value::from("a"),
        Value::from("b"),
        Value::List(vec![Value::Int(1)]),
        point(0.0, 0.0),
    ];

    for pair in ordered.windows(2) {
        assert_eq!(
            canonical_cmp(&pair[0], &pair[1]),
            Ordering::Less,
            "{} should sort before {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn shorter_list_prefix_sorts_first() {
    let short = Value::List(vec![Value::Int(1)]);
    let long = Value::List(vec![Value::Int(1), Value::Int(0)]);

    assert_eq!(canonical_cmp(&short, &long), Ordering::Less);
}

#[test]
fn strict_order_refuses_mixed_and_null_operands() {
    assert_eq!(strict_order_cmp(&Value::Int(2), &Value::Float(2.0)), Some(Ordering::Equal));
    assert_eq!(strict_order_cmp(&Value::Int(1), &Value::from("1")), None);
    assert_eq!(strict_order_cmp(&Value::Null, &Value::Null), None);
    assert_eq!(strict_order_cmp(&Value::Float(f64::NAN), &Value::Float(1.0)), None);
}

///
/// CANONICALIZATION
///

#[test]
fn canonicalize_collapses_integral_doubles() {
    assert_eq!(Value::Float(3.0).canonicalize(), Value::Int(3));
    assert_eq!(Value::Float(-0.0).canonicalize(), Value::Int(0));
    assert_eq!(Value::Float(2.5).canonicalize(), Value::Float(2.5));
    assert_eq!(
        Value::List(vec![Value::Float(1.0), Value::from("x")]).canonicalize(),
        Value::List(vec![Value::Int(1), Value::from("x")])
    );
}

#[test]
fn canonicalize_keeps_huge_doubles_as_doubles() {
    let huge = 1e300;

    assert_eq!(Value::Float(huge).canonicalize(), Value::Float(huge));
    assert_eq!(
        Value::Float(9_223_372_036_854_775_808.0).canonicalize(),
        Value::Float(9_223_372_036_854_775_808.0)
    );
}

#[test]
#[expect(clippy::cast_precision_loss)]
fn canonicalize_collapses_integral_doubles_beyond_two_pow_53() {
    let big = 1i64 << 60;

    assert_eq!(Value::Float(big as f64).canonicalize(), Value::Int(big));
    assert_eq!(Value::Float(-(big as f64)).canonicalize(), Value::Int(-big));
    assert_eq!(Value::Float(i64::MIN as f64).canonicalize(), Value::Int(i64::MIN));
}

#[test]
#[expect(clippy::cast_precision_loss)]
fn large_int_and_double_compare_exactly() {
    let big = 1i64 << 60;
    let double = Value::Float(big as f64);

    assert_eq!(canonical_cmp(&Value::Int(big), &double), Ordering::Equal);
    assert_eq!(canonical_cmp(&Value::Int(big + 1), &double), Ordering::Greater);
    assert_eq!(canonical_cmp(&double, &Value::Int(big + 1)), Ordering::Less);
    assert_eq!(
        strict_order_cmp(&Value::Int(big - 1), &double),
        Some(Ordering::Less)
    );
    assert_eq!(
        strict_order_cmp(&Value::Int(i64::MAX), &Value::Float(f64::INFINITY)),
        Some(Ordering::Less)
    );
    assert!(!Value::Int(big + 1).group_eq(&double));
}

#[test]
fn group_eq_matches_nan_with_nan() {
    assert!(Value::Float(f64::NAN).group_eq(&Value::Float(-f64::NAN)));
    assert!(Value::Int(7).group_eq(&Value::Float(7.0)));
    assert!(!Value::Int(7).group_eq(&Value::from("7")));
}

///
/// HASHING
///

#[test]
fn hash_is_stable_for_equal_canonical_values() {
    assert_eq!(
        hash_value(&Value::Float(4.0).canonicalize()),
        hash_value(&Value::Int(4))
    );
    assert_eq!(hash_value(&Value::Float(0.0)), hash_value(&Value::Float(-0.0)));
    assert_ne!(hash_value(&Value::from("4")), hash_value(&Value::Int(4)));
}

#[test]
#[expect(clippy::cast_precision_loss)]
fn group_equal_values_hash_equal() {
    let big = 1i64 << 60;
    let pairs = [
        (Value::Int(big), Value::Float(big as f64)),
        (Value::Int(-big), Value::Float(-(big as f64))),
        (Value::Int(3), Value::Float(3.0)),
    ];

    for (int, double) in pairs {
        assert!(int.group_eq(&double), "{int} should group with {double}");
        assert_eq!(
            hash_value(&int.clone().canonicalize()),
            hash_value(&double.clone().canonicalize())
        );
    }
}

#[test]
fn list_hash_is_order_sensitive() {
    let ab = Value::List(vec![Value::from("a"), Value::from("b")]);
    let ba = Value::List(vec![Value::from("b"), Value::from("a")]);

    assert_ne!(hash_value(&ab), hash_value(&ba));
}

#[test]
fn forced_hash_collision_keeps_keys_apart() {
    let table = with_test_hash_override([7; 16], || {
        let mut table = GroupTable::new();
        table.insert(Value::from("a"), Feature::new(1, Vec::new()));
        table.insert(Value::from("b"), Feature::new(2, Vec::new()));
        table.insert(Value::from("a"), Feature::new(3, Vec::new()));
        table
    });

    assert_eq!(table.len(), 2);
    assert_eq!(table.groups()[0].key().hash(), table.groups()[1].key().hash());
    assert_eq!(table.groups()[0].len(), 2);
    assert!(!table.groups()[0].key().same_key(table.groups()[1].key()));
}

#[test]
fn group_key_hash_matches_canonical_digest() {
    let key = GroupKey::new(Value::Float(9.0));

    assert_eq!(key.canonical_value(), &Value::Int(9));
    assert_eq!(
        key.hash(),
        stable_hash_from_digest(hash_value(&Value::Int(9)))
    );
}

///
/// RENDERING
///

#[test]
fn render_and_display_differ_for_text_and_null() {
    assert_eq!(Value::Null.render(), "");
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::from("it's").render(), "it's");
    assert_eq!(Value::from("it's").to_string(), "'it''s'");
    assert_eq!(Value::Float(3.0).render(), "3");
    assert_eq!(
        Value::List(vec![Value::Int(1), Value::from("a")]).to_string(),
        "[1, 'a']"
    );
}

#[test]
fn type_labels_follow_tags() {
    assert_eq!(Value::Int(1).canonical_tag(), ValueTag::Int);
    assert_eq!(Value::Float(1.0).type_label(), "double");
    assert_eq!(point(1.0, 2.0).type_label(), "geometry");
}

#[test]
fn serializes_as_plain_json() {
    let value = Value::List(vec![Value::Null, Value::Int(2), Value::from("x")]);

    assert_eq!(
        serde_json::to_string(&value).expect("value should serialize"),
        r#"[null,2,"x"]"#
    );
}
