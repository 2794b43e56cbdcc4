//! Property-based tests for Value and query assembly using proptest

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use minorm::prelude::*;

// ============================================================================
// Value Roundtrip Tests
// ============================================================================

proptest! {
    /// Test that Bool values roundtrip correctly
    #[test]
    fn test_bool_roundtrip(value in any::<bool>()) {
        let val = Value::from(value);
        assert_eq!(val.as_bool(), Some(value));
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "bool");
    }

    /// Test that Int values roundtrip correctly
    #[test]
    fn test_int_roundtrip(value in any::<i32>()) {
        let val = Value::from(value);
        assert_eq!(val.as_int(), Some(value));
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "int");
    }

    /// Test that Long values roundtrip correctly
    #[test]
    fn test_long_roundtrip(value in any::<i64>()) {
        let val = Value::from(value);
        assert_eq!(val.as_long(), Some(value));
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "long");
    }

    /// Test that Float values roundtrip correctly (excluding NaN and infinities)
    #[test]
    fn test_float_roundtrip(value in any::<f32>().prop_filter("finite", |v| v.is_finite())) {
        let val = Value::from(value);
        let retrieved = val.as_float().unwrap();
        assert!((retrieved - value).abs() < 1e-6 || retrieved == value);
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "float");
    }

    /// Test that Double values roundtrip correctly (excluding NaN and infinities)
    #[test]
    fn test_double_roundtrip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let val = Value::from(value);
        let retrieved = val.as_double().unwrap();
        assert!((retrieved - value).abs() < 1e-10 || retrieved == value);
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "double");
    }

    /// Test that String values roundtrip correctly
    #[test]
    fn test_string_roundtrip(value in ".*") {
        let val = Value::from(value.clone());
        assert_eq!(val.as_string(), value);
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "string");
    }

    /// Test that Bytes values roundtrip correctly
    #[test]
    fn test_bytes_roundtrip(value in prop::collection::vec(any::<u8>(), 0..1000)) {
        let val = Value::from(value.clone());
        assert_eq!(val.as_bytes(), Some(value.as_slice()));
        assert!(!val.is_null());
        assert_eq!(val.type_name(), "bytes");
    }
}

// ============================================================================
// Type Conversion Tests
// ============================================================================

proptest! {
    /// Test that Int to Long conversion works
    #[test]
    fn test_int_to_long_conversion(value in any::<i32>()) {
        let val = Value::from(value);
        assert_eq!(val.as_long(), Some(value as i64));
    }

    /// Test that Int to Double conversion works
    #[test]
    fn test_int_to_double_conversion(value in any::<i32>()) {
        let val = Value::from(value);
        let as_double = val.as_double().unwrap();
        assert!((as_double - value as f64).abs() < 1e-10);
    }

    /// Test that Float to Double conversion works
    #[test]
    fn test_float_to_double_conversion(value in any::<f32>().prop_filter("finite", |v| v.is_finite())) {
        let val = Value::from(value);
        let as_double = val.as_double().unwrap();
        // Allow for some precision loss in conversion
        assert!((as_double - value as f64).abs() < 1e-6);
    }

    /// Test that Long to Int conversion only succeeds in range
    #[test]
    fn test_long_to_int_conversion(value in any::<i64>()) {
        let val = Value::from(value);
        assert_eq!(val.as_int(), i32::try_from(value).ok());
    }

    /// Test that any value can be converted to string (no panic)
    #[test]
    fn test_to_string_never_panics(value in prop_oneof![
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Value::from),
        ".*".prop_map(Value::from),
    ]) {
        // Should never panic
        let _ = value.as_string();
    }
}

// ============================================================================
// Null Handling Tests
// ============================================================================

proptest! {
    /// Test that Option<T>::None creates Null values
    #[test]
    fn test_null_from_none(_value in 0..100u32) {
        let val = Value::from(Option::<i32>::None);
        assert!(val.is_null());
        assert_eq!(val.type_name(), "null");
        assert_eq!(val.as_int(), None);
        assert_eq!(val.as_string(), "null");
    }

    /// Test that Option<T>::Some creates non-Null values
    #[test]
    fn test_some_not_null(value in any::<i32>()) {
        let val = Value::from(Some(value));
        assert!(!val.is_null());
        assert_eq!(val.as_int(), Some(value));
    }
}

// ============================================================================
// Row Tests
// ============================================================================

proptest! {
    /// Test that Row can store and retrieve values
    #[test]
    fn test_row_operations(
        int_val in any::<i32>(),
        string_val in ".*",
        double_val in any::<f64>().prop_filter("finite", |v| v.is_finite())
    ) {
        let mut row = Row::new();

        row.insert("int_col".to_string(), Value::from(int_val));
        row.insert("string_col".to_string(), Value::from(string_val.clone()));
        row.insert("double_col".to_string(), Value::from(double_val));

        assert_eq!(row.get("int_col").and_then(|v| v.as_int()), Some(int_val));
        assert_eq!(row.get("string_col").map(|v| v.as_string()), Some(string_val));
        assert!(row.get("double_col").and_then(|v| v.as_double()).is_some());
    }

    /// Test that Row handles missing columns gracefully
    #[test]
    fn test_row_missing_column(column_name in "[a-z]{3,10}") {
        let row = Row::new();
        assert!(!row.contains_key(&column_name));
    }

    /// Test that Row can be cloned correctly
    #[test]
    fn test_row_clone(values in prop::collection::vec(any::<i32>(), 0..20)) {
        let mut row = Row::new();

        for (i, val) in values.iter().enumerate() {
            row.insert(format!("col_{}", i), Value::from(*val));
        }

        let cloned = row.clone();

        for (i, val) in values.iter().enumerate() {
            assert_eq!(cloned.get(&format!("col_{}", i)).and_then(|v| v.as_int()), Some(*val));
        }
    }
}

// ============================================================================
// JSON Serialization Tests
// ============================================================================

proptest! {
    /// Test that Value JSON serialization doesn't panic
    #[test]
    fn test_json_serialization_no_panic(value in prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Value::from),
        ".*".prop_map(|s: String| Value::from(s)),
        (0i64..4_102_444_800_000_000).prop_map(Value::Timestamp),
    ]) {
        // Serialization should never panic
        let result = serde_json::to_string(&value);
        assert!(result.is_ok());
    }
}

// ============================================================================
// Timestamp Tests
// ============================================================================

// Generated instants stay below year 2100 so the microsecond form is
// always representable.

proptest! {
    /// Test that DateTime values roundtrip through the microsecond encoding
    #[test]
    fn test_timestamp_roundtrip(micros in 0i64..4_102_444_800_000_000) {
        let dt = Utc.timestamp_micros(micros).single().unwrap();
        let val = Value::from(dt);
        assert_eq!(val.type_name(), "timestamp");
        assert_eq!(val.as_timestamp(), Some(dt));
        assert_eq!(val.as_long(), Some(micros));
    }

    /// Test that Timestamp values render as RFC 3339 text
    #[test]
    fn test_timestamp_renders_rfc3339(micros in 0i64..4_102_444_800_000_000) {
        let val = Value::Timestamp(micros);
        let text = val.as_string();
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert_eq!(parsed.timestamp_micros(), micros);
    }

    /// Test that RFC 3339 strings convert back to the same instant
    #[test]
    fn test_timestamp_from_rfc3339_string(micros in 0i64..4_102_444_800_000_000) {
        let dt = Utc.timestamp_micros(micros).single().unwrap();
        let val = Value::String(dt.to_rfc3339());
        assert_eq!(val.as_timestamp(), Some(dt));
    }
}

// ============================================================================
// Query Text Tests
// ============================================================================

static PARCEL: EntityDef = EntityDef {
    name: "Parcel",
    table: "parcels",
    identity: "id",
    identity_policy: IdentityPolicy::Engine,
    fields: &[
        FieldDef { name: "label", column: "label", kind: FieldKind::Text, default: None },
        FieldDef { name: "size", column: "size", kind: FieldKind::Int, default: None },
    ],
};

proptest! {
    /// Test that a where clause produces exactly one named fragment
    #[test]
    fn test_where_fragment_shape(field in "[a-z][a-z0-9_]{0,11}", value in ".*") {
        let mut pending = PendingQuery::new(&PARCEL);
        pending.push_where(eq(field.clone(), value.clone()));

        assert_eq!(pending.text(), format!(" WHERE {} = :{}", field, field));
        assert_eq!(pending.parameters().len(), 1);
        assert_eq!(pending.parameters().get(&field), Some(&Value::String(value)));
    }

    /// Test that every where clause appends its own fragment
    #[test]
    fn test_where_fragment_per_clause(
        clauses in prop::collection::vec(("[a-z]{1,8}", any::<i32>()), 1..8)
    ) {
        let mut pending = PendingQuery::new(&PARCEL);
        pending.push_from();
        for (field, value) in &clauses {
            pending.push_where(eq(field.clone(), *value));
        }

        assert_eq!(pending.text().matches(" WHERE ").count(), clauses.len());
        assert!(pending.parameters().len() <= clauses.len());
    }

    /// Test that rebinding a field keeps one parameter with the latest value
    #[test]
    fn test_where_rebinds_parameter(field in "[a-z]{1,8}", first in any::<i32>(), second in any::<i32>()) {
        let mut pending = PendingQuery::new(&PARCEL);
        pending.push_where(eq(field.clone(), first));
        pending.push_where(lt(field.clone(), second));

        assert_eq!(pending.text().matches(" WHERE ").count(), 2);
        assert_eq!(pending.parameters().len(), 1);
        assert_eq!(pending.parameters().get(&field), Some(&Value::Int(second)));
    }

    /// Test that parameters keep their binding order
    #[test]
    fn test_parameter_order_preserved(count in 1usize..10) {
        let mut pending = PendingQuery::new(&PARCEL);
        for i in 0..count {
            pending.push_where(eq(format!("f{}", i), i as i32));
        }

        let bound: Vec<&String> = pending.parameters().keys().collect();
        for (i, name) in bound.iter().enumerate() {
            assert_eq!(name.as_str(), format!("f{}", i));
        }
    }

    /// Test that arbitrary clause sequences keep the text well formed
    #[test]
    fn test_clause_sequence_spacing(ops in prop::collection::vec(0u8..3, 0..12)) {
        let mut pending = PendingQuery::new(&PARCEL);
        for op in &ops {
            match op {
                0 => pending.push_from(),
                1 => pending.push_where(eq("size", 1)),
                _ => pending.mark_delete(),
            }
        }

        assert!(!pending.text().contains("  "));
        assert_eq!(pending.is_delete(), ops.contains(&2));
        if ops.first() == Some(&0) {
            assert!(pending.text().starts_with("FROM "));
        } else if !ops.is_empty() {
            assert!(pending.text().starts_with(' '));
        }
    }
}

// ============================================================================
// Clone and Equality Tests
// ============================================================================

proptest! {
    /// Test that Value cloning works correctly
    #[test]
    fn test_value_clone(value in any::<i64>()) {
        let original = Value::from(value);
        let cloned = original.clone();

        assert_eq!(original.type_name(), cloned.type_name());
        assert_eq!(original.as_long(), cloned.as_long());
        assert_eq!(original.as_string(), cloned.as_string());
        assert_eq!(original.is_null(), cloned.is_null());
    }
}

// ============================================================================
// Safety Tests (No Panics)
// ============================================================================

proptest! {
    /// Test that type conversions never panic
    #[test]
    fn test_conversions_no_panic(value in prop_oneof![
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Value::from),
        ".*".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..1000).prop_map(Value::from),
        (0i64..4_102_444_800_000_000).prop_map(Value::Timestamp),
    ]) {
        // All these conversions should be safe (return Option or have sensible defaults)
        let _ = value.as_bool();
        let _ = value.as_int();
        let _ = value.as_long();
        let _ = value.as_float();
        let _ = value.as_double();
        let _ = value.as_string();
        let _ = value.as_bytes();
        let _ = value.as_timestamp();
        let _ = value.type_name();
        let _ = value.is_null();
    }
}
