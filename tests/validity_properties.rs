use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use reldata::{Field, FieldKind, Schema, Validity, ValidatorKind, worst_case};

fn arb_validity() -> impl Strategy<Value = Validity> {
    prop_oneof![Just(Validity::Invalid), Just(Validity::Incomplete), Just(Validity::Valid)]
}

#[test]
fn worst_case_basics() {
    assert_eq!(worst_case([]), Validity::Valid);
    assert_eq!(worst_case([Validity::Valid, Validity::Incomplete]), Validity::Incomplete);
    assert_eq!(worst_case([Validity::Incomplete, Validity::Invalid, Validity::Valid]), Validity::Invalid);
    assert_eq!(Option::<bool>::from(Validity::Invalid), Some(false));
    assert_eq!(Validity::from(None), Validity::Incomplete);
    assert_eq!(Validity::Incomplete.to_string(), "unfilled");
}

proptest! {
    #[test]
    fn worst_case_is_the_minimum(values in prop::collection::vec(arb_validity(), 0..16)) {
        let expected = values.iter().copied().min().unwrap_or(Validity::Valid);
        prop_assert_eq!(worst_case(values.clone()), expected);
    }

    #[test]
    fn any_invalid_makes_all_invalid(mut values in prop::collection::vec(arb_validity(), 0..16), at in any::<prop::sample::Index>()) {
        values.insert(at.index(values.len() + 1), Validity::Invalid);
        prop_assert_eq!(worst_case(values), Validity::Invalid);
    }

    #[test]
    fn worst_case_ignores_order(values in prop::collection::vec(arb_validity(), 0..16)) {
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(worst_case(values), worst_case(reversed));
    }
}

fn arb_value_for(kind: FieldKind) -> BoxedStrategy<Value> {
    match kind {
        FieldKind::String => "[a-zA-Z0-9 _\"/]{0,12}".prop_map(Value::from).boxed(),
        FieldKind::Integer => prop_oneof![any::<i64>().prop_map(Value::from), any::<u64>().prop_map(Value::from)].boxed(),
        // quarters print and parse back exactly
        FieldKind::Float => (-4_000_000i32..4_000_000).prop_map(|n| Value::from(f64::from(n) / 4.0)).boxed(),
        FieldKind::Boolean => any::<bool>().prop_map(Value::from).boxed(),
        FieldKind::List => prop::collection::vec(any::<i32>(), 0..4).prop_map(Value::from).boxed(),
        FieldKind::Object | FieldKind::Any => prop::collection::btree_map("[a-z]{1,4}", any::<i32>(), 0..4)
            .prop_map(|m| serde_json::to_value(m).unwrap_or_default())
            .boxed(),
    }
}

fn arb_kind_and_value() -> impl Strategy<Value = (FieldKind, Value)> {
    prop::sample::select(FieldKind::ALL.to_vec()).prop_flat_map(|kind| (Just(kind), arb_value_for(kind)))
}

proptest! {
    // what a databag accepted reads back as the same value
    #[test]
    fn accepted_values_read_back((kind, value) in arb_kind_and_value()) {
        let schema = Arc::new(Schema::record("Roundtrip", [Field::required("v", kind)]));
        for backend in [ValidatorKind::Record, ValidatorKind::Model] {
            let validator = backend.build(Some(Arc::clone(&schema)));
            let encoded = validator.serialize("v", &value).expect("accepted");
            let decoded = validator.deserialize("v", &encoded).expect("decodes");
            prop_assert_eq!(&decoded, &value);
        }
    }
}
