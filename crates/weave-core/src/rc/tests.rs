use num_bigint::BigUint;
use serde::Deserialize;

use super::*;

fn state(current: u64, max: u64, last_update: i64) -> RcAccountState {
    RcAccountState {
        current_mana: BigUint::from(current),
        max_mana: BigUint::from(max),
        last_update_time_seconds: last_update,
    }
}

#[test]
fn half_full_account_regenerates_fully_in_two_and_half_days() {
    let s = state(500_000, 1_000_000, 1_000);

    assert_eq!(
        regenerated_mana(&s, 1_000 + 216_000),
        BigUint::from(1_000_000u32)
    );
    assert_eq!(current_percentage(&s, 1_000 + 216_000), Some(RcPercent::FULL));
    assert_eq!(
        current_percentage(&s, 1_000 + 216_000).map(RcPercent::as_f64),
        Some(100.0)
    );
}

#[test]
fn no_elapsed_time_reports_stored_mana() {
    let s = state(333_333, 1_000_000, 50);

    let pct = current_percentage(&s, 50).expect("max mana set");
    assert_eq!(pct.basis_points(), 3333);
    assert_eq!(pct.to_string(), "33.33");
}

#[test]
fn clock_skew_counts_as_no_elapsed_time() {
    let s = state(250_000, 1_000_000, 10_000);

    assert_eq!(current_percentage(&s, 0), current_percentage(&s, 10_000));
}

#[test]
fn full_window_always_yields_hundred_percent() {
    for current in [0, 1, 123_456, 999_999] {
        let s = state(current, 1_000_000, 0);
        for elapsed in [432_000, 432_001, 10_000_000, i64::MAX] {
            assert_eq!(current_percentage(&s, elapsed), Some(RcPercent::FULL));
        }
    }
}

#[test]
fn regeneration_is_monotonic_in_elapsed_time() {
    let s = state(10, 987_654_321, 0);
    let mut prev = BigUint::ZERO;

    for elapsed in (0..=450_000).step_by(7_919) {
        let mana = regenerated_mana(&s, elapsed);
        assert!(mana >= prev);
        assert!(mana <= s.max_mana);
        prev = mana;
    }
}

#[test]
fn zero_max_mana_is_unavailable() {
    assert_eq!(current_percentage(&state(0, 0, 0), 100), None);
    assert_eq!(current_percentage(&state(500, 0, 0), 100), None);
}

#[test]
fn current_above_max_is_clamped() {
    let s = state(2_000_000, 1_000_000, 0);

    assert_eq!(current_percentage(&s, 0), Some(RcPercent::FULL));
}

#[test]
fn huge_balances_keep_full_precision() {
    // Far beyond 2^53, where f64 math starts dropping digits
    let max: BigUint = "100000000000000000000000000000".parse().expect("valid");
    let s = RcAccountState {
        current_mana: &max / BigUint::from(4u32),
        max_mana: max.clone(),
        last_update_time_seconds: 0,
    };

    // A quarter plus a tenth of a window is 35%
    assert_eq!(
        current_percentage(&s, 43_200).map(RcPercent::basis_points),
        Some(3500)
    );
}

#[test]
fn idempotent_for_same_inputs() {
    let s = state(1, 3, 17);

    assert_eq!(current_percentage(&s, 99_999), current_percentage(&s, 99_999));
}

#[test]
fn mana_deserializes_from_number_or_string() {
    #[derive(Deserialize)]
    struct Bar {
        #[serde(deserialize_with = "deserialize_mana")]
        mana: BigUint,
    }

    let n: Bar = serde_json::from_str(r#"{"mana": 42}"#).expect("number");
    let s: Bar =
        serde_json::from_str(r#"{"mana": "98765432109876543210"}"#).expect("string");
    assert_eq!(n.mana, BigUint::from(42u32));
    assert_eq!(s.mana.to_string(), "98765432109876543210");
    assert!(serde_json::from_str::<Bar>(r#"{"mana": "-5"}"#).is_err());
}
