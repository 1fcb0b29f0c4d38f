use aligner_costing_core::aggregation::{build_month_index, compute_all};
use aligner_costing_core::pricing::PricingPolicy;
use aligner_costing_core::rates::{
    DirectRates, FixedRates, RateResolver, RateSetUpdate, VariableRates, YearlyRateTable,
};
use aligner_costing_core::types::{AllocationPeriod, Treatment};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TOLERANCE: Decimal = dec!(0.000001);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn treatment(
    id: &str,
    clinic_id: i64,
    steps: u32,
    price: Decimal,
    started: NaiveDate,
    delivered: Option<NaiveDate>,
) -> Treatment {
    Treatment {
        id: id.into(),
        patient_name: Some(format!("Patient {id}")),
        clinic_id,
        clinic_name: None,
        number_of_steps: steps,
        price,
        remaining_amount: Decimal::ZERO,
        status: "active".into(),
        treatment_started_at: started,
        treatment_ended_at: None,
        delivery_completed_at: delivered,
    }
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

// ===========================================================================
// Two-key rate lookup
// ===========================================================================

#[test]
fn test_variable_rates_by_treatment_year_fixed_by_allocation_year() {
    // 2025 has a custom sheet rate; 2026 rates are unset and default.
    let mut table = YearlyRateTable::new();
    table.upsert(
        2025,
        RateSetUpdate {
            variable: Some(VariableRates {
                sheet_rate: dec!(10),
                ..VariableRates::default()
            }),
            direct: None,
            fixed: None,
        },
    );

    // Started December 2025, delivered January 2026: materials priced with
    // the 2025 row, fixed burden charged to 2026 (cmo included).
    let t = treatment(
        "cross-year",
        1,
        20,
        dec!(1000),
        date(2025, 12, 2),
        Some(date(2026, 1, 15)),
    );
    let computed = compute_all(&[t], &table, &PricingPolicy::default()).result;
    let c = &computed[0];

    assert_eq!(c.treatment_year, 2025);
    assert_eq!(c.allocation_period, AllocationPeriod::new(2026, 0));
    // 44 sheets at the 2025 rate of 10
    assert_eq!(c.variable_costs.sheets.total, dec!(440));
    // 2026 fixed base includes cmo: 27500 * 3h / 192h
    assert_close(c.allocated_fixed_cost, dec!(429.6875));
}

// ===========================================================================
// Reference round-trip: default rates reproduce documented figures
// ===========================================================================

#[test]
fn test_default_rateset_reference_round_trip() {
    let table = YearlyRateTable::new();
    let rates = table.resolve(2025);
    assert_eq!(rates.variable, VariableRates::default());
    assert_eq!(rates.direct, DirectRates::default());
    assert_eq!(rates.fixed, FixedRates::default());

    let t = treatment(
        "ref",
        1,
        20,
        dec!(1000),
        date(2025, 2, 1),
        Some(date(2025, 6, 15)),
    );
    let computed = compute_all(&[t], &table, &PricingPolicy::default()).result;
    let c = &computed[0];

    assert_eq!(c.variable_costs.sheets.quantity, dec!(44));
    assert_close(c.variable_costs.resin.quantity, dec!(0.8));
    assert_eq!(c.estimated_hours, dec!(3.0));
    assert_close(c.variable_costs.total, dec!(508.5));
    assert_close(c.direct_costs.total, dec!(765));
    assert_close(c.allocated_fixed_cost, dec!(351.5625));
    assert_close(c.total_cost, dec!(1625.0625));
    assert_close(c.profit, dec!(-625.0625));
}

// ===========================================================================
// Cost-plus cutover boundary through the full pipeline
// ===========================================================================

#[test]
fn test_cost_plus_cutover_boundary_november_vs_december() {
    let table = YearlyRateTable::new();
    let policy = PricingPolicy::default();
    let clinic = *policy.cost_plus_clinics.iter().next().unwrap();

    let november = treatment(
        "nov",
        clinic,
        20,
        dec!(1000),
        date(2025, 2, 1),
        Some(date(2025, 11, 20)),
    );
    let december = treatment(
        "dec",
        clinic,
        20,
        dec!(1000),
        date(2025, 2, 1),
        Some(date(2025, 12, 20)),
    );

    let computed = compute_all(&[november, december], &table, &policy).result;
    let nov = &computed[0];
    let dec_ = &computed[1];

    assert!(!nov.is_cost_plus_pricing);
    assert_eq!(nov.final_price, dec!(1000));

    assert!(dec_.is_cost_plus_pricing);
    // price overridden to the pre-marketing cost
    assert_close(dec_.final_price, dec!(1555.0625));
    // asymmetric cost-plus profit: final price minus the monthly split
    assert_close(dec_.profit, dec_.final_price - dec_.monthly_fixed_allocation);
}

// ===========================================================================
// Month bucketing feeds the coarse allocation figure
// ===========================================================================

#[test]
fn test_monthly_fixed_allocation_uses_month_bucket() {
    let table = YearlyRateTable::new();
    let treatments: Vec<Treatment> = (0..3)
        .map(|i| {
            treatment(
                &format!("t{i}"),
                1,
                10,
                dec!(1500),
                date(2025, 1, 10),
                Some(date(2025, 4, 10 + i)),
            )
        })
        .collect();

    let index = build_month_index(&treatments);
    assert_eq!(index[&AllocationPeriod::new(2025, 3)], 3);

    let computed = compute_all(&treatments, &table, &PricingPolicy::default()).result;
    for c in &computed {
        assert_eq!(c.monthly_fixed_allocation, dec!(7500));
    }
}

// ===========================================================================
// Serialisation boundary: computed records are plain JSON
// ===========================================================================

#[test]
fn test_computed_treatment_serialises_flat() {
    let table = YearlyRateTable::new();
    let t = treatment(
        "wire",
        1,
        20,
        dec!(1000),
        date(2025, 2, 1),
        Some(date(2025, 6, 15)),
    );
    let computed = compute_all(&[t], &table, &PricingPolicy::default()).result;
    let json = serde_json::to_value(&computed[0]).unwrap();

    // treatment fields are flattened next to the computed ones
    assert_eq!(json["id"], "wire");
    assert_eq!(json["treatment_year"], 2025);
    assert!(json["variable_costs"]["sheets"]["quantity"].is_string());
    assert!(json.get("is_cost_plus_pricing").is_some());
}
