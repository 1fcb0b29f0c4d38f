use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingPolicy;
use crate::rates::{DirectRates, FixedRates, VariableRates};
use crate::types::{AllocationPeriod, CostLine, Hours, Money, Rate, Treatment};

/// Aligner sheets consumed per treatment step (upper + lower arch).
const SHEETS_PER_STEP: Decimal = dec!(2);
/// Sheets consumed by setup and retainers regardless of step count.
const BASE_SHEETS: Decimal = dec!(4);
/// Litres of resin per model: one 0.8L bottle prints 22 models.
const RESIN_LITRES_PER_MODEL: Decimal = dec!(0.8);
const MODELS_PER_RESIN_BOTTLE: Decimal = dec!(22);
/// Models printed beyond the step count (initial + final).
const EXTRA_MODELS: Decimal = dec!(2);
/// Production time per step: 9 minutes.
const HOURS_PER_STEP: Decimal = dec!(0.15);
/// Tool heads per sheet: 3 heads consumed per 5 sheets.
const HEADS_PER_SHEET: Decimal = dec!(0.6);
/// Flat consumables surcharge on the production-tools line.
const TOOLS_SURCHARGE: Money = dec!(2);

pub const HOURS_BASED_BURDEN_METHODOLOGY: &str = "hours_based_burden_allocation";

/// Material cost lines driven by the step count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableCostBreakdown {
    pub sheets: CostLine,
    pub case_and_accessories: CostLine,
    pub resin: CostLine,
    pub bag: CostLine,
    pub packaging_box: CostLine,
    pub total: Money,
}

/// Marketing fee charged as a percentage of the final price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingFee {
    pub rate_pct: Rate,
    pub total: Money,
}

/// Per-treatment service cost lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectCostBreakdown {
    pub design: CostLine,
    pub alcohol: CostLine,
    pub tissues: CostLine,
    pub production_tools: CostLine,
    pub marketing_fee: MarketingFee,
    pub total: Money,
}

/// A treatment with its full cost/profit decomposition. Derived on every
/// read, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedTreatment {
    #[serde(flatten)]
    pub treatment: Treatment,
    pub treatment_year: i32,
    pub allocation_period: AllocationPeriod,
    pub variable_costs: VariableCostBreakdown,
    pub direct_costs: DirectCostBreakdown,
    pub estimated_hours: Hours,
    /// Hours-based fixed burden — the authoritative share in `total_cost`.
    pub allocated_fixed_cost: Money,
    /// Coarser per-treatment split of the month's fixed base, reported
    /// alongside the hours-based figure for transparency.
    pub monthly_fixed_allocation: Money,
    /// Fixed burden not charged to this treatment. Unclamped: goes
    /// negative when a single treatment exceeds full month capacity.
    pub remaining_overhead: Money,
    pub total_cost: Money,
    pub final_price: Money,
    pub is_cost_plus_pricing: bool,
    pub profit: Money,
    /// Percent of final price (e.g. -62.5 = -62.5%).
    pub profit_margin: Decimal,
    pub revenue_per_hour: Money,
    pub profit_per_hour: Money,
}

/// Cost/profit decomposition for one treatment. Pure and deterministic:
/// no I/O, no side effects, total over its inputs.
///
/// `variable` and `direct` must be resolved by treatment year, `fixed` by
/// allocation year — the two keys may differ. `treatments_in_month` is the
/// size of this treatment's allocation-month bucket (floored at 1).
pub fn compute_costs(
    treatment: &Treatment,
    variable: &VariableRates,
    direct: &DirectRates,
    fixed: &FixedRates,
    policy: &PricingPolicy,
    treatments_in_month: u32,
) -> ComputedTreatment {
    let steps = Decimal::from(treatment.number_of_steps);
    let period = treatment.allocation_period();

    // Variable cost lines
    let sheets_quantity = steps * SHEETS_PER_STEP + BASE_SHEETS;
    let sheets = CostLine::new(sheets_quantity, variable.sheet_rate);
    let case_and_accessories = CostLine::new(Decimal::ONE, variable.case_rate);
    let resin_quantity =
        RESIN_LITRES_PER_MODEL / MODELS_PER_RESIN_BOTTLE * (steps + EXTRA_MODELS);
    let resin = CostLine::new(resin_quantity, variable.resin_rate);
    let bag = CostLine::new(Decimal::ONE, variable.bag_rate);
    let packaging_box = CostLine::new(Decimal::ONE, variable.box_rate);
    let total_variable =
        sheets.total + case_and_accessories.total + resin.total + bag.total + packaging_box.total;

    // Direct cost lines, marketing fee deferred until the price is known
    let design = CostLine::new(Decimal::ONE, direct.design_rate);
    let alcohol = CostLine::new(Decimal::ONE, direct.alcohol_rate);
    let tissues = CostLine::new(Decimal::ONE, direct.tissues_rate);
    let heads_needed = sheets_quantity * HEADS_PER_SHEET;
    let production_tools = CostLine {
        quantity: heads_needed,
        rate: direct.tools_rate,
        total: heads_needed * direct.tools_rate + TOOLS_SURCHARGE,
    };
    let direct_base = design.total + alcohol.total + tissues.total + production_tools.total;

    // Hours-based fixed burden
    let estimated_hours = steps * HOURS_PER_STEP;
    let monthly_fixed_cost = fixed.monthly_total(period.year);
    let allocated_fixed_cost = monthly_fixed_cost * estimated_hours / fixed.capacity_hours();
    let remaining_overhead = monthly_fixed_cost - allocated_fixed_cost;
    let month_count = Decimal::from(treatments_in_month.max(1));
    let monthly_fixed_allocation = monthly_fixed_cost / month_count;

    // Pricing runs on the pre-marketing cost because the fee depends on
    // the final price
    let base_cost = total_variable + direct_base + allocated_fixed_cost;
    let decision = policy.apply(treatment.clinic_id, period, base_cost, treatment.price);
    let final_price = decision.final_price;

    let marketing_fee = MarketingFee {
        rate_pct: direct.marketing_fee_rate,
        total: final_price * direct.marketing_fee_rate / dec!(100),
    };
    let total_direct = direct_base + marketing_fee.total;
    let total_cost = total_variable + total_direct + allocated_fixed_cost;

    // Cost-plus contracts measure profit against the coarse monthly split
    // only, ignoring variable and direct costs
    let profit = if decision.is_cost_plus {
        final_price - monthly_fixed_allocation
    } else {
        final_price - total_cost
    };

    let profit_margin = if final_price > Decimal::ZERO {
        profit / final_price * dec!(100)
    } else {
        Decimal::ZERO
    };
    let revenue_per_hour = if estimated_hours > Decimal::ZERO {
        final_price / estimated_hours
    } else {
        Decimal::ZERO
    };
    let profit_per_hour = if estimated_hours > Decimal::ZERO {
        profit / estimated_hours
    } else {
        Decimal::ZERO
    };

    ComputedTreatment {
        treatment: treatment.clone(),
        treatment_year: treatment.treatment_year(),
        allocation_period: period,
        variable_costs: VariableCostBreakdown {
            sheets,
            case_and_accessories,
            resin,
            bag,
            packaging_box,
            total: total_variable,
        },
        direct_costs: DirectCostBreakdown {
            design,
            alcohol,
            tissues,
            production_tools,
            marketing_fee,
            total: total_direct,
        },
        estimated_hours,
        allocated_fixed_cost,
        monthly_fixed_allocation,
        remaining_overhead,
        total_cost,
        final_price,
        is_cost_plus_pricing: decision.is_cost_plus,
        profit,
        profit_margin,
        revenue_per_hour,
        profit_per_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const TOLERANCE: Decimal = dec!(0.000001);

    fn treatment(steps: u32, price: Decimal, clinic_id: i64, delivered: NaiveDate) -> Treatment {
        Treatment {
            id: "t1".into(),
            patient_name: None,
            clinic_id,
            clinic_name: None,
            number_of_steps: steps,
            price,
            remaining_amount: Decimal::ZERO,
            status: "active".into(),
            treatment_started_at: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            treatment_ended_at: None,
            delivery_completed_at: Some(delivered),
        }
    }

    fn compute_default(t: &Treatment, treatments_in_month: u32) -> ComputedTreatment {
        compute_costs(
            t,
            &VariableRates::default(),
            &DirectRates::default(),
            &FixedRates::default(),
            &PricingPolicy::default(),
            treatments_in_month,
        )
    }

    fn assert_close(actual: Decimal, expected: Decimal) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_figures_20_steps_default_2025_rates() {
        // clinic 1 is not in the cost-plus set
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let t = treatment(20, dec!(1000), 1, delivered);
        let c = compute_default(&t, 1);

        assert_eq!(c.variable_costs.sheets.quantity, dec!(44));
        assert_eq!(c.variable_costs.sheets.total, dec!(352));
        assert_eq!(c.variable_costs.case_and_accessories.total, dec!(45));
        assert_close(c.variable_costs.resin.quantity, dec!(0.8));
        assert_close(c.variable_costs.resin.total, dec!(96));
        assert_eq!(c.variable_costs.bag.total, dec!(0.5));
        assert_eq!(c.variable_costs.packaging_box.total, dec!(15));
        assert_close(c.variable_costs.total, dec!(508.5));

        assert_eq!(c.estimated_hours, dec!(3.0));

        // 2025 fixed base excludes cmo: 22500/month
        assert_close(c.allocated_fixed_cost, dec!(351.5625));
        assert_close(c.remaining_overhead, dec!(22148.4375));
        assert_eq!(c.monthly_fixed_allocation, dec!(22500));

        // design 150 + alcohol 10 + tissues 5 + tools (44*0.6*20 + 2)
        assert_eq!(c.direct_costs.production_tools.total, dec!(530));
        // marketing fee on the final (list) price: 7% of 1000
        assert_eq!(c.direct_costs.marketing_fee.total, dec!(70));
        assert_close(c.direct_costs.total, dec!(765));

        assert_close(c.total_cost, dec!(1625.0625));
        assert_eq!(c.final_price, dec!(1000));
        assert!(!c.is_cost_plus_pricing);
        assert_close(c.profit, dec!(-625.0625));
        assert_close(c.profit_margin, dec!(-62.50625));
        assert_close(c.revenue_per_hour, dec!(333.333333));
        assert_close(c.profit_per_hour, dec!(-208.354166));
    }

    #[test]
    fn test_zero_steps_edge_case() {
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let t = treatment(0, dec!(500), 1, delivered);
        let c = compute_default(&t, 1);

        assert_eq!(c.variable_costs.sheets.quantity, dec!(4));
        assert_close(
            c.variable_costs.resin.quantity,
            dec!(0.8) / dec!(22) * dec!(2),
        );
        assert_eq!(c.estimated_hours, Decimal::ZERO);
        assert_eq!(c.allocated_fixed_cost, Decimal::ZERO);
        assert_eq!(c.remaining_overhead, dec!(22500));
        // per-hour divisions guarded to zero, not NaN/panic
        assert_eq!(c.revenue_per_hour, Decimal::ZERO);
        assert_eq!(c.profit_per_hour, Decimal::ZERO);
    }

    #[test]
    fn test_zero_capacity_falls_back_to_192() {
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let t = treatment(20, dec!(1000), 1, delivered);
        let mut fixed = FixedRates::default();
        fixed.monthly_capacity_hours = Decimal::ZERO;
        let c = compute_costs(
            &t,
            &VariableRates::default(),
            &DirectRates::default(),
            &fixed,
            &PricingPolicy::default(),
            1,
        );
        assert_close(c.allocated_fixed_cost, dec!(351.5625));
    }

    #[test]
    fn test_remaining_overhead_may_go_negative() {
        // 1300 steps -> 195 estimated hours, above the 192h month
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let t = treatment(1300, dec!(50000), 1, delivered);
        let c = compute_default(&t, 1);
        assert!(c.estimated_hours > dec!(192));
        assert!(c.remaining_overhead < Decimal::ZERO);
        assert_close(
            c.remaining_overhead,
            dec!(22500) - c.allocated_fixed_cost,
        );
    }

    #[test]
    fn test_cost_plus_profit_ignores_variable_and_direct_costs() {
        // clinic 7 is in the default override set; December 2025 delivery
        let delivered = NaiveDate::from_ymd_opt(2025, 12, 10).unwrap();
        let t = treatment(20, dec!(1000), 7, delivered);
        let c = compute_default(&t, 2);

        assert!(c.is_cost_plus_pricing);
        // final price = pre-marketing cost: 508.5 + 695 + 351.5625
        assert_close(c.final_price, dec!(1555.0625));
        // fee charged on the overridden price, not the list price
        assert_close(c.direct_costs.marketing_fee.total, dec!(108.854375));
        assert_close(c.total_cost, dec!(1663.916875));
        // profit measured against the monthly split only (22500 / 2)
        assert_eq!(c.monthly_fixed_allocation, dec!(11250));
        assert_close(c.profit, dec!(1555.0625) - dec!(11250));
    }

    #[test]
    fn test_cost_plus_not_applied_before_cutover() {
        let delivered = NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
        let t = treatment(20, dec!(1000), 7, delivered);
        let c = compute_default(&t, 1);
        assert!(!c.is_cost_plus_pricing);
        assert_eq!(c.final_price, dec!(1000));
    }

    #[test]
    fn test_production_tools_monotone_in_steps_and_rate() {
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let base = compute_default(&treatment(10, dec!(1000), 1, delivered), 1);
        let more_steps = compute_default(&treatment(11, dec!(1000), 1, delivered), 1);
        assert!(
            more_steps.direct_costs.production_tools.total
                > base.direct_costs.production_tools.total
        );

        let mut pricier = DirectRates::default();
        pricier.tools_rate = dec!(25);
        let higher_rate = compute_costs(
            &treatment(10, dec!(1000), 1, delivered),
            &VariableRates::default(),
            &pricier,
            &FixedRates::default(),
            &PricingPolicy::default(),
            1,
        );
        assert!(
            higher_rate.direct_costs.production_tools.total
                > base.direct_costs.production_tools.total
        );
    }

    #[test]
    fn test_zero_price_margin_guard() {
        let delivered = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let t = treatment(10, Decimal::ZERO, 1, delivered);
        let c = compute_default(&t, 1);
        assert_eq!(c.profit_margin, Decimal::ZERO);
        assert!(c.profit < Decimal::ZERO);
    }

    #[test]
    fn test_cmo_joins_fixed_base_in_2026() {
        let delivered = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let t = treatment(20, dec!(1000), 1, delivered);
        let c = compute_default(&t, 1);
        // 27500 * 3 / 192
        assert_close(c.allocated_fixed_cost, dec!(429.6875));
        assert_eq!(c.monthly_fixed_allocation, dec!(27500));
    }
}
