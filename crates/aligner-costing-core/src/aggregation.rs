use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::allocation::{compute_costs, ComputedTreatment, HOURS_BASED_BURDEN_METHODOLOGY};
use crate::error::CostingError;
use crate::pricing::PricingPolicy;
use crate::rates::RateResolver;
use crate::types::{with_metadata, AllocationPeriod, ComputationOutput, Money, Treatment};

const ACTIVE_KEYWORDS: [&str; 3] = ["active", "ongoing", "in progress"];
const COMPLETED_KEYWORDS: [&str; 3] = ["completed", "complete", "finished"];

/// Count of treatments per allocation month, built before the per-treatment
/// pass so `monthly_fixed_allocation` can be charged against it.
pub type MonthIndex = HashMap<AllocationPeriod, u32>;

/// Stage one of the pipeline: bucket every treatment by allocation month.
pub fn build_month_index(treatments: &[Treatment]) -> MonthIndex {
    let mut index = MonthIndex::new();
    for treatment in treatments {
        *index.entry(treatment.allocation_period()).or_insert(0) += 1;
    }
    index
}

/// Stage two: map every treatment through the allocation engine with the
/// month index as a parameter. Rows are sanitised first (negatives clamped
/// to zero); clamp warnings surface in the output envelope.
pub fn compute_all(
    treatments: &[Treatment],
    resolver: &dyn RateResolver,
    policy: &PricingPolicy,
) -> ComputationOutput<Vec<ComputedTreatment>> {
    let mut warnings = Vec::new();
    let mut sanitized: Vec<Treatment> = treatments.to_vec();
    for treatment in &mut sanitized {
        warnings.extend(treatment.sanitize());
    }

    let index = build_month_index(&sanitized);
    let computed = sanitized
        .iter()
        .map(|treatment| {
            let rates = resolver.resolve(treatment.treatment_year());
            let fixed = resolver.resolve(treatment.allocation_period().year).fixed;
            let in_month = index
                .get(&treatment.allocation_period())
                .copied()
                .unwrap_or(1);
            compute_costs(
                treatment,
                &rates.variable,
                &rates.direct,
                &fixed,
                policy,
                in_month,
            )
        })
        .collect();

    with_metadata(HOURS_BASED_BURDEN_METHODOLOGY, warnings, computed)
}

/// Dashboard year filter: a single year or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearSelection {
    All,
    Year(i32),
}

impl YearSelection {
    pub fn matches(&self, year: i32) -> bool {
        match self {
            YearSelection::All => true,
            YearSelection::Year(y) => *y == year,
        }
    }
}

impl FromStr for YearSelection {
    type Err = CostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(YearSelection::All);
        }
        trimmed
            .parse::<i32>()
            .map(YearSelection::Year)
            .map_err(|_| CostingError::InvalidInput {
                field: "year".into(),
                reason: format!("expected \"all\" or a year, got \"{trimmed}\""),
            })
    }
}

/// Months of the year already elapsed as of `as_of`: full 12 for past
/// years, the current month number for the current year, 0 for the future.
pub fn months_elapsed(year: i32, as_of: NaiveDate) -> u32 {
    match year.cmp(&as_of.year()) {
        std::cmp::Ordering::Less => 12,
        std::cmp::Ordering::Equal => as_of.month(),
        std::cmp::Ordering::Greater => 0,
    }
}

/// Break-even financial summary over a set of computed treatments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_revenue: Money,
    pub total_patients: u32,
    pub total_variable_costs: Money,
    pub total_direct_costs: Money,
    pub total_fixed_costs: Money,
    pub total_costs: Money,
    pub gross_profit: Money,
    pub net_profit: Money,
    /// Percent of revenue.
    pub profit_margin: Decimal,
    pub avg_revenue_per_patient: Money,
    pub avg_variable_cost_per_patient: Money,
    pub contribution_margin: Money,
    /// Treatments needed to cover accumulated fixed costs. 0 means
    /// unreachable (non-positive contribution margin), never an error.
    pub break_even_point: u64,
    /// Treatments per month needed to cover one month of fixed costs.
    pub monthly_break_even: u64,
    pub months_counted: u32,
    pub treatments_per_year: BTreeMap<i32, u32>,
}

/// High-level dashboard statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_patients: u32,
    pub active_patients: u32,
    pub completed_patients: u32,
    pub total_revenue: Money,
    pub total_costs: Money,
    pub gross_profit: Money,
    /// Revenue minus the per-treatment total costs (hours-based burden).
    pub operational_profit: Money,
    pub net_profit: Money,
    pub profit_margin: Decimal,
    pub average_revenue_per_patient: Money,
    pub average_cost_per_patient: Money,
    pub payments_remaining: Money,
    pub months_counted: u32,
}

/// Case-insensitive keyword match; separators are normalised so variants
/// like "In-Progress" still classify.
fn status_matches(status: &str, keywords: &[&str]) -> bool {
    let normalized = status.to_lowercase().replace(['-', '_'], " ");
    keywords.iter().any(|k| normalized.contains(k))
}

pub fn is_active_status(status: &str) -> bool {
    status_matches(status, &ACTIVE_KEYWORDS)
}

pub fn is_completed_status(status: &str) -> bool {
    status_matches(status, &COMPLETED_KEYWORDS)
}

fn ceil_to_count(value: Decimal) -> u64 {
    value.ceil().to_u64().unwrap_or(0)
}

/// Financial summary over already-computed treatments. `computed` is the
/// filtered set the caller wants summarised; fixed costs accumulate per
/// elapsed month across the selection.
pub fn financial_summary(
    computed: &[ComputedTreatment],
    resolver: &dyn RateResolver,
    selection: YearSelection,
    as_of: NaiveDate,
) -> ComputationOutput<FinancialSummary> {
    let mut warnings = Vec::new();
    let count = computed.len() as u32;
    let count_dec = Decimal::from(count);

    let total_revenue: Money = computed.iter().map(|c| c.final_price).sum();
    let total_variable_costs: Money = computed.iter().map(|c| c.variable_costs.total).sum();
    let total_direct_costs: Money = computed.iter().map(|c| c.direct_costs.total).sum();

    let current_year = as_of.year();

    // Accumulate fixed costs over every elapsed month in the selection
    let mut total_fixed_costs = Decimal::ZERO;
    let mut months_counted = 0u32;
    match selection {
        YearSelection::All => {
            let mut years: BTreeSet<i32> = resolver.years().into_iter().collect();
            years.extend(computed.iter().map(|c| c.treatment_year));
            if years.is_empty() {
                years.insert(current_year);
            }
            for year in years {
                let months = months_elapsed(year, as_of);
                if months == 0 {
                    continue;
                }
                let fixed = resolver.resolve(year).fixed;
                total_fixed_costs += fixed.monthly_total(year) * Decimal::from(months);
                months_counted += months;
            }
        }
        YearSelection::Year(year) => {
            let months = months_elapsed(year, as_of);
            let fixed = resolver.resolve(year).fixed;
            total_fixed_costs = fixed.monthly_total(year) * Decimal::from(months);
            months_counted = months;
        }
    }

    let total_costs = total_variable_costs + total_direct_costs + total_fixed_costs;
    let gross_profit = total_revenue - (total_variable_costs + total_direct_costs);
    let net_profit = total_revenue - total_costs;
    let profit_margin = if total_revenue > Decimal::ZERO {
        net_profit / total_revenue * dec!(100)
    } else {
        Decimal::ZERO
    };

    let (avg_revenue_per_patient, avg_variable_cost_per_patient) = if count > 0 {
        (
            total_revenue / count_dec,
            (total_variable_costs + total_direct_costs) / count_dec,
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let contribution_margin = avg_revenue_per_patient - avg_variable_cost_per_patient;

    // Single-month fixed base for the monthly break-even figure
    let break_even_year = match selection {
        YearSelection::All => current_year,
        YearSelection::Year(year) => year,
    };
    let monthly_fixed = resolver
        .resolve(break_even_year)
        .fixed
        .monthly_total(break_even_year);

    let (break_even_point, monthly_break_even) = if contribution_margin > Decimal::ZERO {
        (
            ceil_to_count(total_fixed_costs / contribution_margin),
            ceil_to_count(monthly_fixed / contribution_margin),
        )
    } else {
        warnings.push(
            "contribution margin is not positive; break-even reported as 0 (unreachable)".into(),
        );
        (0, 0)
    };

    let mut treatments_per_year: BTreeMap<i32, u32> = BTreeMap::new();
    for c in computed {
        *treatments_per_year.entry(c.treatment_year).or_insert(0) += 1;
    }

    let summary = FinancialSummary {
        total_revenue,
        total_patients: count,
        total_variable_costs,
        total_direct_costs,
        total_fixed_costs,
        total_costs,
        gross_profit,
        net_profit,
        profit_margin,
        avg_revenue_per_patient,
        avg_variable_cost_per_patient,
        contribution_margin,
        break_even_point,
        monthly_break_even,
        months_counted,
        treatments_per_year,
    };

    with_metadata("break_even_contribution_margin", warnings, summary)
}

/// Dashboard statistics over already-computed treatments.
pub fn dashboard_stats(
    computed: &[ComputedTreatment],
    resolver: &dyn RateResolver,
    selection: YearSelection,
    as_of: NaiveDate,
) -> ComputationOutput<DashboardStats> {
    let summary = financial_summary(computed, resolver, selection, as_of);
    let warnings = summary.warnings.clone();
    let summary = summary.result;

    let total_patients = computed.len() as u32;
    let active_patients = computed
        .iter()
        .filter(|c| is_active_status(&c.treatment.status))
        .count() as u32;
    let completed_patients = computed
        .iter()
        .filter(|c| is_completed_status(&c.treatment.status))
        .count() as u32;

    let total_revenue: Money = computed.iter().map(|c| c.final_price).sum();
    let per_treatment_costs: Money = computed.iter().map(|c| c.total_cost).sum();
    let variable_direct: Money = computed
        .iter()
        .map(|c| c.variable_costs.total + c.direct_costs.total)
        .sum();

    let gross_profit = total_revenue - variable_direct;
    let operational_profit = total_revenue - per_treatment_costs;

    let count_dec = Decimal::from(total_patients.max(1));
    let (average_revenue_per_patient, average_cost_per_patient) = if total_patients > 0 {
        (total_revenue / count_dec, per_treatment_costs / count_dec)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let payments_remaining: Money = computed
        .iter()
        .map(|c| c.treatment.remaining_amount)
        .sum();

    let stats = DashboardStats {
        total_patients,
        active_patients,
        completed_patients,
        total_revenue,
        total_costs: summary.total_costs,
        gross_profit,
        operational_profit,
        net_profit: summary.net_profit,
        profit_margin: summary.profit_margin,
        average_revenue_per_patient,
        average_cost_per_patient,
        payments_remaining,
        months_counted: summary.months_counted,
    };

    with_metadata("dashboard_rollup", warnings, stats)
}
