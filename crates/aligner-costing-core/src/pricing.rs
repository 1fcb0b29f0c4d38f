use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{AllocationPeriod, Money};

/// Clinics billed at cost from the cutover period onwards. Stand-in ids;
/// production callers construct the policy with the real contract set.
pub const DEFAULT_COST_PLUS_CLINIC_IDS: [i64; 3] = [7, 12, 19];

/// Cost-plus contracts start in December 2025 (zero-based month index 11).
pub const DEFAULT_COST_PLUS_CUTOVER: AllocationPeriod = AllocationPeriod {
    year: 2025,
    month0: 11,
};

/// Outcome of the pricing pass for one treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingDecision {
    pub final_price: Money,
    pub is_cost_plus: bool,
}

/// Clinic- and date-conditional price override: selected clinics are
/// billed the computed cost instead of the list price once their
/// allocation period reaches the cutover.
///
/// Must run before the marketing fee is charged — the fee is a percentage
/// of the final price, so it is computed on this decision's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub cost_plus_clinics: BTreeSet<i64>,
    pub cutover: AllocationPeriod,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            cost_plus_clinics: DEFAULT_COST_PLUS_CLINIC_IDS.into_iter().collect(),
            cutover: DEFAULT_COST_PLUS_CUTOVER,
        }
    }
}

impl PricingPolicy {
    pub fn new(cost_plus_clinics: BTreeSet<i64>, cutover: AllocationPeriod) -> Self {
        Self {
            cost_plus_clinics,
            cutover,
        }
    }

    /// `base_cost` is the treatment's cost before the marketing fee
    /// (variable + direct-without-fee + allocated fixed burden).
    pub fn apply(
        &self,
        clinic_id: i64,
        period: AllocationPeriod,
        base_cost: Money,
        raw_price: Money,
    ) -> PricingDecision {
        if self.cost_plus_clinics.contains(&clinic_id) && period.is_on_or_after(&self.cutover) {
            PricingDecision {
                final_price: base_cost,
                is_cost_plus: true,
            }
        } else {
            PricingDecision {
                final_price: raw_price,
                is_cost_plus: false,
            }
        }
    }
}
