use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Hours, Money, Rate};

// ---------------------------------------------------------------------------
// Documented default rates. Unknown years and missing fields resolve to
// these silently — rate lookup never fails.
// ---------------------------------------------------------------------------

pub const DEFAULT_SHEET_RATE: Rate = dec!(8);
pub const DEFAULT_CASE_RATE: Rate = dec!(45);
pub const DEFAULT_RESIN_RATE: Rate = dec!(120);
pub const DEFAULT_BAG_RATE: Rate = dec!(0.5);
pub const DEFAULT_BOX_RATE: Rate = dec!(15);

pub const DEFAULT_DESIGN_RATE: Rate = dec!(150);
pub const DEFAULT_ALCOHOL_RATE: Rate = dec!(10);
pub const DEFAULT_TISSUES_RATE: Rate = dec!(5);
pub const DEFAULT_TOOLS_RATE: Rate = dec!(20);
pub const DEFAULT_MARKETING_FEE_RATE: Rate = dec!(7);

pub const DEFAULT_RENT: Money = dec!(5000);
pub const DEFAULT_UTILITIES: Money = dec!(800);
pub const DEFAULT_SALARIES: Money = dec!(15000);
pub const DEFAULT_INTERNET: Money = dec!(200);
pub const DEFAULT_LEGAL: Money = dec!(500);
pub const DEFAULT_ACCOUNTANT_AND_AUDIT: Money = dec!(1000);
pub const DEFAULT_CMO: Money = dec!(5000);
pub const DEFAULT_MONTHLY_CAPACITY_HOURS: Hours = dec!(192);

/// First allocation year whose fixed-cost base includes the CMO retainer.
/// Allocation years before the cutover exclude it (historical behaviour,
/// kept permanent until product says otherwise).
pub const CMO_CUTOVER_YEAR: i32 = 2026;

// ---------------------------------------------------------------------------
// Rate categories
// ---------------------------------------------------------------------------

/// Per-unit material rates for the variable cost lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableRates {
    pub sheet_rate: Rate,
    pub case_rate: Rate,
    pub resin_rate: Rate,
    pub bag_rate: Rate,
    pub box_rate: Rate,
}

impl Default for VariableRates {
    fn default() -> Self {
        Self {
            sheet_rate: DEFAULT_SHEET_RATE,
            case_rate: DEFAULT_CASE_RATE,
            resin_rate: DEFAULT_RESIN_RATE,
            bag_rate: DEFAULT_BAG_RATE,
            box_rate: DEFAULT_BOX_RATE,
        }
    }
}

/// Per-treatment direct cost rates. `marketing_fee_rate` is a percentage
/// of the final price (7 = 7%), charged after the pricing policy runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectRates {
    pub design_rate: Rate,
    pub alcohol_rate: Rate,
    pub tissues_rate: Rate,
    /// Price per production-tool head; 3 heads are consumed per 5 sheets.
    pub tools_rate: Rate,
    pub marketing_fee_rate: Rate,
}

impl Default for DirectRates {
    fn default() -> Self {
        Self {
            design_rate: DEFAULT_DESIGN_RATE,
            alcohol_rate: DEFAULT_ALCOHOL_RATE,
            tissues_rate: DEFAULT_TISSUES_RATE,
            tools_rate: DEFAULT_TOOLS_RATE,
            marketing_fee_rate: DEFAULT_MARKETING_FEE_RATE,
        }
    }
}

/// Monthly fixed overheads plus the production capacity they are spread
/// over under the hours-based burden model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedRates {
    pub rent: Money,
    pub utilities: Money,
    pub salaries: Money,
    pub internet: Money,
    pub legal: Money,
    pub accountant_and_audit: Money,
    pub cmo: Money,
    pub monthly_capacity_hours: Hours,
}

impl Default for FixedRates {
    fn default() -> Self {
        Self {
            rent: DEFAULT_RENT,
            utilities: DEFAULT_UTILITIES,
            salaries: DEFAULT_SALARIES,
            internet: DEFAULT_INTERNET,
            legal: DEFAULT_LEGAL,
            accountant_and_audit: DEFAULT_ACCOUNTANT_AND_AUDIT,
            cmo: DEFAULT_CMO,
            monthly_capacity_hours: DEFAULT_MONTHLY_CAPACITY_HOURS,
        }
    }
}

impl FixedRates {
    /// Monthly fixed-cost base for an allocation year. The CMO retainer
    /// only counts from [`CMO_CUTOVER_YEAR`] onwards.
    pub fn monthly_total(&self, allocation_year: i32) -> Money {
        let base = self.rent
            + self.utilities
            + self.salaries
            + self.internet
            + self.legal
            + self.accountant_and_audit;
        if allocation_year >= CMO_CUTOVER_YEAR {
            base + self.cmo
        } else {
            base
        }
    }

    /// Capacity hours with the division guard: non-positive values fall
    /// back to the documented 192h default.
    pub fn capacity_hours(&self) -> Hours {
        if self.monthly_capacity_hours <= Decimal::ZERO {
            DEFAULT_MONTHLY_CAPACITY_HOURS
        } else {
            self.monthly_capacity_hours
        }
    }
}

/// The full rate picture for one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    pub variable: VariableRates,
    pub direct: DirectRates,
    pub fixed: FixedRates,
}

/// A partial rate row as stored or submitted by the administrative edit
/// surface: any category may be absent and resolves to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableRates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct: Option<DirectRates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<FixedRates>,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Read-only year-keyed rate lookup. Resolution is total: unknown years
/// yield the default [`RateSet`], never an error.
pub trait RateResolver {
    fn resolve(&self, year: i32) -> RateSet;

    /// Years with an explicit rate row, ascending.
    fn years(&self) -> Vec<i32>;
}

/// Sparse yearly rate table. Serialises as a year-keyed map, so a JSON
/// rates file is `{"2024": {...}, "2025": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearlyRateTable {
    years: BTreeMap<i32, RateSetUpdate>,
}

impl YearlyRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-update one year. Categories present in `update` replace
    /// the stored ones; absent categories keep whatever was stored.
    pub fn upsert(&mut self, year: i32, update: RateSetUpdate) {
        let entry = self.years.entry(year).or_default();
        if let Some(variable) = update.variable {
            entry.variable = Some(variable);
        }
        if let Some(direct) = update.direct {
            entry.direct = Some(direct);
        }
        if let Some(fixed) = update.fixed {
            entry.fixed = Some(fixed);
        }
    }

    pub fn get(&self, year: i32) -> Option<&RateSetUpdate> {
        self.years.get(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

impl RateResolver for YearlyRateTable {
    fn resolve(&self, year: i32) -> RateSet {
        match self.years.get(&year) {
            Some(entry) => RateSet {
                variable: entry.variable.clone().unwrap_or_default(),
                direct: entry.direct.clone().unwrap_or_default(),
                fixed: entry.fixed.clone().unwrap_or_default(),
            },
            None => RateSet::default(),
        }
    }

    fn years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }
}
