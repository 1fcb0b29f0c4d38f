use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates, either per-unit prices or percentages (marketing fee is 7 = 7%).
pub type Rate = Decimal;

/// Labour-hour quantities
pub type Hours = Decimal;

/// Calendar period fixed-cost burden is charged to. `month0` is the
/// zero-based month index (0 = January, 11 = December), matching the
/// delivery records this engine consumes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AllocationPeriod {
    pub year: i32,
    pub month0: u32,
}

impl AllocationPeriod {
    pub fn new(year: i32, month0: u32) -> Self {
        Self { year, month0 }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// Chronological on-or-after comparison, used for policy cutovers.
    pub fn is_on_or_after(&self, other: &AllocationPeriod) -> bool {
        (self.year, self.month0) >= (other.year, other.month0)
    }
}

/// One patient's aligner-treatment case as delivered by the data-access
/// layer. Numeric fields tolerate null/malformed input by coercing to zero
/// so a bad row is never dropped from aggregate sums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    pub clinic_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_name: Option<String>,
    pub number_of_steps: u32,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub price: Money,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub remaining_amount: Money,
    #[serde(default)]
    pub status: String,
    pub treatment_started_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_ended_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_completed_at: Option<NaiveDate>,
}

impl Treatment {
    /// Year key for variable/direct rate lookup.
    pub fn treatment_year(&self) -> i32 {
        self.treatment_started_at.year()
    }

    /// Period key for fixed-cost allocation: delivery completion when
    /// known, otherwise the treatment start. May land in a different year
    /// than `treatment_year` — the two keys are allowed to diverge.
    pub fn allocation_period(&self) -> AllocationPeriod {
        let date = self
            .delivery_completed_at
            .unwrap_or(self.treatment_started_at);
        AllocationPeriod::from_date(date)
    }

    /// Clamp negative monetary fields to zero. Returns a warning per
    /// clamped field so callers can surface the bad row.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.price < Decimal::ZERO {
            warnings.push(format!(
                "treatment {}: negative price {} coerced to 0",
                self.id, self.price
            ));
            self.price = Decimal::ZERO;
        }
        if self.remaining_amount < Decimal::ZERO {
            warnings.push(format!(
                "treatment {}: negative remaining_amount {} coerced to 0",
                self.id, self.remaining_amount
            ));
            self.remaining_amount = Decimal::ZERO;
        }
        warnings
    }
}

/// One priced line in a cost breakdown: quantity x rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub quantity: Decimal,
    pub rate: Rate,
    pub total: Money,
}

impl CostLine {
    pub fn new(quantity: Decimal, rate: Rate) -> Self {
        Self {
            quantity,
            rate,
            total: quantity * rate,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Deserialise a number-ish JSON value, coercing null, missing, or
/// malformed input to zero rather than failing the whole row.
pub(crate) fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => {
            Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO)
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    })
}
