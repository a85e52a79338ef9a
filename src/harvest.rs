//! Harvestable water volume and household impact.

use serde::{Deserialize, Serialize};

/// Household consumption and water price used for the impact figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestParams {
    /// Average household use in liters per day
    pub daily_household_liters: f64,
    /// Price of 1000 liters of supplied water
    pub cost_per_1000_liters: f64,
}

impl Default for HarvestParams {
    fn default() -> Self {
        Self {
            daily_household_liters: 200.0,
            cost_per_1000_liters: 15.0,
        }
    }
}

/// Result of combining roof area, rainfall and runoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarvestResult {
    pub total_area_m2: f64,
    pub annual_precip_mm: f64,
    pub annual_precip_m: f64,
    pub runoff_coefficient: f64,
    pub harvestable_m3: f64,
    pub harvestable_liters: f64,
    /// Days of household supply the harvest covers
    pub days_supply: f64,
    #[serde(rename = "annual_savings_currency")]
    pub annual_savings: f64,
}

/// Computes the harvest for a total roof area and annual rainfall.
///
/// Inputs are not re-validated: the area comes from filtered roof records, the
/// rainfall from the resolver, and the runoff coefficient is checked by the
/// caller.
pub fn estimate(
    total_area_m2: f64,
    annual_precip_mm: f64,
    runoff_coefficient: f64,
    params: &HarvestParams,
) -> HarvestResult {
    let annual_precip_m = annual_precip_mm / 1000.0;
    let harvestable_m3 = total_area_m2 * annual_precip_m * runoff_coefficient;
    let harvestable_liters = harvestable_m3 * 1000.0;
    let days_supply = harvestable_liters / params.daily_household_liters;
    let annual_savings = (harvestable_liters / 1000.0) * params.cost_per_1000_liters;

    HarvestResult {
        total_area_m2,
        annual_precip_mm,
        annual_precip_m,
        runoff_coefficient,
        harvestable_m3,
        harvestable_liters,
        days_supply,
        annual_savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_reference_values() {
        let result = estimate(100.0, 800.0, 0.8, &HarvestParams::default());
        assert!((result.annual_precip_m - 0.8).abs() < 1e-9);
        assert!((result.harvestable_m3 - 64.0).abs() < 1e-9);
        assert!((result.harvestable_liters - 64000.0).abs() < 1e-6);
        assert!((result.days_supply - 320.0).abs() < 1e-9);
        assert!((result.annual_savings - 960.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_zero_area() {
        let result = estimate(0.0, 1200.0, 0.9, &HarvestParams::default());
        assert_eq!(result.harvestable_liters, 0.0);
        assert_eq!(result.days_supply, 0.0);
        assert_eq!(result.annual_savings, 0.0);
    }

    #[test]
    fn test_estimate_custom_params() {
        let params = HarvestParams {
            daily_household_liters: 500.0,
            cost_per_1000_liters: 40.0,
        };
        let result = estimate(50.0, 1000.0, 1.0, &params);
        assert!((result.harvestable_liters - 50000.0).abs() < 1e-6);
        assert!((result.days_supply - 100.0).abs() < 1e-9);
        assert!((result.annual_savings - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_savings_serialized_with_currency_suffix() {
        let result = estimate(100.0, 800.0, 0.8, &HarvestParams::default());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"annual_savings_currency\":"));
        assert!(!json.contains("\"annual_savings\":"));
    }
}
