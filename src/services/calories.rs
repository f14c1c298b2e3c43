//! Energy expenditure estimate from distance, duration and body weight.

use crate::error::ServiceError;

/// MET coefficient per minimum pace (m/s), fastest first.
const MET_BY_PACE: [(f64, f64); 4] = [(4.03, 12.8), (3.58, 11.5), (3.13, 10.0), (2.70, 8.0)];
/// MET used below the slowest pace threshold.
const BASE_MET: f64 = 6.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Pick the MET coefficient matching `pace_mps`.
pub fn met_for_pace(pace_mps: f64) -> f64 {
    MET_BY_PACE
        .iter()
        .find(|(threshold, _)| pace_mps >= *threshold)
        .map(|(_, met)| *met)
        .unwrap_or(BASE_MET)
}

/// Calories burned over `distance_m` meters in `elapsed_secs` seconds, rounded to 2 decimals.
///
/// A zero duration has no defined pace and is rejected.
pub fn calculate_calories(
    distance_m: u32,
    elapsed_secs: u64,
    weight_kg: f64,
) -> Result<f64, ServiceError> {
    if elapsed_secs == 0 {
        return Err(ServiceError::InvalidInput(
            "running duration must be greater than zero to estimate calories".into(),
        ));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ServiceError::InvalidInput(
            "weight must be a positive number of kilograms".into(),
        ));
    }

    let elapsed = elapsed_secs as f64;
    let pace = f64::from(distance_m) / elapsed;
    let calories = met_for_pace(pace) * weight_kg * (elapsed / SECONDS_PER_HOUR);
    Ok(round_to_hundredths(calories))
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
