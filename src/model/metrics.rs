//! Scoring functions for fitted estimators.

/// Fraction of label predictions matching the targets
///
/// Labels are compared after rounding, so 0.0/1.0 predictions score
/// against 0/1 targets directly.
pub fn accuracy(predictions: &[f32], targets: &[f32]) -> f64 {
    if predictions.is_empty() || predictions.len() != targets.len() {
        return 0.0;
    }

    let correct = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(p, t)| p.round() == t.round())
        .count();

    correct as f64 / predictions.len() as f64
}

/// Coefficient of determination (R²)
///
/// Returns 0.0 when the targets are constant, since the score is
/// undefined there.
pub fn r2_score(predictions: &[f32], targets: &[f32]) -> f64 {
    if predictions.is_empty() || predictions.len() != targets.len() {
        return 0.0;
    }

    let n = targets.len() as f64;
    let mean = targets.iter().map(|&t| t as f64).sum::<f64>() / n;

    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(&p, &t)| {
            let diff = t as f64 - p as f64;
            diff * diff
        })
        .sum();

    let ss_tot: f64 = targets
        .iter()
        .map(|&t| {
            let diff = t as f64 - mean;
            diff * diff
        })
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}
