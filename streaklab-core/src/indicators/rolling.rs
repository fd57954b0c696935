//! Rolling-window mean and standard deviation over `f64` series.
//!
//! Both run in O(N) with running sums. Output has the input's length and is
//! NaN until the first full window.

/// Rolling arithmetic mean over `window` values ending at each index.
///
/// A window containing any NaN yields NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }

    let mut sum = 0.0;
    let mut missing = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_finite() {
            sum += entering;
        } else {
            missing += 1;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_finite() {
                sum -= leaving;
            } else {
                missing -= 1;
            }
        }
        if i + 1 >= window && missing == 0 {
            out[i] = sum / window as f64;
        }
    }
    out
}

/// Rolling population standard deviation over the finite observations in
/// each `window`-sized window.
///
/// NaN before index `window - 1`, and NaN when the window holds fewer than two
/// finite observations.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_finite() {
            sum += entering;
            sum_sq += entering * entering;
            count += 1;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_finite() {
                sum -= leaving;
                sum_sq -= leaving * leaving;
                count -= 1;
            }
        }
        if i + 1 >= window && count >= 2 {
            let mean = sum / count as f64;
            // Cancellation can push the running variance a hair below zero.
            let var = (sum_sq / count as f64 - mean * mean).max(0.0);
            out[i] = var.sqrt();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_of_window() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
        assert_approx(out[4], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn mean_nan_poisons_window_only() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn population_std_matches_direct_formula() {
        let data = [0.01, -0.02, 0.015, 0.0, -0.005, 0.03];
        let out = rolling_std(&data, 4);
        let window = &data[2..6];
        let mean = window.iter().sum::<f64>() / 4.0;
        let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
        assert_approx(out[5], var.sqrt(), 1e-12);
    }

    #[test]
    fn std_skips_nan_observations() {
        // First value NaN: the window [NaN, 1, 3] uses {1, 3} → pop std 1.0
        let out = rolling_std(&[f64::NAN, 1.0, 3.0], 3);
        assert_approx(out[2], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn std_needs_two_observations() {
        let out = rolling_std(&[f64::NAN, f64::NAN, 3.0], 3);
        assert!(out[2].is_nan());
    }

    #[test]
    fn short_input_is_all_nan() {
        assert!(rolling_std(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(rolling_mean(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
    }
}
