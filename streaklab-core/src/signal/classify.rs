//! Return/threshold → `+`, `-`, `.`.

use crate::domain::Signal;

/// Classify one bar. NaN in either input is neutral.
pub fn classify_bar(ret: f64, threshold: f64) -> Signal {
    if ret.is_nan() || threshold.is_nan() {
        Signal::Neutral
    } else if ret > threshold {
        Signal::Up
    } else if ret < -threshold {
        Signal::Down
    } else {
        Signal::Neutral
    }
}

/// Classify a whole series. Output has the length of the shorter input.
pub fn classify(returns: &[f64], thresholds: &[f64]) -> Vec<Signal> {
    returns
        .iter()
        .zip(thresholds)
        .map(|(&r, &t)| classify_bar(r, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::render_signals;

    #[test]
    fn strict_inequalities() {
        assert_eq!(classify_bar(0.011, 0.01), Signal::Up);
        assert_eq!(classify_bar(0.01, 0.01), Signal::Neutral);
        assert_eq!(classify_bar(-0.01, 0.01), Signal::Neutral);
        assert_eq!(classify_bar(-0.0101, 0.01), Signal::Down);
    }

    #[test]
    fn nan_is_neutral() {
        assert_eq!(classify_bar(f64::NAN, 0.01), Signal::Neutral);
        assert_eq!(classify_bar(0.05, f64::NAN), Signal::Neutral);
    }

    #[test]
    fn series() {
        let r = [0.02, -0.02, 0.0, f64::NAN, 0.03];
        let t = [0.01, 0.01, 0.01, 0.01, f64::NAN];
        assert_eq!(render_signals(&classify(&r, &t)), "+-...");
    }
}
