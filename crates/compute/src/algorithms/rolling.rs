/// Trailing statistics over the last `window` observations of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStats {
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    pub std_dev: f64,
}

/// Mean and sample standard deviation of the last `window` values.
///
/// Returns `None` unless at least `window` observations exist, so a value is
/// only produced once the window is full. A window of one has no sample
/// deviation and yields `std_dev == 0.0`.
pub fn trailing_stats(values: &[f64], window: usize) -> Option<TrailingStats> {
    if window == 0 || values.len() < window {
        return None;
    }

    let tail = &values[values.len() - window..];
    let mean = tail.iter().sum::<f64>() / window as f64;
    let std_dev = if window < 2 {
        0.0
    } else {
        let variance =
            tail.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        variance.sqrt()
    };

    Some(TrailingStats { mean, std_dev })
}

/// z-score of `value` against `stats`, substituting 1.0 for a zero or
/// non-finite deviation.
pub fn z_score(value: f64, stats: &TrailingStats) -> f64 {
    let denom = if stats.std_dev.is_finite() && stats.std_dev > 0.0 {
        stats.std_dev
    } else {
        1.0
    };
    (value - stats.mean) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_full_window() {
        assert!(trailing_stats(&[1.0, 2.0], 3).is_none());
        assert!(trailing_stats(&[1.0, 2.0, 3.0], 0).is_none());
        assert!(trailing_stats(&[1.0, 2.0, 3.0], 3).is_some());
    }

    #[test]
    fn uses_only_the_tail() {
        let stats = trailing_stats(&[100.0, 10.0, 10.0, 2.0], 3).unwrap();
        assert!((stats.mean - 22.0 / 3.0).abs() < 1e-12);
        // sample variance of [10, 10, 2] = (2.667² * 2 + 5.333²) / 2
        assert!((stats.std_dev - (128.0f64 / 3.0 / 2.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn constant_series_has_zero_deviation() {
        let stats = trailing_stats(&[4.0, 4.0, 4.0], 3).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(z_score(4.0, &stats), 0.0);
        // Zero deviation falls back to a unit denominator.
        assert_eq!(z_score(1.0, &stats), -3.0);
    }

    #[test]
    fn z_score_sign_follows_direction() {
        let stats = TrailingStats {
            mean: 10.0,
            std_dev: 2.0,
        };
        assert_eq!(z_score(6.0, &stats), -2.0);
        assert_eq!(z_score(14.0, &stats), 2.0);
    }
}
