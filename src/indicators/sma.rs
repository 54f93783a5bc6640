// =============================================================================
// Simple Moving Average (SMA) — rolling window, compensated running sum
// =============================================================================
//
// SMA_t = (close_{t-period+1} + ... + close_t) / period
//
// The window sum is maintained incrementally (add the newest close, subtract
// the one falling out) so the whole series costs O(n). A plain running sum
// drifts on long series because every add/subtract rounds; the Neumaier
// compensation term carries the lost low-order bits forward.
// =============================================================================

/// Running window sum with Neumaier error compensation.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Compute the SMA of `closes` over `period`, aligned with the input.
///
/// Element `i` is `Some(mean of closes[i + 1 - period ..= i])` once
/// `i >= period - 1` and `None` before that, so the output always has the same
/// length as `closes`.
///
/// # Edge cases
/// - `period == 0` => every element is `None`
/// - `closes.len() < period` => every element is `None`
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return result;
    }

    let divisor = period as f64;
    let mut window = CompensatedSum::default();

    for (i, &close) in closes.iter().enumerate() {
        window.add(close);
        if i >= period {
            window.add(-closes[i - period]);
        }
        if i + 1 >= period {
            result[i] = Some(window.value() / divisor);
        }
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- calculate_sma ---------------------------------------------------

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 3).is_empty());
    }

    #[test]
    fn sma_period_zero() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_insufficient_data() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 5), vec![None, None]);
    }

    #[test]
    fn sma_known_values() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 3);
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let closes = [7.5, 8.25, 9.0];
        let sma = calculate_sma(&closes, 1);
        assert_eq!(sma, vec![Some(7.5), Some(8.25), Some(9.0)]);
    }

    #[test]
    fn sma_matches_direct_mean_on_long_series() {
        // Large level plus small oscillation: the worst case for a naive
        // running sum.
        let closes: Vec<f64> = (0..200_000)
            .map(|i| 1.0e6 + 0.1 * (i % 7) as f64 + 0.013 * (i % 11) as f64)
            .collect();
        let period = 200;
        let sma = calculate_sma(&closes, period);

        for i in (period - 1..closes.len()).step_by(997) {
            let direct: f64 =
                closes[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
            let rolled = sma[i].expect("window filled");
            assert!(
                (rolled - direct).abs() < 1e-7,
                "index {i}: rolled {rolled}, direct {direct}"
            );
        }
    }

    #[test]
    fn sma_is_deterministic() {
        let closes: Vec<f64> = (1..=500).map(|i| (i as f64).sqrt() * 3.7).collect();
        assert_eq!(calculate_sma(&closes, 20), calculate_sma(&closes, 20));
    }
}
