//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No warmup: every position is defined.

pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; closes.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(closes.len());
    let mut ema = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        ema = if i == 0 {
            close
        } else {
            close * k + ema * (1.0 - k)
        };
        values.push(ema);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeded_with_first_close() {
        let values = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert!((values[0] - 10.0).abs() < f64::EPSILON);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = calculate_ema(&[10.0, 20.0, 30.0, 40.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);
        assert!((values[1] - e1).abs() < f64::EPSILON);
        assert!((values[2] - e2).abs() < f64::EPSILON);
        assert!((values[3] - e3).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let closes = [10.0, 20.0, 30.0];
        let values = calculate_ema(&closes, 1);
        for (v, c) in values.iter().zip(closes) {
            assert!((v - c).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_equal_prices() {
        let values = calculate_ema(&[100.0; 5], 3);
        for v in values {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_period_0_all_nan() {
        let values = calculate_ema(&[10.0, 20.0], 0);
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_empty() {
        assert!(calculate_ema(&[], 3).is_empty());
    }
}
