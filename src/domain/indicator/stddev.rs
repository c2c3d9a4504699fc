//! Rolling sample standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) values are NaN; n < 2 is NaN throughout.

pub fn calculate_stddev(closes: &[f64], period: usize) -> Vec<f64> {
    if period < 2 {
        return vec![f64::NAN; closes.len()];
    }

    let mut values = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if i + 1 < period {
            values.push(f64::NAN);
            continue;
        }
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|c| {
                let diff = c - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - 1) as f64;
        values.push(variance.sqrt());
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_sample_denominator() {
        // mean 4, squared deviations 4+0+4 = 8, sample variance 8/2 = 4
        let values = calculate_stddev(&[2.0, 4.0, 6.0], 3);
        assert!((values[2] - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_constant_is_zero() {
        let values = calculate_stddev(&[3.0; 5], 3);
        for v in &values[2..] {
            assert!(v.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn stddev_warmup() {
        let values = calculate_stddev(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert!(!values[2].is_nan());
    }

    #[test]
    fn stddev_period_1_undefined() {
        let values = calculate_stddev(&[1.0, 2.0], 1);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
