//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) values are NaN.

pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; closes.len()];
    }

    let mut values = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if i + 1 < period {
            values.push(f64::NAN);
        } else {
            let window = &closes[i + 1 - period..=i];
            values.push(window.iter().sum::<f64>() / period as f64);
        }
    }
    values
}
