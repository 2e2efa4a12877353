//! Analytics estimators used directly by `chomp-api`'s analytics endpoints
//! (spec.md §4.9's analytics family), not exposed through the transformer
//! expression grammar itself since they operate over a whole history
//! window rather than a single epoch's field values. Supplements the
//! distilled spec from `examples/original_source` (no direct Python
//! counterpart survived distillation, but the analytics routes imply these
//! standard technical indicators).

/// Simple moving average over the last `window` points.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(values.len() - window + 1);
    let mut sum: f64 = values[..window].iter().sum();
    out.push(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out.push(sum / window as f64);
    }
    out
}

/// Exponentially weighted moving average with smoothing factor `alpha`.
pub fn ewma(values: &[f64], alpha: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Average True Range over OHLC-style (high, low, close) triples.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], window: usize) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    if n < 2 || window == 0 {
        return Vec::new();
    }
    let mut true_ranges = Vec::with_capacity(n - 1);
    for i in 1..n {
        let high_low = highs[i] - lows[i];
        let high_close = (highs[i] - closes[i - 1]).abs();
        let low_close = (lows[i] - closes[i - 1]).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }
    sma(&true_ranges, window)
}

/// MACD line, signal line, and histogram for the standard 12/26/9
/// parameterization (or whichever spans the caller passes).
pub struct Macd {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast_span: usize, slow_span: usize, signal_span: usize) -> Macd {
    let fast = ewma(values, 2.0 / (fast_span as f64 + 1.0));
    let slow = ewma(values, 2.0 / (slow_span as f64 + 1.0));
    let macd_line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal_line = ewma(&macd_line, 2.0 / (signal_span as f64 + 1.0));
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();
    Macd {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Relative Strength Index over a rolling `window`.
pub fn rsi(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() <= window || window == 0 {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);
    for i in 1..values.len() {
        let delta = values[i] - values[i - 1];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }
    let avg_gain = sma(&gains, window);
    let avg_loss = sma(&losses, window);
    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(g, l)| {
            if *l == 0.0 {
                100.0
            } else {
                let rs = g / l;
                100.0 - (100.0 / (1.0 + rs))
            }
        })
        .collect()
}

/// Bollinger bands: (middle, upper, lower) series for the given window and
/// standard-deviation multiplier.
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(values: &[f64], window: usize, num_std: f64) -> BollingerBands {
    let middle = sma(values, window);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());
    for (i, mid) in middle.iter().enumerate() {
        let slice = &values[i..i + window];
        let mean = mid;
        let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
        let std_dev = variance.sqrt();
        upper.push(mean + num_std * std_dev);
        lower.push(mean - num_std * std_dev);
    }
    BollingerBands { middle, upper, lower }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_matches_hand_computed_average() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 2);
        assert_eq!(result, vec![1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn sma_empty_when_window_exceeds_input() {
        assert!(sma(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn ewma_first_value_is_seed() {
        let result = ewma(&[10.0, 20.0, 30.0], 0.5);
        assert_eq!(result[0], 10.0);
        assert_eq!(result[1], 15.0);
    }

    #[test]
    fn rsi_is_bounded_zero_to_hundred() {
        let values = [1.0, 2.0, 1.5, 3.0, 2.5, 4.0, 3.5, 5.0];
        let result = rsi(&values, 3);
        assert!(result.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn bollinger_middle_matches_sma() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let bands = bollinger_bands(&values, 3, 2.0);
        assert_eq!(bands.middle, sma(&values, 3));
        assert!(bands.upper[0] >= bands.middle[0]);
        assert!(bands.lower[0] <= bands.middle[0]);
    }
}
