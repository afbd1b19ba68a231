//! Pure technical-analysis functions over f64 slices.
//!
//! Every function returns a vector with the same length as its input; the
//! leading positions a window cannot cover hold `f64::NAN` ("not available").
//! Inputs are never mutated and no state outlives a call, so the functions
//! compose freely (`ema(sma(x, L), M)` etc.).

use serde::{Deserialize, Serialize};

const CCI_CONSTANT: f64 = 0.015;

fn nan_vec(n: usize) -> Vec<f64> {
    vec![f64::NAN; n]
}

/// First index holding a finite value, if any.
fn first_finite(x: &[f64]) -> Option<usize> {
    x.iter().position(|v| v.is_finite())
}

// ---------- moving averages --------------------------------------------------

/// Simple moving average; NaN for the first `len - 1` positions.
pub fn sma(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        let window = &x[i + 1 - len..=i];
        out[i] = window.iter().sum::<f64>() / len as f64;
    }
    out
}

/// Exponential moving average, `k = 2 / (len + 1)`, seeded at the first
/// finite input value (equal to `EMA[0] = x[0]` on finite input).
pub fn ema(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 {
        return out;
    }
    let Some(start) = first_finite(x) else {
        return out;
    };
    let k = 2.0 / (len as f64 + 1.0);
    out[start] = x[start];
    for i in (start + 1)..n {
        out[i] = k * x[i] + (1.0 - k) * out[i - 1];
    }
    out
}

/// Linearly weighted moving average, weights `len, len-1, ..., 1` with the
/// newest value weighted heaviest; warmup as SMA.
pub fn wma(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    let denom = (len * (len + 1)) as f64 / 2.0;
    for i in (len - 1)..n {
        let mut acc = 0.0;
        for j in 0..len {
            acc += x[i - j] * (len - j) as f64;
        }
        out[i] = acc / denom;
    }
    out
}

/// Wilder smoothing (`alpha = 1 / len`): seeded with the SMA over the first
/// `len` finite values, recursive afterwards. A leading NaN prefix in the
/// input shifts the seed window right, which keeps chained smoothers
/// (ADX's DX pass) well-defined.
pub fn rma(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 {
        return out;
    }
    let Some(start) = first_finite(x) else {
        return out;
    };
    if start + len > n {
        return out;
    }
    let seed_idx = start + len - 1;
    let seed = x[start..=seed_idx].iter().sum::<f64>() / len as f64;
    out[seed_idx] = seed;
    let alpha = 1.0 / len as f64;
    for i in (seed_idx + 1)..n {
        out[i] = alpha * x[i] + (1.0 - alpha) * out[i - 1];
    }
    out
}

/// Population standard deviation over a rolling window.
pub fn stdev(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        let window = &x[i + 1 - len..=i];
        let mean = window.iter().sum::<f64>() / len as f64;
        let var = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / len as f64;
        out[i] = var.sqrt();
    }
    out
}

// ---------- oscillators ------------------------------------------------------

/// Relative Strength Index (Wilder). NaN through index `len - 1`; index
/// `len` carries the simple-mean seed; `avg_loss == 0` maps to 100.
pub fn rsi(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || n <= len {
        return out;
    }
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = x[i] - x[i - 1];
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }
    let mut avg_gain = gains[1..=len].iter().sum::<f64>() / len as f64;
    let mut avg_loss = losses[1..=len].iter().sum::<f64>() / len as f64;
    out[len] = rsi_value(avg_gain, avg_loss);
    let len_f = len as f64;
    for i in (len + 1)..n {
        avg_gain = (avg_gain * (len_f - 1.0) + gains[i]) / len_f;
        avg_loss = (avg_loss * (len_f - 1.0) + losses[i]) / len_f;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// True range: `high - low` on the first bar, otherwise the maximum of
/// `high - low`, `|high - prev_close|`, `|low - prev_close|`.
pub fn tr(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut out = nan_vec(n);
    if n == 0 {
        return out;
    }
    out[0] = high[0] - low[0];
    for i in 1..n {
        let h_l = high[i] - low[i];
        let h_pc = (high[i] - close[i - 1]).abs();
        let l_pc = (low[i] - close[i - 1]).abs();
        out[i] = h_l.max(h_pc).max(l_pc);
    }
    out
}

/// Average true range: Wilder smoothing of the true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], len: usize) -> Vec<f64> {
    rma(&tr(high, low, close), len)
}

/// Stochastic %K; a zero high/low range emits 50.
pub fn stoch(close: &[f64], high: &[f64], low: &[f64], len: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        let hh = rolling_max(&high[i + 1 - len..=i]);
        let ll = rolling_min(&low[i + 1 - len..=i]);
        let range = hh - ll;
        out[i] = if range == 0.0 {
            50.0
        } else {
            100.0 * (close[i] - ll) / range
        };
    }
    out
}

/// Cumulative volume-weighted average of the typical price; falls back to
/// the typical price itself while cumulative volume is zero.
pub fn vwap(close: &[f64], high: &[f64], low: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = nan_vec(n);
    let mut pv_sum = 0.0;
    let mut vol_sum = 0.0;
    for i in 0..n {
        let typical = (high[i] + low[i] + close[i]) / 3.0;
        pv_sum += typical * volume[i];
        vol_sum += volume[i];
        out[i] = if vol_sum == 0.0 {
            typical
        } else {
            pv_sum / vol_sum
        };
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
}

/// MACD line, signal EMA and histogram.
pub fn macd(x: &[f64], fast: usize, slow: usize, signal_len: usize) -> MacdOutput {
    let fast_ema = ema(x, fast);
    let slow_ema = ema(x, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&macd_line, signal_len);
    let hist: Vec<f64> = macd_line.iter().zip(&signal).map(|(m, s)| m - s).collect();
    MacdOutput {
        macd: macd_line,
        signal,
        hist,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbOutput {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bollinger bands: SMA middle, `mult` population standard deviations out.
pub fn bb(x: &[f64], len: usize, mult: f64) -> BbOutput {
    let middle = sma(x, len);
    let sd = stdev(x, len);
    let upper: Vec<f64> = middle.iter().zip(&sd).map(|(m, s)| m + mult * s).collect();
    let lower: Vec<f64> = middle.iter().zip(&sd).map(|(m, s)| m - mult * s).collect();
    BbOutput {
        middle,
        upper,
        lower,
    }
}

/// Commodity Channel Index on a typical-price series; zero mean deviation
/// maps to 0.
pub fn cci(tp: &[f64], len: usize) -> Vec<f64> {
    let n = tp.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        let window = &tp[i + 1 - len..=i];
        let mean = window.iter().sum::<f64>() / len as f64;
        let dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / len as f64;
        out[i] = if dev == 0.0 {
            0.0
        } else {
            (tp[i] - mean) / (CCI_CONSTANT * dev)
        };
    }
    out
}

/// Williams %R; a zero range emits -50.
pub fn wpr(high: &[f64], low: &[f64], close: &[f64], len: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        let hh = rolling_max(&high[i + 1 - len..=i]);
        let ll = rolling_min(&low[i + 1 - len..=i]);
        let range = hh - ll;
        out[i] = if range == 0.0 {
            -50.0
        } else {
            -100.0 * (hh - close[i]) / range
        };
    }
    out
}

/// On-balance volume, seeded with the first bar's volume.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = nan_vec(n);
    if n == 0 {
        return out;
    }
    out[0] = volume[0];
    for i in 1..n {
        out[i] = if close[i] > close[i - 1] {
            out[i - 1] + volume[i]
        } else if close[i] < close[i - 1] {
            out[i - 1] - volume[i]
        } else {
            out[i - 1]
        };
    }
    out
}

/// Average Directional Index via RMA-smoothed +DM/-DM/TR.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], len: usize) -> Vec<f64> {
    let n = close.len();
    if n == 0 || len == 0 {
        return nan_vec(n);
    }
    let mut plus_dm = nan_vec(n);
    let mut minus_dm = nan_vec(n);
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }
    let smoothed_tr = rma(&tr(high, low, close), len);
    let smoothed_pdm = rma(&plus_dm, len);
    let smoothed_mdm = rma(&minus_dm, len);

    let mut dx = nan_vec(n);
    for i in 0..n {
        let (str_i, pdm, mdm) = (smoothed_tr[i], smoothed_pdm[i], smoothed_mdm[i]);
        if !str_i.is_finite() || !pdm.is_finite() || !mdm.is_finite() {
            continue;
        }
        let pdi = if str_i == 0.0 { 0.0 } else { 100.0 * pdm / str_i };
        let mdi = if str_i == 0.0 { 0.0 } else { 100.0 * mdm / str_i };
        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }
    rma(&dx, len)
}

// ---------- window extremes & momentum ---------------------------------------

fn rolling_max(window: &[f64]) -> f64 {
    // Strict comparison keeps the left-most value on ties.
    let mut best = window[0];
    for &v in &window[1..] {
        if v > best {
            best = v;
        }
    }
    best
}

fn rolling_min(window: &[f64]) -> f64 {
    let mut best = window[0];
    for &v in &window[1..] {
        if v < best {
            best = v;
        }
    }
    best
}

/// Rolling maximum over `len` bars.
pub fn highest(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        out[i] = rolling_max(&x[i + 1 - len..=i]);
    }
    out
}

/// Rolling minimum over `len` bars.
pub fn lowest(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    if len == 0 || len > n {
        return out;
    }
    for i in (len - 1)..n {
        out[i] = rolling_min(&x[i + 1 - len..=i]);
    }
    out
}

/// `x[i] - x[i - len]`, NaN while no reference bar exists.
pub fn change(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    for i in len..n {
        out[i] = x[i] - x[i - len];
    }
    out
}

/// Momentum is the same difference as `change`.
pub fn mom(x: &[f64], len: usize) -> Vec<f64> {
    change(x, len)
}

/// Percent rate of change; NaN when the reference value is zero.
pub fn roc(x: &[f64], len: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    for i in len..n {
        let reference = x[i - len];
        if reference != 0.0 {
            out[i] = 100.0 * (x[i] - reference) / reference;
        }
    }
    out
}

/// True exactly on bars where `a` moved from at-or-below `b` to above it.
pub fn crossover(a: &[f64], b: &[f64]) -> Vec<bool> {
    let n = a.len().min(b.len());
    let mut out = vec![false; n];
    for i in 1..n {
        out[i] = (a[i - 1] - b[i - 1]) <= 0.0 && (a[i] - b[i]) > 0.0;
    }
    out
}

/// True exactly on bars where `a` moved from at-or-above `b` to below it.
pub fn crossunder(a: &[f64], b: &[f64]) -> Vec<bool> {
    let n = a.len().min(b.len());
    let mut out = vec![false; n];
    for i in 1..n {
        out[i] = (a[i - 1] - b[i - 1]) >= 0.0 && (a[i] - b[i]) < 0.0;
    }
    out
}

/// Pivot high: emits `x[i - right]` when it is a strict maximum over the
/// inclusive window `[i - left - right, i]`; NaN otherwise.
pub fn pivothigh(x: &[f64], left: usize, right: usize) -> Vec<f64> {
    pivot(x, left, right, |cand, other| cand > other)
}

/// Pivot low: strict minimum variant of [`pivothigh`].
pub fn pivotlow(x: &[f64], left: usize, right: usize) -> Vec<f64> {
    pivot(x, left, right, |cand, other| cand < other)
}

fn pivot(x: &[f64], left: usize, right: usize, wins: fn(f64, f64) -> bool) -> Vec<f64> {
    let n = x.len();
    let mut out = nan_vec(n);
    let span = left + right;
    for i in span..n {
        let cand_idx = i - right;
        let cand = x[cand_idx];
        let is_pivot = (i - span..=i)
            .filter(|&j| j != cand_idx)
            .all(|j| wins(cand, x[j]));
        if is_pivot {
            out[i] = cand;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn assert_nan_prefix(out: &[f64], count: usize) {
        for (i, v) in out.iter().take(count).enumerate() {
            assert!(v.is_nan(), "expected NaN at {i}, got {v}");
        }
    }

    #[test]
    fn sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out.len(), 5);
        assert_nan_prefix(&out, 2);
        assert_close(out[2], 2.0);
        assert_close(out[3], 3.0);
        assert_close(out[4], 4.0);
    }

    #[test]
    fn ema_seed_and_recurrence() {
        let out = ema(&[1.0, 2.0, 3.0], 3);
        assert_close(out[0], 1.0);
        assert_close(out[1], 1.5);
        assert_close(out[2], 2.25);
    }

    #[test]
    fn wma_weights_newest_heaviest() {
        let out = wma(&[1.0, 2.0, 3.0], 3);
        assert_nan_prefix(&out, 2);
        assert_close(out[2], (1.0 + 4.0 + 9.0) / 6.0);
    }

    #[test]
    fn rma_seed_is_simple_mean() {
        let out = rma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_nan_prefix(&out, 2);
        assert_close(out[2], 2.0);
        assert_close(out[3], 8.0 / 3.0);
        assert_close(out[4], 31.0 / 9.0);
    }

    #[test]
    fn rma_skips_leading_nan_prefix() {
        let out = rma(&[f64::NAN, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert_nan_prefix(&out, 3);
        assert_close(out[3], 3.5);
    }

    #[test]
    fn stdev_is_population() {
        let out = stdev(&[1.0, 2.0, 3.0], 3);
        assert_close(out[2], (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn rsi_monotonic_gain_is_100() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let out = rsi(&x, 3);
        assert_nan_prefix(&out, 3);
        for v in &out[3..] {
            assert_close(*v, 100.0);
        }
    }

    #[test]
    fn tr_and_atr_on_constant_range() {
        let high = vec![12.0; 6];
        let low = vec![10.0; 6];
        let close = vec![11.0; 6];
        let tr_out = tr(&high, &low, &close);
        for v in &tr_out {
            assert_close(*v, 2.0);
        }
        let atr_out = atr(&high, &low, &close, 3);
        assert_nan_prefix(&atr_out, 2);
        for v in &atr_out[2..] {
            assert_close(*v, 2.0);
        }
    }

    #[test]
    fn stoch_zero_range_is_50() {
        let flat = vec![5.0; 4];
        let out = stoch(&flat, &flat, &flat, 2);
        assert_nan_prefix(&out, 1);
        for v in &out[1..] {
            assert_close(*v, 50.0);
        }
    }

    #[test]
    fn vwap_tracks_typical_price() {
        let close = vec![10.0, 20.0];
        let high = vec![10.0, 20.0];
        let low = vec![10.0, 20.0];
        let volume = vec![1.0, 3.0];
        let out = vwap(&close, &high, &low, &volume);
        assert_close(out[0], 10.0);
        assert_close(out[1], (10.0 + 60.0) / 4.0);
    }

    #[test]
    fn macd_histogram_is_difference() {
        let x: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64) * 0.7).collect();
        let out = macd(&x, 5, 10, 4);
        assert_eq!(out.macd.len(), x.len());
        for i in 0..x.len() {
            assert_close(out.hist[i], out.macd[i] - out.signal[i]);
        }
    }

    #[test]
    fn bb_bands_straddle_middle() {
        let x: Vec<f64> = (0..30).map(|i| (i as f64).sin() * 3.0 + 50.0).collect();
        let out = bb(&x, 5, 2.0);
        for i in 4..x.len() {
            assert!(out.upper[i] >= out.middle[i]);
            assert!(out.lower[i] <= out.middle[i]);
        }
    }

    #[test]
    fn cci_zero_deviation_is_zero() {
        let out = cci(&[7.0; 5], 3);
        assert_nan_prefix(&out, 2);
        for v in &out[2..] {
            assert_close(*v, 0.0);
        }
    }

    #[test]
    fn wpr_zero_range_is_minus_50() {
        let flat = vec![3.0; 4];
        let out = wpr(&flat, &flat, &flat, 2);
        for v in &out[1..] {
            assert_close(*v, -50.0);
        }
    }

    #[test]
    fn obv_accumulates_by_direction() {
        let out = obv(&[1.0, 2.0, 2.0, 1.0], &[10.0, 10.0, 10.0, 10.0]);
        assert_eq!(out, vec![10.0, 20.0, 20.0, 10.0]);
    }

    #[test]
    fn adx_is_bounded_after_warmup() {
        let n = 60;
        let high: Vec<f64> = (0..n).map(|i| 101.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 1.0).collect();
        let out = adx(&high, &low, &close, 5);
        assert_eq!(out.len(), n);
        assert_nan_prefix(&out, 9);
        let finite: Vec<f64> = out.iter().copied().filter(|v| v.is_finite()).collect();
        assert!(!finite.is_empty());
        for v in finite {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn highest_lowest_rolling_extremes() {
        let out_h = highest(&[1.0, 3.0, 2.0], 2);
        assert!(out_h[0].is_nan());
        assert_close(out_h[1], 3.0);
        assert_close(out_h[2], 3.0);
        let out_l = lowest(&[1.0, 3.0, 2.0], 2);
        assert_close(out_l[1], 1.0);
        assert_close(out_l[2], 2.0);
    }

    #[test]
    fn change_and_roc() {
        let out = change(&[1.0, 2.0, 4.0], 1);
        assert!(out[0].is_nan());
        assert_close(out[1], 1.0);
        assert_close(out[2], 2.0);
        let out = roc(&[1.0, 2.0], 1);
        assert!(out[0].is_nan());
        assert_close(out[1], 100.0);
        let zero_ref = roc(&[0.0, 2.0], 1);
        assert!(zero_ref[1].is_nan());
    }

    #[test]
    fn crossover_detects_sign_reversal() {
        let a = [1.0, 3.0, 3.0];
        let b = [2.0, 2.0, 2.0];
        assert_eq!(crossover(&a, &b), vec![false, true, false]);
        let c = [3.0, 1.0];
        assert_eq!(crossunder(&c, &b[..2]), vec![false, true]);
    }

    #[test]
    fn pivot_requires_strict_extreme() {
        let out = pivothigh(&[1.0, 3.0, 2.0], 1, 1);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_close(out[2], 3.0);
        // Equal neighbors: no strict extreme, left-most tie-break means no pivot.
        let tie = pivothigh(&[3.0, 3.0, 2.0], 1, 1);
        assert!(tie[2].is_nan());
        let out_l = pivotlow(&[3.0, 1.0, 2.0], 1, 1);
        assert_close(out_l[2], 1.0);
    }

    #[test]
    fn outputs_share_input_length() {
        let x: Vec<f64> = (0..25).map(|i| i as f64).collect();
        assert_eq!(sma(&x, 7).len(), 25);
        assert_eq!(ema(&x, 7).len(), 25);
        assert_eq!(rsi(&x, 7).len(), 25);
        assert_eq!(highest(&x, 7).len(), 25);
        assert_eq!(change(&x, 7).len(), 25);
        assert_eq!(pivothigh(&x, 2, 2).len(), 25);
    }
}
