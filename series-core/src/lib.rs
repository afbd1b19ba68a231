use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;

pub use mock::generate_mock_ohlc;

/// Milliseconds since Unix epoch.
pub type Timestamp = i64;

/// Number of milliseconds in common units.
pub const MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;

/// One OHLCV observation at a timestamp.
///
/// `high >= max(open, close)` and `low <= min(open, close)` are expected but
/// not enforced; the engine tolerates ill-formed bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("bar series is empty")]
    Empty,
}

/// Frozen per-invocation record of the built-in series a script can read.
///
/// All derived series are computed once at setup and share the same length.
/// `bid`/`ask` are placeholders derived from close until a quote feed exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    time: Vec<f64>,
    bar_index: Vec<f64>,
    hl2: Vec<f64>,
    hlc3: Vec<f64>,
    ohlc4: Vec<f64>,
    bid: Vec<f64>,
    ask: Vec<f64>,
}

impl BarSeries {
    pub fn from_bars(bars: &[Bar]) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }
        let n = bars.len();
        let mut s = Self {
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
            time: Vec::with_capacity(n),
            bar_index: Vec::with_capacity(n),
            hl2: Vec::with_capacity(n),
            hlc3: Vec::with_capacity(n),
            ohlc4: Vec::with_capacity(n),
            bid: Vec::with_capacity(n),
            ask: Vec::with_capacity(n),
        };
        for (idx, b) in bars.iter().enumerate() {
            s.open.push(b.open);
            s.high.push(b.high);
            s.low.push(b.low);
            s.close.push(b.close);
            s.volume.push(b.volume);
            s.time.push(b.ts as f64);
            s.bar_index.push(idx as f64);
            s.hl2.push((b.high + b.low) / 2.0);
            s.hlc3.push((b.high + b.low + b.close) / 3.0);
            s.ohlc4.push((b.open + b.high + b.low + b.close) / 4.0);
            s.bid.push(b.close * 0.9999);
            s.ask.push(b.close * 1.0001);
        }
        Ok(s)
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn bar_index(&self) -> &[f64] {
        &self.bar_index
    }

    pub fn hl2(&self) -> &[f64] {
        &self.hl2
    }

    pub fn hlc3(&self) -> &[f64] {
        &self.hlc3
    }

    pub fn ohlc4(&self) -> &[f64] {
        &self.ohlc4
    }

    pub fn bid(&self) -> &[f64] {
        &self.bid
    }

    pub fn ask(&self) -> &[f64] {
        &self.ask
    }

    /// All named builtin series as (name, slice) pairs; the closed set a
    /// script environment exposes.
    pub fn named(&self) -> [(&'static str, &[f64]); 12] {
        [
            ("open", self.open()),
            ("high", self.high()),
            ("low", self.low()),
            ("close", self.close()),
            ("volume", self.volume()),
            ("time", self.time()),
            ("bar_index", self.bar_index()),
            ("hl2", self.hl2()),
            ("hlc3", self.hlc3()),
            ("ohlc4", self.ohlc4()),
            ("bid", self.bid()),
            ("ask", self.ask()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_bar(ts: i64, o: f64, h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar {
            ts,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = BarSeries::from_bars(&[]).unwrap_err();
        assert_eq!(err, SeriesError::Empty);
    }

    #[test]
    fn derived_series_match_definitions() {
        let bars = vec![
            mk_bar(0, 10.0, 12.0, 8.0, 11.0, 100.0),
            mk_bar(HOUR_MS, 11.0, 14.0, 10.0, 13.0, 200.0),
        ];
        let s = BarSeries::from_bars(&bars).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.hl2()[0], 10.0);
        assert!((s.hlc3()[0] - 31.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.ohlc4()[0], 41.0 / 4.0);
        assert_eq!(s.bar_index(), &[0.0, 1.0]);
        assert_eq!(s.time()[1], HOUR_MS as f64);
        assert!((s.bid()[1] - 13.0 * 0.9999).abs() < 1e-12);
        assert!((s.ask()[1] - 13.0 * 1.0001).abs() < 1e-12);
    }
}
