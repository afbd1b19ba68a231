use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Bar, HOUR_MS};

/// Fixed seed so repeated runs (and tests) see identical bars.
const MOCK_SEED: u64 = 0x51_4E_45_52;

/// Reference instant the series counts back from, hourly. Keeping this a
/// constant instead of `now()` is what makes the generator deterministic.
const REFERENCE_TS: i64 = 1_700_000_000_000;

/// Deterministic mock OHLC series for tests and offline chart demos.
///
/// Random walk on close (±2 per bar), open equal to the prior close,
/// high/low stretched by at most 2, volume uniform in 500..5000.
pub fn generate_mock_ohlc(bar_count: usize) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(MOCK_SEED);
    let mut bars = Vec::with_capacity(bar_count);
    let mut prev_close = 100.0_f64;

    for i in 0..bar_count {
        let ts = REFERENCE_TS - ((bar_count - i) as i64) * HOUR_MS;
        let open = prev_close;
        let close = (open + rng.gen_range(-2.0..=2.0)).max(1.0);
        let high = open.max(close) + rng.gen_range(0.0..=2.0);
        let low = (open.min(close) - rng.gen_range(0.0..=2.0)).max(0.1);
        let volume = rng.gen_range(500..5000) as f64;
        bars.push(Bar {
            ts,
            open,
            high,
            low,
            close,
            volume,
        });
        prev_close = close;
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_is_deterministic() {
        let a = generate_mock_ohlc(50);
        let b = generate_mock_ohlc(50);
        assert_eq!(a, b);
    }

    #[test]
    fn mock_bars_are_well_formed() {
        let bars = generate_mock_ohlc(200);
        assert_eq!(bars.len(), 200);
        for w in bars.windows(2) {
            assert!(w[1].ts > w[0].ts, "timestamps must ascend");
            assert_eq!(w[1].ts - w[0].ts, HOUR_MS);
            assert_eq!(w[1].open, w[0].close, "open equals prior close");
        }
        for b in &bars {
            assert!(b.high >= b.open.max(b.close));
            assert!(b.low <= b.open.min(b.close));
            assert!(b.volume >= 500.0 && b.volume < 5000.0);
        }
    }
}
