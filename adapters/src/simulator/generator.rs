use corelib::TickerData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SimulatorError;

pub const DEFAULT_SYMBOLS: [&str; 20] = [
    "BTCUSDT", "ETHUSDT", "XRPUSDT", "LTCUSDT", "ADAUSDT", "DOTUSDT", "LINKUSDT", "BNBUSDT",
    "SOLUSDT", "DOGEUSDT", "UNIUSDT", "MATICUSDT", "AVAXUSDT", "ATOMUSDT", "ALGOUSDT",
    "XTZUSDT", "XLMUSDT", "VETUSDT", "FILUSDT", "TRXUSDT",
];

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Universe of symbols to draw from.
    pub symbols: Vec<String>,

    /// Probability in [0, 1] that a ticker is back-dated.
    pub stale_ratio: f64,

    /// Back-dated tickers land uniformly in `(now - stale_window_ms, now]`.
    pub stale_window_ms: i64,

    /// Fixed seed for reproducible streams; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            stale_ratio: 0.05,
            stale_window_ms: 4_000,
            seed: None,
        }
    }
}

/// Produces plausible 24h-ticker messages.
///
/// Event times are mostly "now"; a configurable fraction is pushed into
/// the recent past so consumers see out-of-order updates.
pub struct TickerGenerator {
    cfg: GeneratorConfig,
    rng: StdRng,
    seq: i64,
}

impl TickerGenerator {
    pub fn new(cfg: GeneratorConfig) -> Result<Self, SimulatorError> {
        if cfg.symbols.is_empty() {
            return Err(SimulatorError::NoSymbols);
        }
        if !(0.0..=1.0).contains(&cfg.stale_ratio) {
            return Err(SimulatorError::InvalidStaleRatio(cfg.stale_ratio));
        }

        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { cfg, rng, seq: 0 })
    }

    pub fn next_ticker(&mut self, now_ms: i64) -> TickerData {
        let idx = self.rng.gen_range(0..self.cfg.symbols.len());
        let symbol = self.cfg.symbols[idx].clone();

        let base = if symbol.starts_with("BTC") {
            40_000.0
        } else {
            100.0
        };

        // ±10% around the base
        let price = base + self.rng.r#gen::<f64>() * base * 0.1;
        let prev_close_price = base + self.rng.r#gen::<f64>() * base * 0.1;
        let price_change = price - prev_close_price;

        let count = self.rng.gen_range(100..1_000);
        self.seq += 1;
        let first_id = self.seq * 1_000;

        TickerData {
            event_time: self.event_time(now_ms),
            symbol,
            price,
            price_change,
            price_change_percent: price_change / prev_close_price * 100.0,
            weighted_avg_price: price + self.rng.r#gen::<f64>() * 10.0 - 5.0,
            prev_close_price,
            last_qty: self.rng.r#gen::<f64>() * 10.0,
            bid_price: price - self.rng.r#gen::<f64>(),
            ask_price: price + self.rng.r#gen::<f64>(),
            open_price: prev_close_price,
            high_price: price + self.rng.r#gen::<f64>() * 10.0,
            low_price: price - self.rng.r#gen::<f64>() * 10.0,
            volume: 10_000.0 + self.rng.r#gen::<f64>() * 90_000.0,
            quote_volume: (10_000.0 + self.rng.r#gen::<f64>() * 90_000.0) * price,
            open_time: now_ms - DAY_MS,
            close_time: now_ms,
            first_id,
            last_id: first_id + count,
            count,
        }
    }

    fn event_time(&mut self, now_ms: i64) -> i64 {
        if self.cfg.stale_window_ms > 0 && self.rng.gen_bool(self.cfg.stale_ratio) {
            now_ms - self.rng.gen_range(0..self.cfg.stale_window_ms)
        } else {
            now_ms
        }
    }
}
