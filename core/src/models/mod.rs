use serde::{Deserialize, Serialize};

pub mod ticker;

pub use ticker::TickerData;

/// Typed price update produced by the decoder.
///
/// Moves decoder → ingestion queue → merge worker with exactly one owner
/// at a time; not `Clone`.
#[derive(Debug, PartialEq)]
pub struct UpdateRecord {
    pub symbol: String,
    pub price: f64,
    /// Source-reported event time (ms). Conflict resolution keys on this,
    /// never on arrival time.
    pub event_time: i64,
}

impl UpdateRecord {
    pub fn new(symbol: impl Into<String>, price: f64, event_time: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            event_time,
        }
    }
}

/// Latest known price for one symbol, as held by the store and returned
/// to query callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub symbol: String,
    pub price: f64,
    pub event_time: i64,
}

impl From<UpdateRecord> for StoreEntry {
    fn from(r: UpdateRecord) -> Self {
        Self {
            symbol: r.symbol,
            price: r.price,
            event_time: r.event_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_entry_takes_all_fields_from_record() {
        let e = StoreEntry::from(UpdateRecord::new("BTCUSDT", 40_100.5, 1_700_000_000_000));

        assert_eq!(e.symbol, "BTCUSDT");
        assert_eq!(e.price, 40_100.5);
        assert_eq!(e.event_time, 1_700_000_000_000);
    }

    #[test]
    fn store_entry_serializes_with_query_field_names() {
        let e = StoreEntry {
            symbol: "ETHUSDT".into(),
            price: 101.25,
            event_time: 42,
        };

        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "symbol": "ETHUSDT", "price": 101.25, "event_time": 42 })
        );
    }
}
