//! Update decoder: raw feed message → [`UpdateRecord`].
//!
//! Stateless and I/O free, so it is safe to call from any number of
//! receive loops at once.

use corelib::{TickerData, UpdateRecord};

use crate::error::DecodeError;

pub fn decode(raw: &[u8]) -> Result<UpdateRecord, DecodeError> {
    let ticker: TickerData = serde_json::from_slice(raw)?;

    let symbol = ticker.symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(DecodeError::EmptySymbol);
    }

    if !ticker.price.is_finite() {
        return Err(DecodeError::NonFinitePrice {
            symbol,
            price: ticker.price,
        });
    }

    if ticker.event_time < 0 {
        return Err(DecodeError::NegativeEventTime {
            symbol,
            event_time: ticker.event_time,
        });
    }

    Ok(UpdateRecord {
        symbol,
        price: ticker.price,
        event_time: ticker.event_time,
    })
}
