// Data model shared between the signal engine and the chart front end.
// Nothing in here computes indicators; it only describes what flows across
// the engine boundary (candles, ticks, signals, rendered lines).

pub mod models;
pub mod utils;
