pub mod binance;
pub mod candle_buffer;
pub mod csv_parser;
pub mod source;

pub use binance::{BinanceCandleSource, BinancePriceFeed, RestTransport};
pub use candle_buffer::CandleBuffer;
pub use csv_parser::{CandleCsvParser, CsvCandleSource};
pub use source::{
    BroadcastTickSource, CandleSource, MarketTick, PollingTickSource, PriceFeed, StaticCandleSource, Subscription,
    TickCallback, TickSource,
};
