//! Backend data: wire schemas, validation, and the HTTP client.

pub mod chip;
pub mod http;
pub mod provider;
pub mod schema;

pub use chip::{
    format_share_count, BrokerBar, BrokerRow, BrokerTrade, ChipBars, ChipData, TradeSide,
};
pub use http::HttpBackend;
pub use provider::{Backend, ChipQuery, DataError};
pub use schema::{history_from_csv, history_from_json, validate_history, RawBar};
