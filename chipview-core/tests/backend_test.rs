//! The `Backend` seam with an in-memory source: chip tables and history flow
//! through the same parsing and bundle code as the HTTP client.

use std::collections::HashMap;

use chipview_core::data::{
    history_from_json, Backend, BrokerTrade, ChipData, ChipQuery, DataError, RawBar, TradeSide,
};
use chipview_core::engine::{bundle_from_raw, cutoff_months_before};
use chipview_core::EngineConfig;
use chrono::NaiveDate;

struct MemoryBackend {
    chips: HashMap<String, String>,
    histories: HashMap<String, String>,
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn chip_data(&self, query: &ChipQuery) -> Result<ChipData, DataError> {
        let json = self.chips.get(&query.ticker).ok_or_else(|| DataError::SymbolNotFound {
            symbol: query.ticker.clone(),
        })?;
        serde_json::from_str(json).map_err(|e| DataError::ResponseFormatChanged(e.to_string()))
    }

    fn broker_trades(&self, _ticker: &str, broker: &str) -> Result<Vec<BrokerTrade>, DataError> {
        if broker != "凱基台北" {
            return Ok(Vec::new());
        }
        let json = r#"[{"日期":"2024-07-12","買賣超股數":"3,000"},{"日期":"2024-07-15","買賣超股數":"-1,000"}]"#;
        serde_json::from_str(json).map_err(|e| DataError::ResponseFormatChanged(e.to_string()))
    }

    fn stock_history(&self, ticker: &str) -> Result<Vec<RawBar>, DataError> {
        let json = self.histories.get(ticker).ok_or_else(|| DataError::SymbolNotFound {
            symbol: ticker.to_string(),
        })?;
        history_from_json(json)
    }
}

fn backend() -> MemoryBackend {
    let chip = r#"{
        "股票簡稱": "台積電", "股票代號": "2330", "日期": "2024-07-15",
        "買超分點": [{"券商": "券商", "買賣超股數": "買賣超股數"},
                    {"券商": "摩根大通", "買賣超股數": "5,000"}],
        "賣超分點": [{"券商": "券商", "買賣超股數": "買賣超股數"},
                    {"券商": "凱基台北", "買賣超股數": "-10,000"}]
    }"#;

    let mut rows = Vec::new();
    let mut date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
    let mut i = 0_u64;
    while date <= end {
        let close = 900.0 + i as f64;
        rows.push(format!(
            r#"{{"date":"{date}","open":{close},"high":{},"low":{},"close":{close},"volume":{}}}"#,
            close + 10.0,
            close - 10.0,
            10_000 + i * 100
        ));
        date += chrono::Duration::days(1);
        i += 1;
    }

    MemoryBackend {
        chips: HashMap::from([("2330".to_string(), chip.to_string())]),
        histories: HashMap::from([("2330".to_string(), format!("[{}]", rows.join(",")))]),
    }
}

#[test]
fn chip_tables_scale_against_largest_row() {
    let backend = backend();
    let chip = backend.chip_data(&ChipQuery::new(" 2330 ").unwrap()).unwrap();
    let bars = chip.bars().unwrap();

    assert_eq!(bars.max_net_shares, 10_000);
    assert_eq!(bars.buyers.len(), 1);
    assert_eq!(bars.buyers[0].ratio, 0.5);
    assert_eq!(bars.sellers[0].broker, "凱基台北");
    assert_eq!(bars.sellers[0].ratio, 1.0);
}

#[test]
fn unknown_ticker_is_not_found() {
    let backend = backend();
    let err = backend.chip_data(&ChipQuery::new("9999").unwrap()).unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "9999"));
}

#[test]
fn history_from_backend_builds_bundle() {
    let backend = backend();
    let raw = backend.stock_history("2330").unwrap();
    let cutoff = cutoff_months_before(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(), 3);
    let bundle = bundle_from_raw(&raw, cutoff, &EngineConfig::default()).unwrap();

    assert_eq!(bundle.len(), 92);
    assert!(bundle.is_aligned());
    assert_eq!(bundle.max_volume, 10_000 + (raw.len() as u64 - 1) * 100);
    assert!(bundle.ma20.iter().all(|p| p.value.is_some()));
    // 197 bars of history: MA120 fills in mid-window, MA240 never does
    assert!(bundle.ma120[0].value.is_none());
    assert!(bundle.ma120.last().unwrap().value.is_some());
    assert!(bundle.ma240.iter().all(|p| p.value.is_none()));
}

#[test]
fn broker_trades_carry_side() {
    let backend = backend();
    let trades = backend.broker_trades("2330", "凱基台北").unwrap();
    let sides: Vec<TradeSide> = trades.iter().map(BrokerTrade::side).collect();
    assert_eq!(sides, vec![TradeSide::Buy, TradeSide::Sell]);
    assert!(backend.broker_trades("2330", "美林").unwrap().is_empty());
}

#[test]
fn backend_is_object_safe() {
    let backend: Box<dyn Backend> = Box::new(backend());
    assert_eq!(backend.name(), "memory");
}
