//! Broker chip data: which branches (分點) net bought or sold a stock.
//!
//! The backend keys everything in Chinese; field names are mapped here. Share
//! counts arrive as strings with thousands separators (`"1,234"`). Table rows
//! keep the text as sent because each table opens with a header row; the rows
//! are parsed by `ChipData::bars`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::provider::DataError;

/// Parse a share count such as `"1,234"`, `"-56"` or `" 7 "`.
pub fn parse_share_count(text: &str) -> Option<i64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<i64>().ok()
}

/// Render a share count with thousands separators.
pub fn format_share_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `i64::MIN` as a float (-2^63); the range is `[I64_MIN, -I64_MIN)`.
const I64_MIN: f64 = -9_223_372_036_854_775_808.0;

fn share_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Integer(i64),
        Number(f64),
        Text(String),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Integer(v) => Ok(v),
        Wire::Number(v) if v.fract() == 0.0 && (I64_MIN..-I64_MIN).contains(&v) => Ok(v as i64),
        Wire::Number(v) => Err(de::Error::custom(format!(
            "share count {v} is not a whole number in range"
        ))),
        Wire::Text(s) => parse_share_count(&s)
            .ok_or_else(|| de::Error::custom(format!("share count {s:?} is not an integer"))),
    }
}

fn share_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Integer(i64),
        Number(f64),
        Text(String),
    }

    Ok(match Wire::deserialize(deserializer)? {
        Wire::Integer(v) => v.to_string(),
        Wire::Number(v) => v.to_string(),
        Wire::Text(s) => s,
    })
}

/// One broker row of a buy or sell table, count kept as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRow {
    #[serde(rename = "券商")]
    pub broker: String,
    #[serde(rename = "買賣超股數", deserialize_with = "share_text")]
    pub net_shares: String,
}

impl BrokerRow {
    pub fn shares(&self) -> Option<i64> {
        parse_share_count(&self.net_shares)
    }
}

/// Stock profile plus the buy-side and sell-side broker tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipData {
    #[serde(rename = "股票簡稱")]
    pub short_name: String,
    #[serde(rename = "股票代號")]
    pub code: String,
    #[serde(rename = "股票名稱", default)]
    pub name: String,
    #[serde(rename = "產業別", default)]
    pub industry: String,
    #[serde(rename = "上市櫃", default)]
    pub market: String,
    #[serde(rename = "公司地址", default)]
    pub address: String,
    #[serde(rename = "股票過戶機構", default)]
    pub transfer_agent: String,
    #[serde(rename = "日期", default)]
    pub date: String,
    #[serde(rename = "買超分點", default)]
    pub buy_table: Vec<BrokerRow>,
    #[serde(rename = "賣超分點", default)]
    pub sell_table: Vec<BrokerRow>,
}

/// A parsed broker row with its bar width relative to the largest row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerBar {
    pub broker: String,
    pub net_shares: i64,
    /// `|net_shares| / max`, in `[0, 1]`.
    pub ratio: f64,
}

/// Both broker tables parsed and scaled for the horizontal bar display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipBars {
    pub buyers: Vec<BrokerBar>,
    pub sellers: Vec<BrokerBar>,
    pub max_net_shares: u64,
}

impl ChipData {
    /// Net buyers. The first row of each table is a header and is skipped.
    pub fn buyers(&self) -> &[BrokerRow] {
        self.buy_table.get(1..).unwrap_or(&[])
    }

    /// Net sellers, header row skipped.
    pub fn sellers(&self) -> &[BrokerRow] {
        self.sell_table.get(1..).unwrap_or(&[])
    }

    /// Parse every data row and scale it against the largest absolute count
    /// across both tables. A row whose count does not parse is a format error.
    pub fn bars(&self) -> Result<ChipBars, DataError> {
        let parse = |rows: &[BrokerRow]| -> Result<Vec<(String, i64)>, DataError> {
            rows.iter()
                .map(|row| {
                    row.shares().map(|v| (row.broker.clone(), v)).ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!(
                            "broker {}: share count {:?} is not an integer",
                            row.broker, row.net_shares
                        ))
                    })
                })
                .collect()
        };
        let buyers = parse(self.buyers())?;
        let sellers = parse(self.sellers())?;

        let max_net_shares = buyers
            .iter()
            .chain(&sellers)
            .map(|(_, v)| v.unsigned_abs())
            .max()
            .unwrap_or(0);
        let scale = |rows: Vec<(String, i64)>| -> Vec<BrokerBar> {
            rows.into_iter()
                .map(|(broker, net_shares)| BrokerBar {
                    ratio: bar_ratio(net_shares, max_net_shares),
                    broker,
                    net_shares,
                })
                .collect()
        };

        Ok(ChipBars {
            buyers: scale(buyers),
            sellers: scale(sellers),
            max_net_shares,
        })
    }
}

fn bar_ratio(net_shares: i64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (net_shares.unsigned_abs() as f64 / max as f64).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
    Flat,
}

/// One day of a single broker's net trading in a stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerTrade {
    #[serde(rename = "日期")]
    pub date: String,
    #[serde(rename = "買賣超股數", deserialize_with = "share_count")]
    pub net_shares: i64,
}

impl BrokerTrade {
    pub fn side(&self) -> TradeSide {
        match self.net_shares {
            v if v > 0 => TradeSide::Buy,
            v if v < 0 => TradeSide::Sell,
            _ => TradeSide::Flat,
        }
    }
}

/// `GET /api/broker_data/{ticker}/{broker}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerTradeResponse {
    #[serde(rename = "資料", default)]
    pub data: Vec<BrokerTrade>,
}
