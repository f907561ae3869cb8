//! HTTP client for the chip data backend.
//!
//! Endpoints:
//! - `GET /api/chip_data/{ticker}?start_date=..&end_date=..`
//! - `GET /api/broker_data/{ticker}/{broker}`
//! - daily history at the configured path template (`{ticker}` substituted)

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::chip::{BrokerTrade, BrokerTradeResponse, ChipData};
use super::provider::{non_blank, Backend, ChipQuery, DataError};
use super::schema::RawBar;
use crate::config::BackendConfig;

const TICKER_PLACEHOLDER: &str = "{ticker}";

pub struct HttpBackend {
    client: reqwest::blocking::Client,
    base_url: Url,
    history_template: Vec<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, DataError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| DataError::InvalidQuery(format!("base URL {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::InvalidQuery(format!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let history_template: Vec<String> = config
            .history_path
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();
        if !history_template.iter().any(|seg| seg == TICKER_PLACEHOLDER) {
            return Err(DataError::InvalidQuery(format!(
                "history path {:?} has no {TICKER_PLACEHOLDER} segment",
                config.history_path
            )));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Other(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            history_template,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url, DataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataError::InvalidQuery(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    fn chip_data_url(&self, ticker: &str) -> Result<Url, DataError> {
        self.endpoint(&["api", "chip_data", ticker])
    }

    fn broker_data_url(&self, ticker: &str, broker: &str) -> Result<Url, DataError> {
        self.endpoint(&["api", "broker_data", ticker, broker])
    }

    fn history_url(&self, ticker: &str) -> Result<Url, DataError> {
        let segments: Vec<&str> = self
            .history_template
            .iter()
            .map(|seg| if seg == TICKER_PLACEHOLDER { ticker } else { seg.as_str() })
            .collect();
        self.endpoint(&segments)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        symbol: &str,
    ) -> Result<T, DataError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {url}")));
        }

        resp.json::<T>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn chip_data(&self, query: &ChipQuery) -> Result<ChipData, DataError> {
        let url = self.chip_data_url(&query.ticker)?;
        let params: Vec<(&str, String)> = match query.range {
            Some((start, end)) => vec![
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
            ],
            None => Vec::new(),
        };
        self.get_json(url, &params, &query.ticker)
    }

    fn broker_trades(&self, ticker: &str, broker: &str) -> Result<Vec<BrokerTrade>, DataError> {
        let ticker = non_blank("ticker", ticker)?;
        let broker = non_blank("broker", broker)?;
        let url = self.broker_data_url(&ticker, &broker)?;
        let resp: BrokerTradeResponse = self.get_json(url, &[], &ticker)?;
        Ok(resp.data)
    }

    fn stock_history(&self, ticker: &str) -> Result<Vec<RawBar>, DataError> {
        let ticker = non_blank("ticker", ticker)?;
        let url = self.history_url(&ticker)?;
        self.get_json(url, &[], &ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            base_url: base_url.into(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn chip_data_url_encodes_ticker() {
        let url = backend("http://localhost:5000").chip_data_url("台積電").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/chip_data/%E5%8F%B0%E7%A9%8D%E9%9B%BB"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let url = backend("http://host/chips/").broker_data_url("2330", "9A00").unwrap();
        assert_eq!(url.as_str(), "http://host/chips/api/broker_data/2330/9A00");
    }

    #[test]
    fn slash_in_ticker_is_escaped() {
        let url = backend("http://host").chip_data_url("a/b").unwrap();
        assert_eq!(url.as_str(), "http://host/api/chip_data/a%2Fb");
    }

    #[test]
    fn history_template_substitutes_ticker() {
        let b = HttpBackend::new(&BackendConfig {
            base_url: "http://host".into(),
            history_path: "/v2/{ticker}/daily".into(),
            ..BackendConfig::default()
        })
        .unwrap();
        assert_eq!(b.history_url("2330").unwrap().as_str(), "http://host/v2/2330/daily");
    }

    #[test]
    fn template_without_placeholder_rejected() {
        let result = HttpBackend::new(&BackendConfig {
            history_path: "/api/history".into(),
            ..BackendConfig::default()
        });
        assert!(matches!(result, Err(DataError::InvalidQuery(_))));
    }

    #[test]
    fn bad_base_url_rejected() {
        let result = HttpBackend::new(&BackendConfig {
            base_url: "not a url".into(),
            ..BackendConfig::default()
        });
        assert!(matches!(result, Err(DataError::InvalidQuery(_))));
    }

    #[test]
    fn blank_broker_rejected_before_request() {
        let err = backend("http://localhost:5000").broker_trades("2330", "  ").unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
    }

    /// Answer a single request on a loopback port with `status` and `body`.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        });
        (base_url, handle)
    }

    fn query(ticker: &str) -> ChipQuery {
        ChipQuery::new(ticker).unwrap()
    }

    #[test]
    fn not_found_maps_to_symbol_not_found() {
        let (base_url, server) = serve_once("404 Not Found", "{}");
        let err = backend(&base_url).chip_data(&query("2330")).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, DataError::SymbolNotFound { symbol } if symbol == "2330"));
    }

    #[test]
    fn unexpected_body_maps_to_format_changed() {
        let (base_url, server) = serve_once("200 OK", r#"{"x":1}"#);
        let err = backend(&base_url).chip_data(&query("2330")).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn history_served_over_http() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"[{"date":"2024-03-01","open":10,"high":11,"low":9,"close":10.5,"volume":"1,200"}]"#,
        );
        let raw = backend(&base_url).stock_history("2330").unwrap();
        server.join().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn refused_connection_maps_to_network_unreachable() {
        let err = backend("http://127.0.0.1:1").chip_data(&query("2330")).unwrap_err();
        assert!(matches!(err, DataError::NetworkUnreachable(_)));
    }
}
