// src/services/eastmoney.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ConfigError, FetchError};
use crate::models::{Observation, Series};
use super::fetcher::Fetcher;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Only the newest rows are needed to find the latest close.
const KLINE_LIMIT: &str = "30";

/// Daily closes of an index from the Eastmoney kline endpoint.
///
/// Symbols carry their exchange as a prefix: `sz399997`, `sh000001`,
/// `csi931151`.
pub struct EastmoneyIndexFetcher {
    client: Client,
    symbol: String,
    secid: String,
}

impl EastmoneyIndexFetcher {
    pub fn new(symbol: &str) -> Result<Self, ConfigError> {
        let secid = secid_for(symbol)?;
        Ok(EastmoneyIndexFetcher {
            client: Client::new(),
            symbol: symbol.to_string(),
            secid,
        })
    }

    /// `lmt` counts back from `end`, so the response holds the last
    /// `KLINE_LIMIT` trading days, oldest first.
    fn query(&self) -> [(&'static str, &str); 8] {
        [
            ("secid", self.secid.as_str()),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
            ("klt", "101"),
            ("fqt", "0"),
            ("beg", "0"),
            ("end", "20500101"),
            ("lmt", KLINE_LIMIT),
        ]
    }
}

/// Maps `sz399997` to the `market.code` form the endpoint expects.
fn secid_for(symbol: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"^(sz|sh|csi)([0-9A-Za-z]+)$")
        .map_err(|e| ConfigError::InvalidTask(e.to_string()))?;
    let caps = re.captures(symbol.trim()).ok_or_else(|| {
        ConfigError::InvalidTask(format!(
            "index symbol {:?} must look like sz399997, sh000001 or csi931151",
            symbol
        ))
    })?;

    let market = match &caps[1] {
        "sz" => "0",
        "sh" => "1",
        _ => "2",
    };
    Ok(format!("{}.{}", market, &caps[2]))
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

// Each row: date,open,close,high,low,volume,amount,...
fn parse_klines(rows: &[String]) -> Result<Series, FetchError> {
    rows.iter()
        .map(|row| {
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() < 3 {
                return Err(FetchError::parse(format!("short kline row {:?}", row)));
            }
            let date = NaiveDate::parse_from_str(fields[0].trim(), "%Y-%m-%d")
                .map_err(|e| FetchError::parse(format!("bad kline date {:?}: {}", fields[0], e)))?;
            let close = fields[2]
                .trim()
                .parse::<f64>()
                .map_err(|e| FetchError::parse(format!("bad close {:?}: {}", fields[2], e)))?;
            Ok(Observation::on_date(date, close))
        })
        .collect()
}

#[async_trait]
impl Fetcher for EastmoneyIndexFetcher {
    async fn fetch(&self) -> Result<Series, FetchError> {
        info!("Fetching daily index klines for {} (secid {})", self.symbol, self.secid);

        let response = self
            .client
            .get(KLINE_URL)
            .query(&self.query())
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body: KlineResponse = response.json().await?;
        let data = body.data.ok_or_else(|| {
            FetchError::provider(format!("no kline data returned for {}", self.symbol))
        })?;

        let series = parse_klines(&data.klines)?;
        info!("Received {} klines for {}", series.len(), self.symbol);
        Ok(series)
    }

    fn source(&self) -> String {
        format!("eastmoney:{}", self.symbol)
    }
}
